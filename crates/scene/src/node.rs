use foundation::handles::Handle;

/// Non-owning reference to a node in the renderer's scene graph.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub Handle);

impl NodeId {
    pub fn index(&self) -> u32 {
        self.0.index()
    }
}

/// Emissive state of a node's material before any highlight is applied.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VisualState {
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
}

impl Default for VisualState {
    fn default() -> Self {
        Self {
            emissive: [0.0, 0.0, 0.0],
            emissive_intensity: 0.0,
        }
    }
}
