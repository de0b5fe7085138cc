use foundation::bounds::Aabb3;

use crate::node::{NodeId, VisualState};

/// Read access to the renderer's scene graph plus the narrow set of material
/// mutations this layer is allowed to make.
///
/// The renderer owns every node; implementations hand out [`NodeId`]s that
/// stay valid until the model is swapped or disposed.
pub trait SceneGraph {
    fn root(&self) -> Option<NodeId>;

    /// Direct children in scene order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    fn name(&self, node: NodeId) -> Option<String>;

    /// World-space bounds of the node and everything below it.
    fn world_bounds(&self, node: NodeId) -> Option<Aabb3>;

    fn base_visual(&self, node: NodeId) -> VisualState;

    /// Gives every mesh under `node` its own material instance so a highlight
    /// cannot bleed into siblings sharing the original. Idempotent per mesh;
    /// returns how many materials were cloned by this call.
    fn make_materials_unique(&mut self, node: NodeId) -> usize;

    /// Undoes [`SceneGraph::make_materials_unique`] for the meshes under
    /// `node`, returning them to the shared material.
    fn release_unique_materials(&mut self, node: NodeId);

    /// Highlight intensity in `0.0..=1.0` applied on top of the base visual.
    fn set_glow(&mut self, node: NodeId, glow: f32);
}
