use foundation::bounds::Aabb3;
use foundation::handles::Handle;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::SceneGraph;
use crate::node::{NodeId, VisualState};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaterialId(pub u32);

#[derive(Debug, Clone, PartialEq)]
struct Material {
    base: VisualState,
    glow: f32,
    /// Set on per-node clones; points at the shared original.
    cloned_from: Option<MaterialId>,
    live: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct Mesh {
    bounds: Aabb3,
    material: MaterialId,
    unique: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct NodeData {
    name: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    mesh: Option<Mesh>,
}

/// In-memory scene graph.
///
/// Mirrors the renderer's node hierarchy closely enough for hotspot
/// indexing and picking. Handles carry the tree's generation, so handles
/// from a previous model never resolve against a new one.
#[derive(Debug, Clone, Default)]
pub struct SceneTree {
    generation: u32,
    nodes: Vec<NodeData>,
    materials: Vec<Material>,
}

impl SceneTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_generation(generation: u32) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn id(&self, index: usize) -> NodeId {
        NodeId(Handle::new(index as u32, self.generation))
    }

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        if id.0.generation() != self.generation {
            return None;
        }
        self.nodes.get(id.index() as usize)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        if id.0.generation() != self.generation {
            return None;
        }
        self.nodes.get_mut(id.index() as usize)
    }

    pub fn add_material(&mut self, base: VisualState) -> MaterialId {
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(Material {
            base,
            glow: 0.0,
            cloned_from: None,
            live: true,
        });
        id
    }

    /// Adds a node. The first node added without a parent becomes the root;
    /// later parentless nodes are attached under it.
    pub fn add_node(&mut self, parent: Option<NodeId>, name: Option<&str>) -> NodeId {
        let id = self.id(self.nodes.len());
        let parent = match parent {
            Some(p) if self.node(p).is_some() => Some(p),
            _ if self.nodes.is_empty() => None,
            _ => Some(self.id(0)),
        };
        self.nodes.push(NodeData {
            name: name.map(str::to_string),
            parent,
            children: Vec::new(),
            mesh: None,
        });
        if let Some(p) = parent
            && let Some(pd) = self.node_mut(p)
        {
            pd.children.push(id);
        }
        id
    }

    pub fn set_mesh(&mut self, node: NodeId, bounds: Aabb3, material: MaterialId) {
        if let Some(n) = self.node_mut(node) {
            n.mesh = Some(Mesh {
                bounds,
                material,
                unique: false,
            });
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    pub fn material_of(&self, node: NodeId) -> Option<MaterialId> {
        self.node(node)?.mesh.as_ref().map(|m| m.material)
    }

    pub fn material_glow(&self, material: MaterialId) -> f32 {
        self.materials
            .get(material.0 as usize)
            .map(|m| m.glow)
            .unwrap_or(0.0)
    }

    /// Glow of the first mesh at or below `node`.
    pub fn glow_of(&self, node: NodeId) -> f32 {
        self.subtree(node)
            .into_iter()
            .find_map(|n| self.material_of(n))
            .map(|m| self.material_glow(m))
            .unwrap_or(0.0)
    }

    pub fn live_material_count(&self) -> usize {
        self.materials.iter().filter(|m| m.live).count()
    }

    /// Depth-first pre-order walk starting at `node`.
    pub fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.node(node).is_none() {
            return out;
        }
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            out.push(n);
            if let Some(data) = self.node(n) {
                stack.extend(data.children.iter().rev().copied());
            }
        }
        out
    }

    pub fn from_snapshot(snapshot: &SceneSnapshot) -> Result<Self, SnapshotError> {
        Self::from_snapshot_with_generation(snapshot, 0)
    }

    pub fn from_snapshot_with_generation(
        snapshot: &SceneSnapshot,
        generation: u32,
    ) -> Result<Self, SnapshotError> {
        if snapshot.nodes.is_empty() {
            return Err(SnapshotError::Empty);
        }
        let mut tree = SceneTree::with_generation(generation);
        let mut materials: std::collections::BTreeMap<u32, MaterialId> = Default::default();

        for (index, node) in snapshot.nodes.iter().enumerate() {
            let parent = match node.parent {
                Some(p) if (p as usize) < index => Some(tree.id(p as usize)),
                Some(p) => return Err(SnapshotError::ParentNotBefore { node: index, parent: p }),
                None => None,
            };
            let id = tree.add_node(parent, node.name.as_deref());
            if let Some(bounds) = node.bounds {
                let key = node.material.unwrap_or(u32::MAX - index as u32);
                let base = VisualState {
                    emissive: node.emissive.unwrap_or([0.0; 3]),
                    emissive_intensity: node.emissive_intensity.unwrap_or(0.0),
                };
                let material = *materials
                    .entry(key)
                    .or_insert_with(|| tree.add_material(base));
                tree.set_mesh(id, Aabb3::new(bounds.min, bounds.max), material);
            }
        }
        Ok(tree)
    }
}

impl SceneGraph for SceneTree {
    fn root(&self) -> Option<NodeId> {
        (!self.nodes.is_empty()).then(|| self.id(0))
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn name(&self, node: NodeId) -> Option<String> {
        self.node(node)?.name.clone()
    }

    fn world_bounds(&self, node: NodeId) -> Option<Aabb3> {
        let mut acc: Option<Aabb3> = None;
        for n in self.subtree(node) {
            let Some(mesh) = self.node(n).and_then(|d| d.mesh.as_ref()) else {
                continue;
            };
            let b = mesh.bounds;
            acc = Some(match acc {
                None => b,
                Some(a) => Aabb3::new(
                    [a.min[0].min(b.min[0]), a.min[1].min(b.min[1]), a.min[2].min(b.min[2])],
                    [a.max[0].max(b.max[0]), a.max[1].max(b.max[1]), a.max[2].max(b.max[2])],
                ),
            });
        }
        acc
    }

    fn base_visual(&self, node: NodeId) -> VisualState {
        self.subtree(node)
            .into_iter()
            .find_map(|n| self.material_of(n))
            .and_then(|m| self.materials.get(m.0 as usize))
            .map(|m| m.base)
            .unwrap_or_default()
    }

    fn make_materials_unique(&mut self, node: NodeId) -> usize {
        let mut cloned = 0;
        for n in self.subtree(node) {
            let Some(mesh) = self.node(n).and_then(|d| d.mesh.clone()) else {
                continue;
            };
            if mesh.unique {
                continue;
            }
            let Some(shared) = self.materials.get(mesh.material.0 as usize).cloned() else {
                continue;
            };
            let clone_id = MaterialId(self.materials.len() as u32);
            self.materials.push(Material {
                base: shared.base,
                glow: 0.0,
                cloned_from: Some(mesh.material),
                live: true,
            });
            if let Some(m) = self.node_mut(n).and_then(|d| d.mesh.as_mut()) {
                m.material = clone_id;
                m.unique = true;
            }
            cloned += 1;
        }
        cloned
    }

    fn release_unique_materials(&mut self, node: NodeId) {
        for n in self.subtree(node) {
            let Some(mesh) = self.node(n).and_then(|d| d.mesh.clone()) else {
                continue;
            };
            if !mesh.unique {
                continue;
            }
            let Some(clone) = self.materials.get_mut(mesh.material.0 as usize) else {
                continue;
            };
            clone.live = false;
            clone.glow = 0.0;
            let Some(original) = clone.cloned_from else {
                continue;
            };
            if let Some(m) = self.node_mut(n).and_then(|d| d.mesh.as_mut()) {
                m.material = original;
                m.unique = false;
            }
        }
    }

    fn set_glow(&mut self, node: NodeId, glow: f32) {
        let glow = glow.clamp(0.0, 1.0);
        for n in self.subtree(node) {
            if let Some(material) = self.material_of(n)
                && let Some(m) = self.materials.get_mut(material.0 as usize)
            {
                m.glow = glow;
            }
        }
    }
}

/// Flat node list exported by the renderer after a model loads.
///
/// Node `0` is the root; every other node's `parent` must refer to an
/// earlier node. Nodes sharing a `material` number share one material
/// instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SceneSnapshot {
    pub nodes: Vec<SnapshotNode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SnapshotNode {
    pub name: Option<String>,
    pub parent: Option<u32>,
    /// Present for meshes only.
    pub bounds: Option<SnapshotBounds>,
    pub material: Option<u32>,
    pub emissive: Option<[f32; 3]>,
    pub emissive_intensity: Option<f32>,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotBounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("scene snapshot has no nodes")]
    Empty,

    #[error("node {node} refers to parent {parent}, which is not an earlier node")]
    ParentNotBefore { node: usize, parent: u32 },
}
