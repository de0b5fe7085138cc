//! Hotspot index: scene nodes mapped to host dialogs.

use std::collections::BTreeSet;

use foundation::bounds::Aabb3;
use formats::StationMapping;
use thiserror::Error;

use crate::graph::SceneGraph;
use crate::node::{NodeId, VisualState};
use crate::picking::{PickHit, PickOptions, Ray, pick_nearest};

/// One clickable station in the loaded scene.
///
/// `node` is a non-owning reference into the renderer's graph.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractiveRecord {
    pub node: NodeId,
    pub node_name: String,
    pub station_key: String,
    pub dialog_id: String,
    pub bounds: Option<Aabb3>,
    pub base_visual: VisualState,
    pub current_glow: f32,
    pub target_glow: f32,
    pub is_highlighted: bool,
}

/// Declared stations that matched no scene node. Not fatal: the index is
/// still usable with the stations that were found.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{} station(s) have no matching scene node: {}", .missing.len(), .missing.join(", "))]
pub struct HotspotMappingIncomplete {
    pub missing: Vec<String>,
}

#[derive(Debug)]
pub struct HotspotBuild {
    pub index: HotspotIndex,
    pub incomplete: Option<HotspotMappingIncomplete>,
}

/// Flat list of interactive records, built in one pass after model load.
#[derive(Debug, Default)]
pub struct HotspotIndex {
    records: Vec<InteractiveRecord>,
    /// Nodes whose materials were made unique by this index.
    owned: BTreeSet<NodeId>,
}

impl HotspotIndex {
    /// Walks the graph once, depth-first. Each named node is matched
    /// case-insensitively by substring against the station keys in
    /// declaration order; the first matching key wins and a node matches at
    /// most one station. Matched nodes get their own material instances
    /// before they are stored.
    pub fn build(scene: &mut dyn SceneGraph, mapping: &StationMapping) -> HotspotBuild {
        let keys: Vec<(String, &str, &str)> = mapping
            .iter()
            .map(|e| (e.station.to_lowercase(), e.station.as_str(), e.dialog.as_str()))
            .collect();
        let mut matched = vec![false; keys.len()];
        let mut index = HotspotIndex::default();

        let mut stack: Vec<NodeId> = scene.root().into_iter().collect();
        while let Some(node) = stack.pop() {
            let mut children = scene.children(node);
            children.reverse();
            stack.extend(children);

            let Some(name) = scene.name(node) else {
                continue;
            };
            let lower = name.to_lowercase();
            let Some(k) = keys.iter().position(|(key, _, _)| lower.contains(key.as_str())) else {
                continue;
            };
            matched[k] = true;

            if !index.owned.contains(&node) {
                scene.make_materials_unique(node);
                index.owned.insert(node);
            }

            let (_, station, dialog) = &keys[k];
            log::debug!("hotspot {name} -> station {station} (dialog {dialog})");
            index.records.push(InteractiveRecord {
                node,
                node_name: name,
                station_key: station.to_string(),
                dialog_id: dialog.to_string(),
                bounds: scene.world_bounds(node),
                base_visual: scene.base_visual(node),
                current_glow: 0.0,
                target_glow: 0.0,
                is_highlighted: false,
            });
        }

        let missing: Vec<String> = keys
            .iter()
            .zip(&matched)
            .filter(|(_, hit)| !**hit)
            .map(|((_, station, _), _)| station.to_string())
            .collect();
        let incomplete = if missing.is_empty() {
            None
        } else {
            let warning = HotspotMappingIncomplete { missing };
            log::warn!("{warning}");
            Some(warning)
        };

        log::info!("hotspot index built with {} record(s)", index.records.len());
        HotspotBuild { index, incomplete }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[InteractiveRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [InteractiveRecord] {
        &mut self.records
    }

    pub fn get(&self, index: usize) -> Option<&InteractiveRecord> {
        self.records.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut InteractiveRecord> {
        self.records.get_mut(index)
    }

    pub fn highlighted_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_highlighted).count()
    }

    /// Nearest record hit by `ray`. Only record bounds are tested, never the
    /// full scene graph.
    pub fn pick(&self, ray: Ray) -> Option<PickHit> {
        pick_nearest(
            ray,
            self.records.iter().enumerate().map(|(i, r)| (i, r.bounds)),
            PickOptions::default(),
        )
    }

    /// Returns material ownership to the renderer and drops every record.
    pub fn release(&mut self, scene: &mut dyn SceneGraph) {
        for node in std::mem::take(&mut self.owned) {
            scene.set_glow(node, 0.0);
            scene.release_unique_materials(node);
        }
        self.records.clear();
    }
}
