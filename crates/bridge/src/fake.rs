//! In-memory host page for tests.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use crate::error::HostError;
use crate::host::{ActivationSignal, DeferredAsset, HostDocument};

#[derive(Debug, Clone)]
enum Node {
    Trigger { dialog: String, visible: bool },
    Dialog { dialog: String },
    Asset {
        dialog: Option<String>,
        deferred: String,
        live_attribute: String,
        is_media: bool,
    },
}

#[derive(Debug, Default)]
pub struct FakeHost {
    nodes: RefCell<Vec<Option<Node>>>,
    attributes: RefCell<BTreeMap<(u32, String), String>>,
    media_loads: RefCell<Vec<u32>>,
    dispatched: RefCell<Vec<(u32, ActivationSignal)>>,
    global_opener: Cell<bool>,
    global_fails: Cell<bool>,
    global_calls: RefCell<Vec<String>>,
    dispatch_fails: Cell<bool>,
    /// Dialog roots stay hidden for this many lookups.
    mount_after: Cell<u32>,
    lookups: Cell<u32>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, node: Node) -> u32 {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(Some(node));
        (nodes.len() - 1) as u32
    }

    pub fn add_trigger(&self, dialog: &str, visible: bool) -> u32 {
        self.push(Node::Trigger {
            dialog: dialog.to_string(),
            visible,
        })
    }

    pub fn add_dialog(&self, dialog: &str) -> u32 {
        self.push(Node::Dialog {
            dialog: dialog.to_string(),
        })
    }

    /// `dialog = None` places the asset outside every dialog.
    pub fn add_asset(&self, dialog: Option<&str>, deferred: &str, attr: &str, is_media: bool) -> u32 {
        self.push(Node::Asset {
            dialog: dialog.map(str::to_string),
            deferred: deferred.to_string(),
            live_attribute: attr.to_string(),
            is_media,
        })
    }

    pub fn mount_dialogs_after(&self, lookups: u32) {
        self.mount_after.set(lookups);
    }

    pub fn set_global_opener(&self, available: bool) {
        self.global_opener.set(available);
    }

    pub fn fail_global_opener(&self) {
        self.global_opener.set(true);
        self.global_fails.set(true);
    }

    pub fn fail_dispatch(&self) {
        self.dispatch_fails.set(true);
    }

    pub fn attribute(&self, element: u32, name: &str) -> Option<String> {
        self.attributes
            .borrow()
            .get(&(element, name.to_string()))
            .cloned()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.borrow().len()
    }

    pub fn media_loads(&self) -> Vec<u32> {
        self.media_loads.borrow().clone()
    }

    pub fn dispatched(&self) -> Vec<(u32, ActivationSignal)> {
        self.dispatched.borrow().clone()
    }

    pub fn global_calls(&self) -> Vec<String> {
        self.global_calls.borrow().clone()
    }

    pub fn live_triggers(&self, dialog_id: &str) -> usize {
        self.dialog_triggers(dialog_id).len()
    }
}

impl HostDocument for FakeHost {
    type Element = u32;

    fn dialog_triggers(&self, dialog_id: &str) -> Vec<u32> {
        self.nodes
            .borrow()
            .iter()
            .enumerate()
            .filter_map(|(i, n)| match n {
                Some(Node::Trigger { dialog, .. }) if dialog == dialog_id => Some(i as u32),
                _ => None,
            })
            .collect()
    }

    fn is_visible(&self, element: &u32) -> bool {
        matches!(
            self.nodes.borrow().get(*element as usize),
            Some(Some(Node::Trigger { visible: true, .. }))
        )
    }

    fn create_hidden_trigger(&self, dialog_id: &str) -> Result<u32, HostError> {
        Ok(self.add_trigger(dialog_id, false))
    }

    fn remove_element(&self, element: &u32) {
        if let Some(slot) = self.nodes.borrow_mut().get_mut(*element as usize) {
            *slot = None;
        }
    }

    fn dispatch(&self, element: &u32, signal: ActivationSignal) -> Result<(), HostError> {
        if self.dispatch_fails.get() {
            return Err(HostError::Dom("dispatch rejected".to_string()));
        }
        self.dispatched.borrow_mut().push((*element, signal));
        Ok(())
    }

    fn dialog_root(&self, dialog_id: &str) -> Option<u32> {
        let lookups = self.lookups.get() + 1;
        self.lookups.set(lookups);
        if lookups <= self.mount_after.get() {
            return None;
        }
        self.nodes.borrow().iter().enumerate().find_map(|(i, n)| match n {
            Some(Node::Dialog { dialog }) if dialog == dialog_id => Some(i as u32),
            _ => None,
        })
    }

    fn deferred_assets(&self, root: &u32) -> Vec<DeferredAsset<u32>> {
        let nodes = self.nodes.borrow();
        let Some(Some(Node::Dialog { dialog: root_dialog })) = nodes.get(*root as usize) else {
            return Vec::new();
        };
        nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| match n {
                Some(Node::Asset {
                    dialog: Some(d),
                    deferred,
                    live_attribute,
                    is_media,
                }) if d == root_dialog => Some(DeferredAsset {
                    element: i as u32,
                    deferred_value: deferred.clone(),
                    live_attribute: live_attribute.clone(),
                    current_value: self.attribute(i as u32, live_attribute),
                    is_media: *is_media,
                }),
                _ => None,
            })
            .collect()
    }

    fn set_attribute(&self, element: &u32, name: &str, value: &str) -> Result<(), HostError> {
        self.attributes
            .borrow_mut()
            .insert((*element, name.to_string()), value.to_string());
        Ok(())
    }

    fn begin_media_load(&self, element: &u32) {
        self.media_loads.borrow_mut().push(*element);
    }

    fn open_dialog_by_id(&self, dialog_id: &str) -> Result<bool, HostError> {
        if !self.global_opener.get() {
            return Ok(false);
        }
        self.global_calls.borrow_mut().push(dialog_id.to_string());
        if self.global_fails.get() {
            return Err(HostError::Script("openModal threw".to_string()));
        }
        Ok(true)
    }
}
