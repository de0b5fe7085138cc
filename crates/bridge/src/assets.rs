use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

use runtime::retry::BoundedRetry;
use runtime::sleep::Sleeper;

use crate::error::DialogDiscoveryTimeout;
use crate::host::HostDocument;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeferredActivation {
    /// The dialog was found; this many elements received their source.
    Activated { assets: usize },
    /// Already done for this dialog earlier in the page's lifetime.
    AlreadyActive,
    /// The embed was torn down first; nothing was touched.
    Closed,
}

/// Per-page record of dialogs whose deferred assets have been released.
///
/// One instance is created per embed and handed to whoever needs it; there
/// is no process-wide registry.
#[derive(Debug, Default)]
pub struct DeferredAssets {
    activated: RefCell<BTreeSet<String>>,
    closed: Cell<bool>,
}

impl DeferredAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_activated(&self, dialog_id: &str) -> bool {
        self.activated.borrow().contains(dialog_id)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Waits for the dialog to mount, then copies every deferred source
    /// inside it into its live attribute. Only the subtree of `dialog_id`
    /// is touched.
    pub async fn activate<H, S>(
        &self,
        host: &H,
        sleeper: &S,
        discovery: BoundedRetry,
        dialog_id: &str,
    ) -> Result<DeferredActivation, DialogDiscoveryTimeout>
    where
        H: HostDocument,
        S: Sleeper,
    {
        if self.is_closed() {
            return Ok(DeferredActivation::Closed);
        }
        if self.is_activated(dialog_id) {
            return Ok(DeferredActivation::AlreadyActive);
        }

        let found = discovery
            .poll(sleeper, |_| {
                if self.is_closed() {
                    return Some(None);
                }
                host.dialog_root(dialog_id).map(Some)
            })
            .await
            .map_err(|timeout| DialogDiscoveryTimeout {
                dialog_id: dialog_id.to_string(),
                attempts: timeout.attempts,
            })?;
        let Some(root) = found else {
            log::debug!("dialog {dialog_id}: embed closed while waiting for it to mount");
            return Ok(DeferredActivation::Closed);
        };

        // Another request may have finished while this one was polling.
        if !self.activated.borrow_mut().insert(dialog_id.to_string()) {
            return Ok(DeferredActivation::AlreadyActive);
        }

        let mut assets = 0;
        for asset in host.deferred_assets(&root) {
            if asset.current_value.as_deref() == Some(asset.deferred_value.as_str()) {
                continue;
            }
            if let Err(err) =
                host.set_attribute(&asset.element, &asset.live_attribute, &asset.deferred_value)
            {
                log::warn!("deferred asset in {dialog_id} not activated: {err}");
                continue;
            }
            if asset.is_media {
                host.begin_media_load(&asset.element);
            }
            assets += 1;
        }
        log::debug!("dialog {dialog_id}: {assets} deferred asset(s) activated");
        Ok(DeferredActivation::Activated { assets })
    }

    /// Forgets every activation and refuses new ones, including those
    /// still waiting for their dialog to mount.
    pub fn close(&self) {
        self.closed.set(true);
        self.activated.borrow_mut().clear();
    }
}
