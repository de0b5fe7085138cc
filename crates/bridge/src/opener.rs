use crate::error::HostError;
use crate::host::{ActivationSignal, HostDocument};

/// One way of asking the host page to open a dialog.
///
/// `Ok(true)` means the request was delivered, `Ok(false)` that this opener
/// had nothing to deliver it to. Delivery is not confirmation that the
/// dialog actually opened.
pub trait DialogOpener<H: HostDocument> {
    fn name(&self) -> &'static str;

    fn open(&self, host: &H, dialog_id: &str, trigger: Option<&H::Element>)
    -> Result<bool, HostError>;
}

/// Dispatches the full press/release/click sequence at the trigger element.
#[derive(Debug, Default, Copy, Clone)]
pub struct EventSequenceOpener;

impl<H: HostDocument> DialogOpener<H> for EventSequenceOpener {
    fn name(&self) -> &'static str {
        "event-sequence"
    }

    fn open(
        &self,
        host: &H,
        _dialog_id: &str,
        trigger: Option<&H::Element>,
    ) -> Result<bool, HostError> {
        let Some(trigger) = trigger else {
            return Ok(false);
        };
        for signal in ActivationSignal::SEQUENCE {
            host.dispatch(trigger, signal)?;
        }
        Ok(true)
    }
}

/// Calls the page's global open-by-id function when it has one.
#[derive(Debug, Default, Copy, Clone)]
pub struct GlobalFunctionOpener;

impl<H: HostDocument> DialogOpener<H> for GlobalFunctionOpener {
    fn name(&self) -> &'static str {
        "global-function"
    }

    fn open(
        &self,
        host: &H,
        dialog_id: &str,
        _trigger: Option<&H::Element>,
    ) -> Result<bool, HostError> {
        host.open_dialog_by_id(dialog_id)
    }
}

/// Primary then secondary opener.
pub fn default_openers<H: HostDocument>() -> Vec<Box<dyn DialogOpener<H>>> {
    vec![Box::new(EventSequenceOpener), Box::new(GlobalFunctionOpener)]
}
