use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("document operation failed: {0}")]
    Dom(String),

    #[error("host script call failed: {0}")]
    Script(String),
}

/// The dialog never mounted within the discovery budget. Non-fatal: the
/// click is dropped and the dialog, if it appears later, keeps its
/// deferred assets unloaded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("dialog {dialog_id} not found after {attempts} attempt(s)")]
pub struct DialogDiscoveryTimeout {
    pub dialog_id: String,
    pub attempts: u32,
}
