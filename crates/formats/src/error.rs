use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("configuration document must be a JSON object")]
    NotAnObject,

    #[error("duplicate station key: {0}")]
    DuplicateStation(String),

    #[error("empty station key for dialog {dialog_id}")]
    EmptyStationKey { dialog_id: String },
}
