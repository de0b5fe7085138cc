use thiserror::Error;

/// Failure of a single transport request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("failed to read response body: {0}")]
    Body(String),
}

impl TransportError {
    /// Whether repeating the same request could plausibly succeed.
    ///
    /// A resource that does not exist (404/410) or is refused outright
    /// (other 4xx) is not retried; timeouts, rate limiting, server errors
    /// and network failures are.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network(_) | TransportError::Body(_) => true,
            TransportError::Status { status } => {
                matches!(*status, 408 | 425 | 429 | 500..=599)
            }
        }
    }
}

/// Byte-level transfer of one URL.
///
/// `progress` receives `(loaded, total)` byte counts as the transfer
/// advances; `total` is `None` when the server did not announce a length.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn fetch(
        &self,
        url: &str,
        progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    async fn fetch(
        &self,
        url: &str,
        progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<Vec<u8>, TransportError> {
        (**self).fetch(url, progress).await
    }
}

impl<T: Transport + ?Sized> Transport for std::rc::Rc<T> {
    async fn fetch(
        &self,
        url: &str,
        progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<Vec<u8>, TransportError> {
        (**self).fetch(url, progress).await
    }
}

/// Integer percentage for a `(loaded, total)` report, or `None` when the
/// total is unknown.
pub fn percent(loaded: u64, total: Option<u64>) -> Option<u8> {
    let total = total.filter(|t| *t > 0)?;
    let pct = (loaded.min(total) as u128 * 100) / total as u128;
    Some(pct as u8)
}
