use gloo_net::http::Request;
use streaming::{Transport, TransportError};

/// `fetch()` through gloo-net.
///
/// The body is read in one piece, so progress is reported once the bytes
/// are in, and only when the server sent a `content-length`.
#[derive(Debug, Default, Copy, Clone)]
pub struct GlooTransport;

impl Transport for GlooTransport {
    async fn fetch(
        &self,
        url: &str,
        progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<Vec<u8>, TransportError> {
        let resp = Request::get(url)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        if !resp.ok() {
            return Err(TransportError::Status {
                status: resp.status(),
            });
        }
        let total = resp
            .headers()
            .get("content-length")
            .and_then(|v| v.trim().parse::<u64>().ok());
        let bytes = resp
            .binary()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        progress(bytes.len() as u64, total);
        Ok(bytes)
    }
}
