//! Per-connection dispatch loop.
//!
//! Reads one request frame at a time, decodes it, runs the resolved handler
//! and writes the response, if any, before reading the next frame. A read
//! failure (EOF, reset) ends the loop quietly; decode, handler and encode
//! failures end it with a `DispatchError`.

use crate::error::DispatchError;
use crate::protocol::{read_request, Request, Serializable};
use crate::registry::HandlerRegistry;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

/// Serve requests on `stream` until the peer goes away or a fatal condition
/// occurs. `processed` counts requests handed to a handler.
pub async fn handle_connection<S>(
    mut stream: S,
    registry: &HandlerRegistry,
    processed: &AtomicU64,
) -> Result<(), DispatchError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let (kind, frame) = match read_request(&mut stream).await {
            Ok(read) => read,
            Err(e) => {
                trace!(error = %e, "Connection closed");
                return Ok(());
            }
        };

        let request = Request::decode(kind, &frame)?;
        trace!(kind, correlation_id = request.correlation_id(), "Dispatching request");

        let handler = registry.resolve(kind);
        processed.fetch_add(1, Ordering::Relaxed);

        if let Some(response) = handler.handle(&request)? {
            let bytes = response.bytes()?;
            if let Err(e) = stream.write_all(&bytes).await {
                debug!(error = %e, "Failed to write response");
                return Ok(());
            }
        }
    }
}
