//! One streaming channel per operation: send the request once, then only receive.

use crate::error::OperationError;
use crate::model::{OperationOutcome, OperationRequest, ProgressEvent, StatusMessage};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

/// Open `url`, send `request`, forward every inbound status to `on_progress` and resolve on
/// the terminal message.
///
/// The channel is closed before returning. A channel that ends without a terminal message
/// resolves as [`OperationError::Connection`].
pub(crate) async fn drive<F>(
    url: &str,
    connect_timeout: Duration,
    request: &OperationRequest,
    mut on_progress: F,
) -> OperationOutcome
where
    F: FnMut(ProgressEvent),
{
    let kind = request.kind();
    let payload = request
        .to_json()
        .map_err(|e| OperationError::Protocol(format!("failed to encode request: {e}")))?;

    let ws = match tokio::time::timeout(connect_timeout, connect_async(url)).await {
        Ok(Ok((ws, _))) => ws,
        Ok(Err(e)) => {
            warn!(%url, error = %e, "failed to open operation channel");
            return Err(OperationError::Connection(e.to_string()));
        }
        Err(_) => {
            warn!(%url, "timed out opening operation channel");
            return Err(OperationError::Connection(format!(
                "no connection after {}",
                humantime::format_duration(connect_timeout)
            )));
        }
    };
    let (mut sink, mut stream) = ws.split();

    if let Err(e) = sink.send(Message::Text(payload)).await {
        return Err(OperationError::Connection(e.to_string()));
    }
    debug!(%kind, "request sent");

    let outcome = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                let msg: StatusMessage = match serde_json::from_str(&text) {
                    Ok(msg) => msg,
                    Err(e) => break Err(OperationError::Protocol(e.to_string())),
                };
                on_progress(msg.event());
                if msg.completed {
                    break msg.into_outcome(kind);
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                break Err(OperationError::Connection(
                    "channel closed before the operation finished".into(),
                ))
            }
            // Ping/pong are answered by tungstenite; binary frames are not part of the protocol.
            Some(Ok(_)) => continue,
            Some(Err(e)) => break Err(OperationError::Connection(e.to_string())),
        }
    };

    let _ = sink.close().await;
    outcome
}
