//! WebSocket push channel
//!
//! Every connection receives every upload event as JSON: `{"error": ...}` or
//! a file descriptor. Clients may also send commands:
//!
//! - `{"upload": "<path>"}` starts an upload that lives only as long as the
//!   connection
//! - `{"cancel": "<path>"}` cancels an active upload
//!
//! Anything else gets an `{"error": ...}` reply on that connection only.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::ErrorBody;
use crate::ServiceState;

/// A command sent by a push-channel client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientCommand {
    Upload(String),
    Cancel(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("binary frames are not supported")]
    Binary,
}

pub fn parse_command(text: &str) -> Result<ClientCommand, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

#[tracing::instrument(skip_all)]
pub async fn handler(ws: WebSocketUpgrade, State(state): State<ServiceState>) -> Response {
    ws.on_upgrade(move |socket| serve(socket, state))
}

async fn serve(socket: WebSocket, state: ServiceState) {
    let (sender, receiver) = socket.split();
    serve_connection(sender, receiver, state).await
}

/// Pump events out and commands in until either side hangs up.
async fn serve_connection<S, R>(mut sender: S, mut receiver: R, state: ServiceState)
where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    // Uploads started over this connection hang off this token
    let connection = state.shutdown_token().child_token();
    let mut events = state.events().subscribe();
    tracing::info!(listeners = state.events().subscriber_count(), "push channel connected");

    loop {
        tokio::select! {
            _ = connection.cancelled() => break,
            event = events.recv() => {
                let Some(event) = event else { break };
                if send_json(&mut sender, &event).await.is_err() {
                    break;
                }
            }
            frame = receiver.next() => {
                let reply = match frame {
                    Some(Ok(Message::Text(text))) => handle_text(&state, &connection, &text).await,
                    Some(Ok(Message::Binary(_))) => Some(ProtocolError::Binary.to_string()),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => None,
                    Some(Err(err)) => {
                        tracing::debug!("push channel read failed: {err}");
                        break;
                    }
                };
                if let Some(error) = reply {
                    if send_json(&mut sender, &ErrorBody { error }).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    connection.cancel();
    let _ = sender.close().await;
    tracing::info!("push channel disconnected");
}

/// Act on one client frame. Returns an error meant for this client only.
async fn handle_text(
    state: &ServiceState,
    connection: &CancellationToken,
    text: &str,
) -> Option<String> {
    match parse_command(text) {
        Ok(ClientCommand::Upload(path)) => {
            // Failures are broadcast as events, this client included
            let _ = state.uploader().start(&path, connection.child_token()).await;
            None
        }
        Ok(ClientCommand::Cancel(path)) => {
            if state.registry().cancel(&path) {
                None
            } else {
                Some(format!("no upload of {} is in progress", path))
            }
        }
        Err(err) => {
            tracing::debug!("rejected push channel frame: {err}");
            Some(err.to_string())
        }
    }
}

async fn send_json<S, T>(sender: &mut S, value: &T) -> Result<(), ()>
where
    S: futures::Sink<Message> + Unpin,
    T: Serialize,
{
    let text = match serde_json::to_string(value) {
        Ok(text) => text,
        Err(err) => {
            tracing::error!("failed to encode push message: {err}");
            return Ok(());
        }
    };
    sender.send(Message::Text(text)).await.map_err(|_| ())
}
