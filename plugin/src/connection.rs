//! WebSocket link to the Stream Deck host.

use crate::error::PluginError;
use crate::protocol::{HostCommand, HostEvent, Registration};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

type HostSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connect to the host, register this plugin instance and start the
/// reader and writer tasks.
///
/// Commands queued on `commands` are written to the socket; parsed events are
/// returned on the receiver. `shutdown` is cancelled when the host goes away.
pub async fn connect(
    port: u16,
    plugin_uuid: &str,
    register_event: &str,
    commands: mpsc::UnboundedReceiver<HostCommand>,
    shutdown: CancellationToken,
) -> Result<mpsc::UnboundedReceiver<HostEvent>, PluginError> {
    let url = format!("ws://127.0.0.1:{}", port);
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    let (mut write, read) = ws_stream.split();

    let registration = Registration {
        event: register_event,
        uuid: plugin_uuid,
    };
    write
        .send(Message::Text(serde_json::to_string(&registration)?.into()))
        .await?;
    info!(port, register_event, "Registered with host");

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    tokio::spawn(read_loop(read, event_tx, shutdown.clone()));
    tokio::spawn(write_loop(write, commands, shutdown));

    Ok(event_rx)
}

async fn read_loop(
    mut read: SplitStream<HostSocket>,
    events: mpsc::UnboundedSender<HostEvent>,
    shutdown: CancellationToken,
) {
    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<HostEvent>(text.as_str()) {
                Ok(event) => {
                    trace!(?event, "Host event");
                    if events.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, message = text.as_str(), "Ignoring unparseable host message"),
            },
            Ok(Message::Close(frame)) => {
                info!(?frame, "Host closed the connection");
                break;
            }
            // Pings are answered by tungstenite on the next write
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "WebSocket read failed");
                break;
            }
        }
    }

    shutdown.cancel();
}

async fn write_loop(
    mut write: SplitSink<HostSocket, Message>,
    mut commands: mpsc::UnboundedReceiver<HostCommand>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            command = commands.recv() => {
                let Some(command) = command else { break };
                let text = match serde_json::to_string(&command) {
                    Ok(text) => text,
                    Err(e) => {
                        error!(context = command.context(), error = %e, "Failed to encode command");
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    error!(error = %e, "WebSocket write failed");
                    shutdown.cancel();
                    break;
                }
            }
        }
    }

    if let Err(e) = write.close().await {
        debug!(error = %e, "WebSocket close failed");
    }
}
