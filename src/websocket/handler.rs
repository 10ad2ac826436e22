use std::sync::Arc;
use std::time::Duration;
use axum::{
    extract::{State, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::Receiver;
use tokio::time::{interval_at, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{ReceivedMessage, SessionError};
use crate::state::AppState;
use crate::websocket::msg_change_handler::handle_change_message;
use crate::websocket::msg_join_handler::handle_join_message;
use crate::websocket::msg_leave_handler::handle_leave_message;
use crate::websocket::msg_ping_handler::handle_ping_message;
use crate::ws::outbox::{Outbound, Outbox};
use crate::ws::session::Session;

/// Removes the connection from the registry when the connection task ends,
/// however it ends.
struct ConnectionGuard {
    app: Arc<AppState>,
    connection_id: String,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Some((document_id, _)) = self.app.registry.evict(&self.connection_id) {
            warn!("Evicted connection {} from document {} on teardown", self.connection_id, document_id);
        }
        let open = self.app.connection_closed();
        info!("WebSocket connection {} terminated ({} open)", self.connection_id, open);
    }
}

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app): State<Arc<AppState>>,
) -> Response {
    debug!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, app))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, app: Arc<AppState>) {

    // Generate unique connection ID to identify this client
    let connection_id = Uuid::new_v4().to_string();
    let open = app.connection_opened();
    info!("WebSocket connection established with connection_id: {} ({} open)", connection_id, open);

    let _guard = ConnectionGuard {
        app: app.clone(),
        connection_id: connection_id.clone(),
    };

    let (sender, receiver) = socket.split();
    let (outbox, outbound_rx) = Outbox::channel(&connection_id);
    let session = Session::new(outbox);

    // One writer per connection keeps everything queued for it in order
    let mut send_task = tokio::spawn(write_outbound(sender, outbound_rx, connection_id.clone()));
    let mut recv_task = tokio::spawn(read_inbound(receiver, session, app.clone()));

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => {
            // The session is closed and every outbox dropped; let the writer flush
            if tokio::time::timeout(Duration::from_secs(1), &mut send_task).await.is_err() {
                send_task.abort();
            }
        }
    };
}

/// Read frames one at a time and dispatch them to the session.
async fn read_inbound(mut receiver: SplitStream<WebSocket>, mut session: Session, app: Arc<AppState>) {
    let period = app.config.heartbeat_interval();
    let timeout = app.config.heartbeat_timeout();
    let mut heartbeat = interval_at(Instant::now() + period, period);
    let mut last_seen = Instant::now();
    let outbox = session.outbox().clone();

    loop {
        tokio::select! {
            frame = receiver.next() => {
                let msg = match frame {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        let failure = SessionError::TransportFailure(e.to_string());
                        warn!("Connection {}: {}", session.connection_id(), failure);
                        break;
                    }
                    None => break,
                };
                last_seen = Instant::now();

                match msg {
                    Message::Text(text) => dispatch(&mut session, &app, &text).await,
                    Message::Binary(_) => {
                        session.report(&SessionError::protocol("Binary frames are not supported"));
                    }
                    Message::Close(_) => break,
                    // Pings are answered by the transport
                    Message::Ping(_) | Message::Pong(_) => {}
                }
            }
            _ = outbox.stalled() => {
                let failure = SessionError::TransportFailure("peer is not reading its messages".to_string());
                warn!("Connection {}: {}, closing", session.connection_id(), failure);
                break;
            }
            _ = heartbeat.tick() => {
                if last_seen.elapsed() >= timeout {
                    warn!("Connection {} silent for {:?}, closing", session.connection_id(), last_seen.elapsed());
                    break;
                }
                session.outbox().ping();
            }
        }
    }

    session.close(&app);
}

/// Parse one client message and run the matching session transition.
///
/// Every failure is reported to this connection only; none of them closes it.
async fn dispatch(session: &mut Session, app: &AppState, text: &str) {
    let received: ReceivedMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Failed to parse message on connection {}: {}", session.connection_id(), e);
            session.report(&SessionError::protocol(format!("Malformed message: {}", e)));
            return;
        }
    };

    let result = match received {
        ReceivedMessage::Join(join_msg) => handle_join_message(&join_msg, session, app).await,
        ReceivedMessage::Change(change_msg) => handle_change_message(change_msg, session, app),
        ReceivedMessage::Leave(leave_msg) => handle_leave_message(&leave_msg, session, app),
        ReceivedMessage::Ping(ping_msg) => handle_ping_message(&ping_msg, session),
    };

    if let Err(e) = result {
        session.report(&e);
    }
}

/// Drain the connection's outbound queue onto the socket.
async fn write_outbound(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound_rx: Receiver<Outbound>,
    connection_id: String,
) {
    while let Some(item) = outbound_rx.recv().await {
        let frame = match item {
            Outbound::Message(msg) => match serde_json::to_string(&msg) {
                Ok(text) => Message::Text(text),
                Err(e) => {
                    error!("Failed to serialize message for connection {}: {}", connection_id, e);
                    continue;
                }
            },
            Outbound::Ping => Message::Ping(Vec::new()),
        };

        if sender.send(frame).await.is_err() {
            debug!("Socket for connection {} closed while writing", connection_id);
            break;
        }
    }
    let _ = sender.close().await;
}
