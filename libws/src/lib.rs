//! WebSocket wire layer.
//!
//! Serves one connection at a time on the port Wox passed on the command
//! line. All outbound traffic funnels through an unbounded channel drained
//! by a single send task, so frames are written one at a time no matter how
//! many tasks hold a [`WsWriter`]. Inbound frames are fanned out: every
//! received text frame is handed to the dispatch callback on its own task
//! so the read loop never blocks on handler work.

use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use uuid::Uuid;

use liblogger::Logger;

/// Cloneable handle for writing frames to the current connection.
#[derive(Clone)]
pub struct WsWriter {
    tx: UnboundedSender<String>,
}

impl WsWriter {
    pub fn new(tx: UnboundedSender<String>) -> Self {
        WsWriter { tx }
    }

    /// Writer plus the receiving end of its channel. The server drains the
    /// receiver into the socket; tests read it directly.
    pub fn pair() -> (WsWriter, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (WsWriter::new(tx), rx)
    }

    /// Queue one text frame. Fails only when the connection is gone.
    pub fn send_text(&self, frame: String) -> Result<(), String> {
        self.tx.send(frame).map_err(|_| "websocket closed".to_string())
    }
}

/// Accept WebSocket connections on `0.0.0.0:<port>` until the process
/// exits, dispatching every inbound text frame through `on_frame`.
pub async fn serve<F, Fut>(port: u16, on_frame: F) -> Result<(), String>
where
    F: Fn(WsWriter, String) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| format!("failed to bind port {}: {}", port, e))?;
    Logger::info(&Uuid::new_v4().to_string(), "start websocket server");

    loop {
        let (stream, _addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                Logger::error(&Uuid::new_v4().to_string(), &format!("accept failed: {}", e));
                continue;
            }
        };
        let socket = match accept_async(stream).await {
            Ok(socket) => socket,
            Err(e) => {
                Logger::error(
                    &Uuid::new_v4().to_string(),
                    &format!("websocket handshake failed: {}", e),
                );
                continue;
            }
        };
        run_connection(socket, &on_frame).await;
    }
}

async fn run_connection<F, Fut>(socket: WebSocketStream<TcpStream>, on_frame: &F)
where
    F: Fn(WsWriter, String) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let conn_trace = Uuid::new_v4().to_string();
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    // Log records are mirrored to Wox while this connection lives.
    Logger::register_frame_sender(tx.clone());
    let writer = WsWriter::new(tx);

    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        match received {
            Ok(Message::Text(frame)) => {
                tokio::spawn(on_frame(writer.clone(), frame));
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                Logger::error(&conn_trace, &format!("connection error: {}", e));
                break;
            }
        }
    }

    Logger::clear_frame_sender();
    Logger::info(&conn_trace, "connection closed");
    send_task.abort();
}
