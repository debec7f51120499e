//! Mock round server for integration tests.
//!
//! Provides a WebSocket server that can:
//! - Refuse the first N handshakes (dropping the TCP stream)
//! - Answer `{"action":"ping"}` with `{"type":"pong"}`
//! - Push frames to every open session
//! - Close every open session
//! - Record received messages and request paths

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message};

#[derive(Debug, Clone)]
enum Push {
    Text(String),
    Close,
}

#[derive(Default)]
struct Recorded {
    /// TCP connections accepted, including refused ones.
    connections: u32,
    /// Sessions that completed the handshake and are still open.
    open_sessions: u32,
    paths: Vec<String>,
    messages: Vec<String>,
}

pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    push_tx: broadcast::Sender<Push>,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockWsServer {
    pub async fn start() -> Self {
        Self::start_refusing(0).await
    }

    /// Start a server that drops the first `refuse` connections before the
    /// WebSocket handshake.
    pub async fn start_refusing(refuse: u32) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (push_tx, _) = broadcast::channel::<Push>(64);

        let recorded_clone = recorded.clone();
        let push_clone = push_tx.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        let seen = {
                            let mut rec = recorded_clone.lock().await;
                            rec.connections += 1;
                            rec.connections
                        };
                        if seen <= refuse {
                            drop(stream);
                            continue;
                        }
                        tokio::spawn(handle_connection(
                            stream,
                            recorded_clone.clone(),
                            push_clone.subscribe(),
                        ));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            push_tx,
            recorded,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/ws/arena", self.addr)
    }

    pub async fn connection_count(&self) -> u32 {
        self.recorded.lock().await.connections
    }

    pub async fn open_sessions(&self) -> u32 {
        self.recorded.lock().await.open_sessions
    }

    /// Request targets of completed handshakes (e.g. `/ws/arena?symbol=BTCUSDT`).
    pub async fn request_paths(&self) -> Vec<String> {
        self.recorded.lock().await.paths.clone()
    }

    pub async fn received_messages(&self) -> Vec<String> {
        self.recorded.lock().await.messages.clone()
    }

    /// Wait until `count` sessions are open.
    pub async fn wait_for_sessions(&self, count: u32) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.open_sessions().await < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("sessions did not open in time");
    }

    /// Wait until a received message contains `needle`.
    pub async fn wait_for_message(&self, needle: &str) -> String {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(msg) = self
                    .received_messages()
                    .await
                    .into_iter()
                    .find(|m| m.contains(needle))
                {
                    return msg;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("message not received in time")
    }

    /// Send a text frame to every open session.
    pub fn push(&self, frame: serde_json::Value) {
        let _ = self.push_tx.send(Push::Text(frame.to_string()));
    }

    pub fn push_raw(&self, text: &str) {
        let _ = self.push_tx.send(Push::Text(text.to_string()));
    }

    /// Close every open session from the server side.
    pub fn close_all(&self) {
        let _ = self.push_tx.send(Push::Close);
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    recorded: Arc<Mutex<Recorded>>,
    mut push_rx: broadcast::Receiver<Push>,
) {
    let mut path = String::new();
    let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        path = req.uri().to_string();
        Ok(resp)
    };
    let ws_stream = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {e}");
            return;
        }
    };

    {
        let mut rec = recorded.lock().await;
        rec.paths.push(path);
        rec.open_sessions += 1;
    }

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    recorded.lock().await.messages.push(text.clone());

                    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&text) {
                        if parsed.get("action") == Some(&serde_json::json!("ping")) {
                            let pong = serde_json::json!({ "type": "pong" });
                            let _ = write.send(Message::Text(pong.to_string())).await;
                        }
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },

            push = push_rx.recv() => match push {
                Ok(Push::Text(text)) => {
                    if write.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Ok(Push::Close) | Err(broadcast::error::RecvError::Closed) => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
            },
        }
    }

    recorded.lock().await.open_sessions -= 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockWsServer::start().await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        server.shutdown().await;
    }
}
