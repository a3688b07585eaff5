//! WebSocket wrappers for realtime traffic.
//!
//! Each live socket is driven by one spawned task that multiplexes outbound
//! frames and inbound messages with `tokio::select!`. Everything the socket
//! observes is reported as a [`SocketEvent`] on an unbounded channel handed
//! out when the service is created.

mod peer;
mod websocket;

pub use peer::{PeerEvent, PeerSocketService};
pub use websocket::WebSocketService;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::lock;
use crate::schema::{Schema, SchemaError};

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Close code reported when the peer vanished without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;
pub const NORMAL_CLOSURE: u16 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("already connected to {0}")]
    AlreadyConnected(String),

    #[error("socket is not connected")]
    NotConnected,

    #[error("no open connection to peer {0}")]
    PeerNotConnected(String),

    #[error("handshake failed: {0}")]
    Handshake(#[source] tungstenite::Error),

    #[error("transport error: {0}")]
    Transport(#[source] tungstenite::Error),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Something to send. Structured data is serialized as a JSON text frame.
#[derive(Debug, Clone)]
pub enum Payload<T> {
    Text(String),
    Binary(Vec<u8>),
    Data(T),
}

impl<T: Serialize> Payload<T> {
    fn into_message(self) -> Result<Message, RealtimeError> {
        Ok(match self {
            Payload::Text(text) => Message::Text(text),
            Payload::Binary(bytes) => Message::Binary(bytes),
            Payload::Data(value) => Message::Text(serde_json::to_string(&value)?),
        })
    }
}

/// A received message. Text frames become [`Inbound::Data`] when the service
/// has a schema; binary frames always pass through untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound<T> {
    Text(String),
    Binary(Vec<u8>),
    Data(T),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

impl CloseInfo {
    fn manual(reason: &str) -> Self {
        Self {
            code: NORMAL_CLOSURE,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum SocketEvent<T> {
    Open,
    Message(Inbound<T>),
    Error(RealtimeError),
    Close(CloseInfo),
}

/// Handle to one live socket and its driver task.
struct Connection {
    url: String,
    outbound: mpsc::UnboundedSender<Message>,
    state: Arc<Mutex<ConnectionState>>,
    closed: Arc<AtomicBool>,
}

impl Connection {
    async fn open<T, F>(url: &str, schema: Option<Schema<T>>, emit: F) -> Result<Self, RealtimeError>
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(SocketEvent<T>) + Send + 'static,
    {
        let (socket, _response) = connect_async(url).await.map_err(RealtimeError::Handshake)?;
        tracing::info!(%url, "WebSocket connected");

        let state = Arc::new(Mutex::new(ConnectionState::Open));
        let closed = Arc::new(AtomicBool::new(false));
        let (outbound, rx) = mpsc::unbounded_channel();
        emit(SocketEvent::Open);
        tokio::spawn(drive(
            socket,
            rx,
            schema,
            emit,
            Arc::clone(&state),
            Arc::clone(&closed),
        ));

        Ok(Self {
            url: url.to_string(),
            outbound,
            state,
            closed,
        })
    }

    fn state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    fn send(&self, message: Message) -> Result<(), RealtimeError> {
        if !self.is_open() {
            return Err(RealtimeError::NotConnected);
        }
        self.outbound
            .send(message)
            .map_err(|_| RealtimeError::NotConnected)
    }

    /// Ask the driver to send a close frame. The driver will not report a
    /// close of its own afterwards.
    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        *lock(&self.state) = ConnectionState::Closed;
        let _ = self.outbound.send(Message::Close(None));
    }
}

async fn drive<T, F>(
    socket: Socket,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    schema: Option<Schema<T>>,
    emit: F,
    state: Arc<Mutex<ConnectionState>>,
    closed: Arc<AtomicBool>,
) where
    T: DeserializeOwned,
    F: Fn(SocketEvent<T>),
{
    let (mut sink, mut stream) = socket.split();
    let mut close_info = CloseInfo {
        code: ABNORMAL_CLOSURE,
        reason: "remote-close".to_string(),
    };

    loop {
        tokio::select! {
            out = outbound.recv() => match out {
                Some(message) => {
                    let closing = matches!(message, Message::Close(_));
                    if let Err(e) = sink.send(message).await {
                        if !closing {
                            emit(SocketEvent::Error(RealtimeError::Transport(e)));
                        }
                        break;
                    }
                    if closing {
                        break;
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => emit(decode_text(text, schema.as_ref())),
                Some(Ok(Message::Binary(bytes))) => emit(SocketEvent::Message(Inbound::Binary(bytes))),
                Some(Ok(Message::Close(frame))) => {
                    if let Some(frame) = frame {
                        close_info = CloseInfo {
                            code: u16::from(frame.code),
                            reason: frame.reason.into_owned(),
                        };
                    }
                    break;
                }
                Some(Ok(_)) => {
                    // Ping / Pong / raw frames are handled by tungstenite.
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "WebSocket receive error");
                    emit(SocketEvent::Error(RealtimeError::Transport(e)));
                    break;
                }
                None => break,
            }
        }
    }

    *lock(&state) = ConnectionState::Closed;
    if !closed.swap(true, Ordering::SeqCst) {
        tracing::info!(code = close_info.code, reason = %close_info.reason, "WebSocket closed by remote");
        emit(SocketEvent::Close(close_info));
    }
}

fn decode_text<T: DeserializeOwned>(text: String, schema: Option<&Schema<T>>) -> SocketEvent<T> {
    match schema {
        None => SocketEvent::Message(Inbound::Text(text)),
        Some(schema) => match schema.parse_str(&text) {
            Ok(value) => SocketEvent::Message(Inbound::Data(value)),
            Err(e) => SocketEvent::Error(e.into()),
        },
    }
}
