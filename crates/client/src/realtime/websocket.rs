use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;

use super::{CloseInfo, Connection, ConnectionState, Payload, RealtimeError, SocketEvent};
use crate::lock;
use crate::schema::Schema;

/// A single WebSocket connection with typed inbound messages.
pub struct WebSocketService<T> {
    schema: Option<Schema<T>>,
    events: mpsc::UnboundedSender<SocketEvent<T>>,
    connection: Mutex<Option<Connection>>,
    connecting: AtomicBool,
}

impl<T> WebSocketService<T>
where
    T: DeserializeOwned + Serialize + Send + 'static,
{
    /// Create the service and the receiver its events are delivered on.
    pub fn new(schema: Option<Schema<T>>) -> (Self, mpsc::UnboundedReceiver<SocketEvent<T>>) {
        let (events, rx) = mpsc::unbounded_channel();
        let service = Self {
            schema,
            events,
            connection: Mutex::new(None),
            connecting: AtomicBool::new(false),
        };
        (service, rx)
    }

    /// Open a socket to `url`. Connecting to a different target first closes
    /// the current socket.
    pub async fn connect(&self, url: &str) -> Result<(), RealtimeError> {
        let previous = {
            let mut current = lock(&self.connection);
            if current.as_ref().is_some_and(|c| c.is_open() && c.url == url) {
                tracing::warn!(%url, "WebSocket already connected");
                return Err(RealtimeError::AlreadyConnected(url.to_string()));
            }
            current.take()
        };
        if let Some(previous) = previous.filter(Connection::is_open) {
            previous.close();
            self.emit(SocketEvent::Close(CloseInfo::manual("manual-close")));
        }

        if self.connecting.swap(true, Ordering::SeqCst) {
            return Err(RealtimeError::AlreadyConnected(url.to_string()));
        }
        // Cleared on drop so a cancelled handshake does not wedge the service.
        let guard = ConnectingGuard(&self.connecting);
        let events = self.events.clone();
        let opened = Connection::open(url, self.schema, move |event| {
            let _ = events.send(event);
        })
        .await;
        drop(guard);

        match opened {
            Ok(connection) => {
                *lock(&self.connection) = Some(connection);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "WebSocket connection failed");
                Err(e)
            }
        }
    }

    pub fn send(&self, payload: Payload<T>) -> Result<(), RealtimeError> {
        let connection = lock(&self.connection);
        let connection = connection.as_ref().ok_or(RealtimeError::NotConnected)?;
        if !connection.is_open() {
            return Err(RealtimeError::NotConnected);
        }
        connection.send(payload.into_message()?)
    }

    /// Close the socket. Safe to call repeatedly; every call reports a
    /// [`SocketEvent::Close`].
    pub fn close(&self) {
        if let Some(connection) = lock(&self.connection).take() {
            connection.close();
        }
        self.emit(SocketEvent::Close(CloseInfo::manual("manual-close")));
    }

    pub fn state(&self) -> ConnectionState {
        match lock(&self.connection).as_ref() {
            Some(connection) => connection.state(),
            None if self.connecting.load(Ordering::SeqCst) => ConnectionState::Connecting,
            None => ConnectionState::Disconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    fn emit(&self, event: SocketEvent<T>) {
        let _ = self.events.send(event);
    }
}

struct ConnectingGuard<'a>(&'a AtomicBool);

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
