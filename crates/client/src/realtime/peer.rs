use std::collections::HashMap;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;

use super::{CloseInfo, Connection, Payload, RealtimeError, SocketEvent};
use crate::lock;
use crate::schema::Schema;

/// A socket event tagged with the peer it came from. `peer` is `None` only
/// for the close reported by [`PeerSocketService::destroy`].
#[derive(Debug)]
pub struct PeerEvent<T> {
    pub peer: Option<String>,
    pub event: SocketEvent<T>,
}

/// Many named connections, one per peer, reached through a signalling
/// server at `{base_url}/{peer_id}`.
pub struct PeerSocketService<T> {
    base_url: String,
    schema: Option<Schema<T>>,
    events: mpsc::UnboundedSender<PeerEvent<T>>,
    connections: Mutex<HashMap<String, Connection>>,
}

impl<T> PeerSocketService<T>
where
    T: DeserializeOwned + Serialize + Send + 'static,
{
    pub fn new(
        base_url: impl Into<String>,
        schema: Option<Schema<T>>,
    ) -> (Self, mpsc::UnboundedReceiver<PeerEvent<T>>) {
        let (events, rx) = mpsc::unbounded_channel();
        let service = Self {
            base_url: base_url.into(),
            schema,
            events,
            connections: Mutex::new(HashMap::new()),
        };
        (service, rx)
    }

    fn peer_url(&self, peer_id: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(peer_id)
        )
    }

    pub async fn connect(&self, peer_id: &str) -> Result<(), RealtimeError> {
        {
            let mut connections = lock(&self.connections);
            if connections.get(peer_id).is_some_and(Connection::is_open) {
                return Err(RealtimeError::AlreadyConnected(peer_id.to_string()));
            }
            connections.remove(peer_id);
        }

        let events = self.events.clone();
        let peer = peer_id.to_string();
        let connection = Connection::open(&self.peer_url(peer_id), self.schema, move |event| {
            let _ = events.send(PeerEvent {
                peer: Some(peer.clone()),
                event,
            });
        })
        .await?;
        tracing::debug!(peer = %peer_id, "Peer connected");
        lock(&self.connections).insert(peer_id.to_string(), connection);
        Ok(())
    }

    /// Send to one peer, or to every open peer when `peer_id` is `None`.
    pub fn send(&self, payload: Payload<T>, peer_id: Option<&str>) -> Result<(), RealtimeError> {
        let connections = lock(&self.connections);
        if !connections.values().any(Connection::is_open) {
            return Err(RealtimeError::NotConnected);
        }
        let message = payload.into_message()?;

        match peer_id {
            Some(peer_id) => match connections.get(peer_id) {
                Some(connection) if connection.is_open() => connection.send(message),
                _ => Err(RealtimeError::PeerNotConnected(peer_id.to_string())),
            },
            None => {
                for connection in connections.values().filter(|c| c.is_open()) {
                    connection.send(message.clone())?;
                }
                Ok(())
            }
        }
    }

    /// Close one peer. Safe to call repeatedly or for unknown peers; every
    /// call reports a [`SocketEvent::Close`] for that peer.
    pub fn close(&self, peer_id: &str) {
        let removed = lock(&self.connections).remove(peer_id);
        if let Some(connection) = removed {
            connection.close();
        }
        self.emit(Some(peer_id), SocketEvent::Close(CloseInfo::manual("manual-close")));
    }

    /// Close every peer connection.
    pub fn destroy(&self) {
        let drained: Vec<_> = lock(&self.connections).drain().collect();
        for (_, connection) in drained {
            connection.close();
        }
        self.emit(None, SocketEvent::Close(CloseInfo::manual("manual-close-all")));
    }

    /// With a peer id, whether that peer is open; otherwise whether any is.
    pub fn is_connected(&self, peer_id: Option<&str>) -> bool {
        let connections = lock(&self.connections);
        match peer_id {
            Some(peer_id) => connections.get(peer_id).is_some_and(Connection::is_open),
            None => connections.values().any(Connection::is_open),
        }
    }

    fn emit(&self, peer: Option<&str>, event: SocketEvent<T>) {
        let _ = self.events.send(PeerEvent {
            peer: peer.map(str::to_string),
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_ids_are_escaped_into_the_url() {
        let (service, _rx) = PeerSocketService::<serde_json::Value>::new("ws://signal.local/peers/", None);
        assert_eq!(service.peer_url("crane 7"), "ws://signal.local/peers/crane%207");
    }
}
