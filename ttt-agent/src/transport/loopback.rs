//! In-process transport joining agents through channels.
//!
//! Each endpoint owns one inbox. Connecting two endpoints gives each side its
//! own [`ConnectionId`] for the link; a message sent on one side arrives in
//! the peer's inbox stamped with the peer's id for the same link, so the
//! receiver can answer on it. Messages pass through the MessagePack codec on
//! the way, as they would over a real wire.

use super::{Transport, TransportError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use ttt_types::{ConnectionId, Inbound, ProtocolMessage};

/// Receiving half of an endpoint.
pub type Inbox = mpsc::Receiver<Inbound<ProtocolMessage>>;

#[derive(Debug, Clone)]
struct Link {
    /// The peer's id for this link.
    remote_id: ConnectionId,
    /// The peer's inbox.
    peer: mpsc::Sender<Inbound<ProtocolMessage>>,
}

/// One side of the loopback network.
#[derive(Debug, Clone)]
pub struct LoopbackEndpoint {
    name: String,
    inbox: mpsc::Sender<Inbound<ProtocolMessage>>,
    links: Arc<DashMap<ConnectionId, Link>>,
}

impl LoopbackEndpoint {
    /// Create an endpoint whose inbox buffers up to `capacity` messages.
    pub fn new(name: &str, capacity: usize) -> (Self, Inbox) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let endpoint = Self {
            name: name.to_string(),
            inbox: tx,
            links: Arc::new(DashMap::new()),
        };
        (endpoint, rx)
    }

    /// Endpoint name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Link this endpoint with `peer`.
    ///
    /// Returns `(local, remote)`: this side's id for the link and the
    /// peer's id for it.
    pub fn connect(&self, peer: &LoopbackEndpoint) -> (ConnectionId, ConnectionId) {
        let local = ConnectionId::new(format!("{}->{}", self.name, peer.name));
        let remote = ConnectionId::new(format!("{}->{}", peer.name, self.name));

        self.links.insert(
            local.clone(),
            Link {
                remote_id: remote.clone(),
                peer: peer.inbox.clone(),
            },
        );
        peer.links.insert(
            remote.clone(),
            Link {
                remote_id: local.clone(),
                peer: self.inbox.clone(),
            },
        );

        tracing::debug!("Loopback link {} <-> {}", local, remote);
        (local, remote)
    }

    /// Drop this side of a link. The peer's side stays until it is dropped too.
    pub fn disconnect(&self, connection: &ConnectionId) {
        self.links.remove(connection);
    }
}

#[async_trait]
impl Transport for LoopbackEndpoint {
    async fn send(
        &self,
        connection: &ConnectionId,
        message: ProtocolMessage,
    ) -> Result<(), TransportError> {
        let link = self
            .links
            .get(connection)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TransportError::NotConnected(connection.clone()))?;

        let bytes = message.to_bytes()?;
        let decoded = ProtocolMessage::from_bytes(&bytes)?;

        link.peer
            .send(Inbound::new(decoded, link.remote_id))
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }

    fn has_connection(&self, connection: &ConnectionId) -> bool {
        self.links.contains_key(connection)
    }
}

/// One agent's view of a paired loopback network.
#[derive(Debug)]
pub struct LoopbackPeer {
    /// Transport to hand to the agent.
    pub endpoint: LoopbackEndpoint,
    /// Messages arriving for the agent.
    pub inbox: Inbox,
    /// This agent's id for the link to the other peer.
    pub connection_id: ConnectionId,
}

/// Builder for two directly linked endpoints.
#[derive(Debug, Clone, Copy)]
pub struct LoopbackNetwork;

impl LoopbackNetwork {
    /// Create two endpoints named `a` and `b`, already linked.
    pub fn pair(a: &str, b: &str, capacity: usize) -> (LoopbackPeer, LoopbackPeer) {
        let (endpoint_a, inbox_a) = LoopbackEndpoint::new(a, capacity);
        let (endpoint_b, inbox_b) = LoopbackEndpoint::new(b, capacity);
        let (conn_a, conn_b) = endpoint_a.connect(&endpoint_b);

        (
            LoopbackPeer {
                endpoint: endpoint_a,
                inbox: inbox_a,
                connection_id: conn_a,
            },
            LoopbackPeer {
                endpoint: endpoint_b,
                inbox: inbox_b,
                connection_id: conn_b,
            },
        )
    }
}
