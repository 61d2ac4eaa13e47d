//! Registry of live connections for the replication server
//!
//! Assigns connection ids on accept, enforces the connection cap and keeps the
//! outbound queue of every connection so packets can be unicast or broadcast
//! without touching the socket from the caller's task.

use log::info;
use shared::ConnectionId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::Sender;

/// Encoded packet waiting to be framed and written to a socket. Shared so a
/// broadcast does not copy the bytes per connection.
pub type OutboundFrame = Arc<[u8]>;

/// Frames a connection may have queued before new ones are dropped. A reader
/// that falls this far behind only misses stale snapshots.
pub const OUTBOUND_QUEUE_LEN: usize = 8;

/// A live connection and the queue feeding its writer task
#[derive(Debug)]
pub struct Client {
    /// Id assigned by the server, stable for the life of the connection
    pub id: ConnectionId,
    /// Remote address, for logging
    pub addr: SocketAddr,
    pub connected_at: Instant,
    outbound: Sender<OutboundFrame>,
}

impl Client {
    pub fn new(id: ConnectionId, addr: SocketAddr, outbound: Sender<OutboundFrame>) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            outbound,
        }
    }
}

/// Tracks connected clients
///
/// Ids start at 1 and are never reused while the server runs.
pub struct ClientManager {
    clients: HashMap<ConnectionId, Client>,
    next_client_id: ConnectionId,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a new connection
    ///
    /// Returns None if the server is at capacity.
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        outbound: Sender<OutboundFrame>,
    ) -> Option<ConnectionId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id = self.next_client_id.wrapping_add(1).max(1);

        info!("Client {} connected from {}", client_id, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, outbound));

        Some(client_id)
    }

    /// Removes a client, dropping its outbound queue so its writer stops.
    /// Returns false if it was already gone.
    pub fn remove_client(&mut self, client_id: &ConnectionId) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!(
                "Client {} disconnected after {:.1}s",
                client.id,
                client.connected_at.elapsed().as_secs_f32()
            );
            true
        } else {
            false
        }
    }

    /// Outbound queue of one client
    pub fn sender(&self, client_id: ConnectionId) -> Option<Sender<OutboundFrame>> {
        self.clients
            .get(&client_id)
            .map(|client| client.outbound.clone())
    }

    /// Outbound queues of every client, for broadcasting outside the lock
    pub fn senders(&self) -> Vec<(ConnectionId, Sender<OutboundFrame>)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.outbound.clone()))
            .collect()
    }

    /// Drops every client; their writers finish once their queues drain.
    pub fn clear(&mut self) {
        self.clients.clear();
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
