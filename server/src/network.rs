//! Server network layer: TCP accept loop, per-connection tasks and the
//! transport handle the replication loop sends through.
//!
//! Every connection gets a reader task, which hands complete frames to the
//! [`ConnectionHandler`] as they arrive, and a writer task, which drains that
//! connection's outbound queue. Handlers therefore run on runtime worker
//! threads, concurrently with the tick task and with each other; ordering is
//! only guaranteed within a single connection.

use crate::client_manager::{ClientManager, OutboundFrame, OUTBOUND_QUEUE_LEN};
use crate::config::ServerConfig;
use crate::replication::ReplicationLoop;
use log::{debug, error, info, warn};
use shared::transport::{read_frame, write_frame, FrameError};
use shared::{ConnectionId, PlayerStateStore};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinSet;

/// Outbound side of the transport. Both calls queue and return immediately;
/// a packet for a connection whose queue is full is dropped.
pub trait Transport: Send + Sync {
    fn send(&self, id: ConnectionId, bytes: Vec<u8>);
    fn broadcast(&self, bytes: Vec<u8>);
}

/// Inbound side of the transport, invoked from connection tasks.
pub trait ConnectionHandler: Send + Sync {
    fn on_client_connected(&self, id: ConnectionId);
    fn on_client_disconnected(&self, id: ConnectionId);
    fn on_data_received(&self, id: ConnectionId, bytes: &[u8]);
}

/// Queues packets onto the writer tasks of registered connections
#[derive(Clone)]
pub struct TcpTransport {
    clients: Arc<Mutex<ClientManager>>,
}

impl TcpTransport {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: Arc::new(Mutex::new(ClientManager::new(max_clients))),
        }
    }

    pub fn connection_count(&self) -> usize {
        self.clients().len()
    }

    fn register(
        &self,
        addr: SocketAddr,
        outbound: Sender<OutboundFrame>,
    ) -> Option<ConnectionId> {
        self.clients().add_client(addr, outbound)
    }

    fn unregister(&self, id: ConnectionId) {
        self.clients().remove_client(&id);
    }

    fn close_all(&self) {
        self.clients().clear();
    }

    fn clients(&self) -> MutexGuard<'_, ClientManager> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for TcpTransport {
    fn send(&self, id: ConnectionId, bytes: Vec<u8>) {
        let sender = self.clients().sender(id);
        match sender {
            Some(sender) => enqueue(id, &sender, OutboundFrame::from(bytes)),
            None => debug!("Dropping packet for unknown client {}", id),
        }
    }

    fn broadcast(&self, bytes: Vec<u8>) {
        let frame = OutboundFrame::from(bytes);
        let senders = self.clients().senders();
        for (id, sender) in senders {
            enqueue(id, &sender, Arc::clone(&frame));
        }
    }
}

fn enqueue(id: ConnectionId, sender: &Sender<OutboundFrame>, frame: OutboundFrame) {
    match sender.try_send(frame) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => debug!("Client {} is not keeping up, frame dropped", id),
        Err(TrySendError::Closed(_)) => debug!("Client {} writer already closed", id),
    }
}

/// Replication server bound to a TCP listener
pub struct Server {
    listener: TcpListener,
    transport: TcpTransport,
    replication: Arc<ReplicationLoop>,
}

impl Server {
    pub async fn bind(config: &ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(config.bind_address()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let transport = TcpTransport::new(config.max_clients);
        let replication = Arc::new(ReplicationLoop::new(
            Arc::new(transport.clone()),
            config,
        ));

        Ok(Server {
            listener,
            transport,
            replication,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn store(&self) -> Arc<PlayerStateStore> {
        Arc::clone(self.replication.store())
    }

    /// Accepts connections and replicates until `shutdown` resolves.
    ///
    /// Shutdown stops the tick loop first, then drops every connection.
    /// Packets still queued at that point are not guaranteed to go out.
    pub async fn run_until<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let tick_task = {
            let replication = Arc::clone(&self.replication);
            tokio::spawn(async move {
                if let Err(e) = replication.run().await {
                    error!("Replication loop failed to start: {}", e);
                }
            })
        };

        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.accept(stream, addr, &mut connections),
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                },
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        if e.is_panic() {
                            error!("Connection task panicked: {}", e);
                        }
                    }
                },
                _ = &mut shutdown => break Ok(()),
            }
        };

        info!("Server shutting down");
        self.replication.stop();
        if let Err(e) = tick_task.await {
            error!("Tick task panicked: {}", e);
        }
        self.transport.close_all();
        connections.abort_all();

        result
    }

    fn accept(&self, stream: TcpStream, addr: SocketAddr, connections: &mut JoinSet<()>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_LEN);
        let Some(id) = self.transport.register(addr, outbound_tx) else {
            warn!("Rejecting connection from {}: server full", addr);
            return;
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle for client {}: {}", id, e);
        }
        let (reader, writer) = stream.into_split();

        connections.spawn(write_loop(id, writer, outbound_rx));
        self.replication.on_client_connected(id);

        let handler: Arc<dyn ConnectionHandler> = self.replication.clone();
        connections.spawn(read_loop(id, reader, handler, self.transport.clone()));
    }
}

async fn read_loop(
    id: ConnectionId,
    mut reader: OwnedReadHalf,
    handler: Arc<dyn ConnectionHandler>,
    transport: TcpTransport,
) {
    loop {
        match read_frame(&mut reader).await {
            Ok(frame) => handler.on_data_received(id, &frame),
            Err(FrameError::Closed) => break,
            Err(e) => {
                warn!("Closing client {}: {}", id, e);
                break;
            }
        }
    }

    transport.unregister(id);
    handler.on_client_disconnected(id);
}

async fn write_loop(
    id: ConnectionId,
    mut writer: OwnedWriteHalf,
    mut outbound: Receiver<OutboundFrame>,
) {
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = write_frame(&mut writer, &frame).await {
            debug!("Write to client {} failed: {}", id, e);
            break;
        }
    }
}
