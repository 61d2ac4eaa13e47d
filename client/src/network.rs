//! Client side of the TCP transport.
//!
//! The connection runs on a tokio runtime that the frame loop does not
//! control. Received frames are handed to a [`PacketHandler`] on that runtime;
//! sends from the frame loop are queued and written by a dedicated task.

use log::{debug, info, warn};
use shared::transport::{read_frame, write_frame, FrameError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{self, Sender};
use tokio::task::JoinHandle;

/// Updates the client may have queued for the server before new ones are
/// dropped. Each update supersedes the previous one.
const OUTBOUND_QUEUE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    FailedToConnect,
}

impl ConnectionStatus {
    /// A new connect request is accepted from these states.
    pub fn can_connect(self) -> bool {
        matches!(
            self,
            ConnectionStatus::Disconnected | ConnectionStatus::FailedToConnect
        )
    }
}

/// Receives whole packets from the server, on a network thread.
///
/// Deliveries and the disconnect notification never overlap, and nothing is
/// delivered once [`TcpClientTransport::disconnect`] returns. Implementations
/// must not call back into the transport.
pub trait PacketHandler: Send + Sync {
    fn on_data_received(&self, bytes: &[u8]);

    /// Called once when an established connection ends.
    fn on_disconnected(&self) {}
}

/// What the sync loop needs from a transport.
pub trait ClientTransport {
    fn status(&self) -> ConnectionStatus;

    /// Fire and forget. Dropped when not connected.
    fn send(&self, bytes: Vec<u8>);
}

struct ConnectionInner {
    status: ConnectionStatus,
    outbound: Option<Sender<Vec<u8>>>,
    /// Bumped on every connect or disconnect so a superseded connection task
    /// cannot overwrite the state of a newer one.
    generation: u64,
    task: Option<JoinHandle<()>>,
}

#[derive(Clone)]
struct SharedConnection {
    inner: Arc<Mutex<ConnectionInner>>,
    /// Held while a frame is handed to the handler. Taken before `inner`.
    delivery: Arc<Mutex<()>>,
}

impl SharedConnection {
    fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ConnectionInner {
                status: ConnectionStatus::Disconnected,
                outbound: None,
                generation: 0,
                task: None,
            })),
            delivery: Arc::new(Mutex::new(())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_delivery(&self) -> MutexGuard<'_, ()> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands `frame` to the handler unless the connection it came from has
    /// been superseded. Returns false when the frame was discarded.
    fn deliver(&self, generation: u64, handler: &dyn PacketHandler, frame: &[u8]) -> bool {
        let _delivery = self.lock_delivery();
        if self.lock().generation != generation {
            return false;
        }
        handler.on_data_received(frame);
        true
    }

    /// Records the outcome of a connect attempt. Returns false when the
    /// attempt was superseded and should be abandoned.
    fn attach(&self, generation: u64, outbound: Sender<Vec<u8>>) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        inner.status = ConnectionStatus::Connected;
        inner.outbound = Some(outbound);
        true
    }

    fn fail(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation == generation {
            inner.status = ConnectionStatus::FailedToConnect;
        }
    }

    fn detach(&self, generation: u64) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        inner.status = ConnectionStatus::Disconnected;
        inner.outbound = None;
        inner.task = None;
        true
    }
}

pub struct TcpClientTransport {
    runtime: Handle,
    handler: Arc<dyn PacketHandler>,
    connection: SharedConnection,
}

impl TcpClientTransport {
    pub fn new(runtime: Handle, handler: Arc<dyn PacketHandler>) -> Self {
        Self {
            runtime,
            handler,
            connection: SharedConnection::new(),
        }
    }

    /// Starts connecting to `address` in the background. Returns false and
    /// does nothing if already connecting or connected.
    pub fn connect(&self, address: &str) -> bool {
        let mut inner = self.connection.lock();
        if !inner.status.can_connect() {
            return false;
        }
        if inner.status == ConnectionStatus::FailedToConnect {
            inner.status = ConnectionStatus::Disconnected;
        }

        inner.generation += 1;
        inner.status = ConnectionStatus::Connecting;
        info!("Connecting to {}...", address);

        let task = self.runtime.spawn(run_connection(
            address.to_string(),
            inner.generation,
            self.connection.clone(),
            Arc::clone(&self.handler),
        ));
        inner.task = Some(task);
        true
    }

    /// Drops the connection without waiting for queued packets. A frame
    /// being delivered at this moment finishes first; later ones are dropped.
    pub fn disconnect(&self) {
        let task = {
            let _delivery = self.connection.lock_delivery();
            let mut inner = self.connection.lock();
            if inner.status == ConnectionStatus::Disconnected {
                return;
            }
            inner.generation += 1;
            inner.status = ConnectionStatus::Disconnected;
            inner.outbound = None;
            inner.task.take()
        };

        if let Some(task) = task {
            task.abort();
        }
        info!("Disconnected from server");
        self.handler.on_disconnected();
    }
}

impl ClientTransport for TcpClientTransport {
    fn status(&self) -> ConnectionStatus {
        self.connection.lock().status
    }

    fn send(&self, bytes: Vec<u8>) {
        let inner = self.connection.lock();
        if let Some(outbound) = &inner.outbound {
            match outbound.try_send(bytes) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => debug!("Send queue full, update dropped"),
                Err(TrySendError::Closed(_)) => debug!("Connection writer already closed"),
            }
        }
    }
}

impl Drop for TcpClientTransport {
    fn drop(&mut self) {
        if let Some(task) = self.connection.lock().task.take() {
            task.abort();
        }
    }
}

async fn run_connection(
    address: String,
    generation: u64,
    connection: SharedConnection,
    handler: Arc<dyn PacketHandler>,
) {
    let stream = match TcpStream::connect(&address).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Failed to connect to {}: {}", address, e);
            connection.fail(generation);
            return;
        }
    };
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not disable Nagle: {}", e);
    }

    let (mut reader, mut writer) = stream.into_split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Vec<u8>>(OUTBOUND_QUEUE_LEN);
    if !connection.attach(generation, outbound_tx) {
        return;
    }
    info!("Connected to {}", address);

    // Ends when the outbound sender is dropped on detach or disconnect.
    tokio::spawn(async move {
        while let Some(bytes) = outbound_rx.recv().await {
            if let Err(e) = write_frame(&mut writer, &bytes).await {
                debug!("Write to server failed: {}", e);
                break;
            }
        }
    });

    loop {
        match read_frame(&mut reader).await {
            Ok(frame) => {
                if !connection.deliver(generation, handler.as_ref(), &frame) {
                    return;
                }
            }
            Err(FrameError::Closed) => {
                info!("Server closed the connection");
                break;
            }
            Err(e) => {
                warn!("Connection to server lost: {}", e);
                break;
            }
        }
    }

    if connection.detach(generation) {
        handler.on_disconnected();
    }
}
