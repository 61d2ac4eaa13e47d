//! Authoritative replication loop.
//!
//! The loop owns the server's [`PlayerStateStore`]. Connection tasks feed it
//! through [`ConnectionHandler`] while the tick task broadcasts a full
//! snapshot every interval. Both sides touch the store only through its lock,
//! and never hold it across encoding or sending.
//!
//! Client reports are applied as-is: "authoritative" means the server owns
//! the broadcast, not that it validates movement.

use crate::config::ServerConfig;
use crate::network::{ConnectionHandler, Transport};
use log::{debug, info};
use shared::{ClientPacket, ConnectionId, PlayerStateStore, ServerPacket};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::{interval, MissedTickBehavior};

/// How often the tick task reports its progress at debug level.
const STATS_EVERY_TICKS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoopError {
    #[error("replication loop cannot start from the {0:?} state")]
    CannotStart(LoopState),
}

pub struct ReplicationLoop {
    store: Arc<PlayerStateStore>,
    transport: Arc<dyn Transport>,
    tick_interval: Duration,
    keep_disconnected: bool,
    state: Mutex<LoopState>,
    stop_signal: Notify,
    ticks: AtomicU64,
}

impl ReplicationLoop {
    pub fn new(transport: Arc<dyn Transport>, config: &ServerConfig) -> Self {
        Self {
            store: Arc::new(PlayerStateStore::new()),
            transport,
            tick_interval: config.tick_interval(),
            keep_disconnected: config.keep_disconnected,
            state: Mutex::new(LoopState::Idle),
            stop_signal: Notify::new(),
            ticks: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<PlayerStateStore> {
        &self.store
    }

    pub fn state(&self) -> LoopState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Moves `Idle` to `Running`. Any other starting state is an error.
    pub fn start(&self) -> Result<(), LoopError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match *state {
            LoopState::Idle => {
                *state = LoopState::Running;
                Ok(())
            }
            other => Err(LoopError::CannotStart(other)),
        }
    }

    /// Moves to `Stopped` and wakes a running [`run`](Self::run). Idempotent.
    pub fn stop(&self) {
        let previous = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *state, LoopState::Stopped)
        };
        if previous != LoopState::Stopped {
            info!("Replication loop stopping after {} ticks", self.ticks());
            self.stop_signal.notify_one();
        }
    }

    /// Starts the loop and ticks until [`stop`](Self::stop) is called.
    ///
    /// Pacing is best effort: missed ticks are skipped, not replayed.
    pub async fn run(&self) -> Result<(), LoopError> {
        self.start()?;
        info!(
            "Replication loop running, tick every {:?}",
            self.tick_interval
        );

        let mut tick_interval = interval(self.tick_interval);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    if self.state() != LoopState::Running {
                        break;
                    }
                    self.tick();
                }
                _ = self.stop_signal.notified() => break,
            }
        }

        Ok(())
    }

    /// One replication step: snapshot, encode, broadcast to everyone.
    pub fn tick(&self) {
        let players = self.store.snapshot();
        let player_count = players.len();

        self.transport.broadcast(ServerPacket::Update { players }.encode());

        let ticks = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        if ticks % STATS_EVERY_TICKS == 0 {
            debug!("Tick {}: {} players replicated", ticks, player_count);
        }
    }
}

impl ConnectionHandler for ReplicationLoop {
    fn on_client_connected(&self, id: ConnectionId) {
        info!("Client connected! ID = {}", id);
        let handshake = ServerPacket::Connect { assigned_id: id }.encode();
        self.transport.send(id, handshake);
    }

    fn on_client_disconnected(&self, id: ConnectionId) {
        info!("Client disconnected! ID = {}", id);
        if !self.keep_disconnected {
            self.store.remove(id);
        }
    }

    fn on_data_received(&self, id: ConnectionId, bytes: &[u8]) {
        match ClientPacket::decode(bytes) {
            Ok(ClientPacket::Update(data)) => self.store.upsert(id, data),
            Err(e) => debug!("Dropping packet from client {}: {}", id, e),
        }
    }
}
