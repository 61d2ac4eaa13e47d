//! Client half of the replication protocol.
//!
//! [`SyncState`] is written by the network thread as packets arrive and read
//! by the frame loop. [`ClientSyncLoop`] runs once per rendered frame: it
//! moves the local player and reports the result to the server.

use crate::game::{LocalPlayer, MovementSettings};
use crate::input::{sample_intent, KeyboardState};
use crate::network::{ClientTransport, ConnectionStatus, PacketHandler};
use log::{debug, info};
use shared::{ClientPacket, ConnectionId, PlayerData, PlayerStateStore, ServerPacket};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// What the client has learned from the server: its own id and a mirror of
/// every other player.
#[derive(Debug, Default)]
pub struct SyncState {
    local_id: Mutex<Option<ConnectionId>>,
    remote: PlayerStateStore,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn local_id(&self) -> Option<ConnectionId> {
        *self.local_id.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the mirrored remote players. Never contains the local id.
    pub fn remote_players(&self) -> HashMap<ConnectionId, PlayerData> {
        self.remote.snapshot()
    }

    /// Forgets the session. The next handshake assigns a fresh id.
    pub fn reset(&self) {
        *self.local_id.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.remote.clear();
    }

    pub fn apply(&self, packet: ServerPacket) {
        match packet {
            ServerPacket::Connect { assigned_id } => {
                *self.local_id.lock().unwrap_or_else(PoisonError::into_inner) = Some(assigned_id);
                // A snapshot may have beaten the handshake here.
                self.remote.remove(assigned_id);
                info!("Connected to server! Assigned ID = {}", assigned_id);
            }
            ServerPacket::Update { mut players } => {
                if let Some(id) = self.local_id() {
                    players.remove(&id);
                }
                self.remote.replace_all(players);
            }
        }
    }
}

impl PacketHandler for SyncState {
    fn on_data_received(&self, bytes: &[u8]) {
        match ServerPacket::decode(bytes) {
            Ok(packet) => self.apply(packet),
            Err(e) => debug!("Dropping packet from server: {}", e),
        }
    }

    fn on_disconnected(&self) {
        self.reset();
    }
}

pub struct ClientSyncLoop<T: ClientTransport> {
    player: LocalPlayer,
    state: Arc<SyncState>,
    transport: T,
}

impl<T: ClientTransport> ClientSyncLoop<T> {
    pub fn new(transport: T, state: Arc<SyncState>, settings: MovementSettings) -> Self {
        Self {
            player: LocalPlayer::new(settings),
            state,
            transport,
        }
    }

    /// Samples input, simulates `dt` seconds, and sends the resulting state
    /// if connected. The local player keeps moving while offline.
    pub fn frame(&mut self, keys: &impl KeyboardState, dt: f32) {
        let intent = sample_intent(keys);
        self.player.simulate(intent, dt);

        if self.transport.status() != ConnectionStatus::Connected {
            return;
        }
        self.transport.send(ClientPacket::Update(self.player.data).encode());
    }

    pub fn local_player(&self) -> &LocalPlayer {
        &self.player
    }

    pub fn local_player_mut(&mut self) -> &mut LocalPlayer {
        &mut self.player
    }

    pub fn remote_players(&self) -> HashMap<ConnectionId, PlayerData> {
        self.state.remote_players()
    }

    pub fn local_id(&self) -> Option<ConnectionId> {
        self.state.local_id()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.transport.status()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}
