//! Types and building blocks shared by the Cubed client and server: the
//! player state model, the binary packet codec, the concurrent player-state
//! store and the length-prefixed frame transport.

use serde::{Deserialize, Serialize};

pub mod math;
pub mod protocol;
pub mod store;
pub mod transport;

pub use math::Vec2;
pub use protocol::{ClientPacket, PacketType, ProtocolError, ServerPacket};
pub use store::PlayerStateStore;

pub const DEFAULT_PORT: u16 = 8192;
pub const PLAYER_SPEED: f32 = 150.0;
pub const FRICTION: f32 = 10.0;
pub const PLAYER_SIZE: f32 = 50.0;
pub const SPAWN_POSITION: Vec2 = Vec2::new(50.0, 50.0);

/// Identifier the server assigns to a connection on accept. Stable for the
/// life of the connection.
pub type ConnectionId = u32;

/// Replicated state of one player. Always sent and stored whole.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerData {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl PlayerData {
    pub fn new(position: Vec2, velocity: Vec2) -> Self {
        Self { position, velocity }
    }

    pub fn at_spawn() -> Self {
        Self::new(SPAWN_POSITION, Vec2::ZERO)
    }
}
