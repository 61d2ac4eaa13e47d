//! Binary packet codec shared by client and server.
//!
//! Every packet is a little-endian `u16` tag followed by a fixed layout
//! payload. Fields are packed without padding:
//!
//! | packet                  | payload                                        |
//! |-------------------------|------------------------------------------------|
//! | `Connect`               | `u32` assigned connection id                   |
//! | `Update` client→server  | `PlayerData` (4 × `f32`)                       |
//! | `Update` server→client  | `u32` count, then count × (`u32` id, `PlayerData`) |
//!
//! The same tag is used for both directions of `Update`, so decoding needs to
//! know which side sent the bytes: [`ClientPacket`] for client→server and
//! [`ServerPacket`] for server→client. Messages are expected to arrive whole;
//! the transport is responsible for framing.

use crate::{ConnectionId, PlayerData};
use bincode::Options;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use thiserror::Error;

/// Size of the packet tag on the wire.
pub const TAG_LEN: usize = 2;
/// Size of one encoded `PlayerData`.
pub const PLAYER_DATA_LEN: usize = 16;
/// Size of one `(id, PlayerData)` entry in a server update.
pub const PLAYER_ENTRY_LEN: usize = 4 + PLAYER_DATA_LEN;

/// Wire discriminant. Values are fixed so that independently built clients
/// and servers agree; `0` is reserved and never emitted.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    Connect = 1,
    Update = 2,
}

impl PacketType {
    pub fn tag(self) -> u16 {
        self as u16
    }

    pub fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            1 => Some(PacketType::Connect),
            2 => Some(PacketType::Update),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown packet tag {0}")]
    UnknownTag(u16),

    #[error("buffer ended before the end of the packet")]
    Truncated,

    #[error("{0:?} packet is not valid in this direction")]
    UnexpectedPacket(PacketType),

    #[error("malformed payload: {0}")]
    Codec(#[source] bincode::Error),
}

/// Packets sent from a client to the server.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClientPacket {
    /// The sender's full local state.
    Update(PlayerData),
}

/// Packets sent from the server to a client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerPacket {
    /// Handshake telling a client the id the server assigned to it.
    Connect { assigned_id: ConnectionId },
    /// Full snapshot of every known player.
    Update {
        players: HashMap<ConnectionId, PlayerData>,
    },
}

impl ClientPacket {
    pub fn packet_type(&self) -> PacketType {
        match self {
            ClientPacket::Update(_) => PacketType::Update,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(TAG_LEN + PLAYER_DATA_LEN);
        buf.extend_from_slice(&self.packet_type().tag().to_le_bytes());
        match self {
            ClientPacket::Update(data) => write_player(&mut buf, data),
        }
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = bytes;
        match read_tag(&mut reader)? {
            PacketType::Update => Ok(ClientPacket::Update(read(&mut reader)?)),
            other => Err(ProtocolError::UnexpectedPacket(other)),
        }
    }
}

impl ServerPacket {
    pub fn packet_type(&self) -> PacketType {
        match self {
            ServerPacket::Connect { .. } => PacketType::Connect,
            ServerPacket::Update { .. } => PacketType::Update,
        }
    }

    /// Always succeeds. A snapshot too large for the `u32` count is cut to
    /// the first `u32::MAX` entries so the count and payload stay consistent.
    pub fn encode(&self) -> Vec<u8> {
        let capacity = match self {
            ServerPacket::Connect { .. } => TAG_LEN + 4,
            ServerPacket::Update { players } => TAG_LEN + 4 + players.len() * PLAYER_ENTRY_LEN,
        };
        let mut buf = Vec::with_capacity(capacity);
        buf.extend_from_slice(&self.packet_type().tag().to_le_bytes());

        match self {
            ServerPacket::Connect { assigned_id } => {
                buf.extend_from_slice(&assigned_id.to_le_bytes());
            }
            ServerPacket::Update { players } => {
                let count = u32::try_from(players.len()).unwrap_or(u32::MAX);
                buf.extend_from_slice(&count.to_le_bytes());
                for (id, data) in players.iter().take(count as usize) {
                    buf.extend_from_slice(&id.to_le_bytes());
                    write_player(&mut buf, data);
                }
            }
        }

        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = bytes;
        match read_tag(&mut reader)? {
            PacketType::Connect => Ok(ServerPacket::Connect {
                assigned_id: read(&mut reader)?,
            }),
            PacketType::Update => {
                let count: u32 = read(&mut reader)?;
                // The count comes off the wire; never reserve more than the
                // remaining bytes could hold.
                let capacity = (count as usize).min(reader.len() / PLAYER_ENTRY_LEN);
                let mut players = HashMap::with_capacity(capacity);
                for _ in 0..count {
                    let id: ConnectionId = read(&mut reader)?;
                    let data: PlayerData = read(&mut reader)?;
                    players.insert(id, data);
                }
                Ok(ServerPacket::Update { players })
            }
        }
    }
}

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
}

fn write_player(buf: &mut Vec<u8>, data: &PlayerData) {
    for value in [
        data.position.x,
        data.position.y,
        data.velocity.x,
        data.velocity.y,
    ] {
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

fn read<T: DeserializeOwned>(reader: &mut &[u8]) -> Result<T, ProtocolError> {
    wire_options().deserialize_from(reader).map_err(|err| {
        let truncated = matches!(
            err.as_ref(),
            bincode::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof
        );
        if truncated {
            ProtocolError::Truncated
        } else {
            ProtocolError::Codec(err)
        }
    })
}

fn read_tag(reader: &mut &[u8]) -> Result<PacketType, ProtocolError> {
    let tag: u16 = read(reader)?;
    PacketType::from_tag(tag).ok_or(ProtocolError::UnknownTag(tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;

    fn player(px: f32, py: f32, vx: f32, vy: f32) -> PlayerData {
        PlayerData {
            position: Vec2::new(px, py),
            velocity: Vec2::new(vx, vy),
        }
    }

    #[test]
    fn test_tags_are_stable() {
        assert_eq!(PacketType::Connect.tag(), 1);
        assert_eq!(PacketType::Update.tag(), 2);
        assert_eq!(PacketType::from_tag(0), None);
        assert_eq!(PacketType::from_tag(2), Some(PacketType::Update));
    }

    #[test]
    fn test_connect_wire_layout() {
        let bytes = ServerPacket::Connect { assigned_id: 7 }.encode();
        assert_eq!(bytes, vec![1, 0, 7, 0, 0, 0]);
    }

    #[test]
    fn test_client_update_wire_layout() {
        let data = player(1.0, -2.0, 0.5, 0.0);
        let bytes = ClientPacket::Update(data).encode();

        assert_eq!(bytes.len(), TAG_LEN + PLAYER_DATA_LEN);
        assert_eq!(&bytes[0..2], &[2, 0]);
        assert_eq!(&bytes[2..6], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[6..10], &(-2.0f32).to_le_bytes());
        assert_eq!(&bytes[10..14], &0.5f32.to_le_bytes());
        assert_eq!(&bytes[14..18], &0.0f32.to_le_bytes());
    }

    #[test]
    fn test_server_update_wire_layout() {
        let mut players = HashMap::new();
        players.insert(9, player(3.0, 4.0, 0.0, 0.0));
        let bytes = ServerPacket::Update { players }.encode();

        assert_eq!(bytes.len(), TAG_LEN + 4 + PLAYER_ENTRY_LEN);
        assert_eq!(&bytes[0..2], &[2, 0]);
        assert_eq!(&bytes[2..6], &1u32.to_le_bytes());
        assert_eq!(&bytes[6..10], &9u32.to_le_bytes());
        assert_eq!(&bytes[10..14], &3.0f32.to_le_bytes());
    }

    #[test]
    fn test_packets_roundtrip() {
        let mut players = HashMap::new();
        players.insert(1, player(0.0, 0.0, 1.0, 0.0));
        players.insert(2, player(5.0, 5.0, 0.0, 0.0));
        players.insert(u32::MAX, player(-1.5, 1e9, f32::MIN_POSITIVE, -0.0));

        let server_packets = vec![
            ServerPacket::Connect { assigned_id: 0 },
            ServerPacket::Connect {
                assigned_id: u32::MAX,
            },
            ServerPacket::Update {
                players: HashMap::new(),
            },
            ServerPacket::Update { players },
        ];
        for packet in server_packets {
            let bytes = packet.encode();
            assert_eq!(ServerPacket::decode(&bytes).unwrap(), packet);
        }

        let client_packet = ClientPacket::Update(player(10.0, 20.0, 1.0, 0.0));
        let bytes = client_packet.encode();
        assert_eq!(ClientPacket::decode(&bytes).unwrap(), client_packet);
    }

    #[test]
    fn test_large_snapshot_encodes_every_entry() {
        let players: HashMap<ConnectionId, PlayerData> = (0..5000)
            .map(|id| (id, player(id as f32, 0.0, 0.0, 1.0)))
            .collect();
        let packet = ServerPacket::Update { players };

        let bytes = packet.encode();

        assert_eq!(bytes.len(), TAG_LEN + 4 + 5000 * PLAYER_ENTRY_LEN);
        assert_eq!(&bytes[2..6], &5000u32.to_le_bytes());
        assert_eq!(ServerPacket::decode(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let bytes = [0xEF, 0xBE, 0, 0, 0, 0];
        assert!(matches!(
            ServerPacket::decode(&bytes),
            Err(ProtocolError::UnknownTag(0xBEEF))
        ));
        assert!(matches!(
            ClientPacket::decode(&[0, 0]),
            Err(ProtocolError::UnknownTag(0))
        ));
    }

    #[test]
    fn test_empty_and_short_buffers_rejected() {
        assert!(matches!(
            ServerPacket::decode(&[]),
            Err(ProtocolError::Truncated)
        ));
        assert!(matches!(
            ClientPacket::decode(&[2]),
            Err(ProtocolError::Truncated)
        ));

        let full = ClientPacket::Update(player(1.0, 2.0, 3.0, 4.0))
            .encode();
        assert!(matches!(
            ClientPacket::decode(&full[..full.len() - 1]),
            Err(ProtocolError::Truncated)
        ));

        let connect = ServerPacket::Connect { assigned_id: 3 }.encode();
        assert!(matches!(
            ServerPacket::decode(&connect[..4]),
            Err(ProtocolError::Truncated)
        ));
    }

    #[test]
    fn test_update_count_larger_than_payload() {
        let mut bytes = vec![2, 0];
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());

        assert!(matches!(
            ServerPacket::decode(&bytes),
            Err(ProtocolError::Truncated)
        ));
    }

    #[test]
    fn test_client_cannot_send_connect() {
        let bytes = ServerPacket::Connect { assigned_id: 4 }.encode();
        assert!(matches!(
            ClientPacket::decode(&bytes),
            Err(ProtocolError::UnexpectedPacket(PacketType::Connect))
        ));
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut bytes = ServerPacket::Connect { assigned_id: 12 }.encode();
        bytes.extend_from_slice(&[0xAA, 0xBB]);

        assert_eq!(
            ServerPacket::decode(&bytes).unwrap(),
            ServerPacket::Connect { assigned_id: 12 }
        );
    }
}
