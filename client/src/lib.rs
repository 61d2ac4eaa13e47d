//! # Cubed Client Library
//!
//! Client side of the Cubed replication protocol. The player moves a cube
//! locally; every frame the resulting position and velocity are sent to the
//! server, and the server's snapshots of everyone else are mirrored and drawn.
//!
//! The client never predicts or corrects remote players. What it draws for
//! them is exactly the last snapshot it received.
//!
//! ## Threads
//!
//! Two threads touch client state:
//! - the **frame thread** (macroquad) samples input, simulates the local
//!   player, sends it, and reads the remote mirror to draw it;
//! - a **tokio worker** reads frames off the socket and writes the mirror.
//!
//! The mirror is a [`shared::PlayerStateStore`], so the frame thread only
//! ever sees whole snapshots.
//!
//! ## Module Organization
//!
//! - [`game`]: local player movement
//! - [`input`]: keyboard sampling and the connect key
//! - [`network`]: connection state machine and TCP transport
//! - [`sync`]: handshake and snapshot handling, per-frame send
//! - [`rendering`]: macroquad drawing
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::game::MovementSettings;
//! use client::network::TcpClientTransport;
//! use client::sync::{ClientSyncLoop, SyncState};
//! use std::sync::Arc;
//!
//! # fn run(runtime: tokio::runtime::Handle) {
//! let state = Arc::new(SyncState::new());
//! let transport = TcpClientTransport::new(runtime, state.clone());
//! transport.connect("127.0.0.1:8192");
//!
//! let mut sync = ClientSyncLoop::new(transport, state, MovementSettings::default());
//! // once per frame:
//! sync.frame(&client::input::MacroquadKeyboard, 1.0 / 60.0);
//! # }
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
pub mod sync;
