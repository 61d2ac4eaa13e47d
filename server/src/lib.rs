//! # Cubed Replication Server
//!
//! Authoritative side of the Cubed state-synchronization protocol. The server
//! keeps the latest reported state of every connected player and broadcasts
//! the whole set to every client on a fixed tick.
//!
//! ## Module Organization
//!
//! ### Config Module (`config`)
//! Command-line settings: bind address, tick period, connection cap and
//! whether disconnected players keep being replicated.
//!
//! ### Client Manager Module (`client_manager`)
//! Connection registry: id assignment on accept, capacity enforcement and the
//! outbound queue of every connection.
//!
//! ### Network Module (`network`)
//! TCP accept loop and per-connection reader/writer tasks, plus the
//! [`network::Transport`] and [`network::ConnectionHandler`] seams between the
//! sockets and the protocol.
//!
//! ### Replication Module (`replication`)
//! The tick loop and the connect/disconnect/data handlers that maintain the
//! shared [`shared::PlayerStateStore`].
//!
//! ## Trust Model
//!
//! Clients report their own position and velocity and the server stores what
//! it is told. There is no bounds checking, plausibility test or anti-cheat.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let server = Server::bind(&ServerConfig::default()).await?;
//!     server
//!         .run_until(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod network;
pub mod replication;
