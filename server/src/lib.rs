//! # Checkers Game Server Library
//!
//! This library implements the authoritative server for networked multiplayer
//! checkers. Clients speak a line-based text protocol over TCP: commands such
//! as `NEW`, `JOIN`, `MOVE` and `SPECTATE` go in, `OK`/`ERROR` acknowledgements
//! and pushed `STATUS` lines come back.
//!
//! ## Architecture
//!
//! ### Single-Writer Event Loop
//! Every command from every connection is funneled through one bounded channel
//! into a single coordinator task, which runs each handler to completion before
//! reading the next event. All game, player and spectator tables are owned by
//! that task, so there is no shared-state locking anywhere in the server and
//! commands from one client are processed strictly in submission order.
//!
//! ### Per-Session Tasks
//! Each accepted connection gets a reader task (splits lines into commands and
//! forwards them to the coordinator) and a writer task (drains the session's
//! bounded outbound queue onto the socket). The bounded queues provide
//! backpressure in both directions: a flooding client blocks on the inbound
//! channel, and a slow-reading client blocks the coordinator's enqueue rather
//! than growing memory without bound.
//!
//! ## Module Organization
//!
//! - [`session`]: connection lifecycle, line framing, outbound queues
//! - [`lobby`]: the per-game aggregate binding rules state to seats and
//!   spectators, plus game-id generation
//! - [`coordinator`]: the event loop and one handler per protocol command
//! - [`network`]: the TCP listener that assembles the above

pub mod coordinator;
pub mod lobby;
pub mod network;
pub mod session;
