//! # Snake Arena Server Library
//!
//! Authoritative server for a two-player snake arena on a shared toroidal
//! grid. Clients are thin input devices: they send direction intents and
//! teleport requests, and the server computes all movement, collisions and
//! resource spawning, streaming the full state back every tick.
//!
//! ## Module Organization
//!
//! - [`grid`] — toroidal coordinate wrapping and random cell placement.
//! - [`game`] — the simulation engine: one [`game::advance_tick`] call per
//!   timer fire, plus teleport and match-outcome rules.
//! - [`room`] — one match instance: two client slots, phase machine
//!   (`waiting → playing → over`), tick task handle.
//! - [`registry`] — the process-wide code-to-room map behind a single
//!   mutex-guarded handle, and every operation the protocol exposes on it.
//! - [`network`] — WebSocket accept loop and per-connection dispatcher for
//!   the JSON message protocol.
//!
//! ## Concurrency Model
//!
//! One task per connection drains its socket; one task per playing room
//! drives its tick timer. Everything they touch lives behind the registry
//! mutex, so each message handler or tick runs to completion before the
//! next one starts and no game state needs its own lock. State broadcasts
//! go over per-connection unbounded channels and are fire-and-forget; a
//! slow client is never throttled or specially dropped.

pub mod game;
pub mod grid;
pub mod network;
pub mod registry;
pub mod room;
