//! # Venue Engine
//!
//! A simulated electronic trading venue: order ingress, per-ticker matching,
//! and a synthetic price feed over length-prefixed TCP/UDP framing.
//!
//! ## Architecture
//!
//! - [`framing`] — length-prefixed message I/O over a rotating read buffer,
//!   shared by stream and datagram transports.
//! - [`session`] — trader identity and the registry mapping a trader to
//!   their egress channel.
//! - [`router`] — buckets inbound orders by ticker and drives each
//!   [`book::OrderBook`] through `add` then `match`.
//! - [`book`] — the per-ticker price ladder, matching, and fill generation.
//! - [`dispatch`] — groups fills by trader and fans them out to egress.
//! - [`price_feed`] — timer-driven synthetic price broadcast.
//! - [`control`] — command-to-handler dispatch for the price feed.
//! - [`model`] / [`codec`] — wire entities and the pluggable serializer.
//! - [`config`] — process-wide settings loaded from TOML and environment.
//! - [`error`] — one error enum per subsystem.
//! - [`server`] — binds every socket and wires the above into running
//!   tasks.
//!
//! Two binaries ship alongside the library: `venue-server` runs the venue,
//! `venue-trader` is a minimal client that sends synthetic orders and
//! prints fills and price ticks.

pub mod book;
pub mod codec;
pub mod config;
pub mod control;
pub mod dispatch;
pub mod error;
pub mod framing;
pub mod model;
pub mod price_feed;
pub mod router;
pub mod server;
pub mod session;
