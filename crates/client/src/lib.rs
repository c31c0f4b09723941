//! Client runtime for the dart duel game server.
//!
//! One [`Connection`] owns one TCP socket and one background thread (the
//! message bridge) that reads frames and hands them to subscribers. Commands
//! go out through a [`Session`], which can be cloned freely:
//!
//! - [`Session::call`] / [`Session::send`]: correlated request, resolved by the
//!   response carrying the same id
//! - [`Session::notify`]: fire-and-forget command
//! - [`Session::subscribe`] / [`Session::on_event`]: long-lived handlers,
//!   removed with [`Session::unsubscribe`]
//! - [`Session::call_blocking`] / [`run_blocking`]: the same from a thread
//!   without an async runtime
//!
//! Handlers run on the bridge thread, one after another, in registration
//! order. They must not block; a panicking handler is logged and skipped.
//!
//! # Example
//!
//! ```no_run
//! use dart_duel_client::{Connection, EventKind};
//!
//! fn main() -> Result<(), dart_duel_client::ClientError> {
//!     let conn = Connection::connect("localhost:5000")?;
//!     let session = conn.session();
//!
//!     session.on_new_user_online(|name| println!("{name} is online"));
//!     session.on_event(EventKind::StartGame, |body| println!("match: {body}"));
//!
//!     session.call_blocking("login", serde_json::json!({
//!         "username": "alice",
//!         "password": "secret1",
//!     }))?;
//!     conn.disconnect()
//! }
//! ```

mod blocking;
mod bridge;
mod commands;
mod config;
mod connection;
mod correlator;
mod error;
mod events;
mod registry;
mod session;
mod writer;

pub use dart_duel_protocol as protocol;
pub use dart_duel_types as types;

pub use blocking::run_blocking;
pub use bridge::BridgeExit;
pub use commands::ThrowDart;
pub use config::{ClientConfig, MalformedFramePolicy};
pub use connection::Connection;
pub use correlator::{PendingReply, PendingRequests};
pub use error::ClientError;
pub use events::presence_username;
pub use registry::{CallbackRegistry, Handler, SubscriptionId};
pub use session::Session;
pub use writer::FrameWriter;

pub use dart_duel_protocol::{Command, CorrelationId, Event, Message, Response};
pub use dart_duel_types::{ChallengeAnswer, CommandKind, EventKind};
