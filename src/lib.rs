//! Dart duel client (workspace facade crate).
//!
//! Re-exports the workspace crates under short names so front ends depend on
//! one package:
//!
//! - [`types`]: wire vocabulary (command names, event tags, defaults)
//! - [`protocol`]: frame codec and message types
//! - [`client`]: connection, message bridge, correlated calls, subscriptions

pub use dart_duel_client as client;
pub use dart_duel_protocol as protocol;
pub use dart_duel_types as types;
