//! Line-delimited JSON protocol spoken with the game server.
//!
//! Each frame is one JSON value on one line, UTF-8, terminated by `\n`.
//! Outbound frames are [`Command`]s; inbound frames decode into the closed
//! sum type [`Message`]:
//!
//! - [`Message::Response`]: answers a correlated request (`id`, `ok`, `body`?, `message`?)
//! - [`Message::Event`]: server push (`event`, `body`)
//! - [`Message::MalformedResponse`]: a UUID `id` whose other fields are mistyped
//! - [`Message::Unrecognized`]: valid JSON of any other shape
//!
//! # Example
//!
//! ```
//! use dart_duel_protocol::{codec, Command, CorrelationId, Message};
//! use serde_json::json;
//!
//! let id = CorrelationId::generate();
//! let request = Command::new("login", json!({"username": "alice", "password": "secret1"}))
//!     .unwrap()
//!     .with_id(id);
//! let line = codec::encode(&request).unwrap();
//! assert!(!line.contains('\n'));
//!
//! let reply = codec::decode(&format!("{{\"id\":\"{id}\",\"ok\":true}}")).unwrap();
//! assert_eq!(reply.correlation_id(), Some(id));
//!
//! let event = codec::decode(r#"{"event":"newUserOnline","body":"bob"}"#).unwrap();
//! assert!(matches!(event, Message::Event(_)));
//! ```

pub mod codec;
pub mod message;

pub use dart_duel_types as types;

pub use codec::{decode, decode_value, encode, encode_line_into, CodecError};
pub use message::{Command, CorrelationId, Event, Message, Response};
