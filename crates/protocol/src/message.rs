//! Message types for the line-delimited JSON protocol.
//!
//! Inbound frames are classified exactly once, at the codec boundary, into
//! [`Message`]. Nothing past the codec handles an untyped mapping except the
//! `body` payloads themselves.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use dart_duel_types::{EventKind, CORRELATION_FIELD, EVENT_FIELD, UNKNOWN_ERROR_MESSAGE};

use crate::codec::CodecError;

/// Identifier linking an outbound request to its response.
///
/// Random 128-bit (UUID v4); rendered hyphenated on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Mint a fresh id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for CorrelationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ============== Client -> Server ==============

/// Outbound command.
///
/// `id` is present only for correlated requests; `body` is omitted when null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub command: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub body: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CorrelationId>,
}

impl Command {
    /// Build an uncorrelated command.
    ///
    /// Fails with [`CodecError::Encoding`] if `body` cannot be represented as JSON.
    pub fn new(command: impl Into<String>, body: impl Serialize) -> Result<Self, CodecError> {
        let body = serde_json::to_value(body).map_err(CodecError::Encoding)?;
        Ok(Self {
            command: command.into(),
            body,
            id: None,
        })
    }

    /// Tag the command as a request expecting a response with `id`.
    pub fn with_id(mut self, id: CorrelationId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn is_request(&self) -> bool {
        self.id.is_some()
    }
}

// ============== Server -> Client ==============

/// Response to a correlated request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: CorrelationId,
    /// Missing `ok` counts as a failure.
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    pub fn success(id: CorrelationId, body: Option<Value>) -> Self {
        Self {
            id,
            ok: true,
            body,
            message: None,
        }
    }

    pub fn failure(id: CorrelationId, message: impl Into<String>) -> Self {
        Self {
            id,
            ok: false,
            body: None,
            message: Some(message.into()),
        }
    }

    /// Human-readable reason for a rejected request.
    pub fn rejection_message(&self) -> &str {
        self.message.as_deref().unwrap_or(UNKNOWN_ERROR_MESSAGE)
    }
}

/// Server-pushed event. Carries no correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event: String,
    #[serde(default)]
    pub body: Value,
}

impl Event {
    pub fn new(kind: EventKind, body: Value) -> Self {
        Self {
            event: kind.as_str().to_string(),
            body,
        }
    }

    /// Known kind of this event, if the tag is one the client understands.
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_tag(&self.event)
    }

    pub fn is(&self, kind: EventKind) -> bool {
        self.event == kind.as_str()
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Response(Response),
    Event(Event),
    /// Frame carrying a valid correlation id whose other fields do not fit a
    /// response. The request it names should fail rather than wait forever.
    MalformedResponse { id: CorrelationId, reason: String },
    /// Valid JSON that is neither a response nor an event.
    Unrecognized(Value),
}

impl Message {
    /// Classify a parsed JSON value.
    ///
    /// Objects carrying a correlation id are responses; objects carrying an
    /// event tag are events. A UUID `id` with mistyped fields is
    /// [`Message::MalformedResponse`]. A frame whose `id` is not a UUID is
    /// still read as an event if it has an event tag. Anything else (wrong
    /// field types, a non-object frame) is [`Message::Unrecognized`].
    pub fn from_value(value: Value) -> Self {
        let Some(map) = value.as_object() else {
            return Message::Unrecognized(value);
        };

        if let Some(raw_id) = map.get(CORRELATION_FIELD) {
            match Response::deserialize(&value) {
                Ok(response) => return Message::Response(response),
                Err(e) => {
                    if let Some(id) = raw_id.as_str().and_then(|s| s.parse().ok()) {
                        return Message::MalformedResponse {
                            id,
                            reason: e.to_string(),
                        };
                    }
                }
            }
        }

        if map.contains_key(EVENT_FIELD) {
            return match Event::deserialize(&value) {
                Ok(event) => Message::Event(event),
                Err(_) => Message::Unrecognized(value),
            };
        }

        Message::Unrecognized(value)
    }

    pub fn correlation_id(&self) -> Option<CorrelationId> {
        match self {
            Message::Response(r) => Some(r.id),
            Message::MalformedResponse { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn as_response(&self) -> Option<&Response> {
        match self {
            Message::Response(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Message::Event(e) => Some(e),
            _ => None,
        }
    }

    /// True if this is an event tagged `kind`.
    pub fn is_event(&self, kind: EventKind) -> bool {
        self.as_event().is_some_and(|e| e.is(kind))
    }
}

impl From<Response> for Message {
    fn from(value: Response) -> Self {
        Message::Response(value)
    }
}

impl From<Event> for Message {
    fn from(value: Event) -> Self {
        Message::Event(value)
    }
}
