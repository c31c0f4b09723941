use std::io;

use dart_duel_protocol::CodecError;

/// Errors surfaced by the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server address could not be resolved or reached.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Socket read/write failure. Fatal to the connection.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// The request body has no JSON representation. Nothing was written.
    #[error("request is not encodable: {0}")]
    Encoding(#[source] serde_json::Error),

    /// A frame or a response body did not have the expected shape.
    #[error("malformed message: {0}")]
    Decoding(#[source] serde_json::Error),

    /// The server answered `ok: false`.
    #[error("{0}")]
    RemoteRejected(String),

    /// The connection ended before a response arrived, or was already closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// The worker runtime for a blocking call could not be started.
    #[error("failed to start worker runtime: {0}")]
    Runtime(#[source] io::Error),
}

impl ClientError {
    /// Server-provided message if this is a rejected request.
    pub fn rejection_message(&self) -> Option<&str> {
        match self {
            ClientError::RemoteRejected(message) => Some(message),
            _ => None,
        }
    }

    /// True for failures that end the connection.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClientError::Connect { .. }
                | ClientError::Transport(_)
                | ClientError::ConnectionClosed
        )
    }
}

impl From<CodecError> for ClientError {
    fn from(value: CodecError) -> Self {
        match value {
            CodecError::Encoding(e) => ClientError::Encoding(e),
            CodecError::Decoding(e) => ClientError::Decoding(e),
        }
    }
}
