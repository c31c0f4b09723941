//! Background receive loop.
//!
//! Runs on its own OS thread for the lifetime of a connection: read one line,
//! decode it, fan it out to a registry snapshot, repeat. Subscribers run on
//! this thread, one after another, in registration order.

use std::any::Any;
use std::io::{self, BufRead};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de;
use tracing::{debug, error, info, warn};

use dart_duel_protocol::{codec, CodecError, Message};

use crate::config::MalformedFramePolicy;
use crate::correlator::PendingRequests;
use crate::error::ClientError;
use crate::registry::CallbackRegistry;

/// Why the receive loop stopped.
#[derive(Debug)]
pub enum BridgeExit {
    /// The peer closed the stream.
    Eof,
    /// The local side shut the socket down.
    Shutdown,
    /// Reading failed (including invalid UTF-8).
    ReadFailed(io::Error),
    /// A line was not valid JSON and the policy is [`MalformedFramePolicy::Disconnect`].
    Malformed(CodecError),
}

impl BridgeExit {
    /// `Ok` for an orderly end, the underlying error otherwise.
    pub fn into_result(self) -> Result<(), ClientError> {
        match self {
            BridgeExit::Eof | BridgeExit::Shutdown => Ok(()),
            BridgeExit::ReadFailed(e) => Err(ClientError::Transport(e)),
            BridgeExit::Malformed(e) => Err(e.into()),
        }
    }
}

pub(crate) struct MessageBridge<R> {
    reader: R,
    registry: Arc<CallbackRegistry>,
    pending: Arc<PendingRequests>,
    policy: MalformedFramePolicy,
    shutdown: Arc<AtomicBool>,
}

impl<R: BufRead> MessageBridge<R> {
    pub(crate) fn new(
        reader: R,
        registry: Arc<CallbackRegistry>,
        pending: Arc<PendingRequests>,
        policy: MalformedFramePolicy,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            reader,
            registry,
            pending,
            policy,
            shutdown,
        }
    }

    /// Run until the stream ends, then fail whatever requests are still pending.
    pub(crate) fn run(mut self) -> BridgeExit {
        let exit = self.pump();
        let abandoned = self.pending.close_all();

        match &exit {
            BridgeExit::Eof => info!(abandoned, "server closed the connection"),
            BridgeExit::Shutdown => debug!(abandoned, "message bridge stopped"),
            BridgeExit::ReadFailed(e) => error!(error = %e, abandoned, "read failed; message bridge stopped"),
            BridgeExit::Malformed(e) => error!(error = %e, abandoned, "malformed frame; message bridge stopped"),
        }
        exit
    }

    fn pump(&mut self) -> BridgeExit {
        let mut line = String::new();

        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) if self.shutdown.load(Ordering::SeqCst) => return BridgeExit::Shutdown,
                Ok(0) => return BridgeExit::Eof,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) if self.shutdown.load(Ordering::SeqCst) => return BridgeExit::Shutdown,
                Err(e) => return BridgeExit::ReadFailed(e),
            }

            let raw = codec::trim_line_ending(&line);
            if raw.trim().is_empty() {
                continue;
            }
            debug!(frame = raw, "received frame");

            let message = match codec::decode(raw) {
                Ok(message) => message,
                Err(e) => match self.policy {
                    MalformedFramePolicy::Skip => {
                        warn!(error = %e, frame = raw, "skipping malformed frame");
                        continue;
                    }
                    MalformedFramePolicy::Disconnect => return BridgeExit::Malformed(e),
                },
            };

            self.dispatch(&message);
        }
    }

    fn dispatch(&self, message: &Message) {
        match message {
            Message::Unrecognized(value) => {
                warn!(frame = %value, "ignoring frame that is neither a response nor an event");
                return;
            }
            Message::MalformedResponse { id, reason } => {
                let error = ClientError::Decoding(de::Error::custom(format!(
                    "response to {id}: {reason}"
                )));
                let failed = self.pending.fail(*id, error);
                warn!(%id, reason = %reason, failed, "malformed response");
                return;
            }
            Message::Response(_) | Message::Event(_) => {}
        }

        for handler in self.registry.snapshot() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(message))) {
                warn!(panic = panic_message(&*payload), "subscriber panicked");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic payload>"
    }
}
