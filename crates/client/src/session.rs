//! Cloneable handle to an open connection.

use std::net::TcpStream;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use dart_duel_protocol::{Command, CorrelationId, Event, Message};

use crate::blocking::run_blocking;
use crate::correlator::{one_shot_handler, PendingReply, PendingRequests};
use crate::error::ClientError;
use crate::registry::{CallbackRegistry, SubscriptionId};
use crate::writer::FrameWriter;

pub(crate) struct Shared {
    pub(crate) registry: Arc<CallbackRegistry>,
    pub(crate) pending: Arc<PendingRequests>,
    pub(crate) writer: FrameWriter<TcpStream>,
}

/// Sends commands and manages subscriptions on one connection.
///
/// Cheap to clone; all clones share the connection's registry, writer and
/// pending-request table. A `Session` does not keep the connection open:
/// once its [`Connection`](crate::Connection) is closed, requests fail with
/// [`ClientError::ConnectionClosed`] or [`ClientError::Transport`].
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    pub(crate) fn new(shared: Shared) -> Self {
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Send a correlated request and return its completion handle.
    ///
    /// The handle is registered before the request is written, so a response
    /// cannot outrun it. An unencodable `body` fails here with
    /// [`ClientError::Encoding`] and nothing is written or registered.
    pub async fn send(
        &self,
        command: &str,
        body: impl Serialize,
    ) -> Result<PendingReply, ClientError> {
        let id = CorrelationId::generate();
        let request = Command::new(command, body)?.with_id(id);

        let registry = &self.shared.registry;
        let pending = &self.shared.pending;
        let rx = pending.register(id)?;
        registry.insert(
            SubscriptionId::for_request(id),
            one_shot_handler(id, Arc::downgrade(registry), Arc::downgrade(pending)),
        );
        // Owns both entries from here on: dropping it (on a write error, or
        // when this future is cancelled mid-write) unregisters the request.
        let reply = PendingReply::new(id, rx, Arc::downgrade(registry), Arc::downgrade(pending));

        self.shared.writer.write(&request).await?;
        Ok(reply)
    }

    /// Send a correlated request and wait for its outcome.
    ///
    /// Returns the response body (if any) on success and
    /// [`ClientError::RemoteRejected`] when the server answers `ok: false`.
    pub async fn call(
        &self,
        command: &str,
        body: impl Serialize,
    ) -> Result<Option<Value>, ClientError> {
        self.send(command, body).await?.await
    }

    /// [`Session::call`] for threads that are not running an async runtime.
    ///
    /// Blocks the current thread. Must not be called from inside a subscriber
    /// (the response would have to be dispatched by the thread being blocked).
    pub fn call_blocking(
        &self,
        command: &str,
        body: impl Serialize + Send,
    ) -> Result<Option<Value>, ClientError> {
        run_blocking(self.call(command, body))
    }

    /// Write an uncorrelated command. No response is expected.
    pub async fn notify(&self, command: &str, body: impl Serialize) -> Result<(), ClientError> {
        let frame = Command::new(command, body)?;
        self.shared.writer.write(&frame).await
    }

    /// Register `handler` for every message matching `predicate`.
    ///
    /// Both run on the receive thread and must not block it.
    pub fn subscribe<P, F>(&self, predicate: P, handler: F) -> SubscriptionId
    where
        P: Fn(&Message) -> bool + Send + Sync + 'static,
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.shared.registry.add(move |message: &Message| {
            if predicate(message) {
                handler(message);
            }
        })
    }

    /// Register `handler` for every event, whatever its tag.
    pub fn subscribe_events<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.shared.registry.add(move |message: &Message| {
            if let Message::Event(event) = message {
                handler(event);
            }
        })
    }

    /// Remove a subscription. Unknown or already-removed ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.registry.remove(id)
    }

    /// Number of correlated requests still waiting for a response.
    pub fn pending_requests(&self) -> usize {
        self.shared.pending.len()
    }

    /// Number of registered handlers, including one-shot response handlers.
    pub fn subscriptions(&self) -> usize {
        self.shared.registry.len()
    }

    /// True once the receive loop has stopped.
    pub fn is_closed(&self) -> bool {
        self.shared.pending.is_closed()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("subscriptions", &self.subscriptions())
            .field("pending_requests", &self.pending_requests())
            .finish()
    }
}
