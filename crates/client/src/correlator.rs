//! Request/response correlation.
//!
//! A request is filed twice: its completion sender lives in
//! [`PendingRequests`], and a one-shot handler keyed by the same id lives in
//! the [`CallbackRegistry`]. When the matching response is dispatched the
//! handler unregisters itself and hands the response to the sender. The
//! sender is a `tokio::sync::oneshot`, so the waiting task is woken on
//! whatever runtime is polling it, never run on the receive thread.
//!
//! When the receive loop ends, [`PendingRequests::close_all`] fails every
//! outstanding request with [`ClientError::ConnectionClosed`] and refuses new
//! ones.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{ready, Context, Poll};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::trace;

use dart_duel_protocol::{CorrelationId, Message, Response};

use crate::error::ClientError;
use crate::registry::{CallbackRegistry, Handler, SubscriptionId};

type Completion = oneshot::Sender<Result<Response, ClientError>>;

#[derive(Default)]
struct PendingState {
    closed: bool,
    waiters: HashMap<CorrelationId, Completion>,
}

/// Completion senders of in-flight requests.
#[derive(Default)]
pub struct PendingRequests {
    state: Mutex<PendingState>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a new request. Fails once the connection has closed.
    pub fn register(
        &self,
        id: CorrelationId,
    ) -> Result<oneshot::Receiver<Result<Response, ClientError>>, ClientError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(ClientError::ConnectionClosed);
        }
        let (tx, rx) = oneshot::channel();
        state.waiters.insert(id, tx);
        Ok(rx)
    }

    /// Complete the request matching `response.id`.
    ///
    /// Returns false if no such request is pending (already resolved,
    /// abandoned, or never issued).
    pub fn resolve(&self, response: Response) -> bool {
        let waiter = self.state.lock().waiters.remove(&response.id);
        match waiter {
            Some(tx) => {
                // The receiver may have been dropped; that is not an error here.
                let _ = tx.send(Ok(response));
                true
            }
            None => false,
        }
    }

    /// Complete the request `id` with `error`.
    ///
    /// Returns false if no such request is pending.
    pub fn fail(&self, id: CorrelationId, error: ClientError) -> bool {
        let waiter = self.state.lock().waiters.remove(&id);
        match waiter {
            Some(tx) => {
                let _ = tx.send(Err(error));
                true
            }
            None => false,
        }
    }

    /// Drop a request without completing it.
    pub fn forget(&self, id: CorrelationId) -> bool {
        self.state.lock().waiters.remove(&id).is_some()
    }

    /// Fail every pending request and refuse new ones. Returns how many were failed.
    pub fn close_all(&self) -> usize {
        let drained: Vec<_> = {
            let mut state = self.state.lock();
            state.closed = true;
            state.waiters.drain().collect()
        };
        let count = drained.len();
        for (id, tx) in drained {
            trace!(%id, "failing pending request: connection closed");
            let _ = tx.send(Err(ClientError::ConnectionClosed));
        }
        count
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build the one-shot handler for request `id`.
///
/// Ignores every message except the response carrying `id`; on that one it
/// removes itself from the registry before completing the request, so later
/// duplicates are not observed.
pub(crate) fn one_shot_handler(
    id: CorrelationId,
    registry: Weak<CallbackRegistry>,
    pending: Weak<PendingRequests>,
) -> Handler {
    Arc::new(move |message: &Message| {
        let Message::Response(response) = message else {
            return;
        };
        if response.id != id {
            return;
        }
        if let Some(registry) = registry.upgrade() {
            registry.remove(SubscriptionId::for_request(id));
        }
        if let Some(pending) = pending.upgrade() {
            pending.resolve(response.clone());
        }
    })
}

/// Map a response to the caller-visible outcome.
pub(crate) fn settle(response: Response) -> Result<Option<Value>, ClientError> {
    if response.ok {
        Ok(response.body)
    } else {
        Err(ClientError::RemoteRejected(
            response.rejection_message().to_string(),
        ))
    }
}

/// Completion handle of a correlated request.
///
/// Exists from the moment the request is filed, before it is written, so a
/// caller cancelled while waiting for the writer still cleans up.
///
/// Resolves to the response body on `ok: true`, to
/// [`ClientError::RemoteRejected`] on `ok: false`, and to
/// [`ClientError::ConnectionClosed`] if the connection ends first. Dropping
/// an unresolved handle abandons the request.
#[must_use = "a pending reply does nothing unless awaited"]
pub struct PendingReply {
    id: CorrelationId,
    rx: oneshot::Receiver<Result<Response, ClientError>>,
    registry: Weak<CallbackRegistry>,
    pending: Weak<PendingRequests>,
    done: bool,
}

impl PendingReply {
    pub(crate) fn new(
        id: CorrelationId,
        rx: oneshot::Receiver<Result<Response, ClientError>>,
        registry: Weak<CallbackRegistry>,
        pending: Weak<PendingRequests>,
    ) -> Self {
        Self {
            id,
            rx,
            registry,
            pending,
            done: false,
        }
    }

    /// Correlation id the request was sent with.
    pub fn id(&self) -> CorrelationId {
        self.id
    }

    /// Wait for the raw response, without mapping `ok: false` to an error.
    pub async fn response(mut self) -> Result<Response, ClientError> {
        let outcome = (&mut self.rx).await;
        self.finish();
        match outcome {
            Ok(result) => result,
            Err(_) => Err(ClientError::ConnectionClosed),
        }
    }
}

impl PendingReply {
    // The one-shot handler normally removes itself; it is still registered
    // when the request was failed by close_all.
    fn finish(&mut self) {
        self.done = true;
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(SubscriptionId::for_request(self.id));
        }
    }
}

impl Future for PendingReply {
    type Output = Result<Option<Value>, ClientError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let outcome = ready!(Pin::new(&mut self.rx).poll(cx));
        self.finish();
        Poll::Ready(match outcome {
            Ok(Ok(response)) => settle(response),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ClientError::ConnectionClosed),
        })
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(SubscriptionId::for_request(self.id));
        }
        if let Some(pending) = self.pending.upgrade() {
            pending.forget(self.id);
        }
    }
}

impl std::fmt::Debug for PendingReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingReply")
            .field("id", &self.id)
            .field("done", &self.done)
            .finish()
    }
}
