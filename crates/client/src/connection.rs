//! Connection lifecycle: open the socket, start the receive thread, tear both
//! down again.

use std::io::{self, BufReader};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use dart_duel_protocol::Message;

use crate::bridge::{BridgeExit, MessageBridge};
use crate::config::ClientConfig;
use crate::correlator::{PendingReply, PendingRequests};
use crate::error::ClientError;
use crate::registry::{CallbackRegistry, SubscriptionId};
use crate::session::{Session, Shared};
use crate::writer::FrameWriter;

/// An open connection to the game server.
///
/// Owns the socket and the message bridge thread. Closing (explicitly or by
/// drop) shuts the socket down in both directions and joins the bridge, so no
/// subscriber runs after [`Connection::close`] returns.
///
/// # Examples
///
/// ```no_run
/// use dart_duel_client::{ClientConfig, Connection};
///
/// # async fn demo() -> Result<(), dart_duel_client::ClientError> {
/// let conn = Connection::open(&ClientConfig::from_env())?;
/// conn.session().login("alice", "secret1").await?;
/// conn.disconnect()?;
/// # Ok(())
/// # }
/// ```
pub struct Connection {
    peer: SocketAddr,
    stream: TcpStream,
    session: Session,
    shutdown: Arc<AtomicBool>,
    bridge: Option<JoinHandle<BridgeExit>>,
}

impl Connection {
    /// Connect to `addr` (`host:port`) with default settings.
    pub fn connect(addr: &str) -> Result<Self, ClientError> {
        Self::connect_with(addr, &ClientConfig::default())
    }

    /// Connect to the server named by `config`.
    pub fn open(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::connect_with(&config.address(), config)
    }

    fn connect_with(addr: &str, config: &ClientConfig) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).map_err(|source| ClientError::Connect {
            addr: addr.to_string(),
            source,
        })?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;

        let reader = BufReader::new(stream.try_clone()?);
        let writer = FrameWriter::new(stream.try_clone()?);

        let registry = Arc::new(CallbackRegistry::new());
        let pending = Arc::new(PendingRequests::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let bridge = MessageBridge::new(
            reader,
            Arc::clone(&registry),
            Arc::clone(&pending),
            config.malformed_frames,
            Arc::clone(&shutdown),
        );
        let handle = thread::Builder::new()
            .name(config.bridge_thread_name.clone())
            .spawn(move || bridge.run())?;

        info!(%peer, policy = ?config.malformed_frames, "connected");

        Ok(Self {
            peer,
            stream,
            session: Session::new(Shared {
                registry,
                pending,
                writer,
            }),
            shutdown,
            bridge: Some(handle),
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Handle for issuing commands; may be cloned and moved to other tasks.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// True until [`Connection::close`] has run.
    pub fn is_open(&self) -> bool {
        self.bridge.is_some()
    }

    /// Shut the socket down and wait for the message bridge to finish.
    ///
    /// Safe to call more than once; later calls do nothing. Returns the error
    /// that stopped the bridge, if it stopped on its own because of one.
    ///
    /// When called from a subscriber the bridge is not joined (it is the
    /// calling thread); it stops as soon as the subscriber returns.
    pub fn close(&mut self) -> Result<(), ClientError> {
        let Some(bridge) = self.bridge.take() else {
            return Ok(());
        };

        self.shutdown.store(true, Ordering::SeqCst);
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            // Already torn down by the peer.
            debug!(error = %e, "socket shutdown");
        }

        if bridge.thread().id() == thread::current().id() {
            debug!(peer = %self.peer, "close requested from the message bridge; not joining");
            return Ok(());
        }

        let exit = bridge
            .join()
            .map_err(|_| io::Error::other("message bridge panicked"))?;
        info!(peer = %self.peer, "disconnected");
        exit.into_result()
    }

    /// Close and consume the connection.
    pub fn disconnect(mut self) -> Result<(), ClientError> {
        self.close()
    }

    /// See [`Session::send`].
    pub async fn send(
        &self,
        command: &str,
        body: impl Serialize,
    ) -> Result<PendingReply, ClientError> {
        self.session.send(command, body).await
    }

    /// See [`Session::call`].
    pub async fn call(
        &self,
        command: &str,
        body: impl Serialize,
    ) -> Result<Option<Value>, ClientError> {
        self.session.call(command, body).await
    }

    /// See [`Session::call_blocking`].
    pub fn call_blocking(
        &self,
        command: &str,
        body: impl Serialize + Send,
    ) -> Result<Option<Value>, ClientError> {
        self.session.call_blocking(command, body)
    }

    /// See [`Session::notify`].
    pub async fn notify(&self, command: &str, body: impl Serialize) -> Result<(), ClientError> {
        self.session.notify(command, body).await
    }

    /// See [`Session::subscribe`].
    pub fn subscribe<P, F>(&self, predicate: P, handler: F) -> SubscriptionId
    where
        P: Fn(&Message) -> bool + Send + Sync + 'static,
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.session.subscribe(predicate, handler)
    }

    /// See [`Session::unsubscribe`].
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.session.unsubscribe(id)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(peer = %self.peer, error = %e, "connection ended with an error");
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("open", &self.is_open())
            .field("session", &self.session)
            .finish()
    }
}
