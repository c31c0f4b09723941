//! Outbound frame writer.

use std::io::{self, Write};
use std::net::TcpStream;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use dart_duel_protocol::codec;

use crate::error::ClientError;

struct Sink<W> {
    out: W,
    buf: Vec<u8>,
}

/// Serializes whole frames onto a byte stream.
///
/// Each [`FrameWriter::write`] encodes, writes and flushes one line while
/// holding an async lock, so concurrent writers never interleave bytes. The
/// lock is held for exactly one frame.
///
/// The stream itself is blocking. The write runs on tokio's blocking pool, so
/// a peer that stops reading stalls only the callers queued on this writer,
/// never the runtime's worker threads.
pub struct FrameWriter<W = TcpStream> {
    sink: Arc<Mutex<Sink<W>>>,
}

impl<W: Write + Send + 'static> FrameWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Sink {
                out,
                buf: Vec::with_capacity(4096),
            })),
        }
    }

    /// Write `frame` as one line and flush.
    ///
    /// Nothing reaches the stream if `frame` cannot be encoded. I/O failures
    /// surface as [`ClientError::Transport`] and are not retried. If the
    /// caller is cancelled once the write has started, the frame is still
    /// written in full.
    pub async fn write<T: Serialize + ?Sized>(&self, frame: &T) -> Result<(), ClientError> {
        let mut sink = Arc::clone(&self.sink).lock_owned().await;

        codec::encode_line_into(&mut sink.buf, frame)?;
        debug!(
            frame = %String::from_utf8_lossy(&sink.buf[..sink.buf.len() - 1]),
            "sending frame"
        );

        tokio::task::spawn_blocking(move || {
            let Sink { out, buf } = &mut *sink;
            out.write_all(buf)?;
            out.flush()
        })
        .await
        .map_err(io::Error::other)??;
        Ok(())
    }

    /// The underlying stream, or `None` while a write is still in flight.
    pub fn into_inner(self) -> Option<W> {
        Arc::try_unwrap(self.sink)
            .ok()
            .map(|sink| sink.into_inner().out)
    }
}
