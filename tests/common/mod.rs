#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde_json::Value;

pub const WAIT: Duration = Duration::from_secs(5);

/// Server side of one test connection.
pub struct Peer {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Peer {
    fn new(stream: TcpStream) -> Self {
        stream.set_read_timeout(Some(WAIT)).expect("set read timeout");
        stream.set_write_timeout(Some(WAIT)).expect("set write timeout");
        let writer = stream.try_clone().expect("clone stream");
        Self {
            reader: BufReader::new(stream),
            writer,
        }
    }

    /// Next frame from the client. Panics on EOF or timeout.
    pub fn read_frame(&mut self) -> Value {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).expect("read frame");
        assert!(n > 0, "client closed the connection");
        assert!(line.ends_with('\n'), "frame without newline: {line:?}");
        serde_json::from_str(line.trim_end()).expect("client sent invalid json")
    }

    /// True once the client has closed its side.
    pub fn at_eof(&mut self) -> bool {
        let mut line = String::new();
        matches!(self.reader.read_line(&mut line), Ok(0))
    }

    pub fn send(&mut self, frame: &Value) {
        let line = serde_json::to_string(frame).expect("encode");
        self.send_raw(&line);
    }

    pub fn send_raw(&mut self, line: &str) {
        assert!(self.try_send_raw(line), "write failed");
    }

    /// Like [`Peer::send_raw`], reporting failure instead of panicking.
    pub fn try_send_raw(&mut self, line: &str) -> bool {
        let mut frame = Vec::with_capacity(line.len() + 1);
        frame.extend_from_slice(line.as_bytes());
        frame.push(b'\n');
        self.writer.write_all(&frame).and_then(|_| self.writer.flush()).is_ok()
    }
}

/// Accept one client on an ephemeral port and run `script` against it on a
/// separate thread. Panics inside `script` surface when the handle is joined.
pub fn serve<F>(script: F) -> (String, JoinHandle<()>)
where
    F: FnOnce(Peer) + Send + 'static,
{
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr").to_string();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        script(Peer::new(stream));
    });
    (addr, handle)
}

/// Await `fut`, failing the test if it takes longer than [`WAIT`].
pub async fn within<F: std::future::Future>(fut: F) -> F::Output {
    tokio::time::timeout(WAIT, fut)
        .await
        .expect("timed out")
}

/// Poll `cond` until it holds or [`WAIT`] elapses.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}
