mod common;

use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use serde_json::json;

use common::{serve, wait_until, within};
use dart_duel::client::{
    run_blocking, ClientConfig, ClientError, Connection, MalformedFramePolicy,
};

fn config_for(addr: &str, policy: MalformedFramePolicy) -> ClientConfig {
    let (host, port) = addr.rsplit_once(':').unwrap();
    ClientConfig {
        host: host.to_string(),
        port: port.parse().unwrap(),
        malformed_frames: policy,
        ..ClientConfig::default()
    }
}

#[test]
fn connect_to_closed_port_fails() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let err = Connection::connect(&addr).unwrap_err();
    assert!(matches!(err, ClientError::Connect { .. }));
    assert!(err.is_fatal());
    assert!(err.to_string().contains(&addr));
}

#[tokio::test]
async fn server_hangup_fails_outstanding_request() {
    let (addr, server) = serve(|mut peer| {
        let req = peer.read_frame();
        assert_eq!(req["command"], "challengePlayer");
        // Drop without answering.
    });

    let conn = Connection::connect(&addr).unwrap();
    let reply = within(conn.send("challengePlayer", json!({"to": "bob"})))
        .await
        .unwrap();
    server.join().unwrap();

    let err = within(reply).await.unwrap_err();
    assert!(matches!(err, ClientError::ConnectionClosed));
    assert!(conn.session().is_closed());
    assert_eq!(conn.session().pending_requests(), 0);

    // The bridge stopped on a clean EOF.
    conn.disconnect().unwrap();
}

#[tokio::test]
async fn local_close_fails_outstanding_request() {
    let (addr, server) = serve(|mut peer| {
        let _ = peer.read_frame();
        assert!(peer.at_eof());
    });

    let mut conn = Connection::connect(&addr).unwrap();
    let session = conn.session().clone();
    let reply = within(session.send("throw", json!({"matchId": 1, "score": 3})))
        .await
        .unwrap();

    conn.close().unwrap();
    assert!(!conn.is_open());

    let err = within(reply).await.unwrap_err();
    assert!(matches!(err, ClientError::ConnectionClosed));

    // New requests fail without touching the socket.
    let err = within(session.call("listOnline", ())).await.unwrap_err();
    assert!(matches!(err, ClientError::ConnectionClosed));
    assert_eq!(session.subscriptions(), 0);

    conn.close().unwrap();
    server.join().unwrap();
}

#[test]
fn no_callbacks_after_close_returns() {
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let (addr, server) = serve(move |mut peer| {
        // Flood events until told to stop or the client goes away.
        let mut n = 0u64;
        while stop_rx.try_recv().is_err() {
            let frame = json!({"event": "otherThrew", "body": n});
            if !peer.try_send_raw(&frame.to_string()) {
                break;
            }
            n += 1;
        }
    });

    let mut conn = Connection::connect(&addr).unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let hits = Arc::clone(&count);
    conn.session().subscribe_events(move |_| {
        hits.fetch_add(1, Ordering::SeqCst);
    });

    assert!(wait_until(|| count.load(Ordering::SeqCst) > 10));
    conn.close().unwrap();
    let at_close = count.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(count.load(Ordering::SeqCst), at_close);

    drop(conn);
    let _ = stop_tx.send(());
    server.join().unwrap();
}

#[tokio::test]
async fn malformed_frame_is_skipped_by_default() {
    let (addr, server) = serve(|mut peer| {
        let req = peer.read_frame();
        peer.send_raw("{\"id\": oops");
        peer.send(&json!({"id": req["id"], "ok": true, "body": "fine"}));
        let _ = peer.at_eof();
    });

    let conn = Connection::open(&config_for(&addr, MalformedFramePolicy::Skip)).unwrap();
    let body = within(conn.call("listOnline", ())).await.unwrap();
    assert_eq!(body, Some(json!("fine")));

    conn.disconnect().unwrap();
    server.join().unwrap();
}

#[tokio::test]
async fn malformed_frame_disconnects_under_strict_policy() {
    let (addr, server) = serve(|mut peer| {
        let req = peer.read_frame();
        peer.send_raw("{\"id\": oops");
        peer.send(&json!({"id": req["id"], "ok": true}));
        let _ = peer.at_eof();
    });

    let conn = Connection::open(&config_for(&addr, MalformedFramePolicy::Disconnect)).unwrap();
    let err = within(conn.call("listOnline", ())).await.unwrap_err();
    assert!(matches!(err, ClientError::ConnectionClosed));
    assert!(conn.session().is_closed());

    let err = conn.disconnect().unwrap_err();
    assert!(matches!(err, ClientError::Decoding(_)));
    server.join().unwrap();
}

#[test]
fn blocking_call_from_plain_thread() {
    let (addr, server) = serve(|mut peer| {
        for _ in 0..2 {
            let req = peer.read_frame();
            let reply = if req["body"]["password"] == "secret1" {
                json!({"id": req["id"], "ok": true})
            } else {
                json!({"id": req["id"], "ok": false, "message": "Invalid credentials"})
            };
            peer.send(&reply);
        }
        let _ = peer.at_eof();
    });

    let conn = Connection::connect(&addr).unwrap();
    let session = conn.session().clone();

    let worker = thread::spawn(move || {
        let ok = session.call_blocking("login", json!({"username": "alice", "password": "secret1"}));
        let rejected = run_blocking(session.login("alice", "wrong"));
        (ok, rejected)
    });
    let (ok, rejected) = worker.join().unwrap();

    assert_eq!(ok.unwrap(), None);
    assert_eq!(
        rejected.unwrap_err().rejection_message(),
        Some("Invalid credentials")
    );

    conn.disconnect().unwrap();
    server.join().unwrap();
}

#[tokio::test]
async fn blocking_calls_inside_spawn_blocking() {
    let (addr, server) = serve(|mut peer| {
        let mut requests: Vec<_> = (0..2).map(|_| peer.read_frame()).collect();
        requests.reverse();
        for req in requests {
            peer.send(&json!({"id": req["id"], "ok": true, "body": req["body"]["to"]}));
        }
        let _ = peer.at_eof();
    });

    let conn = Connection::connect(&addr).unwrap();
    let a = conn.session().clone();
    let b = conn.session().clone();

    let (ra, rb) = within(async {
        tokio::join!(
            tokio::task::spawn_blocking(move || a.call_blocking("challengePlayer", json!({"to": "bob"}))),
            tokio::task::spawn_blocking(move || b.call_blocking("challengePlayer", json!({"to": "eve"}))),
        )
    })
    .await;
    assert_eq!(ra.unwrap().unwrap(), Some(json!("bob")));
    assert_eq!(rb.unwrap().unwrap(), Some(json!("eve")));

    conn.disconnect().unwrap();
    server.join().unwrap();
}
