//! Line-oriented console for the dart duel server.
//!
//! Connects using `DART_DUEL_HOST` / `DART_DUEL_PORT`, logs every event the
//! server pushes, and runs one correlated call per stdin line:
//!
//! ```text
//! login {"username":"alice","password":"secret1"}
//! listOnline
//! quit
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default: `info`).

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dart_duel::client::{presence_username, ClientConfig, Connection, Message};
use dart_duel::types::CommandKind;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let config = ClientConfig::from_env();
    let conn = Connection::open(&config)
        .with_context(|| format!("failed to connect to {}", config.address()))?;

    conn.subscribe(|m: &Message| m.as_event().is_some(), log_event);

    let result = run(&conn);
    conn.disconnect().context("connection ended with an error")?;
    result
}

fn run(conn: &Connection) -> Result<()> {
    let session = conn.session();

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            break;
        }

        let (command, body) = match parse_input(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                eprintln!("error: {e:#}");
                continue;
            }
        };
        if CommandKind::from_name(command).is_none() {
            warn!(command, "command is not known to this client; sending anyway");
        }

        match session.call_blocking(command, body) {
            Ok(Some(body)) => println!("{body}"),
            Ok(None) => println!("ok"),
            Err(e) if e.is_fatal() => return Err(e).context("connection lost"),
            Err(e) => eprintln!("error: {e}"),
        }
    }
    Ok(())
}

fn log_event(message: &Message) {
    if let Some((kind, username)) = presence_username(message) {
        info!(event = kind.as_str(), username, "presence");
    } else if let Some(event) = message.as_event() {
        info!(event = %event.event, body = %event.body, "event");
    }
}

/// Split `<command> [json-body]`.
fn parse_input(line: &str) -> Result<(&str, Value)> {
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };
    let body = if rest.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(rest).with_context(|| format!("body of `{command}` is not JSON"))?
    };
    Ok((command, body))
}
