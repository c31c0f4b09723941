//! Running async operations from threads that have no runtime.
//!
//! Each [`run_blocking`] call gets its own worker thread with its own
//! single-threaded tokio runtime. The runtime is torn down on the worker
//! before the result is handed back, and the worker is joined before
//! `run_blocking` returns. Concurrent calls share nothing but the resources
//! their operations touch.

use std::future::Future;
use std::panic;
use std::thread;

use crate::error::ClientError;

const WORKER_THREAD_NAME: &str = "dart-duel-blocking";

/// Drive `operation` to completion on a dedicated worker and return its result.
///
/// The operation may borrow from the caller's stack. A panic inside the
/// operation is resumed on the calling thread.
///
/// Do not call this from a subscriber: it would block the receive thread that
/// has to deliver the response.
pub fn run_blocking<F, T>(operation: F) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>> + Send,
    T: Send,
{
    thread::scope(|scope| {
        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn_scoped(scope, move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(ClientError::Runtime)?;
                let outcome = runtime.block_on(operation);
                drop(runtime);
                outcome
            })
            .map_err(ClientError::Runtime)?;

        match worker.join() {
            Ok(outcome) => outcome,
            Err(payload) => panic::resume_unwind(payload),
        }
    })
}
