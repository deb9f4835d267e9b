use log::warn;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// Extract panic info from panic value
pub fn extract_panic_info(panic_err: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic_err.downcast_ref::<&str>() {
        format!("Panic with message: {}", s)
    } else if let Some(s) = panic_err.downcast_ref::<String>() {
        format!("Panic with message: {}", s)
    } else {
        "Unknown panic occurred".to_string()
    }
}

/// Run `task` on a worker thread and wait at most `timeout` for its result.
///
/// On timeout the worker is left to finish on its own and its result is
/// dropped; nothing it holds needs cleanup beyond its own buffers.
pub fn execute_with_timeout<T, F>(operation_name: &str, timeout: Duration, task: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled_worker = cancelled.clone();
    let (tx, rx) = mpsc::channel();

    let handle = thread::Builder::new()
        .name(format!("{}-worker", operation_name.to_lowercase()))
        .spawn(move || {
            let result = task();
            if !cancelled_worker.load(Ordering::SeqCst) {
                let _ = tx.send(result);
            }
        })?;

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            let _ = handle.join();
            Ok(result)
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            cancelled.store(true, Ordering::SeqCst);
            warn!(
                "TIMEOUT: {} took longer than {} seconds",
                operation_name,
                timeout.as_secs()
            );
            Err(Error::Timeout(timeout.as_secs()))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            // The worker dropped its sender without sending, i.e. it panicked
            let message = match handle.join() {
                Err(panic) => extract_panic_info(panic),
                Ok(()) => "worker exited without a result".to_string(),
            };
            Err(Error::Unknown(format!("{} failed: {}", operation_name, message)))
        }
    }
}
