//! Fire-and-forget task execution with failure containment.
//!
//! The only sanctioned mechanism for detached side effects. A task's error is
//! logged and discarded; it never reaches the caller. Panics inside the task
//! are contained by the spawned task boundary and do not take the process
//! down.

use std::fmt::Display;
use std::future::Future;

use tracing::error;

/// Runs a task as a detached background job without blocking the caller.
/// Do NOT await the spawned work; its outcome is only observable through the
/// side effects it performs.
pub fn run_in_background<F, E>(task: F)
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display,
{
    tokio::spawn(async move {
        if let Err(e) = task.await {
            error!("Background task failed: {}", e);
        }
    });
}
