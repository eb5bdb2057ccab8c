use std::future::Future;
use std::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::warn;

/// At-most-one in-flight task per slot.
///
/// Spawning through the slot aborts whatever was previously in flight, so
/// a stale response can never land after a newer request. This replaces
/// sequence-counter guards in the type-ahead search and detail-by-code
/// flows. An aborted task's result is discarded silently (`None`).
#[derive(Debug, Default)]
pub struct TaskSlot {
    current: Mutex<Option<AbortHandle>>,
}

impl TaskSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `fut`, aborting the slot's previous task first.
    pub fn spawn<F, T>(&self, fut: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let handle = tokio::spawn(fut);
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = current.replace(handle.abort_handle()) {
            previous.abort();
        }
        handle
    }

    /// Spawn and await. `None` when a newer call superseded this one.
    pub async fn run<F, T>(&self, fut: F) -> Option<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        match self.spawn(fut).await {
            Ok(value) => Some(value),
            Err(e) => {
                if !e.is_cancelled() {
                    warn!(error = %e, "slot task failed");
                }
                None
            }
        }
    }

    /// Abort the in-flight task, if any.
    pub fn cancel(&self) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = current.take() {
            handle.abort();
        }
    }
}
