use std::future::Future;
use std::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};

/// Holds at most one running task. Installing a new task aborts the previous
/// one first.
#[derive(Debug, Default)]
pub(crate) struct TaskSlot {
    current: Mutex<Option<AbortHandle>>,
}

impl TaskSlot {
    pub(crate) fn spawn<F>(&self, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut current = self.lock();
        if let Some(previous) = current.take() {
            previous.abort();
        }
        let handle = tokio::spawn(future);
        *current = Some(handle.abort_handle());
        handle
    }

    pub(crate) fn cancel(&self) {
        if let Some(previous) = self.lock().take() {
            previous.abort();
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<AbortHandle>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
