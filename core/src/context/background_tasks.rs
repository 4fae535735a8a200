use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A spawned task paired with the token that stops it.
pub struct TaskSlot {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl TaskSlot {
    /// Spawn `task` with a child token of `parent`, so cancelling the parent
    /// also stops this task.
    pub fn spawn<F, Fut>(parent: &CancellationToken, task: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = parent.child_token();
        let handle = tokio::spawn(task(cancel.clone()));
        Self { handle, cancel }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the task and wait for it to wind down.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await
            && e.is_panic()
        {
            tracing::error!(error = %e, "Background task panicked");
        }
    }
}

#[derive(Default)]
pub struct BackgroundTasks {
    pub watcher: Option<TaskSlot>,
    pub log_tail: Option<TaskSlot>,
}

impl BackgroundTasks {
    pub async fn stop_tail(&mut self) {
        if let Some(slot) = self.log_tail.take() {
            slot.shutdown().await;
        }
    }

    pub async fn stop_all(&mut self) {
        self.stop_tail().await;
        if let Some(slot) = self.watcher.take() {
            slot.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn shutdown_cancels_and_joins() {
        let root = CancellationToken::new();
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = stopped.clone();

        let slot = TaskSlot::spawn(&root, |cancel| async move {
            cancel.cancelled().await;
            flag.store(true, Ordering::SeqCst);
        });

        slot.shutdown().await;
        assert!(stopped.load(Ordering::SeqCst));
        assert!(!root.is_cancelled());
    }

    #[tokio::test]
    async fn parent_cancellation_reaches_children() {
        let root = CancellationToken::new();
        let mut tasks = BackgroundTasks {
            log_tail: Some(TaskSlot::spawn(&root, |cancel| async move {
                cancel.cancelled().await;
            })),
            ..Default::default()
        };

        root.cancel();
        for _ in 0..100 {
            if tasks.log_tail.as_ref().unwrap().is_finished() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(tasks.log_tail.as_ref().unwrap().is_finished());
        tasks.stop_all().await;
        assert!(tasks.log_tail.is_none());
    }
}
