//! Supervisor for work that outlives the request that started it.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::{JoinError, JoinSet};

#[derive(Default)]
struct Inner {
    tasks: JoinSet<()>,
    closed: bool,
}

/// Tracks detached tasks so shutdown can wait for them.
///
/// Failures are logged with the task name; the caller never observes them.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub completed: usize,
    pub aborted: usize,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `task` on the runtime. Returns `false` once shutdown has started.
    pub fn spawn<F>(&self, name: &'static str, task: F) -> bool
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let mut inner = self.inner();
        if inner.closed {
            tracing::warn!(task = name, "background task rejected: shutting down");
            return false;
        }
        while let Some(done) = inner.tasks.try_join_next() {
            log_join(done);
        }
        inner.tasks.spawn(async move {
            if let Err(e) = task.await {
                tracing::error!(task = name, error = ?e, "background task failed");
            }
        });
        true
    }

    /// Tasks spawned and not yet reaped.
    pub fn len(&self) -> usize {
        self.inner().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Refuse new work, then wait up to `deadline` for running tasks.
    /// Whatever is still running afterwards is aborted.
    pub async fn shutdown(&self, deadline: Duration) -> DrainReport {
        let mut tasks = {
            let mut inner = self.inner();
            inner.closed = true;
            std::mem::take(&mut inner.tasks)
        };
        let mut report = DrainReport::default();
        let drained = tokio::time::timeout(deadline, drain(&mut tasks, &mut report)).await;
        if drained.is_err() {
            report.aborted = tasks.len();
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
            tracing::warn!(aborted = report.aborted, "background tasks aborted at deadline");
        }
        report
    }
}

async fn drain(tasks: &mut JoinSet<()>, report: &mut DrainReport) {
    while let Some(done) = tasks.join_next().await {
        log_join(done);
        report.completed += 1;
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            tracing::error!(error = %e, "background task panicked");
        }
    }
}
