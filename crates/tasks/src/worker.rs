//! The worker pool (C6 execution side): N workers pulling tasks off
//! the shared queue independently, per spec 5 ("a pool of N workers
//! executing tasks independently"). Workers run with at-least-once
//! semantics; every task this gateway runs (an LLM orchestration or a
//! catalog refresh) is idempotent at the semantic level, so a retried
//! task never corrupts state.

use crate::queue::{SharedReceiver, TaskStore};
use gateway_core::{TaskRecord, TaskState};
use std::sync::Arc;
use tracing::Instrument;

/// Spawn `worker_count` loops, each pulling `(task_id, work)` pairs off
/// the shared receiver and driving them to completion, updating the
/// store through STARTED then SUCCESS/FAILURE.
pub fn spawn_pool(receiver: SharedReceiver, store: Arc<TaskStore>, worker_count: usize) -> Vec<tokio::task::JoinHandle<()>> {
    (0..worker_count)
        .map(|worker_index| {
            let receiver = Arc::clone(&receiver);
            let store = Arc::clone(&store);
            tokio::spawn(async move { run_worker_loop(worker_index, receiver, store).await })
        })
        .collect()
}

async fn run_worker_loop(worker_index: usize, receiver: SharedReceiver, store: Arc<TaskStore>) {
    loop {
        let next = {
            let mut guard = receiver.lock().await;
            guard.recv().await
        };
        let Some((task_id, work)) = next else {
            tracing::info!(worker_index, "task queue closed, worker shutting down");
            return;
        };

        let mut started = TaskRecord::pending(task_id);
        started.state = TaskState::Started;
        store.set(started);

        tracing::debug!(worker_index, %task_id, "starting task");
        let outcome = work.instrument(tracing::info_span!("task", %task_id)).await;

        let mut finished = TaskRecord::pending(task_id);
        match outcome {
            Ok(result) => {
                finished.state = TaskState::Success;
                finished.result = Some(result);
            }
            Err(error) => {
                finished.state = TaskState::Failure;
                finished.error = Some(error);
            }
        }
        store.set(finished);
        tracing::debug!(worker_index, %task_id, "task finished");
    }
}
