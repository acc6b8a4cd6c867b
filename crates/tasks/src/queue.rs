//! The task substrate (C6): `enqueue`/`get`/`schedule_periodic` over an
//! in-process `mpsc` work queue and a `DashMap`-backed store. Per
//! Design Notes 9, the orchestrator depends only on the `TaskQueue`
//! trait, not this concrete implementation -- a future revision could
//! swap this for a Redis-backed queue without touching orchestrator
//! code.

use chrono::Utc;
use dashmap::DashMap;
use gateway_core::{TaskRecord, TaskState};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

pub type TaskFuture = Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'static>>;

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task queue is closed")]
    QueueClosed,
}

/// The durable store backing the task substrate. Reads (`get`) never
/// block writes (`set`) and vice versa: `DashMap` shards its locking
/// per key, and every update replaces a whole `TaskRecord` value
/// rather than mutating fields within one.
pub struct TaskStore {
    records: DashMap<Uuid, TaskRecord>,
    retention: Duration,
}

impl TaskStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            records: DashMap::new(),
            retention,
        }
    }

    pub fn insert_pending(&self, id: Uuid) {
        self.records.insert(id, TaskRecord::pending(id));
        self.report_depth();
    }

    pub fn set(&self, record: TaskRecord) {
        self.records.insert(record.id, record);
        self.report_depth();
    }

    /// Tasks not yet in a terminal state -- the queue-depth gauge (spec
    /// 10.1).
    pub fn pending_count(&self) -> usize {
        self.records.iter().filter(|r| !r.is_terminal()).count()
    }

    fn report_depth(&self) {
        metrics::gauge!("gateway_task_queue_depth").set(self.pending_count() as f64);
    }

    /// Look up a task by id. An id that was never enqueued, or whose
    /// record has aged out past the retention window, is reported as
    /// a fresh `PENDING` record -- per spec 4.4, "PENDING also covers
    /// unknown id; callers must tolerate this."
    pub fn get(&self, id: Uuid) -> TaskRecord {
        match self.records.get(&id) {
            Some(record) if !self.expired(&record) => record.clone(),
            _ => TaskRecord::pending(id),
        }
    }

    fn expired(&self, record: &TaskRecord) -> bool {
        record.is_terminal()
            && Utc::now().signed_duration_since(record.created_at)
                > chrono::Duration::from_std(self.retention).unwrap_or(chrono::Duration::zero())
    }
}

/// Interface the orchestrator and the HTTP surface depend on, instead
/// of a concrete queue implementation.
#[async_trait::async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, work: TaskFuture) -> Result<Uuid, TaskError>;
    fn get(&self, task_id: Uuid) -> TaskRecord;
}

pub struct InProcessTaskQueue {
    store: Arc<TaskStore>,
    sender: mpsc::Sender<(Uuid, TaskFuture)>,
}

impl InProcessTaskQueue {
    /// Build a queue plus the receiving half handed to the worker
    /// pool. Kept separate from `worker::spawn_pool` so tests can drive
    /// the channel directly without a full pool.
    pub fn new(store: Arc<TaskStore>, channel_capacity: usize) -> (Self, mpsc::Receiver<(Uuid, TaskFuture)>) {
        let (sender, receiver) = mpsc::channel(channel_capacity);
        (Self { store, sender }, receiver)
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }
}

#[async_trait::async_trait]
impl TaskQueue for InProcessTaskQueue {
    async fn enqueue(&self, work: TaskFuture) -> Result<Uuid, TaskError> {
        let id = Uuid::new_v4();
        self.store.insert_pending(id);
        self.sender
            .send((id, work))
            .await
            .map_err(|_| TaskError::QueueClosed)?;
        Ok(id)
    }

    fn get(&self, task_id: Uuid) -> TaskRecord {
        self.store.get(task_id)
    }
}

/// Wrap a receiver so it can be shared across N worker loops; `mpsc`
/// receivers aren't `Clone`, but multiple tasks can share one behind a
/// mutex and still load-balance correctly since only one holds the
/// lock at a time while awaiting the next item.
pub type SharedReceiver = Arc<Mutex<mpsc::Receiver<(Uuid, TaskFuture)>>>;

pub fn share_receiver(receiver: mpsc::Receiver<(Uuid, TaskFuture)>) -> SharedReceiver {
    Arc::new(Mutex::new(receiver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn unknown_task_id_is_reported_as_pending() {
        let store = TaskStore::new(StdDuration::from_secs(900));
        let record = store.get(Uuid::new_v4());
        assert_eq!(record.state, TaskState::Pending);
    }

    #[tokio::test]
    async fn enqueue_assigns_pending_state_then_dequeued_work_runs() {
        let store = Arc::new(TaskStore::new(StdDuration::from_secs(900)));
        let (queue, mut receiver) = InProcessTaskQueue::new(Arc::clone(&store), 8);

        let id = queue
            .enqueue(Box::pin(async { Ok("done".to_string()) }))
            .await
            .unwrap();
        assert_eq!(queue.get(id).state, TaskState::Pending);

        let (dequeued_id, work) = receiver.recv().await.unwrap();
        assert_eq!(dequeued_id, id);
        let result = work.await;
        assert_eq!(result, Ok("done".to_string()));
    }

    #[test]
    fn pending_count_excludes_terminal_records() {
        let store = TaskStore::new(StdDuration::from_secs(900));
        let pending_id = Uuid::new_v4();
        store.insert_pending(pending_id);
        let done_id = Uuid::new_v4();
        let mut done = TaskRecord::pending(done_id);
        done.state = TaskState::Success;
        store.set(done);

        assert_eq!(store.pending_count(), 1);
    }

    #[test]
    fn terminal_record_past_retention_is_reported_as_fresh_pending() {
        let store = TaskStore::new(StdDuration::from_millis(0));
        let id = Uuid::new_v4();
        let mut record = TaskRecord::pending(id);
        record.state = TaskState::Success;
        record.result = Some("old".to_string());
        record.created_at = Utc::now() - chrono::Duration::seconds(10);
        store.set(record);

        let fetched = store.get(id);
        assert_eq!(fetched.state, TaskState::Pending);
    }
}
