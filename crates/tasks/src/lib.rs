//! The async task substrate (C6): a durable job queue exposing each
//! orchestration as a task with PENDING/STARTED/SUCCESS/FAILURE
//! states, plus periodic scheduling used by the catalog refresh (C8).

pub mod queue;
pub mod scheduler;
pub mod worker;

pub use queue::{share_receiver, InProcessTaskQueue, SharedReceiver, TaskError, TaskFuture, TaskQueue, TaskStore};
pub use scheduler::schedule_periodic;
pub use worker::spawn_pool;
