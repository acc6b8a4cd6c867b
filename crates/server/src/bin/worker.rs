//! `gateway-worker`: a placeholder standalone worker-pool process.
//!
//! It does **not** drain `gateway-server`'s task queue -- C6's queue is
//! in-process only (an explicit Non-goal: no external broker), so two
//! separate OS processes have no channel in common. This binary spins
//! up its own pool against a queue nothing ever enqueues onto, so it
//! idles forever; it exists as the scaffold a Redis- or SQS-backed
//! `TaskQueue` would plug into to let the pool run as its own scalable
//! process, not as a usable deployment mode today. `gateway-server`
//! remains the only binary that actually executes enqueued tasks.

use clap::Parser;
use gateway_tasks::{share_receiver, InProcessTaskQueue, TaskStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "gateway-worker", about = "LLM API gateway task worker pool")]
struct Args {
    #[arg(long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "GATEWAY_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = gateway_config::load(args.config.as_deref())?;

    init_logging(args.log_dir.or_else(|| settings.log_dir.clone().map(PathBuf::from)), args.verbose);

    tracing::warn!(
        "gateway-worker does not share gateway-server's task queue (C6 has no external broker); \
         this process will idle without ever executing a real task. Run gateway-server alone \
         unless you are developing against a future shared-queue backend."
    );

    let store = Arc::new(TaskStore::new(Duration::from_secs(settings.task_retention_seconds)));
    let (_queue, receiver) = InProcessTaskQueue::new(store.clone(), 1024);
    let handles = gateway_tasks::spawn_pool(share_receiver(receiver), store, settings.worker_count);

    tracing::info!(worker_count = settings.worker_count, "gateway-worker pool started (idle placeholder)");
    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}

fn init_logging(log_dir: Option<PathBuf>, verbose: u8) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if let Some(dir) = log_dir {
        let file_appender = tracing_appender::rolling::daily(dir, "gateway-worker.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // guard is intentionally leaked: it must outlive the process,
        // and this binary has no other place to hold it.
        std::mem::forget(guard);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .with(fmt::layer().json().with_writer(non_blocking))
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(fmt::layer().json()).init();
    }
}
