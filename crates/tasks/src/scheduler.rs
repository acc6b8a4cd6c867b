//! Periodic task scheduling, used by C8 to re-trigger the catalog
//! refresh on an interval (and once at startup). General shape only --
//! the specific refresh logic lives in `gateway-orchestrator`.

use std::future::Future;
use std::time::Duration;

/// Run `job` once immediately, then again every `interval`, until the
/// returned handle is aborted or dropped.
pub fn schedule_periodic<F, Fut>(interval: Duration, mut job: F) -> tokio::task::JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        job().await;
        let mut ticker = tokio::time::interval(interval);
        // the first tick fires immediately; we already ran the job
        // above, so skip it to avoid a duplicate back-to-back run.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            job().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn runs_immediately_then_on_interval() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let handle = schedule_periodic(Duration::from_secs(60), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        handle.abort();
    }
}
