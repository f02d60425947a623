//! The OUT → IN feeder task
//!
//! Single consumer of OUT and single producer of IN. Blocks on the bounded
//! IN queue when workers fall behind (backpressure); exits, dropping the IN
//! sender so workers drain and stop, when either every registered
//! domain is finished or a shutdown was requested.

use crate::crawler::stats::CrawlCounters;
use crate::queue::{InSender, OutQueue};
use crate::state::{FetchController, RunState};
use std::sync::Arc;
use std::time::Duration;

/// How long the feeder sleeps between idle condition re-checks
const IDLE_RECHECK: Duration = Duration::from_millis(200);

/// Runs the feeder until drain or shutdown. Consumes the IN sender so that
/// returning closes the queue.
pub async fn run_feeder(
    out: Arc<OutQueue>,
    in_tx: InSender,
    controller: Arc<FetchController>,
    run_state: Arc<RunState>,
    counters: Arc<CrawlCounters>,
) {
    loop {
        while let Some(request) = out.pop() {
            if !run_state.is_running() {
                tracing::debug!("Feeder stopping; {} queued URLs dropped", out.len() + 1);
                return;
            }
            if in_tx.send(request).await.is_err() {
                // All workers gone; nothing left to feed
                tracing::debug!("Feeder exiting: IN queue receiver dropped");
                return;
            }
            counters.in_queue_pushed();
        }

        if !run_state.is_running() {
            tracing::debug!("Feeder draining complete after shutdown request");
            return;
        }

        // OUT is empty. When nothing is outstanding anywhere, the crawl is
        // done and closing IN releases the workers.
        if controller.registered_count() > 0 && controller.total_outstanding() == 0 {
            tracing::debug!("Feeder exiting: all domains finished");
            return;
        }

        tokio::select! {
            _ = out.wait_for_push() => {}
            _ = tokio::time::sleep(IDLE_RECHECK) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{FetchRequest, RequestKind};
    use crate::queue::in_queue;

    fn request(url: &str) -> FetchRequest {
        FetchRequest::seed(url, RequestKind::Internal, "example.com", "example.com")
    }

    #[tokio::test]
    async fn test_feeder_moves_out_to_in_and_closes_when_done() {
        let out = Arc::new(OutQueue::new());
        let controller = Arc::new(FetchController::new(10));
        let run_state = Arc::new(RunState::new());
        let counters = Arc::new(CrawlCounters::new(1));

        controller.register_seed("example.com", 2).unwrap();
        out.push(request("https://example.com/a"));
        out.push(request("https://example.com/b"));

        let (in_tx, in_rx) = in_queue(10);
        let feeder = tokio::spawn(run_feeder(
            Arc::clone(&out),
            in_tx,
            Arc::clone(&controller),
            Arc::clone(&run_state),
            counters,
        ));

        // Drain both, completing them so the controller reaches zero
        for _ in 0..2 {
            let pulled = in_rx.lock().await.recv().await.unwrap();
            assert_eq!(pulled.domain_key, "example.com");
            controller.complete("example.com").unwrap();
        }

        // With everything finished, the feeder exits and closes IN
        tokio::time::timeout(Duration::from_secs(2), feeder)
            .await
            .expect("feeder should exit")
            .unwrap();
        assert!(in_rx.lock().await.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_feeder_exits_on_shutdown() {
        let out = Arc::new(OutQueue::new());
        let controller = Arc::new(FetchController::new(10));
        let run_state = Arc::new(RunState::new());
        let counters = Arc::new(CrawlCounters::new(1));

        let (in_tx, _in_rx) = in_queue(10);
        let feeder = tokio::spawn(run_feeder(
            Arc::clone(&out),
            in_tx,
            controller,
            Arc::clone(&run_state),
            counters,
        ));

        run_state.begin_shutdown();
        tokio::time::timeout(Duration::from_secs(2), feeder)
            .await
            .expect("feeder should exit on shutdown")
            .unwrap();
    }
}
