mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::{Harness, club_config};
use courtcall_core::errors::{CourtError, CourtResult};
use courtcall_core::models::outbox::{DeliveryStatus, OutboundSms};
use courtcall_sms::config::SmsConfig;
use courtcall_sms::dispatch::Dispatcher;
use courtcall_sms::gateway::LogGateway;
use courtcall_sms::start_workers_with;
use courtcall_sms::workers::{Job, Workers};
use pretty_assertions::assert_eq;

struct CountingJob {
    runs: Arc<AtomicUsize>,
    fail: bool,
}

#[async_trait]
impl Job for CountingJob {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(10)
    }

    async fn execute(&self) -> CourtResult<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(CourtError::Delivery("boom".to_string()))
        } else {
            Ok(())
        }
    }
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_jobs_run_on_interval_until_shutdown() {
    let runs = Arc::new(AtomicUsize::new(0));
    let failing_runs = Arc::new(AtomicUsize::new(0));

    let mut workers = Workers::new();
    workers.register(CountingJob { runs: runs.clone(), fail: false });
    workers.register(CountingJob { runs: failing_runs.clone(), fail: true });
    workers.start();

    // Ticks at 0s, 10s and 20s.
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 3);
    // A failing run does not stop the job.
    assert_eq!(failing_runs.load(Ordering::SeqCst), 3);

    workers.shutdown();
    workers.wait_for_shutdown(Duration::from_secs(5)).await;

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_started_workers_drain_the_outbox() {
    let h = Harness::new(club_config(), 1).await;
    Dispatcher::new(h.store.clone(), h.clock.clone())
        .send(&h.club, OutboundSms::notice(h.phone(0), "hello"))
        .await
        .unwrap();

    let config = SmsConfig {
        poll_interval_seconds: 1,
        ..SmsConfig::default()
    };
    let workers = start_workers_with(&h.engine, Arc::new(LogGateway), h.clock.clone(), &config);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    workers.shutdown();
    workers.wait_for_shutdown(Duration::from_secs(5)).await;

    let messages = h.store.outbox_messages().await;
    assert_eq!(messages[0].status, DeliveryStatus::Delivered);
}
