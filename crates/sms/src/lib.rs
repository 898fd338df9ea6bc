//! # CourtCall SMS engine
//!
//! Everything that turns match requests into texts and texts back into match
//! changes:
//!
//! - [`router`]: inbound texts are parsed and applied to the invite ledger
//! - [`scheduler`]: per-match timers that send invites in batches
//! - [`feedback`]: post-match rating requests, reminders and resends
//! - [`dispatch`]: the quiet-hours gate in front of the outbox
//! - [`delivery`]: drains the outbox through an [`gateway::SmsGateway`]
//! - [`engine`]: the facade the HTTP layer talks to
//!
//! [`start_workers`] launches the delivery poller and the feedback sweep.

use std::sync::Arc;
use std::time::Duration;

use courtcall_core::clock::Clock;
use courtcall_core::store::{CandidateRanker, Store};
use eyre::Result;
use tracing::info;

pub mod config;
pub mod delivery;
pub mod dispatch;
pub mod engine;
pub mod feedback;
pub mod gateway;
pub mod replies;
pub mod router;
pub mod scheduler;
pub mod workers;

use config::SmsConfig;
use delivery::{DeliveryPolicy, DeliveryWorker};
use engine::Engine;
use gateway::{HttpGateway, LogGateway, SmsGateway};
use workers::{DeliveryJob, FeedbackSweepJob, Workers};

/// Starts the delivery poller and the feedback sweep against `gateway`.
pub fn start_workers_with<S, R, G>(
    engine: &Engine<S, R>,
    gateway: Arc<G>,
    clock: Arc<dyn Clock>,
    config: &SmsConfig,
) -> Workers
where
    S: Store,
    R: CandidateRanker,
    G: SmsGateway,
{
    let worker = DeliveryWorker::new(
        engine.store().clone(),
        gateway,
        clock,
        DeliveryPolicy::from(config),
    );

    let mut workers = Workers::new();
    workers.register(DeliveryJob::new(
        worker,
        Duration::from_secs(config.poll_interval_seconds),
    ));
    workers.register(FeedbackSweepJob::new(
        engine.feedback().clone(),
        Duration::from_secs(config.feedback_sweep_interval_seconds),
    ));
    workers.start();
    workers
}

/// Starts the workers with the gateway `config` describes: the HTTP gateway
/// when credentials are present, otherwise the log gateway.
pub fn start_workers<S, R>(
    engine: &Engine<S, R>,
    clock: Arc<dyn Clock>,
    config: &SmsConfig,
) -> Result<Workers>
where
    S: Store,
    R: CandidateRanker,
{
    match config.gateway_credentials() {
        Some((url, sid, token)) => {
            info!(gateway = %url, "Delivering SMS through HTTP gateway");
            let gateway = Arc::new(HttpGateway::new(url, sid, token)?);
            Ok(start_workers_with(engine, gateway, clock, config))
        }
        None => {
            info!("No SMS gateway credentials; texts will only be logged");
            Ok(start_workers_with(engine, Arc::new(LogGateway), clock, config))
        }
    }
}
