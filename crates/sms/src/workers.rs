//! Background jobs: outbox delivery and the feedback sweep.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use courtcall_core::errors::CourtResult;
use courtcall_core::store::Store;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::delivery::DeliveryWorker;
use crate::feedback::FeedbackScheduler;
use crate::gateway::SmsGateway;

#[async_trait]
pub trait Job: Send + Sync {
    /// Used in logs.
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    async fn execute(&self) -> CourtResult<()>;
}

pub struct DeliveryJob<S, G> {
    worker: DeliveryWorker<S, G>,
    interval: Duration,
}

impl<S, G> DeliveryJob<S, G> {
    pub fn new(worker: DeliveryWorker<S, G>, interval: Duration) -> Self {
        Self { worker, interval }
    }
}

#[async_trait]
impl<S: Store, G: SmsGateway> Job for DeliveryJob<S, G> {
    fn name(&self) -> &'static str {
        "sms_delivery"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self) -> CourtResult<()> {
        self.worker.drain_once().await.map(|_| ())
    }
}

pub struct FeedbackSweepJob<S> {
    feedback: FeedbackScheduler<S>,
    interval: Duration,
}

impl<S> FeedbackSweepJob<S> {
    pub fn new(feedback: FeedbackScheduler<S>, interval: Duration) -> Self {
        Self { feedback, interval }
    }
}

#[async_trait]
impl<S: Store> Job for FeedbackSweepJob<S> {
    fn name(&self) -> &'static str {
        "feedback_sweep"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self) -> CourtResult<()> {
        self.feedback.run_due().await.map(|_| ())
    }
}

/// Runs registered jobs on fixed intervals until shut down.
pub struct Workers {
    jobs: Vec<Arc<dyn Job>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Workers {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            jobs: Vec::new(),
            shutdown_tx,
            shutdown_rx,
            handles: Vec::new(),
        }
    }

    pub fn register<J: Job + 'static>(&mut self, job: J) {
        self.jobs.push(Arc::new(job));
    }

    pub fn start(&mut self) {
        info!("Starting {} background jobs", self.jobs.len());

        for job in &self.jobs {
            let job = Arc::clone(job);
            let mut shutdown_rx = self.shutdown_rx.clone();

            let handle = tokio::spawn(async move {
                let name = job.name();
                let mut interval = tokio::time::interval(job.interval());
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            let start = Instant::now();
                            match job.execute().await {
                                Ok(()) => debug!(
                                    job = name,
                                    elapsed_ms = start.elapsed().as_millis() as u64,
                                    "Job run finished"
                                ),
                                Err(e) => error!(
                                    job = name,
                                    elapsed_ms = start.elapsed().as_millis() as u64,
                                    error = %e,
                                    "Job run failed"
                                ),
                            }
                        }
                        _ = shutdown_rx.changed() => {
                            if *shutdown_rx.borrow() {
                                info!(job = name, "Job shutting down");
                                break;
                            }
                        }
                    }
                }
            });

            self.handles.push(handle);
        }
    }

    pub fn shutdown(&self) {
        info!("Stopping background jobs");
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn wait_for_shutdown(self, timeout: Duration) {
        let joined = async {
            for handle in self.handles {
                if let Err(e) = handle.await {
                    warn!("Job task panicked: {}", e);
                }
            }
        };

        match tokio::time::timeout(timeout, joined).await {
            Ok(()) => info!("All background jobs stopped"),
            Err(_) => warn!("Background jobs did not stop within {:?}", timeout),
        }
    }
}

impl Default for Workers {
    fn default() -> Self {
        Self::new()
    }
}
