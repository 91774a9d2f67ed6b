//! 🧵 Workers: the poll loop, the one that actually shows up every interval while the
//! Supervisor takes all the credit in the sprint retro.
//!
//! 🔄 State machine:
//!
//! ```text
//!   Idle ──▶ Fetching ──batch──▶ Processing ──▶ Recording ──▶ Sleeping ──▶ Fetching …
//!               │  └──none / fetch error──────────────────────────▲
//!               └──shutdown──▶ ShuttingDown ◀──shutdown── Sleeping
//! ```
//!
//! - One batch at a time. No fan-out, no concurrency, no locks.
//! - `Processing` runs the whole batch, including the one report to the controller.
//!   `Recording` only books the outcome into `PollStats`.
//! - Nothing that happens to a single batch ends the loop. Only the shutdown token does.
//! - Shutdown is observed at suspension points (before and during a fetch, during the nap),
//!   never mid-batch. An in-flight batch always finishes and reports. A fetch does not: it
//!   is abandoned, since no batch was handed to us yet.
//!
//! ⚠️ "If you're reading this, the code review went poorly." 🦆

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::app_config::RuntimeConfig;
use crate::backends::Controller;
use crate::common::EnhancementBatch;
use crate::supervisors::{BatchOutcome, Supervisor};

/// 📊 What the loop got up to. Returned on shutdown, for the farewell log line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollStats {
    pub fetches: u64,
    pub empty_polls: u64,
    pub poll_failures: u64,
    pub batches_succeeded: u64,
    pub batches_failed: u64,
    /// 💤 naps that ran to completion (an interrupted nap doesn't count)
    pub sleeps: u64,
}

/// 🚦 Where the loop is right now.
#[derive(Debug)]
enum PollState {
    Idle,
    Fetching,
    /// 🚚 compose, upload and report, all inside `Supervisor::process`
    Processing(EnhancementBatch),
    /// 📊 the report is already sent; this just books the outcome
    Recording(EnhancementBatch, Option<BatchOutcome>),
    Sleeping,
    ShuttingDown,
}

/// 🔁 Fetch, process, report, nap. Repeat until told to stop.
#[derive(Debug)]
pub(crate) struct Poller<C, R> {
    controller: Arc<C>,
    supervisor: Supervisor<C, R>,
    batch_size: u32,
    interval: Duration,
    stats: PollStats,
}

impl<C: Controller, R: Rng + Send> Poller<C, R> {
    pub(crate) fn new(controller: Arc<C>, supervisor: Supervisor<C, R>, runtime: &RuntimeConfig) -> Self {
        Self::with_interval(controller, supervisor, runtime.batch_size, runtime.poll_interval())
    }

    /// 🔧 Same as `new`, minus the config. Tests want millisecond naps, config only does seconds.
    pub(crate) fn with_interval(
        controller: Arc<C>,
        supervisor: Supervisor<C, R>,
        batch_size: u32,
        interval: Duration,
    ) -> Self {
        Self {
            controller,
            supervisor,
            batch_size,
            interval,
            stats: PollStats::default(),
        }
    }

    /// 🚀 Run until `shutdown` is cancelled. Never returns early for any other reason.
    pub(crate) async fn run(mut self, shutdown: CancellationToken) -> PollStats {
        let mut state = PollState::Idle;
        loop {
            state = match state {
                PollState::Idle => {
                    info!("🔄 starting to poll for robot enhancement batches");
                    PollState::Fetching
                }
                PollState::Fetching => self.fetch(&shutdown).await,
                PollState::Processing(batch) => {
                    let outcome = match self.supervisor.process(&batch).await {
                        Ok(outcome) => Some(outcome),
                        Err(err) => {
                            // -- 💀 unreported or report-failed: log it, count it, keep polling
                            error!("💀 error processing batch {}: {:#}", batch.id, anyhow::Error::new(err));
                            None
                        }
                    };
                    PollState::Recording(batch, outcome)
                }
                PollState::Recording(batch, outcome) => {
                    self.record(&batch, outcome);
                    PollState::Sleeping
                }
                PollState::Sleeping => {
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => PollState::ShuttingDown,
                        _ = tokio::time::sleep(self.interval) => {
                            self.stats.sleeps += 1;
                            PollState::Fetching
                        }
                    }
                }
                PollState::ShuttingDown => break,
            };
        }

        info!("🛑 poll loop stopped: {:?}", self.stats);
        self.stats
    }

    async fn fetch(&mut self, shutdown: &CancellationToken) -> PollState {
        if shutdown.is_cancelled() {
            return PollState::ShuttingDown;
        }
        self.stats.fetches += 1;
        let polled = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!("🛑 shutdown requested mid-poll, abandoning the fetch");
                return PollState::ShuttingDown;
            }
            polled = self.controller.poll_batch(self.batch_size) => polled,
        };
        match polled {
            Ok(Some(batch)) => {
                info!("📥 found batch {} to process", batch.id);
                PollState::Processing(batch)
            }
            Ok(None) => {
                self.stats.empty_polls += 1;
                debug!("💤 no batches available");
                PollState::Sleeping
            }
            Err(err) => {
                self.stats.poll_failures += 1;
                error!("💀 error during polling: {}", err);
                PollState::Sleeping
            }
        }
    }

    fn record(&mut self, batch: &EnhancementBatch, outcome: Option<BatchOutcome>) {
        match outcome {
            Some(BatchOutcome { failure: None, .. }) => self.stats.batches_succeeded += 1,
            Some(BatchOutcome {
                failure: Some(err), ..
            }) => {
                self.stats.batches_failed += 1;
                // -- 📣 already reported to the controller; this one is for the humans
                error!("💀 batch {} failed (reported): {:#}", batch.id, anyhow::Error::new(err));
            }
            None => self.stats.batches_failed += 1,
        }
    }
}
