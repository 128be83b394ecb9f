//! Decision loop — fetch a batch, dispatch it, repeat until told to stop.
//!
//! ```text
//! Fetching ──non-empty──▶ Dispatching ──keep searching──▶ Fetching
//!    │  └──empty──▶ Idle ──wait──▶ Fetching                 │
//!    │               └──too many empty rounds──▶ Stopped     │
//!    └──error──▶ Stopped ◀──────────quota reached────────────┘
//! ```
//!
//! The quota is checked only between batches. A batch that is already being
//! dispatched always runs to completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::client::ProfileService;
use crate::pipeline::dispatcher::BatchDispatcher;
use crate::pipeline::quota::QuotaState;
use crate::pipeline::types::{ApprovalTicket, Batch, DispatchReport, StopReason};

/// Loop tuning knobs.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// `limit` passed to every fetch call.
    pub fetch_limit: usize,
    /// Pause after an empty batch before fetching again.
    pub idle_interval: Duration,
    /// Consecutive empty batches tolerated before giving up.
    pub max_idle_rounds: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            fetch_limit: 30,
            idle_interval: Duration::from_secs(5),
            max_idle_rounds: 3,
        }
    }
}

/// States of the decision loop.
#[derive(Debug)]
pub enum LoopState {
    Fetching,
    Dispatching(Batch),
    Idle,
    Stopped(StopReason),
}

impl LoopState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Dispatching(_) => "dispatching",
            Self::Idle => "idle",
            Self::Stopped(_) => "stopped",
        }
    }
}

/// What the loop did before it stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    pub stop_reason: StopReason,
    pub batches: usize,
    pub totals: DispatchReport,
}

/// Drives fetch → dispatch cycles against the profile service.
pub struct DecisionLoop {
    config: LoopConfig,
    service: Arc<dyn ProfileService>,
    dispatcher: BatchDispatcher,
    quota: Arc<QuotaState>,
}

impl DecisionLoop {
    pub fn new(
        config: LoopConfig,
        service: Arc<dyn ProfileService>,
        dispatcher: BatchDispatcher,
        quota: Arc<QuotaState>,
    ) -> Self {
        Self {
            config,
            service,
            dispatcher,
            quota,
        }
    }

    /// Run until the quota is reached, a fetch fails, or the service runs dry.
    ///
    /// Consumes the approval sender so the channel closes when the loop ends.
    pub async fn run(self, approved_out: mpsc::Sender<ApprovalTicket>) -> LoopOutcome {
        let mut state = if self.quota.keep_searching() {
            LoopState::Fetching
        } else {
            LoopState::Stopped(StopReason::QuotaReached)
        };
        let mut batches = 0;
        let mut idle_rounds = 0;
        let mut totals = DispatchReport::default();

        loop {
            debug!(state = state.label(), "Decision loop step");
            state = match state {
                LoopState::Fetching => {
                    let fetched = self.service.fetch_candidates(self.config.fetch_limit).await;
                    match fetched {
                        Ok(batch) if batch.is_empty() => {
                            idle_rounds += 1;
                            if idle_rounds > self.config.max_idle_rounds {
                                LoopState::Stopped(StopReason::Exhausted)
                            } else {
                                LoopState::Idle
                            }
                        }
                        Ok(batch) => {
                            idle_rounds = 0;
                            LoopState::Dispatching(batch)
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to fetch candidates");
                            LoopState::Stopped(StopReason::FetchFailed(e.to_string()))
                        }
                    }
                }
                LoopState::Dispatching(batch) => {
                    batches += 1;
                    info!(batch = batches, size = batch.len(), "Dispatching batch");
                    let report = self.dispatcher.dispatch(batch, &approved_out).await;
                    totals.merge(report);

                    if self.quota.keep_searching() {
                        LoopState::Fetching
                    } else {
                        LoopState::Stopped(StopReason::QuotaReached)
                    }
                }
                LoopState::Idle => {
                    debug!(
                        idle_rounds,
                        wait_ms = self.config.idle_interval.as_millis() as u64,
                        "Empty batch, waiting before next fetch"
                    );
                    tokio::time::sleep(self.config.idle_interval).await;
                    LoopState::Fetching
                }
                LoopState::Stopped(stop_reason) => {
                    info!(reason = %stop_reason, batches, "Decision loop stopped");
                    return LoopOutcome {
                        stop_reason,
                        batches,
                        totals,
                    };
                }
            };
        }
    }
}
