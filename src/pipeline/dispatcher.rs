//! Batch dispatcher — concurrent evaluation of one fetched batch.
//!
//! One task per candidate. Approvals are handed to the action sink and the
//! task waits for the sink's acknowledgement; rejections are submitted inline.
//! `dispatch` returns only after every task of the batch has finished.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::client::ProfileService;
use crate::pipeline::rules::RulesEngine;
use crate::pipeline::types::{ApprovalTicket, Batch, Candidate, Decision, DispatchReport};

/// What a single evaluation task ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Approved,
    Rejected,
    RejectionFailed,
    /// The sink was gone before the approval could be handed over.
    Dropped,
}

/// Fans a batch out over concurrent evaluation tasks.
#[derive(Clone)]
pub struct BatchDispatcher {
    rules: Arc<RulesEngine>,
    service: Arc<dyn ProfileService>,
    dry_run: bool,
    /// Caps concurrent evaluation tasks. `None` runs the whole batch at once.
    limiter: Option<Arc<Semaphore>>,
}

impl BatchDispatcher {
    pub fn new(rules: Arc<RulesEngine>, service: Arc<dyn ProfileService>, dry_run: bool) -> Self {
        Self {
            rules,
            service,
            dry_run,
            limiter: None,
        }
    }

    /// Limit how many candidates are evaluated at the same time.
    pub fn with_max_in_flight(mut self, max_in_flight: Option<usize>) -> Self {
        self.limiter = max_in_flight.map(|n| Arc::new(Semaphore::new(n.max(1))));
        self
    }

    /// Evaluate and act on every candidate in `batch`, then return.
    pub async fn dispatch(
        &self,
        batch: Batch,
        approved_out: &mpsc::Sender<ApprovalTicket>,
    ) -> DispatchReport {
        let mut report = DispatchReport {
            candidates: batch.len(),
            ..Default::default()
        };
        let mut tasks = JoinSet::new();

        for candidate in batch {
            debug!(id = %candidate.id, name = %candidate.name, "Dispatching candidate");
            let worker = self.clone();
            let approved_out = approved_out.clone();
            tasks.spawn(async move {
                let _permit = match &worker.limiter {
                    Some(limiter) => limiter.clone().acquire_owned().await.ok(),
                    None => None,
                };
                worker.process(candidate, approved_out).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Outcome::Approved) => report.approved += 1,
                Ok(Outcome::Rejected) => report.rejected += 1,
                Ok(Outcome::RejectionFailed) => {
                    report.rejected += 1;
                    report.rejection_failures += 1;
                }
                Ok(Outcome::Dropped) => {}
                Err(e) => error!(error = %e, "Evaluation task failed"),
            }
        }

        debug!(?report, "Batch dispatched");
        report
    }

    async fn process(
        &self,
        candidate: Candidate,
        approved_out: mpsc::Sender<ApprovalTicket>,
    ) -> Outcome {
        match self.rules.evaluate(&candidate) {
            Decision::Approve { reason } => {
                info!(id = %candidate.id, name = %candidate.name, reason = %reason, "Approving");
                let (ticket, done) = ApprovalTicket::new(&candidate, &reason);
                if approved_out.send(ticket).await.is_err() {
                    warn!(id = %candidate.id, "Action sink closed, approval dropped");
                    return Outcome::Dropped;
                }
                if done.await.is_err() {
                    warn!(id = %candidate.id, "Action sink stopped before acknowledging");
                    return Outcome::Dropped;
                }
                Outcome::Approved
            }
            Decision::Reject { reason } => {
                info!(id = %candidate.id, name = %candidate.name, reason = %reason, "Rejecting");
                if self.dry_run {
                    debug!(id = %candidate.id, "Dry run, rejection not submitted");
                    return Outcome::Rejected;
                }
                match self.service.submit_rejection(&candidate.id).await {
                    Ok(()) => Outcome::Rejected,
                    Err(e) => {
                        warn!(id = %candidate.id, error = %e, "Rejection failed");
                        Outcome::RejectionFailed
                    }
                }
            }
        }
    }
}
