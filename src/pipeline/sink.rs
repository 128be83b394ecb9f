//! Action sink — the single consumer of approved identifiers.
//!
//! Approvals are submitted strictly one at a time, in the order the channel
//! delivers them. This is the only place `submit_approval` is called.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::ProfileService;
use crate::pipeline::quota::{QuotaSnapshot, QuotaState};
use crate::pipeline::types::ApprovalTicket;

/// Drains approval tickets and updates the quota.
pub struct ActionSink {
    service: Arc<dyn ProfileService>,
    quota: Arc<QuotaState>,
    dry_run: bool,
}

impl ActionSink {
    pub fn new(service: Arc<dyn ProfileService>, quota: Arc<QuotaState>, dry_run: bool) -> Self {
        Self {
            service,
            quota,
            dry_run,
        }
    }

    /// Spawn the drain loop. The task ends once every sender is dropped.
    pub fn spawn(self, rx: mpsc::Receiver<ApprovalTicket>) -> JoinHandle<QuotaSnapshot> {
        tokio::spawn(self.run(rx))
    }

    /// Drain tickets until the channel closes, then return the final counters.
    ///
    /// Tickets that arrive after the quota is reached are still handled: they
    /// belong to the batch that was in flight when the limit was hit.
    pub async fn run(self, mut rx: mpsc::Receiver<ApprovalTicket>) -> QuotaSnapshot {
        debug!(dry_run = self.dry_run, limit = self.quota.limit(), "Action sink started");

        while let Some(ticket) = rx.recv().await {
            self.handle(&ticket).await;
            // The dispatcher may have given up on this ticket already.
            let _ = ticket.ack.send(());
        }

        let snapshot = self.quota.snapshot();
        debug!(
            approvals = snapshot.approvals,
            matches = snapshot.matches,
            "Action sink drained"
        );
        snapshot
    }

    async fn handle(&self, ticket: &ApprovalTicket) {
        let matched = if self.dry_run {
            false
        } else {
            match self.service.submit_approval(&ticket.candidate_id).await {
                Ok(matched) => matched,
                Err(e) => {
                    warn!(
                        id = %ticket.candidate_id,
                        error = %e,
                        "Approval failed, skipping candidate"
                    );
                    return;
                }
            }
        };

        let approvals = self.quota.record_approval(matched);
        info!(
            id = %ticket.candidate_id,
            name = %ticket.name,
            reason = %ticket.reason,
            matched,
            approvals,
            dry_run = self.dry_run,
            "Approved candidate"
        );

        if approvals == self.quota.limit() {
            info!(approvals, "Approval quota reached");
        }
    }
}
