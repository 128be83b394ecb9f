//! Approval quota shared between the action sink and the decision loop.
//!
//! The sink is the only writer. The loop reads `keep_searching` between
//! batches, after every approval of the batch has been acknowledged, so the
//! release/acquire pair below is enough to make the sink's writes visible.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub approvals: usize,
    pub matches: usize,
    pub keep_searching: bool,
}

/// Approval counters and the keep-searching flag.
#[derive(Debug)]
pub struct QuotaState {
    limit: usize,
    approvals: AtomicUsize,
    matches: AtomicUsize,
    keep_searching: AtomicBool,
}

impl QuotaState {
    /// Create a fresh state for `limit` approvals.
    ///
    /// A zero limit is already reached, so nothing is ever fetched.
    pub fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            limit,
            approvals: AtomicUsize::new(0),
            matches: AtomicUsize::new(0),
            keep_searching: AtomicBool::new(limit > 0),
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Record one successful approval. Returns the new approval count.
    ///
    /// Clears `keep_searching` once the count reaches the limit.
    pub fn record_approval(&self, matched: bool) -> usize {
        if matched {
            self.matches.fetch_add(1, Ordering::Relaxed);
        }
        let approvals = self.approvals.fetch_add(1, Ordering::AcqRel) + 1;
        if approvals >= self.limit {
            self.keep_searching.store(false, Ordering::Release);
        }
        approvals
    }

    pub fn keep_searching(&self) -> bool {
        self.keep_searching.load(Ordering::Acquire)
    }

    pub fn approvals(&self) -> usize {
        self.approvals.load(Ordering::Acquire)
    }

    pub fn matches(&self) -> usize {
        self.matches.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> QuotaSnapshot {
        QuotaSnapshot {
            approvals: self.approvals(),
            matches: self.matches(),
            keep_searching: self.keep_searching(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_searching() {
        let quota = QuotaState::new(2);
        assert_eq!(
            quota.snapshot(),
            QuotaSnapshot {
                approvals: 0,
                matches: 0,
                keep_searching: true
            }
        );
    }

    #[test]
    fn stops_at_limit() {
        let quota = QuotaState::new(2);
        assert_eq!(quota.record_approval(false), 1);
        assert!(quota.keep_searching());
        assert_eq!(quota.record_approval(true), 2);
        assert!(!quota.keep_searching());
        assert_eq!(quota.matches(), 1);
    }

    #[test]
    fn zero_limit_starts_stopped() {
        let quota = QuotaState::new(0);
        assert!(!quota.keep_searching());
        assert_eq!(quota.approvals(), 0);
    }

    #[test]
    fn counts_past_limit() {
        let quota = QuotaState::new(1);
        quota.record_approval(false);
        quota.record_approval(false);
        assert_eq!(quota.approvals(), 2);
        assert!(!quota.keep_searching());
    }
}
