//! Shared types for the fetch → evaluate → act pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

// ── Candidate ───────────────────────────────────────────────────────

/// One profile fetched from the remote service.
///
/// Immutable once fetched. Each evaluation task owns the candidate it
/// works on and drops it once a decision has been acted on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Service-native identifier, unique within a batch.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-text biography.
    pub bio: String,
    /// School names, in the order the service lists them.
    pub schools: Vec<String>,
    /// Shared-interest names, in the order the service lists them.
    pub interests: Vec<String>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = bio.into();
        self
    }

    pub fn with_school(mut self, school: impl Into<String>) -> Self {
        self.schools.push(school.into());
        self
    }

    pub fn with_interest(mut self, interest: impl Into<String>) -> Self {
        self.interests.push(interest.into());
        self
    }
}

/// Candidates returned by a single fetch call.
pub type Batch = Vec<Candidate>;

// ── Decision ────────────────────────────────────────────────────────

/// Outcome of evaluating a candidate against the filter rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Send an approval for this candidate.
    Approve { reason: String },
    /// Send a rejection for this candidate.
    Reject { reason: String },
}

impl Decision {
    pub fn approve(reason: impl Into<String>) -> Self {
        Self::Approve {
            reason: reason.into(),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self::Reject {
            reason: reason.into(),
        }
    }

    pub fn is_approve(&self) -> bool {
        matches!(self, Self::Approve { .. })
    }

    /// Which rule fired.
    pub fn reason(&self) -> &str {
        match self {
            Self::Approve { reason } | Self::Reject { reason } => reason,
        }
    }

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Approve { .. } => "approve",
            Self::Reject { .. } => "reject",
        }
    }
}

// ── Approval hand-off ───────────────────────────────────────────────

/// An approved identifier in flight from an evaluation task to the action sink.
///
/// The sink completes `ack` once the identifier has been handled (submitted,
/// skipped on error, or counted in dry-run). The sending task waits on it.
#[derive(Debug)]
pub struct ApprovalTicket {
    pub candidate_id: String,
    pub name: String,
    pub reason: String,
    pub ack: oneshot::Sender<()>,
}

impl ApprovalTicket {
    pub fn new(candidate: &Candidate, reason: &str) -> (Self, oneshot::Receiver<()>) {
        let (ack, done) = oneshot::channel();
        let ticket = Self {
            candidate_id: candidate.id.clone(),
            name: candidate.name.clone(),
            reason: reason.to_string(),
            ack,
        };
        (ticket, done)
    }
}

// ── Reports ─────────────────────────────────────────────────────────

/// What happened to one dispatched batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub candidates: usize,
    pub approved: usize,
    pub rejected: usize,
    pub rejection_failures: usize,
}

impl DispatchReport {
    pub(crate) fn merge(&mut self, other: DispatchReport) {
        self.candidates += other.candidates;
        self.approved += other.approved;
        self.rejected += other.rejected;
        self.rejection_failures += other.rejection_failures;
    }
}

/// Why the decision loop stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum StopReason {
    /// The approval quota was reached.
    QuotaReached,
    /// A fetch call failed; the loop does not retry.
    FetchFailed(String),
    /// The service kept returning empty batches.
    Exhausted,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaReached => write!(f, "quota reached"),
            Self::FetchFailed(reason) => write!(f, "fetch failed: {reason}"),
            Self::Exhausted => write!(f, "no more candidates"),
        }
    }
}

/// Final report of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub approvals: usize,
    pub matches: usize,
    pub batches: usize,
    pub rejections: usize,
    pub stop_reason: StopReason,
}
