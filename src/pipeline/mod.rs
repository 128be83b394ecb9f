//! Candidate decision pipeline.
//!
//! Every run flows through:
//! 1. `DecisionLoop` — fetches a batch from the `ProfileService`
//! 2. `BatchDispatcher` — evaluates each candidate concurrently via `RulesEngine`
//! 3. `ActionSink` — submits approvals one at a time and tracks the quota
//!
//! Rejections are submitted directly by the dispatcher. The loop only stops
//! between batches: quota reached, fetch error, or the service running dry.

pub mod decision_loop;
pub mod dispatcher;
pub mod quota;
pub mod rules;
pub mod runner;
pub mod sink;
pub mod types;

pub use decision_loop::{DecisionLoop, LoopConfig, LoopOutcome, LoopState};
pub use dispatcher::BatchDispatcher;
pub use quota::{QuotaSnapshot, QuotaState};
pub use rules::{FilterRules, RulesEngine, evaluate};
pub use runner::{PipelineConfig, run};
pub use sink::ActionSink;
pub use types::{Batch, Candidate, Decision, DispatchReport, RunSummary, StopReason};
