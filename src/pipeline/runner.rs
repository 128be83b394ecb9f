//! One end-to-end run: spawn the sink, drive the loop, join, summarize.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::client::ProfileService;
use crate::error::{ConfigError, PipelineError};
use crate::pipeline::decision_loop::{DecisionLoop, LoopConfig};
use crate::pipeline::dispatcher::BatchDispatcher;
use crate::pipeline::quota::QuotaState;
use crate::pipeline::rules::{FilterRules, RulesEngine};
use crate::pipeline::sink::ActionSink;
use crate::pipeline::types::RunSummary;

/// Approval hand-off buffer. Each ticket also waits for an acknowledgement,
/// so this only decides how many tickets may queue ahead of the sink.
const APPROVAL_CHANNEL_CAPACITY: usize = 1;

/// Settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Stop after this many approvals (must be positive).
    pub quota: usize,
    /// Skip every remote submission but keep counting.
    pub dry_run: bool,
    /// Cap on concurrently evaluated candidates. `None` = batch width.
    pub max_in_flight: Option<usize>,
    pub loop_config: LoopConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            quota: 30,
            dry_run: false,
            max_in_flight: None,
            loop_config: LoopConfig::default(),
        }
    }
}

/// Run the fetch → evaluate → act pipeline until the loop stops.
///
/// Fails before touching the service if the quota is zero or the filter
/// holds a blank key.
pub async fn run(
    config: &PipelineConfig,
    filter: &FilterRules,
    service: Arc<dyn ProfileService>,
) -> Result<RunSummary, PipelineError> {
    if config.quota == 0 {
        return Err(ConfigError::InvalidValue {
            key: "quota".into(),
            message: "must be greater than zero".into(),
        }
        .into());
    }
    filter.validate()?;

    let run_id = Uuid::new_v4();
    let span = info_span!("run", %run_id);
    execute(run_id, config, filter, service).instrument(span).await
}

async fn execute(
    run_id: Uuid,
    config: &PipelineConfig,
    filter: &FilterRules,
    service: Arc<dyn ProfileService>,
) -> Result<RunSummary, PipelineError> {
    let started_at = Utc::now();
    info!(
        quota = config.quota,
        dry_run = config.dry_run,
        fetch_limit = config.loop_config.fetch_limit,
        "Starting decision loop"
    );

    let quota = QuotaState::new(config.quota);
    let rules = Arc::new(RulesEngine::from_rules(filter));
    let (tx, rx) = mpsc::channel(APPROVAL_CHANNEL_CAPACITY);

    let sink = ActionSink::new(Arc::clone(&service), Arc::clone(&quota), config.dry_run).spawn(rx);

    let dispatcher = BatchDispatcher::new(rules, Arc::clone(&service), config.dry_run)
        .with_max_in_flight(config.max_in_flight);
    let outcome = DecisionLoop::new(
        config.loop_config.clone(),
        service,
        dispatcher,
        Arc::clone(&quota),
    )
    .run(tx)
    .await;

    let final_counts = sink
        .await
        .map_err(|e| PipelineError::SinkJoin(e.to_string()))?;

    let summary = RunSummary {
        run_id,
        started_at,
        finished_at: Utc::now(),
        approvals: final_counts.approvals,
        matches: final_counts.matches,
        batches: outcome.batches,
        rejections: outcome.totals.rejected,
        stop_reason: outcome.stop_reason,
    };
    info!(
        approvals = summary.approvals,
        matches = summary.matches,
        batches = summary.batches,
        reason = %summary.stop_reason,
        "Run finished"
    );
    Ok(summary)
}
