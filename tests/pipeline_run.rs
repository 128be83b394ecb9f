//! Full pipeline runs against a scripted in-memory profile service.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use match_pilot::client::ProfileService;
use match_pilot::error::{ConfigError, PipelineError, ServiceError};
use match_pilot::pipeline::{
    self, Batch, Candidate, FilterRules, LoopConfig, PipelineConfig, StopReason,
};

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Serves scripted batches (then empty ones) and records every call.
#[derive(Default)]
struct ScriptedService {
    script: Mutex<VecDeque<Result<Batch, ServiceError>>>,
    fetches: AtomicUsize,
    approvals: Mutex<Vec<String>>,
    rejections: Mutex<Vec<String>>,
}

impl ScriptedService {
    fn new(script: Vec<Result<Batch, ServiceError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        })
    }
}

#[async_trait]
impl ProfileService for ScriptedService {
    async fn fetch_candidates(&self, _limit: usize) -> Result<Batch, ServiceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn submit_approval(&self, id: &str) -> Result<bool, ServiceError> {
        // Let evaluation tasks pile up behind the sink.
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.approvals.lock().unwrap().push(id.to_string());
        if id.starts_with("fail") {
            return Err(ServiceError::RequestFailed {
                service: "scripted".into(),
                reason: "approval rejected".into(),
            });
        }
        Ok(id.starts_with("match"))
    }

    async fn submit_rejection(&self, id: &str) -> Result<(), ServiceError> {
        self.rejections.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

fn filter() -> FilterRules {
    FilterRules {
        exclude_names: vec!["bot".into()],
        schools: vec!["MIT".into()],
        interests: vec!["hiking".into()],
    }
}

fn config(quota: usize, dry_run: bool) -> PipelineConfig {
    PipelineConfig {
        quota,
        dry_run,
        max_in_flight: None,
        loop_config: LoopConfig {
            fetch_limit: 10,
            idle_interval: Duration::from_millis(1),
            max_idle_rounds: 1,
        },
    }
}

fn approved(id: &str) -> Candidate {
    Candidate::new(id, "Amy").with_school("MIT")
}

fn batch_of(prefix: &str, size: usize) -> Batch {
    (0..size).map(|i| approved(&format!("{prefix}-{i}"))).collect()
}

#[tokio::test]
async fn quota_two_batch_of_three() {
    timeout(TEST_TIMEOUT, async {
        let service = ScriptedService::new(vec![Ok(batch_of("a", 3)), Ok(batch_of("b", 3))]);
        let summary = pipeline::run(&config(2, false), &filter(), service.clone())
            .await
            .unwrap();

        assert_eq!(summary.stop_reason, StopReason::QuotaReached);
        assert_eq!(summary.batches, 1);
        assert_eq!(summary.approvals, 3);
        assert_eq!(service.fetches.load(Ordering::SeqCst), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn quota_overshoot_is_bounded_by_last_batch() {
    timeout(TEST_TIMEOUT, async {
        for (quota, size) in [(1, 1), (3, 2), (4, 5), (7, 3), (10, 4)] {
            let script = (0..10).map(|b| Ok(batch_of(&format!("b{b}"), size))).collect();
            let service = ScriptedService::new(script);
            let summary = pipeline::run(&config(quota, false), &filter(), service)
                .await
                .unwrap();

            assert_eq!(summary.stop_reason, StopReason::QuotaReached);
            assert!(summary.approvals >= quota, "quota {quota}, size {size}");
            assert!(summary.approvals < quota + size, "quota {quota}, size {size}");
        }
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn dry_run_never_calls_remote() {
    timeout(TEST_TIMEOUT, async {
        let service = ScriptedService::new(vec![Ok(vec![
            approved("match-1"),
            approved("match-2"),
            Candidate::new("r-1", "Lee"),
        ])]);
        let summary = pipeline::run(&config(2, true), &filter(), service.clone())
            .await
            .unwrap();

        assert_eq!(summary.approvals, 2);
        assert_eq!(summary.matches, 0);
        assert_eq!(summary.rejections, 1);
        assert!(service.approvals.lock().unwrap().is_empty());
        assert!(service.rejections.lock().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn failed_approvals_are_skipped() {
    timeout(TEST_TIMEOUT, async {
        let service = ScriptedService::new(vec![
            Ok(vec![approved("fail-1"), approved("ok-1")]),
            Ok(vec![approved("match-2")]),
        ]);
        let summary = pipeline::run(&config(2, false), &filter(), service.clone())
            .await
            .unwrap();

        assert_eq!(summary.approvals, 2);
        assert_eq!(summary.matches, 1);
        assert_eq!(summary.batches, 2);
        assert_eq!(service.approvals.lock().unwrap().len(), 3);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn fetch_failure_ends_run_cleanly() {
    timeout(TEST_TIMEOUT, async {
        let service = ScriptedService::new(vec![Err(ServiceError::Status {
            service: "scripted".into(),
            status: 503,
            body: "maintenance".into(),
        })]);
        let summary = pipeline::run(&config(5, false), &filter(), service)
            .await
            .unwrap();

        assert!(matches!(summary.stop_reason, StopReason::FetchFailed(ref m) if m.contains("503")));
        assert_eq!(summary.approvals, 0);
        assert_eq!(summary.batches, 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn exhausted_service_stops_run() {
    timeout(TEST_TIMEOUT, async {
        let service = ScriptedService::new(vec![Ok(vec![
            approved("1"),
            Candidate::new("2", "Botty").with_school("MIT"),
        ])]);
        let summary = pipeline::run(&config(10, false), &filter(), service.clone())
            .await
            .unwrap();

        assert_eq!(summary.stop_reason, StopReason::Exhausted);
        assert_eq!(summary.approvals, 1);
        assert_eq!(*service.rejections.lock().unwrap(), vec!["2"]);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn blank_filter_key_fails_before_fetching() {
    let service = ScriptedService::new(vec![Ok(vec![approved("1")])]);
    let filter = FilterRules {
        exclude_names: vec![String::new()],
        schools: vec!["MIT".into()],
        ..Default::default()
    };
    let err = pipeline::run(&config(5, false), &filter, service.clone())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Config(ConfigError::BlankFilterKey {
            list: "ExcludeName",
            index: 0
        })
    ));
    assert_eq!(service.fetches.load(Ordering::SeqCst), 0);
    assert!(service.rejections.lock().unwrap().is_empty());
}

#[tokio::test]
async fn zero_quota_fails_before_fetching() {
    let service = ScriptedService::new(vec![Ok(vec![approved("1")])]);
    let err = pipeline::run(&config(0, false), &filter(), service.clone())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Config(ConfigError::InvalidValue { ref key, .. }) if key == "quota"
    ));
    assert_eq!(service.fetches.load(Ordering::SeqCst), 0);
    assert!(service.approvals.lock().unwrap().is_empty());
}
