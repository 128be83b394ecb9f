//! Remote profile service.
//!
//! The pipeline only sees the [`ProfileService`] trait. `http` holds the
//! reqwest-backed implementation and `facebook` the identity lookup it
//! needs to log in.

pub mod facebook;
pub mod http;

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::pipeline::types::Batch;

pub use http::HttpProfileService;

/// The three remote calls the pipeline makes.
#[async_trait]
pub trait ProfileService: Send + Sync {
    /// Fetch up to `limit` candidates. An error stops the decision loop.
    async fn fetch_candidates(&self, limit: usize) -> Result<Batch, ServiceError>;

    /// Approve a candidate. Returns `true` when the approval produced a mutual match.
    async fn submit_approval(&self, id: &str) -> Result<bool, ServiceError>;

    /// Reject a candidate. Best-effort; callers log failures and move on.
    async fn submit_rejection(&self, id: &str) -> Result<(), ServiceError>;
}
