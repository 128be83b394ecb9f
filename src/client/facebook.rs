//! Facebook Graph identity lookup.
//!
//! The profile service logs in with a Facebook access token plus the
//! Facebook user id that token belongs to. This resolves the id.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::error::ServiceError;

/// Default Graph API base URL.
pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com";

const SERVICE: &str = "facebook";

#[derive(Debug, Deserialize)]
struct MeResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Resolve the Facebook user id owning `token`.
///
/// The Graph API reports bad tokens with an `error` object (usually on a
/// 4xx status), so the body is inspected before the status code.
pub async fn fetch_user_id(
    client: &reqwest::Client,
    graph_url: &str,
    token: &SecretString,
) -> Result<String, ServiceError> {
    let url = format!("{}/me", graph_url.trim_end_matches('/'));
    let response = client
        .get(&url)
        .query(&[("access_token", token.expose_secret())])
        .send()
        .await
        .map_err(|e| ServiceError::RequestFailed {
            service: SERVICE.into(),
            reason: e.to_string(),
        })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ServiceError::RequestFailed {
            service: SERVICE.into(),
            reason: format!("failed to read response: {e}"),
        })?;

    let me: MeResponse = serde_json::from_str(&body).map_err(|e| ServiceError::InvalidResponse {
        service: SERVICE.into(),
        reason: format!("HTTP {status}: {e}"),
    })?;

    if let Some(error) = me.error {
        return Err(ServiceError::AuthFailed {
            service: SERVICE.into(),
            reason: error.to_string(),
        });
    }

    let id = me.id.ok_or_else(|| ServiceError::InvalidResponse {
        service: SERVICE.into(),
        reason: "response has no user id".into(),
    })?;
    debug!(id = %id, name = me.name.as_deref().unwrap_or(""), "Resolved Facebook identity");
    Ok(id)
}
