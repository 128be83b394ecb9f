//! HTTP profile service backed by reqwest.
//!
//! Endpoints:
//! - `POST /auth` — exchange a Facebook token for a session token
//! - `GET /user/recs?limit=N` — fetch candidates
//! - `GET /like/{id}` — approve (response says whether it matched)
//! - `GET /pass/{id}` — reject

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::debug;

use crate::client::ProfileService;
use crate::error::ServiceError;
use crate::pipeline::types::{Batch, Candidate};

/// Default profile service base URL.
pub const DEFAULT_API_URL: &str = "https://api.gotinder.com";

const SERVICE: &str = "profile-service";
const AUTH_HEADER: &str = "X-Auth-Token";

/// The logged-in account, as reported by `/auth`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub name: String,
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<AuthUser>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    #[serde(rename = "_id", default)]
    id: String,
    #[serde(default)]
    name: String,
}

/// `results` is absent when the service has nothing to recommend.
#[derive(Debug, Deserialize)]
struct RecsResponse {
    #[serde(default)]
    results: Vec<Recommendation>,
}

#[derive(Debug, Deserialize)]
struct Recommendation {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    schools: Vec<Named>,
    #[serde(default)]
    common_interests: Vec<Named>,
}

#[derive(Debug, Deserialize)]
struct Named {
    #[serde(default)]
    name: String,
}

impl From<Recommendation> for Candidate {
    fn from(rec: Recommendation) -> Self {
        Candidate {
            id: rec.id,
            name: rec.name.unwrap_or_default(),
            bio: rec.bio.unwrap_or_default(),
            schools: rec.schools.into_iter().map(|s| s.name).collect(),
            interests: rec.common_interests.into_iter().map(|i| i.name).collect(),
        }
    }
}

/// `match` is `false` for a plain like and an object for a mutual match.
#[derive(Debug, Deserialize)]
struct LikeResponse {
    #[serde(rename = "match", default)]
    matched: serde_json::Value,
}

impl LikeResponse {
    fn is_match(&self) -> bool {
        !matches!(
            self.matched,
            serde_json::Value::Null | serde_json::Value::Bool(false)
        )
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// reqwest-backed [`ProfileService`]. Call [`authenticate`](Self::authenticate) first.
pub struct HttpProfileService {
    client: reqwest::Client,
    base_url: String,
    session: RwLock<Option<SecretString>>,
}

impl HttpProfileService {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: RwLock::new(None),
        }
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| ServiceError::RequestFailed {
            service: SERVICE.into(),
            reason: format!("invalid base URL {}: {e}", self.base_url),
        })?;
        url.path_segments_mut()
            .map_err(|()| ServiceError::RequestFailed {
                service: SERVICE.into(),
                reason: format!("base URL {} cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Log in with a Facebook identity and keep the session token.
    pub async fn authenticate(
        &self,
        facebook_id: &str,
        facebook_token: &SecretString,
    ) -> Result<AuthenticatedUser, ServiceError> {
        let body = serde_json::json!({
            "facebook_id": facebook_id,
            "facebook_token": facebook_token.expose_secret(),
        });
        let response = self
            .client
            .post(self.endpoint(&["auth"])?)
            .json(&body)
            .send()
            .await
            .map_err(request_failed)?;
        let auth: AuthResponse = read_json(response).await?;

        let token = auth
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ServiceError::AuthFailed {
                service: SERVICE.into(),
                reason: "no session token in auth response".into(),
            })?;
        *self.session.write().await = Some(SecretString::from(token));

        let user = auth
            .user
            .map(|u| AuthenticatedUser {
                id: u.id,
                name: u.name,
            })
            .unwrap_or_default();
        debug!(id = %user.id, "Authenticated with profile service");
        Ok(user)
    }

    /// Authenticated GET. Fails on any non-2xx status; the body is left unread.
    async fn send(&self, url: Url) -> Result<reqwest::Response, ServiceError> {
        let request = {
            let session = self.session.read().await;
            let token = session.as_ref().ok_or_else(|| ServiceError::NotAuthenticated {
                service: SERVICE.into(),
            })?;
            self.client
                .get(url)
                .header(AUTH_HEADER, token.expose_secret())
        };
        let response = request.send().await.map_err(request_failed)?;
        check_status(response).await
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ServiceError> {
        let response = self.send(url).await?;
        decode(response).await
    }
}

#[async_trait]
impl ProfileService for HttpProfileService {
    async fn fetch_candidates(&self, limit: usize) -> Result<Batch, ServiceError> {
        let mut url = self.endpoint(&["user", "recs"])?;
        url.query_pairs_mut().append_pair("limit", &limit.to_string());
        let recs: RecsResponse = self.get(url).await?;
        debug!(count = recs.results.len(), "Fetched recommendations");
        Ok(recs.results.into_iter().map(Candidate::from).collect())
    }

    async fn submit_approval(&self, id: &str) -> Result<bool, ServiceError> {
        let like: LikeResponse = self.get(self.endpoint(&["like", id])?).await?;
        Ok(like.is_match())
    }

    async fn submit_rejection(&self, id: &str) -> Result<(), ServiceError> {
        // Only the status matters; the body may be empty.
        self.send(self.endpoint(&["pass", id])?).await?;
        Ok(())
    }
}

fn request_failed(e: reqwest::Error) -> ServiceError {
    ServiceError::RequestFailed {
        service: SERVICE.into(),
        reason: e.to_string(),
    }
}

/// Check the status, then decode the body.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ServiceError> {
    decode(check_status(response).await?).await
}

/// Map 401 and other non-2xx responses to errors.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ServiceError::AuthFailed {
            service: SERVICE.into(),
            reason: "session rejected (401)".into(),
        });
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ServiceError::Status {
            service: SERVICE.into(),
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ServiceError> {
    response
        .json::<T>()
        .await
        .map_err(|e| ServiceError::InvalidResponse {
            service: SERVICE.into(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommendation_maps_to_candidate() {
        let raw = serde_json::json!({
            "_id": "abc",
            "name": "Amy",
            "bio": null,
            "schools": [{"name": "MIT", "id": "1"}],
            "common_interests": [{"name": "Hiking"}, {"name": "Chess"}]
        });
        let rec: Recommendation = serde_json::from_value(raw).unwrap();
        let candidate = Candidate::from(rec);

        assert_eq!(candidate.id, "abc");
        assert_eq!(candidate.name, "Amy");
        assert_eq!(candidate.bio, "");
        assert_eq!(candidate.schools, vec!["MIT"]);
        assert_eq!(candidate.interests, vec!["Hiking", "Chess"]);
    }

    #[test]
    fn missing_results_is_empty_batch() {
        let recs: RecsResponse =
            serde_json::from_value(serde_json::json!({"message": "recs timeout"})).unwrap();
        assert!(recs.results.is_empty());
    }

    #[test]
    fn like_match_detection() {
        let plain: LikeResponse =
            serde_json::from_value(serde_json::json!({"match": false})).unwrap();
        assert!(!plain.is_match());

        let absent: LikeResponse =
            serde_json::from_value(serde_json::json!({"likes_remaining": 99})).unwrap();
        assert!(!absent.is_match());

        let matched: LikeResponse =
            serde_json::from_value(serde_json::json!({"match": {"_id": "m1"}})).unwrap();
        assert!(matched.is_match());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let service = HttpProfileService::new(reqwest::Client::new(), "http://localhost:1/");
        assert_eq!(
            service.endpoint(&["auth"]).unwrap().as_str(),
            "http://localhost:1/auth"
        );
    }

    #[test]
    fn base_path_is_kept() {
        let service = HttpProfileService::new(reqwest::Client::new(), "http://localhost:1/api/");
        assert_eq!(
            service.endpoint(&["user", "recs"]).unwrap().as_str(),
            "http://localhost:1/api/user/recs"
        );
    }

    #[test]
    fn ids_are_percent_encoded() {
        let service = HttpProfileService::new(reqwest::Client::new(), "http://localhost:1");
        assert_eq!(
            service.endpoint(&["like", "a/b?c#d"]).unwrap().as_str(),
            "http://localhost:1/like/a%2Fb%3Fc%23d"
        );
    }

    #[test]
    fn invalid_base_url_is_request_failure() {
        let service = HttpProfileService::new(reqwest::Client::new(), "not a url");
        assert!(matches!(
            service.endpoint(&["auth"]),
            Err(ServiceError::RequestFailed { .. })
        ));
    }

    #[tokio::test]
    async fn calls_before_authenticate_fail() {
        let service = HttpProfileService::new(reqwest::Client::new(), "http://127.0.0.1:9");
        let err = service.fetch_candidates(5).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotAuthenticated { .. }));
    }
}
