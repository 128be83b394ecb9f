//! Configuration types.
//!
//! Everything comes from `MATCH_PILOT_*` environment variables (a `.env`
//! file is honored). Parsing goes through a lookup closure so tests can feed
//! values without touching the process environment.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::client::facebook::DEFAULT_GRAPH_URL;
use crate::client::http::DEFAULT_API_URL;
use crate::error::ConfigError;
use crate::pipeline::{LoopConfig, PipelineConfig};

/// Default approval quota.
pub const DEFAULT_QUOTA: usize = 30;

/// Full process configuration.
#[derive(Debug)]
pub struct RunConfig {
    /// Facebook access token used to log in.
    pub fb_token: SecretString,
    /// Path to the JSON filter file.
    pub filter_path: PathBuf,
    /// Profile service base URL.
    pub api_url: String,
    /// Facebook Graph base URL.
    pub graph_url: String,
    /// Quota, dry-run and loop tuning.
    pub pipeline: PipelineConfig,
}

impl RunConfig {
    /// Load from the process environment (after reading `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let fb_token = get("MATCH_PILOT_FB_TOKEN").ok_or_else(|| ConfigError::MissingRequired {
            key: "MATCH_PILOT_FB_TOKEN".into(),
            hint: "Set it to a Facebook access token for the account.".into(),
        })?;

        let quota = parse_positive(get("MATCH_PILOT_QUOTA"), "MATCH_PILOT_QUOTA")?
            .unwrap_or(DEFAULT_QUOTA);
        let fetch_limit =
            parse_positive(get("MATCH_PILOT_FETCH_LIMIT"), "MATCH_PILOT_FETCH_LIMIT")?
                .unwrap_or(quota);
        let max_in_flight =
            parse_positive(get("MATCH_PILOT_MAX_IN_FLIGHT"), "MATCH_PILOT_MAX_IN_FLIGHT")?;

        let dry_run = match get("MATCH_PILOT_DRY_RUN") {
            Some(v) => parse_bool(&v).ok_or_else(|| ConfigError::InvalidValue {
                key: "MATCH_PILOT_DRY_RUN".into(),
                message: format!("expected true/false, got {v:?}"),
            })?,
            None => false,
        };

        let defaults = LoopConfig::default();
        let idle_interval = match get("MATCH_PILOT_IDLE_SECS") {
            Some(v) => Duration::from_secs(parse_number(&v, "MATCH_PILOT_IDLE_SECS")?),
            None => defaults.idle_interval,
        };
        let max_idle_rounds = match get("MATCH_PILOT_MAX_IDLE_ROUNDS") {
            Some(v) => parse_number(&v, "MATCH_PILOT_MAX_IDLE_ROUNDS")?,
            None => defaults.max_idle_rounds,
        };

        Ok(Self {
            fb_token: SecretString::from(fb_token),
            filter_path: get("MATCH_PILOT_FILTER")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("filter.json")),
            api_url: get("MATCH_PILOT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            graph_url: get("MATCH_PILOT_GRAPH_URL")
                .unwrap_or_else(|| DEFAULT_GRAPH_URL.to_string()),
            pipeline: PipelineConfig {
                quota,
                dry_run,
                max_in_flight,
                loop_config: LoopConfig {
                    fetch_limit,
                    idle_interval,
                    max_idle_rounds,
                },
            },
        })
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.into(),
        message: format!("expected a non-negative integer, got {value:?}"),
    })
}

fn parse_positive(value: Option<String>, key: &str) -> Result<Option<usize>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match parse_number::<usize>(&value, key)? {
        0 => Err(ConfigError::InvalidValue {
            key: key.into(),
            message: "must be greater than zero".into(),
        }),
        n => Ok(Some(n)),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
