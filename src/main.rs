use std::sync::Arc;

use match_pilot::client::{HttpProfileService, ProfileService, facebook};
use match_pilot::config::RunConfig;
use match_pilot::error::{Result, ServiceError};
use match_pilot::pipeline::{self, FilterRules};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = RunConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export MATCH_PILOT_FB_TOKEN=...");
        std::process::exit(1);
    });

    let filter = FilterRules::load(&config.filter_path).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    eprintln!("Match Pilot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Filter: {}", config.filter_path.display());
    eprintln!(
        "   Rules: {} exclusions, {} schools, {} interests",
        filter.exclude_names.len(),
        filter.schools.len(),
        filter.interests.len()
    );
    eprintln!(
        "   Quota: {} (fetch limit {})",
        config.pipeline.quota, config.pipeline.loop_config.fetch_limit
    );
    if config.pipeline.dry_run {
        eprintln!("   Dry run: no likes or passes will be sent");
    }

    // ── Identity + login ────────────────────────────────────────────
    let service = connect(&config).await.unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    // ── Run ─────────────────────────────────────────────────────────
    let service: Arc<dyn ProfileService> = service;
    let summary = pipeline::run(&config.pipeline, &filter, service).await?;

    eprintln!(
        "\nApproved {} this run, matched {} ({} batches, {} rejected)",
        summary.approvals, summary.matches, summary.batches, summary.rejections
    );
    eprintln!("Stopped: {}", summary.stop_reason);

    Ok(())
}

/// Resolve the Facebook identity and log in to the profile service.
async fn connect(config: &RunConfig) -> Result<Arc<HttpProfileService>> {
    let http = reqwest::Client::builder()
        .user_agent(concat!("match-pilot/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ServiceError::RequestFailed {
            service: "http".into(),
            reason: format!("failed to build HTTP client: {e}"),
        })?;

    let facebook_id = facebook::fetch_user_id(&http, &config.graph_url, &config.fb_token).await?;

    let service = HttpProfileService::new(http, config.api_url.clone());
    let me = service.authenticate(&facebook_id, &config.fb_token).await?;
    tracing::info!(id = %me.id, name = %me.name, "Logged in");

    Ok(Arc::new(service))
}
