use serde::Deserialize;
use std::time::Duration;

/// Default interval between status checks of unfinished analyses.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Base URL of the credit analysis API (bureau integration backend).
    pub analysis_api_base_url: String,
    pub analysis_api_token: String,
    pub poll_interval_secs: u64,
    pub api_timeout_secs: u64,
    /// Trackers untouched for this long are closed and their polling stopped.
    pub tracker_idle_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            analysis_api_base_url: std::env::var("ANALYSIS_API_BASE_URL")
                .map_err(|_| anyhow::anyhow!("ANALYSIS_API_BASE_URL environment variable required"))
                .and_then(|raw| validate_base_url(&raw))?,
            analysis_api_token: std::env::var("ANALYSIS_API_TOKEN")
                .map_err(|_| anyhow::anyhow!("ANALYSIS_API_TOKEN environment variable required"))
                .and_then(|token| {
                    if token.trim().is_empty() {
                        anyhow::bail!("ANALYSIS_API_TOKEN cannot be empty");
                    }
                    Ok(token)
                })?,
            poll_interval_secs: parse_secs(
                "ANALYSIS_POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )?,
            api_timeout_secs: parse_secs("ANALYSIS_API_TIMEOUT_SECS", 30)?,
            tracker_idle_secs: parse_secs("ANALYSIS_TRACKER_IDLE_SECS", 900)?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Analysis API Base URL: {}", config.analysis_api_base_url);
        tracing::debug!("Poll interval: {}s", config.poll_interval_secs);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn tracker_idle(&self) -> Duration {
        Duration::from_secs(self.tracker_idle_secs)
    }
}

/// Accepts only absolute http(s) URLs; trailing slashes are dropped.
pub fn validate_base_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        anyhow::bail!("ANALYSIS_API_BASE_URL cannot be empty");
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| anyhow::anyhow!("ANALYSIS_API_BASE_URL is not a valid URL: {}", e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("ANALYSIS_API_BASE_URL must start with http:// or https://");
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

fn parse_secs(var: &str, default: u64) -> anyhow::Result<u64> {
    let secs = match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("{} must be a whole number of seconds", var))?,
        _ => default,
    };
    if secs == 0 {
        anyhow::bail!("{} must be greater than zero", var);
    }
    Ok(secs)
}
