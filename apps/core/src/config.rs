use std::time::Duration;

use anyhow::{Context, Result};

/// Which backend serves feedback generation.
///
/// The platform's generation endpoint is still being rolled out, so the
/// default deployment answers with a fixed canned review instead of routing
/// through the binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedbackBackend {
    #[default]
    Canned,
    Platform,
}

/// Store configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    pub auth_token: String,
    pub probe_interval: Duration,
    pub feedback_backend: FeedbackBackend,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(StoreConfig {
            base_url: require_env("PLATFORM_BASE_URL")?,
            auth_token: require_env("PLATFORM_AUTH_TOKEN")?,
            probe_interval: Duration::from_millis(
                std::env::var("PROBE_INTERVAL_MS")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse::<u64>()
                    .context("PROBE_INTERVAL_MS must be a millisecond count")?,
            ),
            feedback_backend: match std::env::var("FEEDBACK_BACKEND")
                .unwrap_or_else(|_| "canned".to_string())
                .as_str()
            {
                "canned" => FeedbackBackend::Canned,
                "platform" => FeedbackBackend::Platform,
                other => anyhow::bail!("FEEDBACK_BACKEND must be 'canned' or 'platform', got '{other}'"),
            },
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
