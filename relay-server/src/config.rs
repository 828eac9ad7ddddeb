//! Server configuration
//!
//! Every tunable of the relay is read from the environment once at startup.
//! Unparseable optional values fall back to their defaults.

use std::time::Duration;

use relay_client::BreakerConfig;
use relay_pipeline::{Backoff, DispatchConfig, PaginationConfig, PipelineConfig};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, for local runs
    #[default]
    Pretty,
    /// One JSON object per line, for structured cloud logging
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream orders API base, e.g. "https://api.dropi"
    ///
    /// The country suffix is appended as `{base}.{suffix}`, or substituted
    /// for a `{country}` placeholder when one is present.
    pub dropi_base_url: String,

    /// Base URL webhook suffixes are joined to
    pub webhook_base_url: String,

    /// Listen address
    pub bind_addr: String,

    /// Deadline for one `/process` run
    pub run_timeout: Duration,

    pub upstream_timeout: Duration,
    pub webhook_timeout: Duration,

    /// Webhook deliveries in flight per run
    pub webhook_concurrency: usize,
    pub webhook_max_attempts: u32,
    pub webhook_retry_base: Duration,

    pub breaker: BreakerConfig,

    pub log_format: LogFormat,
}

impl Config {
    /// Creates a configuration with defaults for everything but the upstream
    pub fn new(dropi_base_url: String) -> Self {
        Self {
            dropi_base_url,
            webhook_base_url: "https://default-webhook.com".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            run_timeout: Duration::from_secs(180),
            upstream_timeout: Duration::from_secs(30),
            webhook_timeout: Duration::from_secs(10),
            webhook_concurrency: 5,
            webhook_max_attempts: 3,
            webhook_retry_base: Duration::from_millis(1000),
            breaker: BreakerConfig::default(),
            log_format: LogFormat::Pretty,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - DROPI_BASE_URL (required)
    /// - WEBHOOK_BASE_URL (optional, default: https://default-webhook.com)
    /// - BIND_ADDR (optional, default: 0.0.0.0:$PORT, PORT defaults to 8080)
    /// - RUN_TIMEOUT_SECS (optional, default: 180)
    /// - UPSTREAM_TIMEOUT_SECS (optional, default: 30)
    /// - WEBHOOK_TIMEOUT_SECS (optional, default: 10)
    /// - WEBHOOK_CONCURRENCY (optional, default: 5)
    /// - WEBHOOK_MAX_ATTEMPTS (optional, default: 3)
    /// - WEBHOOK_RETRY_BASE_MS (optional, default: 1000)
    /// - BREAKER_FAILURE_THRESHOLD (optional, default: 5)
    /// - BREAKER_WINDOW_SECS (optional, default: 60)
    /// - BREAKER_COOLDOWN_SECS (optional, default: 30)
    /// - BREAKER_HALF_OPEN_PROBES (optional, default: 1)
    /// - LOG_FORMAT (optional, `json` or `pretty`, default: pretty)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`], reading variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let dropi_base_url = lookup("DROPI_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("DROPI_BASE_URL environment variable not set"))?;

        let mut config = Self::new(dropi_base_url.trim().to_string());

        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        if let Some(url) = lookup("WEBHOOK_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.webhook_base_url = url.trim().to_string();
        }

        if let Some(addr) = lookup("BIND_ADDR").filter(|v| !v.trim().is_empty()) {
            config.bind_addr = addr.trim().to_string();
        } else if let Some(port) = parsed("PORT") {
            config.bind_addr = format!("0.0.0.0:{port}");
        }

        if let Some(secs) = parsed("RUN_TIMEOUT_SECS") {
            config.run_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parsed("UPSTREAM_TIMEOUT_SECS") {
            config.upstream_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parsed("WEBHOOK_TIMEOUT_SECS") {
            config.webhook_timeout = Duration::from_secs(secs);
        }
        if let Some(width) = parsed("WEBHOOK_CONCURRENCY") {
            config.webhook_concurrency = width as usize;
        }
        if let Some(attempts) = parsed("WEBHOOK_MAX_ATTEMPTS") {
            config.webhook_max_attempts = attempts.min(u32::MAX as u64) as u32;
        }
        if let Some(ms) = parsed("WEBHOOK_RETRY_BASE_MS") {
            config.webhook_retry_base = Duration::from_millis(ms);
        }
        if let Some(threshold) = parsed("BREAKER_FAILURE_THRESHOLD") {
            config.breaker.failure_threshold = threshold.min(u32::MAX as u64) as u32;
        }
        if let Some(secs) = parsed("BREAKER_WINDOW_SECS") {
            config.breaker.window = Duration::from_secs(secs);
        }
        if let Some(secs) = parsed("BREAKER_COOLDOWN_SECS") {
            config.breaker.cooldown = Duration::from_secs(secs);
        }
        if let Some(probes) = parsed("BREAKER_HALF_OPEN_PROBES") {
            config.breaker.half_open_probes = probes.min(u32::MAX as u64) as u32;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            config.log_format = LogFormat::parse(format.trim());
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, url) in [
            ("dropi_base_url", &self.dropi_base_url),
            ("webhook_base_url", &self.webhook_base_url),
        ] {
            if url.is_empty() {
                anyhow::bail!("{name} cannot be empty");
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{name} must start with http:// or https://");
            }
        }

        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.run_timeout.is_zero() {
            anyhow::bail!("run_timeout must be greater than 0");
        }

        if self.upstream_timeout.is_zero() || self.webhook_timeout.is_zero() {
            anyhow::bail!("HTTP timeouts must be greater than 0");
        }

        if self.webhook_concurrency == 0 {
            anyhow::bail!("webhook_concurrency must be greater than 0");
        }

        if self.webhook_max_attempts == 0 {
            anyhow::bail!("webhook_max_attempts must be greater than 0");
        }

        if self.breaker.failure_threshold == 0 {
            anyhow::bail!("breaker failure_threshold must be greater than 0");
        }

        if self.breaker.half_open_probes == 0 {
            anyhow::bail!("breaker half_open_probes must be greater than 0");
        }

        Ok(())
    }

    /// Pipeline tuning derived from this configuration
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            pagination: PaginationConfig::default(),
            dispatch: DispatchConfig {
                concurrency: self.webhook_concurrency,
                backoff: Backoff::new(self.webhook_max_attempts, self.webhook_retry_base),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("https://api.dropi".to_string())
    }
}
