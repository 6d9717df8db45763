//! Target application preflight - confirm the storefront answers before
//! any browser is launched

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::PreflightConfig;
use crate::error::{E2eError, E2eResult};

/// Outcome of a successful probe
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub url: String,
    pub status: u16,
    pub attempts: usize,
    pub elapsed: Duration,
}

/// The deployed application under test
pub struct TargetApp {
    base_url: String,
    client: reqwest::Client,
}

impl TargetApp {
    pub fn new(base_url: &str, config: &PreflightConfig) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe until the home page answers with a non-5xx status
    pub async fn probe(&self, config: &PreflightConfig) -> E2eResult<ProbeReport> {
        let start = Instant::now();
        let mut attempts = 0;

        while attempts < config.attempts.max(1) {
            attempts += 1;

            match self.client.get(&self.base_url).send().await {
                Ok(resp) if !resp.status().is_server_error() => {
                    let status = resp.status().as_u16();
                    info!("Target {} answered {} after {} attempt(s)", self.base_url, status, attempts);
                    return Ok(ProbeReport {
                        url: self.base_url.clone(),
                        status,
                        attempts,
                        elapsed: start.elapsed(),
                    });
                }
                Ok(resp) => {
                    warn!("Preflight returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for {} to answer...", self.base_url);
                    }
                    if !e.is_connect() {
                        warn!("Preflight error: {}", e);
                    }
                }
            }

            if attempts < config.attempts {
                sleep(Duration::from_millis(config.interval_ms)).await;
            }
        }

        Err(E2eError::TargetUnreachable {
            url: self.base_url.clone(),
            attempts,
        })
    }
}
