//! Error types for E2E journeys

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Playwright not found. Install with: npm i -D @playwright/test && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Test spec parse error: {0}")]
    SpecParse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Target {url} unreachable after {attempts} attempts")]
    TargetUnreachable { url: String, attempts: usize },

    #[error("Timeout after {timeout_ms} ms in step '{step}': {detail}")]
    Timeout {
        step: String,
        timeout_ms: u64,
        detail: String,
    },

    #[error("Element not found in step '{step}': {locator}")]
    ElementNotFound { step: String, locator: String },

    #[error("Assertion failed in step '{step}': expected {expected:?}, got {actual:?}")]
    AssertionMismatch {
        step: String,
        expected: String,
        actual: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Coarse class of a failure, reported alongside each failed scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    ElementNotFound,
    AssertionMismatch,
    /// Anything that is not a verdict about the page itself
    Infrastructure,
}

impl E2eError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            E2eError::Timeout { .. } => FailureKind::Timeout,
            E2eError::ElementNotFound { .. } => FailureKind::ElementNotFound,
            E2eError::AssertionMismatch { .. } => FailureKind::AssertionMismatch,
            _ => FailureKind::Infrastructure,
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
