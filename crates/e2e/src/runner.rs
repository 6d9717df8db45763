//! Main test runner that orchestrates preflight, Playwright sessions and reporting

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::config::E2eConfig;
use crate::error::{E2eError, E2eResult, FailureKind};
use crate::playwright::{PlaywrightHandle, StepResult};
use crate::scenarios;
use crate::spec::TestSpec;
use crate::target::TargetApp;

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
    pub failure_kind: Option<FailureKind>,
    pub screenshot_path: Option<PathBuf>,
}

impl TestResult {
    fn from_error(name: &str, err: &E2eError, duration_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            duration_ms,
            steps: vec![],
            error: Some(err.to_string()),
            failure_kind: Some(err.failure_kind()),
            screenshot_path: None,
        }
    }

    /// The step that ended the scenario, if any
    pub fn failed_step(&self) -> Option<&StepResult> {
        self.steps.iter().find(|s| !s.success)
    }
}

/// Result of running a batch of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub base_url: String,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    fn from_results(base_url: &str, started_at: DateTime<Utc>, start: Instant, results: Vec<TestResult>) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            base_url: base_url.to_string(),
            started_at,
            total: results.len(),
            passed,
            failed: results.len() - passed,
            duration_ms: start.elapsed().as_millis() as u64,
            results,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: Arc<E2eConfig>,

    /// Specs loaded from YAML in addition to the built-in journeys
    extra_specs: Vec<TestSpec>,

    /// Created on first use, after preflight
    playwright: Option<Arc<PlaywrightHandle>>,
}

impl TestRunner {
    /// Create a runner from defaults overlaid with the environment
    pub fn new() -> E2eResult<Self> {
        Ok(Self::with_config(E2eConfig::from_env()?))
    }

    pub fn with_config(config: E2eConfig) -> Self {
        Self {
            config: Arc::new(config),
            extra_specs: Vec::new(),
            playwright: None,
        }
    }

    pub fn config(&self) -> &E2eConfig {
        &self.config
    }

    /// Add every YAML spec found under `dir`
    pub fn load_specs(&mut self, dir: &Path) -> E2eResult<usize> {
        let specs = TestSpec::load_all(dir)?;
        let count = specs.len();
        info!("Loaded {} spec(s) from {}", count, dir.display());
        self.extra_specs.extend(specs);
        Ok(count)
    }

    /// Built-in journeys followed by loaded specs
    pub fn catalog(&self) -> Vec<TestSpec> {
        let mut specs = scenarios::builtin(&self.config);
        specs.extend(self.extra_specs.iter().cloned());
        specs
    }

    /// Probe the target and locate Playwright, once per runner
    async fn ensure_ready(&mut self) -> E2eResult<Arc<PlaywrightHandle>> {
        if let Some(handle) = &self.playwright {
            return Ok(handle.clone());
        }

        if self.config.preflight.enabled {
            let target = TargetApp::new(&self.config.base_url, &self.config.preflight)?;
            target.probe(&self.config.preflight).await?;
        } else {
            debug!("Preflight disabled");
        }

        let handle = Arc::new(PlaywrightHandle::new(
            &self.config.base_url,
            self.config.playwright.clone(),
        )?);
        self.playwright = Some(handle.clone());
        Ok(handle)
    }

    /// Run every scenario in the catalog, one after another
    pub async fn run_all(&mut self) -> E2eResult<TestSuiteResult> {
        let specs = self.catalog();
        self.run_specs(&specs).await
    }

    /// Run scenarios carrying a tag
    pub async fn run_tagged(&mut self, tag: &str) -> E2eResult<TestSuiteResult> {
        let specs: Vec<TestSpec> = self.catalog().into_iter().filter(|s| s.has_tag(tag)).collect();
        self.run_specs(&specs).await
    }

    /// Run a specific scenario by name
    pub async fn run_named(&mut self, name: &str) -> E2eResult<TestResult> {
        let spec = scenarios::by_name(&self.config, name)
            .or_else(|| self.extra_specs.iter().find(|s| s.name == name).cloned())
            .ok_or_else(|| E2eError::SpecParse(format!("Test not found: {}", name)))?;

        self.run_spec(&spec).await
    }

    /// Run a single scenario in its own browser session
    pub async fn run_spec(&mut self, spec: &TestSpec) -> E2eResult<TestResult> {
        spec.validate()?;
        let handle = self.ensure_ready().await?;
        execute(&handle, &self.config, spec).await
    }

    /// Run scenarios sequentially; a failing scenario does not stop the rest
    pub async fn run_specs(&mut self, specs: &[TestSpec]) -> E2eResult<TestSuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        let handle = self.ensure_ready().await?;

        info!("Running {} scenario(s) against {}", specs.len(), self.config.base_url);

        let mut results = Vec::with_capacity(specs.len());
        for spec in specs {
            let result = match execute(&handle, &self.config, spec).await {
                Ok(result) => result,
                Err(e) => TestResult::from_error(&spec.name, &e, 0),
            };
            report(&result);
            results.push(result);
        }

        let suite = TestSuiteResult::from_results(&self.config.base_url, started_at, start, results);
        summarize(&suite);
        Ok(suite)
    }

    /// Run scenarios concurrently, each in its own session, at most
    /// `max_parallel` at a time. Results keep input order.
    pub async fn run_parallel(&mut self, specs: &[TestSpec]) -> E2eResult<TestSuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        let handle = self.ensure_ready().await?;
        let permits = Arc::new(Semaphore::new(self.config.max_parallel));

        info!(
            "Running {} scenario(s) in parallel (max {}) against {}",
            specs.len(),
            self.config.max_parallel,
            self.config.base_url
        );

        let mut tasks = JoinSet::new();
        for (i, spec) in specs.iter().cloned().enumerate() {
            let handle = handle.clone();
            let config = self.config.clone();
            let permits = permits.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let result = match execute(&handle, &config, &spec).await {
                    Ok(result) => result,
                    Err(e) => TestResult::from_error(&spec.name, &e, 0),
                };
                (i, result)
            });
        }

        let mut slots: Vec<Option<TestResult>> = vec![None; specs.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((i, result)) => {
                    report(&result);
                    slots[i] = Some(result);
                }
                Err(e) => error!("Scenario task aborted: {}", e),
            }
        }

        let results = slots
            .into_iter()
            .zip(specs)
            .map(|(slot, spec)| {
                slot.unwrap_or_else(|| {
                    let err = E2eError::Playwright("scenario task aborted".to_string());
                    TestResult::from_error(&spec.name, &err, 0)
                })
            })
            .collect();

        let suite = TestSuiteResult::from_results(&self.config.base_url, started_at, start, results);
        summarize(&suite);
        Ok(suite)
    }

    /// Write suite results to `output_dir/test-results.json`
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

async fn execute(handle: &PlaywrightHandle, config: &E2eConfig, spec: &TestSpec) -> E2eResult<TestResult> {
    let start = Instant::now();
    debug!("Running scenario: {}", spec.name);

    let run = handle.run(spec, &config.timeouts).await?;
    let duration_ms = start.elapsed().as_millis() as u64;

    Ok(TestResult {
        name: spec.name.clone(),
        success: run.success(),
        duration_ms,
        error: run.failure.as_ref().map(|e| e.to_string()),
        failure_kind: run.failure.as_ref().map(|e| e.failure_kind()),
        screenshot_path: run.screenshot_path,
        steps: run.steps,
    })
}

fn report(result: &TestResult) {
    if result.success {
        info!("✓ {} ({} ms)", result.name, result.duration_ms);
    } else {
        error!(
            "✗ {} - {}",
            result.name,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
}

fn summarize(suite: &TestSuiteResult) {
    info!(
        "Test Results: {} passed, {} failed ({} ms)",
        suite.passed, suite.failed, suite.duration_ms
    );
}
