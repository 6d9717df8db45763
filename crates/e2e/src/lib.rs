//! Makhaana storefront E2E journeys
//!
//! This crate drives the deployed storefront through a real browser:
//! - Builds the admin and customer journeys as declarative scenarios
//! - Renders each scenario into one Playwright session and streams its progress
//! - Classifies failures as timeout, missing element or assertion mismatch
//! - Loads extra scenarios from YAML and reports results as JSON
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── TargetApp::probe() -> ProbeReport                    │
//! │    ├── PlaywrightHandle::run(spec) -> ScenarioRun           │
//! │    ├── run_specs / run_parallel -> TestSuiteResult          │
//! │    └── write_results() -> test-results.json                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestSpec (built-in or YAML)                                │
//! │    ├── name, description, tags, viewport                    │
//! │    └── steps: [TestStep]                                    │
//! │          ├── navigate { url }                               │
//! │          ├── fill { locator, value } / click { locator }    │
//! │          ├── expect_url / expect_title / expect_visible     │
//! │          └── wait_for_selector { selector, state }          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod locator;
pub mod playwright;
pub mod runner;
pub mod scenarios;
pub mod spec;
pub mod target;

pub use config::{Credentials, E2eConfig, TimeoutPolicy};
pub use error::{E2eError, E2eResult, FailureKind};
pub use locator::Locator;
pub use runner::{TestResult, TestRunner, TestSuiteResult};
pub use spec::{TestSpec, TestStep};
