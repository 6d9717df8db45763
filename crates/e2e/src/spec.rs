//! Declarative scenario specification

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::TimeoutPolicy;
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;

/// One scenario: an ordered list of steps run in a single browser session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Viewport size for the browser
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    /// Steps to execute in order
    pub steps: Vec<TestStep>,
}

fn default_viewport() -> Viewport {
    Viewport { width: 1280, height: 720 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// A single step in a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Navigate to a path relative to the base URL
    Navigate { url: String },

    /// Fill an input field
    Fill { locator: Locator, value: String },

    /// Click an element
    Click { locator: Locator },

    /// Wait until the page URL equals base URL + path
    ExpectUrl {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    /// Wait until the document title equals the given text
    ExpectTitle {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    /// Wait until the element is visible
    ExpectVisible {
        locator: Locator,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    /// Wait until exactly `count` elements match
    ExpectCount {
        locator: Locator,
        count: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    /// Wait for a raw selector to reach a state
    WaitForSelector {
        selector: String,
        #[serde(default)]
        state: WaitState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },

    /// Log a message (for debugging)
    Log { message: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

impl TestStep {
    /// Short label used in logs, events and errors
    pub fn name(&self) -> String {
        match self {
            TestStep::Navigate { url } => format!("navigate:{}", url),
            TestStep::Fill { locator, .. } => format!("fill:{}", locator),
            TestStep::Click { locator } => format!("click:{}", locator),
            TestStep::ExpectUrl { path, .. } => format!("expect_url:{}", path),
            TestStep::ExpectTitle { title, .. } => format!("expect_title:{}", title),
            TestStep::ExpectVisible { locator, .. } => format!("expect_visible:{}", locator),
            TestStep::ExpectCount { locator, count, .. } => {
                format!("expect_count:{}:{}", count, locator)
            }
            TestStep::WaitForSelector { selector, state, .. } => {
                format!("wait:{}:{}", selector, state.as_str())
            }
            TestStep::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
        }
    }

    /// The wait bound this step runs under
    pub fn timeout_ms(&self, policy: &TimeoutPolicy) -> u64 {
        match self {
            TestStep::Navigate { .. } => policy.navigation_ms,
            TestStep::Fill { .. } | TestStep::Click { .. } => policy.action_ms,
            TestStep::ExpectUrl { timeout_ms, .. }
            | TestStep::ExpectTitle { timeout_ms, .. }
            | TestStep::ExpectVisible { timeout_ms, .. }
            | TestStep::ExpectCount { timeout_ms, .. }
            | TestStep::WaitForSelector { timeout_ms, .. } => {
                timeout_ms.unwrap_or(policy.action_ms)
            }
            TestStep::Log { .. } => 0,
        }
    }
}

impl TestSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
            viewport: default_viewport(),
            steps: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn step(mut self, step: TestStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Sum of every step's wait bound
    pub fn total_budget_ms(&self, policy: &TimeoutPolicy) -> u64 {
        self.steps.iter().map(|s| s.timeout_ms(policy)).sum()
    }

    pub fn validate(&self) -> E2eResult<()> {
        if self.name.trim().is_empty() {
            return Err(E2eError::SpecParse("scenario name is empty".to_string()));
        }
        if self.steps.is_empty() {
            return Err(E2eError::SpecParse(format!("scenario '{}' has no steps", self.name)));
        }
        Ok(())
    }

    /// Parse a spec from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn to_yaml(&self) -> E2eResult<String> {
        serde_yaml::to_string(self).map_err(E2eError::from)
    }

    /// Parse a spec from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all specs from a directory, sorted by path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            specs.push(Self::from_file(entry.path())?);
        }

        Ok(specs)
    }

    /// Filter specs by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs.iter().filter(|s| s.has_tag(tag)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::By;

    #[test]
    fn test_parse_simple_spec() {
        let yaml = r#"
name: contact-page
description: Contact page renders
tags:
  - smoke
steps:
  - action: navigate
    url: /contact
  - action: expect_visible
    locator:
      by: role
      role: heading
      name: Contact Us
  - action: fill
    locator:
      by: placeholder
      text: Order Number
    value: MKH-1
"#;
        let spec = TestSpec::from_yaml(yaml).unwrap();
        assert_eq!(spec.name, "contact-page");
        assert_eq!(spec.steps.len(), 3);
        assert_eq!(spec.viewport, Viewport { width: 1280, height: 720 });
        match &spec.steps[1] {
            TestStep::ExpectVisible { locator, timeout_ms } => {
                assert!(matches!(&locator.by, By::Role { role, .. } if role == "heading"));
                assert_eq!(*timeout_ms, None);
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_wait_state_defaults_to_visible() {
        let yaml = r#"
name: wait
steps:
  - action: wait_for_selector
    selector: .animate-spin
"#;
        let spec = TestSpec::from_yaml(yaml).unwrap();
        assert!(matches!(
            spec.steps[0],
            TestStep::WaitForSelector { state: WaitState::Visible, .. }
        ));
    }

    #[test]
    fn test_empty_spec_rejected() {
        let yaml = "name: empty\nsteps: []\n";
        assert!(matches!(TestSpec::from_yaml(yaml), Err(E2eError::SpecParse(_))));
    }

    #[test]
    fn test_parse_expect_count() {
        let yaml = r#"
name: single-frame
steps:
  - action: expect_count
    locator:
      by: css
      selector: iframe.razorpay-checkout-frame
    count: 1
"#;
        let spec = TestSpec::from_yaml(yaml).unwrap();
        assert_eq!(
            spec.steps[0],
            TestStep::ExpectCount {
                locator: Locator::css("iframe.razorpay-checkout-frame"),
                count: 1,
                timeout_ms: None,
            }
        );
        assert_eq!(
            spec.steps[0].name(),
            "expect_count:1:css=iframe.razorpay-checkout-frame"
        );
        assert_eq!(spec.steps[0].timeout_ms(&TimeoutPolicy::default()), 5_000);
    }

    #[test]
    fn test_timeout_fallbacks() {
        let policy = TimeoutPolicy::default();
        let nav = TestStep::Navigate { url: "/".into() };
        let explicit = TestStep::ExpectUrl { path: "/admin".into(), timeout_ms: Some(20_000) };
        let implicit = TestStep::ExpectUrl { path: "/shop".into(), timeout_ms: None };
        assert_eq!(nav.timeout_ms(&policy), policy.navigation_ms);
        assert_eq!(explicit.timeout_ms(&policy), 20_000);
        assert_eq!(implicit.timeout_ms(&policy), policy.action_ms);
    }

    #[test]
    fn test_yaml_roundtrip_keeps_steps() {
        let spec = TestSpec::new("rt")
            .with_tags(&["smoke"])
            .step(TestStep::Navigate { url: "/".into() })
            .step(TestStep::Click { locator: Locator::role("link", "Shop").exact().first() });
        let parsed = TestSpec::from_yaml(&spec.to_yaml().unwrap()).unwrap();
        assert_eq!(parsed.steps, spec.steps);
        assert!(parsed.has_tag("smoke"));
    }

    #[test]
    fn test_load_all_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.yaml"),
            "name: b\nsteps:\n  - action: navigate\n    url: /b\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.yml"),
            "name: a\ntags: [x]\nsteps:\n  - action: navigate\n    url: /a\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let specs = TestSpec::load_all(dir.path()).unwrap();
        let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(TestSpec::filter_by_tag(&specs, "x").len(), 1);
    }
}
