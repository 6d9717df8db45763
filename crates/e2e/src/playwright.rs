//! Playwright browser automation
//!
//! A scenario is rendered into a single Node program so the whole journey
//! shares one browser session. The program reports progress as one JSON
//! object per stdout line, which is streamed back and turned into
//! [`StepResult`]s as the run progresses.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tracing::{debug, error, info, warn};

use crate::config::{join_url, TimeoutPolicy};
use crate::error::{E2eError, E2eResult, FailureKind};
use crate::locator::js_str;
use crate::spec::{TestSpec, TestStep};

static NOT_FOUND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)element\(s\) not found|resolved to 0 elements|no element matches").unwrap()
});
static EXPECTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Expected(?: string| pattern)?: *(.+)").unwrap());
static RECEIVED: Lazy<Regex> = Lazy::new(|| Regex::new(r"Received(?: string)?: *(.+)").unwrap());
static TIMED_OUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:Timeout|Timed out) (\d+) ?ms").unwrap());

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }

    /// Unknown names fall back to chromium
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "firefox" => Browser::Firefox,
            "webkit" => Browser::Webkit,
            _ => Browser::Chromium,
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,

    /// Directory that holds `node_modules/@playwright/test`
    pub project_dir: PathBuf,

    /// Node executable
    pub node_binary: String,

    pub screenshot_dir: PathBuf,
    pub screenshot_on_failure: bool,

    /// Extra time on top of the step bounds for browser launch and teardown
    pub launch_slack_ms: u64,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            project_dir: PathBuf::from("."),
            node_binary: "node".to_string(),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            screenshot_on_failure: true,
            launch_slack_ms: 60_000,
        }
    }
}

/// Result of executing a test step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub index: usize,
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub failure_kind: Option<FailureKind>,
}

/// Everything observed while one scenario ran
#[derive(Debug)]
pub struct ScenarioRun {
    pub steps: Vec<StepResult>,
    pub failure: Option<E2eError>,
    pub screenshot_path: Option<PathBuf>,
}

impl ScenarioRun {
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }
}

/// One line of script output
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    Step {
        index: usize,
        name: String,
        ok: bool,
        duration_ms: u64,
        #[serde(default)]
        error: Option<String>,
    },
    Log {
        message: String,
    },
    Screenshot {
        path: PathBuf,
    },
    /// Failure outside any step, e.g. browser launch
    Error {
        message: String,
    },
    Done {
        ok: bool,
    },
}

/// Decode a stdout line; anything that is not an event yields `None`
pub fn parse_event(line: &str) -> Option<ScriptEvent> {
    let line = line.trim();
    if !line.starts_with('{') {
        return None;
    }
    serde_json::from_str(line).ok()
}

/// Playwright browser handle
pub struct PlaywrightHandle {
    /// Base URL of the application under test
    base_url: String,
    config: PlaywrightConfig,
}

impl PlaywrightHandle {
    /// Create a handle after checking that Playwright is installed
    pub fn new(base_url: &str, config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed(&config.project_dir)?;

        if config.screenshot_on_failure {
            std::fs::create_dir_all(&config.screenshot_dir)?;
        }

        Ok(Self::unchecked(base_url, config))
    }

    fn unchecked(base_url: &str, config: PlaywrightConfig) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        }
    }

    fn check_playwright_installed(project_dir: &Path) -> E2eResult<()> {
        let status = Command::new("npx")
            .args(["playwright", "--version"])
            .current_dir(project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Render the Node program for a whole scenario
    pub fn build_script(&self, spec: &TestSpec, policy: &TimeoutPolicy) -> String {
        let mut script = String::new();

        script.push_str(&format!(
            r#"const {{ chromium, firefox, webkit, expect }} = require('@playwright/test');

function emit(event) {{
  console.log(JSON.stringify(event));
}}

class StepFailure extends Error {{}}

async function step(index, name, body) {{
  const started = Date.now();
  try {{
    await body();
  }} catch (error) {{
    emit({{ event: 'step', index, name, ok: false, duration_ms: Date.now() - started, error: String((error && error.message) || error) }});
    throw new StepFailure(name);
  }}
  emit({{ event: 'step', index, name, ok: true, duration_ms: Date.now() - started }});
}}

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  page.setDefaultTimeout({action_ms});
  page.setDefaultNavigationTimeout({navigation_ms});

  try {{
"#,
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            width = spec.viewport.width,
            height = spec.viewport.height,
            action_ms = policy.action_ms,
            navigation_ms = policy.navigation_ms,
        ));

        for (i, step) in spec.steps.iter().enumerate() {
            let name = step.name();
            script.push_str(&format!("\n    // Step {}: {}\n", i + 1, comment_safe(&name)));
            script.push_str(&format!(
                "    await step({}, {}, async () => {{\n      {}\n    }});\n",
                i,
                js_str(&name),
                self.step_to_js(step, policy)
            ));
        }

        let screenshot = if self.config.screenshot_on_failure {
            let path = self.failure_screenshot_path(&spec.name);
            format!(
                r#"
    try {{
      await page.screenshot({{ path: {path}, fullPage: true }});
      emit({{ event: 'screenshot', path: {path} }});
    }} catch (_) {{}}"#,
                path = js_str(&path.to_string_lossy())
            )
        } else {
            String::new()
        };

        script.push_str(&format!(
            r#"
    emit({{ event: 'done', ok: true }});
  }} catch (error) {{
    if (!(error instanceof StepFailure)) {{
      emit({{ event: 'error', message: String((error && error.message) || error) }});
    }}{screenshot}
    emit({{ event: 'done', ok: false }});
    process.exitCode = 1;
  }} finally {{
    await browser.close();
  }}
}})().catch((error) => {{
  emit({{ event: 'error', message: String((error && error.message) || error) }});
  process.exitCode = 1;
}});
"#
        ));

        script
    }

    /// Convert a step to JavaScript code
    fn step_to_js(&self, step: &TestStep, policy: &TimeoutPolicy) -> String {
        let timeout = step.timeout_ms(policy);
        match step {
            TestStep::Navigate { url } => format!(
                "await page.goto({}, {{ timeout: {} }});",
                js_str(&join_url(&self.base_url, url)),
                timeout
            ),
            TestStep::Fill { locator, value } => format!(
                "await {}.fill({}, {{ timeout: {} }});",
                locator.to_js(),
                js_str(value),
                timeout
            ),
            TestStep::Click { locator } => {
                format!("await {}.click({{ timeout: {} }});", locator.to_js(), timeout)
            }
            TestStep::ExpectUrl { path, .. } => format!(
                "await expect(page).toHaveURL({}, {{ timeout: {} }});",
                js_str(&join_url(&self.base_url, path)),
                timeout
            ),
            TestStep::ExpectTitle { title, .. } => format!(
                "await expect(page).toHaveTitle({}, {{ timeout: {} }});",
                js_str(title),
                timeout
            ),
            TestStep::ExpectVisible { locator, .. } => format!(
                "await expect({}).toBeVisible({{ timeout: {} }});",
                locator.to_js(),
                timeout
            ),
            TestStep::ExpectCount { locator, count, .. } => format!(
                "await expect({}).toHaveCount({}, {{ timeout: {} }});",
                locator.to_js(),
                count,
                timeout
            ),
            TestStep::WaitForSelector { selector, state, .. } => format!(
                "await page.waitForSelector({}, {{ state: {}, timeout: {} }});",
                js_str(selector),
                js_str(state.as_str()),
                timeout
            ),
            TestStep::Log { message } => {
                format!("emit({{ event: 'log', message: {} }});", js_str(message))
            }
        }
    }

    fn failure_screenshot_path(&self, scenario: &str) -> PathBuf {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3f");
        self.config
            .screenshot_dir
            .join(format!("{}-failure-{}.png", scenario, stamp))
    }

    /// Run a scenario in a fresh browser session
    pub async fn run(&self, spec: &TestSpec, policy: &TimeoutPolicy) -> E2eResult<ScenarioRun> {
        let script = self.build_script(spec, policy);

        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join(format!("{}.js", spec.name));
        std::fs::write(&script_path, &script)?;

        let project_dir = std::fs::canonicalize(&self.config.project_dir)
            .unwrap_or_else(|_| self.config.project_dir.clone());

        debug!("Running Playwright script: {}", script_path.display());

        let mut child = TokioCommand::new(&self.config.node_binary)
            .arg(&script_path)
            .current_dir(&project_dir)
            .env("NODE_PATH", project_dir.join("node_modules"))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                E2eError::Playwright(format!("Failed to spawn {}: {}", self.config.node_binary, e))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| E2eError::Playwright("stderr not captured".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = BufReader::new(stderr).read_to_string(&mut buf).await;
            buf
        });

        let budget = Duration::from_millis(
            spec.total_budget_ms(policy) + self.config.launch_slack_ms,
        );
        let mut events = Vec::new();
        let mut last_event = Instant::now();

        let stream = async {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                match parse_event(&line) {
                    Some(event) => {
                        log_event(&spec.name, &event);
                        events.push(event);
                        last_event = Instant::now();
                    }
                    None => debug!("[{}] {}", spec.name, line),
                }
            }
            child.wait().await
        };

        let outcome = tokio::time::timeout(budget, stream).await;
        let status = match outcome {
            Ok(status) => status?,
            Err(_) => {
                let _ = child.kill().await;
                warn!(
                    "[{}] killed after exceeding its {} ms budget",
                    spec.name,
                    budget.as_millis()
                );
                let stalled_ms = last_event.elapsed().as_millis() as u64;
                return Ok(budget_exceeded(spec, policy, events, budget, stalled_ms));
            }
        };

        let stderr = stderr_task.await.unwrap_or_default();
        if !stderr.trim().is_empty() {
            debug!("[{}] stderr: {}", spec.name, stderr.trim());
        }

        Ok(collect_run(spec, policy, events, status.success(), &stderr))
    }
}

fn log_event(scenario: &str, event: &ScriptEvent) {
    match event {
        ScriptEvent::Step { index, name, ok: true, duration_ms, .. } => {
            info!("[{}] step {} {} ok ({} ms)", scenario, index + 1, name, duration_ms);
        }
        ScriptEvent::Step { index, name, ok: false, error, .. } => {
            error!(
                "[{}] step {} {} failed: {}",
                scenario,
                index + 1,
                name,
                error.as_deref().unwrap_or("unknown error")
            );
        }
        ScriptEvent::Log { message } => info!("[TEST LOG] {}", message),
        ScriptEvent::Screenshot { path } => info!("[{}] failure screenshot: {}", scenario, path.display()),
        ScriptEvent::Error { message } => error!("[{}] {}", scenario, message),
        ScriptEvent::Done { ok } => debug!("[{}] done ok={}", scenario, ok),
    }
}

/// Fold the event stream of one run into step results and a verdict
pub fn collect_run(
    spec: &TestSpec,
    policy: &TimeoutPolicy,
    events: Vec<ScriptEvent>,
    exit_ok: bool,
    stderr: &str,
) -> ScenarioRun {
    let mut run = fold_events(spec, policy, events);

    if run.failure.is_none() {
        if !exit_ok {
            run.failure = Some(script_error(stderr.trim()));
        } else if run.steps.len() < spec.steps.len() {
            run.failure = Some(E2eError::Playwright(format!(
                "script ended after {} of {} steps",
                run.steps.len(),
                spec.steps.len()
            )));
        }
    }

    run
}

/// Verdict for a process killed at the overall budget. Steps reported so far
/// are kept and the step in progress is charged with the timeout.
fn budget_exceeded(
    spec: &TestSpec,
    policy: &TimeoutPolicy,
    events: Vec<ScriptEvent>,
    budget: Duration,
    stalled_ms: u64,
) -> ScenarioRun {
    let mut run = fold_events(spec, policy, events);
    if run.failure.is_some() {
        // A step already failed; the process hung in teardown.
        return run;
    }

    let index = run.steps.len();
    let step = spec
        .steps
        .get(index)
        .map(TestStep::name)
        .unwrap_or_else(|| spec.name.clone());
    let err = E2eError::Timeout {
        step: step.clone(),
        timeout_ms: budget.as_millis() as u64,
        detail: "scenario exceeded its overall budget".to_string(),
    };

    run.steps.push(StepResult {
        index,
        success: false,
        step_name: step,
        duration_ms: stalled_ms,
        error: Some(err.to_string()),
        failure_kind: Some(err.failure_kind()),
    });
    run.failure = Some(err);
    run
}

fn fold_events(spec: &TestSpec, policy: &TimeoutPolicy, events: Vec<ScriptEvent>) -> ScenarioRun {
    let mut steps = Vec::new();
    let mut failure = None;
    let mut screenshot_path = None;

    for event in events {
        match event {
            ScriptEvent::Step { index, name, ok, duration_ms, error } => {
                let mut result = StepResult {
                    index,
                    success: ok,
                    step_name: name,
                    duration_ms,
                    error: None,
                    failure_kind: None,
                };
                if !ok && failure.is_none() {
                    let message = error.unwrap_or_default();
                    let err = match spec.steps.get(index) {
                        Some(step) => classify_failure(step, policy, &message),
                        None => E2eError::Playwright(message),
                    };
                    result.error = Some(err.to_string());
                    result.failure_kind = Some(err.failure_kind());
                    failure = Some(err);
                }
                steps.push(result);
            }
            ScriptEvent::Error { message } if failure.is_none() => {
                failure = Some(script_error(&message));
            }
            ScriptEvent::Screenshot { path } => screenshot_path = Some(path),
            _ => {}
        }
    }

    ScenarioRun { steps, failure, screenshot_path }
}

fn script_error(message: &str) -> E2eError {
    if message.contains("Cannot find module '@playwright/test'") {
        E2eError::PlaywrightNotFound
    } else if message.is_empty() {
        E2eError::Playwright("script exited with failure".to_string())
    } else {
        E2eError::Playwright(message.to_string())
    }
}

/// Map a Playwright error message onto the failure taxonomy
pub fn classify_failure(step: &TestStep, policy: &TimeoutPolicy, message: &str) -> E2eError {
    let step_name = step.name();
    let locator = match step {
        TestStep::Fill { locator, .. }
        | TestStep::Click { locator }
        | TestStep::ExpectVisible { locator, .. }
        | TestStep::ExpectCount { locator, .. } => locator.to_string(),
        TestStep::WaitForSelector { selector, .. } => selector.clone(),
        _ => String::new(),
    };

    let received_value = RECEIVED.captures(message).map(|c| unquote(&c[1]));

    if NOT_FOUND.is_match(message) || received_value.as_deref() == Some("<element(s) not found>") {
        return E2eError::ElementNotFound { step: step_name, locator };
    }

    if let (Some(exp), Some(actual)) = (EXPECTED.captures(message), received_value) {
        return E2eError::AssertionMismatch {
            step: step_name,
            expected: unquote(&exp[1]),
            actual,
        };
    }

    if let Some(caps) = TIMED_OUT.captures(message) {
        // An action that timed out without ever resolving its target never found it.
        let interactive = matches!(step, TestStep::Fill { .. } | TestStep::Click { .. });
        if interactive && !message.contains("resolved to") {
            return E2eError::ElementNotFound { step: step_name, locator };
        }
        let timeout_ms = caps[1].parse().unwrap_or_else(|_| step.timeout_ms(policy));
        return E2eError::Timeout {
            step: step_name,
            timeout_ms,
            detail: first_line(message),
        };
    }

    E2eError::Playwright(format!("{}: {}", step_name, first_line(message)))
}

/// Step labels come from scenario data; keep them from ending a `//` comment
fn comment_safe(label: &str) -> String {
    label
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\u{2028}' | '\u{2029}' => ' ',
            c => c,
        })
        .collect()
}

fn unquote(value: &str) -> String {
    value.trim().trim_matches('"').to_string()
}

fn first_line(message: &str) -> String {
    message.lines().next().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Locator;
    use crate::spec::WaitState;

    fn handle() -> PlaywrightHandle {
        PlaywrightHandle::unchecked(
            "https://shop.example/",
            PlaywrightConfig {
                screenshot_dir: PathBuf::from("/tmp/shots"),
                ..Default::default()
            },
        )
    }

    fn two_step_spec() -> TestSpec {
        TestSpec::new("demo")
            .step(TestStep::Navigate { url: "/shop".into() })
            .step(TestStep::ExpectUrl { path: "/shop".into(), timeout_ms: Some(1234) })
    }

    #[test]
    fn test_browser_parse() {
        assert_eq!(Browser::parse("Firefox"), Browser::Firefox);
        assert_eq!(Browser::parse("webkit"), Browser::Webkit);
        assert_eq!(Browser::parse("edge"), Browser::Chromium);
    }

    #[test]
    fn test_script_single_session_with_teardown() {
        let script = handle().build_script(&two_step_spec(), &TimeoutPolicy::default());
        assert_eq!(script.matches(".launch(").count(), 1);
        assert!(script.contains("chromium.launch({ headless: true })"));
        assert!(script.contains("finally {\n    await browser.close();"));
        assert!(script.contains(r#"await page.goto("https://shop.example/shop", { timeout: 30000 });"#));
        assert!(script.contains(r#"await expect(page).toHaveURL("https://shop.example/shop", { timeout: 1234 });"#));
        assert!(script.contains(r#"await step(1, "expect_url:/shop""#));
        assert!(script.contains("page.screenshot"));
    }

    #[test]
    fn test_step_js_rendering() {
        let h = handle();
        let policy = TimeoutPolicy::default();
        let fill = TestStep::Fill {
            locator: Locator::placeholder("Email address"),
            value: "o'brien@example.com".into(),
        };
        assert_eq!(
            h.step_to_js(&fill, &policy),
            r#"await page.getByPlaceholder("Email address").fill("o'brien@example.com", { timeout: 5000 });"#
        );

        let wait = TestStep::WaitForSelector {
            selector: "iframe.razorpay-checkout-frame".into(),
            state: WaitState::Attached,
            timeout_ms: Some(15_000),
        };
        assert_eq!(
            h.step_to_js(&wait, &policy),
            r#"await page.waitForSelector("iframe.razorpay-checkout-frame", { state: "attached", timeout: 15000 });"#
        );
    }

    #[test]
    fn test_parse_event_lines() {
        assert_eq!(
            parse_event(r#"{"event":"step","index":0,"name":"navigate:/","ok":true,"duration_ms":12}"#),
            Some(ScriptEvent::Step {
                index: 0,
                name: "navigate:/".into(),
                ok: true,
                duration_ms: 12,
                error: None
            })
        );
        assert_eq!(parse_event("Debugger attached."), None);
        assert_eq!(parse_event(r#"{"unrelated":1}"#), None);
    }

    #[test]
    fn test_collect_run_success() {
        let spec = two_step_spec();
        let events = vec![
            ScriptEvent::Step { index: 0, name: "a".into(), ok: true, duration_ms: 5, error: None },
            ScriptEvent::Step { index: 1, name: "b".into(), ok: true, duration_ms: 7, error: None },
            ScriptEvent::Done { ok: true },
        ];
        let run = collect_run(&spec, &TimeoutPolicy::default(), events, true, "");
        assert!(run.success());
        assert_eq!(run.steps.len(), 2);
    }

    #[test]
    fn test_collect_run_stops_at_first_failure() {
        let spec = two_step_spec();
        let events = vec![
            ScriptEvent::Step { index: 0, name: "a".into(), ok: true, duration_ms: 5, error: None },
            ScriptEvent::Step {
                index: 1,
                name: "b".into(),
                ok: false,
                duration_ms: 1234,
                error: Some(
                    "Timed out 1234ms waiting for expect(page).toHaveURL(expected)\n\nExpected string: \"https://shop.example/shop\"\nReceived string: \"https://shop.example/\"".into(),
                ),
            },
            ScriptEvent::Screenshot { path: PathBuf::from("/tmp/shots/demo.png") },
            ScriptEvent::Done { ok: false },
        ];
        let run = collect_run(&spec, &TimeoutPolicy::default(), events, false, "");
        assert!(!run.success());
        assert_eq!(run.steps[1].failure_kind, Some(FailureKind::AssertionMismatch));
        assert_eq!(run.screenshot_path, Some(PathBuf::from("/tmp/shots/demo.png")));
        match run.failure {
            Some(E2eError::AssertionMismatch { expected, actual, .. }) => {
                assert_eq!(expected, "https://shop.example/shop");
                assert_eq!(actual, "https://shop.example/");
            }
            other => panic!("unexpected failure {:?}", other),
        }
    }

    #[test]
    fn test_collect_run_truncated_output() {
        let spec = two_step_spec();
        let events = vec![ScriptEvent::Step {
            index: 0,
            name: "a".into(),
            ok: true,
            duration_ms: 5,
            error: None,
        }];
        let run = collect_run(&spec, &TimeoutPolicy::default(), events, true, "");
        assert!(matches!(run.failure, Some(E2eError::Playwright(_))));
    }

    #[test]
    fn test_missing_module_is_not_found() {
        let run = collect_run(
            &two_step_spec(),
            &TimeoutPolicy::default(),
            vec![],
            false,
            "Error: Cannot find module '@playwright/test'",
        );
        assert!(matches!(run.failure, Some(E2eError::PlaywrightNotFound)));
    }

    #[test]
    fn test_classify_click_never_resolved() {
        let step = TestStep::Click { locator: Locator::role("link", "Shop").exact().first() };
        let msg = "locator.click: Timeout 5000ms exceeded.\nCall log:\n  - waiting for getByRole('link', { name: 'Shop', exact: true }).first()";
        let err = classify_failure(&step, &TimeoutPolicy::default(), msg);
        assert_eq!(err.failure_kind(), FailureKind::ElementNotFound);
    }

    #[test]
    fn test_classify_visible_not_found() {
        let step = TestStep::ExpectVisible {
            locator: Locator::text("Added to cart!"),
            timeout_ms: None,
        };
        let msg = "Timed out 5000ms waiting for expect(locator).toBeVisible()\n\nExpected: visible\nReceived: <element(s) not found>";
        let err = classify_failure(&step, &TimeoutPolicy::default(), msg);
        assert!(matches!(err, E2eError::ElementNotFound { ref locator, .. } if locator.contains("Added to cart!")));
    }

    #[test]
    fn test_classify_wait_timeout() {
        let step = TestStep::WaitForSelector {
            selector: "iframe.razorpay-checkout-frame".into(),
            state: WaitState::Attached,
            timeout_ms: Some(15_000),
        };
        let msg = "page.waitForSelector: Timeout 15000ms exceeded.\nCall log:\n  - waiting for locator('iframe.razorpay-checkout-frame')";
        match classify_failure(&step, &TimeoutPolicy::default(), msg) {
            E2eError::Timeout { timeout_ms, .. } => assert_eq!(timeout_ms, 15_000),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classify_other() {
        let step = TestStep::Navigate { url: "/".into() };
        let err = classify_failure(&step, &TimeoutPolicy::default(), "net::ERR_NAME_NOT_RESOLVED at https://x");
        assert_eq!(err.failure_kind(), FailureKind::Infrastructure);
    }

    #[test]
    fn test_expect_count_rendering_and_mismatch() {
        let step = TestStep::ExpectCount {
            locator: Locator::css("iframe.razorpay-checkout-frame"),
            count: 1,
            timeout_ms: None,
        };
        assert_eq!(
            handle().step_to_js(&step, &TimeoutPolicy::default()),
            r#"await expect(page.locator("iframe.razorpay-checkout-frame")).toHaveCount(1, { timeout: 5000 });"#
        );

        let msg = "Timed out 5000ms waiting for expect(locator).toHaveCount(expected)\n\nExpected: 1\nReceived: 2";
        match classify_failure(&step, &TimeoutPolicy::default(), msg) {
            E2eError::AssertionMismatch { expected, actual, .. } => {
                assert_eq!(expected, "1");
                assert_eq!(actual, "2");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_step_comment_cannot_break_out() {
        let spec = TestSpec::new("inject").step(TestStep::Navigate {
            url: "/a\rprocess.exit(7)\u{2028}x\u{2029}y".into(),
        });
        let script = handle().build_script(&spec, &TimeoutPolicy::default());
        let comment = script
            .lines()
            .find(|l| l.trim_start().starts_with("// Step 1:"))
            .unwrap();
        assert!(comment.contains("process.exit(7)"));
        for terminator in ['\r', '\u{2028}', '\u{2029}'] {
            assert!(!comment.contains(terminator));
        }
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        /// Stand-in for node that ignores the script and runs `body`
        fn fake_node(dir: &Path, body: &str) -> String {
            let path = dir.join("node");
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "#!/bin/sh\n{}", body).unwrap();
            file.sync_all().unwrap();
            drop(file);
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().into_owned()
        }

        fn fake_handle(node_binary: String, launch_slack_ms: u64) -> PlaywrightHandle {
            PlaywrightHandle::unchecked(
                "https://shop.example",
                PlaywrightConfig {
                    node_binary,
                    screenshot_on_failure: false,
                    launch_slack_ms,
                    ..Default::default()
                },
            )
        }

        fn log_spec() -> TestSpec {
            TestSpec::new("fake")
                .step(TestStep::Log { message: "first".into() })
                .step(TestStep::Log { message: "second".into() })
        }

        #[tokio::test]
        async fn test_run_streams_step_events() {
            let dir = tempfile::tempdir().unwrap();
            let node = fake_node(
                dir.path(),
                r#"echo '{"event":"step","index":0,"name":"log:first","ok":true,"duration_ms":3}'
echo 'Debugger attached.'
echo '{"event":"step","index":1,"name":"log:second","ok":true,"duration_ms":4}'
echo '{"event":"done","ok":true}'"#,
            );

            let run = fake_handle(node, 60_000)
                .run(&log_spec(), &TimeoutPolicy::default())
                .await
                .unwrap();
            assert!(run.success(), "{:?}", run.failure);
            let names: Vec<_> = run.steps.iter().map(|s| s.step_name.as_str()).collect();
            assert_eq!(names, vec!["log:first", "log:second"]);
            assert_eq!(run.steps[1].duration_ms, 4);
        }

        #[tokio::test]
        async fn test_run_nonzero_exit_is_infrastructure_failure() {
            let dir = tempfile::tempdir().unwrap();
            let node = fake_node(
                dir.path(),
                r#"echo '{"event":"step","index":0,"name":"log:first","ok":true,"duration_ms":3}'
echo 'browserType.launch: Executable does not exist' >&2
exit 3"#,
            );

            let run = fake_handle(node, 60_000)
                .run(&log_spec(), &TimeoutPolicy::default())
                .await
                .unwrap();
            assert_eq!(run.steps.len(), 1);
            match run.failure {
                Some(E2eError::Playwright(message)) => {
                    assert!(message.contains("Executable does not exist"), "{}", message)
                }
                other => panic!("unexpected failure {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_run_budget_keeps_partial_steps() {
            let dir = tempfile::tempdir().unwrap();
            let node = fake_node(
                dir.path(),
                r#"echo '{"event":"step","index":0,"name":"log:first","ok":true,"duration_ms":3}'
exec sleep 30"#,
            );

            let started = Instant::now();
            let run = fake_handle(node, 300)
                .run(&log_spec(), &TimeoutPolicy::default())
                .await
                .unwrap();
            assert!(started.elapsed() < Duration::from_secs(10));

            assert_eq!(run.steps.len(), 2);
            assert!(run.steps[0].success);
            assert!(!run.steps[1].success);
            assert_eq!(run.steps[1].step_name, "log:second");
            assert_eq!(run.steps[1].failure_kind, Some(FailureKind::Timeout));
            match run.failure {
                Some(E2eError::Timeout { step, timeout_ms, .. }) => {
                    assert_eq!(step, "log:second");
                    assert_eq!(timeout_ms, 300);
                }
                other => panic!("unexpected failure {:?}", other),
            }
        }
    }
}
