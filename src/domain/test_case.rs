use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MANUAL_REVIEW_TEST_NAME: &str = "Manual Review Required";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    /// Accepts whatever a model wrote in the priority field; unknown values map to Medium.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "high" | "critical" | "p1" | "urgent" => Self::High,
            "low" | "minor" | "trivial" | "p3" => Self::Low,
            _ => Self::Medium,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TestStatus {
    #[default]
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    Passed,
    Failed,
    Blocked,
    Skipped,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InProgress => "In Progress",
            Self::Passed => "Passed",
            Self::Failed => "Failed",
            Self::Blocked => "Blocked",
            Self::Skipped => "Skipped",
        }
    }

    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().replace(['_', '-'], " ").as_str() {
            "in progress" => Self::InProgress,
            "passed" | "pass" => Self::Passed,
            "failed" | "fail" => Self::Failed,
            "blocked" => Self::Blocked,
            "skipped" | "skip" => Self::Skipped,
            _ => Self::New,
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Well-known categories. `ManualTestCase::category` stays free-form text;
/// these are the labels the prompts suggest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestCategory {
    Functional,
    Ui,
    Integration,
    Regression,
    Smoke,
    Security,
    Performance,
    Usability,
    EdgeCase,
    Negative,
    Boundary,
}

impl TestCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Functional => "Functional",
            Self::Ui => "UI",
            Self::Integration => "Integration",
            Self::Regression => "Regression",
            Self::Smoke => "Smoke",
            Self::Security => "Security",
            Self::Performance => "Performance",
            Self::Usability => "Usability",
            Self::EdgeCase => "Edge Case",
            Self::Negative => "Negative",
            Self::Boundary => "Boundary",
        }
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStep {
    pub step_number: u32,
    pub action: String,
    #[serde(default)]
    pub test_data: String,
    #[serde(default)]
    pub expected_result: String,
}

impl TestStep {
    pub fn new(step_number: u32, action: impl Into<String>) -> Self {
        Self {
            step_number,
            action: action.into(),
            test_data: String::new(),
            expected_result: String::new(),
        }
    }

    pub fn to_text(&self) -> String {
        let mut text = format!("Step {}: {}", self.step_number, self.action);
        if !self.test_data.is_empty() {
            text.push_str(&format!("\n   Test Data: {}", self.test_data));
        }
        if !self.expected_result.is_empty() {
            text.push_str(&format!("\n   Expected: {}", self.expected_result));
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualTestCase {
    pub test_id: String,
    pub test_name: String,
    pub description: String,
    #[serde(default)]
    pub preconditions: Vec<String>,
    #[serde(default)]
    pub test_steps: Vec<TestStep>,
    #[serde(default)]
    pub expected_results: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub status: TestStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

fn default_category() -> String {
    TestCategory::Functional.as_str().to_string()
}

impl ManualTestCase {
    pub fn new(
        test_id: impl Into<String>,
        test_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            test_id: test_id.into(),
            test_name: test_name.into(),
            description: description.into(),
            preconditions: Vec::new(),
            test_steps: Vec::new(),
            expected_results: Vec::new(),
            priority: Priority::Medium,
            category: default_category(),
            status: TestStatus::New,
            tags: Vec::new(),
            notes: String::new(),
        }
    }

    /// Stand-in returned when a manual-test response yields nothing usable.
    pub fn manual_review_placeholder() -> Self {
        Self {
            preconditions: vec!["Review LLM output".to_string()],
            test_steps: vec![TestStep::new(1, "Review raw LLM response")],
            expected_results: vec!["Test cases extracted manually".to_string()],
            priority: Priority::High,
            ..Self::new(
                "TC_001",
                MANUAL_REVIEW_TEST_NAME,
                "The LLM response could not be parsed. Please review the raw output.",
            )
        }
    }

    pub fn needs_manual_review(&self) -> bool {
        self.test_name == MANUAL_REVIEW_TEST_NAME
    }

    pub fn to_text(&self) -> String {
        let rule = "=".repeat(60);
        let mut lines = vec![
            rule.clone(),
            format!("TEST CASE: {}", self.test_id),
            rule.clone(),
            format!("TEST NAME: {}", self.test_name),
            String::new(),
            "DESCRIPTION:".to_string(),
            format!("  {}", self.description),
            String::new(),
            format!("PRIORITY: {}", self.priority),
            format!("CATEGORY: {}", self.category),
            format!("STATUS: {}", self.status),
        ];

        if !self.tags.is_empty() {
            lines.push(format!("TAGS: {}", self.tags.join(", ")));
        }

        lines.push(String::new());
        lines.push("PRECONDITIONS:".to_string());
        lines.extend(self.preconditions.iter().map(|p| format!("  - {}", p)));

        lines.push(String::new());
        lines.push("TEST STEPS:".to_string());
        lines.extend(self.test_steps.iter().map(|s| format!("  {}", s.to_text())));

        lines.push(String::new());
        lines.push("EXPECTED RESULTS:".to_string());
        lines.extend(
            self.expected_results
                .iter()
                .enumerate()
                .map(|(i, r)| format!("  {}. {}", i + 1, r)),
        );

        if !self.notes.is_empty() {
            lines.push(String::new());
            lines.push(format!("NOTES: {}", self.notes));
        }

        lines.push(rule);
        lines.join("\n")
    }

    pub fn steps_text(&self) -> String {
        self.test_steps
            .iter()
            .map(|s| {
                if s.test_data.is_empty() {
                    format!("{}. {}", s.step_number, s.action)
                } else {
                    format!("{}. {} [Data: {}]", s.step_number, s.action, s.test_data)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn expected_results_text(&self) -> String {
        self.expected_results
            .iter()
            .enumerate()
            .map(|(i, r)| format!("{}. {}", i + 1, r))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn preconditions_text(&self) -> String {
        self.preconditions
            .iter()
            .map(|p| format!("- {}", p))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Gherkin,
    Selenium,
    Playwright,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gherkin => "gherkin",
            Self::Selenium => "selenium",
            Self::Playwright => "playwright",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Gherkin => "Gherkin",
            Self::Selenium => "Selenium",
            Self::Playwright => "Playwright",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gherkin => "feature",
            Self::Selenium => "py",
            Self::Playwright => "spec.js",
        }
    }

    /// Code-fence language tags accepted for this kind.
    pub fn language_hints(&self) -> &'static [&'static str] {
        match self {
            Self::Gherkin => &["gherkin", "feature", "cucumber"],
            Self::Selenium => &["python", "py"],
            Self::Playwright => &["javascript", "js", "typescript", "ts"],
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated feature file or automation script. Built by the response parser, never mutated after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationScript {
    pub kind: ArtifactKind,
    pub filename: String,
    pub content: String,
    #[serde(default)]
    pub related_test_ids: Vec<String>,
    #[serde(default)]
    pub feature_name: String,
    #[serde(default)]
    pub scenario_count: u32,
}

impl AutomationScript {
    pub fn extension(&self) -> &'static str {
        self.kind.extension()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SuiteSummary {
    pub manual_tests: usize,
    pub gherkin_scenarios: usize,
    pub selenium_tests: usize,
    pub playwright_tests: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuite {
    pub generation_id: String,
    pub name: String,
    pub description: String,
    pub manual_tests: Vec<ManualTestCase>,
    pub gherkin_scripts: Vec<AutomationScript>,
    pub selenium_scripts: Vec<AutomationScript>,
    pub playwright_scripts: Vec<AutomationScript>,
    pub client_name: String,
    pub requirement_source: String,
    pub generated_at: DateTime<Utc>,
}

impl TestSuite {
    pub fn summary(&self) -> SuiteSummary {
        SuiteSummary {
            manual_tests: self.manual_tests.len(),
            gherkin_scenarios: self
                .gherkin_scripts
                .iter()
                .map(|s| s.scenario_count as usize)
                .sum(),
            selenium_tests: self.selenium_scripts.len(),
            playwright_tests: self.playwright_scripts.len(),
        }
    }

    pub fn total_count(&self) -> usize {
        let summary = self.summary();
        summary.manual_tests
            + summary.gherkin_scenarios
            + summary.selenium_tests
            + summary.playwright_tests
    }

    pub fn scripts(&self, kind: ArtifactKind) -> &[AutomationScript] {
        match kind {
            ArtifactKind::Gherkin => &self.gherkin_scripts,
            ArtifactKind::Selenium => &self.selenium_scripts,
            ArtifactKind::Playwright => &self.playwright_scripts,
        }
    }

    pub(crate) fn scripts_mut(&mut self, kind: ArtifactKind) -> &mut Vec<AutomationScript> {
        match kind {
            ArtifactKind::Gherkin => &mut self.gherkin_scripts,
            ArtifactKind::Selenium => &mut self.selenium_scripts,
            ArtifactKind::Playwright => &mut self.playwright_scripts,
        }
    }
}
