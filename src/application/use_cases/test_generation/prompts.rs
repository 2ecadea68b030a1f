//! Prompt text for every generation stage. Pure functions: no I/O, no randomness.

use crate::domain::generation::GenerationOptions;
use crate::shared::truncate_chars;

pub const SYSTEM_PROMPT: &str = "You are an expert QA Engineer. Generate comprehensive test cases in valid JSON format.
Always include: positive tests, negative tests, edge cases, and boundary tests.
Assign priority (High/Medium/Low) based on business impact.";

pub const REQUIREMENTS_CAP: usize = 3000;
pub const CLIENT_CONTEXT_CAP: usize = 1000;
pub const MANUAL_TESTS_CAP: usize = 2000;
pub const REQUIREMENTS_SUMMARY_CAP: usize = 500;
pub const ENHANCE_TESTS_CAP: usize = 1500;
pub const ENHANCE_REQUIREMENTS_CAP: usize = 1000;

const MANUAL_TESTS_SHAPE: &str = r#"{
  "test_cases": [
    {
      "test_id": "TC_001",
      "test_name": "Brief descriptive name",
      "description": "What this test verifies",
      "preconditions": ["condition1", "condition2"],
      "test_steps": [
        {"step_number": 1, "action": "Do something", "test_data": "data", "expected_result": "Result"}
      ],
      "expected_results": ["Final outcome 1", "Final outcome 2"],
      "priority": "High",
      "category": "Functional",
      "tags": ["tag1", "tag2"]
    }
  ]
}"#;

const GHERKIN_SHAPE: &str = r#"{
  "feature_files": [
    {
      "filename": "feature_name.feature",
      "feature_name": "Feature Name",
      "content": "Feature: Name\n  Scenario: Test\n    Given...\n    When...\n    Then...",
      "scenario_count": 3,
      "related_test_ids": ["TC_001"]
    }
  ]
}"#;

const SELENIUM_SHAPE: &str = r#"{
  "scripts": [
    {
      "filename": "test_feature.py",
      "content": "import pytest\nfrom selenium import webdriver\n\nclass TestFeature:\n    def test_case(self):\n        pass",
      "related_test_ids": ["TC_001"],
      "description": "Feature tests"
    }
  ]
}"#;

const PLAYWRIGHT_SHAPE: &str = r#"{
  "scripts": [
    {
      "filename": "feature.spec.js",
      "content": "const { test, expect } = require('@playwright/test');\n\ntest('test name', async ({ page }) => {\n  // test code\n});",
      "related_test_ids": ["TC_001"],
      "description": "Feature tests"
    }
  ]
}"#;

const ENHANCE_SHAPE: &str = r#"{
  "additional_tests": [
    {"test_id": "TC_NEW", "test_name": "...", "description": "...", "preconditions": [], "test_steps": [], "expected_results": [], "priority": "Medium", "category": "Edge Case", "tags": []}
  ]
}"#;

fn client_context_section(client_context: &str) -> String {
    if client_context.trim().is_empty() {
        return String::new();
    }
    format!(
        "\nClient context:\n{}\n",
        truncate_chars(client_context, CLIENT_CONTEXT_CAP)
    )
}

fn coverage_instructions(options: &GenerationOptions) -> String {
    let mut lines = vec!["- Positive/functional tests"];
    if options.include_negative {
        lines.push("- Negative tests (invalid inputs, errors)");
    }
    if options.include_edge_cases {
        lines.push("- Edge cases");
    }
    if options.include_boundary {
        lines.push("- Boundary value tests");
    }
    lines.join("\n")
}

pub fn build_manual_test_prompt(
    requirements: &str,
    client_context: &str,
    options: &GenerationOptions,
) -> String {
    format!(
        "Generate manual test cases for these requirements:\n\n{}\n{}\nReturn ONLY valid JSON in this exact format:\n{}\n\nGenerate 5-10 test cases covering:\n{}\n\nReturn ONLY the JSON, no other text.",
        truncate_chars(requirements, REQUIREMENTS_CAP),
        client_context_section(client_context),
        MANUAL_TESTS_SHAPE,
        coverage_instructions(options)
    )
}

pub fn build_gherkin_prompt(
    manual_tests: &str,
    requirements_summary: &str,
    client_context: &str,
) -> String {
    format!(
        "Convert these test cases to Gherkin format:\n\n{}\n\nRequirements: {}\n{}\nReturn ONLY valid JSON:\n{}\n\nReturn ONLY the JSON, no other text.",
        truncate_chars(manual_tests, MANUAL_TESTS_CAP),
        truncate_chars(requirements_summary, REQUIREMENTS_SUMMARY_CAP),
        client_context_section(client_context),
        GHERKIN_SHAPE
    )
}

pub fn build_selenium_prompt(
    manual_tests: &str,
    requirements_summary: &str,
    client_context: &str,
) -> String {
    format!(
        "Generate Selenium Python tests for:\n\n{}\n\nRequirements: {}\n{}\nReturn ONLY valid JSON:\n{}\n\nUse pytest, explicit waits, Page Object Model. Return ONLY JSON.",
        truncate_chars(manual_tests, MANUAL_TESTS_CAP),
        truncate_chars(requirements_summary, REQUIREMENTS_SUMMARY_CAP),
        client_context_section(client_context),
        SELENIUM_SHAPE
    )
}

pub fn build_playwright_prompt(
    manual_tests: &str,
    requirements_summary: &str,
    client_context: &str,
) -> String {
    format!(
        "Generate Playwright JavaScript tests for:\n\n{}\n\nRequirements: {}\n{}\nReturn ONLY valid JSON:\n{}\n\nUse @playwright/test, async/await, proper locators. Return ONLY JSON.",
        truncate_chars(manual_tests, MANUAL_TESTS_CAP),
        truncate_chars(requirements_summary, REQUIREMENTS_SUMMARY_CAP),
        client_context_section(client_context),
        PLAYWRIGHT_SHAPE
    )
}

pub fn build_enhancement_prompt(
    current_tests: &str,
    requirements: &str,
    client_context: &str,
) -> String {
    format!(
        "Add missing test cases to this list:\n\n{}\n\nRequirements: {}\n{}\nAdd ONLY new tests not already covered. Return JSON:\n{}\n\nReturn ONLY JSON.",
        truncate_chars(current_tests, ENHANCE_TESTS_CAP),
        truncate_chars(requirements, ENHANCE_REQUIREMENTS_CAP),
        client_context_section(client_context),
        ENHANCE_SHAPE
    )
}
