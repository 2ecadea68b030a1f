//! Turns raw model output into typed artifacts.
//!
//! Every stage runs the same cascade: Tier 1 finds a JSON object, Tier 2 maps
//! the records under the expected (or an alternate) key, and Tier 3 scans the
//! raw text when the first two produced nothing. Only the schema differs.

use super::llm_output::{extract_json_object, JsonObject};
use crate::domain::test_case::{
    ArtifactKind, AutomationScript, ManualTestCase, Priority, TestStatus, TestStep,
};
use crate::infrastructure::response::strip_reasoning;
use crate::shared::slugify;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

static FEATURE_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Feature:[ \t]*([^\r\n]+)").unwrap());

static SCENARIO_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Scenario(?:\s+Outline)?:").unwrap());

static CODE_BLOCK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```([A-Za-z0-9_+\-]*)[ \t]*\r?\n(.*?)```").unwrap());

const FEATURE_KEYWORD: &str = "Feature:";
const FEATURE_FILENAME_CHARS: usize = 50;

const SELENIUM_INDICATORS: &[&str] = &["import", "def test_", "class Test", "selenium", "webdriver"];
const PLAYWRIGHT_INDICATORS: &[&str] = &["test(", "expect(", "page.", "playwright", "require(", "import "];

/// What differs between stages: where the records live, how one record maps, and the raw-text fallback.
pub(crate) trait ArtifactSchema {
    type Artifact;

    fn stage(&self) -> &'static str;

    fn primary_key(&self) -> &'static str;

    fn alternate_keys(&self) -> &'static [&'static str];

    /// `Ok(None)` drops a record with no content. `Err` is logged and the record skipped.
    fn map_record(
        &self,
        record: &JsonObject,
        accepted: usize,
    ) -> std::result::Result<Option<Self::Artifact>, String>;

    fn fallback(&self, raw: &str) -> Vec<Self::Artifact>;
}

fn parse_with<S: ArtifactSchema>(schema: &S, raw: &str) -> Vec<S::Artifact> {
    let cleaned = strip_reasoning(raw);
    let artifacts = extract_json_object(&cleaned)
        .map(|object| map_records(schema, &object))
        .unwrap_or_default();

    if !artifacts.is_empty() {
        return artifacts;
    }

    let artifacts = schema.fallback(&cleaned);
    warn!(
        stage = schema.stage(),
        tier = "raw_text",
        recovered = artifacts.len(),
        "Structured parsing yielded no artifacts, using raw-text fallback"
    );
    artifacts
}

fn map_records<S: ArtifactSchema>(schema: &S, object: &JsonObject) -> Vec<S::Artifact> {
    let Some((key, value)) = std::iter::once(schema.primary_key())
        .chain(schema.alternate_keys().iter().copied())
        .find_map(|key| object.get(key).map(|value| (key, value)))
    else {
        debug!(stage = schema.stage(), keys = ?object.keys().collect::<Vec<_>>(), "No expected key in JSON");
        return Vec::new();
    };

    if key != schema.primary_key() {
        debug!(stage = schema.stage(), key, "Using alternate key");
    }

    let records: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![value],
        _ => Vec::new(),
    };

    let mut artifacts = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let Value::Object(record) = record else {
            warn!(stage = schema.stage(), index, "Skipping record that is not an object");
            continue;
        };
        match schema.map_record(record, artifacts.len()) {
            Ok(Some(artifact)) => artifacts.push(artifact),
            Ok(None) => debug!(stage = schema.stage(), index, "Skipping empty record"),
            Err(cause) => warn!(stage = schema.stage(), index, %cause, "Skipping malformed record"),
        }
    }
    artifacts
}

fn text_field(record: &JsonObject, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.get(*key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn list_item_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Null => None,
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// A list field; a bare string becomes one element (or comma-separated items when `split_commas`).
fn string_list(record: &JsonObject, key: &str, split_commas: bool) -> Vec<String> {
    match record.get(key) {
        Some(Value::Array(items)) => items.iter().filter_map(list_item_text).collect(),
        Some(Value::String(s)) if split_commas => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(other) => list_item_text(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn count_field(record: &JsonObject, key: &str) -> Option<u32> {
    match record.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Steps are renumbered by position so numbering is always contiguous from 1.
fn parse_steps(record: &JsonObject) -> std::result::Result<Vec<TestStep>, String> {
    let items: Vec<&Value> = match record.get("test_steps").or_else(|| record.get("steps")) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single @ (Value::String(_) | Value::Object(_))) => vec![single],
        Some(other) => return Err(format!("test_steps has unexpected type: {}", other)),
    };

    let mut steps = Vec::with_capacity(items.len());
    for item in items {
        let step_number = steps.len() as u32 + 1;
        match item {
            Value::Object(step) => {
                if let Some(source) = count_field(step, "step_number") {
                    if source != step_number {
                        debug!(source, assigned = step_number, "Renumbering test step");
                    }
                }
                steps.push(TestStep {
                    step_number,
                    action: text_field(step, &["action", "step", "description"]).unwrap_or_default(),
                    test_data: text_field(step, &["test_data", "data"]).unwrap_or_default(),
                    expected_result: text_field(step, &["expected_result", "expected"])
                        .unwrap_or_default(),
                });
            }
            other => {
                if let Some(action) = list_item_text(other) {
                    steps.push(TestStep::new(step_number, action));
                }
            }
        }
    }
    Ok(steps)
}

fn map_manual_test(
    record: &JsonObject,
    accepted: usize,
) -> std::result::Result<Option<ManualTestCase>, String> {
    let test_id = text_field(record, &["test_id", "id"]).filter(|s| !s.trim().is_empty());
    let test_name = text_field(record, &["test_name", "name", "title"]).filter(|s| !s.trim().is_empty());
    let description = text_field(record, &["description"]).unwrap_or_default();
    let test_steps = parse_steps(record)?;
    let expected_results = string_list(record, "expected_results", false);
    let preconditions = string_list(record, "preconditions", false);
    let tags = string_list(record, "tags", true);

    if test_id.is_none()
        && test_name.is_none()
        && description.trim().is_empty()
        && preconditions.is_empty()
        && test_steps.is_empty()
        && expected_results.is_empty()
        && tags.is_empty()
    {
        return Ok(None);
    }

    let mut case = ManualTestCase::new(
        test_id.unwrap_or_else(|| format!("TC_{:03}", accepted + 1)),
        test_name.unwrap_or_else(|| "Unnamed Test".to_string()),
        description,
    );
    case.preconditions = preconditions;
    case.test_steps = test_steps;
    case.expected_results = expected_results;
    case.priority = text_field(record, &["priority"])
        .map(|p| Priority::parse_lenient(&p))
        .unwrap_or_default();
    if let Some(category) = text_field(record, &["category"]).filter(|c| !c.trim().is_empty()) {
        case.category = category;
    }
    case.status = text_field(record, &["status"])
        .map(|s| TestStatus::parse_lenient(&s))
        .unwrap_or_default();
    case.tags = tags;
    case.notes = text_field(record, &["notes"]).unwrap_or_default();

    Ok(Some(case))
}

/// Model output sometimes repeats ids; later duplicates get the next free `TC_nnn`.
fn ensure_unique_ids(tests: &mut [ManualTestCase]) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut next = 1usize;
    let taken: HashSet<String> = tests.iter().map(|t| t.test_id.clone()).collect();

    for test in tests.iter_mut() {
        if seen.insert(test.test_id.clone()) {
            continue;
        }
        let replacement = loop {
            let candidate = format!("TC_{:03}", next);
            next += 1;
            if !taken.contains(&candidate) && !seen.contains(&candidate) {
                break candidate;
            }
        };
        debug!(duplicate = %test.test_id, assigned = %replacement, "Reassigning duplicate test id");
        test.test_id = replacement.clone();
        seen.insert(replacement);
    }
}

pub(crate) struct ManualTestSchema;

impl ArtifactSchema for ManualTestSchema {
    type Artifact = ManualTestCase;

    fn stage(&self) -> &'static str {
        "manual"
    }

    fn primary_key(&self) -> &'static str {
        "test_cases"
    }

    fn alternate_keys(&self) -> &'static [&'static str] {
        &["tests", "additional_tests"]
    }

    fn map_record(
        &self,
        record: &JsonObject,
        accepted: usize,
    ) -> std::result::Result<Option<ManualTestCase>, String> {
        map_manual_test(record, accepted)
    }

    fn fallback(&self, _raw: &str) -> Vec<ManualTestCase> {
        vec![ManualTestCase::manual_review_placeholder()]
    }
}

pub(crate) struct EnhancementSchema;

impl ArtifactSchema for EnhancementSchema {
    type Artifact = ManualTestCase;

    fn stage(&self) -> &'static str {
        "enhance"
    }

    fn primary_key(&self) -> &'static str {
        "additional_tests"
    }

    fn alternate_keys(&self) -> &'static [&'static str] {
        &["test_cases"]
    }

    fn map_record(
        &self,
        record: &JsonObject,
        accepted: usize,
    ) -> std::result::Result<Option<ManualTestCase>, String> {
        map_manual_test(record, accepted)
    }

    fn fallback(&self, _raw: &str) -> Vec<ManualTestCase> {
        Vec::new()
    }
}

pub(crate) struct FeatureFileSchema;

fn count_scenarios(content: &str) -> u32 {
    SCENARIO_PATTERN.find_iter(content).count() as u32
}

impl ArtifactSchema for FeatureFileSchema {
    type Artifact = AutomationScript;

    fn stage(&self) -> &'static str {
        "gherkin"
    }

    fn primary_key(&self) -> &'static str {
        "feature_files"
    }

    fn alternate_keys(&self) -> &'static [&'static str] {
        &["scripts"]
    }

    fn map_record(
        &self,
        record: &JsonObject,
        _accepted: usize,
    ) -> std::result::Result<Option<AutomationScript>, String> {
        let Some(content) = text_field(record, &["content"]).filter(|c| !c.trim().is_empty())
        else {
            return Ok(None);
        };

        Ok(Some(AutomationScript {
            kind: ArtifactKind::Gherkin,
            filename: text_field(record, &["filename"])
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| "feature.feature".to_string()),
            scenario_count: count_field(record, "scenario_count")
                .unwrap_or_else(|| count_scenarios(&content)),
            feature_name: text_field(record, &["feature_name", "description"]).unwrap_or_default(),
            related_test_ids: string_list(record, "related_test_ids", true),
            content,
        }))
    }

    /// Blocks run from a `Feature:` keyword to the next one at a line start, or the end of text.
    fn fallback(&self, raw: &str) -> Vec<AutomationScript> {
        let Some(start) = raw.find(FEATURE_KEYWORD) else {
            return Vec::new();
        };

        let mut scripts = Vec::new();
        for (index, part) in raw[start..].split("\nFeature:").enumerate() {
            let block = if index == 0 {
                part.to_string()
            } else {
                format!("{}{}", FEATURE_KEYWORD, part)
            };
            let content = match block.find("```") {
                Some(fence) => block[..fence].trim(),
                None => block.trim(),
            };
            if content.is_empty() || !content.contains("Scenario") {
                continue;
            }

            let feature_name = FEATURE_NAME_PATTERN
                .captures(content)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| format!("Feature {}", index + 1));

            scripts.push(AutomationScript {
                kind: ArtifactKind::Gherkin,
                filename: format!("{}.feature", slugify(&feature_name, FEATURE_FILENAME_CHARS)),
                content: content.to_string(),
                related_test_ids: Vec::new(),
                scenario_count: count_scenarios(content),
                feature_name,
            });
        }
        scripts
    }
}

pub(crate) struct ScriptSchema {
    pub(crate) kind: ArtifactKind,
}

impl ScriptSchema {
    fn indicators(&self) -> &'static [&'static str] {
        match self.kind {
            ArtifactKind::Playwright => PLAYWRIGHT_INDICATORS,
            _ => SELENIUM_INDICATORS,
        }
    }

    fn generated_filename(&self, n: usize) -> String {
        format!("test_generated_{}.{}", n, self.kind.extension())
    }
}

impl ArtifactSchema for ScriptSchema {
    type Artifact = AutomationScript;

    fn stage(&self) -> &'static str {
        self.kind.as_str()
    }

    fn primary_key(&self) -> &'static str {
        "scripts"
    }

    fn alternate_keys(&self) -> &'static [&'static str] {
        &["feature_files"]
    }

    fn map_record(
        &self,
        record: &JsonObject,
        accepted: usize,
    ) -> std::result::Result<Option<AutomationScript>, String> {
        let Some(content) = text_field(record, &["content", "code"]).filter(|c| !c.trim().is_empty())
        else {
            return Ok(None);
        };

        Ok(Some(AutomationScript {
            kind: self.kind,
            filename: text_field(record, &["filename"])
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| self.generated_filename(accepted + 1)),
            content,
            related_test_ids: string_list(record, "related_test_ids", true),
            feature_name: text_field(record, &["description", "feature_name"]).unwrap_or_default(),
            scenario_count: 0,
        }))
    }

    /// Fenced blocks tagged with the target language (or untagged) that contain a
    /// characteristic token. A keyword heuristic, not a parser.
    fn fallback(&self, raw: &str) -> Vec<AutomationScript> {
        let hints = self.kind.language_hints();
        let indicators = self.indicators();
        let mut scripts = Vec::new();

        for caps in CODE_BLOCK_PATTERN.captures_iter(raw) {
            let language = caps.get(1).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
            if !language.is_empty() && !hints.contains(&language.as_str()) {
                continue;
            }

            let code = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            if code.is_empty() || !indicators.iter().any(|token| code.contains(token)) {
                continue;
            }

            let n = scripts.len() + 1;
            scripts.push(AutomationScript {
                kind: self.kind,
                filename: self.generated_filename(n),
                content: code.to_string(),
                related_test_ids: Vec::new(),
                feature_name: format!("Generated {} test {}", self.kind.display_name(), n),
                scenario_count: 0,
            });
        }
        scripts
    }
}

/// Manual tests; falls back to a single manual-review placeholder.
pub fn parse_manual_tests(raw: &str) -> Vec<ManualTestCase> {
    let mut tests = parse_with(&ManualTestSchema, raw);
    ensure_unique_ids(&mut tests);
    tests
}

pub fn parse_gherkin_scripts(raw: &str) -> Vec<AutomationScript> {
    parse_with(&FeatureFileSchema, raw)
}

pub fn parse_automation_scripts(raw: &str, kind: ArtifactKind) -> Vec<AutomationScript> {
    if kind == ArtifactKind::Gherkin {
        return parse_gherkin_scripts(raw);
    }
    parse_with(&ScriptSchema { kind }, raw)
}

/// Additional tests from an enhancement response, numbered after `existing` tests.
pub fn parse_additional_tests(raw: &str, existing: usize) -> Vec<ManualTestCase> {
    let mut tests = parse_with(&EnhancementSchema, raw);
    for (offset, test) in tests.iter_mut().enumerate() {
        test.test_id = format!("TC_{:03}", existing + offset + 1);
    }
    tests
}
