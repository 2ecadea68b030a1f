mod enhance;
pub(crate) mod llm_output;
pub mod parsing;
pub(crate) mod progress;
pub mod prompts;

use crate::domain::client_context::ClientContext;
use crate::domain::error::{AppError, Result};
use crate::domain::generation::{GenerationOptions, GenerationProgress, GenerationStage};
use crate::domain::llm_config::LLMConfig;
use crate::domain::requirement::Requirement;
use crate::domain::test_case::{ArtifactKind, AutomationScript, ManualTestCase, TestSuite};
use crate::infrastructure::llm_clients::{LLMClient, LlmService};
use crate::shared::truncate_chars;
use chrono::Utc;
use progress::ProgressTracker;
use prompts::{
    build_gherkin_prompt, build_manual_test_prompt, build_playwright_prompt,
    build_selenium_prompt, SYSTEM_PROMPT,
};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;
use validator::Validate;

/// Manual tests passed on to the script stages.
const MANUAL_TESTS_FOR_SCRIPTS: usize = 10;
const REQUIREMENTS_SUMMARY_CHARS: usize = 2000;

pub struct TestGenerationUseCase {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    code_llm_client: Arc<dyn LLMClient + Send + Sync>,
}

/// Inputs shared by every stage after the manual one.
struct StageInput<'a> {
    manual_tests_json: String,
    manual_test_count: usize,
    requirements_summary: &'a str,
    context_text: &'a str,
}

impl TestGenerationUseCase {
    pub fn new(
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        code_llm_client: Arc<dyn LLMClient + Send + Sync>,
    ) -> Self {
        Self {
            llm_client,
            code_llm_client,
        }
    }

    /// One client for every stage.
    pub fn with_client(llm_client: Arc<dyn LLMClient + Send + Sync>) -> Self {
        Self::new(llm_client.clone(), llm_client)
    }

    pub async fn from_config(config: &LLMConfig) -> Self {
        let code_service = LlmService::code_service(config).await;
        Self::new(
            Arc::new(LlmService::new(config.clone())),
            Arc::new(code_service),
        )
    }

    /// Runs the manual stage and every requested script stage in order.
    ///
    /// `progress` is called synchronously at each checkpoint. On failure it
    /// receives exactly one `error` event before the error is returned.
    pub async fn generate_test_suite<F>(
        &self,
        requirement: &Requirement,
        client_context: Option<&ClientContext>,
        options: &GenerationOptions,
        progress: F,
    ) -> Result<TestSuite>
    where
        F: FnMut(GenerationProgress) + Send,
    {
        let generation_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "generate_test_suite",
            generation_id = %generation_id,
            source = %requirement.filename
        );
        let mut tracker = ProgressTracker::new(options.total_stages(), progress);

        let result = self
            .run_stages(generation_id, requirement, client_context, options, &mut tracker)
            .instrument(span)
            .await;

        match result {
            Ok(suite) => {
                tracker.complete(completion_message(&suite, options));
                Ok(suite)
            }
            Err(err) => {
                error!(error = %err, "Test generation failed");
                tracker.fail(&err);
                Err(err)
            }
        }
    }

    async fn run_stages<F>(
        &self,
        generation_id: String,
        requirement: &Requirement,
        client_context: Option<&ClientContext>,
        options: &GenerationOptions,
        tracker: &mut ProgressTracker<F>,
    ) -> Result<TestSuite>
    where
        F: FnMut(GenerationProgress) + Send,
    {
        requirement.validate()?;
        info!(stages = options.total_stages(), "Starting test generation");

        let context_text = client_context
            .map(ClientContext::context_text)
            .unwrap_or_default();

        let manual_tests = self
            .generate_manual_tests(requirement, &context_text, options, tracker)
            .await?;
        tracker.finish_stage();

        let mut suite = TestSuite {
            generation_id,
            name: format!("Test Suite - {}", requirement.display_name()),
            description: format!("Generated from {}", requirement.filename),
            manual_tests: Vec::new(),
            gherkin_scripts: Vec::new(),
            selenium_scripts: Vec::new(),
            playwright_scripts: Vec::new(),
            client_name: client_context.map(|c| c.name.clone()).unwrap_or_default(),
            requirement_source: requirement.filename.clone(),
            generated_at: Utc::now(),
        };

        let input = StageInput {
            manual_tests_json: manual_tests_json(&manual_tests)?,
            manual_test_count: manual_tests.len(),
            requirements_summary: truncate_chars(&requirement.content, REQUIREMENTS_SUMMARY_CHARS),
            context_text: &context_text,
        };
        suite.manual_tests = manual_tests;

        let requested = [
            (ArtifactKind::Gherkin, options.generate_gherkin),
            (ArtifactKind::Selenium, options.generate_selenium),
            (ArtifactKind::Playwright, options.generate_playwright),
        ];
        for (kind, enabled) in requested {
            if !enabled {
                continue;
            }
            let scripts = self.generate_scripts(kind, &input, tracker).await?;
            *suite.scripts_mut(kind) = scripts;
            tracker.finish_stage();
        }

        info!(
            manual_tests = suite.manual_tests.len(),
            gherkin = suite.gherkin_scripts.len(),
            selenium = suite.selenium_scripts.len(),
            playwright = suite.playwright_scripts.len(),
            "Test generation finished"
        );
        Ok(suite)
    }

    async fn generate_manual_tests<F>(
        &self,
        requirement: &Requirement,
        context_text: &str,
        options: &GenerationOptions,
        tracker: &mut ProgressTracker<F>,
    ) -> Result<Vec<ManualTestCase>>
    where
        F: FnMut(GenerationProgress) + Send,
    {
        let stage = GenerationStage::Manual;
        tracker.step(
            stage,
            0.0,
            format!("Reading requirements document: {}...", requirement.filename),
        );
        tracker.step(stage, 0.15, "Analyzing requirements and identifying test scenarios...");

        let prompt = build_manual_test_prompt(&requirement.content, context_text, options);
        tracker.step(
            stage,
            0.25,
            format!(
                "Sending to LLM ({}) for manual test case generation...",
                self.llm_client.model_name()
            ),
        );
        let response = self.llm_client.generate(&prompt, Some(SYSTEM_PROMPT)).await?;
        let manual_tests = parsing::parse_manual_tests(&response);

        tracker.step(
            stage,
            0.9,
            format!(
                "Generated {} manual test cases, parsing results...",
                manual_tests.len()
            ),
        );
        if manual_tests.iter().all(ManualTestCase::needs_manual_review) {
            warn!(stage = stage.as_str(), "No manual tests parsed from LLM response");
            tracker.step(
                stage,
                1.0,
                "Warning: No manual tests were parsed from LLM response. Check model output.",
            );
        }
        Ok(manual_tests)
    }

    async fn generate_scripts<F>(
        &self,
        kind: ArtifactKind,
        input: &StageInput<'_>,
        tracker: &mut ProgressTracker<F>,
    ) -> Result<Vec<AutomationScript>>
    where
        F: FnMut(GenerationProgress) + Send,
    {
        let stage = stage_for(kind);
        let based_on = format!("(based on {} manual tests)", input.manual_test_count);
        let (client, prompt) = match kind {
            ArtifactKind::Gherkin => (
                &self.llm_client,
                build_gherkin_prompt(
                    &input.manual_tests_json,
                    input.requirements_summary,
                    input.context_text,
                ),
            ),
            ArtifactKind::Selenium => (
                &self.code_llm_client,
                build_selenium_prompt(
                    &input.manual_tests_json,
                    input.requirements_summary,
                    input.context_text,
                ),
            ),
            ArtifactKind::Playwright => (
                &self.code_llm_client,
                build_playwright_prompt(
                    &input.manual_tests_json,
                    input.requirements_summary,
                    input.context_text,
                ),
            ),
        };

        tracker.step(
            stage,
            0.0,
            format!("Preparing {} generation {}...", kind.display_name(), based_on),
        );
        tracker.step(
            stage,
            0.2,
            format!(
                "Sending to LLM ({}) for {} generation...",
                client.model_name(),
                kind.display_name()
            ),
        );

        let response = client.generate(&prompt, Some(SYSTEM_PROMPT)).await?;
        let scripts = parsing::parse_automation_scripts(&response, kind);

        if scripts.is_empty() {
            warn!(stage = stage.as_str(), "No scripts parsed from LLM response");
            tracker.step(
                stage,
                0.95,
                format!(
                    "Warning: {} generation returned empty, the response could not be parsed",
                    kind.display_name()
                ),
            );
        } else {
            let message = match kind {
                ArtifactKind::Gherkin => format!(
                    "Generated {} Gherkin feature file(s) with {} scenarios",
                    scripts.len(),
                    scripts.iter().map(|s| s.scenario_count).sum::<u32>()
                ),
                _ => format!(
                    "Generated {} {} test script(s)",
                    scripts.len(),
                    kind.display_name()
                ),
            };
            tracker.step(stage, 0.95, message);
        }
        Ok(scripts)
    }
}

fn stage_for(kind: ArtifactKind) -> GenerationStage {
    match kind {
        ArtifactKind::Gherkin => GenerationStage::Gherkin,
        ArtifactKind::Selenium => GenerationStage::Selenium,
        ArtifactKind::Playwright => GenerationStage::Playwright,
    }
}

fn manual_tests_json(tests: &[ManualTestCase]) -> Result<String> {
    let head = &tests[..tests.len().min(MANUAL_TESTS_FOR_SCRIPTS)];
    serde_json::to_string_pretty(head)
        .map_err(|err| AppError::Internal(format!("Failed to serialize manual tests: {}", err)))
}

fn completion_message(suite: &TestSuite, options: &GenerationOptions) -> String {
    let mut parts = vec![format!("{} manual tests", suite.manual_tests.len())];
    if options.generate_gherkin {
        parts.push(format!("{} Gherkin files", suite.gherkin_scripts.len()));
    }
    if options.generate_selenium {
        parts.push(format!("{} Selenium scripts", suite.selenium_scripts.len()));
    }
    if options.generate_playwright {
        parts.push(format!("{} Playwright specs", suite.playwright_scripts.len()));
    }
    format!("Complete! Generated {}", parts.join(", "))
}
