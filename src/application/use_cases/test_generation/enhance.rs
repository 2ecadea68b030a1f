use super::parsing::parse_additional_tests;
use super::prompts::{build_enhancement_prompt, SYSTEM_PROMPT};
use super::TestGenerationUseCase;
use crate::domain::client_context::ClientContext;
use crate::domain::error::{AppError, Result};
use crate::domain::requirement::Requirement;
use crate::domain::test_case::ManualTestCase;
use tracing::info;

impl TestGenerationUseCase {
    /// Asks the model for tests missing from `current_tests`.
    ///
    /// New tests are numbered after the existing ones. An unparseable response
    /// yields an empty list; provider failures propagate.
    pub async fn enhance_tests(
        &self,
        current_tests: &[ManualTestCase],
        requirement: &Requirement,
        client_context: Option<&ClientContext>,
    ) -> Result<Vec<ManualTestCase>> {
        let current_json = serde_json::to_string_pretty(current_tests).map_err(|err| {
            AppError::Internal(format!("Failed to serialize current tests: {}", err))
        })?;
        let context_text = client_context
            .map(ClientContext::context_text)
            .unwrap_or_default();

        let prompt = build_enhancement_prompt(&current_json, &requirement.content, &context_text);
        let response = self.llm_client.generate(&prompt, Some(SYSTEM_PROMPT)).await?;

        let additional = parse_additional_tests(&response, current_tests.len());
        info!(
            existing = current_tests.len(),
            added = additional.len(),
            "Enhancement finished"
        );
        Ok(additional)
    }
}
