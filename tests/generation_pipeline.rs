use async_trait::async_trait;
use smartest_lib::domain::client_context::ClientContext;
use smartest_lib::domain::error::{AppError, Result};
use smartest_lib::domain::generation::{GenerationOptions, GenerationProgress, GenerationStage};
use smartest_lib::domain::requirement::Requirement;
use smartest_lib::domain::test_case::ManualTestCase;
use smartest_lib::infrastructure::llm_clients::{LLMClient, TextStream};
use smartest_lib::TestGenerationUseCase;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

const LOGIN_REQUIREMENT: &str =
    "Users must log in with email and password; lock after 5 failed attempts";

const TWO_TESTS: &str = r#"```json
{"test_cases": [
  {"test_id": "TC_001", "test_name": "Valid login", "description": "Correct credentials",
   "test_steps": [{"step_number": 1, "action": "Enter valid email and password"}],
   "expected_results": ["User is logged in"], "priority": "High"},
  {"test_id": "TC_002", "test_name": "Lockout after 5 failures", "priority": "High",
   "category": "Negative"}
]}
```"#;

enum Reply {
    Text(String),
    Fail(&'static str),
}

/// Replays canned responses in order and records every prompt it receives.
struct ScriptedClient {
    model: &'static str,
    replies: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn new(model: &'static str, replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            model,
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMClient for ScriptedClient {
    async fn generate(&self, prompt: &str, _system: Option<&str>) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(message)) => Err(AppError::ConnectionFailure(message.to_string())),
            None => Err(AppError::Internal("no scripted reply left".to_string())),
        }
    }

    async fn generate_stream(&self, prompt: &str, system: Option<&str>) -> Result<TextStream> {
        let text = self.generate(prompt, system).await?;
        Ok(Box::pin(futures_util::stream::iter(vec![Ok(text)])))
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn get_models(&self) -> Vec<String> {
        vec![self.model.to_string()]
    }

    fn model_name(&self) -> &str {
        self.model
    }
}

fn text(reply: &str) -> Reply {
    Reply::Text(reply.to_string())
}

fn requirement() -> Requirement {
    Requirement::new("user_login.txt", LOGIN_REQUIREMENT)
}

fn assert_monotonic(events: &[GenerationProgress]) {
    for pair in events.windows(2) {
        assert!(
            pair[1].progress >= pair[0].progress,
            "progress went backwards: {} -> {} ({})",
            pair[0].progress,
            pair[1].progress,
            pair[1].message
        );
    }
}

#[tokio::test]
async fn test_manual_only_generation() {
    let llm = ScriptedClient::new("qwen2.5:7b", vec![text(TWO_TESTS)]);
    let use_case = TestGenerationUseCase::with_client(llm.clone());
    let mut events = Vec::new();

    let suite = use_case
        .generate_test_suite(&requirement(), None, &GenerationOptions::default(), |e| {
            events.push(e)
        })
        .await
        .unwrap();

    assert_eq!(suite.manual_tests.len(), 2);
    assert!(suite.manual_tests.iter().all(|t| !t.test_id.is_empty()));
    assert!(suite.gherkin_scripts.is_empty());
    assert_eq!(suite.requirement_source, "user_login.txt");
    assert_eq!(suite.name, "Test Suite - User Login");
    assert!(!suite.generation_id.is_empty());
    assert_eq!(llm.prompts().len(), 1);

    assert_monotonic(&events);
    let last = events.last().unwrap();
    assert_eq!(last.stage, GenerationStage::Complete);
    assert_eq!(last.progress, 1.0);
    assert!(last.completed);
    assert!(events[..events.len() - 1].iter().all(|e| e.progress < 1.0 && !e.completed));
    assert_eq!(last.message, "Complete! Generated 2 manual tests");
}

#[tokio::test]
async fn test_bdd_prose_falls_back_to_feature_blocks() {
    let prose = "Here is your feature file:\n\nFeature: Login\n  Scenario: Successful login\n    Given a registered user\n    When they submit valid credentials\n    Then they see the dashboard\n";
    let llm = ScriptedClient::new("qwen2.5:7b", vec![text(TWO_TESTS), text(prose)]);
    let use_case = TestGenerationUseCase::with_client(llm.clone());
    let options = GenerationOptions {
        generate_gherkin: true,
        ..GenerationOptions::default()
    };
    let mut events = Vec::new();

    let suite = use_case
        .generate_test_suite(&requirement(), None, &options, |e| events.push(e))
        .await
        .unwrap();

    assert_eq!(suite.gherkin_scripts.len(), 1);
    assert_eq!(suite.gherkin_scripts[0].scenario_count, 1);
    assert_eq!(suite.gherkin_scripts[0].filename, "login.feature");
    assert_eq!(suite.gherkin_scripts[0].feature_name, "Login");

    // The BDD prompt carries the manual tests produced by the first stage.
    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("TC_002"));

    assert_monotonic(&events);
    assert!(events.iter().any(|e| e.stage == GenerationStage::Gherkin));
}

#[tokio::test]
async fn test_connection_failure_mid_suite_emits_one_error_event() {
    let llm = ScriptedClient::new(
        "qwen2.5:7b",
        vec![text(TWO_TESTS), Reply::Fail("Failed to connect to Ollama")],
    );
    let use_case = TestGenerationUseCase::with_client(llm);
    let options = GenerationOptions {
        generate_gherkin: true,
        generate_selenium: true,
        ..GenerationOptions::default()
    };
    let mut events = Vec::new();

    let result = use_case
        .generate_test_suite(&requirement(), None, &options, |e| events.push(e))
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, AppError::ConnectionFailure(_)));

    let errors: Vec<&GenerationProgress> = events
        .iter()
        .filter(|e| e.stage == GenerationStage::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].completed);
    assert_eq!(errors[0].error.as_deref(), Some("Failed to connect to Ollama"));
    assert_eq!(events.last().map(|e| e.stage), Some(GenerationStage::Error));
    assert!(!events.iter().any(|e| e.stage == GenerationStage::Complete));
    assert!(!events.iter().any(|e| e.stage == GenerationStage::Selenium));
}

#[tokio::test]
async fn test_uncharacteristic_code_block_yields_empty_scripts() {
    let llm = ScriptedClient::new("qwen2.5:7b", vec![text(TWO_TESTS)]);
    let code = ScriptedClient::new(
        "codellama:7b",
        vec![text("```python\n# open the login page\n# verify the lockout message\n```")],
    );
    let use_case = TestGenerationUseCase::new(llm.clone(), code.clone());
    let options = GenerationOptions {
        generate_selenium: true,
        ..GenerationOptions::default()
    };
    let mut events = Vec::new();

    let suite = use_case
        .generate_test_suite(&requirement(), None, &options, |e| events.push(e))
        .await
        .unwrap();

    assert!(suite.selenium_scripts.is_empty());
    assert_eq!(suite.manual_tests.len(), 2);
    assert_eq!(llm.prompts().len(), 1);
    assert_eq!(code.prompts().len(), 1);
    assert!(code.prompts()[0].contains("Selenium"));
    assert!(events
        .iter()
        .any(|e| e.stage == GenerationStage::Selenium && e.message.starts_with("Warning")));
    assert_eq!(events.last().map(|e| e.stage), Some(GenerationStage::Complete));
}

#[tokio::test]
async fn test_all_stages_run_in_order() {
    let llm = ScriptedClient::new(
        "qwen2.5:7b",
        vec![
            text(TWO_TESTS),
            text(r#"{"feature_files": [{"filename": "login.feature", "content": "Feature: Login\n  Scenario: A\n  Scenario: B"}]}"#),
        ],
    );
    let code = ScriptedClient::new(
        "codellama:7b",
        vec![
            text(r#"{"scripts": [{"filename": "test_login.py", "content": "import pytest"}]}"#),
            text("```javascript\nconst { test, expect } = require('@playwright/test');\n```"),
        ],
    );
    let use_case = TestGenerationUseCase::new(llm, code);
    let options = GenerationOptions {
        generate_gherkin: true,
        generate_selenium: true,
        generate_playwright: true,
        ..GenerationOptions::default()
    };
    let mut events = Vec::new();

    let suite = use_case
        .generate_test_suite(&requirement(), None, &options, |e| events.push(e))
        .await
        .unwrap();

    let summary = suite.summary();
    assert_eq!(summary.manual_tests, 2);
    assert_eq!(summary.gherkin_scenarios, 2);
    assert_eq!(summary.selenium_tests, 1);
    assert_eq!(summary.playwright_tests, 1);
    assert_eq!(suite.playwright_scripts[0].filename, "test_generated_1.spec.js");

    assert_monotonic(&events);
    let mut stages: Vec<GenerationStage> = events.iter().map(|e| e.stage).collect();
    stages.dedup();
    assert_eq!(
        stages,
        vec![
            GenerationStage::Manual,
            GenerationStage::Gherkin,
            GenerationStage::Selenium,
            GenerationStage::Playwright,
            GenerationStage::Complete,
        ]
    );
}

#[tokio::test]
async fn test_unparseable_manual_response_yields_placeholder() {
    let llm = ScriptedClient::new("qwen2.5:7b", vec![text("Sorry, I can't do that.")]);
    let use_case = TestGenerationUseCase::with_client(llm);
    let mut events = Vec::new();

    let suite = use_case
        .generate_test_suite(&requirement(), None, &GenerationOptions::default(), |e| {
            events.push(e)
        })
        .await
        .unwrap();

    assert_eq!(suite.manual_tests.len(), 1);
    assert!(suite.manual_tests[0].needs_manual_review());
    assert!(events.iter().any(|e| e.message.starts_with("Warning")));
    assert_monotonic(&events);
    assert_eq!(events.last().map(|e| e.progress), Some(1.0));
}

#[tokio::test]
async fn test_long_requirement_is_truncated_in_prompt() {
    let llm = ScriptedClient::new("qwen2.5:7b", vec![text(TWO_TESTS)]);
    let use_case = TestGenerationUseCase::with_client(llm.clone());
    let requirement = Requirement::new("huge.txt", "§".repeat(10_000));

    use_case
        .generate_test_suite(&requirement, None, &GenerationOptions::default(), |_| {})
        .await
        .unwrap();

    let prompt = &llm.prompts()[0];
    assert_eq!(prompt.matches('§').count(), 3000);
}

#[tokio::test]
async fn test_client_context_reaches_prompts_and_suite() {
    let llm = ScriptedClient::new("qwen2.5:7b", vec![text(TWO_TESTS)]);
    let use_case = TestGenerationUseCase::with_client(llm.clone());
    let mut context = ClientContext::new("Acme Bank");
    context.project_name = "Online Banking".to_string();
    context.business_rules = vec!["Accounts lock after 5 failed logins".to_string()];

    let suite = use_case
        .generate_test_suite(&requirement(), Some(&context), &GenerationOptions::default(), |_| {})
        .await
        .unwrap();

    assert_eq!(suite.client_name, "Acme Bank");
    let prompt = &llm.prompts()[0];
    assert!(prompt.contains("Client context:"));
    assert!(prompt.contains("Accounts lock after 5 failed logins"));
}

#[tokio::test]
async fn test_invalid_requirement_fails_without_model_call() {
    let llm = ScriptedClient::new("qwen2.5:7b", vec![text(TWO_TESTS)]);
    let use_case = TestGenerationUseCase::with_client(llm.clone());
    let mut events = Vec::new();

    let err = use_case
        .generate_test_suite(
            &Requirement::new("empty.txt", ""),
            None,
            &GenerationOptions::default(),
            |e| events.push(e),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ValidationError(_)));
    assert!(llm.prompts().is_empty());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].stage, GenerationStage::Error);
}

#[tokio::test]
async fn test_enhance_tests_numbers_after_existing() {
    let reply = r#"{"additional_tests": [
        {"test_id": "TC_NEW", "test_name": "Password with unicode", "category": "Edge Case"},
        {"test_id": "TC_NEW", "test_name": "Email at max length", "category": "Boundary"}
    ]}"#;
    let llm = ScriptedClient::new("qwen2.5:7b", vec![text(reply), text("nothing useful")]);
    let use_case = TestGenerationUseCase::with_client(llm.clone());
    let existing: Vec<ManualTestCase> = (1..=3)
        .map(|i| ManualTestCase::new(format!("TC_{:03}", i), format!("Existing {}", i), ""))
        .collect();

    let added = use_case
        .enhance_tests(&existing, &requirement(), None)
        .await
        .unwrap();
    let ids: Vec<&str> = added.iter().map(|t| t.test_id.as_str()).collect();
    assert_eq!(ids, vec!["TC_004", "TC_005"]);
    assert_eq!(added[1].category, "Boundary");
    assert!(llm.prompts()[0].contains("Existing 2"));

    let none = use_case
        .enhance_tests(&existing, &requirement(), None)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_enhance_tests_propagates_provider_failure() {
    let llm = ScriptedClient::new("qwen2.5:7b", vec![Reply::Fail("Groq API error (500): down")]);
    let use_case = TestGenerationUseCase::with_client(llm);

    let err = use_case
        .enhance_tests(&[], &requirement(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ConnectionFailure(_)));
}
