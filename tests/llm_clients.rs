use futures_util::StreamExt;
use serde_json::json;
use smartest_lib::domain::error::AppError;
use smartest_lib::domain::llm_config::{
    HostedApiSettings, HuggingFaceSettings, LLMConfig, OllamaSettings, VllmSettings,
};
use smartest_lib::infrastructure::llm_clients::{
    AnthropicClient, GroqClient, HuggingFaceClient, LLMClient, LlmService, OllamaClient,
    OpenAIClient, TextStream, VllmClient,
};
use std::time::Duration;
use wiremock::matchers::{bearer_token, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HF_MODEL: &str = "meta-llama/Llama-3.1-8B-Instruct";

async fn collect(mut stream: TextStream) -> Vec<String> {
    let mut chunks = Vec::new();
    while let Some(chunk) = stream.next().await {
        chunks.push(chunk.unwrap());
    }
    chunks
}

fn ollama_settings(server: &MockServer) -> OllamaSettings {
    OllamaSettings {
        base_url: server.uri(),
        ..OllamaSettings::default()
    }
}

fn hf_settings(server: &MockServer) -> HuggingFaceSettings {
    HuggingFaceSettings {
        router_url: server.uri(),
        hub_url: server.uri(),
        api_token: Some("hf_test".to_string()),
        ..HuggingFaceSettings::default()
    }
}

fn hosted_settings(server: &MockServer, model: &str) -> HostedApiSettings {
    HostedApiSettings {
        base_url: server.uri(),
        model: model.to_string(),
        timeout_secs: 30,
        api_key: Some("sk-test".to_string()),
    }
}

#[tokio::test]
async fn test_ollama_generate_sends_options_and_system() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "qwen2.5:7b",
            "stream": false,
            "system": "You are QA",
            "options": { "num_ctx": 4096 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "{\"test_cases\": []}",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&ollama_settings(&server), 0.7);
    let text = client.generate("Write tests", Some("You are QA")).await.unwrap();
    assert_eq!(text, "{\"test_cases\": []}");
}

#[tokio::test]
async fn test_ollama_timeout_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "late" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let settings = OllamaSettings {
        timeout_secs: 1,
        ..ollama_settings(&server)
    };
    let err = OllamaClient::new(&settings, 0.7)
        .generate("Write tests", None)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ConnectionFailure(_)));
    assert_eq!(
        err.user_message(),
        "Ollama request timed out after 1s. The model may be slow. Try a smaller/faster model or increase timeout."
    );
}

#[tokio::test]
async fn test_ollama_unreachable_is_connection_failure() {
    let settings = OllamaSettings {
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_secs: 2,
        ..OllamaSettings::default()
    };
    let client = OllamaClient::new(&settings, 0.7);

    let err = client.generate("hi", None).await.unwrap_err();
    assert!(matches!(err, AppError::ConnectionFailure(_)));
    assert!(!client.is_available().await);
    assert!(client.get_models().await.is_empty());
}

#[tokio::test]
async fn test_ollama_stream_reads_ndjson_until_done() {
    let server = MockServer::start().await;
    let body = concat!(
        "{\"response\":\"Feature: \",\"done\":false}\n",
        "{\"response\":\"Login\",\"done\":false}\n",
        "{\"response\":\"\",\"done\":true}\n",
        "{\"response\":\"ignored\",\"done\":false}\n"
    );
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "stream": true })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&ollama_settings(&server), 0.7);
    let chunks = collect(client.generate_stream("hi", None).await.unwrap()).await;
    assert_eq!(chunks, vec!["Feature: ", "Login"]);
}

#[tokio::test]
async fn test_ollama_availability_matches_base_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "name": "qwen2.5:14b" }, { "name": "mistral:latest" }]
        })))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&ollama_settings(&server), 0.7);
    assert!(client.is_available().await);
    assert_eq!(client.get_models().await, vec!["qwen2.5:14b", "mistral:latest"]);

    let missing = OllamaClient::new(&ollama_settings(&server), 0.7).with_model("codellama:7b");
    assert!(!missing.is_available().await);
}

#[tokio::test]
async fn test_code_service_uses_installed_code_model() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "name": "qwen2.5:7b" }, { "name": "codellama:7b" }]
        })))
        .mount(&server)
        .await;

    let config = LLMConfig {
        ollama: ollama_settings(&server),
        ..LLMConfig::default()
    };
    let service = LlmService::code_service(&config).await;
    assert_eq!(service.model_name(), "codellama:7b");

    let config = LLMConfig {
        ollama: OllamaSettings {
            use_code_model_for_scripts: false,
            ..ollama_settings(&server)
        },
        ..LLMConfig::default()
    };
    assert_eq!(LlmService::code_service(&config).await.model_name(), "qwen2.5:7b");
}

#[tokio::test]
async fn test_code_service_falls_back_when_code_model_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "name": "qwen2.5:7b" }]
        })))
        .mount(&server)
        .await;

    let config = LLMConfig {
        ollama: ollama_settings(&server),
        ..LLMConfig::default()
    };
    let service = LlmService::code_service(&config).await;
    assert_eq!(service.model_name(), "qwen2.5:7b");
}

#[tokio::test]
async fn test_huggingface_chat_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(bearer_token("hf_test"))
        .and(body_partial_json(json!({
            "model": format!("{}:fastest", HF_MODEL)
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "generated" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HuggingFaceClient::new(hf_settings(&server), 0.7, 4096);
    assert_eq!(client.generate("hi", Some("sys")).await.unwrap(), "generated");
}

#[tokio::test]
async fn test_huggingface_falls_back_to_legacy_after_chat_403() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/hf-inference/models/{}", HF_MODEL)))
        .and(body_partial_json(json!({
            "inputs": "sys\n\nWrite tests",
            "parameters": { "return_full_text": false, "max_new_tokens": 4096 }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "generated_text": "legacy output" }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HuggingFaceClient::new(hf_settings(&server), 0.7, 4096);
    let text = client.generate("Write tests", Some("sys")).await.unwrap();
    assert_eq!(text, "legacy output");
}

#[tokio::test]
async fn test_huggingface_double_failure_names_both_causes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "Model is loading" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/hf-inference/models/{}", HF_MODEL)))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "error": { "message": "Service unavailable" } })),
        )
        .mount(&server)
        .await;

    let client = HuggingFaceClient::new(hf_settings(&server), 0.7, 4096);
    let err = client.generate("hi", None).await.unwrap_err();

    assert!(matches!(err, AppError::ConnectionFailure(_)));
    let message = err.user_message();
    assert!(message.contains(HF_MODEL));
    assert!(message.contains("Chat API (500): Model is loading"));
    assert!(message.contains("Legacy API (503): Service unavailable"));
}

#[tokio::test]
async fn test_huggingface_legacy_403_is_authorization_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/hf-inference/models/{}", HF_MODEL)))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "error": "forbidden" })))
        .mount(&server)
        .await;

    let client = HuggingFaceClient::new(hf_settings(&server), 0.7, 4096);
    let err = client.generate("hi", None).await.unwrap_err();

    assert!(matches!(err, AppError::AuthorizationFailure(_)));
    assert!(err.user_message().contains("1. Go to:"));
    assert!(err.user_message().contains("forbidden"));
}

#[tokio::test]
async fn test_huggingface_stream_is_chunked() {
    let server = MockServer::start().await;
    let text = "x".repeat(120);
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": text } }]
        })))
        .mount(&server)
        .await;

    let client = HuggingFaceClient::new(hf_settings(&server), 0.7, 4096);
    let chunks = collect(client.generate_stream("hi", None).await.unwrap()).await;
    assert_eq!(chunks.iter().map(String::len).collect::<Vec<_>>(), vec![50, 50, 20]);
    assert_eq!(chunks.concat(), text);
}

#[tokio::test]
async fn test_huggingface_availability_checks_hub_and_router() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/models/{}", HF_MODEL)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": HF_MODEL })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(bearer_token("hf_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let client = HuggingFaceClient::new(hf_settings(&server), 0.7, 4096);
    assert!(client.is_available().await);
    assert!(!client.get_models().await.is_empty());
}

#[tokio::test]
async fn test_openai_generate_and_sse_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(bearer_token("sk-test"))
        .and(body_partial_json(json!({ "stream": true })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            concat!(
                "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
                ": keep-alive\n\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
                "data: [DONE]\n\n"
            ),
            "text/event-stream",
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "model": "gpt-4" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Hello" } }]
        })))
        .mount(&server)
        .await;

    let client = OpenAIClient::new(hosted_settings(&server, "gpt-4"), 0.7, 4096);
    let chunks = collect(client.generate_stream("hi", None).await.unwrap()).await;
    assert_eq!(chunks, vec!["Hel", "lo"]);
    assert_eq!(client.generate("hi", None).await.unwrap(), "Hello");
}

#[tokio::test]
async fn test_openai_401_is_authorization_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let client = OpenAIClient::new(hosted_settings(&server, "gpt-4"), 0.7, 4096);
    let err = client.generate("hi", None).await.unwrap_err();
    assert!(matches!(err, AppError::AuthorizationFailure(_)));
    assert!(err.user_message().contains("OPENAI_API_KEY"));
}

#[tokio::test]
async fn test_groq_server_error_is_connection_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let client = GroqClient::new(hosted_settings(&server, "llama-3.1-70b-versatile"), 0.7, 4096);
    let err = client.generate("hi", None).await.unwrap_err();
    assert!(matches!(err, AppError::ConnectionFailure(_)));
    assert_eq!(err.user_message(), "Groq API error (500): upstream exploded");
}

#[tokio::test]
async fn test_groq_missing_key_fails_before_network() {
    let settings = HostedApiSettings {
        api_key: None,
        ..HostedApiSettings::groq()
    };
    let client = GroqClient::new(settings, 0.7, 4096);
    let err = client.generate("hi", None).await.unwrap_err();
    assert_eq!(
        err.user_message(),
        "Missing API key for Groq. Set the GROQ_API_KEY environment variable."
    );
    assert!(!client.is_available().await);
}

#[tokio::test]
async fn test_anthropic_headers_and_system_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "system": "You are QA",
            "messages": [{ "role": "user", "content": "Write tests" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "Hello from Claude" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AnthropicClient::new(hosted_settings(&server, "claude-3-sonnet-20240229"), 0.7, 4096);
    let text = client.generate("Write tests", Some("You are QA")).await.unwrap();
    assert_eq!(text, "Hello from Claude");
}

#[tokio::test]
async fn test_anthropic_stream_stops_at_message_stop() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({ "stream": true })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            concat!(
                "event: message_start\ndata: {\"type\":\"message_start\"}\n\n",
                "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"Given \"}}\n\n",
                "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"a user\"}}\n\n",
                "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
                "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"late\"}}\n\n"
            ),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let client = AnthropicClient::new(hosted_settings(&server, "claude-3-sonnet-20240229"), 0.7, 4096);
    let chunks = collect(client.generate_stream("hi", None).await.unwrap()).await;
    assert_eq!(chunks, vec!["Given ", "a user"]);
}

#[tokio::test]
async fn test_vllm_server_mode() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .and(body_partial_json(json!({
            "prompt": "sys\n\nWrite tests",
            "max_tokens": 4096
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "text": "completion" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "Qwen/Qwen2.5-7B-Instruct" }]
        })))
        .mount(&server)
        .await;

    let settings = VllmSettings {
        use_server: true,
        server_url: server.uri(),
        ..VllmSettings::default()
    };
    let client = VllmClient::new(settings, 0.7, 4096);
    assert_eq!(client.generate("Write tests", Some("sys")).await.unwrap(), "completion");
    assert!(client.is_available().await);
    assert_eq!(client.get_models().await, vec!["Qwen/Qwen2.5-7B-Instruct"]);
}

#[tokio::test]
async fn test_vllm_in_process_mode_is_dependency_missing() {
    let client = VllmClient::new(VllmSettings::default(), 0.7, 4096);
    let err = client.generate("hi", None).await.unwrap_err();
    assert!(matches!(err, AppError::DependencyMissing(_)));
    assert!(!client.is_available().await);
    assert!(!client.get_models().await.is_empty());
}
