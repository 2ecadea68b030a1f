pub mod client_context;
pub mod error;
pub mod generation;
pub mod llm_config;
pub mod requirement;
pub mod test_case;
