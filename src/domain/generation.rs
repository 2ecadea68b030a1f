use serde::{Deserialize, Serialize};
use std::fmt;

/// Which artifacts to produce and which test-design dimensions to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub generate_gherkin: bool,
    pub generate_selenium: bool,
    pub generate_playwright: bool,
    pub include_edge_cases: bool,
    pub include_negative: bool,
    pub include_boundary: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            generate_gherkin: false,
            generate_selenium: false,
            generate_playwright: false,
            include_edge_cases: true,
            include_negative: true,
            include_boundary: true,
        }
    }
}

impl GenerationOptions {
    /// Manual tests plus every requested optional stage.
    pub fn total_stages(&self) -> usize {
        1 + [
            self.generate_gherkin,
            self.generate_selenium,
            self.generate_playwright,
        ]
        .iter()
        .filter(|enabled| **enabled)
        .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStage {
    Manual,
    Gherkin,
    Selenium,
    Playwright,
    Complete,
    Error,
}

impl GenerationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Gherkin => "gherkin",
            Self::Selenium => "selenium",
            Self::Playwright => "playwright",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress notification. Only lives for the duration of the callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationProgress {
    pub stage: GenerationStage,
    pub progress: f32,
    pub message: String,
    pub completed: bool,
    pub error: Option<String>,
}

impl GenerationProgress {
    pub fn new(stage: GenerationStage, progress: f32, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress,
            message: message.into(),
            completed: false,
            error: None,
        }
    }
}
