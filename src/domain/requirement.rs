use serde::{Deserialize, Serialize};
use validator::Validate;

const KNOWN_EXTENSIONS: [&str; 4] = [".txt", ".pdf", ".docx", ".doc"];

/// A requirement document as handed over by the document parser.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Requirement {
    #[validate(length(min = 1))]
    pub filename: String,
    #[validate(length(min = 1))]
    pub content: String,
    pub file_type: String,
    pub word_count: usize,
    pub page_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementStats {
    pub filename: String,
    pub file_type: String,
    pub word_count: usize,
    pub page_count: usize,
    pub char_count: usize,
    pub line_count: usize,
}

impl Requirement {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        let filename = filename.into();
        let content = content.into();
        let file_type = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        let word_count = content.split_whitespace().count();

        Self {
            filename,
            content,
            file_type,
            word_count,
            page_count: 1,
        }
    }

    pub fn with_page_count(mut self, page_count: usize) -> Self {
        self.page_count = page_count.max(1);
        self
    }

    /// Human-friendly name derived from the filename: `login_flow-v2.docx` -> `Login Flow V2`.
    pub fn display_name(&self) -> String {
        let mut name = self.filename.clone();
        for ext in KNOWN_EXTENSIONS {
            name = name.replace(ext, "");
        }

        name.replace(['_', '-'], " ")
            .split(' ')
            .map(title_case_word)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn content_preview(&self, max_chars: usize) -> String {
        if self.content.chars().count() <= max_chars {
            return self.content.clone();
        }
        let preview: String = self.content.chars().take(max_chars).collect();
        format!("{}...", preview)
    }

    pub fn stats(&self) -> RequirementStats {
        RequirementStats {
            filename: self.filename.clone(),
            file_type: self.file_type.clone(),
            word_count: self.word_count,
            page_count: self.page_count,
            char_count: self.content.chars().count(),
            line_count: self.content.split('\n').count(),
        }
    }
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}
