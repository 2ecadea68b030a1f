use serde::{Deserialize, Serialize};

const MAX_REFERENCE_DOCUMENTS: usize = 5;
const REFERENCE_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceDocument {
    pub filename: String,
    pub content: String,
}

/// Per-client rules and reference material injected into prompts.
///
/// Storage lives elsewhere; the pipeline only consumes [`ClientContext::context_text`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientContext {
    pub id: String,
    pub name: String,
    pub project_name: String,
    pub project_description: String,
    pub tech_stack: Vec<String>,
    pub test_environment: String,
    pub navigation_rules: Vec<String>,
    pub thumb_rules: Vec<String>,
    pub business_rules: Vec<String>,
    pub best_practices: Vec<String>,
    pub documents: Vec<ReferenceDocument>,
}

impl ClientContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Renders the context as the text block embedded in prompts.
    pub fn context_text(&self) -> String {
        let mut sections: Vec<String> = Vec::new();

        if !self.project_name.is_empty() || !self.project_description.is_empty() {
            sections.push(format!("## Project: {}", self.project_name));
            if !self.project_description.is_empty() {
                sections.push(self.project_description.clone());
            }
        }

        if !self.tech_stack.is_empty() {
            sections.push(format!(
                "\n## Technology Stack\n{}",
                self.tech_stack.join(", ")
            ));
        }

        if !self.test_environment.is_empty() {
            sections.push(format!("\n## Test Environment\n{}", self.test_environment));
        }

        push_rules(&mut sections, "Navigation Rules", &self.navigation_rules);
        push_rules(
            &mut sections,
            "Thumb Rules (Testing Conventions)",
            &self.thumb_rules,
        );
        push_rules(&mut sections, "Business Rules", &self.business_rules);
        push_rules(&mut sections, "Best Practices", &self.best_practices);

        if !self.documents.is_empty() {
            sections.push("\n## Reference Documents".to_string());
            for doc in self.documents.iter().take(MAX_REFERENCE_DOCUMENTS) {
                let title = if doc.filename.is_empty() {
                    "Document"
                } else {
                    doc.filename.as_str()
                };
                sections.push(format!("\n### {}", title));

                let preview: String = doc.content.chars().take(REFERENCE_PREVIEW_CHARS).collect();
                if doc.content.chars().count() > REFERENCE_PREVIEW_CHARS {
                    sections.push(format!("{}...", preview));
                } else {
                    sections.push(preview);
                }
            }
        }

        sections.join("\n")
    }

    pub fn rules_summary(&self) -> String {
        let mut summary = Vec::new();
        if !self.navigation_rules.is_empty() {
            summary.push(format!("Navigation: {} rules", self.navigation_rules.len()));
        }
        if !self.thumb_rules.is_empty() {
            summary.push(format!("Thumb Rules: {} rules", self.thumb_rules.len()));
        }
        if !self.business_rules.is_empty() {
            summary.push(format!("Business: {} rules", self.business_rules.len()));
        }
        if !self.best_practices.is_empty() {
            summary.push(format!("Best Practices: {} items", self.best_practices.len()));
        }
        if !self.documents.is_empty() {
            summary.push(format!("Documents: {} files", self.documents.len()));
        }

        if summary.is_empty() {
            "No rules configured".to_string()
        } else {
            summary.join(" | ")
        }
    }
}

fn push_rules(sections: &mut Vec<String>, heading: &str, rules: &[String]) {
    if rules.is_empty() {
        return;
    }
    sections.push(format!("\n## {}", heading));
    for rule in rules {
        sections.push(format!("- {}", rule));
    }
}
