//! Prompt Builder System
//!
//! Standardized prompt construction for completion calls.
//!
//! Two tools live here:
//!
//! - [`PromptBuilder`]: assembles tagged sections (role, objectives,
//!   context, rules, examples) into one prompt string.
//! - [`render_template`]: explicit `{{name}}` slot substitution. A
//!   placeholder without a slot, or a slot that never appears in the
//!   template, is a [`DraftError::Template`] error rather than a silent
//!   no-op.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::{DraftError, Result};

static SLOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid regex"));

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Role definition with expertise area
    Role { expertise: String, task: String },
    /// Numbered objectives
    Objectives(Vec<String>),
    /// Ordered key-value context
    Context(Vec<(String, String)>),
    /// Raw text section with optional header
    Text {
        header: Option<String>,
        content: String,
    },
    /// Hard rules the output must follow
    Rules(Vec<String>),
    /// Anti-patterns with good/bad examples
    AntiPatterns { bad: Vec<String>, good: Vec<String> },
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role definition section
    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    /// Add objectives section
    pub fn objectives<S: AsRef<str>>(mut self, objectives: &[S]) -> Self {
        self.sections.push(PromptSection::Objectives(
            objectives.iter().map(|o| o.as_ref().to_string()).collect(),
        ));
        self
    }

    /// Add a context item, merged into the first context section
    pub fn context_item(mut self, key: &str, value: &str) -> Self {
        let entry = (key.to_string(), value.to_string());
        match self
            .sections
            .iter_mut()
            .find_map(|section| match section {
                PromptSection::Context(items) => Some(items),
                _ => None,
            }) {
            Some(items) => items.push(entry),
            None => self.sections.push(PromptSection::Context(vec![entry])),
        }
        self
    }

    /// Add text section
    pub fn text(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: None,
            content: content.to_string(),
        });
        self
    }

    /// Add text section with header; skipped when `content` is blank
    pub fn section(mut self, header: &str, content: &str) -> Self {
        if !content.trim().is_empty() {
            self.sections.push(PromptSection::Text {
                header: Some(header.to_string()),
                content: content.to_string(),
            });
        }
        self
    }

    /// Add hard rules
    pub fn rules<S: AsRef<str>>(mut self, rules: &[S]) -> Self {
        self.sections.push(PromptSection::Rules(
            rules.iter().map(|r| r.as_ref().to_string()).collect(),
        ));
        self
    }

    /// Add anti-patterns section
    pub fn anti_patterns(mut self, bad: &[&str], good: &[&str]) -> Self {
        self.sections.push(PromptSection::AntiPatterns {
            bad: bad.iter().map(|s| s.to_string()).collect(),
            good: good.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    prompt.push_str("<ROLE>\n");
                    prompt.push_str(&format!(
                        "You are an expert {} specializing in {}.\n",
                        expertise, task
                    ));
                    prompt.push_str("</ROLE>\n\n");
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                PromptSection::Context(items) => {
                    prompt.push_str("# Context\n\n");
                    for (key, value) in items {
                        prompt.push_str(&format!("**{}**: {}\n", key, value));
                    }
                    prompt.push('\n');
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("# {}\n\n", h));
                    }
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
                PromptSection::Rules(rules) => {
                    prompt.push_str("<RULES>\n");
                    for rule in rules {
                        prompt.push_str(&format!("- {}\n", rule));
                    }
                    prompt.push_str("</RULES>\n\n");
                }
                PromptSection::AntiPatterns { bad, good } => {
                    prompt.push_str("## ANTI-PATTERNS\n\n");
                    prompt.push_str("<what_not_to_do>\n");
                    for example in bad {
                        prompt.push_str(&format!("WRONG: {}\n", example));
                    }
                    prompt.push_str("</what_not_to_do>\n\n");
                    prompt.push_str("<what_to_do>\n");
                    for example in good {
                        prompt.push_str(&format!("CORRECT: {}\n", example));
                    }
                    prompt.push_str("</what_to_do>\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

// =============================================================================
// Named-slot templates
// =============================================================================

/// Substitute `{{name}}` placeholders from `slots`.
///
/// Every placeholder must have a slot and every slot must be used.
/// Slot values are inserted verbatim and are not re-scanned.
pub fn render_template(template: &str, slots: &[(&str, &str)]) -> Result<String> {
    let placeholders: BTreeSet<&str> = SLOT
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();

    let provided: BTreeSet<&str> = slots.iter().map(|(name, _)| *name).collect();

    if let Some(missing) = placeholders.difference(&provided).next() {
        return Err(DraftError::Template(format!(
            "no value for placeholder {{{{{}}}}}",
            missing
        )));
    }
    if let Some(unused) = provided.difference(&placeholders).next() {
        return Err(DraftError::Template(format!(
            "slot '{}' does not appear in template",
            unused
        )));
    }

    let rendered = SLOT.replace_all(template, |caps: &regex::Captures<'_>| {
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        slots
            .iter()
            .find(|(slot, _)| *slot == name)
            .map(|(_, value)| value.to_string())
            .unwrap_or_default()
    });

    Ok(rendered.into_owned())
}

/// Preset prompt skeletons for each pipeline stage
pub struct PromptTemplates;

impl PromptTemplates {
    /// Writer of a single article section
    pub fn section_writer() -> PromptBuilder {
        PromptBuilder::new().role(
            "long-form blog writer",
            "clear, well-sourced sections that hit an exact length",
        )
    }

    /// Edit-only polish pass over a whole draft
    pub fn editor() -> PromptBuilder {
        PromptBuilder::new().role(
            "copy editor",
            "tightening grammar and flow without changing substance",
        )
    }

    /// Article outline planner
    pub fn outline_planner() -> PromptBuilder {
        PromptBuilder::new().role(
            "content strategist",
            "structuring articles into sections with word budgets",
        )
    }

    /// Cover illustration prompt writer
    pub fn cover_art() -> PromptBuilder {
        PromptBuilder::new().role(
            "art director",
            "describing editorial cover illustrations for image models",
        )
    }
}
