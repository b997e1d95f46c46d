//! Outline Model
//!
//! The structured writing plan consumed by the writer pipeline.
//! Field names serialize in camelCase to match the outline JSON produced
//! by the outline stage and by hand-written outline files.

use serde::{Deserialize, Serialize};

use super::error::{Result, ValidationError};

/// Internal link proposed by the outline stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedLink {
    pub article_id: String,
    pub anchor_text: String,
}

/// One heading of the outline with its writing contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub heading: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    pub word_target: u32,
    #[serde(default)]
    pub suggested_links: Vec<SuggestedLink>,
}

impl Section {
    pub fn new(heading: impl Into<String>, word_target: u32) -> Self {
        Self {
            heading: heading.into(),
            key_points: Vec::new(),
            word_target,
            suggested_links: Vec::new(),
        }
    }

    pub fn with_key_points(mut self, points: Vec<&str>) -> Self {
        self.key_points = points.into_iter().map(String::from).collect();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conclusion {
    pub summary: String,
    #[serde(default)]
    pub call_to_action: String,
}

/// Immutable input to a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outline {
    pub title: String,
    #[serde(default)]
    pub hook: String,
    pub sections: Vec<Section>,
    #[serde(default)]
    pub conclusion: Conclusion,
    #[serde(default)]
    pub seo_keywords: Vec<String>,
}

impl Outline {
    /// Check the structural preconditions the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::new("outline title is empty")
                .with_field("title")
                .into());
        }
        if self.sections.is_empty() {
            return Err(ValidationError::new("outline has no sections")
                .with_field("sections")
                .into());
        }
        for (index, section) in self.sections.iter().enumerate() {
            if section.word_target == 0 {
                return Err(ValidationError::new(format!(
                    "section {} ('{}') has a zero word target",
                    index, section.heading
                ))
                .with_field("wordTarget")
                .into());
            }
        }
        Ok(())
    }

    /// Sum of all section word targets
    pub fn total_word_target(&self) -> u32 {
        self.sections.iter().map(|s| s.word_target).sum()
    }

    /// Every suggested link across all sections, in outline order
    pub fn suggested_links(&self) -> Vec<SuggestedLink> {
        self.sections
            .iter()
            .flat_map(|s| s.suggested_links.iter().cloned())
            .collect()
    }
}
