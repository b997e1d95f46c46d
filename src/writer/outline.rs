//! Outline Agent
//!
//! Produces the [`Outline`] the writer consumes. Completion output is parsed
//! as JSON first (strict, then repaired); when that fails a markdown
//! heuristic takes over and the result is flagged
//! [`ParseProvenance::Heuristic`].

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use tracing::{info, warn};

use crate::ai::prompt::PromptBuilder;
use crate::ai::provider::{CompletionRequest, SharedProvider};
use crate::ai::timeout::with_timeout;
use crate::ai::validation::{ParseProvenance, extract_json_from_response};
use crate::constants::outline as outline_constants;
use crate::types::{
    Conclusion, DraftError, Outline, Result, Section, SourceRef, SuggestedLink, json_string,
    json_string_array, json_string_or, json_u64,
};

use super::prompts::OutlinePromptParams;

static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+(.+?)\s*$").expect("valid regex")
});

static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*|__").expect("valid regex"));

/// Outline plus how it was recovered
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedOutline {
    pub outline: Outline,
    pub provenance: ParseProvenance,
}

/// Topic ideas plus how they were recovered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTopics {
    pub topics: Vec<String>,
    pub provenance: ParseProvenance,
}

pub struct OutlineAgent {
    provider: SharedProvider,
    timeout: Duration,
}

impl OutlineAgent {
    pub fn new(provider: SharedProvider, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Plan an article about `topic` in roughly `word_budget` words
    pub async fn generate(
        &self,
        topic: &str,
        sources: &[SourceRef],
        word_budget: u32,
        custom_instructions: Option<&str>,
    ) -> Result<ParsedOutline> {
        let prompt = OutlinePromptParams {
            topic,
            word_budget,
            sources,
            custom_instructions,
        }
        .build()?;

        let response = with_timeout(
            self.timeout,
            self.provider.complete(&CompletionRequest::new(prompt).with_temperature(0.4)),
            "outline completion",
        )
        .await?;

        let parsed = parse_outline_response(&response.content, word_budget)?;
        parsed.outline.validate()?;

        info!(
            title = %parsed.outline.title,
            sections = parsed.outline.sections.len(),
            words = parsed.outline.total_word_target(),
            provenance = %parsed.provenance,
            "Outline generated"
        );
        Ok(parsed)
    }

    /// Ask for `count` article ideas about `subject`
    pub async fn suggest_topics(&self, subject: &str, count: usize) -> Result<ParsedTopics> {
        let prompt = PromptBuilder::new()
            .role("content strategist", "finding article ideas readers search for")
            .context_item("Subject", subject)
            .context_item("Ideas", &count.to_string())
            .text("Respond with a JSON array of article titles only.")
            .build();

        let response = with_timeout(
            self.timeout,
            self.provider.complete(&CompletionRequest::new(prompt)),
            "topic completion",
        )
        .await?;

        let mut parsed = extract_topics(&response.content)?;
        parsed.topics.truncate(count);
        Ok(parsed)
    }
}

/// Decode an outline from completion text.
///
/// Missing or zero word targets receive an even share of `word_budget`.
pub fn parse_outline_response(text: &str, word_budget: u32) -> Result<ParsedOutline> {
    let json = extract_json_from_response(text)
        .ok()
        .and_then(|(value, provenance)| Some((outline_from_json(&value)?, provenance)));

    let (mut outline, provenance) = match json {
        Some(parsed) => parsed,
        None => {
            let outline = outline_from_markdown(text).ok_or_else(|| {
                DraftError::parse("outline", "no JSON outline and no markdown headings")
            })?;
            warn!(
                sections = outline.sections.len(),
                "Outline recovered heuristically from markdown"
            );
            (outline, ParseProvenance::Heuristic)
        }
    };

    fill_word_targets(&mut outline, word_budget);
    Ok(ParsedOutline {
        outline,
        provenance,
    })
}

fn outline_from_json(value: &Value) -> Option<Outline> {
    let value = value.get("outline").unwrap_or(value);
    let title = json_string(value, &["title"]).filter(|t| !t.trim().is_empty())?;

    let sections: Vec<Section> = value
        .get("sections")?
        .as_array()?
        .iter()
        .filter_map(section_from_json)
        .collect();
    if sections.is_empty() {
        return None;
    }

    let conclusion = match value.get("conclusion") {
        Some(Value::String(summary)) => Conclusion {
            summary: summary.clone(),
            call_to_action: String::new(),
        },
        Some(obj) => Conclusion {
            summary: json_string_or(obj, &["summary"], ""),
            call_to_action: json_string_or(obj, &["callToAction", "call_to_action", "cta"], ""),
        },
        None => Conclusion::default(),
    };

    Some(Outline {
        title,
        hook: json_string_or(value, &["hook", "introduction", "intro"], ""),
        sections,
        conclusion,
        seo_keywords: json_string_array(value, &["seoKeywords", "seo_keywords", "keywords"]),
    })
}

fn section_from_json(value: &Value) -> Option<Section> {
    let heading = json_string(value, &["heading", "title"]).filter(|h| !h.trim().is_empty())?;
    let suggested_links = value
        .get("suggestedLinks")
        .or_else(|| value.get("suggested_links"))
        .and_then(Value::as_array)
        .map(|links| {
            links
                .iter()
                .filter_map(|link| {
                    Some(SuggestedLink {
                        article_id: json_string(link, &["articleId", "article_id"])?,
                        anchor_text: json_string(link, &["anchorText", "anchor_text"])?,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Some(Section {
        heading,
        key_points: json_string_array(value, &["keyPoints", "key_points", "points"]),
        word_target: json_u64(value, &["wordTarget", "word_target", "words"])
            .map(|w| w.min(u32::MAX as u64) as u32)
            .unwrap_or(0),
        suggested_links,
    })
}

/// `# Title`, prose hook, `## Section` headings with bullet key points.
/// A `## Conclusion` heading becomes the conclusion instead of a section.
fn outline_from_markdown(text: &str) -> Option<Outline> {
    let mut title = None;
    let mut hook = Vec::new();
    let mut sections: Vec<Section> = Vec::new();
    let mut conclusion: Option<Vec<String>> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(h1) = trimmed.strip_prefix("# ") {
            title.get_or_insert_with(|| clean_inline(h1));
        } else if let Some(h2) = trimmed.strip_prefix("## ") {
            let heading = clean_inline(h2);
            if heading.eq_ignore_ascii_case("conclusion") {
                conclusion = Some(Vec::new());
            } else {
                conclusion = None;
                sections.push(Section::new(heading, 0));
            }
        } else if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        } else {
            let item = LIST_ITEM
                .captures(trimmed)
                .and_then(|c| c.get(1))
                .map(|m| clean_inline(m.as_str()))
                .unwrap_or_else(|| clean_inline(trimmed));

            if let Some(points) = conclusion.as_mut() {
                points.push(item);
            } else if let Some(section) = sections.last_mut() {
                section.key_points.push(item);
            } else {
                hook.push(item);
            }
        }
    }

    if sections.is_empty() {
        return None;
    }
    let title = title.unwrap_or_else(|| sections[0].heading.clone());

    Some(Outline {
        title,
        hook: hook.join(" "),
        sections,
        conclusion: Conclusion {
            summary: conclusion.map(|c| c.join(" ")).unwrap_or_default(),
            call_to_action: String::new(),
        },
        seo_keywords: Vec::new(),
    })
}

fn clean_inline(text: &str) -> String {
    BOLD.replace_all(text, "").trim().to_string()
}

/// Give every zero-target section an even share of the budget
pub fn fill_word_targets(outline: &mut Outline, word_budget: u32) {
    let count = outline.sections.len().max(1) as u32;
    let share = (word_budget / count).max(outline_constants::MIN_SECTION_WORDS);

    for section in outline.sections.iter_mut().filter(|s| s.word_target == 0) {
        section.word_target = share;
    }
}

/// Topic list from completion text: JSON first, numbered or bulleted lines
/// as the fallback.
pub fn extract_topics(text: &str) -> Result<ParsedTopics> {
    if let Ok((value, provenance)) = extract_json_from_response(text) {
        let topics = topics_from_json(&value);
        if !topics.is_empty() {
            return Ok(ParsedTopics { topics, provenance });
        }
    }

    let topics: Vec<String> = text
        .lines()
        .filter_map(|line| LIST_ITEM.captures(line)?.get(1))
        .map(|m| clean_inline(m.as_str()).trim_matches('"').to_string())
        .filter(|t| !t.is_empty())
        .collect();

    if topics.is_empty() {
        return Err(DraftError::parse("topics", "no topics found in response"));
    }

    warn!(count = topics.len(), "Topics recovered heuristically from list lines");
    Ok(ParsedTopics {
        topics,
        provenance: ParseProvenance::Heuristic,
    })
}

fn topics_from_json(value: &Value) -> Vec<String> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(_) => match value
            .get("topics")
            .or_else(|| value.get("ideas"))
            .and_then(Value::as_array)
        {
            Some(items) => items,
            None => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            other => json_string(other, &["title", "topic", "name"]),
        })
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::mock::ScriptedProvider;
    use std::sync::Arc;

    const JSON_OUTLINE: &str = r#"```json
{
  "title": "Edge Caching",
  "hook": "Latency hurts.",
  "sections": [
    {"heading": "What it is", "keyPoints": ["CDN"], "wordTarget": 300,
     "suggestedLinks": [{"articleId": "a1", "anchorText": "CDN basics"}]},
    {"heading": "Invalidation", "key_points": ["TTL"], "word_target": "0"}
  ],
  "conclusion": {"summary": "Cache close to users.", "callToAction": "Measure first."},
  "seoKeywords": ["cdn"]
}
```"#;

    #[test]
    fn test_parse_json_outline() {
        let parsed = parse_outline_response(JSON_OUTLINE, 1000).unwrap();
        assert_eq!(parsed.provenance, ParseProvenance::Strict);

        let outline = parsed.outline;
        assert_eq!(outline.title, "Edge Caching");
        assert_eq!(outline.sections[0].word_target, 300);
        assert_eq!(outline.sections[0].suggested_links[0].anchor_text, "CDN basics");
        assert_eq!(outline.sections[1].key_points, vec!["TTL"]);
        assert_eq!(outline.sections[1].word_target, 500);
        assert_eq!(outline.conclusion.call_to_action, "Measure first.");
        assert!(outline.validate().is_ok());
    }

    #[test]
    fn test_parse_repaired_json() {
        let text = r#"Here is the plan: {"title": "T", "sections": [{"heading": "A", "wordTarget": 120},]"#;
        let parsed = parse_outline_response(text, 500).unwrap();
        assert_eq!(parsed.provenance, ParseProvenance::Repaired);
        assert_eq!(parsed.outline.sections[0].word_target, 120);
    }

    #[test]
    fn test_parse_markdown_fallback() {
        let text = "# Rust Errors\n\nErrors are values.\n\n## Result\n- **Ok** and Err\n- the ? operator\n\n\
                    ## Panics\n1. when to panic\n\n## Conclusion\nPrefer Result.";
        let parsed = parse_outline_response(text, 90).unwrap();
        assert_eq!(parsed.provenance, ParseProvenance::Heuristic);
        assert!(parsed.provenance.is_degraded());

        let outline = parsed.outline;
        assert_eq!(outline.title, "Rust Errors");
        assert_eq!(outline.hook, "Errors are values.");
        assert_eq!(outline.sections.len(), 2);
        assert_eq!(outline.sections[0].key_points, vec!["Ok and Err", "the ? operator"]);
        assert_eq!(outline.sections[1].key_points, vec!["when to panic"]);
        // 90 / 2 falls below the floor
        assert_eq!(outline.sections[1].word_target, 50);
        assert_eq!(outline.conclusion.summary, "Prefer Result.");
    }

    #[test]
    fn test_parse_outline_rejects_noise() {
        assert!(matches!(
            parse_outline_response("I cannot help with that.", 1000),
            Err(DraftError::Parse { .. })
        ));
    }

    #[test]
    fn test_extract_topics() {
        let strict = extract_topics(r#"["Rust async", "Zero-copy parsing"]"#).unwrap();
        assert_eq!(strict.topics.len(), 2);
        assert_eq!(strict.provenance, ParseProvenance::Strict);

        let object = extract_topics(r#"{"topics": [{"title": "A"}, "B"]}"#).unwrap();
        assert_eq!(object.topics, vec!["A", "B"]);

        let heuristic = extract_topics("Ideas:\n1. **First idea**\n2) \"Second\"\n- Third").unwrap();
        assert_eq!(heuristic.topics, vec!["First idea", "Second", "Third"]);
        assert_eq!(heuristic.provenance, ParseProvenance::Heuristic);

        assert!(extract_topics("nothing here").is_err());
    }

    #[tokio::test]
    async fn test_agent_generate() {
        let provider = Arc::new(ScriptedProvider::constant(JSON_OUTLINE));
        let agent = OutlineAgent::new(provider.clone(), Duration::from_secs(5));

        let parsed = agent
            .generate("edge caching", &[SourceRef::new("https://cdn.example")], 800, None)
            .await
            .unwrap();
        assert_eq!(parsed.outline.sections[1].word_target, 400);
        assert!(provider.prompts()[0].contains("edge caching"));
    }

    #[tokio::test]
    async fn test_agent_suggest_topics_truncates() {
        let provider = Arc::new(ScriptedProvider::constant(r#"["a", "b", "c"]"#));
        let agent = OutlineAgent::new(provider, Duration::from_secs(5));
        let topics = agent.suggest_topics("rust", 2).await.unwrap();
        assert_eq!(topics.topics, vec!["a", "b"]);
    }
}
