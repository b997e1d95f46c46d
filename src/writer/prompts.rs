//! Typed prompt parameters for each completion the pipeline makes.
//!
//! Fixed wording lives in `{{slot}}` templates rendered by
//! [`render_template`]; structure comes from [`PromptTemplates`].

use crate::ai::prompt::{PromptTemplates, render_template};
use crate::types::{AllowedInternalLink, Result, Section, SourceRef};

use super::text::recommended_paragraphing;
use super::validator::WordBand;

const SECTION_RULES: &str = "\
Write between {{min}} and {{max}} words of body text (target {{target}}). Headings do not count.
Start with the line `## {{heading}}` and write only this section. No introduction to the article, no conclusion.
Cover every key point in order.
Link internally ONLY with the URLs under Allowed internal links, using markdown links. Never invent internal URLs.
Cite at least {{min_sources}} URLs from the Sources list as markdown links where they support a claim.
Never use the em dash character or its HTML entities. Use commas, colons or separate sentences.";

const POLISH_RULES: &str = "\
Edit the draft for grammar, clarity and flow between sections.
Do NOT add new sections, facts, examples or links. Do NOT make it longer; the draft is {{word_count}} words.
Keep every heading, link and citation exactly as written.
Remove every em dash, replacing it with a comma, colon or period.
Return only the edited markdown, with no commentary.";

const COVER_REQUEST: &str = "\
Write one image-generation prompt for the cover illustration of an article titled \"{{title}}\".
Article summary: {{summary}}
Describe a single clear scene in an editorial illustration style. No text, letters or logos in the image.
Reply with the prompt only, under 80 words.";

const OUTLINE_REQUEST: &str = "\
Plan a blog article about: {{topic}}
Total length: about {{word_budget}} words across all sections.
Respond with JSON only, matching this shape:
{\"title\": \"...\", \"hook\": \"...\", \"sections\": [{\"heading\": \"...\", \"keyPoints\": [\"...\"], \"wordTarget\": 300, \"suggestedLinks\": []}], \"conclusion\": {\"summary\": \"...\", \"callToAction\": \"...\"}, \"seoKeywords\": [\"...\"]}";

/// Inputs for one section-writing call
#[derive(Debug, Clone)]
pub struct SectionPromptParams<'a> {
    pub article_title: &'a str,
    pub section: &'a Section,
    pub index: usize,
    pub total_sections: usize,
    pub band: WordBand,
    /// Most recent accepted sections, oldest first
    pub previous_sections: &'a [String],
    pub allowed_links: &'a [AllowedInternalLink],
    pub sources: &'a [SourceRef],
    pub min_sources: usize,
    pub custom_instructions: Option<&'a str>,
}

impl SectionPromptParams<'_> {
    pub fn build(&self) -> Result<String> {
        let target = self.section.word_target.to_string();
        let min = self.band.min.to_string();
        let max = self.band.max.to_string();
        let min_sources = self.min_sources.to_string();
        let rules = render_template(
            SECTION_RULES,
            &[
                ("min", min.as_str()),
                ("max", max.as_str()),
                ("target", target.as_str()),
                ("heading", self.section.heading.as_str()),
                ("min_sources", min_sources.as_str()),
            ],
        )?;

        let plan = recommended_paragraphing(self.section.word_target);
        let key_points = self
            .section
            .key_points
            .iter()
            .map(|p| format!("- {}", p))
            .collect::<Vec<_>>()
            .join("\n");

        let links = if self.allowed_links.is_empty() {
            "None. Do not add internal links.".to_string()
        } else {
            self.allowed_links
                .iter()
                .map(|l| format!("- [{}]({}): {}", l.anchor_text, l.url, l.title))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let sources = self
            .sources
            .iter()
            .map(|s| match &s.title {
                Some(title) => format!("- {} ({})", s.url, title),
                None => format!("- {}", s.url),
            })
            .collect::<Vec<_>>()
            .join("\n");

        let previous = self.previous_sections.join("\n\n");

        Ok(PromptTemplates::section_writer()
            .context_item("Article", self.article_title)
            .context_item(
                "Section",
                &format!("{} of {}", self.index + 1, self.total_sections),
            )
            .context_item("Heading", &self.section.heading)
            .context_item(
                "Word target",
                &format!(
                    "{} words (accepted range {})",
                    self.section.word_target, self.band
                ),
            )
            .context_item(
                "Paragraphs",
                &format!(
                    "{} paragraphs of about {} words",
                    plan.count, plan.words_per_paragraph
                ),
            )
            .section("Key points", &key_points)
            .section(
                "Previous sections (for transitions only, do not repeat)",
                &previous,
            )
            .section("Allowed internal links", &links)
            .section("Sources", &sources)
            .rules(&rules.lines().collect::<Vec<_>>())
            .anti_patterns(
                &[
                    "Caching helps \u{2014} a lot.",
                    "In this section, we will take a closer look at caching.",
                ],
                &[
                    "Caching helps, a lot.",
                    "A cache hit skips the database entirely.",
                ],
            )
            .section("Additional instructions", self.custom_instructions.unwrap_or(""))
            .build())
    }
}

/// Inputs for the edit-only polish pass
#[derive(Debug, Clone)]
pub struct PolishPromptParams<'a> {
    pub document: &'a str,
    pub word_count: usize,
}

impl PolishPromptParams<'_> {
    pub fn build(&self) -> Result<String> {
        let word_count = self.word_count.to_string();
        let rules = render_template(POLISH_RULES, &[("word_count", word_count.as_str())])?;

        Ok(PromptTemplates::editor()
            .rules(&rules.lines().collect::<Vec<_>>())
            .text(&format!("<DRAFT>\n{}\n</DRAFT>", self.document))
            .build())
    }
}

/// Inputs for the cover-image prompt request
#[derive(Debug, Clone)]
pub struct CoverPromptParams<'a> {
    pub title: &'a str,
    pub summary: &'a str,
}

impl CoverPromptParams<'_> {
    pub fn build(&self) -> Result<String> {
        let request = render_template(
            COVER_REQUEST,
            &[("title", self.title), ("summary", self.summary)],
        )?;
        Ok(PromptTemplates::cover_art().text(&request).build())
    }
}

/// Inputs for outline generation
#[derive(Debug, Clone)]
pub struct OutlinePromptParams<'a> {
    pub topic: &'a str,
    pub word_budget: u32,
    pub sources: &'a [SourceRef],
    pub custom_instructions: Option<&'a str>,
}

impl OutlinePromptParams<'_> {
    pub fn build(&self) -> Result<String> {
        let word_budget = self.word_budget.to_string();
        let request = render_template(
            OUTLINE_REQUEST,
            &[("topic", self.topic), ("word_budget", word_budget.as_str())],
        )?;

        let sources = self
            .sources
            .iter()
            .map(|s| format!("- {}: {}", s.label(), s.snippet.as_deref().unwrap_or("")))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(PromptTemplates::outline_planner()
            .objectives(&[
                "Open with a hook that states the reader's problem",
                "Split the body into 3 to 7 sections with distinct key points",
                "Give every section a wordTarget; targets should sum to the total length",
            ])
            .section("Research", &sources)
            .section("Additional instructions", self.custom_instructions.unwrap_or(""))
            .text(&request)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_prompt_contents() {
        let section = Section::new("Why caching matters", 200).with_key_points(vec!["latency"]);
        let previous = vec!["## Intro\n\nEarlier text.".to_string()];
        let links = vec![AllowedInternalLink {
            anchor_text: "cache basics".into(),
            url: "/blog/cache-basics".into(),
            title: "Cache Basics".into(),
        }];
        let sources = vec![SourceRef::new("https://example.com/a").with_title("A")];

        let prompt = SectionPromptParams {
            article_title: "Caching",
            section: &section,
            index: 1,
            total_sections: 3,
            band: WordBand::for_target(200, 0.10),
            previous_sections: &previous,
            allowed_links: &links,
            sources: &sources,
            min_sources: 2,
            custom_instructions: Some("Friendly tone"),
        }
        .build()
        .unwrap();

        assert!(prompt.contains("**Word target**: 200 words (accepted range 180-220)"));
        assert!(prompt.contains("**Section**: 2 of 3"));
        assert!(prompt.contains("`## Why caching matters`"));
        assert!(prompt.contains("- latency"));
        assert!(prompt.contains("[cache basics](/blog/cache-basics)"));
        assert!(prompt.contains("https://example.com/a (A)"));
        assert!(prompt.contains("Earlier text."));
        assert!(prompt.contains("Friendly tone"));
        assert!(prompt.contains("em dash"));
        assert!(prompt.contains("CORRECT: Caching helps, a lot."));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_section_prompt_without_links() {
        let section = Section::new("Only", 100);
        let prompt = SectionPromptParams {
            article_title: "T",
            section: &section,
            index: 0,
            total_sections: 1,
            band: WordBand::for_target(100, 0.10),
            previous_sections: &[],
            allowed_links: &[],
            sources: &[],
            min_sources: 2,
            custom_instructions: None,
        }
        .build()
        .unwrap();

        assert!(prompt.contains("Do not add internal links"));
        assert!(!prompt.contains("Previous sections"));
        assert!(!prompt.contains("Additional instructions"));
    }

    #[test]
    fn test_polish_prompt_wraps_draft() {
        let prompt = PolishPromptParams {
            document: "# T\n\nBody",
            word_count: 2,
        }
        .build()
        .unwrap();
        assert!(prompt.contains("<DRAFT>\n# T\n\nBody\n</DRAFT>"));
        assert!(prompt.contains("the draft is 2 words"));
    }

    #[test]
    fn test_cover_and_outline_prompts() {
        let cover = CoverPromptParams {
            title: "Rust",
            summary: "Memory safety",
        }
        .build()
        .unwrap();
        assert!(cover.contains("\"Rust\""));
        assert!(cover.contains("Memory safety"));

        let outline = OutlinePromptParams {
            topic: "Edge caching",
            word_budget: 1200,
            sources: &[],
            custom_instructions: None,
        }
        .build()
        .unwrap();
        assert!(outline.contains("Edge caching"));
        assert!(outline.contains("about 1200 words"));
        assert!(outline.contains("\"wordTarget\""));
    }
}
