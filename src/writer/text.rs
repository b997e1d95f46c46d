//! Text normalization
//!
//! Pure, deterministic helpers shared by the pipeline: markdown-aware word
//! counting, paragraph planning, em-dash removal, slugs, excerpts and
//! reading time.

use std::sync::LazyLock;

use regex::Regex;

use crate::constants::{paragraphing, text as text_constants};
use crate::types::truncate_chars;

static FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?(?:```|\z)").expect("valid regex"));

static HEADING_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]{0,3}#{1,6}(?:[ \t].*)?$").expect("valid regex"));

static HEADING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]{0,3}#{1,6}[ \t]*").expect("valid regex"));

static IMAGE_OR_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[([^\]]*)\]\((?:[^()]|\([^()]*\))*\)").expect("valid regex"));

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:[-*+]|\d+[.)]|>)[ \t]+").expect("valid regex")
});

static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[*_~`]+").expect("valid regex"));

static EM_DASH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[ \t]*(?:\x{2014}|&mdash;|&#8212;|&#x2014;)[ \t]*").expect("valid regex")
});

static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Markdown-aware word count.
///
/// Code fences and heading lines are dropped, links and images count their
/// label only, emphasis and list markers are ignored. Every remaining
/// whitespace-separated token counts, punctuation included.
pub fn count_words(text: &str) -> usize {
    let text = FENCED_CODE.replace_all(text, " ");
    let text = HEADING_LINE.replace_all(&text, " ");
    let text = IMAGE_OR_LINK.replace_all(&text, "$1");
    let text = LIST_MARKER.replace_all(&text, " ");
    let text = EMPHASIS.replace_all(&text, "");

    text.split_whitespace().count()
}

/// Strip markdown down to readable prose; heading text is kept.
pub fn strip_markdown(text: &str) -> String {
    let text = FENCED_CODE.replace_all(text, " ");
    let text = HEADING_MARKER.replace_all(&text, "");
    let text = IMAGE_OR_LINK.replace_all(&text, "$1");
    let text = LIST_MARKER.replace_all(&text, "");
    let text = EMPHASIS.replace_all(&text, "");
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Paragraph plan handed to the writer; never enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paragraphing {
    pub count: u32,
    pub words_per_paragraph: u32,
}

pub fn recommended_paragraphing(word_target: u32) -> Paragraphing {
    let count = paragraphing::BANDS
        .iter()
        .find(|(upper, _)| word_target <= *upper)
        .map(|(_, count)| *count)
        .unwrap_or_else(|| word_target.div_ceil(paragraphing::WORDS_PER_PARAGRAPH_LARGE))
        .max(1);

    Paragraphing {
        count,
        words_per_paragraph: word_target.div_ceil(count),
    }
}

/// Replace every em dash form (U+2014, `&mdash;`, `&#8212;`, `&#x2014;`)
/// with `", "`. Spaces or tabs around the dash are absorbed.
pub fn strip_em_dash(text: &str) -> String {
    EM_DASH
        .replace_all(text, text_constants::EM_DASH_REPLACEMENT)
        .into_owned()
}

/// True if any em dash form is present
pub fn contains_em_dash(text: &str) -> bool {
    EM_DASH.is_match(text)
}

/// Lowercase ASCII slug, runs of anything else collapsed to `-`.
pub fn generate_slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    let dashed = NON_SLUG.replace_all(&lowered, "-");
    let trimmed = dashed.trim_matches('-');
    truncate_chars(trimmed, text_constants::MAX_SLUG_LEN)
        .trim_end_matches('-')
        .to_string()
}

/// Plain-text excerpt cut at a word boundary, with `...` when truncated.
pub fn generate_excerpt(text: &str, max_len: usize) -> String {
    let plain = strip_markdown(text);
    if plain.chars().count() <= max_len {
        return plain;
    }

    let head = truncate_chars(&plain, max_len);
    // Keep the cut on a word boundary unless the first word alone is too long
    let next_is_space = plain[head.len()..].starts_with(' ');
    let cut = if next_is_space {
        head
    } else {
        match head.rfind(' ') {
            Some(idx) if idx > 0 => &head[..idx],
            _ => head,
        }
    };

    format!("{}...", cut.trim_end_matches([' ', ',', ';', ':']))
}

/// Whole minutes at the configured reading speed, never less than one.
pub fn reading_time_minutes(word_count: usize) -> usize {
    word_count
        .div_ceil(text_constants::READING_WORDS_PER_MINUTE)
        .max(1)
}

/// Document body without its leading `# Title` line
pub fn without_title(document: &str) -> &str {
    let trimmed = document.trim_start();
    if trimmed.starts_with("# ") {
        trimmed
            .split_once('\n')
            .map(|(_, rest)| rest)
            .unwrap_or_default()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_count_words_reference_example() {
        assert_eq!(
            count_words("# Title\n\nThis is **bold** and [a link](http://x.com)."),
            6
        );
    }

    #[test]
    fn test_count_words_ignores_code_and_markers() {
        let text = "## Setup\n\n- first item\n- second _item_\n\n```rust\nfn main() {}\n```\n\n1. done";
        assert_eq!(count_words(text), 5);
    }

    #[test]
    fn test_count_words_image_alt_and_punctuation() {
        assert_eq!(count_words("![a cat](cat.png) sits , here"), 5);
        assert_eq!(count_words("a - b & c"), 5);
        assert_eq!(
            count_words("[caches](https://en.wikipedia.org/wiki/Cache_(computing)) help"),
            2
        );
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn test_count_words_idempotent_on_stripped_text() {
        let text = "This is bold and a link.";
        assert_eq!(count_words(text), count_words(&strip_markdown(text)));
    }

    #[test]
    fn test_recommended_paragraphing_bands() {
        assert_eq!(recommended_paragraphing(100).count, 2);
        assert_eq!(recommended_paragraphing(150).count, 2);
        assert_eq!(recommended_paragraphing(151).count, 3);
        assert_eq!(recommended_paragraphing(250).count, 3);
        assert_eq!(recommended_paragraphing(350).count, 4);
        assert_eq!(recommended_paragraphing(450).count, 5);
        assert_eq!(recommended_paragraphing(451).count, 6);
        assert_eq!(recommended_paragraphing(900).count, 10);
        assert_eq!(recommended_paragraphing(200).words_per_paragraph, 67);
    }

    #[test]
    fn test_strip_em_dash_forms() {
        assert_eq!(strip_em_dash("fast\u{2014}really fast"), "fast, really fast");
        assert_eq!(strip_em_dash("fast \u{2014} really"), "fast, really");
        assert_eq!(strip_em_dash("a&mdash;b &#8212; c&#X2014;d"), "a, b, c, d");
        assert_eq!(strip_em_dash("en \u{2013} dash stays"), "en \u{2013} dash stays");
        assert_eq!(strip_em_dash("line\n\u{2014}next"), "line\n, next");
    }

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("Hello, World!"), "hello-world");
        assert_eq!(generate_slug("  --Rust & Tokio: 2024--  "), "rust-tokio-2024");
        assert_eq!(generate_slug("!!!"), "");
        let long = "word ".repeat(40);
        let slug = generate_slug(&long);
        assert!(slug.len() <= 100);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_generate_excerpt() {
        assert_eq!(generate_excerpt("Short **text**.", 50), "Short text.");

        let excerpt = generate_excerpt("The quick brown fox jumps over the lazy dog", 18);
        assert_eq!(excerpt, "The quick brown...");

        let exact = generate_excerpt("The quick brown fox", 15);
        assert_eq!(exact, "The quick brown...");

        assert_eq!(generate_excerpt("Supercalifragilistic", 5), "Super...");
    }

    #[test]
    fn test_reading_time() {
        assert_eq!(reading_time_minutes(0), 1);
        assert_eq!(reading_time_minutes(200), 1);
        assert_eq!(reading_time_minutes(201), 2);
        assert_eq!(reading_time_minutes(1450), 8);
    }

    #[test]
    fn test_without_title() {
        assert_eq!(without_title("# T\n\nHook"), "\nHook");
        assert_eq!(without_title("Hook only"), "Hook only");
    }

    proptest! {
        #[test]
        fn prop_strip_em_dash_idempotent(s in ".*") {
            let once = strip_em_dash(&s);
            prop_assert_eq!(strip_em_dash(&once), once);
        }

        #[test]
        fn prop_no_em_dash_survives(
            parts in proptest::collection::vec(
                prop_oneof![
                    Just("\u{2014}".to_string()),
                    Just("&mdash;".to_string()),
                    Just("&#8212;".to_string()),
                    Just("&#x2014;".to_string()),
                    "[a-z &#;]{0,8}",
                ],
                0..12,
            )
        ) {
            let out = strip_em_dash(&parts.concat());
            prop_assert!(!out.contains('\u{2014}'), "em dash character survived");
            prop_assert!(!out.to_lowercase().contains("&mdash;"), "named entity survived");
            prop_assert!(!out.contains("&#8212;"), "numeric entity survived");
            prop_assert!(!contains_em_dash(&out), "em dash detected in output");
        }

        #[test]
        fn prop_slug_shape(title in ".{0,200}") {
            let slug = generate_slug(&title);
            prop_assert!(slug.len() <= 100);
            prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.contains("--"));
        }
    }
}
