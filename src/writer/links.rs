//! Link post-processing
//!
//! Internal links are a capability list: only URLs resolved from real
//! articles may appear. External citations must reach a minimum count drawn
//! from the source pool.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::constants::links as link_constants;
use crate::types::{
    AllowedInternalLink, CandidateArticle, InternalLinkRecord, SourceRef, SuggestedLink,
    truncate_chars,
};

/// `[label](target "optional title")`, images excluded by the caller.
/// Targets may hold one level of balanced parentheses, as in
/// `https://en.wikipedia.org/wiki/Cache_(computing)`.
static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(!?)\[([^\]]*)\]\(\s*((?:[^()\s]|\([^()\s]*\))+)(?:\s+"[^"]*")?\s*\)"#)
        .expect("valid regex")
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// One markdown link found in a document
#[derive(Debug, Clone, PartialEq, Eq)]
struct FoundLink<'a> {
    start: usize,
    end: usize,
    label: &'a str,
    target: &'a str,
}

fn markdown_links(document: &str) -> impl Iterator<Item = FoundLink<'_>> {
    MARKDOWN_LINK.captures_iter(document).filter_map(|caps| {
        let whole = caps.get(0)?;
        if caps.get(1).is_some_and(|bang| !bang.as_str().is_empty()) {
            return None;
        }
        Some(FoundLink {
            start: whole.start(),
            end: whole.end(),
            label: caps.get(2)?.as_str(),
            target: caps.get(3)?.as_str(),
        })
    })
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Comparison key: trailing slashes are insignificant
fn url_key(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    if trimmed.is_empty() { url } else { trimmed }
}

/// Resolve outline link suggestions against known articles.
///
/// Unknown ids, articles without a slug and repeated URLs are skipped;
/// order follows the suggestions, first occurrence wins.
pub fn build_allowed_internal_links(
    suggested: &[SuggestedLink],
    candidates: &[CandidateArticle],
    url_prefix: &str,
) -> Vec<AllowedInternalLink> {
    let mut seen = HashSet::new();

    suggested
        .iter()
        .filter_map(|link| {
            let article = candidates.iter().find(|c| c.id == link.article_id)?;
            let slug = article.slug.as_deref().filter(|s| !s.trim().is_empty())?;
            let url = format!("{}{}", url_prefix, slug);
            seen.insert(url.clone()).then(|| AllowedInternalLink {
                anchor_text: link.anchor_text.clone(),
                url,
                title: article.title.clone(),
            })
        })
        .collect()
}

/// Distinct source URLs cited as http(s) markdown links
pub fn cited_sources<'a>(document: &str, sources: &'a [SourceRef]) -> Vec<&'a SourceRef> {
    let linked: HashSet<&str> = markdown_links(document)
        .filter(|link| is_http(link.target))
        .map(|link| url_key(link.target))
        .collect();

    let mut seen = HashSet::new();
    sources
        .iter()
        .filter(|s| linked.contains(url_key(&s.url)) && seen.insert(url_key(&s.url)))
        .collect()
}

/// Guarantee at least `min_sources` cited source URLs.
///
/// Missing citations are appended under a `## Sources` section using
/// unused http(s) sources in pool order. With a small pool the guarantee
/// degrades to as many as are available. A compliant document is returned
/// unchanged.
pub fn ensure_external_source_links(
    document: &str,
    sources: &[SourceRef],
    min_sources: usize,
) -> String {
    let cited = cited_sources(document, sources);
    if cited.len() >= min_sources {
        return document.to_string();
    }

    let cited_keys: HashSet<&str> = cited.iter().map(|s| url_key(&s.url)).collect();
    let mut added = HashSet::new();
    let missing: Vec<&SourceRef> = sources
        .iter()
        .filter(|s| is_http(&s.url))
        .filter(|s| !cited_keys.contains(url_key(&s.url)) && added.insert(url_key(&s.url)))
        .take(min_sources - cited.len())
        .collect();

    if missing.is_empty() {
        return document.to_string();
    }

    debug!(
        cited = cited.len(),
        appended = missing.len(),
        "Appending source citations"
    );

    let items = missing
        .iter()
        .map(|s| format!("- [{}]({})", s.label().replace(['[', ']'], ""), s.url))
        .collect::<Vec<_>>()
        .join("\n");

    let body = document.trim_end();
    if ends_with_sources_section(body) {
        format!("{}\n{}\n", body, items)
    } else {
        format!(
            "{}\n\n{}\n\n{}\n",
            body,
            link_constants::SOURCES_HEADING,
            items
        )
    }
}

fn ends_with_sources_section(document: &str) -> bool {
    document
        .lines()
        .rev()
        .find(|line| line.starts_with("## "))
        .is_some_and(|line| line.trim() == link_constants::SOURCES_HEADING)
}

fn internal_slug<'a>(target: &'a str, url_prefix: &str) -> Option<&'a str> {
    let path = target.split(['?', '#']).next().unwrap_or(target);
    let slug = path
        .strip_prefix(url_prefix)
        .or_else(|| path.strip_prefix(link_constants::LEGACY_URL_PREFIX))?
        .trim_end_matches('/');
    (!slug.is_empty() && !slug.contains('/')).then_some(slug)
}

/// Replace internal links outside the allow-list with their label.
///
/// Returns the rewritten document and the number of links removed.
pub fn enforce_internal_allow_list(
    document: &str,
    allowed: &[AllowedInternalLink],
    url_prefix: &str,
) -> (String, usize) {
    let allowed_keys: HashSet<&str> = allowed.iter().map(|l| url_key(&l.url)).collect();
    let mut out = String::with_capacity(document.len());
    let mut last = 0;
    let mut removed = 0;

    for link in markdown_links(document) {
        let Some(slug) = internal_slug(link.target, url_prefix) else {
            continue;
        };
        let canonical = format!("{}{}", url_prefix, slug);
        if allowed_keys.contains(url_key(link.target)) || allowed_keys.contains(canonical.as_str())
        {
            continue;
        }
        out.push_str(&document[last..link.start]);
        out.push_str(link.label);
        last = link.end;
        removed += 1;
    }
    out.push_str(&document[last..]);

    if removed > 0 {
        warn!(removed, "Dropped internal links outside the allow-list");
    }
    (out, removed)
}

/// Collect internal link records for persistence bookkeeping.
///
/// Both the configured prefix and the legacy `/articles/` prefix are
/// recognized. `context` holds up to `window` characters either side of
/// the link, whitespace collapsed. Repeated (target, anchor) pairs are
/// reported once.
pub fn extract_internal_links(
    document: &str,
    candidates: &[CandidateArticle],
    url_prefix: &str,
    window: usize,
) -> Vec<InternalLinkRecord> {
    let mut seen = HashSet::new();

    markdown_links(document)
        .filter_map(|link| {
            let slug = internal_slug(link.target, url_prefix)?;
            let article = candidates
                .iter()
                .find(|c| c.slug.as_deref() == Some(slug))?;
            if !seen.insert((article.id.clone(), link.label.to_string())) {
                return None;
            }
            Some(InternalLinkRecord {
                target_id: article.id.clone(),
                anchor_text: link.label.to_string(),
                context: context_window(document, link.start, link.end, window),
            })
        })
        .collect()
}

fn context_window(document: &str, start: usize, end: usize, window: usize) -> String {
    let before = &document[..start];
    let before_start = before
        .char_indices()
        .rev()
        .nth(window.saturating_sub(1))
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let before = if window == 0 { "" } else { &before[before_start..] };
    let after = truncate_chars(&document[end..], window);

    let raw = format!("{}{}{}", before, &document[start..end], after);
    WHITESPACE.replace_all(raw.trim(), " ").into_owned()
}
