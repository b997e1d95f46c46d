//! Source research fan-out
//!
//! Queries run concurrently with a per-query timeout. A failed or slow
//! query contributes nothing; it never fails the whole gather.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, warn};

use crate::ai::prompt::PromptBuilder;
use crate::ai::provider::{CompletionRequest, SharedProvider};
use crate::ai::timeout::with_timeout;
use crate::ai::validation::extract_json_from_response;
use crate::types::{Result, SourceRef, json_string};

/// Search backend returning candidate citations for a query
#[async_trait]
pub trait SourceSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SourceRef>>;
}

pub type SharedSourceSearch = Arc<dyn SourceSearch>;

/// Asks the completion client for reference pages.
///
/// Suggestions are unverified; only well-formed http(s) URLs survive.
pub struct CompletionSourceSearch {
    provider: SharedProvider,
    per_query: usize,
}

impl CompletionSourceSearch {
    pub fn new(provider: SharedProvider, per_query: usize) -> Self {
        Self {
            provider,
            per_query: per_query.max(1),
        }
    }
}

#[async_trait]
impl SourceSearch for CompletionSourceSearch {
    async fn search(&self, query: &str) -> Result<Vec<SourceRef>> {
        let prompt = PromptBuilder::new()
            .role("research librarian", "pointing writers at authoritative references")
            .context_item("Query", query)
            .context_item("Results", &self.per_query.to_string())
            .text(
                "Respond with a JSON array of objects with \"url\" and \"title\" keys. \
                 Prefer official documentation, standards and well-known publications.",
            )
            .build();

        let response = self
            .provider
            .complete(&CompletionRequest::new(prompt).with_temperature(0.2))
            .await?;

        let mut sources = parse_source_suggestions(&response.content);
        sources.truncate(self.per_query);
        Ok(sources)
    }
}

/// Decode `[{"url", "title"}]` or `{"sources": [...]}`; malformed entries are dropped.
pub fn parse_source_suggestions(text: &str) -> Vec<SourceRef> {
    let Ok((value, _)) = extract_json_from_response(text) else {
        return Vec::new();
    };
    let items = match &value {
        serde_json::Value::Array(items) => items.as_slice(),
        other => match other
            .get("sources")
            .or_else(|| other.get("results"))
            .and_then(serde_json::Value::as_array)
        {
            Some(items) => items.as_slice(),
            None => return Vec::new(),
        },
    };

    items
        .iter()
        .filter_map(|item| {
            let url = match item {
                serde_json::Value::String(s) => s.trim().to_string(),
                other => json_string(other, &["url", "link", "href"])?,
            };
            let parsed = url::Url::parse(&url).ok()?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return None;
            }
            let source = SourceRef::new(url);
            Some(match json_string(item, &["title", "name"]) {
                Some(title) => source.with_title(title),
                None => source,
            })
        })
        .collect()
}

/// Run `queries` with at most `concurrency` in flight.
///
/// Results are merged in query order and de-duplicated by URL, first seen
/// wins.
pub async fn gather_sources(
    search: SharedSourceSearch,
    queries: &[String],
    per_query_timeout: Duration,
    concurrency: usize,
) -> Vec<SourceRef> {
    let mut results: Vec<(usize, Vec<SourceRef>)> = futures::stream::iter(queries.iter().enumerate())
        .map(|(index, query)| {
            let search = Arc::clone(&search);
            async move {
                let found = with_timeout(per_query_timeout, search.search(query), "source search")
                    .await
                    .unwrap_or_else(|e| {
                        warn!(query = %query, error = %e, "Source search failed, continuing without it");
                        Vec::new()
                    });
                (index, found)
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    results.sort_by_key(|(index, _)| *index);

    let mut seen = HashSet::new();
    let merged: Vec<SourceRef> = results
        .into_iter()
        .flat_map(|(_, found)| found)
        .filter(|source| seen.insert(source.url.trim_end_matches('/').to_string()))
        .collect();

    debug!(queries = queries.len(), sources = merged.len(), "Sources gathered");
    merged
}
