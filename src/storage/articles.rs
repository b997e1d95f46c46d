//! Article persistence
//!
//! Finished documents and the internal links they contain. Published
//! articles are the candidates that future internal links resolve to.

use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::database::Database;
use crate::types::{CandidateArticle, DraftError, InternalLinkRecord, Result, ResultExt};

const FALLBACK_SLUG: &str = "article";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Draft,
    Published,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "published" => Self::Published,
            _ => Self::Draft,
        }
    }
}

impl std::fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Article ready to be saved
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    /// Preferred slug; a numeric suffix is added on collision
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub word_count: usize,
    pub reading_time_minutes: usize,
    /// Base64 PNG
    pub cover_image: Option<String>,
    pub seo_keywords: Vec<String>,
    pub status: ArticleStatus,
}

/// Listing row
#[derive(Debug, Clone, Serialize)]
pub struct ArticleSummary {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub word_count: usize,
    pub reading_time_minutes: usize,
    pub status: ArticleStatus,
    pub has_cover: bool,
    pub created_at: String,
}

/// Persistence collaborator for finished articles
pub trait ArticleStore: Send + Sync {
    /// Save and return the new article id
    fn save_article(&self, article: &NewArticle) -> Result<String>;

    /// Published articles internal links may point to
    fn candidate_articles(&self) -> Result<Vec<CandidateArticle>>;

    /// Record links from `source_id`; returns how many were new
    fn save_internal_links(&self, source_id: &str, links: &[InternalLinkRecord]) -> Result<usize>;

    /// Most recent first
    fn list_articles(&self, limit: usize) -> Result<Vec<ArticleSummary>>;

    fn set_status(&self, id_or_slug: &str, status: ArticleStatus) -> Result<()>;
}

impl ArticleStore for Database {
    fn save_article(&self, article: &NewArticle) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let keywords = serde_json::to_string(&article.seo_keywords)?;
        let now = chrono::Utc::now().to_rfc3339();

        let slug = self.transaction(|conn| {
            let slug = unique_slug(conn, &article.slug)?;
            conn.execute(
                "INSERT INTO articles
                 (id, title, slug, content, excerpt, word_count, reading_time, cover_image,
                  seo_keywords, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    id,
                    article.title,
                    slug,
                    article.content,
                    article.excerpt,
                    article.word_count as i64,
                    article.reading_time_minutes as i64,
                    article.cover_image,
                    keywords,
                    article.status.as_str(),
                    now,
                ],
            )
            .with_context("Failed to save article")?;
            Ok(slug)
        })?;

        debug!(id = %id, slug = %slug, "Saved article");
        Ok(id)
    }

    fn candidate_articles(&self) -> Result<Vec<CandidateArticle>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, slug FROM articles WHERE status = 'published' ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CandidateArticle {
                id: row.get(0)?,
                title: row.get(1)?,
                slug: row.get(2)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .with_context("Failed to load candidate articles")
    }

    fn save_internal_links(&self, source_id: &str, links: &[InternalLinkRecord]) -> Result<usize> {
        self.transaction(|conn| {
            let mut stmt = conn.prepare(
                "INSERT OR IGNORE INTO internal_links (source_id, target_id, anchor_text, context)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut inserted = 0;
            for link in links.iter().filter(|l| l.target_id != source_id) {
                inserted += stmt.execute(params![
                    source_id,
                    link.target_id,
                    link.anchor_text,
                    link.context
                ])?;
            }
            Ok(inserted)
        })
    }

    fn list_articles(&self, limit: usize) -> Result<Vec<ArticleSummary>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, slug, word_count, reading_time, status, cover_image IS NOT NULL, created_at
             FROM articles ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            Ok(ArticleSummary {
                id: row.get(0)?,
                title: row.get(1)?,
                slug: row.get(2)?,
                word_count: row.get::<_, i64>(3)? as usize,
                reading_time_minutes: row.get::<_, i64>(4)? as usize,
                status: ArticleStatus::parse(&row.get::<_, String>(5)?),
                has_cover: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .with_context("Failed to list articles")
    }

    fn set_status(&self, id_or_slug: &str, status: ArticleStatus) -> Result<()> {
        let updated = self.connection()?.execute(
            "UPDATE articles SET status = ?1 WHERE id = ?2 OR slug = ?2",
            params![status.as_str(), id_or_slug],
        )?;
        if updated == 0 {
            return Err(DraftError::Storage(format!(
                "No article with id or slug '{}'",
                id_or_slug
            )));
        }
        Ok(())
    }
}

/// `slug`, then `slug-2`, `slug-3`, ... until unused
fn unique_slug(conn: &rusqlite::Connection, slug: &str) -> Result<String> {
    let base = if slug.trim().is_empty() {
        FALLBACK_SLUG
    } else {
        slug
    };

    let taken = |candidate: &str| -> Result<bool> {
        Ok(conn
            .query_row(
                "SELECT 1 FROM articles WHERE slug = ?1",
                [candidate],
                |_| Ok(()),
            )
            .optional()?
            .is_some())
    };

    if !taken(base)? {
        return Ok(base.to_string());
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{}-{}", base, suffix);
        if !taken(&candidate)? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn article(title: &str, slug: &str, status: ArticleStatus) -> NewArticle {
        NewArticle {
            title: title.to_string(),
            slug: slug.to_string(),
            content: format!("# {}\n\nBody", title),
            excerpt: "Body".to_string(),
            word_count: 1,
            reading_time_minutes: 1,
            cover_image: None,
            seo_keywords: vec!["rust".to_string()],
            status,
        }
    }

    #[test]
    fn test_slug_collisions_get_suffixes() {
        let db = db();
        for _ in 0..3 {
            db.save_article(&article("Caching", "caching", ArticleStatus::Draft))
                .unwrap();
        }
        db.save_article(&article("Bang", "", ArticleStatus::Draft))
            .unwrap();

        let mut slugs: Vec<String> = db
            .list_articles(10)
            .unwrap()
            .into_iter()
            .map(|a| a.slug)
            .collect();
        slugs.sort();
        assert_eq!(slugs, vec!["article", "caching", "caching-2", "caching-3"]);
    }

    #[test]
    fn test_candidates_are_published_only() {
        let db = db();
        let published = db
            .save_article(&article("Live", "live", ArticleStatus::Published))
            .unwrap();
        db.save_article(&article("Draft", "draft", ArticleStatus::Draft))
            .unwrap();

        let candidates = db.candidate_articles().unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, published);
        assert_eq!(candidates[0].slug.as_deref(), Some("live"));

        db.set_status("draft", ArticleStatus::Published).unwrap();
        assert_eq!(db.candidate_articles().unwrap().len(), 2);
        assert!(db.set_status("missing", ArticleStatus::Published).is_err());
    }

    #[test]
    fn test_internal_links_dedup_and_skip_self() {
        let db = db();
        let a = db
            .save_article(&article("A", "a", ArticleStatus::Published))
            .unwrap();
        let b = db
            .save_article(&article("B", "b", ArticleStatus::Published))
            .unwrap();

        let link = |target: &str| InternalLinkRecord {
            target_id: target.to_string(),
            anchor_text: "see".to_string(),
            context: "see [see](/blog/x)".to_string(),
        };

        assert_eq!(db.save_internal_links(&a, &[link(&b), link(&a)]).unwrap(), 1);
        assert_eq!(db.save_internal_links(&a, &[link(&b)]).unwrap(), 0);
    }

    #[test]
    fn test_links_to_unknown_article_fail() {
        let db = db();
        let a = db
            .save_article(&article("A", "a", ArticleStatus::Draft))
            .unwrap();
        assert!(db.save_internal_links(&a, &[InternalLinkRecord {
            target_id: "nope".into(),
            anchor_text: "x".into(),
            context: String::new(),
        }])
        .is_err());
    }

    #[test]
    fn test_list_limit_and_status() {
        let db = db();
        for i in 0..5 {
            db.save_article(&article(&format!("T{}", i), &format!("t{}", i), ArticleStatus::Draft))
                .unwrap();
        }
        let listed = db.list_articles(3).unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed.iter().all(|a| a.status == ArticleStatus::Draft && !a.has_cover));
    }
}
