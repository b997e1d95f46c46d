//! Articles written by one run become internal link targets for the next.

use std::sync::Arc;

use async_trait::async_trait;

use draftsmith::ai::{CompletionRequest, DisabledImageGenerator};
use draftsmith::types::SuggestedLink;
use draftsmith::{
    ArticleStatus, ArticleStore, Conclusion, Config, Database, LlmProvider, LlmResponse,
    NewArticle, Outline, Result, Section, WriterInputs, WriterPipeline,
};

/// Sections of 60 words linking to `/blog/first-post`; polish echoes the draft
struct LinkingWriter;

#[async_trait]
impl LlmProvider for LinkingWriter {
    async fn complete(&self, request: &CompletionRequest) -> Result<LlmResponse> {
        let prompt = &request.prompt;
        let content = match prompt.find("<DRAFT>\n") {
            Some(start) => {
                let rest = &prompt[start + "<DRAFT>\n".len()..];
                rest[..rest.find("\n</DRAFT>").unwrap_or(rest.len())].to_string()
            }
            None => format!(
                "Read [the first post](/blog/first-post) before this. {}",
                vec!["word"; 53].join(" ")
            ),
        };
        Ok(LlmResponse::content_only(content))
    }

    fn name(&self) -> &str {
        "linking"
    }

    fn model(&self) -> &str {
        "linking-model"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

fn new_article(title: &str, slug: &str, status: ArticleStatus) -> NewArticle {
    NewArticle {
        title: title.to_string(),
        slug: slug.to_string(),
        content: format!("# {}\n\nBody text.", title),
        excerpt: "Body text.".to_string(),
        word_count: 2,
        reading_time_minutes: 1,
        cover_image: None,
        seo_keywords: Vec::new(),
        status,
    }
}

#[tokio::test]
async fn published_articles_feed_the_link_allow_list() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("articles.db")).unwrap();
    db.initialize().unwrap();

    let first_id = db
        .save_article(&new_article("First Post", "first-post", ArticleStatus::Draft))
        .unwrap();
    assert!(db.candidate_articles().unwrap().is_empty());
    db.set_status("first-post", ArticleStatus::Published).unwrap();

    let outline = Outline {
        title: "Second Post".to_string(),
        hook: "Building on the first.".to_string(),
        sections: vec![Section {
            suggested_links: vec![SuggestedLink {
                article_id: first_id.clone(),
                anchor_text: "the first post".to_string(),
            }],
            ..Section::new("Recap", 60)
        }],
        conclusion: Conclusion {
            summary: "Done.".to_string(),
            call_to_action: String::new(),
        },
        seo_keywords: vec!["series".to_string()],
    };

    let mut config = Config::default();
    config.image.enabled = false;
    let pipeline = WriterPipeline::new(
        Arc::new(LinkingWriter),
        Arc::new(DisabledImageGenerator),
        &config,
    );
    let inputs = WriterInputs {
        candidates: db.candidate_articles().unwrap(),
        ..WriterInputs::default()
    };
    let output = pipeline.run(&outline, &inputs).await.unwrap();

    assert!(output.full_document.contains("[the first post](/blog/first-post)"));
    assert_eq!(output.internal_links.len(), 1);

    let second_id = db
        .save_article(&NewArticle {
            title: outline.title.clone(),
            slug: output.slug.clone(),
            content: output.full_document.clone(),
            excerpt: output.excerpt.clone(),
            word_count: output.word_count,
            reading_time_minutes: output.reading_time_minutes,
            cover_image: None,
            seo_keywords: outline.seo_keywords.clone(),
            status: ArticleStatus::Draft,
        })
        .unwrap();
    assert_eq!(
        db.save_internal_links(&second_id, &output.internal_links)
            .unwrap(),
        1
    );

    let listed = db.list_articles(10).unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().any(|a| a.slug == "second-post" && a.status == ArticleStatus::Draft));
}

#[test]
fn reopening_a_database_keeps_articles() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("articles.db");
    {
        let db = Database::open(&path).unwrap();
        db.initialize().unwrap();
        db.save_article(&new_article("Kept", "kept", ArticleStatus::Published))
            .unwrap();
    }

    let db = Database::open(&path).unwrap();
    db.initialize().unwrap();
    let candidates = db.candidate_articles().unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].slug.as_deref(), Some("kept"));
}
