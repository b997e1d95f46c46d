pub mod articles;
pub mod database;

pub use articles::{ArticleStatus, ArticleStore, ArticleSummary, NewArticle};
pub use database::{Database, PoolConfig, SharedDatabase};
