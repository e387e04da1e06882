//! Article-to-topic mapping records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Assignment of one article to one discovered topic.
///
/// Identity is the pair (`article_id`, `session_id`); at most one mapping
/// exists per pair and a later save wins. Outlier assignments are never
/// materialized as mappings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleTopicMapping {
    /// Source article identifier
    pub article_id: i64,

    /// Session (run) that computed this mapping
    pub session_id: String,

    /// Session whose topic space the mapping points into. Equal to
    /// `session_id` for full-train mappings; for transform and
    /// classification runs it is the parent training session.
    pub topic_session_id: String,

    /// Assigned topic id within `topic_session_id` (never -1)
    pub topic_id: i32,

    /// Assignment confidence in [0, 1]
    pub probability: f64,

    /// Publication timestamp of the article, denormalized at write time
    /// so drift histograms bucket by document age without a join
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub document_created_at: DateTime<Utc>,

    /// When the mapping was computed
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl ArticleTopicMapping {
    /// Create a mapping, clamping probability to [0, 1].
    pub fn new(
        article_id: i64,
        session_id: impl Into<String>,
        topic_session_id: impl Into<String>,
        topic_id: i32,
        probability: f64,
        document_created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            article_id,
            session_id: session_id.into(),
            topic_session_id: topic_session_id.into(),
            topic_id,
            probability: probability.clamp(0.0, 1.0),
            document_created_at,
            created_at: Utc::now(),
        }
    }
}
