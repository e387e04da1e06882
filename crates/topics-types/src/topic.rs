//! Discovered topic records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved topic id for documents that fit no cluster confidently.
///
/// The outlier bucket is stored as a topic row (with `is_outlier` set)
/// but is never a valid target for an article mapping.
pub const OUTLIER_TOPIC_ID: i32 = -1;

/// A keyword with its relevance score inside a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicKeyword {
    /// Keyword text
    pub word: String,
    /// Relevance score from the clustering backend
    pub score: f64,
}

impl TopicKeyword {
    /// Create a keyword entry.
    pub fn new(word: impl Into<String>, score: f64) -> Self {
        Self {
            word: word.into(),
            score,
        }
    }
}

/// A topic discovered by one training session.
///
/// Identity is the pair (`session_id`, `topic_id`). Saving the same pair
/// again updates the existing row in place (idempotent retries).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredTopic {
    /// Session that discovered this topic
    pub session_id: String,

    /// Backend-assigned topic id (-1 for the outlier bucket)
    pub topic_id: i32,

    /// Natural-language label, when LLM labeling ran
    pub label: Option<String>,

    /// Ranked keywords with scores
    pub keywords: Vec<TopicKeyword>,

    /// Small sample of representative documents
    pub representative_docs: Vec<String>,

    /// Number of corpus documents assigned to this topic
    pub document_count: u64,

    /// Natural-language description, when LLM labeling ran
    pub description: Option<String>,

    /// True iff `topic_id` is the outlier sentinel
    pub is_outlier: bool,

    /// First persisted
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    /// Last upserted
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl DiscoveredTopic {
    /// Create a topic row for a session.
    pub fn new(session_id: impl Into<String>, topic_id: i32) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            topic_id,
            label: None,
            keywords: Vec::new(),
            representative_docs: Vec::new(),
            document_count: 0,
            description: None,
            is_outlier: topic_id == OUTLIER_TOPIC_ID,
            created_at: now,
            updated_at: now,
        }
    }

    /// Top keyword words, for compact summaries.
    pub fn keyword_words(&self, limit: usize) -> Vec<String> {
        self.keywords
            .iter()
            .take(limit)
            .map(|k| k.word.clone())
            .collect()
    }
}
