//! Document type for the corpus view.
//!
//! Documents are owned by the ingestion pipeline and read-only here.
//! The corpus is the subset with content long enough to cluster;
//! shorter documents are only eligible for LLM classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A news article as seen by the topic engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Source article identifier
    pub id: i64,

    /// Article headline
    pub title: Option<String>,

    /// Article body (may be missing for stub rows)
    pub content: Option<String>,

    /// Publication timestamp
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Create a document with the given fields.
    pub fn new(
        id: i64,
        title: Option<String>,
        content: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            content,
            created_at,
        }
    }

    /// Text submitted to the clustering backend: headline and body joined.
    pub fn text(&self) -> String {
        format!(
            "{}\n{}",
            self.title.as_deref().unwrap_or(""),
            self.content.as_deref().unwrap_or("")
        )
    }

    /// Length of the body content in characters (0 when missing).
    pub fn content_len(&self) -> usize {
        self.content.as_deref().map_or(0, |c| c.chars().count())
    }

    /// Whether this document qualifies for the training corpus.
    pub fn in_corpus(&self, min_content_len: usize) -> bool {
        self.content.is_some() && self.content_len() > min_content_len
    }

    /// Whether this document falls in the short-content classification band.
    pub fn is_short(&self, min_len: usize, max_len: usize) -> bool {
        let len = self.content_len();
        self.content.is_some() && len > min_len && len < max_len
    }
}
