//! Document source contract.
//!
//! The raw article store is owned by the ingestion pipeline; this crate
//! reads it through a query surface returning documents filtered by
//! content length and recency, newest first, with an optional cap.

use chrono::{DateTime, Utc};
use topics_types::Document;

use crate::error::ModelError;

/// Read-only query surface over the article corpus.
pub trait DocumentSource: Send + Sync {
    /// Corpus documents: non-null content longer than `min_content_len`,
    /// newest first, capped at `limit` when given.
    fn corpus(
        &self,
        min_content_len: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Document>, ModelError>;

    /// Short documents with content length strictly inside
    /// (`min_len`, `max_len`), newest first, capped at `limit`.
    fn short_documents(
        &self,
        min_len: usize,
        max_len: usize,
        limit: usize,
    ) -> Result<Vec<Document>, ModelError>;

    /// Corpus-eligible documents created strictly after `since`,
    /// newest first.
    fn created_after(
        &self,
        since: DateTime<Utc>,
        min_content_len: usize,
    ) -> Result<Vec<Document>, ModelError>;

    /// Count of documents with content created strictly after `since`.
    fn count_created_after(&self, since: DateTime<Utc>) -> Result<u64, ModelError>;

    /// Count of all documents with content.
    fn count_total(&self) -> Result<u64, ModelError>;
}

/// In-memory document source backed by a vector.
///
/// Used by tests and wiring checks; filters and ordering match the
/// contract above.
pub struct InMemorySource {
    documents: Vec<Document>,
}

impl InMemorySource {
    /// Create a source over the given documents.
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    fn newest_first(mut docs: Vec<Document>) -> Vec<Document> {
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        docs
    }
}

impl DocumentSource for InMemorySource {
    fn corpus(
        &self,
        min_content_len: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Document>, ModelError> {
        let mut docs: Vec<Document> = self
            .documents
            .iter()
            .filter(|d| d.in_corpus(min_content_len))
            .cloned()
            .collect();
        docs = Self::newest_first(docs);
        if let Some(limit) = limit {
            docs.truncate(limit);
        }
        Ok(docs)
    }

    fn short_documents(
        &self,
        min_len: usize,
        max_len: usize,
        limit: usize,
    ) -> Result<Vec<Document>, ModelError> {
        let mut docs: Vec<Document> = self
            .documents
            .iter()
            .filter(|d| d.is_short(min_len, max_len))
            .cloned()
            .collect();
        docs = Self::newest_first(docs);
        docs.truncate(limit);
        Ok(docs)
    }

    fn created_after(
        &self,
        since: DateTime<Utc>,
        min_content_len: usize,
    ) -> Result<Vec<Document>, ModelError> {
        let docs = self
            .documents
            .iter()
            .filter(|d| d.created_at > since && d.in_corpus(min_content_len))
            .cloned()
            .collect();
        Ok(Self::newest_first(docs))
    }

    fn count_created_after(&self, since: DateTime<Utc>) -> Result<u64, ModelError> {
        Ok(self
            .documents
            .iter()
            .filter(|d| d.created_at > since && d.content.is_some())
            .count() as u64)
    }

    fn count_total(&self) -> Result<u64, ModelError> {
        Ok(self
            .documents
            .iter()
            .filter(|d| d.content.is_some())
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn doc(id: i64, len: usize, days_ago: i64) -> Document {
        Document::new(
            id,
            Some(format!("Article {}", id)),
            Some("x".repeat(len)),
            Utc::now() - Duration::days(days_ago),
        )
    }

    #[test]
    fn test_corpus_filters_and_orders() {
        let source = InMemorySource::new(vec![doc(1, 150, 5), doc(2, 50, 1), doc(3, 150, 1)]);
        let corpus = source.corpus(100, None).unwrap();
        assert_eq!(corpus.len(), 2);
        // Newest first
        assert_eq!(corpus[0].id, 3);
        assert_eq!(corpus[1].id, 1);
    }

    #[test]
    fn test_corpus_cap() {
        let source = InMemorySource::new(vec![doc(1, 150, 3), doc(2, 150, 2), doc(3, 150, 1)]);
        let corpus = source.corpus(100, Some(2)).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus[0].id, 3);
    }

    #[test]
    fn test_short_documents_band() {
        let source = InMemorySource::new(vec![doc(1, 150, 1), doc(2, 50, 1), doc(3, 10, 1)]);
        let shorts = source.short_documents(20, 200, 10).unwrap();
        // 150 and 50 are both inside (20, 200); 10 is below
        assert_eq!(shorts.len(), 2);
    }

    #[test]
    fn test_created_after() {
        let source = InMemorySource::new(vec![doc(1, 150, 10), doc(2, 150, 1)]);
        let recent = source
            .created_after(Utc::now() - Duration::days(5), 100)
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, 2);
        assert_eq!(
            source
                .count_created_after(Utc::now() - Duration::days(5))
                .unwrap(),
            1
        );
        assert_eq!(source.count_total().unwrap(), 2);
    }
}
