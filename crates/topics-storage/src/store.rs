//! The model persistence boundary.
//!
//! `ModelStore` owns every write to the three persisted record kinds:
//! training sessions, discovered topics, and article mappings. All save
//! operations are upserts by natural key and safe to retry. Nothing here
//! decides retrain versus transform or interprets drift.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use topics_types::{
    ArticleTopicMapping, DiscoveredTopic, SessionKind, SessionStatus, TrainingSession,
    OUTLIER_TOPIC_ID,
};

use crate::column_families::{CF_MAPPINGS, CF_SESSIONS, CF_TOPICS};
use crate::db::Storage;
use crate::error::StorageError;
use crate::keys;

/// Persistence interface for the topic model.
pub struct ModelStore {
    storage: Arc<Storage>,
}

impl ModelStore {
    /// Create a store over an open storage handle.
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Get the underlying storage handle.
    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    // --- Sessions ---

    /// Save a session row, inserting or replacing by `session_id`.
    ///
    /// Writes the row and its start-time index key in one batch.
    #[instrument(skip(self, session), fields(session_id = %session.session_id))]
    pub fn save_session(&self, session: &TrainingSession) -> Result<(), StorageError> {
        let value = serde_json::to_vec(session)?;
        let row_key = keys::session_key(&session.session_id);
        let index_key = keys::session_start_key(
            session.started_at.timestamp_millis(),
            &session.session_id,
        );

        self.storage.write_batch(
            CF_SESSIONS,
            &[
                (row_key.into_bytes(), value),
                (
                    index_key.into_bytes(),
                    session.session_id.clone().into_bytes(),
                ),
            ],
        )?;
        debug!("Saved session");
        Ok(())
    }

    /// Update an existing session row.
    ///
    /// The start-time index key is derived from the immutable
    /// `started_at`, so an update is the same write as a save.
    pub fn update_session(&self, session: &TrainingSession) -> Result<(), StorageError> {
        self.save_session(session)
    }

    /// Get a session by id.
    pub fn get_session(&self, session_id: &str) -> Result<Option<TrainingSession>, StorageError> {
        let key = keys::session_key(session_id);
        match self.storage.get(CF_SESSIONS, key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// List sessions newest-first, up to `limit`.
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<TrainingSession>, StorageError> {
        let index = self.storage.prefix_scan_reverse(CF_SESSIONS, b"start:")?;
        let mut sessions = Vec::new();
        for (_, session_id) in index.into_iter().take(limit) {
            let session_id = String::from_utf8(session_id)
                .map_err(|e| StorageError::Key(format!("Invalid session id in index: {}", e)))?;
            match self.get_session(&session_id)? {
                Some(session) => sessions.push(session),
                None => warn!(session_id = %session_id, "Dangling session index entry"),
            }
        }
        Ok(sessions)
    }

    /// Latest completed full-training session, if any.
    ///
    /// Transform sessions never qualify; their topic space belongs to a
    /// parent training session.
    pub fn last_completed_training(&self) -> Result<Option<TrainingSession>, StorageError> {
        let index = self.storage.prefix_scan_reverse(CF_SESSIONS, b"start:")?;
        for (_, session_id) in index {
            let session_id = String::from_utf8(session_id)
                .map_err(|e| StorageError::Key(format!("Invalid session id in index: {}", e)))?;
            if let Some(session) = self.get_session(&session_id)? {
                if session.kind == SessionKind::FullTrain
                    && session.status == SessionStatus::Completed
                {
                    return Ok(Some(session));
                }
            }
        }
        Ok(None)
    }

    /// All sessions currently in `Running` state, newest-first.
    pub fn running_sessions(&self) -> Result<Vec<TrainingSession>, StorageError> {
        Ok(self
            .list_sessions(usize::MAX)?
            .into_iter()
            .filter(|s| s.status == SessionStatus::Running)
            .collect())
    }

    // --- Topics ---

    /// Upsert discovered topics by (session_id, topic_id).
    ///
    /// Saving the same pair again updates keywords, label, counts, and
    /// description in place, preserving `created_at`. Returns the number
    /// of rows written.
    #[instrument(skip(self, topics))]
    pub fn save_topics(&self, topics: &[DiscoveredTopic]) -> Result<usize, StorageError> {
        let mut entries = Vec::with_capacity(topics.len());
        for topic in topics {
            let key = keys::topic_key(&topic.session_id, topic.topic_id);
            let row = match self.get_topic(&topic.session_id, topic.topic_id)? {
                Some(mut existing) => {
                    existing.label = topic.label.clone();
                    existing.keywords = topic.keywords.clone();
                    existing.representative_docs = topic.representative_docs.clone();
                    existing.document_count = topic.document_count;
                    existing.description = topic.description.clone();
                    existing.updated_at = Utc::now();
                    existing
                }
                None => topic.clone(),
            };
            entries.push((key.into_bytes(), serde_json::to_vec(&row)?));
        }

        self.storage.write_batch(CF_TOPICS, &entries)?;
        debug!(count = entries.len(), "Saved topics");
        Ok(entries.len())
    }

    /// Get one topic by its natural key.
    pub fn get_topic(
        &self,
        session_id: &str,
        topic_id: i32,
    ) -> Result<Option<DiscoveredTopic>, StorageError> {
        let key = keys::topic_key(session_id, topic_id);
        match self.storage.get(CF_TOPICS, key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All topics of a session, outlier row included.
    pub fn topics_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<DiscoveredTopic>, StorageError> {
        let prefix = keys::topic_session_prefix(session_id);
        let mut topics = Vec::new();
        for (_, value) in self.storage.prefix_scan(CF_TOPICS, prefix.as_bytes())? {
            topics.push(serde_json::from_slice(&value)?);
        }
        Ok(topics)
    }

    // --- Mappings ---

    /// Upsert article mappings by (article_id, session_id); last write wins.
    ///
    /// Each mapping lands under its article key, its session index key,
    /// and its document-time index key in one atomic batch; this call is
    /// the commit boundary for classification progress. Outlier
    /// assignments are never materialized; any passed in are skipped.
    /// Returns the number of mappings written.
    #[instrument(skip(self, mappings))]
    pub fn save_mappings(&self, mappings: &[ArticleTopicMapping]) -> Result<usize, StorageError> {
        let mut entries = Vec::with_capacity(mappings.len() * 3);
        let mut written = 0usize;

        for mapping in mappings {
            if mapping.topic_id == OUTLIER_TOPIC_ID {
                warn!(
                    article_id = mapping.article_id,
                    "Skipping outlier assignment passed to save_mappings"
                );
                continue;
            }
            let value = serde_json::to_vec(mapping)?;
            let doc_ms = mapping.document_created_at.timestamp_millis();

            entries.push((
                keys::mapping_article_key(mapping.article_id, &mapping.session_id).into_bytes(),
                value.clone(),
            ));
            entries.push((
                keys::mapping_session_key(&mapping.session_id, mapping.article_id).into_bytes(),
                value.clone(),
            ));
            entries.push((
                keys::mapping_time_key(doc_ms, mapping.article_id, &mapping.session_id)
                    .into_bytes(),
                value,
            ));
            written += 1;
        }

        self.storage.write_batch(CF_MAPPINGS, &entries)?;
        debug!(count = written, "Saved mappings");
        Ok(written)
    }

    /// Get one mapping by its natural key.
    pub fn get_mapping(
        &self,
        article_id: i64,
        session_id: &str,
    ) -> Result<Option<ArticleTopicMapping>, StorageError> {
        let key = keys::mapping_article_key(article_id, session_id);
        match self.storage.get(CF_MAPPINGS, key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All mappings computed by one session.
    pub fn mappings_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<ArticleTopicMapping>, StorageError> {
        let prefix = keys::mapping_session_prefix(session_id);
        let mut mappings = Vec::new();
        for (_, value) in self.storage.prefix_scan(CF_MAPPINGS, prefix.as_bytes())? {
            mappings.push(serde_json::from_slice(&value)?);
        }
        Ok(mappings)
    }

    /// Count of mappings computed by one session.
    pub fn count_mappings_for_session(&self, session_id: &str) -> Result<u64, StorageError> {
        let prefix = keys::mapping_session_prefix(session_id);
        Ok(self
            .storage
            .prefix_scan(CF_MAPPINGS, prefix.as_bytes())?
            .len() as u64)
    }

    /// Mappings of one session assigned to one topic.
    pub fn mappings_for_topic(
        &self,
        session_id: &str,
        topic_id: i32,
    ) -> Result<Vec<ArticleTopicMapping>, StorageError> {
        Ok(self
            .mappings_for_session(session_id)?
            .into_iter()
            .filter(|m| m.topic_id == topic_id)
            .collect())
    }

    /// Whether any session has mapped this article.
    pub fn has_any_mapping(&self, article_id: i64) -> Result<bool, StorageError> {
        let prefix = keys::mapping_article_prefix(article_id);
        Ok(!self
            .storage
            .prefix_scan(CF_MAPPINGS, prefix.as_bytes())?
            .is_empty())
    }

    /// Topic-assignment histogram over mappings whose document was
    /// created in [since, until).
    ///
    /// Buckets by topic id across sessions; this backs the drift score.
    pub fn mapping_histogram(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<HashMap<i32, u64>, StorageError> {
        let start = keys::mapping_time_bound(since.timestamp_millis());
        let end = keys::mapping_time_bound(until.timestamp_millis());

        let mut histogram = HashMap::new();
        for (_, value) in
            self.storage
                .range_scan(CF_MAPPINGS, start.as_bytes(), end.as_bytes())?
        {
            let mapping: ArticleTopicMapping = serde_json::from_slice(&value)?;
            *histogram.entry(mapping.topic_id).or_insert(0) += 1;
        }
        Ok(histogram)
    }
}
