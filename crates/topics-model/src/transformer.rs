//! Incremental transform pipeline.
//!
//! Maps documents that arrived after the last completed training run
//! into the existing topic space. Topic definitions are never altered;
//! a transform run records its own lightweight session row whose
//! mappings point into the parent training session's topics.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use topics_storage::ModelStore;
use topics_types::{
    ArticleTopicMapping, Document, EngineSettings, SessionKind, TrainingSession, OUTLIER_TOPIC_ID,
};

use crate::cluster::ClusterBackend;
use crate::error::ModelError;
use crate::source::DocumentSource;

/// Result of a transform run.
#[derive(Debug, Clone)]
pub struct TransformOutcome {
    /// Session recorded for the run; `None` for a zero-work run
    pub session_id: Option<String>,
    /// Training session whose topic space was used
    pub parent_session_id: String,
    /// New documents processed
    pub processed: u64,
    /// Mappings written
    pub mapped: u64,
    /// Documents assigned to the outlier bucket
    pub outliers: u64,
    /// Backend results pointing at topics missing from the store
    pub skipped_unknown: u64,
    /// Wall-clock duration
    pub duration_seconds: f64,
}

/// Runs the incremental transform pipeline.
pub struct IncrementalTransformer {
    store: Arc<ModelStore>,
    source: Arc<dyn DocumentSource>,
    backend: Arc<dyn ClusterBackend>,
    settings: EngineSettings,
}

impl IncrementalTransformer {
    /// Create a transformer with its capability handles.
    pub fn new(
        store: Arc<ModelStore>,
        source: Arc<dyn DocumentSource>,
        backend: Arc<dyn ClusterBackend>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            source,
            backend,
            settings,
        }
    }

    /// Transform new documents against the existing model.
    ///
    /// Fails fast with `NoModel` when no completed training session
    /// exists or its artifact cannot be loaded; the caller should fall
    /// back to full training. Zero new documents is a success, not an
    /// error.
    #[instrument(skip(self))]
    pub fn transform(&self) -> Result<TransformOutcome, ModelError> {
        let parent = self
            .store
            .last_completed_training()?
            .ok_or_else(|| ModelError::NoModel("no completed training session".to_string()))?;

        let model_path = parent.model_saved_path.clone().ok_or_else(|| {
            ModelError::NoModel(format!(
                "session {} has no saved model artifact",
                parent.session_id
            ))
        })?;
        self.backend.load(&model_path).map_err(|e| {
            ModelError::NoModel(format!("could not load model artifact: {}", e))
        })?;
        info!(parent_session_id = %parent.session_id, "Loaded existing model");

        // New documents with no mapping from any session
        let candidates = self
            .source
            .created_after(parent.started_at, self.settings.training.min_content_len)?;
        let mut documents = Vec::new();
        for doc in candidates {
            if !self.store.has_any_mapping(doc.id)? {
                documents.push(doc);
            }
        }

        if documents.is_empty() {
            info!("No new documents to transform");
            return Ok(TransformOutcome {
                session_id: None,
                parent_session_id: parent.session_id,
                processed: 0,
                mapped: 0,
                outliers: 0,
                skipped_unknown: 0,
                duration_seconds: 0.0,
            });
        }
        info!(count = documents.len(), "Transforming new documents");

        let mut session = TrainingSession::begin(
            SessionKind::Transform,
            parent.config.clone(),
            documents.len() as u64,
        );
        session.model_saved_path = Some(model_path);
        self.store.save_session(&session)?;

        match self.transform_and_persist(&session, &parent, &documents) {
            Ok((mapped, outliers, skipped_unknown)) => {
                session.complete(0, outliers, session.model_saved_path.clone());
                if let Err(e) = self.store.update_session(&session) {
                    warn!(session_id = %session.session_id, "Could not finalize session: {}", e);
                    return Err(ModelError::Storage(e));
                }
                info!(
                    session_id = %session.session_id,
                    mapped = mapped,
                    outliers = outliers,
                    "Transform completed"
                );
                Ok(TransformOutcome {
                    session_id: Some(session.session_id.clone()),
                    parent_session_id: parent.session_id,
                    processed: documents.len() as u64,
                    mapped,
                    outliers,
                    skipped_unknown,
                    duration_seconds: session.duration_seconds().unwrap_or(0.0),
                })
            }
            Err(e) => {
                session.fail(e.to_string());
                if let Err(update_err) = self.store.update_session(&session) {
                    warn!(
                        session_id = %session.session_id,
                        "Could not mark transform session failed: {}",
                        update_err
                    );
                }
                Err(ModelError::Training {
                    session_id: session.session_id,
                    message: e.to_string(),
                })
            }
        }
    }

    /// Transform documents and persist mappings into the parent's
    /// topic space.
    fn transform_and_persist(
        &self,
        session: &TrainingSession,
        parent: &TrainingSession,
        documents: &[Document],
    ) -> Result<(u64, u64, u64), ModelError> {
        let texts: Vec<String> = documents.iter().map(Document::text).collect();
        let assignments = self.backend.transform(&texts)?;
        assignments.check_len(documents.len())?;

        let mut mappings = Vec::new();
        let mut outliers = 0u64;
        let mut skipped_unknown = 0u64;

        for (doc, (&topic_id, &probability)) in documents.iter().zip(
            assignments
                .topic_ids
                .iter()
                .zip(assignments.probabilities.iter()),
        ) {
            if topic_id == OUTLIER_TOPIC_ID {
                outliers += 1;
                continue;
            }
            // Only topics persisted by the parent run are valid targets
            if self.store.get_topic(&parent.session_id, topic_id)?.is_none() {
                warn!(
                    topic_id = topic_id,
                    parent_session_id = %parent.session_id,
                    "Transform returned a topic missing from the store"
                );
                skipped_unknown += 1;
                continue;
            }
            mappings.push(ArticleTopicMapping::new(
                doc.id,
                &session.session_id,
                &parent.session_id,
                topic_id,
                probability,
                doc.created_at,
            ));
        }

        let mapped = self.store.save_mappings(&mappings)? as u64;
        Ok((mapped, outliers, skipped_unknown))
    }
}
