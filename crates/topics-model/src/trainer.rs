//! Full training pipeline.
//!
//! Corpus load -> session open -> backend fit -> topic and mapping
//! persistence -> terminal session transition -> optional short-content
//! classification. Each step is a hard failure boundary: a session
//! created here always reaches `Completed` or `Failed` before `train`
//! returns.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use topics_storage::ModelStore;
use topics_types::{
    ArticleTopicMapping, DiscoveredTopic, Document, EngineSettings, SessionConfig, SessionKind,
    TrainingSession, OUTLIER_TOPIC_ID,
};

use crate::classifier::ShortContentClassifier;
use crate::cluster::{ClusterBackend, TopicSummary};
use crate::error::ModelError;
use crate::llm::LlmClient;
use crate::report::TopicBrief;
use crate::source::DocumentSource;

/// How many topics a train outcome lists.
const TOP_TOPICS: usize = 10;

/// Per-run options, defaulted from the engine settings.
#[derive(Debug, Clone)]
pub struct TrainRequest {
    /// Cap on corpus documents (None = all)
    pub limit: Option<usize>,
    /// Minimum cluster size for this run
    pub min_cluster_size: usize,
    /// Enable language-specific tokenization
    pub use_tokenizer: bool,
    /// Enable LLM labeling and short-content classification
    pub use_llm_labeling: bool,
}

impl TrainRequest {
    /// Build a request from the configured training defaults.
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            limit: None,
            min_cluster_size: settings.training.min_cluster_size,
            use_tokenizer: settings.training.use_tokenizer,
            use_llm_labeling: settings.training.use_llm_labeling,
        }
    }

    fn session_config(&self, settings: &EngineSettings) -> SessionConfig {
        SessionConfig {
            min_cluster_size: self.min_cluster_size,
            use_tokenizer: self.use_tokenizer,
            use_llm_labeling: self.use_llm_labeling,
            ..settings.training.session_config()
        }
    }
}

/// Result of a completed full training run.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    /// Session recorded for the run
    pub session_id: String,
    /// Corpus documents fed to the fit
    pub num_documents: u64,
    /// Non-outlier topics discovered
    pub num_topics: u64,
    /// Documents assigned to the outlier bucket
    pub num_outliers: u64,
    /// Mappings written for corpus documents
    pub num_mapped: u64,
    /// Wall-clock duration
    pub duration_seconds: f64,
    /// Largest topics by document count
    pub top_topics: Vec<TopicBrief>,
    /// Short documents classified through the LLM
    pub short_docs_classified: u64,
}

/// Counts produced by the fit-and-persist stage.
struct FitStats {
    num_topics: u64,
    num_outliers: u64,
    num_mapped: u64,
    top_topics: Vec<TopicBrief>,
}

/// Runs the full training pipeline.
pub struct FullTrainer {
    store: Arc<ModelStore>,
    source: Arc<dyn DocumentSource>,
    backend: Arc<dyn ClusterBackend>,
    llm: Option<Arc<dyn LlmClient>>,
    settings: EngineSettings,
}

impl FullTrainer {
    /// Create a trainer with its capability handles.
    pub fn new(
        store: Arc<ModelStore>,
        source: Arc<dyn DocumentSource>,
        backend: Arc<dyn ClusterBackend>,
        llm: Option<Arc<dyn LlmClient>>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            source,
            backend,
            llm,
            settings,
        }
    }

    /// Train the topic model over the current corpus.
    ///
    /// Fails with `NoCorpus` before any session is created when zero
    /// eligible documents exist. Any failure after the session row is
    /// created marks it `Failed` and surfaces as `ModelError::Training`.
    #[instrument(skip(self, request))]
    pub fn train(&self, request: TrainRequest) -> Result<TrainOutcome, ModelError> {
        // Step 1: load the corpus
        let documents = self
            .source
            .corpus(self.settings.training.min_content_len, request.limit)?;
        if documents.is_empty() {
            warn!("No documents found for training");
            return Err(ModelError::NoCorpus);
        }
        info!(num_documents = documents.len(), "Loaded training corpus");

        // Step 2: open the session row
        let mut session = TrainingSession::begin(
            SessionKind::FullTrain,
            request.session_config(&self.settings),
            documents.len() as u64,
        );
        self.store.save_session(&session)?;
        info!(session_id = %session.session_id, "Created training session");

        // Steps 3-4: fit and persist; any error marks the session failed
        let model_path = self.model_path(&session.session_id);
        match self.fit_and_persist(&session, &documents, &model_path) {
            Ok(stats) => {
                // Step 5: terminal transition to completed
                session.complete(stats.num_topics, stats.num_outliers, Some(model_path));
                if let Err(e) = self.store.update_session(&session) {
                    error!(session_id = %session.session_id, "Could not finalize session: {}", e);
                    return Err(ModelError::Storage(e));
                }
                info!(
                    session_id = %session.session_id,
                    num_topics = stats.num_topics,
                    num_outliers = stats.num_outliers,
                    "Training completed"
                );

                // Step 6: optional short-content classification
                let short_docs_classified = if request.use_llm_labeling {
                    self.classify_short_content(&session)
                } else {
                    0
                };

                Ok(TrainOutcome {
                    session_id: session.session_id.clone(),
                    num_documents: session.num_documents,
                    num_topics: stats.num_topics,
                    num_outliers: stats.num_outliers,
                    num_mapped: stats.num_mapped,
                    duration_seconds: session.duration_seconds().unwrap_or(0.0),
                    top_topics: stats.top_topics,
                    short_docs_classified,
                })
            }
            Err(e) => {
                // Step 5: terminal transition to failed, then re-raise
                error!(session_id = %session.session_id, "Training failed: {}", e);
                session.fail(e.to_string());
                if let Err(update_err) = self.store.update_session(&session) {
                    error!(
                        session_id = %session.session_id,
                        "Could not mark session failed: {}",
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

    fn model_path(&self, session_id: &str) -> String {
        PathBuf::from(&self.settings.training.model_dir)
            .join(session_id)
            .to_string_lossy()
            .to_string()
    }

    /// Steps 3-4: invoke the backend, persist topics and mappings, save
    /// the model artifact.
    fn fit_and_persist(
        &self,
        session: &TrainingSession,
        documents: &[Document],
        model_path: &str,
    ) -> Result<FitStats, ModelError> {
        let texts: Vec<String> = documents.iter().map(Document::text).collect();

        let assignments = self.backend.fit(&texts)?;
        assignments.check_len(documents.len())?;
        let summary = self.backend.topic_summary()?;

        // Persist every returned topic, the outlier bucket included
        let topic_rows: Vec<DiscoveredTopic> = summary
            .topics
            .iter()
            .map(|info| {
                let mut row = DiscoveredTopic::new(&session.session_id, info.topic_id);
                row.label = info.natural_label.clone();
                row.keywords = info.words.clone();
                row.representative_docs = info.representative_docs.clone();
                row.document_count = info.count;
                row.description = info.description.clone();
                row
            })
            .collect();
        self.store.save_topics(&topic_rows)?;

        // Persist mappings, skipping the outlier sentinel
        let mut mappings = Vec::new();
        for (doc, (&topic_id, &probability)) in documents.iter().zip(
            assignments
                .topic_ids
                .iter()
                .zip(assignments.probabilities.iter()),
        ) {
            if topic_id == OUTLIER_TOPIC_ID {
                continue;
            }
            mappings.push(ArticleTopicMapping::new(
                doc.id,
                &session.session_id,
                &session.session_id,
                topic_id,
                probability,
                doc.created_at,
            ));
        }
        let num_mapped = self.store.save_mappings(&mappings)? as u64;

        self.backend.save(model_path)?;

        Ok(FitStats {
            num_topics: summary.num_topics(),
            num_outliers: assignments.outlier_count(),
            num_mapped,
            top_topics: top_topics(&summary),
        })
    }

    /// Step 6: classify short documents not already mapped for this
    /// session. Failures here never unwind the completed session; they
    /// are logged and the count so far is returned.
    fn classify_short_content(&self, session: &TrainingSession) -> u64 {
        let Some(llm) = self.llm.as_deref() else {
            warn!("LLM labeling requested but no client configured");
            return 0;
        };

        let topics = match self.store.topics_for_session(&session.session_id) {
            Ok(topics) => topics,
            Err(e) => {
                error!("Could not load topics for classification: {}", e);
                return 0;
            }
        };

        let classifier = ShortContentClassifier::new(
            &self.store,
            self.source.as_ref(),
            llm,
            &self.settings.classification,
        );
        match classifier.classify_unmapped(&session.session_id, &session.session_id, &topics) {
            Ok(stats) => {
                info!(
                    classified = stats.classified,
                    outliers = stats.outliers,
                    errors = stats.errors,
                    "Short-content classification finished"
                );
                stats.classified
            }
            Err(e) => {
                error!("Short-content classification aborted: {}", e);
                0
            }
        }
    }
}

/// Largest non-outlier topics, for report payloads.
fn top_topics(summary: &TopicSummary) -> Vec<TopicBrief> {
    let mut topics: Vec<TopicBrief> = summary
        .topics
        .iter()
        .filter(|t| !t.is_outlier())
        .map(|t| TopicBrief {
            topic_id: t.topic_id,
            count: t.count,
            keywords: t.words.iter().take(10).map(|w| w.word.clone()).collect(),
            label: t.natural_label.clone(),
            description: t.description.clone(),
        })
        .collect();
    topics.sort_by(|a, b| b.count.cmp(&a.count));
    topics.truncate(TOP_TOPICS);
    topics
}
