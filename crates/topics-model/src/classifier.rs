//! LLM classification of short documents.
//!
//! Documents below the corpus length threshold never reach the
//! clustering backend; after a full training run they are assigned to
//! the discovered topics one LLM call at a time. Work proceeds in fixed
//! batches with a persistence flush every N successes, so partial
//! progress survives a crash mid-run. Per-document failures are counted
//! and never abort the batch.

use tracing::{debug, info, warn};

use topics_storage::ModelStore;
use topics_types::{
    ArticleTopicMapping, ClassificationConfig, DiscoveredTopic, Document, OUTLIER_TOPIC_ID,
};

use crate::error::ModelError;
use crate::llm::LlmClient;
use crate::source::DocumentSource;

/// Counts from one classification run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassificationStats {
    /// Documents mapped to a topic
    pub classified: u64,
    /// Documents the LLM judged a match for no topic
    pub outliers: u64,
    /// Per-document failures (LLM call, parse, unknown topic id)
    pub errors: u64,
}

/// Classifies short documents into an existing topic space.
pub struct ShortContentClassifier<'a> {
    store: &'a ModelStore,
    source: &'a dyn DocumentSource,
    llm: &'a dyn LlmClient,
    config: &'a ClassificationConfig,
}

impl<'a> ShortContentClassifier<'a> {
    /// Create a classifier with its capability handles.
    pub fn new(
        store: &'a ModelStore,
        source: &'a dyn DocumentSource,
        llm: &'a dyn LlmClient,
        config: &'a ClassificationConfig,
    ) -> Self {
        Self {
            store,
            source,
            llm,
            config,
        }
    }

    /// Classify short documents not already mapped for `session_id`.
    ///
    /// Mappings are attributed to `session_id` and point into the topic
    /// space of `topic_session_id`. "No match" answers are counted as
    /// outliers and not persisted.
    pub fn classify_unmapped(
        &self,
        session_id: &str,
        topic_session_id: &str,
        topics: &[DiscoveredTopic],
    ) -> Result<ClassificationStats, ModelError> {
        let candidates: Vec<&DiscoveredTopic> =
            topics.iter().filter(|t| !t.is_outlier).collect();
        if candidates.is_empty() {
            debug!("No candidate topics; skipping short-content classification");
            return Ok(ClassificationStats::default());
        }

        let shorts = self.source.short_documents(
            self.config.min_len,
            self.config.max_len,
            self.config.max_documents,
        )?;
        let mut pending = Vec::new();
        for doc in shorts {
            if self.store.get_mapping(doc.id, session_id)?.is_none() {
                pending.push(doc);
            }
        }
        if pending.is_empty() {
            debug!("No short documents to classify");
            return Ok(ClassificationStats::default());
        }
        info!(count = pending.len(), "Classifying short documents");

        let context = prompt_context(&candidates, self.config.prompt_keywords);
        let mut stats = ClassificationStats::default();
        let mut buffer: Vec<ArticleTopicMapping> = Vec::new();

        for batch in pending.chunks(self.config.batch_size) {
            for doc in batch {
                match self.classify_one(doc, &context, topic_session_id) {
                    Ok(Some(topic_id)) => {
                        buffer.push(ArticleTopicMapping::new(
                            doc.id,
                            session_id,
                            topic_session_id,
                            topic_id,
                            self.config.probability,
                            doc.created_at,
                        ));
                        stats.classified += 1;

                        // Flush so partial progress survives a crash
                        if stats.classified % self.config.commit_every as u64 == 0 {
                            self.flush(&mut buffer, &mut stats);
                        }
                    }
                    Ok(None) => stats.outliers += 1,
                    Err(e) => {
                        warn!(article_id = doc.id, "Failed to classify document: {}", e);
                        stats.errors += 1;
                    }
                }
            }
        }
        self.flush(&mut buffer, &mut stats);

        info!(
            classified = stats.classified,
            outliers = stats.outliers,
            errors = stats.errors,
            "Short-content classification summary"
        );
        Ok(stats)
    }

    /// Classify one document. `Ok(None)` means no topic matched.
    fn classify_one(
        &self,
        doc: &Document,
        context: &str,
        topic_session_id: &str,
    ) -> Result<Option<i32>, ModelError> {
        let prompt = classification_prompt(context, &doc.text());
        let response = self.llm.complete(&prompt)?;
        let topic_id = parse_topic_id(&response)?;

        if topic_id == OUTLIER_TOPIC_ID {
            return Ok(None);
        }

        // The LLM answers from the candidate list, but only a persisted
        // topic row may be referenced by a mapping.
        if self.store.get_topic(topic_session_id, topic_id)?.is_none() {
            return Err(ModelError::Classification(format!(
                "topic {} not found for session {}",
                topic_id, topic_session_id
            )));
        }
        Ok(Some(topic_id))
    }

    /// Persist buffered mappings. A flush failure drops the buffered
    /// work into the error count rather than aborting the run.
    fn flush(&self, buffer: &mut Vec<ArticleTopicMapping>, stats: &mut ClassificationStats) {
        if buffer.is_empty() {
            return;
        }
        match self.store.save_mappings(buffer) {
            Ok(written) => debug!(written, "Flushed classification mappings"),
            Err(e) => {
                warn!("Failed to flush classification mappings: {}", e);
                stats.errors += buffer.len() as u64;
                stats.classified -= buffer.len() as u64;
            }
        }
        buffer.clear();
    }
}

/// Candidate-topic lines shown to the LLM.
fn prompt_context(candidates: &[&DiscoveredTopic], keywords_per_topic: usize) -> String {
    candidates
        .iter()
        .map(|t| {
            format!(
                "- Topic {}: {} (keywords: {})",
                t.topic_id,
                t.label.as_deref().unwrap_or("unlabeled"),
                t.keyword_words(keywords_per_topic).join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt asking for a single topic id, or -1 for no match.
fn classification_prompt(context: &str, text: &str) -> String {
    format!(
        r#"Given these topics:
{}

Classify this short text into ONE topic ID (just return the number):
"{}"

Return format: <topic_id>
If none match well, return: -1"#,
        context, text
    )
}

/// Parse the LLM answer into a topic id.
fn parse_topic_id(response: &str) -> Result<i32, ModelError> {
    let cleaned = response.trim().trim_matches('"').trim_matches('\'').trim();
    cleaned
        .parse::<i32>()
        .map_err(|_| ModelError::Classification(format!("unparseable topic id: {:?}", response)))
}
