//! Clustering capability contract.
//!
//! The embedding/clustering engine is external to this crate. It is
//! consumed through `ClusterBackend`: fit a corpus, transform new
//! documents into the fitted topic space, and describe the discovered
//! topics. Topic id -1 is the universal outlier sentinel.

use topics_types::{TopicKeyword, OUTLIER_TOPIC_ID};

use crate::error::ModelError;

/// Per-document assignments returned by `fit` and `transform`.
///
/// `topic_ids[i]` and `probabilities[i]` describe the document at
/// position `i` of the submitted slice.
#[derive(Debug, Clone, Default)]
pub struct Assignments {
    /// Assigned topic id per document (-1 for outliers)
    pub topic_ids: Vec<i32>,
    /// Assignment confidence per document
    pub probabilities: Vec<f64>,
}

impl Assignments {
    /// Number of outlier assignments.
    pub fn outlier_count(&self) -> u64 {
        self.topic_ids
            .iter()
            .filter(|&&t| t == OUTLIER_TOPIC_ID)
            .count() as u64
    }

    /// Check that the backend returned one assignment per document.
    pub fn check_len(&self, expected: usize) -> Result<(), ModelError> {
        if self.topic_ids.len() != expected || self.probabilities.len() != expected {
            return Err(ModelError::Backend(format!(
                "assignment count mismatch: {} documents, {} topic ids, {} probabilities",
                expected,
                self.topic_ids.len(),
                self.probabilities.len()
            )));
        }
        Ok(())
    }
}

/// One topic as described by the backend after a fit.
#[derive(Debug, Clone)]
pub struct TopicInfo {
    /// Backend-assigned topic id (-1 for the outlier bucket)
    pub topic_id: i32,
    /// Documents assigned to the topic during the fit
    pub count: u64,
    /// Ranked keywords with scores
    pub words: Vec<TopicKeyword>,
    /// Small sample of representative documents
    pub representative_docs: Vec<String>,
    /// Natural-language label, when the backend labels topics
    pub natural_label: Option<String>,
    /// Natural-language description, when the backend labels topics
    pub description: Option<String>,
}

impl TopicInfo {
    /// Whether this entry is the outlier bucket.
    pub fn is_outlier(&self) -> bool {
        self.topic_id == OUTLIER_TOPIC_ID
    }
}

/// Topic descriptions for a fitted model.
#[derive(Debug, Clone, Default)]
pub struct TopicSummary {
    /// Discovered topics, outlier bucket included
    pub topics: Vec<TopicInfo>,
}

impl TopicSummary {
    /// Count of non-outlier topics.
    pub fn num_topics(&self) -> u64 {
        self.topics.iter().filter(|t| !t.is_outlier()).count() as u64
    }
}

/// Contract for the external clustering capability.
///
/// `fit` and `transform` are single blocking calls with no checkpointing
/// visible to this crate. Implementations handle their own API calls,
/// model state, and synchronization behind `&self`.
pub trait ClusterBackend: Send + Sync {
    /// Fit the model on a corpus, returning per-document assignments.
    fn fit(&self, documents: &[String]) -> Result<Assignments, ModelError>;

    /// Map documents into the already-fitted topic space. Topic
    /// definitions are not altered.
    fn transform(&self, documents: &[String]) -> Result<Assignments, ModelError>;

    /// Describe the topics of the fitted model.
    fn topic_summary(&self) -> Result<TopicSummary, ModelError>;

    /// Persist the fitted model artifact.
    fn save(&self, path: &str) -> Result<(), ModelError>;

    /// Load a previously saved model artifact.
    fn load(&self, path: &str) -> Result<(), ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outlier_count() {
        let assignments = Assignments {
            topic_ids: vec![0, -1, 2, -1, -1],
            probabilities: vec![0.9, 0.0, 0.7, 0.0, 0.0],
        };
        assert_eq!(assignments.outlier_count(), 3);
    }

    #[test]
    fn test_check_len_mismatch() {
        let assignments = Assignments {
            topic_ids: vec![0, 1],
            probabilities: vec![0.9],
        };
        assert!(assignments.check_len(2).is_err());
        let ok = Assignments {
            topic_ids: vec![0, 1],
            probabilities: vec![0.9, 0.8],
        };
        assert!(ok.check_len(2).is_ok());
    }

    #[test]
    fn test_summary_excludes_outlier_bucket() {
        let summary = TopicSummary {
            topics: vec![
                TopicInfo {
                    topic_id: -1,
                    count: 5,
                    words: vec![],
                    representative_docs: vec![],
                    natural_label: None,
                    description: None,
                },
                TopicInfo {
                    topic_id: 0,
                    count: 20,
                    words: vec![],
                    representative_docs: vec![],
                    natural_label: None,
                    description: None,
                },
            ],
        };
        assert_eq!(summary.num_topics(), 1);
    }
}
