//! Structured run results.
//!
//! Every invocation of the policy produces a `RunReport` describing
//! which path ran, why, and how it ended. The report always carries a
//! status; failure statuses always carry a human-readable message.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::trainer::TrainOutcome;
use crate::transformer::TransformOutcome;

/// Which pipeline the policy dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMethod {
    /// Full retraining over the current corpus
    FullTrain,
    /// Incremental transform against the existing topic space
    Transform,
}

impl std::fmt::Display for RunMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMethod::FullTrain => write!(f, "full_train"),
            RunMethod::Transform => write!(f, "transform"),
        }
    }
}

/// How the dispatched run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Pipeline ran to completion
    Completed,
    /// Pipeline started and failed; its session is marked failed
    Failed,
    /// Run could not start (no corpus, no model, lease held)
    Error,
}

/// Compact topic description for report payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicBrief {
    /// Backend-assigned topic id
    pub topic_id: i32,
    /// Documents assigned during the fit
    pub count: u64,
    /// Top keyword words
    pub keywords: Vec<String>,
    /// Natural-language label, when available
    pub label: Option<String>,
    /// Natural-language description, when available
    pub description: Option<String>,
}

/// Result of one policy invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Pipeline that ran
    pub method: RunMethod,
    /// Why the policy chose it
    pub reason: String,
    /// Terminal state of the run
    pub status: RunStatus,
    /// Session recorded for the run, when one was created
    pub session_id: Option<String>,
    /// Documents fed to the run
    pub num_documents: u64,
    /// Non-outlier topics discovered (full train only)
    pub num_topics: u64,
    /// Documents assigned to the outlier bucket
    pub num_outliers: u64,
    /// Mappings written
    pub num_mapped: u64,
    /// Wall-clock duration of the run
    pub duration_seconds: f64,
    /// Largest topics by document count
    pub top_topics: Vec<TopicBrief>,
    /// Short documents classified through the LLM (full train only)
    pub short_docs_classified: u64,
    /// Failure cause when status is not `Completed`
    pub error_message: Option<String>,
}

impl RunReport {
    /// Report for a completed full training run.
    pub fn from_train(reason: impl Into<String>, outcome: TrainOutcome) -> Self {
        Self {
            method: RunMethod::FullTrain,
            reason: reason.into(),
            status: RunStatus::Completed,
            session_id: Some(outcome.session_id),
            num_documents: outcome.num_documents,
            num_topics: outcome.num_topics,
            num_outliers: outcome.num_outliers,
            num_mapped: outcome.num_mapped,
            duration_seconds: outcome.duration_seconds,
            top_topics: outcome.top_topics,
            short_docs_classified: outcome.short_docs_classified,
            error_message: None,
        }
    }

    /// Report for a completed transform run.
    pub fn from_transform(reason: impl Into<String>, outcome: TransformOutcome) -> Self {
        Self {
            method: RunMethod::Transform,
            reason: reason.into(),
            status: RunStatus::Completed,
            session_id: outcome.session_id,
            num_documents: outcome.processed,
            num_topics: 0,
            num_outliers: outcome.outliers,
            num_mapped: outcome.mapped,
            duration_seconds: outcome.duration_seconds,
            top_topics: Vec::new(),
            short_docs_classified: 0,
            error_message: None,
        }
    }

    /// Report for a run that failed or could not start.
    ///
    /// `Training` failures map to `Failed` (a session exists and is
    /// marked failed); everything else maps to `Error`.
    pub fn from_error(method: RunMethod, reason: impl Into<String>, error: &ModelError) -> Self {
        let (status, session_id) = match error {
            ModelError::Training { session_id, .. } => {
                (RunStatus::Failed, Some(session_id.clone()))
            }
            _ => (RunStatus::Error, None),
        };
        Self {
            method,
            reason: reason.into(),
            status,
            session_id,
            num_documents: 0,
            num_topics: 0,
            num_outliers: 0,
            num_mapped: 0,
            duration_seconds: 0.0,
            top_topics: Vec::new(),
            short_docs_classified: 0,
            error_message: Some(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&RunMethod::FullTrain).unwrap(),
            "\"full_train\""
        );
        assert_eq!(
            serde_json::to_string(&RunMethod::Transform).unwrap(),
            "\"transform\""
        );
    }

    #[test]
    fn test_error_report_carries_message() {
        let report = RunReport::from_error(
            RunMethod::Transform,
            "model still fresh",
            &ModelError::NoModel("no completed training session".to_string()),
        );
        assert_eq!(report.status, RunStatus::Error);
        assert!(report.error_message.unwrap().contains("No usable model"));
        assert!(report.session_id.is_none());
    }

    #[test]
    fn test_training_failure_report_is_failed_with_session() {
        let report = RunReport::from_error(
            RunMethod::FullTrain,
            "concept drift detected",
            &ModelError::Training {
                session_id: "01ABC".to_string(),
                message: "fit blew up".to_string(),
            },
        );
        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.session_id.as_deref(), Some("01ABC"));
    }
}
