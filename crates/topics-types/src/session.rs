//! Training session records.
//!
//! One session row is created per attempt to build or extend the topic
//! model. A session starts `Running` and transitions exactly once to
//! `Completed` or `Failed`; a `Running` row must never outlive the run
//! that created it (the reaper fails rows whose runner crashed).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Run in progress
    Running,
    /// Run finished and results persisted
    Completed,
    /// Run aborted; `error_message` carries the cause
    Failed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// What kind of run the session records.
///
/// Transform runs get their own lightweight session row so "when was this
/// mapping computed" stays distinct from "which topic space does it use".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Full retraining of the topic space
    FullTrain,
    /// Incremental transform against an existing topic space
    Transform,
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKind::FullTrain => write!(f, "full_train"),
            SessionKind::Transform => write!(f, "transform"),
        }
    }
}

/// Effective model configuration recorded on the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Model family identifier (e.g. "bertopic")
    pub model_kind: String,

    /// Minimum cluster size passed to the clustering backend
    pub min_cluster_size: usize,

    /// Embedding model identifier
    pub embedding_model: String,

    /// Whether language-specific tokenization was enabled
    pub use_tokenizer: bool,

    /// Whether LLM labeling / short-content classification was enabled
    pub use_llm_labeling: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model_kind: "bertopic".to_string(),
            min_cluster_size: 10,
            embedding_model: "paraphrase-multilingual-MiniLM-L12-v2".to_string(),
            use_tokenizer: true,
            use_llm_labeling: false,
        }
    }
}

/// One training or transform attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSession {
    /// Unique identifier (ULID string), caller-visible
    pub session_id: String,

    /// Full train or incremental transform
    pub kind: SessionKind,

    /// Effective configuration for the run
    pub config: SessionConfig,

    /// Documents fed to the run
    pub num_documents: u64,

    /// Lifecycle state
    pub status: SessionStatus,

    /// When the run started
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,

    /// When the run reached a terminal state
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Non-outlier topics discovered (full train only)
    pub num_topics_found: Option<u64>,

    /// Documents assigned to the outlier bucket
    pub num_outliers: Option<u64>,

    /// Where the fitted model artifact was saved
    pub model_saved_path: Option<String>,

    /// Failure cause when status is `Failed`
    pub error_message: Option<String>,
}

impl TrainingSession {
    /// Open a new session in `Running` state with a fresh ULID.
    pub fn begin(kind: SessionKind, config: SessionConfig, num_documents: u64) -> Self {
        Self {
            session_id: Ulid::new().to_string(),
            kind,
            config,
            num_documents,
            status: SessionStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            num_topics_found: None,
            num_outliers: None,
            model_saved_path: None,
            error_message: None,
        }
    }

    /// Transition to `Completed` with result counts.
    pub fn complete(
        &mut self,
        num_topics_found: u64,
        num_outliers: u64,
        model_saved_path: Option<String>,
    ) {
        self.status = SessionStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.num_topics_found = Some(num_topics_found);
        self.num_outliers = Some(num_outliers);
        self.model_saved_path = model_saved_path;
    }

    /// Transition to `Failed` with the captured cause.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = SessionStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error_message = Some(message.into());
    }

    /// Whether this session's model artifact can back a transform run.
    pub fn is_usable_model(&self) -> bool {
        self.kind == SessionKind::FullTrain
            && self.status == SessionStatus::Completed
            && self.model_saved_path.is_some()
    }

    /// Wall-clock duration of the run, if terminal.
    pub fn duration_seconds(&self) -> Option<f64> {
        self.completed_at
            .map(|end| (end - self.started_at).num_milliseconds() as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_is_running() {
        let session = TrainingSession::begin(SessionKind::FullTrain, SessionConfig::default(), 42);
        assert_eq!(session.status, SessionStatus::Running);
        assert_eq!(session.num_documents, 42);
        assert!(session.completed_at.is_none());
        assert!(!session.session_id.is_empty());
    }

    #[test]
    fn test_complete_transition() {
        let mut session =
            TrainingSession::begin(SessionKind::FullTrain, SessionConfig::default(), 10);
        session.complete(3, 5, Some("data/models/x".to_string()));
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.num_topics_found, Some(3));
        assert_eq!(session.num_outliers, Some(5));
        assert!(session.completed_at.is_some());
        assert!(session.duration_seconds().is_some());
    }

    #[test]
    fn test_fail_records_message() {
        let mut session =
            TrainingSession::begin(SessionKind::FullTrain, SessionConfig::default(), 10);
        session.fail("fit blew up");
        assert_eq!(session.status, SessionStatus::Failed);
        assert_eq!(session.error_message.as_deref(), Some("fit blew up"));
        assert!(session.completed_at.is_some());
    }

    #[test]
    fn test_usable_model_requires_completed_full_train() {
        let mut full = TrainingSession::begin(SessionKind::FullTrain, SessionConfig::default(), 1);
        assert!(!full.is_usable_model());
        full.complete(2, 0, Some("data/models/y".to_string()));
        assert!(full.is_usable_model());

        let mut transform =
            TrainingSession::begin(SessionKind::Transform, SessionConfig::default(), 1);
        transform.complete(0, 0, None);
        assert!(!transform.is_usable_model());
    }

    #[test]
    fn test_serde_round_trip() {
        let session = TrainingSession::begin(SessionKind::Transform, SessionConfig::default(), 7);
        let json = serde_json::to_string(&session).unwrap();
        let parsed: TrainingSession = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.session_id, session.session_id);
        assert_eq!(parsed.kind, SessionKind::Transform);
        assert_eq!(parsed.status, SessionStatus::Running);
    }
}
