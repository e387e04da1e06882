//! End-to-end pipeline tests for the topic engine.
//!
//! Exercises the full decision loop against a real RocksDB store:
//! first invocation trains from scratch, later invocations transform
//! new documents against the persisted model, and a forced run retrains
//! over everything.

use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use tempfile::TempDir;

use topics_model::{
    Assignments, ClusterBackend, InMemorySource, ModelError, RetrainPolicy, RunMethod, RunStatus,
    TopicInfo, TopicSummary,
};
use topics_storage::{ModelStore, Storage};
use topics_types::{Document, EngineSettings, SessionKind, SessionStatus, TopicKeyword};

/// Backend that assigns round-robin topics and remembers saved/loaded
/// artifact paths.
struct RoundRobinBackend {
    num_topics: i32,
    outlier_every: usize,
    saved: Mutex<Vec<String>>,
    loaded: Mutex<Vec<String>>,
}

impl RoundRobinBackend {
    fn new(num_topics: i32, outlier_every: usize) -> Self {
        Self {
            num_topics,
            outlier_every,
            saved: Mutex::new(Vec::new()),
            loaded: Mutex::new(Vec::new()),
        }
    }

    fn assign(&self, documents: &[String]) -> Assignments {
        let mut topic_ids = Vec::with_capacity(documents.len());
        let mut probabilities = Vec::with_capacity(documents.len());
        for i in 0..documents.len() {
            if self.outlier_every > 0 && (i + 1) % self.outlier_every == 0 {
                topic_ids.push(-1);
                probabilities.push(0.0);
            } else {
                topic_ids.push(i as i32 % self.num_topics);
                probabilities.push(0.9);
            }
        }
        Assignments {
            topic_ids,
            probabilities,
        }
    }
}

impl ClusterBackend for RoundRobinBackend {
    fn fit(&self, documents: &[String]) -> Result<Assignments, ModelError> {
        Ok(self.assign(documents))
    }

    fn transform(&self, documents: &[String]) -> Result<Assignments, ModelError> {
        Ok(self.assign(documents))
    }

    fn topic_summary(&self) -> Result<TopicSummary, ModelError> {
        let mut topics: Vec<TopicInfo> = (0..self.num_topics)
            .map(|id| TopicInfo {
                topic_id: id,
                count: 10,
                words: vec![
                    TopicKeyword::new(format!("keyword-{}", id), 0.9),
                    TopicKeyword::new("shared", 0.4),
                ],
                representative_docs: vec![format!("doc for topic {}", id)],
                natural_label: Some(format!("Topic {}", id)),
                description: None,
            })
            .collect();
        topics.push(TopicInfo {
            topic_id: -1,
            count: 5,
            words: vec![],
            representative_docs: vec![],
            natural_label: None,
            description: None,
        });
        Ok(TopicSummary { topics })
    }

    fn save(&self, path: &str) -> Result<(), ModelError> {
        self.saved.lock().unwrap().push(path.to_string());
        Ok(())
    }

    fn load(&self, path: &str) -> Result<(), ModelError> {
        self.loaded.lock().unwrap().push(path.to_string());
        Ok(())
    }
}

fn article(id: i64, days_ago: i64) -> Document {
    Document::new(
        id,
        Some(format!("Headline {}", id)),
        Some(format!("{} body text", "x".repeat(140))),
        Utc::now() - Duration::days(days_ago),
    )
}

fn harness(docs: Vec<Document>) -> (TempDir, Arc<ModelStore>, RetrainPolicy) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ModelStore::new(Arc::new(Storage::open(dir.path()).unwrap())));
    let policy = RetrainPolicy::new(
        store.clone(),
        Arc::new(InMemorySource::new(docs)),
        Arc::new(RoundRobinBackend::new(3, 0)),
        None,
        EngineSettings::default(),
    );
    (dir, store, policy)
}

#[test]
fn test_first_run_trains_from_scratch() {
    let docs: Vec<Document> = (1..=20).map(|i| article(i, 40)).collect();
    let (_dir, store, policy) = harness(docs);

    let report = policy.run(false, None);
    assert_eq!(report.method, RunMethod::FullTrain);
    assert_eq!(report.reason, "no previous training");
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.num_documents, 20);
    assert_eq!(report.num_topics, 3);
    assert!(!report.top_topics.is_empty());

    let session_id = report.session_id.unwrap();
    let session = store.get_session(&session_id).unwrap().unwrap();
    assert_eq!(session.kind, SessionKind::FullTrain);
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(
        store.count_mappings_for_session(&session_id).unwrap(),
        report.num_mapped
    );
}

#[test]
fn test_second_run_transforms_new_documents() {
    // 20 articles outside the drift windows plus 2 current ones; all of
    // them are part of the first training corpus
    let mut docs: Vec<Document> = (1..=20).map(|i| article(i, 40)).collect();
    docs.push(article(100, 0));
    docs.push(article(101, 0));

    let (_dir, store, policy) = harness(docs);

    let first = policy.run(false, None);
    assert_eq!(first.status, RunStatus::Completed);
    let train_session = first.session_id.unwrap();

    // All 22 documents were part of the training corpus; the transform
    // run should find nothing new until fresh articles arrive.
    let second = policy.run(false, None);
    assert_eq!(second.method, RunMethod::Transform);
    assert_eq!(second.reason, "model still fresh");
    assert_eq!(second.status, RunStatus::Completed);
    assert_eq!(second.num_documents, 0);
    assert!(second.session_id.is_none());

    // The training session is still the only one with topics
    let topics = store.topics_for_session(&train_session).unwrap();
    assert_eq!(topics.len(), 4); // 3 topics + outlier bucket
}

#[test]
fn test_transform_run_records_lightweight_session() {
    let old_docs: Vec<Document> = (1..=20).map(|i| article(i, 20)).collect();
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ModelStore::new(Arc::new(Storage::open(dir.path()).unwrap())));
    let backend = Arc::new(RoundRobinBackend::new(3, 0));

    // Train over the old corpus
    let train_policy = RetrainPolicy::new(
        store.clone(),
        Arc::new(InMemorySource::new(old_docs.clone())),
        backend.clone(),
        None,
        EngineSettings::default(),
    );
    let first = train_policy.run(false, None);
    assert_eq!(first.status, RunStatus::Completed);
    let parent_id = first.session_id.unwrap();

    // New articles arrive; rebuild the policy over the larger corpus
    let mut docs = old_docs;
    docs.push(article(200, 0));
    docs.push(article(201, 0));
    let policy = RetrainPolicy::new(
        store.clone(),
        Arc::new(InMemorySource::new(docs)),
        backend.clone(),
        None,
        EngineSettings::default(),
    );

    let second = policy.run(false, None);
    assert_eq!(second.method, RunMethod::Transform);
    assert_eq!(second.status, RunStatus::Completed);
    assert_eq!(second.num_documents, 2);

    // The transform recorded its own session of kind Transform
    let transform_id = second.session_id.unwrap();
    assert_ne!(transform_id, parent_id);
    let session = store.get_session(&transform_id).unwrap().unwrap();
    assert_eq!(session.kind, SessionKind::Transform);
    assert_eq!(session.status, SessionStatus::Completed);

    // Its mappings point into the parent's topic space
    let mappings = store.mappings_for_session(&transform_id).unwrap();
    assert_eq!(mappings.len() as u64, second.num_mapped);
    assert!(mappings.iter().all(|m| m.topic_session_id == parent_id));

    // The model artifact loaded was the one the parent saved
    assert_eq!(
        backend.loaded.lock().unwrap().last(),
        backend.saved.lock().unwrap().last()
    );
}

#[test]
fn test_forced_run_retrains_fresh_model() {
    let docs: Vec<Document> = (1..=20).map(|i| article(i, 10)).collect();
    let (_dir, store, policy) = harness(docs);

    let first = policy.run(false, None);
    assert_eq!(first.status, RunStatus::Completed);

    let forced = policy.run(true, None);
    assert_eq!(forced.method, RunMethod::FullTrain);
    assert_eq!(forced.reason, "full training forced");
    assert_eq!(forced.status, RunStatus::Completed);

    // Two completed full-training sessions now exist
    let sessions = store.list_sessions(10).unwrap();
    let full_trains = sessions
        .iter()
        .filter(|s| s.kind == SessionKind::FullTrain && s.status == SessionStatus::Completed)
        .count();
    assert_eq!(full_trains, 2);
}

#[test]
fn test_outliers_never_materialize_as_mappings() {
    // Every third document is an outlier
    let docs: Vec<Document> = (1..=30).map(|i| article(i, 5)).collect();
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ModelStore::new(Arc::new(Storage::open(dir.path()).unwrap())));
    let policy = RetrainPolicy::new(
        store.clone(),
        Arc::new(InMemorySource::new(docs)),
        Arc::new(RoundRobinBackend::new(3, 3)),
        None,
        EngineSettings::default(),
    );

    let report = policy.run(false, None);
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.num_outliers, 10);
    assert_eq!(report.num_mapped, 20);

    let session_id = report.session_id.unwrap();
    let mappings = store.mappings_for_session(&session_id).unwrap();
    assert_eq!(mappings.len(), 20);
    assert!(mappings.iter().all(|m| m.topic_id != -1));
}

#[test]
fn test_empty_corpus_reports_error_status() {
    let (_dir, _store, policy) = harness(Vec::new());
    let report = policy.run(false, None);
    assert_eq!(report.method, RunMethod::FullTrain);
    assert_eq!(report.status, RunStatus::Error);
    assert!(report
        .error_message
        .unwrap()
        .contains("No documents found"));
}
