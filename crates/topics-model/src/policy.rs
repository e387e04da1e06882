//! Retrain/transform decision policy.
//!
//! Composes drift, elapsed time, and new-data volume into a single
//! verdict, then dispatches to the full trainer or the incremental
//! transformer. The decision itself is read-only and total: a signal
//! that cannot be read degrades to its no-evidence value instead of
//! aborting.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use topics_storage::{ModelStore, StorageError};
use topics_types::EngineSettings;

use crate::cluster::ClusterBackend;
use crate::drift::DriftDetector;
use crate::error::ModelError;
use crate::llm::LlmClient;
use crate::reaper::reap_stale_sessions;
use crate::report::{RunMethod, RunReport};
use crate::source::DocumentSource;
use crate::trainer::{FullTrainer, TrainRequest};
use crate::transformer::IncrementalTransformer;

/// A retrain/transform verdict with its cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// True for full retrain, false for incremental transform
    pub retrain: bool,
    /// Why the verdict fired
    pub reason: String,
}

impl Decision {
    fn retrain(reason: &str) -> Self {
        Self {
            retrain: true,
            reason: reason.to_string(),
        }
    }

    fn transform(reason: &str) -> Self {
        Self {
            retrain: false,
            reason: reason.to_string(),
        }
    }
}

/// Decides between full retraining and incremental transform, and runs
/// the chosen pipeline.
pub struct RetrainPolicy {
    store: Arc<ModelStore>,
    source: Arc<dyn DocumentSource>,
    backend: Arc<dyn ClusterBackend>,
    llm: Option<Arc<dyn LlmClient>>,
    settings: EngineSettings,
}

impl RetrainPolicy {
    /// Create a policy with its capability handles.
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

    /// Decide whether a full retrain is needed.
    ///
    /// Rules fire in order: forced, no previous training, periodic
    /// deadline, concept drift, new-data volume; otherwise the model is
    /// still fresh. Read-only, no side effects, always returns a
    /// verdict.
    #[instrument(skip(self))]
    pub fn decide(&self, force_full: bool) -> Decision {
        if force_full {
            return Decision::retrain("full training forced");
        }

        let last = match self.store.last_completed_training() {
            Ok(last) => last,
            Err(e) => {
                warn!("Could not read session history: {}", e);
                None
            }
        };
        let Some(last) = last else {
            return Decision::retrain("no previous training");
        };

        let days_since = (Utc::now() - last.started_at).num_days();
        if days_since >= self.settings.policy.retrain_after_days {
            info!(days_since = days_since, "Periodic retrain due");
            return Decision::retrain("periodic retrain due");
        }

        let drift = DriftDetector::new(self.store.clone(), self.settings.drift.clone()).score();
        if drift > self.settings.policy.drift_threshold {
            info!(drift = drift, "Concept drift detected");
            return Decision::retrain("concept drift detected");
        }

        let new_docs = self
            .source
            .count_created_after(last.started_at)
            .unwrap_or_else(|e| {
                warn!("Could not count new documents: {}", e);
                0
            });
        let total_docs = self.source.count_total().unwrap_or_else(|e| {
            warn!("Could not count documents: {}", e);
            0
        });
        if total_docs > 0 {
            let new_ratio = new_docs as f64 / total_docs as f64;
            if new_ratio > self.settings.policy.new_data_ratio {
                info!(new_ratio = new_ratio, "Significant new data");
                return Decision::retrain("significant new data");
            }
        }

        Decision::transform("model still fresh")
    }

    /// Decide, then run the chosen pipeline under the training lease.
    ///
    /// Always returns a report; failures land in its status and
    /// error message rather than unwinding to the caller.
    #[instrument(skip(self))]
    pub fn run(&self, force_full: bool, limit: Option<usize>) -> RunReport {
        // Fail sessions abandoned by a crashed runner before reading
        // history for the decision
        if let Err(e) = reap_stale_sessions(&self.store, self.settings.training.stale_session_hours)
        {
            warn!("Stale session sweep failed: {}", e);
        }

        let decision = self.decide(force_full);
        let method = if decision.retrain {
            RunMethod::FullTrain
        } else {
            RunMethod::Transform
        };
        info!(method = %method, reason = %decision.reason, "Dispatching");

        // One run per corpus at a time; the guard releases on all paths
        let _lease = match self.store.acquire_lease(
            &self.settings.corpus_id,
            "retrain-policy",
            self.settings.training.lease_ttl_secs,
        ) {
            Ok(guard) => guard,
            Err(e @ StorageError::LeaseHeld { .. }) => {
                warn!("{}", e);
                return RunReport::from_error(method, decision.reason, &ModelError::Storage(e));
            }
            Err(e) => {
                return RunReport::from_error(method, decision.reason, &ModelError::Storage(e));
            }
        };

        if decision.retrain {
            let trainer = FullTrainer::new(
                self.store.clone(),
                self.source.clone(),
                self.backend.clone(),
                self.llm.clone(),
                self.settings.clone(),
            );
            let request = TrainRequest {
                limit,
                ..TrainRequest::from_settings(&self.settings)
            };
            match trainer.train(request) {
                Ok(outcome) => RunReport::from_train(decision.reason, outcome),
                Err(e) => RunReport::from_error(RunMethod::FullTrain, decision.reason, &e),
            }
        } else {
            let transformer = IncrementalTransformer::new(
                self.store.clone(),
                self.source.clone(),
                self.backend.clone(),
                self.settings.clone(),
            );
            match transformer.transform() {
                Ok(outcome) => RunReport::from_transform(decision.reason, outcome),
                Err(e) => RunReport::from_error(RunMethod::Transform, decision.reason, &e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{Assignments, TopicSummary};
    use crate::source::InMemorySource;
    use chrono::Duration;
    use tempfile::TempDir;
    use topics_storage::Storage;
    use topics_types::{
        ArticleTopicMapping, Document, SessionConfig, SessionKind, TrainingSession,
    };

    /// Backend for decision tests; no pipeline is expected to run.
    struct NullBackend;

    impl ClusterBackend for NullBackend {
        fn fit(&self, _d: &[String]) -> Result<Assignments, ModelError> {
            Err(ModelError::Backend("not under test".into()))
        }
        fn transform(&self, _d: &[String]) -> Result<Assignments, ModelError> {
            Err(ModelError::Backend("not under test".into()))
        }
        fn topic_summary(&self) -> Result<TopicSummary, ModelError> {
            Err(ModelError::Backend("not under test".into()))
        }
        fn save(&self, _p: &str) -> Result<(), ModelError> {
            Ok(())
        }
        fn load(&self, _p: &str) -> Result<(), ModelError> {
            Ok(())
        }
    }

    fn open_store() -> (TempDir, Arc<ModelStore>) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ModelStore::new(Arc::new(Storage::open(dir.path()).unwrap())));
        (dir, store)
    }

    fn policy(store: Arc<ModelStore>, docs: Vec<Document>) -> RetrainPolicy {
        RetrainPolicy::new(
            store,
            Arc::new(InMemorySource::new(docs)),
            Arc::new(NullBackend),
            None,
            EngineSettings::default(),
        )
    }

    fn completed_training(store: &ModelStore, days_ago: i64) -> TrainingSession {
        let mut session =
            TrainingSession::begin(SessionKind::FullTrain, SessionConfig::default(), 100);
        session.started_at = Utc::now() - Duration::days(days_ago);
        session.complete(5, 2, Some("models/parent".to_string()));
        store.save_session(&session).unwrap();
        session
    }

    fn doc(id: i64, days_ago: i64) -> Document {
        Document::new(
            id,
            Some(format!("Article {}", id)),
            Some("x".repeat(150)),
            Utc::now() - Duration::days(days_ago),
        )
    }

    #[test]
    fn test_no_previous_training_wins_over_everything() {
        let (_dir, store) = open_store();
        // Plenty of new data, but no completed session exists
        let p = policy(store, (0..100).map(|i| doc(i, 0)).collect());
        let decision = p.decide(false);
        assert!(decision.retrain);
        assert_eq!(decision.reason, "no previous training");
    }

    #[test]
    fn test_force_full_short_circuits() {
        let (_dir, store) = open_store();
        completed_training(&store, 1);
        let p = policy(store, vec![doc(1, 10)]);
        let decision = p.decide(true);
        assert!(decision.retrain);
        assert_eq!(decision.reason, "full training forced");
    }

    #[test]
    fn test_periodic_retrain_due_at_31_days() {
        let (_dir, store) = open_store();
        completed_training(&store, 31);
        // No mappings at all, so drift is 0.0; old documents only
        let p = policy(store, vec![doc(1, 40)]);
        let decision = p.decide(false);
        assert!(decision.retrain);
        assert_eq!(decision.reason, "periodic retrain due");
    }

    #[test]
    fn test_drift_triggers_retrain() {
        let (_dir, store) = open_store();
        completed_training(&store, 10);

        // Recent window all topic 1, historical window all topic 0
        let now = Utc::now();
        let mappings: Vec<ArticleTopicMapping> = vec![
            ArticleTopicMapping::new(1, "s", "s", 1, 0.9, now - Duration::days(1)),
            ArticleTopicMapping::new(2, "s", "s", 1, 0.9, now - Duration::days(2)),
            ArticleTopicMapping::new(3, "s", "s", 0, 0.9, now - Duration::days(15)),
            ArticleTopicMapping::new(4, "s", "s", 0, 0.9, now - Duration::days(20)),
        ];
        store.save_mappings(&mappings).unwrap();

        let p = policy(store, vec![doc(1, 40)]);
        let decision = p.decide(false);
        assert!(decision.retrain);
        assert_eq!(decision.reason, "concept drift detected");
    }

    #[test]
    fn test_new_data_ratio_triggers_retrain() {
        let (_dir, store) = open_store();
        completed_training(&store, 10);
        // 3 of 10 documents arrived after the last session: ratio 0.3
        let mut docs: Vec<Document> = (0..7).map(|i| doc(i, 20)).collect();
        docs.extend((7..10).map(|i| doc(i, 1)));

        let p = policy(store, docs);
        let decision = p.decide(false);
        assert!(decision.retrain);
        assert_eq!(decision.reason, "significant new data");
    }

    #[test]
    fn test_fresh_model_transforms() {
        let (_dir, store) = open_store();
        completed_training(&store, 2);
        // One new document out of twenty: ratio 0.05, no drift evidence
        let mut docs: Vec<Document> = (0..19).map(|i| doc(i, 30)).collect();
        docs.push(doc(19, 1));

        let p = policy(store, docs);
        let decision = p.decide(false);
        assert!(!decision.retrain);
        assert_eq!(decision.reason, "model still fresh");
    }

    #[test]
    fn test_run_reports_lease_conflict_as_error() {
        let (_dir, store) = open_store();
        completed_training(&store, 2);
        let settings = EngineSettings::default();
        let _held = store
            .acquire_lease(&settings.corpus_id, "other-runner", 600)
            .unwrap();

        let p = policy(store, vec![doc(1, 30)]);
        let report = p.run(false, None);
        assert_eq!(report.status, crate::report::RunStatus::Error);
        assert!(report
            .error_message
            .unwrap()
            .contains("held by 'other-runner'"));
    }

    #[test]
    fn test_run_reaps_stale_sessions_before_deciding() {
        let (_dir, store) = open_store();
        // A running session abandoned two days ago; no completed one
        let mut stale =
            TrainingSession::begin(SessionKind::FullTrain, SessionConfig::default(), 10);
        stale.started_at = Utc::now() - Duration::hours(48);
        store.save_session(&stale).unwrap();

        let p = policy(store.clone(), Vec::new());
        // Empty corpus: full train is chosen, then errors with NoCorpus
        let report = p.run(false, None);
        assert_eq!(report.method, RunMethod::FullTrain);
        assert_eq!(report.reason, "no previous training");
        assert_eq!(report.status, crate::report::RunStatus::Error);

        let reaped = store.get_session(&stale.session_id).unwrap().unwrap();
        assert_eq!(reaped.status, topics_types::SessionStatus::Failed);
    }

    #[test]
    fn test_run_releases_lease_after_failure() {
        let (_dir, store) = open_store();
        let p = policy(store.clone(), Vec::new());
        // First run errors with NoCorpus but must release the lease
        let first = p.run(false, None);
        assert_eq!(first.status, crate::report::RunStatus::Error);

        let settings = EngineSettings::default();
        assert!(store
            .acquire_lease(&settings.corpus_id, "next-runner", 60)
            .is_ok());
    }
}
