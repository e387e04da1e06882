//! # topics-model
//!
//! Decision and pipeline layer of the article topic-model engine.
//!
//! On every invocation the engine either fully retrains the topic model
//! or incrementally transforms newly arrived documents against the
//! existing one:
//! - `RetrainPolicy` composes drift, elapsed time, and new-data volume
//!   into a single retrain/transform verdict and dispatches
//! - `FullTrainer` runs corpus load -> fit -> persistence
//! - `IncrementalTransformer` maps new documents into the existing
//!   topic space without altering topic definitions
//! - `ShortContentClassifier` assigns sub-threshold documents through
//!   the LLM capability
//! - `DriftDetector` scores topic-mix change between time windows
//!
//! The clustering engine and the LLM are injected capabilities
//! (`ClusterBackend`, `LlmClient`); nothing here is process-global.

pub mod classifier;
pub mod cluster;
pub mod drift;
pub mod error;
pub mod llm;
pub mod policy;
pub mod reaper;
pub mod report;
pub mod source;
pub mod trainer;
pub mod transformer;

pub use classifier::{ClassificationStats, ShortContentClassifier};
pub use cluster::{Assignments, ClusterBackend, TopicInfo, TopicSummary};
pub use drift::DriftDetector;
pub use error::ModelError;
pub use llm::{LlmClient, NoOpLlmClient};
pub use policy::{Decision, RetrainPolicy};
pub use reaper::reap_stale_sessions;
pub use report::{RunMethod, RunReport, RunStatus, TopicBrief};
pub use source::{DocumentSource, InMemorySource};
pub use trainer::{FullTrainer, TrainOutcome, TrainRequest};
pub use transformer::{IncrementalTransformer, TransformOutcome};
