//! # topics-types
//!
//! Shared domain types for the article topic-model engine.
//!
//! This crate defines the records persisted by the model store and the
//! layered configuration used across the workspace:
//! - Training sessions: one row per attempt to build or extend the model
//! - Discovered topics: clusters found by a training run
//! - Article mappings: article-to-topic assignments with confidence
//! - Documents: the read-only corpus view consumed by the pipelines

pub mod config;
pub mod document;
pub mod error;
pub mod mapping;
pub mod session;
pub mod topic;

pub use config::{
    ClassificationConfig, DriftConfig, EngineSettings, PolicyConfig, TrainingConfig,
};
pub use document::Document;
pub use error::CoreError;
pub use mapping::ArticleTopicMapping;
pub use session::{SessionConfig, SessionKind, SessionStatus, TrainingSession};
pub use topic::{DiscoveredTopic, TopicKeyword, OUTLIER_TOPIC_ID};
