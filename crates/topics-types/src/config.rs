//! Configuration loading for the topic engine.
//!
//! Layered precedence: built-in defaults -> config file
//! (~/.config/article-topics/config.toml) -> environment variables
//! (TOPICS_*). Callers apply CLI flags after loading.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::CoreError;
use crate::session::SessionConfig;

/// Full-training settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Minimum cluster size passed to the clustering backend
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,

    /// Embedding model identifier recorded on the session
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Enable language-specific tokenization
    #[serde(default = "default_true")]
    pub use_tokenizer: bool,

    /// Enable LLM labeling and short-content classification
    #[serde(default)]
    pub use_llm_labeling: bool,

    /// Content length above which a document joins the corpus
    #[serde(default = "default_min_content_len")]
    pub min_content_len: usize,

    /// Directory where fitted model artifacts are saved
    #[serde(default = "default_model_dir")]
    pub model_dir: String,

    /// Hours a session may stay `Running` before the reaper fails it
    #[serde(default = "default_stale_session_hours")]
    pub stale_session_hours: u64,

    /// Advisory lease time-to-live in seconds
    #[serde(default = "default_lease_ttl_secs")]
    pub lease_ttl_secs: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: default_min_cluster_size(),
            embedding_model: default_embedding_model(),
            use_tokenizer: default_true(),
            use_llm_labeling: false,
            min_content_len: default_min_content_len(),
            model_dir: default_model_dir(),
            stale_session_hours: default_stale_session_hours(),
            lease_ttl_secs: default_lease_ttl_secs(),
        }
    }
}

impl TrainingConfig {
    /// Session config snapshot recorded on new sessions.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            model_kind: "bertopic".to_string(),
            min_cluster_size: self.min_cluster_size,
            embedding_model: self.embedding_model.clone(),
            use_tokenizer: self.use_tokenizer,
            use_llm_labeling: self.use_llm_labeling,
        }
    }
}

fn default_min_cluster_size() -> usize {
    10
}
fn default_embedding_model() -> String {
    "paraphrase-multilingual-MiniLM-L12-v2".to_string()
}
fn default_min_content_len() -> usize {
    100
}
fn default_model_dir() -> String {
    ProjectDirs::from("", "", "article-topics")
        .map(|p| p.data_local_dir().join("models"))
        .unwrap_or_else(|| PathBuf::from("./data/models"))
        .to_string_lossy()
        .to_string()
}
fn default_stale_session_hours() -> u64 {
    6
}
fn default_lease_ttl_secs() -> u64 {
    21_600
}
fn default_true() -> bool {
    true
}

/// Retrain/transform decision thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Days after which a periodic retrain is due
    #[serde(default = "default_retrain_after_days")]
    pub retrain_after_days: i64,

    /// Drift score above which a retrain is triggered
    #[serde(default = "default_drift_threshold")]
    pub drift_threshold: f64,

    /// New-document ratio above which a retrain is triggered
    #[serde(default = "default_new_data_ratio")]
    pub new_data_ratio: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            retrain_after_days: default_retrain_after_days(),
            drift_threshold: default_drift_threshold(),
            new_data_ratio: default_new_data_ratio(),
        }
    }
}

fn default_retrain_after_days() -> i64 {
    30
}
fn default_drift_threshold() -> f64 {
    0.3
}
fn default_new_data_ratio() -> f64 {
    0.2
}

/// Drift detection windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Recent window: documents created in the last N days
    #[serde(default = "default_recent_days")]
    pub recent_days: i64,

    /// Historical window: documents created between recent_days and N days ago
    #[serde(default = "default_historical_days")]
    pub historical_days: i64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            recent_days: default_recent_days(),
            historical_days: default_historical_days(),
        }
    }
}

fn default_recent_days() -> i64 {
    7
}
fn default_historical_days() -> i64 {
    30
}

/// Short-content classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Content length lower bound (exclusive)
    #[serde(default = "default_short_min_len")]
    pub min_len: usize,

    /// Content length upper bound (exclusive)
    #[serde(default = "default_short_max_len")]
    pub max_len: usize,

    /// Documents per LLM batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Flush persisted mappings every N successful classifications
    #[serde(default = "default_commit_every")]
    pub commit_every: usize,

    /// Cap on short documents fetched per run
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,

    /// Fixed probability recorded on classifier mappings
    #[serde(default = "default_classifier_probability")]
    pub probability: f64,

    /// Candidate keywords shown to the LLM per topic
    #[serde(default = "default_prompt_keywords")]
    pub prompt_keywords: usize,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            min_len: default_short_min_len(),
            max_len: default_short_max_len(),
            batch_size: default_batch_size(),
            commit_every: default_commit_every(),
            max_documents: default_max_documents(),
            probability: default_classifier_probability(),
            prompt_keywords: default_prompt_keywords(),
        }
    }
}

fn default_short_min_len() -> usize {
    20
}
fn default_short_max_len() -> usize {
    200
}
fn default_batch_size() -> usize {
    10
}
fn default_commit_every() -> usize {
    50
}
fn default_max_documents() -> usize {
    500
}
fn default_classifier_probability() -> f64 {
    0.8
}
fn default_prompt_keywords() -> usize {
    5
}

/// Top-level engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Path to the RocksDB store
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Corpus identifier used for the advisory training lease
    #[serde(default = "default_corpus_id")]
    pub corpus_id: String,

    /// Training settings
    #[serde(default)]
    pub training: TrainingConfig,

    /// Decision thresholds
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Drift windows
    #[serde(default)]
    pub drift: DriftConfig,

    /// Short-content classification settings
    #[serde(default)]
    pub classification: ClassificationConfig,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            corpus_id: default_corpus_id(),
            training: TrainingConfig::default(),
            policy: PolicyConfig::default(),
            drift: DriftConfig::default(),
            classification: ClassificationConfig::default(),
        }
    }
}

fn default_db_path() -> String {
    ProjectDirs::from("", "", "article-topics")
        .map(|p| p.data_local_dir().join("db"))
        .unwrap_or_else(|| PathBuf::from("./data/db"))
        .to_string_lossy()
        .to_string()
}

fn default_corpus_id() -> String {
    "articles".to_string()
}

impl EngineSettings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/article-topics/config.toml)
    /// 3. Explicit config file (optional, higher precedence)
    /// 4. Environment variables (TOPICS_*)
    pub fn load(config_path: Option<&str>) -> Result<Self, CoreError> {
        let config_dir = ProjectDirs::from("", "", "article-topics")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("TOPICS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| CoreError::Config(e.to_string()))?;

        // Missing keys fall back through the serde field defaults
        config
            .try_deserialize()
            .map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Validate threshold ranges.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.policy.drift_threshold) {
            return Err(format!(
                "policy.drift_threshold must be 0.0-1.0, got {}",
                self.policy.drift_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.policy.new_data_ratio) {
            return Err(format!(
                "policy.new_data_ratio must be 0.0-1.0, got {}",
                self.policy.new_data_ratio
            ));
        }
        if self.drift.recent_days >= self.drift.historical_days {
            return Err(format!(
                "drift.recent_days ({}) must be shorter than drift.historical_days ({})",
                self.drift.recent_days, self.drift.historical_days
            ));
        }
        if self.classification.min_len >= self.classification.max_len {
            return Err("classification.min_len must be below max_len".to_string());
        }
        if self.classification.batch_size == 0 || self.classification.commit_every == 0 {
            return Err("classification batch_size and commit_every must be > 0".to_string());
        }
        Ok(())
    }
}
