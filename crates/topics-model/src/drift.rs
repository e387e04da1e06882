//! Concept drift detection.
//!
//! Compares the topic-assignment mix of recently created documents
//! against a historical window. A score near 0 means a stable topic
//! mix; a score near 1 means complete turnover.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, warn};

use topics_storage::ModelStore;
use topics_types::DriftConfig;

use crate::error::ModelError;

/// Scores topic-distribution change between two time windows.
pub struct DriftDetector {
    store: Arc<ModelStore>,
    config: DriftConfig,
}

impl DriftDetector {
    /// Create a detector over the given store and windows.
    pub fn new(store: Arc<ModelStore>, config: DriftConfig) -> Self {
        Self { store, config }
    }

    /// Drift score in [0, 1].
    ///
    /// Returns 0.0 when either window holds no mapped documents: no
    /// evidence of drift is not evidence of maximal drift. Read errors
    /// also degrade to 0.0 so the decision policy always gets a value.
    pub fn score(&self) -> f64 {
        match self.try_score() {
            Ok(score) => score,
            Err(e) => {
                warn!("Could not compute drift score: {}", e);
                0.0
            }
        }
    }

    /// Drift score, surfacing read errors.
    pub fn try_score(&self) -> Result<f64, ModelError> {
        let now = Utc::now();
        let recent_start = now - Duration::days(self.config.recent_days);
        let historical_start = now - Duration::days(self.config.historical_days);

        let recent = self.store.mapping_histogram(recent_start, now)?;
        let historical = self
            .store
            .mapping_histogram(historical_start, recent_start)?;

        if recent.is_empty() || historical.is_empty() {
            debug!("Drift window empty; scoring 0.0");
            return Ok(0.0);
        }

        let recent_total: u64 = recent.values().sum();
        let historical_total: u64 = historical.values().sum();

        let all_topics: HashSet<i32> = recent.keys().chain(historical.keys()).copied().collect();

        // Half the total variation distance between the two distributions
        let mut divergence = 0.0;
        for topic in all_topics {
            let r = *recent.get(&topic).unwrap_or(&0) as f64 / recent_total as f64;
            let h = *historical.get(&topic).unwrap_or(&0) as f64 / historical_total as f64;
            divergence += (r - h).abs();
        }
        let score = divergence / 2.0;

        debug!(score = score, "Computed drift score");
        Ok(score)
    }
}
