//! Stale session watchdog.
//!
//! A crash during a blocking `fit` leaves its session row `Running`
//! forever; nothing inside the run can transition it. Before every
//! decision the policy sweeps for `Running` rows past the configured
//! deadline and fails them, so a dead run never blocks transform
//! eligibility or poisons session history.

use chrono::{Duration, Utc};
use tracing::{info, warn};

use topics_storage::ModelStore;

use crate::error::ModelError;

/// Fail every session still `Running` after `max_age_hours`.
///
/// Returns the number of sessions reaped.
pub fn reap_stale_sessions(store: &ModelStore, max_age_hours: u64) -> Result<usize, ModelError> {
    let deadline = Utc::now() - Duration::hours(max_age_hours as i64);
    let mut reaped = 0;

    for mut session in store.running_sessions()? {
        if session.started_at < deadline {
            warn!(
                session_id = %session.session_id,
                started_at = %session.started_at,
                "Reaping stale running session"
            );
            session.fail(format!(
                "training watchdog: still running after {} hours",
                max_age_hours
            ));
            store.update_session(&session)?;
            reaped += 1;
        }
    }

    if reaped > 0 {
        info!(reaped = reaped, "Reaped stale sessions");
    }
    Ok(reaped)
}
