//! ---
//! wft_section: "02-data-model"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Shared schema definitions for every data tier."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use std::fmt;

use chrono::{DateTime, Utc};
use wft_common::time::hour_key;

/// `(sim_run_id, farm_id, hour)` triple identifying a unit of idempotent
/// reprocessing. Rendered as `run|farm|YYYY-MM-DDTHH:00:00Z` in processed-key
/// stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    pub sim_run_id: String,
    pub farm_id: String,
    pub hour_key: String,
}

impl BucketKey {
    pub fn new(
        sim_run_id: impl Into<String>,
        farm_id: impl Into<String>,
        hour_key: impl Into<String>,
    ) -> Self {
        Self {
            sim_run_id: sim_run_id.into(),
            farm_id: farm_id.into(),
            hour_key: hour_key.into(),
        }
    }

    /// Bucket of an event timestamp; the hour is truncated in UTC.
    pub fn for_event(sim_run_id: &str, farm_id: &str, event_time: DateTime<Utc>) -> Self {
        Self::new(sim_run_id, farm_id, hour_key(event_time))
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.sim_run_id, self.farm_id, self.hour_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn events_in_same_hour_share_a_bucket() {
        let a = Utc.with_ymd_and_hms(2026, 1, 5, 2, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 1, 5, 2, 59, 59).unwrap();
        let c = Utc.with_ymd_and_hms(2026, 1, 5, 3, 0, 0).unwrap();
        assert_eq!(
            BucketKey::for_event("SIM-A", "F001", a),
            BucketKey::for_event("SIM-A", "F001", b)
        );
        assert_ne!(
            BucketKey::for_event("SIM-A", "F001", b),
            BucketKey::for_event("SIM-A", "F001", c)
        );
        assert_ne!(
            BucketKey::for_event("SIM-A", "F001", a),
            BucketKey::for_event("SIM-B", "F001", a)
        );
    }
}
