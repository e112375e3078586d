//! Live model reference
//!
//! Predictions read the currently published [`ModelSet`] through a cloned
//! `Arc`; publishing a new set replaces that `Arc` in a single write, so a
//! reader sees either the old set or the new one in full.

use crate::artifact::ModelSet;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

/// Swappable holder of the published model set
pub struct LiveModel {
    current: RwLock<Option<Arc<ModelSet>>>,
}

impl LiveModel {
    /// Empty holder; predictions fail as not ready until a set is published
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// Holder with an initial set, published as-is
    pub fn with_model(set: ModelSet) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(set))),
        }
    }

    /// The published set, if any
    pub fn current(&self) -> Option<Arc<ModelSet>> {
        self.current.read().clone()
    }

    /// Version of the published set, 0 when none
    pub fn version(&self) -> u64 {
        self.current.read().as_ref().map_or(0, |s| s.version)
    }

    pub fn is_ready(&self) -> bool {
        self.current.read().is_some()
    }

    /// Publish a new set.
    ///
    /// The set keeps its own version when that is already past the current
    /// one; otherwise it is numbered one past the current version. Returns
    /// the published version.
    pub fn publish(&self, mut set: ModelSet) -> u64 {
        let mut current = self.current.write();
        let previous = current.as_ref().map_or(0, |s| s.version);
        set.version = set.version.max(previous + 1);
        let version = set.version;
        *current = Some(Arc::new(set));
        drop(current);

        info!(version, previous, "published model set");
        version
    }
}

impl Default for LiveModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_publish_increments_version() {
        let live = LiveModel::new();
        assert!(!live.is_ready());
        assert_eq!(live.version(), 0);

        assert_eq!(live.publish(ModelSet::new(Utc::now())), 1);
        let held = live.current().unwrap();
        assert_eq!(live.publish(ModelSet::new(Utc::now())), 2);

        // readers holding the old set keep it
        assert_eq!(held.version, 1);
        assert_eq!(live.current().unwrap().version, 2);
    }

    #[test]
    fn test_loaded_version_is_respected() {
        let mut set = ModelSet::new(Utc::now());
        set.version = 7;
        let live = LiveModel::with_model(set);
        assert_eq!(live.version(), 7);
        assert_eq!(live.publish(ModelSet::new(Utc::now())), 8);

        let mut ahead = ModelSet::new(Utc::now());
        ahead.version = 9;
        assert_eq!(live.publish(ahead), 9);
    }
}
