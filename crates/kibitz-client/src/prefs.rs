//! The controller's persisted preference set.
//!
//! One stored value per `{prefix}.{name}` key. Reads happen at use time, not
//! construction time, so a preference changed in another instance is picked
//! up by the next request.

use std::sync::Arc;

use crate::estimator::DEFAULT_DEPTH;
use crate::store::{SignalStore, StoredProp};

const DEFAULT_THREADS: u32 = 1;
const DEFAULT_HASH_MB: u32 = 16;

#[derive(Clone)]
pub struct EnginePrefs {
    /// Requested depth ceiling; overwritten by the depth estimator.
    pub depth: StoredProp<u32>,
    /// Candidate-line count, parsed at request time.
    pub multi_pv: StoredProp<u32>,
    pub threads: StoredProp<u32>,
    pub hash_mb: StoredProp<u32>,
    /// Search until stopped, ignoring the depth ceiling.
    pub infinite: StoredProp<bool>,
    pub enabled: StoredProp<bool>,
    /// Last position an evaluation was emitted for; cross-instance dedup.
    pub last_fen: StoredProp<String>,
}

impl EnginePrefs {
    pub fn new(store: &Arc<dyn SignalStore>, prefix: &str, default_multi_pv: u32) -> Self {
        let key = |name: &str| format!("{prefix}.{name}");
        EnginePrefs {
            depth: StoredProp::new(store.clone(), key("depth"), DEFAULT_DEPTH),
            multi_pv: StoredProp::new(store.clone(), key("multipv"), default_multi_pv),
            threads: StoredProp::new(store.clone(), key("threads"), DEFAULT_THREADS),
            hash_mb: StoredProp::new(store.clone(), key("hash"), DEFAULT_HASH_MB),
            infinite: StoredProp::new(store.clone(), key("infinite"), false),
            enabled: StoredProp::new(store.clone(), key("enabled"), true),
            last_fen: StoredProp::new(store.clone(), key("fen"), String::new()),
        }
    }
}
