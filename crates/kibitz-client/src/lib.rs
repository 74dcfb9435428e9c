//! Engine-evaluation pool controller.
//!
//! Turns a step history of board positions into supersedable background
//! analysis requests against an opaque worker pool, adapts the requested
//! search depth to observed throughput, and relays ordered, rate-limited
//! results. Domain types live in [`kibitz_core`].
//!
//! The entry point is [`EvalController`], built from a [`ControllerConfig`]
//! and an [`EvalPool`] implementation:
//!
//! ```no_run
//! use std::sync::Arc;
//! use kibitz_client::{ControllerConfig, EvalController, MemoryStore};
//! # fn make_pool() -> Box<dyn kibitz_client::EvalPool> { unimplemented!() }
//!
//! let store = Arc::new(MemoryStore::new());
//! let config = ControllerConfig::new("analysis", store, Arc::new(|_, _| 0.5));
//! let ctrl = EvalController::new(config, make_pool());
//! assert!(ctrl.possible() || !ctrl.enabled());
//! ```

pub mod capability;
pub mod controller;
pub mod coordinator;
pub mod error;
pub mod estimator;
pub mod output;
pub mod pool;
pub mod prefs;
pub mod store;

pub use capability::{Capability, PluginWatchdog};
pub use controller::{
    ControllerConfig, EvalController, HiddenFn, Hovering, RefreshFn, RequestState,
};
pub use coordinator::LivenessSignal;
pub use error::StoreError;
pub use estimator::{DepthEstimator, DEFAULT_DEPTH, MAX_DEPTH};
pub use output::{EmitFn, EvalContext, EMIT_INTERVAL};
pub use pool::{AnalysisRequest, EvalPool, EvalSink};
pub use prefs::EnginePrefs;
pub use store::{MemoryStore, SignalStore, StoredProp};
