//! Execution-tier capability probing.
//!
//! The worker pool can run in one of three tiers: a baseline single-threaded
//! worker, a multi-threaded shared-memory worker, or a legacy plugin engine.
//! Probe order is fixed and short-circuits: a higher tier is only probed when
//! its prerequisite holds, and a probe that panics or errors reads as
//! unsupported. The platform half is computed once per process.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

use once_cell::sync::Lazy;

/// Named capability the legacy-plugin watchdog is asked about.
pub const LEGACY_PLUGIN_CAPABILITY: &str = "engine";

/// Largest hash table the controller will request, regardless of preference.
pub const MAX_HASH_MB: u32 = 512;

const TRANSFER_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Cached readiness checks for named legacy-plugin capabilities. External
/// collaborator; implementations are expected to answer from cache.
pub trait PluginWatchdog: Send + Sync {
    fn is_ready(&self, capability: &str) -> bool;
}

/// Which execution tiers the host can run. Computed once per controller and
/// immutable for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    /// Single-threaded worker on a 64-bit host.
    pub baseline: bool,
    /// Multi-threaded shared-memory worker.
    pub threads: bool,
    /// Legacy plugin engine, per the watchdog.
    pub plugin: bool,
}

impl Capability {
    /// At least one tier the pool can actually run.
    pub fn usable(&self) -> bool {
        self.baseline
    }
}

struct PlatformProbe {
    sixty_four_bit: bool,
    threaded: bool,
    parallelism: u32,
}

static PLATFORM: Lazy<PlatformProbe> = Lazy::new(|| {
    let sixty_four_bit = cfg!(target_pointer_width = "64");
    let parallelism = thread::available_parallelism().map(|n| n.get() as u32).unwrap_or(1);
    // Short-circuit: the threaded tier is only probed on a baseline host.
    let threaded = sixty_four_bit && parallelism >= 2 && probe_structured_transfer();
    if !sixty_four_bit {
        log::info!("32-bit host, no analysis tier available");
    }
    log::debug!("platform probe: 64bit={sixty_four_bit} threads={threaded} cores={parallelism}");
    PlatformProbe { sixty_four_bit, threaded, parallelism }
});

/// Round-trip a structured message through a scratch thread. Exercises both
/// thread spawning and structured transfer across the context boundary; any
/// failure or panic reads as unsupported.
fn probe_structured_transfer() -> bool {
    let result = catch_unwind(|| {
        let (tx, rx) = crossbeam_channel::bounded::<String>(1);
        let spawned = thread::Builder::new().name("kibitz-probe".into()).spawn(move || {
            let payload = serde_json::json!({ "probe": "transfer", "bits": 64usize });
            let _ = tx.send(payload.to_string());
        });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                log::debug!("transfer probe could not spawn: {e}");
                return false;
            }
        };
        let echoed = rx.recv_timeout(TRANSFER_PROBE_TIMEOUT);
        let _ = handle.join();
        match echoed {
            Ok(raw) => serde_json::from_str::<serde_json::Value>(&raw)
                .map(|value| value["probe"] == "transfer")
                .unwrap_or(false),
            Err(_) => false,
        }
    });
    result.unwrap_or(false)
}

/// Probe the execution tiers. The watchdog is only consulted for the plugin
/// tier and is panic-isolated like every other probe.
pub fn detect(watchdog: Option<&dyn PluginWatchdog>) -> Capability {
    let platform = &*PLATFORM;
    let baseline = platform.sixty_four_bit;
    let threads = platform.threaded;
    let plugin = baseline
        && watchdog
            .map(|w| {
                catch_unwind(AssertUnwindSafe(|| w.is_ready(LEGACY_PLUGIN_CAPABILITY)))
                    .unwrap_or(false)
            })
            .unwrap_or(false);
    Capability { baseline, threads, plugin }
}

/// Upper bound for the thread-count preference.
pub fn max_threads() -> u32 {
    PLATFORM.parallelism
}
