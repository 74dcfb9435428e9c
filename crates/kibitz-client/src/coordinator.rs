//! Cross-instance coordination over the shared store.
//!
//! A controller announces itself on creation and yields when another
//! instance reports an active game: analysing in the background while the
//! user is playing elsewhere wastes the machine. Strictly best effort; lost
//! or duplicate signals only cost or save some analysis work.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::controller::{ControlState, RefreshFn};
use crate::store::SignalStore;

/// Payload broadcast under the liveness key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessSignal {
    /// Identifies the announcing controller instance.
    pub instance: u64,
    /// Position the instance last worked on, empty when none yet.
    pub fen: String,
}

pub(crate) fn announce(store: &Arc<dyn SignalStore>, key: &str, instance: u64, fen: &str) {
    let signal = LivenessSignal { instance, fen: fen.to_string() };
    match serde_json::to_string(&signal) {
        Ok(payload) => {
            if let Err(e) = store.set(key, &payload) {
                log::warn!("liveness broadcast failed: {e}");
            }
        }
        Err(e) => log::warn!("liveness signal did not serialize: {e}"),
    }
}

/// Subscribe to the game-in-progress key. On any signal the controller's
/// enabled flag is forced off and the UI asked to refresh.
pub(crate) fn watch_game_signal(
    store: &Arc<dyn SignalStore>,
    key: &str,
    shared: Weak<Mutex<ControlState>>,
    redraw: RefreshFn,
) {
    store.subscribe(
        key,
        Arc::new(move |_value| {
            let Some(shared) = shared.upgrade() else { return };
            {
                let mut st = shared.lock();
                if st.destroyed || !st.enabled {
                    return;
                }
                log::info!("another instance reports a game in progress, disabling analysis");
                st.enabled = false;
            }
            redraw();
        }),
    );
}
