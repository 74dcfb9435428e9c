//! Ordered, rate-limited relay of raw pool results.
//!
//! A dedicated emitter thread drains the pool channel. Deliveries are
//! trailing-edge throttled: the first result of a burst opens a window and is
//! delivered when the window elapses; later results within the window
//! overwrite the pending payload. At flush time a delivery is discarded
//! (never queued) when the controller has been destroyed or disabled, when
//! its generation is stale, or when no request is active anymore.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::Mutex;

use kibitz_core::{sort_pvs, Color, EvalResult, PovChances, TreePath};

use crate::controller::ControlState;
use crate::estimator::DepthEstimator;
use crate::pool::PoolMessage;
use crate::prefs::EnginePrefs;

/// Minimum spacing between deliveries per controller instance.
pub const EMIT_INTERVAL: Duration = Duration::from_millis(500);

/// Identity of the request an emission belongs to, echoed to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalContext {
    pub path: TreePath,
    pub ply: u32,
    pub threat_mode: bool,
}

/// Caller-facing emission sink.
pub type EmitFn = Arc<dyn Fn(&EvalResult, &EvalContext) + Send + Sync>;

pub(crate) struct EmitterDeps {
    pub estimator: DepthEstimator,
    pub prefs: EnginePrefs,
    pub on_eval: EmitFn,
    pub chances: Arc<PovChances>,
}

struct Pending {
    generation: u64,
    ctx: EvalContext,
    eval: EvalResult,
}

pub(crate) fn spawn(
    rx: Receiver<PoolMessage>,
    shared: Arc<Mutex<ControlState>>,
    deps: EmitterDeps,
) -> JoinHandle<()> {
    thread::spawn(move || run(rx, shared, deps))
}

fn run(rx: Receiver<PoolMessage>, shared: Arc<Mutex<ControlState>>, mut deps: EmitterDeps) {
    let mut pending: Option<Pending> = None;
    let mut window_until: Option<Instant> = None;
    loop {
        let message = match window_until {
            Some(deadline) => match rx.recv_deadline(deadline) {
                Ok(message) => Some(message),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(message) => Some(message),
                Err(_) => break,
            },
        };
        match message {
            Some(PoolMessage::Shutdown) => break,
            Some(PoolMessage::Eval { generation, path, ply, threat_mode, eval }) => {
                pending = Some(Pending {
                    generation,
                    ctx: EvalContext { path, ply, threat_mode },
                    eval,
                });
                if window_until.is_none() {
                    window_until = Some(Instant::now() + EMIT_INTERVAL);
                }
            }
            // Window elapsed: deliver whatever accumulated.
            None => {
                window_until = None;
                if let Some(pending) = pending.take() {
                    flush(&shared, &mut deps, pending);
                }
            }
        }
    }
    log::debug!("emitter thread exiting");
}

fn flush(shared: &Mutex<ControlState>, deps: &mut EmitterDeps, pending: Pending) {
    let Pending { generation, ctx, mut eval } = pending;
    {
        let st = shared.lock();
        if st.destroyed || generation != st.generation || !st.state.is_active() {
            log::debug!("discarding late evaluation for generation {generation}");
            return;
        }
        if !st.live() {
            log::debug!("discarding evaluation while disabled");
            return;
        }
    }

    sort_pvs(&mut eval.pvs, pov(ctx.ply, ctx.threat_mode), &*deps.chances);
    if let Some(depth) = deps.estimator.record(&eval) {
        deps.prefs.depth.set(depth);
    }

    let changed = {
        let mut st = shared.lock();
        st.last_eval = Some(eval.clone());
        let changed = st.last_emit_fen.as_deref() != Some(eval.fen.as_str());
        if changed {
            st.last_emit_fen = Some(eval.fen.clone());
        }
        changed
    };

    (deps.on_eval)(&eval, &ctx);
    if changed {
        deps.prefs.last_fen.set(eval.fen.clone());
    }
}

/// The side an emission is scored for: the side to move of the originating
/// position, or the opposite side for a threat request.
fn pov(ply: u32, threat_mode: bool) -> Color {
    let to_move = Color::to_move_at(ply);
    if threat_mode {
        to_move.opposite()
    } else {
        to_move
    }
}
