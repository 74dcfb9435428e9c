//! The engine-evaluation pool controller.
//!
//! Owns the request lifecycle: builds analysis requests from a step history,
//! applies the shaping rules (irreversible-move trimming, threat-mode
//! side inversion), starts/stops/supersedes work against the worker pool and
//! tracks the enabled/allowed/session state. All public operations run to
//! completion; the pool reports back asynchronously through each request's
//! completion sink, drained by the emitter thread in [`crate::output`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use kibitz_core::{
    flip_turn, san_irreversible, EvalResult, Session, Step, TreePath, Variant,
};

use crate::capability::{self, Capability, PluginWatchdog};
use crate::coordinator;
use crate::estimator::{DepthEstimator, MAX_DEPTH};
use crate::output::{self, EmitFn, EmitterDeps};
use crate::pool::{AnalysisRequest, EvalPool, EvalSink, PoolMessage};
use crate::prefs::EnginePrefs;
use crate::store::SignalStore;

/// Parameterless UI callback (refresh, shape redraw).
pub type RefreshFn = Arc<dyn Fn() + Send + Sync>;

/// Probe telling the controller whether its host view is currently hidden.
pub type HiddenFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Lifecycle of the current request. `Stopped` is terminal only for the
/// request it ends; the controller itself stays reusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Requested,
    Computing,
    Stopped,
}

impl RequestState {
    /// A request is underway (handed to the pool or about to be).
    pub fn is_active(&self) -> bool {
        matches!(self, RequestState::Requested | RequestState::Computing)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, RequestState::Idle)
    }
}

/// Transient UI hint recorded by `set_hovering`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hovering {
    pub fen: String,
    pub uci: String,
}

/// Controller state record. Constructed once, mutated only through the
/// public operations, torn down by `destroy`.
pub(crate) struct ControlState {
    pub pool: Box<dyn EvalPool>,
    pub state: RequestState,
    /// Monotonically increasing request id; sink deliveries carrying an
    /// older generation are stale and get discarded.
    pub generation: u64,
    pub session: Option<Session>,
    pub last_session: Option<Session>,
    pub is_deeper: bool,
    pub enabled: bool,
    pub allowed: bool,
    pub possible: bool,
    pub destroyed: bool,
    pub last_eval: Option<EvalResult>,
    pub last_emit_fen: Option<String>,
    pub hovering: Option<Hovering>,
}

impl ControlState {
    /// Emissions are delivered only while this holds.
    pub(crate) fn live(&self) -> bool {
        self.enabled && self.allowed && self.possible
    }
}

/// Construction-time configuration. Required pieces go through [`new`];
/// everything else has a sensible default and a builder setter.
///
/// [`new`]: ControllerConfig::new
pub struct ControllerConfig {
    storage_prefix: String,
    possible: bool,
    default_multi_pv: u32,
    variant: Variant,
    store: Arc<dyn SignalStore>,
    watchdog: Option<Arc<dyn PluginWatchdog>>,
    on_eval: EmitFn,
    redraw: RefreshFn,
    set_shapes: RefreshFn,
    pov_chances: Arc<kibitz_core::PovChances>,
    view_hidden: HiddenFn,
    liveness_key: String,
    game_key: String,
}

impl ControllerConfig {
    pub fn new(
        storage_prefix: impl Into<String>,
        store: Arc<dyn SignalStore>,
        pov_chances: Arc<kibitz_core::PovChances>,
    ) -> Self {
        let storage_prefix = storage_prefix.into();
        let on_eval: EmitFn = Arc::new(|_, _| {});
        let noop: RefreshFn = Arc::new(|| {});
        let view_hidden: HiddenFn = Arc::new(|| false);
        ControllerConfig {
            possible: true,
            default_multi_pv: 1,
            variant: Variant::default(),
            store,
            watchdog: None,
            on_eval,
            redraw: noop.clone(),
            set_shapes: noop,
            pov_chances,
            view_hidden,
            liveness_key: format!("{storage_prefix}.live"),
            game_key: format!("{storage_prefix}.game"),
            storage_prefix,
        }
    }

    /// Feasibility flag from the embedder (e.g. server-side analysis policy).
    pub fn possible(mut self, possible: bool) -> Self {
        self.possible = possible;
        self
    }

    pub fn default_multi_pv(mut self, multi_pv: u32) -> Self {
        self.default_multi_pv = multi_pv;
        self
    }

    pub fn variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    pub fn watchdog(mut self, watchdog: Arc<dyn PluginWatchdog>) -> Self {
        self.watchdog = Some(watchdog);
        self
    }

    pub fn on_eval(mut self, on_eval: EmitFn) -> Self {
        self.on_eval = on_eval;
        self
    }

    pub fn redraw(mut self, redraw: RefreshFn) -> Self {
        self.redraw = redraw;
        self
    }

    pub fn set_shapes(mut self, set_shapes: RefreshFn) -> Self {
        self.set_shapes = set_shapes;
        self
    }

    pub fn view_hidden(mut self, view_hidden: HiddenFn) -> Self {
        self.view_hidden = view_hidden;
        self
    }

    pub fn liveness_key(mut self, key: impl Into<String>) -> Self {
        self.liveness_key = key.into();
        self
    }

    pub fn game_key(mut self, key: impl Into<String>) -> Self {
        self.game_key = key.into();
        self
    }
}

static INSTANCE_SEQ: AtomicU64 = AtomicU64::new(1);

fn next_instance_id() -> u64 {
    let seq = INSTANCE_SEQ.fetch_add(1, Ordering::Relaxed);
    ((std::process::id() as u64) << 32) | (seq & 0xffff_ffff)
}

pub struct EvalController {
    shared: Arc<Mutex<ControlState>>,
    prefs: EnginePrefs,
    tx: crossbeam_channel::Sender<PoolMessage>,
    emitter: Option<std::thread::JoinHandle<()>>,
    capability: Capability,
    variant: Variant,
    set_shapes: RefreshFn,
    view_hidden: HiddenFn,
    instance: u64,
}

impl EvalController {
    /// Build a controller around an exclusively owned worker pool.
    ///
    /// Probes capabilities, loads preferences, spawns the emitter thread and
    /// announces this instance on the shared store when analysis is enabled.
    pub fn new(config: ControllerConfig, pool: Box<dyn EvalPool>) -> Self {
        let capability = capability::detect(config.watchdog.as_deref());
        let possible = config.possible && capability.usable();
        let prefs =
            EnginePrefs::new(&config.store, &config.storage_prefix, config.default_multi_pv);
        let enabled = possible && prefs.enabled.get();
        let (tx, rx) = crossbeam_channel::unbounded();
        let shared = Arc::new(Mutex::new(ControlState {
            pool,
            state: RequestState::Idle,
            generation: 0,
            session: None,
            last_session: None,
            is_deeper: false,
            enabled,
            allowed: true,
            possible,
            destroyed: false,
            last_eval: None,
            last_emit_fen: None,
            hovering: None,
        }));
        let emitter = output::spawn(
            rx,
            shared.clone(),
            EmitterDeps {
                estimator: DepthEstimator::new(),
                prefs: prefs.clone(),
                on_eval: config.on_eval.clone(),
                chances: config.pov_chances.clone(),
            },
        );
        let instance = next_instance_id();
        if enabled {
            coordinator::announce(&config.store, &config.liveness_key, instance, &prefs.last_fen.get());
            coordinator::watch_game_signal(
                &config.store,
                &config.game_key,
                Arc::downgrade(&shared),
                config.redraw.clone(),
            );
        }
        EvalController {
            shared,
            prefs,
            tx,
            emitter: Some(emitter),
            capability,
            variant: config.variant,
            set_shapes: config.set_shapes,
            view_hidden: config.view_hidden,
            instance,
        }
    }

    /// Begin or supersede analysis of `steps` (non-empty, newest last).
    ///
    /// No-op while disabled, unsupported or destroyed, and when the newest
    /// step already carries a cached result at or beyond the effective depth
    /// ceiling; in that case only the session is recorded for a later
    /// resume.
    pub fn start(&self, path: TreePath, steps: &[Step], threat_mode: bool, deeper: bool) {
        let mut st = self.shared.lock();
        if st.destroyed {
            log::debug!("start ignored: controller destroyed");
            return;
        }
        if !st.live() {
            log::debug!("start ignored: analysis disabled or unsupported");
            return;
        }
        st.is_deeper = deeper;
        let infinite = self.prefs.infinite.get();
        let max_depth = if deeper || infinite { MAX_DEPTH } else { self.prefs.depth.get() };
        let last = steps.last().expect("non-empty step history");
        let cached = if threat_mode { last.threat.as_ref() } else { last.eval.as_ref() };
        if let Some(cached) = cached {
            if cached.depth >= max_depth {
                log::debug!(
                    "start skipped: cached depth {} covers ceiling {max_depth}",
                    cached.depth
                );
                st.last_session =
                    Some(Session { path, steps: steps.to_vec(), threat_mode });
                return;
            }
        }
        if st.state.is_active() {
            log::debug!("superseding in-flight request");
            st.pool.stop();
        }
        st.generation += 1;
        let sink =
            EvalSink::new(self.tx.clone(), st.generation, path.clone(), last.ply, threat_mode);
        let (initial_fen, current_fen, moves) = shape(self.variant, steps, threat_mode);
        let request = AnalysisRequest {
            initial_fen,
            moves,
            current_fen,
            path: path.clone(),
            ply: last.ply,
            max_depth,
            multi_pv: self.prefs.multi_pv.get(),
            threads: self.prefs.threads.get().clamp(1, capability::max_threads()),
            hash_mb: self.prefs.hash_mb.get().clamp(1, capability::MAX_HASH_MB),
            threat_mode,
            sink,
        };
        st.session = Some(Session { path, steps: steps.to_vec(), threat_mode });
        st.state = RequestState::Requested;
        log::debug!(
            "starting analysis, generation {} depth {} multipv {}",
            st.generation,
            request.max_depth,
            request.multi_pv
        );
        match st.pool.start(request) {
            Ok(()) => st.state = RequestState::Computing,
            Err(e) => {
                log::warn!("worker pool failed to start: {e}");
                st.state = RequestState::Idle;
            }
        }
    }

    /// Cancel in-flight work. The stopped session is preserved so
    /// [`go_deeper`](Self::go_deeper) can resume it.
    pub fn stop(&self) {
        let mut st = self.shared.lock();
        if st.destroyed || !st.state.is_active() {
            return;
        }
        st.pool.stop();
        st.last_session = st.session.take();
        st.state = RequestState::Stopped;
    }

    /// Flip the enabled flag. Persisted unless the host view is hidden.
    pub fn toggle(&self) {
        let enabled = {
            let mut st = self.shared.lock();
            if st.destroyed {
                return;
            }
            st.enabled = !st.enabled;
            st.enabled
        };
        // Persist outside the lock; store subscribers may call back in.
        if !(self.view_hidden)() {
            self.prefs.enabled.set(enabled);
        }
    }

    /// Resume the last-or-current session with the maximal depth ceiling.
    pub fn go_deeper(&self) {
        let session = {
            let st = self.shared.lock();
            st.session.clone().or_else(|| st.last_session.clone())
        };
        match session {
            Some(s) => self.start(s.path, &s.steps, s.threat_mode, true),
            None => log::debug!("go_deeper ignored: nothing to resume"),
        }
    }

    /// True iff not already deepened, not in infinite mode and the pool is
    /// currently idle.
    pub fn can_go_deeper(&self) -> bool {
        let st = self.shared.lock();
        !st.destroyed && !st.is_deeper && !self.prefs.infinite.get() && !st.pool.is_computing()
    }

    /// True iff a session is active and the pool reports computation.
    pub fn is_computing(&self) -> bool {
        let st = self.shared.lock();
        st.session.is_some() && st.pool.is_computing()
    }

    /// Record a transient UI hint and ask the host to refresh its shapes.
    pub fn set_hovering(&self, fen: impl Into<String>, uci: Option<&str>) {
        {
            let mut st = self.shared.lock();
            if st.destroyed {
                return;
            }
            st.hovering = uci.map(|uci| Hovering { fen: fen.into(), uci: uci.to_string() });
        }
        (self.set_shapes)();
    }

    pub fn engine_name(&self) -> Option<String> {
        self.shared.lock().pool.engine_name()
    }

    /// Tear down the worker pool and join the emitter thread. Idempotent;
    /// any later `start` is silently ignored.
    pub fn destroy(&mut self) {
        {
            let mut st = self.shared.lock();
            if st.destroyed {
                return;
            }
            st.destroyed = true;
            st.session = None;
            if let Err(e) = st.pool.destroy() {
                log::warn!("worker pool teardown failed: {e}");
            }
        }
        let _ = self.tx.send(PoolMessage::Shutdown);
        if let Some(handle) = self.emitter.take() {
            if handle.join().is_err() {
                log::warn!("emitter thread panicked");
            }
        }
    }

    // Read-only surface.

    pub fn possible(&self) -> bool {
        self.shared.lock().possible
    }

    pub fn enabled(&self) -> bool {
        self.shared.lock().enabled
    }

    pub fn allowed(&self) -> bool {
        self.shared.lock().allowed
    }

    /// External gate (e.g. a study forbidding engine use).
    pub fn set_allowed(&self, allowed: bool) {
        self.shared.lock().allowed = allowed;
    }

    pub fn state(&self) -> RequestState {
        self.shared.lock().state
    }

    pub fn is_deeper(&self) -> bool {
        self.shared.lock().is_deeper
    }

    pub fn last_eval(&self) -> Option<EvalResult> {
        self.shared.lock().last_eval.clone()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.shared.lock().session.clone()
    }

    pub fn last_session(&self) -> Option<Session> {
        self.shared.lock().last_session.clone()
    }

    pub fn hovering(&self) -> Option<Hovering> {
        self.shared.lock().hovering.clone()
    }

    pub fn multi_pv(&self) -> u32 {
        self.prefs.multi_pv.get()
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Identity used in cross-instance signals.
    pub fn instance_id(&self) -> u64 {
        self.instance
    }
}

impl Drop for EvalController {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Apply the request-shaping rules to a step history.
///
/// Threat mode flips the side to move of the newest position and sends it
/// with no move list. Otherwise the base position advances past every
/// irreversible move and only the moves after the last one are replayed.
fn shape(
    variant: Variant,
    steps: &[Step],
    threat_mode: bool,
) -> (String, String, SmallVec<[String; 16]>) {
    let last = steps.last().expect("non-empty step history");
    if threat_mode {
        let fen = flip_turn(&last.fen);
        return (fen.clone(), fen, SmallVec::new());
    }
    let mut initial = steps[0].fen.clone();
    let mut moves: SmallVec<[String; 16]> = SmallVec::new();
    for step in &steps[1..] {
        let irreversible =
            step.san.as_deref().is_some_and(|san| san_irreversible(variant, san));
        if irreversible {
            moves.clear();
            initial = step.fen.clone();
        } else if let Some(uci) = &step.uci {
            moves.push(uci.clone());
        }
    }
    (initial, last.fen.clone(), moves)
}
