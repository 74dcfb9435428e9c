//! Shared fixtures: a scripted in-process pool, an instrumented store and
//! step/eval builders.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use kibitz_client::{
    AnalysisRequest, ControllerConfig, EvalContext, EvalController, EvalPool, EvalSink,
    MemoryStore,
};
use kibitz_core::{Color, EvalResult, Pv, Score, Step, INITIAL_FEN};

pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolCall {
    Start,
    Stop,
    Destroy,
}

/// Observation side of [`FakePool`], shared with the test body.
#[derive(Default)]
pub struct PoolProbe {
    pub calls: Mutex<Vec<PoolCall>>,
    pub requests: Mutex<Vec<AnalysisRequest>>,
    pub computing: AtomicBool,
}

impl PoolProbe {
    pub fn calls(&self) -> Vec<PoolCall> {
        self.calls.lock().clone()
    }

    pub fn starts(&self) -> usize {
        self.calls.lock().iter().filter(|c| **c == PoolCall::Start).count()
    }

    pub fn last_sink(&self) -> Option<EvalSink> {
        self.requests.lock().last().map(|r| r.sink.clone())
    }

    pub fn with_last_request<T>(&self, f: impl FnOnce(&AnalysisRequest) -> T) -> T {
        let requests = self.requests.lock();
        f(requests.last().expect("no request was started"))
    }
}

/// Scripted worker pool: records calls, keeps every request (and its sink)
/// around so tests can deliver evaluations whenever they choose.
pub struct FakePool {
    probe: Arc<PoolProbe>,
}

impl FakePool {
    pub fn new() -> (Box<dyn EvalPool>, Arc<PoolProbe>) {
        let probe = Arc::new(PoolProbe::default());
        (Box::new(FakePool { probe: probe.clone() }), probe)
    }
}

impl EvalPool for FakePool {
    fn start(&mut self, request: AnalysisRequest) -> anyhow::Result<()> {
        self.probe.calls.lock().push(PoolCall::Start);
        self.probe.computing.store(true, Ordering::SeqCst);
        self.probe.requests.lock().push(request);
        Ok(())
    }

    fn stop(&mut self) {
        self.probe.calls.lock().push(PoolCall::Stop);
        self.probe.computing.store(false, Ordering::SeqCst);
    }

    fn is_computing(&self) -> bool {
        self.probe.computing.load(Ordering::SeqCst)
    }

    fn engine_name(&self) -> Option<String> {
        Some("mockfish 9".to_string())
    }

    fn destroy(&mut self) -> anyhow::Result<()> {
        self.probe.calls.lock().push(PoolCall::Destroy);
        self.probe.computing.store(false, Ordering::SeqCst);
        Ok(())
    }
}

pub type Emission = (EvalResult, EvalContext, Instant);

pub struct Harness {
    pub ctrl: EvalController,
    pub probe: Arc<PoolProbe>,
    pub store: Arc<MemoryStore>,
    pub emissions: Arc<Mutex<Vec<Emission>>>,
}

impl Harness {
    pub fn emission_count(&self) -> usize {
        self.emissions.lock().len()
    }
}

pub fn harness(prefix: &str) -> Harness {
    harness_with(prefix, |config| config)
}

pub fn harness_with(
    prefix: &str,
    configure: impl FnOnce(ControllerConfig) -> ControllerConfig,
) -> Harness {
    harness_on(Arc::new(MemoryStore::new()), prefix, configure)
}

/// Build a controller on a caller-supplied (possibly pre-seeded) store.
pub fn harness_on(
    store: Arc<MemoryStore>,
    prefix: &str,
    configure: impl FnOnce(ControllerConfig) -> ControllerConfig,
) -> Harness {
    init_logs();
    let (pool, probe) = FakePool::new();
    let emissions: Arc<Mutex<Vec<Emission>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = emissions.clone();
    let config = ControllerConfig::new(prefix, store.clone(), Arc::new(cp_chances)).on_eval(
        Arc::new(move |ev, ctx| {
            recorded.lock().push((ev.clone(), ctx.clone(), Instant::now()));
        }),
    );
    let ctrl = EvalController::new(configure(config), pool);
    Harness { ctrl, probe, store, emissions }
}

/// Simple mover-oriented win chances: centipawns dominate, mates dominate
/// centipawns, black negates.
pub fn cp_chances(color: Color, score: Score) -> f64 {
    let cp = match score {
        Score::Cp(cp) => cp as f64,
        Score::Mate(m) if m > 0 => 100_000.0 - m as f64,
        Score::Mate(m) => -100_000.0 - m as f64,
    };
    match color {
        Color::White => cp,
        Color::Black => -cp,
    }
}

pub fn step(ply: u32, fen: &str, san: Option<&str>, uci: Option<&str>) -> Step {
    Step {
        ply,
        fen: fen.to_string(),
        san: san.map(str::to_string),
        uci: uci.map(str::to_string),
        eval: None,
        threat: None,
    }
}

/// Root plus `moves` quiet knight shuffles, each with a distinct encoding.
pub fn quiet_line(moves: usize) -> Vec<Step> {
    let mut steps = vec![step(0, "pos0 w - - 0 1", None, None)];
    for i in 1..=moves {
        let turn = if i % 2 == 0 { "w" } else { "b" };
        let fen = format!("pos{i} {turn} - - 0 1");
        let san = if i % 2 == 1 { "Nf3" } else { "Nc6" };
        let uci = if i % 2 == 1 { "g1f3" } else { "b8c6" };
        steps.push(step(i as u32, &fen, Some(san), Some(uci)));
    }
    steps
}

pub fn eval_at(fen: &str, depth: u32, knps: u32, cp: i32) -> EvalResult {
    EvalResult {
        depth,
        knps,
        score: Score::Cp(cp),
        pvs: vec![Pv { moves: smallvec::smallvec!["e2e4".to_string()], score: Score::Cp(cp) }],
        fen: fen.to_string(),
    }
}

pub fn balanced_eval(cp: i32) -> EvalResult {
    eval_at(INITIAL_FEN, 20, 1500, cp)
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    cond()
}
