//! The worker-pool port and the per-request completion sink.

use crossbeam_channel::Sender;
use smallvec::SmallVec;

use kibitz_core::{EvalResult, TreePath};

/// Opaque analysis worker pool. The controller owns its pool exclusively and
/// tears it down on `destroy`; implementations cover process spawning,
/// message transport and binary selection.
///
/// `stop` is advisory: the pool should abandon in-flight work before issuing
/// further sink deliveries, but the controller guards against late ones
/// regardless.
pub trait EvalPool: Send {
    fn start(&mut self, request: AnalysisRequest) -> anyhow::Result<()>;
    fn stop(&mut self);
    fn is_computing(&self) -> bool;
    fn engine_name(&self) -> Option<String>;
    fn destroy(&mut self) -> anyhow::Result<()>;
}

/// A single analysis request handed to the pool.
///
/// `moves` lists the moves to replay from `initial_fen`; it is empty whenever
/// `initial_fen == current_fen`. The base position is advanced past the last
/// irreversible move, so consecutive requests along one line let the worker
/// reuse internal search state.
#[derive(Debug)]
pub struct AnalysisRequest {
    pub initial_fen: String,
    pub moves: SmallVec<[String; 16]>,
    pub current_fen: String,
    pub path: TreePath,
    pub ply: u32,
    /// Effective depth ceiling; [`MAX_DEPTH`](crate::MAX_DEPTH) means search
    /// until stopped.
    pub max_depth: u32,
    pub multi_pv: u32,
    pub threads: u32,
    pub hash_mb: u32,
    pub threat_mode: bool,
    pub sink: EvalSink,
}

/// Messages crossing the pool → controller boundary.
#[derive(Debug)]
pub(crate) enum PoolMessage {
    Eval {
        generation: u64,
        path: TreePath,
        ply: u32,
        threat_mode: bool,
        eval: EvalResult,
    },
    Shutdown,
}

/// Completion sink closed over the originating request's identity. Each
/// request gets a fresh generation; deliveries from a superseded request are
/// identified downstream by a stale generation and discarded.
#[derive(Debug, Clone)]
pub struct EvalSink {
    tx: Sender<PoolMessage>,
    generation: u64,
    path: TreePath,
    ply: u32,
    threat_mode: bool,
}

impl EvalSink {
    pub(crate) fn new(
        tx: Sender<PoolMessage>,
        generation: u64,
        path: TreePath,
        ply: u32,
        threat_mode: bool,
    ) -> Self {
        EvalSink { tx, generation, path, ply, threat_mode }
    }

    /// Deliver one evaluation. A send failure means the controller is gone
    /// and is ignored like any other late callback.
    pub fn emit(&self, eval: EvalResult) {
        let _ = self.tx.send(PoolMessage::Eval {
            generation: self.generation,
            path: self.path.clone(),
            ply: self.ply,
            threat_mode: self.threat_mode,
            eval,
        });
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
