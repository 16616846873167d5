//! Thumbnail Worker Pool
//!
//! Uploaded images are shrunk off the async runtime by a fixed set of
//! workers. Each worker owns a bounded queue; callers wait on a oneshot
//! keyed by correlation id, with a timeout per request.
//!
//! A crashed worker (renderer panic) or a closed worker queue resets the
//! pool: every waiting caller gets `ProtocolError` and a fresh generation of
//! workers is started. Undecodable input only fails its own request.

pub(crate) mod render;

pub use render::ImageRenderer;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use base64::Engine;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Thumbnail {
    /// Inline `data:` URL for previews that never hit the blob store
    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.png)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailError {
    Timeout,
    QueueFull,
    Decode(String),
    Encode(String),
    ProtocolError(String),
}

impl fmt::Display for ThumbnailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThumbnailError::Timeout => write!(f, "Thumbnail timed out"),
            ThumbnailError::QueueFull => write!(f, "Thumbnail queue full"),
            ThumbnailError::Decode(msg) => write!(f, "Cannot decode image: {}", msg),
            ThumbnailError::Encode(msg) => write!(f, "Cannot encode thumbnail: {}", msg),
            ThumbnailError::ProtocolError(msg) => write!(f, "Thumbnail worker failure: {}", msg),
        }
    }
}

impl std::error::Error for ThumbnailError {}

/// Blocking image work, run on the blocking thread pool
pub trait ThumbnailRenderer: Send + Sync + 'static {
    fn render(&self, bytes: &[u8], max_edge: u32) -> Result<Thumbnail, ThumbnailError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    pub workers: usize,
    pub queue_depth: usize,
    pub timeout: Duration,
    pub max_edge: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_depth: 16,
            timeout: Duration::from_secs(10),
            max_edge: 320,
        }
    }
}

type Waiter = oneshot::Sender<Result<Thumbnail, ThumbnailError>>;

struct Job {
    id: u64,
    bytes: Vec<u8>,
}

struct PoolState {
    generation: u64,
    workers: Vec<mpsc::Sender<Job>>,
    pending: HashMap<u64, Waiter>,
    next_id: u64,
    next_worker: usize,
}

struct Shared {
    state: Mutex<PoolState>,
    renderer: Arc<dyn ThumbnailRenderer>,
    config: PoolConfig,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn spawn_workers(self: &Arc<Self>, state: &mut PoolState) {
        let generation = state.generation;
        state.workers = (0..self.config.workers.max(1))
            .map(|index| {
                let (tx, rx) = mpsc::channel(self.config.queue_depth.max(1));
                tokio::spawn(run_worker(Arc::downgrade(self), generation, index, rx));
                tx
            })
            .collect();
        state.next_worker = 0;
        log::debug!(
            "Started {} thumbnail workers (generation {})",
            state.workers.len(),
            generation
        );
    }

    /// Deliver a result; results for timed-out requests are dropped
    fn complete(&self, id: u64, result: Result<Thumbnail, ThumbnailError>) {
        let waiter = self.lock().pending.remove(&id);
        match waiter {
            Some(waiter) => {
                let _ = waiter.send(result);
            }
            None => log::debug!("Dropping late thumbnail result {}", id),
        }
    }

    /// Fail everything pending and start over. No-op if another caller
    /// already reset past `generation`.
    fn reset(self: &Arc<Self>, generation: u64, reason: &str) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        log::warn!("Resetting thumbnail pool: {}", reason);

        for (_, waiter) in state.pending.drain() {
            let _ = waiter.send(Err(ThumbnailError::ProtocolError(reason.to_string())));
        }
        state.generation += 1;
        // Dropping the old senders lets old workers exit after their current job
        self.spawn_workers(&mut state);
    }
}

async fn run_worker(shared: Weak<Shared>, generation: u64, index: usize, mut rx: mpsc::Receiver<Job>) {
    while let Some(Job { id, bytes }) = rx.recv().await {
        let Some(pool) = shared.upgrade() else {
            break;
        };
        let renderer = pool.renderer.clone();
        let max_edge = pool.config.max_edge;

        match tokio::task::spawn_blocking(move || renderer.render(&bytes, max_edge)).await {
            Ok(result) => pool.complete(id, result),
            Err(e) => {
                log::error!("Thumbnail worker {} crashed on request {}: {}", index, id, e);
                pool.reset(generation, &format!("worker {} crashed", index));
                break;
            }
        }
    }
    log::debug!("Thumbnail worker {} (generation {}) stopped", index, generation);
}

/// Handle to the pool. Cloning shares the same workers.
#[derive(Clone)]
pub struct ThumbnailPool {
    shared: Arc<Shared>,
}

impl ThumbnailPool {
    /// Must be called from within a tokio runtime
    pub fn new(renderer: Arc<dyn ThumbnailRenderer>, config: PoolConfig) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                generation: 0,
                workers: Vec::new(),
                pending: HashMap::new(),
                next_id: 0,
                next_worker: 0,
            }),
            renderer,
            config,
        });
        {
            let mut state = shared.lock();
            shared.spawn_workers(&mut state);
        }
        Self { shared }
    }

    pub fn with_image_renderer(config: PoolConfig) -> Self {
        Self::new(Arc::new(ImageRenderer), config)
    }

    /// Incremented by every reset
    pub fn generation(&self) -> u64 {
        self.shared.lock().generation
    }

    pub fn pending(&self) -> usize {
        self.shared.lock().pending.len()
    }

    pub fn max_edge(&self) -> u32 {
        self.shared.config.max_edge
    }

    pub async fn render(&self, bytes: Vec<u8>) -> Result<Thumbnail, ThumbnailError> {
        let (id, rx) = self.submit(bytes)?;

        match tokio::time::timeout(self.shared.config.timeout, rx).await {
            Ok(Ok(result)) => result,
            // Waiter dropped without an answer
            Ok(Err(_)) => Err(ThumbnailError::ProtocolError(
                "worker went away".to_string(),
            )),
            Err(_) => {
                self.shared.lock().pending.remove(&id);
                log::warn!("Thumbnail request {} timed out", id);
                Err(ThumbnailError::Timeout)
            }
        }
    }

    fn submit(
        &self,
        bytes: Vec<u8>,
    ) -> Result<(u64, oneshot::Receiver<Result<Thumbnail, ThumbnailError>>), ThumbnailError> {
        let mut state = self.shared.lock();
        let id = state.next_id;
        state.next_id += 1;
        let generation = state.generation;

        let index = state.next_worker % state.workers.len().max(1);
        state.next_worker = state.next_worker.wrapping_add(1);
        let Some(worker) = state.workers.get(index).cloned() else {
            return Err(ThumbnailError::ProtocolError("no workers".to_string()));
        };

        let (tx, rx) = oneshot::channel();
        state.pending.insert(id, tx);

        match worker.try_send(Job { id, bytes }) {
            Ok(()) => Ok((id, rx)),
            Err(mpsc::error::TrySendError::Full(_)) => {
                state.pending.remove(&id);
                Err(ThumbnailError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                drop(state);
                let reason = format!("worker {} queue closed", index);
                self.shared.reset(generation, &reason);
                Err(ThumbnailError::ProtocolError(reason))
            }
        }
    }
}
