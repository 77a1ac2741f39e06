//! Background catalog rebuilds
//!
//! `IndexManager` owns the published catalog and runs rebuilds on a single
//! worker thread. Readers take cheap `Arc<Catalog>` snapshots that never block
//! on a rebuild. While a rebuild runs, at most one further request is kept
//! pending; newer requests replace it, so bursts collapse into one rebuild.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

use crate::indexer::{IndexRequest, ModuleIndexer};
use crate::models::Catalog;

/// Something that can build a catalog from a request
pub trait CatalogBuilder: Send + Sync {
    fn build(&self, request: &IndexRequest) -> Result<Catalog>;
}

impl CatalogBuilder for ModuleIndexer {
    fn build(&self, request: &IndexRequest) -> Result<Catalog> {
        self.build_index(request)
    }
}

/// Indexer state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexerState {
    /// No rebuild running or pending
    Idle,
    /// A rebuild is running
    Running,
    /// The last rebuild failed; the previous catalog is still published
    Failed,
}

/// Rebuild status, as reported to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerStatus {
    pub state: IndexerState,
    /// Error of the last failed rebuild
    pub last_error: Option<String>,
    /// Completion time of the last rebuild (RFC 3339), successful or not
    pub completed_at: Option<String>,
    /// Number of successful rebuilds
    pub rebuilds: u64,
}

impl Default for IndexerStatus {
    fn default() -> Self {
        Self {
            state: IndexerState::Idle,
            last_error: None,
            completed_at: None,
            rebuilds: 0,
        }
    }
}

struct WorkerState {
    running: bool,
    pending: Option<IndexRequest>,
    status: IndexerStatus,
}

struct Shared {
    builder: Arc<dyn CatalogBuilder>,
    catalog: RwLock<Arc<Catalog>>,
    state: Mutex<WorkerState>,
    idle: Condvar,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, WorkerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Owner of the published catalog
#[derive(Clone)]
pub struct IndexManager {
    shared: Arc<Shared>,
}

impl IndexManager {
    /// Manager publishing an empty catalog until the first rebuild completes
    pub fn new(builder: Arc<dyn CatalogBuilder>) -> Self {
        Self {
            shared: Arc::new(Shared {
                builder,
                catalog: RwLock::new(Arc::new(Catalog::default())),
                state: Mutex::new(WorkerState {
                    running: false,
                    pending: None,
                    status: IndexerStatus::default(),
                }),
                idle: Condvar::new(),
            }),
        }
    }

    /// Current catalog; never waits for a running rebuild
    pub fn snapshot(&self) -> Arc<Catalog> {
        let catalog = self
            .shared
            .catalog
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&catalog)
    }

    pub fn status(&self) -> IndexerStatus {
        self.shared.lock_state().status.clone()
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock_state().running
    }

    /// Start a rebuild, or queue it behind the running one
    ///
    /// A queued request replaces any request already waiting.
    pub fn request_rebuild(&self, request: IndexRequest) {
        let mut state = self.shared.lock_state();

        if state.running {
            if state.pending.is_some() {
                log::debug!("Replacing pending rebuild request");
            } else {
                log::debug!("Rebuild running, queueing request");
            }
            state.pending = Some(request);
            return;
        }

        state.running = true;
        state.status.state = IndexerState::Running;
        drop(state);

        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name("imph-indexer".to_string())
            .spawn(move || worker_loop(shared, request));

        if let Err(e) = spawned {
            log::error!("Failed to start indexer thread: {}", e);
            let mut state = self.shared.lock_state();
            state.running = false;
            state.status.state = IndexerState::Failed;
            state.status.last_error = Some(format!("failed to start indexer thread: {}", e));
            self.shared.idle.notify_all();
        }
    }

    /// Block until no rebuild is running or pending
    pub fn wait_idle(&self) {
        let mut state = self.shared.lock_state();
        while state.running {
            state = self
                .shared
                .idle
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Like `wait_idle` with an upper bound; returns false on timeout
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock_state();
        while state.running {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (next, _) = self
                .shared
                .idle
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state = next;
        }
        true
    }

    /// Rebuild and wait for it; errors if the rebuild failed
    pub fn rebuild_blocking(&self, request: IndexRequest) -> Result<Arc<Catalog>> {
        self.request_rebuild(request);
        self.wait_idle();

        let status = self.status();
        match status.state {
            IndexerState::Failed => Err(anyhow::anyhow!(
                "{}",
                status.last_error.unwrap_or_else(|| "index rebuild failed".to_string())
            )),
            _ => Ok(self.snapshot()),
        }
    }
}

fn worker_loop(shared: Arc<Shared>, mut request: IndexRequest) {
    // Leave a consistent state behind even if the builder panics
    let guard_shared = Arc::clone(&shared);
    let _guard = scopeguard::guard((), move |_| {
        let mut state = guard_shared.lock_state();
        if state.running {
            state.running = false;
            state.pending = None;
            state.status.state = IndexerState::Failed;
            state.status.last_error = Some("index rebuild panicked".to_string());
            log::error!("Index rebuild panicked");
        }
        guard_shared.idle.notify_all();
    });

    loop {
        log::info!("Starting index rebuild");
        let result = shared.builder.build(&request);
        let now = chrono::Local::now().to_rfc3339();

        let mut state = shared.lock_state();
        match result {
            Ok(catalog) => {
                let count = catalog.len();
                {
                    let mut published = shared
                        .catalog
                        .write()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    *published = Arc::new(catalog);
                }
                state.status.state = IndexerState::Idle;
                state.status.last_error = None;
                state.status.rebuilds += 1;
                log::info!("Published catalog with {} entries", count);
            }
            Err(e) => {
                log::error!("Index rebuild failed, keeping previous catalog: {:#}", e);
                state.status.state = IndexerState::Failed;
                state.status.last_error = Some(format!("{:#}", e));
            }
        }
        state.status.completed_at = Some(now);

        match state.pending.take() {
            Some(next) => {
                log::debug!("Running queued rebuild");
                request = next;
                state.status.state = IndexerState::Running;
            }
            None => {
                state.running = false;
                return;
            }
        }
    }
}
