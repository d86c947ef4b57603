//! Trace discovery and loading.
//!
//! Discovery walks the benchmark → configuration → task hierarchy exposed by
//! the [`TraceStore`] sequentially, suspending at every listing. One
//! unreadable branch is logged and skipped; its siblings still appear in the
//! index. Loading fetches one trace file, decodes it, normalizes it, and
//! builds the derived timeline and analytics.
//!
//! Both run as background campaigns stamped with a generation counter. A new
//! campaign bumps the counter; a superseded campaign notices at its next
//! suspension point and discards its work, so an in-flight result is never
//! applied after the consumer moved on. The core retries nothing and imposes
//! no timeouts; both are transport concerns.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};

use thiserror::Error;

use crate::events::AppEvent;
use crate::store::{join_path, EntryKind, StoreError, TraceStore};
use crate::trace::normalize::{normalize_trace, MalformedTraceError};
use crate::trace::TraceSession;

/// A loadable trace file within the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRef {
    /// File name, e.g. `task_042.json`.
    pub name: String,
    /// Opaque location handle understood by the store.
    pub path: String,
}

impl TaskRef {
    /// Identifier shown for the task: the file name without its extension.
    pub fn task_id(&self) -> &str {
        self.name.strip_suffix(".json").unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigEntry {
    pub name: String,
    pub tasks: Vec<TaskRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BenchmarkEntry {
    pub name: String,
    pub configs: Vec<ConfigEntry>,
}

/// The discovered benchmark → configuration → task hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceIndex {
    pub benchmarks: Vec<BenchmarkEntry>,
}

impl TraceIndex {
    pub fn task_count(&self) -> usize {
        self.benchmarks
            .iter()
            .flat_map(|b| &b.configs)
            .map(|c| c.tasks.len())
            .sum()
    }
}

/// Liveness flag captured at campaign start. A campaign checks it at its
/// suspension points and abandons the walk once superseded; the event loop
/// checks the matching generation again before any state is touched.
#[derive(Debug, Clone)]
pub struct Liveness {
    counter: Arc<AtomicU64>,
    generation: u64,
}

impl Liveness {
    /// A flag that never expires, for one-shot callers with no event loop.
    pub fn immortal() -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(0)),
            generation: 0,
        }
    }

    fn captured(counter: &Arc<AtomicU64>) -> Self {
        Self {
            counter: Arc::clone(counter),
            generation: counter.load(Ordering::SeqCst),
        }
    }

    pub fn is_live(&self) -> bool {
        self.counter.load(Ordering::SeqCst) == self.generation
    }
}

/// A trace could not be loaded. The index stays usable; only this load fails.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] StoreError),
    #[error("trace file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Malformed(#[from] MalformedTraceError),
}

/// Walk the three-level hierarchy into an index.
///
/// Fails only if the root itself is unreadable; any deeper failure is warned
/// and that branch skipped. A dead liveness flag stops the walk early (the
/// partial result will be discarded by the caller).
pub async fn discover_index(
    store: &dyn TraceStore,
    liveness: &Liveness,
) -> Result<TraceIndex, StoreError> {
    let mut index = TraceIndex::default();
    for bench in store.list_dir("").await? {
        if !liveness.is_live() {
            break;
        }
        if bench.kind != EntryKind::Directory {
            continue;
        }
        let bench_path = bench.name.clone();
        let configs = match store.list_dir(&bench_path).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(benchmark = %bench.name, %err, "skipping unreadable benchmark");
                continue;
            }
        };
        let mut benchmark = BenchmarkEntry {
            name: bench.name,
            configs: Vec::new(),
        };
        for config in configs {
            if !liveness.is_live() {
                break;
            }
            if config.kind != EntryKind::Directory {
                continue;
            }
            let config_path = join_path(&bench_path, &config.name);
            let tasks = match store.list_dir(&config_path).await {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(
                        config = %config_path, %err,
                        "skipping unreadable configuration"
                    );
                    continue;
                }
            };
            benchmark.configs.push(ConfigEntry {
                name: config.name,
                tasks: tasks
                    .into_iter()
                    .filter(|e| e.kind == EntryKind::File && e.name.ends_with(".json"))
                    .map(|e| TaskRef {
                        path: join_path(&config_path, &e.name),
                        name: e.name,
                    })
                    .collect(),
            });
        }
        index.benchmarks.push(benchmark);
    }
    Ok(index)
}

/// Fetch, decode, normalize, and derive one trace session.
pub async fn load_trace(store: &dyn TraceStore, task: &TaskRef) -> Result<TraceSession, LoadError> {
    let bytes = store.fetch(&task.path).await?;
    let raw: serde_json::Value = serde_json::from_slice(&bytes)?;
    let record = normalize_trace(task.task_id(), &raw)?;
    Ok(TraceSession::new(record))
}

/// Owns the store and spawns discovery/load campaigns onto a tokio runtime,
/// feeding results back into the synchronous event loop.
pub struct TraceLoader {
    store: Arc<dyn TraceStore>,
    runtime: tokio::runtime::Handle,
    tx: mpsc::Sender<AppEvent>,
    generation: Arc<AtomicU64>,
}

impl TraceLoader {
    pub fn new(
        store: Arc<dyn TraceStore>,
        runtime: tokio::runtime::Handle,
        tx: mpsc::Sender<AppEvent>,
    ) -> Self {
        Self {
            store,
            runtime,
            tx,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The generation the event loop should accept results for.
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Invalidate any in-flight campaign without starting a new one.
    pub fn cancel(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Start a discovery campaign. Returns its generation.
    pub fn begin_discovery(&self) -> u64 {
        let generation = self.cancel();
        let store = Arc::clone(&self.store);
        let liveness = Liveness::captured(&self.generation);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = discover_index(store.as_ref(), &liveness).await;
            if !liveness.is_live() {
                tracing::debug!(generation, "discarding superseded discovery result");
                return;
            }
            let event = match result {
                Ok(index) => AppEvent::IndexReady { generation, index },
                Err(err) => AppEvent::LoadFailed {
                    generation,
                    message: format!("discovery failed: {err}"),
                },
            };
            let _ = tx.send(event);
        });
        generation
    }

    /// Start a trace-load campaign for one task. Returns its generation.
    pub fn begin_load(&self, task: TaskRef) -> u64 {
        let generation = self.cancel();
        let store = Arc::clone(&self.store);
        let liveness = Liveness::captured(&self.generation);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = load_trace(store.as_ref(), &task).await;
            if !liveness.is_live() {
                tracing::debug!(generation, task = %task.path, "discarding superseded load");
                return;
            }
            let event = match result {
                Ok(session) => AppEvent::TraceReady {
                    generation,
                    session: Box::new(session),
                },
                Err(err) => AppEvent::LoadFailed {
                    generation,
                    message: format!("failed to load {}: {err}", task.name),
                },
            };
            let _ = tx.send(event);
        });
        generation
    }
}
