//! Metrics 実装
//!
//! - **NoopScope**: 何もしない（ホストがスコープを渡さない場合のデフォルト）
//! - **InMemoryScope**: プロセス内で値を保持し、snapshot で読み出せる（テスト・デモ用）

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use crate::ports::{Counter, Scope, Timer};

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScope;

impl Counter for NoopScope {
    fn inc(&self, _delta: i64) {}
}

impl Timer for NoopScope {
    fn record(&self, _elapsed: Duration) {}
}

impl Scope for NoopScope {
    fn tagged(&self, _tags: &[(&str, &str)]) -> Arc<dyn Scope> {
        Arc::new(NoopScope)
    }

    fn counter(&self, _name: &str) -> Arc<dyn Counter> {
        Arc::new(NoopScope)
    }

    fn timer(&self, _name: &str) -> Arc<dyn Timer> {
        Arc::new(NoopScope)
    }
}

/// Metric name plus its full tag set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    name: String,
    tags: BTreeMap<String, String>,
}

impl MetricKey {
    pub fn new(name: &str, tags: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// `count+module=task,type=execution`
impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+", self.name)?;
        for (i, (k, v)) in self.tags.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryCounter(AtomicI64);

impl Counter for InMemoryCounter {
    fn inc(&self, delta: i64) {
        self.0.fetch_add(delta, Ordering::Relaxed);
    }
}

#[derive(Default)]
struct InMemoryTimer(Mutex<Vec<Duration>>);

impl Timer for InMemoryTimer {
    fn record(&self, elapsed: Duration) {
        self.0.lock().push(elapsed);
    }
}

#[derive(Default)]
struct Store {
    counters: Mutex<HashMap<MetricKey, Arc<InMemoryCounter>>>,
    timers: Mutex<HashMap<MetricKey, Arc<InMemoryTimer>>>,
}

/// Scope that keeps every value in memory.
///
/// Scopes derived through `tagged` share one store, so a snapshot taken from
/// the root sees everything recorded below it.
#[derive(Clone, Default)]
pub struct InMemoryScope {
    tags: BTreeMap<String, String>,
    store: Arc<Store>,
}

impl InMemoryScope {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(&self, name: &str) -> MetricKey {
        MetricKey {
            name: name.to_string(),
            tags: self.tags.clone(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let counters = self
            .store
            .counters
            .lock()
            .iter()
            .map(|(k, c)| (k.clone(), c.0.load(Ordering::Relaxed)))
            .collect();
        let timers = self
            .store
            .timers
            .lock()
            .iter()
            .map(|(k, t)| (k.clone(), t.0.lock().clone()))
            .collect();
        Snapshot { counters, timers }
    }
}

impl Scope for InMemoryScope {
    fn tagged(&self, tags: &[(&str, &str)]) -> Arc<dyn Scope> {
        let mut merged = self.tags.clone();
        for (k, v) in tags {
            merged.insert(k.to_string(), v.to_string());
        }
        Arc::new(InMemoryScope {
            tags: merged,
            store: Arc::clone(&self.store),
        })
    }

    fn counter(&self, name: &str) -> Arc<dyn Counter> {
        let counter = self
            .store
            .counters
            .lock()
            .entry(self.key(name))
            .or_default()
            .clone();
        counter
    }

    fn timer(&self, name: &str) -> Arc<dyn Timer> {
        let timer = self
            .store
            .timers
            .lock()
            .entry(self.key(name))
            .or_default()
            .clone();
        timer
    }
}

/// Point-in-time copy of an `InMemoryScope`.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    counters: BTreeMap<MetricKey, i64>,
    timers: BTreeMap<MetricKey, Vec<Duration>>,
}

impl Snapshot {
    /// Counter value, 0 when it was never created.
    pub fn counter(&self, name: &str, tags: &[(&str, &str)]) -> i64 {
        self.counters
            .get(&MetricKey::new(name, tags))
            .copied()
            .unwrap_or(0)
    }

    pub fn timer(&self, name: &str, tags: &[(&str, &str)]) -> &[Duration] {
        self.timers
            .get(&MetricKey::new(name, tags))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Flattened view keyed by `name+tags`, e.g. for printing.
    pub fn report(&self) -> SnapshotReport {
        SnapshotReport {
            counters: self
                .counters
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            timers: self
                .timers
                .iter()
                .map(|(k, v)| {
                    let total: Duration = v.iter().sum();
                    (
                        k.to_string(),
                        TimerReport {
                            samples: v.len(),
                            total_micros: total.as_micros() as u64,
                        },
                    )
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReport {
    pub counters: BTreeMap<String, i64>,
    pub timers: BTreeMap<String, TimerReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimerReport {
    pub samples: usize,
    pub total_micros: u64,
}
