//! Stats - publish / execution のメトリクス
//!
//! ホストの `Scope` を `{module=task, type=execution|publish}` でタグ付けし、
//! それぞれに `count` / `fail` / `time` を置きます。

use std::sync::Arc;
use std::time::Instant;

use crate::ports::{Counter, Scope, Timer};

pub const TAG_MODULE: &str = "module";
pub const TAG_TYPE: &str = "type";
pub const MODULE_TASK: &str = "task";
pub const TYPE_EXECUTION: &str = "execution";
pub const TYPE_PUBLISH: &str = "publish";

pub const COUNT: &str = "count";
pub const FAIL: &str = "fail";
pub const TIME: &str = "time";

/// Handles for one operation type.
pub struct OperationMetrics {
    count: Arc<dyn Counter>,
    fail: Arc<dyn Counter>,
    time: Arc<dyn Timer>,
}

impl OperationMetrics {
    fn new(scope: &dyn Scope, operation: &str) -> Self {
        let scope = scope.tagged(&[(TAG_MODULE, MODULE_TASK), (TAG_TYPE, operation)]);
        Self {
            count: scope.counter(COUNT),
            fail: scope.counter(FAIL),
            time: scope.timer(TIME),
        }
    }

    /// Count one attempt and start timing it.
    pub fn start(&self) -> Stopwatch<'_> {
        self.count.inc(1);
        Stopwatch {
            metrics: self,
            started: Instant::now(),
        }
    }
}

/// Running attempt; `finish` records its latency and failure.
#[must_use]
pub struct Stopwatch<'a> {
    metrics: &'a OperationMetrics,
    started: Instant,
}

impl Stopwatch<'_> {
    pub fn finish<T, E>(self, result: &Result<T, E>) {
        self.metrics.time.record(self.started.elapsed());
        if result.is_err() {
            self.metrics.fail.inc(1);
        }
    }
}

pub struct TaskMetrics {
    pub execution: OperationMetrics,
    pub publish: OperationMetrics,
}

impl TaskMetrics {
    pub fn new(scope: &dyn Scope) -> Self {
        Self {
            execution: OperationMetrics::new(scope, TYPE_EXECUTION),
            publish: OperationMetrics::new(scope, TYPE_PUBLISH),
        }
    }
}
