//! Metrics port - ホスト側が提供するメトリクススコープ
//!
//! タグ付きスコープからカウンタとタイマーを取り出す、tally 風の最小 API です。
//! 実装は `impls::metrics`（NoopScope / InMemoryScope）を参照。

use std::sync::Arc;
use std::time::Duration;

pub trait Counter: Send + Sync {
    fn inc(&self, delta: i64);
}

pub trait Timer: Send + Sync {
    fn record(&self, elapsed: Duration);
}

/// A metrics scope; tags accumulate through `tagged`.
pub trait Scope: Send + Sync {
    fn tagged(&self, tags: &[(&str, &str)]) -> Arc<dyn Scope>;
    fn counter(&self, name: &str) -> Arc<dyn Counter>;
    fn timer(&self, name: &str) -> Arc<dyn Timer>;
}
