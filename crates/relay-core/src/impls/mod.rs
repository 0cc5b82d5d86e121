//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemBackend**: 非永続・プロセス内の配送（bounded mpsc + consumer 1 本）
//! - **NoopScope**: 何も記録しないメトリクス
//! - **InMemoryScope**: snapshot で読み出せるメトリクス（テスト・デモ用）
//!
//! # 本番用実装
//! 永続化・再送を持つ backend は別クレートで `ports::Backend` を実装します。

pub mod inmem_backend;
pub mod metrics;

// 主要な型を再エクスポート
pub use self::inmem_backend::InMemBackend;
pub use self::metrics::{InMemoryScope, MetricKey, NoopScope, Snapshot, SnapshotReport, TimerReport};
