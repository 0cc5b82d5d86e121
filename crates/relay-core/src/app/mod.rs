//! App - アプリケーション層
//!
//! このモジュールは、ports と typed を組み合わせてエンジン本体を実装します。
//!
//! # 主要コンポーネント
//! - **Dispatcher**: Register / Enqueue / Run の表面
//! - **DispatcherBuilder**: 構築とワイヤリング（Fail-fast 検証）
//! - **Runtime**: envelope 1 件の decode → lookup → invoke（backend の Executor）
//! - **TaskMetrics**: publish / execution の count / fail / time

pub mod builder;
pub mod dispatcher;
pub mod runtime;
pub mod stats;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, DispatcherBuilder};
pub use self::dispatcher::Dispatcher;
pub use self::runtime::Runtime;
pub use self::stats::TaskMetrics;
