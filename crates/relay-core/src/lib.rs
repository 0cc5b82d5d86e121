//! relay-core
//!
//! In-process asynchronous task dispatch: register plain async functions,
//! enqueue calls to them by identity with serialized arguments, and run them
//! off a pluggable backend.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（TaskName, Signature, Envelope, TaskContext, errors）
//! - **ports**: 抽象化レイヤー（Backend, Executor, metrics Scope, Clock, IdGenerator）
//! - **typed**: 型付き Task API（TaskFn, DynTask, TaskRegistry, Codec, Arg）
//! - **impls**: 実装（InMemBackend, NoopScope, InMemoryScope）
//! - **app**: アプリケーションロジック（Dispatcher, DispatcherBuilder, Runtime）
//! - **config**: 設定（TOML + 環境変数）
//!
//! ```ignore
//! async fn send_mail(ctx: TaskContext, to: String) -> Result<(), TaskError> { ... }
//!
//! let dispatcher = DispatcherBuilder::new().register(send_mail)?.build()?;
//! let (stop_tx, stop_rx) = watch::channel(false);
//! let mut results = dispatcher.start(stop_rx)?;
//!
//! dispatcher
//!     .enqueue(&send_mail, TaskContext::background(), args!["ann@example.com".to_string()])
//!     .await?;
//! let result = results.recv().await;
//! ```

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod typed;

pub use self::app::{BuildError, Dispatcher, DispatcherBuilder};
pub use self::config::{InMemConfig, Overflow, RelayConfig};
pub use self::domain::{
    DispatchError, ExecutionError, RegistrationError, RunResult, TaskContext, TaskError,
    TaskName, TaskResult,
};
pub use self::impls::{InMemBackend, InMemoryScope, NoopScope};
pub use self::typed::Arg;
