//! Backend port - 配送の抽象化
//!
//! Backend は encode 済みの envelope を運び、consume loop で `Executor::run`
//! を呼び出して結果を error channel に 1 件ずつ流します。
//!
//! # 設計原則
//! - publish の失敗（満杯・クローズ）は enqueue の呼び出し元に返す
//! - 結果は envelope 1 件につき必ず 1 回だけ error channel に書く
//! - stop 後は error channel に書かない（sender を drop してチャネルを閉じる）
//! - durability / retry / exactly-once は実装ごとの責務

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::domain::{BackendError, PublishError, RunResult, TaskContext};
use crate::typed::Codec;

/// Runs one encoded envelope. Implemented by the dispatcher's runtime.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn run(&self, ctx: TaskContext, payload: &[u8]) -> RunResult;
}

/// Pluggable transport between `enqueue` and `run`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Codec used to encode envelopes for this transport.
    fn codec(&self) -> &Codec;

    /// Hand an encoded envelope to the transport.
    async fn publish(&self, payload: Vec<u8>, ctx: TaskContext) -> Result<(), PublishError>;

    /// Spawn the consume loop.
    ///
    /// The loop stops dequeuing once `stop` turns `true` (or its sender is
    /// dropped); the returned channel closes after the loop exits.
    fn start(
        &self,
        executor: Arc<dyn Executor>,
        stop: watch::Receiver<bool>,
    ) -> Result<mpsc::Receiver<RunResult>, BackendError>;
}
