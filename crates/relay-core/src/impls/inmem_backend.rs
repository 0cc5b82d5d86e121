//! InMemBackend - プロセス内の非永続な配送
//!
//! - bounded な `tokio::sync::mpsc` キュー（FIFO）と consumer タスク 1 本
//! - publish は実行を待たない（満杯時は設定に応じて待つか即エラー）
//! - 未消費の envelope はプロセス停止で失われる

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::config::{InMemConfig, Overflow};
use crate::domain::{BackendError, Delivery, PublishError, RunResult, TaskContext};
use crate::ports::{Backend, Executor};
use crate::typed::Codec;

/// InMemBackend は開発・テスト用の配送
///
/// # 使用例
/// ```ignore
/// let backend = InMemBackend::new(InMemConfig::default());
/// let (stop_tx, stop_rx) = watch::channel(false);
/// let mut errors = backend.start(executor, stop_rx)?;
/// ```
pub struct InMemBackend {
    config: InMemConfig,
    codec: Codec,
    queue_tx: mpsc::Sender<Delivery>,
    /// `start` で consumer に渡すまでここで保持
    queue_rx: Mutex<Option<mpsc::Receiver<Delivery>>>,
}

impl InMemBackend {
    pub fn new(config: InMemConfig) -> Self {
        Self::with_codec(config, Codec::new())
    }

    pub fn with_codec(config: InMemConfig, codec: Codec) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(config.capacity.max(1));
        Self {
            config,
            codec,
            queue_tx,
            queue_rx: Mutex::new(Some(queue_rx)),
        }
    }

    pub fn config(&self) -> &InMemConfig {
        &self.config
    }

    /// Envelopes published but not yet dequeued.
    pub fn pending(&self) -> usize {
        self.queue_tx.max_capacity() - self.queue_tx.capacity()
    }
}

impl Default for InMemBackend {
    fn default() -> Self {
        Self::new(InMemConfig::default())
    }
}

#[async_trait]
impl Backend for InMemBackend {
    fn codec(&self) -> &Codec {
        &self.codec
    }

    async fn publish(&self, payload: Vec<u8>, ctx: TaskContext) -> Result<(), PublishError> {
        let delivery = Delivery::new(ctx, payload);
        match self.config.overflow {
            Overflow::Block => self
                .queue_tx
                .send(delivery)
                .await
                .map_err(|_| PublishError::Closed),
            Overflow::Reject => self.queue_tx.try_send(delivery).map_err(|e| match e {
                TrySendError::Full(_) => PublishError::QueueFull {
                    capacity: self.queue_tx.max_capacity(),
                },
                TrySendError::Closed(_) => PublishError::Closed,
            }),
        }
    }

    /// Must be called from within a tokio runtime.
    fn start(
        &self,
        executor: Arc<dyn Executor>,
        stop: watch::Receiver<bool>,
    ) -> Result<mpsc::Receiver<RunResult>, BackendError> {
        let queue = self
            .queue_rx
            .lock()
            .take()
            .ok_or(BackendError::AlreadyStarted)?;
        let (errors_tx, errors_rx) = mpsc::channel(self.config.error_buffer.max(1));

        tokio::spawn(consume_loop(queue, executor, errors_tx, stop));
        Ok(errors_rx)
    }
}

/// Dequeue, run, report; until `stop` turns true or its sender is dropped.
///
/// An in-flight `run` is never interrupted. A result still waiting for the
/// error channel reader when stop fires is dropped.
async fn consume_loop(
    mut queue: mpsc::Receiver<Delivery>,
    executor: Arc<dyn Executor>,
    errors: mpsc::Sender<RunResult>,
    mut stop: watch::Receiver<bool>,
) {
    debug!("in-memory consumer started");
    loop {
        let delivery = tokio::select! {
            biased;
            _ = stop.wait_for(|stopped| *stopped) => break,
            delivery = queue.recv() => match delivery {
                Some(delivery) => delivery,
                None => break,
            },
        };

        let result = executor.run(delivery.ctx, &delivery.payload).await;

        tokio::select! {
            biased;
            _ = stop.wait_for(|stopped| *stopped) => break,
            sent = errors.send(result) => {
                if sent.is_err() {
                    debug!("error channel receiver dropped");
                    break;
                }
            }
        }
    }
    debug!(dropped = queue.len(), "in-memory consumer stopped");
}
