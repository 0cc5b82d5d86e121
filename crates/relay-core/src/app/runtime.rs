//! Runtime - envelope 1 件の実行
//!
//! # フロー
//! 1. Codec で decode（失敗は `ExecutionError::Decoding`、関数は呼ばれない）
//! 2. Registry から名前で lookup（無ければ `NotRegistered`）
//! 3. 引数を登録済みの型に decode して invoke
//! 4. 戻り値を error に cast（できなければ `InvalidReturnValue`）
//!
//! 実行中の panic は `ExecutionError::Panicked` に変換します。
//! どの経路でも execution の count / fail / time を 1 回ずつ記録します。

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use tracing::{debug, warn};

use super::stats::TaskMetrics;
use crate::domain::{ExecutionError, RunResult, TaskContext};
use crate::ports::Executor;
use crate::typed::{Codec, TaskRegistry, cast_to_error};

/// Runtime は registry と codec を使って envelope を実行
pub struct Runtime {
    registry: Arc<TaskRegistry>,
    codec: Codec,
    metrics: Arc<TaskMetrics>,
}

impl Runtime {
    pub fn new(registry: Arc<TaskRegistry>, codec: Codec, metrics: Arc<TaskMetrics>) -> Self {
        Self {
            registry,
            codec,
            metrics,
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    async fn execute(&self, ctx: TaskContext, payload: &[u8]) -> RunResult {
        let envelope = self.codec.decode(payload)?;
        let queued_for = Utc::now() - envelope.enqueued_at();
        debug!(
            delivery = %envelope.id(),
            task = %envelope.name(),
            queued_ms = queued_for.num_milliseconds(),
            "running task"
        );

        let (name, args) = envelope.into_parts();
        let task = self
            .registry
            .lookup(name.as_str())
            .ok_or_else(|| ExecutionError::NotRegistered { name: name.clone() })?;

        let value = match AssertUnwindSafe(task.invoke(ctx, args))
            .catch_unwind()
            .await
        {
            Ok(invoked) => invoked?,
            Err(panic) => {
                return Err(ExecutionError::Panicked {
                    name,
                    message: panic_message(panic.as_ref()),
                });
            }
        };

        match cast_to_error(value)? {
            None => Ok(()),
            Some(err) => Err(ExecutionError::Failed(err)),
        }
    }
}

#[async_trait]
impl Executor for Runtime {
    async fn run(&self, ctx: TaskContext, payload: &[u8]) -> RunResult {
        let stopwatch = self.metrics.execution.start();
        let result = self.execute(ctx, payload).await;
        stopwatch.finish(&result);

        if let Err(err) = &result {
            warn!(error = %err, business = err.is_business(), "task execution failed");
        }
        result
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::domain::{DecodingError, TaskError, TaskName};
    use crate::impls::InMemoryScope;
    use crate::typed::TypedTask;

    async fn greet(_ctx: TaskContext, name: String) -> Result<(), TaskError> {
        if name.is_empty() {
            return Err("empty name".into());
        }
        Ok(())
    }

    async fn explode(_ctx: TaskContext) -> Result<(), TaskError> {
        panic!("kaboom");
    }

    fn runtime_with(tasks: Vec<Arc<dyn crate::typed::DynTask>>) -> (Runtime, InMemoryScope) {
        let registry = Arc::new(TaskRegistry::new());
        for task in tasks {
            registry.register(task).unwrap();
        }
        let scope = InMemoryScope::new();
        let metrics = Arc::new(TaskMetrics::new(&scope));
        (Runtime::new(registry, Codec::new(), metrics), scope)
    }

    #[tokio::test]
    async fn runs_registered_task() {
        let (rt, _) = runtime_with(vec![Arc::new(TypedTask::named("greet", greet))]);
        let payload = rt
            .codec
            .encode(&TaskName::new("greet"), &args!["ann".to_string()])
            .unwrap();
        rt.run(TaskContext::background(), &payload).await.unwrap();
    }

    #[tokio::test]
    async fn business_error_is_returned_unchanged() {
        let (rt, _) = runtime_with(vec![Arc::new(TypedTask::named("greet", greet))]);
        let payload = rt
            .codec
            .encode(&TaskName::new("greet"), &args![String::new()])
            .unwrap();
        let err = rt.run(TaskContext::background(), &payload).await.unwrap_err();
        assert!(err.is_business());
        assert_eq!(err.to_string(), "empty name");
    }

    #[tokio::test]
    async fn garbage_payload_is_a_decoding_error() {
        let (rt, scope) = runtime_with(vec![]);
        let err = rt
            .run(TaskContext::background(), b"not an envelope")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Decoding(DecodingError::Envelope(_))
        ));
        assert_eq!(
            scope
                .snapshot()
                .counter("fail", &[("module", "task"), ("type", "execution")]),
            1
        );
    }

    #[tokio::test]
    async fn wrong_argument_type_names_the_position() {
        let (rt, _) = runtime_with(vec![Arc::new(TypedTask::named("greet", greet))]);
        let payload = rt
            .codec
            .encode(&TaskName::new("greet"), &args![42u32])
            .unwrap();
        let err = rt.run(TaskContext::background(), &payload).await.unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::Decoding(DecodingError::Argument { position: 2, .. })
        ));
    }

    #[tokio::test]
    async fn unknown_name_is_not_registered() {
        let (rt, _) = runtime_with(vec![]);
        let payload = rt.codec.encode(&TaskName::new("gone"), &[]).unwrap();
        let err = rt.run(TaskContext::background(), &payload).await.unwrap_err();
        assert_eq!(err.to_string(), "function \"gone\" not found");
    }

    #[tokio::test]
    async fn panic_becomes_panicked_error() {
        let (rt, scope) = runtime_with(vec![Arc::new(TypedTask::named("explode", explode))]);
        let payload = rt.codec.encode(&TaskName::new("explode"), &[]).unwrap();
        let err = rt.run(TaskContext::background(), &payload).await.unwrap_err();
        match err {
            ExecutionError::Panicked { name, message } => {
                assert_eq!(name.as_str(), "explode");
                assert_eq!(message, "kaboom");
            }
            other => panic!("unexpected error: {other}"),
        }
        let snap = scope.snapshot();
        let tags = [("module", "task"), ("type", "execution")];
        assert_eq!(snap.counter("count", &tags), 1);
        assert_eq!(snap.counter("fail", &tags), 1);
    }
}
