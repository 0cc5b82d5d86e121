//! Dispatcher - Register / Enqueue / Run
//!
//! # 学習ポイント
//! - 呼び出し側は関数そのもので登録・enqueue できる（名前は型から導出）
//! - enqueue は引数の個数と型を登録済みの Signature と突き合わせてから encode する
//! - 実行は backend の consume loop が `Runtime` 経由で行う（enqueue は実行を待たない）

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::runtime::Runtime;
use super::stats::TaskMetrics;
use crate::domain::{
    BackendError, DispatchError, RegistrationError, RunResult, TaskContext, TaskName, TypeDesc,
};
use crate::impls::NoopScope;
use crate::ports::{Backend, Executor, Scope};
use crate::typed::{Arg, Codec, DynTask, TaskFn, TaskRegistry, TypedTask};

/// Dispatcher は registry・backend・metrics をまとめる
///
/// Cheap to clone; clones share the registry and backend.
///
/// # 使用例
/// ```ignore
/// let dispatcher = Dispatcher::new(Arc::new(InMemBackend::default()));
/// dispatcher.register(send_mail)?;
///
/// let (stop_tx, stop_rx) = watch::channel(false);
/// let mut results = dispatcher.start(stop_rx)?;
///
/// dispatcher
///     .enqueue(&send_mail, TaskContext::background(), args!["bob@example.com".to_string()])
///     .await?;
/// ```
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<TaskRegistry>,
    runtime: Arc<Runtime>,
    backend: Arc<dyn Backend>,
    metrics: Arc<TaskMetrics>,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_metrics(backend, &NoopScope)
    }

    pub fn with_metrics(backend: Arc<dyn Backend>, scope: &dyn Scope) -> Self {
        Self::with_registry(Arc::new(TaskRegistry::new()), backend, scope)
    }

    /// Dispatcher over an existing registry (e.g. one shared with other dispatchers).
    pub fn with_registry(
        registry: Arc<TaskRegistry>,
        backend: Arc<dyn Backend>,
        scope: &dyn Scope,
    ) -> Self {
        let metrics = Arc::new(TaskMetrics::new(scope));
        let runtime = Arc::new(Runtime::new(
            Arc::clone(&registry),
            backend.codec().clone(),
            Arc::clone(&metrics),
        ));
        Self {
            registry,
            runtime,
            backend,
            metrics,
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn codec(&self) -> &Codec {
        self.backend.codec()
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Register `func` under its derived name.
    ///
    /// The argument types of `func` are declared to the codec, so they can be
    /// enqueued right away.
    pub fn register<F, A>(&self, func: F) -> Result<TaskName, RegistrationError>
    where
        F: TaskFn<A>,
        A: 'static,
    {
        self.register_dyn(Arc::new(TypedTask::new(func)))
    }

    /// Register `func` under an explicit name; enqueue it with `enqueue_named`.
    pub fn register_as<F, A>(
        &self,
        name: impl Into<TaskName>,
        func: F,
    ) -> Result<TaskName, RegistrationError>
    where
        F: TaskFn<A>,
        A: 'static,
    {
        self.register_dyn(Arc::new(TypedTask::named(name, func)))
    }

    /// Register a hand-written adapter. Its signature is validated like any other.
    ///
    /// Parameter types are declared before the task becomes visible, so a
    /// concurrent `enqueue` never sees it with undeclared types.
    pub fn register_dyn(&self, task: Arc<dyn DynTask>) -> Result<TaskName, RegistrationError> {
        task.signature().validate()?;

        let codec = self.backend.codec();
        for ty in task.signature().args() {
            codec.declare_type(*ty);
        }

        let name = task.name().clone();
        self.registry.register(task)?;
        Ok(name)
    }

    /// Enqueue a call of `func`, which must have been registered with `register`.
    ///
    /// Returns once the backend accepted the envelope; execution results arrive
    /// on the channel returned by `start`.
    pub async fn enqueue<F>(
        &self,
        func: &F,
        ctx: TaskContext,
        args: Vec<Arg>,
    ) -> Result<(), DispatchError>
    where
        F: ?Sized + 'static,
    {
        let name = TaskName::of_val(func);
        self.enqueue_named(name.as_str(), ctx, args).await
    }

    /// Enqueue a call of the task registered as `name`.
    pub async fn enqueue_named(
        &self,
        name: &str,
        ctx: TaskContext,
        args: Vec<Arg>,
    ) -> Result<(), DispatchError> {
        let task = self
            .registry
            .lookup(name)
            .ok_or_else(|| DispatchError::NotRegistered {
                name: TaskName::new(name),
            })?;

        check_args(task.signature().args(), &args)?;
        let payload = self.backend.codec().encode(task.name(), &args)?;

        let stopwatch = self.metrics.publish.start();
        let published = self.backend.publish(payload, ctx).await;
        stopwatch.finish(&published);
        published?;

        debug!(task = %task.name(), args = args.len(), "published task");
        Ok(())
    }

    /// Decode and execute one payload, as the backend's consume loop does.
    pub async fn run(&self, ctx: TaskContext, payload: &[u8]) -> RunResult {
        self.runtime.run(ctx, payload).await
    }

    /// Start the backend's consume loop; results arrive on the returned channel.
    pub fn start(
        &self,
        stop: watch::Receiver<bool>,
    ) -> Result<mpsc::Receiver<RunResult>, BackendError> {
        let executor: Arc<dyn Executor> = self.runtime.clone();
        self.backend.start(executor, stop)
    }
}

/// Count, then per-position type, against the registered parameters.
fn check_args(params: &[TypeDesc], args: &[Arg]) -> Result<(), DispatchError> {
    if params.len() != args.len() {
        return Err(DispatchError::ArgumentCountMismatch {
            expected: params.len(),
            found: args.len(),
        });
    }
    for (index, (param, arg)) in params.iter().zip(args).enumerate() {
        let given = arg.type_desc();
        if given != *param {
            return Err(DispatchError::ArgumentTypeMismatch {
                position: index + 2,
                from: given.name(),
                to: param.name(),
            });
        }
    }
    Ok(())
}
