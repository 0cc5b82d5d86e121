//! DispatcherBuilder - Dispatcher の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - backend を渡さなければ config から InMemBackend を組み立てる

use std::sync::Arc;

use super::dispatcher::Dispatcher;
use crate::config::RelayConfig;
use crate::domain::{RegistrationError, TaskName};
use crate::impls::{InMemBackend, NoopScope};
use crate::ports::{Backend, Scope};
use crate::typed::{DynTask, TaskFn, TaskRegistry, TypedTask};

/// BuildError は Dispatcher 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing task types: {0:?}. These tasks were expected but not registered.")]
    MissingTaskTypes(Vec<String>),

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// DispatcherBuilder は Dispatcher を構築
///
/// # 使用例
/// ```ignore
/// let dispatcher = DispatcherBuilder::new()
///     .register(send_mail)?
///     .register_as("reports.nightly", nightly_report)?
///     .expect_tasks(&["reports.nightly"])
///     .config(RelayConfig::from_file("relay.toml")?)
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - register() の時点で Signature を検証
/// - expect_tasks() で期待されるタスク名を登録
/// - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
pub struct DispatcherBuilder {
    tasks: Vec<Arc<dyn DynTask>>,
    expected_tasks: Option<Vec<String>>,
    config: RelayConfig,
    backend: Option<Arc<dyn Backend>>,
    scope: Option<Arc<dyn Scope>>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            expected_tasks: None,
            config: RelayConfig::default(),
            backend: None,
            scope: None,
        }
    }

    /// Task を関数パスの名前で登録
    pub fn register<F, A>(self, func: F) -> Result<Self, RegistrationError>
    where
        F: TaskFn<A>,
        A: 'static,
    {
        self.register_dyn(Arc::new(TypedTask::new(func)))
    }

    pub fn register_as<F, A>(
        self,
        name: impl Into<TaskName>,
        func: F,
    ) -> Result<Self, RegistrationError>
    where
        F: TaskFn<A>,
        A: 'static,
    {
        self.register_dyn(Arc::new(TypedTask::named(name, func)))
    }

    pub fn register_dyn(mut self, task: Arc<dyn DynTask>) -> Result<Self, RegistrationError> {
        task.signature().validate()?;
        self.tasks.push(task);
        Ok(self)
    }

    /// 期待されるタスク名のリストを設定
    pub fn expect_tasks(mut self, names: &[&str]) -> Self {
        self.expected_tasks = Some(names.iter().map(|name| name.to_string()).collect());
        self
    }

    /// Settings for the default in-memory backend. Ignored when `backend` is set.
    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn metrics_scope(mut self, scope: Arc<dyn Scope>) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Dispatcher を構築
    ///
    /// # 検証
    /// - expect_tasks() で設定されたタスク名が全て登録されているかチェック
    /// - 不足があれば BuildError::MissingTaskTypes を返す
    pub fn build(self) -> Result<Dispatcher, BuildError> {
        if let Some(expected_tasks) = &self.expected_tasks {
            let missing_tasks: Vec<String> = expected_tasks
                .iter()
                .filter(|expected| {
                    !self
                        .tasks
                        .iter()
                        .any(|task| task.name().as_str() == expected.as_str())
                })
                .cloned()
                .collect();
            if !missing_tasks.is_empty() {
                return Err(BuildError::MissingTaskTypes(missing_tasks));
            }
        }

        let backend = match self.backend {
            Some(backend) => backend,
            None => Arc::new(InMemBackend::new(self.config.backend.clone())),
        };
        let scope: Arc<dyn Scope> = match self.scope {
            Some(scope) => scope,
            None => Arc::new(NoopScope),
        };

        let dispatcher =
            Dispatcher::with_registry(Arc::new(TaskRegistry::new()), backend, scope.as_ref());
        for task in self.tasks {
            dispatcher.register_dyn(task)?;
        }
        Ok(dispatcher)
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::config::{InMemConfig, Overflow};
    use crate::domain::{
        DecodingError, DispatchError, PublishError, Signature, TaskContext, TaskError, TypeDesc,
    };
    use crate::typed::ReturnValue;
    use async_trait::async_trait;

    async fn first(_ctx: TaskContext) -> Result<(), TaskError> {
        Ok(())
    }

    async fn second(_ctx: TaskContext, _n: u32) -> Result<(), TaskError> {
        Ok(())
    }

    #[test]
    fn test_build_success() {
        let dispatcher = DispatcherBuilder::new()
            .register_as("first", first)
            .unwrap()
            .expect_tasks(&["first"])
            .build()
            .unwrap();
        assert!(dispatcher.registry().contains("first"));
    }

    #[test]
    fn test_build_missing_task_types() {
        let result = DispatcherBuilder::new()
            .register_as("first", first)
            .unwrap()
            .expect_tasks(&["first", "second"])
            .build();
        assert!(matches!(
            result,
            Err(BuildError::MissingTaskTypes(missing)) if missing == vec!["second".to_string()]
        ));
    }

    #[test]
    fn test_build_no_expect_tasks() {
        let dispatcher = DispatcherBuilder::new()
            .register(first)
            .unwrap()
            .register(second)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(dispatcher.registry().len(), 2);
        assert!(dispatcher.codec().is_declared(&TypeDesc::of::<u32>()));
    }

    /// 関数ではない値を申告するアダプタ
    struct NotAFunction {
        name: TaskName,
        signature: Signature,
    }

    #[async_trait]
    impl DynTask for NotAFunction {
        fn name(&self) -> &TaskName {
            &self.name
        }

        fn signature(&self) -> &Signature {
            &self.signature
        }

        async fn invoke(
            &self,
            _ctx: TaskContext,
            _args: Vec<serde_json::Value>,
        ) -> Result<ReturnValue, DecodingError> {
            Ok(ReturnValue::new(()))
        }
    }

    #[test]
    fn invalid_task_fails_at_register() {
        let result = DispatcherBuilder::new().register_dyn(Arc::new(NotAFunction {
            name: TaskName::new("value"),
            signature: Signature::Value(TypeDesc::of::<&str>()),
        }));
        assert!(matches!(
            result,
            Err(RegistrationError::NotAFunction { .. })
        ));
    }

    #[tokio::test]
    async fn config_reaches_default_backend() {
        let dispatcher = DispatcherBuilder::new()
            .register_as("first", first)
            .unwrap()
            .config(RelayConfig {
                backend: InMemConfig {
                    capacity: 1,
                    overflow: Overflow::Reject,
                    error_buffer: 1,
                },
            })
            .build()
            .unwrap();

        dispatcher
            .enqueue_named("first", TaskContext::background(), args![])
            .await
            .unwrap();
        let err = dispatcher
            .enqueue_named("first", TaskContext::background(), args![])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Publish(PublishError::QueueFull { capacity: 1 })
        ));
    }
}
