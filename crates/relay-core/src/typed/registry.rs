//! TaskRegistry - タスクの登録と検索
//!
//! producer（enqueue）と consumer（run）の両方から同時に読まれる唯一の
//! 共有可変状態です。`parking_lot::RwLock` で保護し、`replace_all` による
//! 丸ごと差し替えも読み手から見てアトミックになります。

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::handler::DynTask;
use crate::domain::{RegistrationError, TaskName};

pub type TaskMap = HashMap<TaskName, Arc<dyn DynTask>>;

/// TaskRegistry は DynTask を名前で管理
///
/// # 使用例
/// ```ignore
/// let registry = TaskRegistry::new();
/// registry.register(Arc::new(TypedTask::new(send_mail)))?;
///
/// let task = registry.lookup("my_app::jobs::send_mail");
/// ```
#[derive(Default)]
pub struct TaskRegistry {
    tasks: RwLock<TaskMap>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the task's signature and store it under its name.
    ///
    /// Registering a name again replaces the previous entry ("last wins").
    pub fn register(&self, task: Arc<dyn DynTask>) -> Result<(), RegistrationError> {
        task.signature().validate()?;

        let name = task.name().clone();
        let replaced = self.tasks.write().insert(name.clone(), task).is_some();
        debug!(task = %name, replaced, "registered task");
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn DynTask>> {
        self.tasks.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.read().contains_key(name)
    }

    /// Swap the whole mapping at once, returning the previous one.
    pub fn replace_all(&self, tasks: TaskMap) -> TaskMap {
        std::mem::replace(&mut *self.tasks.write(), tasks)
    }

    pub fn clear(&self) -> TaskMap {
        self.replace_all(TaskMap::new())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<TaskName> {
        let mut names: Vec<TaskName> = self.tasks.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}
