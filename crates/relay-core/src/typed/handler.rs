//! DynTask - registry に格納される object-safe なタスク
//!
//! - `TypedTask<F, A>` が `TaskFn<A>` を `DynTask` に変換する（type erasure）
//! - 手書きのアダプタは `DynTask` を直接実装し、自分の Signature を申告する

use std::any::Any;
use std::marker::PhantomData;

use async_trait::async_trait;

use super::task::TaskFn;
use crate::domain::{
    DecodingError, ExecutionError, Signature, TaskContext, TaskError, TaskName, TaskResult,
};

/// The single value a task invocation returned, before it is checked.
pub struct ReturnValue {
    type_name: &'static str,
    value: Box<dyn Any + Send>,
}

impl ReturnValue {
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            value: Box::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Checked cast of a task's return value to its error.
///
/// `Ok(None)` on success, `Ok(Some(err))` for a business error, and
/// `InvalidReturnValue` when the value is not error-shaped.
pub fn cast_to_error(value: ReturnValue) -> Result<Option<TaskError>, ExecutionError> {
    let ReturnValue { type_name, value } = value;
    let value = match value.downcast::<TaskResult>() {
        Ok(result) => return Ok((*result).err()),
        Err(value) => value,
    };
    match value.downcast::<TaskError>() {
        Ok(err) => Ok(Some(*err)),
        Err(_) => Err(ExecutionError::InvalidReturnValue { found: type_name }),
    }
}

/// Object-safe task stored in the registry.
#[async_trait]
pub trait DynTask: Send + Sync {
    fn name(&self) -> &TaskName;

    fn signature(&self) -> &Signature;

    /// Decode `args` and invoke the task.
    async fn invoke(
        &self,
        ctx: TaskContext,
        args: Vec<serde_json::Value>,
    ) -> Result<ReturnValue, DecodingError>;
}

/// Wraps a typed task function as a `DynTask`.
pub struct TypedTask<F, A> {
    name: TaskName,
    signature: Signature,
    func: F,
    _marker: PhantomData<fn() -> A>,
}

impl<F: TaskFn<A>, A> TypedTask<F, A> {
    /// Named after the function's own path.
    pub fn new(func: F) -> Self {
        Self::named(TaskName::of::<F>(), func)
    }

    pub fn named(name: impl Into<TaskName>, func: F) -> Self {
        Self {
            name: name.into(),
            signature: F::signature(),
            func,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F: TaskFn<A>, A: 'static> DynTask for TypedTask<F, A> {
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    async fn invoke(
        &self,
        ctx: TaskContext,
        args: Vec<serde_json::Value>,
    ) -> Result<ReturnValue, DecodingError> {
        let fut = self.func.call_with(ctx, args)?;
        Ok(ReturnValue::new(fut.await))
    }
}
