//! TaskFn - 普通の async 関数をタスクとして扱うためのアダプタ
//!
//! `async fn(TaskContext, A1, .., An) -> Result<(), E>`（n <= 6）に対して
//! blanket impl を用意し、Signature をコンパイル時に導出します。
//!
//! ```ignore
//! async fn send_mail(ctx: TaskContext, to: String) -> Result<(), TaskError> { ... }
//!
//! dispatcher.register(send_mail)?;
//! ```

use std::future::Future;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;

use crate::domain::{DecodingError, Signature, TaskContext, TaskError, TaskResult, TypeDesc};

/// A function usable as a task, generic over its argument tuple `Args`.
pub trait TaskFn<Args>: Send + Sync + 'static {
    fn signature() -> Signature;

    /// Decode `args` against the parameter types and start the call.
    ///
    /// Decoding happens before the function is invoked; a decoding failure
    /// never runs the function.
    fn call_with(
        &self,
        ctx: TaskContext,
        args: Vec<serde_json::Value>,
    ) -> Result<BoxFuture<'static, TaskResult>, DecodingError>;
}

/// Position 1 is the context, so the first decoded argument is position 2.
fn decode_arg<T: DeserializeOwned + 'static>(
    position: usize,
    value: serde_json::Value,
) -> Result<T, DecodingError> {
    serde_json::from_value(value).map_err(|source| DecodingError::Argument {
        position,
        type_name: std::any::type_name::<T>(),
        source,
    })
}

macro_rules! count {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

macro_rules! impl_task_fn {
    ($($arg:ident),*) => {
        impl<F, Fut, E, $($arg,)*> TaskFn<($($arg,)*)> for F
        where
            F: Fn(TaskContext, $($arg,)*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<(), E>> + Send + 'static,
            E: Into<TaskError>,
            $($arg: DeserializeOwned + Send + 'static,)*
        {
            fn signature() -> Signature {
                Signature::task(vec![$(TypeDesc::of::<$arg>(),)*])
            }

            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn call_with(
                &self,
                ctx: TaskContext,
                args: Vec<serde_json::Value>,
            ) -> Result<BoxFuture<'static, TaskResult>, DecodingError> {
                let expected = count!($($arg)*);
                if args.len() != expected {
                    return Err(DecodingError::ArgumentCount {
                        expected,
                        found: args.len(),
                    });
                }

                let mut values = args.into_iter();
                let mut position = 1usize;
                $(
                    position += 1;
                    let $arg: $arg = decode_arg(position, values.next().unwrap_or_default())?;
                )*

                let fut = (self)(ctx, $($arg,)*);
                Ok(Box::pin(async move { fut.await.map_err(Into::into) }))
            }
        }
    };
}

impl_task_fn!();
impl_task_fn!(A1);
impl_task_fn!(A1, A2);
impl_task_fn!(A1, A2, A3);
impl_task_fn!(A1, A2, A3, A4);
impl_task_fn!(A1, A2, A3, A4, A5);
impl_task_fn!(A1, A2, A3, A4, A5, A6);

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Car {
        brand: String,
        year: i32,
    }

    async fn only_context(_ctx: TaskContext) -> Result<(), TaskError> {
        Ok(())
    }

    async fn with_struct(_ctx: TaskContext, car: Car, note: String) -> Result<(), TaskError> {
        if car.brand == "infinity" {
            return Err(format!("Complex error: {note}").into());
        }
        Ok(())
    }

    fn signature_of<F: TaskFn<A>, A>(_: &F) -> Signature {
        F::signature()
    }

    fn call<F: TaskFn<A>, A>(
        f: &F,
        args: Vec<serde_json::Value>,
    ) -> Result<BoxFuture<'static, TaskResult>, DecodingError> {
        f.call_with(TaskContext::background(), args)
    }

    #[test]
    fn signature_lists_args_after_context() {
        let sig = signature_of(&with_struct);
        sig.validate().unwrap();
        assert_eq!(
            sig.args(),
            &[TypeDesc::of::<Car>(), TypeDesc::of::<String>()]
        );
        assert!(signature_of(&only_context).args().is_empty());
    }

    #[tokio::test]
    async fn call_decodes_args_and_runs() {
        let ok = call(
            &with_struct,
            vec![json!({"brand": "honda", "year": 2017}), json!("n")],
        )
        .unwrap()
        .await;
        assert!(ok.is_ok());

        let err = call(
            &with_struct,
            vec![json!({"brand": "infinity", "year": 2017}), json!("n")],
        )
        .unwrap()
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Complex error: n");
    }

    #[test]
    fn call_rejects_wrong_arg_count() {
        let err = call(&with_struct, vec![json!("only one")]).err().unwrap();
        assert!(matches!(
            err,
            DecodingError::ArgumentCount {
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn call_names_position_of_undecodable_arg() {
        let err = call(
            &with_struct,
            vec![json!({"brand": "honda", "year": 2017}), json!(12)],
        )
        .err()
        .unwrap();
        match err {
            DecodingError::Argument {
                position,
                type_name,
                ..
            } => {
                assert_eq!(position, 3);
                assert_eq!(type_name, "alloc::string::String");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn closures_are_tasks_too() {
        let f = |_ctx: TaskContext, n: u32| async move {
            if n == 0 {
                Err("zero")
            } else {
                Ok(())
            }
        };
        let err = call(&f, vec![json!(0)]).unwrap().await.unwrap_err();
        assert_eq!(err.to_string(), "zero");
    }
}
