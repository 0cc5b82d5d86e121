//! Signature - タスク関数の「形」の記述
//!
//! 型付きの関数は `TaskFn` がコンパイル時に Signature を作ります。
//! 手書きの `DynTask` は自分で Signature を申告し、登録時に検証されます。

use std::any::TypeId;
use std::fmt;

use super::context::TaskContext;
use super::errors::{RegistrationError, TaskResult};

/// Runtime descriptor of a concrete type.
#[derive(Debug, Clone, Copy)]
pub struct TypeDesc {
    id: TypeId,
    name: &'static str,
}

impl TypeDesc {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeDesc {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDesc {}

impl std::hash::Hash for TypeDesc {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Shape of a registered value: its parameters and return values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    /// Something that cannot be called at all.
    Value(TypeDesc),
    Func {
        params: Vec<TypeDesc>,
        returns: Vec<TypeDesc>,
    },
}

impl Signature {
    pub fn func(params: Vec<TypeDesc>, returns: Vec<TypeDesc>) -> Self {
        Signature::Func { params, returns }
    }

    /// `fn(TaskContext, args..) -> TaskResult`
    pub fn task(args: Vec<TypeDesc>) -> Self {
        let mut params = Vec::with_capacity(args.len() + 1);
        params.push(TypeDesc::of::<TaskContext>());
        params.extend(args);
        Signature::func(params, vec![TypeDesc::of::<TaskResult>()])
    }

    /// Check the shape of a task function.
    ///
    /// Checks run in order: callable, has a context argument, context comes
    /// first, exactly one return value, the return value is error-shaped.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        let (params, returns) = match self {
            Signature::Value(ty) => {
                return Err(RegistrationError::NotAFunction {
                    found: ty.name().to_string(),
                });
            }
            Signature::Func { params, returns } => (params, returns),
        };

        let Some(first) = params.first() else {
            return Err(RegistrationError::MissingContextArg);
        };
        if !first.is::<TaskContext>() {
            return Err(RegistrationError::FirstArgNotContext {
                found: first.name().to_string(),
            });
        }

        if returns.len() != 1 {
            return Err(RegistrationError::MultipleReturnValues {
                found: returns.len(),
            });
        }
        if !returns[0].is::<TaskResult>() {
            return Err(RegistrationError::ReturnNotError {
                found: returns[0].name().to_string(),
            });
        }
        Ok(())
    }

    /// Parameters after the context; empty for non-callables.
    pub fn args(&self) -> &[TypeDesc] {
        match self {
            Signature::Func { params, .. } if !params.is_empty() => &params[1..],
            _ => &[],
        }
    }
}
