//! Arg - 型消去された enqueue 引数
//!
//! enqueue 時の引数は任意の型なので、`TypeDesc` と serialize 手段だけを
//! 抱えた `Arg` に包んで渡します。型チェックは dispatcher、encode は codec。

use std::any::Any;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::TypeDesc;

trait ErasedArg: Send + Sync {
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error>;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Serialize + DeserializeOwned + Send + Sync + 'static> ErasedArg for T {
    /// The value must read back as `T`; lossy conversions such as
    /// `f64::NAN` to `null` only surface on the way back.
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        let value = serde_json::to_value(self)?;
        T::deserialize(&value)?;
        Ok(value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One positional argument of an `enqueue` call.
pub struct Arg {
    ty: TypeDesc,
    value: Box<dyn ErasedArg>,
}

impl Arg {
    pub fn new<T: Serialize + DeserializeOwned + Send + Sync + 'static>(value: T) -> Self {
        Self {
            ty: TypeDesc::of::<T>(),
            value: Box::new(value),
        }
    }

    pub fn type_desc(&self) -> TypeDesc {
        self.ty
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.as_any().downcast_ref::<T>()
    }

    pub(crate) fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        self.value.to_json()
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arg").field("type", &self.ty.name()).finish()
    }
}

/// Build a `Vec<Arg>` from values.
///
/// ```ignore
/// dispatcher.enqueue(&send_mail, ctx, args!["hello".to_string(), 3u32]).await?;
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::typed::Arg>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::typed::Arg::new($value)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arg_keeps_its_concrete_type() {
        let arg = Arg::new(42u64);
        assert!(arg.type_desc().is::<u64>());
        assert_eq!(arg.downcast_ref::<u64>(), Some(&42));
        assert_eq!(arg.downcast_ref::<i64>(), None);
    }

    #[test]
    fn args_macro_wraps_each_value() {
        let args = crate::args!["x".to_string(), 1i32];
        assert_eq!(args.len(), 2);
        assert!(args[0].type_desc().is::<String>());
        assert!(args[1].type_desc().is::<i32>());
        assert!(crate::args![].is_empty());
    }

    #[test]
    fn debug_shows_type_name() {
        let arg = Arg::new(true);
        assert_eq!(format!("{arg:?}"), "Arg { type: \"bool\" }");
    }
}
