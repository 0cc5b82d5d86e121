use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::borrow::Borrow;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

const CLOSURE_MARKER: &str = "{{closure}}";

/// Registry key of a task function.
///
/// Derived from the declaring path of the function value's type
/// (`std::any::type_name`), so the same function item always yields the same
/// name, e.g. `my_app::jobs::send_mail`. Closures share their path with every
/// other closure of the enclosing function (`my_app::main::{{closure}}`), so
/// their names also carry a hash of their `TypeId`
/// (`my_app::main::{{closure}}#5f0c..`), stable within one process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskName(String);

impl TaskName {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Name of the function value `F`.
    pub fn of<F: ?Sized + 'static>() -> Self {
        let path = std::any::type_name::<F>();
        if !path.contains(CLOSURE_MARKER) {
            return Self(path.to_string());
        }
        let mut hasher = DefaultHasher::new();
        TypeId::of::<F>().hash(&mut hasher);
        Self(format!("{path}#{:016x}", hasher.finish()))
    }

    /// Same as [`TaskName::of`], inferred from a reference to the value.
    pub fn of_val<F: ?Sized + 'static>(_: &F) -> Self {
        Self::of::<F>()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for TaskName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskName {
    fn from(s: String) -> Self {
        Self(s)
    }
}
