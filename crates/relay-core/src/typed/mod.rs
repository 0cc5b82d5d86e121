//! Typed - 型付き Task API
//!
//! # 二層構造
//! - **表層（Typed）**: `TaskFn<A>` - 普通の async 関数がそのままタスクになる
//! - **内部（Dyn）**: `DynTask` - object-safe, type erasure。registry はこちらを保持
//!
//! 引数は `Arg`（型消去）として enqueue され、`Codec` で envelope になります。

pub mod args;
pub mod codec;
pub mod handler;
pub mod registry;
pub mod task;

pub use self::args::Arg;
pub use self::codec::Codec;
pub use self::handler::{DynTask, ReturnValue, TypedTask, cast_to_error};
pub use self::registry::{TaskMap, TaskRegistry};
pub use self::task::TaskFn;
