//! Ports - 抽象化レイヤー
//!
//! エンジンの外側（配送、メトリクス、時刻、ID 生成）へのインターフェースです。
//! 実装は `impls` に置きます。

pub mod backend;
pub mod clock;
pub mod id_generator;
pub mod metrics;

pub use self::backend::{Backend, Executor};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::metrics::{Counter, Scope, Timer};
