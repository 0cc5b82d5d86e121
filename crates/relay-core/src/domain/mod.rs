//! Domain model (names, signatures, envelopes, errors, ...).

pub mod context;
pub mod envelope;
pub mod errors;
pub mod ids;
pub mod name;
pub mod signature;

pub use self::context::TaskContext;
pub use self::envelope::{Delivery, Envelope};
pub use self::errors::{
    BackendError, DecodingError, DispatchError, EncodingError, ExecutionError, PublishError,
    RegistrationError, RunResult, TaskError, TaskResult,
};
pub use self::ids::{DeliveryId, Id, IdMarker};
pub use self::name::TaskName;
pub use self::signature::{Signature, TypeDesc};
