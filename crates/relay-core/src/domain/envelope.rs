//! Envelope - backend を流れる「運搬用」データ

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::TaskContext;
use super::ids::DeliveryId;
use super::name::TaskName;

/// Function name + encoded arguments (+ delivery metadata).
///
/// Produced by `Codec::encode`, consumed by `Codec::decode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    id: DeliveryId,
    name: TaskName,
    args: Vec<serde_json::Value>,
    enqueued_at: DateTime<Utc>,
}

impl Envelope {
    pub fn new(
        id: DeliveryId,
        name: TaskName,
        args: Vec<serde_json::Value>,
        enqueued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            args,
            enqueued_at,
        }
    }

    pub fn id(&self) -> DeliveryId {
        self.id
    }

    pub fn name(&self) -> &TaskName {
        &self.name
    }

    pub fn args(&self) -> &[serde_json::Value] {
        &self.args
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    pub fn into_parts(self) -> (TaskName, Vec<serde_json::Value>) {
        (self.name, self.args)
    }
}

/// Backend queue entry: an encoded envelope plus the context it was enqueued with.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub ctx: TaskContext,
    pub payload: Vec<u8>,
}

impl Delivery {
    pub fn new(ctx: TaskContext, payload: Vec<u8>) -> Self {
        Self { ctx, payload }
    }
}
