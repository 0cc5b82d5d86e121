//! Codec - (関数名, 引数) と bytes の相互変換
//!
//! # エンコードフロー
//! 1. 引数の型が declare 済みかチェック（未宣言なら `EncodingError::Undeclared`）
//! 2. 各引数を serde_json::Value に変換し、元の型に読み戻せるか確認
//!    （失敗なら `EncodingError::Unencodable`。NaN → null のような欠落もここで弾く）
//! 3. DeliveryId と時刻を付けた `Envelope` を JSON bytes にする
//!
//! スカラー型（bool, 数値, char, String, ()）は最初から宣言済みです。
//! 構造体・map・Vec などは `declare::<T>()` が必要ですが、
//! `Dispatcher::register` が引数の型を自動で宣言します。

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::args::Arg;
use crate::domain::{DecodingError, EncodingError, Envelope, TaskName, TypeDesc};
use crate::ports::{Clock, IdGenerator, SystemClock, UlidGenerator};

/// Encodes calls into envelopes and back. Cheap to clone; clones share the
/// set of declared types.
#[derive(Clone)]
pub struct Codec {
    inner: Arc<CodecInner>,
}

struct CodecInner {
    declared: RwLock<HashMap<TypeId, &'static str>>,
    ids: Box<dyn IdGenerator>,
    clock: Box<dyn Clock>,
}

impl Codec {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Codec whose envelope ids and timestamps come from `clock`.
    pub fn with_clock<C: Clock + Clone + 'static>(clock: C) -> Self {
        let codec = Self {
            inner: Arc::new(CodecInner {
                declared: RwLock::new(HashMap::new()),
                ids: Box::new(UlidGenerator::new(clock.clone())),
                clock: Box::new(clock),
            }),
        };
        codec.declare_builtins();
        codec
    }

    fn declare_builtins(&self) {
        let builtins = [
            TypeDesc::of::<()>(),
            TypeDesc::of::<bool>(),
            TypeDesc::of::<char>(),
            TypeDesc::of::<String>(),
            TypeDesc::of::<i8>(),
            TypeDesc::of::<i16>(),
            TypeDesc::of::<i32>(),
            TypeDesc::of::<i64>(),
            TypeDesc::of::<i128>(),
            TypeDesc::of::<isize>(),
            TypeDesc::of::<u8>(),
            TypeDesc::of::<u16>(),
            TypeDesc::of::<u32>(),
            TypeDesc::of::<u64>(),
            TypeDesc::of::<u128>(),
            TypeDesc::of::<usize>(),
            TypeDesc::of::<f32>(),
            TypeDesc::of::<f64>(),
        ];
        let mut declared = self.inner.declared.write();
        for ty in builtins {
            declared.insert(ty.id(), ty.name());
        }
    }

    /// Make `T` encodable as a task argument.
    pub fn declare<T: 'static>(&self) {
        self.declare_type(TypeDesc::of::<T>());
    }

    pub fn declare_type(&self, ty: TypeDesc) {
        self.inner.declared.write().insert(ty.id(), ty.name());
    }

    pub fn is_declared(&self, ty: &TypeDesc) -> bool {
        self.inner.declared.read().contains_key(&ty.id())
    }

    /// Encode a call of `name` with `args`.
    ///
    /// Argument positions in errors count the context as position 1.
    pub fn encode(&self, name: &TaskName, args: &[Arg]) -> Result<Vec<u8>, EncodingError> {
        let mut values = Vec::with_capacity(args.len());
        for (index, arg) in args.iter().enumerate() {
            let position = index + 2;
            let ty = arg.type_desc();
            if !self.is_declared(&ty) {
                return Err(EncodingError::Undeclared {
                    position,
                    type_name: ty.name(),
                });
            }
            let value = arg.to_json().map_err(|source| EncodingError::Unencodable {
                position,
                type_name: ty.name(),
                source,
            })?;
            values.push(value);
        }

        let envelope = Envelope::new(
            self.inner.ids.generate_delivery_id(),
            name.clone(),
            values,
            self.inner.clock.now(),
        );
        serde_json::to_vec(&envelope).map_err(EncodingError::Envelope)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Envelope, DecodingError> {
        serde_json::from_slice(bytes).map_err(DecodingError::Envelope)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}
