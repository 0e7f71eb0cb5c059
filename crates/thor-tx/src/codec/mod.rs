//! Schema-driven RLP codec: scalar kinds, profiles, and the nested item serializer.

/// Codec error type.
mod error;
/// Nested RLP items.
mod item;
/// Scalar kinds.
pub mod kind;
/// Profile tree and pack/unpack engine.
mod profile;
/// Dynamic value tree.
mod value;

pub use error::CodecError;
pub use item::RlpItem;
pub use kind::{MAX_NUMERIC_BYTES, ScalarKind};
pub use profile::{Kind, Profile};
pub use value::Value;
