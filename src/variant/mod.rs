//! Engine variant codec: the tagged, self-describing binary value format.
//!
//! # Wire format
//! Every value starts with a little-endian `u32` tag.  Bits 0–7 select the
//! base type; bit 16 ([`ENCODE_FLAG_64`]) widens integers to `i64` and
//! floats to `f64`.  The payload that follows is fully determined by the
//! tag (see [`decode`] for the per-type layout).
//!
//! Only the decode direction exists.  Containers pack raw file bytes and
//! never encode values.
//!
//! # Failure model
//! A codec error leaves the stream cursor at an undefined position.  One
//! bad tag invalidates every byte after it, so callers must abandon the
//! stream rather than resume reading.

pub mod decode;
mod text;
pub mod value;

pub use decode::{decode_value, decode_value_with, DecodeOptions, DEFAULT_MAX_DEPTH};
pub use value::{Aabb, Color, NodePath, PoolArray, PoolType, Rect2, Transform2D, Value, Vector2, Vector3};

use crate::byte_stream::StreamError;
use thiserror::Error;

/// Tag bit selecting 64-bit payloads for integers and floats.
pub const ENCODE_FLAG_64: u32 = 1 << 16;
/// Mask selecting the base type from a tag.
pub const TYPE_MASK: u32 = 0xFF;

pub const TYPE_NIL:          u32 = 0;
pub const TYPE_BOOL:         u32 = 1;
pub const TYPE_INT:          u32 = 2;
pub const TYPE_REAL:         u32 = 3;
pub const TYPE_STRING:       u32 = 4;
pub const TYPE_VECTOR2:      u32 = 5;
pub const TYPE_RECT2:        u32 = 6;
pub const TYPE_VECTOR3:      u32 = 7;
pub const TYPE_TRANSFORM2D:  u32 = 8;
pub const TYPE_PLANE:        u32 = 9;
pub const TYPE_QUAT:         u32 = 10;
pub const TYPE_AABB:         u32 = 11;
pub const TYPE_BASIS:        u32 = 12;
pub const TYPE_TRANSFORM:    u32 = 13;
pub const TYPE_COLOR:        u32 = 14;
pub const TYPE_NODE_PATH:    u32 = 15;
pub const TYPE_RID:          u32 = 16;
pub const TYPE_OBJECT:       u32 = 17;
pub const TYPE_DICTIONARY:   u32 = 18;
pub const TYPE_ARRAY:        u32 = 19;
pub const TYPE_POOL_BYTE:    u32 = 20;
pub const TYPE_POOL_INT:     u32 = 21;
pub const TYPE_POOL_REAL:    u32 = 22;
pub const TYPE_POOL_STRING:  u32 = 23;
pub const TYPE_POOL_VECTOR2: u32 = 24;
pub const TYPE_POOL_VECTOR3: u32 = 25;
pub const TYPE_POOL_COLOR:   u32 = 26;
pub const TYPE_MAX:          u32 = 27;

#[derive(Error, Debug)]
pub enum VariantError {
    #[error("Unknown variant type {0} (tag 0x{1:08x})")]
    UnknownVariantType(u32, u32),
    /// Recognised tag with no decoder.  The payload is left unread.
    #[error("Variant type {name} ({code}) is not supported")]
    UnimplementedVariantType { code: u32, name: &'static str },
    #[error("NodePath uses the legacy single-string encoding, which is not supported")]
    UnsupportedLegacyEncoding,
    #[error("Pool array element type {0} is out of range")]
    InvalidPoolArrayType(u32),
    #[error("Negative {what} length {len}")]
    NegativeLength { what: &'static str, len: i32 },
    #[error("{type_name} payload needs {need} bytes, {remaining} remaining")]
    TruncatedPayload { type_name: &'static str, need: u64, remaining: u64 },
    #[error("Variant nesting exceeds max depth {max_depth}")]
    DepthExceeded { max_depth: usize },
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),
}

/// Engine name for a tag that decodes to nothing in this crate.
pub(crate) fn unimplemented_name(code: u32) -> Option<&'static str> {
    match code {
        TYPE_PLANE     => Some("Plane"),
        TYPE_QUAT      => Some("Quat"),
        TYPE_BASIS     => Some("Basis"),
        TYPE_TRANSFORM => Some("Transform"),
        TYPE_RID       => Some("RID"),
        TYPE_OBJECT    => Some("Object"),
        TYPE_MAX       => Some("Max"),
        _              => None,
    }
}
