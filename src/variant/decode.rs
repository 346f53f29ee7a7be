//! Recursive variant decoder.
//!
//! | tag & 0xFF | value | payload |
//! |---|---|---|
//! | 0 | `Null` | — |
//! | 1 | `Bool` | `i32`, nonzero is true |
//! | 2 | `Int` / `Int64` | `i32`, or `i64` with [`ENCODE_FLAG_64`] |
//! | 3 | `Float` / `Float64` | `f32`, or `f64` with [`ENCODE_FLAG_64`] |
//! | 4 | `String` | `i32` length + bytes |
//! | 5 | `Vector2` | 2 × `f32` |
//! | 6 | `Rect2` | 4 × `f32` |
//! | 7 | `Vector3` | 3 × `f32` |
//! | 8 | `Transform2D` | 6 × `f32`, row-major |
//! | 11 | `Aabb` | 6 × `f32` |
//! | 14 | `Color` | 4 × `f32` |
//! | 15 | `NodePath` | see [`NodePath`] |
//! | 18 | `Dictionary` | `i32` count (bit 31 ignored) + count × (key, value) |
//! | 19 | `Array` | `i32` count (bit 31 ignored) + count × value |
//! | 20–26 | `PoolArray` | `i32` count + count × element |
//!
//! Plane, Quat, Basis, Transform, RID, Object and the `Max` sentinel are
//! recognised and rejected with [`VariantError::UnimplementedVariantType`].

use std::io::{Read, Seek};

use super::value::{Aabb, Color, NodePath, PoolArray, PoolType, Rect2, Transform2D, Value, Vector2, Vector3};
use super::{
    unimplemented_name, VariantError, ENCODE_FLAG_64, TYPE_AABB, TYPE_ARRAY, TYPE_BOOL, TYPE_COLOR,
    TYPE_DICTIONARY, TYPE_INT, TYPE_MASK, TYPE_NIL, TYPE_NODE_PATH, TYPE_POOL_BYTE, TYPE_POOL_COLOR,
    TYPE_REAL, TYPE_RECT2, TYPE_STRING, TYPE_TRANSFORM2D, TYPE_VECTOR2, TYPE_VECTOR3,
};
use crate::byte_stream::ByteStream;

/// Default nesting limit for dictionaries and arrays.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Bit 31 of a dictionary/array count: the obsolete "shared" flag.
const SHARED_FLAG: u32 = 0x8000_0000;
/// Bit 31 of a NodePath's leading word: set for the current encoding.
const NODE_PATH_NEW_FORMAT: u32 = 0x8000_0000;
const NODE_PATH_FLAG_ABSOLUTE: u32 = 1;
const NODE_PATH_FLAG_PROPERTY: u32 = 2;

const TRANSFORM2D_SIZE: u64 = 6 * 4;

/// Limits and layout switches for [`decode_value_with`].
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Deepest allowed nesting of values inside dictionaries and arrays.
    /// The outermost value sits at depth 0.
    pub max_depth: usize,
    /// Skip the zero padding the engine's own encoder writes after string
    /// bytes to reach a 4-byte boundary.
    pub padded_strings: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth:      DEFAULT_MAX_DEPTH,
            padded_strings: false,
        }
    }
}

/// Decode one value with [`DecodeOptions::default`].
pub fn decode_value<S: Read + Seek>(stream: &mut ByteStream<S>) -> Result<Value, VariantError> {
    decode_value_with(stream, &DecodeOptions::default())
}

/// Decode one value, recursing into containers up to `opts.max_depth`.
pub fn decode_value_with<S: Read + Seek>(
    stream: &mut ByteStream<S>,
    opts:   &DecodeOptions,
) -> Result<Value, VariantError> {
    Decoder { stream, opts }.value(0)
}

struct Decoder<'a, S> {
    stream: &'a mut ByteStream<S>,
    opts:   &'a DecodeOptions,
}

impl<S: Read + Seek> Decoder<'_, S> {
    fn value(&mut self, depth: usize) -> Result<Value, VariantError> {
        if depth > self.opts.max_depth {
            return Err(VariantError::DepthExceeded { max_depth: self.opts.max_depth });
        }

        let tag  = self.stream.read_u32()?;
        let wide = tag & ENCODE_FLAG_64 != 0;
        let code = tag & TYPE_MASK;

        let value = match code {
            TYPE_NIL  => Value::Null,
            TYPE_BOOL => Value::Bool(self.stream.read_i32()? != 0),
            TYPE_INT if wide  => Value::Int64(self.stream.read_i64()?),
            TYPE_INT          => Value::Int(self.stream.read_i32()?),
            TYPE_REAL if wide => Value::Float64(self.stream.read_f64()?),
            TYPE_REAL         => Value::Float(self.stream.read_f32()?),
            TYPE_STRING       => Value::String(self.string()?),
            TYPE_VECTOR2      => Value::Vector2(self.vector2()?),
            TYPE_RECT2        => Value::Rect2(Rect2 {
                position: self.vector2()?,
                size:     self.vector2()?,
            }),
            TYPE_VECTOR3      => Value::Vector3(self.vector3()?),
            TYPE_TRANSFORM2D  => Value::Transform2D(self.transform2d()?),
            TYPE_AABB         => Value::Aabb(Aabb {
                position: self.vector3()?,
                size:     self.vector3()?,
            }),
            TYPE_COLOR        => Value::Color(self.color()?),
            TYPE_NODE_PATH    => Value::NodePath(self.node_path()?),
            TYPE_DICTIONARY   => Value::Dictionary(self.dictionary(depth)?),
            TYPE_ARRAY        => Value::Array(self.array(depth)?),
            TYPE_POOL_BYTE..=TYPE_POOL_COLOR => {
                Value::PoolArray(self.pool_array(PoolType::from_variant_type(code)?)?)
            }
            _ => {
                return Err(match unimplemented_name(code) {
                    Some(name) => VariantError::UnimplementedVariantType { code, name },
                    None       => VariantError::UnknownVariantType(code, tag),
                });
            }
        };
        Ok(value)
    }

    // ── Containers ──────────────────────────────────────────────────────────
    //
    // Out of line: `value` recurses and its frame must stay small.

    #[inline(never)]
    fn dictionary(&mut self, depth: usize) -> Result<Vec<(Value, Value)>, VariantError> {
        let count = self.container_count()?;
        let mut pairs = Vec::with_capacity(self.capacity_hint(count, 8));
        for _ in 0..count {
            let key = self.value(depth + 1)?;
            let val = self.value(depth + 1)?;
            pairs.push((key, val));
        }
        Ok(pairs)
    }

    #[inline(never)]
    fn array(&mut self, depth: usize) -> Result<Vec<Value>, VariantError> {
        let count = self.container_count()?;
        let mut items = Vec::with_capacity(self.capacity_hint(count, 4));
        for _ in 0..count {
            items.push(self.value(depth + 1)?);
        }
        Ok(items)
    }

    // ── Payload helpers ─────────────────────────────────────────────────────

    fn length(&mut self, what: &'static str) -> Result<u64, VariantError> {
        let len = self.stream.read_i32()?;
        u64::try_from(len).map_err(|_| VariantError::NegativeLength { what, len })
    }

    fn string(&mut self) -> Result<Vec<u8>, VariantError> {
        let len   = self.length("string")?;
        let bytes = self.stream.read_bytes(len)?;
        if self.opts.padded_strings && len % 4 != 0 {
            self.stream.read_bytes(4 - len % 4)?;
        }
        Ok(bytes)
    }

    fn vector2(&mut self) -> Result<Vector2, VariantError> {
        Ok(Vector2 {
            x: self.stream.read_f32()?,
            y: self.stream.read_f32()?,
        })
    }

    fn vector3(&mut self) -> Result<Vector3, VariantError> {
        Ok(Vector3 {
            x: self.stream.read_f32()?,
            y: self.stream.read_f32()?,
            z: self.stream.read_f32()?,
        })
    }

    fn color(&mut self) -> Result<Color, VariantError> {
        Ok(Color {
            r: self.stream.read_f32()?,
            g: self.stream.read_f32()?,
            b: self.stream.read_f32()?,
            a: self.stream.read_f32()?,
        })
    }

    fn transform2d(&mut self) -> Result<Transform2D, VariantError> {
        let remaining = self.stream.remaining();
        if remaining < TRANSFORM2D_SIZE {
            return Err(VariantError::TruncatedPayload {
                type_name: "Transform2D",
                need:      TRANSFORM2D_SIZE,
                remaining,
            });
        }
        let mut t = Transform2D::default();
        for row in t.elements.iter_mut() {
            for cell in row.iter_mut() {
                *cell = self.stream.read_f32()?;
            }
        }
        Ok(t)
    }

    fn node_path(&mut self) -> Result<NodePath, VariantError> {
        let head = self.stream.read_u32()?;
        if head & NODE_PATH_NEW_FORMAT == 0 {
            return Err(VariantError::UnsupportedLegacyEncoding);
        }

        let name_count = u64::from(head & !NODE_PATH_NEW_FORMAT);
        let mut subname_count = u64::from(self.stream.read_u32()?);
        let flags = self.stream.read_u32()?;
        if flags & NODE_PATH_FLAG_PROPERTY != 0 {
            subname_count += 1;
        }

        let mut path = NodePath {
            names:       Vec::with_capacity(self.capacity_hint(name_count, 4)),
            subnames:    Vec::with_capacity(self.capacity_hint(subname_count, 4)),
            is_absolute: flags & NODE_PATH_FLAG_ABSOLUTE != 0,
        };
        for i in 0..name_count + subname_count {
            let part = self.string()?;
            if i < name_count {
                path.names.push(part);
            } else {
                path.subnames.push(part);
            }
        }
        Ok(path)
    }

    fn container_count(&mut self) -> Result<u64, VariantError> {
        Ok(u64::from(self.stream.read_u32()? & !SHARED_FLAG))
    }

    #[inline(never)]
    fn pool_array(&mut self, element: PoolType) -> Result<PoolArray, VariantError> {
        let count = self.length("pool array")?;
        let array = match element {
            PoolType::Byte => {
                let mut v = Vec::with_capacity(self.capacity_hint(count, 1));
                for _ in 0..count { v.push(self.stream.read_i8()?); }
                PoolArray::Byte(v)
            }
            PoolType::Int => {
                let mut v = Vec::with_capacity(self.capacity_hint(count, 4));
                for _ in 0..count { v.push(self.stream.read_i32()?); }
                PoolArray::Int(v)
            }
            PoolType::Real => {
                let mut v = Vec::with_capacity(self.capacity_hint(count, 4));
                for _ in 0..count { v.push(self.stream.read_f32()?); }
                PoolArray::Real(v)
            }
            PoolType::String => {
                let mut v = Vec::with_capacity(self.capacity_hint(count, 4));
                for _ in 0..count { v.push(self.string()?); }
                PoolArray::String(v)
            }
            PoolType::Vector2 => {
                let mut v = Vec::with_capacity(self.capacity_hint(count, 8));
                for _ in 0..count { v.push(self.vector2()?); }
                PoolArray::Vector2(v)
            }
            PoolType::Vector3 => {
                let mut v = Vec::with_capacity(self.capacity_hint(count, 12));
                for _ in 0..count { v.push(self.vector3()?); }
                PoolArray::Vector3(v)
            }
            PoolType::Color => {
                let mut v = Vec::with_capacity(self.capacity_hint(count, 16));
                for _ in 0..count { v.push(self.color()?); }
                PoolArray::Color(v)
            }
        };
        Ok(array)
    }

    /// Preallocation bounded by what the remaining bytes could hold.
    fn capacity_hint(&self, count: u64, min_element_size: u64) -> usize {
        count.min(self.stream.remaining() / min_element_size) as usize
    }
}
