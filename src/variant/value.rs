//! Decoded variant values.

use super::VariantError;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect2 {
    pub position: Vector2,
    pub size:     Vector2,
}

/// 2D affine transform as three rows of two columns: the x axis, the
/// y axis, then the origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform2D {
    pub elements: [[f32; 2]; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aabb {
    pub position: Vector3,
    pub size:     Vector3,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

// ── NodePath ─────────────────────────────────────────────────────────────────

/// Scene-tree path.  Only produced by the decoder.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodePath {
    pub(crate) names:       Vec<Vec<u8>>,
    pub(crate) subnames:    Vec<Vec<u8>>,
    pub(crate) is_absolute: bool,
}

impl NodePath {
    pub fn names(&self) -> &[Vec<u8>] {
        &self.names
    }

    pub fn subnames(&self) -> &[Vec<u8>] {
        &self.subnames
    }

    pub fn is_absolute(&self) -> bool {
        self.is_absolute
    }
}

// ── Pool arrays ──────────────────────────────────────────────────────────────

/// Element type of a pool array.  Discriminants match the engine's pool
/// type numbering; `0` (unknown) has no element layout and is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PoolType {
    Byte    = 1,
    Int     = 2,
    Real    = 3,
    String  = 4,
    Vector2 = 5,
    Vector3 = 6,
    Color   = 7,
}

impl PoolType {
    /// Map a variant tag (`20..=26`) to its pool element type.
    pub fn from_variant_type(code: u32) -> Result<Self, VariantError> {
        match code {
            20..=26 => Self::try_from(code - 19),
            _       => Err(VariantError::UnknownVariantType(code, code)),
        }
    }

    /// Stable element name, as used in `Pool<Name>Array`.
    pub fn name(self) -> &'static str {
        match self {
            PoolType::Byte    => "Byte",
            PoolType::Int     => "Int",
            PoolType::Real    => "Real",
            PoolType::String  => "String",
            PoolType::Vector2 => "Vector2",
            PoolType::Vector3 => "Vector3",
            PoolType::Color   => "Color",
        }
    }
}

impl TryFrom<u32> for PoolType {
    type Error = VariantError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(PoolType::Byte),
            2 => Ok(PoolType::Int),
            3 => Ok(PoolType::Real),
            4 => Ok(PoolType::String),
            5 => Ok(PoolType::Vector2),
            6 => Ok(PoolType::Vector3),
            7 => Ok(PoolType::Color),
            _ => Err(VariantError::InvalidPoolArrayType(code)),
        }
    }
}

/// Homogeneous, count-prefixed array.  The element type is carried by the
/// variant, so a mismatched element can never be stored.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolArray {
    Byte(Vec<i8>),
    Int(Vec<i32>),
    Real(Vec<f32>),
    String(Vec<Vec<u8>>),
    Vector2(Vec<Vector2>),
    Vector3(Vec<Vector3>),
    Color(Vec<Color>),
}

impl PoolArray {
    pub fn element_type(&self) -> PoolType {
        match self {
            PoolArray::Byte(_)    => PoolType::Byte,
            PoolArray::Int(_)     => PoolType::Int,
            PoolArray::Real(_)    => PoolType::Real,
            PoolArray::String(_)  => PoolType::String,
            PoolArray::Vector2(_) => PoolType::Vector2,
            PoolArray::Vector3(_) => PoolType::Vector3,
            PoolArray::Color(_)   => PoolType::Color,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PoolArray::Byte(v)    => v.len(),
            PoolArray::Int(v)     => v.len(),
            PoolArray::Real(v)    => v.len(),
            PoolArray::String(v)  => v.len(),
            PoolArray::Vector2(v) => v.len(),
            PoolArray::Vector3(v) => v.len(),
            PoolArray::Color(v)   => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self.element_type() {
            PoolType::Byte    => "PoolByteArray",
            PoolType::Int     => "PoolIntArray",
            PoolType::Real    => "PoolRealArray",
            PoolType::String  => "PoolStringArray",
            PoolType::Vector2 => "PoolVector2Array",
            PoolType::Vector3 => "PoolVector3Array",
            PoolType::Color   => "PoolColorArray",
        }
    }
}

// ── Value ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Int64(i64),
    Float(f32),
    Float64(f64),
    /// Raw string bytes; the engine writes UTF-8 but nothing here enforces it.
    String(Vec<u8>),
    Vector2(Vector2),
    Rect2(Rect2),
    Vector3(Vector3),
    Transform2D(Transform2D),
    Aabb(Aabb),
    Color(Color),
    NodePath(NodePath),
    /// Pairs in stream order.  Duplicate keys are kept as decoded.
    Dictionary(Vec<(Value, Value)>),
    Array(Vec<Value>),
    PoolArray(PoolArray),
}

impl Value {
    /// Stable engine type name of the active variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null           => "Nil",
            Value::Bool(_)        => "bool",
            Value::Int(_)         => "int",
            Value::Int64(_)       => "int",
            Value::Float(_)       => "float",
            Value::Float64(_)     => "float",
            Value::String(_)      => "String",
            Value::Vector2(_)     => "Vector2",
            Value::Rect2(_)       => "Rect2",
            Value::Vector3(_)     => "Vector3",
            Value::Transform2D(_) => "Transform2D",
            Value::Aabb(_)        => "AABB",
            Value::Color(_)       => "Color",
            Value::NodePath(_)    => "NodePath",
            Value::Dictionary(_)  => "Dictionary",
            Value::Array(_)       => "Array",
            Value::PoolArray(p)   => p.type_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_type_range_is_checked() {
        assert_eq!(PoolType::try_from(1).unwrap(), PoolType::Byte);
        assert_eq!(PoolType::try_from(7).unwrap(), PoolType::Color);
        assert!(matches!(PoolType::try_from(0), Err(VariantError::InvalidPoolArrayType(0))));
        assert!(matches!(PoolType::try_from(8), Err(VariantError::InvalidPoolArrayType(8))));
    }

    #[test]
    fn pool_type_from_variant_tags() {
        assert_eq!(PoolType::from_variant_type(20).unwrap(), PoolType::Byte);
        assert_eq!(PoolType::from_variant_type(26).unwrap(), PoolType::Color);
        assert!(PoolType::from_variant_type(19).is_err());
    }

    #[test]
    fn type_names_are_stable() {
        assert_eq!(Value::Null.type_name(), "Nil");
        assert_eq!(Value::Int64(1).type_name(), "int");
        assert_eq!(Value::Aabb(Aabb::default()).type_name(), "AABB");
        assert_eq!(Value::PoolArray(PoolArray::Vector3(vec![])).type_name(), "PoolVector3Array");
        assert_eq!(PoolType::Real.name(), "Real");
    }
}
