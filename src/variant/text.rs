//! Engine text-resource rendering of decoded values (`project.godot` syntax).

use std::fmt::{self, Display, Formatter, Write};

use super::value::{Color, NodePath, PoolArray, Value, Vector2, Vector3};

impl Display for NodePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_absolute {
            f.write_char('/')?;
        }
        for (i, name) in self.names.iter().enumerate() {
            if i > 0 {
                f.write_char('/')?;
            }
            f.write_str(&String::from_utf8_lossy(name))?;
        }
        for sub in &self.subnames {
            write!(f, ":{}", String::from_utf8_lossy(sub))?;
        }
        Ok(())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null       => f.write_str("null"),
            Value::Bool(b)    => write!(f, "{b}"),
            Value::Int(v)     => write!(f, "{v}"),
            Value::Int64(v)   => write!(f, "{v}"),
            Value::Float(v)   => real(f, v),
            Value::Float64(v) => real(f, v),
            Value::String(s)  => quoted(f, s),
            Value::Vector2(v) => {
                f.write_str("Vector2( ")?;
                reals(f, &[v.x, v.y])?;
                f.write_str(" )")
            }
            Value::Rect2(r) => {
                f.write_str("Rect2( ")?;
                reals(f, &[r.position.x, r.position.y, r.size.x, r.size.y])?;
                f.write_str(" )")
            }
            Value::Vector3(v) => {
                f.write_str("Vector3( ")?;
                reals(f, &[v.x, v.y, v.z])?;
                f.write_str(" )")
            }
            Value::Transform2D(t) => {
                f.write_str("Transform2D( ")?;
                let [x, y, o] = t.elements;
                reals(f, &[x[0], x[1], y[0], y[1], o[0], o[1]])?;
                f.write_str(" )")
            }
            Value::Aabb(b) => {
                f.write_str("AABB( ")?;
                reals(f, &[b.position.x, b.position.y, b.position.z, b.size.x, b.size.y, b.size.z])?;
                f.write_str(" )")
            }
            Value::Color(c) => {
                f.write_str("Color( ")?;
                reals(f, &[c.r, c.g, c.b, c.a])?;
                f.write_str(" )")
            }
            Value::NodePath(p) => {
                f.write_str("NodePath(")?;
                quoted(f, p.to_string().as_bytes())?;
                f.write_char(')')
            }
            Value::Dictionary(pairs) => {
                f.write_str("{\n")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",\n")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("\n}")
            }
            Value::Array(items) => {
                f.write_str("[ ")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(" ]")
            }
            Value::PoolArray(p) => {
                write!(f, "{}( ", p.type_name())?;
                pool_elements(f, p)?;
                f.write_str(" )")
            }
        }
    }
}

fn pool_elements(f: &mut Formatter<'_>, pool: &PoolArray) -> fmt::Result {
    match pool {
        PoolArray::Byte(v)    => joined(f, v, |f, b| write!(f, "{b}")),
        PoolArray::Int(v)     => joined(f, v, |f, i| write!(f, "{i}")),
        PoolArray::Real(v)    => reals(f, v),
        PoolArray::String(v)  => joined(f, v, |f, s| quoted(f, s)),
        PoolArray::Vector2(v) => joined(f, v, |f, &Vector2 { x, y }| reals(f, &[x, y])),
        PoolArray::Vector3(v) => joined(f, v, |f, &Vector3 { x, y, z }| reals(f, &[x, y, z])),
        PoolArray::Color(v)   => joined(f, v, |f, &Color { r, g, b, a }| reals(f, &[r, g, b, a])),
    }
}

fn joined<T>(
    f:     &mut Formatter<'_>,
    items: &[T],
    mut each: impl FnMut(&mut Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        each(f, item)?;
    }
    Ok(())
}

fn reals(f: &mut Formatter<'_>, values: &[f32]) -> fmt::Result {
    joined(f, values, |f, v| real(f, v))
}

trait Real: Display {
    fn is_nan(&self) -> bool;
    fn is_infinite(&self) -> bool;
    fn is_sign_negative(&self) -> bool;
}

macro_rules! impl_real {
    ($($t:ty),*) => {$(
        impl Real for $t {
            fn is_nan(&self) -> bool { <$t>::is_nan(*self) }
            fn is_infinite(&self) -> bool { <$t>::is_infinite(*self) }
            fn is_sign_negative(&self) -> bool { <$t>::is_sign_negative(*self) }
        }
    )*};
}

impl_real!(f32, f64);

/// Floats always carry a decimal point so they read back as floats.
/// Non-finite values use the engine's spellings.
fn real<T: Real>(f: &mut Formatter<'_>, v: &T) -> fmt::Result {
    if v.is_nan() {
        return f.write_str("nan");
    }
    if v.is_infinite() {
        return f.write_str(if v.is_sign_negative() { "inf_neg" } else { "inf" });
    }
    let s = v.to_string();
    f.write_str(&s)?;
    if s.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
        f.write_str(".0")?;
    }
    Ok(())
}

fn quoted(f: &mut Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_char('"')?;
    for ch in String::from_utf8_lossy(bytes).chars() {
        match ch {
            '"'  => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            c    => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::value::{Rect2, Transform2D};

    #[test]
    fn scalars() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Int64(-3).to_string(), "-3");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::Float64(0.25).to_string(), "0.25");
        assert_eq!(Value::Float(f32::NAN).to_string(), "nan");
        assert_eq!(Value::Float64(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::Float(f32::NEG_INFINITY).to_string(), "inf_neg");
        assert_eq!(
            Value::PoolArray(PoolArray::Real(vec![f32::INFINITY, 2.0])).to_string(),
            "PoolRealArray( inf, 2.0 )",
        );
        assert_eq!(Value::String(b"say \"hi\"\\".to_vec()).to_string(), r#""say \"hi\"\\""#);
    }

    #[test]
    fn geometry() {
        let r = Rect2 { position: Vector2 { x: 1.0, y: 2.0 }, size: Vector2 { x: 3.0, y: 4.5 } };
        assert_eq!(Value::Rect2(r).to_string(), "Rect2( 1.0, 2.0, 3.0, 4.5 )");
        let t = Transform2D { elements: [[1.0, 0.0], [0.0, 1.0], [10.0, -2.0]] };
        assert_eq!(
            Value::Transform2D(t).to_string(),
            "Transform2D( 1.0, 0.0, 0.0, 1.0, 10.0, -2.0 )",
        );
    }

    #[test]
    fn node_path_joins_names_and_subnames() {
        let p = NodePath {
            names:       vec![b"root".to_vec(), b"Player".to_vec()],
            subnames:    vec![b"position".to_vec(), b"x".to_vec()],
            is_absolute: true,
        };
        assert_eq!(p.to_string(), "/root/Player:position:x");
        assert_eq!(Value::NodePath(p).to_string(), r#"NodePath("/root/Player:position:x")"#);

        let rel = NodePath { names: vec![b"a".to_vec(), b"b".to_vec()], ..NodePath::default() };
        assert_eq!(rel.to_string(), "a/b");
    }

    #[test]
    fn containers() {
        let dict = Value::Dictionary(vec![
            (Value::String(b"a".to_vec()), Value::Int(1)),
            (Value::Int(2), Value::Array(vec![Value::Null, Value::Bool(false)])),
        ]);
        assert_eq!(dict.to_string(), "{\n\"a\": 1,\n2: [ null, false ]\n}");

        let pool = Value::PoolArray(PoolArray::Vector2(vec![Vector2 { x: 1.0, y: 2.0 }, Vector2 { x: 3.0, y: 4.0 }]));
        assert_eq!(pool.to_string(), "PoolVector2Array( 1.0, 2.0, 3.0, 4.0 )");
    }
}
