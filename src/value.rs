//! # Attributes
//!
//! An [`Attr`] is a key plus a tagged [`AttrValue`]. Scalars have dedicated
//! variants so the printer can take a fast path for them. Everything else
//! goes through [`AttrValue::Opaque`], which holds the value already
//! serialized to a `serde_json::Value` tree. The same tree shape comes out of
//! the event decoder, so both front ends share one fallback renderer.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::fmt;

/// A key-value pair attached to a record or a handler.
#[derive(Clone, Debug, PartialEq)]
pub struct Attr {
    pub key: String,
    pub value: AttrValue,
}

/// The value half of an [`Attr`].
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Bool(bool),
    Binary(Vec<u8>),
    /// Ordered, possibly nested members.
    Group(Vec<Attr>),
    /// Arbitrary data, serialized to a tree when the attribute is built.
    Opaque(Value),
}

impl Attr {
    pub fn new(key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn int(key: impl Into<String>, value: i64) -> Self {
        Self::new(key, AttrValue::Int(value))
    }

    pub fn uint(key: impl Into<String>, value: u64) -> Self {
        Self::new(key, AttrValue::Uint(value))
    }

    pub fn float(key: impl Into<String>, value: f64) -> Self {
        Self::new(key, AttrValue::Float(value))
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, AttrValue::String(value.into()))
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Self::new(key, AttrValue::Bool(value))
    }

    pub fn binary(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::new(key, AttrValue::Binary(value.into()))
    }

    pub fn group(key: impl Into<String>, members: Vec<Attr>) -> Self {
        Self::new(key, AttrValue::Group(members))
    }

    /// Attach any serializable value.
    ///
    /// The value is converted to a tree immediately. Values that fail to
    /// serialize are kept as `null`.
    pub fn any<T: Serialize + ?Sized>(key: impl Into<String>, value: &T) -> Self {
        Self::new(key, AttrValue::any(value))
    }

    /// True when the attribute should not be rendered at all.
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

impl AttrValue {
    pub fn any<T: Serialize + ?Sized>(value: &T) -> Self {
        AttrValue::Opaque(serde_json::to_value(value).unwrap_or(Value::Null))
    }

    /// Convert to the generic tree shape.
    ///
    /// Binary data becomes a base64 string and groups become objects. Within
    /// a group the first member with a given key wins.
    pub fn to_tree(&self) -> Value {
        match self {
            AttrValue::Int(v) => Value::from(*v),
            AttrValue::Uint(v) => Value::from(*v),
            AttrValue::Float(v) => Number::from_f64(*v).map_or(Value::Null, Value::Number),
            AttrValue::String(v) => Value::String(v.clone()),
            AttrValue::Bool(v) => Value::Bool(*v),
            AttrValue::Binary(v) => Value::String(BASE64.encode(v)),
            AttrValue::Group(members) => {
                let mut object = Map::new();
                for member in members.iter().filter(|m| !m.is_empty()) {
                    if !object.contains_key(&member.key) {
                        object.insert(member.key.clone(), member.value.to_tree());
                    }
                }
                Value::Object(object)
            }
            AttrValue::Opaque(v) => v.clone(),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Uint(v) => write!(f, "{}", v),
            AttrValue::Float(v) => f.write_str(&crate::utils::format_float(*v)),
            AttrValue::String(v) => f.write_str(v),
            AttrValue::Bool(v) => write!(f, "{}", v),
            AttrValue::Binary(v) => f.write_str(&BASE64.encode(v)),
            AttrValue::Group(members) => {
                f.write_str("[")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}={}", member.key, member.value)?;
                }
                f.write_str("]")
            }
            AttrValue::Opaque(v) => write!(f, "{}", v),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident as $target:ty),* $(,)?) => {
        $(
            impl From<$ty> for AttrValue {
                fn from(v: $ty) -> Self {
                    AttrValue::$variant(<$target>::from(v))
                }
            }
        )*
    };
}

impl_from! {
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => Uint as u64,
    u16 => Uint as u64,
    u32 => Uint as u64,
    u64 => Uint as u64,
    f32 => Float as f64,
    f64 => Float as f64,
    bool => Bool as bool,
    String => String as String,
    &str => String as String,
    Vec<u8> => Binary as Vec<u8>,
    &[u8] => Binary as Vec<u8>,
    Vec<Attr> => Group as Vec<Attr>,
    Value => Opaque as Value,
}

impl From<usize> for AttrValue {
    fn from(v: usize) -> Self {
        AttrValue::Uint(v as u64)
    }
}

impl From<isize> for AttrValue {
    fn from(v: isize) -> Self {
        AttrValue::Int(v as i64)
    }
}
