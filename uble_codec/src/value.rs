use bytes::Bytes;
use core::fmt;
use std::convert::Infallible;

/// A value that can be carried by the standard message codec.
///
/// `C` is the set of extension ("custom") values a serializer knows how to
/// write in addition to the base format. The base format alone uses
/// [`Infallible`], so `Value::Custom` cannot be constructed for it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<C = Infallible> {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
    Uint8List(Bytes),
    Int32List(Vec<i32>),
    Int64List(Vec<i64>),
    Float32List(Vec<f32>),
    Float64List(Vec<f64>),
    List(Vec<Value<C>>),
    /// Key/value pairs in wire order.
    Map(Vec<(Value<C>, Value<C>)>),
    Custom(C),
}

impl<C> Default for Value<C> {
    fn default() -> Self {
        Value::Null
    }
}

impl<C> Value<C> {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short, human readable name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Uint8List(_) => "uint8 list",
            Value::Int32List(_) => "int32 list",
            Value::Int64List(_) => "int64 list",
            Value::Float32List(_) => "float32 list",
            Value::Float64List(_) => "float64 list",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Custom(_) => "custom",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer value of either width.
    ///
    /// Peers are free to write small integers as int32, so readers of an
    /// integer field accept both encodings.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(n) => Some(i64::from(*n)),
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }
}

impl<C> From<bool> for Value<C> {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl<C> From<i32> for Value<C> {
    fn from(value: i32) -> Self {
        Value::Int32(value)
    }
}

impl<C> From<i64> for Value<C> {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl<C> From<f64> for Value<C> {
    fn from(value: f64) -> Self {
        Value::Float64(value)
    }
}

impl<C> From<&str> for Value<C> {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl<C> From<String> for Value<C> {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl<C> From<Bytes> for Value<C> {
    fn from(value: Bytes) -> Self {
        Value::Uint8List(value)
    }
}

impl<C> From<Vec<Value<C>>> for Value<C> {
    fn from(value: Vec<Value<C>>) -> Self {
        Value::List(value)
    }
}

/// Diagnostic notation.
///
/// - `null`, booleans and integers are displayed as in Rust; floats always
///   use scientific notation.
/// - Strings are shown in double quotes.
/// - Byte lists are shown hex-encoded as `h'01 02 ef'`.
/// - Typed numeric lists are prefixed with their element type, e.g.
///   `i32[1, 2]`.
/// - Lists are `[a, b]`, maps are `{k: v, ...}`.
/// - Custom values use the `Display` impl of `C`.
impl<C: fmt::Display> fmt::Display for Value<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int32(n) => write!(f, "{}", n),
            Value::Int64(n) => write!(f, "{}", n),
            Value::Float64(n) => write!(f, "{:e}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Uint8List(b) => {
                f.write_str("h'")?;
                for (i, x) in b.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{:02x}", x)?;
                }
                f.write_str("'")
            }
            Value::Int32List(items) => write_seq(f, "i32", items.iter()),
            Value::Int64List(items) => write_seq(f, "i64", items.iter()),
            Value::Float32List(items) => {
                write_seq(f, "f32", items.iter().map(|n| format!("{:e}", n)))
            }
            Value::Float64List(items) => {
                write_seq(f, "f64", items.iter().map(|n| format!("{:e}", n)))
            }
            Value::List(items) => write_seq(f, "", items.iter()),
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
            Value::Custom(c) => write!(f, "{}", c),
        }
    }
}

fn write_seq<T: fmt::Display>(
    f: &mut fmt::Formatter,
    prefix: &str,
    items: impl Iterator<Item = T>,
) -> fmt::Result {
    write!(f, "{}[", prefix)?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    f.write_str("]")
}
