//! Conversions between Rust types and [`BleValue`]s.
//!
//! Records, call arguments and call results are all carried as generic
//! values; these traits do the positional unwrapping with typed errors
//! instead of panicking on a mismatch.

use crate::custom::{BleValue, CustomValue};
use crate::standard::DecodeError;
use crate::value::Value;
use bytes::Bytes;

/// Extracts a typed value from a [`BleValue`].
pub trait FromValue: Sized {
    /// What the value is expected to be, for error messages.
    const EXPECTED: &'static str;

    fn from_value(value: BleValue) -> Result<Self, DecodeError>;
}

/// Wraps a typed value into a [`BleValue`].
pub trait IntoValue {
    fn into_value(self) -> BleValue;
}

pub(crate) fn mismatch(expected: &'static str, found: &BleValue) -> DecodeError {
    let found = match found {
        Value::Custom(custom) => custom.type_name(),
        other => other.type_name(),
    };
    DecodeError::TypeMismatch { expected, found }
}

impl FromValue for BleValue {
    const EXPECTED: &'static str = "any";

    fn from_value(value: BleValue) -> Result<Self, DecodeError> {
        Ok(value)
    }
}

impl IntoValue for BleValue {
    fn into_value(self) -> BleValue {
        self
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: BleValue) -> Result<Self, DecodeError> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(mismatch(Self::EXPECTED, &other)),
        }
    }
}

impl IntoValue for String {
    fn into_value(self) -> BleValue {
        Value::String(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> BleValue {
        Value::String(self.to_owned())
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_value(value: BleValue) -> Result<Self, DecodeError> {
        value
            .as_bool()
            .ok_or_else(|| mismatch(Self::EXPECTED, &value))
    }
}

impl IntoValue for bool {
    fn into_value(self) -> BleValue {
        Value::Bool(self)
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_value(value: BleValue) -> Result<Self, DecodeError> {
        value.as_i64().ok_or_else(|| mismatch(Self::EXPECTED, &value))
    }
}

/// Integers are always written with the 64-bit tag.
impl IntoValue for i64 {
    fn into_value(self) -> BleValue {
        Value::Int64(self)
    }
}

impl FromValue for Bytes {
    const EXPECTED: &'static str = "uint8 list";

    fn from_value(value: BleValue) -> Result<Self, DecodeError> {
        match value {
            Value::Uint8List(bytes) => Ok(bytes),
            other => Err(mismatch(Self::EXPECTED, &other)),
        }
    }
}

impl IntoValue for Bytes {
    fn into_value(self) -> BleValue {
        Value::Uint8List(self)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const EXPECTED: &'static str = "list";

    fn from_value(value: BleValue) -> Result<Self, DecodeError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch(Self::EXPECTED, &other)),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> BleValue {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

/// `null` is `None`; anything else must convert to `T`.
impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: BleValue) -> Result<Self, DecodeError> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_value(value).map(Some)
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> BleValue {
        self.map_or(Value::Null, IntoValue::into_value)
    }
}

impl IntoValue for CustomValue {
    fn into_value(self) -> BleValue {
        Value::Custom(self)
    }
}
