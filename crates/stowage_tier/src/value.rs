// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Typed cache values and their byte encoding.
//!
//! Every collection stores values of exactly one [`ValueType`]. The encoding is shared by all
//! backends so the bytes written by one backend can be read back by any other:
//!
//! | Type     | Encoding                                   |
//! |----------|--------------------------------------------|
//! | `Object` | JSON text                                  |
//! | `Int64`  | 8 bytes, little-endian two's complement    |
//! | `Real`   | 8 bytes, little-endian IEEE-754 bit pattern |
//! | `String` | raw UTF-8 bytes                            |

use std::fmt;

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned, de::IgnoredAny};

use crate::{Error, Result};

/// The kind of value a collection holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Any serde-serializable structure, stored as JSON.
    Object,
    /// A signed 64-bit integer.
    Int64,
    /// A 64-bit floating point number.
    Real,
    /// A UTF-8 string.
    String,
}

impl ValueType {
    /// Encodes a value into its stored byte form.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the value's variant does not match this type, or if an object
    /// value does not hold valid JSON.
    pub fn encode(self, value: &Value) -> Result<Bytes> {
        match (self, value) {
            (Self::Object, Value::Object(json)) => {
                serde_json::from_slice::<IgnoredAny>(json).map_err(Error::usage)?;
                Ok(json.clone())
            }
            (Self::Int64, Value::Int64(v)) => Ok(Bytes::copy_from_slice(&v.to_le_bytes())),
            (Self::Real, Value::Real(v)) => Ok(Bytes::copy_from_slice(&v.to_le_bytes())),
            (Self::String, Value::String(s)) => Ok(Bytes::copy_from_slice(s.as_bytes())),
            (expected, actual) => Err(Error::usage(format!(
                "a {} value cannot be stored in a collection of {expected} values",
                actual.value_type()
            ))),
        }
    }

    /// Decodes stored bytes back into a value of this type.
    ///
    /// # Errors
    ///
    /// Returns a usage error when the bytes are not a valid encoding of this type: numeric values
    /// must be exactly 8 bytes, strings valid UTF-8 and objects valid JSON.
    pub fn decode(self, bytes: &[u8]) -> Result<Value> {
        match self {
            Self::Object => {
                serde_json::from_slice::<IgnoredAny>(bytes).map_err(Error::usage)?;
                Ok(Value::Object(Bytes::copy_from_slice(bytes)))
            }
            Self::Int64 => fixed_width(self, bytes).map(|raw| Value::Int64(i64::from_le_bytes(raw))),
            Self::Real => fixed_width(self, bytes).map(|raw| Value::Real(f64::from_le_bytes(raw))),
            Self::String => std::str::from_utf8(bytes)
                .map(|s| Value::String(s.to_owned()))
                .map_err(Error::usage),
        }
    }
}

fn fixed_width(value_type: ValueType, bytes: &[u8]) -> Result<[u8; 8]> {
    <[u8; 8]>::try_from(bytes).map_err(|_| {
        Error::usage(format!(
            "a stored {value_type} value must be 8 bytes long, found {} bytes",
            bytes.len()
        ))
    })
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => f.write_str("object"),
            Self::Int64 => f.write_str("int64"),
            Self::Real => f.write_str("real"),
            Self::String => f.write_str("string"),
        }
    }
}

/// A value stored in or read from a cache.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// JSON text of a serialized structure.
    Object(Bytes),
    /// A signed 64-bit integer.
    Int64(i64),
    /// A 64-bit floating point number.
    Real(f64),
    /// A UTF-8 string.
    String(String),
}

impl Value {
    /// Serializes `value` to JSON and wraps it as an object value.
    ///
    /// # Errors
    ///
    /// Returns a usage error if `value` cannot be represented as JSON.
    pub fn object<T>(value: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_vec(value).map(|json| Self::Object(Bytes::from(json))).map_err(Error::usage)
    }

    /// Returns the type of this value.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Object(_) => ValueType::Object,
            Self::Int64(_) => ValueType::Int64,
            Self::Real(_) => ValueType::Real,
            Self::String(_) => ValueType::String,
        }
    }

    /// Converts this value into a concrete Rust type.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the value cannot be converted into `T`.
    pub fn into_typed<T: CacheValue>(self) -> Result<T> {
        T::from_value(self)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// Conversion between Rust types and cache [`Value`]s.
///
/// Implemented for `i64`, `f64`, `String` and [`Json<T>`] for any serde type.
pub trait CacheValue: Sized {
    /// Converts `self` into a cache value.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the conversion is not possible.
    fn into_value(self) -> Result<Value>;

    /// Converts a cache value back into `Self`.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the value holds a different type.
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch(expected: ValueType, actual: &Value) -> Error {
    Error::usage(format!(
        "expected a {expected} value but the cache returned a {} value",
        actual.value_type()
    ))
}

impl CacheValue for i64 {
    fn into_value(self) -> Result<Value> {
        Ok(Value::Int64(self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int64(v) => Ok(v),
            other => Err(mismatch(ValueType::Int64, &other)),
        }
    }
}

impl CacheValue for f64 {
    fn into_value(self) -> Result<Value> {
        Ok(Value::Real(self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Real(v) => Ok(v),
            other => Err(mismatch(ValueType::Real, &other)),
        }
    }
}

impl CacheValue for String {
    fn into_value(self) -> Result<Value> {
        Ok(Value::String(self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(v) => Ok(v),
            other => Err(mismatch(ValueType::String, &other)),
        }
    }
}

/// Wraps a serde type so it is cached as a JSON object.
///
/// # Examples
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use stowage_tier::{CacheValue, Json, ValueType};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Profile {
///     id: u64,
///     name: String,
/// }
///
/// let value = Json(Profile { id: 7, name: "ada".into() }).into_value()?;
/// assert_eq!(value.value_type(), ValueType::Object);
///
/// let Json(profile) = value.into_typed::<Json<Profile>>()?;
/// assert_eq!(profile.name, "ada");
/// # Ok::<(), stowage_tier::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Json<T>(pub T);

impl<T> CacheValue for Json<T>
where
    T: Serialize + DeserializeOwned,
{
    fn into_value(self) -> Result<Value> {
        Value::object(&self.0)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(json) => serde_json::from_slice(&json).map(Json).map_err(Error::usage),
            other => Err(mismatch(ValueType::Object, &other)),
        }
    }
}
