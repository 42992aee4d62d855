//! Width- and kind-checked scalar packing and deserialization.
//!
//! Every `pack_*` function validates a generic value against one wire scalar
//! type and returns its MessagePack encoding. Every `deserialize_*` function
//! applies the same checks to a value produced by the decoder and returns the
//! typed Rust value.
//!
//! Text and binary share one in-memory representation: a string value is
//! accepted where binary is expected and vice versa.

use crate::error::{DeserializationError, PackingError};
use bytes::{BufMut, Bytes, BytesMut};
use rmpv::Value;

enum IntegerCheck<T> {
    Valid(T),
    OutOfRange,
    NotInteger,
}

fn check_integer<T>(value: &Value) -> IntegerCheck<T>
where
    T: TryFrom<u64> + TryFrom<i64>,
{
    let Value::Integer(integer) = value else {
        return IntegerCheck::NotInteger;
    };

    let converted = match (integer.as_u64(), integer.as_i64()) {
        (Some(unsigned), _) => T::try_from(unsigned).ok(),
        (None, Some(signed)) => T::try_from(signed).ok(),
        (None, None) => None,
    };

    match converted {
        Some(v) => IntegerCheck::Valid(v),
        None => IntegerCheck::OutOfRange,
    }
}

fn encode(value: &Value) -> Result<Bytes, PackingError> {
    let mut writer = BytesMut::with_capacity(16).writer();
    rmpv::encode::write_value(&mut writer, value)
        .map_err(|e| PackingError::new(format!("cannot encode {}: {}", value, e)))?;
    Ok(writer.into_inner().freeze())
}

macro_rules! integer_scalar {
    ($pack:ident, $deserialize:ident, $ty:ty, $target:literal) => {
        #[doc = concat!("Packs a ", $target, ".")]
        pub fn $pack(value: &Value) -> Result<Bytes, PackingError> {
            match check_integer::<$ty>(value) {
                IntegerCheck::Valid(v) => encode(&Value::from(v)),
                IntegerCheck::OutOfRange => Err(PackingError::out_of_range(value, $target)),
                IntegerCheck::NotInteger => Err(PackingError::kind_mismatch(value, $target)),
            }
        }

        #[doc = concat!("Deserializes a ", $target, ".")]
        pub fn $deserialize(value: &Value) -> Result<$ty, DeserializationError> {
            match check_integer::<$ty>(value) {
                IntegerCheck::Valid(v) => Ok(v),
                IntegerCheck::OutOfRange => {
                    Err(DeserializationError::out_of_range(value, $target))
                }
                IntegerCheck::NotInteger => {
                    Err(DeserializationError::kind_mismatch(value, $target))
                }
            }
        }
    };
}

integer_scalar!(pack_int8, deserialize_int8, i8, "signed 8-bit integer");
integer_scalar!(pack_int16, deserialize_int16, i16, "signed 16-bit integer");
integer_scalar!(pack_int32, deserialize_int32, i32, "signed 32-bit integer");
integer_scalar!(pack_int64, deserialize_int64, i64, "signed 64-bit integer");
integer_scalar!(pack_uint8, deserialize_uint8, u8, "unsigned 8-bit integer");
integer_scalar!(pack_uint16, deserialize_uint16, u16, "unsigned 16-bit integer");
integer_scalar!(pack_uint32, deserialize_uint32, u32, "unsigned 32-bit integer");
integer_scalar!(pack_uint64, deserialize_uint64, u64, "unsigned 64-bit integer");

/// Packs a UTF-8 string. Binary values holding valid UTF-8 are accepted.
pub fn pack_string(value: &Value) -> Result<Bytes, PackingError> {
    let text = match value {
        Value::String(s) => s.as_str(),
        Value::Binary(b) => std::str::from_utf8(b).ok(),
        _ => None,
    };
    match text {
        Some(text) => encode(&Value::from(text)),
        None => Err(PackingError::kind_mismatch(value, "string")),
    }
}

/// Packs an opaque binary blob using the bin family of markers.
pub fn pack_binary(value: &Value) -> Result<Bytes, PackingError> {
    match value {
        Value::Binary(b) => encode(&Value::Binary(b.clone())),
        Value::String(s) => encode(&Value::Binary(s.as_bytes().to_vec())),
        _ => Err(PackingError::kind_mismatch(value, "binary")),
    }
}

pub fn pack_bool(value: &Value) -> Result<Bytes, PackingError> {
    match value {
        Value::Boolean(b) => encode(&Value::Boolean(*b)),
        _ => Err(PackingError::kind_mismatch(value, "boolean")),
    }
}

/// Packs a float using the single-precision encoding.
pub fn pack_float32(value: &Value) -> Result<Bytes, PackingError> {
    match value {
        Value::F32(f) => encode(&Value::F32(*f)),
        Value::F64(f) => encode(&Value::F32(*f as f32)),
        _ => Err(PackingError::kind_mismatch(
            value,
            "32-bit floating point number",
        )),
    }
}

/// Packs a float using the double-precision encoding.
pub fn pack_float64(value: &Value) -> Result<Bytes, PackingError> {
    match value {
        Value::F32(f) => encode(&Value::F64(f64::from(*f))),
        Value::F64(f) => encode(&Value::F64(*f)),
        _ => Err(PackingError::kind_mismatch(
            value,
            "64-bit floating point number",
        )),
    }
}

pub fn deserialize_string(value: &Value) -> Result<String, DeserializationError> {
    let text = match value {
        Value::String(s) => s.as_str(),
        Value::Binary(b) => std::str::from_utf8(b).ok(),
        _ => None,
    };
    text.map(str::to_owned)
        .ok_or_else(|| DeserializationError::kind_mismatch(value, "string"))
}

pub fn deserialize_binary(value: &Value) -> Result<Vec<u8>, DeserializationError> {
    match value {
        Value::Binary(b) => Ok(b.clone()),
        Value::String(s) => Ok(s.as_bytes().to_vec()),
        _ => Err(DeserializationError::kind_mismatch(value, "binary")),
    }
}

pub fn deserialize_bool(value: &Value) -> Result<bool, DeserializationError> {
    match value {
        Value::Boolean(b) => Ok(*b),
        _ => Err(DeserializationError::kind_mismatch(value, "boolean")),
    }
}

pub fn deserialize_float32(value: &Value) -> Result<f32, DeserializationError> {
    match value {
        Value::F32(f) => Ok(*f),
        Value::F64(f) => Ok(*f as f32),
        _ => Err(DeserializationError::kind_mismatch(
            value,
            "32-bit floating point number",
        )),
    }
}

pub fn deserialize_float64(value: &Value) -> Result<f64, DeserializationError> {
    match value {
        Value::F32(f) => Ok(f64::from(*f)),
        Value::F64(f) => Ok(*f),
        _ => Err(DeserializationError::kind_mismatch(
            value,
            "64-bit floating point number",
        )),
    }
}
