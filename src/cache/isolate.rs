//! Value Isolation
//!
//! Deep-copies values into the cache through a JSON round trip, so the cache
//! owns data that shares nothing with the caller's object.

use std::fmt;

use serde::ser::{self, Impossible};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Bound for values the cache can store: they must survive the isolation
/// round trip and be shareable across threads once stored.
pub trait Cacheable: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Cacheable for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Returns an independent copy of `value`.
///
/// `Ok(None)` means `value` is the null value (see [`is_null`]), which the
/// cache treats as "nothing to store".
///
/// # Errors
/// Fails if the value cannot be serialized, or if the copy does not come
/// back intact (non-finite floats, `Some(None)`).
pub fn deep_copy<T>(value: &T) -> Result<Option<T>>
where
    T: Serialize + DeserializeOwned,
{
    if is_null(value) {
        return Ok(None);
    }

    let json = serde_json::to_value(value)?;
    let copy: T = serde_json::from_value(json)?;
    if is_null(&copy) {
        return Err(lossy::<T>().into());
    }
    Ok(Some(copy))
}

/// Returns true if `value` itself is `None` or `()`.
///
/// Only the outermost value counts: `Some(None)`, unit structs and
/// newtypes around `None` are not null.
pub fn is_null<T: Serialize + ?Sized>(value: &T) -> bool {
    value.serialize(NullCheck).is_ok()
}

fn lossy<T>() -> serde_json::Error {
    <serde_json::Error as serde::de::Error>::custom(format!(
        "{} does not survive a JSON round trip",
        std::any::type_name::<T>()
    ))
}

// == Null Check ==
/// Serializer that accepts only `serialize_none` and `serialize_unit`.
struct NullCheck;

#[derive(Debug)]
struct NotNull;

impl fmt::Display for NotNull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("value is not null")
    }
}

impl std::error::Error for NotNull {}

impl ser::Error for NotNull {
    fn custom<M: fmt::Display>(_msg: M) -> Self {
        NotNull
    }
}

macro_rules! not_null {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method(self, _v: $ty) -> std::result::Result<(), NotNull> {
                Err(NotNull)
            }
        )*
    };
}

impl ser::Serializer for NullCheck {
    type Ok = ();
    type Error = NotNull;
    type SerializeSeq = Impossible<(), NotNull>;
    type SerializeTuple = Impossible<(), NotNull>;
    type SerializeTupleStruct = Impossible<(), NotNull>;
    type SerializeTupleVariant = Impossible<(), NotNull>;
    type SerializeMap = Impossible<(), NotNull>;
    type SerializeStruct = Impossible<(), NotNull>;
    type SerializeStructVariant = Impossible<(), NotNull>;

    not_null! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_i128(i128),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_u128(u128),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
        serialize_unit_struct(&'static str),
    }

    fn serialize_none(self) -> std::result::Result<(), NotNull> {
        Ok(())
    }

    fn serialize_unit(self) -> std::result::Result<(), NotNull> {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, _value: &T) -> std::result::Result<(), NotNull> {
        Err(NotNull)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> std::result::Result<(), NotNull> {
        Err(NotNull)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _value: &T,
    ) -> std::result::Result<(), NotNull> {
        Err(NotNull)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> std::result::Result<(), NotNull> {
        Err(NotNull)
    }

    fn serialize_seq(self, _len: Option<usize>) -> std::result::Result<Self::SerializeSeq, NotNull> {
        Err(NotNull)
    }

    fn serialize_tuple(self, _len: usize) -> std::result::Result<Self::SerializeTuple, NotNull> {
        Err(NotNull)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeTupleStruct, NotNull> {
        Err(NotNull)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeTupleVariant, NotNull> {
        Err(NotNull)
    }

    fn serialize_map(self, _len: Option<usize>) -> std::result::Result<Self::SerializeMap, NotNull> {
        Err(NotNull)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeStruct, NotNull> {
        Err(NotNull)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeStructVariant, NotNull> {
        Err(NotNull)
    }
}
