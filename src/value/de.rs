//! Deserializing Rust types out of [`Value`]

use std::fmt;

use indexmap::IndexMap;
use serde::de::value::{MapDeserializer, SeqDeserializer, StringDeserializer};
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    Unexpected, VariantAccess, Visitor,
};
use serde::{forward_to_deserialize_any, Deserialize, Deserializer};

use super::{Value, ValueError, ValueResult};

/// Binds a value to a Rust type.
pub fn from_value<T: DeserializeOwned>(value: Value) -> ValueResult<T> {
    T::deserialize(value)
}

/// Largest magnitude below which every integer is exact in a float64
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl Value {
    fn unexpected(&self) -> Unexpected<'_> {
        match self {
            Value::Null => Unexpected::Unit,
            Value::Int64(n) => Unexpected::Signed(*n),
            Value::Float64(f) => Unexpected::Float(*f),
            Value::Boolean(b) => Unexpected::Bool(*b),
            Value::String(s) => Unexpected::Str(s),
            Value::Bytes(bytes) => Unexpected::Bytes(bytes),
            Value::Array(_) => Unexpected::Seq,
            Value::Object(_) => Unexpected::Map,
        }
    }

    /// Integer targets also accept integral float64s.
    fn deserialize_integer<'de, V: Visitor<'de>>(self, visitor: V) -> ValueResult<V::Value> {
        match self {
            Value::Float64(f) if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
                visitor.visit_i64(f as i64)
            }
            other => other.deserialize_any(visitor),
        }
    }
}

fn visit_array<'de, V: Visitor<'de>>(items: Vec<Value>, visitor: V) -> ValueResult<V::Value> {
    let mut seq: SeqDeserializer<_, ValueError> = SeqDeserializer::new(items.into_iter());
    let value = visitor.visit_seq(&mut seq)?;
    seq.end()?;
    Ok(value)
}

fn visit_object<'de, V: Visitor<'de>>(
    fields: IndexMap<String, Value>,
    visitor: V,
) -> ValueResult<V::Value> {
    let mut map: MapDeserializer<'de, _, ValueError> = MapDeserializer::new(fields.into_iter());
    let value = visitor.visit_map(&mut map)?;
    map.end()?;
    Ok(value)
}

macro_rules! deserialize_integers {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> ValueResult<V::Value> {
                self.deserialize_integer(visitor)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for Value {
    type Error = ValueError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> ValueResult<V::Value> {
        match self {
            Value::Null => visitor.visit_unit(),
            Value::Int64(n) => visitor.visit_i64(n),
            Value::Float64(f) => visitor.visit_f64(f),
            Value::Boolean(b) => visitor.visit_bool(b),
            Value::String(s) => visitor.visit_string(s),
            Value::Bytes(bytes) => visitor.visit_byte_buf(bytes),
            Value::Array(items) => visit_array(items, visitor),
            Value::Object(fields) => visit_object(fields, visitor),
        }
    }

    deserialize_integers! {
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> ValueResult<V::Value> {
        match self {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(other),
        }
    }

    /// Bytes also bind to `u8` sequences such as `Vec<u8>`.
    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> ValueResult<V::Value> {
        match self {
            Value::Bytes(bytes) => {
                let mut seq: SeqDeserializer<_, ValueError> =
                    SeqDeserializer::new(bytes.into_iter());
                let value = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(value)
            }
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> ValueResult<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> ValueResult<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> ValueResult<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    /// Unit variants are strings; other variants are single-key objects.
    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> ValueResult<V::Value> {
        match self {
            Value::String(variant) => visitor.visit_enum(EnumDeserializer {
                variant,
                value: Value::Null,
            }),
            Value::Object(fields) if fields.len() == 1 => {
                let mut entries = fields.into_iter();
                match entries.next() {
                    Some((variant, value)) => {
                        visitor.visit_enum(EnumDeserializer { variant, value })
                    }
                    None => Err(de::Error::invalid_length(0, &"an object with one key")),
                }
            }
            other => Err(de::Error::invalid_type(
                other.unexpected(),
                &"a string or an object with one key",
            )),
        }
    }

    forward_to_deserialize_any! {
        bool i128 u128 f32 f64 char str string bytes byte_buf unit unit_struct map struct
        identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, ValueError> for Value {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

struct EnumDeserializer {
    variant: String,
    value: Value,
}

impl<'de> EnumAccess<'de> for EnumDeserializer {
    type Error = ValueError;
    type Variant = VariantDeserializer;

    fn variant_seed<S: DeserializeSeed<'de>>(
        self,
        seed: S,
    ) -> ValueResult<(S::Value, Self::Variant)> {
        let name: StringDeserializer<ValueError> = self.variant.into_deserializer();
        let variant = seed.deserialize(name)?;
        Ok((variant, VariantDeserializer(self.value)))
    }
}

struct VariantDeserializer(Value);

impl<'de> VariantAccess<'de> for VariantDeserializer {
    type Error = ValueError;

    fn unit_variant(self) -> ValueResult<()> {
        <()>::deserialize(self.0)
    }

    fn newtype_variant_seed<S: DeserializeSeed<'de>>(self, seed: S) -> ValueResult<S::Value> {
        seed.deserialize(self.0)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> ValueResult<V::Value> {
        self.0.deserialize_seq(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> ValueResult<V::Value> {
        self.0.deserialize_any(visitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a platform value")
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> Result<Value, E> {
        Ok(Value::Boolean(b))
    }

    fn visit_i64<E: de::Error>(self, n: i64) -> Result<Value, E> {
        Ok(Value::Int64(n))
    }

    fn visit_u64<E: de::Error>(self, n: u64) -> Result<Value, E> {
        i64::try_from(n)
            .map(Value::Int64)
            .map_err(|_| E::invalid_value(Unexpected::Unsigned(n), &"an int64"))
    }

    fn visit_f64<E: de::Error>(self, f: f64) -> Result<Value, E> {
        Ok(Value::Float64(f))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<Value, E> {
        Ok(Value::String(s.to_string()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> Result<Value, E> {
        Ok(Value::String(s))
    }

    fn visit_bytes<E: de::Error>(self, bytes: &[u8]) -> Result<Value, E> {
        Ok(Value::Bytes(bytes.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, bytes: Vec<u8>) -> Result<Value, E> {
        Ok(Value::Bytes(bytes))
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut fields = IndexMap::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            fields.insert(key, value);
        }
        Ok(Value::Object(fields))
    }
}

/// Through serde, integers become int64; [`Value::from_json`] is the wire import.
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Upload {
        name: String,
        size: i64,
        content: Vec<u8>,
        tags: Option<Vec<String>>,
    }

    #[test]
    fn test_struct_binding() {
        let value = Value::object([
            ("name", Value::from("poster.png")),
            ("size", Value::Int64(3)),
            ("content", Value::Bytes(vec![1, 2, 3])),
        ]);
        let upload: Upload = from_value(value).unwrap();
        assert_eq!(
            upload,
            Upload {
                name: "poster.png".into(),
                size: 3,
                content: vec![1, 2, 3],
                tags: None,
            }
        );
    }

    #[test]
    fn test_integral_float_binds_to_integers() {
        assert_eq!(from_value::<u32>(Value::Float64(7.0)).unwrap(), 7);
        assert!(from_value::<u32>(Value::Float64(7.5)).is_err());
        assert!(from_value::<u8>(Value::Float64(300.0)).is_err());
        assert_eq!(from_value::<f64>(Value::Int64(2)).unwrap(), 2.0);
    }

    #[test]
    fn test_enums() {
        #[derive(Debug, Deserialize, PartialEq)]
        #[serde(rename_all = "lowercase")]
        enum Status {
            Draft,
            Scheduled { at: f64 },
        }

        assert_eq!(from_value::<Status>(Value::from("draft")).unwrap(), Status::Draft);
        let at = Value::object([("at", Value::Float64(1.5))]);
        let scheduled = Value::object([("scheduled", at)]);
        assert_eq!(from_value::<Status>(scheduled).unwrap(), Status::Scheduled { at: 1.5 });
        assert!(from_value::<Status>(Value::Boolean(true)).is_err());
    }

    #[test]
    fn test_value_and_maps_bind() {
        let value = Value::object([("a", Value::Int64(1)), ("b", Value::Bytes(vec![9]))]);
        assert_eq!(from_value::<Value>(value.clone()).unwrap(), value);

        let scores: BTreeMap<String, f64> =
            from_value(Value::object([("ada", Value::Float64(1.0))])).unwrap();
        assert_eq!(scores["ada"], 1.0);
    }

    #[test]
    fn test_mismatch_is_binding_error() {
        let err = from_value::<i64>(Value::from("7")).unwrap_err();
        assert!(matches!(err, ValueError::Binding(_)));
    }
}
