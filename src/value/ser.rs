//! Serializing Rust types into [`Value`]

use indexmap::IndexMap;
use serde::ser::{
    self, Impossible, Serialize, SerializeMap, SerializeSeq, SerializeStruct,
    SerializeStructVariant, SerializeTuple, SerializeTupleStruct, SerializeTupleVariant,
};

use super::{Value, ValueError, ValueResult};

/// Converts a Rust value into the value space.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> ValueResult<Value> {
    value.serialize(ValueSerializer)
}

/// Serializer whose output is a [`Value`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueSerializer;

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = ValueError;

    type SerializeSeq = SerializeArray;
    type SerializeTuple = SerializeArray;
    type SerializeTupleStruct = SerializeArray;
    type SerializeTupleVariant = SerializeVariant<SerializeArray>;
    type SerializeMap = SerializeObject;
    type SerializeStruct = SerializeObject;
    type SerializeStructVariant = SerializeVariant<SerializeObject>;

    fn serialize_bool(self, v: bool) -> ValueResult<Value> {
        Ok(Value::Boolean(v))
    }

    fn serialize_i8(self, v: i8) -> ValueResult<Value> {
        Ok(Value::Float64(f64::from(v)))
    }

    fn serialize_i16(self, v: i16) -> ValueResult<Value> {
        Ok(Value::Float64(f64::from(v)))
    }

    fn serialize_i32(self, v: i32) -> ValueResult<Value> {
        Ok(Value::Float64(f64::from(v)))
    }

    fn serialize_i64(self, v: i64) -> ValueResult<Value> {
        Ok(Value::Int64(v))
    }

    fn serialize_u8(self, v: u8) -> ValueResult<Value> {
        Ok(Value::Float64(f64::from(v)))
    }

    fn serialize_u16(self, v: u16) -> ValueResult<Value> {
        Ok(Value::Float64(f64::from(v)))
    }

    fn serialize_u32(self, v: u32) -> ValueResult<Value> {
        Ok(Value::Float64(f64::from(v)))
    }

    fn serialize_u64(self, v: u64) -> ValueResult<Value> {
        i64::try_from(v)
            .map(Value::Int64)
            .map_err(|_| ValueError::Binding(format!("{} does not fit in int64", v)))
    }

    fn serialize_f32(self, v: f32) -> ValueResult<Value> {
        Ok(Value::Float64(f64::from(v)))
    }

    fn serialize_f64(self, v: f64) -> ValueResult<Value> {
        Ok(Value::Float64(v))
    }

    fn serialize_char(self, v: char) -> ValueResult<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> ValueResult<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> ValueResult<Value> {
        Ok(Value::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> ValueResult<Value> {
        Ok(Value::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> ValueResult<Value> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> ValueResult<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> ValueResult<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> ValueResult<Value> {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> ValueResult<Value> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> ValueResult<Value> {
        Ok(Value::object([(variant, to_value(value)?)]))
    }

    fn serialize_seq(self, len: Option<usize>) -> ValueResult<SerializeArray> {
        Ok(SerializeArray::with_capacity(len.unwrap_or(0)))
    }

    fn serialize_tuple(self, len: usize) -> ValueResult<SerializeArray> {
        Ok(SerializeArray::with_capacity(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> ValueResult<SerializeArray> {
        Ok(SerializeArray::with_capacity(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> ValueResult<SerializeVariant<SerializeArray>> {
        Ok(SerializeVariant {
            variant,
            inner: SerializeArray::with_capacity(len),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> ValueResult<SerializeObject> {
        Ok(SerializeObject::with_capacity(len.unwrap_or(0)))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> ValueResult<SerializeObject> {
        Ok(SerializeObject::with_capacity(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> ValueResult<SerializeVariant<SerializeObject>> {
        Ok(SerializeVariant {
            variant,
            inner: SerializeObject::with_capacity(len),
        })
    }
}

/// Collects sequence elements.
///
/// A non-empty sequence made only of `u8`s becomes bytes; an empty one
/// stays an empty array.
pub struct SerializeArray {
    items: Vec<Value>,
    bytes: Option<Vec<u8>>,
}

impl SerializeArray {
    fn with_capacity(len: usize) -> Self {
        Self {
            items: Vec::with_capacity(len),
            bytes: Some(Vec::with_capacity(len)),
        }
    }

    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> ValueResult<()> {
        if let Some(mut bytes) = self.bytes.take() {
            if let Ok(byte) = value.serialize(ByteSerializer) {
                bytes.push(byte);
                self.bytes = Some(bytes);
                return Ok(());
            }
            self.items = bytes.into_iter().map(|b| Value::Float64(f64::from(b))).collect();
        }
        self.items.push(to_value(value)?);
        Ok(())
    }

    fn finish(self) -> Value {
        match self.bytes {
            Some(bytes) if !bytes.is_empty() => Value::Bytes(bytes),
            _ => Value::Array(self.items),
        }
    }
}

impl SerializeSeq for SerializeArray {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> ValueResult<()> {
        self.push(value)
    }

    fn end(self) -> ValueResult<Value> {
        Ok(self.finish())
    }
}

impl SerializeTuple for SerializeArray {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> ValueResult<()> {
        self.push(value)
    }

    fn end(self) -> ValueResult<Value> {
        Ok(self.finish())
    }
}

impl SerializeTupleStruct for SerializeArray {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> ValueResult<()> {
        self.push(value)
    }

    fn end(self) -> ValueResult<Value> {
        Ok(self.finish())
    }
}

/// Collects object fields in insertion order.
pub struct SerializeObject {
    fields: IndexMap<String, Value>,
    next_key: Option<String>,
}

impl SerializeObject {
    fn with_capacity(len: usize) -> Self {
        Self {
            fields: IndexMap::with_capacity(len),
            next_key: None,
        }
    }

    fn insert(&mut self, key: String, value: Value) -> ValueResult<()> {
        if key.starts_with('$') {
            return Err(ValueError::ReservedField(key));
        }
        self.fields.insert(key, value);
        Ok(())
    }
}

/// Object keys must be strings; numbers and booleans are rendered.
fn object_key(key: Value) -> ValueResult<String> {
    match key {
        Value::String(s) => Ok(s),
        Value::Int64(n) => Ok(n.to_string()),
        Value::Float64(f) => Ok(f.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        other => Err(ser::Error::custom(format!(
            "object keys must be strings, got {}",
            other.type_name()
        ))),
    }
}

impl SerializeMap for SerializeObject {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> ValueResult<()> {
        self.next_key = Some(object_key(to_value(key)?)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> ValueResult<()> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| ser::Error::custom("serialize_value called before serialize_key"))?;
        self.insert(key, to_value(value)?)
    }

    fn end(self) -> ValueResult<Value> {
        Ok(Value::Object(self.fields))
    }
}

impl SerializeStruct for SerializeObject {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> ValueResult<()> {
        self.insert(key.to_string(), to_value(value)?)
    }

    fn end(self) -> ValueResult<Value> {
        Ok(Value::Object(self.fields))
    }
}

/// `{variant: <inner>}` for tuple and struct variants
pub struct SerializeVariant<S> {
    variant: &'static str,
    inner: S,
}

impl SerializeTupleVariant for SerializeVariant<SerializeArray> {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> ValueResult<()> {
        self.inner.push(value)
    }

    fn end(self) -> ValueResult<Value> {
        Ok(Value::object([(self.variant, self.inner.finish())]))
    }
}

impl SerializeStructVariant for SerializeVariant<SerializeObject> {
    type Ok = Value;
    type Error = ValueError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> ValueResult<()> {
        SerializeStruct::serialize_field(&mut self.inner, key, value)
    }

    fn end(self) -> ValueResult<Value> {
        Ok(Value::object([(self.variant, Value::Object(self.inner.fields))]))
    }
}

/// Accepts a bare `u8` and rejects everything else
struct ByteSerializer;

type NotBytes = Impossible<u8, ValueError>;

fn not_a_byte() -> ValueError {
    ValueError::Binding("not a byte".into())
}

macro_rules! reject {
    ($($method:ident($($arg:ty),*) -> $ok:ty;)*) => {
        $(
            fn $method(self, $(_: $arg),*) -> ValueResult<$ok> {
                Err(not_a_byte())
            }
        )*
    };
}

impl ser::Serializer for ByteSerializer {
    type Ok = u8;
    type Error = ValueError;

    type SerializeSeq = NotBytes;
    type SerializeTuple = NotBytes;
    type SerializeTupleStruct = NotBytes;
    type SerializeTupleVariant = NotBytes;
    type SerializeMap = NotBytes;
    type SerializeStruct = NotBytes;
    type SerializeStructVariant = NotBytes;

    fn serialize_u8(self, v: u8) -> ValueResult<u8> {
        Ok(v)
    }

    reject! {
        serialize_bool(bool) -> u8;
        serialize_i8(i8) -> u8;
        serialize_i16(i16) -> u8;
        serialize_i32(i32) -> u8;
        serialize_i64(i64) -> u8;
        serialize_u16(u16) -> u8;
        serialize_u32(u32) -> u8;
        serialize_u64(u64) -> u8;
        serialize_f32(f32) -> u8;
        serialize_f64(f64) -> u8;
        serialize_char(char) -> u8;
        serialize_str(&str) -> u8;
        serialize_bytes(&[u8]) -> u8;
        serialize_none() -> u8;
        serialize_unit() -> u8;
        serialize_unit_struct(&'static str) -> u8;
        serialize_unit_variant(&'static str, u32, &'static str) -> u8;
        serialize_seq(Option<usize>) -> NotBytes;
        serialize_tuple(usize) -> NotBytes;
        serialize_tuple_struct(&'static str, usize) -> NotBytes;
        serialize_tuple_variant(&'static str, u32, &'static str, usize) -> NotBytes;
        serialize_map(Option<usize>) -> NotBytes;
        serialize_struct(&'static str, usize) -> NotBytes;
        serialize_struct_variant(&'static str, u32, &'static str, usize) -> NotBytes;
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _value: &T) -> ValueResult<u8> {
        Err(not_a_byte())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _value: &T,
    ) -> ValueResult<u8> {
        Err(not_a_byte())
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> ValueResult<u8> {
        Err(not_a_byte())
    }
}

impl Serialize for Value {
    fn serialize<S: ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Int64(n) => serializer.serialize_i64(*n),
            Value::Float64(f) => serializer.serialize_f64(*f),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(bytes) => serializer.serialize_bytes(bytes),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}
