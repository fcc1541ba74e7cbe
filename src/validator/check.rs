//! Runtime enforcement of validators on platform values
//!
//! Semantics:
//! - Object validators reject undeclared fields
//! - Required fields must be present; optional fields may be absent
//! - No coercion: float64 never satisfies int64 and vice versa
//! - Record keys must be strings accepted by the key validator
//! - Ids are strings of the form `<table>:<document id>`
//!
//! The first violation found is reported.

use super::errors::{ValidationError, ValidationResult};
use super::types::{PropertyValidators, Validator};
use crate::value::Value;

impl Validator {
    /// Checks `value` against this validator.
    pub fn check(&self, value: &Value) -> ValidationResult<()> {
        check_value(self, value, "$root")
    }
}

/// Checks an argument object against per-field validators
pub fn check_fields(fields: &PropertyValidators, value: &Value) -> ValidationResult<()> {
    let obj = value
        .as_object()
        .ok_or_else(|| ValidationError::type_mismatch("$root", "object", value.type_name()))?;
    check_object(fields, obj, "$root")
}

fn check_value(validator: &Validator, value: &Value, path: &str) -> ValidationResult<()> {
    match (validator, value) {
        (Validator::Any, _) => Ok(()),
        (Validator::Boolean, Value::Boolean(_)) => Ok(()),
        (Validator::Float64, Value::Float64(_)) => Ok(()),
        (Validator::Int64, Value::Int64(_)) => Ok(()),
        (Validator::String, Value::String(_)) => Ok(()),
        (Validator::Bytes, Value::Bytes(_)) => Ok(()),
        (Validator::Null, Value::Null) => Ok(()),
        (Validator::Literal { value: expected }, actual) => {
            if expected.to_value() == *actual {
                Ok(())
            } else {
                Err(ValidationError::new(path, format!("literal {}", expected), actual.to_string()))
            }
        }
        (Validator::Id { table_name }, Value::String(s)) => {
            if id_belongs_to(s, table_name) {
                Ok(())
            } else {
                Err(ValidationError::new(
                    path,
                    format!("id of table '{}'", table_name),
                    format!("'{}'", s),
                ))
            }
        }
        (Validator::Array { value: item }, Value::Array(items)) => {
            for (i, elem) in items.iter().enumerate() {
                check_value(item, elem, &format!("{}[{}]", path, i))?;
            }
            Ok(())
        }
        (Validator::Object { value: fields }, Value::Object(obj)) => {
            check_object(fields, obj, path)
        }
        (Validator::Record { keys, values }, Value::Object(obj)) => {
            for (key, elem) in obj {
                let field_path = make_path(path, key);
                check_value(keys, &Value::String(key.clone()), &field_path).map_err(|_| {
                    ValidationError::new(
                        &field_path,
                        format!("key accepted by {}", keys.kind()),
                        format!("'{}'", key),
                    )
                })?;
                check_value(&values.field_type, elem, &field_path)?;
            }
            Ok(())
        }
        (Validator::Union { value: members }, actual) => {
            if members.iter().any(|m| check_value(m, actual, path).is_ok()) {
                Ok(())
            } else {
                let kinds: Vec<_> = members.iter().map(Validator::kind).collect();
                Err(ValidationError::new(
                    path,
                    format!("one of [{}]", kinds.join(", ")),
                    actual.type_name(),
                ))
            }
        }
        (expected, actual) => Err(ValidationError::type_mismatch(
            path,
            expected.kind(),
            actual.type_name(),
        )),
    }
}

fn check_object(
    fields: &PropertyValidators,
    obj: &indexmap::IndexMap<String, Value>,
    path: &str,
) -> ValidationResult<()> {
    for key in obj.keys() {
        if !fields.contains_key(key) {
            return Err(ValidationError::extra_field(make_path(path, key)));
        }
    }

    for (name, field) in fields {
        let field_path = make_path(path, name);
        match obj.get(name) {
            Some(value) => check_value(&field.field_type, value, &field_path)?,
            None if field.optional => {}
            None => return Err(ValidationError::missing_field(field_path)),
        }
    }

    Ok(())
}

/// Whether `id` names a document of `table` (`<table>:<document id>`)
pub fn id_belongs_to(id: &str, table: &str) -> bool {
    id.split_once(':')
        .map(|(prefix, rest)| prefix == table && !rest.is_empty())
        .unwrap_or(false)
}

fn make_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}
