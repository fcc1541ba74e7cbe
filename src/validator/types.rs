//! Validator vocabulary of the hosting platform
//!
//! Serializes to the JSON shape the function-definition API accepts:
//! - `{"type": "string"}` for unit kinds
//! - `{"type": "id", "tableName": "shows"}`
//! - `{"type": "array", "value": <validator>}`
//! - `{"type": "object", "value": {"name": {"fieldType": <validator>, "optional": false}}}`
//! - `{"type": "record", "keys": <validator>, "values": <field validator>}`, where a
//!   field validator is `{"fieldType": <validator>, "optional": false}`
//! - `{"type": "union", "value": [<validator>, ...]}`
//! - `{"type": "literal", "value": <literal>}`

use indexmap::IndexMap;
use serde::Serialize;

use crate::ast::LiteralValue;

/// Field validators keyed by field name, in declaration order
pub type PropertyValidators = IndexMap<String, FieldValidator>;

/// A compiled validator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Validator {
    Boolean,
    Float64,
    Int64,
    String,
    Bytes,
    Literal {
        value: LiteralValue,
    },
    Null,
    Id {
        #[serde(rename = "tableName")]
        table_name: String,
    },
    Array {
        value: Box<Validator>,
    },
    Object {
        value: PropertyValidators,
    },
    Record {
        keys: Box<Validator>,
        values: Box<FieldValidator>,
    },
    Union {
        value: Vec<Validator>,
    },
    Any,
}

/// A validator in field position
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidator {
    pub field_type: Validator,
    pub optional: bool,
}

impl FieldValidator {
    pub fn required(field_type: Validator) -> Self {
        Self {
            field_type,
            optional: false,
        }
    }

    pub fn optional(field_type: Validator) -> Self {
        Self {
            field_type,
            optional: true,
        }
    }
}

impl Validator {
    /// Returns the kind name for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Validator::Boolean => "boolean",
            Validator::Float64 => "float64",
            Validator::Int64 => "int64",
            Validator::String => "string",
            Validator::Bytes => "bytes",
            Validator::Literal { .. } => "literal",
            Validator::Null => "null",
            Validator::Id { .. } => "id",
            Validator::Array { .. } => "array",
            Validator::Object { .. } => "object",
            Validator::Record { .. } => "record",
            Validator::Union { .. } => "union",
            Validator::Any => "any",
        }
    }

    pub fn array(item: Validator) -> Self {
        Validator::Array {
            value: Box::new(item),
        }
    }

    pub fn object(fields: PropertyValidators) -> Self {
        Validator::Object { value: fields }
    }

    pub fn record(keys: Validator, values: Validator) -> Self {
        Validator::Record {
            keys: Box::new(keys),
            values: Box::new(FieldValidator::required(values)),
        }
    }

    pub fn id(table_name: impl Into<String>) -> Self {
        Validator::Id {
            table_name: table_name.into(),
        }
    }

    pub fn literal(value: impl Into<LiteralValue>) -> Self {
        Validator::Literal {
            value: value.into(),
        }
    }

    /// A union of `members`; a single member is returned as-is
    pub fn union(mut members: Vec<Validator>) -> Self {
        if members.len() == 1 {
            members.remove(0)
        } else {
            Validator::Union { value: members }
        }
    }

    /// Export to the platform JSON shape
    pub fn to_json(&self) -> serde_json::Value {
        // Every field is plain data with string keys
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Visit this validator and every nested one, depth first
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Validator)) {
        visit(self);
        match self {
            Validator::Array { value } => value.walk(visit),
            Validator::Object { value } => {
                for field in value.values() {
                    field.field_type.walk(visit);
                }
            }
            Validator::Record { keys, values } => {
                keys.walk(visit);
                values.field_type.walk(visit);
            }
            Validator::Union { value } => {
                for member in value {
                    member.walk(visit);
                }
            }
            Validator::Boolean
            | Validator::Float64
            | Validator::Int64
            | Validator::String
            | Validator::Bytes
            | Validator::Literal { .. }
            | Validator::Null
            | Validator::Id { .. }
            | Validator::Any => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unit_kinds_serialize_with_type_tag() {
        assert_eq!(Validator::Float64.to_json(), json!({ "type": "float64" }));
        assert_eq!(Validator::Int64.to_json(), json!({ "type": "int64" }));
        assert_eq!(Validator::Any.to_json(), json!({ "type": "any" }));
    }

    #[test]
    fn test_id_serializes_table_name() {
        assert_eq!(
            Validator::id("shows").to_json(),
            json!({ "type": "id", "tableName": "shows" })
        );
    }

    #[test]
    fn test_object_serializes_field_validators() {
        let mut fields = PropertyValidators::new();
        fields.insert("a".into(), FieldValidator::required(Validator::Float64));
        fields.insert("b".into(), FieldValidator::optional(Validator::String));

        assert_eq!(
            Validator::object(fields).to_json(),
            json!({
                "type": "object",
                "value": {
                    "a": { "fieldType": { "type": "float64" }, "optional": false },
                    "b": { "fieldType": { "type": "string" }, "optional": true }
                }
            })
        );
    }

    #[test]
    fn test_record_and_literal() {
        let record = Validator::record(Validator::String, Validator::literal("x"));
        assert_eq!(
            record.to_json(),
            json!({
                "type": "record",
                "keys": { "type": "string" },
                "values": { "fieldType": { "type": "literal", "value": "x" }, "optional": false }
            })
        );
    }

    #[test]
    fn test_union_of_one_collapses() {
        assert_eq!(Validator::union(vec![Validator::Null]), Validator::Null);
    }

    #[test]
    fn test_walk_visits_nested() {
        let v = Validator::array(Validator::union(vec![Validator::id("a"), Validator::id("b")]));
        let mut kinds = Vec::new();
        v.walk(&mut |node| kinds.push(node.kind()));
        assert_eq!(kinds, vec!["array", "union", "id", "id"]);
    }
}
