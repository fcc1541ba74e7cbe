//! Table definitions
//!
//! A table is a document validator (compiled from a struct or a union of
//! structs) plus its named indexes. Index fields are checked against the
//! document shape when the owning schema is validated.

use serde_json::json;

use super::errors::{SchemaError, SchemaResult};
use crate::ast::Ast;
use crate::compiler::compile_table;
use crate::validator::Validator;
use crate::value::Value;

/// A named index over top-level document fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub name: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    name: String,
    document: Validator,
    indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    /// Compiles `document` into the table's validator.
    pub fn new(name: impl Into<String>, document: &Ast) -> SchemaResult<Self> {
        let name = name.into();
        let document = compile_table(document).map_err(|source| SchemaError::TableNotRepresentable {
            table: name.clone(),
            source,
        })?;

        Ok(Self {
            name,
            document,
            indexes: Vec::new(),
        })
    }

    /// Adds an index. Names are unique per table; at least one field.
    pub fn index<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        fields: impl IntoIterator<Item = S>,
    ) -> SchemaResult<Self> {
        let name = name.into();
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();

        if self.indexes.iter().any(|index| index.name == name) {
            return Err(SchemaError::DuplicateIndex {
                table: self.name,
                index: name,
            });
        }
        if fields.is_empty() {
            return Err(SchemaError::EmptyIndex {
                table: self.name,
                index: name,
            });
        }

        self.indexes.push(IndexDefinition { name, fields });
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document_validator(&self) -> &Validator {
        &self.document
    }

    pub fn indexes(&self) -> &[IndexDefinition] {
        &self.indexes
    }

    /// Checks a document (without system fields) against the table.
    pub fn validate_document(&self, document: &Value) -> SchemaResult<()> {
        self.document
            .check(document)
            .map_err(|source| SchemaError::DocumentRejected {
                table: self.name.clone(),
                source,
            })
    }

    /// Whether every object variant of the document declares `field`
    pub(crate) fn has_top_level_field(&self, field: &str) -> bool {
        fn declares(validator: &Validator, field: &str) -> bool {
            match validator {
                Validator::Object { value } => value.contains_key(field),
                Validator::Union { value } => value.iter().all(|member| declares(member, field)),
                _ => false,
            }
        }
        declares(&self.document, field)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let indexes: Vec<_> = self
            .indexes
            .iter()
            .map(|index| json!({ "indexDescriptor": index.name, "fields": index.fields }))
            .collect();
        json!({
            "tableName": self.name,
            "documentType": self.document.to_json(),
            "indexes": indexes,
        })
    }
}
