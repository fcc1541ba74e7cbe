//! Schema definitions
//!
//! The set of tables of a deployment. Tables are added one at a time and
//! cross-checked as a whole by [`SchemaDefinition::validate`]:
//! - every `id` validator names a defined table
//! - every index field is a top-level field of every document variant

use indexmap::IndexMap;
use serde_json::json;

use super::errors::{SchemaError, SchemaResult};
use super::table::TableDefinition;
use crate::observability::{log_event_with_fields, Event};
use crate::validator::Validator;
use crate::value::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDefinition {
    tables: IndexMap<String, TableDefinition>,
}

impl SchemaDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table; table names are unique.
    pub fn table(mut self, table: TableDefinition) -> SchemaResult<Self> {
        if self.tables.contains_key(table.name()) {
            return Err(SchemaError::DuplicateTable(table.name().to_string()));
        }
        self.tables.insert(table.name().to_string(), table);
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableDefinition> {
        self.tables.values()
    }

    /// Cross-checks table references and index fields.
    ///
    /// Reports the first problem in table declaration order.
    pub fn validate(&self) -> SchemaResult<()> {
        for table in self.tables.values() {
            let mut references = Vec::new();
            table.document_validator().walk(&mut |validator| {
                if let Validator::Id { table_name } = validator {
                    references.push(table_name.as_str());
                }
            });
            let dangling = references
                .into_iter()
                .find(|target| !self.tables.contains_key(*target));
            if let Some(target) = dangling {
                return Err(SchemaError::UnknownTableReference {
                    table: table.name().to_string(),
                    target: target.to_string(),
                });
            }

            for index in table.indexes() {
                let unknown = index
                    .fields
                    .iter()
                    .find(|field| !table.has_top_level_field(field));
                if let Some(field) = unknown {
                    return Err(SchemaError::UnknownIndexField {
                        table: table.name().to_string(),
                        index: index.name.clone(),
                        field: field.clone(),
                    });
                }
            }
        }

        let count = self.tables.len().to_string();
        log_event_with_fields(Event::SchemaValidated, &[("tables", &count)]);
        Ok(())
    }

    /// Checks a document against the named table.
    pub fn validate_document(&self, table: &str, document: &Value) -> SchemaResult<()> {
        self.tables
            .get(table)
            .ok_or_else(|| SchemaError::UnknownTable(table.to_string()))?
            .validate_document(document)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let tables: Vec<_> = self.tables.values().map(TableDefinition::to_json).collect();
        json!({ "tables": tables })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{self, field};

    fn networks() -> TableDefinition {
        TableDefinition::new("networks", &ast::struct_([field("name", ast::string())])).unwrap()
    }

    fn shows() -> TableDefinition {
        TableDefinition::new(
            "shows",
            &ast::struct_([field("name", ast::string()), field("network", ast::id("networks"))]),
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_table() {
        let err = SchemaDefinition::new()
            .table(networks())
            .unwrap()
            .table(networks())
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateTable("networks".into()));
    }

    #[test]
    fn test_unknown_reference() {
        let schema = SchemaDefinition::new().table(shows()).unwrap();
        assert_eq!(
            schema.validate().unwrap_err(),
            SchemaError::UnknownTableReference {
                table: "shows".into(),
                target: "networks".into(),
            }
        );

        let schema = schema.table(networks()).unwrap();
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_unknown_index_field() {
        let schema = SchemaDefinition::new()
            .table(networks().index("by_country", ["country"]).unwrap())
            .unwrap();
        assert_eq!(schema.validate().unwrap_err().code(), "EFFEX_SCHEMA_UNKNOWN_INDEX_FIELD");
    }

    #[test]
    fn test_validate_document_unknown_table() {
        let schema = SchemaDefinition::new().table(networks()).unwrap();
        let doc = Value::object([("name", Value::from("HBO"))]);
        assert!(schema.validate_document("networks", &doc).is_ok());
        assert_eq!(
            schema.validate_document("shows", &doc).unwrap_err(),
            SchemaError::UnknownTable("shows".into())
        );
    }

    #[test]
    fn test_json_export_keeps_order() {
        let schema = SchemaDefinition::new().table(shows()).unwrap().table(networks()).unwrap();
        let json = schema.to_json();
        assert_eq!(json["tables"][0]["tableName"], "shows");
        assert_eq!(json["tables"][1]["tableName"], "networks");
    }
}
