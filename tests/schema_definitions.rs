//! Table and schema definition tests
//!
//! Covers the deployment-level view of tables:
//! 1. Document validators compiled from structs and unions
//! 2. Cross-table id references and index fields
//! 3. JSON export
//! 4. Enforcement on in-memory writes

use serde_json::json;

use effex::ast::{self, field, optional};
use effex::functions::{Database, MemoryDatabase, ServiceError};
use effex::schema::{SchemaDefinition, SchemaError, TableDefinition};
use effex::value::Value;

fn networks() -> TableDefinition {
    TableDefinition::new("networks", &ast::struct_([field("name", ast::string())]))
        .unwrap()
        .index("by_name", ["name"])
        .unwrap()
}

fn media() -> TableDefinition {
    TableDefinition::new(
        "media",
        &ast::union([
            ast::struct_([
                field("kind", ast::literal("movie")),
                field("title", ast::string()),
                field("runtime", ast::number()),
            ]),
            ast::struct_([
                field("kind", ast::literal("series")),
                field("title", ast::string()),
                field("network", ast::id("networks")),
                optional("seasons", ast::number()),
            ]),
        ]),
    )
    .unwrap()
}

fn schema() -> SchemaDefinition {
    SchemaDefinition::new()
        .table(networks())
        .unwrap()
        .table(media())
        .unwrap()
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Test: A consistent schema validates.
#[test]
fn test_consistent_schema() {
    assert!(schema().validate().is_ok());
}

/// Test: An id into an undefined table is rejected.
#[test]
fn test_dangling_reference() {
    let schema = SchemaDefinition::new().table(media()).unwrap();
    assert_eq!(
        schema.validate().unwrap_err(),
        SchemaError::UnknownTableReference {
            table: "media".into(),
            target: "networks".into(),
        }
    );
}

/// Test: Index fields must exist on every variant of a union table.
#[test]
fn test_index_fields_across_variants() {
    let by_title = SchemaDefinition::new()
        .table(networks())
        .unwrap()
        .table(media().index("by_title", ["kind", "title"]).unwrap())
        .unwrap();
    assert!(by_title.validate().is_ok());

    let by_network = SchemaDefinition::new()
        .table(networks())
        .unwrap()
        .table(media().index("by_network", ["network"]).unwrap())
        .unwrap();
    assert_eq!(
        by_network.validate().unwrap_err(),
        SchemaError::UnknownIndexField {
            table: "media".into(),
            index: "by_network".into(),
            field: "network".into(),
        }
    );
}

/// Test: Duplicate and empty indexes are rejected at definition time.
#[test]
fn test_index_definition_errors() {
    let err = networks().index("by_name", ["name"]).unwrap_err();
    assert_eq!(err.code(), "EFFEX_SCHEMA_DUPLICATE_INDEX");

    let err = networks().index("nothing", Vec::<String>::new()).unwrap_err();
    assert_eq!(err.code(), "EFFEX_SCHEMA_EMPTY_INDEX");
}

// =============================================================================
// DOCUMENTS
// =============================================================================

/// Test: Documents are checked against the matching union variant.
#[test]
fn test_validate_documents() {
    let schema = schema();
    let movie = json!({"kind": "movie", "title": "Heat", "runtime": 170});
    let movie = Value::from_json(movie).unwrap();
    assert!(schema.validate_document("media", &movie).is_ok());

    let series = json!({"kind": "series", "title": "Lost", "network": "networks:abc"});
    let series = Value::from_json(series).unwrap();
    assert!(schema.validate_document("media", &series).is_ok());

    let wrong_table = json!({"kind": "series", "title": "Lost", "network": "media:abc"});
    let wrong_table = Value::from_json(wrong_table).unwrap();
    assert!(matches!(
        schema.validate_document("media", &wrong_table),
        Err(SchemaError::DocumentRejected { .. })
    ));

    assert_eq!(
        schema.validate_document("people", &movie).unwrap_err(),
        SchemaError::UnknownTable("people".into())
    );
}

/// Test: The in-memory database enforces the schema on every write.
#[tokio::test]
async fn test_database_enforces_schema() {
    let database = MemoryDatabase::with_schema(schema());

    let network = database
        .insert("networks", Value::object([("name", Value::from("ABC"))]))
        .await
        .unwrap();
    let series = json!({"kind": "series", "title": "Lost", "network": network});
    let series = Value::from_json(series).unwrap();
    let id = database.insert("media", series).await.unwrap();

    let patch = Value::object([("seasons", Value::Float64(6.0))]);
    database.patch(&id, patch).await.unwrap();

    let bad_patch = Value::object([("seasons", Value::from("six"))]);
    let err = database.patch(&id, bad_patch).await.unwrap_err();
    assert!(matches!(err, ServiceError::Schema(SchemaError::DocumentRejected { .. })));

    let stored = database.get(&id).await.unwrap().unwrap();
    let stored = stored.as_object().unwrap();
    assert_eq!(stored["seasons"], Value::Float64(6.0));
    assert_eq!(stored["_id"], Value::String(id.clone()));

    let err = database.query("people").await.unwrap_err();
    assert_eq!(err.code(), "EFFEX_SCHEMA_UNKNOWN_TABLE");
}

// =============================================================================
// EXPORT
// =============================================================================

/// Test: The schema exports tables, document validators and indexes.
#[test]
fn test_json_export() {
    let json = schema().to_json();
    let tables = json["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 2);

    assert_eq!(
        tables[0],
        json!({
            "tableName": "networks",
            "documentType": {
                "type": "object",
                "value": {"name": {"fieldType": {"type": "string"}, "optional": false}}
            },
            "indexes": [{"indexDescriptor": "by_name", "fields": ["name"]}]
        })
    );

    let variants = tables[1]["documentType"]["value"].as_array().unwrap();
    assert_eq!(variants.len(), 2);
    assert_eq!(
        variants[1]["value"]["network"]["fieldType"],
        json!({"type": "id", "tableName": "networks"})
    );
}
