//! In-memory services
//!
//! Process-local implementations of the service traits, guarded by
//! `RwLock`s. Every operation completes synchronously; the returned
//! futures are already resolved.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use futures_util::future::{self, BoxFuture, FutureExt};
use indexmap::IndexMap;
use uuid::Uuid;

use super::errors::{ServiceError, ServiceResult};
use super::services::{
    new_document_id, split_id, Database, ScheduledCall, Scheduler, Storage, CREATION_TIME_FIELD,
    ID_FIELD,
};
use crate::config::EffexConfig;
use crate::schema::{SchemaDefinition, SchemaError};
use crate::value::Value;

#[derive(Debug, Clone)]
struct StoredDocument {
    fields: IndexMap<String, Value>,
    creation_time: f64,
}

type Table = IndexMap<String, StoredDocument>;

/// Document store, optionally enforcing a schema on every write
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    schema: Option<SchemaDefinition>,
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes to tables outside `schema`, or documents it rejects, fail.
    pub fn with_schema(schema: SchemaDefinition) -> Self {
        Self {
            schema: Some(schema),
            tables: RwLock::default(),
        }
    }

    /// Total number of stored documents
    pub fn len(&self) -> ServiceResult<usize> {
        let tables = self.tables.read().map_err(|_| ServiceError::poisoned())?;
        Ok(tables.values().map(IndexMap::len).sum())
    }

    pub fn is_empty(&self) -> ServiceResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Strips system fields and checks the rest against the schema.
    fn user_fields(&self, table: &str, document: Value) -> ServiceResult<IndexMap<String, Value>> {
        let mut fields = match document {
            Value::Object(fields) => fields,
            other => return Err(ServiceError::NotAnObject(other.type_name())),
        };
        fields.shift_remove(ID_FIELD);
        fields.shift_remove(CREATION_TIME_FIELD);

        if let Some(schema) = &self.schema {
            schema.validate_document(table, &Value::Object(fields.clone()))?;
        }
        Ok(fields)
    }

    fn with_system_fields(id: &str, stored: &StoredDocument) -> Value {
        let mut out = IndexMap::with_capacity(stored.fields.len() + 2);
        out.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        out.insert(CREATION_TIME_FIELD.to_string(), Value::Float64(stored.creation_time));
        out.extend(stored.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        Value::Object(out)
    }

    fn get_now(&self, id: &str) -> ServiceResult<Option<Value>> {
        let (table, _) = split_id(id)?;
        let tables = self.tables.read().map_err(|_| ServiceError::poisoned())?;
        Ok(tables
            .get(table)
            .and_then(|docs| docs.get(id))
            .map(|stored| Self::with_system_fields(id, stored)))
    }

    fn query_now(&self, table: &str) -> ServiceResult<Vec<Value>> {
        if let Some(schema) = &self.schema {
            if schema.get(table).is_none() {
                return Err(SchemaError::UnknownTable(table.to_string()).into());
            }
        }
        let tables = self.tables.read().map_err(|_| ServiceError::poisoned())?;
        Ok(tables
            .get(table)
            .map(|docs| {
                docs.iter()
                    .map(|(id, stored)| Self::with_system_fields(id, stored))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn insert_now(&self, table: &str, document: Value) -> ServiceResult<String> {
        let fields = self.user_fields(table, document)?;
        let id = new_document_id(table);
        let stored = StoredDocument {
            fields,
            creation_time: Utc::now().timestamp_millis() as f64,
        };

        let mut tables = self.tables.write().map_err(|_| ServiceError::poisoned())?;
        tables.entry(table.to_string()).or_default().insert(id.clone(), stored);
        Ok(id)
    }

    /// Applies `update` to the stored fields of `id` and re-validates.
    fn update_now(
        &self,
        id: &str,
        update: impl FnOnce(&IndexMap<String, Value>) -> ServiceResult<Value>,
    ) -> ServiceResult<()> {
        let (table, _) = split_id(id)?;
        let mut tables = self.tables.write().map_err(|_| ServiceError::poisoned())?;
        let stored = tables
            .get_mut(table)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| ServiceError::DocumentNotFound(id.to_string()))?;

        let next = update(&stored.fields)?;
        stored.fields = self.user_fields(table, next)?;
        Ok(())
    }

    fn delete_now(&self, id: &str) -> ServiceResult<()> {
        let (table, _) = split_id(id)?;
        let mut tables = self.tables.write().map_err(|_| ServiceError::poisoned())?;
        tables
            .get_mut(table)
            .and_then(|docs| docs.shift_remove(id))
            .map(|_| ())
            .ok_or_else(|| ServiceError::DocumentNotFound(id.to_string()))
    }
}

impl Database for MemoryDatabase {
    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ServiceResult<Option<Value>>> {
        future::ready(self.get_now(id)).boxed()
    }

    fn query<'a>(&'a self, table: &'a str) -> BoxFuture<'a, ServiceResult<Vec<Value>>> {
        future::ready(self.query_now(table)).boxed()
    }

    fn insert<'a>(
        &'a self,
        table: &'a str,
        document: Value,
    ) -> BoxFuture<'a, ServiceResult<String>> {
        future::ready(self.insert_now(table, document)).boxed()
    }

    fn patch<'a>(&'a self, id: &'a str, fields: Value) -> BoxFuture<'a, ServiceResult<()>> {
        let result = self.update_now(id, |current| {
            let patch = match fields {
                Value::Object(patch) => patch,
                other => return Err(ServiceError::NotAnObject(other.type_name())),
            };
            let mut merged = current.clone();
            merged.extend(patch);
            Ok(Value::Object(merged))
        });
        future::ready(result).boxed()
    }

    fn replace<'a>(&'a self, id: &'a str, document: Value) -> BoxFuture<'a, ServiceResult<()>> {
        future::ready(self.update_now(id, |_| Ok(document))).boxed()
    }

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ServiceResult<()>> {
        future::ready(self.delete_now(id)).boxed()
    }
}

/// Blob store handing out `<base url>/<storage id>` URLs
#[derive(Debug)]
pub struct MemoryStorage {
    base_url: String,
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::from_config(&EffexConfig::default())
    }
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            blobs: RwLock::default(),
        }
    }

    pub fn from_config(config: &EffexConfig) -> Self {
        Self::new(config.storage_base_url.clone())
    }

    fn store_now(&self, content: Vec<u8>) -> ServiceResult<String> {
        let id = Uuid::new_v4().to_string();
        let mut blobs = self.blobs.write().map_err(|_| ServiceError::poisoned())?;
        blobs.insert(id.clone(), content);
        Ok(id)
    }

    fn get_now(&self, storage_id: &str) -> ServiceResult<Option<Vec<u8>>> {
        let blobs = self.blobs.read().map_err(|_| ServiceError::poisoned())?;
        Ok(blobs.get(storage_id).cloned())
    }

    fn delete_now(&self, storage_id: &str) -> ServiceResult<()> {
        let mut blobs = self.blobs.write().map_err(|_| ServiceError::poisoned())?;
        blobs.remove(storage_id);
        Ok(())
    }

    fn url_now(&self, storage_id: &str) -> ServiceResult<Option<String>> {
        let blobs = self.blobs.read().map_err(|_| ServiceError::poisoned())?;
        Ok(blobs
            .contains_key(storage_id)
            .then(|| format!("{}/{}", self.base_url, storage_id)))
    }
}

impl Storage for MemoryStorage {
    fn store(&self, content: Vec<u8>) -> BoxFuture<'_, ServiceResult<String>> {
        future::ready(self.store_now(content)).boxed()
    }

    fn get<'a>(&'a self, storage_id: &'a str) -> BoxFuture<'a, ServiceResult<Option<Vec<u8>>>> {
        future::ready(self.get_now(storage_id)).boxed()
    }

    fn delete<'a>(&'a self, storage_id: &'a str) -> BoxFuture<'a, ServiceResult<()>> {
        future::ready(self.delete_now(storage_id)).boxed()
    }

    fn url<'a>(&'a self, storage_id: &'a str) -> BoxFuture<'a, ServiceResult<Option<String>>> {
        future::ready(self.url_now(storage_id)).boxed()
    }
}

/// Queue of scheduled calls; nothing runs until the calls are taken
#[derive(Debug, Default)]
pub struct MemoryScheduler {
    calls: RwLock<HashMap<Uuid, ScheduledCall>>,
}

impl MemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn schedule(&self, call: ScheduledCall) -> ServiceResult<Uuid> {
        let id = call.id;
        let mut calls = self.calls.write().map_err(|_| ServiceError::poisoned())?;
        calls.insert(id, call);
        Ok(id)
    }

    fn cancel_now(&self, id: Uuid) -> ServiceResult<()> {
        let mut calls = self.calls.write().map_err(|_| ServiceError::poisoned())?;
        calls
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::ScheduledCallNotFound(id.to_string()))
    }

    fn list_now(&self) -> ServiceResult<Vec<ScheduledCall>> {
        let calls = self.calls.read().map_err(|_| ServiceError::poisoned())?;
        let mut out: Vec<_> = calls.values().cloned().collect();
        out.sort_by_key(|call| call.run_at);
        Ok(out)
    }

    /// Removes and returns the calls due at `now`, earliest first
    pub fn take_due(&self, now: DateTime<Utc>) -> ServiceResult<Vec<ScheduledCall>> {
        let mut calls = self.calls.write().map_err(|_| ServiceError::poisoned())?;
        let due: Vec<Uuid> = calls
            .values()
            .filter(|call| call.is_due(now))
            .map(|call| call.id)
            .collect();
        let mut out: Vec<_> = due.iter().filter_map(|id| calls.remove(id)).collect();
        out.sort_by_key(|call| call.run_at);
        Ok(out)
    }

    pub fn len(&self) -> ServiceResult<usize> {
        let calls = self.calls.read().map_err(|_| ServiceError::poisoned())?;
        Ok(calls.len())
    }

    pub fn is_empty(&self) -> ServiceResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl Scheduler for MemoryScheduler {
    fn run_after<'a>(
        &'a self,
        delay: Duration,
        function: &'a str,
        args: serde_json::Value,
    ) -> BoxFuture<'a, ServiceResult<Uuid>> {
        let call = ScheduledCall::new(function, args, Utc::now() + delay);
        future::ready(self.schedule(call)).boxed()
    }

    fn cancel(&self, id: Uuid) -> BoxFuture<'_, ServiceResult<()>> {
        future::ready(self.cancel_now(id)).boxed()
    }

    fn list(&self) -> BoxFuture<'_, ServiceResult<Vec<ScheduledCall>>> {
        future::ready(self.list_now()).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{self, field, optional};
    use crate::schema::TableDefinition;

    fn show(name: &str) -> Value {
        Value::object([("name", Value::from(name))])
    }

    fn schema() -> SchemaDefinition {
        SchemaDefinition::new()
            .table(
                TableDefinition::new(
                    "shows",
                    &ast::struct_([
                        field("name", ast::string()),
                        optional("rating", ast::number()),
                    ]),
                )
                .unwrap(),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_get_roundtrip() {
        let db = MemoryDatabase::new();
        let id = db.insert("shows", show("Severance")).await.unwrap();
        assert!(id.starts_with("shows:"));

        let doc = db.get(&id).await.unwrap().unwrap();
        let fields = doc.as_object().unwrap();
        assert_eq!(fields[ID_FIELD], Value::String(id.clone()));
        assert!(matches!(fields[CREATION_TIME_FIELD], Value::Float64(_)));
        assert_eq!(fields["name"], Value::from("Severance"));
        assert_eq!(db.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_patch_replace_delete() {
        let db = MemoryDatabase::new();
        let id = db.insert("shows", show("Severance")).await.unwrap();

        db.patch(&id, Value::object([("rating", Value::Float64(9.0))])).await.unwrap();
        let doc = db.get(&id).await.unwrap().unwrap();
        assert_eq!(doc.as_object().unwrap()["rating"], Value::Float64(9.0));

        db.replace(&id, show("Andor")).await.unwrap();
        let doc = db.get(&id).await.unwrap().unwrap();
        assert_eq!(doc.as_object().unwrap().get("rating"), None);

        db.delete(&id).await.unwrap();
        assert_eq!(db.get(&id).await.unwrap(), None);
        assert_eq!(
            db.delete(&id).await.unwrap_err(),
            ServiceError::DocumentNotFound(id.clone())
        );
    }

    #[tokio::test]
    async fn test_query_in_insertion_order() {
        let db = MemoryDatabase::new();
        db.insert("shows", show("a")).await.unwrap();
        db.insert("shows", show("b")).await.unwrap();
        let docs = db.query("shows").await.unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.as_object().unwrap()["name"].clone()).collect();
        assert_eq!(names, vec![Value::from("a"), Value::from("b")]);
        assert!(db.query("movies").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_schema_enforced_on_writes() {
        let db = MemoryDatabase::with_schema(schema());

        let err = db
            .insert("shows", Value::object([("rating", Value::Float64(1.0))]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "EFFEX_SCHEMA_DOCUMENT_REJECTED");

        let err = db.insert("movies", show("Heat")).await.unwrap_err();
        assert_eq!(err, ServiceError::Schema(SchemaError::UnknownTable("movies".into())));

        let id = db.insert("shows", show("Severance")).await.unwrap();
        let err = db
            .patch(&id, Value::object([("rating", Value::from("high"))]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "EFFEX_SCHEMA_DOCUMENT_REJECTED");

        let doc = db.get(&id).await.unwrap().unwrap();
        assert_eq!(doc.as_object().unwrap().get("rating"), None);
    }

    #[tokio::test]
    async fn test_replace_accepts_fetched_document() {
        let db = MemoryDatabase::with_schema(schema());
        let id = db.insert("shows", show("Severance")).await.unwrap();
        let doc = db.get(&id).await.unwrap().unwrap();
        db.replace(&id, doc).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_object_document() {
        let db = MemoryDatabase::new();
        let err = db.insert("shows", Value::from("x")).await.unwrap_err();
        assert_eq!(err, ServiceError::NotAnObject("string"));
    }

    #[tokio::test]
    async fn test_storage() {
        let storage = MemoryStorage::new("https://files.test");
        let id = storage.store(vec![1, 2, 3]).await.unwrap();
        assert_eq!(storage.get(&id).await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(
            storage.url(&id).await.unwrap(),
            Some(format!("https://files.test/{}", id))
        );

        storage.delete(&id).await.unwrap();
        assert_eq!(storage.get(&id).await.unwrap(), None);
        assert_eq!(storage.url(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scheduler() {
        let scheduler = MemoryScheduler::new();
        let later = scheduler
            .run_after(Duration::hours(1), "shows:refresh", serde_json::json!({}))
            .await
            .unwrap();
        scheduler
            .run_after(Duration::zero(), "shows:notify", serde_json::json!({"n": 1}))
            .await
            .unwrap();
        assert_eq!(scheduler.list().await.unwrap().len(), 2);

        let due = scheduler.take_due(Utc::now()).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].function, "shows:notify");

        scheduler.cancel(later).await.unwrap();
        assert!(scheduler.is_empty().unwrap());
        assert!(scheduler.cancel(later).await.is_err());
    }

    #[tokio::test]
    async fn test_poisoned_lock_is_reported() {
        let db = MemoryDatabase::new();
        db.insert("shows", show("Severance")).await.unwrap();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = db.tables.write().unwrap();
            panic!("writer crashed");
        }));
        assert_eq!(db.len().unwrap_err(), ServiceError::poisoned());
        assert_eq!(db.is_empty().unwrap_err(), ServiceError::poisoned());

        let scheduler = MemoryScheduler::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = scheduler.calls.write().unwrap();
            panic!("writer crashed");
        }));
        assert_eq!(scheduler.len().unwrap_err(), ServiceError::poisoned());
    }
}
