//! Request-scoped service seams
//!
//! Handlers reach the outside world only through these traits. Every
//! method returns a boxed future so the traits stay object safe.
//!
//! Document ids have the form `<table>:<uuid>`; documents handed back by
//! [`Database::get`] and [`Database::query`] carry the system fields
//! `_id` and `_creationTime` alongside their own.

use chrono::{DateTime, Duration, Utc};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{ServiceError, ServiceResult};
use crate::value::Value;

pub const ID_FIELD: &str = "_id";
pub const CREATION_TIME_FIELD: &str = "_creationTime";

pub trait Database: Send + Sync {
    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ServiceResult<Option<Value>>>;

    /// Every document of `table`, in insertion order
    fn query<'a>(&'a self, table: &'a str) -> BoxFuture<'a, ServiceResult<Vec<Value>>>;

    /// Inserts a document and returns its new id
    fn insert<'a>(
        &'a self,
        table: &'a str,
        document: Value,
    ) -> BoxFuture<'a, ServiceResult<String>>;

    /// Shallow-merges `fields` into an existing document
    fn patch<'a>(&'a self, id: &'a str, fields: Value) -> BoxFuture<'a, ServiceResult<()>>;

    fn replace<'a>(&'a self, id: &'a str, document: Value) -> BoxFuture<'a, ServiceResult<()>>;

    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ServiceResult<()>>;
}

pub trait Storage: Send + Sync {
    /// Stores a blob and returns its storage id
    fn store(&self, content: Vec<u8>) -> BoxFuture<'_, ServiceResult<String>>;

    fn get<'a>(&'a self, storage_id: &'a str) -> BoxFuture<'a, ServiceResult<Option<Vec<u8>>>>;

    fn delete<'a>(&'a self, storage_id: &'a str) -> BoxFuture<'a, ServiceResult<()>>;

    /// A URL serving the blob, if it exists
    fn url<'a>(&'a self, storage_id: &'a str) -> BoxFuture<'a, ServiceResult<Option<String>>>;
}

/// A function call queued for later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledCall {
    pub id: Uuid,
    pub function: String,
    pub args: serde_json::Value,
    pub run_at: DateTime<Utc>,
}

impl ScheduledCall {
    pub fn new(
        function: impl Into<String>,
        args: serde_json::Value,
        run_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            function: function.into(),
            args,
            run_at,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.run_at <= now
    }
}

pub trait Scheduler: Send + Sync {
    /// Queues `function` to run with `args` after `delay`
    fn run_after<'a>(
        &'a self,
        delay: Duration,
        function: &'a str,
        args: serde_json::Value,
    ) -> BoxFuture<'a, ServiceResult<Uuid>>;

    fn cancel(&self, id: Uuid) -> BoxFuture<'_, ServiceResult<()>>;

    /// Pending calls ordered by run time
    fn list(&self) -> BoxFuture<'_, ServiceResult<Vec<ScheduledCall>>>;
}

/// Splits a document id into its table and document parts.
pub fn split_id(id: &str) -> ServiceResult<(&str, &str)> {
    match id.split_once(':') {
        Some((table, rest)) if !table.is_empty() && !rest.is_empty() => Ok((table, rest)),
        _ => Err(ServiceError::InvalidId(id.to_string())),
    }
}

pub fn new_document_id(table: &str) -> String {
    format!("{}:{}", table, Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::id_belongs_to;

    #[test]
    fn test_document_ids() {
        let id = new_document_id("shows");
        assert!(id_belongs_to(&id, "shows"));
        let (table, rest) = split_id(&id).unwrap();
        assert_eq!(table, "shows");
        assert_eq!(rest.len(), 32);
    }

    #[test]
    fn test_split_id_rejects_malformed() {
        assert!(split_id("shows").is_err());
        assert!(split_id(":abc").is_err());
        assert!(split_id("shows:").is_err());
    }

    #[test]
    fn test_scheduled_call_due() {
        let now = Utc::now();
        let call = ScheduledCall::new("shows:refresh", serde_json::json!({}), now);
        assert!(call.is_due(now));
        assert!(!call.is_due(now - Duration::seconds(1)));
    }
}
