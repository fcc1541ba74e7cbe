//! Request and function contexts
//!
//! A [`RequestContext`] is what the caller hands to an invocation: the
//! authenticated identity and the services of the deployment. The shim
//! turns it into a fresh [`FunctionContext`] per invocation, which gates
//! every service by the function's kind.

use std::sync::Arc;
use std::time::Instant;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{ServiceError, ServiceResult};
use super::handler::FunctionKind;
use super::memory::{MemoryDatabase, MemoryScheduler, MemoryStorage};
use super::services::{Database, ScheduledCall, Scheduler, Storage};
use crate::value::Value;

/// Identity claims of an authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub token_identifier: String,
    pub subject: String,
    pub issuer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserIdentity {
    pub fn new(issuer: impl Into<String>, subject: impl Into<String>) -> Self {
        let issuer = issuer.into();
        let subject = subject.into();
        Self {
            token_identifier: format!("{}|{}", issuer, subject),
            subject,
            issuer,
            name: None,
            email: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Auth {
    identity: Option<UserIdentity>,
}

impl Auth {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(identity: UserIdentity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    pub fn get_user_identity(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }
}

/// Everything an invocation receives from its caller
#[derive(Clone)]
pub struct RequestContext {
    /// Request ID for tracing
    pub request_id: Uuid,
    pub auth: Auth,
    pub database: Arc<dyn Database>,
    pub storage: Arc<dyn Storage>,
    pub scheduler: Arc<dyn Scheduler>,
    started_at: Instant,
}

impl RequestContext {
    pub fn new(
        auth: Auth,
        database: Arc<dyn Database>,
        storage: Arc<dyn Storage>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            auth,
            database,
            storage,
            scheduler,
            started_at: Instant::now(),
        }
    }

    /// Anonymous context over fresh in-memory services
    pub fn in_memory() -> Self {
        Self::new(
            Auth::anonymous(),
            Arc::new(MemoryDatabase::new()),
            Arc::new(MemoryStorage::default()),
            Arc::new(MemoryScheduler::new()),
        )
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    /// Same services and identity, new request id
    pub fn next_request(&self) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            started_at: Instant::now(),
            ..self.clone()
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

/// The context a handler runs in
#[derive(Clone)]
pub struct FunctionContext {
    pub invocation_id: Uuid,
    pub request_id: Uuid,
    pub kind: FunctionKind,
    pub auth: Auth,
    database: Arc<dyn Database>,
    storage: Arc<dyn Storage>,
    scheduler: Arc<dyn Scheduler>,
}

impl FunctionContext {
    pub(crate) fn new(request: &RequestContext, kind: FunctionKind, invocation_id: Uuid) -> Self {
        Self {
            invocation_id,
            request_id: request.request_id,
            kind,
            auth: request.auth.clone(),
            database: Arc::clone(&request.database),
            storage: Arc::clone(&request.storage),
            scheduler: Arc::clone(&request.scheduler),
        }
    }

    fn denied(&self, capability: &'static str) -> ServiceError {
        ServiceError::CapabilityDenied {
            kind: self.kind.as_str(),
            capability,
        }
    }

    /// Database access; read-only for queries, unavailable to actions.
    pub fn db(&self) -> ServiceResult<DatabaseHandle<'_>> {
        if !self.kind.can_read_database() {
            return Err(self.denied("database access"));
        }
        Ok(DatabaseHandle {
            context: self,
            database: self.database.as_ref(),
        })
    }

    /// File storage; writes are unavailable to queries.
    pub fn storage(&self) -> StorageHandle<'_> {
        StorageHandle {
            context: self,
            storage: self.storage.as_ref(),
        }
    }

    /// Scheduling; unavailable to queries.
    pub fn scheduler(&self) -> ServiceResult<&dyn Scheduler> {
        if !self.kind.can_schedule() {
            return Err(self.denied("scheduling"));
        }
        Ok(self.scheduler.as_ref())
    }

    pub async fn run_after(
        &self,
        delay: Duration,
        function: &str,
        args: serde_json::Value,
    ) -> ServiceResult<Uuid> {
        self.scheduler()?.run_after(delay, function, args).await
    }

    pub async fn scheduled(&self) -> ServiceResult<Vec<ScheduledCall>> {
        self.scheduler()?.list().await
    }
}

impl std::fmt::Debug for FunctionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionContext")
            .field("invocation_id", &self.invocation_id)
            .field("request_id", &self.request_id)
            .field("kind", &self.kind)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

pub struct DatabaseHandle<'a> {
    context: &'a FunctionContext,
    database: &'a dyn Database,
}

impl DatabaseHandle<'_> {
    fn writable(&self) -> ServiceResult<()> {
        if self.context.kind.can_write_database() {
            Ok(())
        } else {
            Err(self.context.denied("database writes"))
        }
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Option<Value>> {
        self.database.get(id).await
    }

    pub async fn query(&self, table: &str) -> ServiceResult<Vec<Value>> {
        self.database.query(table).await
    }

    pub async fn insert(&self, table: &str, document: Value) -> ServiceResult<String> {
        self.writable()?;
        self.database.insert(table, document).await
    }

    pub async fn patch(&self, id: &str, fields: Value) -> ServiceResult<()> {
        self.writable()?;
        self.database.patch(id, fields).await
    }

    pub async fn replace(&self, id: &str, document: Value) -> ServiceResult<()> {
        self.writable()?;
        self.database.replace(id, document).await
    }

    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        self.writable()?;
        self.database.delete(id).await
    }
}

pub struct StorageHandle<'a> {
    context: &'a FunctionContext,
    storage: &'a dyn Storage,
}

impl StorageHandle<'_> {
    fn writable(&self) -> ServiceResult<()> {
        if self.context.kind.can_write_storage() {
            Ok(())
        } else {
            Err(self.context.denied("storage writes"))
        }
    }

    pub async fn store(&self, content: Vec<u8>) -> ServiceResult<String> {
        self.writable()?;
        self.storage.store(content).await
    }

    pub async fn get(&self, storage_id: &str) -> ServiceResult<Option<Vec<u8>>> {
        self.storage.get(storage_id).await
    }

    pub async fn delete(&self, storage_id: &str) -> ServiceResult<()> {
        self.writable()?;
        self.storage.delete(storage_id).await
    }

    pub async fn url(&self, storage_id: &str) -> ServiceResult<Option<String>> {
        self.storage.url(storage_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(kind: FunctionKind) -> FunctionContext {
        FunctionContext::new(&RequestContext::in_memory(), kind, Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_query_is_read_only() {
        let ctx = context(FunctionKind::Query);
        let db = ctx.db().unwrap();
        assert!(db.query("shows").await.unwrap().is_empty());

        let err = db
            .insert("shows", Value::object([("name", Value::from("x"))]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::CapabilityDenied {
                kind: "query",
                capability: "database writes"
            }
        );
        assert!(ctx.scheduler().is_err());
        assert!(ctx.storage().store(vec![1]).await.is_err());
    }

    #[tokio::test]
    async fn test_mutation_writes_and_schedules() {
        let ctx = context(FunctionKind::Mutation);
        let id = ctx
            .db()
            .unwrap()
            .insert("shows", Value::object([("name", Value::from("x"))]))
            .await
            .unwrap();
        assert!(ctx.db().unwrap().get(&id).await.unwrap().is_some());

        ctx.run_after(Duration::zero(), "shows:notify", serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(ctx.scheduled().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_action_has_no_database() {
        let ctx = context(FunctionKind::Action);
        assert_eq!(ctx.db().err().map(|e| e.code()), Some("EFFEX_CAPABILITY_DENIED"));

        let storage = ctx.storage();
        let id = storage.store(b"poster".to_vec()).await.unwrap();
        assert!(storage.url(&id).await.unwrap().is_some());
        assert!(ctx.scheduler().is_ok());
    }

    #[test]
    fn test_auth_identity() {
        assert!(Auth::anonymous().get_user_identity().is_none());

        let identity = UserIdentity::new("https://auth.test", "user-1");
        assert_eq!(identity.token_identifier, "https://auth.test|user-1");

        let auth = Auth::authenticated(identity.clone());
        assert_eq!(auth.get_user_identity(), Some(&identity));
    }

    #[test]
    fn test_identity_serializes_camel_case() {
        let json = serde_json::to_value(UserIdentity::new("iss", "sub")).unwrap();
        assert_eq!(json["tokenIdentifier"], "iss|sub");
        assert!(json.get("email").is_none());
    }
}
