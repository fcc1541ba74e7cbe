//! Function registry
//!
//! Named function definitions, invocation by name and the manifest the
//! platform reads to learn each function's kind and validators.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::context::RequestContext;
use super::errors::{RegistryError, RegistryResult, ServiceError};
use super::handler::{FunctionDefinition, FunctionKind};
use super::memory::MemoryScheduler;
use super::services::ScheduledCall;
use crate::observability::{log_event_with_fields, Event};

/// One manifest row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestEntry {
    pub name: String,
    pub kind: FunctionKind,
    pub args: serde_json::Value,
    pub returns: serde_json::Value,
}

type Definitions = HashMap<String, Arc<FunctionDefinition>>;

/// Registry of function definitions
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    by_name: RwLock<Definitions>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function under a unique name
    pub fn register(
        &self,
        name: impl Into<String>,
        definition: FunctionDefinition,
    ) -> RegistryResult<()> {
        let name = name.into();
        {
            let mut by_name = self
                .by_name
                .write()
                .map_err(|_| RegistryError::Internal("Lock poisoned".into()))?;
            if by_name.contains_key(&name) {
                return Err(RegistryError::AlreadyExists(name));
            }
            by_name.insert(name.clone(), Arc::new(definition));
        }

        log_event_with_fields(Event::FunctionRegistered, &[("name", &name)]);
        Ok(())
    }

    pub fn get(&self, name: &str) -> RegistryResult<Arc<FunctionDefinition>> {
        self.read()?
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn unregister(&self, name: &str) -> RegistryResult<()> {
        {
            let mut by_name = self
                .by_name
                .write()
                .map_err(|_| RegistryError::Internal("Lock poisoned".into()))?;
            by_name
                .remove(name)
                .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        }

        log_event_with_fields(Event::FunctionUnregistered, &[("name", name)]);
        Ok(())
    }

    fn read(&self) -> RegistryResult<RwLockReadGuard<'_, Definitions>> {
        self.by_name
            .read()
            .map_err(|_| RegistryError::Internal("Lock poisoned".into()))
    }

    /// Registered names, sorted
    pub fn list(&self) -> RegistryResult<Vec<String>> {
        let mut names: Vec<String> = self.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn len(&self) -> RegistryResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> RegistryResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Invoke the function registered under `name`
    pub async fn invoke(
        &self,
        name: &str,
        request: &RequestContext,
        args: serde_json::Value,
    ) -> RegistryResult<serde_json::Value> {
        let definition = self.get(name)?;
        Ok(definition.invoke(request, args).await?)
    }

    /// Every function with its kind and validators, sorted by name
    pub fn manifest(&self) -> RegistryResult<Vec<ManifestEntry>> {
        let mut entries: Vec<ManifestEntry> = self
            .read()?
            .iter()
            .map(|(name, definition)| ManifestEntry {
                name: name.clone(),
                kind: definition.kind(),
                args: definition.args_json(),
                returns: definition.returns_json(),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Runs every call due at `now`, earliest first.
    ///
    /// Each call gets its own request id; failures are returned next to
    /// the call rather than stopping the batch.
    pub async fn run_due(
        &self,
        scheduler: &MemoryScheduler,
        request: &RequestContext,
        now: DateTime<Utc>,
    ) -> Result<Vec<(ScheduledCall, RegistryResult<serde_json::Value>)>, ServiceError> {
        let mut results = Vec::new();
        for call in scheduler.take_due(now)? {
            let call_id = call.id.to_string();
            log_event_with_fields(
                Event::ScheduledCallDispatched,
                &[("call_id", &call_id), ("function", &call.function)],
            );
            let result = self
                .invoke(&call.function, &request.next_request(), call.args.clone())
                .await;
            results.push((call, result));
        }
        Ok(results)
    }
}
