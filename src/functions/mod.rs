//! Request handler shim
//!
//! Typed async handlers bound to argument and return schemas, the
//! request-scoped services they run against, and a registry that invokes
//! them by name.
//!
//! ```ignore
//! use effex::ast::{self, field};
//! use effex::functions::{Cause, FunctionDefinition, FunctionRegistry, RequestContext};
//!
//! let registry = FunctionRegistry::new();
//! registry.register(
//!     "shows:title",
//!     FunctionDefinition::query(
//!         ast::struct_([field("n", ast::number())]),
//!         ast::string(),
//!         |_ctx, args: Args| async move { Ok::<_, Cause<String>>(args.n.to_string()) },
//!     )?,
//! )?;
//! let out = registry.invoke("shows:title", &RequestContext::in_memory(), json!({"n": 5})).await?;
//! ```

mod cause;
mod context;
mod errors;
mod handler;
mod memory;
mod registry;
mod services;

pub use cause::{Cause, Defect};
pub use context::{
    Auth, DatabaseHandle, FunctionContext, RequestContext, StorageHandle, UserIdentity,
};
pub use errors::{
    ClientError, InvokeError, InvokeResult, RegistryError, RegistryResult, ServiceError,
    ServiceResult,
};
pub use handler::{FunctionDefinition, FunctionKind, InvocationState, RequestEnvelope};
pub use memory::{MemoryDatabase, MemoryScheduler, MemoryStorage};
pub use registry::{FunctionRegistry, ManifestEntry};
pub use services::{
    new_document_id, split_id, Database, ScheduledCall, Scheduler, Storage, CREATION_TIME_FIELD,
    ID_FIELD,
};
