//! The request handler shim
//!
//! A [`FunctionDefinition`] binds an argument schema, a return schema and
//! a typed async handler. Invoking it:
//!
//! 1. imports the raw JSON args and decodes them against the args schema,
//!    then binds the decoded [`Value`] to the handler's argument type; on
//!    failure the handler never runs
//! 2. runs the handler with a fresh [`FunctionContext`]
//! 3. converts the handler's result to a [`Value`] and encodes it against
//!    the return schema
//!
//! Binding goes through [`value::from_value`] and [`value::to_value`], so
//! `i64` meets `bigint` and `Vec<u8>` meets `bytes` in both directions.
//!
//! Handler failures are translated by cause:
//! - `Fail(e)` becomes a [`ClientError`] carrying `e`'s display text
//! - `Die(defect)` is passed through as [`InvokeError::Defect`]
//! - any other cause is logged and the shim panics with it
//!
//! Invocation states:
//!
//! ```text
//! Pending -> Decoding -> Handling -> Encoding -> Succeeded
//!               |           |           |
//!               |           |           +--> FailedRethrown
//!               |           +--> FailedClientVisible | FailedRethrown
//!               +--> FailedRethrown
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cause::Cause;
use super::context::{FunctionContext, RequestContext};
use super::errors::{ClientError, InvokeError, InvokeResult};
use crate::ast::Ast;
use crate::compiler::{compile_args, compile_returns, CompileResult};
use crate::observability::{log_event_with_fields, Event};
use crate::parse::{self, ParseError};
use crate::validator::{PropertyValidators, Validator};
use crate::value::{self, Value, ValueResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    /// Reads the database; no writes, no scheduling
    Query,
    /// Reads and writes the database, may schedule
    Mutation,
    /// No direct database access; may schedule and write storage
    Action,
}

impl FunctionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionKind::Query => "query",
            FunctionKind::Mutation => "mutation",
            FunctionKind::Action => "action",
        }
    }

    pub fn can_read_database(&self) -> bool {
        matches!(self, FunctionKind::Query | FunctionKind::Mutation)
    }

    pub fn can_write_database(&self) -> bool {
        matches!(self, FunctionKind::Mutation)
    }

    pub fn can_schedule(&self) -> bool {
        matches!(self, FunctionKind::Mutation | FunctionKind::Action)
    }

    pub fn can_write_storage(&self) -> bool {
        matches!(self, FunctionKind::Mutation | FunctionKind::Action)
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Pending,
    Decoding,
    Handling,
    Encoding,
    Succeeded,
    FailedClientVisible,
    FailedRethrown,
}

impl InvocationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvocationState::Pending => "PENDING",
            InvocationState::Decoding => "DECODING",
            InvocationState::Handling => "HANDLING",
            InvocationState::Encoding => "ENCODING",
            InvocationState::Succeeded => "SUCCEEDED",
            InvocationState::FailedClientVisible => "FAILED_CLIENT_VISIBLE",
            InvocationState::FailedRethrown => "FAILED_RETHROWN",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InvocationState::Succeeded
                | InvocationState::FailedClientVisible
                | InvocationState::FailedRethrown
        )
    }

    pub fn can_transition_to(&self, next: InvocationState) -> bool {
        use InvocationState::*;
        matches!(
            (self, next),
            (Pending, Decoding)
                | (Decoding, Handling)
                | (Decoding, FailedRethrown)
                | (Handling, Encoding)
                | (Handling, FailedClientVisible)
                | (Handling, FailedRethrown)
                | (Encoding, Succeeded)
                | (Encoding, FailedRethrown)
        )
    }
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-invocation record; discarded when the invocation ends
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    pub invocation_id: Uuid,
    pub kind: FunctionKind,
    pub raw_args: serde_json::Value,
    pub decoded_args: Option<Value>,
    pub handler_result: Option<Value>,
    pub encoded_result: Option<serde_json::Value>,
    state: InvocationState,
}

impl RequestEnvelope {
    pub fn new(kind: FunctionKind, raw_args: serde_json::Value) -> Self {
        Self {
            invocation_id: Uuid::new_v4(),
            kind,
            raw_args,
            decoded_args: None,
            handler_result: None,
            encoded_result: None,
            state: InvocationState::Pending,
        }
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    fn advance(&mut self, next: InvocationState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid invocation transition {} -> {}",
            self.state,
            next
        );
        let invocation_id = self.invocation_id.to_string();
        log_event_with_fields(
            Event::InvocationState,
            &[
                ("from", self.state.as_str()),
                ("invocation_id", &invocation_id),
                ("kind", self.kind.as_str()),
                ("to", next.as_str()),
            ],
        );
        self.state = next;
    }
}

/// What a type-erased handler produced
enum Outcome {
    Returned(ValueResult<Value>),
    Failed(Cause<String>),
}

type ErasedHandler = Arc<
    dyn Fn(FunctionContext, Value) -> Result<BoxFuture<'static, Outcome>, ParseError> + Send + Sync,
>;

#[derive(Clone)]
pub struct FunctionDefinition {
    kind: FunctionKind,
    args: Ast,
    returns: Ast,
    args_validator: PropertyValidators,
    returns_validator: Validator,
    handler: ErasedHandler,
}

impl FunctionDefinition {
    /// Binds schemas and a handler.
    ///
    /// Both schemas are compiled here, so a schema with no validator
    /// representation is rejected before anything is invoked.
    pub fn new<A, R, E, F, Fut>(
        kind: FunctionKind,
        args: Ast,
        returns: Ast,
        handler: F,
    ) -> CompileResult<Self>
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        E: fmt::Display + Send + 'static,
        F: Fn(FunctionContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Cause<E>>> + Send + 'static,
    {
        let args_validator = compile_args(&args)?;
        let returns_validator = compile_returns(&returns)?;

        let handler: ErasedHandler = Arc::new(move |ctx: FunctionContext, decoded: Value| {
            let typed: A = value::from_value(decoded).map_err(ParseError::binding)?;
            let running = handler(ctx, typed);
            Ok::<_, ParseError>(
                async move {
                    match running.await {
                        Ok(result) => Outcome::Returned(value::to_value(&result)),
                        Err(cause) => Outcome::Failed(cause.map(|e| e.to_string())),
                    }
                }
                .boxed(),
            )
        });

        Ok(Self {
            kind,
            args,
            returns,
            args_validator,
            returns_validator,
            handler,
        })
    }

    pub fn query<A, R, E, F, Fut>(args: Ast, returns: Ast, handler: F) -> CompileResult<Self>
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        E: fmt::Display + Send + 'static,
        F: Fn(FunctionContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Cause<E>>> + Send + 'static,
    {
        Self::new(FunctionKind::Query, args, returns, handler)
    }

    pub fn mutation<A, R, E, F, Fut>(args: Ast, returns: Ast, handler: F) -> CompileResult<Self>
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        E: fmt::Display + Send + 'static,
        F: Fn(FunctionContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Cause<E>>> + Send + 'static,
    {
        Self::new(FunctionKind::Mutation, args, returns, handler)
    }

    pub fn action<A, R, E, F, Fut>(args: Ast, returns: Ast, handler: F) -> CompileResult<Self>
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        E: fmt::Display + Send + 'static,
        F: Fn(FunctionContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Cause<E>>> + Send + 'static,
    {
        Self::new(FunctionKind::Action, args, returns, handler)
    }

    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    pub fn args_validator(&self) -> &PropertyValidators {
        &self.args_validator
    }

    pub fn returns_validator(&self) -> &Validator {
        &self.returns_validator
    }

    /// Argument validator in the platform JSON shape (an object validator)
    pub fn args_json(&self) -> serde_json::Value {
        Validator::object(self.args_validator.clone()).to_json()
    }

    pub fn returns_json(&self) -> serde_json::Value {
        self.returns_validator.to_json()
    }

    /// Runs one invocation.
    ///
    /// # Panics
    ///
    /// When the handler fails with a cause other than a single `Fail` or
    /// `Die`. The cause is logged at ERROR first.
    pub async fn invoke(
        &self,
        request: &RequestContext,
        raw_args: serde_json::Value,
    ) -> InvokeResult<serde_json::Value> {
        let mut envelope = RequestEnvelope::new(self.kind, raw_args);

        envelope.advance(InvocationState::Decoding);
        let running = match self.start(request, &mut envelope) {
            Ok(running) => running,
            Err(e) => {
                envelope.advance(InvocationState::FailedRethrown);
                return Err(InvokeError::Decode(e));
            }
        };

        envelope.advance(InvocationState::Handling);
        let returned = match running.await {
            Outcome::Returned(returned) => returned,
            Outcome::Failed(cause) => return Err(Self::translate(&mut envelope, cause)),
        };
        envelope.handler_result = returned.as_ref().ok().cloned();

        envelope.advance(InvocationState::Encoding);
        match self.encode_result(returned) {
            Ok(encoded) => {
                envelope.encoded_result = Some(encoded.clone());
                envelope.advance(InvocationState::Succeeded);
                Ok(encoded)
            }
            Err(e) => {
                envelope.advance(InvocationState::FailedRethrown);
                Err(InvokeError::Encode(e))
            }
        }
    }

    /// Decodes the args and starts the handler, which is not yet polled.
    fn start(
        &self,
        request: &RequestContext,
        envelope: &mut RequestEnvelope,
    ) -> Result<BoxFuture<'static, Outcome>, ParseError> {
        let imported = Value::from_json(envelope.raw_args.clone())?;
        let decoded = parse::decode(&self.args, &imported)?;
        envelope.decoded_args = Some(decoded.clone());

        let ctx = FunctionContext::new(request, self.kind, envelope.invocation_id);
        (self.handler)(ctx, decoded)
    }

    fn encode_result(&self, returned: ValueResult<Value>) -> Result<serde_json::Value, ParseError> {
        let value = returned.map_err(ParseError::binding)?;
        let encoded = parse::encode(&self.returns, &value)?;
        Ok(encoded.to_json())
    }

    fn translate(envelope: &mut RequestEnvelope, cause: Cause<String>) -> InvokeError {
        let invocation_id = envelope.invocation_id.to_string();
        match cause {
            Cause::Fail(message) => {
                envelope.advance(InvocationState::FailedClientVisible);
                log_event_with_fields(
                    Event::InvocationClientError,
                    &[("invocation_id", &invocation_id), ("message", &message)],
                );
                InvokeError::Client(ClientError::new(message))
            }
            Cause::Die(defect) => {
                envelope.advance(InvocationState::FailedRethrown);
                let rendered = defect.to_string();
                log_event_with_fields(
                    Event::InvocationDefect,
                    &[("defect", &rendered), ("invocation_id", &invocation_id)],
                );
                InvokeError::Defect(defect)
            }
            other => {
                envelope.advance(InvocationState::FailedRethrown);
                let rendered = other.to_string();
                log_event_with_fields(
                    Event::InvocationUnknownCause,
                    &[("cause", &rendered), ("invocation_id", &invocation_id)],
                );
                panic!("unrecognized failure cause: {}", rendered);
            }
        }
    }
}

impl fmt::Debug for FunctionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDefinition")
            .field("kind", &self.kind)
            .field("args", &self.args_validator)
            .field("returns", &self.returns_validator)
            .finish_non_exhaustive()
    }
}
