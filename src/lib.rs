//! effex - schema-to-validator compiler and request handler shim
//!
//! Schemas are authored once as [`ast::Ast`] trees and used twice:
//! - compiled into platform [`validator::Validator`]s that describe
//!   function arguments, return values and table documents
//! - interpreted directly by [`parse`] to decode arguments and encode
//!   results around typed handlers in [`functions`]

pub mod ast;
pub mod compiler;
pub mod config;
pub mod functions;
pub mod observability;
pub mod parse;
pub mod schema;
pub mod validator;
pub mod value;
