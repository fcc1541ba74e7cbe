//! Schema AST node definitions
//!
//! One variant per schema construct. Closure-carrying nodes
//! (declarations, refinements, suspensions) hold `Arc`s so the whole
//! tree stays cheap to clone and `Send + Sync`.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::value::Value;

/// Decoder attached to a declaration node
pub type DeclarationDecoder = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Predicate attached to a refinement node
pub type RefinementFilter = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Thunk producing the node a suspension stands for
pub type SuspendThunk = Arc<dyn Fn() -> Ast + Send + Sync>;

/// Literal values a schema can pin
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    String(String),
    Number(f64),
    BigInt(i64),
    Boolean(bool),
    Null,
}

impl LiteralValue {
    /// The platform value this literal denotes
    pub fn to_value(&self) -> Value {
        match self {
            LiteralValue::String(s) => Value::String(s.clone()),
            LiteralValue::Number(n) => Value::Float64(*n),
            LiteralValue::BigInt(n) => Value::Int64(*n),
            LiteralValue::Boolean(b) => Value::Boolean(*b),
            LiteralValue::Null => Value::Null,
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::String(s) => write!(f, "{:?}", s),
            LiteralValue::Number(n) => write!(f, "{}", n),
            LiteralValue::BigInt(n) => write!(f, "{}n", n),
            LiteralValue::Boolean(b) => write!(f, "{}", b),
            LiteralValue::Null => write!(f, "null"),
        }
    }
}

impl Serialize for LiteralValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().to_json().serialize(serializer)
    }
}

impl From<&str> for LiteralValue {
    fn from(s: &str) -> Self {
        LiteralValue::String(s.to_string())
    }
}

impl From<f64> for LiteralValue {
    fn from(n: f64) -> Self {
        LiteralValue::Number(n)
    }
}

impl From<i64> for LiteralValue {
    fn from(n: i64) -> Self {
        LiteralValue::BigInt(n)
    }
}

impl From<bool> for LiteralValue {
    fn from(b: bool) -> Self {
        LiteralValue::Boolean(b)
    }
}

/// Property signature key
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    String(String),
    Number(f64),
    Symbol(String),
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{}", s),
            PropertyKey::Number(n) => write!(f, "{}", n),
            PropertyKey::Symbol(description) => write!(f, "Symbol({})", description),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(s.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::String(s)
    }
}

/// A named member of a struct-like schema
#[derive(Debug, Clone)]
pub struct PropertySignature {
    pub name: PropertyKey,
    pub ty: Ast,
    pub is_optional: bool,
}

/// `{ [key: K]: V }`
#[derive(Debug, Clone)]
pub struct IndexSignature {
    pub parameter: Ast,
    pub ty: Ast,
}

#[derive(Debug, Clone, Default)]
pub struct TypeLiteral {
    pub property_signatures: Vec<PropertySignature>,
    pub index_signatures: Vec<IndexSignature>,
}

#[derive(Debug, Clone)]
pub struct TupleElement {
    pub ty: Ast,
    pub is_optional: bool,
}

/// Positional elements followed by rest elements.
///
/// `rest[0]` is the variadic element; `rest[1..]` are required trailing
/// elements after it.
#[derive(Debug, Clone, Default)]
pub struct TupleType {
    pub elements: Vec<TupleElement>,
    pub rest: Vec<Ast>,
}

/// Type of a template literal span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateSpanType {
    String,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSpan {
    pub ty: TemplateSpanType,
    pub literal: String,
}

/// `` `${head}${span.ty}${span.literal}...` ``
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateLiteral {
    pub head: String,
    pub spans: Vec<TemplateSpan>,
}

/// An opaque declared type, checked by its own decoder
#[derive(Clone)]
pub struct Declaration {
    pub identifier: String,
    pub decoder: DeclarationDecoder,
}

impl Declaration {
    pub fn decode(&self, value: &Value) -> Result<(), String> {
        (self.decoder)(value)
    }
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

/// A base schema narrowed by a predicate
#[derive(Clone)]
pub struct Refinement {
    pub from: Box<Ast>,
    pub description: String,
    pub filter: RefinementFilter,
}

impl Refinement {
    pub fn accepts(&self, value: &Value) -> bool {
        (self.filter)(value)
    }
}

impl fmt::Debug for Refinement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refinement")
            .field("from", &self.from)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A lazily produced node, used for self-referential schemas
#[derive(Clone)]
pub struct Suspend {
    thunk: SuspendThunk,
}

impl Suspend {
    pub fn new(thunk: impl Fn() -> Ast + Send + Sync + 'static) -> Self {
        Self {
            thunk: Arc::new(thunk),
        }
    }

    /// Produce the deferred node
    pub fn force(&self) -> Ast {
        (self.thunk)()
    }
}

impl fmt::Debug for Suspend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Forcing here could recurse forever
        f.write_str("Suspend(..)")
    }
}

/// Identity transformation between an encoded and a decoded shape
#[derive(Debug, Clone)]
pub struct Transformation {
    pub from: Box<Ast>,
    pub to: Box<Ast>,
}

/// Schema AST node
#[derive(Debug, Clone)]
pub enum Ast {
    Literal(LiteralValue),
    UniqueSymbol(String),
    Symbol,
    Undefined,
    Void,
    Never,
    Unknown,
    Any,
    Boolean,
    /// String keyword, optionally annotated as an id of `table`
    String { table: Option<String> },
    Number,
    BigInt,
    /// The `object` keyword: any non-primitive
    Object,
    Enums(Vec<(String, LiteralValue)>),
    TemplateLiteral(TemplateLiteral),
    Declaration(Declaration),
    Refinement(Refinement),
    Tuple(TupleType),
    TypeLiteral(TypeLiteral),
    Union(Vec<Ast>),
    Suspend(Suspend),
    Transformation(Transformation),
}

impl Ast {
    /// Tag name used in error messages
    pub fn tag(&self) -> &'static str {
        match self {
            Ast::Literal(_) => "Literal",
            Ast::UniqueSymbol(_) => "UniqueSymbol",
            Ast::Symbol => "SymbolKeyword",
            Ast::Undefined => "UndefinedKeyword",
            Ast::Void => "VoidKeyword",
            Ast::Never => "NeverKeyword",
            Ast::Unknown => "UnknownKeyword",
            Ast::Any => "AnyKeyword",
            Ast::Boolean => "BooleanKeyword",
            Ast::String { .. } => "StringKeyword",
            Ast::Number => "NumberKeyword",
            Ast::BigInt => "BigIntKeyword",
            Ast::Object => "ObjectKeyword",
            Ast::Enums(_) => "Enums",
            Ast::TemplateLiteral(_) => "TemplateLiteral",
            Ast::Declaration(_) => "Declaration",
            Ast::Refinement(_) => "Refinement",
            Ast::Tuple(_) => "TupleType",
            Ast::TypeLiteral(_) => "TypeLiteral",
            Ast::Union(_) => "Union",
            Ast::Suspend(_) => "Suspend",
            Ast::Transformation(_) => "Transformation",
        }
    }
}
