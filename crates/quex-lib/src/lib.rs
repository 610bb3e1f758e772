//! Quex: embeddable query-expression engine.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use quex_lib::{EntityDef, Query, Registry, Translator};
//! use quex_ir::{ExprNode, Type, Value, WireExpr};
//!
//! struct DumpTranslator;
//!
//! impl Translator for DumpTranslator {
//!     fn execute(&self, _expr: &ExprNode) -> quex_lib::Result<Value> {
//!         Ok(Value::Array(vec![]))
//!     }
//!     fn debug_text(&self, expr: &ExprNode) -> quex_lib::Result<String> {
//!         Ok(expr.to_string())
//!     }
//! }
//!
//! let registry = Arc::new(
//!     Registry::new().define("Order", EntityDef::new().column("amount", Type::NUMBER)),
//! );
//! let predicate: WireExpr = serde_json::from_value(serde_json::json!(
//!     ["=>", [["p", "o"]], [">", [".", ["p", "o"], "amount"], ["c", 15]]]
//! ))
//! .unwrap();
//!
//! let q = Query::table("Order", registry, Arc::new(DumpTranslator)).unwrap();
//! let filtered = q.filter(&predicate).unwrap();
//! assert_eq!(
//!     filtered.debug_text().unwrap(),
//!     "table(Order).filter(o => (o.amount > 15))"
//! );
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod fold;
pub mod query;
pub mod reconstruct;
pub mod registry;
pub mod simplify;

#[cfg(test)]
mod registry_tests;
#[cfg(test)]
mod simplify_tests;

pub use query::{OrderedQuery, Query, Translator};
pub use reconstruct::reconstruct_lambda;
pub use registry::{EntityDef, MemberDef, Registry};
pub use simplify::simplify;

use quex_ir::WireError;

/// Errors raised while building or simplifying a query tree.
///
/// All of these abort the affected query at construction time; nothing is
/// retried internally.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A position expecting wire form received something else; the quoting
    /// front end did not run.
    #[error("expression was not quoted; run the quoting front end before building queries")]
    UnquotedArgument,

    /// A deferred member call has a lambda argument but no registered
    /// lambda-type resolver for that position.
    #[error("missing lambda type resolver on `{member}` for argument {position}")]
    MissingLambdaTypeResolver { member: String, position: usize },

    /// A deferred member call has neither a quoted template nor a
    /// result-type resolver.
    #[error("missing result type resolver or quoted template on `{member}`")]
    MissingResultTypeResolver { member: String },

    /// A quoted template's parameter count does not match receiver + args.
    #[error("quoted template on `{member}` binds {expected} parameters but the call provides {actual}")]
    QuotedTemplateArityMismatch {
        member: String,
        expected: usize,
        actual: usize,
    },

    /// A tag outside the closed wire grammar, an unbound parameter
    /// reference, or an otherwise uncallable construct.
    #[error("unsupported wire form: {0}")]
    UnsupportedWireForm(String),

    /// A `new` node or `table` source names an entity the registry does
    /// not know.
    #[error("unknown entity `{0}`")]
    UnknownEntity(String),

    /// A static type that should be known could not be determined.
    #[error("cannot determine type: {0}")]
    UnknownFieldType(String),

    /// A fold was attempted over operands it cannot evaluate.
    #[error("unsupported constant fold: {0}")]
    UnsupportedConstantFold(String),

    /// A sequence operator was applied to an expression whose type is not
    /// an array.
    #[error("query expression does not have an array type")]
    NonArrayQuery,
}

impl From<WireError> for Error {
    fn from(e: WireError) -> Self {
        Error::UnsupportedWireForm(e.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
