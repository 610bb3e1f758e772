//! Quex intermediate representation: wire form, type model and expression tree.
//!
//! This crate contains:
//! - Runtime value model for constants (`Value`)
//! - Type model annotating every tree node (`Type`, `Scalar`, `EntityRef`)
//! - Wire form, the serializable tagged-tuple grammar produced by the
//!   quoting front end (`WireExpr`, `WireError`)
//! - Immutable expression tree with a structural-sharing rewrite
//!   primitive (`Expr`, `ExprNode`)
//!
//! Reconstruction of wire form into trees, type-resolver dispatch,
//! simplification and the query builder live in `quex-lib`.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod expr;
pub mod printer;
pub mod types;
pub mod value;
pub mod wire;

#[cfg(test)]
mod expr_tests;
#[cfg(test)]
mod wire_tests;

pub use expr::{
    BinaryExpr, CallExpr, ConditionalExpr, ConstantExpr, Constructor, Expr, ExprNode, LambdaExpr,
    NewExpr, ObjectExpr, ParameterExpr, PropertyExpr, UnaryExpr, map_nodes,
};
pub use types::{EntityRef, Scalar, Type};
pub use value::Value;
pub use wire::{BinaryOp, UnaryOp, WireError, WireExpr};
