//! Bottom-up partial evaluation over the expression tree.
//!
//! # Overview
//!
//! `simplify` folds every subtree whose operands are constants and leaves
//! everything else structurally intact, sharing untouched subtrees with
//! the input via reference identity. Running it twice is a no-op: the
//! second pass returns the identical root.
//!
//! # Short-circuiting
//!
//! `&&`/`||` with a constant left side that decides the result, and `?:`
//! with a constant condition, select a side *before* the other is
//! visited, so an unreachable branch is never evaluated and cannot raise
//! a fold error. A non-deciding constant (truthy `&&`, falsy `||`, any
//! `??` left) keeps the operator node unless both sides are constant.
//!
//! # Optional chains
//!
//! A short-circuited optional access produces the internal [`Folded::Undef`]
//! marker rather than an `undefined` constant. The marker rides up through
//! further property accesses and calls in the same chain (which is what
//! makes `a?.b.c` with nullish `a` collapse instead of erroring) and is
//! reified to a plain `undefined` constant the moment it leaves the chain.
//! It never appears in the returned tree.

use std::sync::Arc;

use quex_ir::{
    BinaryExpr, BinaryOp, CallExpr, ConditionalExpr, Expr, ExprNode, LambdaExpr, NewExpr,
    ObjectExpr, PropertyExpr, UnaryExpr, Value,
};

use crate::fold;
use crate::{Error, Result};

/// Fold all constant subexpressions of `expr`.
///
/// Idempotent; returns the identical node when nothing folds.
pub fn simplify(expr: &ExprNode) -> Result<ExprNode> {
    Ok(visit(expr)?.reify())
}

/// Result of visiting one subtree.
enum Folded {
    Node(ExprNode),
    /// The subtree short-circuited through an optional chain.
    Undef,
}

static UNDEFINED: Value = Value::Undefined;

impl Folded {
    fn reify(self) -> ExprNode {
        match self {
            Folded::Node(node) => node,
            Folded::Undef => Expr::constant(Value::Undefined),
        }
    }

    /// The constant this subtree folded to, if any. The short-circuit
    /// marker reads as `undefined`.
    fn constant_value(&self) -> Option<&Value> {
        match self {
            Folded::Node(node) => node.as_constant().map(|c| &c.value),
            Folded::Undef => Some(&UNDEFINED),
        }
    }
}

fn visit(expr: &ExprNode) -> Result<Folded> {
    match expr.as_ref() {
        Expr::Constant(_) | Expr::Parameter(_) => Ok(Folded::Node(expr.clone())),
        Expr::Unary(e) => visit_unary(expr, e),
        Expr::Binary(e) => visit_binary(expr, e),
        Expr::Conditional(e) => visit_conditional(expr, e),
        Expr::Property(e) => visit_property(expr, e),
        Expr::Call(e) => visit_call(expr, e),
        Expr::Lambda(e) => visit_lambda(expr, e),
        Expr::ObjectLit(e) => visit_object(expr, e),
        Expr::New(e) => visit_new(expr, e),
    }
}

fn visit_unary(expr: &ExprNode, e: &UnaryExpr) -> Result<Folded> {
    let operand = visit(&e.operand)?;
    if let Some(v) = operand.constant_value() {
        return Ok(Folded::Node(Expr::constant(fold::eval_unary(e.op, v))));
    }
    let operand = operand.reify();
    Ok(Folded::Node(if Arc::ptr_eq(&operand, &e.operand) {
        expr.clone()
    } else {
        Expr::unary(e.op, operand)
    }))
}

fn visit_binary(expr: &ExprNode, e: &BinaryExpr) -> Result<Folded> {
    let left = visit(&e.left)?;

    // `&&`/`||` short-circuit only when the constant left side decides the
    // whole expression; the dead right-hand side is never visited. Every
    // other combination (including `??`) takes the general path: fold when
    // both sides are constant, rebuild otherwise.
    if let Some(v) = left.constant_value() {
        let decided = match e.op {
            BinaryOp::And => !v.truthy(),
            BinaryOp::Or => v.truthy(),
            _ => false,
        };
        if decided {
            return Ok(left);
        }
    }

    let right = visit(&e.right)?;
    if let (Some(a), Some(b)) = (left.constant_value(), right.constant_value()) {
        return Ok(Folded::Node(Expr::constant(fold::eval_binary(e.op, a, b)?)));
    }

    let left = left.reify();
    let right = right.reify();
    Ok(Folded::Node(
        if Arc::ptr_eq(&left, &e.left) && Arc::ptr_eq(&right, &e.right) {
            expr.clone()
        } else {
            Expr::binary(e.op, left, right)
        },
    ))
}

fn visit_conditional(expr: &ExprNode, e: &ConditionalExpr) -> Result<Folded> {
    let condition = visit(&e.condition)?;
    // A constant condition selects a branch; the dead one is never visited.
    if let Some(v) = condition.constant_value() {
        return if v.truthy() {
            visit(&e.when_true)
        } else {
            visit(&e.when_false)
        };
    }

    let condition = condition.reify();
    let when_true = visit(&e.when_true)?.reify();
    let when_false = visit(&e.when_false)?.reify();
    Ok(Folded::Node(
        if Arc::ptr_eq(&condition, &e.condition)
            && Arc::ptr_eq(&when_true, &e.when_true)
            && Arc::ptr_eq(&when_false, &e.when_false)
        {
            expr.clone()
        } else {
            Expr::conditional(condition, when_true, when_false)
        },
    ))
}

fn visit_property(expr: &ExprNode, e: &PropertyExpr) -> Result<Folded> {
    let object = visit(&e.object)?;
    // An already short-circuited chain swallows further accesses whether or
    // not this link is optional.
    if matches!(object, Folded::Undef) {
        return Ok(Folded::Undef);
    }
    if let Some(v) = object.constant_value() {
        if v.is_nullish() {
            return if e.optional {
                Ok(Folded::Undef)
            } else {
                Err(Error::UnsupportedConstantFold(format!(
                    "cannot read property `{}` of {v}",
                    e.name
                )))
            };
        }
        return Ok(Folded::Node(Expr::constant(v.field(&e.name))));
    }

    let object = object.reify();
    Ok(Folded::Node(if Arc::ptr_eq(&object, &e.object) {
        expr.clone()
    } else {
        Expr::property(object, e.name.clone(), e.optional)
    }))
}

fn visit_call(expr: &ExprNode, e: &CallExpr) -> Result<Folded> {
    let callee = visit(&e.callee)?;
    if matches!(callee, Folded::Undef) {
        return Ok(Folded::Undef);
    }
    if e.optional
        && callee
            .constant_value()
            .is_some_and(Value::is_nullish)
    {
        return Ok(Folded::Undef);
    }

    // Calls are never folded; they belong to the translator.
    let callee = callee.reify();
    let mut args_changed = false;
    let mut args = Vec::with_capacity(e.args.len());
    for arg in &e.args {
        let folded = visit(arg)?.reify();
        args_changed |= !Arc::ptr_eq(&folded, arg);
        args.push(folded);
    }
    Ok(Folded::Node(
        if Arc::ptr_eq(&callee, &e.callee) && !args_changed {
            expr.clone()
        } else {
            Expr::call(callee, args, e.ty.clone(), e.optional)
        },
    ))
}

fn visit_lambda(expr: &ExprNode, e: &LambdaExpr) -> Result<Folded> {
    let body = visit(&e.body)?.reify();
    Ok(Folded::Node(if Arc::ptr_eq(&body, &e.body) {
        expr.clone()
    } else {
        Expr::lambda(e.params.clone(), body)
    }))
}

fn visit_object(expr: &ExprNode, e: &ObjectExpr) -> Result<Folded> {
    let mut folded = Vec::with_capacity(e.fields.len());
    for (name, field) in &e.fields {
        folded.push((name, visit(field)?));
    }

    if folded.iter().all(|(_, f)| f.constant_value().is_some()) {
        let fields = folded
            .into_iter()
            .map(|(name, f)| {
                let value = f.constant_value().cloned().unwrap_or(Value::Undefined);
                (name.clone(), value)
            })
            .collect();
        return Ok(Folded::Node(Expr::constant(Value::object(fields))));
    }

    let mut changed = false;
    let mut fields = indexmap::IndexMap::with_capacity(e.fields.len());
    for (name, f) in folded {
        let node = f.reify();
        changed |= !Arc::ptr_eq(&node, &e.fields[name.as_str()]);
        fields.insert(name.clone(), node);
    }
    Ok(Folded::Node(if changed {
        Expr::object(fields)
    } else {
        expr.clone()
    }))
}

fn visit_new(expr: &ExprNode, e: &NewExpr) -> Result<Folded> {
    let mut folded = Vec::with_capacity(e.args.len());
    for arg in &e.args {
        folded.push(visit(arg)?);
    }

    if folded.iter().all(|f| f.constant_value().is_some()) {
        let values: Vec<Value> = folded
            .iter()
            .map(|f| f.constant_value().cloned().unwrap_or(Value::Undefined))
            .collect();
        return Ok(Folded::Node(Expr::constant(e.ctor.build(&values))));
    }

    // Non-constant arguments leave the construction to the translator.
    let mut changed = false;
    let mut args = Vec::with_capacity(e.args.len());
    for (original, f) in e.args.iter().zip(folded) {
        let node = f.reify();
        changed |= !Arc::ptr_eq(&node, original);
        args.push(node);
    }
    Ok(Folded::Node(if changed {
        Expr::instance(e.ctor.clone(), args)
    } else {
        expr.clone()
    }))
}
