//! Immutable expression tree.
//!
//! # Overview
//!
//! Nodes are reference-counted (`ExprNode = Arc<Expr>`) and never mutated:
//! every transformation produces a new tree that shares unchanged subtrees
//! with its input. The closed variant set is matched exhaustively; domain
//! extensibility lives in the resolver registry, not here.
//!
//! # Structural sharing
//!
//! The rewrite primitive [`Expr::map_children`] returns the *identical*
//! `Arc` when no child pointer changed. Callers rely on pointer identity
//! both for correctness (fixed-point detection) and to avoid reallocating
//! untouched subtrees, so "identical reference" is an invariant here, not
//! an optimization detail.
//!
//! # Types
//!
//! Every node carries exactly one [`Type`], computed eagerly by its smart
//! constructor. Property access on anything but an object-literal type gets
//! the `null` placeholder type; this mirrors the reference behavior and is
//! pinned by tests rather than silently widened.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::types::{EntityRef, Type};
use crate::value::Value;
use crate::wire::{BinaryOp, UnaryOp};

/// Shared handle to a tree node.
pub type ExprNode = Arc<Expr>;

/// Fold-time constructor for a domain entity.
///
/// Carried by `New` nodes so the partial evaluator can build the instance
/// without consulting the registry again.
#[derive(Clone)]
pub struct Constructor {
    entity: EntityRef,
    build: Arc<dyn Fn(&[Value]) -> Value + Send + Sync>,
}

impl Constructor {
    pub fn new(
        entity: EntityRef,
        build: Arc<dyn Fn(&[Value]) -> Value + Send + Sync>,
    ) -> Self {
        Self { entity, build }
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    pub fn build(&self, args: &[Value]) -> Value {
        (self.build)(args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constructor({})", self.entity)
    }
}

impl PartialEq for Constructor {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantExpr {
    pub value: Value,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: ExprNode,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: ExprNode,
    pub right: ExprNode,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpr {
    pub condition: ExprNode,
    pub when_true: ExprNode,
    pub when_false: ExprNode,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyExpr {
    pub object: ExprNode,
    pub name: String,
    pub optional: bool,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: ExprNode,
    pub args: Vec<ExprNode>,
    pub optional: bool,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterExpr {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaExpr {
    /// Parameter nodes, in declaration order. Always `Expr::Parameter`.
    pub params: Vec<ExprNode>,
    pub body: ExprNode,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectExpr {
    pub fields: IndexMap<String, ExprNode>,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExpr {
    pub ctor: Constructor,
    pub args: Vec<ExprNode>,
    pub ty: Type,
}

/// Closed set of tree node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant(ConstantExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Conditional(ConditionalExpr),
    Property(PropertyExpr),
    Call(CallExpr),
    Parameter(ParameterExpr),
    Lambda(LambdaExpr),
    ObjectLit(ObjectExpr),
    New(NewExpr),
}

impl Expr {
    /// Constant with a type inferred from the value's shape.
    pub fn constant(value: Value) -> ExprNode {
        let ty = value.type_of();
        Arc::new(Expr::Constant(ConstantExpr { value, ty }))
    }

    /// Constant with an explicitly supplied type.
    pub fn constant_typed(value: Value, ty: Type) -> ExprNode {
        Arc::new(Expr::Constant(ConstantExpr { value, ty }))
    }

    pub fn unary(op: UnaryOp, operand: ExprNode) -> ExprNode {
        let ty = match op {
            UnaryOp::Not => Type::BOOL,
            UnaryOp::Plus | UnaryOp::Minus | UnaryOp::BitNot => Type::NUMBER,
        };
        Arc::new(Expr::Unary(UnaryExpr { op, operand, ty }))
    }

    pub fn binary(op: BinaryOp, left: ExprNode, right: ExprNode) -> ExprNode {
        let ty = binary_type(op, &left, &right);
        Arc::new(Expr::Binary(BinaryExpr {
            op,
            left,
            right,
            ty,
        }))
    }

    pub fn conditional(condition: ExprNode, when_true: ExprNode, when_false: ExprNode) -> ExprNode {
        let ty = prefer_known(when_true.ty(), when_false.ty());
        Arc::new(Expr::Conditional(ConditionalExpr {
            condition,
            when_true,
            when_false,
            ty,
        }))
    }

    /// Property access. The field type is known only when the object has an
    /// object-literal type; everything else gets the `null` placeholder.
    pub fn property(object: ExprNode, name: impl Into<String>, optional: bool) -> ExprNode {
        let name = name.into();
        let ty = match object.ty() {
            Type::Object(fields) => fields.get(&name).cloned().unwrap_or(Type::NULL),
            _ => Type::NULL,
        };
        Arc::new(Expr::Property(PropertyExpr {
            object,
            name,
            optional,
            ty,
        }))
    }

    /// Call node. The type is supplied by whichever resolution rule created
    /// the call; calls are opaque to local type computation.
    pub fn call(callee: ExprNode, args: Vec<ExprNode>, ty: Type, optional: bool) -> ExprNode {
        Arc::new(Expr::Call(CallExpr {
            callee,
            args,
            optional,
            ty,
        }))
    }

    pub fn parameter(name: impl Into<String>, ty: Type) -> ExprNode {
        Arc::new(Expr::Parameter(ParameterExpr {
            name: name.into(),
            ty,
        }))
    }

    pub fn lambda(params: Vec<ExprNode>, body: ExprNode) -> ExprNode {
        let ty = Type::function(body.ty().clone());
        Arc::new(Expr::Lambda(LambdaExpr { params, body, ty }))
    }

    pub fn object(fields: IndexMap<String, ExprNode>) -> ExprNode {
        let ty = Type::object(
            fields
                .iter()
                .map(|(name, e)| (name.clone(), e.ty().clone()))
                .collect(),
        );
        Arc::new(Expr::ObjectLit(ObjectExpr { fields, ty }))
    }

    pub fn instance(ctor: Constructor, args: Vec<ExprNode>) -> ExprNode {
        let ty = Type::Named(ctor.entity().clone());
        Arc::new(Expr::New(NewExpr { ctor, args, ty }))
    }

    /// The node's resolved type. Total: every node has one.
    pub fn ty(&self) -> &Type {
        match self {
            Expr::Constant(e) => &e.ty,
            Expr::Unary(e) => &e.ty,
            Expr::Binary(e) => &e.ty,
            Expr::Conditional(e) => &e.ty,
            Expr::Property(e) => &e.ty,
            Expr::Call(e) => &e.ty,
            Expr::Parameter(e) => &e.ty,
            Expr::Lambda(e) => &e.ty,
            Expr::ObjectLit(e) => &e.ty,
            Expr::New(e) => &e.ty,
        }
    }

    pub fn as_constant(&self) -> Option<&ConstantExpr> {
        match self {
            Expr::Constant(c) => Some(c),
            _ => None,
        }
    }

    /// Rewrite immediate children through `f`, rebuilding only when a child
    /// reference actually changed. Returns the identical `Arc` otherwise.
    ///
    /// Lambda parameters are not children; only the body is visited,
    /// matching the deferred-computation boundary.
    pub fn map_children<F>(self: &ExprNode, f: &mut F) -> ExprNode
    where
        F: FnMut(&ExprNode) -> ExprNode,
    {
        match self.as_ref() {
            Expr::Constant(_) | Expr::Parameter(_) => self.clone(),
            Expr::Unary(e) => {
                let operand = f(&e.operand);
                if Arc::ptr_eq(&operand, &e.operand) {
                    self.clone()
                } else {
                    Expr::unary(e.op, operand)
                }
            }
            Expr::Binary(e) => {
                let left = f(&e.left);
                let right = f(&e.right);
                if Arc::ptr_eq(&left, &e.left) && Arc::ptr_eq(&right, &e.right) {
                    self.clone()
                } else {
                    Expr::binary(e.op, left, right)
                }
            }
            Expr::Conditional(e) => {
                let condition = f(&e.condition);
                let when_true = f(&e.when_true);
                let when_false = f(&e.when_false);
                if Arc::ptr_eq(&condition, &e.condition)
                    && Arc::ptr_eq(&when_true, &e.when_true)
                    && Arc::ptr_eq(&when_false, &e.when_false)
                {
                    self.clone()
                } else {
                    Expr::conditional(condition, when_true, when_false)
                }
            }
            Expr::Property(e) => {
                let object = f(&e.object);
                if Arc::ptr_eq(&object, &e.object) {
                    self.clone()
                } else {
                    Expr::property(object, e.name.clone(), e.optional)
                }
            }
            Expr::Call(e) => {
                let callee = f(&e.callee);
                let args = map_nodes(&e.args, f);
                if Arc::ptr_eq(&callee, &e.callee) && args.is_none() {
                    self.clone()
                } else {
                    Expr::call(
                        callee,
                        args.unwrap_or_else(|| e.args.clone()),
                        e.ty.clone(),
                        e.optional,
                    )
                }
            }
            Expr::Lambda(e) => {
                let body = f(&e.body);
                if Arc::ptr_eq(&body, &e.body) {
                    self.clone()
                } else {
                    Expr::lambda(e.params.clone(), body)
                }
            }
            Expr::ObjectLit(e) => match map_fields(&e.fields, f) {
                None => self.clone(),
                Some(fields) => Expr::object(fields),
            },
            Expr::New(e) => match map_nodes(&e.args, f) {
                None => self.clone(),
                Some(args) => Expr::instance(e.ctor.clone(), args),
            },
        }
    }
}

/// Map a node slice, allocating a new vector only on the first change.
/// Returns `None` when every mapped node is reference-identical.
pub fn map_nodes<F>(nodes: &[ExprNode], f: &mut F) -> Option<Vec<ExprNode>>
where
    F: FnMut(&ExprNode) -> ExprNode,
{
    let mut changed: Option<Vec<ExprNode>> = None;
    for (i, node) in nodes.iter().enumerate() {
        let mapped = f(node);
        if !Arc::ptr_eq(&mapped, node) && changed.is_none() {
            changed = Some(nodes[..i].to_vec());
        }
        if let Some(out) = changed.as_mut() {
            out.push(mapped);
        }
    }
    changed
}

/// Field-map analogue of [`map_nodes`].
pub(crate) fn map_fields<F>(
    fields: &IndexMap<String, ExprNode>,
    f: &mut F,
) -> Option<IndexMap<String, ExprNode>>
where
    F: FnMut(&ExprNode) -> ExprNode,
{
    let mut changed: Option<IndexMap<String, ExprNode>> = None;
    for (i, (name, node)) in fields.iter().enumerate() {
        let mapped = f(node);
        if !Arc::ptr_eq(&mapped, node) && changed.is_none() {
            changed = Some(
                fields
                    .iter()
                    .take(i)
                    .map(|(n, e)| (n.clone(), e.clone()))
                    .collect(),
            );
        }
        if let Some(out) = changed.as_mut() {
            out.insert(name.clone(), mapped);
        }
    }
    changed
}

fn binary_type(op: BinaryOp, left: &ExprNode, right: &ExprNode) -> Type {
    use BinaryOp::*;
    match op {
        Pow | Mul | Div | Rem | Add | Sub | Shl | Shr | UShr | BitAnd | BitOr | BitXor => {
            Type::NUMBER
        }
        Lt | Le | Gt | Ge | InstanceOf | LooseEq | LooseNe | StrictEq | StrictNe => Type::BOOL,
        And | Or | Coalesce => prefer_known(left.ty(), right.ty()),
    }
}

/// `left ?? right` over types: fall through to the right-hand type when the
/// left one is the `null` placeholder.
fn prefer_known(left: &Type, right: &Type) -> Type {
    if left.is_null_literal() {
        right.clone()
    } else {
        left.clone()
    }
}
