//! Tree reconstruction: wire form → typed expression tree.
//!
//! # Overview
//!
//! A `Reconstructor` is created per top-level call and owns the binding
//! environment mapping wire-level parameter names to the expression each
//! currently denotes. Entering a lambda pushes typed `Parameter` nodes for
//! its parameter list and pops them on exit; inlining a quoted template
//! pushes the receiver and call arguments under the template's parameter
//! names. Nothing is shared across calls, so concurrent reconstructions
//! cannot interfere.
//!
//! # Call resolution
//!
//! A call whose callee is a property access on a domain member resolves in
//! priority order:
//!
//! 1. **Quoted inlining**: the member's template body is reconstructed
//!    under bindings `[receiver, args...]` and returned directly — no call
//!    node is ever materialized for an inlined member.
//! 2. **Resolved call**: lambda arguments are typed through the member's
//!    per-position lambda-type resolvers, the call through its result-type
//!    resolver. Missing either is a definition error raised here, not at
//!    execution time.
//!
//! A call whose callee is the free identifier `table` denotes a query
//! source and yields the canonical source node. Every other callee shape
//! is unsupported.

use quex_ir::{Expr, ExprNode, Type, WireExpr};

use crate::query::table_expr;
use crate::registry::{MemberDef, Registry};
use crate::{Error, Result};

/// Reconstruct a wire-form lambda given the expected types of its free
/// parameters.
///
/// The wire root must be a lambda node; anything else means the quoting
/// front end did not run on this expression.
pub fn reconstruct_lambda(
    registry: &Registry,
    wire: &WireExpr,
    param_types: &[Type],
) -> Result<ExprNode> {
    let WireExpr::Lambda { params, body } = wire else {
        return Err(Error::UnquotedArgument);
    };

    let mut rec = Reconstructor::new(registry);
    let lambda = rec.lambda(params, body, param_types)?;
    debug_assert!(rec.bindings.is_empty(), "bindings leaked past reconstruction");
    Ok(lambda)
}

struct Reconstructor<'r> {
    registry: &'r Registry,
    /// Scoped binding stack; later entries shadow earlier ones.
    bindings: Vec<(String, ExprNode)>,
}

impl<'r> Reconstructor<'r> {
    fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            bindings: Vec::new(),
        }
    }

    fn lookup(&self, name: &str) -> Option<&ExprNode> {
        self.bindings
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e)
    }

    fn expr(&mut self, wire: &WireExpr) -> Result<ExprNode> {
        match wire {
            WireExpr::Constant(value) => Ok(Expr::constant(value.clone())),
            WireExpr::Unary { op, operand } => Ok(Expr::unary(*op, self.expr(operand)?)),
            WireExpr::Binary { op, left, right } => {
                Ok(Expr::binary(*op, self.expr(left)?, self.expr(right)?))
            }
            WireExpr::Conditional {
                condition,
                when_true,
                when_false,
            } => Ok(Expr::conditional(
                self.expr(condition)?,
                self.expr(when_true)?,
                self.expr(when_false)?,
            )),
            WireExpr::Property {
                object,
                name,
                optional,
            } => Ok(Expr::property(self.expr(object)?, name.clone(), *optional)),
            WireExpr::Call {
                callee,
                args,
                optional,
            } => self.call(callee, args, *optional),
            WireExpr::Parameter(name) => match self.lookup(name) {
                Some(bound) => Ok(bound.clone()),
                None => Err(Error::UnsupportedWireForm(format!(
                    "unbound parameter `{name}`"
                ))),
            },
            WireExpr::Lambda { params, .. } => Err(Error::UnsupportedWireForm(format!(
                "lambda with parameters {params:?} in a position that provides no parameter types"
            ))),
            WireExpr::ObjectLit(fields) => {
                let fields = fields
                    .iter()
                    .map(|(name, w)| Ok((name.clone(), self.expr(w)?)))
                    .collect::<Result<_>>()?;
                Ok(Expr::object(fields))
            }
            WireExpr::New { ctor, args } => {
                let ctor = self.registry.constructor(ctor)?;
                let args = args
                    .iter()
                    .map(|a| self.expr(a))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Expr::instance(ctor, args))
            }
        }
    }

    fn lambda(&mut self, params: &[String], body: &WireExpr, types: &[Type]) -> Result<ExprNode> {
        if params.len() != types.len() {
            return Err(Error::UnknownFieldType(format!(
                "lambda declares {} parameters but {} types were resolved",
                params.len(),
                types.len()
            )));
        }

        let nodes: Vec<ExprNode> = params
            .iter()
            .zip(types)
            .map(|(name, ty)| Expr::parameter(name.clone(), ty.clone()))
            .collect();

        let depth = self.bindings.len();
        for (name, node) in params.iter().zip(&nodes) {
            self.bindings.push((name.clone(), node.clone()));
        }
        let body = self.expr(body);
        self.bindings.truncate(depth);

        Ok(Expr::lambda(nodes, body?))
    }

    fn call(&mut self, callee: &WireExpr, args: &[WireExpr], optional: bool) -> Result<ExprNode> {
        match callee {
            WireExpr::Property {
                object,
                name,
                optional: prop_optional,
            } => self.member_call(object, name, *prop_optional, args, optional),
            // `table` is the one free identifier with meaning: a query source.
            WireExpr::Parameter(name) if name == "table" && self.lookup(name).is_none() => {
                self.table_call(args)
            }
            other => Err(Error::UnsupportedWireForm(format!(
                "cannot call a non-member expression: {other:?}"
            ))),
        }
    }

    fn member_call(
        &mut self,
        object_wire: &WireExpr,
        name: &str,
        prop_optional: bool,
        args_wire: &[WireExpr],
        call_optional: bool,
    ) -> Result<ExprNode> {
        let object = self.expr(object_wire)?;
        let empty = MemberDef::new();
        let member = self
            .registry
            .member_for(object.ty(), name)?
            .unwrap_or(&empty);

        let mut args: Vec<ExprNode> = Vec::with_capacity(args_wire.len());
        for (position, arg) in args_wire.iter().enumerate() {
            let node = match arg {
                WireExpr::Lambda { params, body } => {
                    let resolver = member.lambda_type_at(position).ok_or_else(|| {
                        Error::MissingLambdaTypeResolver {
                            member: name.to_string(),
                            position,
                        }
                    })?;
                    let arg_types: Vec<Type> = args.iter().map(|a| a.ty().clone()).collect();
                    let param_types = resolver(object.ty(), &arg_types);
                    self.lambda(params, body, &param_types)?
                }
                other => self.expr(other)?,
            };
            args.push(node);
        }

        if let Some(template) = member.quoted_template() {
            let template = template.clone();
            return self.inline_quoted(name, &template, &object, &args);
        }

        let resolver =
            member
                .result_type_resolver()
                .ok_or_else(|| Error::MissingResultTypeResolver {
                    member: name.to_string(),
                })?;
        let arg_types: Vec<Type> = args.iter().map(|a| a.ty().clone()).collect();
        let ty = resolver(object.ty(), &arg_types);

        let callee = Expr::property(object, name, prop_optional);
        Ok(Expr::call(callee, args, ty, call_optional))
    }

    /// Macro expansion: instantiate a quoted template under bindings
    /// `[receiver, args...]` and return its body. The member call itself
    /// disappears from the tree.
    fn inline_quoted(
        &mut self,
        member: &str,
        template: &WireExpr,
        receiver: &ExprNode,
        args: &[ExprNode],
    ) -> Result<ExprNode> {
        let WireExpr::Lambda { params, body } = template else {
            return Err(Error::UnsupportedWireForm(format!(
                "quoted template on `{member}` is not a lambda"
            )));
        };

        let provided = 1 + args.len();
        if params.len() != provided {
            return Err(Error::QuotedTemplateArityMismatch {
                member: member.to_string(),
                expected: params.len(),
                actual: provided,
            });
        }

        let depth = self.bindings.len();
        self.bindings.push((params[0].clone(), receiver.clone()));
        for (name, arg) in params[1..].iter().zip(args) {
            self.bindings.push((name.clone(), arg.clone()));
        }
        let body = self.expr(body);
        self.bindings.truncate(depth);
        body
    }

    fn table_call(&mut self, args: &[WireExpr]) -> Result<ExprNode> {
        let [WireExpr::Constant(quex_ir::Value::String(name))] = args else {
            return Err(Error::UnsupportedWireForm(
                "table() expects a single entity-name constant".to_string(),
            ));
        };
        let entity = self.registry.entity_ref(name)?;
        Ok(table_expr(&entity))
    }
}
