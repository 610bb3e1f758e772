//! Fluent query builder over the expression tree.
//!
//! # Overview
//!
//! A [`Query`] wraps an array-typed expression plus the registry and
//! translator it was built against. Deferred operators (`filter`, `map`,
//! `orderBy`, ...) reconstruct their wire-form lambda arguments against the
//! sequence's element type and append one call node to the tree; nothing
//! executes until a terminal operator hands the simplified tree to the
//! [`Translator`].
//!
//! Builders are cheap to clone and immutable: every operator returns a new
//! query sharing the prefix tree with its parent, so a query can be forked
//! into several refinements.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use quex_ir::{EntityRef, Expr, ExprNode, Type, Value, WireExpr};

use crate::reconstruct::reconstruct_lambda;
use crate::registry::{group_type, Registry};
use crate::simplify::simplify;
use crate::{Error, Result};

/// The execution boundary.
///
/// Translators receive fully simplified trees; constant subexpressions
/// have already been folded away.
pub trait Translator: Send + Sync {
    /// Execute the tree against the backing store.
    fn execute(&self, expr: &ExprNode) -> Result<Value>;

    /// Render the tree for diagnostics. Defaults to the source-like
    /// printer; a SQL translator would render its generated statement.
    fn debug_text(&self, expr: &ExprNode) -> Result<String> {
        Ok(expr.to_string())
    }
}

/// Canonical query-source node: `table(Entity)`, typed `Entity[]`.
pub(crate) fn table_expr(entity: &EntityRef) -> ExprNode {
    Expr::call(
        Expr::constant(Value::string("table")),
        vec![Expr::constant(Value::EntityType(entity.clone()))],
        Type::array(Type::Named(entity.clone())),
        false,
    )
}

/// An immutable, composable query over one entity sequence.
#[derive(Clone)]
pub struct Query {
    expr: ExprNode,
    registry: Arc<Registry>,
    translator: Arc<dyn Translator>,
}

impl Query {
    /// Root query over a registered entity's table.
    pub fn table(
        entity: &str,
        registry: Arc<Registry>,
        translator: Arc<dyn Translator>,
    ) -> Result<Query> {
        let entity = registry.entity_ref(entity)?;
        Ok(Query {
            expr: table_expr(&entity),
            registry,
            translator,
        })
    }

    /// The underlying expression tree, unsimplified.
    pub fn expr(&self) -> &ExprNode {
        &self.expr
    }

    /// The sequence's element type.
    pub fn element_type(&self) -> Result<Type> {
        match self.expr.ty() {
            Type::Array(element) if element.is_null_literal() => Err(Error::UnknownFieldType(
                "sequence element type is unknown".to_string(),
            )),
            Type::Array(element) => Ok((**element).clone()),
            _ => Err(Error::NonArrayQuery),
        }
    }

    // Deferred operators.

    /// Keep elements matching `predicate`.
    pub fn filter(&self, predicate: &WireExpr) -> Result<Query> {
        self.keyed("filter", predicate, |q, _| Ok(q.expr.ty().clone()))
    }

    /// Project each element through `selector`.
    pub fn map(&self, selector: &WireExpr) -> Result<Query> {
        self.keyed("map", selector, |_, lambda| {
            Ok(Type::array(returned(lambda)))
        })
    }

    /// Project each element to a sequence and concatenate the results.
    /// The selector must return an array.
    pub fn flat_map(&self, selector: &WireExpr) -> Result<Query> {
        self.keyed("flatMap", selector, |_, lambda| {
            let ret = returned(lambda);
            if matches!(ret, Type::Array(_)) {
                Ok(ret)
            } else {
                Err(Error::NonArrayQuery)
            }
        })
    }

    pub fn order_by(&self, key: &WireExpr) -> Result<OrderedQuery> {
        Ok(OrderedQuery {
            query: self.keyed("orderBy", key, |q, _| Ok(q.expr.ty().clone()))?,
        })
    }

    pub fn order_by_descending(&self, key: &WireExpr) -> Result<OrderedQuery> {
        Ok(OrderedQuery {
            query: self.keyed("orderByDescending", key, |q, _| Ok(q.expr.ty().clone()))?,
        })
    }

    /// First `n` elements.
    pub fn top(&self, n: u64) -> Query {
        self.chain("top", vec![number(n)], self.expr.ty().clone())
    }

    /// All but the first `n` elements.
    pub fn skip(&self, n: u64) -> Query {
        self.chain("skip", vec![number(n)], self.expr.ty().clone())
    }

    pub fn distinct(&self) -> Query {
        self.chain("distinct", Vec::new(), self.expr.ty().clone())
    }

    /// Yield `null` instead of an empty sequence.
    pub fn null_if_empty(&self) -> Query {
        self.chain("nullIfEmpty", Vec::new(), self.expr.ty().clone())
    }

    /// Group elements by `key`, yielding `{key, elements}` groups.
    pub fn group_by(&self, key: &WireExpr) -> Result<Query> {
        let key = self.element_lambda(key)?;
        let ty = group_type(self.expr.ty(), Some(key.ty()), None);
        Ok(self.chain("groupBy", vec![key], ty))
    }

    /// Group elements by `key`, projecting each group member through
    /// `elements`.
    pub fn group_by_with(&self, key: &WireExpr, elements: &WireExpr) -> Result<Query> {
        let key = self.element_lambda(key)?;
        let elements = self.element_lambda(elements)?;
        let ty = group_type(self.expr.ty(), Some(key.ty()), Some(elements.ty()));
        Ok(self.chain("groupBy", vec![key, elements], ty))
    }

    /// Equi-join with `inner` on matching keys, projecting each matched
    /// pair through `result`.
    pub fn join(
        &self,
        inner: &Query,
        outer_key: &WireExpr,
        inner_key: &WireExpr,
        result: &WireExpr,
    ) -> Result<Query> {
        let outer_element = self.element_type()?;
        let inner_element = inner.element_type()?;
        let outer_key = reconstruct_lambda(
            &self.registry,
            outer_key,
            std::slice::from_ref(&outer_element),
        )?;
        let inner_key = reconstruct_lambda(
            &self.registry,
            inner_key,
            std::slice::from_ref(&inner_element),
        )?;
        let result = reconstruct_lambda(
            &self.registry,
            result,
            &[outer_element, inner_element],
        )?;
        let ty = Type::array(returned(&result));
        Ok(self.chain(
            "join",
            vec![inner.expr.clone(), outer_key, inner_key, result],
            ty,
        ))
    }

    // Terminal operators. Each simplifies the finished tree and hands it
    // to the translator.

    /// Materialize the sequence.
    pub fn to_array(&self) -> Result<Value> {
        self.execute(&self.expr)
    }

    pub fn count(&self, predicate: Option<&WireExpr>) -> Result<Value> {
        self.terminal("count", predicate, |_, _| Ok(Type::NUMBER))
    }

    pub fn some(&self, predicate: Option<&WireExpr>) -> Result<Value> {
        self.terminal("some", predicate, |_, _| Ok(Type::BOOL))
    }

    pub fn every(&self, predicate: &WireExpr) -> Result<Value> {
        self.terminal("every", Some(predicate), |_, _| Ok(Type::BOOL))
    }

    pub fn sum(&self, selector: Option<&WireExpr>) -> Result<Value> {
        self.terminal("sum", selector, |_, _| Ok(Type::NUMBER))
    }

    pub fn avg(&self, selector: Option<&WireExpr>) -> Result<Value> {
        self.terminal("avg", selector, |_, _| Ok(Type::NUMBER))
    }

    pub fn min(&self, selector: Option<&WireExpr>) -> Result<Value> {
        self.terminal("min", selector, Self::extremum_type)
    }

    pub fn max(&self, selector: Option<&WireExpr>) -> Result<Value> {
        self.terminal("max", selector, Self::extremum_type)
    }

    pub fn first(&self, predicate: Option<&WireExpr>) -> Result<Value> {
        self.element_terminal("first", predicate)
    }

    pub fn first_or_null(&self, predicate: Option<&WireExpr>) -> Result<Value> {
        self.element_terminal("firstOrNull", predicate)
    }

    pub fn last(&self, predicate: Option<&WireExpr>) -> Result<Value> {
        self.element_terminal("last", predicate)
    }

    pub fn last_or_null(&self, predicate: Option<&WireExpr>) -> Result<Value> {
        self.element_terminal("lastOrNull", predicate)
    }

    pub fn single(&self, predicate: Option<&WireExpr>) -> Result<Value> {
        self.element_terminal("single", predicate)
    }

    pub fn single_or_null(&self, predicate: Option<&WireExpr>) -> Result<Value> {
        self.element_terminal("singleOrNull", predicate)
    }

    /// Render the simplified tree through the translator.
    pub fn debug_text(&self) -> Result<String> {
        let expr = simplify(&self.expr)?;
        self.translator.debug_text(&expr)
    }

    fn execute(&self, expr: &ExprNode) -> Result<Value> {
        let expr = simplify(expr)?;
        self.translator.execute(&expr)
    }

    fn chain(&self, name: &str, args: Vec<ExprNode>, ty: Type) -> Query {
        let callee = Expr::property(self.expr.clone(), name, false);
        Query {
            expr: Expr::call(callee, args, ty, false),
            registry: self.registry.clone(),
            translator: self.translator.clone(),
        }
    }

    /// Reconstruct a wire-form lambda over one element of this sequence.
    fn element_lambda(&self, wire: &WireExpr) -> Result<ExprNode> {
        let element = self.element_type()?;
        reconstruct_lambda(&self.registry, wire, std::slice::from_ref(&element))
    }

    fn keyed(
        &self,
        name: &str,
        wire: &WireExpr,
        ty: impl FnOnce(&Query, &ExprNode) -> Result<Type>,
    ) -> Result<Query> {
        let lambda = self.element_lambda(wire)?;
        let ty = ty(self, &lambda)?;
        Ok(self.chain(name, vec![lambda], ty))
    }

    fn terminal(
        &self,
        name: &str,
        selector: Option<&WireExpr>,
        ty: impl FnOnce(&Query, Option<&ExprNode>) -> Result<Type>,
    ) -> Result<Value> {
        let args = match selector {
            Some(wire) => vec![self.element_lambda(wire)?],
            None => Vec::new(),
        };
        let ty = ty(self, args.first())?;
        let call = self.chain(name, args, ty);
        self.execute(&call.expr)
    }

    fn element_terminal(&self, name: &str, predicate: Option<&WireExpr>) -> Result<Value> {
        self.terminal(name, predicate, |q, _| q.element_type())
    }

    /// `min`/`max`: the selector's return type when present, otherwise the
    /// element type itself.
    fn extremum_type(&self, selector: Option<&ExprNode>) -> Result<Type> {
        match selector {
            Some(lambda) => Ok(returned(lambda)),
            None => self.element_type(),
        }
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Query({})", self.expr)
    }
}

/// A query with an established sort order that further keys can refine.
#[derive(Clone)]
pub struct OrderedQuery {
    query: Query,
}

impl fmt::Debug for OrderedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderedQuery({})", self.query.expr)
    }
}

impl OrderedQuery {
    /// Subordinate ascending sort key.
    pub fn then_by(&self, key: &WireExpr) -> Result<OrderedQuery> {
        Ok(OrderedQuery {
            query: self
                .query
                .keyed("thenBy", key, |q, _| Ok(q.expr.ty().clone()))?,
        })
    }

    /// Subordinate descending sort key.
    pub fn then_by_descending(&self, key: &WireExpr) -> Result<OrderedQuery> {
        Ok(OrderedQuery {
            query: self
                .query
                .keyed("thenByDescending", key, |q, _| Ok(q.expr.ty().clone()))?,
        })
    }
}

impl Deref for OrderedQuery {
    type Target = Query;

    fn deref(&self) -> &Query {
        &self.query
    }
}

fn returned(lambda: &ExprNode) -> Type {
    lambda.ty().return_type().cloned().unwrap_or(Type::NULL)
}

fn number(n: u64) -> ExprNode {
    Expr::constant(Value::Number(n as f64))
}
