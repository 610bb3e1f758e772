//! Source-like rendering of expression trees.
//!
//! Used by error messages, `debug_text` implementations and snapshot
//! tests. Binary and unary expressions are always parenthesized so the
//! output is unambiguous without precedence rules.

use std::fmt;

use crate::expr::Expr;
use crate::value::Value;

impl Expr {
    /// True when the node renders as an atom and needs no parentheses
    /// when used as a member-access or call base.
    fn is_atom(&self) -> bool {
        matches!(
            self,
            Expr::Parameter(_) | Expr::Constant(_) | Expr::Property(_) | Expr::Call(_)
        )
    }
}

fn base(f: &mut fmt::Formatter<'_>, e: &Expr) -> fmt::Result {
    if e.is_atom() {
        write!(f, "{e}")
    } else {
        write!(f, "({e})")
    }
}

/// Render a constant value as source text: strings are quoted so they
/// stay distinguishable from identifiers.
fn constant(f: &mut fmt::Formatter<'_>, v: &Value) -> fmt::Result {
    match v {
        Value::String(s) => write!(f, "{s:?}"),
        Value::Array(items) => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                constant(f, item)?;
            }
            f.write_str("]")
        }
        Value::Object { class, fields } => {
            if let Some(class) = class {
                write!(f, "{class} ")?;
            }
            f.write_str("{")?;
            for (i, (name, v)) in fields.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{name}: ")?;
                constant(f, v)?;
            }
            f.write_str("}")
        }
        other => write!(f, "{other}"),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(e) => constant(f, &e.value),
            Expr::Unary(e) => write!(f, "({}{})", e.op, e.operand),
            Expr::Binary(e) => write!(f, "({} {} {})", e.left, e.op.tag(), e.right),
            Expr::Conditional(e) => {
                write!(f, "({} ? {} : {})", e.condition, e.when_true, e.when_false)
            }
            Expr::Property(e) => {
                base(f, &e.object)?;
                write!(f, "{}{}", if e.optional { "?." } else { "." }, e.name)
            }
            Expr::Call(e) => {
                // A string-constant callee names a function (the query
                // source node), not a string value; it renders bare.
                match e.callee.as_ref() {
                    Expr::Constant(c) => match &c.value {
                        Value::String(name) => f.write_str(name)?,
                        _ => base(f, &e.callee)?,
                    },
                    _ => base(f, &e.callee)?,
                }
                if e.optional {
                    f.write_str("?.")?;
                }
                f.write_str("(")?;
                for (i, arg) in e.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Expr::Parameter(e) => f.write_str(&e.name),
            Expr::Lambda(e) => {
                // A single parameter stands bare; any other arity needs the
                // parameter list delimited.
                if let [p] = e.params.as_slice() {
                    write!(f, "{p}")?;
                } else {
                    f.write_str("(")?;
                    for (i, p) in e.params.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{p}")?;
                    }
                    f.write_str(")")?;
                }
                write!(f, " => {}", e.body)
            }
            Expr::ObjectLit(e) => {
                f.write_str("{")?;
                for (i, (name, value)) in e.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str("}")
            }
            Expr::New(e) => {
                write!(f, "new {}(", e.ctor.entity())?;
                for (i, arg) in e.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}
