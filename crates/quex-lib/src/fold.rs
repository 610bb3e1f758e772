//! Constant-fold semantics for operators.
//!
//! Implements the host language's numeric/logical/relational rules over
//! [`Value`]: NaN-propagating doubles, truncating int32/uint32 bitwise
//! ops, string concatenation for `+`, loose vs strict equality and
//! nullish coalescing. Used only by the partial evaluator, always over
//! operands that are already constants.

use quex_ir::{BinaryOp, UnaryOp, Value};

use crate::{Error, Result};

pub fn eval_unary(op: UnaryOp, v: &Value) -> Value {
    match op {
        UnaryOp::Not => Value::Bool(!v.truthy()),
        UnaryOp::Plus => Value::Number(to_number(v)),
        UnaryOp::Minus => Value::Number(-to_number(v)),
        UnaryOp::BitNot => Value::Number(!to_int32(v) as f64),
    }
}

pub fn eval_binary(op: BinaryOp, a: &Value, b: &Value) -> Result<Value> {
    use BinaryOp::*;
    Ok(match op {
        Pow => Value::Number(to_number(a).powf(to_number(b))),
        Mul => Value::Number(to_number(a) * to_number(b)),
        Div => Value::Number(to_number(a) / to_number(b)),
        Rem => Value::Number(to_number(a) % to_number(b)),
        Sub => Value::Number(to_number(a) - to_number(b)),
        Add => match (a, b) {
            (Value::String(_), _) | (_, Value::String(_)) => {
                Value::String(format!("{a}{b}"))
            }
            _ => Value::Number(to_number(a) + to_number(b)),
        },

        Shl => Value::Number((to_int32(a) << (to_uint32(b) & 31)) as f64),
        Shr => Value::Number((to_int32(a) >> (to_uint32(b) & 31)) as f64),
        UShr => Value::Number((to_uint32(a) >> (to_uint32(b) & 31)) as f64),
        BitAnd => Value::Number((to_int32(a) & to_int32(b)) as f64),
        BitOr => Value::Number((to_int32(a) | to_int32(b)) as f64),
        BitXor => Value::Number((to_int32(a) ^ to_int32(b)) as f64),

        Lt => compare(a, b, |o| o == std::cmp::Ordering::Less),
        Le => compare(a, b, |o| o != std::cmp::Ordering::Greater),
        Gt => compare(a, b, |o| o == std::cmp::Ordering::Greater),
        Ge => compare(a, b, |o| o != std::cmp::Ordering::Less),

        LooseEq => Value::Bool(loose_eq(a, b)),
        LooseNe => Value::Bool(!loose_eq(a, b)),
        StrictEq => Value::Bool(strict_eq(a, b)),
        StrictNe => Value::Bool(!strict_eq(a, b)),

        And => {
            if a.truthy() {
                b.clone()
            } else {
                a.clone()
            }
        }
        Or => {
            if a.truthy() {
                a.clone()
            } else {
                b.clone()
            }
        }
        Coalesce => {
            if a.is_nullish() {
                b.clone()
            } else {
                a.clone()
            }
        }

        InstanceOf => {
            let Value::EntityType(entity) = b else {
                return Err(Error::UnsupportedConstantFold(format!(
                    "right-hand side of instanceof is not a constructor: {b}"
                )));
            };
            match a {
                Value::Object {
                    class: Some(class), ..
                } => Value::Bool(class == entity),
                _ => Value::Bool(false),
            }
        }
    })
}

/// Relational comparison: lexicographic when both sides are strings,
/// numeric otherwise. Comparisons involving NaN are false.
fn compare(a: &Value, b: &Value, pick: impl Fn(std::cmp::Ordering) -> bool) -> Value {
    let ordering = match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => to_number(a).partial_cmp(&to_number(b)),
    };
    Value::Bool(ordering.is_some_and(pick))
}

/// Numeric coercion. `null` is 0, `undefined` is NaN, strings parse
/// (empty string is 0), containers are NaN.
pub fn to_number(v: &Value) -> f64 {
    match v {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => *n,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object { .. } | Value::EntityType(_) => f64::NAN,
    }
}

/// Truncating conversion to a 32-bit signed integer, wrapping modulo 2^32.
pub fn to_int32(v: &Value) -> i32 {
    to_uint32(v) as i32
}

/// Truncating conversion to a 32-bit unsigned integer, wrapping modulo 2^32.
pub fn to_uint32(v: &Value) -> u32 {
    let n = to_number(v);
    if !n.is_finite() {
        return 0;
    }
    let m = n.trunc() % 4_294_967_296.0;
    let m = if m < 0.0 { m + 4_294_967_296.0 } else { m };
    m as u32
}

/// Strict equality: same variant, equal contents. NaN is never equal to
/// itself; `null` and `undefined` are distinct.
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    a == b
}

/// Loose equality: `null == undefined`, numeric coercion across
/// number/string/boolean, container values never equal by coercion.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    use Value::*;
    match (a, b) {
        (Undefined | Null, Undefined | Null) => true,
        (Number(x), Number(y)) => x == y,
        (String(x), String(y)) => x == y,
        (Bool(x), Bool(y)) => x == y,
        (Number(_) | String(_) | Bool(_), Number(_) | String(_) | Bool(_)) => {
            to_number(a) == to_number(b)
        }
        (EntityType(x), EntityType(y)) => x == y,
        _ => false,
    }
}
