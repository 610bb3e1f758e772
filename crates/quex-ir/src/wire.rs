//! Wire form: the serializable tagged-tuple expression grammar.
//!
//! The quoting front end emits expressions as JSON arrays whose first
//! element is the tag: `["c", value]`, `["+", left, right]`,
//! `["=>", [["p", "x"]], body]` and so on. The grammar is closed; any
//! other tag or shape is rejected at parse time with `WireError`, never
//! deeper inside reconstruction.

use std::fmt;

use indexmap::IndexMap;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::value::Value;

/// Unary operator tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `+u` — numeric coercion
    Plus,
    /// `-u` — numeric negation
    Minus,
    /// `~` — bitwise complement
    BitNot,
    /// `!` — logical negation
    Not,
}

impl UnaryOp {
    pub fn tag(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+u",
            UnaryOp::Minus => "-u",
            UnaryOp::BitNot => "~",
            UnaryOp::Not => "!",
        }
    }

    /// Operator symbol as written in source.
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::BitNot => "~",
            UnaryOp::Not => "!",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "+u" => UnaryOp::Plus,
            "-u" => UnaryOp::Minus,
            "~" => UnaryOp::BitNot,
            "!" => UnaryOp::Not,
            _ => return None,
        })
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Binary operator tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Pow,
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    UShr,
    Lt,
    Le,
    Gt,
    Ge,
    InstanceOf,
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Coalesce,
}

impl BinaryOp {
    pub fn tag(self) -> &'static str {
        match self {
            BinaryOp::Pow => "**",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::InstanceOf => "instanceof",
            BinaryOp::LooseEq => "==",
            BinaryOp::LooseNe => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNe => "!==",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Coalesce => "??",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "**" => BinaryOp::Pow,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            ">>>" => BinaryOp::UShr,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "instanceof" => BinaryOp::InstanceOf,
            "==" => BinaryOp::LooseEq,
            "!=" => BinaryOp::LooseNe,
            "===" => BinaryOp::StrictEq,
            "!==" => BinaryOp::StrictNe,
            "&" => BinaryOp::BitAnd,
            "|" => BinaryOp::BitOr,
            "^" => BinaryOp::BitXor,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            "??" => BinaryOp::Coalesce,
            _ => return None,
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Errors raised while decoding wire form.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WireError {
    #[error("unsupported wire tag `{0}`")]
    UnknownTag(String),

    #[error("malformed `{tag}` node: {detail}")]
    Malformed { tag: String, detail: String },

    #[error("wire form must be a tagged array, got `{0}`")]
    NotTagged(String),
}

fn malformed(tag: &str, detail: impl Into<String>) -> WireError {
    WireError::Malformed {
        tag: tag.to_string(),
        detail: detail.into(),
    }
}

/// A wire-form expression, decoded but not yet reconstructed.
#[derive(Debug, Clone, PartialEq)]
pub enum WireExpr {
    Constant(Value),
    Unary {
        op: UnaryOp,
        operand: Box<WireExpr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<WireExpr>,
        right: Box<WireExpr>,
    },
    Conditional {
        condition: Box<WireExpr>,
        when_true: Box<WireExpr>,
        when_false: Box<WireExpr>,
    },
    Property {
        object: Box<WireExpr>,
        name: String,
        optional: bool,
    },
    Call {
        callee: Box<WireExpr>,
        args: Vec<WireExpr>,
        optional: bool,
    },
    Parameter(String),
    Lambda {
        params: Vec<String>,
        body: Box<WireExpr>,
    },
    ObjectLit(IndexMap<String, WireExpr>),
    New {
        ctor: String,
        args: Vec<WireExpr>,
    },
}

impl WireExpr {
    /// Decode a JSON value into wire form.
    pub fn from_json(json: &Json) -> Result<WireExpr, WireError> {
        let Json::Array(items) = json else {
            return Err(WireError::NotTagged(short(json)));
        };
        let Some(Json::String(tag)) = items.first() else {
            return Err(WireError::NotTagged(short(json)));
        };
        let rest = &items[1..];

        if let Some(op) = UnaryOp::from_tag(tag) {
            let [operand] = rest else {
                return Err(malformed(tag, "expected one operand"));
            };
            return Ok(WireExpr::Unary {
                op,
                operand: Box::new(WireExpr::from_json(operand)?),
            });
        }
        if let Some(op) = BinaryOp::from_tag(tag) {
            let [left, right] = rest else {
                return Err(malformed(tag, "expected two operands"));
            };
            return Ok(WireExpr::Binary {
                op,
                left: Box::new(WireExpr::from_json(left)?),
                right: Box::new(WireExpr::from_json(right)?),
            });
        }

        match tag.as_str() {
            "c" => {
                let [value] = rest else {
                    return Err(malformed(tag, "expected one value"));
                };
                Ok(WireExpr::Constant(Value::from(value.clone())))
            }
            "?:" => {
                let [condition, when_true, when_false] = rest else {
                    return Err(malformed(tag, "expected condition and two branches"));
                };
                Ok(WireExpr::Conditional {
                    condition: Box::new(WireExpr::from_json(condition)?),
                    when_true: Box::new(WireExpr::from_json(when_true)?),
                    when_false: Box::new(WireExpr::from_json(when_false)?),
                })
            }
            "." | "?." => {
                let [object, Json::String(name)] = rest else {
                    return Err(malformed(tag, "expected object and member name"));
                };
                Ok(WireExpr::Property {
                    object: Box::new(WireExpr::from_json(object)?),
                    name: name.clone(),
                    optional: tag == "?.",
                })
            }
            "()" | "?.()" => {
                let [callee, Json::Array(args)] = rest else {
                    return Err(malformed(tag, "expected callee and argument list"));
                };
                Ok(WireExpr::Call {
                    callee: Box::new(WireExpr::from_json(callee)?),
                    args: args.iter().map(WireExpr::from_json).collect::<Result<_, _>>()?,
                    optional: tag == "?.()",
                })
            }
            "p" => {
                let [Json::String(name)] = rest else {
                    return Err(malformed(tag, "expected parameter name"));
                };
                Ok(WireExpr::Parameter(name.clone()))
            }
            "=>" => {
                let [Json::Array(params), body] = rest else {
                    return Err(malformed(tag, "expected parameter list and body"));
                };
                let params = params
                    .iter()
                    .map(|p| match WireExpr::from_json(p)? {
                        WireExpr::Parameter(name) => Ok(name),
                        _ => Err(malformed(tag, "lambda parameters must be `p` nodes")),
                    })
                    .collect::<Result<_, _>>()?;
                Ok(WireExpr::Lambda {
                    params,
                    body: Box::new(WireExpr::from_json(body)?),
                })
            }
            "{}" => {
                let [Json::Object(fields)] = rest else {
                    return Err(malformed(tag, "expected a field map"));
                };
                let fields = fields
                    .iter()
                    .map(|(name, v)| Ok((name.clone(), WireExpr::from_json(v)?)))
                    .collect::<Result<_, WireError>>()?;
                Ok(WireExpr::ObjectLit(fields))
            }
            "new" => {
                let [Json::String(ctor), Json::Array(args)] = rest else {
                    return Err(malformed(tag, "expected constructor name and argument list"));
                };
                Ok(WireExpr::New {
                    ctor: ctor.clone(),
                    args: args.iter().map(WireExpr::from_json).collect::<Result<_, _>>()?,
                })
            }
            other => Err(WireError::UnknownTag(other.to_string())),
        }
    }

    /// Encode back into the JSON tuple grammar. Round-trips with
    /// [`from_json`](Self::from_json) for any well-formed wire value.
    pub fn to_json(&self) -> Json {
        use serde_json::json;
        match self {
            WireExpr::Constant(v) => json!(["c", v.to_json()]),
            WireExpr::Unary { op, operand } => json!([op.tag(), operand.to_json()]),
            WireExpr::Binary { op, left, right } => {
                json!([op.tag(), left.to_json(), right.to_json()])
            }
            WireExpr::Conditional {
                condition,
                when_true,
                when_false,
            } => json!(["?:", condition.to_json(), when_true.to_json(), when_false.to_json()]),
            WireExpr::Property {
                object,
                name,
                optional,
            } => json!([if *optional { "?." } else { "." }, object.to_json(), name]),
            WireExpr::Call {
                callee,
                args,
                optional,
            } => json!([
                if *optional { "?.()" } else { "()" },
                callee.to_json(),
                args.iter().map(WireExpr::to_json).collect::<Vec<_>>()
            ]),
            WireExpr::Parameter(name) => json!(["p", name]),
            WireExpr::Lambda { params, body } => json!([
                "=>",
                params.iter().map(|p| json!(["p", p])).collect::<Vec<_>>(),
                body.to_json()
            ]),
            WireExpr::ObjectLit(fields) => {
                let map: serde_json::Map<String, Json> = fields
                    .iter()
                    .map(|(name, v)| (name.clone(), v.to_json()))
                    .collect();
                json!(["{}", map])
            }
            WireExpr::New { ctor, args } => json!([
                "new",
                ctor,
                args.iter().map(WireExpr::to_json).collect::<Vec<_>>()
            ]),
        }
    }
}

impl TryFrom<&Json> for WireExpr {
    type Error = WireError;

    fn try_from(json: &Json) -> Result<Self, WireError> {
        WireExpr::from_json(json)
    }
}

impl Serialize for WireExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WireExpr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = Json::deserialize(deserializer)?;
        WireExpr::from_json(&json).map_err(serde::de::Error::custom)
    }
}

/// Compact rendering of a JSON value for error messages.
fn short(json: &Json) -> String {
    let text = json.to_string();
    if text.chars().count() > 60 {
        let cut: String = text.chars().take(60).collect();
        format!("{cut}…")
    } else {
        text
    }
}
