//! Type model for expression trees.
//!
//! Every tree node carries exactly one `Type`, computed eagerly when the
//! node is constructed. The variant set is closed; domain extensibility
//! comes from the resolver registry in `quex-lib`, never from widening
//! this enum.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

/// Interned reference to a nominal domain/entity type.
///
/// Cheap to clone and to compare; two refs are equal iff their names are.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef(Arc<str>);

impl EntityRef {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scalar literal kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Bool,
    Number,
    String,
    Null,
}

impl Scalar {
    pub fn as_str(self) -> &'static str {
        match self {
            Scalar::Bool => "boolean",
            Scalar::Number => "number",
            Scalar::String => "string",
            Scalar::Null => "null",
        }
    }
}

/// Closed set of types annotating tree nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Scalar literal type.
    Literal(Scalar),
    /// Homogeneous sequence with a known element type.
    Array(Arc<Type>),
    /// Callable; `callable` names the declared constructor when one is known.
    Function {
        callable: Option<EntityRef>,
        ret: Arc<Type>,
    },
    /// Reference to a nominal domain type.
    Named(EntityRef),
    /// Structural object type with per-field types.
    Object(Arc<IndexMap<String, Type>>),
}

impl Type {
    pub const BOOL: Type = Type::Literal(Scalar::Bool);
    pub const NUMBER: Type = Type::Literal(Scalar::Number);
    pub const STRING: Type = Type::Literal(Scalar::String);
    /// Placeholder type for statically unknown values.
    pub const NULL: Type = Type::Literal(Scalar::Null);

    pub fn array(element: Type) -> Type {
        Type::Array(Arc::new(element))
    }

    pub fn function(ret: Type) -> Type {
        Type::Function {
            callable: None,
            ret: Arc::new(ret),
        }
    }

    pub fn object(fields: IndexMap<String, Type>) -> Type {
        Type::Object(Arc::new(fields))
    }

    pub fn named(entity: impl Into<EntityRef>) -> Type {
        Type::Named(entity.into())
    }

    /// Element type when this is an array type.
    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Array(el) => Some(el),
            _ => None,
        }
    }

    /// Return type when this is a function type.
    pub fn return_type(&self) -> Option<&Type> {
        match self {
            Type::Function { ret, .. } => Some(ret),
            _ => None,
        }
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self, Type::Literal(Scalar::Null))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Literal(s) => f.write_str(s.as_str()),
            Type::Array(el) => write!(f, "{el}[]"),
            Type::Function { ret, .. } => write!(f, "(...) => {ret}"),
            Type::Named(e) => write!(f, "{e}"),
            Type::Object(fields) => {
                f.write_str("{")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                f.write_str("}")
            }
        }
    }
}
