//! Metadata registry: the open extension point over the closed tree grammar.
//!
//! The host application registers its domain entities here once, during
//! initialization: column definitions, quoted templates (members inlined at
//! call sites) and per-member type resolvers. The registry also seeds the
//! built-in sequence-member table backing the query DSL. After construction
//! it is read-only and safe to share across threads behind an `Arc`.

use std::sync::Arc;

use indexmap::IndexMap;

use quex_ir::{Constructor, EntityRef, Type, Value, WireExpr};

use crate::{Error, Result};

/// Computes the parameter types of a lambda argument from the receiver type
/// and the types of the arguments reconstructed so far.
pub type LambdaTypeResolver = Arc<dyn Fn(&Type, &[Type]) -> Vec<Type> + Send + Sync>;

/// Computes a call's result type from the receiver type and argument types.
pub type ResultTypeResolver = Arc<dyn Fn(&Type, &[Type]) -> Type + Send + Sync>;

/// Builds an entity instance from constant constructor arguments.
pub type ConstructorFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Column metadata for a mapped entity field.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub column_name: String,
    pub ty: Type,
}

/// Registry entry for one (owner, member) pair.
#[derive(Clone, Default)]
pub struct MemberDef {
    column: Option<ColumnDef>,
    quoted: Option<WireExpr>,
    lambda_types: Vec<Option<LambdaTypeResolver>>,
    result_type: Option<ResultTypeResolver>,
}

impl MemberDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a quoted template: a wire-form lambda inlined at call sites
    /// in place of a materialized call.
    pub fn quoted(mut self, template: WireExpr) -> Self {
        self.quoted = Some(template);
        self
    }

    /// Register the lambda-type resolver for the argument at `position`.
    pub fn lambda_type(mut self, position: usize, resolver: LambdaTypeResolver) -> Self {
        if self.lambda_types.len() <= position {
            self.lambda_types.resize(position + 1, None);
        }
        self.lambda_types[position] = Some(resolver);
        self
    }

    pub fn result_type(mut self, resolver: ResultTypeResolver) -> Self {
        self.result_type = Some(resolver);
        self
    }

    pub fn column(mut self, column_name: impl Into<String>, ty: Type) -> Self {
        self.column = Some(ColumnDef {
            column_name: column_name.into(),
            ty,
        });
        self
    }

    pub fn column_def(&self) -> Option<&ColumnDef> {
        self.column.as_ref()
    }

    pub(crate) fn quoted_template(&self) -> Option<&WireExpr> {
        self.quoted.as_ref()
    }

    pub(crate) fn lambda_type_at(&self, position: usize) -> Option<&LambdaTypeResolver> {
        self.lambda_types.get(position).and_then(Option::as_ref)
    }

    pub(crate) fn result_type_resolver(&self) -> Option<&ResultTypeResolver> {
        self.result_type.as_ref()
    }
}

/// Declarative definition of one domain entity.
#[derive(Clone, Default)]
pub struct EntityDef {
    members: IndexMap<String, MemberDef>,
    ctor: Option<ConstructorFn>,
}

impl EntityDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a mapped column whose column name equals the member name.
    pub fn column(self, name: &str, ty: Type) -> Self {
        self.column_named(name, name, ty)
    }

    /// Declare a mapped column with an explicit column name.
    pub fn column_named(mut self, name: &str, column_name: &str, ty: Type) -> Self {
        self.members
            .insert(name.to_string(), MemberDef::new().column(column_name, ty));
        self
    }

    /// Declare a quoted member: a relation defined as a lambda template,
    /// substituted in place at every call site.
    pub fn quoted(mut self, name: &str, template: WireExpr) -> Self {
        self.members
            .insert(name.to_string(), MemberDef::new().quoted(template));
        self
    }

    /// Declare a member with explicit resolver metadata.
    pub fn member(mut self, name: &str, def: MemberDef) -> Self {
        self.members.insert(name.to_string(), def);
        self
    }

    /// Override the fold-time constructor. Without one, instances are built
    /// by zipping constructor arguments with declared columns in order.
    pub fn constructor(mut self, ctor: ConstructorFn) -> Self {
        self.ctor = Some(ctor);
        self
    }

    pub fn member_def(&self, name: &str) -> Option<&MemberDef> {
        self.members.get(name)
    }

    /// Declared columns, in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &ColumnDef)> {
        self.members
            .iter()
            .filter_map(|(name, m)| m.column.as_ref().map(|c| (name.as_str(), c)))
    }
}

/// The read-only metadata registry.
///
/// Holds per-entity definitions plus the built-in sequence-member table
/// that resolves the query DSL operators (`filter`, `map`, `orderBy`, ...)
/// when they appear inside reconstructed expressions.
pub struct Registry {
    entities: IndexMap<EntityRef, EntityDef>,
    sequence: IndexMap<String, MemberDef>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entities: IndexMap::new(),
            sequence: sequence_members(),
        }
    }

    /// Register an entity definition. Definitions are expected to be
    /// complete before the first query is built.
    pub fn define(mut self, name: &str, def: EntityDef) -> Self {
        self.entities.insert(EntityRef::new(name), def);
        self
    }

    pub fn entity(&self, entity: &EntityRef) -> Option<&EntityDef> {
        self.entities.get(entity)
    }

    /// Resolve an entity name, failing when it was never registered.
    pub fn entity_ref(&self, name: &str) -> Result<EntityRef> {
        let entity = EntityRef::new(name);
        if self.entities.contains_key(&entity) {
            Ok(entity)
        } else {
            Err(Error::UnknownEntity(name.to_string()))
        }
    }

    /// Fold-time constructor for an entity, for `new` nodes.
    pub fn constructor(&self, name: &str) -> Result<Constructor> {
        let entity = self.entity_ref(name)?;
        let def = &self.entities[&entity];
        let build = match &def.ctor {
            Some(ctor) => ctor.clone(),
            None => default_constructor(&entity, def),
        };
        Ok(Constructor::new(entity, build))
    }

    /// Look up the member table entry for a call receiver.
    ///
    /// `Array`-typed receivers resolve against the sequence-member table,
    /// `Named` receivers against their entity definition. Any other
    /// receiver type cannot own callable members.
    pub(crate) fn member_for(&self, receiver: &Type, name: &str) -> Result<Option<&MemberDef>> {
        match receiver {
            Type::Array(_) => Ok(self.sequence.get(name)),
            Type::Named(entity) => Ok(self
                .entities
                .get(entity)
                .and_then(|def| def.member_def(name))),
            other => Err(Error::UnsupportedWireForm(format!(
                "cannot call `{name}` on a receiver of type `{other}`"
            ))),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Positional constructor: zips arguments with declared columns.
fn default_constructor(entity: &EntityRef, def: &EntityDef) -> ConstructorFn {
    let entity = entity.clone();
    let columns: Vec<String> = def.columns().map(|(name, _)| name.to_string()).collect();
    Arc::new(move |args: &[Value]| {
        let fields = columns
            .iter()
            .zip(args.iter().cloned().chain(std::iter::repeat(Value::Undefined)))
            .map(|(name, v)| (name.clone(), v))
            .collect();
        Value::instance(entity.clone(), fields)
    })
}

fn element_of(ty: &Type) -> Type {
    ty.element().cloned().unwrap_or(Type::NULL)
}

fn return_of(ty: &Type) -> Type {
    ty.return_type().cloned().unwrap_or(Type::NULL)
}

/// One-lambda member whose single selector/predicate receives the element.
fn selector_member(result: ResultTypeResolver) -> MemberDef {
    MemberDef::new()
        .lambda_type(0, Arc::new(|receiver, _| vec![element_of(receiver)]))
        .result_type(result)
}

/// Built-in sequence members, mirroring the query builder's operators.
///
/// These make nested DSL calls inside quoted expressions resolvable: after
/// inlining, `table(OrderLine).filter(...)` is typed through this table.
fn sequence_members() -> IndexMap<String, MemberDef> {
    let mut table = IndexMap::new();

    let receiver: ResultTypeResolver = Arc::new(|r: &Type, _: &[Type]| r.clone());
    let element: ResultTypeResolver = Arc::new(|r: &Type, _: &[Type]| element_of(r));
    let number: ResultTypeResolver = Arc::new(|_: &Type, _: &[Type]| Type::NUMBER);
    let boolean: ResultTypeResolver = Arc::new(|_: &Type, _: &[Type]| Type::BOOL);

    for name in [
        "filter",
        "orderBy",
        "orderByDescending",
        "thenBy",
        "thenByDescending",
    ] {
        table.insert(name.to_string(), selector_member(receiver.clone()));
    }

    table.insert(
        "map".to_string(),
        selector_member(Arc::new(|_, args: &[Type]| {
            Type::array(args.first().map(return_of).unwrap_or(Type::NULL))
        })),
    );
    table.insert(
        "flatMap".to_string(),
        selector_member(Arc::new(|_, args: &[Type]| {
            args.first().map(return_of).unwrap_or(Type::NULL)
        })),
    );

    table.insert("count".to_string(), selector_member(number.clone()));
    table.insert("some".to_string(), selector_member(boolean.clone()));
    table.insert("every".to_string(), selector_member(boolean));
    table.insert("sum".to_string(), selector_member(number.clone()));
    table.insert("avg".to_string(), selector_member(number));

    for name in ["min", "max"] {
        table.insert(
            name.to_string(),
            selector_member(Arc::new(|receiver, args: &[Type]| {
                args.first()
                    .map(return_of)
                    .unwrap_or_else(|| element_of(receiver))
            })),
        );
    }

    for name in [
        "first",
        "firstOrNull",
        "last",
        "lastOrNull",
        "single",
        "singleOrNull",
    ] {
        table.insert(name.to_string(), selector_member(element.clone()));
    }

    for name in ["top", "skip", "nullIfEmpty", "distinct"] {
        table.insert(
            name.to_string(),
            MemberDef::new().result_type(receiver.clone()),
        );
    }

    table.insert(
        "groupBy".to_string(),
        MemberDef::new()
            .lambda_type(0, Arc::new(|receiver, _| vec![element_of(receiver)]))
            .lambda_type(1, Arc::new(|receiver, _| vec![element_of(receiver)]))
            .result_type(Arc::new(|receiver: &Type, args: &[Type]| {
                group_type(receiver, args.first(), args.get(1))
            })),
    );

    table.insert(
        "join".to_string(),
        MemberDef::new()
            .lambda_type(1, Arc::new(|receiver, _| vec![element_of(receiver)]))
            .lambda_type(2, Arc::new(|_, args: &[Type]| {
                vec![args.first().map(element_of).unwrap_or(Type::NULL)]
            }))
            .lambda_type(
                3,
                Arc::new(|receiver, args: &[Type]| {
                    vec![
                        element_of(receiver),
                        args.first().map(element_of).unwrap_or(Type::NULL),
                    ]
                }),
            )
            .result_type(Arc::new(|_: &Type, args: &[Type]| {
                Type::array(args.get(3).map(return_of).unwrap_or(Type::NULL))
            })),
    );

    table
}

/// Result type of `groupBy`: an array of `{key, elements}` groups.
pub(crate) fn group_type(receiver: &Type, key: Option<&Type>, elements: Option<&Type>) -> Type {
    let key_ty = key.map(return_of).unwrap_or(Type::NULL);
    let elements_ty = elements
        .map(|sel| Type::array(return_of(sel)))
        .unwrap_or_else(|| receiver.clone());

    let mut fields = IndexMap::new();
    fields.insert("key".to_string(), key_ty);
    fields.insert("elements".to_string(), elements_ty);
    Type::array(Type::object(fields))
}
