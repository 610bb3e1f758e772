use std::sync::Arc;

use quex_ir::{Type, Value};

use crate::registry::{group_type, EntityDef, MemberDef, Registry};
use crate::Error;

fn orders() -> Registry {
    Registry::new().define(
        "Order",
        EntityDef::new()
            .column("id", Type::NUMBER)
            .column_named("customerName", "customer_name", Type::STRING)
            .column("amount", Type::NUMBER),
    )
}

#[test]
fn entity_lookup() {
    let registry = orders();
    assert!(registry.entity_ref("Order").is_ok());
    assert!(matches!(
        registry.entity_ref("Invoice"),
        Err(Error::UnknownEntity(name)) if name == "Invoice"
    ));
}

#[test]
fn columns_keep_declaration_order_and_names() {
    let registry = orders();
    let entity = registry.entity_ref("Order").unwrap();
    let def = registry.entity(&entity).unwrap();

    let columns: Vec<(&str, &str)> = def
        .columns()
        .map(|(member, c)| (member, c.column_name.as_str()))
        .collect();
    assert_eq!(
        columns,
        vec![
            ("id", "id"),
            ("customerName", "customer_name"),
            ("amount", "amount"),
        ]
    );
}

#[test]
fn default_constructor_zips_columns_and_pads_with_undefined() {
    let registry = orders();
    let ctor = registry.constructor("Order").unwrap();

    let built = ctor.build(&[Value::Number(1.0), Value::string("Ada")]);
    assert_eq!(built.field("id"), Value::Number(1.0));
    assert_eq!(built.field("customerName"), Value::string("Ada"));
    assert_eq!(built.field("amount"), Value::Undefined);
}

#[test]
fn registered_constructor_takes_precedence() {
    let registry = Registry::new().define(
        "Tagged",
        EntityDef::new()
            .column("tag", Type::STRING)
            .constructor(Arc::new(|_| Value::string("custom"))),
    );
    let ctor = registry.constructor("Tagged").unwrap();
    assert_eq!(ctor.build(&[]), Value::string("custom"));
}

#[test]
fn member_resolution_by_receiver_type() {
    let registry = orders();
    let order = Type::named("Order");

    // Array receivers resolve against the sequence table.
    let filter = registry.member_for(&Type::array(order.clone()), "filter").unwrap();
    assert!(filter.is_some());

    // Named receivers resolve against their entity definition.
    let amount = registry.member_for(&order, "amount").unwrap();
    assert!(amount.unwrap().column_def().is_some());
    assert!(registry.member_for(&order, "missing").unwrap().is_none());

    // Scalars own no members.
    assert!(matches!(
        registry.member_for(&Type::NUMBER, "anything"),
        Err(Error::UnsupportedWireForm(_))
    ));
}

#[test]
fn sequence_member_result_types() {
    let registry = orders();
    let seq = Type::array(Type::named("Order"));

    let resolve = |name: &str, args: &[Type]| -> Type {
        let member = registry.member_for(&seq, name).unwrap().unwrap();
        member.result_type_resolver().unwrap()(&seq, args)
    };

    assert_eq!(resolve("filter", &[Type::function(Type::BOOL)]), seq);
    assert_eq!(
        resolve("map", &[Type::function(Type::STRING)]),
        Type::array(Type::STRING)
    );
    assert_eq!(
        resolve("flatMap", &[Type::function(Type::array(Type::NUMBER))]),
        Type::array(Type::NUMBER)
    );
    assert_eq!(resolve("count", &[]), Type::NUMBER);
    assert_eq!(resolve("some", &[]), Type::BOOL);
    assert_eq!(resolve("first", &[]), Type::named("Order"));
    assert_eq!(resolve("top", &[Type::NUMBER]), seq);
    assert_eq!(resolve("min", &[Type::function(Type::NUMBER)]), Type::NUMBER);
    assert_eq!(resolve("min", &[]), Type::named("Order"));
}

#[test]
fn lambda_resolvers_receive_the_element_type() {
    let registry = orders();
    let seq = Type::array(Type::named("Order"));

    let member = registry.member_for(&seq, "filter").unwrap().unwrap();
    let params = member.lambda_type_at(0).unwrap()(&seq, &[]);
    assert_eq!(params, vec![Type::named("Order")]);

    assert!(member.lambda_type_at(1).is_none());
}

#[test]
fn group_type_shape() {
    let seq = Type::array(Type::named("Order"));

    // Key selector only: groups keep the original elements.
    let ty = group_type(&seq, Some(&Type::function(Type::STRING)), None);
    insta::assert_snapshot!(ty.to_string(), @"{key: string, elements: Order[]}[]");

    // Element selector rewrites the group contents.
    let ty = group_type(
        &seq,
        Some(&Type::function(Type::STRING)),
        Some(&Type::function(Type::NUMBER)),
    );
    insta::assert_snapshot!(ty.to_string(), @"{key: string, elements: number[]}[]");
}

#[test]
fn explicit_member_defs_compose() {
    let registry = Registry::new().define(
        "Line",
        EntityDef::new().member(
            "total",
            MemberDef::new().result_type(Arc::new(|_, _| Type::NUMBER)),
        ),
    );
    let member = registry
        .member_for(&Type::named("Line"), "total")
        .unwrap()
        .unwrap();
    assert!(member.result_type_resolver().is_some());
    assert!(member.quoted_template().is_none());
}
