use std::sync::Arc;

use indexmap::IndexMap;

use crate::expr::{Expr, map_nodes};
use crate::types::Type;
use crate::value::Value;
use crate::wire::{BinaryOp, UnaryOp};

#[test]
fn constant_types_follow_the_literal_table() {
    assert_eq!(Expr::constant(Value::Bool(true)).ty(), &Type::BOOL);
    assert_eq!(Expr::constant(Value::Number(1.0)).ty(), &Type::NUMBER);
    assert_eq!(Expr::constant(Value::string("s")).ty(), &Type::STRING);
    assert_eq!(Expr::constant(Value::Null).ty(), &Type::NULL);
}

#[test]
fn arithmetic_is_number_comparison_is_boolean() {
    let one = Expr::constant(Value::Number(1.0));
    let two = Expr::constant(Value::Number(2.0));

    assert_eq!(Expr::binary(BinaryOp::Add, one.clone(), two.clone()).ty(), &Type::NUMBER);
    assert_eq!(Expr::binary(BinaryOp::Shl, one.clone(), two.clone()).ty(), &Type::NUMBER);
    assert_eq!(Expr::binary(BinaryOp::Lt, one.clone(), two.clone()).ty(), &Type::BOOL);
    // Comparisons are boolean regardless of operand kinds.
    let s = Expr::constant(Value::string("x"));
    assert_eq!(Expr::binary(BinaryOp::LooseEq, s, two.clone()).ty(), &Type::BOOL);
}

#[test]
fn coalesce_falls_through_null_placeholder() {
    let null = Expr::constant(Value::Null);
    let fifteen = Expr::constant(Value::Number(15.0));
    let e = Expr::binary(BinaryOp::Coalesce, null, fifteen);
    assert_eq!(e.ty(), &Type::NUMBER);
}

#[test]
fn unary_not_is_boolean_others_numeric() {
    let x = Expr::constant(Value::Number(1.0));
    assert_eq!(Expr::unary(UnaryOp::Not, x.clone()).ty(), &Type::BOOL);
    assert_eq!(Expr::unary(UnaryOp::Minus, x.clone()).ty(), &Type::NUMBER);
    assert_eq!(Expr::unary(UnaryOp::BitNot, x).ty(), &Type::NUMBER);
}

#[test]
fn property_type_comes_from_object_literal_type() {
    let mut fields = IndexMap::new();
    fields.insert("n".to_string(), Expr::constant(Value::Number(3.0)));
    let obj = Expr::object(fields);

    let known = Expr::property(obj, "n", false);
    assert_eq!(known.ty(), &Type::NUMBER);
}

#[test]
fn property_type_on_opaque_object_is_the_null_placeholder() {
    // Known limitation carried over from the reference system: field types
    // of nominal entities are not resolved, the placeholder is used instead.
    let param = Expr::parameter("o", Type::named("Order"));
    let p = Expr::property(param, "amount", false);
    assert_eq!(p.ty(), &Type::NULL);
}

#[test]
fn lambda_type_wraps_body_type() {
    let p = Expr::parameter("x", Type::NUMBER);
    let body = Expr::binary(BinaryOp::Gt, p.clone(), Expr::constant(Value::Number(0.0)));
    let lambda = Expr::lambda(vec![p], body);
    assert_eq!(lambda.ty().return_type(), Some(&Type::BOOL));
}

#[test]
fn map_children_returns_identical_node_when_nothing_changes() {
    let p = Expr::parameter("x", Type::NUMBER);
    let e = Expr::binary(BinaryOp::Add, p.clone(), Expr::constant(Value::Number(1.0)));

    let same = e.map_children(&mut |child| child.clone());
    assert!(Arc::ptr_eq(&e, &same));
}

#[test]
fn map_children_rebuilds_when_a_child_changes() {
    let p = Expr::parameter("x", Type::NUMBER);
    let one = Expr::constant(Value::Number(1.0));
    let e = Expr::binary(BinaryOp::Add, p.clone(), one.clone());

    let two = Expr::constant(Value::Number(2.0));
    let rebuilt = e.map_children(&mut |child| {
        if Arc::ptr_eq(child, &one) {
            two.clone()
        } else {
            child.clone()
        }
    });

    assert!(!Arc::ptr_eq(&e, &rebuilt));
    let Expr::Binary(b) = rebuilt.as_ref() else {
        panic!("expected binary");
    };
    // The untouched side is shared, not copied.
    assert!(Arc::ptr_eq(&b.left, &p));
    assert!(Arc::ptr_eq(&b.right, &two));
}

#[test]
fn map_nodes_shares_the_original_slice_when_unchanged() {
    let nodes = vec![
        Expr::constant(Value::Number(1.0)),
        Expr::constant(Value::Number(2.0)),
    ];
    assert!(map_nodes(&nodes, &mut |n| n.clone()).is_none());

    let replacement = Expr::constant(Value::Number(9.0));
    let mapped = map_nodes(&nodes, &mut |n| {
        if Arc::ptr_eq(n, &nodes[1]) {
            replacement.clone()
        } else {
            n.clone()
        }
    })
    .expect("second element changed");
    assert!(Arc::ptr_eq(&mapped[0], &nodes[0]));
    assert!(Arc::ptr_eq(&mapped[1], &replacement));
}
