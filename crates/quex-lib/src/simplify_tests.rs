use std::sync::Arc;

use indexmap::IndexMap;

use quex_ir::{BinaryOp, Constructor, EntityRef, Expr, ExprNode, Type, UnaryOp, Value};

use crate::simplify::simplify;
use crate::Error;

fn num(n: f64) -> ExprNode {
    Expr::constant(Value::Number(n))
}

fn param(name: &str) -> ExprNode {
    Expr::parameter(name, Type::NUMBER)
}

#[test]
fn folds_constant_arithmetic() {
    let e = Expr::binary(BinaryOp::Add, num(3.0), num(4.0));
    let folded = simplify(&e).unwrap();
    assert_eq!(folded.as_constant().unwrap().value, Value::Number(7.0));

    let e = Expr::binary(BinaryOp::Pow, num(2.0), num(10.0));
    let folded = simplify(&e).unwrap();
    assert_eq!(folded.as_constant().unwrap().value, Value::Number(1024.0));
}

#[test]
fn folds_nested_constants_under_a_free_parameter() {
    // x + (3 * 4) keeps x but folds the product.
    let e = Expr::binary(
        BinaryOp::Add,
        param("x"),
        Expr::binary(BinaryOp::Mul, num(3.0), num(4.0)),
    );
    let folded = simplify(&e).unwrap();
    insta::assert_snapshot!(folded.to_string(), @"(x + 12)");
}

#[test]
fn simplify_is_a_fixed_point() {
    let e = Expr::binary(
        BinaryOp::Add,
        param("x"),
        Expr::binary(BinaryOp::Mul, num(3.0), num(4.0)),
    );
    let once = simplify(&e).unwrap();
    let twice = simplify(&once).unwrap();
    assert!(Arc::ptr_eq(&once, &twice));
}

#[test]
fn untouched_subtrees_are_shared_with_the_input() {
    let left = Expr::binary(BinaryOp::Add, param("x"), param("y"));
    let e = Expr::binary(
        BinaryOp::Sub,
        left.clone(),
        Expr::binary(BinaryOp::Mul, num(3.0), num(4.0)),
    );
    let folded = simplify(&e).unwrap();
    let Expr::Binary(b) = folded.as_ref() else {
        panic!("expected a binary node, got {folded:?}");
    };
    assert!(Arc::ptr_eq(&b.left, &left));
}

#[test]
fn dead_branches_are_never_visited() {
    // Reading a property of null non-optionally is a fold error, but a
    // falsy left-hand side short-circuits before the right is seen.
    let failing = Expr::property(Expr::constant(Value::Null), "x", false);
    assert!(matches!(
        simplify(&failing),
        Err(Error::UnsupportedConstantFold(_))
    ));

    let e = Expr::binary(BinaryOp::And, Expr::constant(Value::Bool(false)), failing.clone());
    let folded = simplify(&e).unwrap();
    assert_eq!(folded.as_constant().unwrap().value, Value::Bool(false));

    let e = Expr::binary(BinaryOp::Or, Expr::constant(Value::Bool(true)), failing.clone());
    let folded = simplify(&e).unwrap();
    assert_eq!(folded.as_constant().unwrap().value, Value::Bool(true));

    let e = Expr::conditional(Expr::constant(Value::Bool(true)), num(1.0), failing);
    let folded = simplify(&e).unwrap();
    assert_eq!(folded.as_constant().unwrap().value, Value::Number(1.0));
}

#[test]
fn non_deciding_logical_constants_keep_the_operator_node() {
    // A truthy `&&` left (or a falsy `||` left) does not decide the
    // result, so the node is rebuilt rather than replaced by one side.
    let e = Expr::binary(BinaryOp::And, Expr::constant(Value::Bool(true)), param("x"));
    let folded = simplify(&e).unwrap();
    assert!(matches!(folded.as_ref(), Expr::Binary(_)));
    insta::assert_snapshot!(folded.to_string(), @"(true && x)");

    let e = Expr::binary(BinaryOp::Or, num(0.0), param("x"));
    let folded = simplify(&e).unwrap();
    assert!(matches!(folded.as_ref(), Expr::Binary(_)));
    insta::assert_snapshot!(folded.to_string(), @"(0 || x)");

    // Fully constant operands still fold to the selected value.
    let e = Expr::binary(BinaryOp::And, Expr::constant(Value::Bool(true)), num(5.0));
    let folded = simplify(&e).unwrap();
    assert_eq!(folded.as_constant().unwrap().value, Value::Number(5.0));
}

#[test]
fn coalesce_folds_only_when_both_sides_are_constant() {
    let e = Expr::binary(BinaryOp::Coalesce, Expr::constant(Value::Null), num(15.0));
    let folded = simplify(&e).unwrap();
    assert_eq!(folded.as_constant().unwrap().value, Value::Number(15.0));

    let e = Expr::binary(BinaryOp::Coalesce, num(0.0), num(15.0));
    let folded = simplify(&e).unwrap();
    assert_eq!(folded.as_constant().unwrap().value, Value::Number(0.0));

    // A non-constant right side keeps the operator node, nullish left or
    // not.
    let e = Expr::binary(BinaryOp::Coalesce, Expr::constant(Value::Null), param("x"));
    let folded = simplify(&e).unwrap();
    assert!(matches!(folded.as_ref(), Expr::Binary(_)));
    insta::assert_snapshot!(folded.to_string(), @"(null ?? x)");
}

#[test]
fn optional_chain_collapses_to_undefined() {
    // a?.b.c with nullish a: the short circuit covers the whole chain,
    // including the non-optional tail.
    let a = Expr::constant(Value::Null);
    let b = Expr::property(a, "b", true);
    let c = Expr::property(b, "c", false);

    let folded = simplify(&c).unwrap();
    assert_eq!(folded.as_constant().unwrap().value, Value::Undefined);
}

#[test]
fn optional_call_on_nullish_callee_collapses() {
    let callee = Expr::property(Expr::constant(Value::Null), "f", true);
    let call = Expr::call(callee, vec![num(1.0)], Type::NUMBER, true);

    let folded = simplify(&call).unwrap();
    assert_eq!(folded.as_constant().unwrap().value, Value::Undefined);
}

#[test]
fn property_of_a_constant_object_folds() {
    let mut fields = IndexMap::new();
    fields.insert("amount".to_string(), Value::Number(15.0));
    let e = Expr::property(Expr::constant(Value::object(fields)), "amount", false);

    let folded = simplify(&e).unwrap();
    assert_eq!(folded.as_constant().unwrap().value, Value::Number(15.0));
}

#[test]
fn object_literal_with_constant_fields_folds_to_a_constant() {
    let mut fields = IndexMap::new();
    fields.insert("a".to_string(), num(1.0));
    fields.insert(
        "b".to_string(),
        Expr::unary(UnaryOp::Minus, num(2.0)),
    );
    let folded = simplify(&Expr::object(fields)).unwrap();

    let value = &folded.as_constant().unwrap().value;
    assert_eq!(value.field("a"), Value::Number(1.0));
    assert_eq!(value.field("b"), Value::Number(-2.0));
}

#[test]
fn new_with_constant_arguments_builds_the_instance() {
    let entity = EntityRef::new("Order");
    let ctor = Constructor::new(
        entity.clone(),
        Arc::new(|args: &[Value]| {
            let mut fields = IndexMap::new();
            fields.insert("amount".to_string(), args[0].clone());
            Value::instance(EntityRef::new("Order"), fields)
        }),
    );

    let folded = simplify(&Expr::instance(ctor.clone(), vec![num(15.0)])).unwrap();
    assert_eq!(folded.as_constant().unwrap().value.field("amount"), Value::Number(15.0));

    // A non-constant argument leaves the construction in the tree.
    let kept = simplify(&Expr::instance(ctor, vec![param("x")])).unwrap();
    assert!(matches!(kept.as_ref(), Expr::New(_)));
}

#[test]
fn calls_are_never_folded() {
    let callee = Expr::property(param("xs"), "count", false);
    let call = Expr::call(callee, vec![], Type::NUMBER, false);
    let folded = simplify(&call).unwrap();
    assert!(Arc::ptr_eq(&folded, &call));
}

#[test]
fn lambda_bodies_fold_in_place() {
    let p = param("x");
    let body = Expr::binary(
        BinaryOp::Add,
        p.clone(),
        Expr::binary(BinaryOp::Mul, num(2.0), num(3.0)),
    );
    let folded = simplify(&Expr::lambda(vec![p], body)).unwrap();
    insta::assert_snapshot!(folded.to_string(), @"x => (x + 6)");
}
