use serde_json::json;

use crate::value::Value;
use crate::wire::{BinaryOp, UnaryOp, WireError, WireExpr};

#[test]
fn decodes_constants() {
    let wire = WireExpr::from_json(&json!(["c", 42])).unwrap();
    assert_eq!(wire, WireExpr::Constant(Value::Number(42.0)));

    let wire = WireExpr::from_json(&json!(["c", null])).unwrap();
    assert_eq!(wire, WireExpr::Constant(Value::Null));
}

#[test]
fn decodes_every_binary_tag() {
    for tag in [
        "**", "*", "/", "%", "+", "-", "<<", ">>", ">>>", "<", "<=", ">", ">=", "instanceof",
        "==", "!=", "===", "!==", "&", "|", "^", "&&", "||", "??",
    ] {
        let wire = WireExpr::from_json(&json!([tag, ["c", 1], ["c", 2]])).unwrap();
        let WireExpr::Binary { op, .. } = wire else {
            panic!("tag {tag} did not decode to a binary node");
        };
        assert_eq!(op.tag(), tag);
    }
}

#[test]
fn decodes_unary_tags() {
    let wire = WireExpr::from_json(&json!(["!", ["c", true]])).unwrap();
    assert!(matches!(
        wire,
        WireExpr::Unary {
            op: UnaryOp::Not,
            ..
        }
    ));
}

#[test]
fn decodes_lambda_with_parameters() {
    let wire = WireExpr::from_json(&json!([
        "=>",
        [["p", "o"]],
        [">", [".", ["p", "o"], "amount"], ["c", 15]]
    ]))
    .unwrap();

    let WireExpr::Lambda { params, body } = wire else {
        panic!("expected lambda");
    };
    assert_eq!(params, vec!["o".to_string()]);
    assert!(matches!(
        body.as_ref(),
        WireExpr::Binary {
            op: BinaryOp::Gt,
            ..
        }
    ));
}

#[test]
fn decodes_optional_chaining_forms() {
    let prop = WireExpr::from_json(&json!(["?.", ["p", "a"], "b"])).unwrap();
    assert!(matches!(prop, WireExpr::Property { optional: true, .. }));

    let call = WireExpr::from_json(&json!(["?.()", ["p", "f"], []])).unwrap();
    assert!(matches!(call, WireExpr::Call { optional: true, .. }));
}

#[test]
fn object_literal_fields_keep_wire_order() {
    let wire = WireExpr::from_json(&json!([
        "{}",
        { "zip": ["c", 1], "area": ["c", 2], "mid": ["c", 3] }
    ]))
    .unwrap();

    let WireExpr::ObjectLit(fields) = wire else {
        panic!("expected an object literal");
    };
    let names: Vec<&str> = fields.keys().map(String::as_str).collect();
    assert_eq!(names, ["zip", "area", "mid"]);
}

#[test]
fn rejects_unknown_tag() {
    let err = WireExpr::from_json(&json!(["goto", 1])).unwrap_err();
    assert!(matches!(err, WireError::UnknownTag(tag) if tag == "goto"));
}

#[test]
fn rejects_untagged_value() {
    let err = WireExpr::from_json(&json!(42)).unwrap_err();
    assert!(matches!(err, WireError::NotTagged(_)));
}

#[test]
fn rejects_malformed_arity() {
    let err = WireExpr::from_json(&json!(["+", ["c", 1]])).unwrap_err();
    assert!(matches!(err, WireError::Malformed { tag, .. } if tag == "+"));
}

#[test]
fn rejects_non_parameter_in_lambda_params() {
    let err = WireExpr::from_json(&json!(["=>", [["c", 1]], ["c", 2]])).unwrap_err();
    assert!(matches!(err, WireError::Malformed { tag, .. } if tag == "=>"));
}

#[test]
fn json_round_trip() {
    let json = json!([
        "()",
        [".", ["()", ["p", "table"], [["c", "OrderLine"]]], "filter"],
        [[
            "=>",
            [["p", "ol"]],
            ["==", [".", ["p", "ol"], "orderId"], [".", ["p", "order"], "id"]]
        ]]
    ]);

    let wire = WireExpr::from_json(&json).unwrap();
    assert_eq!(wire.to_json(), json);
}

#[test]
fn decodes_from_json_text() {
    let text = indoc::indoc! {r#"
        ["=>",
          [["p", "o"]],
          ["??", [".", ["p", "o"], "discount"], ["c", 0]]]
    "#};
    let wire: WireExpr = serde_json::from_str(text).unwrap();
    assert!(matches!(wire, WireExpr::Lambda { .. }));
}

#[test]
fn serde_deserialize_goes_through_the_grammar() {
    let wire: WireExpr = serde_json::from_value(json!(["p", "x"])).unwrap();
    assert_eq!(wire, WireExpr::Parameter("x".to_string()));

    let err = serde_json::from_value::<WireExpr>(json!(["nope"]));
    assert!(err.is_err());
}
