//! A proxy answers every operator the way its wrapped object does, errors included.

use std::fmt::Debug;

use surrogate::{BinaryOp, CompareOp, Conversion, RunResult, UnaryOp, Value, ops, proxy};

fn samples() -> Vec<Value> {
    vec![
        Value::int(7),
        Value::int(0),
        Value::int(-3),
        Value::float(2.5),
        Value::bool(true),
        Value::str("ab"),
        Value::list(vec![Value::int(1)]),
        Value::tuple([Value::int(1), Value::int(2)]),
        Value::none(),
    ]
}

const COMPARE_OPS: [CompareOp; 6] = [
    CompareOp::Lt,
    CompareOp::Le,
    CompareOp::Eq,
    CompareOp::Ne,
    CompareOp::Gt,
    CompareOp::Ge,
];

/// Results are compared through `repr`, errors by type and message.
fn assert_same<T: PartialEq + Debug>(direct: RunResult<T>, proxied: RunResult<T>, what: &str) {
    match (direct, proxied) {
        (Ok(direct), Ok(proxied)) => assert_eq!(direct, proxied, "{what}"),
        (Err(direct), Err(proxied)) => {
            assert_eq!(direct.exc_type(), proxied.exc_type(), "{what}");
            assert_eq!(direct.arg(), proxied.arg(), "{what}");
        }
        (direct, proxied) => panic!("{what}: direct {direct:?}, proxied {proxied:?}"),
    }
}

fn repr_of(result: RunResult<Value>) -> RunResult<String> {
    result.and_then(|value| ops::repr(&value))
}

// === Binary operators ===

#[test]
fn binary_operators_with_proxy_on_the_left() {
    for left in samples() {
        for right in samples() {
            for op in BinaryOp::ALL {
                let what = format!("{} {} {}", ops::repr(&left).unwrap(), op.symbol(), ops::repr(&right).unwrap());
                assert_same(
                    repr_of(ops::binary(&left, op, &right)),
                    repr_of(ops::binary(&proxy(left.clone()), op, &right)),
                    &what,
                );
            }
        }
    }
}

#[test]
fn binary_operators_with_proxy_on_the_right() {
    for left in samples() {
        for right in samples() {
            for op in BinaryOp::ALL {
                let what = format!("{} {} {}", ops::repr(&left).unwrap(), op.symbol(), ops::repr(&right).unwrap());
                assert_same(
                    repr_of(ops::binary(&left, op, &right)),
                    repr_of(ops::binary(&left, op, &proxy(right.clone()))),
                    &what,
                );
            }
        }
    }
}

// === Comparisons ===

#[test]
fn comparisons_with_proxy_on_the_left() {
    for left in samples() {
        for right in samples() {
            for op in COMPARE_OPS {
                let what = format!("{} {} {}", ops::repr(&left).unwrap(), op.symbol(), ops::repr(&right).unwrap());
                assert_same(
                    repr_of(ops::compare(&left, op, &right)),
                    repr_of(ops::compare(&proxy(left.clone()), op, &right)),
                    &what,
                );
            }
        }
    }
}

#[test]
fn successful_comparisons_with_proxy_on_the_right() {
    for left in samples() {
        for right in samples() {
            for op in COMPARE_OPS {
                let Ok(direct) = ops::compare(&left, op, &right) else {
                    continue;
                };
                let proxied = ops::compare(&left, op, &proxy(right.clone())).unwrap();
                assert_eq!(ops::repr(&direct).unwrap(), ops::repr(&proxied).unwrap());
            }
        }
    }
}

// === Unary operators and conversions ===

#[test]
fn unary_operators_and_conversions() {
    let conversions = [Conversion::Int, Conversion::Float, Conversion::Index, Conversion::Trunc];
    for value in samples() {
        let proxied = proxy(value.clone());
        for op in [UnaryOp::Neg, UnaryOp::Pos, UnaryOp::Abs, UnaryOp::Invert] {
            assert_same(
                repr_of(ops::unary(op, &value)),
                repr_of(ops::unary(op, &proxied)),
                op.symbol(),
            );
        }
        for conversion in conversions {
            assert_same(
                repr_of(ops::convert(&value, conversion)),
                repr_of(ops::convert(&proxied, conversion)),
                &conversion.to_string(),
            );
        }
    }
}

// === Protocols ===

#[test]
fn text_hash_truth_and_length() {
    for value in samples() {
        let proxied = proxy(value.clone());
        assert_same(ops::repr(&value), ops::repr(&proxied), "repr");
        assert_same(ops::str(&value), ops::str(&proxied), "str");
        assert_same(ops::format(&value, ""), ops::format(&proxied, ""), "format");
        assert_same(ops::hash(&value), ops::hash(&proxied), "hash");
        assert_same(ops::truthy(&value), ops::truthy(&proxied), "bool");
        assert_same(ops::len(&value), ops::len(&proxied), "len");
        assert_same(ops::contains(&value, &Value::int(1)), ops::contains(&proxied, &Value::int(1)), "in");
        assert_same(
            repr_of(ops::getitem(&value, &Value::int(0))),
            repr_of(ops::getitem(&proxied, &Value::int(0))),
            "getitem",
        );
        assert_same(
            ops::collect(&value).map(|items| items.len()),
            ops::collect(&proxied).map(|items| items.len()),
            "iter",
        );
        assert_eq!(ops::callable(&value), ops::callable(&proxied));
    }
}

#[test]
fn attribute_presence() {
    let names = ["upper", "append", "real", "__iadd__", "__len__", "__call__", "nope", "__class__"];
    for value in samples() {
        let proxied = proxy(value.clone());
        for name in names {
            assert_eq!(
                ops::hasattr(&value, name).unwrap(),
                ops::hasattr(&proxied, name).unwrap(),
                "hasattr({}, {name:?})",
                ops::repr(&value).unwrap()
            );
        }
    }
}
