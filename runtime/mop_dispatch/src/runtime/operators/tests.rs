#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use crate::candidate::DynamicMethod;
use mop_types::{Invoker, TypeRef};
use pretty_assertions::assert_eq;

fn eval(rt: &Runtime, op: BinaryOp, lhs: Value, rhs: Value) -> DispatchResult<Value> {
    let site = rt.call_site();
    rt.invoke_binary(site, op, &lhs, &rhs)
}

#[test]
fn integers_stay_integers_until_they_cannot() {
    let rt = Runtime::new();
    assert_eq!(eval(&rt, BinaryOp::Plus, Value::Int(2), Value::Int(3)).unwrap(), Value::Int(5));
    assert_eq!(
        eval(&rt, BinaryOp::Multiply, Value::Int(2), Value::Long(3)).unwrap(),
        Value::Long(6)
    );
    assert_eq!(
        eval(&rt, BinaryOp::Plus, Value::Byte(1), Value::Char('a')).unwrap(),
        Value::Int(98)
    );
    assert_eq!(
        eval(&rt, BinaryOp::Minus, Value::big_integer(10), Value::Int(4)).unwrap(),
        Value::big_integer(6)
    );
}

#[test]
fn floating_operands_promote_to_double() {
    let rt = Runtime::new();
    assert_eq!(
        eval(&rt, BinaryOp::Plus, Value::Int(1), Value::Float(0.5)).unwrap(),
        Value::Double(1.5)
    );
    assert_eq!(
        eval(&rt, BinaryOp::Div, Value::Double(1.0), Value::Double(4.0)).unwrap(),
        Value::Double(0.25)
    );
}

#[test]
fn integer_division_is_exact() {
    let rt = Runtime::new();
    assert_eq!(
        eval(&rt, BinaryOp::Div, Value::Int(1), Value::Int(2)).unwrap(),
        Value::BigDecimal(Decimal::new(5, 1))
    );
    assert_eq!(
        eval(&rt, BinaryOp::Div, Value::Int(6), Value::Int(3)).unwrap(),
        Value::BigDecimal(Decimal::from(2))
    );
}

#[test]
fn overflow_and_zero_divisors_are_errors() {
    let rt = Runtime::new();
    assert!(matches!(
        eval(&rt, BinaryOp::Plus, Value::Int(i32::MAX), Value::Int(1)),
        Err(DispatchError::Arithmetic(_))
    ));
    assert!(matches!(
        eval(&rt, BinaryOp::Div, Value::Int(1), Value::Int(0)),
        Err(DispatchError::Arithmetic(_))
    ));
    assert!(matches!(
        eval(&rt, BinaryOp::Mod, Value::Long(1), Value::Long(0)),
        Err(DispatchError::Arithmetic(_))
    ));
}

#[test]
fn comparisons_work_across_kinds() {
    let rt = Runtime::new();
    assert_eq!(
        eval(&rt, BinaryOp::Less, Value::Int(1), Value::Double(1.5)).unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        eval(&rt, BinaryOp::Equals, Value::Long(2), Value::Int(2)).unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        eval(&rt, BinaryOp::Compare, Value::Int(3), Value::Int(2)).unwrap(),
        Value::Int(1)
    );
}

#[test]
fn strings_concatenate_and_compare() {
    let rt = Runtime::new();
    assert_eq!(
        eval(&rt, BinaryOp::Plus, Value::string("n="), Value::Int(4)).unwrap(),
        Value::string("n=4")
    );
    assert_eq!(
        eval(&rt, BinaryOp::Less, Value::string("apple"), Value::string("banana")).unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        eval(
            &rt,
            BinaryOp::Equals,
            Value::gstring(&["ab"], vec![]),
            Value::string("ab")
        )
        .unwrap(),
        Value::Bool(true)
    );
}

#[test]
fn other_operands_dispatch_the_operator_method() {
    let rt = Runtime::new();
    let wk = rt.well_known().clone();
    let plus = rt.intern("plus");
    rt.register_method(
        &wk.array_list,
        DynamicMethod::instance(
            plus,
            vec![TypeRef::class(&wk.object)],
            Invoker::native(|recv, args| {
                let mut items = recv.as_list().unwrap_or_default().to_vec();
                items.extend(args.iter().cloned());
                Ok(Value::list(items))
            }),
        ),
    )
    .unwrap();
    let result = eval(&rt, BinaryOp::Plus, Value::list(vec![Value::Int(1)]), Value::Int(2)).unwrap();
    assert_eq!(result, Value::list(vec![Value::Int(1), Value::Int(2)]));

    assert_eq!(
        eval(&rt, BinaryOp::NotEquals, Value::Null, Value::Null).unwrap(),
        Value::Bool(false)
    );
    assert!(matches!(
        eval(&rt, BinaryOp::Minus, Value::list(vec![]), Value::Int(1)),
        Err(DispatchError::NoApplicableMethod { .. })
    ));
}
