#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use crate::test_helpers::Fixture;
use mop_types::Primitive;
use pretty_assertions::assert_eq;

fn prim(p: Primitive) -> TypeRef {
    TypeRef::Primitive(p)
}

fn distance(engine: &CoercionEngine, declared: &TypeRef, value: &Value) -> Option<u32> {
    engine
        .try_coerce_value(declared, value)
        .compatible()
        .map(|c| c.distance.raw())
}

#[test]
fn exact_matches_cost_nothing() {
    let fx = Fixture::new();
    let engine = fx.engine();
    assert_eq!(distance(&engine, &prim(Primitive::Int), &Value::Int(5)), Some(0));
    assert_eq!(
        distance(&engine, &TypeRef::class(&fx.wk().string), &Value::string("x")),
        Some(0)
    );
}

#[test]
fn widening_before_boxing_before_hierarchy_through_wrappers() {
    let fx = Fixture::new();
    let wk = fx.wk();
    let engine = fx.engine();
    let five = Value::Int(5);

    let to_long = distance(&engine, &prim(Primitive::Long), &five).unwrap();
    let to_double = distance(&engine, &prim(Primitive::Double), &five).unwrap();
    let to_integer = distance(&engine, &TypeRef::class(&wk.integer), &five).unwrap();
    let to_number = distance(&engine, &TypeRef::class(&wk.number), &five).unwrap();
    let to_object = distance(&engine, &TypeRef::class(&wk.object), &five).unwrap();
    let to_boxed_long = distance(&engine, &TypeRef::class(&wk.long), &five).unwrap();

    assert_eq!(to_long, 1);
    assert!(to_long < to_double);
    assert!(to_double < to_integer);
    assert_eq!(to_integer, Distance::BOXING.raw());
    assert_eq!(to_number, Distance::BOXING.raw() + 1);
    assert_eq!(to_object, Distance::BOXING.raw() + 2 + Distance::OBJECT.raw());
    assert_eq!(to_boxed_long, Distance::BOXING.raw() + 1);
}

#[test]
fn widening_converts_the_value() {
    let fx = Fixture::new();
    let engine = fx.engine();
    let coercion = engine
        .try_coerce_value(&prim(Primitive::Long), &Value::Int(5))
        .compatible()
        .unwrap();
    assert_eq!(coercion.conversion, Conversion::Widen(NumKind::Long));
    assert_eq!(
        engine.convert(&coercion.conversion, Value::Int(5)).unwrap(),
        Value::Long(5)
    );
}

#[test]
fn lossy_and_narrowing_are_rejected() {
    let fx = Fixture::new();
    let engine = fx.engine();
    assert_eq!(
        engine.try_coerce_value(&prim(Primitive::Float), &Value::Int(1)),
        CoercionOutcome::Lossy
    );
    assert_eq!(
        engine.try_coerce_value(&prim(Primitive::Int), &Value::Long(1)),
        CoercionOutcome::Incompatible
    );
    assert_eq!(
        engine.try_coerce_value(&prim(Primitive::Int), &Value::string("1")),
        CoercionOutcome::Incompatible
    );
}

#[test]
fn null_fits_references_only() {
    let fx = Fixture::new();
    let engine = fx.engine();
    assert_eq!(
        distance(&engine, &TypeRef::class(&fx.wk().object), &Value::Null),
        Some(Distance::NULL.raw())
    );
    assert_eq!(
        distance(&engine, &TypeRef::class(&fx.wk().string), &Value::Null),
        Some(Distance::NULL.raw())
    );
    assert_eq!(distance(&engine, &prim(Primitive::Int), &Value::Null), None);
}

#[test]
fn gstring_interchanges_with_string() {
    let fx = Fixture::new();
    let wk = fx.wk();
    let engine = fx.engine();
    let g = Value::gstring(&["n=", ""], vec![Value::Int(3)]);

    let coercion = engine
        .try_coerce_value(&TypeRef::class(&wk.string), &g)
        .compatible()
        .unwrap();
    assert_eq!(coercion.distance, Distance::STRING_INTERCHANGE);
    assert_eq!(
        engine.convert(&coercion.conversion, g.clone()).unwrap(),
        Value::string("n=3")
    );
    assert_eq!(
        distance(&engine, &TypeRef::class(&wk.char_sequence), &g),
        Some(1)
    );
}

#[test]
fn closures_adapt_to_functional_interfaces() {
    let fx = Fixture::new();
    let wk = fx.wk();
    let engine = fx.engine();
    let closure = Value::closure(|_| Ok(Value::Null));

    let coercion = engine
        .try_coerce_value(&TypeRef::class(&wk.runnable), &closure)
        .compatible()
        .unwrap();
    assert_eq!(coercion.distance, Distance::SAM_ADAPTATION);
    let adapted = engine.convert(&coercion.conversion, closure.clone()).unwrap();
    let Value::Sam(adapter) = adapted else {
        panic!("expected an adapter, got {adapted:?}");
    };
    assert_eq!(adapter.interface.id(), wk.runnable.id());

    // Not functional.
    assert_eq!(
        distance(&engine, &TypeRef::class(&wk.collection), &closure),
        None
    );
    // A direct supertype match beats adaptation.
    assert_eq!(
        distance(&engine, &TypeRef::class(&wk.object), &closure),
        Some(1 + Distance::OBJECT.raw())
    );

    let disabled = CoercionEngine::new(wk.clone(), false);
    assert_eq!(
        distance(&disabled, &TypeRef::class(&wk.runnable), &closure),
        None
    );
}

#[test]
fn collections_convert_to_arrays() {
    let fx = Fixture::new();
    let engine = fx.engine();
    let declared = TypeRef::array_of(prim(Primitive::Long));
    let list = Value::list(vec![Value::Int(1), Value::Int(2)]);

    let coercion = engine.try_coerce_value(&declared, &list).compatible().unwrap();
    assert_eq!(coercion.distance, Distance::COLLECTION_TO_ARRAY);
    assert_eq!(
        engine.convert(&coercion.conversion, list).unwrap(),
        Value::array(prim(Primitive::Long), vec![Value::Long(1), Value::Long(2)])
    );

    let bad = Value::list(vec![Value::string("x")]);
    let err = engine.convert(&coercion.conversion, bad).unwrap_err();
    assert_eq!(
        err,
        DispatchError::ArgumentMismatch {
            expected: "long".to_owned(),
            actual: "String".to_owned(),
        }
    );
    assert_eq!(
        distance(&engine, &declared, &Value::string("x")),
        None
    );
}

#[test]
fn reference_arrays_are_covariant() {
    let fx = Fixture::new();
    let wk = fx.wk();
    let engine = fx.engine();
    let strings = Value::array(TypeRef::class(&wk.string), vec![]);

    assert_eq!(
        distance(&engine, &TypeRef::array_of(TypeRef::class(&wk.object)), &strings),
        Some(1)
    );
    assert_eq!(
        distance(&engine, &TypeRef::class(&wk.object), &strings),
        Some(1 + Distance::OBJECT.raw())
    );
    let ints = Value::array(prim(Primitive::Int), vec![]);
    assert_eq!(
        distance(&engine, &TypeRef::array_of(prim(Primitive::Long)), &ints),
        None
    );
}

#[test]
fn plan_packs_trailing_arguments() {
    let fx = Fixture::new();
    let engine = fx.engine();
    let plan = CoercionPlan {
        conversions: SmallVec::from_vec(vec![
            Conversion::Identity,
            Conversion::Widen(NumKind::Long),
            Conversion::Widen(NumKind::Long),
        ]),
        pack: Some(VarargPack {
            start: 1,
            component: prim(Primitive::Long),
        }),
    };
    let args = vec![Value::string("a"), Value::Int(1), Value::Int(2)];
    assert_eq!(
        plan.apply(&engine, args).unwrap(),
        vec![
            Value::string("a"),
            Value::array(prim(Primitive::Long), vec![Value::Long(1), Value::Long(2)]),
        ]
    );

    let empty_tail = CoercionPlan {
        conversions: SmallVec::new(),
        pack: Some(VarargPack {
            start: 0,
            component: prim(Primitive::Int),
        }),
    };
    assert_eq!(
        empty_tail.apply(&engine, vec![]).unwrap(),
        vec![Value::array(prim(Primitive::Int), vec![])]
    );
}

#[test]
fn interface_arguments_reach_object() {
    let fx = Fixture::new();
    let engine = fx.engine();
    let runnable = TypeRef::class(&fx.wk().runnable);
    let object = TypeRef::class(&fx.wk().object);
    assert_eq!(
        engine.try_coerce(&object, &Some(runnable)).compatible().map(|c| c.distance),
        Some(Distance::hierarchy(1) + Distance::OBJECT)
    );
}

#[test]
fn interfaces_rank_ahead_of_object() {
    let fx = Fixture::new();
    let wk = fx.wk();
    let engine = fx.engine();
    let text = Value::string("x");
    let to_object = distance(&engine, &TypeRef::class(&wk.object), &text).unwrap();
    let to_char_sequence = distance(&engine, &TypeRef::class(&wk.char_sequence), &text).unwrap();
    let to_comparable = distance(&engine, &TypeRef::class(&wk.comparable), &text).unwrap();
    assert_eq!(to_char_sequence, 1);
    assert_eq!(to_comparable, 1);
    assert!(to_char_sequence < to_object);

    let five = Value::Int(5);
    let boxed_comparable = distance(&engine, &TypeRef::class(&wk.comparable), &five).unwrap();
    let boxed_object = distance(&engine, &TypeRef::class(&wk.object), &five).unwrap();
    assert!(boxed_comparable < boxed_object);
}

#[test]
fn checked_plans_hand_back_values_that_do_not_fit() {
    let fx = Fixture::new();
    let engine = fx.engine();
    let to_decimal = engine
        .try_coerce_value(&TypeRef::class(&fx.wk().big_decimal), &Value::Double(1e30))
        .compatible()
        .unwrap();
    let plan = CoercionPlan {
        conversions: SmallVec::from_vec(vec![to_decimal.conversion]),
        pack: None,
    };

    match plan.apply_checked(&engine, vec![Value::Double(1e30)]).unwrap() {
        Applied::Overflow(args) => assert_eq!(args, vec![Value::Double(1e30)]),
        Applied::Ready(args) => panic!("1e30 must not fit a BigDecimal, got {args:?}"),
    }
    assert!(matches!(
        plan.apply_checked(&engine, vec![Value::Double(0.5)]).unwrap(),
        Applied::Ready(_)
    ));
    assert!(matches!(
        plan.apply(&engine, vec![Value::Double(f64::NAN)]),
        Err(DispatchError::CoercionOverflow { .. })
    ));
}
