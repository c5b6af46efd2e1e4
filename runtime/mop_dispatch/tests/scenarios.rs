//! End-to-end dispatch scenarios.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

mod common;

use common::{define, echo, tagged, INT, LONG};
use mop_dispatch::{DispatchError, DynamicMethod, LookupScope, MethodResolution, Runtime, Tier};
use mop_types::{ClassBuilder, ClassLoader, DeclaredMethod, TypeRef, Value};
use pretty_assertions::assert_eq;

#[test]
fn overloads_by_exact_type() {
    let rt = Runtime::new();
    let loader = ClassLoader::new("app");
    let string = TypeRef::class(&rt.well_known().string);
    let t = define(
        &rt,
        &loader,
        "T",
        "foo",
        vec![("int", vec![INT], false), ("string", vec![string], false)],
    );
    let receiver = Value::object(&t);
    let site = rt.call_site();
    assert_eq!(
        rt.invoke_method(site, &receiver, "foo", vec![Value::Int(5)]).unwrap(),
        Value::string("int")
    );
    assert_eq!(
        rt.invoke_method(site, &receiver, "foo", vec![Value::string("x")]).unwrap(),
        Value::string("string")
    );

    let foo = rt.intern("foo");
    let resolution = rt.resolve(&t, foo, LookupScope::Instance, &[Value::Int(5)]).unwrap();
    assert_eq!(resolution.resolved().unwrap().distance.raw(), 0);
}

#[test]
fn widening_reaches_a_long_parameter() {
    let rt = Runtime::new();
    let loader = ClassLoader::new("app");
    let foo = rt.intern("foo");
    let t = loader
        .define(
            ClassBuilder::new("T")
                .extends(&rt.well_known().object)
                .method(DeclaredMethod::new(foo, vec![LONG], echo())),
        )
        .unwrap();
    let site = rt.call_site();
    let result = rt.invoke(site, &Value::object(&t), foo, vec![Value::Int(5)]).unwrap();
    assert_eq!(result, Value::Long(5));

    let resolution = rt.resolve(&t, foo, LookupScope::Instance, &[Value::Int(5)]).unwrap();
    assert!(resolution.resolved().unwrap().distance.raw() > 0);
}

#[test]
fn unrelated_registration_forces_one_harmless_re_resolution() {
    let rt = Runtime::new();
    let loader = ClassLoader::new("app");
    let t = define(&rt, &loader, "T", "baz", vec![("baz", vec![], false)]);
    let receiver = Value::object(&t);
    let site = rt.call_site();
    let baz = rt.intern("baz");

    assert_eq!(rt.invoke(site, &receiver, baz, vec![]).unwrap(), Value::string("baz"));
    assert_eq!(rt.invoke(site, &receiver, baz, vec![]).unwrap(), Value::string("baz"));
    assert_eq!(rt.call_site_stats(site).unwrap().misses, 1);

    let bar = rt.intern("bar");
    rt.register_method(&t, DynamicMethod::instance(bar, vec![], tagged("bar")))
        .unwrap();

    assert_eq!(rt.invoke(site, &receiver, baz, vec![]).unwrap(), Value::string("baz"));
    let stats = rt.call_site_stats(site).unwrap();
    assert_eq!((stats.hits, stats.misses), (1, 2));
    assert_eq!(rt.invoke(site, &receiver, baz, vec![]).unwrap(), Value::string("baz"));
    assert_eq!(rt.call_site_stats(site).unwrap().hits, 2);
}

#[test]
fn subtype_parameter_beats_object() {
    let rt = Runtime::new();
    let loader = ClassLoader::new("app");
    let object = TypeRef::class(&rt.well_known().object);
    let string = TypeRef::class(&rt.well_known().string);
    let t = define(
        &rt,
        &loader,
        "T",
        "m",
        vec![("object", vec![object], false), ("string", vec![string], false)],
    );
    let site = rt.call_site();
    assert_eq!(
        rt.invoke_method(site, &Value::object(&t), "m", vec![Value::string("x")])
            .unwrap(),
        Value::string("string")
    );
}

#[test]
fn interface_parameter_beats_object() {
    let rt = Runtime::new();
    let loader = ClassLoader::new("app");
    let wk = rt.well_known();
    let t = define(
        &rt,
        &loader,
        "T",
        "m",
        vec![
            ("object", vec![TypeRef::class(&wk.object)], false),
            ("charseq", vec![TypeRef::class(&wk.char_sequence)], false),
        ],
    );
    let site = rt.call_site();
    assert_eq!(
        rt.invoke_method(site, &Value::object(&t), "m", vec![Value::string("x")]).unwrap(),
        Value::string("charseq")
    );
}

#[test]
fn out_of_range_double_skips_the_big_decimal_overload() {
    let rt = Runtime::new();
    let loader = ClassLoader::new("app");
    let wk = rt.well_known();
    let t = define(
        &rt,
        &loader,
        "T",
        "m",
        vec![
            ("bigdecimal", vec![TypeRef::class(&wk.big_decimal)], false),
            ("object", vec![TypeRef::class(&wk.object)], false),
        ],
    );
    let receiver = Value::object(&t);
    let site = rt.call_site();
    assert_eq!(
        rt.invoke_method(site, &receiver, "m", vec![Value::Double(1e30)]).unwrap(),
        Value::string("object")
    );
    assert_eq!(
        rt.invoke_method(site, &receiver, "m", vec![Value::Double(0.25)]).unwrap(),
        Value::string("bigdecimal")
    );
}

#[test]
fn exact_arity_beats_varargs() {
    let rt = Runtime::new();
    let loader = ClassLoader::new("app");
    let t = define(
        &rt,
        &loader,
        "T",
        "m",
        vec![
            ("pair", vec![INT, INT], false),
            ("spread", vec![TypeRef::array_of(INT)], true),
        ],
    );
    let receiver = Value::object(&t);
    let site = rt.call_site();
    assert_eq!(
        rt.invoke_method(site, &receiver, "m", vec![Value::Int(1), Value::Int(2)])
            .unwrap(),
        Value::string("pair")
    );
    assert_eq!(
        rt.invoke_method(site, &receiver, "m", vec![Value::Int(1), Value::Int(2), Value::Int(3)])
            .unwrap(),
        Value::string("spread")
    );

    let m = rt.intern("m");
    let resolution = rt
        .resolve(&t, m, LookupScope::Instance, &[Value::Int(1), Value::Int(2)])
        .unwrap();
    assert_eq!(resolution.resolved().unwrap().tier, Tier::ExactArity);
}

#[test]
fn varargs_receive_a_packed_array() {
    let rt = Runtime::new();
    let loader = ClassLoader::new("app");
    let sum = rt.intern("sum");
    let t = loader
        .define(
            ClassBuilder::new("T").extends(&rt.well_known().object).method(
                DeclaredMethod::new(
                    sum,
                    vec![TypeRef::array_of(LONG)],
                    mop_types::Invoker::native(|_, args| match &args[0] {
                        Value::Array(items) => Ok(Value::Long(
                            items
                                .elements
                                .iter()
                                .map(|v| match v {
                                    Value::Long(n) => *n,
                                    _ => 0,
                                })
                                .sum(),
                        )),
                        _ => Ok(Value::Null),
                    }),
                )
                .with_varargs(),
            ),
        )
        .unwrap();
    let site = rt.call_site();
    let result = rt
        .invoke(site, &Value::object(&t), sum, vec![Value::Int(1), Value::Int(2), Value::Long(3)])
        .unwrap();
    assert_eq!(result, Value::Long(6));
}

#[test]
fn unloaded_receiver_type_fails_cleanly() {
    let rt = Runtime::new();
    let loader = ClassLoader::new("plugin");
    let t = define(&rt, &loader, "T", "m", vec![("old", vec![], false)]);
    let stale = Value::object(&t);
    let site = rt.call_site();
    assert_eq!(rt.invoke_method(site, &stale, "m", vec![]).unwrap(), Value::string("old"));

    let descriptors = rt.registry().descriptors().descriptor_count();
    drop(loader);
    assert!(rt.registry().descriptors().descriptor_count() < descriptors);

    assert_eq!(
        rt.invoke_method(site, &stale, "m", vec![]),
        Err(DispatchError::TargetUnloaded {
            type_name: "T".to_owned()
        })
    );

    let reloaded = ClassLoader::new("plugin");
    let fresh = define(&rt, &reloaded, "T", "m", vec![("new", vec![], false)]);
    assert_eq!(
        rt.invoke_method(site, &Value::object(&fresh), "m", vec![]).unwrap(),
        Value::string("new")
    );
}

#[test]
fn ambiguity_reports_every_tied_candidate() {
    let rt = Runtime::new();
    let loader = ClassLoader::new("app");
    let wk = rt.well_known();
    let t = define(
        &rt,
        &loader,
        "T",
        "m",
        vec![
            ("long", vec![TypeRef::class(&wk.long)], false),
            ("number", vec![TypeRef::class(&wk.number)], false),
        ],
    );
    let site = rt.call_site();
    let err = rt
        .invoke_method(site, &Value::object(&t), "m", vec![Value::Int(1)])
        .unwrap_err();
    assert!(err.is_resolution_failure());
    assert_eq!(
        err,
        DispatchError::AmbiguousMethod {
            receiver_type: "T".to_owned(),
            name: "m".to_owned(),
            arg_types: vec!["int".to_owned()],
            candidates: vec!["T.m(Long)".to_owned(), "T.m(Number)".to_owned()],
        }
    );

    let m = rt.intern("m");
    assert!(matches!(
        rt.resolve(&t, m, LookupScope::Instance, &[Value::Int(1)]).unwrap(),
        MethodResolution::Ambiguous(_)
    ));
}

#[test]
fn gstrings_and_lists_coerce_into_parameters() {
    let rt = Runtime::new();
    let loader = ClassLoader::new("app");
    let wk = rt.well_known();
    let take = rt.intern("take");
    let t = loader
        .define(
            ClassBuilder::new("T")
                .extends(&wk.object)
                .method(DeclaredMethod::new(take, vec![TypeRef::class(&wk.string)], echo()))
                .method(DeclaredMethod::new(
                    take,
                    vec![TypeRef::array_of(TypeRef::class(&wk.integer))],
                    echo(),
                )),
        )
        .unwrap();
    let receiver = Value::object(&t);
    let site = rt.call_site();

    let rendered = rt
        .invoke(site, &receiver, take, vec![Value::gstring(&["a", "c"], vec![Value::Int(2)])])
        .unwrap();
    assert_eq!(rendered, Value::string("a2c"));

    let array = rt
        .invoke(site, &receiver, take, vec![Value::list(vec![Value::Int(1), Value::Int(2)])])
        .unwrap();
    let Value::Array(array) = array else {
        panic!("expected an array, got {array:?}");
    };
    assert_eq!(array.elements, vec![Value::Int(1), Value::Int(2)]);

    assert!(matches!(
        rt.invoke(site, &receiver, take, vec![Value::list(vec![Value::string("x")])]),
        Err(DispatchError::ArgumentMismatch { .. })
    ));
}
