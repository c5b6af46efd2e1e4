#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::{ClassBuilder, ClassLoader, InvokeError};
use mop_ir::StringInterner;
use pretty_assertions::assert_eq;

#[test]
fn primitives_report_their_type() {
    assert_eq!(Value::Int(5).primitive_type(), Some(Primitive::Int));
    assert_eq!(Value::Char('x').primitive_type(), Some(Primitive::Char));
    assert_eq!(Value::Double(1.5).primitive_type(), Some(Primitive::Double));
    assert_eq!(Value::string("x").primitive_type(), None);
    assert_eq!(Value::Null.primitive_type(), None);
}

#[test]
fn gstring_renders_once() {
    let renders = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&renders);
    let lazy = Value::closure(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Null)
    });
    let g = GString::new(
        vec![Arc::from("a="), Arc::from(", b=")],
        vec![Value::Int(1), lazy],
    );

    assert!(!g.is_rendered());
    assert_eq!(&*g.render(), "a=1, b=<closure>");
    assert!(g.is_rendered());
    assert_eq!(&*g.render(), "a=1, b=<closure>");
    // Rendering formats the closure, it never calls it.
    assert_eq!(renders.load(Ordering::SeqCst), 0);
}

#[test]
fn gstring_trailing_literal() {
    let v = Value::gstring(&["Hello, ", "!"], vec![Value::string("world")]);
    assert_eq!(v.display_string(), "Hello, world!");
}

#[test]
fn closure_arity_is_checked() {
    let add = Closure::with_arity(2, |args| match args {
        [Value::Int(a), Value::Int(b)] => Ok(Value::Int(a + b)),
        _ => Err(InvokeError::new("bad args")),
    });
    assert_eq!(add.call(&[Value::Int(1), Value::Int(2)]).unwrap(), Value::Int(3));
    let err = add.call(&[Value::Int(1)]).unwrap_err();
    assert_eq!(err.message(), "closure expects 2 argument(s), got 1");
}

#[test]
fn instances_have_null_fields_and_identity() {
    let interner = StringInterner::new();
    let loader = ClassLoader::new("app");
    let class = loader
        .define(
            ClassBuilder::new("Point")
                .field(interner.intern("x"), TypeRef::Primitive(Primitive::Int))
                .field(interner.intern("y"), TypeRef::Primitive(Primitive::Int)),
        )
        .unwrap();

    let a = Value::object(&class);
    let b = Value::object(&class);
    assert_ne!(a, b);
    assert_eq!(a, a.clone());

    let instance = a.as_object().unwrap();
    assert_eq!(instance.field(0), Some(Value::Null));
    assert!(instance.set_field(1, Value::Int(7)));
    assert_eq!(instance.field(1), Some(Value::Int(7)));
    assert!(!instance.set_field(2, Value::Int(0)));
    assert_eq!(instance.field(2), None);
}

#[test]
fn equality_is_by_variant() {
    assert_eq!(Value::Int(1), Value::Int(1));
    assert_ne!(Value::Int(1), Value::Long(1));
    assert_eq!(Value::Double(f64::NAN), Value::Double(f64::NAN));
    assert_ne!(Value::Double(0.0), Value::Double(-0.0));
    assert_eq!(
        Value::list(vec![Value::Int(1), Value::string("a")]),
        Value::list(vec![Value::Int(1), Value::string("a")])
    );
    assert_eq!(Value::big_integer(10), Value::big_integer(10));
}

#[test]
fn display_strings() {
    assert_eq!(Value::Null.display_string(), "null");
    assert_eq!(
        Value::list(vec![Value::Int(1), Value::Bool(true)]).display_string(),
        "[1, true]"
    );
    assert_eq!(Value::BigDecimal(Decimal::new(150, 2)).display_string(), "1.50");
    assert_eq!(
        Value::array(TypeRef::Primitive(Primitive::Int), vec![Value::Int(3)]).display_string(),
        "[3]"
    );
}

#[test]
fn defaults_follow_declared_type() {
    assert_eq!(Value::default_for(&TypeRef::Primitive(Primitive::Int)), Value::Int(0));
    assert_eq!(
        Value::default_for(&TypeRef::Primitive(Primitive::Boolean)),
        Value::Bool(false)
    );
    let loader = ClassLoader::new("app");
    let class = loader.define(ClassBuilder::new("Thing")).unwrap();
    assert_eq!(Value::default_for(&TypeRef::class(&class)), Value::Null);
}
