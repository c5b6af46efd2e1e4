//! Class fixtures shared by the integration tests.

#![allow(dead_code, reason = "each test binary uses a subset")]

use mop_dispatch::Runtime;
use mop_types::{ClassBuilder, ClassLoader, ClassRef, DeclaredMethod, Invoker, Primitive, TypeRef, Value};

pub const INT: TypeRef = TypeRef::Primitive(Primitive::Int);
pub const LONG: TypeRef = TypeRef::Primitive(Primitive::Long);

/// A method body that returns `tag`.
pub fn tagged(tag: &str) -> Invoker {
    let tag = Value::string(tag);
    Invoker::native(move |_, _| Ok(tag.clone()))
}

/// A method body that returns its first argument.
pub fn echo() -> Invoker {
    Invoker::native(|_, args| Ok(args.first().cloned().unwrap_or(Value::Null)))
}

/// Define `name` in `loader` with one declared overload of `method` per
/// entry; each returns its tag.
pub fn define(
    runtime: &Runtime,
    loader: &ClassLoader,
    name: &str,
    method: &str,
    overloads: Vec<(&str, Vec<TypeRef>, bool)>,
) -> ClassRef {
    let method = runtime.intern(method);
    let mut builder = ClassBuilder::new(name).extends(&runtime.well_known().object);
    for (tag, params, varargs) in overloads {
        let mut declared = DeclaredMethod::new(method, params, tagged(tag));
        if varargs {
            declared = declared.with_varargs();
        }
        builder = builder.method(declared);
    }
    match loader.define(builder) {
        Ok(class) => class,
        Err(err) => panic!("fixture class {name}: {err}"),
    }
}
