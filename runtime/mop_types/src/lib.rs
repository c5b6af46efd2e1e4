//! Mop Types - the host substrate the dispatch engine runs on.
//!
//! This crate models what a managed runtime would otherwise provide through
//! reflection and class loading:
//!
//! - [`Class`] / [`ClassBuilder`]: runtime types with a single superclass,
//!   implemented interfaces and lazily introspected members
//! - [`ClassLoader`]: owns classes, notifies listeners when it is unloaded
//! - [`Introspect`]: the reflective capability, which may fail per member
//! - [`Value`]: boxed argument and receiver values
//! - [`Bootstrap`] / [`WellKnown`]: the classes every runtime starts with
//!
//! Classes only hold a weak reference to their loader, so an object of an
//! unloaded class stays usable as data while the loader and everything keyed
//! on it can be reclaimed.

mod bootstrap;
mod class;
mod flags;
mod loader;
mod members;
mod primitive;
mod type_ref;
mod value;

pub use bootstrap::{Bootstrap, WellKnown};
pub use class::{Class, ClassBuilder, ClassId, ClassRef};
pub use flags::{ClassFlags, MemberFlags};
pub use loader::{ClassLoader, LoaderError, LoaderId, WeakClassLoader};
pub use members::{
    DeclaredConstructor, DeclaredField, DeclaredMethod, Harvest, Introspect, IntrospectionError,
    InvokeError, InvokeResult, Invoker, MemberCategory, NativeFn, StaticMembers,
};
pub use primitive::Primitive;
pub use type_ref::TypeRef;
pub use value::{ArrayValue, Closure, ClosureFn, GString, Instance, SamAdapter, Value};

// Re-exported so hosts build numeric values without naming the crates directly.
pub use num_bigint::BigInt;
pub use rust_decimal::Decimal;
