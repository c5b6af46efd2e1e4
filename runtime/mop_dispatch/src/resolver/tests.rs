#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use crate::descriptor::DescriptorCache;
use crate::registry::{BucketKey, LookupScope, MethodRegistry};
use crate::test_helpers::Fixture;
use mop_types::{ClassBuilder, ClassLoader, DeclaredMethod, Invoker, Primitive, TypeRef};
use pretty_assertions::assert_eq;

const INT: TypeRef = TypeRef::Primitive(Primitive::Int);
const LONG: TypeRef = TypeRef::Primitive(Primitive::Long);

struct Harness {
    fx: Fixture,
    loader: ClassLoader,
    registry: MethodRegistry,
    engine: CoercionEngine,
}

impl Harness {
    fn new() -> Self {
        let fx = Fixture::new();
        let init = fx.interner.intern("<init>");
        let registry = MethodRegistry::new(DescriptorCache::new(&fx.wk().object, init), init, true);
        let engine = fx.engine();
        Self {
            fx,
            loader: ClassLoader::new("test"),
            registry,
            engine,
        }
    }

    fn ty(&self, class: &ClassRef) -> TypeRef {
        TypeRef::class(class)
    }

    /// Define `name` with one `m` overload per parameter list.
    fn class(&self, name: &str, parent: Option<&ClassRef>, overloads: Vec<(Vec<TypeRef>, bool)>) -> ClassRef {
        let m = self.fx.interner.intern("m");
        let mut builder = ClassBuilder::new(name).extends(parent.unwrap_or(&self.fx.wk().object));
        for (params, varargs) in overloads {
            let mut method = DeclaredMethod::new(m, params, Invoker::native(|_, _| Ok(Value::Null)));
            if varargs {
                method = method.with_varargs();
            }
            builder = builder.method(method);
        }
        self.loader.define(builder).unwrap()
    }

    fn resolve(&self, class: &ClassRef, args: &[Value]) -> MethodResolution {
        let descriptor = self.registry.descriptor(class).unwrap();
        let key = BucketKey::new(self.fx.interner.intern("m"), LookupScope::Instance);
        let bucket = self.registry.lookup(&descriptor, key);
        OverloadResolver::new(&self.engine).resolve_values(&bucket, args)
    }

    fn winner(&self, class: &ClassRef, args: &[Value]) -> (String, u32) {
        match self.resolve(class, args) {
            MethodResolution::Resolved(call) => (
                call.candidate.describe(&self.fx.interner),
                call.distance.raw(),
            ),
            other => panic!("expected a resolution, got {other:?}"),
        }
    }
}

#[test]
fn exact_matches_pick_their_overload() {
    let h = Harness::new();
    let string = h.ty(&h.fx.wk().string);
    let t = h.class("T", None, vec![(vec![INT], false), (vec![string], false)]);
    assert_eq!(h.winner(&t, &[Value::Int(5)]), ("T.m(int)".to_owned(), 0));
    assert_eq!(h.winner(&t, &[Value::string("x")]), ("T.m(String)".to_owned(), 0));
}

#[test]
fn widening_is_accepted_with_positive_distance() {
    let h = Harness::new();
    let t = h.class("T", None, vec![(vec![LONG], false)]);
    let (name, distance) = h.winner(&t, &[Value::Int(5)]);
    assert_eq!(name, "T.m(long)");
    assert!(distance > 0);
}

#[test]
fn subtype_beats_object() {
    let h = Harness::new();
    let object = h.ty(&h.fx.wk().object);
    let string = h.ty(&h.fx.wk().string);
    let t = h.class("T", None, vec![(vec![object], false), (vec![string], false)]);
    assert_eq!(h.winner(&t, &[Value::string("x")]).0, "T.m(String)");
}

#[test]
fn interface_parameters_beat_object() {
    let h = Harness::new();
    let object = h.ty(&h.fx.wk().object);
    let char_sequence = h.ty(&h.fx.wk().char_sequence);
    let comparable = h.ty(&h.fx.wk().comparable);
    let t = h.class(
        "T",
        None,
        vec![(vec![object.clone()], false), (vec![char_sequence], false)],
    );
    assert_eq!(h.winner(&t, &[Value::string("x")]), ("T.m(CharSequence)".to_owned(), 1));

    let u = h.class("U", None, vec![(vec![object], false), (vec![comparable], false)]);
    assert_eq!(h.winner(&u, &[Value::string("x")]).0, "U.m(Comparable)");
    assert_eq!(h.winner(&u, &[Value::Int(1)]).0, "U.m(Comparable)");
}

#[test]
fn null_against_two_references_is_ambiguous() {
    let h = Harness::new();
    let object = h.ty(&h.fx.wk().object);
    let string = h.ty(&h.fx.wk().string);
    let t = h.class("T", None, vec![(vec![object], false), (vec![string], false)]);
    match h.resolve(&t, &[Value::Null]) {
        MethodResolution::Ambiguous(tied) => assert_eq!(tied.len(), 2),
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[test]
fn exact_arity_tier_wins_over_varargs() {
    let h = Harness::new();
    let t = h.class(
        "T",
        None,
        vec![(vec![INT, INT], false), (vec![TypeRef::array_of(INT)], true)],
    );
    let call = h.resolve(&t, &[Value::Int(1), Value::Int(2)]);
    let call = call.resolved().unwrap();
    assert_eq!(call.tier, Tier::ExactArity);
    assert_eq!(call.candidate.describe(&h.fx.interner), "T.m(int, int)");

    let spread = h.resolve(&t, &[Value::Int(1), Value::Int(2), Value::Int(3)]);
    let spread = spread.resolved().unwrap();
    assert_eq!(spread.tier, Tier::Varargs);
    assert_eq!(spread.plan.pack.as_ref().map(|p| p.start), Some(0));

    let none = h.resolve(&t, &[]);
    assert_eq!(none.resolved().map(|c| c.tier), Some(Tier::Varargs));
}

#[test]
fn vararg_candidate_accepts_an_array_directly() {
    let h = Harness::new();
    let t = h.class("T", None, vec![(vec![TypeRef::array_of(INT)], true)]);
    let array = Value::array(INT, vec![Value::Int(1)]);
    let call = h.resolve(&t, &[array]);
    let call = call.resolved().unwrap();
    assert_eq!(call.tier, Tier::ExactArity);
    assert!(call.plan.pack.is_none());
}

#[test]
fn incompatible_trailing_argument_is_no_match() {
    let h = Harness::new();
    let t = h.class("T", None, vec![(vec![TypeRef::array_of(INT)], true)]);
    assert!(h.resolve(&t, &[Value::Int(1), Value::string("x")]).is_no_match());
}

#[test]
fn ties_go_to_the_more_derived_declaring_type() {
    let h = Harness::new();
    let long = h.ty(&h.fx.wk().long);
    let number = h.ty(&h.fx.wk().number);
    // int -> Long and int -> Number both cost 11.
    let parent = h.class("Parent", None, vec![(vec![long], false)]);
    let child = h.class("Child", Some(&parent), vec![(vec![number], false)]);
    assert_eq!(
        h.winner(&child, &[Value::Int(1)]),
        ("Child.m(Number)".to_owned(), 11)
    );
}

#[test]
fn same_type_ties_are_ambiguous() {
    let h = Harness::new();
    let long = h.ty(&h.fx.wk().long);
    let number = h.ty(&h.fx.wk().number);
    let t = h.class("T", None, vec![(vec![long], false), (vec![number], false)]);
    let MethodResolution::Ambiguous(tied) = h.resolve(&t, &[Value::Int(1)]) else {
        panic!("expected ambiguity");
    };
    let names: Vec<String> = tied.iter().map(|c| c.describe(&h.fx.interner)).collect();
    assert_eq!(names, vec!["T.m(Long)", "T.m(Number)"]);
}

#[test]
fn ties_prefer_the_non_vararg_candidate() {
    let h = Harness::new();
    let objects = TypeRef::array_of(h.ty(&h.fx.wk().object));
    let t = h.class(
        "T",
        None,
        vec![(vec![objects.clone()], true), (vec![objects.clone()], false)],
    );
    let array = Value::array(h.ty(&h.fx.wk().object), vec![]);
    let call = h.resolve(&t, &[array]);
    assert!(!call.resolved().unwrap().candidate.is_varargs());
}

#[test]
fn compatible_lists_every_accepting_candidate() {
    let h = Harness::new();
    let object = h.ty(&h.fx.wk().object);
    let string = h.ty(&h.fx.wk().string);
    let t = h.class(
        "T",
        None,
        vec![(vec![object], false), (vec![string], false), (vec![INT], false)],
    );
    let descriptor = h.registry.descriptor(&t).unwrap();
    let bucket = h
        .registry
        .lookup(&descriptor, BucketKey::new(h.fx.interner.intern("m"), LookupScope::Instance));
    let shapes = [h.engine.shape_of(&Value::string("x"))];
    let accepting = OverloadResolver::new(&h.engine).compatible(&bucket, &shapes);
    assert_eq!(accepting.len(), 2);
}

#[test]
fn resolution_is_deterministic() {
    let h = Harness::new();
    let long = h.ty(&h.fx.wk().long);
    let t = h.class("T", None, vec![(vec![LONG], false), (vec![long], false)]);
    let first = h.winner(&t, &[Value::Int(3)]);
    for _ in 0..10 {
        assert_eq!(h.winner(&t, &[Value::Int(3)]), first);
    }
    assert_eq!(first.0, "T.m(long)");
}

#[test]
fn excluded_candidates_yield_to_the_next_best() {
    let h = Harness::new();
    let object = h.ty(&h.fx.wk().object);
    let decimal = h.ty(&h.fx.wk().big_decimal);
    let t = h.class("T", None, vec![(vec![decimal], false), (vec![object], false)]);
    let descriptor = h.registry.descriptor(&t).unwrap();
    let bucket = h
        .registry
        .lookup(&descriptor, BucketKey::new(h.fx.interner.intern("m"), LookupScope::Instance));
    let shapes = [h.engine.shape_of(&Value::Double(1.0))];
    let resolver = OverloadResolver::new(&h.engine);

    let first = resolver.resolve(&bucket, &shapes);
    let first = first.resolved().unwrap();
    assert_eq!(first.candidate.describe(&h.fx.interner), "T.m(BigDecimal)");

    let excluded = [Arc::clone(&first.candidate)];
    let second = resolver.resolve_excluding(&bucket, &shapes, &excluded);
    assert_eq!(second.resolved().unwrap().candidate.describe(&h.fx.interner), "T.m(Object)");

    let everything: Vec<_> = bucket.candidates().to_vec();
    assert!(resolver.resolve_excluding(&bucket, &shapes, &everything).is_no_match());
}
