//! The class set every runtime starts with.
//!
//! [`Bootstrap::new`] defines the core hierarchy in a dedicated system loader:
//!
//! ```text
//! Object
//! ├── Number: Byte Short Integer Long Float Double BigInteger BigDecimal
//! └── Boolean Character String GString Closure ArrayList Class NullObject
//! interfaces: CharSequence Comparable Collection List Runnable Comparator
//! ```
//!
//! [`WellKnown`] maps runtime values to these classes: a primitive argument
//! keeps its primitive type, a primitive receiver boxes to its wrapper, and
//! null receivers dispatch on `NullObject`.

mod natives;

use std::sync::{Arc, OnceLock};

use mop_ir::StringInterner;

use crate::members::StaticMembers;
use crate::{
    ClassBuilder, ClassFlags, ClassLoader, ClassRef, DeclaredConstructor, DeclaredField,
    DeclaredMethod, Harvest, Introspect, Invoker, Primitive, TypeRef, Value,
};

/// Handles to the bootstrap classes.
#[derive(Clone, Debug)]
pub struct WellKnown {
    pub object: ClassRef,
    pub number: ClassRef,
    pub boolean: ClassRef,
    pub byte: ClassRef,
    pub short: ClassRef,
    pub character: ClassRef,
    pub integer: ClassRef,
    pub long: ClassRef,
    pub float: ClassRef,
    pub double: ClassRef,
    pub big_integer: ClassRef,
    pub big_decimal: ClassRef,
    pub char_sequence: ClassRef,
    pub comparable: ClassRef,
    pub string: ClassRef,
    pub gstring: ClassRef,
    pub closure: ClassRef,
    pub collection: ClassRef,
    pub list: ClassRef,
    pub array_list: ClassRef,
    pub runnable: ClassRef,
    pub comparator: ClassRef,
    pub class: ClassRef,
    pub null_object: ClassRef,
}

impl WellKnown {
    /// The wrapper class a primitive boxes to.
    pub fn wrapper(&self, primitive: Primitive) -> &ClassRef {
        match primitive {
            Primitive::Boolean => &self.boolean,
            Primitive::Byte => &self.byte,
            Primitive::Short => &self.short,
            Primitive::Char => &self.character,
            Primitive::Int => &self.integer,
            Primitive::Long => &self.long,
            Primitive::Float => &self.float,
            Primitive::Double => &self.double,
        }
    }

    /// The class whose methods a value responds to when used as a receiver.
    pub fn receiver_class(&self, value: &Value) -> ClassRef {
        ClassRef::clone(self.class_of(value))
    }

    /// Borrowing form of [`receiver_class`](Self::receiver_class).
    pub fn class_of<'a>(&'a self, value: &'a Value) -> &'a ClassRef {
        match value {
            Value::Null => &self.null_object,
            Value::BigInteger(_) => &self.big_integer,
            Value::BigDecimal(_) => &self.big_decimal,
            Value::Str(_) => &self.string,
            Value::GString(_) => &self.gstring,
            Value::List(_) => &self.array_list,
            Value::Array(_) => &self.object,
            Value::Closure(_) => &self.closure,
            Value::Sam(adapter) => &adapter.interface,
            Value::Object(instance) => instance.class(),
            Value::Class(_) => &self.class,
            primitive => match primitive.primitive_type() {
                Some(p) => self.wrapper(p),
                None => &self.object,
            },
        }
    }

    /// The runtime type an argument is matched with; `None` for null.
    pub fn arg_type(&self, value: &Value) -> Option<TypeRef> {
        match value {
            Value::Null => None,
            Value::Array(array) => Some(TypeRef::array_of(array.component.clone())),
            other => match other.primitive_type() {
                Some(p) => Some(TypeRef::Primitive(p)),
                None => Some(TypeRef::Class(self.receiver_class(other))),
            },
        }
    }
}

/// Members supplied after the class exists, for signatures that mention
/// the class itself (`Object.equals(Object)`).
#[derive(Clone, Default)]
struct DeferredMembers(Arc<OnceLock<StaticMembers>>);

impl DeferredMembers {
    fn fill(&self, methods: Vec<DeclaredMethod>) {
        let members = StaticMembers {
            methods: methods.into_iter().map(Ok).collect(),
            ..StaticMembers::default()
        };
        // Filled exactly once, right after definition.
        let _ = self.0.set(members);
    }
}

impl Introspect for DeferredMembers {
    fn declared_methods(&self) -> Harvest<DeclaredMethod> {
        self.0.get().map(Introspect::declared_methods).unwrap_or_default()
    }

    fn declared_constructors(&self) -> Harvest<DeclaredConstructor> {
        self.0
            .get()
            .map(Introspect::declared_constructors)
            .unwrap_or_default()
    }

    fn declared_fields(&self) -> Harvest<DeclaredField> {
        self.0.get().map(Introspect::declared_fields).unwrap_or_default()
    }
}

/// The system loader and the classes defined in it.
pub struct Bootstrap {
    loader: ClassLoader,
    well_known: WellKnown,
}

impl Bootstrap {
    pub fn new(interner: &StringInterner) -> Self {
        let n = |s: &str| interner.intern(s);
        let int = TypeRef::Primitive(Primitive::Int);
        let loader = ClassLoader::new("system");

        let object_members = DeferredMembers::default();
        let object = loader.define_fresh(
            ClassBuilder::new("Object").introspector(Box::new(object_members.clone())),
        );
        let object_ty = TypeRef::class(&object);
        object_members.fill(vec![
            DeclaredMethod::new(n("toString"), vec![], Invoker::native(natives::to_string)),
            DeclaredMethod::new(n("hashCode"), vec![], Invoker::native(natives::hash_code)),
            DeclaredMethod::new(
                n("equals"),
                vec![object_ty.clone()],
                Invoker::native(natives::equals),
            ),
        ]);

        let comparable = loader.define_fresh(
            ClassBuilder::new("Comparable")
                .interface()
                .method(DeclaredMethod::abstract_method(
                    n("compareTo"),
                    vec![object_ty.clone()],
                )),
        );
        let char_sequence = loader.define_fresh(
            ClassBuilder::new("CharSequence").interface().method(DeclaredMethod::new(
                n("length"),
                vec![],
                Invoker::native(natives::char_length),
            )),
        );
        let number = loader.define_fresh(
            ClassBuilder::new("Number")
                .extends(&object)
                .flags(ClassFlags::ABSTRACT)
                .method(DeclaredMethod::new(
                    n("intValue"),
                    vec![],
                    Invoker::native(natives::int_value),
                )),
        );

        let wrapper = |p: Primitive, extra: Vec<DeclaredMethod>| {
            let parent = if p.is_numeric() { &number } else { &object };
            let mut builder = ClassBuilder::new(p.wrapper_name())
                .extends(parent)
                .implements(&comparable)
                .boxes(p)
                .flags(ClassFlags::FINAL)
                .method(DeclaredMethod::new(
                    n("compareTo"),
                    vec![TypeRef::Primitive(p)],
                    Invoker::native(natives::compare_to),
                ));
            for method in extra {
                builder = builder.method(method);
            }
            loader.define_fresh(builder)
        };

        let boolean = wrapper(Primitive::Boolean, vec![]);
        let byte = wrapper(Primitive::Byte, vec![]);
        let short = wrapper(Primitive::Short, vec![]);
        let character = wrapper(Primitive::Char, vec![]);
        let long = wrapper(Primitive::Long, vec![]);
        let float = wrapper(Primitive::Float, vec![]);
        let double = wrapper(Primitive::Double, vec![]);

        let string = loader.define_fresh(
            ClassBuilder::new("String")
                .extends(&object)
                .implements(&char_sequence)
                .implements(&comparable)
                .flags(ClassFlags::FINAL)
                .method(DeclaredMethod::new(
                    n("toUpperCase"),
                    vec![],
                    Invoker::native(natives::to_upper_case),
                ))
                .method(DeclaredMethod::new(
                    n("plus"),
                    vec![object_ty.clone()],
                    Invoker::native(natives::concat),
                ))
                .method(
                    DeclaredMethod::new(
                        n("valueOf"),
                        vec![object_ty.clone()],
                        Invoker::native(natives::value_of),
                    )
                    .with_static(),
                ),
        );
        let string_ty = TypeRef::class(&string);

        let integer = wrapper(
            Primitive::Int,
            vec![
                DeclaredMethod::new(
                    n("valueOf"),
                    vec![int.clone()],
                    Invoker::native(natives::first_arg),
                )
                .with_static(),
                DeclaredMethod::new(
                    n("parseInt"),
                    vec![string_ty.clone()],
                    Invoker::native(natives::parse_int),
                )
                .with_static(),
            ],
        );

        let big = |name: &str| {
            loader.define_fresh(
                ClassBuilder::new(name)
                    .extends(&number)
                    .implements(&comparable)
                    .flags(ClassFlags::FINAL),
            )
        };
        let big_integer = big("BigInteger");
        let big_decimal = big("BigDecimal");

        let gstring = loader.define_fresh(
            ClassBuilder::new("GString")
                .extends(&object)
                .implements(&char_sequence)
                .method(DeclaredMethod::new(
                    n("toString"),
                    vec![],
                    Invoker::native(natives::to_string),
                )),
        );
        let closure = loader.define_fresh(
            ClassBuilder::new("Closure").extends(&object).method(
                DeclaredMethod::new(
                    n("call"),
                    vec![TypeRef::array_of(object_ty.clone())],
                    Invoker::native(natives::call_closure),
                )
                .with_varargs(),
            ),
        );

        let collection = loader.define_fresh(
            ClassBuilder::new("Collection")
                .interface()
                .method(DeclaredMethod::abstract_method(n("size"), vec![]))
                .method(DeclaredMethod::abstract_method(n("isEmpty"), vec![])),
        );
        let list = loader.define_fresh(
            ClassBuilder::new("List")
                .interface()
                .implements(&collection),
        );
        let array_list = loader.define_fresh(
            ClassBuilder::new("ArrayList")
                .extends(&object)
                .implements(&list)
                .method(DeclaredMethod::new(n("size"), vec![], Invoker::native(natives::size)))
                .method(DeclaredMethod::new(
                    n("isEmpty"),
                    vec![],
                    Invoker::native(natives::is_empty),
                ))
                .method(DeclaredMethod::new(
                    n("get"),
                    vec![int],
                    Invoker::native(natives::get),
                ))
                .constructor(DeclaredConstructor::new(vec![], Invoker::native(|_, _| Ok(Value::list(vec![])))))
                .constructor(DeclaredConstructor::new(
                    vec![TypeRef::class(&collection)],
                    Invoker::native(natives::copy_list),
                )),
        );

        let runnable = loader.define_fresh(
            ClassBuilder::new("Runnable")
                .interface()
                .method(DeclaredMethod::abstract_method(n("run"), vec![])),
        );
        let comparator = loader.define_fresh(
            ClassBuilder::new("Comparator")
                .interface()
                .method(DeclaredMethod::abstract_method(
                    n("compare"),
                    vec![object_ty.clone(), object_ty.clone()],
                )),
        );
        let class = loader.define_fresh(
            ClassBuilder::new("Class")
                .extends(&object)
                .flags(ClassFlags::FINAL)
                .method(DeclaredMethod::new(
                    n("getName"),
                    vec![],
                    Invoker::native(natives::class_name),
                )),
        );
        let null_object = loader.define_fresh(
            ClassBuilder::new("NullObject")
                .extends(&object)
                .flags(ClassFlags::FINAL)
                .method(DeclaredMethod::new(
                    n("toString"),
                    vec![],
                    Invoker::native(|_, _| Ok(Value::string("null"))),
                ))
                .method(DeclaredMethod::new(
                    n("equals"),
                    vec![object_ty],
                    Invoker::native(|_, args| {
                        Ok(Value::Bool(args.first().is_some_and(Value::is_null)))
                    }),
                )),
        );

        Self {
            loader,
            well_known: WellKnown {
                object,
                number,
                boolean,
                byte,
                short,
                character,
                integer,
                long,
                float,
                double,
                big_integer,
                big_decimal,
                char_sequence,
                comparable,
                string,
                gstring,
                closure,
                collection,
                list,
                array_list,
                runnable,
                comparator,
                class,
                null_object,
            },
        }
    }

    /// The loader owning the bootstrap classes; it lives as long as any
    /// clone of this handle or of the [`Bootstrap`].
    pub fn loader(&self) -> &ClassLoader {
        &self.loader
    }

    pub fn well_known(&self) -> &WellKnown {
        &self.well_known
    }
}
