//! Heap-backed value payloads: interpolated strings, closures, adapters,
//! instances and typed arrays.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::{ClassRef, InvokeError, InvokeResult, TypeRef, Value};

/// Lazily rendered interpolated string.
///
/// Holds literal segments and embedded values; the rendered text is
/// computed on first use and then reused.
pub struct GString {
    strings: Vec<Arc<str>>,
    values: Vec<Value>,
    rendered: OnceLock<Arc<str>>,
}

impl GString {
    /// `strings` interleave with `values`: `s0 v0 s1 v1 ... sN`.
    pub fn new(strings: Vec<Arc<str>>, values: Vec<Value>) -> Self {
        Self {
            strings,
            values,
            rendered: OnceLock::new(),
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered.get().is_some()
    }

    pub fn render(&self) -> Arc<str> {
        Arc::clone(self.rendered.get_or_init(|| {
            let mut out = String::new();
            let mut values = self.values.iter();
            for segment in &self.strings {
                out.push_str(segment);
                if let Some(value) = values.next() {
                    out.push_str(&value.display_string());
                }
            }
            for value in values {
                out.push_str(&value.display_string());
            }
            Arc::from(out)
        }))
    }
}

/// Closure body: receives the call arguments.
pub type ClosureFn = Arc<dyn Fn(&[Value]) -> InvokeResult + Send + Sync>;

/// A callable value.
pub struct Closure {
    arity: Option<usize>,
    body: ClosureFn,
}

impl Closure {
    /// A closure accepting any number of arguments.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&[Value]) -> InvokeResult + Send + Sync + 'static,
    {
        Self {
            arity: None,
            body: Arc::new(body),
        }
    }

    /// A closure that rejects calls with a different argument count.
    pub fn with_arity<F>(arity: usize, body: F) -> Self
    where
        F: Fn(&[Value]) -> InvokeResult + Send + Sync + 'static,
    {
        Self {
            arity: Some(arity),
            body: Arc::new(body),
        }
    }

    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    pub fn call(&self, args: &[Value]) -> InvokeResult {
        if let Some(expected) = self.arity {
            if expected != args.len() {
                return Err(InvokeError::new(format!(
                    "closure expects {expected} argument(s), got {}",
                    args.len()
                )));
            }
        }
        (self.body)(args)
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arity {
            Some(n) => write!(f, "Closure(arity={n})"),
            None => f.write_str("Closure(..)"),
        }
    }
}

/// A closure adapted to a functional interface.
pub struct SamAdapter {
    pub interface: ClassRef,
    pub closure: Arc<Closure>,
}

impl SamAdapter {
    pub fn new(interface: &ClassRef, closure: &Arc<Closure>) -> Self {
        Self {
            interface: ClassRef::clone(interface),
            closure: Arc::clone(closure),
        }
    }
}

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// An instance of a host class with its field storage.
pub struct Instance {
    id: u64,
    class: ClassRef,
    fields: RwLock<Vec<Value>>,
}

impl Instance {
    /// A fresh instance with every field slot set to null.
    pub fn new(class: &ClassRef) -> Self {
        Self::with_fields(class, vec![Value::Null; class.field_slots()])
    }

    /// An instance with explicit initial field values, padded with nulls.
    pub fn with_fields(class: &ClassRef, mut fields: Vec<Value>) -> Self {
        fields.resize(class.field_slots(), Value::Null);
        Self {
            id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
            class: ClassRef::clone(class),
            fields: RwLock::new(fields),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    pub fn field(&self, slot: usize) -> Option<Value> {
        self.fields.read().get(slot).cloned()
    }

    /// Store into `slot`; returns `false` when the slot does not exist.
    pub fn set_field(&self, slot: usize, value: Value) -> bool {
        match self.fields.write().get_mut(slot) {
            Some(field) => {
                *field = value;
                true
            }
            None => false,
        }
    }
}

/// A typed array.
pub struct ArrayValue {
    pub component: TypeRef,
    pub elements: Vec<Value>,
}

impl ArrayValue {
    pub fn new(component: TypeRef, elements: Vec<Value>) -> Self {
        Self {
            component,
            elements,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
