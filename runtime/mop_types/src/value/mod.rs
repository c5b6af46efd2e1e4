//! Runtime values: receivers and arguments as the dispatch engine sees them.
//!
//! Primitive values stay unboxed and carry their primitive type, so a call
//! `foo(5)` matches `foo(int)` exactly. They box to their wrapper class only
//! when used as a receiver. Heap payloads are shared through `Arc` and are
//! built through the factory methods below.

mod composite;

use std::fmt;
use std::sync::Arc;

use num_bigint::BigInt;
use rust_decimal::Decimal;

use crate::{ClassRef, Primitive, TypeRef};

pub use composite::{ArrayValue, Closure, ClosureFn, GString, Instance, SamAdapter};

/// A boxed argument or receiver value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Char(char),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// Arbitrary-precision integer.
    BigInteger(Arc<BigInt>),
    /// Arbitrary-precision decimal.
    BigDecimal(Decimal),
    Str(Arc<str>),
    /// Interpolated string, rendered on demand.
    GString(Arc<GString>),
    List(Arc<Vec<Value>>),
    Array(Arc<ArrayValue>),
    Closure(Arc<Closure>),
    /// A closure already adapted to a functional interface.
    Sam(Arc<SamAdapter>),
    Object(Arc<Instance>),
    /// A class used as a value, e.g. the receiver of a static call.
    Class(ClassRef),
}

// Factory methods

impl Value {
    #[inline]
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    #[inline]
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(items))
    }

    #[inline]
    pub fn array(component: TypeRef, elements: Vec<Value>) -> Self {
        Value::Array(Arc::new(ArrayValue::new(component, elements)))
    }

    #[inline]
    pub fn big_integer(n: impl Into<BigInt>) -> Self {
        Value::BigInteger(Arc::new(n.into()))
    }

    /// Interpolated string from alternating literal segments and values.
    pub fn gstring(strings: &[&str], values: Vec<Value>) -> Self {
        let strings = strings.iter().map(|s| Arc::from(*s)).collect();
        Value::GString(Arc::new(GString::new(strings, values)))
    }

    pub fn closure<F>(body: F) -> Self
    where
        F: Fn(&[Value]) -> crate::InvokeResult + Send + Sync + 'static,
    {
        Value::Closure(Arc::new(Closure::new(body)))
    }

    /// A fresh instance of `class` with null fields.
    pub fn object(class: &ClassRef) -> Self {
        Value::Object(Arc::new(Instance::new(class)))
    }

    /// The zero value for a declared type: `0`/`false` for primitives, null otherwise.
    pub fn default_for(ty: &TypeRef) -> Self {
        match ty.as_primitive() {
            Some(Primitive::Boolean) => Value::Bool(false),
            Some(Primitive::Byte) => Value::Byte(0),
            Some(Primitive::Short) => Value::Short(0),
            Some(Primitive::Char) => Value::Char('\0'),
            Some(Primitive::Int) => Value::Int(0),
            Some(Primitive::Long) => Value::Long(0),
            Some(Primitive::Float) => Value::Float(0.0),
            Some(Primitive::Double) => Value::Double(0.0),
            None => Value::Null,
        }
    }
}

// Accessors

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The primitive type of an unboxed value.
    pub fn primitive_type(&self) -> Option<Primitive> {
        match self {
            Value::Bool(_) => Some(Primitive::Boolean),
            Value::Byte(_) => Some(Primitive::Byte),
            Value::Short(_) => Some(Primitive::Short),
            Value::Char(_) => Some(Primitive::Char),
            Value::Int(_) => Some(Primitive::Int),
            Value::Long(_) => Some(Primitive::Long),
            Value::Float(_) => Some(Primitive::Float),
            Value::Double(_) => Some(Primitive::Double),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<Instance>> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    /// Short runtime type name for diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::Char(_) => "char",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::BigInteger(_) => "BigInteger",
            Value::BigDecimal(_) => "BigDecimal",
            Value::Str(_) => "String",
            Value::GString(_) => "GString",
            Value::List(_) => "List",
            Value::Array(_) => "Array",
            Value::Closure(_) => "Closure",
            Value::Sam(adapter) => adapter.interface.name(),
            Value::Object(instance) => instance.class().name(),
            Value::Class(_) => "Class",
        }
    }

    /// Text form used by `toString` and string concatenation.
    pub fn display_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Byte(n) => n.to_string(),
            Value::Short(n) => n.to_string(),
            Value::Char(c) => c.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Long(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::Double(n) => n.to_string(),
            Value::BigInteger(n) => n.to_string(),
            Value::BigDecimal(n) => n.to_string(),
            Value::Str(s) => s.to_string(),
            Value::GString(g) => g.render().to_string(),
            Value::List(items) => {
                let inner: Vec<_> = items.iter().map(Value::display_string).collect();
                format!("[{}]", inner.join(", "))
            }
            Value::Array(array) => {
                let inner: Vec<_> = array.elements.iter().map(Value::display_string).collect();
                format!("[{}]", inner.join(", "))
            }
            Value::Closure(_) => "<closure>".to_string(),
            Value::Sam(adapter) => format!("<closure as {}>", adapter.interface.name()),
            Value::Object(instance) => format!("{}@{}", instance.class().name(), instance.id()),
            Value::Class(class) => format!("class {}", class.name()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Byte(n) => write!(f, "Byte({n})"),
            Value::Short(n) => write!(f, "Short({n})"),
            Value::Char(c) => write!(f, "Char({c:?})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Long(n) => write!(f, "Long({n})"),
            Value::Float(n) => write!(f, "Float({n})"),
            Value::Double(n) => write!(f, "Double({n})"),
            Value::BigInteger(n) => write!(f, "BigInteger({n})"),
            Value::BigDecimal(n) => write!(f, "BigDecimal({n})"),
            Value::Str(s) => write!(f, "Str({:?})", &**s),
            Value::GString(g) => write!(f, "GString({:?})", &*g.render()),
            Value::List(items) => write!(f, "List({:?})", &**items),
            Value::Array(array) => write!(f, "Array<{}>({:?})", array.component, array.elements),
            Value::Closure(c) => write!(f, "{c:?}"),
            Value::Sam(adapter) => write!(f, "Sam({})", adapter.interface.name()),
            Value::Object(instance) => {
                write!(f, "Object({}@{})", instance.class().name(), instance.id())
            }
            Value::Class(class) => write!(f, "Class({})", class.name()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

/// Value equality: structural for data, identity for closures and instances.
/// Floating-point values compare by bit pattern.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::BigInteger(a), Value::BigInteger(b)) => a == b,
            (Value::BigDecimal(a), Value::BigDecimal(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::GString(a), Value::GString(b)) => a.render() == b.render(),
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.component == b.component && a.elements == b.elements
            }
            (Value::Closure(a), Value::Closure(b)) => Arc::ptr_eq(a, b),
            (Value::Sam(a), Value::Sam(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests;
