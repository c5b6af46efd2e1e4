//! Native bodies of the bootstrap methods.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use num_traits::ToPrimitive;
use rustc_hash::FxHasher;

use crate::{InvokeError, InvokeResult, Value};

fn unexpected(what: &str, value: &Value) -> InvokeError {
    InvokeError::new(format!("expected {what}, got {}", value.type_name()))
}

fn arg(args: &[Value], index: usize) -> Result<&Value, InvokeError> {
    args.get(index)
        .ok_or_else(|| InvokeError::new(format!("missing argument {index}")))
}

fn int_result(n: usize) -> InvokeResult {
    i32::try_from(n)
        .map(Value::Int)
        .map_err(|_| InvokeError::new(format!("{n} does not fit in an int")))
}

pub(super) fn to_string(recv: &Value, _: &[Value]) -> InvokeResult {
    Ok(Value::string(recv.display_string()))
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "hash codes keep the low 32 bits"
)]
pub(super) fn hash_code(recv: &Value, _: &[Value]) -> InvokeResult {
    let mut hasher = FxHasher::default();
    match recv {
        Value::Object(instance) => instance.id().hash(&mut hasher),
        other => other.display_string().hash(&mut hasher),
    }
    Ok(Value::Int(hasher.finish() as i32))
}

pub(super) fn equals(recv: &Value, args: &[Value]) -> InvokeResult {
    Ok(Value::Bool(arg(args, 0)? == recv))
}

pub(super) fn char_length(recv: &Value, _: &[Value]) -> InvokeResult {
    match recv {
        Value::Str(s) => int_result(s.chars().count()),
        Value::GString(g) => int_result(g.render().chars().count()),
        other => Err(unexpected("a character sequence", other)),
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "intValue narrows like a primitive cast"
)]
pub(super) fn int_value(recv: &Value, _: &[Value]) -> InvokeResult {
    let n = match recv {
        Value::Byte(n) => i32::from(*n),
        Value::Short(n) => i32::from(*n),
        Value::Int(n) => *n,
        Value::Long(n) => *n as i32,
        Value::Float(n) => *n as i32,
        Value::Double(n) => *n as i32,
        Value::BigInteger(n) => n
            .to_i32()
            .ok_or_else(|| InvokeError::new(format!("{n} does not fit in an int")))?,
        Value::BigDecimal(n) => n
            .trunc()
            .to_i32()
            .ok_or_else(|| InvokeError::new(format!("{n} does not fit in an int")))?,
        other => return Err(unexpected("a number", other)),
    };
    Ok(Value::Int(n))
}

fn same_kind_ordering(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Byte(a), Value::Byte(b)) => Some(a.cmp(b)),
        (Value::Short(a), Value::Short(b)) => Some(a.cmp(b)),
        (Value::Char(a), Value::Char(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Long(a), Value::Long(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => Some(a.total_cmp(b)),
        (Value::Double(a), Value::Double(b)) => Some(a.total_cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

pub(super) fn compare_to(recv: &Value, args: &[Value]) -> InvokeResult {
    let other = arg(args, 0)?;
    let ordering = same_kind_ordering(recv, other).ok_or_else(|| {
        InvokeError::new(format!(
            "cannot compare {} with {}",
            recv.type_name(),
            other.type_name()
        ))
    })?;
    Ok(Value::Int(match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }))
}

pub(super) fn to_upper_case(recv: &Value, _: &[Value]) -> InvokeResult {
    match recv {
        Value::Str(s) => Ok(Value::string(s.to_uppercase())),
        other => Err(unexpected("a String", other)),
    }
}

pub(super) fn concat(recv: &Value, args: &[Value]) -> InvokeResult {
    let mut out = recv.display_string();
    out.push_str(&arg(args, 0)?.display_string());
    Ok(Value::string(out))
}

pub(super) fn value_of(_: &Value, args: &[Value]) -> InvokeResult {
    Ok(Value::string(arg(args, 0)?.display_string()))
}

pub(super) fn first_arg(_: &Value, args: &[Value]) -> InvokeResult {
    arg(args, 0).cloned()
}

pub(super) fn parse_int(_: &Value, args: &[Value]) -> InvokeResult {
    let text = arg(args, 0)?;
    let s = text.as_str().ok_or_else(|| unexpected("a String", text))?;
    s.trim()
        .parse::<i32>()
        .map(Value::Int)
        .map_err(|e| InvokeError::new(format!("for input string \"{s}\": {e}")))
}

/// `Closure.call(Object...)`: the trailing arguments arrive packed in an array.
pub(super) fn call_closure(recv: &Value, args: &[Value]) -> InvokeResult {
    let Value::Closure(closure) = recv else {
        return Err(unexpected("a Closure", recv));
    };
    match args {
        [Value::Array(packed)] => closure.call(&packed.elements),
        _ => closure.call(args),
    }
}

pub(super) fn size(recv: &Value, _: &[Value]) -> InvokeResult {
    match recv {
        Value::List(items) => int_result(items.len()),
        other => Err(unexpected("a List", other)),
    }
}

pub(super) fn is_empty(recv: &Value, _: &[Value]) -> InvokeResult {
    match recv {
        Value::List(items) => Ok(Value::Bool(items.is_empty())),
        other => Err(unexpected("a List", other)),
    }
}

pub(super) fn get(recv: &Value, args: &[Value]) -> InvokeResult {
    let Value::List(items) = recv else {
        return Err(unexpected("a List", recv));
    };
    let index = arg(args, 0)?;
    let i = index.as_int().ok_or_else(|| unexpected("an int", index))?;
    usize::try_from(i)
        .ok()
        .and_then(|i| items.get(i))
        .cloned()
        .ok_or_else(|| {
            InvokeError::new(format!("index {i} out of bounds for length {}", items.len()))
        })
}

pub(super) fn copy_list(_: &Value, args: &[Value]) -> InvokeResult {
    match arg(args, 0)? {
        Value::List(items) => Ok(Value::list(items.to_vec())),
        other => Err(unexpected("a Collection", other)),
    }
}

pub(super) fn class_name(recv: &Value, _: &[Value]) -> InvokeResult {
    match recv {
        Value::Class(class) => Ok(Value::string(class.name())),
        other => Err(unexpected("a Class", other)),
    }
}
