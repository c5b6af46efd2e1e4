//! The numeric promotion lattice.
//!
//! ```text
//! byte -> short -> int -> long -> BigInteger -> float -> double -> BigDecimal
//!                   ^
//!                  char
//! ```
//!
//! Widening moves right, one distance unit per step. `char` joins at `int`.
//! Conversions that can lose precision (`int`/`long`/`BigInteger` into the
//! binary floating types) are lossy and never applied implicitly.

use std::fmt;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use mop_types::{Primitive, Value};

use crate::{DispatchError, DispatchResult};

/// A numeric type on the promotion lattice.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NumKind {
    Byte,
    Short,
    Char,
    Int,
    Long,
    BigInteger,
    Float,
    Double,
    BigDecimal,
}

/// How one numeric kind reaches another.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Widening {
    Same,
    /// Widening by this many lattice steps.
    Steps(u32),
    /// Widening that may lose precision.
    Lossy,
    /// Not reachable by widening.
    Narrowing,
}

impl NumKind {
    /// Position on the lattice. `char` shares the slot just below `int`.
    const fn rank(self) -> u32 {
        match self {
            NumKind::Byte => 0,
            NumKind::Short | NumKind::Char => 1,
            NumKind::Int => 2,
            NumKind::Long => 3,
            NumKind::BigInteger => 4,
            NumKind::Float => 5,
            NumKind::Double => 6,
            NumKind::BigDecimal => 7,
        }
    }

    pub const fn of_primitive(p: Primitive) -> Option<NumKind> {
        match p {
            Primitive::Boolean => None,
            Primitive::Byte => Some(NumKind::Byte),
            Primitive::Short => Some(NumKind::Short),
            Primitive::Char => Some(NumKind::Char),
            Primitive::Int => Some(NumKind::Int),
            Primitive::Long => Some(NumKind::Long),
            Primitive::Float => Some(NumKind::Float),
            Primitive::Double => Some(NumKind::Double),
        }
    }

    pub fn of_value(value: &Value) -> Option<NumKind> {
        match value {
            Value::BigInteger(_) => Some(NumKind::BigInteger),
            Value::BigDecimal(_) => Some(NumKind::BigDecimal),
            other => other.primitive_type().and_then(NumKind::of_primitive),
        }
    }

    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            NumKind::Byte
                | NumKind::Short
                | NumKind::Char
                | NumKind::Int
                | NumKind::Long
                | NumKind::BigInteger
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            NumKind::Byte => "byte",
            NumKind::Short => "short",
            NumKind::Char => "char",
            NumKind::Int => "int",
            NumKind::Long => "long",
            NumKind::BigInteger => "BigInteger",
            NumKind::Float => "float",
            NumKind::Double => "double",
            NumKind::BigDecimal => "BigDecimal",
        }
    }
}

impl fmt::Display for NumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify the path from `from` to `to`.
pub fn widening(from: NumKind, to: NumKind) -> Widening {
    if from == to {
        return Widening::Same;
    }
    match (from, to) {
        // char is unsigned; byte and short cannot hold it and it cannot hold them.
        (NumKind::Char, NumKind::Byte | NumKind::Short)
        | (NumKind::Byte | NumKind::Short, NumKind::Char) => Widening::Narrowing,
        (NumKind::Int | NumKind::Char | NumKind::Long | NumKind::BigInteger, NumKind::Float)
        | (NumKind::Long | NumKind::BigInteger, NumKind::Double) => Widening::Lossy,
        _ if to.rank() > from.rank() => Widening::Steps(to.rank() - from.rank()),
        _ => Widening::Narrowing,
    }
}

fn overflow(value: &Value, to: NumKind) -> DispatchError {
    DispatchError::CoercionOverflow {
        value: value.display_string(),
        from: value.type_name().to_owned(),
        to: to.name().to_owned(),
    }
}

fn integral(value: &Value) -> Option<i64> {
    match value {
        Value::Byte(n) => Some(i64::from(*n)),
        Value::Short(n) => Some(i64::from(*n)),
        Value::Char(c) => Some(i64::from(u32::from(*c))),
        Value::Int(n) => Some(i64::from(*n)),
        Value::Long(n) => Some(*n),
        _ => None,
    }
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::BigDecimal(d) => Some(*d),
        Value::BigInteger(n) => n
            .to_i128()
            .and_then(|n| Decimal::try_from_i128_with_scale(n, 0).ok()),
        Value::Float(f) => Decimal::from_f32(*f),
        Value::Double(f) => Decimal::from_f64(*f),
        other => integral(other).map(Decimal::from),
    }
}

/// Widen `value` to `to`.
///
/// Fails with [`DispatchError::CoercionOverflow`] when the value itself does
/// not fit, which can happen only at the `BigDecimal` end of the lattice
/// (non-finite doubles, integers past its 96-bit mantissa).
pub fn convert(value: &Value, to: NumKind) -> DispatchResult<Value> {
    let converted = match to {
        NumKind::Byte => integral(value)
            .and_then(|n| i8::try_from(n).ok())
            .map(Value::Byte),
        NumKind::Short => integral(value)
            .and_then(|n| i16::try_from(n).ok())
            .map(Value::Short),
        NumKind::Char => match value {
            Value::Char(c) => Some(Value::Char(*c)),
            _ => None,
        },
        NumKind::Int => integral(value)
            .and_then(|n| i32::try_from(n).ok())
            .map(Value::Int),
        NumKind::Long => integral(value).map(Value::Long),
        NumKind::BigInteger => match value {
            Value::BigInteger(n) => Some(Value::BigInteger(n.clone())),
            other => integral(other).map(|n| Value::big_integer(BigInt::from(n))),
        },
        NumKind::Float => match value {
            Value::Byte(n) => Some(Value::Float(f32::from(*n))),
            Value::Short(n) => Some(Value::Float(f32::from(*n))),
            Value::Float(f) => Some(Value::Float(*f)),
            _ => None,
        },
        NumKind::Double => match value {
            Value::Float(f) => Some(Value::Double(f64::from(*f))),
            Value::Double(f) => Some(Value::Double(*f)),
            Value::Byte(n) => Some(Value::Double(f64::from(*n))),
            Value::Short(n) => Some(Value::Double(f64::from(*n))),
            Value::Char(c) => Some(Value::Double(f64::from(u32::from(*c)))),
            Value::Int(n) => Some(Value::Double(f64::from(*n))),
            _ => None,
        },
        NumKind::BigDecimal => to_decimal(value).map(Value::BigDecimal),
    };
    converted.ok_or_else(|| overflow(value, to))
}
