//! Binary operators.
//!
//! Two numeric operands are computed directly on the promotion lattice:
//!
//! ```text
//! int -> long -> BigInteger -> double -> BigDecimal
//! ```
//!
//! `byte`, `short` and `char` promote to `int`, `float` to `double`. Integer
//! division produces a `BigDecimal`; integer overflow and division by zero
//! are errors. Two strings compare lexicographically and `String + any`
//! concatenates. Everything else dispatches the operator's method on the
//! left operand through the call-site cache.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use rust_decimal::Decimal;

use mop_ir::Name;
use mop_types::Value;

use super::Runtime;
use crate::call_site::CallSiteId;
use crate::coercion::numeric::NumKind;
use crate::names::WellKnownNames;
use crate::{DispatchError, DispatchResult};

/// A binary operator of the dynamic language.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Plus,
    Minus,
    Multiply,
    Div,
    Mod,
    /// `<=>`: -1, 0 or 1.
    Compare,
    Equals,
    NotEquals,
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

impl BinaryOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Compare => "<=>",
            BinaryOp::Equals => "==",
            BinaryOp::NotEquals => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
        }
    }

    /// The method an operator dispatches to on a non-numeric left operand.
    fn method(self, names: &WellKnownNames) -> Name {
        match self {
            BinaryOp::Plus => names.plus,
            BinaryOp::Minus => names.minus,
            BinaryOp::Multiply => names.multiply,
            BinaryOp::Div => names.div,
            BinaryOp::Mod => names.mod_,
            BinaryOp::Equals | BinaryOp::NotEquals => names.equals,
            BinaryOp::Compare
            | BinaryOp::Less
            | BinaryOp::LessEq
            | BinaryOp::Greater
            | BinaryOp::GreaterEq => names.compare_to,
        }
    }

    /// Turn an ordering into this operator's result. `None` for arithmetic.
    fn from_ordering(self, ordering: Ordering) -> Option<Value> {
        let result = match self {
            BinaryOp::Compare => {
                return Some(Value::Int(match ordering {
                    Ordering::Less => -1,
                    Ordering::Equal => 0,
                    Ordering::Greater => 1,
                }))
            }
            BinaryOp::Equals => ordering.is_eq(),
            BinaryOp::NotEquals => ordering.is_ne(),
            BinaryOp::Less => ordering.is_lt(),
            BinaryOp::LessEq => ordering.is_le(),
            BinaryOp::Greater => ordering.is_gt(),
            BinaryOp::GreaterEq => ordering.is_ge(),
            BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Multiply | BinaryOp::Div | BinaryOp::Mod => {
                return None
            }
        };
        Some(Value::Bool(result))
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Runtime {
    /// Evaluate `lhs op rhs`.
    pub fn invoke_binary(
        &self,
        site: CallSiteId,
        op: BinaryOp,
        lhs: &Value,
        rhs: &Value,
    ) -> DispatchResult<Value> {
        if let (Some(l), Some(r)) = (NumKind::of_value(lhs), NumKind::of_value(rhs)) {
            return numeric_binary(op, lhs, l, rhs, r);
        }
        if let (Some(l), Some(r)) = (string_of(lhs), string_of(rhs)) {
            if let Some(result) = op.from_ordering(l.cmp(&r)) {
                return Ok(result);
            }
        }
        if op == BinaryOp::Plus && string_of(lhs).is_some() {
            return Ok(Value::string(format!(
                "{}{}",
                lhs.display_string(),
                rhs.display_string()
            )));
        }

        let result = self.invoke(site, lhs, op.method(&self.names), vec![rhs.clone()])?;
        match op {
            BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Multiply | BinaryOp::Div | BinaryOp::Mod => {
                Ok(result)
            }
            BinaryOp::Equals => Ok(result),
            BinaryOp::NotEquals => truth(&result, op).map(|b| Value::Bool(!b)),
            BinaryOp::Compare
            | BinaryOp::Less
            | BinaryOp::LessEq
            | BinaryOp::Greater
            | BinaryOp::GreaterEq => {
                let ordering = result.as_int().map(|c| c.cmp(&0)).ok_or_else(|| {
                    DispatchError::Arithmetic(format!(
                        "compareTo returned {} for {op}",
                        result.type_name()
                    ))
                })?;
                op.from_ordering(ordering)
                    .ok_or_else(|| DispatchError::Arithmetic(format!("{op} is not a comparison")))
            }
        }
    }
}

fn string_of(value: &Value) -> Option<Arc<str>> {
    match value {
        Value::Str(s) => Some(Arc::clone(s)),
        Value::GString(g) => Some(g.render()),
        _ => None,
    }
}

fn truth(value: &Value, op: BinaryOp) -> DispatchResult<bool> {
    value.as_bool().ok_or_else(|| {
        DispatchError::Arithmetic(format!("equals returned {} for {op}", value.type_name()))
    })
}

/// Where both operands meet on the promotion lattice.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Promoted {
    Int,
    Long,
    BigInteger,
    Double,
    BigDecimal,
}

impl Promoted {
    fn of(kind: NumKind) -> Self {
        match kind {
            NumKind::Byte | NumKind::Short | NumKind::Char | NumKind::Int => Promoted::Int,
            NumKind::Long => Promoted::Long,
            NumKind::BigInteger => Promoted::BigInteger,
            NumKind::Float | NumKind::Double => Promoted::Double,
            NumKind::BigDecimal => Promoted::BigDecimal,
        }
    }
}

#[cold]
fn arithmetic(message: &str) -> DispatchError {
    DispatchError::Arithmetic(message.to_owned())
}

fn int_of(value: &Value) -> Option<i64> {
    match value {
        Value::Byte(n) => Some(i64::from(*n)),
        Value::Short(n) => Some(i64::from(*n)),
        Value::Char(c) => Some(i64::from(u32::from(*c))),
        Value::Int(n) => Some(i64::from(*n)),
        Value::Long(n) => Some(*n),
        _ => None,
    }
}

fn big_of(value: &Value) -> Option<BigInt> {
    match value {
        Value::BigInteger(n) => Some(BigInt::clone(n)),
        other => int_of(other).map(BigInt::from),
    }
}

#[allow(
    clippy::cast_precision_loss,
    reason = "mixed integer and floating arithmetic promotes to double"
)]
fn double_of(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(f64::from(*f)),
        Value::Double(f) => Some(*f),
        Value::BigInteger(n) => n.to_f64(),
        other => int_of(other).map(|n| n as f64),
    }
}

fn decimal_of(value: &Value) -> DispatchResult<Decimal> {
    let decimal = match value {
        Value::BigDecimal(d) => Some(*d),
        Value::BigInteger(n) => n
            .to_i128()
            .and_then(|n| Decimal::try_from_i128_with_scale(n, 0).ok()),
        Value::Float(f) => Decimal::try_from(*f).ok(),
        Value::Double(f) => Decimal::try_from(*f).ok(),
        other => int_of(other).map(Decimal::from),
    };
    decimal.ok_or_else(|| arithmetic(&format!("{} does not fit a BigDecimal", value.display_string())))
}

fn numeric_binary(
    op: BinaryOp,
    lhs: &Value,
    l: NumKind,
    rhs: &Value,
    r: NumKind,
) -> DispatchResult<Value> {
    let promoted = Promoted::of(l).max(Promoted::of(r));
    // Integer division is exact.
    if op == BinaryOp::Div && promoted <= Promoted::BigInteger {
        return decimal_binary(op, decimal_of(lhs)?, decimal_of(rhs)?);
    }
    let missing = || arithmetic("operand does not fit the promoted type");
    match promoted {
        Promoted::Int => {
            let a = int_of(lhs).and_then(|n| i32::try_from(n).ok()).ok_or_else(missing)?;
            let b = int_of(rhs).and_then(|n| i32::try_from(n).ok()).ok_or_else(missing)?;
            if let Some(result) = op.from_ordering(a.cmp(&b)) {
                return Ok(result);
            }
            checked(op, a, b, i32::checked_add, i32::checked_sub, i32::checked_mul, i32::checked_rem, b == 0)
                .map(Value::Int)
        }
        Promoted::Long => {
            let a = int_of(lhs).ok_or_else(missing)?;
            let b = int_of(rhs).ok_or_else(missing)?;
            if let Some(result) = op.from_ordering(a.cmp(&b)) {
                return Ok(result);
            }
            checked(op, a, b, i64::checked_add, i64::checked_sub, i64::checked_mul, i64::checked_rem, b == 0)
                .map(Value::Long)
        }
        Promoted::BigInteger => {
            let a = big_of(lhs).ok_or_else(missing)?;
            let b = big_of(rhs).ok_or_else(missing)?;
            if let Some(result) = op.from_ordering(a.cmp(&b)) {
                return Ok(result);
            }
            let result = match op {
                BinaryOp::Plus => a + b,
                BinaryOp::Minus => a - b,
                BinaryOp::Multiply => a * b,
                _ if b.is_zero() => return Err(arithmetic("division by zero")),
                _ => a % b,
            };
            Ok(Value::big_integer(result))
        }
        Promoted::Double => {
            let a = double_of(lhs).ok_or_else(missing)?;
            let b = double_of(rhs).ok_or_else(missing)?;
            if let Some(result) = op.from_ordering(a.total_cmp(&b)) {
                return Ok(result);
            }
            let result = match op {
                BinaryOp::Plus => a + b,
                BinaryOp::Minus => a - b,
                BinaryOp::Multiply => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            };
            Ok(Value::Double(result))
        }
        Promoted::BigDecimal => decimal_binary(op, decimal_of(lhs)?, decimal_of(rhs)?),
    }
}

/// Fixed-width arithmetic; comparisons are handled by the caller.
#[allow(clippy::too_many_arguments, reason = "one checked operation per operator")]
fn checked<T: Copy>(
    op: BinaryOp,
    a: T,
    b: T,
    add: fn(T, T) -> Option<T>,
    sub: fn(T, T) -> Option<T>,
    mul: fn(T, T) -> Option<T>,
    rem: fn(T, T) -> Option<T>,
    divisor_is_zero: bool,
) -> DispatchResult<T> {
    let result = match op {
        BinaryOp::Plus => add(a, b),
        BinaryOp::Minus => sub(a, b),
        BinaryOp::Multiply => mul(a, b),
        _ if divisor_is_zero => return Err(arithmetic("division by zero")),
        _ => rem(a, b),
    };
    result.ok_or_else(|| arithmetic("integer overflow"))
}

fn decimal_binary(op: BinaryOp, a: Decimal, b: Decimal) -> DispatchResult<Value> {
    if let Some(result) = op.from_ordering(a.cmp(&b)) {
        return Ok(result);
    }
    if matches!(op, BinaryOp::Div | BinaryOp::Mod) && b.is_zero() {
        return Err(arithmetic("division by zero"));
    }
    let result = match op {
        BinaryOp::Plus => a.checked_add(b),
        BinaryOp::Minus => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        BinaryOp::Div => a.checked_div(b),
        _ => a.checked_rem(b),
    };
    result
        .map(|d| Value::BigDecimal(d.normalize()))
        .ok_or_else(|| arithmetic("BigDecimal overflow"))
}

#[cfg(test)]
mod tests;
