//! The Coercion Engine.
//!
//! Decides whether an argument of a given runtime shape can be passed to a
//! declared parameter type, at what [`Distance`], and how the value is
//! converted on the way in. Decisions depend only on the argument's runtime
//! type (its [`ArgShape`]), never on its contents, so a resolution can be
//! cached per argument shape. The content-dependent steps, converting a
//! collection's elements into an array and fitting a number into
//! `BigDecimal`, are checked when the conversion runs.

pub mod numeric;

use std::fmt;
use std::ops::Add;
use std::sync::Arc;

use smallvec::SmallVec;

use mop_types::{ClassRef, SamAdapter, TypeRef, Value, WellKnown};

use crate::{DispatchError, DispatchResult};
use numeric::{NumKind, Widening};

/// Runtime type of an argument; `None` is the null argument.
pub type ArgShape = Option<TypeRef>;

/// Cost of passing an argument to a parameter. Lower is a better match.
///
/// Categories in increasing cost: exact match, supertype (one unit per
/// inheritance link), numeric widening (one unit per lattice step), boxing,
/// `GString` to `String`, null, collection to array, closure adaptation.
/// An `Object` parameter costs [`Distance::OBJECT`] on top of its links, so
/// any interface or superclass the argument implements ranks ahead of it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Distance(u32);

impl Distance {
    pub const EXACT: Distance = Distance(0);
    pub const OBJECT: Distance = Distance(5);
    pub const BOXING: Distance = Distance(10);
    pub const STRING_INTERCHANGE: Distance = Distance(20);
    pub const NULL: Distance = Distance(30);
    pub const COLLECTION_TO_ARRAY: Distance = Distance(40);
    pub const SAM_ADAPTATION: Distance = Distance(50);

    pub const fn hierarchy(depth: u32) -> Distance {
        Distance(depth)
    }

    pub const fn widening(steps: u32) -> Distance {
        Distance(steps)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl Add for Distance {
    type Output = Distance;

    fn add(self, rhs: Distance) -> Distance {
        Distance(self.0.saturating_add(rhs.0))
    }
}

impl std::iter::Sum for Distance {
    fn sum<I: Iterator<Item = Distance>>(iter: I) -> Distance {
        iter.fold(Distance::EXACT, Add::add)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an argument value is transformed before the call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Conversion {
    Identity,
    /// Primitive to its wrapper. Primitives already act as their wrapper, so
    /// this leaves the value unchanged.
    Boxing,
    Widen(NumKind),
    GStringToString,
    /// Copy a collection into an array of this component type.
    CollectionToArray(TypeRef),
    /// Wrap a closure as an implementation of this functional interface.
    SamAdapt(ClassRef),
}

/// An accepted argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coercion {
    pub distance: Distance,
    pub conversion: Conversion,
}

impl Coercion {
    fn new(distance: Distance, conversion: Conversion) -> Self {
        Self {
            distance,
            conversion,
        }
    }

    fn exact() -> Self {
        Self::new(Distance::EXACT, Conversion::Identity)
    }
}

/// Outcome of [`CoercionEngine::try_coerce`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoercionOutcome {
    Coerce(Coercion),
    Incompatible,
    /// A widening the lattice defines as lossy. Excludes the candidate like
    /// `Incompatible` does.
    Lossy,
}

impl CoercionOutcome {
    pub fn compatible(self) -> Option<Coercion> {
        match self {
            CoercionOutcome::Coerce(c) => Some(c),
            CoercionOutcome::Incompatible | CoercionOutcome::Lossy => None,
        }
    }

    pub fn is_compatible(&self) -> bool {
        matches!(self, CoercionOutcome::Coerce(_))
    }
}

/// Trailing arguments to pack into the vararg array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VarargPack {
    /// Index of the first packed argument.
    pub start: usize,
    pub component: TypeRef,
}

/// Per-argument conversions for one resolved candidate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoercionPlan {
    pub conversions: SmallVec<[Conversion; 4]>,
    pub pack: Option<VarargPack>,
}

impl CoercionPlan {
    /// Whether applying the plan returns the arguments untouched.
    pub fn is_identity(&self) -> bool {
        self.pack.is_none()
            && self
                .conversions
                .iter()
                .all(|c| matches!(c, Conversion::Identity | Conversion::Boxing))
    }

    pub fn apply(&self, engine: &CoercionEngine, args: Vec<Value>) -> DispatchResult<Vec<Value>> {
        if self.is_identity() {
            return Ok(args);
        }
        let mut converted = Vec::with_capacity(args.len());
        for (value, conversion) in args.into_iter().zip(self.conversions.iter()) {
            converted.push(engine.convert(conversion, value)?);
        }
        if let Some(pack) = &self.pack {
            let packed = converted.split_off(pack.start.min(converted.len()));
            converted.push(Value::array(pack.component.clone(), packed));
        }
        Ok(converted)
    }

    /// [`apply`](Self::apply), except that [`DispatchError::CoercionOverflow`]
    /// rejects the plan instead of failing the call.
    pub fn apply_checked(&self, engine: &CoercionEngine, args: Vec<Value>) -> DispatchResult<Applied> {
        if self.is_identity() {
            return Ok(Applied::Ready(args));
        }
        match self.apply(engine, args.clone()) {
            Ok(converted) => Ok(Applied::Ready(converted)),
            Err(DispatchError::CoercionOverflow { .. }) => Ok(Applied::Overflow(args)),
            Err(err) => Err(err),
        }
    }
}

/// Outcome of [`CoercionPlan::apply_checked`].
#[derive(Debug)]
pub enum Applied {
    Ready(Vec<Value>),
    /// A value does not fit its numeric target. The arguments come back
    /// untouched so another candidate can take them.
    Overflow(Vec<Value>),
}

/// Where a declared type sits on the numeric lattice.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum NumericForm {
    Primitive,
    /// Wrapper class of a primitive (`Integer`).
    Wrapper,
    /// `BigInteger` / `BigDecimal`.
    Reference,
}

/// Type compatibility and argument conversion against the bootstrap classes.
pub struct CoercionEngine {
    well_known: WellKnown,
    sam_coercion: bool,
}

impl CoercionEngine {
    pub fn new(well_known: WellKnown, sam_coercion: bool) -> Self {
        Self {
            well_known,
            sam_coercion,
        }
    }

    pub fn well_known(&self) -> &WellKnown {
        &self.well_known
    }

    pub fn shape_of(&self, value: &Value) -> ArgShape {
        self.well_known.arg_type(value)
    }

    fn numeric_slot(&self, ty: &TypeRef) -> Option<(NumKind, NumericForm)> {
        match ty {
            TypeRef::Primitive(p) => NumKind::of_primitive(*p).map(|k| (k, NumericForm::Primitive)),
            TypeRef::Class(class) => {
                if let Some(p) = class.boxes() {
                    NumKind::of_primitive(p).map(|k| (k, NumericForm::Wrapper))
                } else if class.id() == self.well_known.big_integer.id() {
                    Some((NumKind::BigInteger, NumericForm::Reference))
                } else if class.id() == self.well_known.big_decimal.id() {
                    Some((NumKind::BigDecimal, NumericForm::Reference))
                } else {
                    None
                }
            }
            TypeRef::Array(_) => None,
        }
    }

    /// Can an argument of runtime type `arg` be passed where `declared` is expected?
    pub fn try_coerce(&self, declared: &TypeRef, arg: &ArgShape) -> CoercionOutcome {
        let Some(arg) = arg else {
            return if declared.is_primitive() {
                CoercionOutcome::Incompatible
            } else {
                CoercionOutcome::Coerce(Coercion::new(Distance::NULL, Conversion::Identity))
            };
        };
        if declared == arg {
            return CoercionOutcome::Coerce(Coercion::exact());
        }
        if let (Some((from, _)), Some((to, form))) =
            (self.numeric_slot(arg), self.numeric_slot(declared))
        {
            return Self::coerce_numeric(from, to, form);
        }

        let wk = &self.well_known;
        match (declared, arg) {
            (TypeRef::Primitive(_), _) | (TypeRef::Array(_), TypeRef::Primitive(_)) => {
                CoercionOutcome::Incompatible
            }
            (TypeRef::Class(d), TypeRef::Class(a)) => {
                // Interfaces have no superclass but still convert to Object.
                let depth = a
                    .distance_to(d.id())
                    .or_else(|| (d.id() == wk.object.id()).then_some(1));
                if let Some(depth) = depth {
                    CoercionOutcome::Coerce(Coercion::new(
                        Distance::hierarchy(depth) + self.object_surcharge(d),
                        Conversion::Identity,
                    ))
                } else if d.id() == wk.string.id() && a.is_subtype_of(wk.gstring.id()) {
                    CoercionOutcome::Coerce(Coercion::new(
                        Distance::STRING_INTERCHANGE,
                        Conversion::GStringToString,
                    ))
                } else if self.sam_coercion
                    && d.is_functional()
                    && a.is_subtype_of(wk.closure.id())
                {
                    CoercionOutcome::Coerce(Coercion::new(
                        Distance::SAM_ADAPTATION,
                        Conversion::SamAdapt(ClassRef::clone(d)),
                    ))
                } else {
                    CoercionOutcome::Incompatible
                }
            }
            (TypeRef::Class(d), TypeRef::Primitive(p)) => {
                match wk.wrapper(*p).distance_to(d.id()) {
                    Some(depth) => CoercionOutcome::Coerce(Coercion::new(
                        Distance::BOXING + Distance::hierarchy(depth) + self.object_surcharge(d),
                        Conversion::Boxing,
                    )),
                    None => CoercionOutcome::Incompatible,
                }
            }
            (TypeRef::Class(d), TypeRef::Array(_)) => {
                if d.id() == wk.object.id() {
                    CoercionOutcome::Coerce(Coercion::new(
                        Distance::hierarchy(1) + Distance::OBJECT,
                        Conversion::Identity,
                    ))
                } else {
                    CoercionOutcome::Incompatible
                }
            }
            (TypeRef::Array(dc), TypeRef::Array(ac)) => match (dc.as_class(), ac.as_class()) {
                (Some(d), Some(a)) => match a.distance_to(d.id()) {
                    Some(depth) => CoercionOutcome::Coerce(Coercion::new(
                        Distance::hierarchy(depth),
                        Conversion::Identity,
                    )),
                    None => CoercionOutcome::Incompatible,
                },
                _ => CoercionOutcome::Incompatible,
            },
            (TypeRef::Array(dc), TypeRef::Class(a)) => {
                if a.is_subtype_of(wk.collection.id()) {
                    CoercionOutcome::Coerce(Coercion::new(
                        Distance::COLLECTION_TO_ARRAY,
                        Conversion::CollectionToArray(TypeRef::clone(dc)),
                    ))
                } else {
                    CoercionOutcome::Incompatible
                }
            }
        }
    }

    fn object_surcharge(&self, declared: &ClassRef) -> Distance {
        if declared.id() == self.well_known.object.id() {
            Distance::OBJECT
        } else {
            Distance::EXACT
        }
    }

    fn coerce_numeric(from: NumKind, to: NumKind, form: NumericForm) -> CoercionOutcome {
        let boxing = if form == NumericForm::Wrapper {
            Distance::BOXING
        } else {
            Distance::EXACT
        };
        match numeric::widening(from, to) {
            Widening::Same => CoercionOutcome::Coerce(Coercion::new(boxing, Conversion::Boxing)),
            Widening::Steps(steps) => CoercionOutcome::Coerce(Coercion::new(
                Distance::widening(steps) + boxing,
                Conversion::Widen(to),
            )),
            Widening::Lossy => CoercionOutcome::Lossy,
            Widening::Narrowing => CoercionOutcome::Incompatible,
        }
    }

    /// [`try_coerce`](Self::try_coerce) against a concrete value.
    pub fn try_coerce_value(&self, declared: &TypeRef, value: &Value) -> CoercionOutcome {
        self.try_coerce(declared, &self.shape_of(value))
    }

    /// Run one conversion.
    pub fn convert(&self, conversion: &Conversion, value: Value) -> DispatchResult<Value> {
        match conversion {
            Conversion::Identity | Conversion::Boxing => Ok(value),
            Conversion::Widen(to) => numeric::convert(&value, *to),
            Conversion::GStringToString => match value {
                Value::GString(g) => Ok(Value::Str(g.render())),
                other => Ok(other),
            },
            Conversion::CollectionToArray(component) => {
                self.collection_to_array(component, &value)
            }
            Conversion::SamAdapt(interface) => match value {
                Value::Closure(closure) => Ok(Value::Sam(Arc::new(SamAdapter::new(
                    interface, &closure,
                )))),
                other => Ok(other),
            },
        }
    }

    fn collection_to_array(&self, component: &TypeRef, value: &Value) -> DispatchResult<Value> {
        let Value::List(items) = value else {
            return Err(DispatchError::ArgumentMismatch {
                expected: format!("{component}[]"),
                actual: value.type_name().to_owned(),
            });
        };
        let mut elements = Vec::with_capacity(items.len());
        for item in items.iter() {
            let coercion = self
                .try_coerce_value(component, item)
                .compatible()
                .ok_or_else(|| DispatchError::ArgumentMismatch {
                    expected: component.to_string(),
                    actual: item.type_name().to_owned(),
                })?;
            elements.push(self.convert(&coercion.conversion, item.clone())?);
        }
        Ok(Value::array(component.clone(), elements))
    }
}

#[cfg(test)]
mod tests;
