//! The Overload Resolver.
//!
//! Picks the best candidate of a [`MethodBucket`] for a list of argument
//! shapes in two tiers:
//!
//! 1. **Exact arity**: candidates declaring as many parameters as there are
//!    arguments. A vararg candidate takes part here too, with its array
//!    parameter matched against the last argument as a whole.
//! 2. **Varargs**: only when tier 1 has no compatible candidate. The fixed
//!    prefix is matched normally and each trailing argument is matched
//!    against the vararg element type.
//!
//! Within a tier the lowest total [`Distance`] wins. Ties go to the candidate
//! declared on the more derived type, then to a non-vararg candidate; any
//! remaining tie is [`MethodResolution::Ambiguous`].

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::trace;

use mop_types::{ClassRef, Value};

use crate::coercion::{ArgShape, CoercionEngine, CoercionPlan, Conversion, Distance, VarargPack};
use crate::registry::MethodBucket;
use crate::CandidateMethod;

/// Which pass selected a candidate.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tier {
    ExactArity,
    Varargs,
}

/// A selected candidate and how to pass it the arguments.
#[derive(Clone, Debug)]
pub struct ResolvedCall {
    pub candidate: Arc<CandidateMethod>,
    pub plan: CoercionPlan,
    pub distance: Distance,
    pub tier: Tier,
}

/// Outcome of [`OverloadResolver::resolve`]. Failures are plain data.
#[derive(Clone, Debug)]
pub enum MethodResolution {
    Resolved(ResolvedCall),
    NoMatch,
    /// The candidates tied for the minimum distance, in bucket order.
    Ambiguous(Vec<Arc<CandidateMethod>>),
}

impl MethodResolution {
    pub fn resolved(&self) -> Option<&ResolvedCall> {
        match self {
            MethodResolution::Resolved(call) => Some(call),
            MethodResolution::NoMatch | MethodResolution::Ambiguous(_) => None,
        }
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, MethodResolution::NoMatch)
    }
}

/// Stateless; resolution is a pure function of the bucket and the shapes.
#[derive(Copy, Clone)]
pub struct OverloadResolver<'a> {
    engine: &'a CoercionEngine,
}

impl<'a> OverloadResolver<'a> {
    pub fn new(engine: &'a CoercionEngine) -> Self {
        Self { engine }
    }

    /// Resolve against the runtime shapes of `args`.
    pub fn resolve_values(&self, bucket: &MethodBucket, args: &[Value]) -> MethodResolution {
        let shapes: SmallVec<[ArgShape; 4]> = args.iter().map(|a| self.engine.shape_of(a)).collect();
        self.resolve(bucket, &shapes)
    }

    #[tracing::instrument(
        level = "trace",
        skip_all,
        fields(candidates = bucket.len(), args = shapes.len())
    )]
    pub fn resolve(&self, bucket: &MethodBucket, shapes: &[ArgShape]) -> MethodResolution {
        self.resolve_excluding(bucket, shapes, &[])
    }

    /// [`resolve`](Self::resolve) as if the `excluded` candidates were not in
    /// the bucket. Used when a selected candidate cannot take the actual
    /// argument values.
    pub fn resolve_excluding(
        &self,
        bucket: &MethodBucket,
        shapes: &[ArgShape],
        excluded: &[Arc<CandidateMethod>],
    ) -> MethodResolution {
        let admitted = |c: &&Arc<CandidateMethod>| !excluded.iter().any(|e| Arc::ptr_eq(e, c));
        let exact: Vec<ResolvedCall> = bucket
            .with_arity(shapes.len())
            .filter(admitted)
            .filter_map(|c| self.score_exact(c, shapes))
            .collect();
        if !exact.is_empty() {
            return self.select(exact);
        }

        let varargs: Vec<ResolvedCall> = bucket
            .vararg_eligible(shapes.len())
            .filter(admitted)
            .filter_map(|c| self.score_varargs(c, shapes))
            .collect();
        if varargs.is_empty() {
            trace!("no compatible candidate");
            return MethodResolution::NoMatch;
        }
        self.select(varargs)
    }

    /// Every candidate of the bucket that accepts `shapes` in either tier.
    pub fn compatible(&self, bucket: &MethodBucket, shapes: &[ArgShape]) -> Vec<Arc<CandidateMethod>> {
        bucket
            .candidates()
            .iter()
            .filter(|c| {
                (c.arity() == shapes.len() && self.score_exact(c, shapes).is_some())
                    || (c.is_varargs()
                        && c.fixed_arity() <= shapes.len()
                        && self.score_varargs(c, shapes).is_some())
            })
            .cloned()
            .collect()
    }

    fn score_exact(&self, candidate: &Arc<CandidateMethod>, shapes: &[ArgShape]) -> Option<ResolvedCall> {
        let mut distance = Distance::EXACT;
        let mut conversions = SmallVec::with_capacity(shapes.len());
        for (param, shape) in candidate.params().iter().zip(shapes) {
            let coercion = self.engine.try_coerce(param, shape).compatible()?;
            distance = distance + coercion.distance;
            conversions.push(coercion.conversion);
        }
        Some(ResolvedCall {
            candidate: Arc::clone(candidate),
            plan: CoercionPlan {
                conversions,
                pack: None,
            },
            distance,
            tier: Tier::ExactArity,
        })
    }

    fn score_varargs(&self, candidate: &Arc<CandidateMethod>, shapes: &[ArgShape]) -> Option<ResolvedCall> {
        let element = candidate.vararg_element()?;
        let fixed = candidate.fixed_arity();
        let mut distance = Distance::EXACT;
        let mut conversions: SmallVec<[Conversion; 4]> = SmallVec::with_capacity(shapes.len());
        for (i, shape) in shapes.iter().enumerate() {
            let param = candidate.params().get(i).filter(|_| i < fixed).unwrap_or(element);
            let coercion = self.engine.try_coerce(param, shape).compatible()?;
            distance = distance + coercion.distance;
            conversions.push(coercion.conversion);
        }
        Some(ResolvedCall {
            candidate: Arc::clone(candidate),
            plan: CoercionPlan {
                conversions,
                pack: Some(VarargPack {
                    start: fixed,
                    component: element.clone(),
                }),
            },
            distance,
            tier: Tier::Varargs,
        })
    }

    fn select(&self, scored: Vec<ResolvedCall>) -> MethodResolution {
        let Some(best) = scored.iter().map(|s| s.distance).min() else {
            return MethodResolution::NoMatch;
        };
        let mut tied: Vec<ResolvedCall> = scored.into_iter().filter(|s| s.distance == best).collect();

        if tied.len() > 1 {
            let declaring: Vec<ClassRef> = tied.iter().map(|s| ClassRef::clone(s.candidate.declaring())).collect();
            tied.retain(|s| {
                !declaring
                    .iter()
                    .any(|other| self.is_strict_supertype(s.candidate.declaring(), other))
            });
        }
        if tied.len() > 1 && tied.iter().any(|s| !s.candidate.is_varargs()) {
            tied.retain(|s| !s.candidate.is_varargs());
        }

        if tied.len() == 1 {
            if let Some(call) = tied.pop() {
                trace!(distance = %call.distance, tier = ?call.tier, "resolved");
                return MethodResolution::Resolved(call);
            }
        }
        trace!(tied = tied.len(), distance = %best, "ambiguous");
        MethodResolution::Ambiguous(tied.into_iter().map(|s| s.candidate).collect())
    }

    /// `ancestor` is a proper supertype of `class`. Every type, interfaces
    /// included, descends from `Object`.
    fn is_strict_supertype(&self, ancestor: &ClassRef, class: &ClassRef) -> bool {
        ancestor.id() != class.id()
            && (class.is_subtype_of(ancestor.id())
                || ancestor.id() == self.engine.well_known().object.id())
    }
}

#[cfg(test)]
mod tests;
