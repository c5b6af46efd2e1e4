//! Dispatch failures.
//!
//! Resolution failures are plain data until they reach an outer `invoke`
//! boundary, where they surface as [`DispatchError`]. Constructors for the
//! diagnostics-heavy variants live here so every call path formats receiver
//! and argument types the same way.

use std::fmt;

use mop_types::{ClassRef, MemberCategory, Value};

/// Result type of every dispatch entry point.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Typed dispatch failure.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// No candidate in any tier accepted the arguments.
    #[error(
        "no signature of method {receiver_type}.{name}() is applicable for argument types: ({}){}",
        .arg_types.join(", "),
        possible_solutions(.suggestions)
    )]
    NoApplicableMethod {
        receiver_type: String,
        name: String,
        arg_types: Vec<String>,
        /// Overloads of the same name, then of similarly named methods.
        suggestions: Vec<String>,
    },

    /// Two or more candidates tied in the winning tier.
    #[error(
        "ambiguous method overloading for {receiver_type}.{name}() with argument types ({}); candidates: {}",
        .arg_types.join(", "),
        .candidates.join(", ")
    )]
    AmbiguousMethod {
        receiver_type: String,
        name: String,
        arg_types: Vec<String>,
        candidates: Vec<String>,
    },

    /// The receiver's class loader is gone.
    #[error("class {type_name} has been unloaded")]
    TargetUnloaded { type_name: String },

    /// A candidate whose arity and vararg metadata disagree.
    #[error("invalid method {name}: {reason}")]
    InvalidCandidate { name: String, reason: String },

    /// A numeric value out of range for the conversion target.
    #[error("cannot convert {value} from {from} to {to} without loss")]
    CoercionOverflow {
        value: String,
        from: String,
        to: String,
    },

    /// A collection element that cannot be stored in the target array.
    #[error("cannot convert {actual} to {expected}")]
    ArgumentMismatch { expected: String, actual: String },

    #[error("no such property: {name} for class {receiver_type}")]
    NoSuchProperty { receiver_type: String, name: String },

    #[error("unknown call site #{0}")]
    UnknownCallSite(u32),

    /// An abstract method invoked on something other than an adapted closure.
    #[error("cannot invoke abstract method {declaring}.{name}()")]
    AbstractMethod { declaring: String, name: String },

    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    /// Error raised by the invoked code itself.
    #[error("{name}() failed: {message}")]
    Invocation { name: String, message: String },
}

impl DispatchError {
    /// Whether this failure came out of overload resolution.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            DispatchError::NoApplicableMethod { .. } | DispatchError::AmbiguousMethod { .. }
        )
    }
}

fn possible_solutions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!("; possible solutions: {}", suggestions.join(", "))
    }
}

/// Runtime type names of call arguments, for diagnostics.
pub(crate) fn arg_type_names(args: &[Value]) -> Vec<String> {
    args.iter().map(|a| a.type_name().to_owned()).collect()
}

#[cold]
pub(crate) fn no_applicable_method(
    receiver: &ClassRef,
    name: &str,
    args: &[Value],
    suggestions: Vec<String>,
) -> DispatchError {
    DispatchError::NoApplicableMethod {
        receiver_type: receiver.name().to_owned(),
        name: name.to_owned(),
        arg_types: arg_type_names(args),
        suggestions,
    }
}

#[cold]
pub(crate) fn ambiguous_method(
    receiver: &ClassRef,
    name: &str,
    args: &[Value],
    candidates: Vec<String>,
) -> DispatchError {
    DispatchError::AmbiguousMethod {
        receiver_type: receiver.name().to_owned(),
        name: name.to_owned(),
        arg_types: arg_type_names(args),
        candidates,
    }
}

#[cold]
pub(crate) fn target_unloaded(class: &ClassRef) -> DispatchError {
    DispatchError::TargetUnloaded {
        type_name: class.name().to_owned(),
    }
}

#[cold]
pub(crate) fn no_such_property(receiver: &ClassRef, name: &str) -> DispatchError {
    DispatchError::NoSuchProperty {
        receiver_type: receiver.name().to_owned(),
        name: name.to_owned(),
    }
}

/// A member skipped during introspection.
///
/// Kept on the type descriptor for diagnostics; never returned from dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntrospectionUnavailable {
    pub type_name: String,
    pub category: MemberCategory,
    pub member: String,
    pub reason: String,
}

impl fmt::Display for IntrospectionUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{} unavailable: {}",
            self.category, self.type_name, self.member, self.reason
        )
    }
}
