//! Mop Dispatch - method resolution and call-site caching for a dynamic
//! language running on a class-based host.
//!
//! # Architecture
//!
//! - [`descriptor`]: per-class dispatch metadata, cached per class loader
//! - [`coercion`]: argument-to-parameter compatibility and conversion
//! - [`registry`]: runtime method registration and merged bucket lookup
//! - [`resolver`]: two-tier overload resolution over a bucket
//! - [`call_site`]: per-site guarded caching of the last resolution
//! - [`Runtime`]: the entry points tying the pieces together
//!
//! # Example
//!
//! ```
//! use mop_dispatch::Runtime;
//! use mop_types::Value;
//!
//! let runtime = Runtime::new();
//! let site = runtime.call_site();
//! let shout = runtime
//!     .invoke_method(site, &Value::string("hi"), "toUpperCase", vec![])
//!     .unwrap();
//! assert_eq!(shout, Value::string("HI"));
//! ```

pub mod call_site;
mod candidate;
pub mod coercion;
mod config;
pub mod descriptor;
mod errors;
mod names;
pub mod registry;
pub mod resolver;
mod runtime;
mod suggest;

#[cfg(test)]
mod test_helpers;

use std::sync::Once;

pub use call_site::{CacheState, CallSiteId, CallSiteStats};
pub use candidate::{CandidateMethod, DynamicMethod, MethodKind, Origin, Signature};
pub use coercion::{Applied, ArgShape, CoercionEngine, CoercionOutcome, CoercionPlan, Conversion, Distance};
pub use config::DispatchConfig;
pub use descriptor::{DescriptorCache, TypeDescriptor};
pub use errors::{DispatchError, DispatchResult, IntrospectionUnavailable};
pub use registry::{BucketKey, LookupScope, MethodBucket, MethodRegistry};
pub use resolver::{MethodResolution, OverloadResolver, ResolvedCall, Tier};
pub use runtime::{BinaryOp, Runtime, RuntimeBuilder};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for dispatch diagnostics.
///
/// Reads the filter from `RUST_LOG` (e.g. `RUST_LOG=mop_dispatch=debug`) and
/// does nothing when it is unset. With `MOP_LOG_TREE` set, spans render as an
/// indented tree instead of flat lines. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let filter = EnvFilter::from_default_env();
        let registry = tracing_subscriber::registry().with(filter);
        if std::env::var("MOP_LOG_TREE").is_ok() {
            registry
                .with(tracing_tree::HierarchicalLayer::new(2).with_targets(true))
                .init();
        } else {
            registry
                .with(fmt::layer().with_target(true).with_level(true))
                .init();
        }
    });
}
