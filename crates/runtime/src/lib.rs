//! Runtime data model for the Rye scripting language.
//!
//! Script data is a tagged [`Value`]. Composite values (arrays, objects,
//! closures) do not embed their elements; each slot holds a reference to a
//! [`Variable`] cell owned by the [`GarbageCollector`], which is what makes
//! in-place mutation observable through every holder and what makes reference
//! cycles possible. The collector reclaims those cycles with a generational
//! pass layered on top of the reference counts.
//!
//! A collector and the cells it tracks form a single-threaded,
//! per-interpreter ownership domain; none of these types are `Send`.

use std::io::Write;
use std::sync::OnceLock;

mod collector;
mod value;
mod variable;

pub use collector::{GENERATION_COUNT, GarbageCollector, Generation};
pub use value::{Closure, ObjectMap, Value};
pub use variable::{VarRef, Variable};

static GC_LOG: OnceLock<bool> = OnceLock::new();

/// Collector tracing is gated on the `RYE_GC_LOG` environment variable.
pub(crate) fn gc_log_enabled() -> bool {
    *GC_LOG.get_or_init(|| std::env::var_os("RYE_GC_LOG").is_some_and(|v| v != "0"))
}

pub(crate) fn gc_log(message: std::fmt::Arguments<'_>) {
    let _ = writeln!(std::io::stderr(), "[rye runtime] {}", message);
}
