//! Native functions registered into a state's globals.
//!
//! Every function here is written against the public composition API of
//! `stackbind-core`, the same way an embedding application would write them.

pub mod base;
pub mod math;
pub mod string;

#[cfg(test)]
mod math_test;
#[cfg(test)]
mod string_test;

use stackbind_core::{Context, Error, Result, Valref, ValueType};
use tracing::debug;

pub use base::open_base;
pub use math::open_math;
pub use string::open_string;

/// Registers every library.
pub fn open_all(ctx: &Context<'_>) -> Result<()> {
    open_base(ctx)?;
    open_math(ctx)?;
    open_string(ctx)?;
    debug!(target: "stackbind::stdlib", "opened base, math and string");
    Ok(())
}

/// `bad argument #n to 'name' (detail)`.
pub(crate) fn bad_argument(n: usize, name: &str, detail: impl std::fmt::Display) -> Error {
    Error::runtime(format!("bad argument #{n} to '{name}' ({detail})"))
}

/// Rejects argument `n` unless it holds a value of type `expected`.
pub(crate) fn expect_type(arg: Valref<'_>, n: usize, name: &str, expected: ValueType) -> Result<()> {
    let found = arg.type_of();
    if found != expected {
        return Err(bad_argument(n, name, format_args!("{expected} expected, got {found}")));
    }
    Ok(())
}
