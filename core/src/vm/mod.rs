//! The interpreter stack and its primitive operations.
//!
//! Everything above this module composes these primitives; nothing here knows
//! about anchors or deferred operations.

mod guards;
mod machine;
mod stats;

pub use machine::Machine;
pub use stats::{Primitive, PrimitiveStats, StatsSnapshot};

pub use crate::op::{ArithOp, CompareOp};

#[cfg(test)]
mod vm_test;
