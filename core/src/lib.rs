//! Composition of stack operations over an embedded interpreter's shared
//! value stack.
//!
//! [`vm::Machine`] is the interpreter side: a LIFO stack of [`val::Val`]
//! slots and the primitives that operate on it. [`stack`] provides owned and
//! borrowed handles to slots, and [`lazy`] builds expressions such as
//! `t.at("k").call((1, 2)) & "!"` that materialize as one stack-balanced
//! burst of primitives.

pub mod config;
pub mod error;
pub mod lazy;
mod op;
pub mod stack;
mod util;
pub mod val;
pub mod vm;

#[cfg(test)]
mod config_test;

pub use config::{DiscardPolicy, StateConfig};
pub use error::{Error, Result};
pub use lazy::{IntoOperands, Lazy, Operand};
pub use stack::{
    Context, FromSlot, Function, Native, NativeKind, Registry, RegistryKey, Retval, State, Table, UserData, Valref,
    Valset, Value, convert_to, wrap,
};
pub use val::{LightUserData, Val, ValueType};
pub use vm::{ArithOp, CompareOp, StatsSnapshot};
