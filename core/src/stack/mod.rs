//! Slot references and the anchors that own stack slots.
//!
//! Every anchor ([`Value`], [`Table`], [`Valset`]) pops exactly the slots it
//! owns when dropped, so anchors must go out of scope in reverse creation
//! order. With `watch_stack` on, a violation panics.

mod context;
mod convert;
mod state;
mod table;
mod userdata;
mod valref;
mod valset;
mod value;
mod wrap;

#[cfg(test)]
mod context_test;
#[cfg(test)]
mod valset_test;

pub use context::{ArgTypes, Context, Registry};
pub use convert::{FromSlot, Native, NativeKind, convert_to};
pub use state::State;
pub use table::{RawAccess, Table};
pub use userdata::UserData;
pub use valref::Valref;
pub use valset::Valset;
pub use value::Value;
pub use wrap::{Function, IntoNative, IntoRet, RegistryKey, Retval, wrap};

pub(crate) use valref::compare;
