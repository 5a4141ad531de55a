//! Values stored in the machine's stack slots.

mod convert;
mod ops;
mod table;
mod types;

#[cfg(test)]
mod val_test;

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub use ops::{format_float, to_integer, to_number};
pub use table::{TableData, TableRef};
pub use types::ValueType;

pub(crate) use ops::{to_concat_str, to_float};

use crate::error::Result;
use crate::vm::Machine;

/// Machine-level function: reads its arguments from the current frame and
/// reports how many values on top of the stack are its results.
pub type RawFn = Rc<dyn Fn(&Machine) -> Result<usize>>;

/// A function value together with its upvalues.
pub struct Closure {
    pub(crate) func: RawFn,
    pub(crate) upvalues: RefCell<Vec<Val>>,
}

impl Closure {
    pub fn new(func: RawFn, upvalues: Vec<Val>) -> Self {
        Self {
            func,
            upvalues: RefCell::new(upvalues),
        }
    }

    pub fn upvalue_count(&self) -> usize {
        self.upvalues.borrow().len()
    }
}

/// An opaque pointer-sized handle owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LightUserData(pub usize);

/// Host object stored in a full userdata slot.
pub struct UserDataCell {
    pub(crate) class: &'static str,
    pub(crate) data: Rc<dyn Any>,
    pub(crate) metatable: RefCell<Option<TableRef>>,
}

impl UserDataCell {
    pub fn new(class: &'static str, data: Rc<dyn Any>) -> Self {
        Self {
            class,
            data,
            metatable: RefCell::new(None),
        }
    }

    pub fn class(&self) -> &'static str {
        self.class
    }
}

#[derive(Clone, Default)]
pub enum Val {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Number(f64),
    Str(Rc<str>),
    Table(TableRef),
    Function(Rc<Closure>),
    LightUserData(LightUserData),
    UserData(Rc<UserDataCell>),
}

impl Val {
    #[inline]
    pub fn type_of(&self) -> ValueType {
        match self {
            Val::Nil => ValueType::Nil,
            Val::Bool(_) => ValueType::Boolean,
            Val::Int(_) | Val::Number(_) => ValueType::Number,
            Val::Str(_) => ValueType::String,
            Val::Table(_) => ValueType::Table,
            Val::Function(_) => ValueType::Function,
            Val::LightUserData(_) => ValueType::LightUserData,
            Val::UserData(_) => ValueType::UserData,
        }
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Val::Nil)
    }

    /// Everything except `nil` and `false` is true.
    #[inline]
    pub fn truthy(&self) -> bool {
        !matches!(self, Val::Nil | Val::Bool(false))
    }

    pub fn new_table() -> Self {
        Val::Table(TableData::new_ref(0, 0))
    }

    /// Identity for reference types, value equality otherwise. Integers and
    /// floats with the same mathematical value are equal.
    pub fn raw_eq(&self, other: &Val) -> bool {
        match (self, other) {
            (Val::Nil, Val::Nil) => true,
            (Val::Bool(a), Val::Bool(b)) => a == b,
            (Val::Int(a), Val::Int(b)) => a == b,
            (Val::Number(a), Val::Number(b)) => a == b,
            (Val::Int(a), Val::Number(b)) | (Val::Number(b), Val::Int(a)) => (*a as f64) == *b,
            (Val::Str(a), Val::Str(b)) => a == b,
            (Val::Table(a), Val::Table(b)) => Rc::ptr_eq(a, b),
            (Val::Function(a), Val::Function(b)) => Rc::ptr_eq(a, b),
            (Val::LightUserData(a), Val::LightUserData(b)) => a == b,
            (Val::UserData(a), Val::UserData(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Metatable of a table or full userdata.
    pub fn metatable(&self) -> Option<TableRef> {
        match self {
            Val::Table(t) => t.borrow().metatable.clone(),
            Val::UserData(u) => u.metatable.borrow().clone(),
            _ => None,
        }
    }

    /// Raw lookup of `event` in the metatable.
    pub fn metamethod(&self, event: &str) -> Option<Val> {
        let mt = self.metatable()?;
        let handler = mt.borrow().get_str(event);
        if handler.is_nil() { None } else { Some(handler) }
    }

    fn address(&self) -> usize {
        match self {
            Val::Table(t) => Rc::as_ptr(t) as *const () as usize,
            Val::Function(f) => Rc::as_ptr(f) as *const () as usize,
            Val::UserData(u) => Rc::as_ptr(u) as *const () as usize,
            Val::LightUserData(p) => p.0,
            _ => 0,
        }
    }
}

impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        self.raw_eq(other)
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Nil => f.write_str("nil"),
            Val::Bool(b) => write!(f, "{b}"),
            Val::Int(i) => {
                let mut buf = itoa::Buffer::new();
                f.write_str(buf.format(*i))
            }
            Val::Number(n) => f.write_str(&format_float(*n)),
            Val::Str(s) => f.write_str(s),
            other => write!(f, "{}: {:#x}", other.type_of(), other.address()),
        }
    }
}

impl fmt::Debug for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Str(s) => write!(f, "{s:?}"),
            Val::UserData(u) => write!(f, "userdata<{}>: {:#x}", u.class, self.address()),
            other => fmt::Display::fmt(other, f),
        }
    }
}
