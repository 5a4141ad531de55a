use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::lazy::{IntoOperands, Lazy, Op, Operand, push_operand, push_series};
use crate::val::{Val, ValueType};
use crate::vm::CompareOp;

use super::context::Context;
use super::convert::FromSlot;
use super::userdata::UserData;

/// A non-owning reference to one stack position.
///
/// Copies alias the same slot. A `Valref` is only meaningful while nothing
/// below its position has been popped.
#[derive(Clone, Copy)]
pub struct Valref<'c> {
    pub(crate) ctx: &'c Context<'c>,
    pub(crate) pos: usize,
}

impl<'c> Valref<'c> {
    pub(crate) fn new(ctx: &'c Context<'c>, pos: usize) -> Self {
        Self { ctx, pos }
    }

    pub fn context(&self) -> &'c Context<'c> {
        self.ctx
    }

    /// 1-based position in the owning context.
    pub fn index(&self) -> usize {
        self.pos
    }

    /// Current content of the slot.
    pub fn get(&self) -> Option<Val> {
        self.ctx.value_at(self.pos)
    }

    pub fn type_of(&self) -> ValueType {
        self.get().map_or(ValueType::None, |v| v.type_of())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self.type_of(), ValueType::Nil | ValueType::None)
    }

    pub fn is<T: FromSlot>(&self) -> bool {
        self.get().is_some_and(|v| T::is_kind(&v))
    }

    /// Strict conversion; fails with a conversion error.
    pub fn cast<T: FromSlot>(&self) -> Result<T> {
        T::from_slot(self.get().as_ref())
    }

    /// Conversion falling back to `backup` when the slot holds something else.
    pub fn to_or<T: FromSlot>(&self, backup: T) -> T {
        self.cast().unwrap_or(backup)
    }

    pub fn to_bool(&self) -> bool {
        self.get().is_some_and(|v| v.truthy())
    }

    pub fn eq(&self, rhs: impl Into<Operand<'c>>) -> Result<bool> {
        compare(self.ctx, Operand::Slot(self.pos), rhs.into(), CompareOp::Eq)
    }

    pub fn lt(&self, rhs: impl Into<Operand<'c>>) -> Result<bool> {
        compare(self.ctx, Operand::Slot(self.pos), rhs.into(), CompareOp::Lt)
    }

    pub fn le(&self, rhs: impl Into<Operand<'c>>) -> Result<bool> {
        compare(self.ctx, Operand::Slot(self.pos), rhs.into(), CompareOp::Le)
    }

    /// Primitive equality, without `__eq`.
    pub fn raw_equal(&self, other: &Valref<'_>) -> bool {
        self.ctx.is_valid(self.pos)
            && other.ctx.is_valid(other.pos)
            && self.ctx.vm.raw_equal(self.ctx.abs(self.pos), other.ctx.abs(other.pos))
    }

    /// Overwrites the slot.
    pub fn set(&self, value: impl Into<Operand<'c>>) -> Result<()> {
        let mut value = value.into();
        if !self.ctx.is_valid(self.pos) {
            value.move_out();
            return Err(Error::composition(format!("invalid stack position {}", self.pos)));
        }
        push_operand(self.ctx, &mut value, false)?;
        self.ctx.vm.replace(self.ctx.abs(self.pos));
        Ok(())
    }

    /// `self[key]`, honouring `__index` / `__newindex`.
    pub fn at(&self, key: impl Into<Operand<'c>>) -> Lazy<'c> {
        Lazy::index(self.ctx, Operand::Slot(self.pos), key.into(), false)
    }

    pub fn call(&self, args: impl IntoOperands<'c>) -> Lazy<'c> {
        Lazy::call_of(self.ctx, Operand::Slot(self.pos), args.into_operands(), false)
    }

    pub fn pcall(&self, args: impl IntoOperands<'c>) -> Lazy<'c> {
        Lazy::call_of(self.ctx, Operand::Slot(self.pos), args.into_operands(), true)
    }

    pub fn len(&self) -> Lazy<'c> {
        Lazy::new(self.ctx, Op::Len(Box::new(Operand::Slot(self.pos))))
    }

    /// Metatable of the value, assignable.
    pub fn mt(&self) -> Lazy<'c> {
        Lazy::new(self.ctx, Op::Metatable(Box::new(Operand::Slot(self.pos))))
    }

    pub fn set_mt(&self, mt: impl Into<Operand<'c>>) -> Result<()> {
        self.mt().set(mt)
    }

    /// Upvalue `i` of the function in this slot, assignable.
    pub fn upvalue(&self, i: usize) -> Lazy<'c> {
        Lazy::new(
            self.ctx,
            Op::Upvalue {
                func: Some(Box::new(Operand::Slot(self.pos))),
                index: i,
            },
        )
    }

    pub fn is_userdata<T: UserData>(&self) -> bool {
        matches!(self.get(), Some(Val::UserData(u)) if u.class == T::CLASS_NAME && u.data.is::<T>())
    }

    pub fn cast_userdata<T: UserData>(&self) -> Result<Rc<T>> {
        match self.get() {
            Some(Val::UserData(u)) if u.class == T::CLASS_NAME => u
                .data
                .clone()
                .downcast::<T>()
                .map_err(|_| Error::conversion(T::CLASS_NAME, ValueType::UserData)),
            other => Err(Error::conversion(
                T::CLASS_NAME,
                other.map_or(ValueType::None, |v| v.type_of()),
            )),
        }
    }
}

pub(crate) fn compare<'c>(
    ctx: &'c Context<'c>,
    lhs: Operand<'c>,
    rhs: Operand<'c>,
    op: CompareOp,
) -> Result<bool> {
    let mut items = vec![lhs, rhs];
    push_series(ctx, &mut items, false)?;
    ctx.vm.compare(op)
}

impl fmt::Debug for Valref<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(v) => write!(f, "Valref({}: {v:?})", self.pos),
            None => write!(f, "Valref({}: no value)", self.pos),
        }
    }
}
