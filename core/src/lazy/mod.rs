//! Deferred operations.
//!
//! A [`Lazy`] describes a chain of pending stack operations without touching
//! the stack. It is materialized exactly once: pushed as one value, pushed
//! with all of its values, assigned to, or dropped. Dropping an armed
//! operation of a non-discardable kind still performs it (and pops the
//! result) so its side effects happen.
//!
//! Materialization runs strictly left to right, depth first. On failure,
//! everything pushed for the failing operation is popped and every operand
//! not yet materialized is moved out, so the stack ends where it started.

mod arith;
mod call;
mod concat;
mod index;
mod meta;
mod operand;
mod series;
mod table;


use std::fmt;

use tracing::debug;

use crate::config::DiscardPolicy;
use crate::error::{Error, Result};
use crate::stack::{Context, FromSlot, Function, Table, Valset, Value, compare};
use crate::val::ValueType;
use crate::vm::{ArithOp, CompareOp};

pub use operand::{IntoOperands, Operand};

pub(crate) use arith::Step;
pub(crate) use operand::push_operand;
pub(crate) use series::push_series;

/// How many values a materialization must leave on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Want {
    /// Exactly one; extra results are truncated, missing ones are nil.
    One,
    /// Every value the operation yields.
    All,
    /// Nothing. Only calls honour this; they request zero results.
    None,
}

/// What an index operation reads from or writes to.
pub(crate) enum Target<'c> {
    Value(Box<Operand<'c>>),
    Globals,
    Registry,
}

pub(crate) enum Op<'c> {
    Index {
        target: Target<'c>,
        key: Box<Operand<'c>>,
        raw: bool,
    },
    Call {
        callee: Box<Operand<'c>>,
        args: Vec<Operand<'c>>,
        protected: bool,
    },
    Concat(Vec<Operand<'c>>),
    Arith(Vec<Step<'c>>),
    Closure {
        func: Function,
        upvalues: Vec<Operand<'c>>,
    },
    Len(Box<Operand<'c>>),
    Metatable(Box<Operand<'c>>),
    Upvalue {
        func: Option<Box<Operand<'c>>>,
        index: usize,
    },
    TableArray(Vec<Operand<'c>>),
    TableRecords(Vec<(Operand<'c>, Operand<'c>)>),
    /// Left behind when the operands were merged into another operation.
    Spent,
}

impl<'c> Op<'c> {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Op::Index { raw: false, .. } => "index",
            Op::Index { raw: true, .. } => "raw index",
            Op::Call { protected: false, .. } => "call",
            Op::Call { protected: true, .. } => "pcall",
            Op::Concat(_) => "concat",
            Op::Arith(_) => "arith",
            Op::Closure { .. } => "closure",
            Op::Len(_) => "len",
            Op::Metatable(_) => "metatable",
            Op::Upvalue { .. } => "upvalue",
            Op::TableArray(_) | Op::TableRecords(_) => "table",
            Op::Spent => "spent",
        }
    }

    fn non_discardable(&self, policy: &DiscardPolicy) -> bool {
        match self {
            Op::Call { .. } => true,
            Op::Index { raw: false, .. } => policy.index,
            Op::Concat(_) => policy.concat,
            Op::Arith(_) => policy.arithmetic,
            _ => false,
        }
    }

    fn move_out(&mut self) {
        match self {
            Op::Index { target, key, .. } => {
                if let Target::Value(t) = target {
                    t.move_out();
                }
                key.move_out();
            }
            Op::Call { callee, args, .. } => {
                callee.move_out();
                args.iter_mut().for_each(Operand::move_out);
            }
            Op::Concat(ops) | Op::TableArray(ops) | Op::Closure { upvalues: ops, .. } => {
                ops.iter_mut().for_each(Operand::move_out);
            }
            Op::Arith(steps) => steps.iter_mut().for_each(Step::move_out),
            Op::Len(v) | Op::Metatable(v) | Op::Upvalue { func: Some(v), .. } => v.move_out(),
            Op::TableRecords(pairs) => pairs.iter_mut().for_each(|(k, v)| {
                k.move_out();
                v.move_out();
            }),
            Op::Upvalue { func: None, .. } | Op::Spent => {}
        }
    }

    fn emit(&mut self, ctx: &'c Context<'c>, want: Want) -> Result<usize> {
        match self {
            Op::Index { target, key, raw } => index::emit(ctx, target, key, *raw),
            Op::Call {
                callee,
                args,
                protected,
            } => call::emit(ctx, callee, args, *protected, want),
            Op::Concat(ops) => concat::emit(ctx, ops),
            Op::Arith(steps) => arith::emit(ctx, steps),
            Op::Closure { func, upvalues } => table::emit_closure(ctx, func, upvalues),
            Op::Len(v) => meta::emit_len(ctx, v),
            Op::Metatable(v) => meta::emit_metatable(ctx, v),
            Op::Upvalue { func, index } => meta::emit_upvalue(ctx, func.as_deref_mut(), *index),
            Op::TableArray(items) => table::emit_array(ctx, items),
            Op::TableRecords(pairs) => table::emit_records(ctx, pairs),
            Op::Spent => Err(Error::composition("attempt to use a consumed expression")),
        }
    }
}

/// A pending operation; see the module docs.
#[must_use = "a dropped operation is discarded, which may still run it"]
pub struct Lazy<'c> {
    pub(crate) ctx: &'c Context<'c>,
    pub(crate) op: Op<'c>,
    armed: bool,
}

impl<'c> Lazy<'c> {
    pub(crate) fn new(ctx: &'c Context<'c>, op: Op<'c>) -> Self {
        Self { ctx, op, armed: true }
    }

    pub(crate) fn index(ctx: &'c Context<'c>, target: Operand<'c>, key: Operand<'c>, raw: bool) -> Self {
        Self::new(
            ctx,
            Op::Index {
                target: Target::Value(Box::new(target)),
                key: Box::new(key),
                raw,
            },
        )
    }

    pub(crate) fn call_of(ctx: &'c Context<'c>, callee: Operand<'c>, args: Vec<Operand<'c>>, protected: bool) -> Self {
        Self::new(
            ctx,
            Op::Call {
                callee: Box::new(callee),
                args,
                protected,
            },
        )
    }

    pub fn context(&self) -> &'c Context<'c> {
        self.ctx
    }

    /// Whether dropping the operation now would still run it.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Gives up the operation without running it, including every nested one.
    pub fn move_out(&mut self) {
        self.armed = false;
        self.op.move_out();
    }

    pub(crate) fn emit(&mut self, want: Want) -> Result<usize> {
        self.armed = false;
        debug!(target: "stackbind::lazy", kind = self.op.kind(), mode = ?want, "materialize");
        let result = self.op.emit(self.ctx, want);
        if result.is_err() {
            self.op.move_out();
        }
        result
    }

    /// Pushes every value; also reports the status of a protected call.
    pub(crate) fn emit_all(mut self) -> Result<(usize, bool)> {
        let protected = matches!(self.op, Op::Call { protected: true, .. });
        self.ctx.last_pcall.set(None);
        let n = self.emit(Want::All)?;
        let success = !protected || self.ctx.last_pcall.take().unwrap_or(true);
        Ok((n, success))
    }

    /// Pushes the single result into a new owned slot.
    pub fn to_value(mut self) -> Result<Value<'c>> {
        self.emit(Want::One)?;
        Ok(Value::at_top(self.ctx))
    }

    pub fn to_table(self) -> Result<Table<'c>> {
        Table::from_value(self.to_value()?)
    }

    /// Pushes every result into a new valset.
    pub fn to_valset(self) -> Result<Valset<'c>> {
        Valset::from_lazy(self)
    }

    /// Runs the operation and converts its single result.
    pub fn cast<T: FromSlot>(mut self) -> Result<T> {
        self.emit(Want::One)?;
        let v = self.ctx.value_at(self.ctx.depth());
        self.ctx.vm.pop(1);
        T::from_slot(v.as_ref())
    }

    pub fn is<T: FromSlot>(mut self) -> Result<bool> {
        self.emit(Want::One)?;
        let v = self.ctx.value_at(self.ctx.depth());
        self.ctx.vm.pop(1);
        Ok(v.is_some_and(|v| T::is_kind(&v)))
    }

    pub fn type_of(mut self) -> Result<ValueType> {
        self.emit(Want::One)?;
        let t = self.ctx.value_at(self.ctx.depth()).map_or(ValueType::None, |v| v.type_of());
        self.ctx.vm.pop(1);
        Ok(t)
    }

    pub fn to_bool(self) -> Result<bool> {
        self.cast()
    }

    /// Performs the operation for its side effects, whatever its kind.
    pub fn run(mut self) -> Result<()> {
        if let Op::Call { .. } = self.op {
            self.emit(Want::None)?;
        } else {
            self.emit(Want::One)?;
            self.ctx.vm.pop(1);
        }
        Ok(())
    }

    /// Assigns `value` to the place this operation reads from: an index,
    /// an upvalue or a metatable.
    pub fn set(mut self, value: impl Into<Operand<'c>>) -> Result<()> {
        let mut value = value.into();
        self.armed = false;
        debug!(target: "stackbind::lazy", kind = self.op.kind(), "assign");
        let ctx = self.ctx;
        let result = match &mut self.op {
            Op::Index { target, key, raw } => index::assign(ctx, target, key, &mut value, *raw),
            Op::Upvalue { func, index } => meta::assign_upvalue(ctx, func.as_deref_mut(), *index, &mut value),
            Op::Metatable(target) => meta::assign_metatable(ctx, target, &mut value),
            _ => Err(Error::composition("attempt to assign to a non-assignable expression")),
        };
        if result.is_err() {
            self.op.move_out();
            value.move_out();
        }
        result
    }

    pub fn eq(self, rhs: impl Into<Operand<'c>>) -> Result<bool> {
        compare(self.ctx, Operand::Lazy(self), rhs.into(), CompareOp::Eq)
    }

    pub fn lt(self, rhs: impl Into<Operand<'c>>) -> Result<bool> {
        compare(self.ctx, Operand::Lazy(self), rhs.into(), CompareOp::Lt)
    }

    pub fn le(self, rhs: impl Into<Operand<'c>>) -> Result<bool> {
        compare(self.ctx, Operand::Lazy(self), rhs.into(), CompareOp::Le)
    }

    pub fn at(self, key: impl Into<Operand<'c>>) -> Lazy<'c> {
        Lazy::index(self.ctx, Operand::Lazy(self), key.into(), false)
    }

    /// `rawget(self, key)`; assigning to it uses `rawset`.
    pub fn raw_at(self, key: impl Into<Operand<'c>>) -> Lazy<'c> {
        Lazy::index(self.ctx, Operand::Lazy(self), key.into(), true)
    }

    pub fn call(self, args: impl IntoOperands<'c>) -> Lazy<'c> {
        Lazy::call_of(self.ctx, Operand::Lazy(self), args.into_operands(), false)
    }

    pub fn pcall(self, args: impl IntoOperands<'c>) -> Lazy<'c> {
        Lazy::call_of(self.ctx, Operand::Lazy(self), args.into_operands(), true)
    }

    pub fn len(self) -> Lazy<'c> {
        Lazy::new(self.ctx, Op::Len(Box::new(Operand::Lazy(self))))
    }

    pub fn mt(self) -> Lazy<'c> {
        Lazy::new(self.ctx, Op::Metatable(Box::new(Operand::Lazy(self))))
    }

    pub fn upvalue(self, i: usize) -> Lazy<'c> {
        Lazy::new(
            self.ctx,
            Op::Upvalue {
                func: Some(Box::new(Operand::Lazy(self))),
                index: i,
            },
        )
    }

    pub fn arith(self, op: ArithOp, rhs: impl Into<Operand<'c>>) -> Lazy<'c> {
        arith::binary(self.ctx, Operand::Lazy(self), op, rhs.into())
    }
}

impl Drop for Lazy<'_> {
    fn drop(&mut self) {
        if !self.armed || std::thread::panicking() {
            return;
        }
        if !self.op.non_discardable(&self.ctx.vm.config().discard) {
            // nested operations decide for themselves when they drop
            self.armed = false;
            return;
        }
        debug!(target: "stackbind::lazy", kind = self.op.kind(), "discard");
        let result = if let Op::Call { .. } = self.op {
            self.emit(Want::None).map(drop)
        } else {
            self.emit(Want::One).map(|_| self.ctx.vm.pop(1))
        };
        if let Err(e) = result {
            self.ctx.record_discard_error(e);
        }
    }
}

impl fmt::Debug for Lazy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("kind", &self.op.kind())
            .field("armed", &self.armed)
            .finish()
    }
}
