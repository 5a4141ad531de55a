use std::fmt;
use std::ops::Deref;

use crate::error::{Error, Result};
use crate::lazy::{IntoOperands, Lazy, Operand, push_series};
use crate::val::{Val, ValueType};

use super::context::Context;
use super::valref::Valref;
use super::value::{Anchor, Value};

/// An owned slot known to hold a table.
pub struct Table<'c> {
    anchor: Anchor<'c>,
}

impl<'c> Table<'c> {
    pub fn new(ctx: &'c Context<'c>) -> Self {
        Self::with_capacity(ctx, 0, 0)
    }

    pub fn with_capacity(ctx: &'c Context<'c>, narr: usize, nrec: usize) -> Self {
        ctx.vm.create_table(narr, nrec);
        Self {
            anchor: Anchor::at_top(ctx),
        }
    }

    pub fn array(ctx: &'c Context<'c>, items: impl IntoOperands<'c>) -> Result<Self> {
        ctx.array(items).to_table()
    }

    pub fn records<K, V>(ctx: &'c Context<'c>, pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: Into<Operand<'c>>,
        V: Into<Operand<'c>>,
    {
        ctx.records(pairs).to_table()
    }

    /// Reuses the slot of `value`, which must hold a table.
    pub fn from_value(value: Value<'c>) -> Result<Self> {
        match value.type_of() {
            ValueType::Table => Ok(Self { anchor: value.anchor }),
            found => Err(Error::conversion("table", found)),
        }
    }

    /// Raw access that bypasses metamethods.
    pub fn raw(&self) -> RawAccess<'_, 'c> {
        RawAccess { table: self }
    }

    /// Border of the array part, without `__len`.
    pub fn len(&self) -> usize {
        let r = self.anchor.r;
        r.ctx.vm.raw_len(r.ctx.abs(r.pos))
    }

    pub fn is_empty(&self) -> bool {
        let r = self.anchor.r;
        r.ctx.value_at(r.pos).is_none_or(|v| match v {
            Val::Table(t) => t.borrow().is_empty(),
            _ => true,
        })
    }

    /// Visits every entry in `next` order until `f` returns `false`.
    ///
    /// The key and value slots are only valid inside the callback.
    pub fn iterate<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(Valref<'c>, Valref<'c>) -> Result<bool>,
    {
        let r = self.anchor.r;
        let ctx = r.ctx;
        let t = ctx.abs(r.pos);
        ctx.vm.push(Val::Nil);
        while ctx.vm.next(t)? {
            let top = ctx.depth();
            let keep_going = match f(Valref::new(ctx, top - 1), Valref::new(ctx, top)) {
                Ok(keep_going) => keep_going,
                Err(e) => {
                    ctx.vm.pop(2);
                    return Err(e);
                }
            };
            ctx.vm.pop(1);
            if !keep_going {
                ctx.vm.pop(1);
                break;
            }
        }
        Ok(())
    }
}

impl<'c> TryFrom<Valref<'c>> for Table<'c> {
    type Error = Error;

    /// Takes a new slot holding the same table.
    fn try_from(r: Valref<'c>) -> Result<Self> {
        match r.type_of() {
            ValueType::Table => {
                r.ctx.vm.duplicate(r.ctx.abs(r.pos));
                Ok(Self {
                    anchor: Anchor::at_top(r.ctx),
                })
            }
            found => Err(Error::conversion("table", found)),
        }
    }
}

impl<'c> Deref for Table<'c> {
    type Target = Valref<'c>;

    fn deref(&self) -> &Valref<'c> {
        &self.anchor.r
    }
}

impl Clone for Table<'_> {
    fn clone(&self) -> Self {
        Self {
            anchor: self.anchor.duplicate(),
        }
    }
}

impl<'c> From<Table<'c>> for Value<'c> {
    fn from(t: Table<'c>) -> Self {
        Value { anchor: t.anchor }
    }
}

pub struct RawAccess<'a, 'c> {
    table: &'a Table<'c>,
}

impl<'c> RawAccess<'_, 'c> {
    /// `rawget(t, key)`, assignable through `rawset`.
    pub fn get(&self, key: impl Into<Operand<'c>>) -> Lazy<'c> {
        let r = self.table.anchor.r;
        Lazy::index(r.ctx, Operand::Slot(r.pos), key.into(), true)
    }

    pub fn set(&self, key: impl Into<Operand<'c>>, value: impl Into<Operand<'c>>) -> Result<()> {
        let r = self.table.anchor.r;
        let mut items = vec![key.into(), value.into()];
        push_series(r.ctx, &mut items, false)?;
        r.ctx.vm.raw_set_at(r.ctx.abs(r.pos))
    }
}

impl fmt::Debug for Table<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.anchor.r, f)
    }
}
