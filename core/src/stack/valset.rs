use std::fmt;

use crate::error::{Error, Result};
use crate::lazy::{IntoOperands, Lazy, Operand, push_operand, push_series};

use super::context::Context;
use super::valref::Valref;

/// An owned, contiguous run of slots that can grow and shrink at the top.
///
/// Only the innermost valset of a context may change size, and only while
/// nothing else has been pushed above it; otherwise it is *blocked*.
pub struct Valset<'c> {
    ctx: &'c Context<'c>,
    start: usize,
    size: usize,
    id: u64,
    prev: u64,
    owned: bool,
    success: bool,
}

impl<'c> Valset<'c> {
    /// An empty set starting at the top of the stack.
    pub fn new(ctx: &'c Context<'c>) -> Self {
        Self::claim(ctx, ctx.depth() + 1, 0, true)
    }

    /// Materializes every value of `lazy` into a new set. A protected call
    /// records its status in [`success`](Self::success).
    pub fn from_lazy(lazy: Lazy<'c>) -> Result<Self> {
        let ctx = lazy.ctx;
        let start = ctx.depth() + 1;
        let (n, success) = lazy.emit_all()?;
        Ok(Self::claim(ctx, start, n, success))
    }

    /// Pushes `operands`; the last one expands to all of its values.
    pub fn from_operands(ctx: &'c Context<'c>, operands: impl IntoOperands<'c>) -> Result<Self> {
        let mut items = operands.into_operands();
        let start = ctx.depth() + 1;
        let n = push_series(ctx, &mut items, true)?;
        Ok(Self::claim(ctx, start, n, true))
    }

    fn claim(ctx: &'c Context<'c>, start: usize, size: usize, success: bool) -> Self {
        let id = ctx.next_valset_id();
        let prev = ctx.current_valset.replace(id);
        Self {
            ctx,
            start,
            size,
            id,
            prev,
            owned: true,
            success,
        }
    }

    /// A view over slots owned by someone else; always blocked.
    pub(crate) fn view(ctx: &'c Context<'c>, start: usize, size: usize) -> Self {
        Self {
            ctx,
            start,
            size,
            id: 0,
            prev: 0,
            owned: false,
            success: true,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Status of the protected call that produced the set (`true` otherwise).
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn is_blocked(&self) -> bool {
        !self.owned || self.ctx.current_valset.get() != self.id || self.ctx.depth() + 1 != self.start + self.size
    }

    /// 1-based element access.
    pub fn get(&self, i: usize) -> Option<Valref<'c>> {
        (i >= 1 && i <= self.size).then(|| Valref::new(self.ctx, self.start + i - 1))
    }

    pub fn first(&self) -> Option<Valref<'c>> {
        self.get(1)
    }

    pub fn last(&self) -> Option<Valref<'c>> {
        self.get(self.size)
    }

    pub fn iter(&self) -> impl Iterator<Item = Valref<'c>> + '_ {
        (self.start..self.start + self.size).map(|pos| Valref::new(self.ctx, pos))
    }

    /// Appends one value.
    pub fn push_back(&mut self, value: impl Into<Operand<'c>>) -> Result<()> {
        let mut value = value.into();
        if self.is_blocked() {
            value.move_out();
            return Err(Error::composition("attempt to grow blocked Valset"));
        }
        self.size += push_operand(self.ctx, &mut value, false)?;
        Ok(())
    }

    /// Appends every value; the last operand expands.
    pub fn push_back_all(&mut self, values: impl IntoOperands<'c>) -> Result<()> {
        let mut items = values.into_operands();
        if self.is_blocked() {
            items.iter_mut().for_each(Operand::move_out);
            return Err(Error::composition("attempt to grow blocked Valset"));
        }
        self.size += push_series(self.ctx, &mut items, true)?;
        Ok(())
    }

    /// Drops the last `n` values (all of them if there are fewer).
    pub fn pop_back(&mut self, n: usize) -> Result<()> {
        if self.is_blocked() {
            return Err(Error::composition("attempt to shrink blocked Valset"));
        }
        let n = n.min(self.size);
        self.ctx.vm.pop(n);
        self.size -= n;
        Ok(())
    }
}

impl Clone for Valset<'_> {
    /// Duplicates every slot into a fresh run on top of the stack.
    fn clone(&self) -> Self {
        let start = self.ctx.depth() + 1;
        for pos in self.start..self.start + self.size {
            self.ctx.vm.duplicate(self.ctx.abs(pos));
        }
        Self::claim(self.ctx, start, self.size, self.success)
    }
}

impl Drop for Valset<'_> {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        self.ctx.release(self.start, self.size);
        self.ctx.current_valset.set(self.prev);
    }
}

impl fmt::Debug for Valset<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
