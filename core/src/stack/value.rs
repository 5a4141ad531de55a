use std::fmt;
use std::ops::Deref;

use crate::error::Result;
use crate::lazy::{Operand, push_operand};
use crate::val::Val;

use super::context::Context;
use super::valref::Valref;

/// Ownership of the single slot at `r.pos`; releases it on drop.
pub(crate) struct Anchor<'c> {
    pub(crate) r: Valref<'c>,
}

impl<'c> Anchor<'c> {
    /// Takes ownership of the current top slot.
    pub(crate) fn at_top(ctx: &'c Context<'c>) -> Self {
        Self {
            r: Valref::new(ctx, ctx.depth()),
        }
    }

    pub(crate) fn push(ctx: &'c Context<'c>, operand: impl Into<Operand<'c>>) -> Result<Self> {
        let mut operand = operand.into();
        push_operand(ctx, &mut operand, false)?;
        Ok(Self::at_top(ctx))
    }

    pub(crate) fn duplicate(&self) -> Self {
        let ctx = self.r.ctx;
        ctx.vm.duplicate(ctx.abs(self.r.pos));
        Self::at_top(ctx)
    }
}

impl Drop for Anchor<'_> {
    fn drop(&mut self) {
        self.r.ctx.release(self.r.pos, 1);
    }
}

/// An owned stack slot, popped when dropped.
///
/// Values must be dropped in the reverse order of their creation, like the
/// stack itself.
pub struct Value<'c> {
    pub(crate) anchor: Anchor<'c>,
}

impl<'c> Value<'c> {
    /// Pushes `operand` (one value) into a fresh slot.
    pub fn new(ctx: &'c Context<'c>, operand: impl Into<Operand<'c>>) -> Result<Self> {
        Ok(Self {
            anchor: Anchor::push(ctx, operand)?,
        })
    }

    pub fn nil(ctx: &'c Context<'c>) -> Self {
        ctx.vm.push(Val::Nil);
        Self {
            anchor: Anchor::at_top(ctx),
        }
    }

    pub(crate) fn at_top(ctx: &'c Context<'c>) -> Self {
        Self {
            anchor: Anchor::at_top(ctx),
        }
    }

    pub fn valref(&self) -> Valref<'c> {
        self.anchor.r
    }
}

impl<'c> Deref for Value<'c> {
    type Target = Valref<'c>;

    fn deref(&self) -> &Valref<'c> {
        &self.anchor.r
    }
}

impl Clone for Value<'_> {
    fn clone(&self) -> Self {
        Self {
            anchor: self.anchor.duplicate(),
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.anchor.r, f)
    }
}
