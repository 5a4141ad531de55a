use std::mem;

use crate::error::Result;
use crate::stack::{Context, Table, Valref, Value};

use super::operand::Operand;
use super::series::push_series;
use super::{Lazy, Op};

/// `[] -> [o1 .. on]`, one concat primitive over every operand.
pub(super) fn emit<'c>(ctx: &'c Context<'c>, ops: &mut [Operand<'c>]) -> Result<usize> {
    let n = push_series(ctx, ops, false)?;
    ctx.vm.concat(n)?;
    Ok(1)
}

/// Appends `operand` to `parts`, splicing in the operands of a concatenation
/// that has not run yet.
fn absorb<'c>(parts: &mut Vec<Operand<'c>>, operand: Operand<'c>) {
    match operand {
        Operand::Lazy(mut l) if l.armed && matches!(l.op, Op::Concat(_)) => {
            l.armed = false;
            if let Op::Concat(inner) = mem::replace(&mut l.op, Op::Spent) {
                parts.extend(inner);
            }
        }
        other => parts.push(other),
    }
}

impl<'c> Lazy<'c> {
    pub(crate) fn concat_of(ctx: &'c Context<'c>, operands: Vec<Operand<'c>>) -> Self {
        let mut parts = Vec::with_capacity(operands.len());
        for op in operands {
            absorb(&mut parts, op);
        }
        Lazy::new(ctx, Op::Concat(parts))
    }

    pub fn concat(self, rhs: impl Into<Operand<'c>>) -> Lazy<'c> {
        let ctx = self.ctx;
        Lazy::concat_of(ctx, vec![Operand::Lazy(self), rhs.into()])
    }
}

impl<'c> Valref<'c> {
    pub fn concat(&self, rhs: impl Into<Operand<'c>>) -> Lazy<'c> {
        Lazy::concat_of(self.ctx, vec![Operand::Slot(self.pos), rhs.into()])
    }
}

impl<'c, R: Into<Operand<'c>>> std::ops::BitAnd<R> for Lazy<'c> {
    type Output = Lazy<'c>;

    fn bitand(self, rhs: R) -> Lazy<'c> {
        self.concat(rhs)
    }
}

impl<'c, R: Into<Operand<'c>>> std::ops::BitAnd<R> for Valref<'c> {
    type Output = Lazy<'c>;

    fn bitand(self, rhs: R) -> Lazy<'c> {
        self.concat(rhs)
    }
}

macro_rules! impl_bitand_for_anchor {
    ($($lhs:ident),*) => {
        $(
            impl<'a, 'c, R: Into<Operand<'c>>> std::ops::BitAnd<R> for &'a $lhs<'c> {
                type Output = Lazy<'c>;

                fn bitand(self, rhs: R) -> Lazy<'c> {
                    self.concat(rhs)
                }
            }
        )*
    };
}

impl_bitand_for_anchor!(Value, Table);
