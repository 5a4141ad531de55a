use crate::error::Result;
use crate::stack::Context;

use super::Want;
use super::operand::{Operand, push_operand};
use super::series::push_series;

/// `[] -> [results]`: the callee first, then the arguments with the last
/// one expanded, then the call primitive.
///
/// A protected call stores its status in the context; only the call itself
/// is protected, not the evaluation of its operands.
pub(super) fn emit<'c>(
    ctx: &'c Context<'c>,
    callee: &mut Operand<'c>,
    args: &mut [Operand<'c>],
    protected: bool,
    want: Want,
) -> Result<usize> {
    if let Err(e) = push_operand(ctx, callee, false) {
        args.iter_mut().for_each(Operand::move_out);
        return Err(e);
    }
    let nargs = match push_series(ctx, args, true) {
        Ok(n) => n,
        Err(e) => {
            ctx.vm.pop(1);
            return Err(e);
        }
    };
    let nresults = match want {
        Want::One => Some(1),
        Want::All => None,
        Want::None => Some(0),
    };
    if protected {
        let (ok, n) = ctx.vm.pcall(nargs, nresults);
        ctx.last_pcall.set(Some(ok));
        Ok(n)
    } else {
        ctx.vm.call(nargs, nresults)
    }
}
