use crate::error::Result;
use crate::stack::{Context, Function};

use super::operand::{Operand, push_operand};
use super::series::push_series;

/// `[] -> [closure]` with the upvalues pushed (last one expanded) first.
pub(super) fn emit_closure<'c>(ctx: &'c Context<'c>, func: &Function, upvalues: &mut [Operand<'c>]) -> Result<usize> {
    let n = push_series(ctx, upvalues, true)?;
    ctx.vm.push_closure(func.raw.clone(), n);
    Ok(1)
}

/// `[] -> [{items..}]`; the last item expands into the array part.
pub(super) fn emit_array<'c>(ctx: &'c Context<'c>, items: &mut [Operand<'c>]) -> Result<usize> {
    ctx.vm.create_table(items.len(), 0);
    let n = match push_series(ctx, items, true) {
        Ok(n) => n,
        Err(e) => {
            ctx.vm.pop(1);
            return Err(e);
        }
    };
    ctx.vm.set_list(n)?;
    Ok(1)
}

/// `[] -> [{k = v, ..}]`, pairs set raw in order.
pub(super) fn emit_records<'c>(ctx: &'c Context<'c>, pairs: &mut [(Operand<'c>, Operand<'c>)]) -> Result<usize> {
    ctx.vm.create_table(0, pairs.len());
    let t = ctx.vm.top() - 1;
    for i in 0..pairs.len() {
        let (k, v) = &mut pairs[i];
        let mut entry = [k, v];
        let mut pushed = 0;
        let mut failure = None;
        for op in entry.iter_mut() {
            match push_operand(ctx, op, false) {
                Ok(_) => pushed += 1,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        let result = match failure {
            Some(e) => {
                ctx.vm.pop(pushed);
                Err(e)
            }
            None => ctx.vm.raw_set_at(t),
        };
        if let Err(e) = result {
            ctx.vm.pop(1);
            for (k, v) in &mut pairs[i..] {
                k.move_out();
                v.move_out();
            }
            return Err(e);
        }
    }
    Ok(1)
}
