use crate::error::Result;
use crate::stack::Context;

use super::Target;
use super::operand::{Operand, push_operand};

fn lookup(ctx: &Context<'_>, t: usize, raw: bool) -> Result<()> {
    if raw { ctx.vm.raw_get_at(t) } else { ctx.vm.index_at(t) }
}

fn store(ctx: &Context<'_>, t: usize, raw: bool) -> Result<()> {
    if raw { ctx.vm.raw_set_at(t) } else { ctx.vm.new_index_at(t) }
}

/// Pushes the indexed table when it is not already sitting in a slot.
/// Returns its absolute position and whether it was pushed.
fn place_target<'c>(ctx: &'c Context<'c>, target: &mut Target<'c>) -> Result<(usize, bool)> {
    match target {
        Target::Value(op) => match **op {
            Operand::Slot(pos) if ctx.is_valid(pos) => Ok((ctx.abs(pos), false)),
            _ => {
                push_operand(ctx, op, false)?;
                Ok((ctx.vm.top() - 1, true))
            }
        },
        Target::Globals => {
            ctx.vm.push_globals();
            Ok((ctx.vm.top() - 1, true))
        }
        Target::Registry => {
            ctx.vm.push_registry();
            Ok((ctx.vm.top() - 1, true))
        }
    }
}

/// `[] -> [target[key]]`.
pub(super) fn emit<'c>(ctx: &'c Context<'c>, target: &mut Target<'c>, key: &mut Operand<'c>, raw: bool) -> Result<usize> {
    let (t, pushed) = place_target(ctx, target)?;
    if let Err(e) = push_operand(ctx, key, false) {
        ctx.vm.pop(pushed as usize);
        return Err(e);
    }
    if let Err(e) = lookup(ctx, t, raw) {
        ctx.vm.pop(pushed as usize);
        return Err(e);
    }
    if pushed {
        ctx.vm.remove(t);
    }
    Ok(1)
}

/// `target[key] = value`; the stack is unchanged afterwards.
pub(super) fn assign<'c>(
    ctx: &'c Context<'c>,
    target: &mut Target<'c>,
    key: &mut Operand<'c>,
    value: &mut Operand<'c>,
    raw: bool,
) -> Result<()> {
    let (t, pushed) = place_target(ctx, target)?;
    let mut pending = [key, value];
    let mut n = 0;
    for i in 0..pending.len() {
        if let Err(e) = push_operand(ctx, pending[i], false) {
            ctx.vm.pop(n + pushed as usize);
            pending[i + 1..].iter_mut().for_each(|op| op.move_out());
            return Err(e);
        }
        n += 1;
    }
    let result = store(ctx, t, raw);
    ctx.vm.pop(pushed as usize);
    result
}
