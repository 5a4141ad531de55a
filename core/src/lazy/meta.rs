use crate::error::Result;
use crate::stack::Context;

use super::operand::{Operand, push_operand};

pub(super) fn emit_len<'c>(ctx: &'c Context<'c>, v: &mut Operand<'c>) -> Result<usize> {
    push_operand(ctx, v, false)?;
    ctx.vm.len()?;
    Ok(1)
}

pub(super) fn emit_metatable<'c>(ctx: &'c Context<'c>, v: &mut Operand<'c>) -> Result<usize> {
    push_operand(ctx, v, false)?;
    ctx.vm.get_metatable();
    Ok(1)
}

/// `v.mt = mt`; the stack is unchanged afterwards.
pub(super) fn assign_metatable<'c>(ctx: &'c Context<'c>, v: &mut Operand<'c>, mt: &mut Operand<'c>) -> Result<()> {
    if let Err(e) = push_operand(ctx, v, false) {
        mt.move_out();
        return Err(e);
    }
    if let Err(e) = push_operand(ctx, mt, false) {
        ctx.vm.pop(1);
        return Err(e);
    }
    ctx.vm.set_metatable()
}

/// Absolute position of the function whose upvalue is accessed; `None`
/// stands for the running function. Also reports whether it was pushed.
fn place_function<'c>(ctx: &'c Context<'c>, func: Option<&mut Operand<'c>>) -> Result<(Option<usize>, bool)> {
    match func {
        None => Ok((None, false)),
        Some(Operand::Slot(pos)) if ctx.is_valid(*pos) => Ok((Some(ctx.abs(*pos)), false)),
        Some(op) => {
            push_operand(ctx, op, false)?;
            Ok((Some(ctx.vm.top() - 1), true))
        }
    }
}

pub(super) fn emit_upvalue<'c>(ctx: &'c Context<'c>, func: Option<&mut Operand<'c>>, index: usize) -> Result<usize> {
    let (f, pushed) = place_function(ctx, func)?;
    if let Err(e) = ctx.vm.get_upvalue(f, index) {
        ctx.vm.pop(pushed as usize);
        return Err(e);
    }
    if let (Some(f), true) = (f, pushed) {
        ctx.vm.remove(f);
    }
    Ok(1)
}

pub(super) fn assign_upvalue<'c>(
    ctx: &'c Context<'c>,
    func: Option<&mut Operand<'c>>,
    index: usize,
    value: &mut Operand<'c>,
) -> Result<()> {
    let (f, pushed) = place_function(ctx, func)?;
    if let Err(e) = push_operand(ctx, value, false) {
        ctx.vm.pop(pushed as usize);
        return Err(e);
    }
    let result = ctx.vm.set_upvalue(f, index);
    ctx.vm.pop(pushed as usize);
    result
}
