use crate::error::Result;
use crate::stack::Context;

use super::operand::{Operand, push_operand};

/// Pushes `items` left to right, one value each except the last, which
/// contributes all of its values when `expand_last` is set.
///
/// If item `i` fails, the values pushed for `0..i` are popped and the items
/// after `i` are moved out before the error is returned.
pub(crate) fn push_series<'c>(ctx: &'c Context<'c>, items: &mut [Operand<'c>], expand_last: bool) -> Result<usize> {
    let last = items.len().saturating_sub(1);
    let mut pushed = 0;
    for i in 0..items.len() {
        match push_operand(ctx, &mut items[i], expand_last && i == last) {
            Ok(n) => pushed += n,
            Err(e) => {
                ctx.vm.pop(pushed);
                items[i + 1..].iter_mut().for_each(Operand::move_out);
                return Err(e);
            }
        }
    }
    Ok(pushed)
}
