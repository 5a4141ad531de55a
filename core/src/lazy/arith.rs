use crate::error::Result;
use crate::stack::{Context, Table, Valref, Value};
use crate::vm::ArithOp;

use super::operand::{Operand, push_operand};
use super::{Lazy, Op};

/// One instruction of a post-fix arithmetic program.
pub(crate) enum Step<'c> {
    Push(Operand<'c>),
    Apply(ArithOp),
}

impl Step<'_> {
    pub(super) fn move_out(&mut self) {
        if let Step::Push(op) = self {
            op.move_out();
        }
    }
}

/// Runs the program; it always leaves exactly one value.
pub(super) fn emit<'c>(ctx: &'c Context<'c>, steps: &mut [Step<'c>]) -> Result<usize> {
    let mut live = 0;
    for i in 0..steps.len() {
        let result = match &mut steps[i] {
            Step::Push(op) => push_operand(ctx, op, false).map(|_| live += 1),
            Step::Apply(op) => {
                let result = ctx.vm.arith(*op);
                live -= op.arity();
                if result.is_ok() {
                    live += 1;
                }
                result
            }
        };
        if let Err(e) = result {
            ctx.vm.pop(live);
            steps[i + 1..].iter_mut().for_each(Step::move_out);
            return Err(e);
        }
    }
    Ok(1)
}

/// Appends the steps that push `operand`, splicing in arithmetic that has not
/// run yet so `a + b * c` becomes the single program `a b c * +`.
fn absorb<'c>(steps: &mut Vec<Step<'c>>, operand: Operand<'c>) {
    match operand {
        Operand::Lazy(mut l) if l.armed && matches!(l.op, Op::Arith(_)) => {
            l.armed = false;
            if let Op::Arith(inner) = std::mem::replace(&mut l.op, Op::Spent) {
                steps.extend(inner);
            }
        }
        other => steps.push(Step::Push(other)),
    }
}

pub(crate) fn binary<'c>(ctx: &'c Context<'c>, lhs: Operand<'c>, op: ArithOp, rhs: Operand<'c>) -> Lazy<'c> {
    let mut steps = Vec::with_capacity(3);
    absorb(&mut steps, lhs);
    absorb(&mut steps, rhs);
    steps.push(Step::Apply(op));
    Lazy::new(ctx, Op::Arith(steps))
}

pub(crate) fn unary<'c>(ctx: &'c Context<'c>, operand: Operand<'c>, op: ArithOp) -> Lazy<'c> {
    let mut steps = Vec::with_capacity(2);
    absorb(&mut steps, operand);
    steps.push(Step::Apply(op));
    Lazy::new(ctx, Op::Arith(steps))
}

macro_rules! arith_methods {
    ($($name:ident => $op:ident),*) => {
        impl<'c> Lazy<'c> {
            $(
                pub fn $name(self, rhs: impl Into<Operand<'c>>) -> Lazy<'c> {
                    let ctx = self.ctx;
                    binary(ctx, Operand::Lazy(self), ArithOp::$op, rhs.into())
                }
            )*

            pub fn bnot(self) -> Lazy<'c> {
                let ctx = self.ctx;
                unary(ctx, Operand::Lazy(self), ArithOp::BNot)
            }
        }

        impl<'c> Valref<'c> {
            $(
                pub fn $name(&self, rhs: impl Into<Operand<'c>>) -> Lazy<'c> {
                    binary(self.ctx, Operand::Slot(self.pos), ArithOp::$op, rhs.into())
                }
            )*

            pub fn bnot(&self) -> Lazy<'c> {
                unary(self.ctx, Operand::Slot(self.pos), ArithOp::BNot)
            }

            pub fn arith(&self, op: ArithOp, rhs: impl Into<Operand<'c>>) -> Lazy<'c> {
                binary(self.ctx, Operand::Slot(self.pos), op, rhs.into())
            }
        }
    };
}

arith_methods!(pow => Pow, idiv => IDiv, band => BAnd, bor => BOr, bxor => BXor, shl => Shl, shr => Shr);

macro_rules! impl_binop {
    ($($tr:ident $method:ident => $op:ident),*) => {
        $(
            impl<'c, R: Into<Operand<'c>>> std::ops::$tr<R> for Lazy<'c> {
                type Output = Lazy<'c>;

                fn $method(self, rhs: R) -> Lazy<'c> {
                    let ctx = self.ctx;
                    binary(ctx, Operand::Lazy(self), ArithOp::$op, rhs.into())
                }
            }

            impl<'c, R: Into<Operand<'c>>> std::ops::$tr<R> for Valref<'c> {
                type Output = Lazy<'c>;

                fn $method(self, rhs: R) -> Lazy<'c> {
                    binary(self.ctx, Operand::Slot(self.pos), ArithOp::$op, rhs.into())
                }
            }

            impl<'a, 'c, R: Into<Operand<'c>>> std::ops::$tr<R> for &'a Value<'c> {
                type Output = Lazy<'c>;

                fn $method(self, rhs: R) -> Lazy<'c> {
                    binary(self.ctx, Operand::Slot(self.pos), ArithOp::$op, rhs.into())
                }
            }

            impl<'a, 'c, R: Into<Operand<'c>>> std::ops::$tr<R> for &'a Table<'c> {
                type Output = Lazy<'c>;

                fn $method(self, rhs: R) -> Lazy<'c> {
                    binary(self.ctx, Operand::Slot(self.pos), ArithOp::$op, rhs.into())
                }
            }
        )*
    };
}

impl_binop!(Add add => Add, Sub sub => Sub, Mul mul => Mul, Div div => Div, Rem rem => Mod);

impl<'c> std::ops::Neg for Lazy<'c> {
    type Output = Lazy<'c>;

    fn neg(self) -> Lazy<'c> {
        let ctx = self.ctx;
        unary(ctx, Operand::Lazy(self), ArithOp::Unm)
    }
}

impl<'c> std::ops::Neg for Valref<'c> {
    type Output = Lazy<'c>;

    fn neg(self) -> Lazy<'c> {
        unary(self.ctx, Operand::Slot(self.pos), ArithOp::Unm)
    }
}

impl<'c> std::ops::Neg for &Value<'c> {
    type Output = Lazy<'c>;

    fn neg(self) -> Lazy<'c> {
        unary(self.ctx, Operand::Slot(self.pos), ArithOp::Unm)
    }
}
