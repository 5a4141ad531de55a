use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::val::{Val, to_float, to_integer, to_number};

pub(crate) fn err_arith(op: ArithOp, l: &Val, r: &Val) -> Error {
    let culprit = if to_number(l).is_none() { l } else { r };
    if op.is_bitwise() {
        if to_number(culprit).is_some() {
            return Error::runtime("number has no integer representation");
        }
        return Error::runtime(format!("attempt to perform bitwise operation on a {} value", culprit.type_of()));
    }
    Error::runtime(format!("attempt to perform arithmetic on a {} value", culprit.type_of()))
}

pub(crate) fn err_compare(l: &Val, r: &Val) -> Error {
    let (lt, rt) = (l.type_of(), r.type_of());
    if lt == rt {
        Error::runtime(format!("attempt to compare two {lt} values"))
    } else {
        Error::runtime(format!("attempt to compare {lt} with {rt}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    IDiv,
    BAnd,
    BOr,
    BXor,
    Shl,
    Shr,
    Unm,
    BNot,
}

impl ArithOp {
    pub fn is_unary(self) -> bool {
        matches!(self, ArithOp::Unm | ArithOp::BNot)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            ArithOp::BAnd | ArithOp::BOr | ArithOp::BXor | ArithOp::Shl | ArithOp::Shr | ArithOp::BNot
        )
    }

    /// Stack values consumed by the primitive.
    pub fn arity(self) -> usize {
        if self.is_unary() { 1 } else { 2 }
    }

    /// Metamethod name consulted when raw arithmetic does not apply.
    pub fn event(self) -> &'static str {
        match self {
            ArithOp::Add => "__add",
            ArithOp::Sub => "__sub",
            ArithOp::Mul => "__mul",
            ArithOp::Div => "__div",
            ArithOp::Mod => "__mod",
            ArithOp::Pow => "__pow",
            ArithOp::IDiv => "__idiv",
            ArithOp::BAnd => "__band",
            ArithOp::BOr => "__bor",
            ArithOp::BXor => "__bxor",
            ArithOp::Shl => "__shl",
            ArithOp::Shr => "__shr",
            ArithOp::Unm => "__unm",
            ArithOp::BNot => "__bnot",
        }
    }

    /// Arithmetic without metamethods. `Ok(None)` means the operands are not
    /// numbers and a metamethod should be tried.
    pub(crate) fn eval_raw(self, l: &Val, r: &Val) -> Result<Option<Val>> {
        if self.is_bitwise() {
            let (a, b) = match (to_integer(l), to_integer(r)) {
                (Some(a), Some(b)) => (a, b),
                _ => return Ok(None),
            };
            return Ok(Some(Val::Int(match self {
                ArithOp::BAnd => a & b,
                ArithOp::BOr => a | b,
                ArithOp::BXor => a ^ b,
                ArithOp::Shl => shift_left(a, b),
                ArithOp::Shr => shift_left(a, b.wrapping_neg()),
                _ => !a,
            })));
        }
        let (a, b) = match (to_number(l), to_number(r)) {
            (Some(a), Some(b)) => (a, b),
            _ => return Ok(None),
        };
        if let (Val::Int(x), Val::Int(y)) = (&a, &b) {
            let (x, y) = (*x, *y);
            let int = match self {
                ArithOp::Add => Some(x.wrapping_add(y)),
                ArithOp::Sub => Some(x.wrapping_sub(y)),
                ArithOp::Mul => Some(x.wrapping_mul(y)),
                ArithOp::Unm => Some(x.wrapping_neg()),
                ArithOp::IDiv => {
                    if y == 0 {
                        return Err(Error::runtime("attempt to perform 'n//0'"));
                    }
                    Some(floor_div(x, y))
                }
                ArithOp::Mod => {
                    if y == 0 {
                        return Err(Error::runtime("attempt to perform 'n%%0'"));
                    }
                    Some(floor_mod(x, y))
                }
                _ => None,
            };
            if let Some(v) = int {
                return Ok(Some(Val::Int(v)));
            }
        }
        let (x, y) = match (to_float(&a), to_float(&b)) {
            (Some(x), Some(y)) => (x, y),
            _ => return Ok(None),
        };
        Ok(Some(Val::Number(match self {
            ArithOp::Add => x + y,
            ArithOp::Sub => x - y,
            ArithOp::Mul => x * y,
            ArithOp::Div => x / y,
            ArithOp::Pow => x.powf(y),
            ArithOp::IDiv => (x / y).floor(),
            ArithOp::Mod => {
                let m = x % y;
                if m != 0.0 && (m < 0.0) != (y < 0.0) { m + y } else { m }
            }
            ArithOp::Unm => -x,
            _ => return Ok(None),
        })))
    }
}

fn floor_div(x: i64, y: i64) -> i64 {
    let q = x.wrapping_div(y);
    if x.wrapping_rem(y) != 0 && ((x < 0) != (y < 0)) { q - 1 } else { q }
}

fn floor_mod(x: i64, y: i64) -> i64 {
    let m = x.wrapping_rem(y);
    if m != 0 && ((m < 0) != (y < 0)) { m + y } else { m }
}

fn shift_left(x: i64, n: i64) -> i64 {
    if n <= -64 || n >= 64 {
        0
    } else if n >= 0 {
        ((x as u64) << n) as i64
    } else {
        ((x as u64) >> (-n)) as i64
    }
}

impl Display for ArithOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
            ArithOp::Pow => "^",
            ArithOp::IDiv => "//",
            ArithOp::BAnd => "&",
            ArithOp::BOr => "|",
            ArithOp::BXor => "~",
            ArithOp::Shl => "<<",
            ArithOp::Shr => ">>",
            ArithOp::Unm => "-",
            ArithOp::BNot => "~",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Lt,
    Le,
}

impl CompareOp {
    pub fn event(self) -> &'static str {
        match self {
            CompareOp::Eq => "__eq",
            CompareOp::Lt => "__lt",
            CompareOp::Le => "__le",
        }
    }

    /// Ordering of numbers and strings. `None` when a metamethod is needed.
    pub(crate) fn order_raw(self, l: &Val, r: &Val) -> Option<bool> {
        let ord = match (l, r) {
            (Val::Int(a), Val::Int(b)) => a.partial_cmp(b),
            (Val::Str(a), Val::Str(b)) => a.partial_cmp(b),
            (Val::Int(_) | Val::Number(_), Val::Int(_) | Val::Number(_)) => to_float(l)?.partial_cmp(&to_float(r)?),
            _ => return None,
        };
        Some(match (self, ord) {
            (_, None) => false,
            (CompareOp::Lt, Some(o)) => o.is_lt(),
            (CompareOp::Le, Some(o)) => o.is_le(),
            (CompareOp::Eq, Some(o)) => o.is_eq(),
        })
    }
}

impl Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Le => write!(f, "<="),
        }
    }
}
