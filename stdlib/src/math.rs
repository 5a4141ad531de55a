use stackbind_core::val::to_number;
use stackbind_core::{Context, Function, Result, Retval, Table, Val, Valref, wrap};

use crate::bad_argument;

/// Registers the `math` table.
pub fn open_math(ctx: &Context<'_>) -> Result<()> {
    let math = Table::with_capacity(ctx, 0, 11);
    math.at("abs").set(Function::new(abs))?;
    math.at("floor").set(Function::new(floor))?;
    math.at("ceil").set(Function::new(ceil))?;
    math.at("sqrt").set(wrap(f64::sqrt))?;
    math.at("max").set(Function::new(max))?;
    math.at("min").set(Function::new(min))?;
    math.at("tointeger").set(Function::new(tointeger))?;
    math.at("pi").set(std::f64::consts::PI)?;
    math.at("huge").set(f64::INFINITY)?;
    math.at("maxinteger").set(i64::MAX)?;
    math.at("mininteger").set(i64::MIN)?;
    ctx.global("math").set(&math)
}

/// Argument `n` as a number, keeping the integer/float distinction.
fn number(arg: Valref<'_>, n: usize, name: &str) -> Result<Val> {
    arg.get()
        .as_ref()
        .and_then(to_number)
        .ok_or_else(|| bad_argument(n, name, format_args!("number expected, got {}", arg.type_of())))
}

fn abs(ctx: &Context<'_>) -> Result<Retval> {
    match number(ctx.arg(1), 1, "abs")? {
        Val::Int(i) => ctx.ret((i.wrapping_abs(),)),
        Val::Number(f) => ctx.ret((f.abs(),)),
        other => ctx.ret((other,)),
    }
}

/// Integral float results that fit become integers, as `math.floor` does.
fn integral(f: f64) -> Val {
    if f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Val::Int(f as i64)
    } else {
        Val::Number(f)
    }
}

fn floor(ctx: &Context<'_>) -> Result<Retval> {
    match number(ctx.arg(1), 1, "floor")? {
        Val::Number(f) => ctx.ret((integral(f.floor()),)),
        int => ctx.ret((int,)),
    }
}

fn ceil(ctx: &Context<'_>) -> Result<Retval> {
    match number(ctx.arg(1), 1, "ceil")? {
        Val::Number(f) => ctx.ret((integral(f.ceil()),)),
        int => ctx.ret((int,)),
    }
}

fn tointeger(ctx: &Context<'_>) -> Result<Retval> {
    let n = match ctx.arg(1).get() {
        Some(Val::Int(i)) => Some(i),
        Some(Val::Number(f)) if f.fract() == 0.0 => match integral(f) {
            Val::Int(i) => Some(i),
            _ => None,
        },
        _ => None,
    };
    ctx.ret((n,))
}

/// Position of the winning argument; `replace(best, arg)` decides whether
/// `arg` takes over.
fn extremum<'c>(
    ctx: &'c Context<'c>,
    name: &str,
    replace: impl Fn(Valref<'c>, Valref<'c>) -> Result<bool>,
) -> Result<usize> {
    number(ctx.arg(1), 1, name)?;
    let mut best = 1;
    for i in 2..=ctx.arg_count() {
        number(ctx.arg(i), i, name)?;
        if replace(ctx.arg(best), ctx.arg(i))? {
            best = i;
        }
    }
    Ok(best)
}

fn max(ctx: &Context<'_>) -> Result<Retval> {
    let best = extremum(ctx, "max", |best, arg| best.lt(arg))?;
    ctx.ret((ctx.arg(best),))
}

fn min(ctx: &Context<'_>) -> Result<Retval> {
    let best = extremum(ctx, "min", |best, arg| arg.lt(best))?;
    ctx.ret((ctx.arg(best),))
}
