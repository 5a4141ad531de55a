use stackbind_core::val::to_number;
use stackbind_core::{Context, Function, Operand, Result, Retval, Table, Val, Valref, Value, ValueType};

use crate::{bad_argument, expect_type};

type Native = fn(&Context<'_>) -> Result<Retval>;

const FUNCTIONS: [(&str, Native); 16] = [
    ("assert", assert),
    ("error", error),
    ("getmetatable", getmetatable),
    ("ipairs", ipairs),
    ("next", next),
    ("pcall", pcall),
    ("print", print),
    ("rawequal", rawequal),
    ("rawget", rawget),
    ("rawlen", rawlen),
    ("rawset", rawset),
    ("select", select),
    ("setmetatable", setmetatable),
    ("tonumber", tonumber),
    ("tostring", tostring),
    ("type", type_of),
];

/// Registers the base functions as globals.
pub fn open_base(ctx: &Context<'_>) -> Result<()> {
    for (name, f) in FUNCTIONS {
        ctx.global(name).set(Function::new(f))?;
    }
    Ok(())
}

fn require_value(ctx: &Context<'_>, name: &str) -> Result<()> {
    if ctx.arg_count() == 0 {
        return Err(bad_argument(1, name, "value expected"));
    }
    Ok(())
}

/// Raw lookup of `event` in the metatable of `v`, if it has one with that
/// field set.
fn metafield<'c>(v: Valref<'c>, event: &str) -> Result<Option<Value<'c>>> {
    if v.type_of() == ValueType::None || v.mt().type_of()? != ValueType::Table {
        return Ok(None);
    }
    let field = v.mt().raw_at(event).to_value()?;
    Ok((!field.is_nil()).then_some(field))
}

/// String form of a slot as `tostring` produces it.
pub(crate) fn display(v: Valref<'_>) -> Result<String> {
    if let Some(handler) = metafield(v, "__tostring")? {
        return handler.call((v,)).cast::<String>();
    }
    Ok(v.get().map_or_else(|| "nil".to_owned(), |val| val.to_string()))
}

fn type_of(ctx: &Context<'_>) -> Result<Retval> {
    require_value(ctx, "type")?;
    ctx.ret((ctx.arg(1).type_of().name(),))
}

fn tostring(ctx: &Context<'_>) -> Result<Retval> {
    require_value(ctx, "tostring")?;
    ctx.ret((display(ctx.arg(1))?,))
}

fn tonumber(ctx: &Context<'_>) -> Result<Retval> {
    require_value(ctx, "tonumber")?;
    let v = ctx.arg(1);
    if ctx.arg(2).is_nil() {
        return ctx.ret((v.get().as_ref().and_then(to_number),));
    }
    let base = ctx
        .arg(2)
        .cast::<i64>()
        .map_err(|_| bad_argument(2, "tonumber", "number expected"))?;
    if !(2..=36).contains(&base) {
        return Err(bad_argument(2, "tonumber", "base out of range"));
    }
    expect_type(v, 1, "tonumber", ValueType::String)?;
    let text = v.cast::<String>()?.trim().to_ascii_lowercase();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.as_str()),
    };
    let n = i64::from_str_radix(digits, base as u32)
        .ok()
        .map(|n| if negative { n.wrapping_neg() } else { n });
    ctx.ret((n,))
}

fn select(ctx: &Context<'_>) -> Result<Retval> {
    let rest = ctx.arg_count().saturating_sub(1);
    if matches!(ctx.arg(1).get(), Some(Val::Str(s)) if &*s == "#") {
        return ctx.ret((rest,));
    }
    let i = ctx
        .arg(1)
        .cast::<i64>()
        .map_err(|_| bad_argument(1, "select", "number expected"))?;
    let first = match i {
        0 => return Err(bad_argument(1, "select", "index out of range")),
        i if i < 0 => {
            let back = i.unsigned_abs() as usize;
            if back > rest {
                return Err(bad_argument(1, "select", "index out of range"));
            }
            rest - back + 1
        }
        i => (i as usize).min(rest + 1),
    };
    let values: Vec<Operand> = (first..=rest).map(|k| ctx.arg(k + 1).into()).collect();
    ctx.ret(values)
}

fn rawequal(ctx: &Context<'_>) -> Result<Retval> {
    if ctx.arg_count() < 2 {
        return Err(bad_argument(ctx.arg_count() + 1, "rawequal", "value expected"));
    }
    ctx.ret((ctx.arg(1).raw_equal(&ctx.arg(2)),))
}

fn rawlen(ctx: &Context<'_>) -> Result<Retval> {
    let v = ctx.arg(1);
    match v.type_of() {
        ValueType::Table => {
            let n = Table::try_from(v)?.len();
            ctx.ret((n,))
        }
        ValueType::String => ctx.ret((v.cast::<String>()?.len(),)),
        _ => Err(bad_argument(1, "rawlen", "table or string expected")),
    }
}

fn rawget(ctx: &Context<'_>) -> Result<Retval> {
    expect_type(ctx.arg(1), 1, "rawget", ValueType::Table)?;
    let t = Table::try_from(ctx.arg(1))?;
    let v = t.raw().get(ctx.arg(2)).to_value()?;
    ctx.ret((&v,))
}

fn rawset(ctx: &Context<'_>) -> Result<Retval> {
    expect_type(ctx.arg(1), 1, "rawset", ValueType::Table)?;
    let t = Table::try_from(ctx.arg(1))?;
    t.raw().set(ctx.arg(2), ctx.arg(3))?;
    ctx.ret((&t,))
}

fn setmetatable(ctx: &Context<'_>) -> Result<Retval> {
    expect_type(ctx.arg(1), 1, "setmetatable", ValueType::Table)?;
    let mt = ctx.arg(2);
    if !matches!(mt.type_of(), ValueType::Nil | ValueType::Table) {
        return Err(bad_argument(2, "setmetatable", "nil or table expected"));
    }
    if metafield(ctx.arg(1), "__metatable")?.is_some() {
        return Err(ctx.error("cannot change a protected metatable"));
    }
    ctx.arg(1).set_mt(mt)?;
    ctx.ret((ctx.arg(1),))
}

fn getmetatable(ctx: &Context<'_>) -> Result<Retval> {
    require_value(ctx, "getmetatable")?;
    if let Some(field) = metafield(ctx.arg(1), "__metatable")? {
        return ctx.ret((&field,));
    }
    ctx.ret((ctx.arg(1).mt(),))
}

fn assert(ctx: &Context<'_>) -> Result<Retval> {
    require_value(ctx, "assert")?;
    if ctx.arg(1).to_bool() {
        return Ok(ctx.ret_valset(&ctx.args()));
    }
    let message = if ctx.arg_count() >= 2 {
        display(ctx.arg(2))?
    } else {
        "assertion failed!".to_owned()
    };
    Err(ctx.error(message))
}

fn error(ctx: &Context<'_>) -> Result<Retval> {
    Err(ctx.error(display(ctx.arg(1))?))
}

fn pcall(ctx: &Context<'_>) -> Result<Retval> {
    require_value(ctx, "pcall")?;
    let args: Vec<Operand> = (2..=ctx.arg_count()).map(|i| ctx.arg(i).into()).collect();
    let results = ctx.arg(1).pcall(args).to_valset()?;
    ctx.ret((results.success(), &results))
}

fn next(ctx: &Context<'_>) -> Result<Retval> {
    expect_type(ctx.arg(1), 1, "next", ValueType::Table)?;
    let t = Table::try_from(ctx.arg(1))?;
    let key = ctx.arg(2);
    let mut found = key.is_nil();
    let mut entry = None;
    t.iterate(|k, v| {
        if found {
            entry = Some((k.get(), v.get()));
            return Ok(false);
        }
        found = k.raw_equal(&key);
        Ok(true)
    })?;
    match entry {
        Some((k, v)) => ctx.ret((k, v)),
        None if found => ctx.ret((Val::Nil,)),
        None => Err(ctx.error("invalid key to 'next'")),
    }
}

fn ipairs(ctx: &Context<'_>) -> Result<Retval> {
    if ctx.arg_count() == 0 {
        return Err(bad_argument(1, "ipairs", "table expected, got no value"));
    }
    ctx.ret((Function::new(ipairs_step), ctx.arg(1), 0))
}

fn ipairs_step(ctx: &Context<'_>) -> Result<Retval> {
    let i = ctx.arg(2).cast::<i64>()? + 1;
    let v = ctx.arg(1).at(i).to_value()?;
    if v.is_nil() {
        return ctx.ret((Val::Nil,));
    }
    ctx.ret((i, &v))
}

fn print(ctx: &Context<'_>) -> Result<Retval> {
    let mut line = String::new();
    for (i, arg) in ctx.args().iter().enumerate() {
        if i > 0 {
            line.push('\t');
        }
        line.push_str(&display(arg)?);
    }
    println!("{line}");
    Ok(Retval::none())
}
