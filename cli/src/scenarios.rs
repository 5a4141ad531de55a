//! Demonstration scenarios run by `stackbind run`.
//!
//! Each scenario gets a fresh state with the standard library opened and
//! returns the lines it wants printed.

use std::cell::Cell;
use std::rc::Rc;

use stackbind_core::{Context, Function, Result, StatsSnapshot, Table, Value, ValueType, Valset, wrap};

pub type Run = fn(&Context<'_>) -> Result<Vec<String>>;

#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub about: &'static str,
    pub run: Run,
}

pub const SCENARIOS: [Scenario; 7] = [
    Scenario { name: "concat", about: "merged versus stepwise concatenation", run: concat },
    Scenario { name: "arith", about: "arithmetic programs and metamethods", run: arith },
    Scenario { name: "call", about: "nested calls and multi-value arguments", run: call },
    Scenario { name: "pcall", about: "protected calls and error recovery", run: pcall },
    Scenario { name: "valset", about: "growing, shrinking and blocking a value set", run: valset },
    Scenario { name: "discard", about: "operations fired or skipped on drop", run: discard },
    Scenario { name: "table", about: "constructors, iteration and raw access", run: table },
];

pub fn find(name: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|s| s.name == name)
}

fn counters(ctx: &Context<'_>) -> StatsSnapshot {
    ctx.machine().stats().snapshot()
}

fn join(set: &Valset<'_>) -> Result<String> {
    let parts = set.iter().map(|v| v.cast::<String>()).collect::<Result<Vec<_>>>()?;
    Ok(parts.join(" "))
}

fn concat(ctx: &Context<'_>) -> Result<Vec<String>> {
    ctx.global("name").set("world")?;

    let before = counters(ctx);
    let merged = (ctx.concat(("Hello, ", ctx.global("name"))) & "! n=" & 42).cast::<String>()?;
    let mid = counters(ctx);

    let partial = ctx.concat(("Hello, ", ctx.global("name"))).to_value()?;
    let stepwise = (&partial & "! n=" & 42).cast::<String>()?;
    let after = counters(ctx);

    Ok(vec![
        format!("merged:   {merged}"),
        format!(
            "          {} concat over {} operands",
            mid.concats - before.concats,
            mid.concat_operands - before.concat_operands
        ),
        format!("stepwise: {stepwise}"),
        format!("          {} concats", after.concats - mid.concats),
    ])
}

fn arith(ctx: &Context<'_>) -> Result<Vec<String>> {
    let x = Value::new(ctx, 6)?;
    let y = Value::new(ctx, 4)?;

    let before = counters(ctx);
    let program = ((&x + &y) * 2 - 1).cast::<i64>()?;
    let ops = counters(ctx).ariths - before.ariths;
    let ratio = (&x / &y).cast::<f64>()?;
    let floor = x.idiv(&y).cast::<i64>()?;

    let mt = Table::new(ctx);
    mt.at("__add").set(Function::new(|ctx| {
        ctx.ret((ctx.records([("n", ctx.arg(1).at("n") + ctx.arg(2).at("n"))]),))
    }))?;
    let a = Table::records(ctx, [("n", 1)])?;
    a.set_mt(&mt)?;
    let b = Table::records(ctx, [("n", 2)])?;
    b.set_mt(&mt)?;
    let n = (&a + &b).at("n").cast::<i64>()?;

    Ok(vec![
        format!("(x + y) * 2 - 1 = {program} ({ops} arith primitives)"),
        format!("x / y = {ratio}"),
        format!("x // y = {floor}"),
        format!("{{n=1}} + {{n=2}} via __add: n = {n}"),
    ])
}

fn call(ctx: &Context<'_>) -> Result<Vec<String>> {
    ctx.global("greet").set(wrap(|name: String, punct: Option<String>| {
        format!("hello, {name}{}", punct.unwrap_or_default())
    }))?;

    let before = counters(ctx);
    let greeting = ctx
        .global("greet")
        .call((ctx.global("string").at("upper").call(("ada",)), "!"))
        .cast::<String>()?;
    let calls = counters(ctx).calls - before.calls;

    let select = ctx.global("select").to_value()?;
    let expanded = select.call(("#", select.call((1, "a", "b", "c")))).cast::<i64>()?;
    let truncated = select.call(("#", select.call((1, "a", "b", "c")), "d")).cast::<i64>()?;

    Ok(vec![
        format!("{greeting} ({calls} calls)"),
        format!("trailing call passes {expanded} values"),
        format!("non-final call passes one, {truncated} in total"),
    ])
}

fn pcall(ctx: &Context<'_>) -> Result<Vec<String>> {
    let mut out = Vec::new();

    let failed = ctx.global("error").pcall(("boom",)).to_valset()?;
    let message = failed.first().map(|v| v.cast::<String>()).transpose()?;
    out.push(format!(
        "error(\"boom\"): success={} message={}",
        failed.success(),
        message.unwrap_or_default()
    ));
    drop(failed);

    let ok = ctx.global("math").at("max").pcall((3, 9, 4)).to_valset()?;
    let best = ok.first().map(|v| v.cast::<i64>()).transpose()?;
    out.push(format!("math.max(3, 9, 4): success={} value={}", ok.success(), best.unwrap_or_default()));
    drop(ok);

    let depth = ctx.depth();
    if let Err(e) = ctx.global("missing").call((1, 2)).run() {
        out.push(format!("unprotected: {e} (depth {depth} -> {})", ctx.depth()));
    }
    Ok(out)
}

fn valset(ctx: &Context<'_>) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut set = Valset::from_operands(ctx, (1, 2, 3))?;
    set.push_back(4)?;
    set.push_back_all((5, 6))?;
    set.pop_back(2)?;
    out.push(format!("values: {}", join(&set)?));

    let blocker = Value::new(ctx, "top")?;
    out.push(format!("blocked: {}", set.is_blocked()));
    if let Err(e) = set.push_back(5) {
        out.push(format!("push_back refused: {e}"));
    }
    drop(blocker);
    set.push_back(5)?;
    out.push(format!("after release: {}", join(&set)?));

    let best = ctx.global("math").at("max").call((&set,)).cast::<i64>()?;
    out.push(format!("math.max(set) = {best}"));
    Ok(out)
}

fn discard(ctx: &Context<'_>) -> Result<Vec<String>> {
    let ticks = Rc::new(Cell::new(0));
    let counter = Rc::clone(&ticks);
    ctx.global("tick").set(Function::new(move |ctx| {
        counter.set(counter.get() + 1);
        ctx.ret(())
    }))?;

    let mut out = Vec::new();
    drop(ctx.global("tick").call(()));
    out.push(format!("dropped call fired {} time(s)", ticks.get()));

    let mut pending = ctx.global("tick").call(());
    pending.move_out();
    drop(pending);
    out.push(format!("moved-out call fired {} time(s)", ticks.get() - 1));

    let policy = ctx.machine().config().discard;
    let t = Table::new(ctx);
    let before = counters(ctx);
    drop(t.at("missing"));
    drop(&t + 1);
    let after = counters(ctx);
    out.push(format!(
        "dropped read: {} index primitive(s) (index policy {})",
        after.indexes - before.indexes,
        policy.index
    ));
    out.push(format!(
        "dropped arithmetic: {} arith primitive(s) (arithmetic policy {})",
        after.ariths - before.ariths,
        policy.arithmetic
    ));

    drop(ctx.global("missing").call(()));
    for e in ctx.take_discard_errors() {
        out.push(format!("recorded: {e}"));
    }
    Ok(out)
}

fn table(ctx: &Context<'_>) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let list = Table::array(ctx, ("a", "b", "c"))?;
    let mut items = Vec::new();
    list.iterate(|k, v| {
        items.push(format!("{}={}", k.cast::<String>()?, v.cast::<String>()?));
        Ok(true)
    })?;
    out.push(format!("border {}: {}", list.len(), items.join(", ")));

    let defaults = Table::records(ctx, [("color", "red")])?;
    let mt = Table::records(ctx, [("__index", &defaults)])?;
    let obj = Table::new(ctx);
    obj.set_mt(&mt)?;
    out.push(format!("obj.color = {}", obj.at("color").cast::<String>()?));
    out.push(format!("raw obj.color is nil: {}", obj.raw().get("color").type_of()? == ValueType::Nil));

    obj.at("size").set(3)?;
    out.push(format!("raw obj.size = {}", obj.raw().get("size").cast::<i64>()?));
    Ok(out)
}
