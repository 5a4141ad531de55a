use anyhow::Result;

use crate::config::StateConfig;
use crate::stack::{Function, State, Table, UserData, Value};
use crate::val::ValueType;

struct Point {
    x: i32,
}

impl UserData for Point {
    const CLASS_NAME: &'static str = "Point";
}

#[derive(Debug)]
struct Other;

impl UserData for Other {
    const CLASS_NAME: &'static str = "Other";
}

#[test]
fn test_require_args_reports_counts() -> Result<()> {
    let state = State::new();
    state.run(|ctx| {
        ctx.global("f").set(Function::new(|ctx| {
            ctx.require_args::<()>(2)?;
            ctx.ret((ctx.arg(1), ctx.arg(2)))
        }))?;
        let err = ctx.global("f").call((1,)).run().unwrap_err();
        assert!(err.is_runtime());
        assert_eq!(err.to_string(), "Insufficient number of arguments (2 expected, 1 passed).");
        let both = ctx.global("f").call((1, 2)).to_valset()?;
        assert_eq!(both.len(), 2);
        Ok(())
    })?;
    Ok(())
}

#[test]
fn test_require_args_checks_types() -> Result<()> {
    let state = State::new();
    state.run(|ctx| {
        ctx.global("f").set(Function::new(|ctx| {
            ctx.require_args::<(i64, String)>(1)?;
            ctx.ret((ctx.arg(2),))
        }))?;
        let f = ctx.global("f").to_value()?;
        assert_eq!(f.call((1, "s")).cast::<String>()?, "s");
        assert_eq!(f.call((1, "s", true)).cast::<String>()?, "s");
        let err = f.call((1,)).run().unwrap_err();
        assert_eq!(err.to_string(), "Insufficient number of arguments (2 expected, 1 passed).");
        let err = f.call((1, ctx.array(()))).run().unwrap_err();
        assert!(err.is_runtime());
        assert_eq!(err.to_string(), "Argument 2 type is incompatible.");
        let err = f.call((true, "s")).run().unwrap_err();
        assert_eq!(err.to_string(), "Argument 1 type is incompatible.");
        Ok(())
    })?;
    Ok(())
}

#[test]
fn test_check_args_by_type() -> Result<()> {
    let state = State::new();
    state.run(|ctx| {
        ctx.global("f").set(Function::new(|ctx| {
            let ok = ctx.check_args::<(i64, String, bool)>(2);
            ctx.ret((ok,))
        }))?;
        let f = ctx.global("f").to_value()?;
        assert!(f.call((1, "s")).cast::<bool>()?);
        assert!(f.call((1, "s", true)).cast::<bool>()?);
        assert!(!f.call((1, "s", 0)).cast::<bool>()?);
        assert!(!f.call((1,)).cast::<bool>()?);
        assert!(!f.call((ctx.array(()), "s")).cast::<bool>()?);
        Ok(())
    })?;
    Ok(())
}

#[test]
fn test_remove_respects_arguments() -> Result<()> {
    let state = State::new();
    state.run(|ctx| {
        ctx.global("f").set(Function::new(|ctx| {
            assert!(ctx.remove(1).unwrap_err().is_composition());
            assert_eq!(ctx.remove(9).unwrap_err().to_string(), "invalid stack position 9");
            let a = Value::new(ctx, "a")?;
            let _b = Value::new(ctx, "b")?;
            ctx.remove(a.index())?;
            assert_eq!(ctx.depth(), 2);
            assert_eq!(ctx.arg(2).cast::<String>()?, "b");
            ctx.ret((ctx.arg(1),))
        }))?;
        assert_eq!(ctx.global("f").call((5,)).cast::<i64>()?, 5);
        Ok(())
    })?;
    Ok(())
}

#[test]
fn test_registry_store_and_lookup() -> Result<()> {
    let state = State::new();
    state.run(|ctx| {
        let first = ctx.registry().store("saved")?;
        let second = ctx.registry().store(ctx.array((1, 2)))?;
        assert_ne!(first, second);
        assert_eq!(ctx.depth(), 0);
        assert_eq!(ctx.registry().at(first).cast::<String>()?, "saved");
        assert_eq!(ctx.registry().at(second).len().cast::<i64>()?, 2);
        ctx.registry().at("named").set(true)?;
        assert!(ctx.registry().at("named").to_bool()?);
        assert_eq!(ctx.global("named").type_of()?, ValueType::Nil);
        Ok(())
    })?;
    Ok(())
}

#[test]
fn test_userdata_carries_class_metatable() -> Result<()> {
    let state = State::new();
    state.run(|ctx| {
        let methods = Table::new(ctx);
        methods.at("x").set(Function::new(|ctx| {
            let p = ctx.arg(1).cast_userdata::<Point>()?;
            ctx.ret((p.x,))
        }))?;
        ctx.mt::<Point>().set(ctx.records([("__index", &methods)]))?;
        let p = ctx.userdata(Point { x: 4 })?;
        assert!(p.is_userdata::<Point>());
        assert!(!p.is_userdata::<Other>());
        assert_eq!(p.at("x").call((&p,)).cast::<i32>()?, 4);
        let err = p.cast_userdata::<Other>().unwrap_err();
        assert_eq!(err.to_string(), "bad cast to Other (userdata value)");
        let plain = ctx.userdata(Other)?;
        assert_eq!(plain.mt().type_of()?, ValueType::Nil);
        Ok(())
    })?;
    Ok(())
}

#[test]
fn test_conversion_errors_cross_native_boundary() -> Result<()> {
    let state = State::new();
    state.run(|ctx| {
        ctx.global("f").set(Function::new(|ctx| {
            let n = ctx.arg(1).cast::<i32>()?;
            ctx.ret((n,))
        }))?;
        let err = ctx.global("f").call(("x",)).run().unwrap_err();
        assert!(err.is_runtime());
        assert_eq!(
            err.to_string(),
            "native function terminated with an error: bad cast to i32 (string value)"
        );
        Ok(())
    })?;
    Ok(())
}

#[test]
fn test_native_scope_is_cleared_on_return() -> Result<()> {
    let state = State::new();
    state.run(|ctx| {
        ctx.global("f").set(Function::new(|ctx| {
            let _scratch = Value::new(ctx, "scratch")?;
            let t = Table::array(ctx, (1, 2))?;
            ctx.ret((t.len(), &t))
        }))?;
        let results = ctx.global("f").call(()).to_valset()?;
        assert_eq!(results.len(), 2);
        assert_eq!(results.first().map(|v| v.cast::<i64>()).transpose()?, Some(2));
        assert_eq!(results.last().map(|v| v.type_of()), Some(ValueType::Table));
        assert_eq!(ctx.depth(), 2);
        Ok(())
    })?;
    assert_eq!(state.depth(), 0);
    Ok(())
}

#[test]
#[should_panic(expected = "stack integrity compromised")]
fn test_out_of_order_release_is_caught() {
    let state = State::with_config(StateConfig {
        watch_stack: true,
        ..StateConfig::default()
    });
    let _ = state.run(|ctx| {
        let a = Value::new(ctx, 1)?;
        let _b = Value::new(ctx, 2)?;
        drop(a);
        Ok(())
    });
}
