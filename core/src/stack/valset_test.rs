use anyhow::Result;

use crate::stack::{Function, State, Valset, Value};

#[test]
fn test_grows_and_shrinks_at_the_top() -> Result<()> {
    let state = State::new();
    state.run(|ctx| {
        let mut set = Valset::from_operands(ctx, (1, 2))?;
        set.push_back(3)?;
        set.push_back_all(("a", "b"))?;
        assert_eq!(set.len(), 5);
        assert_eq!(ctx.depth(), 5);
        set.pop_back(2)?;
        assert_eq!(set.last().map(|v| v.cast::<i64>()).transpose()?, Some(3));
        set.pop_back(10)?;
        assert!(set.is_empty());
        assert_eq!(ctx.depth(), 0);
        Ok(())
    })?;
    Ok(())
}

#[test]
fn test_value_above_blocks_growth() -> Result<()> {
    let state = State::new();
    state.run(|ctx| {
        let mut set = Valset::from_operands(ctx, (1, 2))?;
        let above = Value::new(ctx, 9)?;
        assert!(set.is_blocked());
        let err = set.push_back(3).unwrap_err();
        assert!(err.is_composition());
        assert_eq!(err.to_string(), "attempt to grow blocked Valset");
        assert_eq!(set.pop_back(1).unwrap_err().to_string(), "attempt to shrink blocked Valset");
        assert_eq!(ctx.depth(), 3);
        drop(above);
        assert!(!set.is_blocked());
        set.push_back(3)?;
        assert_eq!(set.len(), 3);
        Ok(())
    })?;
    Ok(())
}

#[test]
fn test_blocked_growth_does_not_run_operands() -> Result<()> {
    let state = State::new();
    state.run(|ctx| {
        ctx.global("f").set(Function::new(|ctx| ctx.ret((1,))))?;
        let mut set = Valset::new(ctx);
        let _above = Value::new(ctx, 0)?;
        state.reset_stats();
        assert!(set.push_back_all((ctx.global("f").call(()),)).is_err());
        assert_eq!(state.stats().calls, 0);
        assert_eq!(ctx.depth(), 1);
        Ok(())
    })?;
    Ok(())
}

#[test]
fn test_inner_set_blocks_outer() -> Result<()> {
    let state = State::new();
    state.run(|ctx| {
        let mut outer = Valset::new(ctx);
        {
            let mut inner = Valset::new(ctx);
            assert!(outer.is_blocked());
            assert!(outer.push_back(1).is_err());
            inner.push_back(2)?;
            assert_eq!(ctx.depth(), 1);
        }
        assert!(!outer.is_blocked());
        outer.push_back(1)?;
        assert_eq!(outer.first().map(|v| v.cast::<i64>()).transpose()?, Some(1));
        Ok(())
    })?;
    Ok(())
}

#[test]
fn test_clone_copies_every_slot() -> Result<()> {
    let state = State::new();
    state.run(|ctx| {
        let set = Valset::from_operands(ctx, ("x", "y"))?;
        let copy = set.clone();
        assert_eq!(copy.start(), 3);
        assert_eq!(ctx.depth(), 4);
        let values = copy.iter().map(|v| v.cast::<String>()).collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(values, ["x", "y"]);
        assert!(set.is_blocked());
        assert!(!copy.is_blocked());
        Ok(())
    })?;
    Ok(())
}

#[test]
fn test_one_based_access() -> Result<()> {
    let state = State::new();
    state.run(|ctx| {
        let set = Valset::from_operands(ctx, (10, 20))?;
        assert!(set.get(0).is_none());
        assert!(set.get(3).is_none());
        assert_eq!(set.get(2).map(|v| v.index()), Some(2));
        assert_eq!(format!("{set:?}").matches("Valref").count(), 2);
        Ok(())
    })?;
    Ok(())
}

#[test]
fn test_argument_view_is_always_blocked() -> Result<()> {
    let state = State::new();
    state.run(|ctx| {
        ctx.global("f").set(Function::new(|ctx| {
            let mut args = ctx.args();
            assert_eq!(args.len(), 3);
            assert!(args.is_blocked());
            assert!(args.push_back(4).is_err());
            let sum = args.iter().map(|v| v.to_or(0i64)).sum::<i64>();
            ctx.ret((sum,))
        }))?;
        assert_eq!(ctx.global("f").call((1, 2, 3)).cast::<i64>()?, 6);
        Ok(())
    })?;
    Ok(())
}

#[test]
fn test_returning_a_set_drops_what_is_above_it() -> Result<()> {
    let state = State::new();
    state.run(|ctx| {
        ctx.global("g").set(Function::new(|ctx| {
            let _below = Value::new(ctx, "below")?;
            let set = Valset::from_operands(ctx, (10, 20))?;
            let _above = Value::new(ctx, "above")?;
            Ok(ctx.ret_valset(&set))
        }))?;
        let results = ctx.global("g").call(()).to_valset()?;
        assert_eq!(results.len(), 2);
        assert_eq!(results.first().map(|v| v.cast::<i64>()).transpose()?, Some(10));
        assert_eq!(results.last().map(|v| v.cast::<i64>()).transpose()?, Some(20));
        Ok(())
    })?;
    Ok(())
}
