#[cfg(test)]
mod tests {
    use anyhow::Result;
    use stackbind_core::{State, Val};

    use crate::open_all;

    #[test]
    fn test_abs_keeps_number_kind() -> Result<()> {
        let state = State::new();
        state.run(|ctx| {
            open_all(ctx)?;
            let abs = ctx.global("math").at("abs").to_value()?;
            assert_eq!(abs.call((-3,)).cast::<Val>()?, Val::Int(3));
            assert_eq!(abs.call((-2.5,)).cast::<Val>()?, Val::Number(2.5));
            assert_eq!(abs.call(("-4",)).cast::<i64>()?, 4);
            let err = abs.call((true,)).run().unwrap_err();
            assert_eq!(err.to_string(), "bad argument #1 to 'abs' (number expected, got boolean)");
            Ok(())
        })?;
        assert_eq!(state.depth(), 0);
        Ok(())
    }

    #[test]
    fn test_floor_and_ceil_return_integers() -> Result<()> {
        let state = State::new();
        state.run(|ctx| {
            open_all(ctx)?;
            let math = ctx.global("math").to_value()?;
            assert_eq!(math.at("floor").call((2.7,)).cast::<Val>()?, Val::Int(2));
            assert_eq!(math.at("floor").call((-2.1,)).cast::<Val>()?, Val::Int(-3));
            assert_eq!(math.at("ceil").call((2.1,)).cast::<Val>()?, Val::Int(3));
            assert_eq!(math.at("ceil").call((5,)).cast::<Val>()?, Val::Int(5));
            assert!(math.at("floor").call((f64::INFINITY,)).cast::<f64>()?.is_infinite());
            Ok(())
        })?;
        Ok(())
    }

    #[test]
    fn test_max_and_min_return_the_argument() -> Result<()> {
        let state = State::new();
        state.run(|ctx| {
            open_all(ctx)?;
            let math = ctx.global("math").to_value()?;
            assert_eq!(math.at("max").call((1, 2.5, 2)).cast::<Val>()?, Val::Number(2.5));
            assert_eq!(math.at("min").call((1, 2.5, 2)).cast::<Val>()?, Val::Int(1));
            assert_eq!(math.at("max").call((7,)).cast::<i64>()?, 7);
            let err = math.at("min").call((1, "x")).run().unwrap_err();
            assert_eq!(err.to_string(), "bad argument #2 to 'min' (number expected, got string)");
            let err = math.at("max").call(()).run().unwrap_err();
            assert_eq!(err.to_string(), "bad argument #1 to 'max' (number expected, got no value)");
            Ok(())
        })?;
        assert_eq!(state.depth(), 0);
        Ok(())
    }

    #[test]
    fn test_tointeger_and_sqrt() -> Result<()> {
        let state = State::new();
        state.run(|ctx| {
            open_all(ctx)?;
            let math = ctx.global("math").to_value()?;
            assert_eq!(math.at("tointeger").call((3.0,)).cast::<Option<i64>>()?, Some(3));
            assert_eq!(math.at("tointeger").call((3.5,)).cast::<Option<i64>>()?, None);
            assert_eq!(math.at("tointeger").call(("3",)).cast::<Option<i64>>()?, None);
            assert_eq!(math.at("sqrt").call((16,)).cast::<f64>()?, 4.0);
            Ok(())
        })?;
        Ok(())
    }

    #[test]
    fn test_constants() -> Result<()> {
        let state = State::new();
        state.run(|ctx| {
            open_all(ctx)?;
            let math = ctx.global("math").to_value()?;
            assert_eq!(math.at("pi").cast::<f64>()?, std::f64::consts::PI);
            assert!(math.at("huge").cast::<f64>()?.is_infinite());
            assert_eq!(math.at("maxinteger").cast::<i64>()?, i64::MAX);
            assert_eq!(math.at("mininteger").cast::<i64>()?, i64::MIN);
            Ok(())
        })?;
        Ok(())
    }
}
