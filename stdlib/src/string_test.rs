#[cfg(test)]
mod tests {
    use anyhow::Result;
    use stackbind_core::{State, Val};

    use crate::open_all;

    #[test]
    fn test_case_and_length() -> Result<()> {
        let state = State::new();
        state.run(|ctx| {
            open_all(ctx)?;
            let string = ctx.global("string").to_value()?;
            assert_eq!(string.at("len").call(("hello",)).cast::<i64>()?, 5);
            assert_eq!(string.at("len").call(("",)).cast::<i64>()?, 0);
            assert_eq!(string.at("upper").call(("MiXed 1",)).cast::<String>()?, "MIXED 1");
            assert_eq!(string.at("lower").call(("MiXed 1",)).cast::<String>()?, "mixed 1");
            // numbers coerce to their string form
            assert_eq!(string.at("len").call((1.5,)).cast::<i64>()?, 3);
            Ok(())
        })?;
        Ok(())
    }

    #[test]
    fn test_rep() -> Result<()> {
        let state = State::new();
        state.run(|ctx| {
            open_all(ctx)?;
            let rep = ctx.global("string").at("rep").to_value()?;
            assert_eq!(rep.call(("ab", 3)).cast::<String>()?, "ababab");
            assert_eq!(rep.call(("ab", 3, ", ")).cast::<String>()?, "ab, ab, ab");
            assert_eq!(rep.call(("ab", 0)).cast::<String>()?, "");
            assert_eq!(rep.call(("ab", -2)).cast::<String>()?, "");
            let err = rep.call(("ab", i64::MAX)).run().unwrap_err();
            assert_eq!(err.to_string(), "resulting string too large");
            Ok(())
        })?;
        assert_eq!(state.depth(), 0);
        Ok(())
    }

    #[test]
    fn test_sub_index_rules() -> Result<()> {
        let state = State::new();
        state.run(|ctx| {
            open_all(ctx)?;
            let sub = ctx.global("string").at("sub").to_value()?;
            assert_eq!(sub.call(("hello", 2, 4)).cast::<String>()?, "ell");
            assert_eq!(sub.call(("hello", 2)).cast::<String>()?, "ello");
            assert_eq!(sub.call(("hello", -3)).cast::<String>()?, "llo");
            assert_eq!(sub.call(("hello", -3, -2)).cast::<String>()?, "ll");
            assert_eq!(sub.call(("hello", 0)).cast::<String>()?, "hello");
            assert_eq!(sub.call(("hello", -10, 2)).cast::<String>()?, "he");
            assert_eq!(sub.call(("hello", 4, 100)).cast::<String>()?, "lo");
            assert_eq!(sub.call(("hello", 4, 2)).cast::<String>()?, "");
            assert_eq!(sub.call(("hello", 9)).cast::<String>()?, "");
            Ok(())
        })?;
        Ok(())
    }

    #[test]
    fn test_reverse_and_bad_argument() -> Result<()> {
        let state = State::new();
        state.run(|ctx| {
            open_all(ctx)?;
            let string = ctx.global("string").to_value()?;
            assert_eq!(string.at("reverse").call(("abc",)).cast::<String>()?, "cba");
            assert_eq!(string.at("reverse").call(("",)).cast::<String>()?, "");
            let err = string.at("upper").call((Val::Nil,)).run().unwrap_err();
            assert_eq!(err.to_string(), "native function terminated with an error: bad cast to string (nil value)");
            Ok(())
        })?;
        Ok(())
    }
}
