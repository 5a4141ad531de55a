use std::rc::Rc;

use super::{LightUserData, TableRef, Val};

impl From<String> for Val {
    #[inline]
    fn from(s: String) -> Self {
        Val::Str(Rc::<str>::from(s))
    }
}

impl From<&str> for Val {
    #[inline]
    fn from(s: &str) -> Self {
        Val::Str(Rc::from(s))
    }
}

impl From<Rc<str>> for Val {
    #[inline]
    fn from(s: Rc<str>) -> Self {
        Val::Str(s)
    }
}

impl From<i64> for Val {
    #[inline]
    fn from(i: i64) -> Self {
        Val::Int(i)
    }
}

impl From<i32> for Val {
    #[inline]
    fn from(i: i32) -> Self {
        Val::Int(i as i64)
    }
}

impl From<u32> for Val {
    #[inline]
    fn from(i: u32) -> Self {
        Val::Int(i as i64)
    }
}

/// Values above `i64::MAX` become the nearest float and may lose their low
/// bits; they never come back negative.
impl From<u64> for Val {
    #[inline]
    fn from(i: u64) -> Self {
        match i64::try_from(i) {
            Ok(i) => Val::Int(i),
            Err(_) => Val::Number(i as f64),
        }
    }
}

impl From<usize> for Val {
    #[inline]
    fn from(i: usize) -> Self {
        Val::from(i as u64)
    }
}

impl From<f64> for Val {
    #[inline]
    fn from(f: f64) -> Self {
        Val::Number(f)
    }
}

impl From<f32> for Val {
    #[inline]
    fn from(f: f32) -> Self {
        Val::Number(f as f64)
    }
}

impl From<bool> for Val {
    #[inline]
    fn from(b: bool) -> Self {
        Val::Bool(b)
    }
}

impl From<LightUserData> for Val {
    #[inline]
    fn from(p: LightUserData) -> Self {
        Val::LightUserData(p)
    }
}

impl From<TableRef> for Val {
    #[inline]
    fn from(t: TableRef) -> Self {
        Val::Table(t)
    }
}

impl<T: Into<Val>> From<Option<T>> for Val {
    #[inline]
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Val::Nil,
        }
    }
}
