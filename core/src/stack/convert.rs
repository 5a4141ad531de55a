//! Explicit conversions from slot contents to native values.

use crate::error::{Error, Result};
use crate::val::{LightUserData, Val, ValueType, format_float, to_float, to_integer};

/// Native kinds a slot can be converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Bool,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    String,
    LightUserData,
    Val,
}

impl NativeKind {
    pub const fn name(self) -> &'static str {
        match self {
            NativeKind::Bool => "boolean",
            NativeKind::I32 => "i32",
            NativeKind::U32 => "u32",
            NativeKind::I64 => "i64",
            NativeKind::U64 => "u64",
            NativeKind::F32 => "f32",
            NativeKind::F64 => "f64",
            NativeKind::String => "string",
            NativeKind::LightUserData => "lightuserdata",
            NativeKind::Val => "value",
        }
    }
}

/// A converted native value.
#[derive(Debug, Clone, PartialEq)]
pub enum Native {
    Bool(bool),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    LightUserData(LightUserData),
    Val(Val),
}

/// `2^64`, the first float past the `u64` range.
const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

/// Converts `v` to `kind`.
///
/// Numeric strings convert to numbers and numbers to strings. Integers out of
/// the target's range and floats with a fractional part are errors. `Bool`
/// uses truthiness and never fails.
pub fn convert_to(v: &Val, kind: NativeKind) -> Result<Native> {
    let fail = || Error::conversion(kind.name(), v.type_of());
    let int = || to_integer(v).ok_or_else(fail);
    Ok(match kind {
        NativeKind::Bool => Native::Bool(v.truthy()),
        NativeKind::I32 => Native::I32(i32::try_from(int()?).map_err(|_| fail())?),
        NativeKind::U32 => Native::U32(u32::try_from(int()?).map_err(|_| fail())?),
        NativeKind::I64 => Native::I64(int()?),
        NativeKind::U64 => match v {
            Val::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n < U64_LIMIT => Native::U64(*n as u64),
            _ => Native::U64(u64::try_from(int()?).map_err(|_| fail())?),
        },
        NativeKind::F32 => Native::F32(to_float(v).ok_or_else(fail)? as f32),
        NativeKind::F64 => Native::F64(to_float(v).ok_or_else(fail)?),
        NativeKind::String => Native::String(match v {
            Val::Str(s) => s.to_string(),
            Val::Int(i) => i.to_string(),
            Val::Number(n) => format_float(*n),
            _ => return Err(fail()),
        }),
        NativeKind::LightUserData => match v {
            Val::LightUserData(p) => Native::LightUserData(*p),
            _ => return Err(fail()),
        },
        NativeKind::Val => Native::Val(v.clone()),
    })
}

/// Types a slot can be read as.
pub trait FromSlot: Sized {
    const NAME: &'static str;

    fn from_val(v: &Val) -> Result<Self>;

    /// Whether `v` converts to this type without error.
    fn is_kind(v: &Val) -> bool {
        Self::from_val(v).is_ok()
    }

    /// Conversion of a position that may be past the top.
    fn from_slot(v: Option<&Val>) -> Result<Self> {
        match v {
            Some(v) => Self::from_val(v),
            None => Err(Error::conversion(Self::NAME, ValueType::None)),
        }
    }
}

macro_rules! impl_from_slot {
    ($($t:ty => $kind:ident),* $(,)?) => {
        $(
            impl FromSlot for $t {
                const NAME: &'static str = NativeKind::$kind.name();

                fn from_val(v: &Val) -> Result<Self> {
                    match convert_to(v, NativeKind::$kind)? {
                        Native::$kind(x) => Ok(x),
                        _ => Err(Error::conversion(Self::NAME, v.type_of())),
                    }
                }
            }
        )*
    };
}

impl_from_slot! {
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    LightUserData => LightUserData,
}

impl FromSlot for bool {
    const NAME: &'static str = "boolean";

    fn from_val(v: &Val) -> Result<Self> {
        Ok(v.truthy())
    }

    /// Strict: only actual booleans.
    fn is_kind(v: &Val) -> bool {
        matches!(v, Val::Bool(_))
    }

    fn from_slot(v: Option<&Val>) -> Result<Self> {
        Ok(v.is_some_and(Val::truthy))
    }
}

impl FromSlot for Val {
    const NAME: &'static str = "value";

    fn from_val(v: &Val) -> Result<Self> {
        Ok(v.clone())
    }

    fn from_slot(v: Option<&Val>) -> Result<Self> {
        Ok(v.cloned().unwrap_or_default())
    }
}

impl<T: FromSlot> FromSlot for Option<T> {
    const NAME: &'static str = T::NAME;

    fn from_val(v: &Val) -> Result<Self> {
        match v {
            Val::Nil => Ok(None),
            v => T::from_val(v).map(Some),
        }
    }

    fn from_slot(v: Option<&Val>) -> Result<Self> {
        match v {
            None => Ok(None),
            Some(v) => Self::from_val(v),
        }
    }
}
