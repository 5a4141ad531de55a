use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::val::{RawFn, Val};
use crate::vm::Machine;

use super::context::Context;
use super::convert::FromSlot;

/// Number of values a native function leaves on top of the stack as its
/// results. Obtained from [`Context::ret`] or [`Retval::none`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Retval(pub(crate) usize);

impl Retval {
    pub fn none() -> Self {
        Retval(0)
    }

    pub fn count(self) -> usize {
        self.0
    }
}

/// Key of a value stored with [`Registry::store`](super::Registry::store).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistryKey(pub(crate) i64);

/// A native function callable from the machine.
#[derive(Clone)]
pub struct Function {
    pub(crate) raw: RawFn,
}

impl Function {
    /// Wraps a body that receives a fresh [`Context`] for every call.
    ///
    /// Errors other than runtime errors reach the caller as runtime errors
    /// naming the native failure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Context<'_>) -> Result<Retval> + 'static,
    {
        let raw: RawFn = Rc::new(move |vm: &Machine| {
            let ctx = Context::enter(vm, vm.frame_base());
            let ret = f(&ctx).map_err(Error::into_foreign)?;
            Ok(ret.0)
        });
        Self { raw }
    }

    pub fn raw(&self) -> &RawFn {
        &self.raw
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({:p})", Rc::as_ptr(&self.raw) as *const ())
    }
}

/// Values a wrapped function can return.
pub trait IntoRet {
    fn into_ret(self, ctx: &Context<'_>) -> Result<Retval>;
}

impl IntoRet for () {
    fn into_ret(self, _: &Context<'_>) -> Result<Retval> {
        Ok(Retval::none())
    }
}

impl IntoRet for Retval {
    fn into_ret(self, _: &Context<'_>) -> Result<Retval> {
        Ok(self)
    }
}

macro_rules! impl_into_ret {
    ($($t:ty),*) => {
        $(
            impl IntoRet for $t {
                fn into_ret(self, ctx: &Context<'_>) -> Result<Retval> {
                    ctx.ret((Val::from(self),))
                }
            }
        )*
    };
}

impl_into_ret!(bool, i32, u32, i64, u64, f32, f64, String, &'static str, Val);

impl<T: IntoRet> IntoRet for Option<T> {
    fn into_ret(self, ctx: &Context<'_>) -> Result<Retval> {
        match self {
            Some(v) => v.into_ret(ctx),
            None => ctx.ret((Val::Nil,)),
        }
    }
}

impl<T: IntoRet> IntoRet for Result<T> {
    fn into_ret(self, ctx: &Context<'_>) -> Result<Retval> {
        self?.into_ret(ctx)
    }
}

/// Typed Rust functions that [`wrap`] can turn into a [`Function`].
pub trait IntoNative<Args> {
    fn into_native(self) -> Function;
}

macro_rules! impl_into_native {
    ($($a:ident $v:ident => $i:expr),*) => {
        impl<F, R, $($a),*> IntoNative<($($a,)*)> for F
        where
            F: Fn($($a),*) -> R + 'static,
            R: IntoRet + 'static,
            $($a: FromSlot + 'static,)*
        {
            fn into_native(self) -> Function {
                Function::new(move |ctx| {
                    $(let $v = ctx.arg($i).cast::<$a>()?;)*
                    self($($v),*).into_ret(ctx)
                })
            }
        }
    };
}

impl_into_native!();
impl_into_native!(A a => 1);
impl_into_native!(A a => 1, B b => 2);
impl_into_native!(A a => 1, B b => 2, C c => 3);
impl_into_native!(A a => 1, B b => 2, C c => 3, D d => 4);

/// Turns `f(a, b, ..) -> R` into a native function that converts its
/// arguments strictly and pushes the result.
pub fn wrap<Args, F: IntoNative<Args>>(f: F) -> Function {
    f.into_native()
}
