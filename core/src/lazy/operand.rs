use std::rc::Rc;

use crate::error::{Error, Result};
use crate::stack::{Context, Function, RegistryKey, Table, Valref, Valset, Value};
use crate::val::{Closure, LightUserData, Val};

use super::{Lazy, Want};

/// One input of a deferred operation.
pub enum Operand<'c> {
    /// An immediate value, pushed as is.
    Val(Val),
    /// A copy of the slot at this position.
    Slot(usize),
    /// A run of slots: all of them when expanded, else the first (or nil).
    Set { start: usize, len: usize },
    Lazy(Lazy<'c>),
}

impl Operand<'_> {
    /// Disarms a nested operation so dropping it does nothing.
    pub fn move_out(&mut self) {
        if let Operand::Lazy(l) = self {
            l.move_out();
        }
    }
}

/// Pushes `operand`, one value or (when `expand`) all of its values.
pub(crate) fn push_operand<'c>(ctx: &'c Context<'c>, operand: &mut Operand<'c>, expand: bool) -> Result<usize> {
    match operand {
        Operand::Val(v) => {
            ctx.vm.push(v.clone());
            Ok(1)
        }
        Operand::Slot(pos) => {
            if !ctx.is_valid(*pos) {
                return Err(Error::composition(format!("invalid stack position {pos}")));
            }
            ctx.vm.duplicate(ctx.abs(*pos));
            Ok(1)
        }
        Operand::Set { start, len } => {
            if *len == 0 {
                if expand {
                    return Ok(0);
                }
                ctx.vm.push(Val::Nil);
                return Ok(1);
            }
            if !ctx.is_valid(*start + *len - 1) {
                return Err(Error::composition(format!("invalid stack position {start}")));
            }
            let n = if expand { *len } else { 1 };
            let first = ctx.abs(*start);
            for i in 0..n {
                ctx.vm.duplicate(first + i);
            }
            Ok(n)
        }
        Operand::Lazy(l) => l.emit(if expand { Want::All } else { Want::One }),
    }
}

/// Argument lists: tuples of operands, `()` or a `Vec<Operand>`.
pub trait IntoOperands<'c> {
    fn into_operands(self) -> Vec<Operand<'c>>;
}

impl<'c> IntoOperands<'c> for Vec<Operand<'c>> {
    fn into_operands(self) -> Vec<Operand<'c>> {
        self
    }
}

macro_rules! impl_into_operands {
    ($($t:ident $v:ident),*) => {
        impl<'c, $($t: Into<Operand<'c>>),*> IntoOperands<'c> for ($($t,)*) {
            #[allow(unused_variables)]
            fn into_operands(self) -> Vec<Operand<'c>> {
                let ($($v,)*) = self;
                vec![$($v.into()),*]
            }
        }
    };
}

impl_into_operands!();
impl_into_operands!(A a);
impl_into_operands!(A a, B b);
impl_into_operands!(A a, B b, C c);
impl_into_operands!(A a, B b, C c, D d);
impl_into_operands!(A a, B b, C c, D d, E e);
impl_into_operands!(A a, B b, C c, D d, E e, F f);
impl_into_operands!(A a, B b, C c, D d, E e, F f, G g);
impl_into_operands!(A a, B b, C c, D d, E e, F f, G g, H h);

macro_rules! operand_from_val {
    ($($t:ty),*) => {
        $(
            impl<'c> From<$t> for Operand<'c> {
                fn from(v: $t) -> Self {
                    Operand::Val(Val::from(v))
                }
            }
        )*
    };
}

operand_from_val!(i32, i64, u32, u64, usize, f32, f64, bool, String, Rc<str>, LightUserData);

impl<'c> From<&str> for Operand<'c> {
    fn from(v: &str) -> Self {
        Operand::Val(Val::from(v))
    }
}

impl<'c> From<Val> for Operand<'c> {
    fn from(v: Val) -> Self {
        Operand::Val(v)
    }
}

impl<'c> From<&Val> for Operand<'c> {
    fn from(v: &Val) -> Self {
        Operand::Val(v.clone())
    }
}

impl<'c> From<Function> for Operand<'c> {
    fn from(f: Function) -> Self {
        Operand::Val(Val::Function(Rc::new(Closure::new(f.raw, Vec::new()))))
    }
}

impl<'c> From<RegistryKey> for Operand<'c> {
    fn from(k: RegistryKey) -> Self {
        Operand::Val(Val::Int(k.0))
    }
}

impl<'c> From<Valref<'c>> for Operand<'c> {
    fn from(r: Valref<'c>) -> Self {
        Operand::Slot(r.pos)
    }
}

impl<'c> From<&Valref<'c>> for Operand<'c> {
    fn from(r: &Valref<'c>) -> Self {
        Operand::Slot(r.pos)
    }
}

impl<'c> From<&Value<'c>> for Operand<'c> {
    fn from(v: &Value<'c>) -> Self {
        Operand::Slot(v.pos)
    }
}

impl<'c> From<&Table<'c>> for Operand<'c> {
    fn from(t: &Table<'c>) -> Self {
        Operand::Slot(t.pos)
    }
}

impl<'c> From<&Valset<'c>> for Operand<'c> {
    fn from(s: &Valset<'c>) -> Self {
        Operand::Set {
            start: s.start(),
            len: s.len(),
        }
    }
}

impl<'c> From<Lazy<'c>> for Operand<'c> {
    fn from(l: Lazy<'c>) -> Self {
        Operand::Lazy(l)
    }
}

impl<'c, T: Into<Operand<'c>>> From<Option<T>> for Operand<'c> {
    fn from(v: Option<T>) -> Self {
        v.map_or(Operand::Val(Val::Nil), Into::into)
    }
}
