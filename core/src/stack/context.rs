use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::warn;

use crate::error::{Error, Result};
use crate::lazy::{IntoOperands, Lazy, Op, Operand, Target, push_series};
use crate::val::{UserDataCell, Val};
use crate::vm::Machine;

use super::convert::FromSlot;
use super::userdata::UserData;
use super::valref::Valref;
use super::valset::Valset;
use super::value::Value;
use super::wrap::{Function, RegistryKey, Retval};

/// The view a native function (or a [`State::run`](super::State::run) body)
/// has of the shared stack.
///
/// Positions are 1-based and relative to the start of the call: position 1 is
/// the first argument.
pub struct Context<'m> {
    pub(crate) vm: &'m Machine,
    base: usize,
    nargs: usize,
    returning: Cell<bool>,
    checked_top: Cell<usize>,
    pub(crate) current_valset: Cell<u64>,
    valset_ids: Cell<u64>,
    pub(crate) last_pcall: Cell<Option<bool>>,
    discard_errors: RefCell<Vec<Error>>,
}

impl<'m> Context<'m> {
    /// Opens a view whose position 1 is the absolute slot `base`; everything
    /// already above `base` counts as arguments.
    pub(crate) fn enter(vm: &'m Machine, base: usize) -> Self {
        let nargs = vm.top().saturating_sub(base);
        Self {
            vm,
            base,
            nargs,
            returning: Cell::new(false),
            checked_top: Cell::new(0),
            current_valset: Cell::new(0),
            valset_ids: Cell::new(0),
            last_pcall: Cell::new(None),
            discard_errors: RefCell::new(Vec::new()),
        }
    }

    pub fn machine(&self) -> &'m Machine {
        self.vm
    }

    /// Number of slots in this call's part of the stack.
    pub fn depth(&self) -> usize {
        self.vm.top().saturating_sub(self.base)
    }

    pub fn arg_count(&self) -> usize {
        self.nargs
    }

    #[inline]
    pub(crate) fn abs(&self, pos: usize) -> usize {
        self.base + pos - 1
    }

    pub(crate) fn is_valid(&self, pos: usize) -> bool {
        pos >= 1 && pos <= self.depth()
    }

    pub(crate) fn value_at(&self, pos: usize) -> Option<Val> {
        if self.is_valid(pos) { self.vm.value(self.abs(pos)) } else { None }
    }

    pub(crate) fn next_valset_id(&self) -> u64 {
        let id = self.valset_ids.get() + 1;
        self.valset_ids.set(id);
        id
    }

    /// Gives back `count` slots starting at `low`, which must be the topmost
    /// ones. While returning, the slots stay where they are and only the
    /// checked top moves.
    pub(crate) fn release(&self, low: usize, count: usize) {
        let returning = self.returning.get();
        let top = if returning { self.checked_top.get() } else { self.depth() };
        if returning && low > top {
            // dropped together with everything above a returned valset
            return;
        }
        if self.vm.config().watch_stack && low + count != top + 1 && !std::thread::panicking() {
            panic!("stack integrity compromised: releasing {count} slot(s) at {low} with the top at {top}");
        }
        if returning {
            self.checked_top.set(low.saturating_sub(1));
        } else {
            self.vm.pop(count);
        }
    }

    pub(crate) fn record_discard_error(&self, err: Error) {
        warn!(target: "stackbind::lazy", error = %err, "discarded operation failed");
        self.discard_errors.borrow_mut().push(err);
    }

    /// Errors raised by operations that fired while being dropped.
    pub fn take_discard_errors(&self) -> Vec<Error> {
        std::mem::take(&mut *self.discard_errors.borrow_mut())
    }

    /// Builds a runtime error to return from a native function.
    pub fn error(&self, message: impl Into<String>) -> Error {
        Error::runtime(message)
    }

    /// Fails unless at least `max(n, A::COUNT)` arguments were passed and
    /// each of the first `A::COUNT` converts to its type in `A`. Use `()` to
    /// check the count alone.
    pub fn require_args<A: ArgTypes>(&self, n: usize) -> Result<()> {
        let expected = n.max(A::COUNT);
        if self.nargs < expected {
            return Err(Error::runtime(format!(
                "Insufficient number of arguments ({expected} expected, {} passed).",
                self.nargs
            )));
        }
        match A::mismatch(self) {
            Some(i) => Err(Error::runtime(format!("Argument {i} type is incompatible."))),
            None => Ok(()),
        }
    }

    /// True when at least `required` arguments were passed and every passed
    /// argument covered by `A` converts to its type.
    pub fn check_args<A: ArgTypes>(&self, required: usize) -> bool {
        self.nargs >= required && A::check(self, required)
    }

    /// Removes the slot at `pos`, shifting everything above it down.
    pub fn remove(&self, pos: usize) -> Result<()> {
        if pos == 0 || pos > self.depth() {
            return Err(Error::composition(format!("invalid stack position {pos}")));
        }
        if pos <= self.nargs {
            return Err(Error::composition("attempt to remove an argument slot"));
        }
        self.vm.remove(self.abs(pos));
        Ok(())
    }
}

impl<'c> Context<'c> {
    pub fn arg(&'c self, i: usize) -> Valref<'c> {
        Valref::new(self, i)
    }

    /// Non-owning view of the arguments.
    pub fn args(&'c self) -> Valset<'c> {
        Valset::view(self, 1, self.nargs)
    }

    /// `_G[key]`, assignable.
    pub fn global(&'c self, key: impl Into<Operand<'c>>) -> Lazy<'c> {
        Lazy::new(
            self,
            Op::Index {
                target: Target::Globals,
                key: Box::new(key.into()),
                raw: false,
            },
        )
    }

    pub fn registry(&'c self) -> Registry<'c> {
        Registry { ctx: self }
    }

    /// Upvalue `i` of the running function, assignable.
    pub fn upvalue(&'c self, i: usize) -> Lazy<'c> {
        Lazy::new(self, Op::Upvalue { func: None, index: i })
    }

    pub fn function(&'c self, f: Function) -> Lazy<'c> {
        self.closure(f, ())
    }

    pub fn closure(&'c self, f: Function, upvalues: impl IntoOperands<'c>) -> Lazy<'c> {
        Lazy::new(
            self,
            Op::Closure {
                func: f,
                upvalues: upvalues.into_operands(),
            },
        )
    }

    /// Concatenation of every operand in one machine call.
    pub fn concat(&'c self, operands: impl IntoOperands<'c>) -> Lazy<'c> {
        Lazy::concat_of(self, operands.into_operands())
    }

    /// A new table whose array part holds `items`.
    pub fn array(&'c self, items: impl IntoOperands<'c>) -> Lazy<'c> {
        Lazy::new(self, Op::TableArray(items.into_operands()))
    }

    /// A new table with the given key/value pairs, set raw and in order.
    pub fn records<K, V>(&'c self, pairs: impl IntoIterator<Item = (K, V)>) -> Lazy<'c>
    where
        K: Into<Operand<'c>>,
        V: Into<Operand<'c>>,
    {
        let pairs = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Lazy::new(self, Op::TableRecords(pairs))
    }

    /// Pushes the return values and switches the context to returning mode.
    ///
    /// Anchors still alive below the returned values are left in place when
    /// they go out of scope; the call boundary discards them.
    pub fn ret(&'c self, values: impl IntoOperands<'c>) -> Result<Retval> {
        let mut items = values.into_operands();
        let before = self.depth();
        let n = push_series(self, &mut items, true)?;
        self.checked_top.set(before);
        self.returning.set(true);
        Ok(Retval(n))
    }

    /// Returns the contents of `set` in place, dropping everything above it.
    pub fn ret_valset(&'c self, set: &Valset<'c>) -> Retval {
        let end = set.start() + set.len() - 1;
        let above = self.depth().saturating_sub(end);
        if above > 0 {
            self.vm.pop(above);
        }
        self.checked_top.set(set.start() - 1);
        self.returning.set(true);
        Retval(set.len())
    }

    /// Wraps `value` in a full userdata carrying the metatable registered for
    /// its class, if any.
    pub fn userdata<T: UserData>(&'c self, value: T) -> Result<Value<'c>> {
        let cell = UserDataCell::new(T::CLASS_NAME, Rc::new(value));
        if let Val::Table(mt) = self.vm.registry_get(&Val::from(T::CLASS_NAME)) {
            *cell.metatable.borrow_mut() = Some(mt);
        }
        Value::new(self, Val::UserData(Rc::new(cell)))
    }

    /// Class metatable slot for `T` in the registry, assignable.
    pub fn mt<T: UserData>(&'c self) -> Lazy<'c> {
        self.registry().at(T::CLASS_NAME)
    }
}

/// Access to the registry table.
pub struct Registry<'c> {
    ctx: &'c Context<'c>,
}

impl<'c> Registry<'c> {
    /// `registry[key]`, read and written raw.
    pub fn at(&self, key: impl Into<Operand<'c>>) -> Lazy<'c> {
        Lazy::new(
            self.ctx,
            Op::Index {
                target: Target::Registry,
                key: Box::new(key.into()),
                raw: true,
            },
        )
    }

    /// Stores `value` under a fresh key.
    pub fn store(&self, value: impl Into<Operand<'c>>) -> Result<RegistryKey> {
        let mut items = vec![value.into()];
        push_series(self.ctx, &mut items, false)?;
        Ok(RegistryKey(self.ctx.vm.registry_ref()?))
    }
}

/// A tuple of argument types checked by [`Context::check_args`] and
/// [`Context::require_args`].
pub trait ArgTypes {
    const COUNT: usize;

    fn check(ctx: &Context<'_>, required: usize) -> bool;

    /// Position of the first passed argument that does not convert.
    fn mismatch(ctx: &Context<'_>) -> Option<usize>;
}

macro_rules! impl_arg_types {
    ($n:expr; $($t:ident => $i:expr),*) => {
        impl<$($t: FromSlot),*> ArgTypes for ($($t,)*) {
            const COUNT: usize = $n;

            #[allow(unused_variables)]
            fn check(ctx: &Context<'_>, required: usize) -> bool {
                $(
                    if $i > required && $i > ctx.arg_count() {
                        return true;
                    }
                    if !ctx.value_at($i).is_some_and(|v| $t::is_kind(&v)) {
                        return false;
                    }
                )*
                true
            }

            #[allow(unused_variables)]
            fn mismatch(ctx: &Context<'_>) -> Option<usize> {
                $(
                    if !ctx.value_at($i).is_some_and(|v| $t::is_kind(&v)) {
                        return Some($i);
                    }
                )*
                None
            }
        }
    };
}

impl_arg_types!(0;);
impl_arg_types!(1; A => 1);
impl_arg_types!(2; A => 1, B => 2);
impl_arg_types!(3; A => 1, B => 2, C => 3);
impl_arg_types!(4; A => 1, B => 2, C => 3, D => 4);
impl_arg_types!(5; A => 1, B => 2, C => 3, D => 4, E => 5);
