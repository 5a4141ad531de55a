pub(super) use std::rc::Rc;

pub(super) use crate::{
    config::StateConfig,
    error::Error,
    val::{RawFn, Val},
    vm::{ArithOp, CompareOp, Machine, Primitive},
};

/// Pushes a native that returns its arguments unchanged.
pub(super) fn push_echo(vm: &Machine) {
    let echo: RawFn = Rc::new(|vm: &Machine| Ok(vm.top() - vm.frame_base()));
    vm.push_closure(echo, 0);
}

/// Pushes a native that always fails with `message`.
pub(super) fn push_failing(vm: &Machine, message: &'static str) {
    let fail: RawFn = Rc::new(move |_: &Machine| Err(Error::runtime(message)));
    vm.push_closure(fail, 0);
}

mod calls;
mod primitives;
