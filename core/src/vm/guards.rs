use std::rc::Rc;

use crate::val::Closure;

use super::Machine;

/// One native call in progress.
pub(crate) struct Frame {
    pub(crate) base: usize,
    pub(crate) closure: Rc<Closure>,
}

/// Keeps a call frame on the machine for the guard's lifetime, so the frame
/// is popped even if the native body unwinds.
pub(crate) struct FrameGuard<'m> {
    vm: &'m Machine,
}

impl<'m> FrameGuard<'m> {
    pub(super) fn enter(vm: &'m Machine, base: usize, closure: Rc<Closure>) -> Self {
        vm.frames.borrow_mut().push(Frame { base, closure });
        Self { vm }
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.vm.frames.borrow_mut().pop();
    }
}
