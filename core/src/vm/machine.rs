use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::config::StateConfig;
use crate::error::{Error, Result};
use crate::op::{ArithOp, CompareOp, err_arith, err_compare};
use crate::val::{Closure, RawFn, TableData, TableRef, Val, to_concat_str};

use super::guards::{Frame, FrameGuard};
use super::stats::{Primitive, PrimitiveStats};

/// Longest `__index` / `__newindex` / `__call` chain followed.
const MAX_META_CHAIN: usize = 100;

/// The shared value stack and the primitive operations on it.
///
/// Positions are absolute and 0-based. Every fallible primitive follows one
/// rule: on failure it has consumed the operands it would have consumed on
/// success, and pushed nothing.
pub struct Machine {
    stack: RefCell<Vec<Val>>,
    pub(super) frames: RefCell<Vec<Frame>>,
    globals: TableRef,
    registry: TableRef,
    next_ref: Cell<i64>,
    stats: PrimitiveStats,
    config: StateConfig,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(StateConfig::default())
    }
}

impl Machine {
    pub fn new(config: StateConfig) -> Self {
        Self {
            stack: RefCell::new(Vec::with_capacity(64)),
            frames: RefCell::new(Vec::new()),
            globals: TableData::new_ref(0, 16),
            registry: TableData::new_ref(0, 8),
            next_ref: Cell::new(1),
            stats: PrimitiveStats::default(),
            config,
        }
    }

    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    pub fn stats(&self) -> &PrimitiveStats {
        &self.stats
    }

    pub fn globals(&self) -> TableRef {
        self.globals.clone()
    }

    #[inline]
    pub fn top(&self) -> usize {
        self.stack.borrow().len()
    }

    /// Base of the innermost native call, or 0 outside any call.
    pub fn frame_base(&self) -> usize {
        self.frames.borrow().last().map_or(0, |f| f.base)
    }

    pub fn call_depth(&self) -> usize {
        self.frames.borrow().len()
    }

    pub(crate) fn current_closure(&self) -> Option<Rc<Closure>> {
        self.frames.borrow().last().map(|f| f.closure.clone())
    }

    // --- plain stack manipulation -------------------------------------------

    #[inline]
    pub fn push(&self, v: Val) {
        self.stack.borrow_mut().push(v);
    }

    pub fn pop(&self, n: usize) {
        let mut stack = self.stack.borrow_mut();
        let len = stack.len().saturating_sub(n);
        stack.truncate(len);
    }

    pub(crate) fn truncate(&self, len: usize) {
        self.stack.borrow_mut().truncate(len);
    }

    pub fn value(&self, pos: usize) -> Option<Val> {
        self.stack.borrow().get(pos).cloned()
    }

    /// Reads a slot without cloning it.
    pub fn with_value<R>(&self, pos: usize, f: impl FnOnce(Option<&Val>) -> R) -> R {
        f(self.stack.borrow().get(pos))
    }

    fn pop_value(&self) -> Val {
        self.stack.borrow_mut().pop().unwrap_or_default()
    }

    fn take_top(&self, n: usize) -> Vec<Val> {
        let mut stack = self.stack.borrow_mut();
        let at = stack.len().saturating_sub(n);
        stack.split_off(at)
    }

    /// Pushes a copy of `pos` (nil when `pos` is past the top).
    pub fn duplicate(&self, pos: usize) {
        let v = self.value(pos).unwrap_or_default();
        self.push(v);
    }

    /// Pops the top value into `pos`.
    pub fn replace(&self, pos: usize) {
        let v = self.pop_value();
        if let Some(slot) = self.stack.borrow_mut().get_mut(pos) {
            *slot = v;
        }
    }

    pub fn remove(&self, pos: usize) {
        let mut stack = self.stack.borrow_mut();
        if pos < stack.len() {
            stack.remove(pos);
        }
    }

    // --- indexing -----------------------------------------------------------

    /// `[k] -> [t[k]]` for the table at `t`, honouring `__index`.
    pub fn index_at(&self, t: usize) -> Result<()> {
        self.stats.bump(Primitive::Index);
        let key = self.pop_value();
        let target = self.value(t).unwrap_or_default();
        trace!(target: "stackbind::vm", pos = t, "index");
        let v = self.index_value(target, key)?;
        self.push(v);
        Ok(())
    }

    /// `[k, v] -> []`, honouring `__newindex`.
    pub fn new_index_at(&self, t: usize) -> Result<()> {
        self.stats.bump(Primitive::NewIndex);
        let value = self.pop_value();
        let key = self.pop_value();
        let target = self.value(t).unwrap_or_default();
        trace!(target: "stackbind::vm", pos = t, "new_index");
        self.new_index_value(target, key, value)
    }

    pub fn raw_get_at(&self, t: usize) -> Result<()> {
        self.stats.bump(Primitive::RawGet);
        trace!(target: "stackbind::vm", pos = t, "raw_get");
        let key = self.pop_value();
        let table = self.table_at(t)?;
        let v = table.borrow().get(&key);
        self.push(v);
        Ok(())
    }

    pub fn raw_set_at(&self, t: usize) -> Result<()> {
        self.stats.bump(Primitive::RawSet);
        trace!(target: "stackbind::vm", pos = t, "raw_set");
        let value = self.pop_value();
        let key = self.pop_value();
        let table = self.table_at(t)?;
        table.borrow_mut().set(key, value)
    }

    /// `[t, v1 .. vn] -> [t]` with `t[i] = vi`, raw.
    pub fn set_list(&self, n: usize) -> Result<()> {
        self.stats.bump(Primitive::RawSet);
        trace!(target: "stackbind::vm", n, "set_list");
        let values = self.take_top(n);
        let t = self.top().checked_sub(1).ok_or_else(|| Error::runtime("table expected, got no value"))?;
        let table = match self.table_at(t) {
            Ok(table) => table,
            Err(e) => {
                self.pop(1);
                return Err(e);
            }
        };
        let mut data = table.borrow_mut();
        for (i, v) in values.into_iter().enumerate() {
            data.set(Val::Int(i as i64 + 1), v)?;
        }
        Ok(())
    }

    fn table_at(&self, t: usize) -> Result<TableRef> {
        match self.value(t) {
            Some(Val::Table(table)) => Ok(table),
            Some(other) => Err(Error::runtime(format!("table expected, got {}", other.type_of()))),
            None => Err(Error::runtime("table expected, got no value")),
        }
    }

    fn index_value(&self, mut obj: Val, key: Val) -> Result<Val> {
        for _ in 0..MAX_META_CHAIN {
            let handler = match &obj {
                Val::Table(t) => {
                    let v = t.borrow().get(&key);
                    if !v.is_nil() {
                        return Ok(v);
                    }
                    match obj.metamethod("__index") {
                        Some(h) => h,
                        None => return Ok(Val::Nil),
                    }
                }
                other => match other.metamethod("__index") {
                    Some(h) => h,
                    None => return Err(Error::runtime(format!("attempt to index a {} value", other.type_of()))),
                },
            };
            if let Val::Function(_) = handler {
                return self.call_meta(handler, vec![obj, key]);
            }
            obj = handler;
        }
        Err(Error::runtime("'__index' chain too long; possible loop"))
    }

    fn new_index_value(&self, mut obj: Val, key: Val, value: Val) -> Result<()> {
        for _ in 0..MAX_META_CHAIN {
            let handler = match &obj {
                Val::Table(t) => {
                    let present = !t.borrow().get(&key).is_nil();
                    match obj.metamethod("__newindex") {
                        Some(h) if !present => h,
                        _ => return t.borrow_mut().set(key, value),
                    }
                }
                other => match other.metamethod("__newindex") {
                    Some(h) => h,
                    None => return Err(Error::runtime(format!("attempt to index a {} value", other.type_of()))),
                },
            };
            if let Val::Function(_) = handler {
                self.call_meta_n(handler, vec![obj, key, value], 0)?;
                return Ok(());
            }
            obj = handler;
        }
        Err(Error::runtime("'__newindex' chain too long; possible loop"))
    }

    // --- calls --------------------------------------------------------------

    /// `[f, a1 .. an] -> [r1 .. rk]`. `nresults == None` keeps every result,
    /// otherwise the results are truncated or padded with nil.
    pub fn call(&self, nargs: usize, nresults: Option<usize>) -> Result<usize> {
        self.stats.bump(Primitive::Call);
        trace!(target: "stackbind::vm", nargs, ?nresults, "call");
        self.invoke(nargs, nresults)
    }

    /// Like [`call`](Self::call) but never fails: on error the message is
    /// pushed as the only result (then adjusted to `nresults`).
    pub fn pcall(&self, nargs: usize, nresults: Option<usize>) -> (bool, usize) {
        self.stats.bump(Primitive::PCall);
        trace!(target: "stackbind::vm", nargs, ?nresults, "pcall");
        let base = self.top().saturating_sub(nargs + 1);
        match self.invoke(nargs, nresults) {
            Ok(n) => (true, n),
            Err(e) => {
                debug!(target: "stackbind::vm", error = %e, "pcall caught error");
                self.truncate(base);
                self.push(Val::from(e.to_string()));
                (false, self.adjust(base, 1, nresults))
            }
        }
    }

    fn invoke(&self, nargs: usize, nresults: Option<usize>) -> Result<usize> {
        let top = self.top();
        if top < nargs + 1 {
            return Err(Error::runtime("not enough values on the stack for call"));
        }
        let func_pos = top - nargs - 1;
        let mut chain = 0;
        let closure = loop {
            let callee = self.stack.borrow()[func_pos].clone();
            match callee {
                Val::Function(c) => break c,
                other => match other.metamethod("__call") {
                    Some(handler) if chain < MAX_META_CHAIN => {
                        self.stack.borrow_mut().insert(func_pos, handler);
                        chain += 1;
                    }
                    _ => {
                        self.truncate(func_pos);
                        return Err(Error::runtime(format!("attempt to call a {} value", other.type_of())));
                    }
                },
            }
        };
        if self.call_depth() >= self.config.max_call_depth {
            self.truncate(func_pos);
            return Err(Error::runtime("stack overflow"));
        }
        self.stack.borrow_mut().remove(func_pos);
        let outcome = {
            let _frame = FrameGuard::enter(self, func_pos, closure.clone());
            (closure.func)(self)
        };
        let produced = match outcome {
            Ok(n) => n,
            Err(e) => {
                self.truncate(func_pos);
                return Err(e);
            }
        };
        let top = self.top();
        if top < func_pos {
            self.stack.borrow_mut().resize(func_pos, Val::Nil);
        }
        let produced = produced.min(self.top() - func_pos);
        let top = self.top();
        self.stack.borrow_mut().drain(func_pos..top - produced);
        Ok(self.adjust(func_pos, produced, nresults))
    }

    fn adjust(&self, base: usize, produced: usize, nresults: Option<usize>) -> usize {
        match nresults {
            None => produced,
            Some(n) => {
                self.stack.borrow_mut().resize(base + n, Val::Nil);
                n
            }
        }
    }

    fn call_meta(&self, handler: Val, args: Vec<Val>) -> Result<Val> {
        self.call_meta_n(handler, args, 1)?;
        Ok(self.pop_value())
    }

    fn call_meta_n(&self, handler: Val, args: Vec<Val>, nresults: usize) -> Result<()> {
        let nargs = args.len();
        self.push(handler);
        self.stack.borrow_mut().extend(args);
        self.invoke(nargs, Some(nresults))?;
        Ok(())
    }

    // --- operators ----------------------------------------------------------

    /// `[v1 .. vn] -> [v1 .. vn]`, folded left to right, so it behaves exactly
    /// like `n - 1` binary concatenations.
    pub fn concat(&self, n: usize) -> Result<()> {
        self.stats.bump(Primitive::Concat);
        self.stats.add_concat_operands(n);
        trace!(target: "stackbind::vm", n, "concat");
        let mut values = self.take_top(n).into_iter();
        let mut acc = match values.next() {
            Some(first) => first,
            None => {
                self.push(Val::from(""));
                return Ok(());
            }
        };
        for rhs in values {
            acc = self.concat_pair(acc, rhs)?;
        }
        self.push(acc);
        Ok(())
    }

    fn concat_pair(&self, l: Val, r: Val) -> Result<Val> {
        if let (Some(a), Some(b)) = (to_concat_str(&l), to_concat_str(&r)) {
            let mut s = String::with_capacity(a.len() + b.len());
            s.push_str(&a);
            s.push_str(&b);
            return Ok(Val::from(s));
        }
        match l.metamethod("__concat").or_else(|| r.metamethod("__concat")) {
            Some(handler) => self.call_meta(handler, vec![l, r]),
            None => {
                let culprit = if to_concat_str(&l).is_none() { &l } else { &r };
                Err(Error::runtime(format!("attempt to concatenate a {} value", culprit.type_of())))
            }
        }
    }

    /// Binary ops take `[a, b]`, unary ops `[a]`; both leave one result.
    pub fn arith(&self, op: ArithOp) -> Result<()> {
        self.stats.bump(Primitive::Arith);
        trace!(target: "stackbind::vm", %op, "arith");
        let (l, r) = if op.is_unary() {
            let v = self.pop_value();
            (v.clone(), v)
        } else {
            let r = self.pop_value();
            (self.pop_value(), r)
        };
        if let Some(v) = op.eval_raw(&l, &r)? {
            self.push(v);
            return Ok(());
        }
        let v = match l.metamethod(op.event()).or_else(|| r.metamethod(op.event())) {
            Some(handler) => self.call_meta(handler, vec![l, r])?,
            None => return Err(err_arith(op, &l, &r)),
        };
        self.push(v);
        Ok(())
    }

    /// `[a, b] -> []`.
    pub fn compare(&self, op: CompareOp) -> Result<bool> {
        self.stats.bump(Primitive::Compare);
        trace!(target: "stackbind::vm", %op, "compare");
        let r = self.pop_value();
        let l = self.pop_value();
        if op == CompareOp::Eq {
            if l.raw_eq(&r) {
                return Ok(true);
            }
            if l.type_of() != r.type_of() || !l.type_of().has_metatable_slot() {
                return Ok(false);
            }
        } else if let Some(b) = op.order_raw(&l, &r) {
            return Ok(b);
        }
        match l.metamethod(op.event()).or_else(|| r.metamethod(op.event())) {
            Some(handler) => Ok(self.call_meta(handler, vec![l, r])?.truthy()),
            None if op == CompareOp::Eq => Ok(false),
            None => Err(err_compare(&l, &r)),
        }
    }

    pub fn raw_equal(&self, a: usize, b: usize) -> bool {
        match (self.value(a), self.value(b)) {
            (Some(x), Some(y)) => x.raw_eq(&y),
            _ => false,
        }
    }

    /// `[v] -> [#v]`, honouring `__len`.
    pub fn len(&self) -> Result<()> {
        self.stats.bump(Primitive::Len);
        trace!(target: "stackbind::vm", "len");
        let v = self.pop_value();
        let n = match &v {
            Val::Str(s) => Val::Int(s.len() as i64),
            _ => match v.metamethod("__len") {
                Some(handler) => self.call_meta(handler, vec![v])?,
                None => match &v {
                    Val::Table(t) => Val::Int(t.borrow().len() as i64),
                    other => return Err(Error::runtime(format!("attempt to get length of a {} value", other.type_of()))),
                },
            },
        };
        self.push(n);
        Ok(())
    }

    pub fn raw_len(&self, pos: usize) -> usize {
        self.with_value(pos, |v| match v {
            Some(Val::Str(s)) => s.len(),
            Some(Val::Table(t)) => t.borrow().len(),
            _ => 0,
        })
    }

    // --- metatables and upvalues ---------------------------------------------

    /// `[v] -> [mt]`, nil when there is none.
    pub fn get_metatable(&self) {
        self.stats.bump(Primitive::GetMetatable);
        trace!(target: "stackbind::vm", "get_metatable");
        let v = self.pop_value();
        self.push(v.metatable().map_or(Val::Nil, Val::Table));
    }

    /// `[v, mt] -> []`.
    pub fn set_metatable(&self) -> Result<()> {
        self.stats.bump(Primitive::SetMetatable);
        trace!(target: "stackbind::vm", "set_metatable");
        let mt = match self.pop_value() {
            Val::Nil => None,
            Val::Table(t) => Some(t),
            other => {
                self.pop(1);
                return Err(Error::runtime(format!("metatable must be a table or nil, got {}", other.type_of())));
            }
        };
        match self.pop_value() {
            Val::Table(t) => t.borrow_mut().set_metatable(mt),
            Val::UserData(u) => *u.metatable.borrow_mut() = mt,
            other => return Err(Error::runtime(format!("cannot set metatable of a {} value", other.type_of()))),
        }
        Ok(())
    }

    fn closure_for(&self, func: Option<usize>) -> Result<Rc<Closure>> {
        match func {
            None => self.current_closure().ok_or_else(|| Error::runtime("no enclosing function")),
            Some(pos) => match self.value(pos) {
                Some(Val::Function(c)) => Ok(c),
                other => Err(Error::runtime(format!(
                    "attempt to access upvalue of a {} value",
                    other.map_or(crate::val::ValueType::None, |v| v.type_of())
                ))),
            },
        }
    }

    /// Pushes upvalue `n` (1-based) of the function at `func`, or of the
    /// running function when `func` is `None`.
    pub fn get_upvalue(&self, func: Option<usize>, n: usize) -> Result<()> {
        self.stats.bump(Primitive::GetUpvalue);
        trace!(target: "stackbind::vm", ?func, n, "get_upvalue");
        let closure = self.closure_for(func)?;
        let v = closure.upvalues.borrow().get(n.wrapping_sub(1)).cloned();
        match v {
            Some(v) => {
                self.push(v);
                Ok(())
            }
            None => Err(Error::runtime(format!("upvalue index {n} out of range"))),
        }
    }

    /// Pops the top value into upvalue `n`.
    pub fn set_upvalue(&self, func: Option<usize>, n: usize) -> Result<()> {
        self.stats.bump(Primitive::SetUpvalue);
        trace!(target: "stackbind::vm", ?func, n, "set_upvalue");
        let value = self.pop_value();
        let closure = self.closure_for(func)?;
        let mut upvalues = closure.upvalues.borrow_mut();
        match upvalues.get_mut(n.wrapping_sub(1)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::runtime(format!("upvalue index {n} out of range"))),
        }
    }

    // --- constructors and well-known tables -----------------------------------

    pub fn create_table(&self, narr: usize, nrec: usize) {
        self.stats.bump(Primitive::CreateTable);
        trace!(target: "stackbind::vm", narr, nrec, "create_table");
        self.push(Val::Table(TableData::new_ref(narr, nrec)));
    }

    /// `[u1 .. un] -> [closure]`.
    pub fn push_closure(&self, func: RawFn, nupvalues: usize) {
        self.stats.bump(Primitive::Closure);
        trace!(target: "stackbind::vm", nupvalues, "push_closure");
        let upvalues = self.take_top(nupvalues);
        self.push(Val::Function(Rc::new(Closure::new(func, upvalues))));
    }

    pub fn push_globals(&self) {
        trace!(target: "stackbind::vm", "push_globals");
        self.push(Val::Table(self.globals.clone()));
    }

    pub fn push_registry(&self) {
        trace!(target: "stackbind::vm", "push_registry");
        self.push(Val::Table(self.registry.clone()));
    }

    /// Pops the top value and stores it in the registry under a fresh key.
    pub fn registry_ref(&self) -> Result<i64> {
        let v = self.pop_value();
        let key = self.next_ref.get();
        trace!(target: "stackbind::vm", key, "registry_ref");
        self.next_ref.set(key + 1);
        self.registry.borrow_mut().set(Val::Int(key), v)?;
        Ok(key)
    }

    pub(crate) fn registry_get(&self, key: &Val) -> Val {
        self.registry.borrow().get(key)
    }

    /// `[k] -> [k', v']` (true) or `[]` (false) for the table at `t`.
    pub fn next(&self, t: usize) -> Result<bool> {
        trace!(target: "stackbind::vm", pos = t, "next");
        let key = self.pop_value();
        let table = self.table_at(t)?;
        let entry = table.borrow().next(&key)?;
        match entry {
            Some((k, v)) => {
                self.push(k);
                self.push(v);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
