use std::cell::Cell;

use serde::Serialize;

/// Machine primitives that are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Call,
    PCall,
    Concat,
    Arith,
    Compare,
    Index,
    NewIndex,
    RawGet,
    RawSet,
    Len,
    GetMetatable,
    SetMetatable,
    GetUpvalue,
    SetUpvalue,
    CreateTable,
    Closure,
}

const PRIMITIVES: usize = 16;

/// Invocation counters, one per primitive, plus the total operand count of
/// every `concat`.
#[derive(Debug, Default)]
pub struct PrimitiveStats {
    counts: [Cell<u64>; PRIMITIVES],
    concat_operands: Cell<u64>,
}

impl PrimitiveStats {
    #[inline]
    pub(crate) fn bump(&self, p: Primitive) {
        let cell = &self.counts[p as usize];
        cell.set(cell.get() + 1);
    }

    #[inline]
    pub(crate) fn add_concat_operands(&self, n: usize) {
        self.concat_operands.set(self.concat_operands.get() + n as u64);
    }

    pub fn count(&self, p: Primitive) -> u64 {
        self.counts[p as usize].get()
    }

    pub fn reset(&self) {
        for c in &self.counts {
            c.set(0);
        }
        self.concat_operands.set(0);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let c = |p| self.count(p);
        StatsSnapshot {
            calls: c(Primitive::Call),
            pcalls: c(Primitive::PCall),
            concats: c(Primitive::Concat),
            concat_operands: self.concat_operands.get(),
            ariths: c(Primitive::Arith),
            compares: c(Primitive::Compare),
            indexes: c(Primitive::Index),
            new_indexes: c(Primitive::NewIndex),
            raw_gets: c(Primitive::RawGet),
            raw_sets: c(Primitive::RawSet),
            lens: c(Primitive::Len),
            metatable_gets: c(Primitive::GetMetatable),
            metatable_sets: c(Primitive::SetMetatable),
            upvalue_gets: c(Primitive::GetUpvalue),
            upvalue_sets: c(Primitive::SetUpvalue),
            tables_created: c(Primitive::CreateTable),
            closures_created: c(Primitive::Closure),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub calls: u64,
    pub pcalls: u64,
    pub concats: u64,
    pub concat_operands: u64,
    pub ariths: u64,
    pub compares: u64,
    pub indexes: u64,
    pub new_indexes: u64,
    pub raw_gets: u64,
    pub raw_sets: u64,
    pub lens: u64,
    pub metatable_gets: u64,
    pub metatable_sets: u64,
    pub upvalue_gets: u64,
    pub upvalue_sets: u64,
    pub tables_created: u64,
    pub closures_created: u64,
}
