use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::util::fast_map::{FastHashMap, fast_hash_map_with_capacity};

use super::Val;

pub type TableRef = Rc<RefCell<TableData>>;

/// Normalized hash key. Reference types hash by address; the entry keeps the
/// original value alive so the address stays valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Key {
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(Rc<str>),
    Addr(usize),
}

impl Key {
    pub(crate) fn from_val(key: &Val) -> Result<Key> {
        Ok(match key {
            Val::Nil => return Err(Error::runtime("table index is nil")),
            Val::Bool(b) => Key::Bool(*b),
            Val::Int(i) => Key::Int(*i),
            Val::Number(n) => {
                if n.is_nan() {
                    return Err(Error::runtime("table index is NaN"));
                }
                match float_key(*n) {
                    Some(i) => Key::Int(i),
                    None => Key::Float(n.to_bits()),
                }
            }
            Val::Str(s) => Key::Str(s.clone()),
            other => Key::Addr(other.address()),
        })
    }
}

fn float_key(n: f64) -> Option<i64> {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}

/// Table storage: a dense array part for keys `1..=n` plus an
/// insertion-ordered hash part.
///
/// Assigning nil to a hash key leaves a dead entry so that `next` keeps
/// working on it; dead entries are swept when a new key is inserted and they
/// make up half of the hash part.
#[derive(Default)]
pub struct TableData {
    array: Vec<Val>,
    entries: Vec<(Val, Val)>,
    index: FastHashMap<Key, usize>,
    dead: usize,
    pub(crate) metatable: Option<TableRef>,
}

impl TableData {
    pub fn new_ref(narr: usize, nrec: usize) -> TableRef {
        Rc::new(RefCell::new(TableData {
            array: Vec::with_capacity(narr),
            entries: Vec::with_capacity(nrec),
            index: fast_hash_map_with_capacity(nrec),
            dead: 0,
            metatable: None,
        }))
    }

    pub fn metatable(&self) -> Option<TableRef> {
        self.metatable.clone()
    }

    pub fn set_metatable(&mut self, mt: Option<TableRef>) {
        self.metatable = mt;
    }

    pub fn get(&self, key: &Val) -> Val {
        let key = match Key::from_val(key) {
            Ok(k) => k,
            Err(_) => return Val::Nil,
        };
        self.get_key(&key)
    }

    pub fn get_int(&self, i: i64) -> Val {
        self.get_key(&Key::Int(i))
    }

    pub fn get_str(&self, s: &str) -> Val {
        self.get_key(&Key::Str(Rc::from(s)))
    }

    fn get_key(&self, key: &Key) -> Val {
        if let Key::Int(i) = key {
            if *i >= 1 && (*i as usize) <= self.array.len() {
                return self.array[*i as usize - 1].clone();
            }
        }
        match self.index.get(key) {
            Some(&slot) => self.entries[slot].1.clone(),
            None => Val::Nil,
        }
    }

    pub fn set(&mut self, key: Val, value: Val) -> Result<()> {
        let k = Key::from_val(&key)?;
        if let Key::Int(i) = k {
            if i >= 1 {
                let pos = i as usize;
                if pos <= self.array.len() {
                    self.array[pos - 1] = value;
                    if pos == self.array.len() {
                        self.trim_array();
                    }
                    return Ok(());
                }
                if pos == self.array.len() + 1 && !value.is_nil() {
                    self.array.push(value);
                    self.drop_entry(&k);
                    self.migrate_into_array();
                    return Ok(());
                }
            }
        }
        match self.index.get(&k) {
            Some(&slot) => {
                let was_nil = self.entries[slot].1.is_nil();
                match (was_nil, value.is_nil()) {
                    (false, true) => self.dead += 1,
                    (true, false) => self.dead -= 1,
                    _ => {}
                }
                self.entries[slot].1 = value;
            }
            None if value.is_nil() => {}
            None => {
                if self.dead > 0 && self.dead * 2 >= self.entries.len() {
                    self.sweep();
                }
                let key = match key {
                    Val::Number(_) => match k {
                        Key::Int(i) => Val::Int(i),
                        _ => key,
                    },
                    _ => key,
                };
                self.index.insert(k, self.entries.len());
                self.entries.push((key, value));
            }
        }
        Ok(())
    }

    fn drop_entry(&mut self, key: &Key) {
        if let Some(&slot) = self.index.get(key) {
            if !std::mem::take(&mut self.entries[slot].1).is_nil() {
                self.dead += 1;
            }
        }
    }

    /// Removes dead entries and renumbers the index.
    fn sweep(&mut self) {
        self.entries.retain(|(_, v)| !v.is_nil());
        self.index.clear();
        for (slot, (key, _)) in self.entries.iter().enumerate() {
            if let Ok(k) = Key::from_val(key) {
                self.index.insert(k, slot);
            }
        }
        self.dead = 0;
    }

    /// Entries held by the hash part, dead ones included.
    #[cfg(test)]
    pub(crate) fn hash_slots(&self) -> usize {
        self.entries.len()
    }

    fn migrate_into_array(&mut self) {
        loop {
            let next = Key::Int(self.array.len() as i64 + 1);
            let slot = match self.index.get(&next) {
                Some(&slot) if !self.entries[slot].1.is_nil() => slot,
                _ => break,
            };
            let value = std::mem::take(&mut self.entries[slot].1);
            self.dead += 1;
            self.array.push(value);
        }
    }

    fn trim_array(&mut self) {
        while matches!(self.array.last(), Some(Val::Nil)) {
            self.array.pop();
        }
    }

    /// A border: `t[n]` is non-nil and `t[n + 1]` is nil.
    pub fn len(&self) -> usize {
        let mut n = self.array.len();
        while self.index.get(&Key::Int(n as i64 + 1)).is_some_and(|&s| !self.entries[s].1.is_nil()) {
            n += 1;
        }
        n
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty() && self.dead == self.entries.len()
    }

    /// Successor of `key` in traversal order; `nil` starts the traversal.
    pub fn next(&self, key: &Val) -> Result<Option<(Val, Val)>> {
        let mut array_from = 0usize;
        let mut entries_from = 0usize;
        if !key.is_nil() {
            let k = Key::from_val(key)?;
            match k {
                Key::Int(i) if i >= 1 && (i as usize) <= self.array.len() => array_from = i as usize,
                _ => match self.index.get(&k) {
                    Some(&slot) => {
                        array_from = self.array.len();
                        entries_from = slot + 1;
                    }
                    None => return Err(Error::runtime("invalid key to 'next'")),
                },
            }
        }
        for (i, v) in self.array.iter().enumerate().skip(array_from) {
            if !v.is_nil() {
                return Ok(Some((Val::Int(i as i64 + 1), v.clone())));
            }
        }
        for (k, v) in self.entries.iter().skip(entries_from) {
            if !v.is_nil() {
                return Ok(Some((k.clone(), v.clone())));
            }
        }
        Ok(None)
    }
}
