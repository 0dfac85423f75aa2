/*!
Inverse indices for the 2-ary functions.

Forward lookup goes through the tile tables; these indices answer the reverse questions: which argument pairs produce a value, and which co-arguments pair with a fixed argument to produce it.

Each index is a family of small hash sets behind [Mutex]es, so the concurrent insert path (which holds the owning table's lock shared) stays correct; iteration takes a snapshot rather than holding a lock across caller code.
*/

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::db::Ob;

/// Index from a value to the argument pairs producing it.
pub(super) struct ValToPairs {
    rows: Box<[Mutex<HashSet<(Ob, Ob)>>]>,
}

impl ValToPairs {
    /// An empty index over values `0..=item_dim`.
    pub fn new(item_dim: usize) -> ValToPairs {
        let mut rows = Vec::with_capacity(1 + item_dim);
        rows.resize_with(1 + item_dim, || Mutex::new(HashSet::new()));
        ValToPairs {
            rows: rows.into_boxed_slice(),
        }
    }

    pub fn insert(&self, lhs: Ob, rhs: Ob, val: Ob) {
        self.rows[val as usize].lock().unwrap().insert((lhs, rhs));
    }

    pub fn remove(&self, lhs: Ob, rhs: Ob, val: Ob) {
        let removed = self.rows[val as usize].lock().unwrap().remove(&(lhs, rhs));
        debug_assert!(removed, "missing inverse entry {val} <- ({lhs}, {rhs})");
    }

    /// Drops every pair producing `val`.
    pub fn remove_all(&self, val: Ob) {
        self.rows[val as usize].lock().unwrap().clear();
    }

    pub fn contains(&self, lhs: Ob, rhs: Ob, val: Ob) -> bool {
        self.rows[val as usize].lock().unwrap().contains(&(lhs, rhs))
    }

    /// A snapshot of the pairs producing `val`.
    pub fn pairs(&self, val: Ob) -> Vec<(Ob, Ob)> {
        self.rows[val as usize]
            .lock()
            .unwrap()
            .iter()
            .copied()
            .collect()
    }

    pub fn clear(&self) {
        for row in self.rows.iter() {
            row.lock().unwrap().clear();
        }
    }

    /// Applies `check` to every entry.
    pub fn for_each(&self, mut check: impl FnMut(Ob, Ob, Ob)) {
        for (val, row) in self.rows.iter().enumerate() {
            for &(lhs, rhs) in row.lock().unwrap().iter() {
                check(lhs, rhs, val as Ob);
            }
        }
    }
}

/// Index from a value and one fixed argument to the co-arguments.
pub(super) struct ValFixedToOther {
    map: Mutex<HashMap<(Ob, Ob), HashSet<Ob>>>,
}

impl ValFixedToOther {
    pub fn new() -> ValFixedToOther {
        ValFixedToOther {
            map: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, val: Ob, fixed: Ob, other: Ob) {
        self.map
            .lock()
            .unwrap()
            .entry((val, fixed))
            .or_default()
            .insert(other);
    }

    pub fn remove(&self, val: Ob, fixed: Ob, other: Ob) {
        let mut map = self.map.lock().unwrap();
        if let Some(others) = map.get_mut(&(val, fixed)) {
            let removed = others.remove(&other);
            debug_assert!(removed, "missing inverse entry {val}, {fixed} -> {other}");
            if others.is_empty() {
                map.remove(&(val, fixed));
            }
        } else {
            debug_assert!(false, "missing inverse row {val}, {fixed}");
        }
    }

    pub fn contains(&self, val: Ob, fixed: Ob, other: Ob) -> bool {
        self.map
            .lock()
            .unwrap()
            .get(&(val, fixed))
            .is_some_and(|others| others.contains(&other))
    }

    /// A snapshot of the co-arguments pairing with `fixed` to produce `val`.
    pub fn others(&self, val: Ob, fixed: Ob) -> Vec<Ob> {
        self.map
            .lock()
            .unwrap()
            .get(&(val, fixed))
            .map(|others| others.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        self.map.lock().unwrap().clear();
    }

    /// Applies `check` to every entry.
    pub fn for_each(&self, mut check: impl FnMut(Ob, Ob, Ob)) {
        for (&(val, fixed), others) in self.map.lock().unwrap().iter() {
            for &other in others.iter() {
                check(val, fixed, other);
            }
        }
    }
}
