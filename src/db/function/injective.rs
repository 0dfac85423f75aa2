/*!
An injective function: a 1-ary partial function with a direct inverse array.

The forward and inverse arrays are each guarded by a defined bit-set; the arrays are the source of truth and the bit-sets lag.
The invariant maintained across merges is `inverse[values[k]] ≡ k` under carrier equivalence.
*/

use std::sync::atomic::Ordering;
use std::sync::{Arc, RwLock};

use crate::db::carrier::Carrier;
use crate::db::dense_set::{DenseSet, Iter};
use crate::db::{AtomicOb, Ob};
use crate::misc::log::targets;

use super::InjectiveInsertCallback;

/// A 1-ary partial function with inverse lookup.
pub struct InjectiveFunction {
    carrier: Arc<Carrier>,
    defined: DenseSet,
    inverse_defined: DenseSet,
    values: Box<[AtomicOb]>,
    inverse: Box<[AtomicOb]>,
    insert_callback: Option<InjectiveInsertCallback>,
    mutex: RwLock<()>,
}

fn alloc_cells(count: usize) -> Box<[AtomicOb]> {
    let mut cells = Vec::with_capacity(count);
    cells.resize_with(count, || AtomicOb::new(0));
    cells.into_boxed_slice()
}

impl InjectiveFunction {
    pub fn new(carrier: Arc<Carrier>) -> InjectiveFunction {
        let item_dim = carrier.item_dim();
        InjectiveFunction {
            defined: DenseSet::new(item_dim),
            inverse_defined: DenseSet::new(item_dim),
            values: alloc_cells(1 + item_dim),
            inverse: alloc_cells(1 + item_dim),
            insert_callback: None,
            mutex: RwLock::new(()),
            carrier,
        }
    }

    /// Installs the callback fired with each freshly defined key.
    pub fn set_insert_callback(&mut self, callback: InjectiveInsertCallback) {
        self.insert_callback = Some(callback);
    }

    pub fn carrier(&self) -> &Carrier {
        &self.carrier
    }

    fn item_dim(&self) -> usize {
        self.carrier.item_dim()
    }

    /// The keys at which the function is defined.
    pub fn defined_set(&self) -> &DenseSet {
        &self.defined
    }

    /// The values at which the inverse is defined.
    pub fn inverse_defined_set(&self) -> &DenseSet {
        &self.inverse_defined
    }

    pub fn defined(&self, key: Ob) -> bool {
        self.defined.contains(key)
    }

    pub fn inverse_defined(&self, val: Ob) -> bool {
        self.inverse_defined.contains(val)
    }

    pub fn count_items(&self) -> usize {
        self.defined.count_items()
    }

    pub fn iter(&self) -> Iter<'_> {
        self.defined.iter()
    }

    pub fn inverse_iter(&self) -> Iter<'_> {
        self.inverse_defined.iter()
    }

    /// The value at `key`, or 0 where undefined.
    pub fn find(&self, key: Ob) -> Ob {
        debug_assert!(0 < key && key as usize <= self.item_dim());
        self.values[key as usize].load(Ordering::Acquire)
    }

    /// The key producing `val`, or 0 where the inverse is undefined.
    pub fn inverse_find(&self, val: Ob) -> Ob {
        debug_assert!(0 < val && val as usize <= self.item_dim());
        self.inverse[val as usize].load(Ordering::Acquire)
    }

    /// The value at `key` without ordering; the bulk-load path.
    pub fn raw_find(&self, key: Ob) -> Ob {
        self.values[key as usize].load(Ordering::Relaxed)
    }

    /// Defines `key -> val`, or merges `val` with the current value.
    pub fn insert(&self, key: Ob, val: Ob) {
        let _shared = self.mutex.read().unwrap();
        debug_assert!(val != 0, "tried to define a zero value at {key}");

        if self.carrier.set_or_merge(&self.values[key as usize], val) {
            self.defined.try_insert(key);
            if let Some(callback) = &self.insert_callback {
                callback(key);
            }
        }
        if self.carrier.set_or_merge(&self.inverse[val as usize], key) {
            self.inverse_defined.try_insert(val);
        }
    }

    /// Unconditional definition of `key -> val`; a bulk loader.
    pub fn raw_insert(&self, key: Ob, val: Ob) {
        debug_assert!(val != 0, "tried to define a zero value at {key}");
        self.values[key as usize].store(val, Ordering::Relaxed);
        self.defined.try_insert(key);
        self.inverse[val as usize].store(key, Ordering::Relaxed);
        self.inverse_defined.try_insert(val);
    }

    /// Rewrites a merged-away `dep` to its representative, as key and as value.
    pub fn unsafe_merge(&self, dep: Ob) {
        let _unique = self.mutex.write().unwrap();
        let mut rep = self.carrier.find(dep);
        debug_assert!(rep < dep, "self merge: {dep}");

        // dep as key
        if self.defined.try_remove(dep) {
            self.defined.try_insert(rep);
            let val = self.values[dep as usize].load(Ordering::Relaxed);
            debug_assert!(val != 0, "defined key {dep} had no value");
            // XXX is this safe?
            self.carrier.set_and_merge(&self.values[rep as usize], val);
            self.values[dep as usize].store(0, Ordering::Relaxed);
        }
        // dep as value
        for key in self.defined.iter() {
            let _ = self.values[key as usize].compare_exchange(
                dep,
                rep,
                Ordering::Relaxed,
                Ordering::Relaxed,
            );
        }

        rep = self.carrier.find(rep);
        // dep as inverse key
        if self.inverse_defined.try_remove(dep) {
            self.inverse_defined.try_insert(rep);
            let key = self.inverse[dep as usize].load(Ordering::Relaxed);
            debug_assert!(key != 0, "defined inverse {dep} had no key");
            // XXX is this safe?
            self.carrier.set_and_merge(&self.inverse[rep as usize], key);
            self.inverse[dep as usize].store(0, Ordering::Relaxed);
        }
        // dep as inverse value
        for val in self.inverse_defined.iter() {
            let _ = self.inverse[val as usize].compare_exchange(
                dep,
                rep,
                Ordering::Relaxed,
                Ordering::Relaxed,
            );
        }
    }

    pub fn clear(&mut self) {
        for cell in self.values.iter().chain(self.inverse.iter()) {
            cell.store(0, Ordering::Relaxed);
        }
        self.defined.zero();
        self.inverse_defined.zero();
    }

    /// Checks value/bit-set/inverse consistency; slow.
    pub fn validate(&self) {
        let _shared = self.mutex.read().unwrap();
        self.defined.validate();
        self.inverse_defined.validate();

        for key in 1..=self.item_dim() as Ob {
            let bit = self.defined.contains(key);
            let val = self.values[key as usize].load(Ordering::Relaxed);

            if !self.carrier.contains(key) {
                assert!(val == 0, "dead key {key} has a value");
                assert!(!bit, "dead key {key} is marked defined");
            } else if val == 0 {
                assert!(!bit, "unbound key {key} is marked defined");
            } else {
                assert!(bit, "bound key {key} is not marked defined");
                let back = self.inverse[self.carrier.find(val) as usize].load(Ordering::Relaxed);
                assert!(
                    back != 0 && self.carrier.equal(back, key),
                    "value, inverse mismatch: {key} -> {val} <- {back}"
                );
            }
        }

        for val in 1..=self.item_dim() as Ob {
            let bit = self.inverse_defined.contains(val);
            let key = self.inverse[val as usize].load(Ordering::Relaxed);

            if !self.carrier.contains(val) {
                assert!(key == 0, "dead value {val} has a key");
                assert!(!bit, "dead value {val} is marked defined");
            } else if key == 0 {
                assert!(!bit, "unbound value {val} is marked defined");
            } else {
                assert!(bit, "bound value {val} is not marked defined");
                let forward = self.values[self.carrier.find(key) as usize].load(Ordering::Relaxed);
                assert!(
                    forward != 0 && self.carrier.equal(forward, val),
                    "inverse, value mismatch: {val} <- {key} -> {forward}"
                );
            }
        }
    }

    pub fn log_stats(&self, prefix: &str) {
        log::info!(
            target: targets::FUNCTION,
            "{prefix} count = {}, inverse_count = {}",
            self.count_items(),
            self.inverse_defined.count_items()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carrier_of(count: usize) -> Arc<Carrier> {
        let carrier = Arc::new(Carrier::new(8, None));
        for _ in 0..count {
            carrier.insert();
        }
        carrier
    }

    #[test]
    fn insert_defines_both_directions() {
        let fun = InjectiveFunction::new(carrier_of(8));
        fun.insert(1, 5);

        assert_eq!(fun.find(1), 5);
        assert_eq!(fun.inverse_find(5), 1);
        assert!(fun.defined(1));
        assert!(fun.inverse_defined(5));
        assert_eq!(fun.find(2), 0);
        fun.validate();
    }

    #[test]
    fn merge_of_value_rewrites_inverse() {
        let carrier = carrier_of(8);
        let fun = InjectiveFunction::new(Arc::clone(&carrier));
        fun.insert(1, 5);

        carrier.merge(5, 2);
        fun.unsafe_merge(5);

        assert_eq!(fun.find(1), 2);
        assert_eq!(fun.inverse_find(2), 1);
        fun.validate();
    }

    #[test]
    fn merge_of_key_keeps_value() {
        let carrier = carrier_of(8);
        let fun = InjectiveFunction::new(Arc::clone(&carrier));
        fun.insert(7, 4);

        carrier.merge(7, 3);
        fun.unsafe_merge(7);

        assert_eq!(fun.find(3), 4);
        assert!(carrier.equal(fun.inverse_find(4), 3));
        fun.validate();
    }

    #[test]
    fn colliding_key_merge_schedules_follow_up() {
        let carrier = carrier_of(8);
        let fun = InjectiveFunction::new(Arc::clone(&carrier));
        fun.insert(7, 4);
        fun.insert(3, 6);

        carrier.merge(7, 3);
        fun.unsafe_merge(7);

        // both keys were bound; their values merged in the carrier, and the
        // survivor was written back
        assert!(carrier.equal(4, 6));
        assert_eq!(fun.find(3), 4);

        // process the follow-up merge of the colliding value
        fun.unsafe_merge(6);

        assert_eq!(fun.find(3), 4);
        assert!(carrier.equal(fun.inverse_find(4), 3));
        fun.validate();
    }

    #[test]
    fn colliding_keys_merge_values() {
        let carrier = carrier_of(8);
        let fun = InjectiveFunction::new(Arc::clone(&carrier));
        fun.insert(1, 5);
        fun.insert(1, 6);

        assert!(carrier.equal(5, 6));
    }
}
