/*!
A binary function: a 2-ary partial function over a tile-decomposed value matrix.

Values live in cache-line tiles so neighbouring points share lines; the defined argument pairs are mirrored in a [BaseBinRel] row/column bit-matrix; and three inverse indices answer reverse queries by value, by value-and-lhs, and by value-and-rhs.
*/

use std::sync::atomic::Ordering;
use std::sync::{Arc, RwLock};

use crate::db::base_bin_rel::BaseBinRel;
use crate::db::carrier::Carrier;
use crate::db::dense_set::DenseSetRef;
use crate::db::{AtomicOb, Ob};
use crate::misc::log::targets;

use super::inverse::{ValFixedToOther, ValToPairs};
use super::{alloc_tiles, tile_dim, BinaryInsertCallback, Tile, ITEMS_PER_TILE};

/// A 2-ary partial function with inverse lookup.
pub struct BinaryFunction {
    lines: BaseBinRel,
    tile_dim: usize,
    tiles: Box<[Tile]>,
    by_val: ValToPairs,
    by_val_lhs: ValFixedToOther,
    by_val_rhs: ValFixedToOther,
    insert_callback: Option<BinaryInsertCallback>,
    mutex: RwLock<()>,
}

impl BinaryFunction {
    pub fn new(carrier: Arc<Carrier>) -> BinaryFunction {
        let item_dim = carrier.item_dim();
        let tile_dim = tile_dim(item_dim);
        BinaryFunction {
            lines: BaseBinRel::new_square(carrier),
            tile_dim,
            tiles: alloc_tiles(tile_dim * tile_dim),
            by_val: ValToPairs::new(item_dim),
            by_val_lhs: ValFixedToOther::new(),
            by_val_rhs: ValFixedToOther::new(),
            insert_callback: None,
            mutex: RwLock::new(()),
        }
    }

    /// Installs the callback fired with each freshly defined pair.
    pub fn set_insert_callback(&mut self, callback: BinaryInsertCallback) {
        self.insert_callback = Some(callback);
    }

    pub fn carrier(&self) -> &Carrier {
        self.lines.carrier()
    }

    fn item_dim(&self) -> usize {
        self.lines.item_dim()
    }

    fn slot(&self, lhs: Ob, rhs: Ob) -> &AtomicOb {
        let (i, j) = (lhs as usize, rhs as usize);
        let tile = &self.tiles[j / ITEMS_PER_TILE * self.tile_dim + i / ITEMS_PER_TILE];
        &tile.0[j % ITEMS_PER_TILE * ITEMS_PER_TILE + i % ITEMS_PER_TILE]
    }

    /// True if the function is defined at `(lhs, rhs)`.
    pub fn defined(&self, lhs: Ob, rhs: Ob) -> bool {
        self.lines.get_lx(lhs, rhs)
    }

    /// The value at `(lhs, rhs)`, or 0 where undefined.
    pub fn find(&self, lhs: Ob, rhs: Ob) -> Ob {
        debug_assert!(0 < lhs && lhs as usize <= self.item_dim());
        debug_assert!(0 < rhs && rhs as usize <= self.item_dim());
        self.slot(lhs, rhs).load(Ordering::Acquire)
    }

    /// The value at `(lhs, rhs)` without ordering; the bulk-load path.
    pub fn raw_find(&self, lhs: Ob, rhs: Ob) -> Ob {
        self.slot(lhs, rhs).load(Ordering::Relaxed)
    }

    /// The right operands at which `lhs` is defined.
    pub fn iter_lhs(&self, lhs: Ob) -> DenseSetRef<'_> {
        self.lines.lx_set(lhs)
    }

    /// The left operands at which `rhs` is defined.
    pub fn iter_rhs(&self, rhs: Ob) -> DenseSetRef<'_> {
        self.lines.rx_set(rhs)
    }

    /// A snapshot of the pairs with value `val`.
    pub fn iter_val(&self, val: Ob) -> Vec<(Ob, Ob)> {
        self.by_val.pairs(val)
    }

    /// A snapshot of the right operands with `fun(lhs, -) = val`.
    pub fn iter_val_lhs(&self, val: Ob, lhs: Ob) -> Vec<Ob> {
        self.by_val_lhs.others(val, lhs)
    }

    /// A snapshot of the left operands with `fun(-, rhs) = val`.
    pub fn iter_val_rhs(&self, val: Ob, rhs: Ob) -> Vec<Ob> {
        self.by_val_rhs.others(val, rhs)
    }

    /// A count of defined pairs; slow.
    pub fn count_pairs(&self) -> usize {
        self.lines.count_pairs()
    }

    fn index_insert(&self, lhs: Ob, rhs: Ob, val: Ob) {
        self.by_val.insert(lhs, rhs, val);
        self.by_val_lhs.insert(val, lhs, rhs);
        self.by_val_rhs.insert(val, rhs, lhs);
    }

    fn index_remove(&self, lhs: Ob, rhs: Ob, val: Ob) {
        self.by_val.remove(lhs, rhs, val);
        self.by_val_lhs.remove(val, lhs, rhs);
        self.by_val_rhs.remove(val, rhs, lhs);
    }

    /// Defines `(lhs, rhs) -> val`, or merges `val` with the current value.
    pub fn insert(&self, lhs: Ob, rhs: Ob, val: Ob) {
        let _shared = self.mutex.read().unwrap();
        debug_assert!(val != 0, "tried to define a zero value at ({lhs}, {rhs})");

        if self.carrier().set_or_merge(self.slot(lhs, rhs), val) {
            self.lines.lx_set(lhs).try_insert(rhs);
            self.lines.rx_set(rhs).try_insert(lhs);
            self.index_insert(lhs, rhs, val);
            if let Some(callback) = &self.insert_callback {
                callback(lhs, rhs);
            }
        }
    }

    /// Unconditional definition of `(lhs, rhs) -> val`; a bulk loader.
    pub fn raw_insert(&self, lhs: Ob, rhs: Ob, val: Ob) {
        debug_assert!(val != 0, "tried to define a zero value at ({lhs}, {rhs})");
        self.slot(lhs, rhs).store(val, Ordering::Relaxed);
        self.lines.lx_set(lhs).try_insert(rhs);
        self.lines.rx_set(rhs).try_insert(lhs);
        self.index_insert(lhs, rhs, val);
    }

    /// Rewrites a merged-away `dep` to its representative.
    ///
    /// A point may move more than once, e.g. `(dep, dep) -> (dep, rep) -> (rep, rep)`.
    pub fn unsafe_merge(&self, dep: Ob) {
        let _unique = self.mutex.write().unwrap();
        let mut rep = self.carrier().find(dep);
        debug_assert!(rep < dep, "self merge: {dep}");

        // dep as rhs
        for lhs in self.lines.rx_set(dep).iter() {
            let val = self.slot(lhs, dep).swap(0, Ordering::Relaxed);
            debug_assert!(val != 0, "defined pair ({lhs}, {dep}) had no value");
            self.lines.lx_set(lhs).try_remove(dep);
            if self.carrier().set_or_merge(self.slot(lhs, rep), val) {
                self.lines.lx_set(lhs).try_insert(rep);
                self.index_remove(lhs, dep, val);
                self.index_insert(lhs, rep, val);
            } else {
                self.index_remove(lhs, dep, val);
            }
        }
        self.lines.rx_set(rep).merge(self.lines.rx_set(dep));

        // dep as lhs
        rep = self.carrier().find(rep);
        for rhs in self.lines.lx_set(dep).iter() {
            let val = self.slot(dep, rhs).swap(0, Ordering::Relaxed);
            debug_assert!(val != 0, "defined pair ({dep}, {rhs}) had no value");
            self.lines.rx_set(rhs).try_remove(dep);
            if self.carrier().set_or_merge(self.slot(rep, rhs), val) {
                self.lines.rx_set(rhs).try_insert(rep);
                self.index_remove(dep, rhs, val);
                self.index_insert(rep, rhs, val);
            } else {
                self.index_remove(dep, rhs, val);
            }
        }
        self.lines.lx_set(rep).merge(self.lines.lx_set(dep));

        // dep as value
        rep = self.carrier().find(rep);
        for (lhs, rhs) in self.by_val.pairs(dep) {
            self.slot(lhs, rhs).store(rep, Ordering::Relaxed);
            self.by_val.insert(lhs, rhs, rep);
            self.by_val_lhs.remove(dep, lhs, rhs);
            self.by_val_lhs.insert(rep, lhs, rhs);
            self.by_val_rhs.remove(dep, rhs, lhs);
            self.by_val_rhs.insert(rep, rhs, lhs);
        }
        self.by_val.remove_all(dep);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        for tile in self.tiles.iter() {
            for cell in tile.0.iter() {
                cell.store(0, Ordering::Relaxed);
            }
        }
        self.by_val.clear();
        self.by_val_lhs.clear();
        self.by_val_rhs.clear();
    }

    /// Checks tile/bit-matrix/inverse-index consistency; slow.
    pub fn validate(&self) {
        let _shared = self.mutex.read().unwrap();
        self.lines.validate();

        let support = self.carrier().support();
        for lhs in 1..=self.item_dim() as Ob {
            for rhs in 1..=self.item_dim() as Ob {
                let val = self.raw_find(lhs, rhs);
                if !(support.contains(lhs) && support.contains(rhs)) {
                    assert!(val == 0, "dead pair ({lhs}, {rhs}) has value {val}");
                } else if val != 0 {
                    assert!(
                        self.defined(lhs, rhs),
                        "pair ({lhs}, {rhs}) has value {val} but is not defined"
                    );
                } else {
                    assert!(
                        !self.defined(lhs, rhs),
                        "pair ({lhs}, {rhs}) is defined but has no value"
                    );
                }
            }
        }

        for lhs in self.carrier().iter() {
            for rhs in self.iter_lhs(lhs).iter() {
                let val = self.raw_find(lhs, rhs);
                assert!(
                    self.by_val.contains(lhs, rhs, val),
                    "missing by_val entry ({lhs}, {rhs}) -> {val}"
                );
                assert!(
                    self.by_val_lhs.contains(val, lhs, rhs),
                    "missing by_val_lhs entry ({lhs}, {rhs}) -> {val}"
                );
                assert!(
                    self.by_val_rhs.contains(val, rhs, lhs),
                    "missing by_val_rhs entry ({lhs}, {rhs}) -> {val}"
                );
            }
        }

        self.by_val.for_each(|lhs, rhs, val| {
            assert_eq!(
                self.raw_find(lhs, rhs),
                val,
                "stale by_val entry ({lhs}, {rhs}) -> {val}"
            );
        });
        self.by_val_lhs.for_each(|val, lhs, rhs| {
            assert_eq!(
                self.raw_find(lhs, rhs),
                val,
                "stale by_val_lhs entry {val}, {lhs} -> {rhs}"
            );
        });
        self.by_val_rhs.for_each(|val, rhs, lhs| {
            assert_eq!(
                self.raw_find(lhs, rhs),
                val,
                "stale by_val_rhs entry {val}, {rhs} -> {lhs}"
            );
        });
    }

    pub fn log_stats(&self, prefix: &str) {
        let pair_count = self.count_pairs();
        let capacity = self.item_dim() * self.item_dim();
        log::info!(
            target: targets::FUNCTION,
            "{prefix} {pair_count} / {capacity} pairs defined"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn carrier_with_queue(item_dim: usize, count: usize) -> (Arc<Carrier>, Arc<Mutex<Vec<Ob>>>) {
        let queue = Arc::new(Mutex::new(Vec::new()));
        let deps = Arc::clone(&queue);
        let carrier = Arc::new(Carrier::new(
            item_dim,
            Some(Box::new(move |dep| deps.lock().unwrap().push(dep))),
        ));
        for _ in 0..count {
            carrier.insert();
        }
        (carrier, queue)
    }

    #[test]
    fn collision_schedules_merge_and_merge_resolves() {
        let (carrier, queue) = carrier_with_queue(10, 10);
        let fun = BinaryFunction::new(Arc::clone(&carrier));

        fun.insert(1, 2, 3);
        assert_eq!(fun.find(1, 2), 3);

        fun.insert(1, 2, 4);
        assert_eq!(*queue.lock().unwrap(), vec![4]);
        assert!(carrier.equal(3, 4));

        // process the pending merge
        fun.unsafe_merge(4);
        assert_eq!(fun.find(1, 2), 3);
        assert_eq!(carrier.find(4), 3);
        fun.validate();
    }

    #[test]
    fn iter_val_lists_exactly_the_pairs() {
        let (carrier, _queue) = carrier_with_queue(10, 10);
        let fun = BinaryFunction::new(Arc::clone(&carrier));
        fun.insert(1, 2, 7);
        fun.insert(2, 1, 7);
        fun.insert(3, 3, 5);

        let mut pairs = fun.iter_val(7);
        pairs.sort();
        assert_eq!(pairs, vec![(1, 2), (2, 1)]);
        assert_eq!(fun.iter_val(6), vec![]);
        assert_eq!(fun.iter_val_lhs(7, 1), vec![2]);
        assert_eq!(fun.iter_val_rhs(5, 3), vec![3]);

        for (lhs, rhs) in fun.iter_val(7) {
            assert_eq!(fun.find(lhs, rhs), 7);
        }
        fun.validate();
    }

    #[test]
    fn merge_moves_arguments_and_values() {
        let (carrier, _queue) = carrier_with_queue(10, 10);
        let fun = BinaryFunction::new(Arc::clone(&carrier));
        fun.insert(9, 1, 2);
        fun.insert(1, 9, 5);
        fun.insert(2, 3, 9);

        carrier.merge(9, 4);
        fun.unsafe_merge(9);

        assert_eq!(fun.find(4, 1), 2);
        assert_eq!(fun.find(1, 4), 5);
        assert_eq!(fun.find(2, 3), 4);
        assert_eq!(fun.find(9, 1), 0);
        let mut pairs = fun.iter_val(4);
        pairs.sort();
        assert_eq!(pairs, vec![(2, 3)]);
        fun.validate();
    }

    #[test]
    fn merge_collision_on_target_row() {
        let (carrier, queue) = carrier_with_queue(10, 10);
        let fun = BinaryFunction::new(Arc::clone(&carrier));
        fun.insert(9, 1, 5);
        fun.insert(4, 1, 6);

        carrier.merge(9, 4);
        fun.unsafe_merge(9);

        // (9, 1) collided with (4, 1); their values merged in the carrier.
        assert!(carrier.equal(5, 6));
        assert_eq!(fun.find(4, 1), 6);
        assert!(queue.lock().unwrap().contains(&9));
        assert!(queue.lock().unwrap().contains(&6));
    }
}
