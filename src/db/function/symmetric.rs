/*!
A symmetric binary function: `fun(lhs, rhs) = fun(rhs, lhs)` by construction.

Only the upper triangle `lhs <= rhs` of the value matrix is stored, in triangular tile order; queries canonicalize their arguments by swapping.
The defined-pair matrix is the aliased symmetric [BaseBinRel], and the inverse indices record both orientations of each off-diagonal pair.
*/

use std::sync::atomic::Ordering;
use std::sync::{Arc, RwLock};

use crate::db::base_bin_rel::BaseBinRel;
use crate::db::carrier::Carrier;
use crate::db::dense_set::DenseSetRef;
use crate::db::{AtomicOb, Ob};
use crate::misc::log::targets;

use super::inverse::{ValFixedToOther, ValToPairs};
use super::{alloc_tiles, tile_dim, unordered_pair_count, BinaryInsertCallback, Tile, ITEMS_PER_TILE};

/// A symmetric 2-ary partial function with inverse lookup.
pub struct SymmetricFunction {
    lines: BaseBinRel,
    tiles: Box<[Tile]>,
    by_val: ValToPairs,
    by_val_lhs: ValFixedToOther,
    insert_callback: Option<BinaryInsertCallback>,
    mutex: RwLock<()>,
}

impl SymmetricFunction {
    pub fn new(carrier: Arc<Carrier>) -> SymmetricFunction {
        let item_dim = carrier.item_dim();
        let tile_dim = tile_dim(item_dim);
        SymmetricFunction {
            lines: BaseBinRel::new_symmetric(carrier),
            tiles: alloc_tiles(unordered_pair_count(tile_dim)),
            by_val: ValToPairs::new(item_dim),
            by_val_lhs: ValFixedToOther::new(),
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

    /// The cell of the canonicalized pair.
    fn slot(&self, lhs: Ob, rhs: Ob) -> &AtomicOb {
        let (i, j) = if lhs <= rhs {
            (lhs as usize, rhs as usize)
        } else {
            (rhs as usize, lhs as usize)
        };
        let (ti, tj) = (i / ITEMS_PER_TILE, j / ITEMS_PER_TILE);
        let tile = &self.tiles[unordered_pair_count(tj) + ti];
        &tile.0[j % ITEMS_PER_TILE * ITEMS_PER_TILE + i % ITEMS_PER_TILE]
    }

    /// True if the function is defined at `(lhs, rhs)` in either order.
    pub fn defined(&self, lhs: Ob, rhs: Ob) -> bool {
        self.lines.get_lx(lhs, rhs)
    }

    /// The value at `(lhs, rhs)` in either order, or 0 where undefined.
    pub fn find(&self, lhs: Ob, rhs: Ob) -> Ob {
        debug_assert!(0 < lhs && lhs as usize <= self.item_dim());
        debug_assert!(0 < rhs && rhs as usize <= self.item_dim());
        self.slot(lhs, rhs).load(Ordering::Acquire)
    }

    /// The value at `(lhs, rhs)` without ordering; the bulk-load path.
    pub fn raw_find(&self, lhs: Ob, rhs: Ob) -> Ob {
        self.slot(lhs, rhs).load(Ordering::Relaxed)
    }

    /// The partners at which `lhs` is defined.
    pub fn iter_lhs(&self, lhs: Ob) -> DenseSetRef<'_> {
        self.lines.lx_set(lhs)
    }

    /// A snapshot of the pairs with value `val`, in both orientations.
    pub fn iter_val(&self, val: Ob) -> Vec<(Ob, Ob)> {
        self.by_val.pairs(val)
    }

    /// A snapshot of the partners with `fun(lhs, -) = val`.
    pub fn iter_val_lhs(&self, val: Ob, lhs: Ob) -> Vec<Ob> {
        self.by_val_lhs.others(val, lhs)
    }

    /// A count of defined unordered pairs; slow.
    pub fn count_pairs(&self) -> usize {
        let ordered = self.lines.count_pairs();
        let diagonal = self
            .carrier()
            .iter()
            .filter(|&ob| self.defined(ob, ob))
            .count();
        (ordered + diagonal) / 2
    }

    fn index_insert(&self, lhs: Ob, rhs: Ob, val: Ob) {
        self.by_val.insert(lhs, rhs, val);
        self.by_val_lhs.insert(val, lhs, rhs);
        if lhs != rhs {
            self.by_val.insert(rhs, lhs, val);
            self.by_val_lhs.insert(val, rhs, lhs);
        }
    }

    fn index_remove(&self, lhs: Ob, rhs: Ob, val: Ob) {
        self.by_val.remove(lhs, rhs, val);
        self.by_val_lhs.remove(val, lhs, rhs);
        if lhs != rhs {
            self.by_val.remove(rhs, lhs, val);
            self.by_val_lhs.remove(val, rhs, lhs);
        }
    }

    /// Defines `(lhs, rhs) -> val` in both orders, or merges `val` with the
    /// current value.
    pub fn insert(&self, lhs: Ob, rhs: Ob, val: Ob) {
        let _shared = self.mutex.read().unwrap();
        debug_assert!(val != 0, "tried to define a zero value at ({lhs}, {rhs})");

        if self.carrier().set_or_merge(self.slot(lhs, rhs), val) {
            self.lines.lx_set(lhs).try_insert(rhs);
            self.lines.lx_set(rhs).try_insert(lhs);
            self.index_insert(lhs, rhs, val);
            if let Some(callback) = &self.insert_callback {
                callback(lhs, rhs);
            }
        }
    }

    /// Unconditional definition; a bulk loader.
    pub fn raw_insert(&self, lhs: Ob, rhs: Ob, val: Ob) {
        debug_assert!(val != 0, "tried to define a zero value at ({lhs}, {rhs})");
        self.slot(lhs, rhs).store(val, Ordering::Relaxed);
        self.lines.lx_set(lhs).try_insert(rhs);
        self.lines.lx_set(rhs).try_insert(lhs);
        self.index_insert(lhs, rhs, val);
    }

    /// Rewrites a merged-away `dep` to its representative.
    pub fn unsafe_merge(&self, dep: Ob) {
        let _unique = self.mutex.write().unwrap();
        let mut rep = self.carrier().find(dep);
        debug_assert!(rep < dep, "self merge: {dep}");

        // (dep, dep) -> (rep, rep)
        if self.defined(dep, dep) {
            let val = self.slot(dep, dep).swap(0, Ordering::Relaxed);
            debug_assert!(val != 0, "defined pair ({dep}, {dep}) had no value");
            self.lines.lx_set(dep).try_remove(dep);
            if self.carrier().set_or_merge(self.slot(rep, rep), val) {
                self.lines.lx_set(rep).try_insert(rep);
                self.index_remove(dep, dep, val);
                self.index_insert(rep, rep, val);
            } else {
                self.index_remove(dep, dep, val);
            }
        }

        // (dep, rhs) -> (rep, rhs) for rhs != dep
        rep = self.carrier().find(rep);
        for rhs in self.lines.lx_set(dep).iter() {
            let val = self.slot(dep, rhs).swap(0, Ordering::Relaxed);
            debug_assert!(val != 0, "defined pair ({dep}, {rhs}) had no value");
            self.lines.lx_set(rhs).try_remove(dep);
            if self.carrier().set_or_merge(self.slot(rep, rhs), val) {
                self.lines.lx_set(rhs).try_insert(rep);
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
    }

    /// Checks tile/bit-matrix/inverse-index consistency; slow.
    pub fn validate(&self) {
        let _shared = self.mutex.read().unwrap();
        self.lines.validate();

        let support = self.carrier().support();
        for lhs in 1..=self.item_dim() as Ob {
            for rhs in lhs..=self.item_dim() as Ob {
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
    }

    pub fn log_stats(&self, prefix: &str) {
        let pair_count = self.count_pairs();
        let capacity = unordered_pair_count(self.item_dim());
        log::info!(
            target: targets::FUNCTION,
            "{prefix} {pair_count} / {capacity} pairs defined"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carrier_of(item_dim: usize, count: usize) -> Arc<Carrier> {
        let carrier = Arc::new(Carrier::new(item_dim, None));
        for _ in 0..count {
            carrier.insert();
        }
        carrier
    }

    #[test]
    fn queries_canonicalize() {
        let fun = SymmetricFunction::new(carrier_of(10, 10));
        fun.insert(7, 2, 5);

        assert_eq!(fun.find(7, 2), 5);
        assert_eq!(fun.find(2, 7), 5);
        assert!(fun.defined(2, 7));
        assert_eq!(fun.count_pairs(), 1);

        let mut pairs = fun.iter_val(5);
        pairs.sort();
        assert_eq!(pairs, vec![(2, 7), (7, 2)]);
        fun.validate();
    }

    #[test]
    fn diagonal_counts_once() {
        let fun = SymmetricFunction::new(carrier_of(10, 10));
        fun.insert(3, 3, 6);

        assert_eq!(fun.count_pairs(), 1);
        assert_eq!(fun.iter_val(6), vec![(3, 3)]);
        fun.validate();
    }

    #[test]
    fn merge_moves_pairs_and_values() {
        let carrier = carrier_of(10, 10);
        let fun = SymmetricFunction::new(Arc::clone(&carrier));
        fun.insert(9, 9, 1);
        fun.insert(9, 2, 5);
        fun.insert(3, 4, 9);

        carrier.merge(9, 6);
        fun.unsafe_merge(9);

        assert_eq!(fun.find(6, 6), 1);
        assert_eq!(fun.find(6, 2), 5);
        assert_eq!(fun.find(2, 6), 5);
        assert_eq!(fun.find(3, 4), 6);
        assert!(!fun.defined(2, 9));
        assert_eq!(fun.raw_find(9, 2), 0);
        fun.validate();
    }
}
