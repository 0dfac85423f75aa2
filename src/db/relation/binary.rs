/*!
A binary relation: a [BaseBinRel] pair of bit-matrices with an insert callback.

Point queries read `Lx`; row and column iteration read `Lx` and `Rx` respectively.
Inserts take the table's lock shared and fire the callback exactly once per fresh pair; [unsafe_merge](BinaryRelation::unsafe_merge) takes it unique and fires the callback for every pair that is new on the surviving row or column.
*/

use std::sync::atomic::Ordering;
use std::sync::{Arc, RwLock};

use crate::db::base_bin_rel::BaseBinRel;
use crate::db::carrier::Carrier;
use crate::db::dense_set::{DenseSet, DenseSetRef, BITS_PER_WORD};
use crate::db::Ob;
use crate::misc::log::targets;

/// Callback fired with each newly related pair.
pub type PairInsertCallback = Box<dyn Fn(Ob, Ob) + Send + Sync>;

/// A relation on pairs of obs.
pub struct BinaryRelation {
    lines: BaseBinRel,
    mutex: RwLock<()>,
    insert_callback: Option<PairInsertCallback>,
}

impl BinaryRelation {
    pub fn new(carrier: Arc<Carrier>) -> BinaryRelation {
        BinaryRelation {
            lines: BaseBinRel::new_square(carrier),
            mutex: RwLock::new(()),
            insert_callback: None,
        }
    }

    /// Installs the callback fired on each fresh pair.
    pub fn set_insert_callback(&mut self, callback: PairInsertCallback) {
        self.insert_callback = Some(callback);
    }

    pub fn carrier(&self) -> &Carrier {
        self.lines.carrier()
    }

    fn item_dim(&self) -> usize {
        self.lines.item_dim()
    }

    fn callback(&self, lhs: Ob, rhs: Ob) {
        if let Some(callback) = &self.insert_callback {
            callback(lhs, rhs);
        }
    }

    /// True if the pair `(lhs, rhs)` is related.
    pub fn find(&self, lhs: Ob, rhs: Ob) -> bool {
        self.lines.get_lx(lhs, rhs)
    }

    /// The right operands related to `lhs`.
    pub fn lx_set(&self, lhs: Ob) -> DenseSetRef<'_> {
        self.lines.lx_set(lhs)
    }

    /// The left operands related to `rhs`.
    pub fn rx_set(&self, rhs: Ob) -> DenseSetRef<'_> {
        self.lines.rx_set(rhs)
    }

    /// A count of pairs; slow.
    pub fn count_pairs(&self) -> usize {
        self.lines.count_pairs()
    }

    /// Relates `(lhs, rhs)`, firing the callback if the pair is fresh.
    pub fn insert(&self, lhs: Ob, rhs: Ob) {
        let _shared = self.mutex.read().unwrap();
        if self.lines.lx_set(lhs).try_insert(rhs) {
            self.lines.rx_set(rhs).try_insert(lhs);
            self.callback(lhs, rhs);
        }
    }

    /// Relates `lhs` to every ob of `rhs_set`, firing the callback per fresh pair.
    pub fn insert_row(&self, lhs: Ob, rhs_set: DenseSetRef) {
        let _shared = self.mutex.read().unwrap();
        let diff = DenseSet::new(self.item_dim());
        if self.lines.lx_set(lhs).ensure(rhs_set, diff.as_set()) {
            for rhs in diff.iter() {
                self.lines.rx_set(rhs).try_insert(lhs);
                self.callback(lhs, rhs);
            }
        }
    }

    /// Relates every ob of `lhs_set` to `rhs`, firing the callback per fresh pair.
    pub fn insert_col(&self, lhs_set: DenseSetRef, rhs: Ob) {
        let _shared = self.mutex.read().unwrap();
        let diff = DenseSet::new(self.item_dim());
        if self.lines.rx_set(rhs).ensure(lhs_set, diff.as_set()) {
            for lhs in diff.iter() {
                self.lines.lx_set(lhs).try_insert(rhs);
                self.callback(lhs, rhs);
            }
        }
    }

    /// Unconditional relation of `(lhs, rhs)` in `Lx` only; a bulk loader.
    ///
    /// Call [update](BinaryRelation::update) to rebuild `Rx` afterward.
    pub fn raw_insert(&self, lhs: Ob, rhs: Ob) {
        self.lines.lx_set(lhs).try_insert(rhs);
    }

    /// Rebuilds `Rx` from `Lx` after a bulk load.
    pub fn update(&mut self) {
        self.lines.copy_lx_to_rx();
    }

    /// Clears the `Lx` bit of `(lhs, dep)` for every `lhs` of `lhs_set`.
    fn remove_lx_masked(&self, lhs_set: DenseSetRef, dep: Ob) {
        let mask = !(1u64 << (dep as usize % BITS_PER_WORD));
        let offset = dep as usize / BITS_PER_WORD;
        let words = self.lines.lx_words();
        let round_word_dim = self.lines.round_word_dim();
        for lhs in lhs_set.iter() {
            words[lhs as usize * round_word_dim + offset].fetch_and(mask, Ordering::Relaxed);
        }
    }

    /// Clears the `Rx` bit of `(dep, rhs)` for every `rhs` of `rhs_set`.
    fn remove_rx_masked(&self, dep: Ob, rhs_set: DenseSetRef) {
        let mask = !(1u64 << (dep as usize % BITS_PER_WORD));
        let offset = dep as usize / BITS_PER_WORD;
        let words = self.lines.rx_words();
        let round_word_dim = self.lines.round_word_dim();
        for rhs in rhs_set.iter() {
            words[rhs as usize * round_word_dim + offset].fetch_and(mask, Ordering::Relaxed);
        }
    }

    /// Rewrites a merged-away `dep` to its representative.
    ///
    /// The callback fires for every pair related through `dep` but not, until
    /// now, through its representative.
    pub fn unsafe_merge(&self, dep: Ob) {
        let _unique = self.mutex.write().unwrap();
        let rep = self.carrier().find(dep);
        debug_assert!(rep < dep, "self merge: {dep}");

        let diff = DenseSet::new(self.item_dim());

        // rows (dep, _) into (rep, _)
        let dep_row = self.lines.lx_set(dep);
        self.remove_rx_masked(dep, dep_row);
        if self.lines.lx_set(rep).merge_diff(dep_row, diff.as_set()) {
            for rhs in diff.iter() {
                self.lines.rx_set(rhs).try_insert(rep);
                self.callback(rep, rhs);
            }
        }

        // columns (_, dep) into (_, rep)
        let dep_col = self.lines.rx_set(dep);
        self.remove_lx_masked(dep_col, dep);
        if self.lines.rx_set(rep).merge_diff(dep_col, diff.as_set()) {
            for lhs in diff.iter() {
                self.lines.lx_set(lhs).try_insert(rep);
                self.callback(lhs, rep);
            }
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Checks internal consistency; slow.
    pub fn validate(&self) {
        let _unique = self.mutex.write().unwrap();
        self.lines.validate();
    }

    /// Checks that two relations share no pair; used for `LESS`/`NLESS`.
    pub fn validate_disjoint(&self, other: &BinaryRelation) {
        let _unique = self.mutex.write().unwrap();
        assert_eq!(
            self.item_dim(),
            other.item_dim(),
            "disjoint relations differ in dimension"
        );
        for lhs in self.carrier().iter() {
            assert!(
                self.lines.lx_set(lhs).disjoint(other.lines.lx_set(lhs)),
                "relations intersect on row {lhs}"
            );
        }
    }

    pub fn log_stats(&self, prefix: &str) {
        let pair_count = self.count_pairs();
        let capacity = self.item_dim() * self.item_dim();
        log::info!(
            target: targets::RELATION,
            "{prefix} {pair_count} / {capacity} pairs related"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn carrier_of(item_dim: usize, count: usize) -> Arc<Carrier> {
        let carrier = Arc::new(Carrier::new(item_dim, None));
        for _ in 0..count {
            carrier.insert();
        }
        carrier
    }

    #[test]
    fn find_reads_both_matrices() {
        let rel = BinaryRelation::new(carrier_of(80, 80));
        rel.insert(3, 77);

        assert!(rel.find(3, 77));
        assert!(rel.lx_set(3).contains(77));
        assert!(rel.rx_set(77).contains(3));
        assert!(!rel.find(77, 3));
        rel.validate();
    }

    #[test]
    fn bulk_inserts_fire_per_fresh_pair() {
        let mut rel = BinaryRelation::new(carrier_of(16, 16));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&seen);
        rel.set_insert_callback(Box::new(move |lhs, rhs| {
            recorded.lock().unwrap().push((lhs, rhs))
        }));

        rel.insert(1, 2);
        let rhs_set = DenseSet::new(16);
        rhs_set.insert(2);
        rhs_set.insert(3);
        rel.insert_row(1, rhs_set.as_set());

        assert_eq!(*seen.lock().unwrap(), vec![(1, 2), (1, 3)]);
        rel.validate();
    }

    #[test]
    fn merge_rewrites_rows_and_columns() {
        let carrier = carrier_of(16, 16);
        let rel = BinaryRelation::new(Arc::clone(&carrier));
        rel.insert(9, 3);
        rel.insert(4, 9);
        rel.insert(9, 9);

        carrier.merge(9, 2);
        rel.unsafe_merge(9);

        assert!(rel.find(2, 3));
        assert!(rel.find(4, 2));
        assert!(rel.find(2, 2));
        assert!(!rel.lx_set(2).contains(9));
        assert!(!rel.rx_set(2).contains(9));
        rel.validate();
    }

    #[test]
    fn disjoint_relations_validate() {
        let carrier = carrier_of(8, 8);
        let less = BinaryRelation::new(Arc::clone(&carrier));
        let nless = BinaryRelation::new(Arc::clone(&carrier));
        less.insert(1, 2);
        nless.insert(2, 1);

        less.validate_disjoint(&nless);
    }
}
