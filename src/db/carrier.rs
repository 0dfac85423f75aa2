/*!
The carrier: a union-find–backed set of live obs.

# Representation

The carrier holds a [DenseSet] `support` of live obs and an array of atomic representative pointers, one per ob.
A live ob is its own representative; a merged-away ob chains downward (`rep[ob] < ob`) toward the surviving representative, and [find](Carrier::find) follows and compresses these chains.
Chains of dead obs are kept for the remainder of the process --- an ob is never reinserted once merged away --- so a late `find` through a dead ob still lands on the right representative.

# Merging

[merge](Carrier::merge) is an assertion that two obs are equal.
The larger ob (the *dep*) is chained to the smaller (the *rep*) with a compare-exchange retry loop, so racing merges of overlapping pairs converge: a loser re-reads the surviving pointer and retries on the reordered pair.
The winning thread removes the dep from the support, adjusts the counters, and fires the merge callback --- conventionally, a callback schedules a `MergeTask` so the scheduler can rewrite every table occurrence of the dep under its exclusive lock.

The slot helpers [set_and_merge](Carrier::set_and_merge) and [set_or_merge](Carrier::set_or_merge) apply a merge through a table cell: both bind an unbound cell, but the first writes the surviving representative back into a bound cell, while the second leaves a bound cell for the merge rewrite to catch up with.
*/

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::misc::log::targets;

use super::dense_set::DenseSet;
use super::{AtomicOb, Ob};

/// Callback fired with the deprecated ob after each merge.
pub type MergeCallback = Box<dyn Fn(Ob) + Send + Sync>;

/// The set of live obs, with merge support.
pub struct Carrier {
    support: DenseSet,
    /// Every ob ever allocated. Monotone: a merged-away ob leaves the support
    /// but stays used, so it is never handed out again while stale chains or
    /// queued tasks might still mention it.
    used: DenseSet,
    reps: Box<[AtomicOb]>,
    item_count: AtomicUsize,
    rep_count: AtomicUsize,
    merge_callback: Option<MergeCallback>,
}

impl Carrier {
    /// A fresh carrier admitting obs `1..=item_dim`.
    pub fn new(item_dim: usize, merge_callback: Option<MergeCallback>) -> Carrier {
        let mut reps = Vec::with_capacity(1 + item_dim);
        reps.resize_with(1 + item_dim, || AtomicOb::new(0));
        Carrier {
            support: DenseSet::new(item_dim),
            used: DenseSet::new(item_dim),
            reps: reps.into_boxed_slice(),
            item_count: AtomicUsize::new(0),
            rep_count: AtomicUsize::new(0),
            merge_callback,
        }
    }

    pub fn item_dim(&self) -> usize {
        self.support.item_dim()
    }

    /// The set of live obs.
    pub fn support(&self) -> &DenseSet {
        &self.support
    }

    /// A count of live obs.
    pub fn item_count(&self) -> usize {
        self.item_count.load(Ordering::Relaxed)
    }

    /// A count of live obs which are their own representative.
    pub fn rep_count(&self) -> usize {
        self.rep_count.load(Ordering::Relaxed)
    }

    pub fn contains(&self, ob: Ob) -> bool {
        self.support.contains(ob)
    }

    /// Iterates the live obs.
    pub fn iter(&self) -> super::dense_set::Iter<'_> {
        self.support.iter()
    }

    /// Allocates the smallest never-used ob; returns 0 when the carrier is
    /// full.
    pub fn insert(&self) -> Ob {
        match self.used.try_insert_one() {
            0 => {
                log::debug!(target: targets::CARRIER, "carrier is full");
                0
            }
            ob => {
                self.support.insert(ob);
                self.reps[ob as usize].store(ob, Ordering::Release);
                self.item_count.fetch_add(1, Ordering::Relaxed);
                self.rep_count.fetch_add(1, Ordering::Relaxed);
                ob
            }
        }
    }

    /// Marks `ob` present with itself as representative; a bulk loader.
    ///
    /// Counters are left stale; call [update](Carrier::update) after loading.
    pub fn raw_insert(&self, ob: Ob) {
        self.support.insert(ob);
        self.used.try_insert(ob);
        self.reps[ob as usize].store(ob, Ordering::Relaxed);
    }

    /// Recomputes the counters after a bulk load.
    pub fn update(&self) {
        let mut item_count = 0;
        let mut rep_count = 0;
        for ob in self.support.iter() {
            item_count += 1;
            if self.reps[ob as usize].load(Ordering::Relaxed) == ob {
                rep_count += 1;
            }
        }
        self.item_count.store(item_count, Ordering::Relaxed);
        self.rep_count.store(rep_count, Ordering::Relaxed);
    }

    /// The representative of `ob`, compressing the chain walked.
    pub fn find(&self, ob: Ob) -> Ob {
        debug_assert!(
            0 < ob && ob as usize <= self.item_dim(),
            "ob {ob} out of range"
        );
        let rep = self.reps[ob as usize].load(Ordering::Relaxed);
        debug_assert!(rep != 0, "find on deleted ob: {ob}");
        if rep == ob {
            ob
        } else {
            self.find_through(ob, rep)
        }
    }

    fn find_through(&self, ob: Ob, rep: Ob) -> Ob {
        let root = self.find(rep);
        if root != rep {
            // Compression; losing a race here is benign.
            let _ = self.reps[ob as usize].compare_exchange(
                rep,
                root,
                Ordering::Relaxed,
                Ordering::Relaxed,
            );
        }
        root
    }

    /// True if `lhs` and `rhs` have merged.
    pub fn equal(&self, lhs: Ob, rhs: Ob) -> bool {
        self.find(lhs) == self.find(rhs)
    }

    /// Merges `dep` into `rep`, with `dep > rep`; returns the survivor.
    pub fn merge(&self, mut dep: Ob, mut rep: Ob) -> Ob {
        debug_assert!(0 < rep && rep < dep, "merge out of order: {dep} into {rep}");
        debug_assert!(dep as usize <= self.item_dim(), "ob {dep} out of range");
        loop {
            match self.reps[dep as usize].compare_exchange(
                dep,
                rep,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(moved) => {
                    // dep merged under us; retry on the surviving pair
                    if moved == rep {
                        return rep;
                    }
                    if moved < rep {
                        dep = rep;
                        rep = moved;
                    } else {
                        dep = moved;
                    }
                }
            }
        }
        log::trace!(target: targets::CARRIER, "merged {dep} into {rep}");
        self.item_count.fetch_sub(1, Ordering::Relaxed);
        self.rep_count.fetch_sub(1, Ordering::Relaxed);
        // winning the pointer transition above makes this thread the one
        // remover of dep
        let removed = self.support.try_remove(dep);
        debug_assert!(removed, "merged ob {dep} was already dead");
        if let Some(callback) = &self.merge_callback {
            callback(dep);
        }
        rep
    }

    /// Merges the larger of two obs into the smaller; returns the survivor.
    pub fn ensure_equal(&self, lhs: Ob, rhs: Ob) -> Ob {
        if lhs == rhs {
            lhs
        } else {
            self.merge(lhs.max(rhs), lhs.min(rhs))
        }
    }

    /// Merges `source` into a cell, writing the surviving representative back.
    ///
    /// An unbound cell is bound to `source`. Returns true iff the cell was
    /// written; a cell already holding `source` is left alone. Contrast with
    /// [set_or_merge](Carrier::set_or_merge), which never rewrites a bound
    /// cell and leaves the merge rewrite to catch up with it.
    pub fn set_and_merge(&self, destin: &AtomicOb, source: Ob) -> bool {
        match destin.compare_exchange(0, source, Ordering::Release, Ordering::Acquire) {
            Ok(_) => true,
            Err(current) => {
                if current == source {
                    false
                } else {
                    let merged = self.ensure_equal(current, source);
                    destin.store(merged, Ordering::Release);
                    true
                }
            }
        }
    }

    /// Binds an unbound cell to `source`, or merges with its current value.
    ///
    /// Returns true iff the cell was unbound and is now set.
    pub fn set_or_merge(&self, destin: &AtomicOb, source: Ob) -> bool {
        match destin.compare_exchange(0, source, Ordering::Release, Ordering::Acquire) {
            Ok(_) => true,
            Err(current) => {
                self.ensure_equal(current, source);
                false
            }
        }
    }

    /// Deletes `ob` outright; the caller must already have rewritten every
    /// table reference to it.
    pub fn unsafe_remove(&self, ob: Ob) {
        debug_assert!(self.contains(ob), "removal of dead ob: {ob}");
        if self.reps[ob as usize].swap(0, Ordering::Relaxed) == ob {
            self.rep_count.fetch_sub(1, Ordering::Relaxed);
        }
        self.support.remove(ob);
        self.item_count.fetch_sub(1, Ordering::Relaxed);
    }

    /// Checks internal consistency; slow.
    pub fn validate(&self) {
        self.support.validate();

        let mut item_count = 0;
        let mut rep_count = 0;
        assert!(
            self.support.as_set().is_subset_of(self.used.as_set()),
            "support exceeds the used obs"
        );
        for ob in self.support.iter() {
            item_count += 1;
            let rep = self.reps[ob as usize].load(Ordering::Relaxed);
            assert!(rep != 0, "live ob {ob} has no representative");
            assert!(rep <= ob, "representative chain of {ob} points upward");
            if rep == ob {
                rep_count += 1;
            }
            let root = self.find(ob);
            assert!(self.contains(root), "root {root} of {ob} is dead");
            assert_eq!(self.find(root), root, "find is not idempotent at {ob}");
        }
        for ob in 1..=self.item_dim() as Ob {
            if !self.contains(ob) {
                let rep = self.reps[ob as usize].load(Ordering::Relaxed);
                assert!(rep != ob, "dead ob {ob} is its own representative");
            }
        }
        assert_eq!(item_count, self.item_count(), "stale item_count");
        assert_eq!(rep_count, self.rep_count(), "stale rep_count");
    }

    pub fn log_stats(&self) {
        log::info!(
            target: targets::CARRIER,
            "carrier: {} / {} obs live, {} reps",
            self.item_count(),
            self.item_dim(),
            self.rep_count()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::{Arc, Mutex};

    #[test]
    fn insert_then_merge() {
        let carrier = Carrier::new(5, None);
        for expected in 1..=5 {
            assert_eq!(carrier.insert(), expected);
        }
        assert_eq!(carrier.insert(), 0);

        carrier.merge(5, 2);

        assert_eq!(carrier.find(5), 2);
        assert_eq!(carrier.find(2), 2);
        let support: Vec<Ob> = carrier.iter().collect();
        assert_eq!(support, vec![1, 2, 3, 4]);
        assert_eq!(carrier.rep_count(), 4);
        assert_eq!(carrier.item_count(), 4);
        carrier.validate();
    }

    #[test]
    fn find_is_idempotent_through_chains() {
        let carrier = Carrier::new(8, None);
        for _ in 0..8 {
            carrier.insert();
        }
        carrier.merge(8, 7);
        carrier.merge(7, 5);
        carrier.merge(5, 1);

        for ob in [1, 5, 7, 8] {
            let root = carrier.find(ob);
            assert_eq!(root, 1);
            assert_eq!(carrier.find(root), root);
        }
        carrier.validate();
    }

    #[test]
    fn equal_is_an_equivalence() {
        let carrier = Carrier::new(6, None);
        for _ in 0..6 {
            carrier.insert();
        }
        carrier.merge(4, 2);
        carrier.merge(6, 4);

        for ob in [2, 4, 6] {
            assert!(carrier.equal(ob, ob));
        }
        assert!(carrier.equal(2, 6));
        assert!(carrier.equal(6, 2));
        assert!(carrier.equal(4, 6) && carrier.equal(2, 4) && carrier.equal(2, 6));
        assert!(!carrier.equal(1, 2));
    }

    #[test]
    fn merge_fires_callback() {
        let deps = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&deps);
        let carrier = Carrier::new(4, Some(Box::new(move |dep| {
            recorded.lock().unwrap().push(dep);
        })));
        for _ in 0..4 {
            carrier.insert();
        }

        carrier.ensure_equal(2, 4);
        carrier.ensure_equal(3, 1);

        assert_eq!(*deps.lock().unwrap(), vec![4, 3]);
    }

    #[test]
    fn set_or_merge_binds_or_merges() {
        let carrier = Carrier::new(4, None);
        for _ in 0..4 {
            carrier.insert();
        }

        let cell = AtomicU32::new(0);
        assert!(carrier.set_or_merge(&cell, 3));
        assert_eq!(cell.load(Ordering::Relaxed), 3);

        assert!(!carrier.set_or_merge(&cell, 4));
        assert!(carrier.equal(3, 4));
    }

    #[test]
    fn set_and_merge_binds_and_writes_back() {
        let carrier = Carrier::new(4, None);
        for _ in 0..4 {
            carrier.insert();
        }

        let cell = AtomicU32::new(0);
        assert!(carrier.set_and_merge(&cell, 2));
        assert_eq!(cell.load(Ordering::Relaxed), 2);

        assert!(!carrier.set_and_merge(&cell, 2));

        assert!(carrier.set_and_merge(&cell, 4));
        assert!(carrier.equal(2, 4));
        // the surviving representative is written back
        assert_eq!(cell.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn raw_insert_and_update() {
        let carrier = Carrier::new(10, None);
        for ob in [2, 3, 7] {
            carrier.raw_insert(ob);
        }
        carrier.update();

        assert_eq!(carrier.item_count(), 3);
        assert_eq!(carrier.rep_count(), 3);
        assert_eq!(carrier.insert(), 1);
        carrier.validate();
    }

    #[test]
    fn unsafe_remove_deletes() {
        let carrier = Carrier::new(3, None);
        for _ in 0..3 {
            carrier.insert();
        }
        carrier.unsafe_remove(2);

        assert!(!carrier.contains(2));
        assert_eq!(carrier.item_count(), 2);
        assert_eq!(carrier.rep_count(), 2);
    }
}
