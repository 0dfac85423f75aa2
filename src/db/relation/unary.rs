/*!
A unary relation: one [DenseSet] subset of the support, with an insert callback.
*/

use std::sync::Arc;

use crate::db::carrier::Carrier;
use crate::db::dense_set::{DenseSet, DenseSetRef, Iter};
use crate::db::Ob;
use crate::misc::log::targets;

/// Callback fired with each newly related ob.
pub type UnaryInsertCallback = Box<dyn Fn(Ob) + Send + Sync>;

/// A predicate on obs.
pub struct UnaryRelation {
    carrier: Arc<Carrier>,
    set: DenseSet,
    insert_callback: Option<UnaryInsertCallback>,
}

impl UnaryRelation {
    pub fn new(carrier: Arc<Carrier>) -> UnaryRelation {
        let set = DenseSet::new(carrier.item_dim());
        UnaryRelation {
            carrier,
            set,
            insert_callback: None,
        }
    }

    /// Installs the callback fired on each fresh insertion.
    pub fn set_insert_callback(&mut self, callback: UnaryInsertCallback) {
        self.insert_callback = Some(callback);
    }

    pub fn carrier(&self) -> &Carrier {
        &self.carrier
    }

    /// The related obs.
    pub fn get_set(&self) -> &DenseSet {
        &self.set
    }

    pub fn count_items(&self) -> usize {
        self.set.count_items()
    }

    pub fn contains(&self, ob: Ob) -> bool {
        self.set.contains(ob)
    }

    pub fn iter(&self) -> Iter<'_> {
        self.set.iter()
    }

    /// Relates `ob`, firing the callback if it was not related before.
    pub fn insert(&self, ob: Ob) {
        if self.set.try_insert(ob) {
            if let Some(callback) = &self.insert_callback {
                callback(ob);
            }
        }
    }

    /// Relates every ob of `obs`, firing the callback once per fresh ob.
    pub fn insert_set(&self, obs: DenseSetRef) {
        let diff = DenseSet::new(self.set.item_dim());
        if self.set.as_set().ensure(obs, diff.as_set()) {
            for ob in diff.iter() {
                if let Some(callback) = &self.insert_callback {
                    callback(ob);
                }
            }
        }
    }

    /// Unconditional relation of `ob`; a bulk loader.
    pub fn raw_insert(&self, ob: Ob) {
        self.set.try_insert(ob);
    }

    /// Rewrites a merged-away `dep` to its representative.
    pub fn unsafe_merge(&self, dep: Ob) {
        let rep = self.carrier.find(dep);
        debug_assert!(rep < dep, "self merge: {dep}");
        if self.set.try_remove(dep) {
            if self.set.try_insert(rep) {
                if let Some(callback) = &self.insert_callback {
                    callback(rep);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.set.zero();
    }

    /// Checks that the relation stays within the support.
    pub fn validate(&self) {
        self.set.validate();
        assert!(
            self.set.as_set().is_subset_of(self.carrier.support().as_set()),
            "unary relation exceeds the support"
        );
    }

    pub fn log_stats(&self, prefix: &str) {
        log::info!(
            target: targets::RELATION,
            "{prefix} {} / {} obs related",
            self.count_items(),
            self.carrier.item_dim()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn carrier_of(count: usize) -> Arc<Carrier> {
        let carrier = Arc::new(Carrier::new(16, None));
        for _ in 0..count {
            carrier.insert();
        }
        carrier
    }

    #[test]
    fn insert_fires_callback_once() {
        let mut rel = UnaryRelation::new(carrier_of(8));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&seen);
        rel.set_insert_callback(Box::new(move |ob| recorded.lock().unwrap().push(ob)));

        rel.insert(3);
        rel.insert(3);
        rel.insert(5);

        assert_eq!(*seen.lock().unwrap(), vec![3, 5]);
        assert!(rel.contains(3));
        assert!(!rel.contains(4));
        rel.validate();
    }

    #[test]
    fn merge_moves_membership() {
        let carrier = carrier_of(8);
        let rel = UnaryRelation::new(Arc::clone(&carrier));
        rel.insert(7);

        carrier.merge(7, 2);
        rel.unsafe_merge(7);

        assert!(rel.contains(2));
        assert_eq!(rel.count_items(), 1);
        rel.validate();
    }
}
