//! A nullary function: a single, possibly unbound, ob-valued constant.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::db::carrier::Carrier;
use crate::db::{AtomicOb, Ob};
use crate::misc::log::targets;

use super::NullaryInsertCallback;

/// A constant of the signature.
pub struct NullaryFunction {
    carrier: Arc<Carrier>,
    value: AtomicOb,
    insert_callback: Option<NullaryInsertCallback>,
}

impl NullaryFunction {
    pub fn new(carrier: Arc<Carrier>) -> NullaryFunction {
        NullaryFunction {
            carrier,
            value: AtomicOb::new(0),
            insert_callback: None,
        }
    }

    /// Installs the callback fired when the constant becomes defined.
    pub fn set_insert_callback(&mut self, callback: NullaryInsertCallback) {
        self.insert_callback = Some(callback);
    }

    pub fn carrier(&self) -> &Carrier {
        &self.carrier
    }

    pub fn defined(&self) -> bool {
        self.find() != 0
    }

    /// The value, or 0 if unbound.
    pub fn find(&self) -> Ob {
        self.value.load(Ordering::Acquire)
    }

    /// Binds the constant, or merges `val` with its current value.
    pub fn insert(&self, val: Ob) {
        debug_assert!(val != 0, "tried to bind a constant to zero");
        if self.carrier.set_or_merge(&self.value, val) {
            if let Some(callback) = &self.insert_callback {
                callback();
            }
        }
    }

    /// Unconditional bind; a bulk loader.
    pub fn raw_insert(&self, val: Ob) {
        debug_assert!(val != 0, "tried to bind a constant to zero");
        self.value.store(val, Ordering::Relaxed);
    }

    /// Rewrites a merged-away `dep` to its representative.
    pub fn unsafe_merge(&self, dep: Ob) {
        if self.value.load(Ordering::Relaxed) == dep {
            self.value.store(self.carrier.find(dep), Ordering::Relaxed);
        }
    }

    pub fn clear(&mut self) {
        self.value.store(0, Ordering::Relaxed);
    }

    /// Checks that the value, if bound, is live up to equivalence.
    pub fn validate(&self) {
        let val = self.find();
        if val != 0 {
            assert!(
                self.carrier.contains(self.carrier.find(val)),
                "constant bound to dead ob: {val}"
            );
        }
    }

    pub fn log_stats(&self, prefix: &str) {
        log::info!(target: targets::FUNCTION, "{prefix} defined = {}", self.defined());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_then_collide() {
        let carrier = Arc::new(Carrier::new(4, None));
        for _ in 0..4 {
            carrier.insert();
        }
        let fun = NullaryFunction::new(Arc::clone(&carrier));

        assert!(!fun.defined());
        fun.insert(3);
        assert_eq!(fun.find(), 3);

        fun.insert(4);
        assert!(carrier.equal(3, 4));
        assert_eq!(fun.find(), 3);
        fun.validate();
    }

    #[test]
    fn merge_rewrites_value() {
        let carrier = Arc::new(Carrier::new(4, None));
        for _ in 0..4 {
            carrier.insert();
        }
        let fun = NullaryFunction::new(Arc::clone(&carrier));
        fun.insert(4);

        carrier.merge(4, 1);
        fun.unsafe_merge(4);

        assert_eq!(fun.find(), 1);
        fun.validate();
    }
}
