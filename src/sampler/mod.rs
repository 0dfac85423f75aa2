/*!
A depth-bounded probabilistic term generator, used to seed a structure with random well-formed terms.

# Weights

Each function of the signature carries a probability weight, set by name with [set_prob](Sampler::set_prob).
From the per-arity totals a ladder of [BoundedSampler]s is derived, one per depth bound: entry `d` holds the total weight of terms of depth at most `d` and the conditional distribution over compound arities at that bound.
The ladder is cached under a readers-writer lock and extended on demand --- readers lock shared, extenders lock unique --- and invalidated whenever a weight changes.

# Escapes

The recursive descent short-circuits through a tagged escape value threaded with `?`:

- [Inserted](SampleEscape::Inserted) carries a freshly created ob upward and ends the sample;
- [Rejected](SampleEscape::Rejected) abandons the descent and retries from the top;
- [Full](SampleEscape::Full) reports carrier exhaustion to the caller.

A [policy](SamplePolicy) decides what happens at each function application: the [growing policy](GrowingPolicy) inserts fresh obs at undefined points, while the [restricted policy](RestrictedPolicy) samples only within the existing structure, rejecting at undefined points.
*/

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;

use rand::Rng;
use rand_core::RngCore;

use crate::db::carrier::Carrier;
use crate::db::dense_set::DenseSet;
use crate::db::function::{BinaryFunction, InjectiveFunction, NullaryFunction, SymmetricFunction};
use crate::db::keys::{
    BinaryFunctionKey, InjectiveFunctionKey, NullaryFunctionKey, SymmetricFunctionKey,
};
use crate::db::signature::Signature;
use crate::db::Ob;
use crate::misc::log::targets;
use crate::types::err::SampleError;

/// A short-circuit escape from the recursive descent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleEscape {
    /// A fresh ob was created; the sample is complete.
    Inserted(Ob),

    /// The descent was abandoned; retry from the top.
    Rejected,

    /// The carrier (or the sample budget) is exhausted.
    Full,
}

/// One step of a sample: an existing ob to keep descending from, or an escape.
pub type SampleResult = Result<Ob, SampleEscape>;

/// What happens when the sampler applies a function at a point.
pub trait SamplePolicy: Sync {
    fn sample_nullary(&self, fun: &NullaryFunction) -> SampleResult;
    fn sample_injective(&self, fun: &InjectiveFunction, key: Ob) -> SampleResult;
    fn sample_binary(&self, fun: &BinaryFunction, lhs: Ob, rhs: Ob) -> SampleResult;
    fn sample_symmetric(&self, fun: &SymmetricFunction, lhs: Ob, rhs: Ob) -> SampleResult;
}

/// Grows the structure: an undefined point gets a fresh ob.
pub struct GrowingPolicy<'a> {
    carrier: &'a Carrier,
}

impl<'a> GrowingPolicy<'a> {
    pub fn new(carrier: &'a Carrier) -> GrowingPolicy<'a> {
        GrowingPolicy { carrier }
    }

    fn found(&self, val: Ob) -> SampleResult {
        Ok(self.carrier.find(val))
    }

    fn fresh(&self) -> Result<Ob, SampleEscape> {
        match self.carrier.insert() {
            0 => Err(SampleEscape::Full),
            val => Ok(val),
        }
    }
}

impl SamplePolicy for GrowingPolicy<'_> {
    fn sample_nullary(&self, fun: &NullaryFunction) -> SampleResult {
        match fun.find() {
            0 => {
                let val = self.fresh()?;
                fun.insert(val);
                Err(SampleEscape::Inserted(val))
            }
            val => self.found(val),
        }
    }

    fn sample_injective(&self, fun: &InjectiveFunction, key: Ob) -> SampleResult {
        match fun.find(key) {
            0 => {
                let val = self.fresh()?;
                fun.insert(key, val);
                Err(SampleEscape::Inserted(val))
            }
            val => self.found(val),
        }
    }

    fn sample_binary(&self, fun: &BinaryFunction, lhs: Ob, rhs: Ob) -> SampleResult {
        match fun.find(lhs, rhs) {
            0 => {
                let val = self.fresh()?;
                fun.insert(lhs, rhs, val);
                Err(SampleEscape::Inserted(val))
            }
            val => self.found(val),
        }
    }

    fn sample_symmetric(&self, fun: &SymmetricFunction, lhs: Ob, rhs: Ob) -> SampleResult {
        match fun.find(lhs, rhs) {
            0 => {
                let val = self.fresh()?;
                fun.insert(lhs, rhs, val);
                Err(SampleEscape::Inserted(val))
            }
            val => self.found(val),
        }
    }
}

/// Samples within the existing structure, collecting a bounded subset of obs.
///
/// An undefined point rejects the descent; a point outside the subset joins it
/// (ending the sample) until the capacity is reached.
pub struct RestrictedPolicy<'a> {
    carrier: &'a Carrier,
    sampled: DenseSet,
    size: AtomicUsize,
    capacity: usize,
}

impl<'a> RestrictedPolicy<'a> {
    pub fn new(carrier: &'a Carrier, capacity: usize) -> RestrictedPolicy<'a> {
        RestrictedPolicy {
            sampled: DenseSet::new(carrier.item_dim()),
            size: AtomicUsize::new(0),
            capacity,
            carrier,
        }
    }

    /// The obs collected so far.
    pub fn sampled(&self) -> &DenseSet {
        &self.sampled
    }

    fn admit(&self, val: Ob) -> SampleResult {
        if val == 0 {
            return Err(SampleEscape::Rejected);
        }
        let val = self.carrier.find(val);
        if self.sampled.contains(val) {
            return Ok(val);
        }
        if self.size.load(Ordering::Relaxed) >= self.capacity {
            return Err(SampleEscape::Full);
        }
        if self.sampled.try_insert(val) {
            self.size.fetch_add(1, Ordering::Relaxed);
        }
        Err(SampleEscape::Inserted(val))
    }
}

impl SamplePolicy for RestrictedPolicy<'_> {
    fn sample_nullary(&self, fun: &NullaryFunction) -> SampleResult {
        self.admit(fun.find())
    }

    fn sample_injective(&self, fun: &InjectiveFunction, key: Ob) -> SampleResult {
        self.admit(fun.find(key))
    }

    fn sample_binary(&self, fun: &BinaryFunction, lhs: Ob, rhs: Ob) -> SampleResult {
        self.admit(fun.find(lhs, rhs))
    }

    fn sample_symmetric(&self, fun: &SymmetricFunction, lhs: Ob, rhs: Ob) -> SampleResult {
        self.admit(fun.find(lhs, rhs))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Arity {
    Nullary,
    Injective,
    Binary,
    Symmetric,
}

/// Weights for one depth bound: total term weight at this depth, and the
/// conditional distribution over the arity of a compound wrapper.
#[derive(Clone, Copy, Default)]
struct BoundedSampler {
    injective: f32,
    binary: f32,
    symmetric: f32,
    total: f32,
    compound_injective: f32,
    compound_binary: f32,
    compound_symmetric: f32,
    compound_total: f32,
}

impl BoundedSampler {
    /// Depth 0: only nullary terms.
    fn base(sampler: &Sampler) -> BoundedSampler {
        BoundedSampler {
            total: sampler.nullary_prob,
            ..BoundedSampler::default()
        }
    }

    /// Depth `d + 1` from depth `d`.
    fn step(sampler: &Sampler, prev: &BoundedSampler) -> BoundedSampler {
        let injective = sampler.injective_prob * prev.total;
        let binary = sampler.binary_prob * (prev.total * prev.total);
        let symmetric = sampler.symmetric_prob * (prev.total * prev.total);
        let compound_injective = sampler.injective_prob;
        let compound_binary = sampler.binary_prob * prev.total;
        let compound_symmetric = sampler.symmetric_prob * prev.total;
        BoundedSampler {
            injective,
            binary,
            symmetric,
            total: sampler.nullary_prob + injective + binary + symmetric,
            compound_injective,
            compound_binary,
            compound_symmetric,
            compound_total: compound_injective + compound_binary + compound_symmetric,
        }
    }

    fn sample_arity(&self, rng: &mut dyn RngCore) -> Arity {
        debug_assert!(self.total > 0.0, "zero probability mass");
        debug_assert!(
            self.total > self.injective + self.binary + self.symmetric,
            "nullary terms must carry weight"
        );
        let mut point = rng.random::<f32>() * self.total;
        if self.binary > 0.0 {
            point -= self.binary;
            if point < 0.0 {
                return Arity::Binary;
            }
        }
        if self.symmetric > 0.0 {
            point -= self.symmetric;
            if point < 0.0 {
                return Arity::Symmetric;
            }
        }
        if self.injective > 0.0 {
            point -= self.injective;
            if point < 0.0 {
                return Arity::Injective;
            }
        }
        Arity::Nullary
    }

    fn sample_compound_arity(&self, rng: &mut dyn RngCore) -> Arity {
        debug_assert!(self.compound_total > 0.0, "zero compound probability mass");
        debug_assert!(
            self.compound_binary > 0.0,
            "binary terms must carry weight"
        );
        let mut point = rng.random::<f32>() * self.compound_total;
        if self.compound_symmetric > 0.0 {
            point -= self.compound_symmetric;
            if point < 0.0 {
                return Arity::Symmetric;
            }
        }
        if self.compound_injective > 0.0 {
            point -= self.compound_injective;
            if point < 0.0 {
                return Arity::Injective;
            }
        }
        Arity::Binary
    }
}

/// Picks a key from a weighted list.
///
/// Rounding error can leave the point past the last entry; resample when it
/// does.
fn pick<K: Copy>(probs: &[(K, f32)], total: f32, rng: &mut dyn RngCore) -> K {
    debug_assert!(!probs.is_empty(), "picking from an empty weight table");
    loop {
        let mut point = rng.random::<f32>() * total;
        for &(key, prob) in probs {
            point -= prob;
            if point < 0.0 {
                return key;
            }
        }
    }
}

/// The term sampler.
pub struct Sampler {
    nullary_probs: Vec<(NullaryFunctionKey, f32)>,
    injective_probs: Vec<(InjectiveFunctionKey, f32)>,
    binary_probs: Vec<(BinaryFunctionKey, f32)>,
    symmetric_probs: Vec<(SymmetricFunctionKey, f32)>,

    nullary_prob: f32,
    injective_prob: f32,
    binary_prob: f32,
    symmetric_prob: f32,

    bounded_samplers: RwLock<Vec<BoundedSampler>>,

    sample_count: AtomicU64,
    reject_count: AtomicU64,
    arity_sample_count: AtomicU64,
    compound_arity_sample_count: AtomicU64,
}

impl Default for Sampler {
    fn default() -> Self {
        Sampler::new()
    }
}

impl Sampler {
    pub fn new() -> Sampler {
        Sampler {
            nullary_probs: Vec::new(),
            injective_probs: Vec::new(),
            binary_probs: Vec::new(),
            symmetric_probs: Vec::new(),
            nullary_prob: 0.0,
            injective_prob: 0.0,
            binary_prob: 0.0,
            symmetric_prob: 0.0,
            bounded_samplers: RwLock::new(Vec::new()),
            sample_count: AtomicU64::new(0),
            reject_count: AtomicU64::new(0),
            arity_sample_count: AtomicU64::new(0),
            compound_arity_sample_count: AtomicU64::new(0),
        }
    }

    /// Sets the weight of the function named `name`, which must exist in
    /// `signature`.
    pub fn set_prob(&mut self, signature: &Signature, name: &str, prob: f32) {
        let found = self.try_set_nullary(signature, name, prob)
            || self.try_set_injective(signature, name, prob)
            || self.try_set_binary(signature, name, prob)
            || self.try_set_symmetric(signature, name, prob);
        assert!(found, "failed to set prob of function: {name}");
        self.bounded_samplers.write().unwrap().clear();
        log::debug!(target: targets::SAMPLER, "set P({name}) = {prob}");
    }

    fn try_set_nullary(&mut self, signature: &Signature, name: &str, prob: f32) -> bool {
        match signature.nullary_function_by_name(name) {
            Some(key) => {
                set_weight(&mut self.nullary_probs, key, prob);
                self.nullary_prob = total_weight(&self.nullary_probs);
                true
            }
            None => false,
        }
    }

    fn try_set_injective(&mut self, signature: &Signature, name: &str, prob: f32) -> bool {
        match signature.injective_function_by_name(name) {
            Some(key) => {
                set_weight(&mut self.injective_probs, key, prob);
                self.injective_prob = total_weight(&self.injective_probs);
                true
            }
            None => false,
        }
    }

    fn try_set_binary(&mut self, signature: &Signature, name: &str, prob: f32) -> bool {
        match signature.binary_function_by_name(name) {
            Some(key) => {
                set_weight(&mut self.binary_probs, key, prob);
                self.binary_prob = total_weight(&self.binary_probs);
                true
            }
            None => false,
        }
    }

    fn try_set_symmetric(&mut self, signature: &Signature, name: &str, prob: f32) -> bool {
        match signature.symmetric_function_by_name(name) {
            Some(key) => {
                set_weight(&mut self.symmetric_probs, key, prob);
                self.symmetric_prob = total_weight(&self.symmetric_probs);
                true
            }
            None => false,
        }
    }

    /// Checks that the weights form a distribution the implementation can
    /// sample from.
    pub fn validate(&self) {
        let total =
            self.nullary_prob + self.injective_prob + self.binary_prob + self.symmetric_prob;
        let tolerance = 1e-6;
        assert!(
            (total - 1.0).abs() <= tolerance,
            "function weights sum to {total}, not 1"
        );
        assert!(self.nullary_prob > 0.0, "nullary terms must carry weight");
        assert!(self.binary_prob > 0.0, "binary terms must carry weight");
    }

    /// The entry for `max_depth`, extending the ladder as needed.
    fn bounded_sampler(&self, max_depth: usize) -> BoundedSampler {
        loop {
            {
                let ladder = self.bounded_samplers.read().unwrap();
                if max_depth < ladder.len() {
                    return ladder[max_depth];
                }
            }
            {
                // Grow by one rung; racing growers may overgrow slightly.
                let mut ladder = self.bounded_samplers.write().unwrap();
                let next = match ladder.last() {
                    None => BoundedSampler::base(self),
                    Some(prev) => BoundedSampler::step(self, prev),
                };
                ladder.push(next);
            }
        }
    }

    /// Samples one random term, inserting it via `policy`.
    ///
    /// Retries on rejection; returns the inserted ob, or
    /// [SampleError::Full] when no ob can be created.
    pub fn try_insert_random(
        &self,
        rng: &mut dyn RngCore,
        signature: &Signature,
        policy: &dyn SamplePolicy,
    ) -> Result<Ob, SampleError> {
        loop {
            match self.grow_once(rng, signature, policy) {
                Err(SampleEscape::Inserted(ob)) => {
                    self.sample_count.fetch_add(1, Ordering::Relaxed);
                    return Ok(ob);
                }
                Err(SampleEscape::Rejected) => {
                    self.reject_count.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
                Err(SampleEscape::Full) => return Err(SampleError::Full),
                Ok(_) => unreachable!("the compound loop only exits by escape"),
            }
        }
    }

    /// One descent: a nullary seed wrapped in ever-deeper compounds until an
    /// escape fires.
    fn grow_once(
        &self,
        rng: &mut dyn RngCore,
        signature: &Signature,
        policy: &dyn SamplePolicy,
    ) -> SampleResult {
        let mut ob = self.insert_random_nullary(rng, signature, policy)?;
        let mut max_depth = 1;
        loop {
            ob = self.insert_random_compound(ob, max_depth, rng, signature, policy)?;
            max_depth += 1;
        }
    }

    /// A random term of depth at most `max_depth`.
    fn insert_random(
        &self,
        max_depth: usize,
        rng: &mut dyn RngCore,
        signature: &Signature,
        policy: &dyn SamplePolicy,
    ) -> SampleResult {
        let bounded = self.bounded_sampler(max_depth);
        self.arity_sample_count.fetch_add(1, Ordering::Relaxed);
        match bounded.sample_arity(rng) {
            Arity::Nullary => self.insert_random_nullary(rng, signature, policy),
            Arity::Injective => {
                debug_assert!(max_depth > 0, "compound term at depth 0");
                let key = self.insert_random(max_depth - 1, rng, signature, policy)?;
                self.insert_random_injective(key, rng, signature, policy)
            }
            Arity::Binary => {
                debug_assert!(max_depth > 0, "compound term at depth 0");
                let lhs = self.insert_random(max_depth - 1, rng, signature, policy)?;
                let rhs = self.insert_random(max_depth - 1, rng, signature, policy)?;
                self.insert_random_binary(lhs, rhs, rng, signature, policy)
            }
            Arity::Symmetric => {
                debug_assert!(max_depth > 0, "compound term at depth 0");
                let lhs = self.insert_random(max_depth - 1, rng, signature, policy)?;
                let rhs = self.insert_random(max_depth - 1, rng, signature, policy)?;
                self.insert_random_symmetric(lhs, rhs, rng, signature, policy)
            }
        }
    }

    /// Wraps `ob` in one compound of depth at most `max_depth`.
    fn insert_random_compound(
        &self,
        ob: Ob,
        max_depth: usize,
        rng: &mut dyn RngCore,
        signature: &Signature,
        policy: &dyn SamplePolicy,
    ) -> SampleResult {
        debug_assert!(max_depth > 0, "compound term at depth 0");
        let bounded = self.bounded_sampler(max_depth);
        self.compound_arity_sample_count
            .fetch_add(1, Ordering::Relaxed);
        match bounded.sample_compound_arity(rng) {
            Arity::Nullary => unreachable!("a compound is never nullary"),
            Arity::Injective => self.insert_random_injective(ob, rng, signature, policy),
            Arity::Binary => {
                let other = self.insert_random(max_depth - 1, rng, signature, policy)?;
                let (lhs, rhs) = if rng.random_bool(0.5) {
                    (other, ob)
                } else {
                    (ob, other)
                };
                self.insert_random_binary(lhs, rhs, rng, signature, policy)
            }
            Arity::Symmetric => {
                let other = self.insert_random(max_depth - 1, rng, signature, policy)?;
                self.insert_random_symmetric(ob, other, rng, signature, policy)
            }
        }
    }

    fn insert_random_nullary(
        &self,
        rng: &mut dyn RngCore,
        signature: &Signature,
        policy: &dyn SamplePolicy,
    ) -> SampleResult {
        let key = pick(&self.nullary_probs, self.nullary_prob, rng);
        policy.sample_nullary(signature.nullary_function(key))
    }

    fn insert_random_injective(
        &self,
        arg: Ob,
        rng: &mut dyn RngCore,
        signature: &Signature,
        policy: &dyn SamplePolicy,
    ) -> SampleResult {
        let key = pick(&self.injective_probs, self.injective_prob, rng);
        policy.sample_injective(signature.injective_function(key), arg)
    }

    fn insert_random_binary(
        &self,
        lhs: Ob,
        rhs: Ob,
        rng: &mut dyn RngCore,
        signature: &Signature,
        policy: &dyn SamplePolicy,
    ) -> SampleResult {
        let key = pick(&self.binary_probs, self.binary_prob, rng);
        policy.sample_binary(signature.binary_function(key), lhs, rhs)
    }

    fn insert_random_symmetric(
        &self,
        lhs: Ob,
        rhs: Ob,
        rng: &mut dyn RngCore,
        signature: &Signature,
        policy: &dyn SamplePolicy,
    ) -> SampleResult {
        let key = pick(&self.symmetric_probs, self.symmetric_prob, rng);
        policy.sample_symmetric(signature.symmetric_function(key), lhs, rhs)
    }

    // ------------------------------------------------------------------
    // Counters

    pub fn sample_count(&self) -> u64 {
        self.sample_count.load(Ordering::Relaxed)
    }

    pub fn reject_count(&self) -> u64 {
        self.reject_count.load(Ordering::Relaxed)
    }

    pub fn arity_sample_count(&self) -> u64 {
        self.arity_sample_count.load(Ordering::Relaxed)
    }

    pub fn compound_arity_sample_count(&self) -> u64 {
        self.compound_arity_sample_count.load(Ordering::Relaxed)
    }

    pub fn log_stats(&self) {
        log::info!(
            target: targets::SAMPLER,
            "samples = {}, rejections = {}, arity draws = {}, compound arity draws = {}",
            self.sample_count(),
            self.reject_count(),
            self.arity_sample_count(),
            self.compound_arity_sample_count()
        );
    }
}

fn set_weight<K: PartialEq>(probs: &mut Vec<(K, f32)>, key: K, prob: f32) {
    if let Some(entry) = probs.iter_mut().find(|(existing, _)| *existing == key) {
        entry.1 = prob;
        return;
    }
    probs.push((key, prob));
}

fn total_weight<K>(probs: &[(K, f32)]) -> f32 {
    probs.iter().map(|(_, prob)| prob).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generic::split_mix::SplitMix64;
    use rand_core::SeedableRng;
    use std::sync::Arc;

    fn test_signature(item_dim: usize) -> (Arc<Carrier>, Signature) {
        let carrier = Arc::new(Carrier::new(item_dim, None));
        let mut signature = Signature::new(Arc::clone(&carrier));
        signature.declare_nullary_function("K", NullaryFunction::new(Arc::clone(&carrier)));
        signature.declare_nullary_function("S", NullaryFunction::new(Arc::clone(&carrier)));
        signature.declare_binary_function("APP", BinaryFunction::new(Arc::clone(&carrier)));
        signature.declare_symmetric_function("JOIN", SymmetricFunction::new(Arc::clone(&carrier)));
        (carrier, signature)
    }

    fn weighted_sampler(signature: &Signature) -> Sampler {
        let mut sampler = Sampler::new();
        sampler.set_prob(signature, "K", 0.3);
        sampler.set_prob(signature, "S", 0.3);
        sampler.set_prob(signature, "APP", 0.3);
        sampler.set_prob(signature, "JOIN", 0.1);
        sampler.validate();
        sampler
    }

    #[test]
    fn ladder_base_holds_nullary_mass() {
        let (_carrier, signature) = test_signature(64);
        let sampler = weighted_sampler(&signature);

        let base = sampler.bounded_sampler(0);
        assert!((base.total - 0.6).abs() < 1e-6);
        assert_eq!(base.compound_total, 0.0);

        let one = sampler.bounded_sampler(1);
        assert!(one.total > base.total - 1e-6);
        assert!(one.compound_total > 0.0);
    }

    #[test]
    fn growing_fills_the_carrier() {
        let (carrier, signature) = test_signature(32);
        let sampler = weighted_sampler(&signature);
        let policy = GrowingPolicy::new(&carrier);
        let mut rng = SplitMix64::from_seed(42u64.to_le_bytes());

        let mut inserted = 0;
        loop {
            match sampler.try_insert_random(&mut rng, &signature, &policy) {
                Ok(ob) => {
                    assert!(carrier.contains(ob));
                    inserted += 1;
                }
                Err(SampleError::Full) => break,
            }
        }

        assert_eq!(inserted, 32);
        assert_eq!(carrier.item_count(), 32);
        assert_eq!(sampler.sample_count(), 32);
        assert!(sampler.arity_sample_count() + sampler.compound_arity_sample_count() > 0);
    }

    #[test]
    fn restricted_sampling_stays_within_structure() {
        let (carrier, signature) = test_signature(64);
        let grow_sampler = weighted_sampler(&signature);
        {
            let policy = GrowingPolicy::new(&carrier);
            let mut rng = SplitMix64::from_seed(7u64.to_le_bytes());
            for _ in 0..40 {
                if grow_sampler
                    .try_insert_random(&mut rng, &signature, &policy)
                    .is_err()
                {
                    break;
                }
            }
        }

        let sampler = weighted_sampler(&signature);
        let policy = RestrictedPolicy::new(&carrier, 10);
        let mut rng = SplitMix64::from_seed(8u64.to_le_bytes());

        let mut collected = 0;
        loop {
            match sampler.try_insert_random(&mut rng, &signature, &policy) {
                Ok(ob) => {
                    assert!(carrier.contains(ob));
                    collected += 1;
                }
                Err(SampleError::Full) => break,
            }
        }

        assert_eq!(collected, 10);
        assert_eq!(policy.sampled().count_items(), 10);
        assert!(
            policy
                .sampled()
                .as_set()
                .is_subset_of(carrier.support().as_set()),
            "restricted sampling escaped the structure"
        );
    }

    #[test]
    fn arity_draws_track_weights() {
        let (_carrier, signature) = test_signature(64);
        let sampler = weighted_sampler(&signature);
        let bounded = sampler.bounded_sampler(2);
        let mut rng = SplitMix64::from_seed(5u64.to_le_bytes());

        let draws = 20_000;
        let mut binary = 0u32;
        for _ in 0..draws {
            if bounded.sample_arity(&mut rng) == Arity::Binary {
                binary += 1;
            }
        }

        let expected = bounded.binary / bounded.total;
        let observed = binary as f32 / draws as f32;
        assert!(
            (observed - expected).abs() < 0.02,
            "observed {observed}, designed {expected}"
        );
    }
}
