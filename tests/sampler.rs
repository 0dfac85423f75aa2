//! Sampler behavior over a real signature: determinism, reachability, and
//! counter accounting.

use std::sync::Arc;

use rand_core::SeedableRng;

use pomagma::db::carrier::Carrier;
use pomagma::db::function::{BinaryFunction, NullaryFunction, SymmetricFunction};
use pomagma::db::signature::Signature;
use pomagma::generic::split_mix::SplitMix64;
use pomagma::sampler::{GrowingPolicy, Sampler};
use pomagma::types::err::SampleError;

fn build(item_dim: usize) -> (Arc<Carrier>, Signature, Sampler) {
    let carrier = Arc::new(Carrier::new(item_dim, None));
    let mut signature = Signature::new(Arc::clone(&carrier));
    signature.declare_nullary_function("K", NullaryFunction::new(Arc::clone(&carrier)));
    signature.declare_nullary_function("S", NullaryFunction::new(Arc::clone(&carrier)));
    signature.declare_binary_function("APP", BinaryFunction::new(Arc::clone(&carrier)));
    signature.declare_symmetric_function("JOIN", SymmetricFunction::new(Arc::clone(&carrier)));

    let mut sampler = Sampler::new();
    sampler.set_prob(&signature, "K", 0.25);
    sampler.set_prob(&signature, "S", 0.25);
    sampler.set_prob(&signature, "APP", 0.35);
    sampler.set_prob(&signature, "JOIN", 0.15);
    sampler.validate();

    (carrier, signature, sampler)
}

fn fill(seed: u64, carrier: &Carrier, signature: &Signature, sampler: &Sampler) -> u64 {
    let policy = GrowingPolicy::new(carrier);
    let mut rng = SplitMix64::from_seed(seed.to_le_bytes());
    let mut inserted = 0;
    loop {
        match sampler.try_insert_random(&mut rng, signature, &policy) {
            Ok(_) => inserted += 1,
            Err(SampleError::Full) => return inserted,
        }
    }
}

#[test]
fn sampling_is_deterministic_for_a_seed() {
    let (carrier_a, signature_a, sampler_a) = build(128);
    let (carrier_b, signature_b, sampler_b) = build(128);

    fill(99, &carrier_a, &signature_a, &sampler_a);
    fill(99, &carrier_b, &signature_b, &sampler_b);

    assert_eq!(carrier_a.item_count(), carrier_b.item_count());

    let app_a = signature_a.binary_function(signature_a.binary_function_by_name("APP").unwrap());
    let app_b = signature_b.binary_function(signature_b.binary_function_by_name("APP").unwrap());
    assert_eq!(app_a.count_pairs(), app_b.count_pairs());
    for lhs in carrier_a.iter() {
        for rhs in app_a.iter_lhs(lhs).iter() {
            assert_eq!(app_a.find(lhs, rhs), app_b.find(lhs, rhs));
        }
    }
}

#[test]
fn every_sampled_ob_is_some_value() {
    let (carrier, signature, sampler) = build(256);
    let inserted = fill(7, &carrier, &signature, &sampler);

    assert_eq!(inserted as usize, carrier.item_count());
    assert_eq!(inserted, sampler.sample_count());
    signature.validate();

    let k = signature
        .nullary_function(signature.nullary_function_by_name("K").unwrap())
        .find();
    let s = signature
        .nullary_function(signature.nullary_function_by_name("S").unwrap())
        .find();
    let app = signature.binary_function(signature.binary_function_by_name("APP").unwrap());
    let join = signature.symmetric_function(signature.symmetric_function_by_name("JOIN").unwrap());

    let mut app_values = 0;
    let mut join_values = 0;
    for ob in carrier.iter() {
        if ob == k || ob == s {
            continue;
        }
        let from_app = !app.iter_val(ob).is_empty();
        let from_join = !join.iter_val(ob).is_empty();
        assert!(
            from_app || from_join,
            "ob {ob} was sampled but no function produces it"
        );
        app_values += from_app as u64;
        join_values += from_join as u64;
    }

    // with these weights both compound kinds appear
    assert!(app_values > 0, "no application was sampled");
    assert!(join_values > 0, "no join was sampled");
}

#[test]
fn counters_account_for_every_draw() {
    let (carrier, signature, sampler) = build(64);
    fill(3, &carrier, &signature, &sampler);

    assert_eq!(sampler.sample_count(), 64);
    assert_eq!(sampler.reject_count(), 0, "the growing policy never rejects");
    assert!(
        sampler.compound_arity_sample_count() > 0,
        "no compound wrapper was ever drawn"
    );
}
