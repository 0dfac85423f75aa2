/*!
A signature: named relations and functions over one shared carrier.

The signature exclusively owns its tables; the carrier is shared (through an [Arc]) with the tables themselves, which need it for equivalence queries and merge rescheduling.
Declaration happens once, single-threaded, before any engine runs: declare each table, wire its insert callback, and hand the signature by shared reference to the executor.

[unsafe_merge](Signature::unsafe_merge) is the one structure-wide rewrite: it applies a merged-away ob's elimination to every table, and is what a merge task executes under the scheduler's exclusive lock.
*/

use std::sync::Arc;

use crate::misc::log::targets;

use super::carrier::Carrier;
use super::function::{BinaryFunction, InjectiveFunction, NullaryFunction, SymmetricFunction};
use super::keys::{
    BinaryFunctionKey, BinaryRelationKey, InjectiveFunctionKey, NullaryFunctionKey,
    SymmetricFunctionKey, UnaryRelationKey,
};
use super::relation::{BinaryRelation, UnaryRelation};
use super::Ob;

/// Named tables over one carrier.
pub struct Signature {
    carrier: Arc<Carrier>,
    unary_relations: Vec<(String, UnaryRelation)>,
    binary_relations: Vec<(String, BinaryRelation)>,
    nullary_functions: Vec<(String, NullaryFunction)>,
    injective_functions: Vec<(String, InjectiveFunction)>,
    binary_functions: Vec<(String, BinaryFunction)>,
    symmetric_functions: Vec<(String, SymmetricFunction)>,
}

impl Signature {
    pub fn new(carrier: Arc<Carrier>) -> Signature {
        Signature {
            carrier,
            unary_relations: Vec::new(),
            binary_relations: Vec::new(),
            nullary_functions: Vec::new(),
            injective_functions: Vec::new(),
            binary_functions: Vec::new(),
            symmetric_functions: Vec::new(),
        }
    }

    pub fn carrier(&self) -> &Arc<Carrier> {
        &self.carrier
    }

    pub fn item_dim(&self) -> usize {
        self.carrier.item_dim()
    }

    fn assert_fresh(&self, name: &str) {
        assert!(
            self.unary_relation_by_name(name).is_none()
                && self.binary_relation_by_name(name).is_none()
                && self.nullary_function_by_name(name).is_none()
                && self.injective_function_by_name(name).is_none()
                && self.binary_function_by_name(name).is_none()
                && self.symmetric_function_by_name(name).is_none(),
            "declared {name} twice"
        );
    }

    /// The conventional negation pairing.
    pub fn negate(&self, name: &str) -> Option<&'static str> {
        match name {
            "LESS" => Some("NLESS"),
            "NLESS" => Some("LESS"),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Declaration

    pub fn declare_unary_relation(&mut self, name: &str, rel: UnaryRelation) -> UnaryRelationKey {
        self.assert_fresh(name);
        self.unary_relations.push((name.to_owned(), rel));
        UnaryRelationKey((self.unary_relations.len() - 1) as u16)
    }

    pub fn declare_binary_relation(&mut self, name: &str, rel: BinaryRelation) -> BinaryRelationKey {
        self.assert_fresh(name);
        self.binary_relations.push((name.to_owned(), rel));
        BinaryRelationKey((self.binary_relations.len() - 1) as u16)
    }

    pub fn declare_nullary_function(
        &mut self,
        name: &str,
        fun: NullaryFunction,
    ) -> NullaryFunctionKey {
        self.assert_fresh(name);
        self.nullary_functions.push((name.to_owned(), fun));
        NullaryFunctionKey((self.nullary_functions.len() - 1) as u16)
    }

    pub fn declare_injective_function(
        &mut self,
        name: &str,
        fun: InjectiveFunction,
    ) -> InjectiveFunctionKey {
        self.assert_fresh(name);
        self.injective_functions.push((name.to_owned(), fun));
        InjectiveFunctionKey((self.injective_functions.len() - 1) as u16)
    }

    pub fn declare_binary_function(
        &mut self,
        name: &str,
        fun: BinaryFunction,
    ) -> BinaryFunctionKey {
        self.assert_fresh(name);
        self.binary_functions.push((name.to_owned(), fun));
        BinaryFunctionKey((self.binary_functions.len() - 1) as u16)
    }

    pub fn declare_symmetric_function(
        &mut self,
        name: &str,
        fun: SymmetricFunction,
    ) -> SymmetricFunctionKey {
        self.assert_fresh(name);
        self.symmetric_functions.push((name.to_owned(), fun));
        SymmetricFunctionKey((self.symmetric_functions.len() - 1) as u16)
    }

    // ------------------------------------------------------------------
    // Lookup by key

    pub fn unary_relation(&self, key: UnaryRelationKey) -> &UnaryRelation {
        &self.unary_relations[key.index()].1
    }

    pub fn unary_relation_mut(&mut self, key: UnaryRelationKey) -> &mut UnaryRelation {
        &mut self.unary_relations[key.index()].1
    }

    pub fn binary_relation(&self, key: BinaryRelationKey) -> &BinaryRelation {
        &self.binary_relations[key.index()].1
    }

    pub fn binary_relation_mut(&mut self, key: BinaryRelationKey) -> &mut BinaryRelation {
        &mut self.binary_relations[key.index()].1
    }

    pub fn nullary_function(&self, key: NullaryFunctionKey) -> &NullaryFunction {
        &self.nullary_functions[key.index()].1
    }

    pub fn nullary_function_mut(&mut self, key: NullaryFunctionKey) -> &mut NullaryFunction {
        &mut self.nullary_functions[key.index()].1
    }

    pub fn injective_function(&self, key: InjectiveFunctionKey) -> &InjectiveFunction {
        &self.injective_functions[key.index()].1
    }

    pub fn injective_function_mut(&mut self, key: InjectiveFunctionKey) -> &mut InjectiveFunction {
        &mut self.injective_functions[key.index()].1
    }

    pub fn binary_function(&self, key: BinaryFunctionKey) -> &BinaryFunction {
        &self.binary_functions[key.index()].1
    }

    pub fn binary_function_mut(&mut self, key: BinaryFunctionKey) -> &mut BinaryFunction {
        &mut self.binary_functions[key.index()].1
    }

    pub fn symmetric_function(&self, key: SymmetricFunctionKey) -> &SymmetricFunction {
        &self.symmetric_functions[key.index()].1
    }

    pub fn symmetric_function_mut(&mut self, key: SymmetricFunctionKey) -> &mut SymmetricFunction {
        &mut self.symmetric_functions[key.index()].1
    }

    // ------------------------------------------------------------------
    // Lookup by name

    fn position<T>(tables: &[(String, T)], name: &str) -> Option<u16> {
        tables
            .iter()
            .position(|(table_name, _)| table_name == name)
            .map(|index| index as u16)
    }

    pub fn unary_relation_by_name(&self, name: &str) -> Option<UnaryRelationKey> {
        Self::position(&self.unary_relations, name).map(UnaryRelationKey)
    }

    pub fn binary_relation_by_name(&self, name: &str) -> Option<BinaryRelationKey> {
        Self::position(&self.binary_relations, name).map(BinaryRelationKey)
    }

    pub fn nullary_function_by_name(&self, name: &str) -> Option<NullaryFunctionKey> {
        Self::position(&self.nullary_functions, name).map(NullaryFunctionKey)
    }

    pub fn injective_function_by_name(&self, name: &str) -> Option<InjectiveFunctionKey> {
        Self::position(&self.injective_functions, name).map(InjectiveFunctionKey)
    }

    pub fn binary_function_by_name(&self, name: &str) -> Option<BinaryFunctionKey> {
        Self::position(&self.binary_functions, name).map(BinaryFunctionKey)
    }

    pub fn symmetric_function_by_name(&self, name: &str) -> Option<SymmetricFunctionKey> {
        Self::position(&self.symmetric_functions, name).map(SymmetricFunctionKey)
    }

    // ------------------------------------------------------------------
    // Iteration

    pub fn unary_relations(&self) -> impl Iterator<Item = (UnaryRelationKey, &str, &UnaryRelation)> {
        self.unary_relations
            .iter()
            .enumerate()
            .map(|(index, (name, rel))| (UnaryRelationKey(index as u16), name.as_str(), rel))
    }

    pub fn binary_relations(
        &self,
    ) -> impl Iterator<Item = (BinaryRelationKey, &str, &BinaryRelation)> {
        self.binary_relations
            .iter()
            .enumerate()
            .map(|(index, (name, rel))| (BinaryRelationKey(index as u16), name.as_str(), rel))
    }

    pub fn nullary_functions(
        &self,
    ) -> impl Iterator<Item = (NullaryFunctionKey, &str, &NullaryFunction)> {
        self.nullary_functions
            .iter()
            .enumerate()
            .map(|(index, (name, fun))| (NullaryFunctionKey(index as u16), name.as_str(), fun))
    }

    pub fn injective_functions(
        &self,
    ) -> impl Iterator<Item = (InjectiveFunctionKey, &str, &InjectiveFunction)> {
        self.injective_functions
            .iter()
            .enumerate()
            .map(|(index, (name, fun))| (InjectiveFunctionKey(index as u16), name.as_str(), fun))
    }

    pub fn binary_functions(
        &self,
    ) -> impl Iterator<Item = (BinaryFunctionKey, &str, &BinaryFunction)> {
        self.binary_functions
            .iter()
            .enumerate()
            .map(|(index, (name, fun))| (BinaryFunctionKey(index as u16), name.as_str(), fun))
    }

    pub fn symmetric_functions(
        &self,
    ) -> impl Iterator<Item = (SymmetricFunctionKey, &str, &SymmetricFunction)> {
        self.symmetric_functions
            .iter()
            .enumerate()
            .map(|(index, (name, fun))| (SymmetricFunctionKey(index as u16), name.as_str(), fun))
    }

    // ------------------------------------------------------------------
    // Structure-wide operations

    /// Rewrites a merged-away `dep` to its representative in every table.
    pub fn unsafe_merge(&self, dep: Ob) {
        log::debug!(target: targets::SIGNATURE, "merging ob {dep}");
        for (_, rel) in &self.unary_relations {
            rel.unsafe_merge(dep);
        }
        for (_, rel) in &self.binary_relations {
            rel.unsafe_merge(dep);
        }
        for (_, fun) in &self.nullary_functions {
            fun.unsafe_merge(dep);
        }
        for (_, fun) in &self.injective_functions {
            fun.unsafe_merge(dep);
        }
        for (_, fun) in &self.binary_functions {
            fun.unsafe_merge(dep);
        }
        for (_, fun) in &self.symmetric_functions {
            fun.unsafe_merge(dep);
        }
    }

    /// Recomputes derived state after a bulk load: carrier counters and the
    /// column matrices of binary relations.
    pub fn update(&mut self) {
        self.carrier.update();
        for (_, rel) in &mut self.binary_relations {
            rel.update();
        }
    }

    /// Empties every table; the carrier is untouched.
    pub fn clear(&mut self) {
        for (_, rel) in &mut self.unary_relations {
            rel.clear();
        }
        for (_, rel) in &mut self.binary_relations {
            rel.clear();
        }
        for (_, fun) in &mut self.nullary_functions {
            fun.clear();
        }
        for (_, fun) in &mut self.injective_functions {
            fun.clear();
        }
        for (_, fun) in &mut self.binary_functions {
            fun.clear();
        }
        for (_, fun) in &mut self.symmetric_functions {
            fun.clear();
        }
    }

    /// Checks every table, and disjointness of negation pairs; slow.
    pub fn validate(&self) {
        log::info!(target: targets::SIGNATURE, "validating signature");
        self.carrier.validate();
        for (_, rel) in &self.unary_relations {
            rel.validate();
        }
        for (_, rel) in &self.binary_relations {
            rel.validate();
        }
        for (_, fun) in &self.nullary_functions {
            fun.validate();
        }
        for (_, fun) in &self.injective_functions {
            fun.validate();
        }
        for (_, fun) in &self.binary_functions {
            fun.validate();
        }
        for (_, fun) in &self.symmetric_functions {
            fun.validate();
        }
        for (name, rel) in &self.binary_relations {
            if let Some(negated) = self.negate(name) {
                if name.as_str() < negated {
                    if let Some(other) = self.binary_relation_by_name(negated) {
                        rel.validate_disjoint(self.binary_relation(other));
                    }
                }
            }
        }
    }

    pub fn log_stats(&self) {
        self.carrier.log_stats();
        for (name, rel) in &self.unary_relations {
            rel.log_stats(name);
        }
        for (name, rel) in &self.binary_relations {
            rel.log_stats(name);
        }
        for (name, fun) in &self.nullary_functions {
            fun.log_stats(name);
        }
        for (name, fun) in &self.injective_functions {
            fun.log_stats(name);
        }
        for (name, fun) in &self.binary_functions {
            fun.log_stats(name);
        }
        for (name, fun) in &self.symmetric_functions {
            fun.log_stats(name);
        }
    }
}
