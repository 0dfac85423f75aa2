//! Predicates on obs: unary subsets of the support and binary bit-matrices.

mod binary;
mod unary;

pub use binary::BinaryRelation;
pub use unary::UnaryRelation;
