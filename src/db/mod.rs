/*!
The databases in which a structure is stored.

A structure is a [carrier](carrier::Carrier) of live obs together with the relation and function tables of a [signature](signature::Signature), all sized against a fixed `item_dim` chosen at construction.
Memory for every table is allocated once, up front; resizing is an out-of-core operation performed by collaborators which rebuild a signature through the `raw_insert` bulk-load surfaces.

Tables support concurrent reads and inserts through shared references --- cells are atomics, and the insert paths are lock-free apart from the per-table readers-writer locks which serialize inserts against the destructive `unsafe_merge` rewrites.
*/

pub mod base_bin_rel;
pub mod carrier;
pub mod dense_set;
pub mod function;
pub mod keys;
pub mod relation;
pub mod signature;

/// An abstract object: a 1-based index into every table of a structure.
///
/// `0` denotes "none", and is never a valid ob.
pub type Ob = u32;

/// The atomic cell in which an [Ob] is stored.
pub type AtomicOb = std::sync::atomic::AtomicU32;
