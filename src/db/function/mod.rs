/*!
Partial functions on obs.

Four arities are supported, all sharing a contract:

- [insert](BinaryFunction::insert) binds an unbound point atomically, flips the defined bit, and fires the insert callback; a colliding bind merges the two values through [ensure_equal](crate::db::carrier::Carrier::ensure_equal) instead.
- `raw_insert` is the unconditional bulk-load path.
- `unsafe_merge(dep)` rewrites every occurrence of a merged-away ob --- as an argument and as a value --- to its representative, preserving the inverse indices; value collisions discovered along the way are themselves rescheduled as carrier merges.

The value cells are the source of truth; the defined bit-sets lag them, which readers tolerate by loading values with acquire ordering.
*/

mod binary;
mod injective;
mod inverse;
mod nullary;
mod symmetric;

pub use binary::BinaryFunction;
pub use injective::InjectiveFunction;
pub use nullary::NullaryFunction;
pub use symmetric::SymmetricFunction;

use super::{AtomicOb, Ob};

/// Callback fired when a nullary function becomes defined.
pub type NullaryInsertCallback = Box<dyn Fn() + Send + Sync>;

/// Callback fired with the key of each freshly defined point.
pub type InjectiveInsertCallback = Box<dyn Fn(Ob) + Send + Sync>;

/// Callback fired with the argument pair of each freshly defined point.
pub type BinaryInsertCallback = Box<dyn Fn(Ob, Ob) + Send + Sync>;

/// Obs per side of a value tile; a 4×4 tile of 32-bit obs is one cache line.
const ITEMS_PER_TILE: usize = 4;

/// A cache-line-aligned tile of value cells.
#[repr(C, align(64))]
struct Tile([AtomicOb; ITEMS_PER_TILE * ITEMS_PER_TILE]);

impl Tile {
    fn zeroed() -> Tile {
        Tile(std::array::from_fn(|_| AtomicOb::new(0)))
    }
}

fn alloc_tiles(tile_count: usize) -> Box<[Tile]> {
    let mut tiles = Vec::with_capacity(tile_count);
    tiles.resize_with(tile_count, Tile::zeroed);
    tiles.into_boxed_slice()
}

/// Tiles covering `0..=item_dim` per side.
fn tile_dim(item_dim: usize) -> usize {
    (item_dim + ITEMS_PER_TILE) / ITEMS_PER_TILE
}

/// Unordered pairs `(i, j)` with `i <= j < n`.
fn unordered_pair_count(n: usize) -> usize {
    n * (n + 1) / 2
}
