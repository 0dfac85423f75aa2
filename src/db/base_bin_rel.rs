/*!
The row/column bit-matrix substrate shared by binary relations and functions.

A pair `(lhs, rhs)` is recorded twice: bit `rhs` of row `Lx[lhs]` and bit `lhs` of row `Rx[rhs]`, so both row and column iteration are cheap.
The symmetric variant aliases the two matrices, storing a symmetric matrix once and halving the work.

Rows are rounded up to whole cache lines ([round_item_dim](super::dense_set)), so each row is itself a well-aligned [DenseSetRef] and the word loops over rows vectorize.
Rows of obs outside the support are all zero.
*/

use std::sync::Arc;

use super::carrier::Carrier;
use super::dense_set::{
    alloc_lines, items_to_words, lines_as_words, round_item_dim, round_word_dim, AtomicWord,
    DenseSetRef, Line, WORDS_PER_LINE,
};
use super::Ob;

/// Paired `Lx`/`Rx` bit matrices over one carrier.
pub struct BaseBinRel {
    carrier: Arc<Carrier>,
    word_dim: usize,
    round_word_dim: usize,
    row_count: usize,
    lx_lines: Box<[Line]>,
    rx_lines: Option<Box<[Line]>>,
}

impl BaseBinRel {
    /// A fresh, empty square matrix pair.
    pub fn new_square(carrier: Arc<Carrier>) -> BaseBinRel {
        Self::new(carrier, false)
    }

    /// A fresh, empty symmetric matrix, with `Rx` aliasing `Lx`.
    pub fn new_symmetric(carrier: Arc<Carrier>) -> BaseBinRel {
        Self::new(carrier, true)
    }

    fn new(carrier: Arc<Carrier>, symmetric: bool) -> BaseBinRel {
        let item_dim = carrier.item_dim();
        let word_dim = items_to_words(item_dim);
        let round_word_dim = round_word_dim(item_dim);
        let row_count = 1 + round_item_dim(item_dim);
        let line_count = row_count * round_word_dim / WORDS_PER_LINE;
        BaseBinRel {
            carrier,
            word_dim,
            round_word_dim,
            row_count,
            lx_lines: alloc_lines(line_count),
            rx_lines: if symmetric {
                None
            } else {
                Some(alloc_lines(line_count))
            },
        }
    }

    pub fn carrier(&self) -> &Carrier {
        &self.carrier
    }

    pub fn item_dim(&self) -> usize {
        self.carrier.item_dim()
    }

    pub fn symmetric(&self) -> bool {
        self.rx_lines.is_none()
    }

    pub(crate) fn round_word_dim(&self) -> usize {
        self.round_word_dim
    }

    pub(crate) fn lx_words(&self) -> &[AtomicWord] {
        lines_as_words(&self.lx_lines)
    }

    pub(crate) fn rx_words(&self) -> &[AtomicWord] {
        lines_as_words(self.rx_lines.as_ref().unwrap_or(&self.lx_lines))
    }

    fn row<'a>(&self, words: &'a [AtomicWord], index: Ob) -> DenseSetRef<'a> {
        debug_assert!((index as usize) < self.row_count, "row {index} out of range");
        let offset = index as usize * self.round_word_dim;
        DenseSetRef::from_words(self.item_dim(), &words[offset..offset + self.word_dim])
    }

    /// The row of right operands paired with `lhs`.
    pub fn lx_set(&self, lhs: Ob) -> DenseSetRef<'_> {
        self.row(self.lx_words(), lhs)
    }

    /// The row of left operands paired with `rhs`.
    pub fn rx_set(&self, rhs: Ob) -> DenseSetRef<'_> {
        self.row(self.rx_words(), rhs)
    }

    pub fn get_lx(&self, lhs: Ob, rhs: Ob) -> bool {
        self.lx_set(lhs).contains(rhs)
    }

    pub fn get_rx(&self, lhs: Ob, rhs: Ob) -> bool {
        self.rx_set(rhs).contains(lhs)
    }

    /// A count of pairs; slow.
    pub fn count_pairs(&self) -> usize {
        self.carrier
            .iter()
            .map(|lhs| self.lx_set(lhs).count_items())
            .sum()
    }

    /// Empties both matrices.
    pub fn clear(&mut self) {
        for word in self.lx_words() {
            word.store(0, std::sync::atomic::Ordering::Relaxed);
        }
        if !self.symmetric() {
            for word in self.rx_words() {
                word.store(0, std::sync::atomic::Ordering::Relaxed);
            }
        }
    }

    /// Rebuilds `Rx` from `Lx` by transposition; the single-threaded build path.
    pub fn copy_lx_to_rx(&mut self) {
        if self.symmetric() {
            return;
        }
        for word in self.rx_words() {
            word.store(0, std::sync::atomic::Ordering::Relaxed);
        }
        for lhs in 1..=self.item_dim() as Ob {
            for rhs in self.lx_set(lhs).iter() {
                self.rx_set(rhs).insert(lhs);
            }
        }
    }

    /// Checks Lx/Rx agreement and emptiness outside the support; slow.
    pub fn validate(&self) {
        let support = self.carrier.support();
        support.validate();

        for index in 0..self.row_count {
            let supported = 1 <= index && index <= self.item_dim() && support.contains(index as Ob);
            if supported {
                let row = self.lx_set(index as Ob);
                row.validate();
                assert!(
                    row.is_subset_of(support.as_set()),
                    "Lx({index}) exceeds the support"
                );
                if !self.symmetric() {
                    let col = self.rx_set(index as Ob);
                    col.validate();
                    assert!(
                        col.is_subset_of(support.as_set()),
                        "Rx({index}) exceeds the support"
                    );
                }
            } else {
                let offset = index * self.round_word_dim;
                for words in [self.lx_words(), self.rx_words()] {
                    for word in &words[offset..offset + self.round_word_dim] {
                        assert_eq!(
                            word.load(std::sync::atomic::Ordering::Relaxed),
                            0,
                            "unsupported row {index} is not empty"
                        );
                    }
                }
            }
        }

        for lhs in self.carrier.iter() {
            for rhs in self.carrier.iter() {
                assert_eq!(
                    self.get_lx(lhs, rhs),
                    self.get_rx(lhs, rhs),
                    "Lx, Rx disagree at {lhs},{rhs}"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carrier_of(item_dim: usize, count: usize) -> Arc<Carrier> {
        let carrier = Arc::new(Carrier::new(item_dim, None));
        for _ in 0..count {
            carrier.insert();
        }
        carrier
    }

    #[test]
    fn square_rows_and_columns_agree() {
        let rel = BaseBinRel::new_square(carrier_of(70, 70));
        for (lhs, rhs) in [(1, 2), (2, 1), (64, 65), (70, 70)] {
            rel.lx_set(lhs).insert(rhs);
            rel.rx_set(rhs).insert(lhs);
        }

        assert!(rel.get_lx(1, 2));
        assert!(rel.get_rx(1, 2));
        assert!(!rel.get_lx(2, 64));
        assert_eq!(rel.count_pairs(), 4);
        rel.validate();
    }

    #[test]
    fn symmetric_aliases_rows() {
        let rel = BaseBinRel::new_symmetric(carrier_of(16, 16));
        rel.lx_set(3).insert(5);
        rel.lx_set(5).insert(3);

        assert!(rel.get_lx(3, 5));
        assert!(rel.get_rx(5, 3));
        rel.validate();
    }

    #[test]
    fn transpose_rebuilds_rx() {
        let mut rel = BaseBinRel::new_square(carrier_of(130, 130));
        for (lhs, rhs) in [(1, 100), (65, 2), (130, 130)] {
            rel.lx_set(lhs).insert(rhs);
        }

        rel.copy_lx_to_rx();

        for (lhs, rhs) in [(1, 100), (65, 2), (130, 130)] {
            assert!(rel.get_rx(lhs, rhs));
        }
        rel.validate();
    }
}
