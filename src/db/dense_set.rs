/*!
A fixed-capacity bit-set of obs, with atomic bit operations and word-level set algebra.

Bit `i` records membership of ob `i`.
Bit `0` is reserved (an ob of `0` denotes "none"), which conveniently lets iterators signal exhaustion with a position of `0`.

# Storage

Words are [AtomicU64](std::sync::atomic::AtomicU64)s grouped into cache-line-aligned [Line]s, so row-per-ob tables built over the same storage ([base_bin_rel](crate::db::base_bin_rel)) keep each row cache aligned and the bulk word loops free to vectorize.
Two views exist:

- [DenseSet] owns its lines.
- [DenseSetRef] borrows a row of some larger table.

All operations are defined on [DenseSetRef] and forwarded by [DenseSet]; since every cell is atomic, mutation happens through shared references.

# Concurrency

Single-bit operations use relaxed fetch-or/fetch-and on the containing word, so racing inserts of distinct bits in one word cannot lose either bit.
The bulk algebra (`set_union` and friends) uses plain relaxed loads and stores and is *not* atomic with respect to concurrent single-bit writers; such calls are confined to merge rewrites and build paths, which the callers serialize.

Padding bits --- bit `0` and any bit above `item_dim` --- are zero after every operation; operations which could set them mask.
*/

use std::sync::atomic::{AtomicU64, Ordering};

use super::Ob;

/// A machine word of membership bits.
pub type Word = u64;

pub(crate) type AtomicWord = AtomicU64;

/// Bits per storage word.
pub(crate) const BITS_PER_WORD: usize = Word::BITS as usize;

/// Words per cache line.
pub(crate) const WORDS_PER_LINE: usize = 8;

/// Bits per cache line.
pub(crate) const BITS_PER_LINE: usize = BITS_PER_WORD * WORDS_PER_LINE;

/// A cache-line-aligned block of words.
#[repr(C, align(64))]
#[derive(Debug)]
pub(crate) struct Line(pub(crate) [AtomicWord; WORDS_PER_LINE]);

impl Line {
    fn zeroed() -> Line {
        Line(std::array::from_fn(|_| AtomicWord::new(0)))
    }
}

/// Allocates `line_count` zeroed lines.
pub(crate) fn alloc_lines(line_count: usize) -> Box<[Line]> {
    let mut lines = Vec::with_capacity(line_count);
    lines.resize_with(line_count, Line::zeroed);
    lines.into_boxed_slice()
}

/// Words required for obs `1..=item_dim`, with bit 0 reserved.
pub(crate) const fn items_to_words(item_dim: usize) -> usize {
    item_dim / BITS_PER_WORD + 1
}

/// Rounds an item dimension up so a row fills whole cache lines.
pub(crate) const fn round_item_dim(min_item_dim: usize) -> usize {
    (min_item_dim + BITS_PER_LINE) / BITS_PER_LINE * BITS_PER_LINE - 1
}

/// The row width, in words, of a table rounded via [round_item_dim].
pub(crate) const fn round_word_dim(min_item_dim: usize) -> usize {
    (min_item_dim + BITS_PER_LINE) / BITS_PER_LINE * WORDS_PER_LINE
}

/// Flattens a line block into its word array.
pub(crate) fn lines_as_words(lines: &[Line]) -> &[AtomicWord] {
    // Safety: Line is repr(C) over an AtomicWord array, so a line block is
    // one contiguous, properly aligned array of words.
    unsafe {
        std::slice::from_raw_parts(
            lines.as_ptr().cast::<AtomicWord>(),
            lines.len() * WORDS_PER_LINE,
        )
    }
}

/// An owning bit-set of obs `1..=item_dim`.
#[derive(Debug)]
pub struct DenseSet {
    item_dim: usize,
    word_dim: usize,
    lines: Box<[Line]>,
}

impl DenseSet {
    /// A fresh, empty set admitting obs `1..=item_dim`.
    pub fn new(item_dim: usize) -> DenseSet {
        debug_assert!(0 < item_dim, "empty dense set");
        debug_assert!(item_dim < Ob::MAX as usize, "dense set too large");
        let word_dim = items_to_words(item_dim);
        DenseSet {
            item_dim,
            word_dim,
            lines: alloc_lines(word_dim.div_ceil(WORDS_PER_LINE)),
        }
    }

    /// A borrowed view of the whole set.
    pub fn as_set(&self) -> DenseSetRef<'_> {
        DenseSetRef {
            item_dim: self.item_dim,
            words: &lines_as_words(&self.lines)[..self.word_dim],
        }
    }

    pub fn item_dim(&self) -> usize {
        self.item_dim
    }

    pub fn word_dim(&self) -> usize {
        self.word_dim
    }

    pub fn contains(&self, i: Ob) -> bool {
        self.as_set().contains(i)
    }

    /// Inserts `i`, which must not already be present.
    pub fn insert(&self, i: Ob) {
        self.as_set().insert(i)
    }

    /// Inserts `i`; returns false if `i` was already present.
    pub fn try_insert(&self, i: Ob) -> bool {
        self.as_set().try_insert(i)
    }

    /// Removes `i`, which must be present.
    pub fn remove(&self, i: Ob) {
        self.as_set().remove(i)
    }

    /// Removes `i`; returns false if `i` was already absent.
    pub fn try_remove(&self, i: Ob) -> bool {
        self.as_set().try_remove(i)
    }

    /// Removes the deprecated ob of a merge; see [DenseSetRef::merge_ob].
    pub fn merge_ob(&self, dep: Ob, rep: Ob) {
        self.as_set().merge_ob(dep, rep)
    }

    /// Inserts every ob `1..=item_dim`.
    pub fn insert_all(&self) {
        self.as_set().insert_all()
    }

    /// Claims the smallest absent ob; returns 0 when full.
    pub fn try_insert_one(&self) -> Ob {
        self.as_set().try_insert_one()
    }

    /// Empties the set.
    pub fn zero(&self) {
        self.as_set().zero()
    }

    pub fn is_empty(&self) -> bool {
        self.as_set().is_empty()
    }

    /// A population count; not fast.
    pub fn count_items(&self) -> usize {
        self.as_set().count_items()
    }

    pub fn iter(&self) -> Iter<'_> {
        self.as_set().iter()
    }

    /// Checks the padding-bit invariant.
    pub fn validate(&self) {
        self.as_set().validate()
    }
}

impl PartialEq for DenseSet {
    fn eq(&self, other: &Self) -> bool {
        self.as_set() == other.as_set()
    }
}

impl Eq for DenseSet {}

impl<'a> From<&'a DenseSet> for DenseSetRef<'a> {
    fn from(set: &'a DenseSet) -> DenseSetRef<'a> {
        set.as_set()
    }
}

/// A borrowed bit-set: either a whole [DenseSet] or one row of a table.
#[derive(Clone, Copy)]
pub struct DenseSetRef<'a> {
    item_dim: usize,
    words: &'a [AtomicWord],
}

impl<'a> DenseSetRef<'a> {
    /// A view over a row of `word_dim` words.
    pub(crate) fn from_words(item_dim: usize, words: &'a [AtomicWord]) -> DenseSetRef<'a> {
        debug_assert_eq!(words.len(), items_to_words(item_dim));
        DenseSetRef { item_dim, words }
    }

    pub fn item_dim(self) -> usize {
        self.item_dim
    }

    pub fn word_dim(self) -> usize {
        self.words.len()
    }

    fn assert_pos(self, i: Ob) {
        debug_assert!(
            0 < i && i as usize <= self.item_dim,
            "ob {i} out of range 1..={}",
            self.item_dim
        );
    }

    fn word(self, i: Ob) -> &'a AtomicWord {
        &self.words[i as usize / BITS_PER_WORD]
    }

    fn mask(i: Ob) -> Word {
        1 << (i as usize % BITS_PER_WORD)
    }

    pub fn contains(self, i: Ob) -> bool {
        self.assert_pos(i);
        self.word(i).load(Ordering::Relaxed) & Self::mask(i) != 0
    }

    /// Inserts `i`, which must not already be present.
    pub fn insert(self, i: Ob) {
        debug_assert!(!self.contains(i), "double insertion: {i}");
        self.word(i).fetch_or(Self::mask(i), Ordering::Relaxed);
    }

    /// Inserts `i`; returns false if `i` was already present.
    pub fn try_insert(self, i: Ob) -> bool {
        self.assert_pos(i);
        let prior = self.word(i).fetch_or(Self::mask(i), Ordering::Relaxed);
        prior & Self::mask(i) == 0
    }

    /// Removes `i`, which must be present.
    pub fn remove(self, i: Ob) {
        debug_assert!(self.contains(i), "double removal: {i}");
        self.word(i).fetch_and(!Self::mask(i), Ordering::Relaxed);
    }

    /// Removes `i`; returns false if `i` was already absent.
    pub fn try_remove(self, i: Ob) -> bool {
        self.assert_pos(i);
        let prior = self.word(i).fetch_and(!Self::mask(i), Ordering::Relaxed);
        prior & Self::mask(i) != 0
    }

    /// Removes the deprecated ob of a merge.
    ///
    /// Requires `dep > rep` and both present; only the `dep` bit changes.
    pub fn merge_ob(self, dep: Ob, rep: Ob) {
        debug_assert!(rep < dep, "merge out of order: {dep} into {rep}");
        debug_assert!(self.contains(dep), "merge dep not contained: {dep}");
        debug_assert!(self.contains(rep), "merge rep not contained: {rep}");
        self.word(dep).fetch_and(!Self::mask(dep), Ordering::Relaxed);
    }

    /// Inserts every ob `1..=item_dim`.
    pub fn insert_all(self) {
        let all = !(0 as Word);
        let word_dim = self.word_dim();
        if word_dim == 1 {
            let trim = BITS_PER_WORD - 1 - self.item_dim;
            self.words[0].store(all >> trim & !1, Ordering::Relaxed);
        } else {
            self.words[0].store(!1, Ordering::Relaxed);
            for word in &self.words[1..word_dim - 1] {
                word.store(all, Ordering::Relaxed);
            }
            let rem = (self.item_dim + 1) % BITS_PER_WORD;
            let last = if rem == 0 { all } else { all >> (BITS_PER_WORD - rem) };
            self.words[word_dim - 1].store(last, Ordering::Relaxed);
        }
    }

    /// Linearly scans for a free position and atomically claims it.
    ///
    /// Returns the claimed ob, or 0 when the set is full.
    pub fn try_insert_one(self) -> Ob {
        for (quot, word) in self.words.iter().enumerate() {
            let full: Word = if quot == 0 { !1 } else { !0 };
            if word.load(Ordering::Relaxed) != full {
                let start = if quot == 0 { 1 } else { 0 };
                for rem in start..BITS_PER_WORD {
                    let ob = (quot * BITS_PER_WORD + rem) as Ob;
                    if ob as usize <= self.item_dim && self.try_insert(ob) {
                        return ob;
                    }
                }
            }
        }
        0
    }

    /// Empties the set.
    pub fn zero(self) {
        for word in self.words {
            word.store(0, Ordering::Relaxed);
        }
    }

    pub fn is_empty(self) -> bool {
        self.words
            .iter()
            .all(|word| word.load(Ordering::Relaxed) == 0)
    }

    /// A population count; not fast.
    pub fn count_items(self) -> usize {
        self.words
            .iter()
            .map(|word| word.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }

    /// True if every member of `self` is a member of `other`.
    pub fn is_subset_of(self, other: DenseSetRef) -> bool {
        self.assert_same_dim(other);
        self.words
            .iter()
            .zip(other.words)
            .all(|(s, o)| s.load(Ordering::Relaxed) & !o.load(Ordering::Relaxed) == 0)
    }

    /// True if `self` and `other` share no member.
    pub fn disjoint(self, other: DenseSetRef) -> bool {
        self.assert_same_dim(other);
        self.words
            .iter()
            .zip(other.words)
            .all(|(s, o)| s.load(Ordering::Relaxed) & o.load(Ordering::Relaxed) == 0)
    }

    fn assert_same_dim(self, other: DenseSetRef) {
        debug_assert_eq!(self.item_dim, other.item_dim, "item_dim mismatch");
    }

    /// In-place union: `self |= other`.
    pub fn union_with(self, other: DenseSetRef) {
        self.assert_same_dim(other);
        for (s, o) in self.words.iter().zip(other.words) {
            s.fetch_or(o.load(Ordering::Relaxed), Ordering::Relaxed);
        }
    }

    /// In-place intersection: `self &= other`.
    pub fn intersect_with(self, other: DenseSetRef) {
        self.assert_same_dim(other);
        for (s, o) in self.words.iter().zip(other.words) {
            s.fetch_and(o.load(Ordering::Relaxed), Ordering::Relaxed);
        }
    }

    /// `self = lhs | rhs`.
    pub fn set_union(self, lhs: DenseSetRef, rhs: DenseSetRef) {
        self.assert_same_dim(lhs);
        self.assert_same_dim(rhs);
        for ((s, l), r) in self.words.iter().zip(lhs.words).zip(rhs.words) {
            s.store(
                l.load(Ordering::Relaxed) | r.load(Ordering::Relaxed),
                Ordering::Relaxed,
            );
        }
    }

    /// `self = lhs & rhs`.
    pub fn set_insn(self, lhs: DenseSetRef, rhs: DenseSetRef) {
        self.assert_same_dim(lhs);
        self.assert_same_dim(rhs);
        for ((s, l), r) in self.words.iter().zip(lhs.words).zip(rhs.words) {
            s.store(
                l.load(Ordering::Relaxed) & r.load(Ordering::Relaxed),
                Ordering::Relaxed,
            );
        }
    }

    /// `self = a & b & c`.
    pub fn set_insn3(self, a: DenseSetRef, b: DenseSetRef, c: DenseSetRef) {
        self.assert_same_dim(a);
        self.assert_same_dim(b);
        self.assert_same_dim(c);
        for (((s, a), b), c) in self.words.iter().zip(a.words).zip(b.words).zip(c.words) {
            s.store(
                a.load(Ordering::Relaxed) & b.load(Ordering::Relaxed) & c.load(Ordering::Relaxed),
                Ordering::Relaxed,
            );
        }
    }

    /// `self = pos & !neg`.
    pub fn set_diff(self, pos: DenseSetRef, neg: DenseSetRef) {
        self.assert_same_dim(pos);
        self.assert_same_dim(neg);
        for ((s, p), n) in self.words.iter().zip(pos.words).zip(neg.words) {
            s.store(
                p.load(Ordering::Relaxed) & !n.load(Ordering::Relaxed),
                Ordering::Relaxed,
            );
        }
    }

    /// `self = p1 & p2 & !n`.
    pub fn set_ppn(self, p1: DenseSetRef, p2: DenseSetRef, n: DenseSetRef) {
        self.assert_same_dim(p1);
        self.assert_same_dim(p2);
        self.assert_same_dim(n);
        for (((s, p1), p2), n) in self.words.iter().zip(p1.words).zip(p2.words).zip(n.words) {
            s.store(
                p1.load(Ordering::Relaxed) & p2.load(Ordering::Relaxed)
                    & !n.load(Ordering::Relaxed),
                Ordering::Relaxed,
            );
        }
    }

    /// `self = p & !n1 & !n2`.
    pub fn set_pnn(self, p: DenseSetRef, n1: DenseSetRef, n2: DenseSetRef) {
        self.assert_same_dim(p);
        self.assert_same_dim(n1);
        self.assert_same_dim(n2);
        for (((s, p), n1), n2) in self.words.iter().zip(p.words).zip(n1.words).zip(n2.words) {
            s.store(
                p.load(Ordering::Relaxed) & !n1.load(Ordering::Relaxed)
                    & !n2.load(Ordering::Relaxed),
                Ordering::Relaxed,
            );
        }
    }

    /// `self = p1 & p2 & !n1 & !n2`.
    pub fn set_ppnn(
        self,
        p1: DenseSetRef,
        p2: DenseSetRef,
        n1: DenseSetRef,
        n2: DenseSetRef,
    ) {
        self.assert_same_dim(p1);
        self.assert_same_dim(p2);
        self.assert_same_dim(n1);
        self.assert_same_dim(n2);
        for ((((s, p1), p2), n1), n2) in self
            .words
            .iter()
            .zip(p1.words)
            .zip(p2.words)
            .zip(n1.words)
            .zip(n2.words)
        {
            s.store(
                p1.load(Ordering::Relaxed) & p2.load(Ordering::Relaxed)
                    & !n1.load(Ordering::Relaxed)
                    & !n2.load(Ordering::Relaxed),
                Ordering::Relaxed,
            );
        }
    }

    /// `self |= dep; dep = 0`.
    pub fn merge(self, dep: DenseSetRef) {
        self.assert_same_dim(dep);
        for (r, d) in self.words.iter().zip(dep.words) {
            r.fetch_or(d.load(Ordering::Relaxed), Ordering::Relaxed);
            d.store(0, Ordering::Relaxed);
        }
    }

    /// `diff = dep & !self; self |= dep; dep = 0`; returns true iff `diff` is non-empty.
    pub fn merge_diff(self, dep: DenseSetRef, diff: DenseSetRef) -> bool {
        self.assert_same_dim(dep);
        self.assert_same_dim(diff);
        let mut changed: Word = 0;
        for ((r, d), c) in self.words.iter().zip(dep.words).zip(diff.words) {
            let dep_word = d.load(Ordering::Relaxed);
            let rep_word = r.load(Ordering::Relaxed);
            let change = dep_word & !rep_word;
            d.store(0, Ordering::Relaxed);
            r.fetch_or(dep_word, Ordering::Relaxed);
            c.store(change, Ordering::Relaxed);
            changed |= change;
        }
        changed != 0
    }

    /// `diff = src & !self; self |= src`; returns true iff `diff` is non-empty.
    pub fn ensure(self, src: DenseSetRef, diff: DenseSetRef) -> bool {
        self.assert_same_dim(src);
        self.assert_same_dim(diff);
        let mut changed: Word = 0;
        for ((r, s), c) in self.words.iter().zip(src.words).zip(diff.words) {
            let src_word = s.load(Ordering::Relaxed);
            let rep_word = r.load(Ordering::Relaxed);
            let change = src_word & !rep_word;
            r.fetch_or(src_word, Ordering::Relaxed);
            c.store(change, Ordering::Relaxed);
            changed |= change;
        }
        changed != 0
    }

    /// Iterates the members in increasing order.
    pub fn iter(self) -> Iter<'a> {
        Iter {
            inner: SetIterator::new(Simple { words: self.words }),
        }
    }

    /// Iterates `self & other` in increasing order.
    pub fn iter_insn(self, other: DenseSetRef<'a>) -> IterInsn2<'a> {
        self.assert_same_dim(other);
        IterInsn2 {
            inner: SetIterator::new(Insn2 {
                words1: self.words,
                words2: other.words,
            }),
        }
    }

    /// Iterates `self & b & c` in increasing order.
    pub fn iter_insn3(self, b: DenseSetRef<'a>, c: DenseSetRef<'a>) -> IterInsn3<'a> {
        self.assert_same_dim(b);
        self.assert_same_dim(c);
        IterInsn3 {
            inner: SetIterator::new(Insn3 {
                words1: self.words,
                words2: b.words,
                words3: c.words,
            }),
        }
    }

    /// Iterates `self & !other` in increasing order.
    pub fn iter_diff(self, other: DenseSetRef<'a>) -> IterDiff<'a> {
        self.assert_same_dim(other);
        IterDiff {
            inner: SetIterator::new(Diff {
                pos: self.words,
                neg: other.words,
            }),
        }
    }

    /// Checks the padding-bit invariant: bit 0 and all bits above `item_dim` are zero.
    pub fn validate(self) {
        assert!(
            self.words[0].load(Ordering::Relaxed) & 1 == 0,
            "dense set contains the null ob"
        );
        let end = (self.item_dim + 1) % BITS_PER_WORD;
        if end != 0 {
            let last = self.words[self.word_dim() - 1].load(Ordering::Relaxed);
            assert!(last >> end == 0, "dense set uses padding bits: {last:#x}");
        }
    }
}

impl PartialEq for DenseSetRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.assert_same_dim(*other);
        self.words
            .iter()
            .zip(other.words)
            .all(|(s, o)| s.load(Ordering::Relaxed) == o.load(Ordering::Relaxed))
    }
}

impl Eq for DenseSetRef<'_> {}

// ---------------------------------------------------------------------------
// Iteration

trait WordSource {
    fn word_dim(&self) -> usize;
    fn get_word(&self, quot: usize) -> Word;
}

struct Simple<'a> {
    words: &'a [AtomicWord],
}

impl WordSource for Simple<'_> {
    fn word_dim(&self) -> usize {
        self.words.len()
    }

    fn get_word(&self, quot: usize) -> Word {
        self.words[quot].load(Ordering::Relaxed)
    }
}

struct Insn2<'a> {
    words1: &'a [AtomicWord],
    words2: &'a [AtomicWord],
}

impl WordSource for Insn2<'_> {
    fn word_dim(&self) -> usize {
        self.words1.len()
    }

    fn get_word(&self, quot: usize) -> Word {
        self.words1[quot].load(Ordering::Relaxed) & self.words2[quot].load(Ordering::Relaxed)
    }
}

struct Insn3<'a> {
    words1: &'a [AtomicWord],
    words2: &'a [AtomicWord],
    words3: &'a [AtomicWord],
}

impl WordSource for Insn3<'_> {
    fn word_dim(&self) -> usize {
        self.words1.len()
    }

    fn get_word(&self, quot: usize) -> Word {
        self.words1[quot].load(Ordering::Relaxed)
            & self.words2[quot].load(Ordering::Relaxed)
            & self.words3[quot].load(Ordering::Relaxed)
    }
}

struct Diff<'a> {
    pos: &'a [AtomicWord],
    neg: &'a [AtomicWord],
}

impl WordSource for Diff<'_> {
    fn word_dim(&self) -> usize {
        self.pos.len()
    }

    fn get_word(&self, quot: usize) -> Word {
        self.pos[quot].load(Ordering::Relaxed) & !self.neg[quot].load(Ordering::Relaxed)
    }
}

/// Word-skipping cursor over the positions of a word source.
///
/// A position of 0 marks exhaustion; bit 0 is reserved, so no member is lost.
struct SetIterator<S> {
    source: S,
    pos: usize,
    rem: usize,
    quot: usize,
    word: Word,
}

impl<S: WordSource> SetIterator<S> {
    fn new(source: S) -> SetIterator<S> {
        let mut iterator = SetIterator {
            source,
            pos: 0,
            rem: 0,
            quot: usize::MAX,
            word: 0,
        };
        iterator.next_block();
        iterator
    }

    /// Advances to the first member of the next non-empty word, if any.
    fn next_block(&mut self) {
        loop {
            self.quot = self.quot.wrapping_add(1);
            if self.quot == self.source.word_dim() {
                self.pos = 0;
                return;
            }
            self.word = self.source.get_word(self.quot);
            if self.word != 0 {
                break;
            }
        }
        self.rem = self.word.trailing_zeros() as usize;
        self.word >>= self.rem;
        self.pos = self.rem + BITS_PER_WORD * self.quot;
    }

    /// Steps past the current member.
    fn advance(&mut self) {
        loop {
            self.rem += 1;
            if self.rem % BITS_PER_WORD == 0 {
                self.next_block();
                return;
            }
            self.word >>= 1;
            if self.word & 1 != 0 {
                break;
            }
        }
        self.pos = self.rem + BITS_PER_WORD * self.quot;
    }

    fn next_pos(&mut self) -> Option<Ob> {
        match self.pos {
            0 => None,
            pos => {
                self.advance();
                Some(pos as Ob)
            }
        }
    }
}

/// Iterator over the members of a set.
pub struct Iter<'a> {
    inner: SetIterator<Simple<'a>>,
}

impl Iterator for Iter<'_> {
    type Item = Ob;

    fn next(&mut self) -> Option<Ob> {
        self.inner.next_pos()
    }
}

/// Iterator over the members of a 2-way intersection.
pub struct IterInsn2<'a> {
    inner: SetIterator<Insn2<'a>>,
}

impl Iterator for IterInsn2<'_> {
    type Item = Ob;

    fn next(&mut self) -> Option<Ob> {
        self.inner.next_pos()
    }
}

/// Iterator over the members of a 3-way intersection.
pub struct IterInsn3<'a> {
    inner: SetIterator<Insn3<'a>>,
}

impl Iterator for IterInsn3<'_> {
    type Item = Ob;

    fn next(&mut self) -> Option<Ob> {
        self.inner.next_pos()
    }
}

/// Iterator over the members of a difference.
pub struct IterDiff<'a> {
    inner: SetIterator<Diff<'a>>,
}

impl Iterator for IterDiff<'_> {
    type Item = Ob;

    fn next(&mut self) -> Option<Ob> {
        self.inner.next_pos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(item_dim: usize, obs: &[Ob]) -> DenseSet {
        let set = DenseSet::new(item_dim);
        for &ob in obs {
            set.insert(ob);
        }
        set
    }

    fn items(set: &DenseSet) -> Vec<Ob> {
        set.iter().collect()
    }

    #[test]
    fn union_insn_diff() {
        let a = set_of(7, &[1, 3, 5, 7]);
        let b = set_of(7, &[1, 2, 3]);

        let union = DenseSet::new(7);
        union.as_set().set_union(a.as_set(), b.as_set());
        assert_eq!(items(&union), vec![1, 2, 3, 5, 7]);

        let insn = DenseSet::new(7);
        insn.as_set().set_insn(a.as_set(), b.as_set());
        assert_eq!(items(&insn), vec![1, 3]);

        let diff = DenseSet::new(7);
        diff.as_set().set_diff(a.as_set(), b.as_set());
        assert_eq!(items(&diff), vec![5, 7]);
    }

    #[test]
    fn union_laws() {
        let a = set_of(200, &[1, 64, 65, 127, 128, 199]);
        let b = set_of(200, &[2, 64, 128, 200]);

        let ab = DenseSet::new(200);
        ab.as_set().set_union(a.as_set(), b.as_set());
        let ba = DenseSet::new(200);
        ba.as_set().set_union(b.as_set(), a.as_set());
        assert_eq!(ab, ba);

        let aa = DenseSet::new(200);
        aa.as_set().set_union(a.as_set(), a.as_set());
        assert_eq!(aa, a);

        let insn_ab = DenseSet::new(200);
        insn_ab.as_set().set_insn(a.as_set(), b.as_set());
        let insn_ba = DenseSet::new(200);
        insn_ba.as_set().set_insn(b.as_set(), a.as_set());
        assert_eq!(insn_ab, insn_ba);
        assert_eq!(items(&insn_ab), vec![64, 128]);
    }

    #[test]
    fn diff_with_self_is_empty() {
        let a = set_of(100, &[3, 50, 99]);
        let diff = DenseSet::new(100);
        diff.as_set().set_diff(a.as_set(), a.as_set());
        assert!(diff.is_empty());
    }

    #[test]
    fn merge_moves_everything() {
        let rep = set_of(130, &[1, 70]);
        let dep = set_of(130, &[2, 70, 129]);

        rep.as_set().merge(dep.as_set());

        assert!(dep.is_empty());
        assert_eq!(items(&rep), vec![1, 2, 70, 129]);
    }

    #[test]
    fn merge_diff_reports_new_bits() {
        let rep = set_of(64, &[1, 2]);
        let dep = set_of(64, &[2, 3, 64]);
        let diff = DenseSet::new(64);

        assert!(rep.as_set().merge_diff(dep.as_set(), diff.as_set()));
        assert_eq!(items(&diff), vec![3, 64]);
        assert!(dep.is_empty());
        assert_eq!(items(&rep), vec![1, 2, 3, 64]);

        let dep = set_of(64, &[1]);
        assert!(!rep.as_set().merge_diff(dep.as_set(), diff.as_set()));
        assert!(diff.is_empty());
    }

    #[test]
    fn ensure_keeps_source() {
        let dest = set_of(32, &[1]);
        let src = set_of(32, &[1, 9]);
        let diff = DenseSet::new(32);

        assert!(dest.as_set().ensure(src.as_set(), diff.as_set()));
        assert_eq!(items(&diff), vec![9]);
        assert_eq!(items(&src), vec![1, 9]);
        assert_eq!(items(&dest), vec![1, 9]);

        assert!(!dest.as_set().ensure(src.as_set(), diff.as_set()));
    }

    #[test]
    fn ppn_pnn_ppnn() {
        let p1 = set_of(10, &[1, 2, 3, 4]);
        let p2 = set_of(10, &[2, 3, 4, 5]);
        let n1 = set_of(10, &[3]);
        let n2 = set_of(10, &[4]);

        let out = DenseSet::new(10);
        out.as_set().set_ppn(p1.as_set(), p2.as_set(), n1.as_set());
        assert_eq!(items(&out), vec![2, 4]);

        out.as_set().set_pnn(p1.as_set(), n1.as_set(), n2.as_set());
        assert_eq!(items(&out), vec![1, 2]);

        out.as_set()
            .set_ppnn(p1.as_set(), p2.as_set(), n1.as_set(), n2.as_set());
        assert_eq!(items(&out), vec![2]);

        out.as_set()
            .set_insn3(p1.as_set(), p2.as_set(), set_of(10, &[3, 4]).as_set());
        assert_eq!(items(&out), vec![3, 4]);
    }

    #[test]
    fn insert_all_respects_padding() {
        for item_dim in [7, 63, 64, 65, 127, 128, 511] {
            let set = DenseSet::new(item_dim);
            set.insert_all();
            set.validate();
            assert_eq!(set.count_items(), item_dim, "item_dim {item_dim}");
            assert!(set.contains(1));
            assert!(set.contains(item_dim as Ob));
        }
    }

    #[test]
    fn try_insert_one_fills_in_order() {
        let set = DenseSet::new(66);
        for expected in 1..=66 {
            assert_eq!(set.try_insert_one(), expected as Ob);
        }
        assert_eq!(set.try_insert_one(), 0);
    }

    #[test]
    fn try_insert_is_idempotent() {
        let set = DenseSet::new(8);
        assert!(set.try_insert(5));
        assert!(!set.try_insert(5));
        assert!(set.try_remove(5));
        assert!(!set.try_remove(5));
    }

    #[test]
    fn merge_ob_zeroes_dep() {
        let set = set_of(9, &[2, 7]);
        set.merge_ob(7, 2);
        assert_eq!(items(&set), vec![2]);
    }

    #[test]
    fn intersection_iterators() {
        let a = set_of(300, &[1, 65, 130, 260, 299]);
        let b = set_of(300, &[1, 130, 299]);
        let c = set_of(300, &[130, 299, 300]);

        let ab: Vec<Ob> = a.as_set().iter_insn(b.as_set()).collect();
        assert_eq!(ab, vec![1, 130, 299]);

        let abc: Vec<Ob> = a.as_set().iter_insn3(b.as_set(), c.as_set()).collect();
        assert_eq!(abc, vec![130, 299]);

        let diff: Vec<Ob> = a.as_set().iter_diff(b.as_set()).collect();
        assert_eq!(diff, vec![65, 260]);
    }

    #[test]
    fn empty_iteration() {
        let set = DenseSet::new(1000);
        assert_eq!(set.iter().next(), None);
    }
}
