/*!
A lock-free round-robin source of cleanup work.

Cleanup is partitioned into `type_count` disjoint classes, indexed `0..type_count`.
After a [push_all](CleanupGenerator::push_all), exactly `type_count` calls to [try_pop](CleanupGenerator::try_pop) hand out work --- one class per call, round-robin --- and further calls return `None` until the next `push_all`.

The two counters sit on separate cache lines: the done counter is written by every successful pop, while the type cursor is also read on the hot path, and sharing a line would bounce it between workers.
*/

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::utils::CachePadded;

use super::tasks::CleanupTask;

/// Bounded round-robin dispenser of cleanup classes.
pub struct CleanupGenerator {
    type_count: u64,
    type_cursor: CachePadded<AtomicU64>,
    done_count: CachePadded<AtomicU64>,
}

impl CleanupGenerator {
    /// A generator over `type_count >= 1` cleanup classes, initially drained.
    pub fn new(type_count: usize) -> CleanupGenerator {
        assert!(0 < type_count, "no cleanup classes");
        CleanupGenerator {
            type_count: type_count as u64,
            type_cursor: CachePadded::new(AtomicU64::new(0)),
            done_count: CachePadded::new(AtomicU64::new(type_count as u64)),
        }
    }

    pub fn type_count(&self) -> usize {
        self.type_count as usize
    }

    /// Resets the completion counter, making every class available again.
    ///
    /// Invoked after any insertion that might have created new cleanup work.
    pub fn push_all(&self) {
        self.done_count.store(0, Ordering::Release);
    }

    /// Claims the next available class, or `None` once all classes have been
    /// consumed since the last [push_all](CleanupGenerator::push_all).
    pub fn try_pop(&self) -> Option<CleanupTask> {
        let mut done = 0;
        loop {
            if done == self.type_count {
                return None;
            }
            match self.done_count.compare_exchange_weak(
                done,
                done + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(current) => done = current,
            }
        }

        let type_count = self.type_count;
        let type_index = self
            .type_cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cursor| {
                Some((cursor + 1) % type_count)
            })
            .unwrap();

        Some(CleanupTask {
            type_index: type_index as usize,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    #[test]
    fn fresh_generator_is_drained() {
        let generator = CleanupGenerator::new(3);
        assert!(generator.try_pop().is_none());
    }

    #[test]
    fn push_all_hands_out_each_class_once() {
        let generator = CleanupGenerator::new(4);

        generator.push_all();
        let mut types = Vec::new();
        while let Some(task) = generator.try_pop() {
            types.push(task.type_index);
        }
        assert_eq!(types.len(), 4);
        assert_eq!(
            types.iter().copied().collect::<BTreeSet<_>>(),
            BTreeSet::from([0, 1, 2, 3])
        );
        assert!(generator.try_pop().is_none());

        generator.push_all();
        assert_eq!(
            (0..4).filter_map(|_| generator.try_pop()).count(),
            4,
            "push_all re-primes every class"
        );
    }

    #[test]
    fn round_robin_covers_classes_in_turn() {
        let generator = CleanupGenerator::new(3);
        generator.push_all();
        let first: Vec<usize> = std::iter::from_fn(|| generator.try_pop())
            .map(|task| task.type_index)
            .collect();
        generator.push_all();
        let second: Vec<usize> = std::iter::from_fn(|| generator.try_pop())
            .map(|task| task.type_index)
            .collect();

        assert_eq!(first, vec![0, 1, 2]);
        assert_eq!(second, vec![0, 1, 2]);
    }

    #[test]
    fn two_threads_share_the_budget() {
        let generator = Arc::new(CleanupGenerator::new(4));
        generator.push_all();

        let mut handles = Vec::new();
        for _ in 0..2 {
            let generator = Arc::clone(&generator);
            handles.push(std::thread::spawn(move || {
                let mut types = Vec::new();
                while let Some(task) = generator.try_pop() {
                    types.push(task.type_index);
                }
                types
            }));
        }

        let mut combined = Vec::new();
        for handle in handles {
            combined.extend(handle.join().unwrap());
        }

        assert_eq!(combined.len(), 4);
        assert_eq!(
            combined.into_iter().collect::<BTreeSet<_>>(),
            BTreeSet::from([0, 1, 2, 3])
        );
        assert!(generator.try_pop().is_none());
    }
}
