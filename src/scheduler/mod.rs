/*!
The task scheduler: a multi-threaded dispatcher with a strict merge/read lock discipline.

# Locking

One readers-writer lock, the *strict mutex*, mediates all task execution.
Non-merge tasks execute under the shared lock, so any number may run concurrently; a merge task takes the unique lock, so a merger sees a quiescent structure and subsequent readers see the merged state.
Once a worker holds the unique lock it drains the merge queue completely, running the cancellation pass over every other queue after each merge, before letting shared work resume.

# Worker loop

Each phase spawns `worker_count` threads over a `try_work` function which attempts one task and reports whether anything ran.
An idle worker parks on a condition variable with a short (100 ms) timeout; the timeout is load-bearing, covering notifications lost while a worker was between checks.
The termination handshake: the last worker to go idle clears the working flag and broadcasts, and every worker exits its loop on observing the cleared flag.

# Phases

- *initialize*: merge, then the enforce queues in fixed order, then assumptions, then cleanup.
- *survey*: merge, enforce (re-priming cleanup on any success), sample, cleanup.
- *deadline*: merge, enforce (re-priming cleanup), assume, sample, and cleanup only while the deadline flag is live.

The deadline is enforced by a detached watchdog thread which polls elapsed time at roughly a thousandth of the budget and then clears the flag; expiry is not an error, it simply stops cleanup from being scheduled while the queues drain.
*/

pub mod cleanup;
pub mod tasks;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::time::{Duration, Instant};

use crossbeam::queue::SegQueue;

use crate::config::Config;
use crate::generic::split_mix::SplitMix64;
use crate::misc::log::targets;

use cleanup::CleanupGenerator;
use tasks::{
    AssumeTask, BinaryFunctionTask, Executor, ExistsTask, InjectiveFunctionTask, MergeTask,
    NegativeOrderTask, NullaryFunctionTask, PositiveOrderTask, SampleTask, SymmetricFunctionTask,
    Task, TaskRecord, UnaryRelationTask,
};

/// How long an idle worker waits before re-checking the queues.
const IDLE_WAIT: Duration = Duration::from_millis(100);

/// Schedule/execute counters for one task category.
#[derive(Default)]
pub struct TaskStats {
    schedule_count: AtomicU64,
    execute_count: AtomicU64,
}

impl TaskStats {
    fn schedule(&self) {
        self.schedule_count.fetch_add(1, Ordering::Relaxed);
    }

    fn execute(&self) {
        self.execute_count.fetch_add(1, Ordering::Relaxed);
    }

    fn clear(&self) {
        self.schedule_count.store(0, Ordering::Relaxed);
        self.execute_count.store(0, Ordering::Relaxed);
    }

    pub fn scheduled(&self) -> u64 {
        self.schedule_count.load(Ordering::Relaxed)
    }

    pub fn executed(&self) -> u64 {
        self.execute_count.load(Ordering::Relaxed)
    }
}

impl std::fmt::Display for TaskStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} executed / {} scheduled", self.executed(), self.scheduled())
    }
}

/// The worker phases; see the module documentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Initialize,
    Survey,
    Deadline,
}

/// The engine value: queues, locks, counters, cleanup source, and deadline.
///
/// Multiple schedulers coexist without interference; all state is owned here.
pub struct Scheduler {
    worker_count: usize,
    deadline_duration: Duration,

    strict_mutex: RwLock<()>,

    working_flag: AtomicBool,
    working_count: AtomicU64,
    working_mutex: Mutex<()>,
    working_condition: Condvar,

    deadline_flag: Arc<AtomicBool>,

    merge_tasks: SegQueue<MergeTask>,
    exists_tasks: SegQueue<ExistsTask>,
    positive_order_tasks: SegQueue<PositiveOrderTask>,
    negative_order_tasks: SegQueue<NegativeOrderTask>,
    unary_relation_tasks: SegQueue<UnaryRelationTask>,
    nullary_function_tasks: SegQueue<NullaryFunctionTask>,
    injective_function_tasks: SegQueue<InjectiveFunctionTask>,
    binary_function_tasks: SegQueue<BinaryFunctionTask>,
    symmetric_function_tasks: SegQueue<SymmetricFunctionTask>,
    assume_tasks: SegQueue<AssumeTask>,
    sample_tasks: AtomicU64,
    cleanup: CleanupGenerator,

    merge_stats: TaskStats,
    enforce_stats: TaskStats,
    sample_stats: TaskStats,
    cleanup_stats: TaskStats,
}

impl Scheduler {
    /// A fresh scheduler with `cleanup_type_count` cleanup classes.
    pub fn new(config: &Config, cleanup_type_count: usize) -> Scheduler {
        Scheduler {
            worker_count: config.worker_count.max(1),
            deadline_duration: config.deadline,
            strict_mutex: RwLock::new(()),
            working_flag: AtomicBool::new(false),
            working_count: AtomicU64::new(0),
            working_mutex: Mutex::new(()),
            working_condition: Condvar::new(),
            deadline_flag: Arc::new(AtomicBool::new(true)),
            merge_tasks: SegQueue::new(),
            exists_tasks: SegQueue::new(),
            positive_order_tasks: SegQueue::new(),
            negative_order_tasks: SegQueue::new(),
            unary_relation_tasks: SegQueue::new(),
            nullary_function_tasks: SegQueue::new(),
            injective_function_tasks: SegQueue::new(),
            binary_function_tasks: SegQueue::new(),
            symmetric_function_tasks: SegQueue::new(),
            assume_tasks: SegQueue::new(),
            sample_tasks: AtomicU64::new(0),
            cleanup: CleanupGenerator::new(cleanup_type_count),
            merge_stats: TaskStats::default(),
            enforce_stats: TaskStats::default(),
            sample_stats: TaskStats::default(),
            cleanup_stats: TaskStats::default(),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// The cleanup work source.
    pub fn cleanup(&self) -> &CleanupGenerator {
        &self.cleanup
    }

    // ------------------------------------------------------------------
    // Scheduling

    /// Enqueues a task and wakes one idle worker.
    pub fn schedule(&self, task: Task) {
        match task {
            Task::Merge(task) => {
                self.merge_tasks.push(task);
                self.merge_stats.schedule();
            }
            Task::Exists(task) => {
                self.exists_tasks.push(task);
                self.enforce_stats.schedule();
            }
            Task::PositiveOrder(task) => {
                self.positive_order_tasks.push(task);
                self.enforce_stats.schedule();
            }
            Task::NegativeOrder(task) => {
                self.negative_order_tasks.push(task);
                self.enforce_stats.schedule();
            }
            Task::UnaryRelation(task) => {
                self.unary_relation_tasks.push(task);
                self.enforce_stats.schedule();
            }
            Task::NullaryFunction(task) => {
                self.nullary_function_tasks.push(task);
                self.enforce_stats.schedule();
            }
            Task::InjectiveFunction(task) => {
                self.injective_function_tasks.push(task);
                self.enforce_stats.schedule();
            }
            Task::BinaryFunction(task) => {
                self.binary_function_tasks.push(task);
                self.enforce_stats.schedule();
            }
            Task::SymmetricFunction(task) => {
                self.symmetric_function_tasks.push(task);
                self.enforce_stats.schedule();
            }
            Task::Assume(task) => {
                self.assume_tasks.push(task);
                self.enforce_stats.schedule();
            }
            Task::Sample(_) => {
                self.sample_tasks.fetch_add(1, Ordering::Relaxed);
                self.sample_stats.schedule();
            }
            Task::Cleanup(_) => {
                self.cleanup.push_all();
                self.cleanup_stats.schedule();
            }
        }
        self.working_condition.notify_one();
    }

    /// True when every queue is empty; meaningful only between phases.
    pub fn is_idle(&self) -> bool {
        self.merge_tasks.is_empty()
            && self.exists_tasks.is_empty()
            && self.positive_order_tasks.is_empty()
            && self.negative_order_tasks.is_empty()
            && self.unary_relation_tasks.is_empty()
            && self.nullary_function_tasks.is_empty()
            && self.injective_function_tasks.is_empty()
            && self.binary_function_tasks.is_empty()
            && self.symmetric_function_tasks.is_empty()
            && self.assume_tasks.is_empty()
            && self.sample_tasks.load(Ordering::Relaxed) == 0
    }

    // ------------------------------------------------------------------
    // Execution

    fn try_execute_record<T: TaskRecord, E: Executor>(
        &self,
        queue: &SegQueue<T>,
        executor: &E,
        rng: &mut SplitMix64,
    ) -> bool {
        let _shared = self.strict_mutex.read().unwrap();
        match queue.pop() {
            Some(task) => {
                executor.execute(task.into_task(), rng);
                self.enforce_stats.execute();
                true
            }
            None => false,
        }
    }

    fn merge_tasks_try_execute<E: Executor>(&self, executor: &E) -> bool {
        if self.merge_tasks.is_empty() {
            return false;
        }
        // Take the unique lock before popping: a queued merge must never sit
        // popped-but-unexecuted while shared work slips past it.
        let _unique = self.strict_mutex.write().unwrap();
        let mut executed = false;
        while let Some(task) = self.merge_tasks.pop() {
            executor.execute_merge(&task);
            self.merge_stats.execute();
            self.cancel_tasks_referencing(task.dep);
            executed = true;
        }
        executed
    }

    fn cancel_queue<T: TaskRecord>(queue: &SegQueue<T>, dep: crate::db::Ob) {
        // Bounded by the size observed up front; new arrivals wait for the
        // next pass.
        for _ in 0..queue.len() {
            match queue.pop() {
                Some(task) => {
                    if !task.references(dep) {
                        queue.push(task);
                    }
                }
                None => break,
            }
        }
    }

    fn cancel_tasks_referencing(&self, dep: crate::db::Ob) {
        Self::cancel_queue(&self.exists_tasks, dep);
        Self::cancel_queue(&self.nullary_function_tasks, dep);
        Self::cancel_queue(&self.injective_function_tasks, dep);
        Self::cancel_queue(&self.binary_function_tasks, dep);
        Self::cancel_queue(&self.symmetric_function_tasks, dep);
        Self::cancel_queue(&self.unary_relation_tasks, dep);
        Self::cancel_queue(&self.positive_order_tasks, dep);
        Self::cancel_queue(&self.negative_order_tasks, dep);
    }

    fn enforce_tasks_try_execute<E: Executor>(
        &self,
        executor: &E,
        rng: &mut SplitMix64,
        cleanup: bool,
    ) -> bool {
        let executed = self.try_execute_record(&self.exists_tasks, executor, rng)
            || self.try_execute_record(&self.nullary_function_tasks, executor, rng)
            || self.try_execute_record(&self.injective_function_tasks, executor, rng)
            || self.try_execute_record(&self.binary_function_tasks, executor, rng)
            || self.try_execute_record(&self.symmetric_function_tasks, executor, rng)
            || self.try_execute_record(&self.unary_relation_tasks, executor, rng)
            || self.try_execute_record(&self.positive_order_tasks, executor, rng)
            || self.try_execute_record(&self.negative_order_tasks, executor, rng);
        if executed && cleanup && self.worker_count > 1 {
            self.cleanup.push_all();
        }
        executed
    }

    fn sample_tasks_try_execute<E: Executor>(&self, executor: &E, rng: &mut SplitMix64) -> bool {
        let popped = self
            .sample_tasks
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |pending| {
                pending.checked_sub(1)
            })
            .is_ok();
        if popped {
            let _shared = self.strict_mutex.read().unwrap();
            executor.execute(Task::Sample(SampleTask), rng);
            self.sample_stats.execute();
            true
        } else {
            false
        }
    }

    fn cleanup_tasks_try_execute<E: Executor>(&self, executor: &E, rng: &mut SplitMix64) -> bool {
        match self.cleanup.try_pop() {
            Some(task) => {
                let _shared = self.strict_mutex.read().unwrap();
                executor.execute(Task::Cleanup(task), rng);
                self.cleanup_stats.execute();
                true
            }
            None => false,
        }
    }

    fn try_work<E: Executor>(&self, phase: Phase, executor: &E, rng: &mut SplitMix64) -> bool {
        match phase {
            Phase::Initialize => {
                self.merge_tasks_try_execute(executor)
                    || self.enforce_tasks_try_execute(executor, rng, false)
                    || self.try_execute_record(&self.assume_tasks, executor, rng)
                    || self.cleanup_tasks_try_execute(executor, rng)
            }
            Phase::Survey => {
                self.merge_tasks_try_execute(executor)
                    || self.enforce_tasks_try_execute(executor, rng, true)
                    || self.sample_tasks_try_execute(executor, rng)
                    || self.cleanup_tasks_try_execute(executor, rng)
            }
            Phase::Deadline => {
                self.merge_tasks_try_execute(executor)
                    || self.enforce_tasks_try_execute(executor, rng, true)
                    || self.try_execute_record(&self.assume_tasks, executor, rng)
                    || self.sample_tasks_try_execute(executor, rng)
                    || (self.deadline_flag.load(Ordering::Relaxed)
                        && self.cleanup_tasks_try_execute(executor, rng))
            }
        }
    }

    fn do_work<E: Executor>(&self, phase: Phase, executor: &E) {
        let mut rng = SplitMix64::from_clock();

        self.working_flag.store(true, Ordering::SeqCst);
        while self.working_flag.load(Ordering::SeqCst) {
            self.working_count.fetch_add(1, Ordering::SeqCst);
            while self.try_work(phase, executor, &mut rng) {}
            if self.working_count.fetch_sub(1, Ordering::SeqCst) != 1 {
                let guard = self.working_mutex.lock().unwrap();
                let _ = self
                    .working_condition
                    .wait_timeout(guard, IDLE_WAIT)
                    .unwrap();
            } else {
                self.working_flag.store(false, Ordering::SeqCst);
                self.working_condition.notify_all();
            }
        }
    }

    fn run<E: Executor>(&self, phase: Phase, executor: &E) {
        log::info!(
            target: targets::SCHEDULER,
            "starting {} {phase:?} threads",
            self.worker_count
        );
        self.reset_stats();
        std::thread::scope(|scope| {
            for _ in 0..self.worker_count {
                scope.spawn(|| self.do_work(phase, executor));
            }
        });
        log::info!(
            target: targets::SCHEDULER,
            "finished {} {phase:?} threads",
            self.worker_count
        );
        self.log_stats();
    }

    /// Runs the initialize phase to quiescence: merges, enforcement, and
    /// assumptions, with one cleanup sweep.
    pub fn initialize<E: Executor>(&self, executor: &E) {
        self.cleanup.push_all();
        self.run(Phase::Initialize, executor);
    }

    /// Runs the survey phase to quiescence: merges, enforcement, sampling,
    /// and cleanup.
    pub fn survey<E: Executor>(&self, executor: &E) {
        self.run(Phase::Survey, executor);
    }

    /// Runs the deadline phase: like survey plus assumptions, with cleanup
    /// gated on the deadline flag.
    pub fn survey_until_deadline<E: Executor>(&self, executor: &E) {
        self.cleanup.push_all();
        self.start_deadline();
        self.run(Phase::Deadline, executor);
    }

    // ------------------------------------------------------------------
    // Deadline

    /// Spawns the detached watchdog which clears the deadline flag on expiry.
    pub fn start_deadline(&self) {
        let duration = self.deadline_duration;
        log::info!(
            target: targets::SCHEDULER,
            "setting deadline of {} sec",
            duration.as_secs()
        );
        let flag = Arc::clone(&self.deadline_flag);
        let start = Instant::now();
        // poll ~1000x more often than the budget
        let interval = (duration / 1000).max(Duration::from_millis(1));
        std::thread::spawn(move || {
            while start.elapsed() < duration {
                std::thread::sleep(interval);
            }
            log::info!(target: targets::SCHEDULER, "deadline reached");
            flag.store(false, Ordering::Relaxed);
        });
    }

    /// True once the watchdog has fired.
    pub fn deadline_expired(&self) -> bool {
        !self.deadline_flag.load(Ordering::Relaxed)
    }

    // ------------------------------------------------------------------
    // Stats

    pub fn merge_stats(&self) -> &TaskStats {
        &self.merge_stats
    }

    pub fn enforce_stats(&self) -> &TaskStats {
        &self.enforce_stats
    }

    pub fn sample_stats(&self) -> &TaskStats {
        &self.sample_stats
    }

    pub fn cleanup_stats(&self) -> &TaskStats {
        &self.cleanup_stats
    }

    pub fn reset_stats(&self) {
        self.merge_stats.clear();
        self.enforce_stats.clear();
        self.sample_stats.clear();
        self.cleanup_stats.clear();
    }

    pub fn log_stats(&self) {
        log::info!(target: targets::SCHEDULER, "merge tasks: {}", self.merge_stats);
        log::info!(target: targets::SCHEDULER, "enforce tasks: {}", self.enforce_stats);
        log::info!(target: targets::SCHEDULER, "sample tasks: {}", self.sample_stats);
        log::info!(target: targets::SCHEDULER, "cleanup tasks: {}", self.cleanup_stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::SeedableRng;
    use std::sync::atomic::AtomicUsize;

    struct CountingExecutor {
        executed: AtomicUsize,
    }

    impl Executor for CountingExecutor {
        fn execute_merge(&self, _task: &MergeTask) {}

        fn execute(&self, _task: Task, _rng: &mut dyn rand_core::RngCore) {
            self.executed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn config(workers: usize) -> Config {
        Config::default().with_worker_count(workers)
    }

    #[test]
    fn single_worker_drains_queues() {
        let scheduler = Scheduler::new(&config(1), 1);
        let executor = CountingExecutor {
            executed: AtomicUsize::new(0),
        };

        for ob in 1..=10 {
            scheduler.schedule(Task::Exists(ExistsTask { ob }));
        }
        scheduler.initialize(&executor);

        assert!(scheduler.is_idle());
        // 10 exists tasks plus one cleanup class
        assert_eq!(executor.executed.load(Ordering::Relaxed), 11);
        assert_eq!(scheduler.enforce_stats().executed(), 10);
        assert_eq!(scheduler.cleanup_stats().executed(), 1);
    }

    #[test]
    fn cancellation_filters_queued_tasks() {
        let scheduler = Scheduler::new(&config(1), 1);

        scheduler.schedule(Task::Exists(ExistsTask { ob: 4 }));
        scheduler.schedule(Task::Exists(ExistsTask { ob: 5 }));
        scheduler.schedule(Task::BinaryFunction(BinaryFunctionTask {
            fun: crate::db::keys::BinaryFunctionKey(0),
            lhs: 4,
            rhs: 6,
        }));
        scheduler.cancel_tasks_referencing(4);

        let mut remaining = Vec::new();
        while let Some(task) = scheduler.exists_tasks.pop() {
            remaining.push(task.ob);
        }
        assert_eq!(remaining, vec![5]);
        assert!(scheduler.binary_function_tasks.is_empty());
    }

    #[test]
    fn assumptions_run_in_the_initialize_phase() {
        let scheduler = Scheduler::new(&config(1), 1);
        let executor = CountingExecutor {
            executed: AtomicUsize::new(0),
        };

        scheduler.schedule(Task::Assume(AssumeTask {
            expression: "LESS BOT TOP".to_owned(),
        }));
        scheduler.initialize(&executor);

        assert!(scheduler.is_idle());
        assert_eq!(scheduler.enforce_stats().executed(), 1);
    }

    #[test]
    fn sample_queue_is_a_counter() {
        let scheduler = Scheduler::new(&config(1), 1);
        let executor = CountingExecutor {
            executed: AtomicUsize::new(0),
        };
        let mut rng = SplitMix64::from_seed(7u64.to_le_bytes());

        scheduler.schedule(Task::Sample(SampleTask));
        scheduler.schedule(Task::Sample(SampleTask));

        assert!(scheduler.sample_tasks_try_execute(&executor, &mut rng));
        assert!(scheduler.sample_tasks_try_execute(&executor, &mut rng));
        assert!(!scheduler.sample_tasks_try_execute(&executor, &mut rng));
        assert_eq!(scheduler.sample_stats().executed(), 2);
    }
}
