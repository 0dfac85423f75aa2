//! Scheduler discipline: merge exclusivity, cancellation, and the deadline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand_core::RngCore;

use pomagma::config::Config;
use pomagma::db::carrier::Carrier;
use pomagma::db::function::InjectiveFunction;
use pomagma::db::signature::Signature;
use pomagma::db::Ob;
use pomagma::scheduler::tasks::{Executor, ExistsTask, MergeTask, Task};
use pomagma::scheduler::Scheduler;

/// Applies merges to a signature, recording execution for inspection.
struct RecordingExecutor {
    signature: Signature,
    merge_in_flight: AtomicBool,
    executed_exists: Mutex<Vec<Ob>>,
}

impl RecordingExecutor {
    fn new(signature: Signature) -> RecordingExecutor {
        RecordingExecutor {
            signature,
            merge_in_flight: AtomicBool::new(false),
            executed_exists: Mutex::new(Vec::new()),
        }
    }
}

impl Executor for RecordingExecutor {
    fn execute_merge(&self, task: &MergeTask) {
        assert!(
            !self.merge_in_flight.swap(true, Ordering::SeqCst),
            "two merges ran concurrently"
        );
        self.signature.unsafe_merge(task.dep);
        // hold the exclusive section open long enough for overlap to show
        std::thread::sleep(Duration::from_millis(2));
        self.merge_in_flight.store(false, Ordering::SeqCst);
    }

    fn execute(&self, task: Task, _rng: &mut dyn RngCore) {
        assert!(
            !self.merge_in_flight.load(Ordering::SeqCst),
            "a task ran while a merge was in flight"
        );
        if let Task::Exists(exists) = task {
            self.executed_exists.lock().unwrap().push(exists.ob);
        }
    }
}

fn two_worker_setup() -> (Arc<Scheduler>, Arc<Carrier>, Signature) {
    let config = Config::default().with_worker_count(2);
    let scheduler = Arc::new(Scheduler::new(&config, 1));

    let merge_scheduler = Arc::clone(&scheduler);
    let carrier = Arc::new(Carrier::new(
        32,
        Some(Box::new(move |dep| {
            merge_scheduler.schedule(Task::Merge(MergeTask { dep }));
        })),
    ));
    for _ in 0..20 {
        carrier.insert();
    }

    let mut signature = Signature::new(Arc::clone(&carrier));
    signature.declare_injective_function("CODE", InjectiveFunction::new(Arc::clone(&carrier)));
    let code = signature.injective_function_by_name("CODE").unwrap();
    signature.injective_function(code).insert(1, 18);
    signature.injective_function(code).insert(2, 19);

    (scheduler, carrier, signature)
}

#[test]
fn merges_exclude_and_cancel() {
    let (scheduler, carrier, signature) = two_worker_setup();
    let executor = RecordingExecutor::new(signature);

    // interleave exists tasks with merge-producing carrier merges
    for ob in [1, 2, 3, 18] {
        scheduler.schedule(Task::Exists(ExistsTask { ob }));
    }
    carrier.merge(18, 4);
    for ob in [5, 6, 19, 20, 7] {
        scheduler.schedule(Task::Exists(ExistsTask { ob }));
    }
    carrier.merge(19, 5);
    carrier.merge(20, 6);
    for ob in [8, 9, 10] {
        scheduler.schedule(Task::Exists(ExistsTask { ob }));
    }

    scheduler.initialize(&executor);

    assert_eq!(scheduler.merge_stats().executed(), 3);
    assert!(scheduler.is_idle(), "work remained after initialize");

    let executed = executor.executed_exists.lock().unwrap();
    for dep in [18, 19, 20] {
        assert!(
            !executed.contains(&dep),
            "a task referencing merged ob {dep} executed"
        );
    }
    // every other scheduled exists task ran
    for ob in [1, 2, 3, 5, 6, 7, 8, 9, 10] {
        assert!(executed.contains(&ob), "task for ob {ob} was lost");
    }

    // the merges themselves were applied to the tables
    let code = executor.signature.injective_function_by_name("CODE").unwrap();
    let code = executor.signature.injective_function(code);
    assert_eq!(code.find(1), 4);
    assert_eq!(code.find(2), 5);
    executor.signature.validate();
}

#[test]
fn scheduled_work_after_start_is_observed() {
    // tasks scheduled while workers idle are picked up via the timed wait
    let (scheduler, _carrier, signature) = two_worker_setup();
    let executor = RecordingExecutor::new(signature);

    let worker_scheduler = Arc::clone(&scheduler);
    let feeder = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        for ob in [11, 12, 13] {
            worker_scheduler.schedule(Task::Exists(ExistsTask { ob }));
        }
    });
    // give the feeder a head start so workers begin idle
    scheduler.schedule(Task::Exists(ExistsTask { ob: 14 }));
    scheduler.initialize(&executor);
    feeder.join().unwrap();

    // anything scheduled before the workers drained was executed
    let executed = executor.executed_exists.lock().unwrap();
    assert!(executed.contains(&14));
}

#[test]
fn deadline_flag_flips_on_expiry() {
    let mut config = Config::default().with_worker_count(1);
    config.deadline = Duration::from_millis(300);
    let scheduler = Scheduler::new(&config, 1);

    assert!(!scheduler.deadline_expired());
    scheduler.start_deadline();
    assert!(!scheduler.deadline_expired());

    std::thread::sleep(Duration::from_millis(700));
    assert!(scheduler.deadline_expired());
}
