/*!
`pomagma_grow` --- grow a random model of a small combinatory algebra.

The theory carried here is deliberately tiny: constants K and S, application
APP, composition COMP, a symmetric join JOIN, the order relations LESS and
NLESS, and the single reduction rule `APP(APP(K, x), y) = x`.
Random terms are sampled until the carrier fills or the deadline expires, with
merges applied as the rule discovers equations.

Environment: `POMAGMA_DEADLINE_SEC`, `POMAGMA_LOG_LEVEL`, `POMAGMA_LOG_FILE`.
Exit codes: 0 on success, 1 on argument or environment error.
*/

use std::process::ExitCode;
use std::sync::Arc;

use rand_core::RngCore;

use pomagma::config::{Config, LogSettings};
use pomagma::db::carrier::Carrier;
use pomagma::db::function::{BinaryFunction, NullaryFunction, SymmetricFunction};
use pomagma::db::keys::{BinaryFunctionKey, BinaryRelationKey};
use pomagma::db::relation::BinaryRelation;
use pomagma::db::signature::Signature;
use pomagma::db::Ob;
use pomagma::sampler::{GrowingPolicy, Sampler};
use pomagma::scheduler::tasks::{
    BinaryFunctionTask, Executor, ExistsTask, MergeTask, NegativeOrderTask, PositiveOrderTask,
    SampleTask, SymmetricFunctionTask, Task,
};
use pomagma::scheduler::Scheduler;
use pomagma::types::err::SampleError;

const USAGE: &str = "usage: pomagma_grow [--size OBS] [--threads COUNT]";

/// Cleanup classes: 0 sweeps order reflexivity, 1 logs carrier fill.
const CLEANUP_TYPE_COUNT: usize = 2;

struct Options {
    item_dim: usize,
    threads: usize,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        item_dim: 1 << 12,
        threads: 0,
    };
    let mut args = args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--size" => {
                let value = args.next().ok_or("--size requires a value")?;
                options.item_dim = value
                    .parse()
                    .map_err(|_| format!("bad --size value: {value}"))?;
                if options.item_dim == 0 {
                    return Err("--size must be positive".to_owned());
                }
            }
            "--threads" => {
                let value = args.next().ok_or("--threads requires a value")?;
                options.threads = value
                    .parse()
                    .map_err(|_| format!("bad --threads value: {value}"))?;
            }
            unknown => return Err(format!("unknown argument: {unknown}")),
        }
    }
    Ok(options)
}

fn init_logging(settings: &LogSettings) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(settings.level);
    if let Some(path) = &settings.file {
        match std::fs::File::create(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(error) => {
                eprintln!("failed to open log file {}: {error}", path.display());
            }
        }
    }
    builder.init();
}

/// The grow theory: K-reduction over sampled terms.
struct GrowTheory {
    signature: Signature,
    sampler: Sampler,
    scheduler: Arc<Scheduler>,
    app: BinaryFunctionKey,
    less: BinaryRelationKey,
    k: Ob,
}

impl GrowTheory {
    fn carrier(&self) -> &Carrier {
        self.signature.carrier()
    }

    /// Collapses every outer application over the redex head `APP(K, x)`.
    fn reduce_redex(&self, kx: Ob, x: Ob) {
        let app = self.signature.binary_function(self.app);
        let carrier = self.carrier();
        for y in app.iter_lhs(kx).iter() {
            let outer = app.find(kx, y);
            if outer != 0 {
                carrier.ensure_equal(outer, x);
            }
        }
    }

    /// Enforces every instance of `APP(APP(K, x), y) = x` in which `ob` can
    /// participate: as K itself, as a redex head, or as the argument under K.
    fn enforce_k_at(&self, ob: Ob) {
        let app = self.signature.binary_function(self.app);
        let carrier = self.carrier();
        let ob = carrier.find(ob);
        let k = carrier.find(self.k);

        if ob == k {
            for x in app.iter_lhs(k).iter() {
                let kx = app.find(k, x);
                if kx != 0 {
                    self.reduce_redex(carrier.find(kx), carrier.find(x));
                }
            }
        }
        for (l, x) in app.iter_val(ob) {
            if carrier.equal(l, k) {
                self.reduce_redex(ob, carrier.find(x));
            }
        }
        let kx = app.find(k, ob);
        if kx != 0 {
            self.reduce_redex(carrier.find(kx), ob);
        }
    }

    fn sample_one(&self, rng: &mut dyn RngCore) {
        let policy = GrowingPolicy::new(self.carrier());
        match self.sampler.try_insert_random(rng, &self.signature, &policy) {
            Ok(ob) => {
                self.scheduler.schedule(Task::Exists(ExistsTask { ob }));
                self.scheduler.schedule(Task::Sample(SampleTask));
            }
            Err(SampleError::Full) => {
                // stop resampling; the queues drain and the workers park
            }
        }
    }

    fn cleanup(&self, type_index: usize) {
        match type_index {
            0 => {
                // maintenance sweep: the order is reflexive on every live ob
                let less = self.signature.binary_relation(self.less);
                for ob in self.carrier().iter() {
                    less.insert(ob, ob);
                }
            }
            _ => self.carrier().log_stats(),
        }
    }
}

impl Executor for GrowTheory {
    fn execute_merge(&self, task: &MergeTask) {
        self.signature.unsafe_merge(task.dep);
        // points may have moved onto the survivor; revisit its rule instances
        let rep = self.carrier().find(task.dep);
        self.scheduler.schedule(Task::Exists(ExistsTask { ob: rep }));
    }

    fn execute(&self, task: Task, rng: &mut dyn RngCore) {
        match task {
            Task::Merge(_) => unreachable!("merges take the exclusive path"),
            Task::Exists(task) => {
                // seed reflexivity of the order, then revisit the rule
                let ob = self.carrier().find(task.ob);
                self.signature.binary_relation(self.less).insert(ob, ob);
                self.enforce_k_at(ob);
            }
            Task::BinaryFunction(task) => {
                if task.fun == self.app {
                    self.enforce_k_at(task.lhs);
                    let app = self.signature.binary_function(self.app);
                    let val = app.find(task.lhs, task.rhs);
                    if val != 0 {
                        self.enforce_k_at(val);
                    }
                }
            }
            Task::Sample(_) => self.sample_one(rng),
            Task::Cleanup(task) => self.cleanup(task.type_index),
            _ => {}
        }
    }
}

fn build_theory(config: &Config, item_dim: usize) -> (Arc<Scheduler>, GrowTheory) {
    let scheduler = Arc::new(Scheduler::new(config, CLEANUP_TYPE_COUNT));

    let merge_scheduler = Arc::clone(&scheduler);
    let carrier = Arc::new(Carrier::new(
        item_dim,
        Some(Box::new(move |dep| {
            merge_scheduler.schedule(Task::Merge(MergeTask { dep }));
        })),
    ));

    let mut signature = Signature::new(Arc::clone(&carrier));
    let less = signature.declare_binary_relation("LESS", BinaryRelation::new(Arc::clone(&carrier)));
    let nless =
        signature.declare_binary_relation("NLESS", BinaryRelation::new(Arc::clone(&carrier)));
    signature.declare_nullary_function("K", NullaryFunction::new(Arc::clone(&carrier)));
    signature.declare_nullary_function("S", NullaryFunction::new(Arc::clone(&carrier)));
    let app = signature.declare_binary_function("APP", BinaryFunction::new(Arc::clone(&carrier)));
    let comp = signature.declare_binary_function("COMP", BinaryFunction::new(Arc::clone(&carrier)));
    let join =
        signature.declare_symmetric_function("JOIN", SymmetricFunction::new(Arc::clone(&carrier)));

    // wire insert callbacks to the scheduler
    {
        let task_scheduler = Arc::clone(&scheduler);
        signature
            .binary_relation_mut(less)
            .set_insert_callback(Box::new(move |lhs, rhs| {
                task_scheduler.schedule(Task::PositiveOrder(PositiveOrderTask { lhs, rhs }));
            }));
    }
    {
        let task_scheduler = Arc::clone(&scheduler);
        signature
            .binary_relation_mut(nless)
            .set_insert_callback(Box::new(move |lhs, rhs| {
                task_scheduler.schedule(Task::NegativeOrder(NegativeOrderTask { lhs, rhs }));
            }));
    }
    for key in [app, comp] {
        let task_scheduler = Arc::clone(&scheduler);
        signature
            .binary_function_mut(key)
            .set_insert_callback(Box::new(move |lhs, rhs| {
                task_scheduler.schedule(Task::BinaryFunction(BinaryFunctionTask {
                    fun: key,
                    lhs,
                    rhs,
                }));
            }));
    }
    {
        let task_scheduler = Arc::clone(&scheduler);
        signature
            .symmetric_function_mut(join)
            .set_insert_callback(Box::new(move |lhs, rhs| {
                task_scheduler.schedule(Task::SymmetricFunction(SymmetricFunctionTask {
                    fun: join,
                    lhs,
                    rhs,
                }));
            }));
    }

    let mut sampler = Sampler::new();
    sampler.set_prob(&signature, "K", 0.25);
    sampler.set_prob(&signature, "S", 0.25);
    sampler.set_prob(&signature, "APP", 0.3);
    sampler.set_prob(&signature, "COMP", 0.1);
    sampler.set_prob(&signature, "JOIN", 0.1);
    sampler.validate();

    // seed the constants
    for name in ["K", "S"] {
        let key = signature.nullary_function_by_name(name).unwrap();
        let fun = signature.nullary_function(key);
        if !fun.defined() {
            let ob = carrier.insert();
            assert!(ob != 0, "carrier full before seeding constants");
            fun.insert(ob);
            scheduler.schedule(Task::Exists(ExistsTask { ob }));
        }
    }
    let k = signature
        .nullary_function(signature.nullary_function_by_name("K").unwrap())
        .find();

    let theory = GrowTheory {
        signature,
        sampler,
        scheduler: Arc::clone(&scheduler),
        app,
        less,
        k,
    };
    (scheduler, theory)
}

fn grow(config: &Config, options: &Options) {
    let (scheduler, theory) = build_theory(config, options.item_dim);

    scheduler.initialize(&theory);

    // one standing sample task per worker keeps every thread fed
    for _ in 0..scheduler.worker_count() {
        scheduler.schedule(Task::Sample(SampleTask));
    }
    scheduler.survey_until_deadline(&theory);

    theory.signature.validate();
    theory.sampler.log_stats();
    theory.signature.log_stats();

    println!(
        "grew {} obs ({} reps) of {}; {} merges applied",
        theory.carrier().item_count(),
        theory.carrier().rep_count(),
        options.item_dim,
        scheduler.merge_stats().executed(),
    );
}

fn main() -> ExitCode {
    let settings = match LogSettings::from_env() {
        Ok(settings) => settings,
        Err(error) => {
            eprintln!("bad environment: {error}");
            return ExitCode::from(1);
        }
    };
    init_logging(&settings);

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("bad environment: {error}");
            return ExitCode::from(1);
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(error) => {
            eprintln!("{error}");
            eprintln!("{USAGE}");
            return ExitCode::from(1);
        }
    };

    grow(&config.with_worker_count(options.threads), &options);
    ExitCode::SUCCESS
}
