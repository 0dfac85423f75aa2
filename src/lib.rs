/*!
A library for saturating finite models of untyped, extensional combinatory algebras.

pomagma maintains a finite quotient of a term algebra: a set of abstract objects ([obs](crate::db::Ob)) connected by relations and partial functions, closed under whatever equations and inferences a client theory derives.
Facts are inserted through the tables of a [signature](crate::db::signature::Signature); equations between obs are applied by merging them in the [carrier](crate::db::carrier::Carrier) and rewriting every table occurrence of the merged ob; and a multi-threaded [scheduler](crate::scheduler::Scheduler) drives the whole process to a fixed point (or to a wall-clock deadline).

# Orientation

At a high level the library splits into three layers:

- The [databases](crate::db): a [DenseSet](crate::db::dense_set::DenseSet) bit-set of obs, the union-find [carrier](crate::db::carrier::Carrier), and the relation and function tables built over them.
  All tables are safe for concurrent reads and inserts; destructive rewrites (the `unsafe_merge` family) are serialized by the scheduler's strict lock.
- The [scheduler](crate::scheduler): per-kind work queues, a strict readers-writer lock separating merge work (exclusive) from everything else (shared), cancellation of queued tasks that mention a merged ob, a lock-free round-robin [cleanup generator](crate::scheduler::cleanup::CleanupGenerator), and a wall-clock deadline.
- The [sampler](crate::sampler): a depth-bounded probabilistic term generator used to seed the structure with random well-formed terms.

The inference rules themselves are *not* part of the library.
Task bodies are supplied through the [Executor](crate::scheduler::tasks::Executor) trait, so a client theory decides what an order task or a function task enforces; the library guarantees only that the store stays internally consistent across inserts and merges.

# Example

```no_run
use std::sync::Arc;
use pomagma::config::Config;
use pomagma::db::carrier::Carrier;
use pomagma::db::signature::Signature;
use pomagma::scheduler::tasks::{MergeTask, Task};
use pomagma::scheduler::Scheduler;

let config = Config::from_env().unwrap();
let scheduler = Arc::new(Scheduler::new(&config, 1));

let merge_scheduler = Arc::clone(&scheduler);
let carrier = Arc::new(Carrier::new(
    1 << 12,
    Some(Box::new(move |dep| {
        merge_scheduler.schedule(Task::Merge(MergeTask { dep }));
    })),
));

let mut signature = Signature::new(Arc::clone(&carrier));
// … declare relations and functions, wire their insert callbacks to the
// scheduler, seed some constants, and run a phase with an executor.
# let _ = &mut signature;
```

# Logs

Log calls are made throughout the library through the [log] facade, with per-component targets listed in [misc::log::targets].
No log implementation is installed by the library; the `pomagma_grow` binary installs [env_logger] configured from the `POMAGMA_LOG_LEVEL` and `POMAGMA_LOG_FILE` environment variables.
*/

#![allow(clippy::collapsible_else_if)]
#![allow(clippy::single_match)]
#![allow(clippy::too_many_arguments)]

pub mod config;
pub mod types;

pub mod generic;
pub mod misc;

pub mod db;

pub mod sampler;
pub mod scheduler;
