/*!
The units of work dispatched by the [Scheduler](crate::scheduler::Scheduler).

Task records are small values: obs, typed table keys, and (for assumptions) an expression string.
Each record answers [references](Task::references) so the scheduler can cancel queued work that mentions a merged-away ob.

The scheduler guarantees:
- never to execute a merge task while any other task is being executed;
- to execute a merge task as soon as all previously running tasks complete;
- while executing a merge of `dep`, to discard all queued tasks touching `dep`.

Task *bodies* are supplied by the client theory through [Executor]; the library fixes only the merge discipline, not what an order or function task enforces.
*/

use rand_core::RngCore;

use crate::db::keys::{
    BinaryFunctionKey, InjectiveFunctionKey, NullaryFunctionKey, SymmetricFunctionKey,
    UnaryRelationKey,
};
use crate::db::Ob;

/// Eliminate a merged-away ob from every table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergeTask {
    /// The deprecated ob.
    pub dep: Ob,
}

/// React to a freshly created ob.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExistsTask {
    pub ob: Ob,
}

/// React to a freshly asserted positive order fact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PositiveOrderTask {
    pub lhs: Ob,
    pub rhs: Ob,
}

/// React to a freshly asserted negative order fact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NegativeOrderTask {
    pub lhs: Ob,
    pub rhs: Ob,
}

/// React to a freshly related ob of a unary relation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnaryRelationTask {
    pub rel: UnaryRelationKey,
    pub ob: Ob,
}

/// React to a freshly defined constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NullaryFunctionTask {
    pub fun: NullaryFunctionKey,
}

/// React to a freshly defined point of an injective function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InjectiveFunctionTask {
    pub fun: InjectiveFunctionKey,
    pub arg: Ob,
}

/// React to a freshly defined point of a binary function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BinaryFunctionTask {
    pub fun: BinaryFunctionKey,
    pub lhs: Ob,
    pub rhs: Ob,
}

/// React to a freshly defined point of a symmetric function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SymmetricFunctionTask {
    pub fun: SymmetricFunctionKey,
    pub lhs: Ob,
    pub rhs: Ob,
}

/// Assume an externally supplied fact, given as an expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssumeTask {
    pub expression: String,
}

/// Insert one random term.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleTask;

/// Run one cleanup class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CleanupTask {
    pub type_index: usize,
}

/// The tagged union of every task kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Task {
    Merge(MergeTask),
    Exists(ExistsTask),
    PositiveOrder(PositiveOrderTask),
    NegativeOrder(NegativeOrderTask),
    UnaryRelation(UnaryRelationTask),
    NullaryFunction(NullaryFunctionTask),
    InjectiveFunction(InjectiveFunctionTask),
    BinaryFunction(BinaryFunctionTask),
    SymmetricFunction(SymmetricFunctionTask),
    Assume(AssumeTask),
    Sample(SampleTask),
    Cleanup(CleanupTask),
}

impl Task {
    /// True if executing this task would touch `dep`.
    pub fn references(&self, dep: Ob) -> bool {
        match self {
            Self::Merge(task) => task.dep == dep,
            Self::Exists(task) => task.ob == dep,
            Self::PositiveOrder(task) => task.lhs == dep || task.rhs == dep,
            Self::NegativeOrder(task) => task.lhs == dep || task.rhs == dep,
            Self::UnaryRelation(task) => task.ob == dep,
            Self::NullaryFunction(_) => false,
            Self::InjectiveFunction(task) => task.arg == dep,
            Self::BinaryFunction(task) => task.lhs == dep || task.rhs == dep,
            Self::SymmetricFunction(task) => task.lhs == dep || task.rhs == dep,
            Self::Assume(_) => false,
            Self::Sample(_) => false,
            Self::Cleanup(_) => false,
        }
    }
}

/// Queue-level view of a task record: the cancellation predicate plus
/// promotion into the [Task] union handed to executors.
pub(super) trait TaskRecord: Send {
    fn references(&self, dep: Ob) -> bool;
    fn into_task(self) -> Task;
}

macro_rules! task_record {
    ($record:ident, $variant:ident, |$task:ident, $dep:ident| $references:expr) => {
        impl TaskRecord for $record {
            fn references(&self, $dep: Ob) -> bool {
                let $task = self;
                $references
            }

            fn into_task(self) -> Task {
                Task::$variant(self)
            }
        }
    };
}

task_record!(ExistsTask, Exists, |task, dep| task.ob == dep);
task_record!(PositiveOrderTask, PositiveOrder, |task, dep| task.lhs == dep
    || task.rhs == dep);
task_record!(NegativeOrderTask, NegativeOrder, |task, dep| task.lhs == dep
    || task.rhs == dep);
task_record!(UnaryRelationTask, UnaryRelation, |task, dep| task.ob == dep);
task_record!(NullaryFunctionTask, NullaryFunction, |_task, _dep| false);
task_record!(InjectiveFunctionTask, InjectiveFunction, |task, dep| task.arg
    == dep);
task_record!(BinaryFunctionTask, BinaryFunction, |task, dep| task.lhs == dep
    || task.rhs == dep);
task_record!(SymmetricFunctionTask, SymmetricFunction, |task, dep| task.lhs
    == dep
    || task.rhs == dep);
task_record!(AssumeTask, Assume, |_task, _dep| false);

/// Task bodies, supplied by the client theory.
///
/// The scheduler calls [execute_merge](Executor::execute_merge) under the
/// unique strict lock and [execute](Executor::execute) under the shared one.
/// Bodies must not touch the strict lock themselves, and must not block ---
/// though they may insert facts and schedule further tasks synchronously.
pub trait Executor: Sync {
    /// Eliminate `task.dep` from every table; conventionally
    /// [Signature::unsafe_merge](crate::db::signature::Signature::unsafe_merge).
    fn execute_merge(&self, task: &MergeTask);

    /// Run a non-merge task.
    fn execute(&self, task: Task, rng: &mut dyn RngCore);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_checks_payload_obs() {
        assert!(Task::Merge(MergeTask { dep: 3 }).references(3));
        assert!(Task::Exists(ExistsTask { ob: 7 }).references(7));
        assert!(!Task::Exists(ExistsTask { ob: 7 }).references(8));
        assert!(Task::PositiveOrder(PositiveOrderTask { lhs: 1, rhs: 2 }).references(2));
        assert!(!Task::NullaryFunction(NullaryFunctionTask {
            fun: crate::db::keys::NullaryFunctionKey(0)
        })
        .references(1));
        assert!(!Task::Assume(AssumeTask {
            expression: "EQUAL APP K K K".to_owned()
        })
        .references(1));
        assert!(!Task::Sample(SampleTask).references(1));
    }
}
