/*!
Miscellaneous items related to [logging](log).

Calls to the log macros are made throughout the library, narrowed by target so output can be filtered to the component of interest.

Note, no log implementation is installed by the library.
For details, see [log].
*/

/// Targets to be used within a [log] macro.
pub mod targets {
    /// Logs related to the [carrier](crate::db::carrier).
    pub const CARRIER: &str = "carrier";

    /// Logs related to [relations](crate::db::relation).
    pub const RELATION: &str = "relation";

    /// Logs related to [functions](crate::db::function).
    pub const FUNCTION: &str = "function";

    /// Logs related to the [signature](crate::db::signature).
    pub const SIGNATURE: &str = "signature";

    /// Logs related to the [scheduler](crate::scheduler).
    pub const SCHEDULER: &str = "scheduler";

    /// Logs related to [cleanup work](crate::scheduler::cleanup).
    pub const CLEANUP: &str = "cleanup";

    /// Logs related to the [sampler](crate::sampler).
    pub const SAMPLER: &str = "sampler";
}
