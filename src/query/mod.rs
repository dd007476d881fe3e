#![forbid(unsafe_code)]

//! The fixed shipping-priority query pipeline.
//!
//! One query shape is supported: filter the three relations, join customers
//! to orders on customer key, join the survivors to line items on order key,
//! fold revenue per order group, and sort the groups. The submodules split
//! that shape into parameters, plan, planner, executor, and profiling.

/// Streaming operators and the plan interpreter.
///
/// Pulls rows through typed stages and materializes the sorted output.
pub mod executor;

/// Query parameters and their defaults.
pub mod params;

/// Physical plan representation.
///
/// Executable operator tree with per-node configuration.
pub mod plan;

/// Plan construction, selectivity estimation, and explain output.
pub mod planner;

/// Performance profiling for pipeline stages.
///
/// Collects timing and count statistics to identify bottlenecks.
pub mod profile;

/// Typed tuples flowing between stages, and the query output.
pub mod rows;

pub use params::{QueryParams, DEFAULT_CUTOFF, DEFAULT_SEGMENT};
pub use planner::{PlanExplain, Planner, PlannerConfig, PlannerOutput};
pub use rows::{QueryOutput, ResultRow};
