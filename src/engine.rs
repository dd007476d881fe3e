//! Engine facade tying tables, planner, and executor together.

use std::time::Instant;

use tracing::info;

use crate::query::executor::Executor;
use crate::query::params::QueryParams;
use crate::query::planner::{PlanExplain, Planner, PlannerConfig};
use crate::query::profile::{profile_timer, record_profile_timer, QueryProfileKind};
use crate::query::rows::QueryOutput;
use crate::record::source::Tables;
use crate::types::Result;

/// Entry point for running the shipping-priority report.
///
/// The engine owns a validated table bundle and a planner; each call plans
/// against current source estimates and executes the resulting plan.
pub struct Engine {
    tables: Tables,
    planner: Planner,
}

impl Engine {
    /// Creates an engine over a validated table bundle.
    pub fn new(tables: Tables) -> Self {
        Self {
            tables,
            planner: Planner::default(),
        }
    }

    /// Creates an engine with explicit planner configuration.
    pub fn with_planner_config(tables: Tables, config: PlannerConfig) -> Self {
        Self {
            tables,
            planner: Planner::new(config),
        }
    }

    /// Runs the report and returns the sorted revenue groups.
    pub fn shipping_priority(&self, params: &QueryParams) -> Result<QueryOutput> {
        let started = Instant::now();
        let plan_timer = profile_timer();
        let planned = self.planner.plan(&self.tables, params)?;
        record_profile_timer(QueryProfileKind::Plan, plan_timer);

        let rows = Executor::new(&self.tables).execute(&planned.plan)?;
        let elapsed = started.elapsed();
        let plan_hash_hex = format!("{:016x}", planned.plan_hash);
        info!(
            rows = rows.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            plan_hash = %plan_hash_hex,
            "shipping-priority query complete"
        );
        Ok(QueryOutput {
            rows,
            plan_hash: planned.plan_hash,
            elapsed,
        })
    }

    /// Builds and explains the plan without executing it.
    pub fn explain(&self, params: &QueryParams) -> Result<PlanExplain> {
        Ok(self.planner.plan(&self.tables, params)?.explain)
    }
}
