//! Builds, hashes, and explains the shipping-priority plan.

use std::hash::Hasher;

use serde::Serialize;
use tracing::debug;
use xxhash_rust::xxh64::Xxh64;

use crate::query::params::QueryParams;
use crate::query::plan::{
    BuildSide, JoinKey, PhysicalNode, PhysicalOp, PhysicalPlan, Predicate, Projection, TableName,
};
use crate::record::source::Tables;
use crate::types::{format_date, Result};

/// Selectivity assumed for the segment equality filter: one segment out of
/// the five the reference data uses.
const DEFAULT_EQ_SELECTIVITY: f64 = 0.2;
/// Selectivity assumed for either date comparison.
const DEFAULT_RANGE_SELECTIVITY: f64 = 0.3;
const MIN_SELECTIVITY: f64 = 1e-6;

/// Configuration for plan generation.
#[derive(Clone, Debug)]
pub struct PlannerConfig {
    /// Whether source row estimates may steer hash join build sides.
    ///
    /// When disabled the planner always emits the reference shape: the
    /// first join builds on orders, the second on the joined orders.
    pub use_row_estimates: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            use_row_estimates: true,
        }
    }
}

/// Planner output containing the chosen physical plan and explain tree.
#[derive(Clone, Debug)]
pub struct PlannerOutput {
    /// The generated physical query plan.
    pub plan: PhysicalPlan,
    /// Human-readable explain tree.
    pub explain: PlanExplain,
    /// Deterministic plan hash for explain and logging.
    pub plan_hash: u64,
}

/// Human-readable explain tree.
#[derive(Clone, Debug, Serialize)]
pub struct PlanExplain {
    /// Root node of the explain tree.
    pub root: ExplainNode,
    /// Deterministic hash for the plan.
    pub plan_hash: u64,
}

/// Explain node representing an operator with optional metadata.
#[derive(Clone, Debug, Serialize)]
pub struct ExplainNode {
    /// Operator name.
    pub op: String,
    /// Additional properties describing the operator.
    pub props: Vec<ExplainProp>,
    /// Input operators.
    pub inputs: Vec<ExplainNode>,
}

impl ExplainNode {
    /// Creates a new explain node with the given operator name.
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            props: Vec::new(),
            inputs: Vec::new(),
        }
    }
}

/// Single property associated with an [`ExplainNode`].
#[derive(Clone, Debug, Serialize)]
pub struct ExplainProp {
    /// Property key.
    pub key: String,
    /// Property value serialized for display.
    pub value: String,
    /// Whether this property contains literal data that may be redacted.
    pub redactable: bool,
}

impl ExplainProp {
    fn plain(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            redactable: false,
        }
    }

    fn literal(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            redactable: true,
        }
    }
}

/// Builds the fixed plan for a parameter set over a table bundle.
///
/// The operator tree always has the same shape; only the filter literals
/// and the two hash join build sides vary. Build sides follow source row
/// estimates when available and fall back to the reference sides otherwise.
#[derive(Clone, Debug, Default)]
pub struct Planner {
    config: PlannerConfig,
}

struct Estimates {
    customers_kept: Option<u64>,
    orders_kept: Option<u64>,
    lineitems_kept: Option<u64>,
}

impl Estimates {
    fn none() -> Self {
        Self {
            customers_kept: None,
            orders_kept: None,
            lineitems_kept: None,
        }
    }

    fn gather(tables: &Tables) -> Self {
        Self {
            customers_kept: estimated_out(tables.customer.estimated_rows(), DEFAULT_EQ_SELECTIVITY),
            orders_kept: estimated_out(tables.orders.estimated_rows(), DEFAULT_RANGE_SELECTIVITY),
            lineitems_kept: estimated_out(
                tables.lineitem.estimated_rows(),
                DEFAULT_RANGE_SELECTIVITY,
            ),
        }
    }

    /// Orders surviving both their own filter and the customer match.
    fn first_join_out(&self) -> Option<u64> {
        self.orders_kept
            .map(|n| ((n as f64) * DEFAULT_EQ_SELECTIVITY).ceil() as u64)
    }
}

fn estimated_out(rows: Option<u64>, selectivity: f64) -> Option<u64> {
    rows.map(|r| ((r as f64) * selectivity.clamp(MIN_SELECTIVITY, 1.0)).ceil() as u64)
}

impl Planner {
    /// Creates a new planner with the given configuration.
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Builds the physical plan for one parameter set.
    pub fn plan(&self, tables: &Tables, params: &QueryParams) -> Result<PlannerOutput> {
        let estimates = if self.config.use_row_estimates {
            Estimates::gather(tables)
        } else {
            Estimates::none()
        };

        let customer = pipeline(
            TableName::Customer,
            Predicate::SegmentEquals(params.segment.clone()),
            DEFAULT_EQ_SELECTIVITY,
            Projection::CustomerKey,
        );
        let orders = pipeline(
            TableName::Orders,
            Predicate::OrderedBefore(params.cutoff),
            DEFAULT_RANGE_SELECTIVITY,
            Projection::OrderTuple,
        );
        let lineitem = pipeline(
            TableName::Lineitem,
            Predicate::ShippedAfter(params.cutoff),
            DEFAULT_RANGE_SELECTIVITY,
            Projection::LineItemRevenue,
        );

        let first_build = choose_first_build(&estimates);
        let first_join = PhysicalNode::with_inputs(
            PhysicalOp::HashJoin {
                key: JoinKey::CustKey,
                build: first_build,
            },
            vec![customer, orders],
        );

        let second_build = choose_second_build(&estimates);
        let second_join = PhysicalNode::with_inputs(
            PhysicalOp::HashJoin {
                key: JoinKey::OrderKey,
                build: second_build,
            },
            vec![first_join, lineitem],
        );

        let aggregate = PhysicalNode::with_inputs(PhysicalOp::GroupAggregate, vec![second_join]);
        let root = PhysicalNode::with_inputs(PhysicalOp::Sort, vec![aggregate]);
        let plan = PhysicalPlan::new(root);

        let plan_hash = compute_plan_hash(&plan);
        let explain = PlanExplain {
            root: build_explain_tree(&plan.root),
            plan_hash,
        };
        let plan_hash_hex = format!("{plan_hash:016x}");
        debug!(
            plan_hash = %plan_hash_hex,
            first_build = ?first_build,
            second_build = ?second_build,
            "planned shipping-priority query"
        );
        Ok(PlannerOutput {
            plan,
            explain,
            plan_hash,
        })
    }
}

fn pipeline(
    table: TableName,
    pred: Predicate,
    selectivity: f64,
    proj: Projection,
) -> PhysicalNode {
    let scan = PhysicalNode::new(PhysicalOp::Scan { table });
    let filter = PhysicalNode::with_inputs(
        PhysicalOp::Filter {
            pred,
            selectivity: selectivity.clamp(MIN_SELECTIVITY, 1.0),
        },
        vec![scan],
    );
    PhysicalNode::with_inputs(PhysicalOp::Project { proj }, vec![filter])
}

/// Inputs are [customer keys, order tuples]; the reference side is orders.
fn choose_first_build(estimates: &Estimates) -> BuildSide {
    match (estimates.customers_kept, estimates.orders_kept) {
        (Some(customers), Some(orders)) if customers < orders => BuildSide::Left,
        _ => BuildSide::Right,
    }
}

/// Inputs are [first join, line items]; the reference side is the first join.
fn choose_second_build(estimates: &Estimates) -> BuildSide {
    match (estimates.first_join_out(), estimates.lineitems_kept) {
        (Some(joined), Some(lineitems)) if lineitems < joined => BuildSide::Right,
        _ => BuildSide::Left,
    }
}

fn build_explain_tree(node: &PhysicalNode) -> ExplainNode {
    let mut explain = ExplainNode::new(node.op.name());
    explain.props = op_props(&node.op);
    explain.inputs = node.inputs.iter().map(build_explain_tree).collect();
    explain
}

fn describe_predicate(pred: &Predicate) -> String {
    match pred {
        Predicate::SegmentEquals(segment) => format!("c_mktsegment = '{segment}'"),
        Predicate::OrderedBefore(cutoff) => {
            format!("o_orderdate < {}", format_date(*cutoff))
        }
        Predicate::ShippedAfter(cutoff) => format!("l_shipdate > {}", format_date(*cutoff)),
    }
}

fn op_props(op: &PhysicalOp) -> Vec<ExplainProp> {
    match op {
        PhysicalOp::Scan { table } => vec![ExplainProp::plain("table", table.as_str())],
        PhysicalOp::Filter { pred, selectivity } => vec![
            ExplainProp::literal("predicate", describe_predicate(pred)),
            ExplainProp::plain("selectivity", format!("{selectivity:.2}")),
        ],
        PhysicalOp::Project { proj } => {
            let tuple = match proj {
                Projection::CustomerKey => "customer_key",
                Projection::OrderTuple => "order_tuple",
                Projection::LineItemRevenue => "lineitem_revenue",
            };
            vec![ExplainProp::plain("tuple", tuple)]
        }
        PhysicalOp::HashJoin { key, build } => {
            let key = match key {
                JoinKey::CustKey => "custkey",
                JoinKey::OrderKey => "orderkey",
            };
            let build = match build {
                BuildSide::Left => "left",
                BuildSide::Right => "right",
            };
            vec![
                ExplainProp::plain("key", key),
                ExplainProp::plain("build", build),
            ]
        }
        PhysicalOp::GroupAggregate => vec![
            ExplainProp::plain("group_by", "o_orderkey, o_orderdate, o_shippriority"),
            ExplainProp::plain("aggregate", "sum(l_extendedprice * (1 - l_discount))"),
        ],
        PhysicalOp::Sort => vec![ExplainProp::plain(
            "order_by",
            "revenue desc, o_orderdate asc, o_orderkey asc",
        )],
    }
}

fn compute_plan_hash(plan: &PhysicalPlan) -> u64 {
    let mut hasher = Xxh64::new(0);
    hash_physical_node(&plan.root, &mut hasher);
    hasher.finish()
}

fn hash_physical_node(node: &PhysicalNode, hasher: &mut Xxh64) {
    hasher.write(node.op.name().as_bytes());
    for prop in op_props(&node.op) {
        hasher.write(prop.key.as_bytes());
        hasher.write(prop.value.as_bytes());
    }
    hasher.write_u64(node.inputs.len() as u64);
    for child in &node.inputs {
        hash_physical_node(child, hasher);
    }
}
