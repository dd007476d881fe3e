//! Physical operator tree built by the planner.

use std::fmt;

use time::Date;

/// Physical plan produced by the planner.
#[derive(Clone, Debug)]
pub struct PhysicalPlan {
    /// The root node of the physical plan tree.
    pub root: PhysicalNode,
}

impl PhysicalPlan {
    /// Creates a new physical plan with the given root node.
    pub fn new(root: PhysicalNode) -> Self {
        Self { root }
    }
}

/// Node within the physical plan tree.
#[derive(Clone, Debug)]
pub struct PhysicalNode {
    /// The physical operator at this node.
    pub op: PhysicalOp,
    /// Child nodes that provide input to this operator.
    pub inputs: Vec<PhysicalNode>,
}

impl PhysicalNode {
    /// Creates a new physical node with no inputs.
    pub fn new(op: PhysicalOp) -> Self {
        Self {
            op,
            inputs: Vec::new(),
        }
    }

    /// Creates a new physical node with the given inputs.
    pub fn with_inputs(op: PhysicalOp, inputs: Vec<PhysicalNode>) -> Self {
        Self { op, inputs }
    }
}

/// Relation scanned by a leaf operator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TableName {
    /// The customer relation.
    Customer,
    /// The orders relation.
    Orders,
    /// The lineitem relation.
    Lineitem,
}

impl TableName {
    /// Lowercase relation name as used by sources and explain output.
    pub fn as_str(self) -> &'static str {
        match self {
            TableName::Customer => "customer",
            TableName::Orders => "orders",
            TableName::Lineitem => "lineitem",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row predicate applied by a filter operator.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Customer market segment equals the literal exactly.
    SegmentEquals(String),
    /// Order date is strictly before the cutoff.
    OrderedBefore(Date),
    /// Ship date is strictly after the cutoff.
    ShippedAfter(Date),
}

/// Tuple shape emitted by a projection operator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Projection {
    /// Bare customer key.
    CustomerKey,
    /// Order key, customer key, order date, ship priority.
    OrderTuple,
    /// Order key and revenue contribution.
    LineItemRevenue,
}

/// Column a hash join matches on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JoinKey {
    /// Customer key; joins customers to orders.
    CustKey,
    /// Order key; joins orders to line items.
    OrderKey,
}

/// Which input of a hash join is materialized into the hash table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildSide {
    /// Materialize the first input, stream the second.
    Left,
    /// Materialize the second input, stream the first.
    Right,
}

/// Physical operators of the shipping-priority pipeline.
#[derive(Clone, Debug)]
pub enum PhysicalOp {
    /// Scans all rows of one relation.
    Scan {
        /// The relation to scan.
        table: TableName,
    },
    /// Filters rows with a single predicate.
    Filter {
        /// The predicate to apply for filtering.
        pred: Predicate,
        /// Estimated predicate selectivity.
        selectivity: f64,
    },
    /// Projects rows into one of the typed tuple shapes.
    Project {
        /// Tuple shape to emit.
        proj: Projection,
    },
    /// Performs a hash join between two streams.
    HashJoin {
        /// Column both inputs are matched on.
        key: JoinKey,
        /// Input materialized into the hash table.
        build: BuildSide,
    },
    /// Folds joined pairs into per-order revenue groups.
    GroupAggregate,
    /// Orders groups by revenue, order date, then order key.
    Sort,
}

impl PhysicalOp {
    /// Operator name as shown in explain output.
    pub fn name(&self) -> &'static str {
        match self {
            PhysicalOp::Scan { .. } => "Scan",
            PhysicalOp::Filter { .. } => "Filter",
            PhysicalOp::Project { .. } => "Project",
            PhysicalOp::HashJoin { .. } => "HashJoin",
            PhysicalOp::GroupAggregate => "GroupAggregate",
            PhysicalOp::Sort => "Sort",
        }
    }
}
