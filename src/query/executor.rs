//! Streaming operators and the plan interpreter.
//!
//! Execution is pull-based: every stage implements [`RecordStream`] and
//! produces its next tuple on demand. The three scan-filter-project
//! pipelines are fused into one stage per relation; hash joins materialize
//! their build side up front and stream the probe side; the fold and the
//! sort are the only other materialization points.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::hash::Hash;

use rustc_hash::FxHashMap;
use time::Date;
use tracing::debug;

use crate::query::plan::{
    BuildSide, JoinKey, PhysicalNode, PhysicalOp, PhysicalPlan, Predicate, Projection, TableName,
};
use crate::query::profile::{profile_timer, record_profile_timer, QueryProfileKind};
use crate::query::rows::{LineItemRevenue, OrderTuple, ResultRow};
use crate::record::schema;
use crate::record::source::{RecordCursor, RecordSource, Tables};
use crate::types::{format_date, parse_date, CustKey, FaroError, OrderKey, Result};

/// Pull-based stream of typed tuples.
pub trait RecordStream {
    /// Tuple type produced by this stage.
    type Item;

    /// Returns the next tuple, or `None` once the stream is exhausted.
    fn try_next(&mut self) -> Result<Option<Self::Item>>;
}

/// Boxed stream with its concrete stage type erased.
pub type BoxStream<'a, T> = Box<dyn RecordStream<Item = T> + 'a>;

impl<T> RecordStream for Box<dyn RecordStream<Item = T> + '_> {
    type Item = T;

    fn try_next(&mut self) -> Result<Option<T>> {
        (**self).try_next()
    }
}

/// Adapts any iterator into a stream.
pub struct IterStream<I> {
    inner: I,
}

impl<I: Iterator> IterStream<I> {
    /// Wraps an iterator.
    pub fn new(inner: I) -> Self {
        Self { inner }
    }
}

impl<I: Iterator> RecordStream for IterStream<I> {
    type Item = I::Item;

    fn try_next(&mut self) -> Result<Option<I::Item>> {
        Ok(self.inner.next())
    }
}

/// Applies an infallible transform to each upstream tuple.
pub struct MapStream<S, F> {
    inner: S,
    f: F,
}

impl<S, F> MapStream<S, F> {
    /// Wraps a stream with a per-tuple transform.
    pub fn new(inner: S, f: F) -> Self {
        Self { inner, f }
    }
}

impl<S, F, T> RecordStream for MapStream<S, F>
where
    S: RecordStream,
    F: FnMut(S::Item) -> T,
{
    type Item = T;

    fn try_next(&mut self) -> Result<Option<T>> {
        Ok(self.inner.try_next()?.map(&mut self.f))
    }
}

/// Drains a stream into a vector.
pub fn collect_rows<S: RecordStream>(stream: &mut S) -> Result<Vec<S::Item>> {
    let mut rows = Vec::new();
    while let Some(row) = stream.try_next()? {
        rows.push(row);
    }
    Ok(rows)
}

/// Streaming hash join.
///
/// The build input is materialized into a table keyed by its join key; the
/// probe input streams through and looks each tuple up. A probe tuple that
/// matches `m` build tuples emits `m` pairs, so duplicate keys on both
/// sides multiply.
pub struct HashJoinStream<K, B, S, PK>
where
    S: RecordStream,
{
    build: FxHashMap<K, Vec<B>>,
    probe: S,
    probe_key: PK,
    pending: Vec<(B, S::Item)>,
    pending_idx: usize,
}

impl<K, B, S, PK> HashJoinStream<K, B, S, PK>
where
    K: Eq + Hash,
    B: Clone,
    S: RecordStream,
    S::Item: Clone,
    PK: Fn(&S::Item) -> K,
{
    /// Materializes the build side and leaves the probe side streaming.
    pub fn new<BS, BK>(
        mut build_side: BS,
        build_key: BK,
        probe: S,
        probe_key: PK,
    ) -> Result<Self>
    where
        BS: RecordStream<Item = B>,
        BK: Fn(&B) -> K,
    {
        let timer = profile_timer();
        let mut build: FxHashMap<K, Vec<B>> = FxHashMap::default();
        let mut rows = 0u64;
        while let Some(row) = build_side.try_next()? {
            build.entry(build_key(&row)).or_default().push(row);
            rows += 1;
        }
        record_profile_timer(QueryProfileKind::JoinBuild, timer);
        debug!(rows, keys = build.len(), "materialized hash join build side");
        Ok(Self {
            build,
            probe,
            probe_key,
            pending: Vec::new(),
            pending_idx: 0,
        })
    }
}

impl<K, B, S, PK> RecordStream for HashJoinStream<K, B, S, PK>
where
    K: Eq + Hash,
    B: Clone,
    S: RecordStream,
    S::Item: Clone,
    PK: Fn(&S::Item) -> K,
{
    type Item = (B, S::Item);

    fn try_next(&mut self) -> Result<Option<Self::Item>> {
        loop {
            if self.pending_idx < self.pending.len() {
                let pair = self.pending[self.pending_idx].clone();
                self.pending_idx += 1;
                return Ok(Some(pair));
            }
            self.pending.clear();
            self.pending_idx = 0;

            let Some(row) = self.probe.try_next()? else {
                return Ok(None);
            };
            if let Some(candidates) = self.build.get(&(self.probe_key)(&row)) {
                for build_row in candidates {
                    self.pending.push((build_row.clone(), row.clone()));
                }
            }
        }
    }
}

/// Folds a stream into per-key accumulators.
///
/// The first tuple seen for a key becomes its accumulator; `combine` merges
/// every later tuple of the same key into it. Keys may arrive in any order
/// and the output order is unspecified. `combine` must be associative and
/// commutative, so folding partitions separately and merging per key yields
/// the same groups.
pub fn reduce_by_key<S, K, KF, CF>(mut input: S, key: KF, mut combine: CF) -> Result<Vec<S::Item>>
where
    S: RecordStream,
    K: Eq + Hash,
    KF: Fn(&S::Item) -> K,
    CF: FnMut(&mut S::Item, S::Item) -> Result<()>,
{
    let mut groups: FxHashMap<K, S::Item> = FxHashMap::default();
    while let Some(item) = input.try_next()? {
        match groups.entry(key(&item)) {
            Entry::Occupied(mut slot) => combine(slot.get_mut(), item)?,
            Entry::Vacant(slot) => {
                slot.insert(item);
            }
        }
    }
    Ok(groups.into_values().collect())
}

/// Output ordering: revenue descending, then order date ascending, then
/// order key ascending.
pub fn compare_rows(a: &ResultRow, b: &ResultRow) -> Ordering {
    b.revenue
        .total_cmp(&a.revenue)
        .then_with(|| a.order_date.cmp(&b.order_date))
        .then_with(|| a.order_key.cmp(&b.order_key))
}

/// Customer pipeline: keep the segment's customers, emit bare keys.
struct CustomerKeys<'a> {
    cursor: Box<dyn RecordCursor + 'a>,
    segment: String,
}

impl<'a> CustomerKeys<'a> {
    fn new(source: &'a dyn RecordSource, segment: String) -> Result<Self> {
        Ok(Self {
            cursor: source.scan()?,
            segment,
        })
    }
}

impl RecordStream for CustomerKeys<'_> {
    type Item = CustKey;

    fn try_next(&mut self) -> Result<Option<CustKey>> {
        while let Some(record) = self.cursor.try_next()? {
            if record.get_str(schema::customer::MKTSEGMENT)? == self.segment {
                return Ok(Some(CustKey(record.get_long(schema::customer::CUSTKEY)?)));
            }
        }
        Ok(None)
    }
}

/// Orders pipeline: keep orders placed strictly before the cutoff.
struct OrderTuples<'a> {
    cursor: Box<dyn RecordCursor + 'a>,
    cutoff: Date,
}

impl<'a> OrderTuples<'a> {
    fn new(source: &'a dyn RecordSource, cutoff: Date) -> Result<Self> {
        Ok(Self {
            cursor: source.scan()?,
            cutoff,
        })
    }
}

impl RecordStream for OrderTuples<'_> {
    type Item = OrderTuple;

    fn try_next(&mut self) -> Result<Option<OrderTuple>> {
        while let Some(record) = self.cursor.try_next()? {
            let order_date = parse_date(
                "orders.o_orderdate",
                record.get_str(schema::orders::ORDERDATE)?,
            )?;
            if order_date < self.cutoff {
                return Ok(Some(OrderTuple {
                    order_key: OrderKey(record.get_long(schema::orders::ORDERKEY)?),
                    cust_key: CustKey(record.get_long(schema::orders::CUSTKEY)?),
                    order_date,
                    ship_priority: record.get_int(schema::orders::SHIPPRIORITY)?,
                }));
            }
        }
        Ok(None)
    }
}

/// Lineitem pipeline: keep lines shipped strictly after the cutoff and
/// reduce each to its revenue contribution.
struct LineItemRevenues<'a> {
    cursor: Box<dyn RecordCursor + 'a>,
    cutoff: Date,
}

impl<'a> LineItemRevenues<'a> {
    fn new(source: &'a dyn RecordSource, cutoff: Date) -> Result<Self> {
        Ok(Self {
            cursor: source.scan()?,
            cutoff,
        })
    }
}

impl RecordStream for LineItemRevenues<'_> {
    type Item = LineItemRevenue;

    fn try_next(&mut self) -> Result<Option<LineItemRevenue>> {
        while let Some(record) = self.cursor.try_next()? {
            let ship_date = parse_date(
                "lineitem.l_shipdate",
                record.get_str(schema::lineitem::SHIPDATE)?,
            )?;
            if ship_date > self.cutoff {
                let price = record.get_double(schema::lineitem::EXTENDEDPRICE)?;
                let discount = record.get_double(schema::lineitem::DISCOUNT)?;
                return Ok(Some(LineItemRevenue {
                    order_key: OrderKey(record.get_long(schema::lineitem::ORDERKEY)?),
                    revenue: price * (1.0 - discount),
                }));
            }
        }
        Ok(None)
    }
}

/// Flags joined pairs that share an order key but disagree on order date or
/// ship priority. Well-formed data carries one orders row per key, so a
/// disagreement means the join was fed corrupted input.
struct OrderIdentityCheck<S> {
    inner: S,
    seen: FxHashMap<OrderKey, (Date, i32)>,
}

impl<S> OrderIdentityCheck<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            seen: FxHashMap::default(),
        }
    }
}

impl<S> RecordStream for OrderIdentityCheck<S>
where
    S: RecordStream<Item = (OrderTuple, LineItemRevenue)>,
{
    type Item = (OrderTuple, LineItemRevenue);

    fn try_next(&mut self) -> Result<Option<Self::Item>> {
        let Some((order, line)) = self.inner.try_next()? else {
            return Ok(None);
        };
        match self.seen.entry(order.order_key) {
            Entry::Occupied(entry) => {
                let (order_date, ship_priority) = *entry.get();
                if order_date != order.order_date || ship_priority != order.ship_priority {
                    return Err(FaroError::AggregationInvariant {
                        order_key: order.order_key.0,
                        detail: format!(
                            "order appears as ({}, {}) and ({}, {})",
                            format_date(order_date),
                            ship_priority,
                            format_date(order.order_date),
                            order.ship_priority
                        ),
                    });
                }
            }
            Entry::Vacant(entry) => {
                entry.insert((order.order_date, order.ship_priority));
            }
        }
        Ok(Some((order, line)))
    }
}

/// One scan-filter-project pipeline described by the plan.
struct PipelineSpec<'p> {
    table: TableName,
    pred: &'p Predicate,
    proj: Projection,
}

fn pipeline_spec(node: &PhysicalNode) -> Result<PipelineSpec<'_>> {
    let PhysicalOp::Project { proj } = &node.op else {
        return Err(FaroError::Invalid("pipeline must start with a project"));
    };
    let [filter_node] = node.inputs.as_slice() else {
        return Err(FaroError::Invalid("project expects a single input"));
    };
    let PhysicalOp::Filter { pred, .. } = &filter_node.op else {
        return Err(FaroError::Invalid("project expects a filter input"));
    };
    let [scan_node] = filter_node.inputs.as_slice() else {
        return Err(FaroError::Invalid("filter expects a single input"));
    };
    let PhysicalOp::Scan { table } = &scan_node.op else {
        return Err(FaroError::Invalid("filter expects a scan input"));
    };
    if !scan_node.inputs.is_empty() {
        return Err(FaroError::Invalid("scan expects no inputs"));
    }
    Ok(PipelineSpec {
        table: *table,
        pred,
        proj: *proj,
    })
}

/// Runs a physical plan over a table bundle.
pub struct Executor<'a> {
    tables: &'a Tables,
}

impl<'a> Executor<'a> {
    /// Creates an executor over the given tables.
    pub fn new(tables: &'a Tables) -> Self {
        Self { tables }
    }

    /// Executes the plan and materializes the sorted output rows.
    pub fn execute(&self, plan: &PhysicalPlan) -> Result<Vec<ResultRow>> {
        let root = &plan.root;
        let PhysicalOp::Sort = &root.op else {
            return Err(FaroError::Invalid("plan root must be a sort"));
        };
        let [aggregate_node] = root.inputs.as_slice() else {
            return Err(FaroError::Invalid("sort expects a single input"));
        };
        let PhysicalOp::GroupAggregate = &aggregate_node.op else {
            return Err(FaroError::Invalid("sort expects a group aggregate input"));
        };
        let [second_join_node] = aggregate_node.inputs.as_slice() else {
            return Err(FaroError::Invalid("group aggregate expects a single input"));
        };
        let PhysicalOp::HashJoin {
            key: JoinKey::OrderKey,
            build: second_build,
        } = &second_join_node.op
        else {
            return Err(FaroError::Invalid(
                "group aggregate expects an order-key hash join input",
            ));
        };
        let [first_join_node, lineitem_node] = second_join_node.inputs.as_slice() else {
            return Err(FaroError::Invalid("order-key hash join expects two inputs"));
        };
        let PhysicalOp::HashJoin {
            key: JoinKey::CustKey,
            build: first_build,
        } = &first_join_node.op
        else {
            return Err(FaroError::Invalid(
                "order-key hash join expects a customer-key hash join input",
            ));
        };
        let [customer_node, orders_node] = first_join_node.inputs.as_slice() else {
            return Err(FaroError::Invalid(
                "customer-key hash join expects two inputs",
            ));
        };

        let customers = self.customer_stream(&pipeline_spec(customer_node)?)?;
        let orders = self.orders_stream(&pipeline_spec(orders_node)?)?;
        let lineitems = self.lineitem_stream(&pipeline_spec(lineitem_node)?)?;

        let first: BoxStream<'_, OrderTuple> = match first_build {
            BuildSide::Right => {
                let join = HashJoinStream::new(
                    orders,
                    |o: &OrderTuple| o.cust_key,
                    customers,
                    |c: &CustKey| *c,
                )?;
                Box::new(MapStream::new(join, |(order, _): (OrderTuple, CustKey)| {
                    order
                }))
            }
            BuildSide::Left => {
                let join = HashJoinStream::new(
                    customers,
                    |c: &CustKey| *c,
                    orders,
                    |o: &OrderTuple| o.cust_key,
                )?;
                Box::new(MapStream::new(join, |(_, order): (CustKey, OrderTuple)| {
                    order
                }))
            }
        };

        let second: BoxStream<'_, (OrderTuple, LineItemRevenue)> = match second_build {
            BuildSide::Left => Box::new(HashJoinStream::new(
                first,
                |o: &OrderTuple| o.order_key,
                lineitems,
                |l: &LineItemRevenue| l.order_key,
            )?),
            BuildSide::Right => {
                let join = HashJoinStream::new(
                    lineitems,
                    |l: &LineItemRevenue| l.order_key,
                    first,
                    |o: &OrderTuple| o.order_key,
                )?;
                Box::new(MapStream::new(
                    join,
                    |(line, order): (LineItemRevenue, OrderTuple)| (order, line),
                ))
            }
        };

        let checked = OrderIdentityCheck::new(second);
        let mapped = MapStream::new(
            checked,
            |(order, line): (OrderTuple, LineItemRevenue)| ResultRow::new(&order, &line),
        );

        let fold_timer = profile_timer();
        let mut rows = reduce_by_key(mapped, ResultRow::key, |group, row| group.accumulate(row))?;
        record_profile_timer(QueryProfileKind::Fold, fold_timer);
        debug!(groups = rows.len(), "folded revenue groups");

        let sort_timer = profile_timer();
        rows.sort_by(compare_rows);
        record_profile_timer(QueryProfileKind::Sort, sort_timer);
        Ok(rows)
    }

    fn customer_stream(&self, spec: &PipelineSpec<'_>) -> Result<CustomerKeys<'a>> {
        if spec.table != TableName::Customer || spec.proj != Projection::CustomerKey {
            return Err(FaroError::Invalid("customer pipeline is mis-shaped"));
        }
        let Predicate::SegmentEquals(segment) = spec.pred else {
            return Err(FaroError::Invalid(
                "customer pipeline expects a segment filter",
            ));
        };
        CustomerKeys::new(self.tables.customer.as_ref(), segment.clone())
    }

    fn orders_stream(&self, spec: &PipelineSpec<'_>) -> Result<OrderTuples<'a>> {
        if spec.table != TableName::Orders || spec.proj != Projection::OrderTuple {
            return Err(FaroError::Invalid("orders pipeline is mis-shaped"));
        }
        let Predicate::OrderedBefore(cutoff) = spec.pred else {
            return Err(FaroError::Invalid(
                "orders pipeline expects an order-date filter",
            ));
        };
        OrderTuples::new(self.tables.orders.as_ref(), *cutoff)
    }

    fn lineitem_stream(&self, spec: &PipelineSpec<'_>) -> Result<LineItemRevenues<'a>> {
        if spec.table != TableName::Lineitem || spec.proj != Projection::LineItemRevenue {
            return Err(FaroError::Invalid("lineitem pipeline is mis-shaped"));
        }
        let Predicate::ShippedAfter(cutoff) = spec.pred else {
            return Err(FaroError::Invalid(
                "lineitem pipeline expects a ship-date filter",
            ));
        };
        LineItemRevenues::new(self.tables.lineitem.as_ref(), *cutoff)
    }
}
