//! Env-gated stage timing for the query pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

/// A snapshot of query execution profiling metrics.
///
/// Profiling is enabled via the `FARO_PROFILE` environment variable and is
/// latched on first use; when disabled every profiling call is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryProfileSnapshot {
    /// Total nanoseconds spent planning.
    pub plan_ns: u64,
    /// Number of planning operations.
    pub plan_count: u64,
    /// Total nanoseconds spent materializing hash join build sides.
    pub join_build_ns: u64,
    /// Number of build-side materializations.
    pub join_build_count: u64,
    /// Total nanoseconds spent folding joined pairs into groups.
    ///
    /// The fold loop pulls probe rows through the upstream scans and
    /// filters, so their cost lands in this bucket as well.
    pub fold_ns: u64,
    /// Number of fold operations.
    pub fold_count: u64,
    /// Total nanoseconds spent sorting groups.
    pub sort_ns: u64,
    /// Number of sort operations.
    pub sort_count: u64,
}

#[derive(Default)]
struct QueryProfileCounters {
    plan_ns: AtomicU64,
    plan_count: AtomicU64,
    join_build_ns: AtomicU64,
    join_build_count: AtomicU64,
    fold_ns: AtomicU64,
    fold_count: AtomicU64,
    sort_ns: AtomicU64,
    sort_count: AtomicU64,
}

static PROFILE_ENABLED: OnceLock<bool> = OnceLock::new();
static PROFILE_COUNTERS: OnceLock<QueryProfileCounters> = OnceLock::new();

fn profiling_enabled() -> bool {
    *PROFILE_ENABLED.get_or_init(|| std::env::var_os("FARO_PROFILE").is_some())
}

fn counters() -> Option<&'static QueryProfileCounters> {
    profiling_enabled().then(|| PROFILE_COUNTERS.get_or_init(QueryProfileCounters::default))
}

pub(crate) fn profile_timer() -> Option<Instant> {
    profiling_enabled().then(Instant::now)
}

pub(crate) enum QueryProfileKind {
    /// Profiling for plan construction.
    Plan,
    /// Profiling for hash join build-side materialization.
    JoinBuild,
    /// Profiling for the group-fold drain.
    Fold,
    /// Profiling for output sorting.
    Sort,
}

pub(crate) fn record_profile_timer(kind: QueryProfileKind, start: Option<Instant>) {
    let Some(start) = start else {
        return;
    };
    let Some(counters) = counters() else {
        return;
    };
    let nanos = start.elapsed().as_nanos().min(u64::MAX as u128) as u64;
    match kind {
        QueryProfileKind::Plan => {
            counters.plan_ns.fetch_add(nanos, Ordering::Relaxed);
            counters.plan_count.fetch_add(1, Ordering::Relaxed);
        }
        QueryProfileKind::JoinBuild => {
            counters.join_build_ns.fetch_add(nanos, Ordering::Relaxed);
            counters.join_build_count.fetch_add(1, Ordering::Relaxed);
        }
        QueryProfileKind::Fold => {
            counters.fold_ns.fetch_add(nanos, Ordering::Relaxed);
            counters.fold_count.fetch_add(1, Ordering::Relaxed);
        }
        QueryProfileKind::Sort => {
            counters.sort_ns.fetch_add(nanos, Ordering::Relaxed);
            counters.sort_count.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Retrieves a snapshot of current query profiling metrics.
///
/// Pass `reset: true` to zero the counters after reading them. Returns
/// `None` unless profiling was enabled via the `FARO_PROFILE` environment
/// variable.
///
/// # Example
///
/// ```no_run
/// use faro::query::profile::profile_snapshot;
///
/// if let Some(snapshot) = profile_snapshot(false) {
///     println!("join build time: {}ns", snapshot.join_build_ns);
/// }
/// ```
pub fn profile_snapshot(reset: bool) -> Option<QueryProfileSnapshot> {
    let counters = counters()?;
    let load = |counter: &AtomicU64| {
        if reset {
            counter.swap(0, Ordering::Relaxed)
        } else {
            counter.load(Ordering::Relaxed)
        }
    };
    Some(QueryProfileSnapshot {
        plan_ns: load(&counters.plan_ns),
        plan_count: load(&counters.plan_count),
        join_build_ns: load(&counters.join_build_ns),
        join_build_count: load(&counters.join_build_count),
        fold_ns: load(&counters.fold_ns),
        fold_count: load(&counters.fold_count),
        sort_ns: load(&counters.sort_ns),
        sort_count: load(&counters.sort_count),
    })
}
