use std::cmp::Ordering;
use std::sync::Arc;

use proptest::prelude::*;
use time::macros::date;
use time::{Date, Duration};

use faro::query::executor::compare_rows;
use faro::query::{QueryParams, DEFAULT_CUTOFF};
use faro::record::{Field, MemTable, Record, TableSchema, Tables};
use faro::types::format_date;
use faro::Engine;

const SEGMENTS: [&str; 3] = ["BUILDING", "MACHINERY", "HOUSEHOLD"];

/// Flat relational fixture the nested-loop reference can walk directly.
#[derive(Debug, Clone)]
struct Dataset {
    customers: Vec<(i64, &'static str)>,
    orders: Vec<(i64, i64, Date, i32)>,
    lines: Vec<(i64, f64, f64, Date)>,
}

fn arb_date() -> impl Strategy<Value = Date> {
    (0i64..730).prop_map(|offset| date!(1994 - 06 - 01) + Duration::days(offset))
}

fn arb_dataset() -> impl Strategy<Value = Dataset> {
    let customers = prop::collection::vec(0usize..SEGMENTS.len(), 1..=6);
    let orders = prop::collection::vec((any::<u8>(), arb_date(), 0i32..=1), 0..=12);
    // Prices are whole dollars and discounts exact binary fractions, so
    // revenue sums carry no rounding and compare bit-for-bit.
    let lines = prop::collection::vec(
        (
            any::<u8>(),
            1u32..=1000,
            prop::sample::select(vec![0.0, 0.25, 0.5]),
            arb_date(),
        ),
        0..=40,
    );
    (customers, orders, lines).prop_map(|(segments, raw_orders, raw_lines)| {
        let customers: Vec<(i64, &'static str)> = segments
            .iter()
            .enumerate()
            .map(|(idx, &seg)| (idx as i64 + 1, SEGMENTS[seg]))
            .collect();
        // Roughly one in five orders points at a customer that does not exist.
        let orders: Vec<(i64, i64, Date, i32)> = raw_orders
            .iter()
            .enumerate()
            .map(|(idx, &(pick, order_date, prio))| {
                let cust = if pick % 5 == 0 {
                    999_000 + i64::from(pick)
                } else {
                    (usize::from(pick) % customers.len()) as i64 + 1
                };
                (idx as i64 + 1, cust, order_date, prio)
            })
            .collect();
        let lines: Vec<(i64, f64, f64, Date)> = raw_lines
            .iter()
            .map(|&(pick, price, discount, ship)| {
                let order_key = if orders.is_empty() || pick % 7 == 0 {
                    888_000 + i64::from(pick)
                } else {
                    (usize::from(pick) % orders.len()) as i64 + 1
                };
                (order_key, f64::from(price), discount, ship)
            })
            .collect();
        Dataset {
            customers,
            orders,
            lines,
        }
    })
}

fn tables_from(data: &Dataset) -> Tables {
    let customers = data
        .customers
        .iter()
        .map(|&(key, segment)| {
            Record::new(vec![
                Field::Long(key),
                Field::Str(format!("Customer#{key:09}")),
                Field::Str("1 Side Street".to_owned()),
                Field::Long(3),
                Field::Str("11-222-333-4444".to_owned()),
                Field::Double(0.0),
                Field::Str(segment.to_owned()),
                Field::Str("fixture".to_owned()),
            ])
        })
        .collect();
    let orders = data
        .orders
        .iter()
        .map(|&(key, cust, order_date, prio)| {
            Record::new(vec![
                Field::Long(key),
                Field::Long(cust),
                Field::Str(format_date(order_date)),
                Field::Int(prio),
                Field::Str("O".to_owned()),
                Field::Double(1.0),
                Field::Str("3-MEDIUM".to_owned()),
                Field::Str("Clerk#000000001".to_owned()),
                Field::Str("fixture".to_owned()),
            ])
        })
        .collect();
    let lines = data
        .lines
        .iter()
        .map(|&(order_key, price, discount, ship)| {
            Record::new(vec![
                Field::Long(order_key),
                Field::Double(price),
                Field::Double(discount),
                Field::Long(1),
                Field::Long(1),
                Field::Int(1),
                Field::Double(1.0),
                Field::Double(0.0),
                Field::Str("N".to_owned()),
                Field::Str("O".to_owned()),
                Field::Str(format_date(ship)),
                Field::Str(format_date(ship)),
                Field::Str(format_date(ship)),
            ])
        })
        .collect();
    Tables::new(
        Arc::new(MemTable::new(TableSchema::customer(), customers).expect("customer rows")),
        Arc::new(MemTable::new(TableSchema::orders(), orders).expect("orders rows")),
        Arc::new(MemTable::new(TableSchema::lineitem(), lines).expect("lineitem rows")),
    )
    .expect("tables")
}

/// Nested-loop rendition of the report, kept deliberately simple.
fn reference(data: &Dataset, params: &QueryParams) -> Vec<(i64, f64, Date, i32)> {
    let mut groups: Vec<(i64, f64, Date, i32)> = Vec::new();
    for &(order_key, cust_key, order_date, prio) in &data.orders {
        let in_segment = data
            .customers
            .iter()
            .any(|&(key, segment)| key == cust_key && segment == params.segment);
        if !in_segment || order_date >= params.cutoff {
            continue;
        }
        let mut revenue = 0.0;
        let mut open = false;
        for &(line_order, price, discount, ship) in &data.lines {
            if line_order == order_key && ship > params.cutoff {
                revenue += price * (1.0 - discount);
                open = true;
            }
        }
        if open {
            groups.push((order_key, revenue, order_date, prio));
        }
    }
    groups.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| a.2.cmp(&b.2))
            .then_with(|| a.0.cmp(&b.0))
    });
    groups
}

proptest! {
    #[test]
    fn engine_matches_the_nested_loop_reference(data in arb_dataset()) {
        let params = QueryParams::default();
        let output = Engine::new(tables_from(&data))
            .shipping_priority(&params)
            .expect("query");
        let actual: Vec<(i64, f64, Date, i32)> = output
            .rows
            .iter()
            .map(|row| (row.order_key.0, row.revenue, row.order_date, row.ship_priority))
            .collect();
        prop_assert_eq!(actual, reference(&data, &params));
    }

    #[test]
    fn output_is_sorted_by_revenue_then_date_then_key(data in arb_dataset()) {
        let output = Engine::new(tables_from(&data))
            .shipping_priority(&QueryParams::default())
            .expect("query");
        for pair in output.rows.windows(2) {
            prop_assert!(compare_rows(&pair[0], &pair[1]) != Ordering::Greater);
        }
    }

    #[test]
    fn result_groups_mirror_their_source_orders(data in arb_dataset()) {
        let output = Engine::new(tables_from(&data))
            .shipping_priority(&QueryParams::default())
            .expect("query");
        for row in &output.rows {
            prop_assert!(row.order_date < DEFAULT_CUTOFF);
            prop_assert!(row.revenue > 0.0);
            let source = data
                .orders
                .iter()
                .find(|order| order.0 == row.order_key.0)
                .expect("result rows come from the orders relation");
            prop_assert_eq!(row.order_date, source.2);
            prop_assert_eq!(row.ship_priority, source.3);
        }
    }

    #[test]
    fn reruns_are_bit_identical(data in arb_dataset()) {
        let tables = tables_from(&data);
        let params = QueryParams::default();
        let first = Engine::new(tables.clone()).shipping_priority(&params).expect("first run");
        let second = Engine::new(tables).shipping_priority(&params).expect("second run");
        prop_assert_eq!(first.rows, second.rows);
        prop_assert_eq!(first.plan_hash, second.plan_hash);
    }
}

#[test]
fn dangling_references_never_join() {
    let data = Dataset {
        customers: vec![(1, "BUILDING")],
        orders: vec![(10, 77, date!(1995 - 03 - 01), 0)],
        lines: vec![(55, 100.0, 0.0, date!(1995 - 04 - 01))],
    };
    let output = Engine::new(tables_from(&data))
        .shipping_priority(&QueryParams::default())
        .expect("query");
    assert!(output.rows.is_empty());
}
