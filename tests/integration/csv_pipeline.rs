use std::fs;
use std::path::Path;

use tempfile::TempDir;

use faro::datagen::{DataGenerator, GeneratorConfig};
use faro::query::QueryParams;
use faro::record::Tables;
use faro::Engine;

const CUSTOMER_HEADER: &str =
    "c_custkey,c_name,c_address,c_nationkey,c_phone,c_acctbal,c_mktsegment,c_comment";
const ORDERS_HEADER: &str = "o_orderkey,o_custkey,o_orderdate,o_shippriority,\
                             o_orderstatus,o_totalprice,o_orderpriority,o_clerk,o_comment";
const LINEITEM_HEADER: &str = "l_orderkey,l_extendedprice,l_discount,l_partkey,l_suppkey,\
                               l_linenumber,l_quantity,l_tax,l_returnflag,l_linestatus,\
                               l_shipdate,l_commitdate,l_receiptdate";

fn write_file(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).expect("write csv fixture");
}

fn write_minimal_valid(dir: &Path) {
    write_file(
        dir,
        "customer.csv",
        &format!("{CUSTOMER_HEADER}\n1,Customer#000000001,street,7,phone,10.00,BUILDING,note\n"),
    );
    write_file(
        dir,
        "orders.csv",
        &format!("{ORDERS_HEADER}\n10,1,1995-03-10,0,O,100.00,1-URGENT,Clerk#1,note\n"),
    );
    write_file(
        dir,
        "lineitem.csv",
        &format!(
            "{LINEITEM_HEADER}\n10,100.00,0.10,1,1,1,10.00,0.02,N,O,1995-04-01,1995-04-01,1995-04-01\n"
        ),
    );
}

#[test]
fn generated_files_run_end_to_end_and_match_the_in_memory_run() {
    let dir = TempDir::new().expect("tempdir");
    let config = GeneratorConfig {
        customers: 60,
        orders_per_customer: 5,
        max_lineitems_per_order: 4,
        seed: 11,
    };

    let data = DataGenerator::new(config).generate();
    data.write_csv(dir.path()).expect("write csv");
    let from_memory = Engine::new(data.into_tables().expect("mem tables"))
        .shipping_priority(&QueryParams::default())
        .expect("in-memory run");

    let from_csv = Engine::new(Tables::from_dir(dir.path()).expect("open csv tables"))
        .shipping_priority(&QueryParams::default())
        .expect("csv run");

    assert!(!from_csv.rows.is_empty());
    assert_eq!(from_csv.rows.len(), from_memory.rows.len());
    for (csv_row, mem_row) in from_csv.rows.iter().zip(&from_memory.rows) {
        assert_eq!(csv_row.order_key, mem_row.order_key);
        assert_eq!(csv_row.order_date, mem_row.order_date);
        assert_eq!(csv_row.ship_priority, mem_row.ship_priority);
        assert!((csv_row.revenue - mem_row.revenue).abs() < 1e-6);
    }
}

#[test]
fn minimal_fixture_produces_the_expected_row() {
    let dir = TempDir::new().expect("tempdir");
    write_minimal_valid(dir.path());

    let output = Engine::new(Tables::from_dir(dir.path()).expect("open tables"))
        .shipping_priority(&QueryParams::default())
        .expect("run");

    assert_eq!(output.rows.len(), 1);
    assert_eq!(output.rows[0].order_key.0, 10);
    assert!((output.rows[0].revenue - 90.0).abs() < 1e-9);
}

#[test]
fn missing_column_is_rejected_at_open() {
    let dir = TempDir::new().expect("tempdir");
    write_minimal_valid(dir.path());
    write_file(
        dir.path(),
        "customer.csv",
        "c_custkey,c_name,c_address,c_nationkey,c_phone,c_acctbal,c_mktsegment\n\
         1,Customer#000000001,street,7,phone,10.00,BUILDING\n",
    );

    let err = Tables::from_dir(dir.path()).expect_err("short header must fail");
    assert_eq!(err.code(), "SchemaMismatch");
    assert!(err.to_string().contains("customer"));
}

#[test]
fn non_numeric_key_aborts_the_query() {
    let dir = TempDir::new().expect("tempdir");
    write_minimal_valid(dir.path());
    write_file(
        dir.path(),
        "orders.csv",
        &format!("{ORDERS_HEADER}\nnot-a-key,1,1995-03-10,0,O,100.00,1-URGENT,Clerk#1,note\n"),
    );

    let tables = Tables::from_dir(dir.path()).expect("header is still valid");
    let err = Engine::new(tables)
        .shipping_priority(&QueryParams::default())
        .expect_err("bad cell must abort");
    assert_eq!(err.code(), "SchemaMismatch");
    assert!(err.to_string().contains("orders"));
}

#[test]
fn malformed_date_aborts_the_query() {
    let dir = TempDir::new().expect("tempdir");
    write_minimal_valid(dir.path());
    write_file(
        dir.path(),
        "lineitem.csv",
        &format!(
            "{LINEITEM_HEADER}\n10,100.00,0.10,1,1,1,10.00,0.02,N,O,1995-13-40,1995-04-01,1995-04-01\n"
        ),
    );

    let err = Engine::new(Tables::from_dir(dir.path()).expect("open tables"))
        .shipping_priority(&QueryParams::default())
        .expect_err("bad date must abort");
    assert_eq!(err.code(), "ParseDate");
    assert!(err.to_string().contains("1995-13-40"));
}

#[test]
fn short_row_aborts_the_query() {
    let dir = TempDir::new().expect("tempdir");
    write_minimal_valid(dir.path());
    write_file(
        dir.path(),
        "orders.csv",
        &format!("{ORDERS_HEADER}\n10,1,1995-03-10,0\n"),
    );

    let tables = Tables::from_dir(dir.path()).expect("header is still valid");
    let err = Engine::new(tables)
        .shipping_priority(&QueryParams::default())
        .expect_err("short row must abort");
    assert_eq!(err.code(), "SchemaMismatch");
}
