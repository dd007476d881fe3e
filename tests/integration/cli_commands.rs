#![allow(missing_docs)]

use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

fn faro() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("faro");
    cmd.env_remove("FARO_CONFIG");
    cmd
}

fn generate_data(dir: &Path) {
    faro()
        .args(["gen", "--scale", "0.1", "--seed", "7", "--out"])
        .arg(dir)
        .assert()
        .success();
}

fn table_args(dir: &Path) -> Vec<String> {
    vec![
        "--customer".to_owned(),
        dir.join("customer.csv").display().to_string(),
        "--orders".to_owned(),
        dir.join("orders.csv").display().to_string(),
        "--lineitem".to_owned(),
        dir.join("lineitem.csv").display().to_string(),
    ]
}

#[test]
fn gen_writes_the_three_relations() {
    let dir = TempDir::new().expect("tempdir");
    generate_data(dir.path());

    for name in ["customer.csv", "orders.csv", "lineitem.csv"] {
        assert!(dir.path().join(name).exists(), "{name} should be written");
    }
    let header = fs::read_to_string(dir.path().join("customer.csv")).expect("read customer.csv");
    assert!(header.starts_with("c_custkey,"));
}

#[test]
fn run_prints_a_text_table() {
    let dir = TempDir::new().expect("tempdir");
    generate_data(dir.path());

    let output = faro()
        .arg("run")
        .args(table_args(dir.path()))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).expect("utf-8 stdout");
    assert!(stdout.contains("l_orderkey"));
    assert!(stdout.contains("rows)"));
}

#[test]
fn run_emits_parseable_json_and_honors_the_limit() {
    let dir = TempDir::new().expect("tempdir");
    generate_data(dir.path());

    let output = faro()
        .arg("run")
        .args(table_args(dir.path()))
        .args(["--format", "json", "--limit", "5"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    let rows = json.as_array().expect("array of rows");
    assert!(!rows.is_empty());
    assert!(rows.len() <= 5);
    assert!(rows[0]["order_key"].is_number());
    assert!(rows[0]["order_date"].is_string());
}

#[test]
fn run_writes_csv_output_to_a_file() {
    let dir = TempDir::new().expect("tempdir");
    generate_data(dir.path());
    let out_path = dir.path().join("result.csv");

    faro()
        .arg("run")
        .args(table_args(dir.path()))
        .args(["--format", "csv", "--output"])
        .arg(&out_path)
        .assert()
        .success();

    let contents = fs::read_to_string(&out_path).expect("result file");
    assert!(contents.starts_with("l_orderkey,revenue,o_orderdate,o_shippriority"));
    assert!(contents.lines().count() > 1);
}

#[test]
fn explain_prints_the_plan_tree() {
    let dir = TempDir::new().expect("tempdir");
    generate_data(dir.path());

    let output = faro()
        .arg("explain")
        .args(table_args(dir.path()))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).expect("utf-8 stdout");
    assert!(stdout.starts_with("plan "));
    assert!(stdout.contains("Sort"));
    assert!(stdout.contains("HashJoin"));
    assert!(stdout.contains("GroupAggregate"));
    assert!(stdout.contains("table=customer"));
}

#[test]
fn profile_supplies_table_paths_and_defaults() {
    let dir = TempDir::new().expect("tempdir");
    generate_data(dir.path());

    let profile_path = dir.path().join("faro.toml");
    let profile = format!(
        "[tables]\ncustomer = {:?}\norders = {:?}\nlineitem = {:?}\n\n[query]\nsegment = \"MACHINERY\"\n",
        dir.path().join("customer.csv"),
        dir.path().join("orders.csv"),
        dir.path().join("lineitem.csv"),
    );
    fs::write(&profile_path, profile).expect("write profile");

    let output = faro()
        .args(["run", "--format", "json", "--config"])
        .arg(&profile_path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert!(json.is_array());
}

#[test]
fn missing_table_path_fails_with_a_hint() {
    let dir = TempDir::new().expect("tempdir");
    generate_data(dir.path());

    let output = faro()
        .args(["run", "--customer"])
        .arg(dir.path().join("customer.csv"))
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf-8 stderr");
    assert!(stderr.contains("no orders table"));
}

#[test]
fn bad_cutoff_date_reports_the_error_code() {
    let dir = TempDir::new().expect("tempdir");
    generate_data(dir.path());

    let output = faro()
        .arg("run")
        .args(table_args(dir.path()))
        .args(["--date", "15-03-1995"])
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf-8 stderr");
    assert!(stderr.contains("ParseDate"));
}

#[test]
fn gen_rejects_a_nonpositive_scale() {
    let dir = TempDir::new().expect("tempdir");
    let output = faro()
        .args(["gen", "--scale", "0", "--out"])
        .arg(dir.path())
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf-8 stderr");
    assert!(stderr.contains("--scale"));
}

#[test]
fn completions_cover_the_subcommands() {
    let output = faro()
        .args(["completions", "bash"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let script = String::from_utf8(output).expect("utf-8 stdout");
    assert!(script.contains("faro"));
    assert!(script.contains("explain"));
}
