//! Renderers turning query results and explain trees into printable text.

use csv::WriterBuilder;

use super::CliError;
use crate::query::planner::{ExplainNode, ExplainProp, PlanExplain};
use crate::query::rows::ResultRow;
use crate::types::format_date;

/// Output column headers, named after the source columns they carry.
const COLUMNS: [&str; 4] = ["l_orderkey", "revenue", "o_orderdate", "o_shippriority"];

/// Renders rows as a fixed-width table with a row-count footer.
pub fn render_text(rows: &[ResultRow]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format!(
        "{:>12}  {:>14}  {:>11}  {:>14}",
        COLUMNS[0], COLUMNS[1], COLUMNS[2], COLUMNS[3]
    ));
    for row in rows {
        lines.push(format!(
            "{:>12}  {:>14.2}  {:>11}  {:>14}",
            row.order_key,
            row.revenue,
            format_date(row.order_date),
            row.ship_priority
        ));
    }
    lines.push(format!("({} rows)", rows.len()));
    lines.join("\n")
}

/// Renders rows as CSV with a header record.
pub fn render_csv(rows: &[ResultRow]) -> Result<String, CliError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.write_record([
            row.order_key.to_string(),
            format!("{:.2}", row.revenue),
            format_date(row.order_date),
            row.ship_priority.to_string(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| CliError::Message(format!("cannot flush csv output: {err}")))?;
    String::from_utf8(bytes)
        .map_err(|err| CliError::Message(format!("csv output is not utf-8: {err}")))
}

/// Renders rows as a pretty-printed JSON array.
pub fn render_json(rows: &[ResultRow]) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(rows)?)
}

/// Renders the explain tree, one operator per line.
///
/// With `redact` set, properties carrying parameter literals are masked;
/// the plan shape and its annotations still print.
pub fn render_explain(explain: &PlanExplain, redact: bool) -> String {
    let mut lines = vec![format!("plan {:016x}", explain.plan_hash)];
    render_node(&explain.root, "", None, redact, &mut lines);
    lines.join("\n")
}

fn render_node(
    node: &ExplainNode,
    prefix: &str,
    branch: Option<bool>,
    redact: bool,
    lines: &mut Vec<String>,
) {
    let props = describe_props(&node.props, redact);
    let label = if props.is_empty() {
        node.op.clone()
    } else {
        format!("{} ({props})", node.op)
    };
    let child_prefix = match branch {
        None => {
            lines.push(label);
            String::new()
        }
        Some(true) => {
            lines.push(format!("{prefix}└─ {label}"));
            format!("{prefix}   ")
        }
        Some(false) => {
            lines.push(format!("{prefix}├─ {label}"));
            format!("{prefix}│  ")
        }
    };
    let last = node.inputs.len().saturating_sub(1);
    for (idx, input) in node.inputs.iter().enumerate() {
        render_node(input, &child_prefix, Some(idx == last), redact, lines);
    }
}

fn describe_props(props: &[ExplainProp], redact: bool) -> String {
    let parts: Vec<String> = props
        .iter()
        .map(|prop| {
            if redact && prop.redactable {
                format!("{}=<redacted>", prop.key)
            } else {
                format!("{}={}", prop.key, prop.value)
            }
        })
        .collect();
    parts.join(", ")
}
