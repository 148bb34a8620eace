//! Prometheus text exposition rendering.

use std::fmt::Write as _;

use crate::metric::{Metric, format_number};

/// Whether labels are rendered inline on the sample line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPlacement {
    /// Labels travel elsewhere (URL path segments on the push gateway).
    Omitted,
    /// Labels are rendered as `name{a="b"} value`.
    Inline,
}

/// Renders `metric` under `name` as an exposition block.
///
/// The caller must already have checked that the value is numeric.
#[must_use]
pub fn render(name: &str, metric: &Metric, value: f64, placement: LabelPlacement) -> String {
    let mut body = String::new();
    if let Some(kind) = metric.kind() {
        let _ = writeln!(body, "# TYPE {name} {kind}");
    }
    if !metric.help().is_empty() {
        let _ = writeln!(body, "# HELP {name} {}", escape_help(metric.help()));
    }
    body.push_str(name);
    if placement == LabelPlacement::Inline && !metric.labels().is_empty() {
        let pairs: Vec<String> = metric
            .labels()
            .iter()
            .map(|label| format!("{}=\"{}\"", label.name(), escape_label(label.value())))
            .collect();
        let _ = write!(body, "{{{}}}", pairs.join(","));
    }
    let _ = writeln!(body, " {}", format_number(value));
    body
}

fn escape_help(help: &str) -> String {
    help.replace('\\', r"\\").replace('\n', r"\n")
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', r"\\")
        .replace('"', "\\\"")
        .replace('\n', r"\n")
}
