//! Plain-text regression summaries

use serde::Serialize;
use std::fmt::Write;

const RULE_WIDTH: usize = 78;

/// One estimated coefficient with its inference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientRow {
    /// Term name (`const` for the intercept)
    pub name: String,
    /// Point estimate
    pub estimate: f64,
    /// Standard error
    pub std_error: f64,
    /// Test statistic (t or z)
    pub statistic: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// Lower 95% bound
    pub ci_lower: f64,
    /// Upper 95% bound
    pub ci_upper: f64,
}

/// Render a summary: a title, two columns of model facts, then the
/// coefficient table
pub(crate) fn render(
    title: &str,
    facts: &[(&str, String)],
    statistic_label: &str,
    rows: &[CoefficientRow],
) -> String {
    let mut out = String::new();
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    let _ = writeln!(out, "{title:^width$}", width = RULE_WIDTH);
    let _ = writeln!(out, "{heavy}");

    let half = facts.len().div_ceil(2);
    let (left, right) = facts.split_at(half);
    for (i, (key, value)) in left.iter().enumerate() {
        let mut line = format!("{:<20}{:>18}", format!("{key}:"), value);
        if let Some((rkey, rvalue)) = right.get(i) {
            let _ = write!(line, "   {:<20}{:>17}", format!("{rkey}:"), rvalue);
        }
        let _ = writeln!(out, "{line}");
    }

    let _ = writeln!(out, "{heavy}");
    let _ = writeln!(
        out,
        "{:<16}{:>10}{:>10}{:>10}{:>10}{:>11}{:>11}",
        "", "coef", "std err", statistic_label, format!("P>|{statistic_label}|"), "[0.025", "0.975]"
    );
    let _ = writeln!(out, "{light}");
    for row in rows {
        let _ = writeln!(
            out,
            "{:<16}{:>10.4}{:>10.3}{:>10.3}{:>10.3}{:>11.3}{:>11.3}",
            truncate(&row.name, 15),
            row.estimate,
            row.std_error,
            row.statistic,
            row.p_value,
            row.ci_lower,
            row.ci_upper
        );
    }
    let _ = writeln!(out, "{heavy}");
    out
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_string()
    } else {
        name.chars().take(width).collect()
    }
}
