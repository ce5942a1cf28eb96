//! APA-style descriptive tables
//!
//! N, M and SD for every numeric column, rendered as a Markdown pipe table
//! and optionally as a LaTeX `table` environment.

use crate::dataset::Dataset;
use crate::describe::{mean, sample_std};
use crate::Result;
use serde::Serialize;
use std::fmt::Write;

/// Default Markdown output of the `apa-table` binary
pub const DEFAULT_MARKDOWN_FILE: &str = "apa_table.md";

/// One table row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApaRow {
    /// Column name
    pub variable: String,
    /// Non-missing count
    pub n: usize,
    /// Mean
    pub mean: Option<f64>,
    /// Sample standard deviation
    pub sd: Option<f64>,
}

/// Descriptive table over the numeric columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApaTable {
    rows: Vec<ApaRow>,
}

fn two_decimals(value: Option<f64>) -> String {
    value.map_or_else(|| "NaN".to_string(), |v| format!("{v:.2}"))
}

impl ApaTable {
    /// Compute the table
    ///
    /// # Errors
    /// Returns error if a numeric column cannot be read
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        let rows = dataset
            .numeric_column_names()
            .into_iter()
            .map(|name| {
                let values: Vec<f64> = dataset.numeric_values(&name)?.into_iter().flatten().collect();
                Ok(ApaRow {
                    n: values.len(),
                    mean: mean(&values),
                    sd: sample_std(&values),
                    variable: name,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rows })
    }

    /// Table rows
    #[must_use]
    pub fn rows(&self) -> &[ApaRow] {
        &self.rows
    }

    /// Markdown pipe table
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let header = ["Variable", "N", "M", "SD"];
        let cells: Vec<[String; 4]> = self
            .rows
            .iter()
            .map(|r| [r.variable.clone(), r.n.to_string(), two_decimals(r.mean), two_decimals(r.sd)])
            .collect();

        let mut widths = header.map(str::len);
        for row in &cells {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        let line = |cols: [&str; 4], out: &mut String| {
            let _ = write!(out, "|");
            for (i, cell) in cols.iter().enumerate() {
                // text left, numbers right
                if i == 0 {
                    let _ = write!(out, " {cell:<w$} |", w = widths[i]);
                } else {
                    let _ = write!(out, " {cell:>w$} |", w = widths[i]);
                }
            }
            out.push('\n');
        };

        line(header, &mut out);
        let _ = write!(out, "|:{}|", "-".repeat(widths[0] + 1));
        for w in &widths[1..] {
            let _ = write!(out, "{}:|", "-".repeat(w + 1));
        }
        out.push('\n');
        for row in &cells {
            line([row[0].as_str(), row[1].as_str(), row[2].as_str(), row[3].as_str()], &mut out);
        }
        out
    }

    /// LaTeX `table` environment with caption and label
    #[must_use]
    pub fn to_latex(&self) -> String {
        let mut out = String::new();
        out.push_str("\\begin{table}\n");
        out.push_str("\\caption{Descriptive Statistics}\n");
        out.push_str("\\label{tab:descriptive}\n");
        out.push_str("\\begin{tabular}{lrrr}\n");
        out.push_str("\\toprule\n");
        out.push_str("Variable & N & M & SD \\\\\n");
        out.push_str("\\midrule\n");
        for row in &self.rows {
            let _ = writeln!(
                out,
                "{} & {} & {} & {} \\\\",
                escape_latex(&row.variable),
                row.n,
                two_decimals(row.mean),
                two_decimals(row.sd)
            );
        }
        out.push_str("\\bottomrule\n");
        out.push_str("\\end{tabular}\n");
        out.push_str("\\end{table}\n");
        out
    }
}

fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '_' | '%' | '&' | '#' | '$' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::mixed_batch;

    #[test]
    fn test_rows_cover_numeric_columns() {
        let table = ApaTable::from_dataset(&Dataset::new(mixed_batch())).unwrap();
        let names: Vec<&str> = table.rows().iter().map(|r| r.variable.as_str()).collect();
        assert_eq!(names, vec!["age", "score"]);
        assert_eq!(table.rows()[0].n, 3);
        assert!((table.rows()[0].mean.unwrap() - 32.0).abs() < 1e-12);
    }

    #[test]
    fn test_markdown_layout() {
        let table = ApaTable::from_dataset(&Dataset::new(mixed_batch())).unwrap();
        let md = table.to_markdown();
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("| Variable"));
        assert!(lines[1].starts_with("|:-"));
        assert!(lines[2].contains("32.00"));
        assert!(lines.iter().all(|l| l.ends_with('|')));
    }

    #[test]
    fn test_latex_caption_and_escape() {
        let table = ApaTable {
            rows: vec![ApaRow {
                variable: "blood_pressure".into(),
                n: 2,
                mean: Some(120.0),
                sd: None,
            }],
        };
        let tex = table.to_latex();
        assert!(tex.contains("\\caption{Descriptive Statistics}"));
        assert!(tex.contains("\\label{tab:descriptive}"));
        assert!(tex.contains("blood\\_pressure & 2 & 120.00 & NaN"));
    }
}
