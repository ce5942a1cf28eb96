//! Descriptive statistics and correlation
//!
//! Numeric columns get count, mean, sample standard deviation, min,
//! quartiles (linear interpolation) and max. Categorical columns get count,
//! number of distinct values, the most frequent value and its frequency.
//! Inapplicable cells are left empty in the CSV artifacts.

use crate::dataset::Dataset;
use crate::Result;
use arrow::array::{ArrayRef, Float64Array, RecordBatch, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Summary of a single dataset column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    /// Column name
    pub name: String,
    /// Non-missing cells
    pub count: usize,
    /// Shape-specific statistics
    pub stats: ColumnStats,
}

/// Statistics that depend on the column type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnStats {
    /// Integer/float columns
    Numeric {
        /// Arithmetic mean
        mean: Option<f64>,
        /// Sample standard deviation (n - 1 denominator)
        std: Option<f64>,
        /// Minimum
        min: Option<f64>,
        /// 25th percentile
        q1: Option<f64>,
        /// Median
        median: Option<f64>,
        /// 75th percentile
        q3: Option<f64>,
        /// Maximum
        max: Option<f64>,
    },
    /// Text/boolean/date columns
    Categorical {
        /// Distinct non-missing values
        unique: usize,
        /// Most frequent value (first seen wins ties)
        top: Option<String>,
        /// Frequency of `top`
        freq: usize,
    },
}

/// Summarise every column of the dataset, in column order
///
/// # Errors
/// Returns error if a column cannot be read
pub fn describe(dataset: &Dataset) -> Result<Vec<ColumnSummary>> {
    dataset
        .column_names()
        .iter()
        .map(|name| {
            if dataset.is_numeric(name)? {
                let values: Vec<f64> = dataset.numeric_values(name)?.into_iter().flatten().collect();
                Ok(summarize_numeric(name, &values))
            } else {
                let values: Vec<String> = dataset.text_values(name)?.into_iter().flatten().collect();
                Ok(summarize_categorical(name, &values))
            }
        })
        .collect()
}

/// Numeric summary of the non-missing `values`
#[must_use]
pub fn summarize_numeric(name: &str, values: &[f64]) -> ColumnSummary {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    ColumnSummary {
        name: name.to_string(),
        count: values.len(),
        stats: ColumnStats::Numeric {
            mean: mean(values),
            std: sample_std(values),
            min: sorted.first().copied(),
            q1: quantile_sorted(&sorted, 0.25),
            median: quantile_sorted(&sorted, 0.5),
            q3: quantile_sorted(&sorted, 0.75),
            max: sorted.last().copied(),
        },
    }
}

/// Categorical summary of the non-missing `values`
#[must_use]
pub fn summarize_categorical(name: &str, values: &[String]) -> ColumnSummary {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for value in values {
        let count = counts.entry(value.as_str()).or_insert(0);
        if *count == 0 {
            order.push(value.as_str());
        }
        *count += 1;
    }

    let mut top: Option<&str> = None;
    let mut freq = 0;
    for value in &order {
        let count = counts[value];
        if count > freq {
            top = Some(value);
            freq = count;
        }
    }

    ColumnSummary {
        name: name.to_string(),
        count: values.len(),
        stats: ColumnStats::Categorical {
            unique: order.len(),
            top: top.map(str::to_string),
            freq,
        },
    }
}

/// Arithmetic mean, `None` for an empty slice
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation, `None` with fewer than two values
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Quantile of already sorted data with linear interpolation between ranks
#[must_use]
#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Pearson correlation over pairwise complete observations
///
/// Returns `None` with fewer than two shared observations or when either
/// side has zero variance.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Square correlation matrix over the numeric columns
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    /// Numeric column names, in dataset order
    pub columns: Vec<String>,
    /// Row-major coefficients; `None` where undefined
    pub values: Vec<Vec<Option<f64>>>,
}

/// Pairwise Pearson correlation between all numeric columns
///
/// # Errors
/// Returns error if a column cannot be read
pub fn correlation_matrix(dataset: &Dataset) -> Result<CorrelationMatrix> {
    let columns = dataset.numeric_column_names();
    let data = columns
        .iter()
        .map(|name| dataset.numeric_values(name))
        .collect::<Result<Vec<_>>>()?;

    let mut values = vec![vec![None; columns.len()]; columns.len()];
    for i in 0..columns.len() {
        for j in i..columns.len() {
            let r = pearson(&data[i], &data[j]).map(|r| if i == j { 1.0 } else { r });
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix { columns, values })
}

impl CorrelationMatrix {
    /// Render as a record batch: a `column` label followed by one column per variable
    ///
    /// # Errors
    /// Returns error if the batch cannot be assembled
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut fields = vec![Field::new("column", DataType::Utf8, false)];
        let mut arrays: Vec<ArrayRef> = vec![Arc::new(StringArray::from(self.columns.clone()))];

        for (j, name) in self.columns.iter().enumerate() {
            fields.push(Field::new(name, DataType::Float64, true));
            let column: Float64Array = self.values.iter().map(|row| row[j]).collect();
            arrays.push(Arc::new(column));
        }

        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
    }
}

/// Render summaries as one row per column
///
/// # Errors
/// Returns error if the batch cannot be assembled
pub fn summaries_to_record_batch(summaries: &[ColumnSummary]) -> Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new("column", DataType::Utf8, false),
        Field::new("count", DataType::UInt64, false),
        Field::new("unique", DataType::UInt64, true),
        Field::new("top", DataType::Utf8, true),
        Field::new("freq", DataType::UInt64, true),
        Field::new("mean", DataType::Float64, true),
        Field::new("std", DataType::Float64, true),
        Field::new("min", DataType::Float64, true),
        Field::new("25%", DataType::Float64, true),
        Field::new("50%", DataType::Float64, true),
        Field::new("75%", DataType::Float64, true),
        Field::new("max", DataType::Float64, true),
    ]);

    let numeric: Vec<[Option<f64>; 7]> = summaries
        .iter()
        .map(|s| match &s.stats {
            ColumnStats::Numeric { mean, std, min, q1, median, q3, max } => {
                [*mean, *std, *min, *q1, *median, *q3, *max]
            }
            ColumnStats::Categorical { .. } => [None; 7],
        })
        .collect();
    let categorical: Vec<(Option<u64>, Option<String>, Option<u64>)> = summaries
        .iter()
        .map(|s| match &s.stats {
            ColumnStats::Categorical { unique, top, freq } => {
                (Some(*unique as u64), top.clone(), Some(*freq as u64))
            }
            ColumnStats::Numeric { .. } => (None, None, None),
        })
        .collect();

    let mut arrays: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(summaries.iter().map(|s| s.name.as_str()))),
        Arc::new(UInt64Array::from_iter_values(summaries.iter().map(|s| s.count as u64))),
        Arc::new(categorical.iter().map(|c| c.0).collect::<UInt64Array>()),
        Arc::new(categorical.iter().map(|c| c.1.clone()).collect::<StringArray>()),
        Arc::new(categorical.iter().map(|c| c.2).collect::<UInt64Array>()),
    ];
    for k in 0..7 {
        arrays.push(Arc::new(numeric.iter().map(|row| row[k]).collect::<Float64Array>()));
    }

    Ok(RecordBatch::try_new(Arc::new(schema), arrays)?)
}
