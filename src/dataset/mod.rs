//! Dataset loading (CSV/Parquet → Arrow)
//!
//! **Read-Once Design**:
//! - A dataset is loaded in full, once, at the start of a pipeline
//! - It is never mutated in place; model fitting works on derived
//!   complete-case matrices
//! - Empty CSV fields, the usual spreadsheet markers (`NA`, `N/A`, `NaN`,
//!   `nan`, `NULL`, `None`, ...) and NaN floats are treated as missing
//!
//! Numeric columns are Arrow integer/float/decimal columns. Everything else
//! (strings, booleans, dates) is categorical in summaries. Boolean columns
//! can still fill model roles, coded `false = 0`, `true = 1`.

use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, AsArray, RecordBatch};
use arrow::compute;
use arrow::datatypes::{DataType, Float64Type, SchemaRef};
use ndarray::Array2;
use regex::Regex;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

/// CSV cells read as missing, matched against the whole field
const MISSING_MARKERS: &str = r"^(|#N/A|#N/A N/A|#NA|-1\.#IND|-1\.#QNAN|-NaN|-nan|1\.#IND|1\.#QNAN|<NA>|N/A|NA|NULL|NaN|None|n/a|nan|null)$";

fn missing_marker_regex() -> Result<Regex> {
    Regex::new(MISSING_MARKERS)
        .map_err(|e| Error::StorageError(format!("Invalid missing-value pattern: {e}")))
}

/// In-memory tabular dataset backed by a single Arrow record batch
#[derive(Debug, Clone)]
pub struct Dataset {
    batch: RecordBatch,
}

impl Dataset {
    /// Wrap an existing record batch
    ///
    /// Useful for testing and benchmarking
    #[must_use]
    pub const fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// Load a dataset, choosing the reader from the file extension
    ///
    /// `.parquet` files go through the Parquet reader, everything else is
    /// read as comma-delimited text with a header row.
    ///
    /// # Errors
    /// Returns [`Error::DatasetNotFound`] if the path does not exist, or a
    /// storage error if it cannot be parsed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::DatasetNotFound(path.to_path_buf()));
        }

        let is_parquet = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));

        let dataset = if is_parquet {
            Self::load_parquet(path)?
        } else {
            Self::load_csv(path)?
        };

        tracing::info!(
            path = %path.display(),
            rows = dataset.num_rows(),
            columns = dataset.num_columns(),
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Load a dataset from a CSV file with a header row
    ///
    /// Column types are inferred from the whole file. Cells matching a
    /// missing-value marker are null for both inference and parsing, so a
    /// numeric column with `NA` gaps stays numeric.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        use arrow::csv::reader::Format;
        use arrow::csv::ReaderBuilder;

        let mut file = File::open(path.as_ref())
            .map_err(|e| Error::StorageError(format!("Failed to open CSV file: {e}")))?;

        let missing = missing_marker_regex()?;
        let (schema, _) = Format::default()
            .with_header(true)
            .with_null_regex(missing.clone())
            .infer_schema(&mut file, None)
            .map_err(|e| Error::StorageError(format!("Failed to infer CSV schema: {e}")))?;
        file.seek(SeekFrom::Start(0))?;

        let schema = Arc::new(schema);
        let reader = ReaderBuilder::new(Arc::clone(&schema))
            .with_header(true)
            .with_null_regex(missing)
            .build(file)
            .map_err(|e| Error::StorageError(format!("Failed to create CSV reader: {e}")))?;

        let mut batches = Vec::new();
        for batch in reader {
            let batch = batch
                .map_err(|e| Error::StorageError(format!("Failed to read CSV record batch: {e}")))?;
            batches.push(batch);
        }

        Self::from_batches(&schema, &batches)
    }

    /// Load a dataset from a Parquet file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<Self> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let file = File::open(path.as_ref()).map_err(|e| {
            Error::StorageError(format!("Failed to open Parquet file: {e}"))
        })?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| {
            Error::StorageError(format!("Failed to parse Parquet file: {e}"))
        })?;
        let schema = Arc::clone(builder.schema());

        let reader = builder.build().map_err(|e| {
            Error::StorageError(format!("Failed to create Parquet reader: {e}"))
        })?;

        let mut batches = Vec::new();
        for batch in reader {
            let batch = batch.map_err(|e| {
                Error::StorageError(format!("Failed to read record batch: {e}"))
            })?;
            batches.push(batch);
        }

        Self::from_batches(&schema, &batches)
    }

    fn from_batches(schema: &SchemaRef, batches: &[RecordBatch]) -> Result<Self> {
        let batch = compute::concat_batches(schema, batches)?;
        Ok(Self { batch })
    }

    /// Underlying record batch
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Number of rows
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Number of columns
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// Column names in file order
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Names of numeric columns in file order
    #[must_use]
    pub fn numeric_column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .filter(|f| is_numeric_type(f.data_type()))
            .map(|f| f.name().clone())
            .collect()
    }

    /// Look up a column by name
    ///
    /// # Errors
    /// Returns [`Error::ColumnNotFound`] if no such column exists
    pub fn column(&self, name: &str) -> Result<&ArrayRef> {
        self.batch
            .column_by_name(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// Whether the named column holds numeric values
    ///
    /// # Errors
    /// Returns [`Error::ColumnNotFound`] if no such column exists
    pub fn is_numeric(&self, name: &str) -> Result<bool> {
        Ok(is_numeric_type(self.column(name)?.data_type()))
    }

    /// Check that every name refers to an existing numeric or boolean column
    ///
    /// # Errors
    /// Returns the first missing or non-numeric column
    pub fn require_numeric(&self, names: &[&str]) -> Result<()> {
        for name in names {
            if !is_coded_type(self.column(name)?.data_type()) {
                return Err(Error::NonNumericColumn((*name).to_string()));
            }
        }
        Ok(())
    }

    /// Numeric column as `f64`, `None` for missing cells (null or NaN)
    ///
    /// Boolean columns come back as 0/1.
    ///
    /// # Errors
    /// Returns error if the column is missing or neither numeric nor boolean
    pub fn numeric_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let column = self.column(name)?;
        if !is_coded_type(column.data_type()) {
            return Err(Error::NonNumericColumn(name.to_string()));
        }

        let values = compute::cast(column, &DataType::Float64)?;
        Ok(values
            .as_primitive::<Float64Type>()
            .iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect())
    }

    /// Any column rendered as text, `None` for nulls
    ///
    /// # Errors
    /// Returns error if the column is missing or cannot be cast to text
    pub fn text_values(&self, name: &str) -> Result<Vec<Option<String>>> {
        let column = self.column(name)?;
        let values = compute::cast(column, &DataType::Utf8)?;
        Ok(values
            .as_string::<i32>()
            .iter()
            .map(|v| v.map(str::to_string))
            .collect())
    }

    /// Rows × columns matrix of the rows with no missing value in `columns`
    ///
    /// Rows with any missing cell are dropped (listwise deletion).
    ///
    /// # Errors
    /// Returns error if a column is missing or not numeric
    pub fn complete_cases(&self, columns: &[&str]) -> Result<Array2<f64>> {
        let values = columns
            .iter()
            .map(|name| self.numeric_values(name))
            .collect::<Result<Vec<_>>>()?;

        let rows: Vec<usize> = (0..self.num_rows())
            .filter(|&row| values.iter().all(|col| col[row].is_some()))
            .collect();

        let dropped = self.num_rows() - rows.len();
        if dropped > 0 {
            tracing::warn!(dropped, kept = rows.len(), "dropped rows with missing values");
        }

        Ok(Array2::from_shape_fn((rows.len(), columns.len()), |(i, j)| {
            values[j][rows[i]].unwrap_or(f64::NAN)
        }))
    }

    /// Rows × columns matrix requiring every cell to be present
    ///
    /// # Errors
    /// Returns [`Error::MissingValues`] for the first column with a gap, or
    /// an error if a column is missing or not numeric
    pub fn dense(&self, columns: &[&str]) -> Result<Array2<f64>> {
        let mut values = Vec::with_capacity(columns.len());
        for name in columns {
            let column = self.numeric_values(name)?;
            let count = column.iter().filter(|v| v.is_none()).count();
            if count > 0 {
                return Err(Error::MissingValues {
                    column: (*name).to_string(),
                    count,
                });
            }
            values.push(column);
        }

        Ok(Array2::from_shape_fn((self.num_rows(), columns.len()), |(i, j)| {
            values[j][i].unwrap_or(f64::NAN)
        }))
    }
}

/// Numeric in the statistical sense: integers, floats and decimals
#[must_use]
pub fn is_numeric_type(data_type: &DataType) -> bool {
    data_type.is_numeric()
}

/// Usable as a model input: numeric, or boolean read as 0/1
fn is_coded_type(data_type: &DataType) -> bool {
    is_numeric_type(data_type) || *data_type == DataType::Boolean
}
