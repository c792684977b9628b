//! CSV table reader with per-column type resolution.

use std::path::{Path, PathBuf};

use sylva_forest::{ColumnKind, TableSchema, Value};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{LabelColumn, Table};

/// Reads a headered CSV file into a typed [`Table`].
///
/// Expected CSV format:
/// - Header row required; every column is a feature except the label column
/// - All rows must have the same number of columns as the header
/// - No empty cells
///
/// Without a schema, a column is numeric when every cell parses as a finite
/// number, otherwise every cell of that column is kept as a categorical
/// string. The label column is typed the same way.
///
/// With a schema ([`TableReader::with_schema`]), feature columns are picked
/// by header name in schema order and each cell is read as the kind the
/// schema declares. Columns the schema does not name are ignored.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::MissingValue`] | A cell is empty |
/// | [`IoError::UnknownLabelColumn`] | Named label column is not in the header |
/// | [`IoError::NoFeatureColumns`] | Only the label column is present |
/// | [`IoError::MissingFeatureColumn`] | A schema column is not in the header |
/// | [`IoError::CellTypeMismatch`] | A cell cannot be read as its schema kind |
pub struct TableReader {
    path: PathBuf,
    label: LabelColumn,
    schema: Option<TableSchema>,
}

impl TableReader {
    /// Create a new reader for the given CSV file path, labelled by its last column.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            label: LabelColumn::Last,
            schema: None,
        }
    }

    /// Choose which column holds the label.
    #[must_use]
    pub fn with_label(mut self, label: LabelColumn) -> Self {
        self.label = label;
        self
    }

    /// Read feature columns by name with the kinds fixed at training time.
    #[must_use]
    pub fn with_schema(mut self, schema: TableSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Read and validate the CSV file, returning a [`Table`].
    #[instrument(skip(self), fields(path = %self.path.display(), schema = self.schema.is_some()))]
    pub fn read(&self) -> Result<Table, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so InconsistentRowLength fires instead of a CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header: Vec<String> = rdr
            .headers()
            .map_err(|e| self.parse_error(e))?
            .iter()
            .map(String::from)
            .collect();
        let expected_cols = header.len();
        debug!(expected_cols, "read CSV header");

        let label_index = self.label_index(&header)?;
        if self.schema.is_none() && expected_cols == usize::from(label_index.is_some()) {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }

        let mut cells: Vec<Vec<String>> = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.parse_error(e))?;

            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }
            if let Some(col) = record.iter().position(str::is_empty) {
                return Err(IoError::MissingValue {
                    path: self.path.clone(),
                    row_index,
                    column: header[col].clone(),
                });
            }

            cells.push(record.iter().map(String::from).collect());
        }

        if cells.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let table = match &self.schema {
            Some(schema) => self.conform(&header, &cells, label_index, schema)?,
            None => infer(&header, cells, label_index),
        };

        info!(
            n_samples = table.n_samples(),
            n_features = table.n_features(),
            n_categorical = table
                .feature_kinds()
                .iter()
                .filter(|&&k| k == ColumnKind::Categorical)
                .count(),
            label = table.label_name().unwrap_or("<none>"),
            "table loaded"
        );
        Ok(table)
    }

    /// Build a table whose feature columns follow `schema` by name and kind.
    fn conform(
        &self,
        header: &[String],
        cells: &[Vec<String>],
        label_index: Option<usize>,
        schema: &TableSchema,
    ) -> Result<Table, IoError> {
        let columns: Vec<(usize, ColumnKind)> = schema
            .columns()
            .map(|(name, kind)| {
                header
                    .iter()
                    .position(|h| h == name)
                    .map(|col| (col, kind))
                    .ok_or_else(|| IoError::MissingFeatureColumn {
                        path: self.path.clone(),
                        column: name.to_string(),
                    })
            })
            .collect::<Result<_, _>>()?;

        let label_kind = label_index.map(|li| {
            schema
                .label_kind()
                .unwrap_or_else(|| column_kind(cells.iter().map(|row| row[li].as_str())))
        });

        let mut features = Vec::with_capacity(cells.len());
        let mut labels = label_index.map(|_| Vec::with_capacity(cells.len()));
        for (row_index, row) in cells.iter().enumerate() {
            let feature_row = columns
                .iter()
                .map(|&(col, kind)| self.strict_value(kind, &row[col], row_index, &header[col]))
                .collect::<Result<Vec<_>, _>>()?;
            features.push(feature_row);
            if let (Some(labels), Some(li), Some(kind)) = (&mut labels, label_index, label_kind) {
                labels.push(self.strict_value(kind, &row[li], row_index, &header[li])?);
            }
        }

        Ok(Table {
            feature_names: schema.feature_names().to_vec(),
            feature_kinds: schema.feature_kinds().to_vec(),
            features,
            label_name: label_index.map(|li| header[li].clone()),
            label_kind,
            labels,
        })
    }

    fn strict_value(
        &self,
        kind: ColumnKind,
        cell: &str,
        row_index: usize,
        column: &str,
    ) -> Result<Value, IoError> {
        match kind {
            ColumnKind::Categorical => Ok(Value::from(cell)),
            ColumnKind::Numeric => parse_finite(cell).map(Value::from).ok_or_else(|| {
                IoError::CellTypeMismatch {
                    path: self.path.clone(),
                    row_index,
                    column: column.to_string(),
                    cell: cell.to_string(),
                    expected: kind,
                }
            }),
        }
    }

    fn label_index(&self, header: &[String]) -> Result<Option<usize>, IoError> {
        match &self.label {
            LabelColumn::Last => Ok(header.len().checked_sub(1)),
            LabelColumn::None => Ok(None),
            LabelColumn::Named(name) => header
                .iter()
                .position(|h| h == name)
                .map(Some)
                .ok_or_else(|| IoError::UnknownLabelColumn {
                    path: self.path.clone(),
                    column: name.clone(),
                }),
        }
    }

    fn parse_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

/// Build a table by guessing each column's kind from its cells.
fn infer(header: &[String], cells: Vec<Vec<String>>, label_index: Option<usize>) -> Table {
    let n_cols = header.len();
    let kinds: Vec<ColumnKind> = (0..n_cols)
        .map(|col| column_kind(cells.iter().map(|row| row[col].as_str())))
        .collect();

    let mut features = Vec::with_capacity(cells.len());
    let mut labels = label_index.map(|_| Vec::with_capacity(cells.len()));
    for row in cells {
        let mut feature_row = Vec::with_capacity(n_cols);
        for (col, cell) in row.into_iter().enumerate() {
            let value = typed_value(kinds[col], cell);
            match (&mut labels, label_index) {
                (Some(labels), Some(li)) if li == col => labels.push(value),
                _ => feature_row.push(value),
            }
        }
        features.push(feature_row);
    }

    let keep = |col: &usize| Some(*col) != label_index;
    Table {
        feature_names: (0..n_cols).filter(keep).map(|col| header[col].clone()).collect(),
        feature_kinds: (0..n_cols).filter(keep).map(|col| kinds[col]).collect(),
        features,
        label_name: label_index.map(|li| header[li].clone()),
        label_kind: label_index.map(|li| kinds[li]),
        labels,
    }
}

fn parse_finite(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|x| x.is_finite())
}

fn column_kind<'a>(mut cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    if cells.all(|cell| parse_finite(cell).is_some()) {
        ColumnKind::Numeric
    } else {
        ColumnKind::Categorical
    }
}

fn typed_value(kind: ColumnKind, cell: String) -> Value {
    match kind {
        ColumnKind::Numeric => parse_finite(&cell).map_or_else(|| Value::from(cell), Value::from),
        ColumnKind::Categorical => Value::from(cell),
    }
}
