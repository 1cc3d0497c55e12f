use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::fmt;

use crate::csv_reader::CsvData;
use crate::error::DataError;

/// A single table cell. The type is decided when the cell is loaded.
/// Text sources never produce date-times: those come from spreadsheet
/// date cells or from the resolver coercing a column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Infer a typed value from a raw text cell
    pub fn infer(cell: &str) -> Self {
        let cell = cell.trim();
        if cell.is_empty() {
            return Value::Null;
        }
        match cell.parse::<f64>() {
            Ok(v) if v.is_finite() => Value::Number(v),
            Ok(v) if v.is_nan() => Value::Null,
            _ => Value::Text(cell.to_string()),
        }
    }

    fn from_json(field: &str, value: &JsonValue) -> Result<Self, DataError> {
        match value {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Number(n) => Ok(n.as_f64().map(Value::Number).unwrap_or(Value::Null)),
            JsonValue::String(s) if s.trim().is_empty() => Ok(Value::Null),
            JsonValue::String(s) => Ok(Value::Text(s.clone())),
            JsonValue::Bool(b) => Ok(Value::Text(b.to_string())),
            _ => Err(DataError::InvalidShape(format!(
                "unsupported value type for field '{}'",
                field
            ))),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
            Value::DateTime(dt) if dt.num_seconds_from_midnight() == 0 => {
                write!(f, "{}", dt.format("%Y-%m-%d"))
            }
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// A named column of values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// An immutable table of equally long, uniquely named columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Result<Self, DataError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(DataError::DuplicateColumn(column.name.clone()));
            }
        }

        if let Some(first) = columns.first() {
            let expected = first.values.len();
            if let Some(bad) = columns.iter().find(|c| c.values.len() != expected) {
                return Err(DataError::RaggedColumn {
                    column: bad.name.clone(),
                    expected,
                    actual: bad.values.len(),
                });
            }
        }

        Ok(Self { columns })
    }

    /// Build a dataset from a header row and row-major cells
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, DataError> {
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(rows.len())))
            .collect();

        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(DataError::InvalidShape(format!(
                    "row {} has {} cells, expected {}",
                    row_idx + 1,
                    row.len(),
                    columns.len()
                )));
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.values.push(value);
            }
        }

        Self::new(columns)
    }

    /// Create a Dataset from raw CSV contents, inferring cell types
    pub fn from_csv(csv: CsvData) -> Result<Self, DataError> {
        let rows: Vec<Vec<Value>> = csv
            .rows
            .iter()
            .map(|row| row.iter().map(|cell| Value::infer(cell)).collect())
            .collect();
        Self::from_rows(csv.headers, rows)
    }

    /// Create a Dataset from a JSON Array of Objects
    pub fn from_json(value: &JsonValue) -> Result<Self, DataError> {
        let array = value.as_array().ok_or_else(|| {
            DataError::InvalidShape("input data must be a JSON array of objects".to_string())
        })?;

        let Some(first) = array.first() else {
            return Self::new(Vec::new());
        };

        // Extract headers from the first object
        let headers: Vec<String> = first
            .as_object()
            .ok_or_else(|| DataError::InvalidShape("items in array must be objects".to_string()))?
            .keys()
            .cloned()
            .collect();

        let mut rows = Vec::with_capacity(array.len());
        for item in array {
            let obj = item.as_object().ok_or_else(|| {
                DataError::InvalidShape("items in array must be objects".to_string())
            })?;

            let row = headers
                .iter()
                .map(|header| match obj.get(header) {
                    Some(v) => Value::from_json(header, v),
                    None => Ok(Value::Null),
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }

        Self::from_rows(headers, rows)
    }

    /// The table shown when no data file is supplied.
    ///
    /// `latitud`/`longitud` are not used by any chart kind.
    pub fn default_table() -> Self {
        let text = |items: &[&str]| -> Vec<Value> {
            items.iter().map(|s| Value::Text(s.to_string())).collect()
        };
        let numbers = |items: &[f64]| -> Vec<Value> { items.iter().map(|&v| Value::Number(v)).collect() };

        Self {
            columns: vec![
                Column::new("Categoría", text(&["A", "B", "C", "D"])),
                Column::new("Valor_1", numbers(&[15.0, 20.0, 35.0, 10.0])),
                Column::new("Valor_2", numbers(&[25.0, 15.0, 10.0, 30.0])),
                Column::new("latitud", numbers(&[-33.456, -34.567, -35.678, -36.789])),
                Column::new("longitud", numbers(&[-70.678, -71.789, -72.890, -73.901])),
            ],
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    /// True when there is nothing to chart: no columns or no rows
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.n_rows() == 0
    }

    /// Copy of the table with rows taken in `order`
    pub(crate) fn take_rows(&self, order: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), order.iter().map(|&i| c.values[i].clone()).collect()))
            .collect();
        Self { columns }
    }

    /// Copy of the table with one column's values replaced.
    /// `values` must have the same length as the table.
    pub(crate) fn with_column_values(&self, name: &str, values: Vec<Value>) -> Self {
        let mut copy = self.clone();
        if let Some(column) = copy.columns.iter_mut().find(|c| c.name == name) {
            debug_assert_eq!(column.values.len(), values.len());
            column.values = values;
        }
        copy
    }
}

/// A set of named sheets, as uploaded from a workbook file
#[derive(Debug, Clone)]
pub struct Workbook {
    sheets: Vec<(String, Dataset)>,
}

impl Workbook {
    pub fn single(name: impl Into<String>, dataset: Dataset) -> Self {
        Self {
            sheets: vec![(name.into(), dataset)],
        }
    }

    /// Build a workbook from named sheets, kept in the given order
    pub fn from_sheets(sheets: Vec<(String, Dataset)>) -> Result<Self, DataError> {
        if sheets.is_empty() {
            return Err(DataError::InvalidShape("workbook has no sheets".to_string()));
        }
        Ok(Self { sheets })
    }

    /// Parse either a plain array of row objects (one sheet named `Sheet1`)
    /// or an object mapping sheet names to arrays of row objects.
    pub fn from_json(value: &JsonValue) -> Result<Self, DataError> {
        match value {
            JsonValue::Array(_) => Ok(Self::single("Sheet1", Dataset::from_json(value)?)),
            JsonValue::Object(map) => {
                let sheets = map
                    .iter()
                    .map(|(name, rows)| Ok((name.clone(), Dataset::from_json(rows)?)))
                    .collect::<Result<Vec<_>, DataError>>()?;
                Self::from_sheets(sheets)
            }
            _ => Err(DataError::InvalidShape(
                "expected an array of rows or an object of sheets".to_string(),
            )),
        }
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Select a sheet by name; `None` picks the first sheet
    pub fn into_sheet(self, name: Option<&str>) -> Result<Dataset, DataError> {
        let available = self.sheet_names().join(", ");
        let mut sheets = self.sheets.into_iter();
        let found = match name {
            Some(requested) => sheets.find(|(n, _)| n == requested),
            None => sheets.next(),
        };
        found.map(|(_, dataset)| dataset).ok_or_else(|| DataError::UnknownSheet {
            requested: name.unwrap_or_default().to_string(),
            available,
        })
    }
}
