use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;

use crate::data::{Dataset, Value, Workbook};

/// Read every worksheet of an `.xlsx`/`.xls`/`.ods` file into a workbook.
///
/// The first row of each sheet is its header row. Sheets keep the order
/// they have in the file.
pub fn read_workbook(path: &Path) -> Result<Workbook> {
    let mut spreadsheet = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook '{}'", path.display()))?;

    let mut sheets = Vec::new();
    for name in spreadsheet.sheet_names() {
        let range = spreadsheet
            .worksheet_range(&name)
            .with_context(|| format!("Failed to read sheet '{}'", name))?;
        let dataset = sheet_to_dataset(&range).with_context(|| format!("Invalid sheet '{}'", name))?;
        sheets.push((name, dataset));
    }

    Ok(Workbook::from_sheets(sheets)?)
}

fn sheet_to_dataset(range: &Range<Data>) -> Result<Dataset> {
    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Dataset::new(Vec::new())?);
    };

    let headers: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(idx, cell)| match cell {
            Data::Empty => format!("Unnamed: {}", idx),
            other => other.to_string().trim().to_string(),
        })
        .collect();

    let rows: Vec<Vec<Value>> = rows.map(|row| row.iter().map(cell_value).collect()).collect();
    Ok(Dataset::from_rows(headers, rows)?)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::Int(v) => Value::Number(*v as f64),
        Data::Float(v) if v.is_finite() => Value::Number(*v),
        Data::Float(_) => Value::Null,
        Data::String(s) if s.trim().is_empty() => Value::Null,
        Data::String(s) => Value::Text(s.trim().to_string()),
        Data::Bool(b) => Value::Text(b.to_string()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(Value::DateTime)
            .unwrap_or_else(|| Value::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_workbook_fixture() {
        let workbook = read_workbook(Path::new("test/workbook.xlsx")).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["ventas", "costos"]);

        let costos = workbook.into_sheet(Some("costos")).unwrap();
        assert_eq!(costos.headers(), vec!["mes", "total"]);
        assert_eq!(
            costos.column("total").unwrap().values,
            vec![Value::Number(4.0), Value::Number(6.0), Value::Null]
        );
        assert_eq!(costos.column("mes").unwrap().values[2], Value::Text("marzo".to_string()));
    }

    #[test]
    fn test_read_workbook_missing_file() {
        let err = read_workbook(Path::new("test/missing.xlsx")).unwrap_err();
        assert!(err.to_string().contains("missing.xlsx"));
    }

    #[test]
    fn test_cell_values() {
        assert_eq!(cell_value(&Data::Int(3)), Value::Number(3.0));
        assert_eq!(cell_value(&Data::Float(f64::NAN)), Value::Null);
        assert_eq!(cell_value(&Data::String("  ".to_string())), Value::Null);
        assert_eq!(cell_value(&Data::Bool(true)), Value::Text("true".to_string()));
        assert_eq!(cell_value(&Data::Empty), Value::Null);
    }
}
