use crate::data::{Dataset, Value};
use crate::error::{ResolveError, ResolveResult};
use crate::ir::AxisRange;

/// Headroom above the tallest value so labels and markers stay inside the plot
pub const Y_HEADROOM: f64 = 1.1;

/// Derive the Y axis range `[0, max(Y) * 1.1]` for a column.
///
/// Nulls are skipped. Fails when the column holds any non-numeric value
/// or no numeric value at all.
pub fn derive_y_range(data: &Dataset, column: &str) -> ResolveResult<AxisRange> {
    let values = numeric_values(data, column, "the y-axis range")?;
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return Err(ResolveError::InvalidAxisData {
            column: column.to_string(),
            operation: "the y-axis range",
            reason: "column has no numeric values".to_string(),
        });
    }

    Ok(AxisRange {
        lower: 0.0,
        upper: max * Y_HEADROOM,
    })
}

/// Collect the numeric values of a column, rejecting text and dates
pub fn numeric_values(data: &Dataset, column: &str, operation: &'static str) -> ResolveResult<Vec<f64>> {
    let col = data
        .column(column)
        .ok_or_else(|| ResolveError::InvalidColumnReference {
            column: column.to_string(),
            role: operation,
        })?;

    let mut values = Vec::with_capacity(col.values.len());
    for (row_idx, value) in col.values.iter().enumerate() {
        match value {
            Value::Number(v) => values.push(*v),
            Value::Null => {}
            other => {
                return Err(ResolveError::InvalidAxisData {
                    column: column.to_string(),
                    operation,
                    reason: format!("non-numeric value '{}' at row {}", other, row_idx + 1),
                })
            }
        }
    }
    Ok(values)
}

/// Range the renderer actually draws: bounds ordered, zero width padded
pub fn drawable_range(range: AxisRange) -> (f64, f64) {
    let (min, max) = if range.lower <= range.upper {
        (range.lower, range.upper)
    } else {
        (range.upper, range.lower)
    };
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        (min, max)
    }
}

/// Pad a continuous data extent by 5% on each side
pub fn pad_range(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding, max + padding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;
    use approx::assert_relative_eq;

    fn table(values: Vec<Value>) -> Dataset {
        Dataset::new(vec![Column::new("y", values)]).unwrap()
    }

    #[test]
    fn test_range_from_default_table() {
        let range = derive_y_range(&Dataset::default_table(), "Valor_1").unwrap();
        assert_eq!(range.lower, 0.0);
        assert_relative_eq!(range.upper, 38.5, epsilon = 1e-9);
    }

    #[test]
    fn test_range_skips_nulls() {
        let data = table(vec![Value::Null, Value::Number(4.0), Value::Null]);
        let range = derive_y_range(&data, "y").unwrap();
        assert_relative_eq!(range.upper, 4.4, epsilon = 1e-9);
    }

    #[test]
    fn test_range_rejects_text() {
        let data = table(vec![Value::Number(1.0), Value::Text("abc".to_string())]);
        let err = derive_y_range(&data, "y").unwrap_err();
        match err {
            ResolveError::InvalidAxisData { column, reason, .. } => {
                assert_eq!(column, "y");
                assert!(reason.contains("'abc' at row 2"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_range_rejects_all_null() {
        let data = table(vec![Value::Null, Value::Null]);
        assert!(matches!(
            derive_y_range(&data, "y"),
            Err(ResolveError::InvalidAxisData { .. })
        ));
    }

    #[test]
    fn test_range_negative_max_is_inverted() {
        let data = table(vec![Value::Number(-10.0), Value::Number(-2.0)]);
        let range = derive_y_range(&data, "y").unwrap();
        assert_eq!(range.lower, 0.0);
        assert_relative_eq!(range.upper, -2.2, epsilon = 1e-9);

        let (min, max) = drawable_range(range);
        assert_relative_eq!(min, -2.2, epsilon = 1e-9);
        assert_eq!(max, 0.0);
    }

    #[test]
    fn test_drawable_range_pads_zero_width() {
        let range = AxisRange { lower: 0.0, upper: 0.0 };
        assert_eq!(drawable_range(range), (-1.0, 1.0));
    }

    #[test]
    fn test_pad_range() {
        assert_eq!(pad_range(0.0, 100.0), (-5.0, 105.0));
        assert_eq!(pad_range(3.0, 3.0), (2.0, 4.0));
    }
}
