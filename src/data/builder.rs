use log::debug;

use super::model::{Attribute, AttributeType, Cell, ClassSetup, Dataset, Value};
use crate::error::{DataShapeError, Result, SchemaError, ValueError};

/// Name used when the caller supplies none.
pub const DEFAULT_DATASET_NAME: &str = "dataset";

/// Type every raw row against `attributes` and freeze the result.
///
/// All-or-nothing: the first bad row or cell aborts construction, so the
/// engine never sees a partially valid dataset. Row length is checked for
/// every row before any cell is typed, so a shape error always cites the
/// first offending row.
pub fn build(
    name: Option<&str>,
    attributes: Vec<Attribute>,
    raw_rows: &[Vec<Cell>],
    class: ClassSetup,
) -> Result<Dataset> {
    if attributes.is_empty() {
        return Err(SchemaError::NoColumns.into());
    }
    if attributes.iter().enumerate().any(|(i, a)| a.index != i) {
        return Err(DataShapeError::MalformedInput(
            "attribute indices must run 0..n in order".to_string(),
        )
        .into());
    }

    let width = attributes.len();
    if let ClassSetup::Attribute(index) = class {
        if index >= width {
            return Err(DataShapeError::ClassIndexOutOfRange {
                index: index as i64,
                num_attributes: width,
            }
            .into());
        }
    }

    if let Some((row, cells)) = raw_rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(DataShapeError::RowLengthMismatch {
            row,
            expected: width,
            found: cells.len(),
        }
        .into());
    }

    let rows = raw_rows
        .iter()
        .enumerate()
        .map(|(row, cells)| {
            cells
                .iter()
                .zip(&attributes)
                .enumerate()
                .map(|(col, (cell, attr))| type_cell(cell, attr, row, col))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    let name = name.unwrap_or(DEFAULT_DATASET_NAME);
    debug!(
        "built dataset '{name}': {} rows x {width} attributes, class {class:?}",
        rows.len()
    );
    Ok(Dataset::from_parts(name.to_string(), attributes, rows, class))
}

fn type_cell(cell: &Cell, attr: &Attribute, row: usize, col: usize) -> Result<Value, ValueError> {
    if cell.is_hole() {
        return Ok(Value::Missing);
    }

    match &attr.ty {
        AttributeType::Numeric => {
            let parsed = match cell {
                Cell::Number(v) => Some(*v),
                Cell::Text(s) => s.trim().parse::<f64>().ok(),
                Cell::Missing => None,
            };
            // NaN is the engine's own missing marker, so it is not a number here
            parsed
                .filter(|v| v.is_finite())
                .map(Value::Numeric)
                .ok_or_else(|| ValueError::NotNumeric {
                    row,
                    col,
                    value: cell.to_string(),
                })
        }
        AttributeType::String => Ok(Value::String(cell.to_string())),
        AttributeType::Nominal(values) => {
            let text = cell.to_string();
            values
                .iter()
                .position(|v| *v == text)
                .map(Value::Nominal)
                .ok_or(ValueError::UnknownNominalValue {
                    row,
                    col,
                    value: text,
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::{parse_overrides, resolve};
    use crate::error::Error;
    use serde_json::json;

    fn country_schema() -> Vec<Attribute> {
        let spec = parse_overrides(&json!([[0, 1], "nominal", "country", ["US", "FR"]])).unwrap();
        resolve(3, &spec).unwrap()
    }

    #[test]
    fn nominal_cells_store_indices_and_holes_stay_missing() {
        let attrs = vec![
            Attribute::numeric(0),
            Attribute::numeric(1),
            Attribute {
                index: 2,
                name: "country".into(),
                ty: AttributeType::Nominal(vec!["US".into(), "FR".into()]),
            },
        ];
        let rows = vec![vec![Cell::from(1), Cell::Missing, Cell::from("US")]];
        let ds = build(None, attrs, &rows, ClassSetup::None).unwrap();

        assert_eq!(ds.name(), DEFAULT_DATASET_NAME);
        assert_eq!(ds.value(0, 0), Some(&Value::Numeric(1.0)));
        assert_eq!(ds.value(0, 1), Some(&Value::Missing));
        assert_eq!(ds.value(0, 2), Some(&Value::Nominal(0)));
        assert_eq!(ds.nominal_label(0, 2), Some("US"));
    }

    #[test]
    fn missing_is_accepted_for_every_type() {
        let rows = vec![vec![Cell::Missing, Cell::from(""), Cell::Missing]];
        let ds = build(Some("holes"), country_schema(), &rows, ClassSetup::None).unwrap();
        assert!(ds.row(0).unwrap().iter().all(Value::is_missing));
    }

    #[test]
    fn first_short_row_is_reported() {
        let rows = vec![
            vec![Cell::from("US"), Cell::from("FR"), Cell::from(1)],
            vec![Cell::from("US"), Cell::from("FR")],
            vec![Cell::from("US")],
        ];
        let err = build(None, country_schema(), &rows, ClassSetup::None).unwrap_err();
        assert!(matches!(
            err,
            Error::DataShape(DataShapeError::RowLengthMismatch {
                row: 1,
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn numeric_columns_parse_text_and_reject_garbage() {
        let attrs = vec![Attribute::numeric(0)];
        let ds = build(None, attrs.clone(), &[vec![Cell::from(" 2.5 ")]], ClassSetup::None).unwrap();
        assert_eq!(ds.value(0, 0), Some(&Value::Numeric(2.5)));

        let err = build(None, attrs.clone(), &[vec![Cell::from("abc")]], ClassSetup::None).unwrap_err();
        assert!(matches!(
            err,
            Error::Value(ValueError::NotNumeric { row: 0, col: 0, .. })
        ));

        let err = build(None, attrs, &[vec![Cell::Number(f64::NAN)]], ClassSetup::None).unwrap_err();
        assert!(matches!(err, Error::Value(ValueError::NotNumeric { .. })));
    }

    #[test]
    fn unknown_nominal_value_names_the_cell() {
        let rows = vec![vec![Cell::from("US"), Cell::from("DE"), Cell::from(0)]];
        let err = build(None, country_schema(), &rows, ClassSetup::None).unwrap_err();
        match err {
            Error::Value(ValueError::UnknownNominalValue { row, col, value }) => {
                assert_eq!((row, col, value.as_str()), (0, 1, "DE"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn string_columns_keep_text_verbatim() {
        let attrs = vec![Attribute {
            index: 0,
            name: "note".into(),
            ty: AttributeType::String,
        }];
        let rows = vec![vec![Cell::from("  spaced ")], vec![Cell::from(7)]];
        let ds = build(None, attrs, &rows, ClassSetup::None).unwrap();
        assert_eq!(ds.value(0, 0), Some(&Value::String("  spaced ".into())));
        assert_eq!(ds.value(1, 0), Some(&Value::String("7".into())));
    }

    #[test]
    fn class_index_must_be_inside_schema() {
        let err = build(None, country_schema(), &[], ClassSetup::Attribute(3)).unwrap_err();
        assert!(matches!(
            err,
            Error::DataShape(DataShapeError::ClassIndexOutOfRange { index: 3, .. })
        ));

        let ds = build(None, country_schema(), &[], ClassSetup::Attribute(0)).unwrap();
        assert_eq!(ds.class_index(), Some(0));
        assert!(ds.is_empty());
    }
}
