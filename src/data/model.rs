use std::fmt;

use serde::Serialize;

use crate::error::DataShapeError;

// ---------------------------------------------------------------------------
// AttributeType – the semantic type of a column
// ---------------------------------------------------------------------------

/// Column type understood by the engine. Nominal columns carry their ordered
/// value set; a value's position is the index stored in the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AttributeType {
    Numeric,
    String,
    Nominal(Vec<String>),
}

impl AttributeType {
    pub fn label(&self) -> &'static str {
        match self {
            AttributeType::Numeric => "numeric",
            AttributeType::String => "string",
            AttributeType::Nominal(_) => "nominal",
        }
    }

    pub fn nominal_values(&self) -> Option<&[String]> {
        match self {
            AttributeType::Nominal(values) => Some(values),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::Nominal(values) => write!(f, "nominal {{{}}}", values.join(",")),
            other => f.write_str(other.label()),
        }
    }
}

// ---------------------------------------------------------------------------
// Attribute – one resolved column descriptor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    /// Zero-based position in a row.
    pub index: usize,
    pub name: String,
    pub ty: AttributeType,
}

impl Attribute {
    /// Default descriptor for a column no override touched.
    pub fn numeric(index: usize) -> Self {
        Self {
            index,
            name: synthetic_name(index),
            ty: AttributeType::Numeric,
        }
    }

    pub fn values(&self) -> Option<&[String]> {
        self.ty.nominal_values()
    }

    /// Position of `value` in the nominal value list, by exact match.
    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.values()?.iter().position(|v| v == value)
    }
}

/// Positional name given to columns without an explicit one.
pub fn synthetic_name(index: usize) -> String {
    format!("col_{index}")
}

// ---------------------------------------------------------------------------
// Cell – a raw, untyped input value
// ---------------------------------------------------------------------------

/// One slot of a caller-supplied row, before schema typing.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// An elided slot.
    Missing,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Holes become the missing sentinel whatever the column type.
    pub fn is_hole(&self) -> bool {
        match self {
            Cell::Missing => true,
            Cell::Text(s) => s.is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => write!(f, "?"),
            Cell::Number(v) => write!(f, "{}", format_number(*v)),
            Cell::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<i32> for Cell {
    fn from(v: i32) -> Self {
        Cell::Number(v as f64)
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Number(v as f64)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map_or(Cell::Missing, Into::into)
    }
}

/// Render a number the way the scripting layer stringifies it: integral
/// values lose their fractional part (`3`, not `3.0`).
pub(crate) fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

// ---------------------------------------------------------------------------
// Value – a typed dataset cell
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Missing,
    Numeric(f64),
    String(String),
    /// Index into the column's nominal value list.
    Nominal(usize),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn nominal_index(&self) -> Option<usize> {
        match self {
            Value::Nominal(i) => Some(*i),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ClassSetup – which column, if any, is the classification target
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ClassSetup {
    /// Class-naive: clustering and filtering data.
    #[default]
    None,
    /// Classification data using the engine convention (last attribute).
    EngineDefault,
    /// Classification data with an explicit target column.
    Attribute(usize),
}

impl ClassSetup {
    /// `class_index` of `-1` or `None` defers to the engine default.
    pub fn from_options(
        is_classification_data: bool,
        class_index: Option<i64>,
    ) -> Result<Self, DataShapeError> {
        if !is_classification_data {
            return Ok(ClassSetup::None);
        }
        match class_index {
            None | Some(-1) => Ok(ClassSetup::EngineDefault),
            Some(i) => usize::try_from(i)
                .map(ClassSetup::Attribute)
                .map_err(|_| DataShapeError::InvalidClassIndex(i)),
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the immutable typed table handed to the engine
// ---------------------------------------------------------------------------

/// Built only by [`crate::data::builder::build`] (or an engine file loader),
/// so every row already matches the schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    name: String,
    attributes: Vec<Attribute>,
    rows: Vec<Vec<Value>>,
    class: ClassSetup,
}

impl Dataset {
    pub(crate) fn from_parts(
        name: String,
        attributes: Vec<Attribute>,
        rows: Vec<Vec<Value>>,
        class: ClassSetup,
    ) -> Self {
        Self {
            name,
            attributes,
            rows,
            class,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, index: usize) -> Option<&Attribute> {
        self.attributes.get(index)
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.iter().map(|a| a.name.clone()).collect()
    }

    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn value(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row)?.get(col)
    }

    /// Number of instances.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn class_setup(&self) -> ClassSetup {
        self.class
    }

    /// Resolved target column, with the engine default mapped to the last one.
    pub fn class_index(&self) -> Option<usize> {
        match self.class {
            ClassSetup::None => None,
            ClassSetup::EngineDefault => self.attributes.len().checked_sub(1),
            ClassSetup::Attribute(i) => Some(i),
        }
    }

    pub fn class_attribute(&self) -> Option<&Attribute> {
        self.class_index().and_then(|i| self.attributes.get(i))
    }

    /// Nominal index of the class cell of `row`, if any.
    pub fn class_value(&self, row: usize) -> Option<usize> {
        self.value(row, self.class_index()?)?.nominal_index()
    }

    /// Check that `other` can be scored by a model trained on `self`: same
    /// attribute count, and per column the same type with nominal values in
    /// the same order. Names are not compared.
    pub fn check_compatible(&self, other: &Dataset) -> Result<(), DataShapeError> {
        if self.attributes.len() != other.attributes.len() {
            return Err(DataShapeError::ColumnCountMismatch {
                train: self.attributes.len(),
                test: other.attributes.len(),
            });
        }
        match self
            .attributes
            .iter()
            .zip(&other.attributes)
            .find(|(a, b)| a.ty != b.ty)
        {
            Some((a, b)) => Err(DataShapeError::SchemaMismatch {
                index: a.index,
                train: a.ty.to_string(),
                test: b.ty.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Map a nominal cell back to its declared string.
    pub fn nominal_label(&self, row: usize, col: usize) -> Option<&str> {
        let index = self.value(row, col)?.nominal_index()?;
        self.attributes
            .get(col)?
            .values()?
            .get(index)
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_render_without_trailing_zero() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(-1.0), "-1");
        assert_eq!(Cell::Number(1e-12).to_string(), "0.000000000001");
    }

    #[test]
    fn empty_text_is_a_hole() {
        assert!(Cell::Missing.is_hole());
        assert!(Cell::from("").is_hole());
        assert!(!Cell::from(" ").is_hole());
        assert!(!Cell::from(0).is_hole());
        assert_eq!(Cell::from(None::<f64>), Cell::Missing);
    }

    #[test]
    fn class_setup_from_options() {
        assert_eq!(ClassSetup::from_options(false, Some(2)), Ok(ClassSetup::None));
        assert_eq!(ClassSetup::from_options(true, None), Ok(ClassSetup::EngineDefault));
        assert_eq!(ClassSetup::from_options(true, Some(-1)), Ok(ClassSetup::EngineDefault));
        assert_eq!(ClassSetup::from_options(true, Some(1)), Ok(ClassSetup::Attribute(1)));
        assert_eq!(
            ClassSetup::from_options(true, Some(-3)),
            Err(DataShapeError::InvalidClassIndex(-3))
        );
    }

    fn nominal(index: usize, values: &[&str]) -> Attribute {
        Attribute {
            index,
            name: format!("n{index}"),
            ty: AttributeType::Nominal(values.iter().map(|v| v.to_string()).collect()),
        }
    }

    fn schema_only(attributes: Vec<Attribute>) -> Dataset {
        Dataset::from_parts("d".into(), attributes, Vec::new(), ClassSetup::None)
    }

    #[test]
    fn compatible_sets_share_types_and_value_order() {
        let train = schema_only(vec![Attribute::numeric(0), nominal(1, &["a", "b"])]);
        let mut label = nominal(1, &["a", "b"]);
        label.name = "label".into();
        let renamed = schema_only(vec![Attribute::numeric(0), label]);
        assert_eq!(train.check_compatible(&renamed), Ok(()));

        let narrower = schema_only(vec![Attribute::numeric(0)]);
        assert_eq!(
            train.check_compatible(&narrower),
            Err(DataShapeError::ColumnCountMismatch { train: 2, test: 1 })
        );

        let reordered = schema_only(vec![Attribute::numeric(0), nominal(1, &["b", "a"])]);
        assert_eq!(
            train.check_compatible(&reordered),
            Err(DataShapeError::SchemaMismatch {
                index: 1,
                train: "nominal {a,b}".into(),
                test: "nominal {b,a}".into(),
            })
        );
    }

    #[test]
    fn engine_default_class_is_last_attribute() {
        let attributes = vec![Attribute::numeric(0), Attribute::numeric(1)];
        let ds = Dataset::from_parts("d".into(), attributes, Vec::new(), ClassSetup::EngineDefault);
        assert_eq!(ds.class_index(), Some(1));
        assert_eq!(ds.class_attribute().map(|a| a.name.as_str()), Some("col_1"));
    }
}
