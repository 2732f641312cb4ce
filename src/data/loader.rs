use std::path::{Path, PathBuf};

use log::{debug, info};
use serde_json::Value as JsonValue;

use super::builder::build;
use super::model::{Cell, ClassSetup, Dataset};
use super::schema::{parse_embedded, resolve, AttributeOverride, AttributeOverrideSpec};
use crate::error::{DataShapeError, EngineError, Result, ValueError};

// ---------------------------------------------------------------------------
// Input sources
// ---------------------------------------------------------------------------

/// Raw train/test input, classified once at the ingestion boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    /// A file in one of the engine's native formats (ARFF, CSV, ...).
    FilePath(PathBuf),
    /// Flat in-memory rows.
    Rows(Vec<Vec<Cell>>),
    /// A JSON object with a `data` array and optionally its own schema.
    Json(JsonDataset),
}

/// Expected JSON layout:
///
/// ```json
/// {
///   "attributes": [["att1", "Nominal", ["val1", "val2"]], ["att2", "Numeric"]],
///   "data": [["val1", 3], ["val2", null]]
/// }
/// ```
///
/// `attributes` is optional and positional; `Data` is accepted for `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonDataset {
    pub attributes: Option<AttributeOverrideSpec>,
    pub rows: Vec<Vec<Cell>>,
}

impl DataSource {
    /// Dispatch on the JSON shape: arrays are rows, objects are JSON
    /// datasets, and strings are either JSON text or a file path.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        match value {
            JsonValue::Array(_) => Ok(DataSource::Rows(rows_from_json(value)?)),
            JsonValue::Object(obj) => {
                let data = obj
                    .get("data")
                    .or_else(|| obj.get("Data"))
                    .ok_or_else(|| DataShapeError::MalformedInput("JSON dataset has no 'data' array".into()))?;
                let attributes = obj.get("attributes").map(parse_embedded).transpose()?;
                let rows = rows_from_json(data)?;
                if let (Some(attrs), Some(first)) = (&attributes, rows.first()) {
                    if attrs.len() != first.len() {
                        return Err(DataShapeError::EmbeddedSchemaWidth {
                            attributes: attrs.len(),
                            columns: first.len(),
                        }
                        .into());
                    }
                }
                Ok(DataSource::Json(JsonDataset { attributes, rows }))
            }
            JsonValue::String(text) => match serde_json::from_str::<JsonValue>(text) {
                Ok(parsed @ (JsonValue::Array(_) | JsonValue::Object(_))) => Self::from_json(&parsed),
                _ => Ok(DataSource::FilePath(PathBuf::from(text))),
            },
            other => Err(DataShapeError::MalformedInput(format!(
                "expected a path, rows or JSON dataset, got {other}"
            ))
            .into()),
        }
    }

    /// Row width of in-memory data; `None` for files and for empty data with
    /// no embedded schema.
    pub fn num_columns(&self) -> Option<usize> {
        match self {
            DataSource::FilePath(_) => None,
            DataSource::Rows(rows) => rows.first().map(Vec::len),
            DataSource::Json(json) => json
                .rows
                .first()
                .map(Vec::len)
                .or_else(|| json.attributes.as_ref().map(Vec::len)),
        }
    }
}

impl From<Vec<Vec<Cell>>> for DataSource {
    fn from(rows: Vec<Vec<Cell>>) -> Self {
        DataSource::Rows(rows)
    }
}

impl From<PathBuf> for DataSource {
    fn from(path: PathBuf) -> Self {
        DataSource::FilePath(path)
    }
}

impl From<&Path> for DataSource {
    fn from(path: &Path) -> Self {
        DataSource::FilePath(path.to_path_buf())
    }
}

/// Convert a JSON array of arrays into raw rows. `null` and `""` are holes.
pub fn rows_from_json(value: &JsonValue) -> Result<Vec<Vec<Cell>>> {
    let rows = value
        .as_array()
        .ok_or_else(|| DataShapeError::MalformedInput("data must be an array of rows".into()))?;

    rows.iter()
        .enumerate()
        .map(|(row, r)| -> Result<Vec<Cell>> {
            let cells = r
                .as_array()
                .ok_or_else(|| DataShapeError::MalformedInput(format!("row {row} is not an array")))?;
            let typed = cells
                .iter()
                .enumerate()
                .map(|(col, v)| cell_from_json(v, row, col))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(typed)
        })
        .collect()
}

fn cell_from_json(value: &JsonValue, row: usize, col: usize) -> Result<Cell, ValueError> {
    match value {
        JsonValue::Null => Ok(Cell::Missing),
        JsonValue::Number(n) => n.as_f64().map(Cell::Number).ok_or_else(|| ValueError::NotNumeric {
            row,
            col,
            value: n.to_string(),
        }),
        JsonValue::String(s) => Ok(Cell::Text(s.clone())),
        JsonValue::Bool(b) => Ok(Cell::Text(b.to_string())),
        other => Err(ValueError::UnsupportedCell {
            row,
            col,
            found: other.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Native-format file loading, provided by the engine.
pub trait FileLoader {
    /// Parse `path` and build a dataset from it (through
    /// [`crate::data::builder::build`]), applying `class`.
    fn load_file(&self, path: &Path, class: ClassSetup) -> anyhow::Result<Dataset>;
}

/// Everything that shapes one load besides the data itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadRequest<'a> {
    /// Ignored for file inputs.
    pub name: Option<&'a str>,
    /// Replaces any schema embedded in a JSON dataset.
    pub overrides: Option<&'a [AttributeOverride]>,
    pub class: ClassSetup,
}

/// Turn one source into a dataset. Train and test data are loaded with the
/// same request so they share column semantics.
pub fn load(source: &DataSource, request: &LoadRequest<'_>, files: &dyn FileLoader) -> Result<Dataset> {
    match source {
        DataSource::FilePath(path) => {
            info!("loading {} through the engine", path.display());
            files
                .load_file(path, request.class)
                .map_err(|e| EngineError::new("load_file", e).into())
        }
        DataSource::Rows(rows) => {
            let overrides = request.overrides.unwrap_or_default();
            load_rows(source, rows, overrides, request)
        }
        DataSource::Json(json) => {
            let overrides = request
                .overrides
                .or(json.attributes.as_deref())
                .unwrap_or_default();
            load_rows(source, &json.rows, overrides, request)
        }
    }
}

fn load_rows(
    source: &DataSource,
    rows: &[Vec<Cell>],
    overrides: &[AttributeOverride],
    request: &LoadRequest<'_>,
) -> Result<Dataset> {
    let num_columns = source.num_columns().unwrap_or(0);
    debug!(
        "loading {} in-memory rows, {num_columns} columns, {} overrides",
        rows.len(),
        overrides.len()
    );
    let attributes = resolve(num_columns, overrides)?;
    build(request.name, attributes, rows, request.class)
}
