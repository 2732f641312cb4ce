use std::collections::HashSet;

use log::debug;
use serde_json::Value as JsonValue;

use super::model::{format_number, Attribute, AttributeType};
use crate::error::SchemaError;

// ---------------------------------------------------------------------------
// Override spec – user input prior to resolution
// ---------------------------------------------------------------------------

/// Target of an override: one column or a closed `[start, end]` interval.
/// A single index of `-1` stands for the last column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSpec {
    Single(i64),
    Range { start: i64, end: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeOverride {
    pub target: IndexSpec,
    pub ty: AttributeType,
    pub name: String,
}

/// Sparse, ordered list of overrides.
pub type AttributeOverrideSpec = Vec<AttributeOverride>;

impl AttributeOverride {
    pub fn new(target: IndexSpec, ty: AttributeType, name: impl Into<String>) -> Self {
        Self {
            target,
            ty,
            name: name.into(),
        }
    }

    /// Parse one `[indexOrRange, type, name, values?]` entry.
    pub fn from_json(entry: usize, value: &JsonValue) -> Result<Self, SchemaError> {
        let malformed = |reason: &str| SchemaError::Malformed {
            entry,
            reason: reason.to_string(),
        };

        let parts = value
            .as_array()
            .ok_or_else(|| malformed("expected [index, type, name, values?]"))?;
        if parts.len() < 3 {
            return Err(malformed("expected at least [index, type, name]"));
        }

        let target = match &parts[0] {
            JsonValue::Array(bounds) => match bounds.as_slice() {
                [start, end] => IndexSpec::Range {
                    start: json_index(start).ok_or_else(|| malformed("range start is not an integer"))?,
                    end: json_index(end).ok_or_else(|| malformed("range end is not an integer"))?,
                },
                _ => return Err(malformed("range must be a [start, end] pair")),
            },
            other => IndexSpec::Single(
                json_index(other).ok_or_else(|| malformed("index is not an integer"))?,
            ),
        };

        let type_name = parts[1]
            .as_str()
            .ok_or_else(|| malformed("attribute type is not a string"))?;
        let name = parts[2]
            .as_str()
            .ok_or_else(|| malformed("attribute name is not a string"))?;
        let ty = parse_type(entry, type_name, parts.get(3))?;

        Ok(Self::new(target, ty, name))
    }
}

/// Parse the `dataAttributes` wire format. A lone entry may be given without
/// the enclosing list.
pub fn parse_overrides(value: &JsonValue) -> Result<AttributeOverrideSpec, SchemaError> {
    let entries = value.as_array().ok_or_else(|| SchemaError::Malformed {
        entry: 0,
        reason: "attribute overrides must be an array".to_string(),
    })?;

    if entries.get(1).is_some_and(JsonValue::is_string) {
        return Ok(vec![AttributeOverride::from_json(0, value)?]);
    }

    entries
        .iter()
        .enumerate()
        .map(|(i, e)| AttributeOverride::from_json(i, e))
        .collect()
}

/// Convert a positional `[[name, type, values?], ...]` list (the schema a
/// JSON dataset may carry) into one override per column.
pub fn parse_embedded(value: &JsonValue) -> Result<AttributeOverrideSpec, SchemaError> {
    let entries = value.as_array().ok_or_else(|| SchemaError::Malformed {
        entry: 0,
        reason: "embedded attributes must be an array".to_string(),
    })?;

    entries
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let parts = e.as_array().ok_or_else(|| SchemaError::Malformed {
                entry: i,
                reason: "expected [name, type, values?]".to_string(),
            })?;
            let (name, type_name) = match (parts.first(), parts.get(1)) {
                (Some(JsonValue::String(n)), Some(JsonValue::String(t))) => (n, t),
                _ => {
                    return Err(SchemaError::Malformed {
                        entry: i,
                        reason: "expected [name, type, values?]".to_string(),
                    })
                }
            };
            let ty = parse_type(i, type_name, parts.get(2))?;
            Ok(AttributeOverride::new(IndexSpec::Single(i as i64), ty, name.clone()))
        })
        .collect()
}

/// Case-insensitive type name. Nominal values are collected as given and
/// validated later by [`resolve`].
fn parse_type(
    entry: usize,
    type_name: &str,
    values: Option<&JsonValue>,
) -> Result<AttributeType, SchemaError> {
    match type_name.to_ascii_lowercase().as_str() {
        "numeric" => Ok(AttributeType::Numeric),
        "string" => Ok(AttributeType::String),
        "nominal" => {
            let values = match values {
                None | Some(JsonValue::Null) => Vec::new(),
                Some(JsonValue::Array(items)) => items
                    .iter()
                    .map(|v| match v {
                        JsonValue::String(s) => Ok(s.clone()),
                        JsonValue::Number(n) => Ok(n.as_f64().map_or_else(|| n.to_string(), format_number)),
                        other => Err(SchemaError::Malformed {
                            entry,
                            reason: format!("nominal value {other} is not a string"),
                        }),
                    })
                    .collect::<Result<_, _>>()?,
                Some(other) => {
                    return Err(SchemaError::Malformed {
                        entry,
                        reason: format!("nominal values must be an array, got {other}"),
                    })
                }
            };
            Ok(AttributeType::Nominal(values))
        }
        other => Err(SchemaError::UnknownType {
            entry,
            found: other.to_string(),
        }),
    }
}

fn json_index(value: &JsonValue) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Produce one attribute per column: defaults first, then each override in
/// order. An empty override list leaves every column numeric. Independent of
/// row data so train and test sets share it.
pub fn resolve(
    num_columns: usize,
    overrides: &[AttributeOverride],
) -> Result<Vec<Attribute>, SchemaError> {
    if num_columns == 0 {
        return Err(SchemaError::NoColumns);
    }

    let mut attributes: Vec<Attribute> = (0..num_columns).map(Attribute::numeric).collect();
    let mut claimed_by: Vec<Option<usize>> = vec![None; num_columns];

    for (entry, ov) in overrides.iter().enumerate() {
        let indices = expand(entry, ov.target, num_columns)?;

        for index in indices {
            if let Some(first) = claimed_by[index] {
                return Err(SchemaError::DuplicateOverride {
                    index,
                    first,
                    second: entry,
                });
            }
            if let AttributeType::Nominal(values) = &ov.ty {
                validate_nominal(entry, &ov.name, values)?;
            }
            claimed_by[index] = Some(entry);
            attributes[index] = Attribute {
                index,
                name: ov.name.clone(),
                ty: ov.ty.clone(),
            };
        }
    }

    debug!(
        "resolved {num_columns} attributes ({} overridden)",
        claimed_by.iter().filter(|c| c.is_some()).count()
    );
    Ok(attributes)
}

fn expand(entry: usize, target: IndexSpec, num_columns: usize) -> Result<Vec<usize>, SchemaError> {
    let in_range = |index: i64| -> Result<usize, SchemaError> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < num_columns)
            .ok_or(SchemaError::OutOfRange {
                entry,
                index,
                num_columns,
            })
    };

    match target {
        IndexSpec::Single(-1) => Ok(vec![num_columns - 1]),
        IndexSpec::Single(index) => Ok(vec![in_range(index)?]),
        IndexSpec::Range { start, end } => {
            let (first, last) = (in_range(start)?, in_range(end)?);
            if first > last {
                return Err(SchemaError::InvalidRange { entry, start, end });
            }
            Ok((first..=last).collect())
        }
    }
}

fn validate_nominal(entry: usize, name: &str, values: &[String]) -> Result<(), SchemaError> {
    let mut seen = HashSet::with_capacity(values.len());
    if values.is_empty() || !values.iter().all(|v| seen.insert(v.as_str())) {
        return Err(SchemaError::InvalidNominalValues {
            entry,
            name: name.to_string(),
        });
    }
    Ok(())
}
