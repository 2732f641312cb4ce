use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Malformed, overlapping or out-of-range attribute overrides.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("dataset has no columns")]
    NoColumns,

    #[error("override #{entry}: index {index} is outside 0..{num_columns}")]
    OutOfRange {
        entry: usize,
        index: i64,
        num_columns: usize,
    },

    #[error("override #{entry}: range [{start}, {end}] starts after it ends")]
    InvalidRange { entry: usize, start: i64, end: i64 },

    #[error("attribute {index} claimed by override #{first} and again by #{second}")]
    DuplicateOverride {
        index: usize,
        first: usize,
        second: usize,
    },

    #[error("override #{entry} ('{name}'): nominal values must be non-empty and distinct")]
    InvalidNominalValues { entry: usize, name: String },

    #[error("override #{entry}: unknown attribute type '{found}'")]
    UnknownType { entry: usize, found: String },

    #[error("override #{entry}: {reason}")]
    Malformed { entry: usize, reason: String },
}

/// Row-length or column-count mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataShapeError {
    #[error("row {row} has {found} cells, expected {expected}")]
    RowLengthMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("class index {index} is outside 0..{num_attributes}")]
    ClassIndexOutOfRange { index: i64, num_attributes: usize },

    #[error("class index {0} is negative; use -1 for the last attribute")]
    InvalidClassIndex(i64),

    #[error("embedded schema declares {attributes} attributes but rows have {columns} cells")]
    EmbeddedSchemaWidth { attributes: usize, columns: usize },

    #[error("test set has {test} attributes, training set has {train}")]
    ColumnCountMismatch { train: usize, test: usize },

    #[error("attribute {index}: test set has {test}, training set has {train}")]
    SchemaMismatch {
        index: usize,
        train: String,
        test: String,
    },

    #[error("malformed input: {0}")]
    MalformedInput(String),
}

/// Type mismatch or unknown nominal value at a specific cell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("cell ({row}, {col}): '{value}' is not a number")]
    NotNumeric {
        row: usize,
        col: usize,
        value: String,
    },

    #[error("cell ({row}, {col}): '{value}' is not a declared nominal value")]
    UnknownNominalValue {
        row: usize,
        col: usize,
        value: String,
    },

    #[error("cell ({row}, {col}): unsupported cell value {found}")]
    UnsupportedCell {
        row: usize,
        col: usize,
        found: String,
    },
}

/// A recognised option whose value falls outside its documented domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("option '{key}' = {value}: expected {expected}")]
    OutOfDomain {
        key: String,
        value: String,
        expected: String,
    },

    #[error("options must be a JSON object, got {0}")]
    NotAnObject(String),

    #[error("{algorithm} is a {actual}, not a {expected}")]
    WrongAlgorithmKind {
        algorithm: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Failure reported by the external engine, kept with its original cause.
#[derive(Debug, Error)]
#[error("engine failed during {operation}")]
pub struct EngineError {
    pub operation: &'static str,
    #[source]
    pub source: anyhow::Error,
}

impl EngineError {
    pub fn new(operation: &'static str, source: anyhow::Error) -> Self {
        Self { operation, source }
    }
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    DataShape(#[from] DataShapeError),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Option(#[from] OptionError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
