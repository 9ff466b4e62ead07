use thiserror::Error;

/// Errors that can occur while loading, querying or indexing sheets
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Column not found: {key}")]
    ColumnNotFound { key: String },

    #[error("Cell not found for column {key}")]
    CellNotFound { key: String },

    #[error("Index {columns:?} is not found, build it first with build_index")]
    IndexNotFound { columns: Vec<String> },

    #[error(
        "Index {columns:?} is non-unique and lookup will potentially return multiple rows, use get_rows instead"
    )]
    IndexNotUnique { columns: Vec<String> },

    #[error("Unique index {columns:?} already contains key {key}")]
    DuplicateIndexKey { columns: Vec<String>, key: String },

    #[error("Unknown field '{field}' for {entity}")]
    UnknownField { entity: &'static str, field: String },

    #[error("Invalid value for field '{field}' of {entity}: {message}")]
    InvalidField {
        entity: &'static str,
        field: &'static str,
        message: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, SheetError>;
