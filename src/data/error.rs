use thiserror::Error;

/// Problems with the input table that make training or labelling impossible.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("input table '{path}' has no column named '{column}' (found: {found})")]
    MissingColumn {
        path:   String,
        column: String,
        found:  String,
    },

    #[error("row {row}: '{column}' cell is empty")]
    EmptyText { row: usize, column: String },

    #[error("row {row}: cannot parse label '{value}' as an integer")]
    InvalidLabel { row: usize, value: String },

    #[error("input table '{0}' has no data rows")]
    EmptyTable(String),

    #[error("cannot stratify: {0}")]
    Stratification(String),

    #[error("labels {missing:?} occur in the table but not in the training split")]
    UncoveredLabels { missing: Vec<i64> },

    #[error("label {label} is not one of the model's labels {known:?}")]
    UnknownLabel { label: i64, known: Vec<i64> },
}
