//! Error types for instrument data.

/// Errors raised while building instrument reference data.
#[derive(Debug, thiserror::Error)]
pub enum InstrumentError {
    /// The neck profile catalog is not valid JSON or has the wrong shape.
    #[error("failed to parse neck profile catalog: {0}")]
    ProfileCatalog(#[from] serde_json::Error),

    /// A dimension is outside the range the constructions can work with.
    #[error("invalid {field}: {value}")]
    InvalidDimension {
        /// The offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
}
