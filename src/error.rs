//! Error types and handling for pvwire

/// Result type alias for pvwire operations
pub type Result<T> = std::result::Result<T, PvError>;

/// Error types for array storage, allocation and the wire codec
#[derive(Debug, thiserror::Error)]
pub enum PvError {
    /// Structural mutation attempted on an immutable value
    #[error("Immutable: {field} cannot be modified")]
    Immutable { field: String },

    /// A pool refused or failed to provide a block
    #[error("Allocation failed in {pool}: requested {requested} bytes ({reason})")]
    AllocationFailed {
        pool: String,
        requested: usize,
        reason: String,
    },

    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Not enough room in a byte buffer for the requested transfer
    #[error("Insufficient space: requested {requested}, available {available}")]
    InsufficientSpace { requested: usize, available: usize },

    /// Stream I/O failures surfaced by a serialize/deserialize control
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Malformed wire data
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl PvError {
    /// Create an I/O error from a standard I/O error
    pub fn from_io(source: std::io::Error, context: &str) -> Self {
        Self::Io {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }

    /// Create an immutability error
    pub fn immutable(field: impl Into<String>) -> Self {
        Self::Immutable {
            field: field.into(),
        }
    }

    /// Create an allocation failure
    pub fn allocation_failed(
        pool: impl Into<String>,
        requested: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::AllocationFailed {
            pool: pool.into(),
            requested,
            reason: reason.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create an insufficient space error
    pub fn insufficient_space(requested: usize, available: usize) -> Self {
        Self::InsufficientSpace {
            requested,
            available,
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Whether this error came from an immutable value
    pub fn is_immutable(&self) -> bool {
        matches!(self, Self::Immutable { .. })
    }

    /// Whether this error came from an allocator
    pub fn is_allocation_failure(&self) -> bool {
        matches!(self, Self::AllocationFailed { .. })
    }
}

impl From<std::io::Error> for PvError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io(err, "stream operation failed")
    }
}
