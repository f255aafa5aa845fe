//! Error types for the rphys crate.

use thiserror::Error;

/// Result type alias for rphys operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for rphys operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Function argument is invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The host object does not expose the expected callback method.
    #[error("method {name}{signature} not found on host object")]
    MethodNotFound {
        /// Method name.
        name: String,
        /// Method signature in host notation.
        signature: String,
    },

    /// The calling thread could not be attached to the host runtime.
    #[error("failed to attach thread to host runtime")]
    AttachFailed,

    /// A host callback raised an exception, which is still pending.
    #[error("host callback raised an exception")]
    HostException,

    /// Binary or text state could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Shape settings could not be turned into a shape.
    #[error("shape creation failed: {0}")]
    ShapeCreation(String),

    /// A physics scene could not be restored.
    #[error("scene restore failed: {0}")]
    SceneRestore(String),

    /// A body lock found no body under the requested id.
    #[error("body lock failed")]
    LockFailed,
}

impl Error {
    /// Check if this is a pending host exception.
    pub fn is_host_exception(&self) -> bool {
        matches!(self, Error::HostException)
    }

    /// Check if this is a method resolution error.
    pub fn is_method_not_found(&self) -> bool {
        matches!(self, Error::MethodNotFound { .. })
    }

    /// Check if this is a serialization error.
    pub fn is_serialization(&self) -> bool {
        matches!(self, Error::Serialization(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(Error::LockFailed.to_string(), "body lock failed");
        let missing = Error::MethodNotFound {
            name: "addHit".into(),
            signature: "(I)V".into(),
        };
        assert_eq!(missing.to_string(), "method addHit(I)V not found on host object");
        assert!(missing.is_method_not_found());
        assert!(!Error::AttachFailed.is_host_exception());
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
