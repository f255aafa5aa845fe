//! Result objects for fallible engine operations.
//!
//! Construction and deserialization never panic on bad input; they hand
//! back an [`EngineResult`] that the caller inspects.

use crate::engine::refcount::Ref;
use crate::engine::scene::PhysicsScene;
use crate::engine::shape::Shape;
use crate::error::Error;

/// Outcome of a fallible engine operation: empty, a value, or an error
/// message.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineResult<T> {
    /// Neither value nor error.
    Empty,
    /// The operation succeeded.
    Valid(T),
    /// The operation failed with a message.
    Error(String),
}

impl<T> Default for EngineResult<T> {
    fn default() -> Self {
        EngineResult::Empty
    }
}

impl<T> EngineResult<T> {
    /// A successful result.
    pub fn valid(value: T) -> Self {
        EngineResult::Valid(value)
    }

    /// A failed result.
    pub fn error(message: impl Into<String>) -> Self {
        EngineResult::Error(message.into())
    }

    /// Whether the result holds neither value nor error.
    pub fn is_empty(&self) -> bool {
        matches!(self, EngineResult::Empty)
    }

    /// Whether the result holds a value.
    pub fn is_valid(&self) -> bool {
        matches!(self, EngineResult::Valid(_))
    }

    /// Whether the result holds an error.
    pub fn has_error(&self) -> bool {
        matches!(self, EngineResult::Error(_))
    }

    /// The value.
    ///
    /// # Panics
    ///
    /// Panics unless the result is valid.
    pub fn get(&self) -> &T {
        match self {
            EngineResult::Valid(value) => value,
            EngineResult::Error(message) => panic!("result holds an error: {}", message),
            EngineResult::Empty => panic!("result is empty"),
        }
    }

    /// The error message, or an empty string when there is no error.
    pub fn error_message(&self) -> &str {
        match self {
            EngineResult::Error(message) => message,
            _ => "",
        }
    }

    /// Replace the contents with a value.
    pub fn set(&mut self, value: T) {
        *self = EngineResult::Valid(value);
    }

    /// Replace the contents with an error.
    pub fn set_error(&mut self, message: impl Into<String>) {
        *self = EngineResult::Error(message.into());
    }

    /// Reset to empty.
    pub fn clear(&mut self) {
        *self = EngineResult::Empty;
    }

    /// Convert to a [`crate::Result`], mapping errors through `wrap`.
    pub fn into_result(self, wrap: impl FnOnce(String) -> Error) -> crate::Result<T> {
        match self {
            EngineResult::Valid(value) => Ok(value),
            EngineResult::Error(message) => Err(wrap(message)),
            EngineResult::Empty => Err(wrap("empty result".to_string())),
        }
    }
}

/// Result of turning shape settings (or a stream) into a shape.
pub type ShapeResult = EngineResult<Ref<Shape>>;

/// Result of restoring a physics scene.
pub type PhysicsSceneResult = EngineResult<Ref<PhysicsScene>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states() {
        let mut result: EngineResult<u32> = EngineResult::default();
        assert!(result.is_empty());
        assert!(!result.is_valid() && !result.has_error());

        result.set(7);
        assert!(result.is_valid());
        assert_eq!(*result.get(), 7);
        assert_eq!(result.error_message(), "");

        result.set_error("Invalid radius");
        assert!(result.has_error());
        assert!(!result.is_valid());
        assert_eq!(result.error_message(), "Invalid radius");

        result.clear();
        assert!(result.is_empty());
    }

    #[test]
    #[should_panic(expected = "result holds an error")]
    fn test_get_on_error_panics() {
        let result: EngineResult<u32> = EngineResult::error("boom");
        result.get();
    }

    #[test]
    fn test_into_result() {
        let ok: EngineResult<u8> = EngineResult::valid(3);
        assert_eq!(ok.into_result(Error::ShapeCreation).unwrap(), 3);

        let failed: EngineResult<u8> = EngineResult::error("Too few points");
        let err = failed.into_result(Error::ShapeCreation).unwrap_err();
        assert!(matches!(err, Error::ShapeCreation(ref m) if m == "Too few points"));
    }
}
