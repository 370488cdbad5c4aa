//! Result type definition.

use crate::error::Error;

/// The standard Result type for Reel core operations.
///
/// Use the `?` operator, `match`, or combinator methods to handle results.
pub type Result<T> = std::result::Result<T, Error>;
