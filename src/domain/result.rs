//! Result type alias for Hastats

use super::errors::HastatsError;

/// Result type alias for Hastats operations
///
/// # Examples
///
/// ```
/// use hastats::domain::result::Result;
/// use hastats::domain::errors::HastatsError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(HastatsError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, HastatsError>;
