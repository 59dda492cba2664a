//! Validation Traits
//!
//! Input checks shared by the route handlers. Every failure is a
//! 422-class `ApiError` naming the offending field.

use adboard_core::CreateAdInput;
use rust_decimal::Decimal;

use crate::error::{ApiError, ApiResult};

/// Trait for validating non-empty strings.
///
/// # Example
/// ```ignore
/// use adboard_api::validation::ValidateNonEmpty;
///
/// input.title.validate_non_empty("title")?;
/// ```
pub trait ValidateNonEmpty {
    /// Returns `ApiError::missing_field` if the value is empty or whitespace-only.
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()>;
}

impl ValidateNonEmpty for str {
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()> {
        if self.trim().is_empty() {
            return Err(ApiError::missing_field(field_name));
        }
        Ok(())
    }
}

impl ValidateNonEmpty for String {
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()> {
        self.as_str().validate_non_empty(field_name)
    }
}

/// Trait for validating that a number is zero or more.
pub trait ValidateNonNegative {
    fn validate_non_negative(&self, field_name: &str) -> ApiResult<()>;
}

impl ValidateNonNegative for Decimal {
    fn validate_non_negative(&self, field_name: &str) -> ApiResult<()> {
        if self.is_sign_negative() && !self.is_zero() {
            return Err(ApiError::below_minimum(field_name, 0));
        }
        Ok(())
    }
}

/// Trait for validating absolute URLs.
pub trait ValidateUrl {
    /// Fails unless the value parses as an absolute URL (scheme included).
    fn validate_absolute_url(&self, field_name: &str) -> ApiResult<()>;
}

impl ValidateUrl for str {
    fn validate_absolute_url(&self, field_name: &str) -> ApiResult<()> {
        url::Url::parse(self)
            .map(|_| ())
            .map_err(|_| ApiError::invalid_format(field_name, "an absolute URL"))
    }
}

/// Checks the whole create payload: title present, price non-negative,
/// every image URL absolute.
pub fn validate_create_input(input: &CreateAdInput) -> ApiResult<()> {
    input.title.validate_non_empty("title")?;
    input.price.validate_non_negative("price")?;
    for (index, url) in input.image_urls().iter().enumerate() {
        url.validate_absolute_url(&format!("image_urls[{}]", index))?;
    }
    Ok(())
}
