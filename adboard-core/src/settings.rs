//! Parsing of raw configuration values.
//!
//! Loaders read variables through a lookup function so they can be driven
//! from a map in tests. An unset or blank value falls back to the loader's
//! default; a value that is present but malformed is a `ConfigError`.

use std::fmt::Display;
use std::str::FromStr;

use crate::ConfigError;

/// Parse the value of `field`, treating an unset or blank value as absent.
pub fn parse_setting<T>(field: &str, raw: Option<&str>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e: T::Err| invalid_setting(field, value, e.to_string())),
    }
}

/// Parse a count that must be at least one.
pub fn parse_positive(field: &str, raw: Option<&str>) -> Result<Option<u64>, ConfigError> {
    match parse_setting::<u64>(field, raw)? {
        Some(0) => Err(invalid_setting(field, "0", "must be at least 1")),
        other => Ok(other),
    }
}

/// Build `ConfigError::InvalidValue` for `field`.
pub fn invalid_setting(field: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_and_blank_are_absent() {
        assert_eq!(parse_setting::<u16>("PORT", None), Ok(None));
        assert_eq!(parse_setting::<u16>("PORT", Some("  ")), Ok(None));
    }

    #[test]
    fn test_value_is_trimmed_then_parsed() {
        assert_eq!(parse_setting::<u16>("PORT", Some(" 5432 ")), Ok(Some(5432)));
    }

    #[test]
    fn test_malformed_value_names_the_field() {
        let err = parse_setting::<usize>("ADBOARD_PAGE_SIZE", Some("abc")).unwrap_err();
        match err {
            ConfigError::InvalidValue { field, value, .. } => {
                assert_eq!(field, "ADBOARD_PAGE_SIZE");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_zero_is_not_positive() {
        assert!(parse_positive("ADBOARD_CACHE_TTL_SECS", Some("0")).is_err());
        assert_eq!(parse_positive("ADBOARD_CACHE_TTL_SECS", Some("7")), Ok(Some(7)));
        assert_eq!(parse_positive("ADBOARD_CACHE_TTL_SECS", None), Ok(None));
    }
}
