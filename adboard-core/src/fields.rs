//! Client-selectable optional fields.
//!
//! `get_ad` always returns identifier, title, price and primary image URL.
//! The two optional fields are opted into by name through the `fields`
//! query parameter; anything else rejects the whole request.

use crate::error::ValidationError;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// Subset of the optional fields `{description, image_urls}`.
    ///
    /// The empty set is valid and means "neither optional field".
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct RequestedFieldSet: u8 {
        const DESCRIPTION = 0b01;
        const IMAGE_URLS = 0b10;
    }
}

impl RequestedFieldSet {
    /// Every optional field; the shape written to the cache.
    pub fn maximal() -> Self {
        Self::all()
    }

    pub fn wants(&self, field: OptionalField) -> bool {
        self.contains(field.flag())
    }
}

/// A single optional field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionalField {
    Description,
    ImageUrls,
}

impl OptionalField {
    pub const ALL: [OptionalField; 2] = [OptionalField::Description, OptionalField::ImageUrls];

    /// Wire name, case-sensitive.
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionalField::Description => "description",
            OptionalField::ImageUrls => "image_urls",
        }
    }

    pub fn flag(&self) -> RequestedFieldSet {
        match self {
            OptionalField::Description => RequestedFieldSet::DESCRIPTION,
            OptionalField::ImageUrls => RequestedFieldSet::IMAGE_URLS,
        }
    }
}

impl fmt::Display for OptionalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionalField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "description" => Ok(OptionalField::Description),
            "image_urls" => Ok(OptionalField::ImageUrls),
            other => Err(ValidationError::UnknownField {
                field: other.to_string(),
            }),
        }
    }
}

/// Parses the raw `fields` values of a request.
///
/// Accepts both repeated parameters (`fields=a&fields=b`) and comma lists
/// (`fields=a,b`). Empty segments are skipped, so `fields=` selects nothing.
/// Names are matched exactly; there is no trimming or case folding.
pub struct FieldSelector;

impl FieldSelector {
    pub fn parse<I, S>(raw: I) -> Result<RequestedFieldSet, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = RequestedFieldSet::empty();
        for value in raw {
            for name in value.as_ref().split(',').filter(|name| !name.is_empty()) {
                set |= name.parse::<OptionalField>()?.flag();
            }
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_input_selects_nothing() {
        let set = FieldSelector::parse(Vec::<String>::new()).unwrap();
        assert!(set.is_empty());

        let set = FieldSelector::parse([""]).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_repeated_and_comma_forms_agree() {
        let repeated = FieldSelector::parse(["description", "image_urls"]).unwrap();
        let comma = FieldSelector::parse(["description,image_urls"]).unwrap();
        assert_eq!(repeated, comma);
        assert_eq!(repeated, RequestedFieldSet::maximal());
    }

    #[test]
    fn test_duplicates_collapse() {
        let set = FieldSelector::parse(["description", "description,description"]).unwrap();
        assert_eq!(set, RequestedFieldSet::DESCRIPTION);
    }

    #[test]
    fn test_unknown_field_names_offender() {
        let err = FieldSelector::parse(["description", "bogus"]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownField {
                field: "bogus".to_string()
            }
        );
    }

    #[test]
    fn test_names_are_case_sensitive() {
        assert!(FieldSelector::parse(["Description"]).is_err());
        assert!(FieldSelector::parse(["IMAGE_URLS"]).is_err());
        assert!(FieldSelector::parse([" description"]).is_err());
    }

    #[test]
    fn test_wants() {
        let set = RequestedFieldSet::IMAGE_URLS;
        assert!(set.wants(OptionalField::ImageUrls));
        assert!(!set.wants(OptionalField::Description));
    }

    proptest! {
        #[test]
        fn prop_any_known_subset_parses_to_its_flags(mask in 0u8..4) {
            let set = RequestedFieldSet::from_bits_truncate(mask);
            let names: Vec<&str> = OptionalField::ALL
                .iter()
                .filter(|field| set.wants(**field))
                .map(|field| field.as_str())
                .collect();
            prop_assert_eq!(FieldSelector::parse(names.iter()).unwrap(), set);
            prop_assert_eq!(FieldSelector::parse([names.join(",")]).unwrap(), set);
        }

        #[test]
        fn prop_unrecognized_names_always_fail(name in "[a-z_]{1,12}") {
            prop_assume!(name != "description" && name != "image_urls");
            prop_assert!(FieldSelector::parse([name.as_str()]).is_err());
        }
    }
}
