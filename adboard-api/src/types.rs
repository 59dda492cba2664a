//! API Request and Response Types
//!
//! Response envelopes for the ad endpoints and the query parameter types
//! parsed from raw query strings. Query values are parsed by hand so that a
//! malformed parameter answers 422 in the endpoint's envelope instead of the
//! extractor's default rejection.

use adboard_core::{AdId, FieldSelector, ItemPayload, ListItemPayload, ListQuery, RequestedFieldSet, SortKey};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

// ============================================================================
// RESPONSE ENVELOPES
// ============================================================================

/// Outcome marker carried by every ad endpoint response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Which null field an error response carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorEnvelope {
    /// `{"status":"error","result":null}`
    Result,
    /// `{"status":"error","id":null}`
    Id,
}

/// Response of `get_ad`. `result` is null when no ad has the requested id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GetAdResponse {
    pub status: ResponseStatus,
    pub result: Option<ItemPayload>,
}

impl GetAdResponse {
    pub fn success(result: Option<ItemPayload>) -> Self {
        Self {
            status: ResponseStatus::Success,
            result,
        }
    }
}

/// Response of `list_ads`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ListAdsResponse {
    pub status: ResponseStatus,
    pub result: Vec<ListItemPayload>,
}

impl ListAdsResponse {
    pub fn success(result: Vec<ListItemPayload>) -> Self {
        Self {
            status: ResponseStatus::Success,
            result,
        }
    }
}

/// Response of `create_ad`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateAdResponse {
    pub status: ResponseStatus,
    pub id: AdId,
}

impl CreateAdResponse {
    pub fn success(id: AdId) -> Self {
        Self {
            status: ResponseStatus::Success,
            id,
        }
    }
}

/// Error body of `get_ad` and `list_ads`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorResultResponse {
    pub status: ResponseStatus,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub result: Option<serde_json::Value>,
}

impl ErrorResultResponse {
    pub fn new() -> Self {
        Self {
            status: ResponseStatus::Error,
            result: None,
        }
    }
}

impl Default for ErrorResultResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Error body of `create_ad`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorIdResponse {
    pub status: ResponseStatus,
    pub id: Option<AdId>,
}

impl ErrorIdResponse {
    pub fn new() -> Self {
        Self {
            status: ResponseStatus::Error,
            id: None,
        }
    }
}

impl Default for ErrorIdResponse {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// QUERY PARAMETERS
// ============================================================================

fn query_pairs(raw: Option<&str>) -> Vec<(String, String)> {
    url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes())
        .into_owned()
        .collect()
}

/// First value of `name`, if present.
fn first_value<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Boolean spellings accepted for flag parameters.
fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Parameters of `get_ad`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetAdParams {
    pub id: AdId,
    pub fields: RequestedFieldSet,
}

impl GetAdParams {
    /// Parse `id` (required) and every `fields` value from a raw query string.
    pub fn from_query(raw: Option<&str>) -> ApiResult<Self> {
        let pairs = query_pairs(raw);

        let id = first_value(&pairs, "id").ok_or_else(|| ApiError::missing_field("id"))?;
        let id = id
            .parse::<AdId>()
            .map_err(|_| ApiError::invalid_format("id", "an integer"))?;

        let fields = FieldSelector::parse(
            pairs
                .iter()
                .filter(|(key, _)| key == "fields")
                .map(|(_, value)| value.as_str()),
        )?;

        Ok(Self { id, fields })
    }
}

/// Parameters of `list_ads`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListAdsParams {
    pub offset: usize,
    pub sort: SortKey,
    pub ascending: bool,
}

impl Default for ListAdsParams {
    fn default() -> Self {
        Self {
            offset: 0,
            sort: SortKey::CreatedAt,
            ascending: true,
        }
    }
}

impl ListAdsParams {
    /// Parse `offset`, `by` and `asc` from a raw query string. Absent
    /// parameters take their defaults.
    pub fn from_query(raw: Option<&str>) -> ApiResult<Self> {
        let pairs = query_pairs(raw);
        let mut params = Self::default();

        if let Some(offset) = first_value(&pairs, "offset") {
            let offset = offset
                .parse::<i64>()
                .map_err(|_| ApiError::invalid_format("offset", "an integer"))?;
            params.offset =
                usize::try_from(offset).map_err(|_| ApiError::below_minimum("offset", 0))?;
        }

        if let Some(by) = first_value(&pairs, "by") {
            params.sort = by.parse()?;
        }

        if let Some(asc) = first_value(&pairs, "asc") {
            params.ascending =
                parse_flag(asc).ok_or_else(|| ApiError::invalid_format("asc", "a boolean"))?;
        }

        Ok(params)
    }

    /// Store query for one page of `page_size` rows.
    pub fn to_query(&self, page_size: usize) -> ListQuery {
        ListQuery::new(self.offset, page_size).sorted_by(self.sort, self.ascending)
    }
}
