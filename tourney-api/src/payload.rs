use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The body of every failed request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A plain confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum PayloadError {
    /// The body is not valid JSON or a field has the wrong type.
    #[error("invalid request body: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The `action` field is missing or names no known action.
    #[error("unknown action: {0:?}")]
    UnknownAction(Option<String>),
}

#[derive(Deserialize)]
struct ActionTag {
    #[serde(default)]
    action: Option<String>,
}

/// Splits an action-dispatched body into its `action` name and the full JSON value.
///
/// The value is returned unchanged so the caller can decode the action-specific payload from
/// it once the action is known.
pub fn split_action(body: &str) -> Result<(Option<String>, Value), PayloadError> {
    let value: Value = serde_json::from_str(body)?;
    let tag = ActionTag::deserialize(&value)?;

    Ok((tag.action, value))
}

/// Deserializes a field that distinguishes "absent" (`None`) from "explicitly null"
/// (`Some(None)`). Must be combined with `#[serde(default)]`.
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Returns the string if it is present and non-empty.
#[inline]
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
