//! Engine call boundary.
//!
//! This module defines the request and response payloads a presentation layer
//! exchanges with the recommender, and maps every engine failure to a
//! distinguishable, machine-readable error kind.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{CafeId, Recommendation};
use crate::query::{RecommendError, Recommender, UserPreferences};

/// Errors surfaced at the call boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body is not valid JSON for `RecommendRequest`
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The engine rejected or could not serve the request
    #[error(transparent)]
    Recommend(#[from] RecommendError),
}

impl ApiError {
    /// Stable identifier of the failure kind, for presentation layers to branch on.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "invalid_input",
            ApiError::Recommend(RecommendError::InvalidInput(_)) => "invalid_input",
            ApiError::Recommend(RecommendError::EmptyCandidateSet) => "empty_candidate_set",
            ApiError::Recommend(RecommendError::DataLoadError(_)) => "data_load_error",
            ApiError::Recommend(RecommendError::VocabularyMismatch(_)) => "vocabulary_mismatch",
        }
    }
}

/// Result type for call-boundary operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Request payload: the three inputs collected by the questionnaire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendRequest {
    /// The seven general answers, each 0 or 1
    pub general: BTreeMap<String, i64>,

    /// Exactly three atmosphere tags
    pub atmosphere: Vec<String>,

    /// Exactly three specials tags
    pub specials: Vec<String>,
}

impl RecommendRequest {
    /// Validate into `UserPreferences`.
    pub fn to_preferences(&self) -> ApiResult<UserPreferences> {
        Ok(UserPreferences::from_parts(
            &self.general,
            self.atmosphere.clone(),
            self.specials.clone(),
        )?)
    }
}

/// Response payload: the winning café's display attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub cafe_id: CafeId,

    /// Display name
    pub cafe_name: String,

    /// The specialty to try
    pub specials: String,

    /// Display asset, when one is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<PathBuf>,

    /// Remaining reference columns
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub extra: BTreeMap<String, String>,
}

impl From<Recommendation> for RecommendResponse {
    fn from(rec: Recommendation) -> Self {
        Self {
            cafe_id: rec.record.cafe_id,
            cafe_name: rec.record.cafe_name,
            specials: rec.record.specials,
            asset: rec.record.asset,
            extra: rec.record.extra,
        }
    }
}

/// Error body returned alongside a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: String,
    pub message: String,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Handle one recommendation request.
///
/// # Errors
/// Returns `ApiError` wrapping the engine's failure kind
pub fn handle_recommend<R: Recommender + ?Sized>(
    recommender: &R,
    request: &RecommendRequest,
) -> ApiResult<RecommendResponse> {
    let prefs = request.to_preferences()?;
    Ok(recommender.recommend(&prefs)?.into())
}

/// Handle a JSON request body and produce a JSON response body.
///
/// Failures are encoded as an `ErrorResponse` body; the boolean is `true` on success.
pub fn handle_json<R: Recommender + ?Sized>(recommender: &R, body: &str) -> (bool, String) {
    let outcome = serde_json::from_str::<RecommendRequest>(body)
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))
        .and_then(|request| handle_recommend(recommender, &request));

    let rendered = match &outcome {
        Ok(response) => serde_json::to_string(response),
        Err(err) => serde_json::to_string(&ErrorResponse::from(err)),
    };
    // Both payloads are plain string maps and always serialize.
    let rendered = rendered.unwrap_or_else(|e| format!("{{\"kind\":\"internal\",\"message\":\"{}\"}}", e));
    (outcome.is_ok(), rendered)
}
