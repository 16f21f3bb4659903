//! 매치 탐색 HTTP 핸들러
//!
//! 결정/스킵은 여기 없다. 모든 세션 전이는 코디네이터의 전이 표
//! 하나를 거친다.

use crate::auth::{self, AuthError};
use crate::directory::PublicProfile;
use crate::error::MatchError;
use crate::matching::{self, FindMatchOutcome};
use crate::state::AppState;
use crate::store::MatchRecord;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::Json;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct MatchedCandidate {
    pub match_id: String,
    pub user: PublicProfile,
}

#[derive(Debug, Serialize)]
pub struct FindMatchResponse {
    #[serde(rename = "match")]
    pub matched: Option<MatchedCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActiveMatchResponse {
    #[serde(rename = "match")]
    pub record: Option<MatchRecord>,
}

/// Authorization: Bearer 토큰 → 사용자 id
fn bearer_identity(state: &AppState, headers: &HeaderMap) -> Result<String, MatchError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(MatchError::Unauthorized(AuthError::Malformed))?;
    let token = header.strip_prefix("Bearer ").unwrap_or(header);
    Ok(auth::resolve_identity(token, &state.config.auth.secret)?)
}

/// POST /api/match/find
pub async fn find_match(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<FindMatchResponse>, MatchError> {
    let user_id = bearer_identity(&state, &headers)?;

    match matching::find_match(&state, &user_id).await? {
        FindMatchOutcome::Found { record, candidate } => Ok(Json(FindMatchResponse {
            matched: Some(MatchedCandidate {
                match_id: record.id,
                user: PublicProfile::from(&candidate),
            }),
            message: None,
        })),
        FindMatchOutcome::NoCandidate => Ok(Json(FindMatchResponse {
            matched: None,
            message: Some("No matches available".to_string()),
        })),
    }
}

/// GET /api/match/active
pub async fn active_match(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ActiveMatchResponse>, MatchError> {
    let user_id = bearer_identity(&state, &headers)?;
    let record = state.store.live_match_for(&user_id).await?;
    Ok(Json(ActiveMatchResponse { record }))
}
