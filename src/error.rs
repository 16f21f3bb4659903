//! 도메인 오류 타입 정의

use crate::auth::AuthError;
use crate::directory::DirectoryError;
use crate::store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

/// 코디네이터 전역 오류. 프로세스를 죽이는 오류는 없다
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("location not set")]
    LocationNotSet,

    #[error("user already has a live match")]
    ActiveMatchExists,

    #[error("invalid decision value")]
    InvalidDecision,

    #[error("not a participant of this match")]
    NotParticipant,

    #[error("match not found: {0}")]
    MatchNotFound(String),

    #[error("no live session: {0}")]
    SessionNotFound(String),

    #[error("match already ended: {0}")]
    MatchClosed(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl MatchError {
    /// 실시간 채널로 내보내는 오류 코드
    pub fn code(&self) -> &'static str {
        match self {
            Self::LocationNotSet
            | Self::ActiveMatchExists
            | Self::InvalidDecision
            | Self::MatchClosed(_) => "PRECONDITION",
            Self::NotParticipant | Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::MatchNotFound(_) | Self::SessionNotFound(_) | Self::UserNotFound(_) => {
                "NOT_FOUND"
            }
            Self::Store(_) | Self::Directory(_) => "PERSISTENCE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::LocationNotSet
            | Self::ActiveMatchExists
            | Self::InvalidDecision
            | Self::MatchClosed(_) => StatusCode::BAD_REQUEST,
            Self::NotParticipant => StatusCode::FORBIDDEN,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::MatchNotFound(_) | Self::SessionNotFound(_) | Self::UserNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Store(_) | Self::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MatchError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (self.status(), Json(body)).into_response()
    }
}
