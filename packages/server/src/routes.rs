//! Route handlers and the error-kind → status-code mapping.

use axum::{extract::Extension, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use synergia::{AggregatedProfile, AuthError};
use tracing::error;

use crate::app::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub pass: String,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub status: &'static str,
    pub data: AggregatedProfile,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Map classified login failures to transport status codes. Only
/// `InvalidCredentials` is the caller's fault; everything else is upstream
/// drift or transport trouble.
pub fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// POST /librus
///
/// Body: `{ "login": "...", "pass": "..." }`. Each request gets its own
/// fresh login; sessions are never shared between requests.
pub async fn librus_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ProfileResponse>, (StatusCode, Json<ErrorResponse>)> {
    if request.login.is_empty() || request.pass.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Missing login credentials (login, pass).".to_string(),
            }),
        ));
    }

    match state.client.login_and_fetch(&request.login, &request.pass).await {
        Ok(data) => Ok(Json(ProfileResponse {
            status: "success",
            data,
        })),
        Err(err) => {
            let status = auth_status(&err);
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                error!(error = %err, "login-and-fetch failed");
            }
            Err((
                status,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            ))
        }
    }
}

/// GET /health
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "time": chrono::Utc::now().to_rfc3339() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_credentials_map_to_unauthorized() {
        assert_eq!(
            auth_status(&AuthError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn drift_and_transport_failures_map_to_server_error() {
        let drifts = [
            AuthError::NoSessionCookies,
            AuthError::ProtocolChanged {
                reason: "too many hops".to_string(),
            },
            AuthError::Timeout,
            AuthError::Network("connection reset".to_string()),
            AuthError::Unknown("???".to_string()),
        ];
        for err in drifts {
            assert_eq!(auth_status(&err), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
