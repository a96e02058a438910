use crate::api_response::error;
use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::{StatusCode, request::Parts};
use serde_json::Value;

/// Header carrying the verified organization scope. Authentication itself is
/// an upstream collaborator: by the time a request reaches this service, the
/// gateway has already verified the caller and stamped this header.
pub const ORGANIZATION_HEADER: &str = "x-organization-id";

/// Verified caller identity, required by every authenticated handler.
#[derive(Debug, Clone)]
pub struct OrgIdentity {
    pub organization_id: String,
}

impl<S> FromRequestParts<S> for OrgIdentity
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(ORGANIZATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| OrgIdentity {
                organization_id: v.to_string(),
            })
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    error("Missing verified caller identity".to_string()),
                )
            })
    }
}
