use super::state::ServerState;
use axum::{
    extract::{FromRequestParts, Query},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Proof that the request carried the admin secret.
#[derive(Debug)]
pub struct AdminAccess;

#[derive(Debug)]
pub enum AdminAccessError {
    /// No secret is configured, so nothing can be authorized.
    NotConfigured,
    Missing,
    Invalid,
}

impl IntoResponse for AdminAccessError {
    fn into_response(self) -> Response {
        let message = match self {
            AdminAccessError::NotConfigured => "Admin access is not configured",
            AdminAccessError::Missing | AdminAccessError::Invalid => "Unauthorized",
        };
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": message })),
        )
            .into_response()
    }
}

#[derive(Deserialize)]
struct KeyQuery {
    key: Option<String>,
}

fn provided_key(parts: &Parts) -> Option<String> {
    if let Some(value) = parts.headers.get(ADMIN_KEY_HEADER) {
        return value.to_str().ok().map(str::to_string);
    }
    Query::<KeyQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(q)| q.key)
}

impl FromRequestParts<ServerState> for AdminAccess {
    type Rejection = AdminAccessError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = ctx.config.admin_api_key.as_deref() else {
            warn!("Admin request to {} refused: no admin key configured", parts.uri.path());
            return Err(AdminAccessError::NotConfigured);
        };
        match provided_key(parts) {
            None => {
                warn!("Admin request to {} without key", parts.uri.path());
                Err(AdminAccessError::Missing)
            }
            Some(key) if key == expected => Ok(AdminAccess),
            Some(_) => {
                warn!("Admin request to {} with wrong key", parts.uri.path());
                Err(AdminAccessError::Invalid)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(uri: &str, header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = header {
            builder = builder.header(ADMIN_KEY_HEADER, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn reads_key_from_header_first() {
        let parts = parts("/api/admin/status?key=query", Some("header"));
        assert_eq!(provided_key(&parts).as_deref(), Some("header"));
    }

    #[test]
    fn reads_key_from_query() {
        let parts = parts("/api/admin/logs?source=doroob&key=s%203cret", None);
        assert_eq!(provided_key(&parts).as_deref(), Some("s 3cret"));
    }

    #[test]
    fn no_key_provided() {
        let parts = parts("/api/admin/status", None);
        assert!(provided_key(&parts).is_none());
    }
}
