use crate::error::AppError;
use crate::server::AppContext;
use axum::{
    extract::{Query, Request, State},
    http::{HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use tracing::warn;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied,
}

pub trait Authorizer: Send + Sync {
    fn authorize(&self, headers: &HeaderMap, uri: &Uri) -> Access;
}

#[derive(Deserialize)]
struct AdminKeyQuery {
    admin_key: Option<String>,
}

/// Static shared secret, read from the `x-admin-key` header or the
/// `admin_key` query parameter.
pub struct SharedSecret {
    key: String,
}

impl SharedSecret {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    fn presented_key(headers: &HeaderMap, uri: &Uri) -> Option<String> {
        let from_header = headers
            .get(ADMIN_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(String::from);

        from_header.or_else(|| {
            Query::<AdminKeyQuery>::try_from_uri(uri)
                .ok()
                .and_then(|Query(q)| q.admin_key)
                .filter(|v| !v.is_empty())
        })
    }
}

impl Authorizer for SharedSecret {
    fn authorize(&self, headers: &HeaderMap, uri: &Uri) -> Access {
        match Self::presented_key(headers, uri) {
            Some(key) if key == self.key => Access::Allowed,
            _ => Access::Denied,
        }
    }
}

pub async fn require_admin(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match ctx.authorizer.authorize(request.headers(), request.uri()) {
        Access::Allowed => Ok(next.run(request).await),
        Access::Denied => {
            warn!("Rejected admin request to {}", request.uri().path());
            Err(AppError::Unauthorized)
        }
    }
}
