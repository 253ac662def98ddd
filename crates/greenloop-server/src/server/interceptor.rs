//! Bearer token check for the authenticated services.
//!
//! The interceptor validates the access token and stores its claims in the
//! request extensions; handlers read the caller's id back with
//! [`caller_id`].

use std::sync::Arc;

use tonic::metadata::MetadataMap;
use tonic::{Request, Status};
use tracing::debug;

use crate::auth::claims::Claims;
use crate::auth::jwt::JwtManager;

fn bearer_token(metadata: &MetadataMap) -> Option<&str> {
    metadata
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Reject requests without a valid access token.
pub fn jwt_interceptor(
    jwt: Arc<JwtManager>,
) -> impl Fn(Request<()>) -> Result<Request<()>, Status> + Clone {
    move |mut req: Request<()>| {
        let token = bearer_token(req.metadata())
            .ok_or_else(|| Status::unauthenticated("Missing authorization header"))?;

        let claims = jwt.validate(token).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            Status::unauthenticated("Invalid token")
        })?;

        if !claims.is_access() {
            return Err(Status::unauthenticated("Not an access token"));
        }

        req.extensions_mut().insert(claims);
        Ok(req)
    }
}

/// Claims of a request that has passed through the interceptor.
#[allow(clippy::result_large_err)]
pub fn extract_claims<T>(req: &Request<T>) -> Result<&Claims, Status> {
    req.extensions()
        .get::<Claims>()
        .ok_or_else(|| Status::internal("Claims not found in request extensions"))
}

/// The authenticated user id (`sub`) of a request.
#[allow(clippy::result_large_err)]
pub fn caller_id<T>(req: &Request<T>) -> Result<String, Status> {
    extract_claims(req).map(|c| c.sub.clone())
}
