//! `AuthService` gRPC implementation.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{info, instrument, warn};

use greenloop_core::config::AuthConfig;
use greenloop_core::db::{DatabaseError, unix_timestamp};
use greenloop_proto::v1::auth_service_server::AuthService;
use greenloop_proto::v1::{
    LoginRequest, LoginResponse, PasswordResetRequest, PasswordResetResponse, RefreshTokenRequest,
    RefreshTokenResponse, RegisterRequest, RegisterResponse, ResetPasswordRequest,
    ResetPasswordResponse, RevokeTokenRequest, RevokeTokenResponse,
};

use super::grpc_util::{role_from_proto, role_to_proto};
use crate::auth::jwt::JwtManager;
use crate::auth::reset::{ResetMailer, generate_reset_token};
use crate::auth::password;
use crate::storage::{MarketDatabase, Role};

struct TokenPair {
    access_token: String,
    refresh_token: String,
    expires_in_secs: i64,
}

pub struct AuthServiceImpl {
    db: MarketDatabase,
    jwt: Arc<JwtManager>,
    mailer: Arc<dyn ResetMailer>,
    config: AuthConfig,
}

impl AuthServiceImpl {
    pub fn new(
        db: MarketDatabase,
        jwt: Arc<JwtManager>,
        mailer: Arc<dyn ResetMailer>,
        config: AuthConfig,
    ) -> Self {
        Self {
            db,
            jwt,
            mailer,
            config,
        }
    }

    #[allow(clippy::result_large_err)]
    fn check_password(&self, password: &str) -> Result<(), Status> {
        if password.chars().count() < self.config.min_password_len {
            return Err(Status::invalid_argument(format!(
                "Password must be at least {} characters",
                self.config.min_password_len
            )));
        }
        Ok(())
    }

    /// Issue an access/refresh pair and store the refresh token hash.
    async fn issue_tokens(&self, user_id: &str, role: Role) -> Result<TokenPair, Status> {
        let (access_token, expires_in_secs) = self
            .jwt
            .issue_access_token(user_id, role)
            .map_err(|e| Status::internal(format!("Token creation failed: {e}")))?;

        let (refresh_token, refresh_exp) = self
            .jwt
            .issue_refresh_token(user_id, role)
            .map_err(|e| Status::internal(format!("Token creation failed: {e}")))?;

        let token_id = uuid::Uuid::new_v4().to_string();
        self.db
            .create_token(
                &token_id,
                user_id,
                &JwtManager::hash_token(&refresh_token),
                refresh_exp,
            )
            .await
            .map_err(|e| Status::internal(format!("Token storage failed: {e}")))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in_secs,
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[tonic::async_trait]
impl AuthService for AuthServiceImpl {
    #[instrument(skip(self, request), fields(rpc = "Register"))]
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<RegisterResponse>, Status> {
        let req = request.into_inner();
        let email = normalize_email(&req.email);
        let display_name = req.display_name.trim();

        if !email.contains('@') {
            return Err(Status::invalid_argument("Email address is not valid"));
        }
        if display_name.is_empty() {
            return Err(Status::invalid_argument("Display name is required"));
        }
        self.check_password(&req.password)?;
        let role = role_from_proto(req.role)?;

        if self.db.get_user_by_email(&email).await.is_ok() {
            return Err(Status::already_exists("Email already registered"));
        }

        let hash = password::hash_password(&req.password)
            .map_err(|e| Status::internal(format!("Password hashing failed: {e}")))?;

        let user_id = uuid::Uuid::new_v4().to_string();
        self.db
            .create_user(&user_id, &email, display_name, role, &hash)
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict(_) => Status::already_exists("Email already registered"),
                other => Status::internal(format!("User creation failed: {other}")),
            })?;

        let tokens = self.issue_tokens(&user_id, role).await?;
        info!(user_id = %user_id, %role, "User registered");

        Ok(Response::new(RegisterResponse {
            user_id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in_secs: tokens.expires_in_secs,
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "Login"))]
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        let req = request.into_inner();
        let email = normalize_email(&req.email);

        let user = self
            .db
            .get_user_by_email(&email)
            .await
            .map_err(|_| Status::unauthenticated("Invalid credentials"))?;

        let valid = password::verify_password(&req.password, &user.password_hash)
            .map_err(|_| Status::internal("Password verification failed"))?;
        if !valid {
            warn!(user_id = %user.id, "Failed login attempt");
            return Err(Status::unauthenticated("Invalid credentials"));
        }

        let role = user
            .role()
            .map_err(|e| Status::internal(format!("Stored account is corrupt: {e}")))?;
        let tokens = self.issue_tokens(&user.id, role).await?;
        info!(user_id = %user.id, "User logged in");

        Ok(Response::new(LoginResponse {
            user_id: user.id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in_secs: tokens.expires_in_secs,
            role: role_to_proto(role).into(),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "RefreshToken"))]
    async fn refresh_token(
        &self,
        request: Request<RefreshTokenRequest>,
    ) -> Result<Response<RefreshTokenResponse>, Status> {
        let req = request.into_inner();

        let claims = self
            .jwt
            .validate(&req.refresh_token)
            .map_err(|_| Status::unauthenticated("Invalid refresh token"))?;
        if !claims.is_refresh() {
            return Err(Status::invalid_argument("Not a refresh token"));
        }

        let stored = self
            .db
            .get_token_by_hash(&JwtManager::hash_token(&req.refresh_token))
            .await
            .map_err(|e| Status::internal(format!("Token lookup failed: {e}")))?
            .ok_or_else(|| Status::unauthenticated("Refresh token revoked or expired"))?;

        // Rotation: a refresh token is good for one use. Losing the race to
        // a concurrent refresh counts as already used.
        let revoked = self
            .db
            .revoke_token(&stored.id)
            .await
            .map_err(|e| Status::internal(format!("Token revocation failed: {e}")))?;
        if !revoked {
            return Err(Status::unauthenticated("Refresh token revoked or expired"));
        }

        // Re-read the account so a deleted user cannot refresh.
        let user = self
            .db
            .get_user(&stored.user_id)
            .await
            .map_err(|_| Status::unauthenticated("Account no longer exists"))?;
        let role = user
            .role()
            .map_err(|e| Status::internal(format!("Stored account is corrupt: {e}")))?;

        let tokens = self.issue_tokens(&user.id, role).await?;

        Ok(Response::new(RefreshTokenResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in_secs: tokens.expires_in_secs,
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "RevokeToken"))]
    async fn revoke_token(
        &self,
        request: Request<RevokeTokenRequest>,
    ) -> Result<Response<RevokeTokenResponse>, Status> {
        let req = request.into_inner();

        let stored = self
            .db
            .get_token_by_hash(&JwtManager::hash_token(&req.refresh_token))
            .await
            .map_err(|e| Status::internal(format!("Token lookup failed: {e}")))?;

        let revoked = match stored {
            Some(token) => self
                .db
                .revoke_token(&token.id)
                .await
                .map_err(|e| Status::internal(format!("Revocation failed: {e}")))?,
            None => false,
        };

        Ok(Response::new(RevokeTokenResponse { revoked }))
    }

    #[instrument(skip(self, request), fields(rpc = "RequestPasswordReset"))]
    async fn request_password_reset(
        &self,
        request: Request<PasswordResetRequest>,
    ) -> Result<Response<PasswordResetResponse>, Status> {
        let email = normalize_email(&request.into_inner().email);

        // The answer is the same whether or not the account exists.
        match self.db.get_user_by_email(&email).await {
            Ok(user) => {
                let token = generate_reset_token();
                let expires_at = unix_timestamp() + self.config.reset_ttl_secs;
                self.db
                    .create_password_reset(&user.id, &JwtManager::hash_token(&token), expires_at)
                    .await
                    .map_err(|e| Status::internal(format!("Reset token storage failed: {e}")))?;
                self.mailer.send_reset(&user.email, &token);
                info!(user_id = %user.id, "Password reset issued");
            }
            Err(DatabaseError::NotFound(_)) => {}
            Err(e) => return Err(Status::internal(format!("User lookup failed: {e}"))),
        }

        Ok(Response::new(PasswordResetResponse { accepted: true }))
    }

    #[instrument(skip(self, request), fields(rpc = "ResetPassword"))]
    async fn reset_password(
        &self,
        request: Request<ResetPasswordRequest>,
    ) -> Result<Response<ResetPasswordResponse>, Status> {
        let req = request.into_inner();
        self.check_password(&req.new_password)?;

        let hash = password::hash_password(&req.new_password)
            .map_err(|e| Status::internal(format!("Password hashing failed: {e}")))?;

        let user_id = self
            .db
            .consume_password_reset(&JwtManager::hash_token(&req.reset_token), &hash)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => {
                    Status::invalid_argument("Reset token is invalid or expired")
                }
                other => Status::internal(format!("Password reset failed: {other}")),
            })?;

        info!(user_id = %user_id, "Password reset completed");
        Ok(Response::new(ResetPasswordResponse {}))
    }
}
