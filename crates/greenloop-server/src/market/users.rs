use tracing::info;

use greenloop_core::db::DatabaseError;

use super::{Market, MarketError, Result};
use crate::storage::{Role, User};

impl Market {
    /// Load the caller's account. A token for a user that no longer exists
    /// counts as unauthenticated.
    pub async fn require_user(&self, user_id: &str) -> Result<User> {
        self.db.get_user(user_id).await.map_err(|e| match e {
            DatabaseError::NotFound(_) => MarketError::NotAuthenticated,
            other => other.into(),
        })
    }

    /// Load the caller's account and check its role.
    pub async fn require_role(&self, user_id: &str, role: Role) -> Result<User> {
        let user = self.require_user(user_id).await?;
        if user.role()? != role {
            return Err(MarketError::Forbidden(format!("{role} account required")));
        }
        Ok(user)
    }

    /// Store the URL of an image the client already uploaded.
    pub async fn set_profile_image(&self, user_id: &str, url: &str) -> Result<User> {
        let url = url.trim();
        let has_host = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .is_some_and(|rest| !rest.is_empty());
        if !has_host {
            return Err(MarketError::InvalidArgument(
                "Profile image must be an http(s) URL".into(),
            ));
        }

        self.require_user(user_id).await?;
        let user = self.db.set_profile_image_url(user_id, url).await?;
        info!(user_id, "Profile image updated");
        Ok(user)
    }
}
