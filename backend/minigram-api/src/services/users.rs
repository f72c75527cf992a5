/// User Directory - identity resolution and profile management
use super::validate_image;
use crate::db::UserStore;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::middleware::Identity;
use crate::models::{
    ImageUpload, ProfileUpdate, User, UserProfileView, MAX_DISPLAY_NAME_CHARS,
};
use crate::storage::{avatar_key, MediaStore};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct UserDirectory {
    users: Arc<dyn UserStore>,
    media: Arc<dyn MediaStore>,
    external_id_prefix: String,
    max_image_bytes: usize,
}

impl UserDirectory {
    pub fn new(
        users: Arc<dyn UserStore>,
        media: Arc<dyn MediaStore>,
        external_id_prefix: impl Into<String>,
        max_image_bytes: usize,
    ) -> Self {
        Self {
            users,
            media,
            external_id_prefix: external_id_prefix.into(),
            max_image_bytes,
        }
    }

    pub async fn resolve_by_internal_id(&self, id: Uuid) -> Result<User> {
        self.users.find_by_id(id).await?.ok_or_else(user_not_found)
    }

    pub async fn resolve_by_external_id(&self, external_id: &str) -> Result<User> {
        self.users
            .find_by_external_id(external_id)
            .await?
            .ok_or_else(user_not_found)
    }

    /// Look a user up by either identifier form.
    ///
    /// Values carrying the external-id prefix try the external form first;
    /// everything else tries the internal id first. The other form is the
    /// fallback either way.
    pub async fn find_either(&self, id_or_external_id: &str) -> Result<Option<User>> {
        let value = id_or_external_id.trim();
        if value.is_empty() {
            return Ok(None);
        }
        let internal_id = Uuid::parse_str(value).ok();

        if value.starts_with(&self.external_id_prefix) {
            if let Some(user) = self.users.find_by_external_id(value).await? {
                return Ok(Some(user));
            }
            return match internal_id {
                Some(id) => self.users.find_by_id(id).await,
                None => Ok(None),
            };
        }

        if let Some(id) = internal_id {
            if let Some(user) = self.users.find_by_id(id).await? {
                return Ok(Some(user));
            }
        }
        self.users.find_by_external_id(value).await
    }

    pub async fn resolve_either(&self, id_or_external_id: &str) -> Result<User> {
        self.find_either(id_or_external_id)
            .await?
            .ok_or_else(user_not_found)
    }

    /// Directory entry of the authenticated caller
    pub async fn require_acting(&self, identity: &Identity) -> Result<User> {
        self.resolve_by_external_id(&identity.external_id).await
    }

    /// Directory entry of the caller, if there is one
    pub async fn find_acting(&self, identity: Option<&Identity>) -> Result<Option<User>> {
        match identity {
            Some(identity) => self.users.find_by_external_id(&identity.external_id).await,
            None => Ok(None),
        }
    }

    /// Profile with live counters
    pub async fn get_profile(&self, id_or_external_id: &str) -> Result<UserProfileView> {
        let user = self.resolve_either(id_or_external_id).await?;
        let stats = self.users.stats(user.id).await?;
        Ok(UserProfileView::assemble(user, stats))
    }

    /// Create the caller's directory entry on first sign-in.
    ///
    /// The display name comes from `name`, then the token's name claim, then
    /// the external id, and is cut to the display-name limit. Existing
    /// entries are returned unchanged.
    pub async fn sync_user(&self, identity: &Identity, name: Option<&str>) -> Result<User> {
        let display_name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or(identity.name.as_deref().map(str::trim).filter(|n| !n.is_empty()))
            .unwrap_or(identity.external_id.as_str());
        let display_name: String = display_name.chars().take(MAX_DISPLAY_NAME_CHARS).collect();

        let result = self
            .users
            .upsert_from_identity(&identity.external_id, &display_name)
            .await;
        metrics::record_action("sync_user", &result);

        let user = result?;
        tracing::info!(user_id = %user.id, external_id = %user.external_id, "user synced");
        Ok(user)
    }

    /// Change the display name of `target`, which must be the caller
    pub async fn update_profile(
        &self,
        identity: &Identity,
        target: &str,
        update: ProfileUpdate,
    ) -> Result<User> {
        let result = self.apply_profile_update(identity, target, update).await;
        metrics::record_action("update_profile", &result);
        result
    }

    async fn apply_profile_update(
        &self,
        identity: &Identity,
        target: &str,
        update: ProfileUpdate,
    ) -> Result<User> {
        update.validate()?;
        if update.name.is_none() && update.avatar_url.is_none() {
            return Err(AppError::ValidationError("Name is required".to_string()));
        }

        let user = self.owned_target(identity, target).await?;
        let updated = self
            .users
            .update_profile(user.id, &update)
            .await?
            .ok_or_else(user_not_found)?;

        tracing::info!(user_id = %updated.id, "profile updated");
        Ok(updated)
    }

    /// Replace the avatar of `target`, which must be the caller.
    ///
    /// The new image is uploaded before the profile row changes; if the row
    /// update fails the upload is removed again. The previous avatar is
    /// deleted afterwards on a best-effort basis.
    pub async fn upload_avatar(
        &self,
        identity: &Identity,
        target: &str,
        image: ImageUpload,
    ) -> Result<User> {
        let result = self.replace_avatar(identity, target, image).await;
        metrics::record_action("upload_avatar", &result);
        result
    }

    async fn replace_avatar(
        &self,
        identity: &Identity,
        target: &str,
        image: ImageUpload,
    ) -> Result<User> {
        let content_type = validate_image(&image, self.max_image_bytes)?;
        let user = self.owned_target(identity, target).await?;

        let key = avatar_key(
            user.id,
            &user.external_id,
            image.file_name.as_deref(),
            &content_type,
        );
        let size = image.bytes.len();
        let url = self.media.upload(&key, image.bytes, &content_type).await?;
        metrics::UPLOAD_BYTES.observe(size as f64);

        let updated = match self
            .users
            .update_profile(user.id, &ProfileUpdate::avatar(url))
            .await
        {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                self.discard_upload(&key).await;
                return Err(user_not_found());
            }
            Err(e) => {
                self.discard_upload(&key).await;
                return Err(e);
            }
        };

        if let Some(old_key) = user
            .avatar_url
            .as_deref()
            .and_then(|url| self.media.key_from_url(url))
        {
            if let Err(e) = self.media.delete(&old_key).await {
                tracing::warn!(user_id = %user.id, key = %old_key, error = %e, "failed to delete previous avatar");
            }
        }

        tracing::info!(user_id = %updated.id, key = %key, "avatar updated");
        Ok(updated)
    }

    /// Resolve `target` and require it to be the caller
    async fn owned_target(&self, identity: &Identity, target: &str) -> Result<User> {
        let user = self.resolve_either(target).await?;
        if user.external_id != identity.external_id {
            return Err(AppError::Forbidden(
                "You can only update your own profile".to_string(),
            ));
        }
        Ok(user)
    }

    async fn discard_upload(&self, key: &str) {
        if let Err(e) = self.media.delete(key).await {
            tracing::warn!(key = %key, error = %e, "failed to remove orphaned upload");
        }
    }
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}
