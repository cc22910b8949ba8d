use crate::{
    error::{AppError, AppResult},
    models::{UpdateProfileRequest, User},
    repository::Repository,
};
use uuid::Uuid;

/// ProfileEditor
///
/// Partial updates of a user's profile fields. Login name and password are not editable.
pub struct ProfileEditor<'a> {
    repo: &'a dyn Repository,
}

/// Overwrites `field` only with a non-empty value.
fn apply(field: &mut String, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        *field = value;
    }
}

impl<'a> ProfileEditor<'a> {
    pub fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    /// update_profile
    ///
    /// Each supplied non-empty field overwrites the stored one; absent or empty fields
    /// leave it unchanged, so this cannot clear a field. Fails with `NotFound` when
    /// `user_id` does not resolve.
    pub async fn update_profile(&self, user_id: Uuid, fields: UpdateProfileRequest) -> AppResult<User> {
        let mut user = self
            .repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        apply(&mut user.first_name, fields.first_name);
        apply(&mut user.last_name, fields.last_name);
        apply(&mut user.location, fields.location);
        apply(&mut user.description, fields.description);
        apply(&mut user.occupation, fields.occupation);

        self.repo.update_user(&user).await?;
        Ok(user)
    }
}
