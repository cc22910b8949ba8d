use crate::{
    error::{AppError, AppResult},
    models::{PhotoView, UserProfile, UserWithCounts},
    photos::{author_directory, project_photo},
    repository::Repository,
};
use uuid::Uuid;

/// DirectorySearch
///
/// Read-only lookups across users and comment text. Matching is a case-insensitive
/// substring test; an empty result is a normal outcome, an empty query is not.
pub struct DirectorySearch<'a> {
    repo: &'a dyn Repository,
}

impl<'a> DirectorySearch<'a> {
    pub fn new(repo: &'a dyn Repository) -> Self {
        Self { repo }
    }

    /// search_users
    ///
    /// Users whose first or last name contains `text`.
    pub async fn search_users(&self, text: &str) -> AppResult<Vec<UserProfile>> {
        if text.is_empty() {
            return Err(AppError::validation("Search text required"));
        }
        let users = self.repo.search_users(text).await?;
        Ok(users.iter().map(UserProfile::from).collect())
    }

    /// search_comments
    ///
    /// Whole photos having at least one comment containing `text`, joined with their
    /// owner and with every comment's author. `viewer_id` drives the `liked` flag.
    pub async fn search_comments(
        &self,
        text: &str,
        viewer_id: Option<Uuid>,
    ) -> AppResult<Vec<PhotoView>> {
        if text.is_empty() {
            return Err(AppError::validation("Search text required"));
        }
        let photos = self.repo.photos_with_comment_text(text).await?;
        let people_ids: Vec<Uuid> = photos
            .iter()
            .flat_map(|p| {
                std::iter::once(p.owner_id).chain(p.comments.iter().map(|c| c.author_id))
            })
            .collect();
        let people = author_directory(self.repo, people_ids).await?;

        Ok(photos
            .iter()
            .map(|p| {
                let mut view = project_photo(p, &people, viewer_id);
                view.owner = people.get(&p.owner_id).cloned();
                view
            })
            .collect())
    }

    /// list_users_with_counts
    ///
    /// Every user with the number of photos they own and comments they wrote.
    pub async fn list_users_with_counts(&self) -> AppResult<Vec<UserWithCounts>> {
        self.repo.list_users_with_counts().await
    }
}
