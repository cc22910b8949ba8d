use crate::error::{AppError, AppResult};
use crate::models::{Photo, User, UserWithCounts};
use crate::repository::Repository;
use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

/// InMemoryRepository
///
/// A process-local implementation of `Repository` with the same observable semantics
/// as `PostgresRepository`. Used when no `DATABASE_URL` is configured locally and by
/// the test suite. Vectors keep insertion order, which doubles as the tie-break order.
#[derive(Default)]
pub struct InMemoryRepository {
    users: RwLock<Vec<User>>,
    photos: RwLock<Vec<Photo>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// newest_first
///
/// Stable sort, so photos with the same timestamp stay in insertion order.
fn newest_first(mut photos: Vec<Photo>) -> Vec<Photo> {
    photos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    photos
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert_user(&self, user: User) -> AppResult<User> {
        let mut users = self.users.write();
        if users.iter().any(|u| u.login_name == user.login_name) {
            return Err(AppError::conflict(format!(
                "User with login_name \"{}\" already exists.",
                user.login_name
            )));
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.read().iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_login(&self, login_name: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .read()
            .iter()
            .find(|u| u.login_name == login_name)
            .cloned())
    }

    async fn get_users(&self, ids: &[Uuid]) -> AppResult<Vec<User>> {
        Ok(self
            .users
            .read()
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn update_user(&self, user: &User) -> AppResult<()> {
        let mut users = self.users.write();
        let stored = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| AppError::not_found("User not found"))?;
        stored.first_name = user.first_name.clone();
        stored.last_name = user.last_name.clone();
        stored.location = user.location.clone();
        stored.description = user.description.clone();
        stored.occupation = user.occupation.clone();
        Ok(())
    }

    async fn search_users(&self, text: &str) -> AppResult<Vec<User>> {
        let needle = text.to_lowercase();
        Ok(self
            .users
            .read()
            .iter()
            .filter(|u| {
                contains_ignore_case(&u.first_name, &needle)
                    || contains_ignore_case(&u.last_name, &needle)
            })
            .cloned()
            .collect())
    }

    async fn list_users_with_counts(&self) -> AppResult<Vec<UserWithCounts>> {
        let users = self.users.read();
        let photos = self.photos.read();
        Ok(users
            .iter()
            .map(|user| {
                let photo_count = photos.iter().filter(|p| p.owner_id == user.id).count();
                let comment_count = photos
                    .iter()
                    .flat_map(|p| p.comments.iter())
                    .filter(|c| c.author_id == user.id)
                    .count();
                UserWithCounts {
                    id: user.id,
                    first_name: user.first_name.clone(),
                    last_name: user.last_name.clone(),
                    photo_count: photo_count as i64,
                    comment_count: comment_count as i64,
                }
            })
            .collect())
    }

    async fn insert_photo(&self, photo: Photo) -> AppResult<Photo> {
        self.photos.write().push(photo.clone());
        Ok(photo)
    }

    async fn get_photo(&self, id: Uuid) -> AppResult<Option<Photo>> {
        Ok(self.photos.read().iter().find(|p| p.id == id).cloned())
    }

    async fn save_photo(&self, photo: &Photo) -> AppResult<()> {
        let mut photos = self.photos.write();
        let stored = photos
            .iter_mut()
            .find(|p| p.id == photo.id)
            .ok_or_else(|| AppError::not_found("Photo not found"))?;
        stored.comments = photo.comments.clone();
        stored.likes = photo.likes.clone();
        stored.next_comment_id = photo.next_comment_id;
        Ok(())
    }

    async fn photos_of_user(&self, owner_id: Uuid) -> AppResult<Vec<Photo>> {
        let owned = self
            .photos
            .read()
            .iter()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        Ok(newest_first(owned))
    }

    async fn photos_with_comment_text(&self, text: &str) -> AppResult<Vec<Photo>> {
        let needle = text.to_lowercase();
        let matching = self
            .photos
            .read()
            .iter()
            .filter(|p| {
                p.comments
                    .iter()
                    .any(|c| contains_ignore_case(&c.text, &needle))
            })
            .cloned()
            .collect();
        Ok(newest_first(matching))
    }
}
