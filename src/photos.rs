use crate::{
    error::{AppError, AppResult},
    models::{Comment, CommentView, LikeStatus, Photo, PhotoView, UserSummary},
    repository::{Repository, RepositoryState},
};
use chrono::{DateTime, SubsecRound, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

// --- Aggregate Invariants ---

impl Photo {
    /// A fresh photo: no comments, no likes. Timestamps keep microsecond precision,
    /// the resolution Postgres stores.
    pub fn new(owner_id: Uuid, file_name: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            file_name,
            created_at: created_at.trunc_subsecs(6),
            comments: vec![],
            likes: BTreeSet::new(),
            next_comment_id: 1,
        }
    }

    /// Appends a comment with the next id. Existing comments keep their position.
    pub fn push_comment(&mut self, author_id: Uuid, text: String, at: DateTime<Utc>) -> Comment {
        let comment = Comment {
            id: self.next_comment_id,
            text,
            created_at: at.trunc_subsecs(6),
            author_id,
        };
        self.next_comment_id += 1;
        self.comments.push(comment.clone());
        comment
    }

    pub fn comment(&self, comment_id: i64) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    pub fn comment_mut(&mut self, comment_id: i64) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|c| c.id == comment_id)
    }

    /// Removes the comment by id. Sibling ids are untouched.
    pub fn remove_comment(&mut self, comment_id: i64) -> Option<Comment> {
        let index = self.comments.iter().position(|c| c.id == comment_id)?;
        Some(self.comments.remove(index))
    }

    /// Flips `user_id`'s membership in the likes set; returns the new membership.
    pub fn toggle_like(&mut self, user_id: Uuid) -> bool {
        if self.likes.remove(&user_id) {
            false
        } else {
            self.likes.insert(user_id);
            true
        }
    }

    pub fn likes_count(&self) -> i64 {
        self.likes.len() as i64
    }

    pub fn is_liked_by(&self, viewer: Option<Uuid>) -> bool {
        viewer.is_some_and(|id| self.likes.contains(&id))
    }
}

/// require_text
///
/// Comment text must contain something other than whitespace. The text is stored as given.
fn require_text(text: &str, message: &str) -> AppResult<()> {
    if text.trim().is_empty() {
        return Err(AppError::validation(message));
    }
    Ok(())
}

// --- Per-Aggregate Serialization ---

/// PhotoLocks
///
/// One async mutex per photo id. Every read-modify-write of an aggregate holds its
/// photo's guard, so concurrent mutations of the same photo run one after another
/// while different photos proceed in parallel. An entry lives only while some task
/// holds or waits for it.
#[derive(Default)]
struct PhotoLocks {
    inner: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl PhotoLocks {
    async fn acquire(&self, photo_id: Uuid) -> PhotoGuard<'_> {
        let lock = {
            let mut map = self.inner.lock();
            map.entry(photo_id).or_default().clone()
        };
        PhotoGuard {
            locks: self,
            photo_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.inner.lock().len()
    }
}

/// Exclusive access to one photo. Dropping it releases the mutex and removes the
/// map entry when nobody else references it.
struct PhotoGuard<'a> {
    locks: &'a PhotoLocks,
    photo_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PhotoGuard<'_> {
    fn drop(&mut self) {
        let mut map = self.locks.inner.lock();
        // One reference in the map, one inside our guard.
        if map
            .get(&self.photo_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 2)
        {
            map.remove(&self.photo_id);
        }
        self.guard.take();
    }
}

// --- Projections ---

/// author_directory
///
/// Loads the minimal projection of every user referenced by `ids`, keyed by id.
pub(crate) async fn author_directory(
    repo: &dyn Repository,
    mut ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, UserSummary>> {
    ids.sort_unstable();
    ids.dedup();
    let users = repo.get_users(&ids).await?;
    Ok(users.iter().map(|u| (u.id, UserSummary::from(u))).collect())
}

/// project_photo
///
/// Builds the read projection of `photo` for `viewer`. Pure; never touches the aggregate.
pub(crate) fn project_photo(
    photo: &Photo,
    authors: &HashMap<Uuid, UserSummary>,
    viewer: Option<Uuid>,
) -> PhotoView {
    PhotoView {
        id: photo.id,
        owner_id: photo.owner_id,
        owner: None,
        file_name: photo.file_name.clone(),
        created_at: photo.created_at,
        comments: photo
            .comments
            .iter()
            .map(|c| CommentView {
                id: c.id,
                text: c.text.clone(),
                created_at: c.created_at,
                author_id: c.author_id,
                author: authors.get(&c.author_id).cloned(),
            })
            .collect(),
        likes_count: photo.likes_count(),
        liked: photo.is_liked_by(viewer),
    }
}

/// PhotoAggregate
///
/// Single source of truth for photos and their embedded comments and likes.
/// Authorization is part of every mutating operation: the acting user id is an
/// argument, resolved beforehand by the session layer.
pub struct PhotoAggregate {
    repo: RepositoryState,
    locks: PhotoLocks,
}

/// PhotoState
///
/// The concrete type used to share the photo aggregate service across the application state.
pub type PhotoState = Arc<PhotoAggregate>;

impl PhotoAggregate {
    pub fn new(repo: RepositoryState) -> Self {
        Self {
            repo,
            locks: PhotoLocks::default(),
        }
    }

    async fn load(&self, photo_id: Uuid) -> AppResult<Photo> {
        self.repo
            .get_photo(photo_id)
            .await?
            .ok_or_else(|| AppError::not_found("Photo not found"))
    }

    /// create
    ///
    /// Registers a photo whose file is already stored under `file_name`.
    pub async fn create(&self, owner_id: Uuid, file_name: &str) -> AppResult<Photo> {
        if file_name.trim().is_empty() {
            return Err(AppError::validation("No file uploaded"));
        }
        let photo = Photo::new(owner_id, file_name.to_string(), Utc::now());
        let created = self.repo.insert_photo(photo).await?;
        tracing::info!(photo_id = %created.id, owner_id = %owner_id, "photo created");
        Ok(created)
    }

    /// list_for_user
    ///
    /// All photos owned by `user_id`, newest first, each joined with its comment
    /// authors. `liked` reflects `viewer_id` and is false for anonymous viewers.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        viewer_id: Option<Uuid>,
    ) -> AppResult<Vec<PhotoView>> {
        let photos = self.repo.photos_of_user(user_id).await?;
        let author_ids: Vec<Uuid> = photos
            .iter()
            .flat_map(|p| p.comments.iter().map(|c| c.author_id))
            .collect();
        let authors = author_directory(self.repo.as_ref(), author_ids).await?;
        Ok(photos
            .iter()
            .map(|p| project_photo(p, &authors, viewer_id))
            .collect())
    }

    /// add_comment
    ///
    /// Appends a comment by `author_id`. Fails with `Validation` on blank text and
    /// `NotFound` when the photo does not exist.
    pub async fn add_comment(
        &self,
        photo_id: Uuid,
        author_id: Uuid,
        text: &str,
    ) -> AppResult<Comment> {
        require_text(text, "Comment cannot be empty")?;

        let _guard = self.locks.acquire(photo_id).await;
        let mut photo = self.load(photo_id).await?;
        let comment = photo.push_comment(author_id, text.to_string(), Utc::now());
        self.repo.save_photo(&photo).await?;
        Ok(comment)
    }

    /// edit_comment
    ///
    /// Replaces the text of a comment. Only its author may do this (`Forbidden`
    /// otherwise); id, author and timestamp are unchanged.
    pub async fn edit_comment(
        &self,
        photo_id: Uuid,
        comment_id: i64,
        requester_id: Uuid,
        new_text: &str,
    ) -> AppResult<Comment> {
        require_text(new_text, "Comment text required")?;

        let _guard = self.locks.acquire(photo_id).await;
        let mut photo = self.load(photo_id).await?;
        let comment = photo
            .comment_mut(comment_id)
            .ok_or_else(|| AppError::not_found("Comment not found"))?;
        if comment.author_id != requester_id {
            tracing::warn!(%photo_id, comment_id, %requester_id, "edit of foreign comment refused");
            return Err(AppError::forbidden("Unauthorized"));
        }
        comment.text = new_text.to_string();
        let edited = comment.clone();

        self.repo.save_photo(&photo).await?;
        Ok(edited)
    }

    /// delete_comment
    ///
    /// Removes a comment. Same not-found and author-only rules as `edit_comment`.
    pub async fn delete_comment(
        &self,
        photo_id: Uuid,
        comment_id: i64,
        requester_id: Uuid,
    ) -> AppResult<()> {
        let _guard = self.locks.acquire(photo_id).await;
        let mut photo = self.load(photo_id).await?;
        let author_id = photo
            .comment(comment_id)
            .map(|c| c.author_id)
            .ok_or_else(|| AppError::not_found("Comment not found"))?;
        if author_id != requester_id {
            tracing::warn!(%photo_id, comment_id, %requester_id, "delete of foreign comment refused");
            return Err(AppError::forbidden(
                "You are not authorized to delete this comment",
            ));
        }
        photo.remove_comment(comment_id);
        self.repo.save_photo(&photo).await
    }

    /// toggle_like
    ///
    /// Adds `user_id` to the likes set if absent, removes it otherwise.
    pub async fn toggle_like(&self, photo_id: Uuid, user_id: Uuid) -> AppResult<LikeStatus> {
        let _guard = self.locks.acquire(photo_id).await;
        let mut photo = self.load(photo_id).await?;
        let liked = photo.toggle_like(user_id);
        self.repo.save_photo(&photo).await?;

        let status = LikeStatus {
            liked,
            likes_count: photo.likes_count(),
        };
        tracing::info!(%photo_id, %user_id, liked, likes_count = status.likes_count, "like toggled");
        Ok(status)
    }
}
