use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Records (Mapped to Storage) ---

/// User
///
/// The canonical identity + profile record stored in the `users` table.
/// This struct is never serialized to clients directly: it carries the credential.
/// Handlers answer with one of the projections below instead.
#[derive(Debug, Clone, FromRow, Default, PartialEq)]
pub struct User {
    pub id: Uuid,
    // Unique, case-sensitive. Immutable after registration.
    pub login_name: String,
    // Opaque credential, compared verbatim by the credential verifier.
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub location: String,
    pub description: String,
    pub occupation: String,
}

/// Photo
///
/// The aggregate root: a photo together with its ordered comments and its likes set.
/// All mutation goes through the methods in `photos.rs`, which keep the invariants
/// (comment ids unique within the photo, one like per user).
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub id: Uuid,
    // Owner, fixed at creation.
    pub owner_id: Uuid,
    // Reference to bytes held by the object store; the service never reads them.
    pub file_name: String,
    pub created_at: DateTime<Utc>,
    // Insertion order is display order.
    pub comments: Vec<Comment>,
    pub likes: BTreeSet<Uuid>,
    // Next id handed to a new comment. Ids are never reused, so deleting a comment
    // never shifts its siblings.
    pub next_comment_id: i64,
}

/// Comment
///
/// A comment embedded in its parent `Photo`. `id` is only unique within that photo.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub author_id: Uuid,
}

// --- Request Payloads (Input Schemas) ---

/// Reads an absent or `null` string field as empty, leaving the emptiness check to
/// the operation that owns the field.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// RegisterUserRequest
///
/// Input for `POST /user`. Missing or null string fields deserialize as empty so the
/// registration rules can report them as validation failures instead of a
/// JSON rejection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterUserRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub login_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub password: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub last_name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub occupation: Option<String>,
}

/// LoginRequest
///
/// Input for `POST /admin/login`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub login_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub password: String,
}

/// UpdateProfileRequest
///
/// Partial update for `PUT /user/{id}`. Only non-empty values overwrite the stored field.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
}

/// SearchRequest
///
/// Body of both search endpoints. Clients send `searchText`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SearchRequest {
    #[serde(rename = "searchText")]
    #[serde(default, deserialize_with = "null_as_empty")]
    pub search_text: String,
}

/// CreatePhotoRequest
///
/// Registers a photo whose bytes were already uploaded through the presigned URL flow.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePhotoRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub file_name: String,
}

/// CreateCommentRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub comment: String,
}

/// EditCommentRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct EditCommentRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub new_text: String,
}

/// PresignedUrlRequest
///
/// Input payload for requesting a short-lived upload URL (POST /photos/upload-url).
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// The original filename, kept (sanitized) as the suffix of the stored file name.
    #[schema(example = "sunset.jpg")]
    #[serde(default, deserialize_with = "null_as_empty")]
    pub filename: String,
    /// The MIME type the upload is pinned to.
    #[schema(example = "image/jpeg")]
    #[serde(default, deserialize_with = "null_as_empty")]
    pub file_type: String,
}

/// PresignedUrlResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// The name to send to `POST /photos/new` once the upload completed.
    pub file_name: String,
}

// --- Projections (Output Schemas) ---

/// RegisteredUser
///
/// Answer to register and login. The password is never echoed back.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct RegisteredUser {
    pub id: Uuid,
    pub login_name: String,
    pub first_name: String,
    pub last_name: String,
}

/// UserSummary
///
/// Minimal author/owner projection joined into photo and comment views.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

/// UserDetail
///
/// Public profile subset served by `GET /user/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct UserDetail {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub location: String,
    pub description: String,
    pub occupation: String,
}

/// UserProfile
///
/// Everything about a user except the credential. Returned by user search and
/// by profile edits.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub login_name: String,
    pub first_name: String,
    pub last_name: String,
    pub location: String,
    pub description: String,
    pub occupation: String,
}

/// UserWithCounts
///
/// Row of the user list. `comment_count` counts comments the user wrote on any photo.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct UserWithCounts {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub photo_count: i64,
    pub comment_count: i64,
}

/// CommentView
///
/// A comment joined with its author. `author` is `None` if the author record is gone.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct CommentView {
    pub id: i64,
    pub text: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub author_id: Uuid,
    pub author: Option<UserSummary>,
}

/// PhotoView
///
/// Read projection of a photo aggregate for one viewer.
/// `owner` is only filled in by comment search, where results span several owners.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct PhotoView {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub owner: Option<UserSummary>,
    pub file_name: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub comments: Vec<CommentView>,
    pub likes_count: i64,
    // True when the viewer is in the likes set; false for anonymous viewers.
    pub liked: bool,
}

/// LikeStatus
///
/// Result of a like toggle.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct LikeStatus {
    pub liked: bool,
    pub likes_count: i64,
}

/// MessageResponse
///
/// Plain acknowledgement body, e.g. `{"message": "Logout successful"}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// --- Projection Conversions ---

impl From<&User> for RegisteredUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            login_name: user.login_name.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

impl From<&User> for UserDetail {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            location: user.location.clone(),
            description: user.description.clone(),
            occupation: user.occupation.clone(),
        }
    }
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            login_name: user.login_name.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            location: user.location.clone(),
            description: user.description.clone(),
            occupation: user.occupation.clone(),
        }
    }
}
