use crate::{
    AppState,
    auth::{AuthUser, MaybeAuthUser},
    directory::DirectorySearch,
    error::AppError,
    extract::{ApiPath, CommentPath},
    identity::IdentityStore,
    models::{
        Comment, CreateCommentRequest, CreatePhotoRequest, EditCommentRequest, LikeStatus,
        LoginRequest, MessageResponse, PhotoView, PresignedUrlRequest, PresignedUrlResponse,
        RegisterUserRequest, RegisteredUser, SearchRequest, UpdateProfileRequest, UserDetail,
        UserProfile, UserWithCounts,
    },
    photos::project_photo,
    profile::ProfileEditor,
    session::{clearing_cookie, session_cookie, token_from_headers},
    storage::{photo_file_name, photo_object_key},
};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
};
use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

// --- Identity & Session ---

/// register_user
///
/// [Public Route] Creates a user account. Answers with the id and names only.
#[utoipa::path(
    post,
    path = "/user",
    request_body = RegisterUserRequest,
    responses(
        (status = 200, description = "Registered", body = RegisteredUser),
        (status = 400, description = "Missing fields or login name taken")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<Json<RegisteredUser>, AppError> {
    let user = IdentityStore::new(state.repo.as_ref())
        .register(payload)
        .await?;
    Ok(Json(RegisteredUser::from(&user)))
}

/// login
///
/// [Public Route] Checks the credentials and sets the session cookie.
/// Bad credentials answer 400.
#[utoipa::path(
    post,
    path = "/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = RegisteredUser),
        (status = 400, description = "Invalid login name or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let identity = IdentityStore::new(state.repo.as_ref());
    let (token, user) = state
        .sessions
        .login(&identity, &payload.login_name, &payload.password)
        .await
        .map_err(AppError::auth_as_bad_request)?;

    let cookie = session_cookie(&token, &state.config.env)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(RegisteredUser::from(&user)),
    ))
}

/// logout
///
/// [Public Route] Ends the caller's session. Without an active session it answers 400.
#[utoipa::path(
    post,
    path = "/admin/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 400, description = "User is not logged in")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let token = token_from_headers(&headers);
    state
        .sessions
        .logout(token.as_ref())
        .map_err(AppError::auth_as_bad_request)?;

    Ok((
        [(header::SET_COOKIE, clearing_cookie(&state.config.env))],
        Json(MessageResponse::new("Logout successful")),
    ))
}

// --- Users ---

/// list_users
///
/// [Public Route] Every user with their photo and comment counts.
#[utoipa::path(
    get,
    path = "/user/list",
    responses((status = 200, description = "Users", body = [UserWithCounts]))
)]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserWithCounts>>, AppError> {
    let users = DirectorySearch::new(state.repo.as_ref())
        .list_users_with_counts()
        .await?;
    Ok(Json(users))
}

/// get_user_detail
///
/// [Public Route] Public profile of one user.
#[utoipa::path(
    get,
    path = "/user/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserDetail),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_detail(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<UserDetail>, AppError> {
    let user = IdentityStore::new(state.repo.as_ref())
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(UserDetail::from(&user)))
}

/// update_profile
///
/// [Authenticated Route] Partial profile update. Empty values are ignored.
///
/// *Note*: any logged-in user may edit any profile; the target is taken from the path,
/// not from the session.
#[utoipa::path(
    put,
    path = "/user/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_profile(
    AuthUser { id: editor_id }: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, AppError> {
    if editor_id != id {
        tracing::warn!(%editor_id, target_id = %id, "profile edited by another user");
    }
    let user = ProfileEditor::new(state.repo.as_ref())
        .update_profile(id, payload)
        .await?;
    Ok(Json(UserProfile::from(&user)))
}

/// search_users
///
/// [Authenticated Route] Case-insensitive search on first and last names.
#[utoipa::path(
    post,
    path = "/user/search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Matching users", body = [UserProfile]),
        (status = 400, description = "Search text required")
    )
)]
pub async fn search_users(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    let users = DirectorySearch::new(state.repo.as_ref())
        .search_users(&payload.search_text)
        .await?;
    Ok(Json(users))
}

/// search_comments
///
/// [Authenticated Route] Photos with a comment containing the text, joined with
/// their owner and comment authors.
#[utoipa::path(
    post,
    path = "/comment/search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Matching photos", body = [PhotoView]),
        (status = 400, description = "Search text required")
    )
)]
pub async fn search_comments(
    AuthUser { id }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<Vec<PhotoView>>, AppError> {
    let photos = DirectorySearch::new(state.repo.as_ref())
        .search_comments(&payload.search_text, Some(id))
        .await?;
    Ok(Json(photos))
}

// --- Photos ---

/// get_photos_of_user
///
/// [Public Route] A user's photos, newest first. When the caller has a session,
/// `liked` tells whether they liked each photo.
#[utoipa::path(
    get,
    path = "/photosOfUser/{id}",
    params(("id" = Uuid, Path, description = "Owner's user ID")),
    responses((status = 200, description = "Photos", body = [PhotoView]))
)]
pub async fn get_photos_of_user(
    viewer: MaybeAuthUser,
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<Vec<PhotoView>>, AppError> {
    let photos = state.photos.list_for_user(user_id, viewer.user_id()).await?;
    Ok(Json(photos))
}

/// get_presigned_url
///
/// [Authenticated Route] Issues a short-lived URL for uploading a photo file straight to
/// object storage, plus the `file_name` to register afterwards with `POST /photos/new`.
#[utoipa::path(
    post,
    path = "/photos/upload-url",
    request_body = PresignedUrlRequest,
    responses((status = 200, description = "URL", body = PresignedUrlResponse))
)]
pub async fn get_presigned_url(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> Result<Json<PresignedUrlResponse>, AppError> {
    if payload.filename.trim().is_empty() {
        return Err(AppError::validation("filename is required"));
    }
    let file_name = photo_file_name(&payload.filename, Utc::now());
    let key = photo_object_key(&file_name);

    let upload_url = state
        .storage
        .get_presigned_upload_url(&key, &payload.file_type)
        .await
        .map_err(|e| AppError::internal(format!("storage error: {e}")))?;

    Ok(Json(PresignedUrlResponse {
        upload_url,
        file_name,
    }))
}

/// create_photo
///
/// [Authenticated Route] Registers an uploaded file as a new photo owned by the caller.
#[utoipa::path(
    post,
    path = "/photos/new",
    request_body = CreatePhotoRequest,
    responses(
        (status = 200, description = "Created", body = PhotoView),
        (status = 400, description = "No file uploaded")
    )
)]
pub async fn create_photo(
    AuthUser { id }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePhotoRequest>,
) -> Result<Json<PhotoView>, AppError> {
    let photo = state.photos.create(id, &payload.file_name).await?;
    Ok(Json(project_photo(&photo, &HashMap::new(), Some(id))))
}

/// toggle_like
///
/// [Authenticated Route] Likes the photo, or removes the like if the caller already liked it.
#[utoipa::path(
    post,
    path = "/photos/{id}/like",
    params(("id" = Uuid, Path, description = "Photo ID")),
    responses(
        (status = 200, description = "Toggled", body = LikeStatus),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "Photo not found")
    )
)]
pub async fn toggle_like(
    AuthUser { id }: AuthUser,
    State(state): State<AppState>,
    ApiPath(photo_id): ApiPath<Uuid>,
) -> Result<Json<LikeStatus>, AppError> {
    let status = state.photos.toggle_like(photo_id, id).await?;
    Ok(Json(status))
}

// --- Comments ---

/// add_comment
///
/// [Authenticated Route] Appends a comment authored by the caller.
#[utoipa::path(
    post,
    path = "/comment/commentsOfPhoto/{photo_id}",
    params(("photo_id" = Uuid, Path, description = "Photo ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 200, description = "Comment added", body = Comment),
        (status = 400, description = "Comment cannot be empty"),
        (status = 404, description = "Photo not found")
    )
)]
pub async fn add_comment(
    AuthUser { id }: AuthUser,
    State(state): State<AppState>,
    ApiPath(photo_id): ApiPath<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<Json<Comment>, AppError> {
    let comment = state
        .photos
        .add_comment(photo_id, id, &payload.comment)
        .await?;
    Ok(Json(comment))
}

/// edit_comment
///
/// [Authenticated Route] Replaces the text of the caller's own comment.
#[utoipa::path(
    put,
    path = "/comment/edit/{photo_id}/{comment_id}",
    params(
        ("photo_id" = Uuid, Path, description = "Photo ID"),
        ("comment_id" = i64, Path, description = "Comment ID within the photo")
    ),
    request_body = EditCommentRequest,
    responses(
        (status = 200, description = "Updated", body = Comment),
        (status = 400, description = "Comment text required"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Photo or comment not found")
    )
)]
pub async fn edit_comment(
    AuthUser { id }: AuthUser,
    State(state): State<AppState>,
    CommentPath {
        photo_id,
        comment_id,
    }: CommentPath,
    Json(payload): Json<EditCommentRequest>,
) -> Result<Json<Comment>, AppError> {
    let comment = state
        .photos
        .edit_comment(photo_id, comment_id, id, &payload.new_text)
        .await?;
    Ok(Json(comment))
}

/// delete_comment
///
/// [Authenticated Route] Removes the caller's own comment.
#[utoipa::path(
    delete,
    path = "/comment/delete/{photo_id}/{comment_id}",
    params(
        ("photo_id" = Uuid, Path, description = "Photo ID"),
        ("comment_id" = i64, Path, description = "Comment ID within the photo")
    ),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Photo or comment not found")
    )
)]
pub async fn delete_comment(
    AuthUser { id }: AuthUser,
    State(state): State<AppState>,
    CommentPath {
        photo_id,
        comment_id,
    }: CommentPath,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .photos
        .delete_comment(photo_id, comment_id, id)
        .await?;
    Ok(Json(MessageResponse::new("Deleted successfully")))
}
