use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, post, put},
};

/// Authenticated Router Module
///
/// Routes that require a live session. The router is wrapped in `auth_middleware`,
/// and each handler additionally takes `AuthUser` to learn the acting user, which
/// the photo aggregate uses for its author-only checks.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // PUT /user/{id}
        // Partial profile update.
        .route("/user/{id}", put(handlers::update_profile))
        // POST /user/search
        .route("/user/search", post(handlers::search_users))
        // POST /comment/search
        // Photos whose comments contain the search text.
        .route("/comment/search", post(handlers::search_comments))
        // --- Photos ---
        // POST /photos/upload-url
        // Short-lived presigned PUT URL; the bytes go straight to object storage.
        .route("/photos/upload-url", post(handlers::get_presigned_url))
        // POST /photos/new
        // Registers the uploaded file as a photo owned by the caller.
        .route("/photos/new", post(handlers::create_photo))
        // POST /photos/{id}/like
        // Toggles the caller's like.
        .route("/photos/{id}/like", post(handlers::toggle_like))
        // --- Comments ---
        .route(
            "/comment/commentsOfPhoto/{photo_id}",
            post(handlers::add_comment),
        )
        // Author-only.
        .route(
            "/comment/edit/{photo_id}/{comment_id}",
            put(handlers::edit_comment),
        )
        .route(
            "/comment/delete/{photo_id}/{comment_id}",
            delete(handlers::delete_comment),
        )
}
