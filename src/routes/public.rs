use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session: health, registration, login/logout and
/// read-only browsing of users and their photos.
///
/// `/photosOfUser/{id}` still looks for a session through `MaybeAuthUser` so the
/// `liked` flag can be computed for logged-in viewers.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        .route("/health", get(|| async { "ok" }))
        // POST /user
        // Account creation.
        .route("/user", post(handlers::register_user))
        // POST /admin/login, POST /admin/logout
        // Session lifecycle. Both answer 400 on failure, never 401.
        .route("/admin/login", post(handlers::login))
        .route("/admin/logout", post(handlers::logout))
        // GET /user/list
        // Every user with photo and comment counts.
        .route("/user/list", get(handlers::list_users))
        // GET /user/{id}
        // PUT on the same path lives in the authenticated router.
        .route("/user/{id}", get(handlers::get_user_detail))
        // GET /photosOfUser/{id}
        .route("/photosOfUser/{id}", get(handlers::get_photos_of_user))
}
