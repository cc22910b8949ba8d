use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
};
use std::sync::Arc;
use std::time::Duration;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Domain services.
pub mod directory;
pub mod identity;
pub mod photos;
pub mod profile;
pub mod session;

// Persistence, storage and transport.
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod repository;
pub mod storage;

// Routing split by access level (Public, Authenticated).
pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use memory::InMemoryRepository;
pub use photos::{PhotoAggregate, PhotoState};
pub use repository::{PostgresRepository, RepositoryState};
pub use session::{SessionAuthority, SessionState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document for every route, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register_user, handlers::login, handlers::logout,
        handlers::list_users, handlers::get_user_detail, handlers::update_profile,
        handlers::search_users, handlers::search_comments, handlers::get_photos_of_user,
        handlers::get_presigned_url, handlers::create_photo, handlers::toggle_like,
        handlers::add_comment, handlers::edit_comment, handlers::delete_comment
    ),
    components(
        schemas(
            models::Comment, models::RegisterUserRequest, models::LoginRequest,
            models::UpdateProfileRequest, models::SearchRequest, models::CreatePhotoRequest,
            models::CreateCommentRequest, models::EditCommentRequest,
            models::PresignedUrlRequest, models::PresignedUrlResponse,
            models::RegisteredUser, models::UserSummary, models::UserDetail,
            models::UserProfile, models::UserWithCounts, models::CommentView,
            models::PhotoView, models::LikeStatus, models::MessageResponse,
        )
    ),
    tags(
        (name = "photo-portal", description = "Photo sharing API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared by every request. Cloning is cheap: each service sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Users and photo aggregates.
    pub repo: RepositoryState,
    /// Presigned upload URLs.
    pub storage: StorageState,
    pub config: AppConfig,
    /// Token to user bindings for the lifetime of the process.
    pub sessions: SessionState,
    /// Serialized mutations of photo aggregates.
    pub photos: PhotoState,
}

impl AppState {
    /// new
    ///
    /// Wires the session authority (TTL from `config`) and the photo aggregate on top
    /// of the given repository and storage.
    pub fn new(repo: RepositoryState, storage: StorageState, config: AppConfig) -> Self {
        let sessions = Arc::new(SessionAuthority::new(Duration::from_secs(
            config.session_ttl_secs,
        )));
        let photos = Arc::new(PhotoAggregate::new(repo.clone()));
        Self {
            repo,
            storage,
            config,
            sessions,
            photos,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated router. The `AuthUser` extractor rejects with 401 before
/// the handler runs when the request carries no live session.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

fn cors_layer(origin: &str) -> CorsLayer {
    // Credentialed CORS needs one exact origin; wildcards are refused by browsers.
    let origin = HeaderValue::from_str(origin).unwrap_or_else(|_| {
        tracing::warn!("CORS_ORIGIN={} is not a valid header value, using default", origin);
        HeaderValue::from_static("http://localhost:3000")
    });

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// create_router
///
/// Assembles the routing tree, its middleware and the shared state.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one HTTP request, correlated by its `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
