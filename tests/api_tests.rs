use photo_portal::{
    AppConfig, AppState, InMemoryRepository, MockStorageService, create_router,
    models::{Comment, LikeStatus, PhotoView, RegisteredUser, UserDetail, UserWithCounts},
    repository::RepositoryState,
    storage::StorageState,
};
use reqwest::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
}

async fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new()) as RepositoryState;
    let storage = Arc::new(MockStorageService::new()) as StorageState;
    let router = create_router(AppState::new(repo, storage, AppConfig::default()));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address }
}

/// A browser-like client: keeps the session cookie between requests.
fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("client")
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn register(&self, client: &reqwest::Client, login: &str, first: &str) -> RegisteredUser {
        let response = client
            .post(self.url("/user"))
            .json(&json!({
                "login_name": login,
                "password": "pw",
                "first_name": first,
                "last_name": "Tester",
            }))
            .send()
            .await
            .expect("req fail");
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.unwrap()
    }

    async fn login(&self, client: &reqwest::Client, login: &str) {
        let response = client
            .post(self.url("/admin/login"))
            .json(&json!({ "login_name": login, "password": "pw" }))
            .send()
            .await
            .expect("req fail");
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = reqwest::Client::new()
        .get(app.url("/health"))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_photo_sharing_lifecycle() {
    let app = spawn_app().await;
    let ann_client = browser();
    let bob_client = browser();

    let ann = app.register(&ann_client, "ann", "Ann").await;
    let _bob = app.register(&bob_client, "bob", "Bob").await;

    // Ann uploads a photo.
    app.login(&ann_client, "ann").await;
    let presigned: serde_json::Value = ann_client
        .post(app.url("/photos/upload-url"))
        .json(&json!({ "filename": "sunset.jpg", "file_type": "image/jpeg" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let photo: PhotoView = ann_client
        .post(app.url("/photos/new"))
        .json(&json!({ "file_name": presigned["file_name"] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Bob comments.
    app.login(&bob_client, "bob").await;
    let response = bob_client
        .post(app.url(&format!("/comment/commentsOfPhoto/{}", photo.id)))
        .json(&json!({ "comment": "Nice!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let comment: Comment = response.json().await.unwrap();

    // Ann cannot edit Bob's comment.
    let response = ann_client
        .put(app.url(&format!("/comment/edit/{}/{}", photo.id, comment.id)))
        .json(&json!({ "new_text": "Edited by Ann" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Bob can.
    let response = bob_client
        .put(app.url(&format!("/comment/edit/{}/{}", photo.id, comment.id)))
        .json(&json!({ "new_text": "Great shot" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Bob likes the photo.
    let like: LikeStatus = bob_client
        .post(app.url(&format!("/photos/{}/like", photo.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(like.liked);
    assert_eq!(like.likes_count, 1);

    let photos: Vec<PhotoView> = bob_client
        .get(app.url(&format!("/photosOfUser/{}", ann.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(photos.len(), 1);
    assert!(photos[0].liked);
    assert_eq!(photos[0].comments[0].text, "Great shot");

    // Comment search finds the photo with its owner.
    let found: Vec<PhotoView> = ann_client
        .post(app.url("/comment/search"))
        .json(&json!({ "searchText": "great" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].owner.as_ref().map(|o| o.id), Some(ann.id));

    let users: Vec<UserWithCounts> = reqwest::Client::new()
        .get(app.url("/user/list"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ann_row = users.iter().find(|u| u.id == ann.id).unwrap();
    assert_eq!(ann_row.photo_count, 1);

    // Bob deletes his comment, logs out, and is anonymous again.
    let response = bob_client
        .delete(app.url(&format!("/comment/delete/{}/{}", photo.id, comment.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = bob_client
        .post(app.url("/admin/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = bob_client
        .post(app.url(&format!("/photos/{}/like", photo.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = bob_client
        .post(app.url("/admin/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_profile_edit_and_detail() {
    let app = spawn_app().await;
    let client = browser();
    let ann = app.register(&client, "ann", "Ann").await;
    app.login(&client, "ann").await;

    let response = client
        .put(app.url(&format!("/user/{}", ann.id)))
        .json(&json!({ "location": "Bergen", "first_name": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let detail: UserDetail = reqwest::Client::new()
        .get(app.url(&format!("/user/{}", ann.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail.location, "Bergen");
    assert_eq!(detail.first_name, "Ann");
}

#[tokio::test]
async fn test_invalid_ids_and_bad_login() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(app.url("/user/not-a-uuid"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(app.url("/admin/login"))
        .json(&json!({ "login_name": "ghost", "password": "pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(app.url("/user"))
        .json(&json!({ "login_name": "incomplete" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_null_fields_are_bad_request() {
    let app = spawn_app().await;
    let client = browser();

    let response = client
        .post(app.url("/user"))
        .json(&json!({
            "login_name": null,
            "password": "pw",
            "first_name": "Ann",
            "last_name": "Lee",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["message"].is_string());

    let ann = app.register(&client, "ann", "Ann").await;
    app.login(&client, "ann").await;
    let photo: PhotoView = client
        .post(app.url("/photos/new"))
        .json(&json!({ "file_name": "1-a.jpg" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(photo.owner_id, ann.id);

    let response = client
        .post(app.url(&format!("/comment/commentsOfPhoto/{}", photo.id)))
        .json(&json!({ "comment": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(app.url("/user/search"))
        .json(&json!({ "searchText": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_path_ids() {
    let app = spawn_app().await;
    let client = browser();
    app.register(&client, "ann", "Ann").await;
    app.login(&client, "ann").await;
    let photo: PhotoView = client
        .post(app.url("/photos/new"))
        .json(&json!({ "file_name": "1-a.jpg" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Not a uuid: 400 with the usual JSON body.
    let response = client
        .post(app.url("/photos/not-a-uuid/like"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["message"].is_string());

    let response = client
        .delete(app.url("/comment/delete/not-a-uuid/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Invalid photo id");

    // A comment id that is not a number names no comment.
    let response = client
        .put(app.url(&format!("/comment/edit/{}/abc", photo.id)))
        .json(&json!({ "new_text": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Comment not found");

    let response = client
        .delete(app.url(&format!("/comment/delete/{}/abc", photo.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
