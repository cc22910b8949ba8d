use chrono::Utc;
use photo_portal::models::{
    CommentView, PhotoView, RegisterUserRequest, RegisteredUser, SearchRequest,
    UpdateProfileRequest, User, UserDetail, UserProfile, UserSummary,
};
use serde_json::json;
use uuid::Uuid;

fn sample_user() -> User {
    User {
        id: Uuid::new_v4(),
        login_name: "ann".to_string(),
        password: "hunter2".to_string(),
        first_name: "Ann".to_string(),
        last_name: "Lee".to_string(),
        location: "Oslo".to_string(),
        description: "Photographer".to_string(),
        occupation: "Nurse".to_string(),
    }
}

#[test]
fn test_projections_never_carry_password() {
    let user = sample_user();
    let serialized = [
        serde_json::to_value(RegisteredUser::from(&user)).unwrap(),
        serde_json::to_value(UserSummary::from(&user)).unwrap(),
        serde_json::to_value(UserDetail::from(&user)).unwrap(),
        serde_json::to_value(UserProfile::from(&user)).unwrap(),
    ];

    for value in serialized {
        assert!(value.get("password").is_none(), "{value}");
        assert!(!value.to_string().contains("hunter2"));
    }
}

#[test]
fn test_user_detail_omits_login_name() {
    let value = serde_json::to_value(UserDetail::from(&sample_user())).unwrap();
    assert!(value.get("login_name").is_none());
    assert_eq!(value["occupation"], "Nurse");
}

#[test]
fn test_search_request_reads_camel_case_field() {
    let req: SearchRequest = serde_json::from_value(json!({ "searchText": "ann" })).unwrap();
    assert_eq!(req.search_text, "ann");

    // Missing field falls through to the empty-text validation.
    let empty: SearchRequest = serde_json::from_value(json!({})).unwrap();
    assert_eq!(empty.search_text, "");
}

#[test]
fn test_register_request_missing_fields_deserialize_empty() {
    let req: RegisterUserRequest =
        serde_json::from_value(json!({ "login_name": "ann" })).unwrap();
    assert_eq!(req.login_name, "ann");
    assert_eq!(req.password, "");
    assert!(req.location.is_none());
}

#[test]
fn test_update_request_is_partial() {
    let req: UpdateProfileRequest =
        serde_json::from_value(json!({ "location": "Bergen" })).unwrap();
    assert_eq!(req.location.as_deref(), Some("Bergen"));
    assert!(req.first_name.is_none());
}

#[test]
fn test_photo_view_owner_only_when_present() {
    let mut view = PhotoView {
        id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        owner: None,
        file_name: "1-a.jpg".to_string(),
        created_at: Utc::now(),
        comments: vec![CommentView {
            id: 1,
            text: "hi".to_string(),
            created_at: Utc::now(),
            author_id: Uuid::new_v4(),
            author: None,
        }],
        likes_count: 0,
        liked: false,
    };

    let value = serde_json::to_value(&view).unwrap();
    assert!(value.get("owner").is_none());
    // A comment with a vanished author still serializes the key.
    assert!(value["comments"][0]["author"].is_null());

    view.owner = Some(UserSummary::from(&sample_user()));
    let value = serde_json::to_value(&view).unwrap();
    assert_eq!(value["owner"]["first_name"], "Ann");
}

#[test]
fn test_null_strings_read_as_empty() {
    let request: RegisterUserRequest = serde_json::from_value(json!({
        "login_name": null,
        "password": "pw",
        "first_name": "Ann",
        "last_name": null,
    }))
    .unwrap();
    assert_eq!(request.login_name, "");
    assert_eq!(request.last_name, "");
    assert_eq!(request.first_name, "Ann");

    let search: SearchRequest = serde_json::from_value(json!({ "searchText": null })).unwrap();
    assert_eq!(search.search_text, "");
}
