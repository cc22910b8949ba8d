use chrono::Utc;
use photo_portal::{
    AppError, PhotoAggregate,
    identity::IdentityStore,
    memory::InMemoryRepository,
    models::{Photo, RegisterUserRequest, User},
    repository::{Repository, RepositoryState},
};
use std::sync::Arc;
use uuid::Uuid;

// --- TEST UTILITIES ---

struct Fixture {
    repo: RepositoryState,
    photos: Arc<PhotoAggregate>,
}

fn fixture() -> Fixture {
    let repo: RepositoryState = Arc::new(InMemoryRepository::new());
    let photos = Arc::new(PhotoAggregate::new(repo.clone()));
    Fixture { repo, photos }
}

async fn register(repo: &dyn Repository, login_name: &str, first: &str, last: &str) -> User {
    IdentityStore::new(repo)
        .register(RegisterUserRequest {
            login_name: login_name.to_string(),
            password: "pw".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
}

// --- TESTS ---

#[tokio::test]
async fn test_comment_like_scenario() {
    let f = fixture();
    let ann = register(f.repo.as_ref(), "ann", "Ann", "Lee").await;
    let bob = register(f.repo.as_ref(), "bob", "Bob", "Kim").await;

    let photo = f.photos.create(ann.id, "1700000000000-sunset.jpg").await.unwrap();

    let comment = f
        .photos
        .add_comment(photo.id, bob.id, "Nice!")
        .await
        .unwrap();
    assert_eq!(comment.author_id, bob.id);
    assert_eq!(comment.text, "Nice!");

    // Only the author may edit.
    let err = f
        .photos
        .edit_comment(photo.id, comment.id, ann.id, "Hijacked")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let edited = f
        .photos
        .edit_comment(photo.id, comment.id, bob.id, "Great shot")
        .await
        .unwrap();
    assert_eq!(edited.id, comment.id);
    assert_eq!(edited.created_at, comment.created_at);
    assert_eq!(edited.text, "Great shot");

    let status = f.photos.toggle_like(photo.id, bob.id).await.unwrap();
    assert!(status.liked);
    assert_eq!(status.likes_count, 1);

    // Ann's photo as seen by Bob.
    let listed = f.photos.list_for_user(ann.id, Some(bob.id)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].liked);
    assert_eq!(listed[0].likes_count, 1);
    assert_eq!(listed[0].comments.len(), 1);
    assert_eq!(listed[0].comments[0].text, "Great shot");
    assert_eq!(
        listed[0].comments[0].author.as_ref().map(|a| a.first_name.as_str()),
        Some("Bob")
    );

    // Anonymous viewers never see `liked`.
    let anonymous = f.photos.list_for_user(ann.id, None).await.unwrap();
    assert!(!anonymous[0].liked);
    assert_eq!(anonymous[0].likes_count, 1);

    let status = f.photos.toggle_like(photo.id, bob.id).await.unwrap();
    assert!(!status.liked);
    assert_eq!(status.likes_count, 0);

    f.photos
        .delete_comment(photo.id, comment.id, bob.id)
        .await
        .unwrap();
    let listed = f.photos.list_for_user(ann.id, None).await.unwrap();
    assert!(listed[0].comments.is_empty());
}

#[tokio::test]
async fn test_create_requires_file_name() {
    let f = fixture();
    let err = f.photos.create(Uuid::new_v4(), "  ").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_add_comment_validation_before_lookup() {
    let f = fixture();
    // Blank text on a missing photo is still a validation failure.
    let err = f
        .photos
        .add_comment(Uuid::new_v4(), Uuid::new_v4(), "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = f
        .photos
        .add_comment(Uuid::new_v4(), Uuid::new_v4(), "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_edit_and_delete_missing_targets() {
    let f = fixture();
    let ann = register(f.repo.as_ref(), "ann", "Ann", "Lee").await;
    let photo = f.photos.create(ann.id, "a.jpg").await.unwrap();

    assert!(matches!(
        f.photos.edit_comment(photo.id, 42, ann.id, "x").await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        f.photos.delete_comment(photo.id, 42, ann.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        f.photos.delete_comment(Uuid::new_v4(), 1, ann.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        f.photos.edit_comment(photo.id, 1, ann.id, "").await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        f.photos.toggle_like(Uuid::new_v4(), ann.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_foreign_comment_forbidden() {
    let f = fixture();
    let ann = register(f.repo.as_ref(), "ann", "Ann", "Lee").await;
    let bob = register(f.repo.as_ref(), "bob", "Bob", "Kim").await;
    let photo = f.photos.create(ann.id, "a.jpg").await.unwrap();
    let comment = f.photos.add_comment(photo.id, bob.id, "hi").await.unwrap();

    // The photo owner is not the comment author.
    let err = f
        .photos
        .delete_comment(photo.id, comment.id, ann.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let listed = f.photos.list_for_user(ann.id, None).await.unwrap();
    assert_eq!(listed[0].comments.len(), 1);
}

#[tokio::test]
async fn test_deleting_comment_keeps_sibling_ids() {
    let f = fixture();
    let ann = register(f.repo.as_ref(), "ann", "Ann", "Lee").await;
    let photo = f.photos.create(ann.id, "a.jpg").await.unwrap();

    let first = f.photos.add_comment(photo.id, ann.id, "one").await.unwrap();
    let second = f.photos.add_comment(photo.id, ann.id, "two").await.unwrap();
    let third = f.photos.add_comment(photo.id, ann.id, "three").await.unwrap();

    f.photos
        .delete_comment(photo.id, second.id, ann.id)
        .await
        .unwrap();

    // The third comment is still addressable by its original id.
    let edited = f
        .photos
        .edit_comment(photo.id, third.id, ann.id, "THREE")
        .await
        .unwrap();
    assert_eq!(edited.id, third.id);

    let fourth = f.photos.add_comment(photo.id, ann.id, "four").await.unwrap();
    assert!(fourth.id > third.id);

    let listed = f.photos.list_for_user(ann.id, None).await.unwrap();
    let ids: Vec<i64> = listed[0].comments.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![first.id, third.id, fourth.id]);
}

#[tokio::test]
async fn test_list_newest_first() {
    let f = fixture();
    let ann = register(f.repo.as_ref(), "ann", "Ann", "Lee").await;
    let older = f.photos.create(ann.id, "older.jpg").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let newer = f.photos.create(ann.id, "newer.jpg").await.unwrap();

    let listed = f.photos.list_for_user(ann.id, None).await.unwrap();
    let ids: Vec<Uuid> = listed.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);

    // Unknown owner: empty list, not an error.
    assert!(f
        .photos
        .list_for_user(Uuid::new_v4(), None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_equal_timestamps_keep_insertion_order() {
    let f = fixture();
    let ann = register(f.repo.as_ref(), "ann", "Ann", "Lee").await;
    let at = Utc::now();

    let first = f
        .repo
        .insert_photo(Photo::new(ann.id, "first.jpg".to_string(), at))
        .await
        .unwrap();
    let second = f
        .repo
        .insert_photo(Photo::new(ann.id, "second.jpg".to_string(), at))
        .await
        .unwrap();
    let newest = f
        .repo
        .insert_photo(Photo::new(
            ann.id,
            "newest.jpg".to_string(),
            at + chrono::Duration::seconds(1),
        ))
        .await
        .unwrap();
    let expected = vec![newest.id, first.id, second.id];

    let stored: Vec<Uuid> = f
        .repo
        .photos_of_user(ann.id)
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(stored, expected);

    let listed: Vec<Uuid> = f
        .photos
        .list_for_user(ann.id, None)
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(listed, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_likes_are_serialized() {
    let f = fixture();
    let owner = register(f.repo.as_ref(), "owner", "O", "W").await;
    let photo = f.photos.create(owner.id, "busy.jpg").await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let photos = f.photos.clone();
        let photo_id = photo.id;
        handles.push(tokio::spawn(async move {
            photos.toggle_like(photo_id, Uuid::new_v4()).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().liked);
    }

    let listed = f.photos.list_for_user(owner.id, None).await.unwrap();
    assert_eq!(listed[0].likes_count, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_comments_get_distinct_ids() {
    let f = fixture();
    let owner = register(f.repo.as_ref(), "owner", "O", "W").await;
    let photo = f.photos.create(owner.id, "busy.jpg").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..20 {
        let photos = f.photos.clone();
        let photo_id = photo.id;
        let author = owner.id;
        handles.push(tokio::spawn(async move {
            photos
                .add_comment(photo_id, author, &format!("comment {i}"))
                .await
        }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 20);

    let listed = f.photos.list_for_user(owner.id, None).await.unwrap();
    assert_eq!(listed[0].comments.len(), 20);
}
