use crate::error::{AppError, AppResult};
use crate::models::{Comment, Photo, User, UserWithCounts};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, query_builder::QueryBuilder};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. Handlers and the
/// core components only see this trait, so the Postgres store and the in-memory
/// store (`memory.rs`) are interchangeable.
///
/// Photos are loaded and saved as whole aggregates (photo + comments + likes).
/// Every method reports store failures as `AppError::Internal`; nothing is swallowed.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    /// Fails with `Conflict` if the login name is taken.
    async fn insert_user(&self, user: User) -> AppResult<User>;
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn get_user_by_login(&self, login_name: &str) -> AppResult<Option<User>>;
    // Unknown ids are skipped, so the result may be shorter than `ids`.
    async fn get_users(&self, ids: &[Uuid]) -> AppResult<Vec<User>>;
    // Persists the mutable profile fields of an existing user.
    async fn update_user(&self, user: &User) -> AppResult<()>;
    /// Case-insensitive substring match on first or last name, registration order.
    async fn search_users(&self, text: &str) -> AppResult<Vec<User>>;
    async fn list_users_with_counts(&self) -> AppResult<Vec<UserWithCounts>>;

    // --- Photo Aggregates ---
    async fn insert_photo(&self, photo: Photo) -> AppResult<Photo>;
    async fn get_photo(&self, id: Uuid) -> AppResult<Option<Photo>>;
    /// Replaces the stored comments, likes and comment counter of an existing photo.
    async fn save_photo(&self, photo: &Photo) -> AppResult<()>;
    /// Newest first; photos with equal timestamps keep insertion order.
    async fn photos_of_user(&self, owner_id: Uuid) -> AppResult<Vec<Photo>>;
    /// Photos holding at least one comment containing `text` (case-insensitive), newest first.
    async fn photos_with_comment_text(&self, text: &str) -> AppResult<Vec<Photo>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// like_pattern
///
/// Builds an ILIKE pattern matching `text` anywhere, with LIKE wildcards in the
/// user's text escaped so they match literally.
pub(crate) fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

// --- Row Types ---

#[derive(FromRow)]
struct PhotoRow {
    id: Uuid,
    owner_id: Uuid,
    file_name: String,
    created_at: DateTime<Utc>,
    next_comment_id: i64,
}

#[derive(FromRow)]
struct CommentRow {
    photo_id: Uuid,
    id: i64,
    author_id: Uuid,
    comment: String,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct LikeRow {
    photo_id: Uuid,
    user_id: Uuid,
}

const USER_COLUMNS: &str =
    "id, login_name, password, first_name, last_name, location, description, occupation";

const PHOTO_COLUMNS: &str = "id, owner_id, file_name, created_at, next_comment_id";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Comments and likes live in child tables (`photo_comments`, `photo_likes`) and
/// are stitched back into `Photo` aggregates on load.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// hydrate
    ///
    /// Loads the comments and likes of every photo row in two batched queries and
    /// assembles the aggregates, preserving the order of `rows`.
    async fn hydrate(&self, rows: Vec<PhotoRow>) -> AppResult<Vec<Photo>> {
        if rows.is_empty() {
            return Ok(vec![]);
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let comment_rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT photo_id, id, author_id, comment, created_at
            FROM photo_comments
            WHERE photo_id = ANY($1)
            ORDER BY photo_id, id ASC
            "#,
        )
        .bind(ids.as_slice())
        .fetch_all(&self.pool)
        .await?;

        let like_rows = sqlx::query_as::<_, LikeRow>(
            "SELECT photo_id, user_id FROM photo_likes WHERE photo_id = ANY($1)",
        )
        .bind(ids.as_slice())
        .fetch_all(&self.pool)
        .await?;

        let mut comments: HashMap<Uuid, Vec<Comment>> = HashMap::new();
        for row in comment_rows {
            comments.entry(row.photo_id).or_default().push(Comment {
                id: row.id,
                text: row.comment,
                created_at: row.created_at,
                author_id: row.author_id,
            });
        }

        let mut likes: HashMap<Uuid, BTreeSet<Uuid>> = HashMap::new();
        for row in like_rows {
            likes.entry(row.photo_id).or_default().insert(row.user_id);
        }

        Ok(rows
            .into_iter()
            .map(|row| Photo {
                comments: comments.remove(&row.id).unwrap_or_default(),
                likes: likes.remove(&row.id).unwrap_or_default(),
                id: row.id,
                owner_id: row.owner_id,
                file_name: row.file_name,
                created_at: row.created_at,
                next_comment_id: row.next_comment_id,
            })
            .collect())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// insert_user
    ///
    /// The `users.login_name` unique constraint backs the registration pre-check,
    /// so two racing registrations still end in exactly one `Conflict`.
    async fn insert_user(&self, user: User) -> AppResult<User> {
        let query = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(user.id)
            .bind(&user.login_name)
            .bind(&user.password)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.location)
            .bind(&user.description)
            .bind(&user.occupation)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => AppError::conflict(
                    format!("User with login_name \"{}\" already exists.", user.login_name),
                ),
                other => {
                    tracing::error!("insert_user error: {:?}", other);
                    AppError::from(other)
                }
            })
    }

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_login(&self, login_name: &str) -> AppResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE login_name = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(login_name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_users(&self, ids: &[Uuid]) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1) ORDER BY seq");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_user(&self, user: &User) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, location = $4, description = $5, occupation = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.location)
        .bind(&user.description)
        .bind(&user.occupation)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User not found"));
        }
        Ok(())
    }

    /// search_users
    ///
    /// Uses ILIKE with a bound, escaped pattern; the search text never reaches the SQL string.
    async fn search_users(&self, text: &str) -> AppResult<Vec<User>> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE first_name ILIKE $1 OR last_name ILIKE $1 ORDER BY seq"
        );
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(like_pattern(text))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_users_with_counts(&self) -> AppResult<Vec<UserWithCounts>> {
        Ok(sqlx::query_as::<_, UserWithCounts>(
            r#"
            SELECT
                u.id, u.first_name, u.last_name,
                (SELECT COUNT(*) FROM photos p WHERE p.owner_id = u.id) AS photo_count,
                (SELECT COUNT(*) FROM photo_comments c WHERE c.author_id = u.id) AS comment_count
            FROM users u
            ORDER BY u.seq
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert_photo(&self, photo: Photo) -> AppResult<Photo> {
        sqlx::query(
            "INSERT INTO photos (id, owner_id, file_name, created_at, next_comment_id) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(photo.id)
        .bind(photo.owner_id)
        .bind(&photo.file_name)
        .bind(photo.created_at)
        .bind(photo.next_comment_id)
        .execute(&self.pool)
        .await?;
        // Children, if any, are written by save_photo.
        if !photo.comments.is_empty() || !photo.likes.is_empty() {
            self.save_photo(&photo).await?;
        }
        Ok(photo)
    }

    async fn get_photo(&self, id: Uuid) -> AppResult<Option<Photo>> {
        let query = format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE id = $1");
        let row = sqlx::query_as::<_, PhotoRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// save_photo
    ///
    /// Rewrites the aggregate's children inside one transaction, so readers never
    /// observe a half-saved photo.
    async fn save_photo(&self, photo: &Photo) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE photos SET next_comment_id = $2 WHERE id = $1")
            .bind(photo.id)
            .bind(photo.next_comment_id)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::not_found("Photo not found"));
        }

        sqlx::query("DELETE FROM photo_comments WHERE photo_id = $1")
            .bind(photo.id)
            .execute(&mut *tx)
            .await?;
        if !photo.comments.is_empty() {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO photo_comments (photo_id, id, author_id, comment, created_at) ",
            );
            builder.push_values(&photo.comments, |mut b, c| {
                b.push_bind(photo.id)
                    .push_bind(c.id)
                    .push_bind(c.author_id)
                    .push_bind(c.text.clone())
                    .push_bind(c.created_at);
            });
            builder.build().execute(&mut *tx).await?;
        }

        sqlx::query("DELETE FROM photo_likes WHERE photo_id = $1")
            .bind(photo.id)
            .execute(&mut *tx)
            .await?;
        if !photo.likes.is_empty() {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO photo_likes (photo_id, user_id) ");
            builder.push_values(&photo.likes, |mut b, user_id| {
                b.push_bind(photo.id).push_bind(*user_id);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn photos_of_user(&self, owner_id: Uuid) -> AppResult<Vec<Photo>> {
        let query = format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE owner_id = $1 ORDER BY created_at DESC, seq ASC"
        );
        let rows = sqlx::query_as::<_, PhotoRow>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        self.hydrate(rows).await
    }

    async fn photos_with_comment_text(&self, text: &str) -> AppResult<Vec<Photo>> {
        let query = format!(
            r#"
            SELECT {PHOTO_COLUMNS} FROM photos p
            WHERE EXISTS (
                SELECT 1 FROM photo_comments c
                WHERE c.photo_id = p.id AND c.comment ILIKE $1
            )
            ORDER BY p.created_at DESC, p.seq ASC
            "#
        );
        let rows = sqlx::query_as::<_, PhotoRow>(&query)
            .bind(like_pattern(text))
            .fetch_all(&self.pool)
            .await?;
        self.hydrate(rows).await
    }
}
