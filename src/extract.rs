use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::AppError;

/// ApiPath Extractor
///
/// `axum::extract::Path` whose rejection is an `AppError::Validation`, so a malformed
/// id answers 400 with the usual `{"message"}` body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| ApiPath(value))
            .map_err(|rejection| AppError::validation(rejection.body_text()))
    }
}

/// CommentPath Extractor
///
/// `{photo_id}/{comment_id}` of the comment routes. A malformed photo id is a 400;
/// a comment id that is not a number names no comment and answers 404.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentPath {
    pub photo_id: Uuid,
    pub comment_id: i64,
}

impl<S> FromRequestParts<S> for CommentPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ApiPath((photo_id, comment_id)) =
            ApiPath::<(String, String)>::from_request_parts(parts, state).await?;

        let photo_id = photo_id
            .parse::<Uuid>()
            .map_err(|_| AppError::validation("Invalid photo id"))?;
        let comment_id = comment_id
            .parse::<i64>()
            .map_err(|_| AppError::not_found("Comment not found"))?;

        Ok(CommentPath {
            photo_id,
            comment_id,
        })
    }
}
