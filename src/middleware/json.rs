use axum::{
    Json,
    extract::{FromRequest, OptionalFromRequest, Request, rejection::JsonRejection},
};

use crate::error::AppError;

/// `Json` body extractor whose failures use the API error envelope (400 `ValidationError`)
/// instead of axum's plain-text rejection.
#[derive(Debug)]
pub struct AppJson<T>(pub T);

fn rejected(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = <Json<T> as FromRequest<S>>::from_request(req, state)
            .await
            .map_err(rejected)?;
        Ok(AppJson(value))
    }
}

// An absent body (no JSON content type) is `None`; a present but malformed one is still a 400.
impl<S, T> OptionalFromRequest<S> for AppJson<T>
where
    Json<T>: OptionalFromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        let value = <Json<T> as OptionalFromRequest<S>>::from_request(req, state)
            .await
            .map_err(rejected)?;
        Ok(value.map(|Json(v)| AppJson(v)))
    }
}
