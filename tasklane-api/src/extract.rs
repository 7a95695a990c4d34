/// Request extractors with JSON error bodies
///
/// axum's own `Json`, `Path` and `Query` reject with plain-text bodies.
/// These wrappers route the rejection through [`ApiError`] so malformed
/// input gets the same `{error, code}` shape as every other failure.
///
/// # Example
///
/// ```
/// use tasklane_api::extract::{ApiJson, ApiPath};
/// use uuid::Uuid;
///
/// #[derive(serde::Deserialize)]
/// struct Rename { name: String }
///
/// async fn rename(ApiPath(id): ApiPath<Uuid>, ApiJson(body): ApiJson<Rename>) -> String {
///     format!("{} -> {}", id, body.name)
/// }
/// ```

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
