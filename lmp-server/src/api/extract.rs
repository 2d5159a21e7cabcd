//! Request body extraction

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::header,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON request body where an absent body reads as `T::default()`
///
/// Requests without a JSON content type or with an empty body get the
/// default value, so handlers report their own validation messages.
/// A malformed JSON body is still a 400.
#[derive(Debug, Clone, Default)]
pub struct JsonBody<T>(pub T);

fn is_json_content(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.starts_with("application/json") || ct.contains("+json")
        })
        .unwrap_or(false)
}

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = is_json_content(&req);
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;

        if !is_json || bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonBody(T::default()));
        }
        let Json(value) = Json::<T>::from_bytes(&bytes)?;
        Ok(JsonBody(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode};
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Named {
        name: Option<String>,
    }

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_missing_body_is_default() {
        let JsonBody(value) = JsonBody::<Named>::from_request(request(None, ""), &())
            .await
            .unwrap();
        assert_eq!(value, Named::default());

        let JsonBody(value) =
            JsonBody::<Named>::from_request(request(Some("application/json"), "  "), &())
                .await
                .unwrap();
        assert_eq!(value, Named::default());
    }

    #[tokio::test]
    async fn test_json_body_is_parsed() {
        let req = request(Some("application/json; charset=utf-8"), r#"{"name":"Mix"}"#);
        let JsonBody(value) = JsonBody::<Named>::from_request(req, &()).await.unwrap();
        assert_eq!(value.name.as_deref(), Some("Mix"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let req = request(Some("application/json"), "{nope");
        let err = JsonBody::<Named>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
