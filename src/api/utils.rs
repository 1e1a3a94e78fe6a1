//! API utility functions
//!
//! Pure, stateless helper functions for HTTP request processing, extracted
//! from services.rs for unit testing.

use axum::http::HeaderMap;
use http_body_util::BodyExt;

use crate::api::error::ApiError;

/// Header carrying the caller identity for a batch
pub const USER_HEADER: &str = "X-Indexwal-User";

/// Parses and validates the Content-Type header for application/json
///
/// Accepts:
/// - `application/json`
/// - `application/json; charset=utf-8`
///
/// Rejects:
/// - `application/jsonp`
/// - `text/json`
/// - Malformed media types
pub fn require_json_content_type(headers: &HeaderMap) -> Result<(), ApiError> {
    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;

    let media_type: mime::Mime = content_type.parse().map_err(|_| {
        ApiError::InvalidPayload(format!("invalid Content-Type: {}", content_type))
    })?;

    if media_type.type_() != mime::APPLICATION || media_type.subtype() != mime::JSON {
        return Err(ApiError::InvalidPayload(format!(
            "Content-Type must be application/json, got: {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    Ok(())
}

/// Extracts the required caller identity from the `X-Indexwal-User` header
pub fn require_user_header(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            ApiError::InvalidPayload(format!("{} header is required", USER_HEADER))
        })
}

/// Reads the request body and enforces the size limit
///
/// Decompression is handled by RequestDecompressionLayer middleware, so this
/// receives already-decompressed data.
pub async fn read_body(body: axum::body::Body, max_size: usize) -> Result<Vec<u8>, ApiError> {
    let data = body
        .collect()
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .to_bytes()
        .to_vec();

    if data.len() > max_size {
        return Err(ApiError::PayloadTooLarge(data.len()));
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_content_type(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    #[test]
    fn test_content_type_valid() {
        assert!(require_json_content_type(&headers_with_content_type("application/json")).is_ok());
        assert!(require_json_content_type(&headers_with_content_type(
            "application/json; charset=utf-8"
        ))
        .is_ok());
    }

    #[test]
    fn test_content_type_invalid() {
        assert!(require_json_content_type(&headers_with_content_type("text/json")).is_err());
        assert!(
            require_json_content_type(&headers_with_content_type("application/jsonp")).is_err()
        );
        assert!(require_json_content_type(&headers_with_content_type("text/plain")).is_err());
        assert!(require_json_content_type(&HeaderMap::new()).is_err());
    }

    #[test]
    fn test_user_header_required() {
        let mut headers = HeaderMap::new();
        assert!(require_user_header(&headers).is_err());

        headers.insert(USER_HEADER, HeaderValue::from_static(""));
        assert!(require_user_header(&headers).is_err());

        headers.insert(USER_HEADER, HeaderValue::from_static("user-1"));
        assert_eq!(require_user_header(&headers).unwrap(), "user-1");
    }

    #[tokio::test]
    async fn test_read_body_enforces_limit() {
        let body = axum::body::Body::from(vec![0u8; 100]);
        assert!(read_body(body, 100).await.is_ok());

        let body = axum::body::Body::from(vec![0u8; 101]);
        let result = read_body(body, 100).await;
        assert!(matches!(result, Err(ApiError::PayloadTooLarge(101))));
    }
}
