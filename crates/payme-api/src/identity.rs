//! Device identity cookie
//!
//! Every browser gets a random device id on its first request. The id scopes
//! payment records and user metadata, there is no sign-in.

use axum::extract::Request;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

pub const USER_COOKIE: &str = "payme_user";

/// Device id of the current request, inserted by `device_identity`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn new_device_id() -> String {
    Uuid::new_v4().to_string()
}

/// Only ids in the shape `new_device_id` issues are accepted
fn is_valid_id(value: &str) -> bool {
    Uuid::parse_str(value)
        .map(|id| id.get_version_num() == 4 && id.hyphenated().to_string() == value)
        .unwrap_or(false)
}

/// Device id carried by the request cookies, if well-formed
pub fn device_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == USER_COOKIE && is_valid_id(value))
        .map(|(_, value)| value.to_string())
}

pub fn cookie_header(device_id: &str) -> String {
    format!(
        "{}={}; Path=/; Max-Age=31536000; SameSite=Lax; HttpOnly",
        USER_COOKIE, device_id
    )
}

/// Middleware: resolve or issue the device id
pub async fn device_identity(mut request: Request, next: Next) -> Response {
    let existing = device_id_from_headers(request.headers());
    let issued = existing.is_none();
    let device_id = existing.unwrap_or_else(new_device_id);
    request.extensions_mut().insert(DeviceId(device_id.clone()));

    let mut response = next.run(request).await;
    // A handler that issued its own identity wins
    if issued && !response.headers().contains_key(SET_COOKIE) {
        log::debug!("Issued device id {}", device_id);
        if let Ok(value) = HeaderValue::from_str(&cookie_header(&device_id)) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; payme_user=9f0e8a52-1c3b-4d6e-8f7a-2b4c6d8e0a11; x=1"),
        );
        assert_eq!(
            device_id_from_headers(&headers).as_deref(),
            Some("9f0e8a52-1c3b-4d6e-8f7a-2b4c6d8e0a11")
        );

        headers.insert(COOKIE, HeaderValue::from_static("payme_user=attacker-1"));
        assert_eq!(device_id_from_headers(&headers), None);

        headers.insert(COOKIE, HeaderValue::from_static("payme_user=<script>"));
        assert_eq!(device_id_from_headers(&headers), None);
        assert_eq!(device_id_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_only_canonical_v4_ids_are_valid() {
        assert!(is_valid_id("9f0e8a52-1c3b-4d6e-8f7a-2b4c6d8e0a11"));
        // Version 1
        assert!(!is_valid_id("9f0e8a52-1c3b-1d6e-8f7a-2b4c6d8e0a11"));
        // Upper case and simple forms
        assert!(!is_valid_id("9F0E8A52-1C3B-4D6E-8F7A-2B4C6D8E0A11"));
        assert!(!is_valid_id("9f0e8a521c3b4d6e8f7a2b4c6d8e0a11"));
        assert!(!is_valid_id(""));
    }

    #[test]
    fn test_new_ids_are_valid_and_unique() {
        let a = new_device_id();
        let b = new_device_id();
        assert!(is_valid_id(&a));
        assert_ne!(a, b);
        assert!(cookie_header(&a).starts_with("payme_user="));
    }
}
