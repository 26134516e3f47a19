//! HTTP Basic auth extractor (spec §6 "the username is normalized (trim +
//! lowercase) to the storage key; the password is forwarded as the
//! source-site password when crawling").

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::persistence::normalize_username;

use super::error::HttpError;

/// The authenticated account for one request. `storage_key` is the
/// normalized username used for every `QuizStore` call; `username` and
/// `password` are the raw credentials, forwarded verbatim to the source
/// site's login form during a crawl.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub username: String,
    pub storage_key: String,
    pub password: String,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(HttpError::Unauthorized)?;

        let (username, password) = decode_basic(header).ok_or(HttpError::Unauthorized)?;

        Ok(AuthenticatedUser {
            storage_key: normalize_username(&username),
            username,
            password,
        })
    }
}

fn decode_basic(header: &str) -> Option<(String, String)> {
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, password) = text.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_header(username: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
    }

    #[test]
    fn decodes_username_and_password() {
        let (user, pass) = decode_basic(&basic_header("Gary", "hunter2")).unwrap();
        assert_eq!(user, "Gary");
        assert_eq!(pass, "hunter2");
    }

    #[test]
    fn rejects_non_basic_scheme() {
        assert!(decode_basic("Bearer abc123").is_none());
    }

    #[test]
    fn rejects_malformed_base64() {
        assert!(decode_basic("Basic not-base64!!").is_none());
    }
}
