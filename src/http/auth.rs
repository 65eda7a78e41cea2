// src/http/auth.rs

//! HTTP Basic authentication for calls.

use std::collections::HashMap;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Realm announced in `WWW-Authenticate` challenges.
pub const REALM: &str = "autoapply";

/// Known credentials, keyed by `base64(username:password)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authentication {
    users: HashMap<String, String>,
}

impl Authentication {
    /// Build from `(username, password)` pairs. Both parts must be non-empty.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut users = HashMap::new();
        for (username, password) in pairs {
            if username.is_empty() {
                return Err("username is missing or invalid!".to_string());
            }
            if password.is_empty() {
                return Err("password is missing or invalid!".to_string());
            }
            let token = STANDARD.encode(format!("{username}:{password}"));
            users.insert(token, username);
        }
        Ok(Self { users })
    }

    /// Parse `username:password` lines as found in credential files and
    /// environment variables.
    ///
    /// Blank lines and lines starting with `#` are skipped. Returns `None`
    /// when there are no entries at all.
    pub fn parse(content: &str) -> Result<Option<Self>, String> {
        let pairs = content
            .lines()
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| {
                let (username, password) = line.split_once(':').unwrap_or((line, ""));
                (username.to_string(), password.to_string())
            })
            .collect::<Vec<_>>();

        if pairs.is_empty() {
            return Ok(None);
        }
        Self::from_pairs(pairs).map(Some)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Resolve the username for a `Basic <token>` credential.
    pub fn username_for_token(&self, token: &str) -> Option<&str> {
        self.users.get(token).map(String::as_str)
    }

    /// Check the `Authorization` header of a request, returning the
    /// authenticated username.
    pub fn authenticate(&self, headers: &HeaderMap) -> Option<&str> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        self.username_for_token(token.trim())
    }

    /// Value for the `WWW-Authenticate` response header.
    pub fn challenge() -> String {
        format!("Basic realm=\"{REALM}\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn encodes_credentials_as_basic_tokens() {
        let auth =
            Authentication::from_pairs([("username".to_string(), "password".to_string())]).unwrap();
        assert_eq!(
            auth.username_for_token("dXNlcm5hbWU6cGFzc3dvcmQ="),
            Some("username")
        );
    }

    #[test]
    fn rejects_missing_parts() {
        let err = Authentication::from_pairs([(String::new(), "x".to_string())]).unwrap_err();
        assert_eq!(err, "username is missing or invalid!");
        let err = Authentication::from_pairs([("x".to_string(), String::new())]).unwrap_err();
        assert_eq!(err, "password is missing or invalid!");
    }

    #[test]
    fn parses_credential_lines() {
        let auth = Authentication::parse("# comment\n\nusername:password\nusername2:password")
            .unwrap()
            .unwrap();
        assert_eq!(auth.len(), 2);
        assert_eq!(
            auth.username_for_token("dXNlcm5hbWUyOnBhc3N3b3Jk"),
            Some("username2")
        );

        assert_eq!(Authentication::parse("").unwrap(), None);
        assert_eq!(
            Authentication::parse(":password").unwrap_err(),
            "username is missing or invalid!"
        );
        assert_eq!(
            Authentication::parse("username:").unwrap_err(),
            "password is missing or invalid!"
        );
    }

    #[test]
    fn password_may_contain_colons() {
        let auth = Authentication::parse("user:pa:ss").unwrap().unwrap();
        let token = STANDARD.encode("user:pa:ss");
        assert_eq!(auth.username_for_token(&token), Some("user"));
    }

    #[test]
    fn authenticates_basic_header() {
        let auth =
            Authentication::from_pairs([("user".to_string(), "secret".to_string())]).unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(auth.authenticate(&headers), None);

        let token = STANDARD.encode("user:secret");
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {token}")).unwrap(),
        );
        assert_eq!(auth.authenticate(&headers), Some("user"));

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert_eq!(auth.authenticate(&headers), None);
    }
}
