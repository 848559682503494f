use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use reqwest::header::HeaderValue;

use crate::error::{JiraError, Result};

/// Builds an HTTP Basic `Authorization` header value for the given credentials.
pub fn basic_auth_header(username: &str, password: &str) -> Result<HeaderValue> {
    if username.contains(':') {
        return Err(JiraError::Authentication(
            "username must not contain ':'".to_string(),
        ));
    }
    let encoded = BASE64_STANDARD.encode(format!("{}:{}", username, password));
    let mut value = HeaderValue::from_str(&format!("Basic {}", encoded))
        .map_err(|err| JiraError::Authentication(err.to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::basic_auth_header;
    use crate::error::JiraError;

    #[test]
    fn encodes_credentials_as_basic_scheme() {
        let value = basic_auth_header("Aladdin", "open sesame").expect("header");
        assert_eq!(value.to_str().unwrap(), "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
        assert!(value.is_sensitive());
    }

    #[test]
    fn rejects_username_with_colon() {
        let err = basic_auth_header("a:b", "pw").unwrap_err();
        assert!(matches!(err, JiraError::Authentication(_)));
    }
}
