use std::fmt;

use url::Url;

use crate::{Result, SESSION_COOKIE_NAME};

/// The `openx3_access_token` cookie that authenticates data-plane calls.
///
/// Host-only for the configured domain, path `/`, not secure, and without
/// expiry, so it lives as long as the client's cookie jar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    domain: String,
    value: String,
}

impl SessionCookie {
    pub fn new<TDomain, TValue>(domain: TDomain, access_token_key: TValue) -> Self
    where
        TDomain: Into<String>,
        TValue: Into<String>,
    {
        SessionCookie {
            domain: domain.into(),
            value: access_token_key.into(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// URL the cookie is stored against in the jar.
    pub fn scope(&self) -> Result<Url> {
        Ok(Url::parse(&format!("http://{}/", self.domain))?)
    }
}

/// Renders the cookie as a `Set-Cookie` header value.
impl fmt::Display for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; Path=/", SESSION_COOKIE_NAME, self.value)
    }
}
