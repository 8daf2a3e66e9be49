use url::Url;

use crate::Result;

/// Default request-token endpoint of the OpenX SSO.
pub const REQUEST_TOKEN_URL: &str = "https://sso.openx.com/api/index/initiate";
/// Default access-token endpoint of the OpenX SSO.
pub const ACCESS_TOKEN_URL: &str = "https://sso.openx.com/api/index/token";
/// Default authorization (login) endpoint of the OpenX SSO.
pub const AUTHORIZATION_URL: &str = "https://sso.openx.com/login/process";
/// Default API path prefix, appended to the domain.
pub const API_PATH: &str = "/ox/3.0";
/// Out-of-band callback, for logins without a browser.
pub const DEFAULT_CALLBACK_URL: &str = "oob";

const SESSION_VALIDATE_PATH: &str = "/a/session/validate";

/// Where the client talks to and how it identifies itself.
///
/// Only `domain` and `realm` are required; everything else defaults to the
/// production OpenX deployment and is overridable for testing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    domain: String,
    realm: String,
    callback_url: String,
    request_token_url: String,
    access_token_url: String,
    authorization_url: String,
    api_path: String,
}

#[derive(Debug)]
pub(crate) struct Endpoints {
    pub(crate) request_token: Url,
    pub(crate) access_token: Url,
    pub(crate) authorization: Url,
}

impl ClientConfig {
    pub fn new<TDomain, TRealm>(domain: TDomain, realm: TRealm) -> Self
    where
        TDomain: Into<String>,
        TRealm: Into<String>,
    {
        ClientConfig {
            domain: domain.into(),
            realm: realm.into(),
            callback_url: DEFAULT_CALLBACK_URL.to_string(),
            request_token_url: REQUEST_TOKEN_URL.to_string(),
            access_token_url: ACCESS_TOKEN_URL.to_string(),
            authorization_url: AUTHORIZATION_URL.to_string(),
            api_path: API_PATH.to_string(),
        }
    }

    pub fn callback_url<T: Into<String>>(self, callback_url: T) -> Self {
        ClientConfig {
            callback_url: callback_url.into(),
            ..self
        }
    }

    pub fn request_token_url<T: Into<String>>(self, request_token_url: T) -> Self {
        ClientConfig {
            request_token_url: request_token_url.into(),
            ..self
        }
    }

    pub fn access_token_url<T: Into<String>>(self, access_token_url: T) -> Self {
        ClientConfig {
            access_token_url: access_token_url.into(),
            ..self
        }
    }

    pub fn authorization_url<T: Into<String>>(self, authorization_url: T) -> Self {
        ClientConfig {
            authorization_url: authorization_url.into(),
            ..self
        }
    }

    pub fn api_path<T: Into<String>>(self, api_path: T) -> Self {
        ClientConfig {
            api_path: api_path.into(),
            ..self
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn callback(&self) -> &str {
        &self.callback_url
    }

    pub fn path_prefix(&self) -> &str {
        &self.api_path
    }

    /// Turns a bare API path into a full URL under `http://{domain}{api_path}`.
    ///
    /// Anything that already has a scheme is returned unchanged.
    ///
    /// # Errors
    ///
    /// This method fails whenever the resulting URL cannot be parsed.
    pub fn resolve(&self, url: &str) -> Result<Url> {
        match Url::parse(url) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let separator = if url.starts_with('/') { "" } else { "/" };
                let full = format!(
                    "http://{}{}{}{}",
                    self.domain, self.api_path, separator, url
                );
                Ok(Url::parse(&full)?)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn session_validate_url(&self) -> Result<Url> {
        self.resolve(SESSION_VALIDATE_PATH)
    }

    pub(crate) fn endpoints(&self) -> Result<Endpoints> {
        Ok(Endpoints {
            request_token: Url::parse(&self.request_token_url)?,
            access_token: Url::parse(&self.access_token_url)?,
            authorization: Url::parse(&self.authorization_url)?,
        })
    }
}
