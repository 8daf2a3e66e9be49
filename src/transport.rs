use std::sync::Arc;

use http::header::AUTHORIZATION;
use reqwest::blocking::{Client as ReqwestClient, Response};
use reqwest::cookie::{CookieStore, Jar};
use tracing::{debug, warn};
use url::Url;

use crate::{Error, Request, Result, SessionCookie};

/// A blocking reqwest client bound to its own cookie jar.
///
/// Every request sent through the context picks up matching cookies from the
/// jar and stores any `Set-Cookie` it receives.
#[derive(Debug)]
pub struct HttpContext {
    inner: ReqwestClient,
    jar: Arc<Jar>,
}

impl HttpContext {
    /// Constructs a new `HttpContext` with an empty cookie jar.
    ///
    /// # Errors
    ///
    /// This method fails if the underlying reqwest client cannot be built,
    /// e.g. when the TLS backend fails to initialize.
    pub fn new() -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let inner = ReqwestClient::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()?;
        Ok(HttpContext { inner, jar })
    }

    pub fn set_session_cookie(&self, cookie: &SessionCookie) -> Result<()> {
        let scope = cookie.scope()?;
        self.jar.add_cookie_str(&cookie.to_string(), &scope);
        Ok(())
    }

    /// The `Cookie` header the jar would send to `url`, if any.
    pub fn cookies_for(&self, url: &Url) -> Option<String> {
        self.jar
            .cookies(url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    /// Sends `request` with its literal verb.
    ///
    /// # Errors
    ///
    /// Transport failures surface as [`Error::Reqwest`], non-2xx responses as
    /// [`Error::Request`] carrying status and body.
    pub fn dispatch(&self, request: Request) -> Result<Response> {
        let (method, url, headers, body) = request.into_parts();
        let signed = headers.contains_key(AUTHORIZATION);
        debug!(%method, %url, signed, "dispatching request");

        let mut builder = self.inner.request(method.into(), url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let response = builder.send()?;

        let status = response.status();
        if !status.is_success() {
            let url = response.url().clone();
            let body = match response.text() {
                Ok(body) => body,
                Err(err) => {
                    warn!(%url, error = %err, "could not read error response body");
                    String::new()
                }
            };
            warn!(status = status.as_u16(), %url, "request was not successful");
            return Err(Error::Request {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}
