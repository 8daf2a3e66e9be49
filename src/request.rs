// ----------------------------------------------------------------------------
// This source code contains derived artifacts from seanmonstar's `reqwest`.
// for further information(including license information),
// please visit their repository: https://github.com/seanmonstar/reqwest .
// ----------------------------------------------------------------------------

use std::fmt;

use http::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use oauth1_request::signature_method::SignatureMethod;
use serde::Serialize;
use url::Url;

use crate::{Result, SecretsProvider, SignError, SignResult, Signer};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP verbs the API is called with.
///
/// The transport dispatches exactly this verb and the signer signs it, so a
/// `PUT` or `DELETE` never degrades to the verb a body would imply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl Default for Method {
    fn default() -> Self {
        Method::Get
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Delete => http::Method::DELETE,
        }
    }
}

/// A single outbound request, built up before it is (optionally) signed and
/// handed to the transport.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<String>,
}

impl Request {
    /// A `POST` starts out with an empty body rather than none.
    pub fn new(method: Method, url: Url) -> Self {
        let body = match method {
            Method::Post => Some(String::new()),
            _ => None,
        };
        Request {
            method,
            url,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// Modify the query string of the URL.
    ///
    /// This method appends and does not overwrite, so a repeated key shows
    /// up twice in the query string.
    ///
    /// # Errors
    /// This method fails if `query` cannot be serialized into a query string.
    pub fn query<T: Serialize + ?Sized>(mut self, query: &T) -> Result<Self> {
        {
            let mut pairs = self.url.query_pairs_mut();
            let serializer = serde_urlencoded::Serializer::new(&mut pairs);
            query.serialize(serializer)?;
        }
        // cleanup
        if let Some("") = self.url.query() {
            self.url.set_query(None);
        }
        Ok(self)
    }

    /// Send a URL-encoded form body.
    ///
    /// # Errors
    /// This method fails if `form` cannot be serialized as a form.
    pub fn form<T: Serialize + ?Sized>(mut self, form: &T) -> Result<Self> {
        let body = serde_urlencoded::to_string(form)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        self.body = Some(body);
        Ok(self)
    }

    /// Add a `Header` to this Request.
    pub fn header(mut self, key: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Add a set of Headers to the existing ones on this Request.
    ///
    /// The headers will be merged in to any already set.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Sets the `Authorization` header produced by `signer`.
    pub fn sign<TSecretsProvider, TSignatureMethod>(
        mut self,
        signer: &Signer<'_, TSecretsProvider, TSignatureMethod>,
    ) -> SignResult<Self>
    where
        TSecretsProvider: SecretsProvider,
        TSignatureMethod: SignatureMethod + Clone,
    {
        let payload = self.body.as_deref().unwrap_or_default();
        let authorization = signer.generate_signature(self.method, &self.url, payload)?;
        let value = HeaderValue::from_str(&authorization)
            .map_err(|err| SignError::InvalidHeader(err.to_string()))?;
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers_ref(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub(crate) fn into_parts(self) -> (Method, Url, HeaderMap, Option<String>) {
        (self.method, self.url, self.headers, self.body)
    }
}
