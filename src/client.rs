use std::mem;

use oauth1_request::HmacSha1;
use reqwest::blocking::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;
use url::Url;

use crate::config::Endpoints;
use crate::{
    ClientConfig, Credentials, Error, Handshake, HandshakeState, HttpContext, Method,
    OAuthParameters, Request, Result, Secrets, SessionCookie, Signer, Token, TokenReader,
};

/// Client for the OpenX 3 API.
///
/// Owns the consumer credentials, the handshake state and a cookie-carrying
/// HTTP context. Handshake steps take `&mut self` because they replace the
/// current token; data-plane calls only need `&self`.
#[derive(Debug)]
pub struct ApiClient {
    config: ClientConfig,
    endpoints: Endpoints,
    credentials: Credentials,
    handshake: Handshake,
    context: HttpContext,
}

impl ApiClient {
    /// Constructs a client against the production OpenX endpoints.
    ///
    /// # Errors
    ///
    /// This method fails if the underlying HTTP client cannot be built.
    pub fn new<TDomain, TRealm, TKey, TSecret>(
        domain: TDomain,
        realm: TRealm,
        consumer_key: TKey,
        consumer_secret: TSecret,
    ) -> Result<Self>
    where
        TDomain: Into<String>,
        TRealm: Into<String>,
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        Self::with_config(
            ClientConfig::new(domain, realm),
            Credentials::new(consumer_key, consumer_secret),
        )
    }

    /// Constructs a client from an explicit configuration.
    ///
    /// # Errors
    ///
    /// This method fails whenever an endpoint URL in `config` cannot be
    /// parsed, or the underlying HTTP client cannot be built.
    pub fn with_config(config: ClientConfig, credentials: Credentials) -> Result<Self> {
        let endpoints = config.endpoints()?;
        Ok(ApiClient {
            config,
            endpoints,
            credentials,
            handshake: Handshake::new(),
            context: HttpContext::new()?,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> HandshakeState {
        self.handshake.state()
    }

    pub fn token(&self) -> &Token {
        self.handshake.token()
    }

    pub fn context(&self) -> &HttpContext {
        &self.context
    }

    /// See [`ClientConfig::resolve`].
    pub fn resolve(&self, url: &str) -> Result<Url> {
        self.config.resolve(url)
    }

    // ------------------------------------------------------------------------
    // Request primitive

    /// Sends `request`, signing it first with the current token when `sign`
    /// is set.
    ///
    /// # Errors
    ///
    /// This method fails if signing fails (the request is then not sent), on
    /// transport errors, and on non-2xx responses.
    pub fn request(&self, request: Request, sign: bool) -> Result<Response> {
        let request = if sign {
            let token = self.handshake.token();
            let secrets = Secrets::new(&self.credentials).token(token);
            request.sign(&Signer::new(&secrets, self.oauth_parameters(token)))?
        } else {
            request
        };
        self.context.dispatch(request)
    }

    fn oauth_parameters<'a>(&'a self, token: &'a Token) -> OAuthParameters<'a, HmacSha1> {
        let params = OAuthParameters::new()
            .callback(self.config.callback())
            .realm(self.config.realm())
            .version(true);
        match token.verifier() {
            Some(verifier) => params.verifier(verifier),
            None => params,
        }
    }

    // ------------------------------------------------------------------------
    // OAuth handshake

    /// Fetches a request token and makes it the current token.
    ///
    /// # Errors
    ///
    /// [`Error::TokenFetch`] when the server rejects the request or answers
    /// without a token.
    pub fn fetch_request_token(&mut self) -> Result<Token> {
        let request = Request::new(Method::Post, self.endpoints.request_token.clone());
        let token = self
            .request(request, true)
            .and_then(|resp| resp.parse_oauth_token())
            .map_err(|err| err.into_handshake(Error::TokenFetch))?;

        self.handshake = mem::take(&mut self.handshake).request_token_obtained(token.into());
        info!(state = %self.state(), "request token obtained");
        Ok(self.token().clone())
    }

    /// Logs in with `email` and `password` to authorize the request token,
    /// attaching the returned verifier to it.
    ///
    /// # Errors
    ///
    /// [`Error::MissingToken`] if no request token has been fetched, and
    /// [`Error::Authorization`] when the login is rejected or no verifier
    /// comes back.
    pub fn authorize_token(&mut self, email: &str, password: &str) -> Result<()> {
        let token = self.handshake.require_request_token()?;
        let request = Request::new(Method::Post, self.endpoints.authorization.clone()).form(&[
            ("email", email),
            ("password", password),
            ("oauth_token", token.key()),
        ])?;
        let verifier = self
            .request(request, true)
            .and_then(|resp| resp.parse_oauth_verifier())
            .map_err(|err| err.into_handshake(Error::Authorization))?;

        self.set_verifier(verifier)
    }

    /// Attaches a verifier obtained out of band, e.g. after sending the user
    /// to the login page in a browser.
    ///
    /// # Errors
    ///
    /// [`Error::MissingToken`] if no request token has been fetched.
    pub fn set_verifier<T: Into<String>>(&mut self, verifier: T) -> Result<()> {
        self.handshake.require_request_token()?;
        self.handshake = mem::take(&mut self.handshake).authorized(verifier);
        info!(state = %self.state(), "request token authorized");
        Ok(())
    }

    /// Exchanges the authorized request token for an access token.
    ///
    /// # Errors
    ///
    /// [`Error::MissingToken`] / [`Error::MissingVerifier`] when the token has
    /// not been fetched or authorized, [`Error::TokenFetch`] when the server
    /// rejects the exchange.
    pub fn fetch_access_token(&mut self) -> Result<Token> {
        self.handshake.require_verifier()?;
        let request = Request::new(Method::Post, self.endpoints.access_token.clone());
        let token = self
            .request(request, true)
            .and_then(|resp| resp.parse_oauth_token())
            .map_err(|err| err.into_handshake(Error::TokenFetch))?;

        self.handshake = mem::take(&mut self.handshake).access_granted(token.into());
        info!(state = %self.state(), "access token obtained");
        Ok(self.token().clone())
    }

    /// Uses an access token obtained elsewhere.
    pub fn set_access_token(&mut self, token: Token) {
        self.handshake = mem::take(&mut self.handshake).access_granted(token);
        info!(state = %self.state(), "access token installed");
    }

    /// Stores the access token as the session cookie and validates the
    /// session with the API, returning the response body.
    ///
    /// # Errors
    ///
    /// [`Error::MissingToken`] / [`Error::OutOfOrder`] before an access token
    /// is present, and
    /// [`Error::SessionValidation`] when the API rejects the session.
    pub fn validate_session(&mut self) -> Result<String> {
        let token = self.handshake.require_access_token()?;
        let cookie = SessionCookie::new(self.config.domain(), token.key());
        self.context.set_session_cookie(&cookie)?;

        let request = Request::new(Method::Put, self.config.session_validate_url()?);
        let body = self
            .request(request, false)
            .and_then(|resp| Ok(resp.text()?))
            .map_err(|err| err.into_handshake(Error::SessionValidation))?;

        self.handshake = mem::take(&mut self.handshake).session_active();
        info!(state = %self.state(), "session validated");
        Ok(body)
    }

    // ------------------------------------------------------------------------
    // JSON convenience methods

    /// `GET` a path or URL and decode the JSON response.
    pub fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.call(Request::new(Method::Get, self.resolve(url)?))
    }

    /// `GET` with `query` appended to the URL.
    pub fn get_with<Q, T>(&self, url: &str, query: &Q) -> Result<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(Request::new(Method::Get, self.resolve(url)?).query(query)?)
    }

    /// `POST` with an empty body and decode the JSON response.
    pub fn post<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.call(Request::new(Method::Post, self.resolve(url)?))
    }

    /// `POST` `data` as a form body.
    pub fn post_with<D, T>(&self, url: &str, data: &D) -> Result<T>
    where
        D: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(Request::new(Method::Post, self.resolve(url)?).form(data)?)
    }

    pub fn put<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.call(Request::new(Method::Put, self.resolve(url)?))
    }

    pub fn put_with<D, T>(&self, url: &str, data: &D) -> Result<T>
    where
        D: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(Request::new(Method::Put, self.resolve(url)?).form(data)?)
    }

    pub fn delete<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.call(Request::new(Method::Delete, self.resolve(url)?))
    }

    fn call<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let text = self.request(request, false)?.text()?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::Value;
    use tokio::runtime::Runtime;
    use http::header::{HeaderName, HeaderValue};
    use wiremock::matchers::{
        body_string_contains, header, header_exists, header_regex, method, path,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::HandshakeError;

    // the blocking client must run outside the runtime that drives the mock
    struct MockApi {
        server: MockServer,
        runtime: Runtime,
    }

    impl MockApi {
        fn start() -> Self {
            let runtime = Runtime::new().unwrap();
            let server = runtime.block_on(MockServer::start());
            MockApi { server, runtime }
        }

        fn mount(&self, mock: Mock) {
            self.runtime.block_on(mock.mount(&self.server));
        }

        fn client(&self) -> ApiClient {
            let uri = self.server.uri();
            let config = ClientConfig::new(self.server.address().to_string(), "test_realm")
                .request_token_url(format!("{}/api/index/initiate", uri))
                .access_token_url(format!("{}/api/index/token", uri))
                .authorization_url(format!("{}/login/process", uri));
            ApiClient::with_config(config, Credentials::new("consumer-key", "consumer-secret"))
                .unwrap()
        }

        fn mount_handshake(&self) {
            self.mount(
                Mock::given(method("POST"))
                    .and(path("/api/index/initiate"))
                    .and(header_exists("authorization"))
                    .respond_with(ResponseTemplate::new(200).set_body_string(
                        "oauth_token=req-key&oauth_token_secret=req-secret&oauth_callback_confirmed=true",
                    )),
            );
            self.mount(
                Mock::given(method("POST"))
                    .and(path("/login/process"))
                    .and(header_exists("authorization"))
                    .and(body_string_contains("email=user%40example.com"))
                    .and(body_string_contains("password=hunter2"))
                    .and(body_string_contains("oauth_token=req-key"))
                    .respond_with(
                        ResponseTemplate::new(200).set_body_string("oauth_verifier=ver-123"),
                    ),
            );
            self.mount(
                Mock::given(method("POST"))
                    .and(path("/api/index/token"))
                    .and(header_exists("authorization"))
                    .respond_with(ResponseTemplate::new(200).set_body_string(
                        "oauth_token=acc-key&oauth_token_secret=acc-secret",
                    )),
            );
            self.mount(
                Mock::given(method("PUT"))
                    .and(path("/ox/3.0/a/session/validate"))
                    .and(header("cookie", "openx3_access_token=acc-key"))
                    .respond_with(ResponseTemplate::new(200).set_body_string("valid")),
            );
        }

        fn session_client(&self) -> ApiClient {
            self.mount_handshake();
            let mut client = self.client();
            client.fetch_request_token().unwrap();
            client.authorize_token("user@example.com", "hunter2").unwrap();
            client.fetch_access_token().unwrap();
            client.validate_session().unwrap();
            client
        }
    }

    #[derive(Deserialize)]
    struct Account {
        id: u64,
        name: String,
    }

    #[test]
    fn full_handshake_reaches_active_session() {
        let api = MockApi::start();
        api.mount_handshake();
        let mut client = api.client();
        assert_eq!(client.state(), HandshakeState::Unauthenticated);

        let request_token = client.fetch_request_token().unwrap();
        assert_eq!(request_token.key(), "req-key");
        assert_eq!(request_token.secret(), "req-secret");
        assert_eq!(client.state(), HandshakeState::RequestTokenObtained);

        client.authorize_token("user@example.com", "hunter2").unwrap();
        assert_eq!(client.state(), HandshakeState::Authorized);
        assert_eq!(client.token().verifier(), Some("ver-123"));

        let access_token = client.fetch_access_token().unwrap();
        assert_eq!(access_token.key(), "acc-key");
        assert_eq!(access_token.verifier(), None);
        assert_eq!(client.state(), HandshakeState::AccessGranted);

        assert_eq!(client.validate_session().unwrap(), "valid");
        assert_eq!(client.state(), HandshakeState::SessionActive);
    }

    #[test]
    fn session_cookie_rides_along_on_api_calls() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("GET"))
                .and(path("/ox/3.0/a/account"))
                .and(header("cookie", "openx3_access_token=acc-key"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_string(r#"{"id": 42, "name": "x"}"#),
                ),
        );
        let client = api.session_client();

        let resolved = client.resolve("/a/account").unwrap();
        assert_eq!(
            client.context().cookies_for(&resolved).as_deref(),
            Some("openx3_access_token=acc-key")
        );
        let account: Account = client.get("/a/account").unwrap();
        assert_eq!(account.id, 42);
        assert_eq!(account.name, "x");
    }

    #[test]
    fn authorize_before_request_token_fails() {
        let api = MockApi::start();
        let mut client = api.client();
        let err = client
            .authorize_token("user@example.com", "hunter2")
            .unwrap_err();
        assert!(matches!(err, Error::MissingToken));
        assert_eq!(client.state(), HandshakeState::Unauthenticated);
    }

    #[test]
    fn access_token_needs_verifier() {
        let api = MockApi::start();
        api.mount_handshake();
        let mut client = api.client();
        client.fetch_request_token().unwrap();
        assert!(matches!(
            client.fetch_access_token().unwrap_err(),
            Error::MissingVerifier
        ));
    }

    #[test]
    fn out_of_band_verifier_and_preset_access_token() {
        let api = MockApi::start();
        api.mount_handshake();
        let mut client = api.client();
        client.fetch_request_token().unwrap();
        client.set_verifier("ver-123").unwrap();
        assert_eq!(client.state(), HandshakeState::Authorized);

        let mut client = api.client();
        client.set_access_token(Token::new("acc-key", "acc-secret"));
        assert_eq!(client.validate_session().unwrap(), "valid");
    }

    #[test]
    fn rejected_request_token() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("POST"))
                .and(path("/api/index/initiate"))
                .respond_with(ResponseTemplate::new(401).set_body_string("invalid consumer")),
        );
        let mut client = api.client();
        match client.fetch_request_token().unwrap_err() {
            Error::TokenFetch(HandshakeError::Rejected { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid consumer");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(client.state(), HandshakeState::Unauthenticated);
    }

    #[test]
    fn malformed_request_token() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("POST"))
                .and(path("/api/index/initiate"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>")),
        );
        let mut client = api.client();
        assert!(matches!(
            client.fetch_request_token().unwrap_err(),
            Error::TokenFetch(HandshakeError::Malformed(_))
        ));
    }

    #[test]
    fn login_without_verifier_is_an_authorization_error() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("POST"))
                .and(path("/api/index/initiate"))
                .respond_with(ResponseTemplate::new(200).set_body_string(
                    "oauth_token=req-key&oauth_token_secret=req-secret",
                )),
        );
        api.mount(
            Mock::given(method("POST"))
                .and(path("/login/process"))
                .respond_with(ResponseTemplate::new(200).set_body_string("error=bad_login")),
        );
        let mut client = api.client();
        client.fetch_request_token().unwrap();
        assert!(matches!(
            client.authorize_token("user@example.com", "wrong").unwrap_err(),
            Error::Authorization(HandshakeError::Malformed(_))
        ));
        assert_eq!(client.state(), HandshakeState::RequestTokenObtained);
    }

    #[test]
    fn rejected_session() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("PUT"))
                .and(path("/ox/3.0/a/session/validate"))
                .respond_with(ResponseTemplate::new(401).set_body_string("expired")),
        );
        let mut client = api.client();
        client.set_access_token(Token::new("stale", "s"));
        assert!(matches!(
            client.validate_session().unwrap_err(),
            Error::SessionValidation(HandshakeError::Rejected { status: 401, .. })
        ));
        assert_eq!(client.state(), HandshakeState::AccessGranted);
    }

    #[test]
    fn validate_without_token_fails() {
        let api = MockApi::start();
        let mut client = api.client();
        assert!(matches!(
            client.validate_session().unwrap_err(),
            Error::MissingToken
        ));
    }

    #[test]
    fn put_and_delete_use_their_own_verb() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("PUT"))
                .and(path("/ox/3.0/a/site/7"))
                .and(body_string_contains("name=renamed"))
                .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id": 7}"#)),
        );
        api.mount(
            Mock::given(method("DELETE"))
                .and(path("/ox/3.0/a/site/7"))
                .respond_with(ResponseTemplate::new(200).set_body_string("true")),
        );
        let client = api.client();

        let updated: Value = client.put_with("/a/site/7", &[("name", "renamed")]).unwrap();
        assert_eq!(updated["id"], 7);
        let deleted: bool = client.delete("/a/site/7").unwrap();
        assert!(deleted);
    }

    #[test]
    fn server_cookies_join_the_session_cookie() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("GET"))
                .and(path("/ox/3.0/a/prime"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("set-cookie", "foo=bar; Path=/")
                        .set_body_string("{}"),
                ),
        );
        api.mount(
            Mock::given(method("GET"))
                .and(path("/ox/3.0/a/check"))
                .and(header_regex("cookie", "foo=bar"))
                .and(header_regex("cookie", "openx3_access_token=acc-key"))
                .respond_with(ResponseTemplate::new(200).set_body_string("true")),
        );
        let client = api.session_client();

        let _: Value = client.get("/a/prime").unwrap();
        let both: bool = client.get("/a/check").unwrap();
        assert!(both);
    }

    #[test]
    fn caller_headers_reach_the_wire_on_signed_requests() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("POST"))
                .and(path("/api/index/initiate"))
                .and(header("x-custom", "yes"))
                .and(header_regex("authorization", "^OAuth "))
                .respond_with(ResponseTemplate::new(200).set_body_string("ok")),
        );
        let client = api.client();

        let url = client.resolve(&format!("{}/api/index/initiate", api.server.uri())).unwrap();
        let request = Request::new(Method::Post, url).header(
            HeaderName::from_static("x-custom"),
            HeaderValue::from_static("yes"),
        );
        let response = client.request(request, true).unwrap();
        assert_eq!(response.text().unwrap(), "ok");
    }

    #[test]
    fn post_and_get_with_data() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("POST"))
                .and(path("/ox/3.0/a/site"))
                .and(body_string_contains("name=new+site"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_string(r#"{"id": 8, "name": "new site"}"#),
                ),
        );
        api.mount(
            Mock::given(method("GET"))
                .and(path("/ox/3.0/a/site"))
                .and(wiremock::matchers::query_param("limit", "5"))
                .respond_with(ResponseTemplate::new(200).set_body_string("[]")),
        );
        let client = api.client();

        let created: Account = client.post_with("/a/site", &[("name", "new site")]).unwrap();
        assert_eq!(created.id, 8);
        assert_eq!(created.name, "new site");
        let listed: Vec<Value> = client.get_with("/a/site", &[("limit", "5")]).unwrap();
        assert!(listed.is_empty());
    }

    #[test]
    fn non_json_body_is_a_decode_error() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("GET"))
                .and(path("/ox/3.0/a/user"))
                .respond_with(ResponseTemplate::new(200).set_body_string("not json")),
        );
        let client = api.client();
        assert!(matches!(
            client.get::<Value>("/a/user").unwrap_err(),
            Error::ResponseDecode(_)
        ));
    }

    #[test]
    fn non_success_status_is_a_request_error() {
        let api = MockApi::start();
        api.mount(
            Mock::given(method("GET"))
                .and(path("/ox/3.0/a/user"))
                .respond_with(ResponseTemplate::new(401).set_body_string("session expired")),
        );
        let client = api.client();
        match client.get::<Value>("/a/user").unwrap_err() {
            Error::Request { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "session expired");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn signing_failure_prevents_sending() {
        let api = MockApi::start();
        let config = ClientConfig::new(api.server.address().to_string(), "test_realm")
            .request_token_url(format!("{}/api/index/initiate", api.server.uri()));
        let mut client =
            ApiClient::with_config(config, Credentials::new("", "consumer-secret")).unwrap();
        assert!(matches!(
            client.fetch_request_token().unwrap_err(),
            Error::Signer(_)
        ));
        let received = api.runtime.block_on(api.server.received_requests());
        assert_eq!(received.map(|r| r.len()), Some(0));
    }
}
