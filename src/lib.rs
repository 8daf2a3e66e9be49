/*!
ox3-api-client: the OpenX 3 API over reqwest, signed with oauth1-request.

# Overview

This library logs in to the OpenX 3 API with the OAuth 1.0a three-legged
handshake, turns the resulting access token into the `openx3_access_token`
session cookie, and then issues cookie-authenticated calls whose JSON
responses are decoded with serde.

All calls are blocking. Each [`ApiClient`] owns its own HTTP client and
cookie jar; nothing is installed process-wide.

# How to use

## Headless login and a first API call

```rust,no_run
use ox3_api_client::{ApiClient, Result};
use serde_json::Value;

fn main() -> Result<()> {
    // prepare authorization info
    let mut client = ApiClient::new(
        "ui.example.com",
        "example_realm",
        "[CONSUMER_KEY]",
        "[CONSUMER_SECRET]",
    )?;

    // step 1: acquire request token & token secret
    client.fetch_request_token()?;
    // step 2: log in to authorize it, which yields the verifier
    client.authorize_token("user@example.com", "[PASSWORD]")?;
    // step 3: exchange it for the access token
    client.fetch_access_token()?;
    // step 4: store the session cookie and validate it
    client.validate_session()?;

    let accounts: Value = client.get("/a/account")?;
    println!("{:#}", accounts);
    Ok(())
}
```

## Authorizing in a browser

```rust,no_run
use std::io;

use ox3_api_client::{ApiClient, ClientConfig, Credentials};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::new("ui.example.com", "example_realm")
        .callback_url("https://app.example.com/oauth/callback");
    let mut client = ApiClient::with_config(
        config,
        Credentials::new("[CONSUMER_KEY]", "[CONSUMER_SECRET]"),
    )?;

    let request_token = client.fetch_request_token()?;
    println!("please authorize token {} and paste the verifier:", request_token.key());

    let mut user_input = String::new();
    io::stdin().read_line(&mut user_input)?;
    client.set_verifier(user_input.trim())?;

    client.fetch_access_token()?;
    client.validate_session()?;
    Ok(())
}
```
*/
mod client;
mod config;
mod error;
mod handshake;
mod request;
mod secrets;
mod session;
mod signer;
mod token_reader;
mod transport;

// exposed to external program
pub use client::ApiClient;
pub use config::{
    ClientConfig, ACCESS_TOKEN_URL, API_PATH, AUTHORIZATION_URL, DEFAULT_CALLBACK_URL,
    REQUEST_TOKEN_URL,
};
pub use error::{
    Error, HandshakeError, Result, SignError, SignResult, TokenReaderError, TokenReaderResult,
};
pub use handshake::{Handshake, HandshakeState};
pub use request::{Method, Request};
pub use secrets::{Credentials, Secrets, SecretsProvider, Token};
pub use session::SessionCookie;
pub use signer::{OAuthParameters, Signer};
pub use token_reader::{read_oauth_token, read_oauth_verifier, TokenReader, TokenResponse};
pub use transport::HttpContext;

// exposed constant variables
/// Represents `oauth_verifier`.
pub const OAUTH_VERIFIER_KEY: &str = "oauth_verifier";
/// Name of the cookie carrying the access token.
pub const SESSION_COOKIE_NAME: &str = "openx3_access_token";
