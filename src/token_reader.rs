use std::collections::HashMap;

use reqwest::blocking::Response;
use serde::Deserialize;

use crate::{Result, Token, TokenReaderError, TokenReaderResult, OAUTH_VERIFIER_KEY};

const OAUTH_TOKEN_KEY: &str = "oauth_token";

const OAUTH_TOKEN_SECRET_KEY: &str = "oauth_token_secret";

/// Represents response of token acquisition.
#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    /// OAuth Token
    pub oauth_token: String,
    /// OAuth Token Secret
    pub oauth_token_secret: String,
    /// Other contents
    #[serde(flatten)]
    pub remain: HashMap<String, String>,
}

impl From<TokenResponse> for Token {
    fn from(resp: TokenResponse) -> Self {
        Token::new(resp.oauth_token, resp.oauth_token_secret)
    }
}

/// Reads the URL-encoded bodies returned by the OAuth endpoints.
// this trait is sealed
pub trait TokenReader: private::Sealed {
    fn parse_oauth_token(self) -> Result<TokenResponse>;

    fn parse_oauth_verifier(self) -> Result<String>;
}

impl TokenReader for Response {
    fn parse_oauth_token(self) -> Result<TokenResponse> {
        let text = self.text()?;
        Ok(read_oauth_token(text)?)
    }

    fn parse_oauth_verifier(self) -> Result<String> {
        let text = self.text()?;
        Ok(read_oauth_verifier(text)?)
    }
}

fn destructure(text: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(text.trim().as_bytes())
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

pub fn read_oauth_token(text: String) -> TokenReaderResult<TokenResponse> {
    let mut destructured = destructure(&text);
    let oauth_token = destructured.remove(OAUTH_TOKEN_KEY);
    let oauth_token_secret = destructured.remove(OAUTH_TOKEN_SECRET_KEY);
    match (oauth_token, oauth_token_secret) {
        (Some(t), Some(s)) => Ok(TokenResponse {
            oauth_token: t,
            oauth_token_secret: s,
            remain: destructured,
        }),
        (None, _) => Err(TokenReaderError::TokenKeyNotFound(OAUTH_TOKEN_KEY, text)),
        (_, _) => Err(TokenReaderError::TokenKeyNotFound(
            OAUTH_TOKEN_SECRET_KEY,
            text,
        )),
    }
}

pub fn read_oauth_verifier(text: String) -> TokenReaderResult<String> {
    match destructure(&text).remove(OAUTH_VERIFIER_KEY) {
        Some(verifier) => Ok(verifier),
        None => Err(TokenReaderError::TokenKeyNotFound(OAUTH_VERIFIER_KEY, text)),
    }
}

mod private {
    use reqwest::blocking::Response;

    pub trait Sealed {}
    impl Sealed for Response {}
}
