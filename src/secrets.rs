use std::fmt;

pub trait SecretsProvider {
    fn get_consumer_key_pair<'a>(&'a self) -> (&'a str, &'a str);

    fn get_token_pair_option<'a>(&'a self) -> Option<(&'a str, &'a str)>;

    fn get_token_option_pair<'a>(&'a self) -> (Option<&'a str>, Option<&'a str>) {
        self.get_token_pair_option()
            .map(|s| (Some(s.0), Some(s.1)))
            .unwrap_or_else(|| (None, None))
    }
}

/// Consumer key and secret issued by the API provider.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    consumer_key: String,
    consumer_secret: String,
}

impl Credentials {
    pub fn new<TKey, TSecret>(consumer_key: TKey, consumer_secret: TSecret) -> Self
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        Credentials {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
        }
    }

    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .finish()
    }
}

impl SecretsProvider for Credentials {
    fn get_consumer_key_pair<'a>(&'a self) -> (&'a str, &'a str) {
        (&self.consumer_key, &self.consumer_secret)
    }

    fn get_token_pair_option<'a>(&'a self) -> Option<(&'a str, &'a str)> {
        None
    }
}

/// An OAuth token: request token or access token, plus the verifier once
/// the request token has been authorized.
///
/// The empty token (empty key and secret) is the starting point of the
/// handshake.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Token {
    key: String,
    secret: String,
    verifier: Option<String>,
}

impl Token {
    pub fn new<TKey, TSecret>(key: TKey, secret: TSecret) -> Self
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        Token {
            key: key.into(),
            secret: secret.into(),
            verifier: None,
        }
    }

    /// Returns the same token with `verifier` attached.
    pub fn with_verifier<T>(self, verifier: T) -> Self
    where
        T: Into<String>,
    {
        Token {
            verifier: Some(verifier.into()),
            ..self
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn verifier(&self) -> Option<&str> {
        self.verifier.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .field("verifier", &self.verifier)
            .finish()
    }
}

/// Borrowed view of everything needed to sign one request.
#[derive(Debug, Clone, Copy)]
pub struct Secrets<'a> {
    credentials: &'a Credentials,
    token: Option<&'a Token>,
}

impl<'a> Secrets<'a> {
    pub fn new(credentials: &'a Credentials) -> Self {
        Secrets {
            credentials,
            token: None,
        }
    }

    pub fn token(self, token: &'a Token) -> Self {
        Secrets {
            token: Some(token),
            ..self
        }
    }
}

impl SecretsProvider for Secrets<'_> {
    fn get_consumer_key_pair<'a>(&'a self) -> (&'a str, &'a str) {
        self.credentials.get_consumer_key_pair()
    }

    fn get_token_pair_option<'a>(&'a self) -> Option<(&'a str, &'a str)> {
        self.token.map(|t| (t.key(), t.secret()))
    }
}
