use thiserror::Error;

use crate::HandshakeState;

pub type Result<T> = std::result::Result<T, Error>;
pub type SignResult<T> = std::result::Result<T, SignError>;
pub type TokenReaderResult<T> = std::result::Result<T, TokenReaderError>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("OAuth sign failed : {0}")]
    Signer(#[from] SignError),
    #[error("token acquisition failed : {0}")]
    TokenFetch(#[source] HandshakeError),
    #[error("token authorization failed : {0}")]
    Authorization(#[source] HandshakeError),
    #[error("session validation failed : {0}")]
    SessionValidation(#[source] HandshakeError),
    #[error("no OAuth token present, fetch a request token first")]
    MissingToken,
    #[error("no OAuth verifier present, authorize the request token first")]
    MissingVerifier,
    #[error("handshake step requires state {expected}, but the client is {actual}")]
    OutOfOrder {
        expected: HandshakeState,
        actual: HandshakeState,
    },
    #[error("malformed token response : {0}")]
    TokenReader(#[from] TokenReaderError),
    #[error("request failed with status {status} : {body}")]
    Request { status: u16, body: String },
    #[error("request failed : {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("response is not valid JSON : {0}")]
    ResponseDecode(#[from] serde_json::Error),
    #[error("invalid url : {0}")]
    Url(#[from] url::ParseError),
    #[error("could not encode request data : {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),
}

#[derive(Error, Debug, Clone)]
pub enum SignError {
    #[error("consumer key must not be empty")]
    MissingConsumerKey,
    #[error("{0} contains control characters")]
    MalformedSecret(&'static str),
    #[error("generated Authorization header is not a valid header value : {0}")]
    InvalidHeader(String),
}

#[derive(Error, Debug, Clone)]
pub enum TokenReaderError {
    #[error("response has malformed format: not found {0} in {1}")]
    TokenKeyNotFound(&'static str, String),
}

/// Why a handshake step failed on the server side.
#[derive(Error, Debug, Clone)]
pub enum HandshakeError {
    #[error("server rejected the request with status {status} : {body}")]
    Rejected { status: u16, body: String },
    #[error("{0}")]
    Malformed(#[from] TokenReaderError),
}

impl Error {
    /// Re-labels a server-side failure of a handshake step.
    ///
    /// Transport, signing and precondition errors pass through untouched.
    pub(crate) fn into_handshake(self, wrap: fn(HandshakeError) -> Error) -> Error {
        match self {
            Error::Request { status, body } => wrap(HandshakeError::Rejected { status, body }),
            Error::TokenReader(err) => wrap(HandshakeError::Malformed(err)),
            other => other,
        }
    }
}
