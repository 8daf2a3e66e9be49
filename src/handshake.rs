//! OAuth handshake state, threaded through the client as a value.
//!
//! Every transition consumes the current [`Handshake`] and returns the next
//! one. The `require_*` checks run before a step touches the network.

use std::fmt;

use crate::{Error, Result, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeState {
    Unauthenticated,
    RequestTokenObtained,
    Authorized,
    AccessGranted,
    SessionActive,
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandshakeState::Unauthenticated => "unauthenticated",
            HandshakeState::RequestTokenObtained => "request-token-obtained",
            HandshakeState::Authorized => "authorized",
            HandshakeState::AccessGranted => "access-granted",
            HandshakeState::SessionActive => "session-active",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    state: HandshakeState,
    token: Token,
}

impl Default for Handshake {
    fn default() -> Self {
        Handshake {
            state: HandshakeState::Unauthenticated,
            token: Token::default(),
        }
    }
}

impl Handshake {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    /// The token to authorize. Fails when no request token has been fetched.
    pub fn require_request_token(&self) -> Result<&Token> {
        if self.token.is_empty() {
            Err(Error::MissingToken)
        } else {
            Ok(&self.token)
        }
    }

    /// The token to exchange for an access token; it must carry a verifier.
    pub fn require_verifier(&self) -> Result<&Token> {
        let token = self.require_request_token()?;
        match token.verifier() {
            Some(_) => Ok(token),
            None => Err(Error::MissingVerifier),
        }
    }

    /// The access token a session is validated with.
    pub fn require_access_token(&self) -> Result<&Token> {
        let token = self.require_request_token()?;
        match self.state {
            HandshakeState::AccessGranted | HandshakeState::SessionActive => Ok(token),
            actual => Err(Error::OutOfOrder {
                expected: HandshakeState::AccessGranted,
                actual,
            }),
        }
    }

    pub fn request_token_obtained(self, token: Token) -> Self {
        Handshake {
            state: HandshakeState::RequestTokenObtained,
            token,
        }
    }

    pub fn authorized<T: Into<String>>(self, verifier: T) -> Self {
        Handshake {
            state: HandshakeState::Authorized,
            token: self.token.with_verifier(verifier),
        }
    }

    /// Replaces the token wholesale; the verifier does not survive.
    pub fn access_granted(self, token: Token) -> Self {
        Handshake {
            state: HandshakeState::AccessGranted,
            token,
        }
    }

    pub fn session_active(self) -> Self {
        Handshake {
            state: HandshakeState::SessionActive,
            ..self
        }
    }
}
