use std::borrow::Cow;

use oauth1_request::signature_method::SignatureMethod;
use oauth1_request::signer::Signer as OAuthSigner;
use oauth1_request::{HmacSha1, Options};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::{Method, SecretsProvider, SignError, SignResult};

const OAUTH_IDENTIFIER: &str = "oauth_";
const REALM_IDENTIFIER: &str = "realm";

// RFC 3986 unreserved characters stay as they are
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone)]
pub struct Signer<'a, TSecretsProvider, TSignatureMethod>
where
    TSecretsProvider: SecretsProvider,
    TSignatureMethod: SignatureMethod + Clone,
{
    secrets: &'a TSecretsProvider,
    parameters: OAuthParameters<'a, TSignatureMethod>,
}

impl<'a, TSecretsProvider, TSignatureMethod> Signer<'a, TSecretsProvider, TSignatureMethod>
where
    TSecretsProvider: SecretsProvider,
    TSignatureMethod: SignatureMethod + Clone,
{
    pub fn new(
        secrets: &'a TSecretsProvider,
        parameters: OAuthParameters<'a, TSignatureMethod>,
    ) -> Self {
        Signer {
            secrets,
            parameters,
        }
    }

    /// Builds the `Authorization` header value for a request.
    ///
    /// `payload` is the URL-encoded form body; its parameters and those of
    /// the URL query take part in the signature base string.
    pub fn generate_signature(&self, method: Method, url: &Url, payload: &str) -> SignResult<String> {
        let (consumer_key, consumer_secret) = self.secrets.get_consumer_key_pair();
        let (token, token_secret) = self.secrets.get_token_option_pair();
        if consumer_key.is_empty() {
            return Err(SignError::MissingConsumerKey);
        }
        check_secret("consumer key", consumer_key)?;
        check_secret("consumer secret", consumer_secret)?;
        check_secret("token", token.unwrap_or_default())?;
        check_secret("token secret", token_secret.unwrap_or_default())?;

        // build oauth option
        let options = self.parameters.build_options(token);

        // base string uses the URL without query; query pairs are signed as parameters
        let mut base_url = url.clone();
        base_url.set_query(None);
        base_url.set_fragment(None);

        // destructure query and body, encode, then sort by the encoded form
        let parsed_payload: Vec<(String, String)> = url
            .query_pairs()
            .chain(url::form_urlencoded::parse(payload.as_bytes()))
            .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
            .collect();
        let oauth_identifier = vec![(OAUTH_IDENTIFIER.to_string(), String::new())];
        let mut sorted_query = [parsed_payload, oauth_identifier].concat();
        sorted_query.sort();

        // divide key-value items by the element has "oauth_" key
        let mut divided = sorted_query.splitn(2, |(k, _)| k == OAUTH_IDENTIFIER);
        let query_before_oauth = divided.next().unwrap_or_default();
        let query_after_oauth = divided.next().unwrap_or_default();

        // Step 0. instantiate sign generator
        let sig_method = self.parameters.signature_method.clone();
        let mut signer = OAuthSigner::form_with_signature_method(
            sig_method,
            method.as_str(),
            base_url,
            consumer_secret,
            token_secret,
        );

        // Step 1. key [a ~ oauth_)
        for (key, value) in query_before_oauth {
            if !key.starts_with(OAUTH_IDENTIFIER) {
                signer.parameter_encoded(key, value);
            }
        }
        // Step 2. add oauth_* parameters
        let mut signer = signer.oauth_parameters(consumer_key, &options);
        // Step 3. key (oauth_ ~ z]
        for (key, value) in query_after_oauth {
            // oauth_* keys from the body are already covered by the options
            if !key.starts_with(OAUTH_IDENTIFIER) {
                signer.parameter_encoded(key, value);
            }
        }

        let sign = signer.finish().authorization;

        match self.parameters.realm {
            // OAuth oauth_...,realm="realm"
            Some(ref realm) => {
                check_secret("realm", realm)?;
                Ok(format!("{},{}=\"{}\"", sign, REALM_IDENTIFIER, realm))
            }
            None => Ok(sign),
        }
    }
}

fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, UNRESERVED).to_string()
}

fn check_secret(name: &'static str, value: &str) -> SignResult<()> {
    if value.chars().any(char::is_control) {
        Err(SignError::MalformedSecret(name))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct OAuthParameters<'a, TSignatureMethod>
where
    TSignatureMethod: SignatureMethod + Clone,
{
    callback: Option<Cow<'a, str>>,
    nonce: Option<Cow<'a, str>>,
    realm: Option<Cow<'a, str>>,
    signature_method: TSignatureMethod,
    timestamp: Option<u64>,
    verifier: Option<Cow<'a, str>>,
    version: bool,
}

impl<'a> Default for OAuthParameters<'a, HmacSha1> {
    fn default() -> Self {
        OAuthParameters {
            callback: None,
            nonce: None,
            realm: None,
            signature_method: HmacSha1,
            timestamp: None,
            verifier: None,
            version: false,
        }
    }
}

impl<'a> OAuthParameters<'a, HmacSha1> {
    pub fn new() -> Self {
        Default::default()
    }
}

impl<'a, T> OAuthParameters<'a, T>
where
    T: SignatureMethod + Clone,
{
    /// set the oauth_callback value
    pub fn callback<TCallback>(self, callback: TCallback) -> Self
    where
        TCallback: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            callback: Some(callback.into()),
            ..self
        }
    }

    /// set the oauth_nonce value
    ///
    /// A fresh random nonce is generated per signature when unset.
    pub fn nonce<TNonce>(self, nonce: TNonce) -> Self
    where
        TNonce: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            nonce: Some(nonce.into()),
            ..self
        }
    }

    /// set the realm carried by the Authorization header
    pub fn realm<TRealm>(self, realm: TRealm) -> Self
    where
        TRealm: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            realm: Some(realm.into()),
            ..self
        }
    }

    /// set the oauth_timestamp value
    pub fn timestamp<TTimestamp>(self, timestamp: TTimestamp) -> Self
    where
        TTimestamp: Into<u64>,
    {
        OAuthParameters {
            timestamp: Some(timestamp.into()),
            ..self
        }
    }

    /// set the oauth_verifier value
    pub fn verifier<TVerifier>(self, verifier: TVerifier) -> Self
    where
        TVerifier: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            verifier: Some(verifier.into()),
            ..self
        }
    }

    /// set the oauth_version value (boolean)
    ///
    /// # Note
    /// When the version has value `true`, oauth_version will be set with "1.0".
    /// Otherwise, oauth_version will not be included in your request.
    pub fn version<TVersion>(self, version: TVersion) -> Self
    where
        TVersion: Into<bool>,
    {
        OAuthParameters {
            version: version.into(),
            ..self
        }
    }

    fn build_options<'b>(&'b self, token: Option<&'b str>) -> Options<'b> {
        let mut opt = Options::new();

        // NOTE: items must be added by alphabetical order
        if let Some(ref callback) = self.callback {
            opt.callback(callback.as_ref());
        }
        if let Some(ref nonce) = self.nonce {
            opt.nonce(nonce.as_ref());
        }
        if let Some(timestamp) = self.timestamp {
            opt.timestamp(timestamp);
        }
        if let Some(token) = token {
            opt.token(token);
        }
        if let Some(ref verifier) = self.verifier {
            opt.verifier(verifier.as_ref());
        }
        opt.version(self.version);

        opt
    }
}
