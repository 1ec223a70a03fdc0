//! Basic and Digest authenticators.
//!
//! Basic credentials are attached to every request up front. Digest needs a
//! server challenge first, so [`crate::Session::send`] answers a `401` carrying
//! a `WWW-Authenticate: Digest ...` header and replays the request once with
//! the computed `Authorization` header.

use base64::{engine::general_purpose, Engine as _};
use digest_auth::{AuthContext, HttpMethod};
use reqwest::header::{HeaderValue, WWW_AUTHENTICATE};
use reqwest::{Request, Response};

use connection::{AuthMethod, Credentials};

use crate::errors::SessionError;

/// Authentication strategy attached to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authenticator {
    /// HTTP Basic challenge/response.
    Basic(Credentials),
    /// HTTP Digest challenge/response.
    Digest(Credentials),
}

impl Authenticator {
    /// Selects the authenticator for `method`.
    ///
    /// Returns `None` for [`AuthMethod::None`] even though credentials are
    /// present.
    pub fn for_method(method: AuthMethod, credentials: Credentials) -> Option<Self> {
        match method {
            AuthMethod::Basic => Some(Self::Basic(credentials)),
            AuthMethod::Digest => Some(Self::Digest(credentials)),
            AuthMethod::None => None,
        }
    }

    /// Returns the credentials this authenticator was configured with.
    pub fn credentials(&self) -> &Credentials {
        match self {
            Self::Basic(credentials) | Self::Digest(credentials) => credentials,
        }
    }

    /// Returns the auth method this authenticator implements.
    pub fn method(&self) -> AuthMethod {
        match self {
            Self::Basic(_) => AuthMethod::Basic,
            Self::Digest(_) => AuthMethod::Digest,
        }
    }
}

/// Encodes `credentials` as a sensitive `Authorization: Basic ...` value.
pub(crate) fn basic_authorization(credentials: &Credentials) -> Result<HeaderValue, SessionError> {
    let encoded = general_purpose::STANDARD.encode(format!(
        "{}:{}",
        credentials.username, credentials.password
    ));
    let mut value =
        HeaderValue::from_str(&format!("Basic {encoded}")).map_err(SessionError::InvalidCredentials)?;
    value.set_sensitive(true);
    Ok(value)
}

/// Returns the first Digest challenge in `response`, if any.
///
/// Every `WWW-Authenticate` value is searched, including values that list
/// several challenges.
pub(crate) fn digest_challenge(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(find_digest_challenge)
}

/// Extracts the Digest challenge from one `WWW-Authenticate` value.
///
/// A value is a comma-separated list whose items are either the start of a
/// challenge (`<scheme> [param]`) or one more `name=value` parameter of the
/// current challenge. Commas inside quoted strings do not separate items.
fn find_digest_challenge(value: &str) -> Option<String> {
    let mut challenge: Option<Vec<&str>> = None;
    for item in split_unquoted_commas(value) {
        let item = item.trim();
        let Some(first) = item.split_whitespace().next() else {
            continue;
        };
        let is_param = first.contains('=') || item[first.len()..].trim_start().starts_with('=');
        if is_param {
            if let Some(params) = challenge.as_mut() {
                params.push(item);
            }
            continue;
        }
        if challenge.is_some() {
            break;
        }
        if first.eq_ignore_ascii_case("digest") {
            challenge = Some(vec![item]);
        }
    }
    challenge.map(|items| items.join(", "))
}

fn split_unquoted_commas(value: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ',' if !quoted => {
                items.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&value[start..]);
    items
}

/// Computes the `Authorization` header answering `challenge` for `request`.
pub(crate) fn digest_authorization(
    credentials: &Credentials,
    challenge: &str,
    request: &Request,
) -> Result<HeaderValue, SessionError> {
    let mut prompt =
        digest_auth::parse(challenge).map_err(|e| SessionError::DigestChallenge(e.to_string()))?;

    let url = request.url();
    let uri = match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_owned(),
    };
    let body = request.body().and_then(|body| body.as_bytes());
    let context = AuthContext::new_with_method(
        credentials.username.as_str(),
        credentials.password.as_str(),
        uri,
        body,
        HttpMethod::from(request.method().as_str()),
    );

    let answer = prompt
        .respond(&context)
        .map_err(|e| SessionError::DigestChallenge(e.to_string()))?;
    HeaderValue::from_str(&answer.to_header_string())
        .map_err(|e| SessionError::DigestChallenge(e.to_string()))
}
