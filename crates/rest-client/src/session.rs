//! Session construction.
//!
//! A [`SessionBuilder`] owns the merged [`ConnectionConfig`] of one client and
//! produces two things from it:
//!
//! - fresh [`Session`]s, i.e. HTTP clients preconfigured with the connection's
//!   headers, timeout, TLS policy and authenticator;
//! - URLs rooted at `<scheme>://<host>:<port>/<version>`.
//!
//! Commands hold an `Arc` of the builder and call both as they need.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONNECTION};
use reqwest::{IntoUrl, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, instrument};

use connection::{AuthMethod, ConnectionConfig, Scheme, TlsVerification};

use crate::auth::{self, Authenticator};
use crate::errors::SessionError;
use crate::tls::InsecureTlsWarnings;

/// Header carrying the bearer token.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Capabilities every command relies on from its session builder.
///
/// [`SessionBuilder`] is the standard implementation; a
/// [`crate::ClientFactory`] can be configured with any other.
pub trait SessionProvider: Send + Sync + 'static {
    /// Builds a fresh, fully configured session.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the TLS material cannot be loaded or the
    /// HTTP client cannot be constructed.
    fn build_session(&self) -> Result<Session, SessionError>;

    /// Builds a URL rooted at the configured base.
    fn build_url(&self, fragments: &[&str]) -> String;
}

// ---------------------------------------------------------------------------
// SessionBuilder
// ---------------------------------------------------------------------------

/// Turns a [`ConnectionConfig`] into sessions and base-rooted URLs.
///
/// The configuration is fixed at construction.
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    config: ConnectionConfig,
    insecure_warnings: Arc<InsecureTlsWarnings>,
}

impl SessionBuilder {
    /// Creates a builder with its own insecure-TLS warning gate.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            insecure_warnings: Arc::new(InsecureTlsWarnings::new()),
        }
    }

    /// Replaces the insecure-TLS warning gate, typically with one shared by
    /// every builder of a factory.
    pub fn with_insecure_warnings(mut self, gate: Arc<InsecureTlsWarnings>) -> Self {
        self.insecure_warnings = gate;
        self
    }

    /// The merged connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// `https` if the `https` flag is set, `http` otherwise.
    pub fn scheme(&self) -> Scheme {
        self.config.scheme()
    }

    /// Server host.
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Server port.
    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// API version path segment.
    pub fn version(&self) -> &str {
        &self.config.version
    }

    /// Timeout bound to each request of the sessions it builds.
    pub fn timeout(&self) -> Option<Duration> {
        self.config.timeout
    }

    /// Configured auth method.
    pub fn auth_method(&self) -> AuthMethod {
        self.config.auth_method
    }

    /// Configured certificate verification policy.
    pub fn verify_certificate(&self) -> &TlsVerification {
        &self.config.verify_certificate
    }

    /// Bearer token, if set and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.config.token()
    }

    /// Gate consulted when an insecure HTTPS session is built.
    pub fn insecure_warnings(&self) -> &Arc<InsecureTlsWarnings> {
        &self.insecure_warnings
    }

    /// Builds a new session.
    ///
    /// The session always sends `Connection: close`, and `X-Auth-Token` when a
    /// token is set. Every request made through it carries the configured
    /// timeout. For HTTPS, verification follows the configured policy; a
    /// disabled policy goes through the insecure-TLS warning gate. An
    /// authenticator is attached only if both username and password are
    /// non-empty and the auth method is recognised.
    ///
    /// # Errors
    ///
    /// - [`SessionError::CaBundleRead`] / [`SessionError::CaBundleParse`] if a
    ///   CA bundle is configured for HTTPS and cannot be loaded.
    /// - [`SessionError::InvalidToken`] if the token is not a valid header value.
    /// - [`SessionError::InvalidCredentials`] if Basic credentials cannot be
    ///   encoded as a header value.
    /// - [`SessionError::Transport`] if the HTTP client cannot be built.
    #[instrument(skip(self), fields(host = %self.config.host, scheme = %self.scheme()))]
    pub fn build_session(&self) -> Result<Session, SessionError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        let mut http = reqwest::Client::builder().use_rustls_tls();

        // Plain HTTP sessions keep the transport's default policy.
        let mut verification = TlsVerification::System;
        if self.scheme().is_secure() {
            match &self.config.verify_certificate {
                TlsVerification::Disabled => {
                    self.insecure_warnings.suppress();
                    http = http.danger_accept_invalid_certs(true);
                }
                TlsVerification::System => {}
                TlsVerification::CaBundle(path) => {
                    let pem = std::fs::read(path).map_err(|source| SessionError::CaBundleRead {
                        path: path.clone(),
                        source,
                    })?;
                    let certificates =
                        reqwest::Certificate::from_pem_bundle(&pem).map_err(|source| {
                            SessionError::CaBundleParse {
                                path: path.clone(),
                                source: Some(source),
                            }
                        })?;
                    if certificates.is_empty() {
                        return Err(SessionError::CaBundleParse {
                            path: path.clone(),
                            source: None,
                        });
                    }
                    http = http.tls_built_in_root_certs(false);
                    for certificate in certificates {
                        http = http.add_root_certificate(certificate);
                    }
                }
            }
            verification = self.config.verify_certificate.clone();
        }

        let authenticator = self
            .config
            .credentials()
            .and_then(|credentials| Authenticator::for_method(self.config.auth_method, credentials));

        if let Some(token) = self.config.token() {
            let value = HeaderValue::from_str(token).map_err(SessionError::InvalidToken)?;
            headers.insert(HeaderName::from_static("x-auth-token"), value);
        }

        // The raw transport carries the same defaults as `request`.
        let mut transport_headers = headers.clone();
        if let Some(Authenticator::Basic(credentials)) = &authenticator {
            transport_headers.insert(AUTHORIZATION, auth::basic_authorization(credentials)?);
        }
        http = http.default_headers(transport_headers);
        if let Some(timeout) = self.config.timeout {
            http = http.timeout(timeout);
        }

        let http = http.build()?;
        debug!(
            timeout = ?self.config.timeout,
            authenticator = ?authenticator.as_ref().map(Authenticator::method),
            "Built session"
        );

        Ok(Session {
            http,
            headers,
            timeout: self.config.timeout,
            verification,
            authenticator,
        })
    }

    /// Builds `<scheme>://<host>:<port>/<version>`, followed by `/` and the
    /// fragments joined with `/` when any are given.
    ///
    /// Fragments are inserted verbatim. Callers must percent-encode them
    /// where needed.
    pub fn build_url(&self, fragments: &[&str]) -> String {
        let base = format!(
            "{}://{}:{}/{}",
            self.scheme(),
            self.config.host,
            self.config.port,
            self.config.version
        );
        if fragments.is_empty() {
            base
        } else {
            format!("{}/{}", base, fragments.join("/"))
        }
    }
}

impl SessionProvider for SessionBuilder {
    fn build_session(&self) -> Result<Session, SessionError> {
        SessionBuilder::build_session(self)
    }

    fn build_url(&self, fragments: &[&str]) -> String {
        SessionBuilder::build_url(self, fragments)
    }
}

impl From<ConnectionConfig> for SessionBuilder {
    fn from(config: ConnectionConfig) -> Self {
        Self::new(config)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// An HTTP client preconfigured by a [`SessionBuilder`].
///
/// The configuration is read-only once built; only the transport's connection
/// state changes as requests are made.
#[derive(Debug, Clone)]
pub struct Session {
    http: reqwest::Client,
    headers: HeaderMap,
    timeout: Option<Duration>,
    verification: TlsVerification,
    authenticator: Option<Authenticator>,
}

impl Session {
    /// Headers sent with every request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Timeout bound to every request, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Certificate verification policy in effect.
    pub fn verification(&self) -> &TlsVerification {
        &self.verification
    }

    /// Authenticator attached to the session, if any.
    pub fn authenticator(&self) -> Option<&Authenticator> {
        self.authenticator.as_ref()
    }

    /// The underlying transport.
    ///
    /// Requests started on it directly still carry the session's headers,
    /// Basic credentials, and timeout, but skip the Digest handshake of
    /// [`Session::send`].
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http
    }

    /// Starts a request with the session's headers, timeout, and Basic
    /// credentials applied.
    ///
    /// Callers may still override the timeout on the returned builder.
    pub fn request<U: IntoUrl>(&self, method: Method, url: U) -> RequestBuilder {
        let mut builder = self.http.request(method, url).headers(self.headers.clone());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(Authenticator::Basic(credentials)) = &self.authenticator {
            builder = builder.basic_auth(&credentials.username, Some(&credentials.password));
        }
        builder
    }

    /// Dispatches a request started with [`Session::request`].
    ///
    /// With a Digest authenticator, a `401` carrying a Digest challenge is
    /// answered and the request replayed once. Requests whose body is a stream
    /// cannot be replayed; their `401` is returned as is.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] if the request fails and
    /// [`SessionError::DigestChallenge`] if a challenge cannot be answered.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, SessionError> {
        let request = builder.build()?;
        let Some(Authenticator::Digest(credentials)) = &self.authenticator else {
            return Ok(self.http.execute(request).await?);
        };

        let replay = request.try_clone();
        let response = self.http.execute(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let Some(challenge) = auth::digest_challenge(&response) else {
            return Ok(response);
        };
        let Some(mut replay) = replay else {
            debug!("Request body cannot be replayed, returning digest challenge");
            return Ok(response);
        };

        let authorization = auth::digest_authorization(credentials, &challenge, &replay)?;
        replay.headers_mut().insert(AUTHORIZATION, authorization);
        debug!(url = %replay.url(), "Answering digest challenge");
        Ok(self.http.execute(replay).await?)
    }
}
