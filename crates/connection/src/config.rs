//! Connection values shared by every session a client opens.
//!
//! [`ConnectionConfig`] is the fully merged configuration handed to a session
//! builder. The smaller value types ([`Scheme`], [`AuthMethod`],
//! [`TlsVerification`], [`Credentials`]) carry the few rules that decide how a
//! session is configured.
//!
//! All of these types are `serde` (de)serialisable so a configuration file can
//! supply any subset of the fields.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

/// Host used when none is configured.
pub const DEFAULT_HOST: &str = "localhost";

/// Per-request timeout applied by factory-built clients unless disabled.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Scheme
// ---------------------------------------------------------------------------

/// URL scheme of the API, derived from the `https` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    Https,
}

impl Scheme {
    /// Returns [`Scheme::Https`] if `https` is set, [`Scheme::Http`] otherwise.
    pub fn from_https(https: bool) -> Self {
        if https {
            Self::Https
        } else {
            Self::Http
        }
    }

    /// Returns the scheme as it appears in a URL.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    /// Returns `true` for [`Scheme::Https`].
    pub fn is_secure(self) -> bool {
        self == Self::Https
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Challenge/response scheme applied when both username and password are set.
///
/// Parsing is permissive: any value other than `"basic"` or `"digest"`
/// (including an empty string) selects [`AuthMethod::None`], which means no
/// authenticator is attached even when credentials are present. Unrecognised
/// values are not rejected; they are only logged at `debug` level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthMethod {
    /// HTTP Basic authentication.
    Basic,
    /// HTTP Digest authentication.
    Digest,
    /// No authenticator.
    #[default]
    None,
}

impl AuthMethod {
    /// Parses an auth method name.
    pub fn parse(value: &str) -> Self {
        match value {
            "basic" => Self::Basic,
            "digest" => Self::Digest,
            other => {
                if !other.is_empty() {
                    debug!(auth_method = other, "Unrecognised auth method, no authenticator will be used");
                }
                Self::None
            }
        }
    }

    /// Returns the configuration name of this method, or `None` for [`AuthMethod::None`].
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            Self::Basic => Some("basic"),
            Self::Digest => Some("digest"),
            Self::None => None,
        }
    }
}

impl From<&str> for AuthMethod {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<Option<&str>> for AuthMethod {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Self::None, Self::parse)
    }
}

impl Serialize for AuthMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_str().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AuthMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(Self::from(value.as_deref()))
    }
}

/// A username/password pair that is complete enough to authenticate with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Account secret.
    pub password: String,
}

impl Credentials {
    /// Returns credentials only if both `username` and `password` are present
    /// and non-empty.
    pub fn new(username: Option<&str>, password: Option<&str>) -> Option<Self> {
        match (username, password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some(Self {
                username: u.to_owned(),
                password: p.to_owned(),
            }),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TLS verification
// ---------------------------------------------------------------------------

/// Certificate verification policy for HTTPS sessions.
///
/// Deserialises from `false` ([`TlsVerification::Disabled`]), `true`
/// ([`TlsVerification::System`]) or a path to a PEM CA bundle
/// ([`TlsVerification::CaBundle`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "VerifyRepr", into = "VerifyRepr")]
pub enum TlsVerification {
    /// Accept any certificate.
    #[default]
    Disabled,
    /// Verify against the platform's trusted roots.
    System,
    /// Verify against the roots in this PEM bundle.
    CaBundle(PathBuf),
}

impl TlsVerification {
    /// Returns a policy verifying against the bundle at `path`.
    pub fn ca_bundle(path: impl Into<PathBuf>) -> Self {
        Self::CaBundle(path.into())
    }

    /// Returns `true` unless verification is [`TlsVerification::Disabled`].
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Returns the CA bundle path, if one is configured.
    pub fn ca_bundle_path(&self) -> Option<&Path> {
        match self {
            Self::CaBundle(path) => Some(path),
            _ => None,
        }
    }
}

impl From<bool> for TlsVerification {
    fn from(verify: bool) -> Self {
        if verify {
            Self::System
        } else {
            Self::Disabled
        }
    }
}

impl From<PathBuf> for TlsVerification {
    fn from(path: PathBuf) -> Self {
        Self::CaBundle(path)
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum VerifyRepr {
    Flag(bool),
    Bundle(PathBuf),
}

impl From<VerifyRepr> for TlsVerification {
    fn from(repr: VerifyRepr) -> Self {
        match repr {
            VerifyRepr::Flag(verify) => verify.into(),
            VerifyRepr::Bundle(path) => Self::CaBundle(path),
        }
    }
}

impl From<TlsVerification> for VerifyRepr {
    fn from(policy: TlsVerification) -> Self {
        match policy {
            TlsVerification::Disabled => Self::Flag(false),
            TlsVerification::System => Self::Flag(true),
            TlsVerification::CaBundle(path) => Self::Bundle(path),
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionConfig
// ---------------------------------------------------------------------------

/// Fully merged connection configuration owned by a session builder.
///
/// `timeout` is expressed in (fractional) seconds when serialised; `null`
/// means no timeout is enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Host name or address of the API server.
    pub host: String,
    /// TCP port of the API server.
    pub port: u16,
    /// API version path segment (e.g. `"1.1"`).
    pub version: String,
    /// Optional account name.
    pub username: Option<String>,
    /// Optional account secret.
    pub password: Option<String>,
    /// Selects [`Scheme::Https`] when set.
    pub https: bool,
    /// Bound applied to every request made through a session.
    #[serde(with = "optional_secs")]
    pub timeout: Option<Duration>,
    /// Authenticator used when both credentials are present.
    pub auth_method: AuthMethod,
    /// Certificate verification policy (only consulted for HTTPS).
    pub verify_certificate: TlsVerification,
    /// Value of the `X-Auth-Token` header.
    pub token: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: 80,
            version: String::new(),
            username: None,
            password: None,
            https: false,
            timeout: Some(DEFAULT_TIMEOUT),
            auth_method: AuthMethod::None,
            verify_certificate: TlsVerification::Disabled,
            token: None,
        }
    }
}

impl ConnectionConfig {
    /// Returns the URL scheme selected by the `https` flag.
    pub fn scheme(&self) -> Scheme {
        Scheme::from_https(self.https)
    }

    /// Returns the credentials if both username and password are non-empty.
    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::new(self.username.as_deref(), self.password.as_deref())
    }

    /// Returns the token, treating an empty token as absent.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

mod optional_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(timeout) => serializer.serialize_some(&timeout.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
            .transpose()
    }
}
