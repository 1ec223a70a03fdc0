//! Factory defaults and per-call client overrides.
//!
//! A client factory is created once per API family with [`FactoryDefaults`].
//! Each client it produces is described by a [`ClientOptions`] value; fields
//! left unset fall back to the factory defaults or to the library defaults
//! (`localhost`, a 10 second timeout, no certificate verification).
//!
//! No validation happens here. Merging is plain override-if-provided.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{AuthMethod, ConnectionConfig, TlsVerification, DEFAULT_HOST, DEFAULT_TIMEOUT};
use crate::identifiers::Namespace;

/// Fixed defaults shared by every client a factory builds.
#[derive(Debug, Clone, PartialEq)]
pub struct FactoryDefaults {
    /// Registry namespace the clients discover their commands under.
    pub namespace: Namespace,
    /// Port used when a client does not override it.
    pub port: u16,
    /// API version used when a client does not override it.
    pub version: String,
    /// Auth method used when a client does not override it.
    pub auth_method: AuthMethod,
    /// Whether clients use HTTPS unless overridden.
    pub https: bool,
}

impl FactoryDefaults {
    /// Creates defaults with no auth method and plain HTTP.
    pub fn new(namespace: Namespace, port: u16, version: impl Into<String>) -> Self {
        Self {
            namespace,
            port,
            version: version.into(),
            auth_method: AuthMethod::None,
            https: false,
        }
    }
}

/// Per-call overrides accepted by a client factory.
///
/// Every field is optional. `timeout` distinguishes "not provided" (outer
/// `None`, use the 10 second default) from "explicitly disabled"
/// (`Some(None)`, see [`ClientOptions::no_timeout`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Server host; `localhost` when unset.
    pub host: Option<String>,
    /// Server port; the factory default when unset.
    pub port: Option<u16>,
    /// API version segment; the factory default when unset.
    pub version: Option<String>,
    /// Account name.
    pub username: Option<String>,
    /// Account secret.
    pub password: Option<String>,
    /// Selects HTTPS; the factory default when unset.
    pub https: Option<bool>,
    /// Auth method; the factory default when unset.
    pub auth_method: Option<AuthMethod>,
    /// Per-request timeout; `Some(None)` disables it.
    #[serde(skip_serializing_if = "Option::is_none", with = "timeout_override")]
    pub timeout: Option<Option<Duration>>,
    /// Certificate verification policy; disabled when unset.
    pub verify_certificate: Option<TlsVerification>,
    /// Value of the `X-Auth-Token` header.
    pub token: Option<String>,
}

impl ClientOptions {
    /// Creates an empty set of overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Overrides the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Overrides the API version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets both halves of the credentials.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Overrides the scheme selection.
    pub fn https(mut self, https: bool) -> Self {
        self.https = Some(https);
        self
    }

    /// Overrides the auth method. Unrecognised names mean no authenticator.
    pub fn auth_method(mut self, auth_method: impl Into<AuthMethod>) -> Self {
        self.auth_method = Some(auth_method.into());
        self
    }

    /// Overrides the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(Some(timeout));
        self
    }

    /// Disables the per-request timeout entirely.
    pub fn no_timeout(mut self) -> Self {
        self.timeout = Some(None);
        self
    }

    /// Overrides the certificate verification policy.
    pub fn verify_certificate(mut self, policy: impl Into<TlsVerification>) -> Self {
        self.verify_certificate = Some(policy.into());
        self
    }

    /// Sets the `X-Auth-Token` value.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Merges these overrides over `defaults` into a complete configuration.
    pub fn resolve(self, defaults: &FactoryDefaults) -> ConnectionConfig {
        ConnectionConfig {
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port: self.port.unwrap_or(defaults.port),
            version: self.version.unwrap_or_else(|| defaults.version.clone()),
            username: self.username,
            password: self.password,
            https: self.https.unwrap_or(defaults.https),
            timeout: self.timeout.unwrap_or(Some(DEFAULT_TIMEOUT)),
            auth_method: self.auth_method.unwrap_or(defaults.auth_method),
            verify_certificate: self.verify_certificate.unwrap_or_default(),
            token: self.token,
        }
    }
}

// A present `null` means "no timeout"; an absent field means "use the default".
mod timeout_override {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Option<Duration>>, serializer: S) -> Result<S::Ok, S::Error> {
        value
            .flatten()
            .map(|timeout| timeout.as_secs_f64())
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Option<Duration>>, D::Error> {
        let secs = Option::<f64>::deserialize(deserializer)?;
        let timeout = secs
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
            .transpose()?;
        Ok(Some(timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Scheme;

    fn defaults() -> FactoryDefaults {
        FactoryDefaults::new(Namespace::new("ns").unwrap(), 443, "1.1")
    }

    #[test]
    fn empty_options_resolve_to_defaults() {
        let config = ClientOptions::new().resolve(&defaults());

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 443);
        assert_eq!(config.version, "1.1");
        assert_eq!(config.scheme(), Scheme::Http);
        assert_eq!(config.timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.verify_certificate, TlsVerification::Disabled);
        assert_eq!(config.auth_method, AuthMethod::None);
        assert!(config.username.is_none());
        assert!(config.token.is_none());
    }

    #[test]
    fn factory_defaults_apply_when_not_overridden() {
        let mut defaults = defaults();
        defaults.auth_method = AuthMethod::Digest;
        defaults.https = true;

        let config = ClientOptions::new().resolve(&defaults);
        assert_eq!(config.auth_method, AuthMethod::Digest);
        assert_eq!(config.scheme(), Scheme::Https);
    }

    #[test]
    fn overrides_win_over_defaults() {
        let config = ClientOptions::new()
            .host("api.example.com")
            .port(9486)
            .version("2.0")
            .credentials("u", "p")
            .https(true)
            .auth_method("basic")
            .timeout(Duration::from_secs(5))
            .verify_certificate(true)
            .token("abc")
            .resolve(&defaults());

        assert_eq!(config.host, "api.example.com");
        assert_eq!(config.port, 9486);
        assert_eq!(config.version, "2.0");
        assert_eq!(config.username.as_deref(), Some("u"));
        assert_eq!(config.password.as_deref(), Some("p"));
        assert!(config.https);
        assert_eq!(config.auth_method, AuthMethod::Basic);
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.verify_certificate, TlsVerification::System);
        assert_eq!(config.token(), Some("abc"));
    }

    #[test]
    fn no_timeout_disables_the_default() {
        let config = ClientOptions::new().no_timeout().resolve(&defaults());
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn options_deserialise_from_json() {
        let options: ClientOptions =
            serde_json::from_str(r#"{"host": "10.0.0.1", "https": true, "verify_certificate": "/ca.pem"}"#)
                .unwrap();
        let config = options.resolve(&defaults());

        assert_eq!(config.host, "10.0.0.1");
        assert_eq!(config.scheme(), Scheme::Https);
        assert_eq!(config.verify_certificate, TlsVerification::ca_bundle("/ca.pem"));
        assert_eq!(config.timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn null_timeout_in_json_disables_the_default() {
        let options: ClientOptions = serde_json::from_str(r#"{"timeout": null}"#).unwrap();
        assert_eq!(options.timeout, Some(None));

        let options: ClientOptions = serde_json::from_str(r#"{"timeout": 3}"#).unwrap();
        assert_eq!(options.resolve(&defaults()).timeout, Some(Duration::from_secs(3)));
    }
}
