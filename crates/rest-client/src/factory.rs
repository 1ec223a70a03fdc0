//! Client factories.
//!
//! An API family (one namespace of commands served on a well-known port and
//! version) is described once by a [`ClientFactory`]; each call to
//! [`ClientFactory::new_client`] merges per-call [`ClientOptions`] over those
//! defaults, builds a session builder, and wires up a [`Client`].

use std::sync::Arc;

use tracing::{debug, instrument};

use connection::{AuthMethod, ClientOptions, ConnectionConfig, FactoryDefaults, Namespace};

use crate::client::Client;
use crate::errors::ClientError;
use crate::registry::PluginSource;
use crate::session::{SessionBuilder, SessionProvider};
use crate::tls::InsecureTlsWarnings;

type MakeSessionBuilder<B> = Arc<dyn Fn(ConnectionConfig, Arc<InsecureTlsWarnings>) -> B + Send + Sync>;

/// Builds clients of one API family from fixed defaults and per-call overrides.
///
/// Every session builder a factory creates shares the factory's
/// [`InsecureTlsWarnings`] gate, so an insecure configuration is reported once
/// per factory rather than once per client.
pub struct ClientFactory<B = SessionBuilder> {
    defaults: FactoryDefaults,
    insecure_warnings: Arc<InsecureTlsWarnings>,
    make_session_builder: MakeSessionBuilder<B>,
}

impl ClientFactory<SessionBuilder> {
    /// Creates a factory using the standard [`SessionBuilder`], no auth method
    /// and plain HTTP by default.
    pub fn new(namespace: Namespace, default_port: u16, default_version: impl Into<String>) -> Self {
        Self {
            defaults: FactoryDefaults::new(namespace, default_port, default_version),
            insecure_warnings: Arc::new(InsecureTlsWarnings::new()),
            make_session_builder: Arc::new(|config, gate| {
                SessionBuilder::new(config).with_insecure_warnings(gate)
            }),
        }
    }
}

impl<B: SessionProvider> ClientFactory<B> {
    /// Sets the auth method used when a client does not override it.
    pub fn auth_method(mut self, auth_method: impl Into<AuthMethod>) -> Self {
        self.defaults.auth_method = auth_method.into();
        self
    }

    /// Sets whether clients use HTTPS when they do not override it.
    pub fn https(mut self, https: bool) -> Self {
        self.defaults.https = https;
        self
    }

    /// Replaces the insecure-TLS warning gate shared by this factory's builders.
    pub fn with_insecure_warnings(mut self, gate: Arc<InsecureTlsWarnings>) -> Self {
        self.insecure_warnings = gate;
        self
    }

    /// Swaps the session builder implementation.
    ///
    /// `make` receives the merged configuration and the factory's warning gate.
    pub fn with_session_builder<P, F>(self, make: F) -> ClientFactory<P>
    where
        P: SessionProvider,
        F: Fn(ConnectionConfig, Arc<InsecureTlsWarnings>) -> P + Send + Sync + 'static,
    {
        ClientFactory {
            defaults: self.defaults,
            insecure_warnings: self.insecure_warnings,
            make_session_builder: Arc::new(make),
        }
    }

    /// Defaults merged under every client's options.
    pub fn defaults(&self) -> &FactoryDefaults {
        &self.defaults
    }

    /// Warning gate shared by this factory's session builders.
    pub fn insecure_warnings(&self) -> &Arc<InsecureTlsWarnings> {
        &self.insecure_warnings
    }

    /// Builds a client from `options` merged over the factory defaults, with
    /// commands discovered from `plugins`.
    ///
    /// # Errors
    ///
    /// Propagates the [`ClientError`] of [`Client::new`].
    #[instrument(skip_all, fields(namespace = %self.defaults.namespace))]
    pub fn new_client<C>(
        &self,
        options: ClientOptions,
        plugins: &dyn PluginSource<B, C>,
    ) -> Result<Client<C, B>, ClientError> {
        let config = options.resolve(&self.defaults);
        debug!(
            host = %config.host,
            port = config.port,
            version = %config.version,
            scheme = %config.scheme(),
            "Building client"
        );
        let session_builder = (self.make_session_builder)(config, Arc::clone(&self.insecure_warnings));
        Client::new(self.defaults.namespace.clone(), Arc::new(session_builder), plugins)
    }
}

impl<B> Clone for ClientFactory<B> {
    fn clone(&self) -> Self {
        Self {
            defaults: self.defaults.clone(),
            insecure_warnings: Arc::clone(&self.insecure_warnings),
            make_session_builder: Arc::clone(&self.make_session_builder),
        }
    }
}

impl<B> std::fmt::Debug for ClientFactory<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientFactory")
            .field("defaults", &self.defaults)
            .field("insecure_warnings", &self.insecure_warnings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::errors::SessionError;
    use crate::registry::PluginRegistry;
    use crate::session::Session;
    use connection::{CommandName, Scheme, TlsVerification};

    fn ns() -> Namespace {
        Namespace::new("ns").unwrap()
    }

    #[test]
    fn all_defaults_produce_a_plain_localhost_client() {
        let factory = ClientFactory::new(ns(), 443, "1.1");
        let registry = PluginRegistry::<SessionBuilder, ()>::new();

        let client = factory.new_client(ClientOptions::new(), &registry).unwrap();
        let builder = client.session_builder();

        assert_eq!(builder.host(), "localhost");
        assert_eq!(builder.port(), 443);
        assert_eq!(builder.version(), "1.1");
        assert_eq!(builder.scheme(), Scheme::Http);
        assert_eq!(builder.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(builder.verify_certificate(), &TlsVerification::Disabled);
        assert_eq!(builder.auth_method(), AuthMethod::None);
        assert_eq!(client.namespace(), &ns());
        assert!(client.is_empty());
    }

    #[test]
    fn factory_defaults_reach_the_session_builder() {
        let factory = ClientFactory::new(ns(), 9497, "0.1").auth_method("digest").https(true);
        let registry = PluginRegistry::<SessionBuilder, ()>::new();

        let client = factory.new_client(ClientOptions::new(), &registry).unwrap();

        assert_eq!(client.session_builder().auth_method(), AuthMethod::Digest);
        assert_eq!(
            client.session_builder().build_url(&["token"]),
            "https://localhost:9497/0.1/token"
        );
    }

    #[test]
    fn overrides_reach_the_session_builder() {
        let factory = ClientFactory::new(ns(), 443, "1.1");
        let registry = PluginRegistry::<SessionBuilder, ()>::new();

        let options = ClientOptions::new()
            .host("10.0.0.5")
            .port(8443)
            .credentials("admin", "secret")
            .auth_method("basic")
            .no_timeout()
            .token("abc");
        let client = factory.new_client(options, &registry).unwrap();
        let builder = client.session_builder();

        assert_eq!(builder.build_url(&[]), "http://10.0.0.5:8443/1.1");
        assert_eq!(builder.timeout(), None);
        assert_eq!(builder.token(), Some("abc"));
        assert_eq!(builder.auth_method(), AuthMethod::Basic);
    }

    #[test]
    fn builders_of_one_factory_share_the_warning_gate() {
        let factory = ClientFactory::new(ns(), 443, "1.1").https(true);
        let registry = PluginRegistry::<SessionBuilder, ()>::new();

        let first = factory.new_client(ClientOptions::new(), &registry).unwrap();
        let second = factory.new_client(ClientOptions::new(), &registry).unwrap();
        assert!(Arc::ptr_eq(
            first.session_builder().insecure_warnings(),
            second.session_builder().insecure_warnings()
        ));

        first.session_builder().build_session().unwrap();
        assert!(factory.insecure_warnings().is_suppressed());
    }

    #[test]
    fn commands_receive_the_client_session_builder() {
        let factory = ClientFactory::new(ns(), 9486, "1.1");
        let mut registry = PluginRegistry::<SessionBuilder, String>::new();
        registry.register(ns(), CommandName::new("users").unwrap(), |builder| {
            Ok(builder.build_url(&["users"]))
        });

        let client = factory
            .new_client(ClientOptions::new().host("confd"), &registry)
            .unwrap();

        assert_eq!(
            client.command("users").map(String::as_str),
            Some("http://confd:9486/1.1/users")
        );
    }

    struct RecordingBuilder {
        config: ConnectionConfig,
    }

    impl SessionProvider for RecordingBuilder {
        fn build_session(&self) -> Result<Session, SessionError> {
            SessionBuilder::new(self.config.clone()).build_session()
        }

        fn build_url(&self, fragments: &[&str]) -> String {
            format!("recorded://{}/{}", self.config.host, fragments.join("/"))
        }
    }

    #[test]
    fn custom_session_builder_is_used() {
        let factory = ClientFactory::new(ns(), 443, "1.1")
            .with_session_builder(|config, _gate| RecordingBuilder { config });
        let mut registry = PluginRegistry::<RecordingBuilder, String>::new();
        registry.register(ns(), CommandName::new("lookup").unwrap(), |builder| {
            Ok(builder.build_url(&["a", "b"]))
        });

        let client = factory.new_client(ClientOptions::new(), &registry).unwrap();

        assert_eq!(client.command("lookup").map(String::as_str), Some("recorded://localhost/a/b"));
        assert_eq!(client.session_builder().config.port, 443);
    }
}
