//! Client construction for a family of versioned REST APIs.
//!
//! Every API in a family shares the same connection parameters (host, port,
//! API version, credentials, TLS policy). This crate turns those parameters
//! into ready-to-use HTTP sessions and attaches externally registered
//! *commands* to a client instance.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, authentication schemes, and TLS
//! configuration live here. The [`connection`] crate holds the configuration
//! values and merge rules; this crate never adds configuration rules.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`session`] | `SessionBuilder`, `Session`, and the `SessionProvider` seam |
//! | [`auth`] | Basic and Digest authenticators |
//! | [`tls`] | The insecure-TLS warning gate |
//! | [`registry`] | Plugin discovery: `PluginSource`, `PluginRegistry`, `Extension` |
//! | [`client`] | `Client`, the container of instantiated commands |
//! | [`factory`] | `ClientFactory`, closing over per-family defaults |
//! | [`errors`] | Error types for each layer |
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rest_client::{ClientFactory, ClientOptions, CommandName, Namespace, PluginRegistry, SessionBuilder};
//!
//! struct Users {
//!     builder: Arc<SessionBuilder>,
//! }
//!
//! let namespace = Namespace::new("confd_client.commands").unwrap();
//! let mut registry = PluginRegistry::<SessionBuilder, Users>::new();
//! registry.register(namespace.clone(), CommandName::new("users").unwrap(), |builder| {
//!     Ok(Users { builder })
//! });
//!
//! let factory = ClientFactory::new(namespace, 9486, "1.1").https(true);
//! let client = factory
//!     .new_client(ClientOptions::new().host("confd.example.com").token("secret"), &registry)
//!     .unwrap();
//!
//! let users = client.command("users").unwrap();
//! assert_eq!(users.builder.build_url(&["users"]), "https://confd.example.com:9486/1.1/users");
//! ```

pub mod auth;
pub mod client;
pub mod errors;
pub mod factory;
pub mod registry;
pub mod session;
pub mod tls;

pub use connection::{
    AuthMethod, ClientOptions, CommandName, ConnectionConfig, Credentials, FactoryDefaults, Namespace,
    Scheme, TlsVerification,
};

pub use auth::Authenticator;
pub use client::Client;
pub use errors::{ClientError, DiscoveryError, SessionError};
pub use factory::ClientFactory;
pub use registry::{Extension, PluginFactory, PluginRegistry, PluginSource};
pub use session::{Session, SessionBuilder, SessionProvider, AUTH_TOKEN_HEADER};
pub use tls::InsecureTlsWarnings;
