//! Connection configuration domain for versioned REST API clients.
//!
//! This crate contains the configuration values every client in an API family
//! shares (host, port, API version, credentials, TLS policy, timeout, token)
//! and the rule that merges factory defaults with per-call overrides.
//! Infrastructure crates turn these values into HTTP sessions; they never add
//! configuration rules of their own.
//!
//! ## Architectural Layer
//!
//! **Domain.** This crate has no I/O dependencies. It defines *what* a
//! connection looks like; `rest-client` defines *how* to open one.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`Namespace`, `CommandName`) |
//! | [`config`] | Connection values (`ConnectionConfig`, `AuthMethod`, `TlsVerification`, etc.) |
//! | [`options`] | Factory defaults, per-call overrides, and the merge between them |

pub mod config;
pub mod identifiers;
pub mod options;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{
    AuthMethod, ConnectionConfig, Credentials, Scheme, TlsVerification, DEFAULT_HOST,
    DEFAULT_TIMEOUT,
};
pub use identifiers::{CommandName, Namespace};
pub use options::{ClientOptions, FactoryDefaults};
