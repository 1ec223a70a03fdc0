//! Error types for session construction, plugin discovery, and client
//! construction.
//!
//! The three layers fail independently:
//!
//! - [`SessionError`]: a session could not be built or a request through it
//!   failed.
//! - [`DiscoveryError`]: the plugin source could not list the commands of a
//!   namespace. [`DiscoveryError::NoPlugins`] is the one recoverable case; a
//!   client built against an empty namespace simply has no commands.
//! - [`ClientError`]: everything that aborts client construction.

use std::path::PathBuf;

use reqwest::header::InvalidHeaderValue;
use thiserror::Error;

use connection::{CommandName, Namespace};

/// Errors raised while building a [`crate::Session`] or dispatching a request
/// through it.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The configured CA bundle could not be read.
    #[error("Failed to read CA bundle '{}'", path.display())]
    CaBundleRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configured CA bundle holds no usable PEM certificate.
    #[error("CA bundle '{}' contains no valid PEM certificate", path.display())]
    CaBundleParse {
        path: PathBuf,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The token contains characters that cannot appear in a header value.
    #[error("Auth token is not a valid header value")]
    InvalidToken(#[source] InvalidHeaderValue),

    /// The Basic credentials cannot be encoded as a header value.
    #[error("Basic credentials are not a valid header value")]
    InvalidCredentials(#[source] InvalidHeaderValue),

    /// The server sent a Digest challenge that could not be answered.
    #[error("Cannot answer digest challenge: {0}")]
    DigestChallenge(String),

    /// Building the HTTP client or performing a request failed.
    #[error("HTTP transport error")]
    Transport(#[from] reqwest::Error),
}

/// Errors reported by a [`crate::PluginSource`].
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Nothing is registered under the namespace.
    #[error("No plugins registered under namespace '{namespace}'")]
    NoPlugins { namespace: Namespace },

    /// The plugin source itself failed.
    #[error("Plugin discovery failed for namespace '{namespace}'")]
    Source {
        namespace: Namespace,
        #[source]
        source: anyhow::Error,
    },
}

/// Errors that abort [`crate::Client`] construction.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Discovery failed for a reason other than an empty namespace.
    #[error(transparent)]
    Discovery(DiscoveryError),

    /// A plugin factory returned an error.
    #[error("Failed to instantiate command '{name}'")]
    Instantiate {
        name: CommandName,
        #[source]
        source: anyhow::Error,
    },
}
