//! Plugin discovery.
//!
//! A plugin is a named factory that turns a shared session builder into a
//! command value. Plugins are grouped by [`Namespace`]; a client asks a
//! [`PluginSource`] for every plugin under its namespace when it is built.
//!
//! [`PluginRegistry`] is the in-process source. Other sources (a generated
//! table, a configuration file mapping names to built-in commands) implement
//! [`PluginSource`] directly.

use std::collections::BTreeMap;
use std::sync::Arc;

use connection::{CommandName, Namespace};

use crate::errors::DiscoveryError;

/// Constructor of one command, given the shared session builder.
pub type PluginFactory<B, C> = Arc<dyn Fn(Arc<B>) -> anyhow::Result<C> + Send + Sync>;

/// A discovered plugin: the name it is exposed under and its factory.
pub struct Extension<B, C> {
    /// Name the command is exposed under.
    pub name: CommandName,
    /// Builds the command from the shared session builder.
    pub factory: PluginFactory<B, C>,
}

impl<B, C> Extension<B, C> {
    /// Wraps `factory` as the plugin named `name`.
    pub fn new<F>(name: CommandName, factory: F) -> Self
    where
        F: Fn(Arc<B>) -> anyhow::Result<C> + Send + Sync + 'static,
    {
        Self {
            name,
            factory: Arc::new(factory),
        }
    }

    /// Invokes the factory with `session_builder`.
    ///
    /// # Errors
    ///
    /// Returns whatever error the plugin's factory returns.
    pub fn instantiate(&self, session_builder: Arc<B>) -> anyhow::Result<C> {
        (self.factory)(session_builder)
    }
}

impl<B, C> Clone for Extension<B, C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<B, C> std::fmt::Debug for Extension<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extension").field("name", &self.name).finish_non_exhaustive()
    }
}

/// A discovery mechanism: lists the plugins registered under a namespace.
pub trait PluginSource<B, C> {
    /// Returns every plugin registered under `namespace`.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::NoPlugins`] if nothing is registered under
    ///   `namespace`. Implementations never return an empty `Vec`.
    /// - [`DiscoveryError::Source`] for any other failure.
    fn discover(&self, namespace: &Namespace) -> Result<Vec<Extension<B, C>>, DiscoveryError>;
}

/// In-process plugin registry keyed by namespace.
///
/// Plugins keep the order in which they were first registered.
/// Registering a name twice in one namespace replaces the earlier factory.
pub struct PluginRegistry<B, C> {
    namespaces: BTreeMap<Namespace, Vec<Extension<B, C>>>,
}

impl<B, C> Default for PluginRegistry<B, C> {
    fn default() -> Self {
        Self {
            namespaces: BTreeMap::new(),
        }
    }
}

impl<B, C> PluginRegistry<B, C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name` in `namespace`.
    pub fn register<F>(&mut self, namespace: Namespace, name: CommandName, factory: F) -> &mut Self
    where
        F: Fn(Arc<B>) -> anyhow::Result<C> + Send + Sync + 'static,
    {
        self.insert(namespace, Extension::new(name, factory))
    }

    /// Registers an already built extension in `namespace`.
    pub fn insert(&mut self, namespace: Namespace, extension: Extension<B, C>) -> &mut Self {
        let extensions = self.namespaces.entry(namespace).or_default();
        match extensions.iter_mut().find(|e| e.name == extension.name) {
            Some(existing) => *existing = extension,
            None => extensions.push(extension),
        }
        self
    }

    /// Namespaces with at least one plugin.
    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces
            .iter()
            .filter(|(_, extensions)| !extensions.is_empty())
            .map(|(namespace, _)| namespace)
    }

    /// Names registered under `namespace`, in registration order.
    pub fn names(&self, namespace: &Namespace) -> impl Iterator<Item = &CommandName> {
        self.namespaces
            .get(namespace)
            .into_iter()
            .flatten()
            .map(|extension| &extension.name)
    }
}

impl<B, C> PluginSource<B, C> for PluginRegistry<B, C> {
    fn discover(&self, namespace: &Namespace) -> Result<Vec<Extension<B, C>>, DiscoveryError> {
        match self.namespaces.get(namespace) {
            Some(extensions) if !extensions.is_empty() => Ok(extensions.clone()),
            _ => Err(DiscoveryError::NoPlugins {
                namespace: namespace.clone(),
            }),
        }
    }
}

impl<B, C> std::fmt::Debug for PluginRegistry<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.namespaces.iter().map(|(namespace, extensions)| {
                let names: Vec<&str> = extensions.iter().map(|e| e.name.as_str()).collect();
                (namespace.as_str(), names)
            }))
            .finish()
    }
}
