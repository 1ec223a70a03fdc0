//! The client: a container of commands built from one session builder.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use connection::{CommandName, Namespace};

use crate::errors::{ClientError, DiscoveryError};
use crate::registry::{Extension, PluginSource};
use crate::session::SessionBuilder;

/// Exposes one command per plugin discovered under a namespace.
///
/// Commands are instantiated once, at construction, each with a shared
/// reference to the same session builder. The set of commands is fixed
/// afterwards.
#[derive(Debug)]
pub struct Client<C, B = SessionBuilder> {
    namespace: Namespace,
    session_builder: Arc<B>,
    commands: BTreeMap<CommandName, C>,
}

impl<C, B> Client<C, B> {
    /// Discovers the plugins under `namespace` and instantiates each of them
    /// with `session_builder`.
    ///
    /// An empty namespace is not an error: a warning is logged and the client
    /// has no commands.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Discovery`] if the plugin source fails for any reason
    ///   other than an empty namespace.
    /// - [`ClientError::Instantiate`] if a plugin factory fails. No client is
    ///   returned in that case.
    #[instrument(skip_all, fields(namespace = %namespace))]
    pub fn new(
        namespace: Namespace,
        session_builder: Arc<B>,
        plugins: &dyn PluginSource<B, C>,
    ) -> Result<Self, ClientError> {
        let mut client = Self {
            namespace,
            session_builder,
            commands: BTreeMap::new(),
        };
        client.load_plugins(plugins)?;
        Ok(client)
    }

    fn load_plugins(&mut self, plugins: &dyn PluginSource<B, C>) -> Result<(), ClientError> {
        let extensions = match plugins.discover(&self.namespace) {
            Ok(extensions) => extensions,
            Err(DiscoveryError::NoPlugins { .. }) => {
                warn!(namespace = %self.namespace, "No commands found");
                return Ok(());
            }
            Err(e) => return Err(ClientError::Discovery(e)),
        };

        for extension in extensions {
            self.add_command(extension)?;
        }
        Ok(())
    }

    fn add_command(&mut self, extension: Extension<B, C>) -> Result<(), ClientError> {
        let command = extension
            .instantiate(Arc::clone(&self.session_builder))
            .map_err(|source| ClientError::Instantiate {
                name: extension.name.clone(),
                source,
            })?;
        debug!(command = %extension.name, "Attached command");
        self.commands.insert(extension.name, command);
        Ok(())
    }

    /// Namespace the commands were discovered under.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The session builder shared by every command.
    pub fn session_builder(&self) -> &Arc<B> {
        &self.session_builder
    }

    /// Returns the command registered under `name`.
    pub fn command(&self, name: &str) -> Option<&C> {
        self.commands.get(name)
    }

    /// Names of every attached command, sorted.
    pub fn command_names(&self) -> impl Iterator<Item = &CommandName> {
        self.commands.keys()
    }

    /// Every attached command with its name, sorted by name.
    pub fn commands(&self) -> impl Iterator<Item = (&CommandName, &C)> {
        self.commands.iter()
    }

    /// Number of attached commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if no command is attached.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Generates a trait with one typed accessor per known command name and
/// implements it for [`Client`].
///
/// ```
/// use rest_client::command_accessors;
///
/// command_accessors! {
///     /// Commands of the configuration API.
///     pub trait ConfdCommands for String { users, lines }
/// }
/// ```
///
/// `client.users()` is then equivalent to `client.command("users")`.
#[macro_export]
macro_rules! command_accessors {
    (
        $(#[$attr:meta])*
        $vis:vis trait $name:ident for $command:ty { $($accessor:ident),+ $(,)? }
    ) => {
        $(#[$attr])*
        $vis trait $name {
            $(
                #[doc = concat!("Returns the `", stringify!($accessor), "` command, if registered.")]
                fn $accessor(&self) -> Option<&$command>;
            )+
        }

        impl<B> $name for $crate::Client<$command, B> {
            $(
                fn $accessor(&self) -> Option<&$command> {
                    self.command(stringify!($accessor))
                }
            )+
        }
    };
}
