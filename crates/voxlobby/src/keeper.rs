//! `LobbyKeeper` builder: wires the store, factories, default listeners
//! and dispatcher together on top of a [`Platform`].
//!
//! This is the entry point for running voxlobby. It ties together all the
//! layers: platform → dispatcher → listeners → lobbies.

use std::sync::Arc;

use voxlobby_lobby::{
    CreateListener, JoinListener, LeaveListener, LobbyConfig, LobbyFactory, LobbyStore,
    MembershipJoinListener, ProvisioningListener, TeardownLeaveListener,
};
use voxlobby_platform::Platform;

use crate::settings::validate;
use crate::{Dispatcher, Settings, VoxlobbyError};

/// Runtime knobs that are not part of the lobby definitions.
#[derive(Debug, Clone)]
pub struct KeeperOptions {
    /// Command buffer of each lobby actor.
    pub command_buffer: usize,
}

impl Default for KeeperOptions {
    fn default() -> Self {
        Self { command_buffer: 32 }
    }
}

/// Builder for a [`LobbyKeeper`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use voxlobby::{LobbyKeeperBuilder, Settings};
/// use voxlobby_platform::MemoryPlatform;
///
/// # fn main() -> Result<(), voxlobby::VoxlobbyError> {
/// # let json = "";
/// let keeper = LobbyKeeperBuilder::new()
///     .settings(Settings::from_json(json)?)
///     .build(Arc::new(MemoryPlatform::new()))?;
/// keeper.start()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct LobbyKeeperBuilder {
    settings: Option<Settings>,
    lobbies: Vec<LobbyConfig>,
    options: KeeperOptions,
    create: Vec<Arc<dyn CreateListener>>,
    join: Vec<Arc<dyn JoinListener>>,
    leave: Vec<Arc<dyn LeaveListener>>,
}

impl LobbyKeeperBuilder {
    /// Creates a builder with no lobbies and default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every lobby defined in `settings`.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Adds an already resolved lobby configuration.
    pub fn lobby(mut self, config: LobbyConfig) -> Self {
        self.lobbies.push(config);
        self
    }

    pub fn options(mut self, options: KeeperOptions) -> Self {
        self.options = options;
        self
    }

    /// Registers an extra creation listener. It runs after the built-in one.
    pub fn create_listener(mut self, listener: Arc<dyn CreateListener>) -> Self {
        self.create.push(listener);
        self
    }

    /// Registers an extra join listener. It runs after the built-in one.
    pub fn join_listener(mut self, listener: Arc<dyn JoinListener>) -> Self {
        self.join.push(listener);
        self
    }

    /// Registers an extra leave listener. It runs after the built-in one.
    pub fn leave_listener(mut self, listener: Arc<dyn LeaveListener>) -> Self {
        self.leave.push(listener);
        self
    }

    /// Validates the configuration and assembles the keeper.
    ///
    /// Nothing is sent to the platform until [`LobbyKeeper::start`].
    pub fn build<P: Platform>(self, platform: Arc<P>) -> Result<LobbyKeeper<P>, VoxlobbyError> {
        let mut configs = match &self.settings {
            Some(settings) => settings.resolve()?,
            None => Vec::new(),
        };
        configs.extend(self.lobbies);
        validate(&configs)?;

        let store = Arc::new(LobbyStore::new());
        let mut provisioning = ProvisioningListener::new(Arc::clone(&store));
        let mut dispatcher = Dispatcher::new(Arc::clone(&store));
        for config in configs {
            tracing::debug!(
                trigger = %config.trigger,
                lobby = %config.name,
                capacity = config.capacity,
                "lobby kind configured"
            );
            dispatcher = dispatcher.with_trigger(config.trigger);
            let factory = LobbyFactory::new(Arc::clone(&platform), config)
                .with_channel_size(self.options.command_buffer);
            provisioning = provisioning.with_factory(Arc::new(factory));
        }

        dispatcher = dispatcher
            .with_create_listener(Arc::new(provisioning))
            .with_join_listener(Arc::new(MembershipJoinListener))
            .with_leave_listener(Arc::new(TeardownLeaveListener::new(Arc::clone(&store))));
        for listener in self.create {
            dispatcher = dispatcher.with_create_listener(listener);
        }
        for listener in self.join {
            dispatcher = dispatcher.with_join_listener(listener);
        }
        for listener in self.leave {
            dispatcher = dispatcher.with_leave_listener(listener);
        }

        Ok(LobbyKeeper {
            platform,
            store,
            dispatcher: Arc::new(dispatcher),
        })
    }
}

/// A configured lobby engine bound to a platform.
///
/// Call [`start()`](Self::start) to begin reacting to membership events.
pub struct LobbyKeeper<P: Platform> {
    platform: Arc<P>,
    store: Arc<LobbyStore>,
    dispatcher: Arc<Dispatcher>,
}

impl<P: Platform> LobbyKeeper<P> {
    /// Creates a new builder.
    pub fn builder() -> LobbyKeeperBuilder {
        LobbyKeeperBuilder::new()
    }

    /// Subscribes to the platform's event stream and starts dispatching.
    pub fn start(&self) -> Result<(), VoxlobbyError> {
        self.dispatcher.start(self.platform.subscribe())?;
        Ok(())
    }

    /// Detaches from the event stream. Safe to call repeatedly.
    ///
    /// Live lobbies are left as they are.
    pub async fn stop(&self) {
        self.dispatcher.stop().await;
    }

    pub fn is_running(&self) -> bool {
        self.dispatcher.is_running()
    }

    /// The registry of live lobbies.
    pub fn store(&self) -> &Arc<LobbyStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }
}
