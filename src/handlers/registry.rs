use std::collections::HashMap;

use mlua::Lua;
use tracing::{error, info, warn};

use super::{
    CommandDefinition, CommandHandler, EventHandler, HandlerModule,
    loader::{self, LoadOutcome},
};
use crate::{config, constant};

/// Event and command handlers, fixed once startup loading is done
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    events: HashMap<String, EventHandler>,
    commands: HashMap<String, CommandHandler>,
    registered_commands: Vec<CommandDefinition>,
}

impl HandlerRegistry {
    /// Loads both handler directories and waits for every file to settle.
    pub async fn load(lua: &Lua, config: &config::Handlers) -> Self {
        let (events, commands) = tokio::join!(
            loader::load_directory::<EventHandler>(lua, &config.event_directory, &config.extension),
            loader::load_directory::<CommandHandler>(
                lua,
                &config.command_directory,
                &config.extension
            ),
        );

        let mut builder = RegistryBuilder::default();
        match events {
            Ok(outcomes) => apply(outcomes, |h| builder.add_event(h)),
            Err(err) => error!("cannot load event handlers: {err}"),
        }
        match commands {
            Ok(outcomes) => apply(outcomes, |h| builder.add_command(h)),
            Err(err) => error!("cannot load command handlers: {err}"),
        }

        let registry = builder.build();
        info!(
            "loaded {} event handler(s) and {} command handler(s)",
            registry.events.len(),
            registry.commands.len()
        );
        registry
    }

    pub fn event(&self, name: &str) -> Option<&EventHandler> {
        self.events.get(name)
    }

    pub fn command(&self, name: &str) -> Option<&CommandHandler> {
        self.commands.get(name)
    }

    /// Every definition that was loaded, in load order, duplicates included
    pub fn registered_commands(&self) -> &[CommandDefinition] {
        &self.registered_commands
    }
}

fn apply<H: HandlerModule>(outcomes: Vec<LoadOutcome<H>>, mut add: impl FnMut(H)) {
    for LoadOutcome { path, result } in outcomes {
        let file = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match result {
            Ok(handler) => {
                info!("loaded {} `{}` from {file}", H::KIND, handler.name());
                add(handler);
            }
            Err(err) => error!("cannot load {} {file}: {err}", H::KIND),
        }
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    registry: HandlerRegistry,
}

impl RegistryBuilder {
    pub fn add_event(&mut self, handler: EventHandler) {
        if !constant::events::DISPATCHED.contains(&handler.name.as_str()) {
            warn!(
                "event handler `{}` is loaded but that event is never dispatched",
                handler.name
            );
        }
        if self.registry.events.contains_key(&handler.name) {
            warn!("event handler `{}` was loaded twice; the later one wins", handler.name);
        }
        self.registry.events.insert(handler.name.clone(), handler);
    }

    pub fn add_command(&mut self, handler: CommandHandler) {
        if self.registry.commands.contains_key(&handler.name) {
            warn!("command `{}` was loaded twice; the later one wins", handler.name);
        }
        self.registry
            .registered_commands
            .push(handler.definition.clone());
        self.registry.commands.insert(handler.name.clone(), handler);
    }

    pub fn build(self) -> HandlerRegistry {
        self.registry
    }
}
