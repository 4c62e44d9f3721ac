use mlua::{LuaSerdeExt as _, prelude::*};

use crate::error::LoadError;

pub mod definition;
pub mod loader;
pub mod registry;

pub use definition::CommandDefinition;
pub use registry::HandlerRegistry;

/// Something a handler script can be turned into once its chunk has run
pub trait HandlerModule: Sized {
    /// Used in log lines ("event", "command")
    const KIND: &'static str;

    fn from_table(lua: &Lua, table: LuaTable) -> Result<Self, LoadError>;
    fn name(&self) -> &str;
}

/// An `event/` module: `{ name = "ready", execute = function(client, commands) ... end }`
#[derive(Clone, Debug)]
pub struct EventHandler {
    pub name: String,
    pub execute: LuaFunction,
}

impl HandlerModule for EventHandler {
    const KIND: &'static str = "event";

    fn from_table(_lua: &Lua, table: LuaTable) -> Result<Self, LoadError> {
        Ok(Self {
            name: required_name(&table)?,
            execute: required_execute(&table)?,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A `command/` module: `{ name, data = { description, options }, execute = function(interaction) ... end }`
#[derive(Clone, Debug)]
pub struct CommandHandler {
    pub name: String,
    pub definition: CommandDefinition,
    pub execute: LuaFunction,
}

impl HandlerModule for CommandHandler {
    const KIND: &'static str = "command";

    fn from_table(lua: &Lua, table: LuaTable) -> Result<Self, LoadError> {
        let name = required_name(&table)?;
        let execute = required_execute(&table)?;

        let data: LuaValue = table.get("data")?;
        if data.is_nil() {
            return Err(LoadError::MissingField("data"));
        }
        let mut definition: CommandDefinition = lua.from_value(data)?;
        if definition.name.is_empty() {
            definition.name = name.clone();
        }
        definition.validate()?;

        Ok(Self {
            name,
            definition,
            execute,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn required_name(table: &LuaTable) -> Result<String, LoadError> {
    table
        .get::<Option<String>>("name")?
        .filter(|name| !name.is_empty())
        .ok_or(LoadError::MissingField("name"))
}

fn required_execute(table: &LuaTable) -> Result<LuaFunction, LoadError> {
    table
        .get::<Option<LuaFunction>>("execute")?
        .ok_or(LoadError::MissingField("execute"))
}
