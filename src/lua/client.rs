use std::sync::Arc;

use mlua::{LuaSerdeExt as _, prelude::*};
use serenity::all::{Command, GuildId, Http, Ready, UserId};
use tracing::{debug, info};

use crate::handlers::CommandDefinition;

/// Pushes command definitions to Discord
#[serenity::async_trait]
pub trait CommandRegistrar: Send + Sync {
    async fn set_global_commands(&self, commands: &[CommandDefinition]) -> anyhow::Result<()>;
    async fn set_guild_commands(
        &self,
        guild_id: GuildId,
        commands: &[CommandDefinition],
    ) -> anyhow::Result<()>;
}

pub struct SerenityRegistrar {
    http: Arc<Http>,
}

impl SerenityRegistrar {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[serenity::async_trait]
impl CommandRegistrar for SerenityRegistrar {
    async fn set_global_commands(&self, commands: &[CommandDefinition]) -> anyhow::Result<()> {
        let registered = Command::set_global_commands(
            &self.http,
            commands.iter().map(|c| c.to_discord_command()).collect(),
        )
        .await?;
        info!("registered {} global command(s)", registered.len());
        Ok(())
    }

    async fn set_guild_commands(
        &self,
        guild_id: GuildId,
        commands: &[CommandDefinition],
    ) -> anyhow::Result<()> {
        let registered = guild_id
            .set_commands(
                &self.http,
                commands.iter().map(|c| c.to_discord_command()).collect(),
            )
            .await?;
        info!(
            "registered {} command(s) in guild {guild_id}",
            registered.len()
        );
        Ok(())
    }
}

/// The `client` argument handed to the `ready` event module
pub struct LuaClient {
    user_id: UserId,
    user_name: String,
    guild_count: usize,
    registrar: Arc<dyn CommandRegistrar>,
}

impl LuaClient {
    pub fn new(
        user_id: UserId,
        user_name: String,
        guild_count: usize,
        registrar: Arc<dyn CommandRegistrar>,
    ) -> Self {
        Self {
            user_id,
            user_name,
            guild_count,
            registrar,
        }
    }

    pub fn from_ready(ready: &Ready, registrar: Arc<dyn CommandRegistrar>) -> Self {
        Self::new(
            ready.user.id,
            ready.user.name.clone(),
            ready.guilds.len(),
            registrar,
        )
    }
}

impl LuaUserData for LuaClient {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("user_id", |_, this| Ok(this.user_id.get().to_string()));
        fields.add_field_method_get("user_name", |_, this| Ok(this.user_name.clone()));
        fields.add_field_method_get("guild_count", |_, this| Ok(this.guild_count));
    }

    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_async_method("register_commands", |lua, this, commands: LuaValue| {
            let registrar = this.registrar.clone();
            async move {
                let commands = parse_commands(&lua, commands)?;
                registrar
                    .set_global_commands(&commands)
                    .await
                    .map_err(LuaError::external)?;
                Ok(commands.len())
            }
        });
        methods.add_async_method(
            "register_guild_commands",
            |lua, this, (guild_id, commands): (String, LuaValue)| {
                let registrar = this.registrar.clone();
                async move {
                    let guild_id = guild_id
                        .parse::<u64>()
                        .ok()
                        .filter(|id| *id != 0)
                        .map(GuildId::new)
                        .ok_or_else(|| LuaError::runtime(format!("invalid guild id: {guild_id}")))?;
                    let commands = parse_commands(&lua, commands)?;
                    registrar
                        .set_guild_commands(guild_id, &commands)
                        .await
                        .map_err(LuaError::external)?;
                    Ok(commands.len())
                }
            },
        );
    }
}

fn parse_commands(lua: &Lua, value: LuaValue) -> LuaResult<Vec<CommandDefinition>> {
    let commands: Vec<CommandDefinition> = lua.from_value(value)?;
    for command in &commands {
        command.validate().map_err(LuaError::external)?;
    }
    if let Ok(json) = serde_json::to_string(&commands) {
        debug!("command definitions: {json}");
    }
    Ok(commands)
}
