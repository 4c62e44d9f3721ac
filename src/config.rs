use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serenity::all::{ChannelId, Colour, GuildId};

/// Environment variable that overrides `authentication.discord_token`
pub const TOKEN_ENV_VAR: &str = "DISCORD_TOKEN";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Configuration {
    pub authentication: Authentication,
    pub discord: Discord,
    pub handlers: Handlers,
}
impl Configuration {
    const FILENAME: &str = "config.toml";

    pub fn load() -> anyhow::Result<Self> {
        let config = if let Ok(file) = std::fs::read_to_string(Self::FILENAME) {
            Self::parse(&file)?
        } else {
            Self::default()
        };
        config.save()?;

        Ok(config)
    }

    fn parse(file: &str) -> anyhow::Result<Self> {
        toml::from_str(file).context("failed to load config")
    }

    fn save(&self) -> anyhow::Result<()> {
        Ok(std::fs::write(
            Self::FILENAME,
            toml::to_string_pretty(self)?,
        )?)
    }

    /// The token to log in with; the environment wins over the config file.
    pub fn discord_token(&self) -> Option<String> {
        resolve_token(
            self.authentication.discord_token.as_deref(),
            std::env::var(TOKEN_ENV_VAR).ok(),
        )
    }
}

fn resolve_token(from_file: Option<&str>, from_env: Option<String>) -> Option<String> {
    from_env
        .filter(|t| !t.trim().is_empty())
        .or_else(|| from_file.map(str::to_string))
        .filter(|t| !t.trim().is_empty())
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Authentication {
    pub discord_token: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Discord {
    /// Guild that holds the audit channel
    pub audit_guild_id: u64,
    /// Channel every slash command invocation is logged to
    pub audit_channel_id: u64,
    /// Embed colour used when the invoker has no coloured role
    pub fallback_colour: u32,
}
impl Default for Discord {
    fn default() -> Self {
        Self {
            audit_guild_id: 1074670271312711740,
            audit_channel_id: 1180762852357845002,
            fallback_colour: 0x5865F2,
        }
    }
}
impl Discord {
    pub fn audit_guild(&self) -> anyhow::Result<GuildId> {
        anyhow::ensure!(self.audit_guild_id != 0, "discord.audit_guild_id must be set");
        Ok(GuildId::new(self.audit_guild_id))
    }

    pub fn audit_channel(&self) -> anyhow::Result<ChannelId> {
        anyhow::ensure!(
            self.audit_channel_id != 0,
            "discord.audit_channel_id must be set"
        );
        Ok(ChannelId::new(self.audit_channel_id))
    }

    pub fn fallback_colour(&self) -> Colour {
        Colour::new(self.fallback_colour)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Handlers {
    pub event_directory: PathBuf,
    pub command_directory: PathBuf,
    /// Only files with this extension are loaded as handler modules
    pub extension: String,
}
impl Default for Handlers {
    fn default() -> Self {
        Self {
            event_directory: PathBuf::from("event"),
            command_directory: PathBuf::from("command"),
            extension: "lua".to_string(),
        }
    }
}
