use std::collections::HashMap;

use serde::Serialize;
use serenity::all::{
    ChannelId, Colour, CommandDataOptionValue, CommandInteraction, Context, GuildId, UserId,
};
use tracing::warn;

use crate::constant;

/// Everything the dispatcher needs to know about one slash command invocation
#[derive(Clone, Debug)]
pub struct Invocation {
    pub command_name: String,
    pub user: Invoker,
    /// The invoker's Discord locale, e.g. `ja` or `en-US`
    pub locale: String,
    pub channel_id: ChannelId,
    /// `None` for DMs
    pub guild: Option<GuildSummary>,
    /// Colour of the invoker's highest coloured role, if any
    pub role_colour: Option<Colour>,
    pub options: HashMap<String, OptionValue>,
}

#[derive(Clone, Debug)]
pub struct Invoker {
    pub id: UserId,
    pub name: String,
    pub display_name: String,
    pub avatar_url: String,
}

#[derive(Clone, Debug)]
pub struct GuildSummary {
    pub id: GuildId,
    pub name: String,
    pub icon_url: Option<String>,
}

/// A command option value
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
}

impl OptionValue {
    fn from_discord(value: &CommandDataOptionValue) -> Option<Self> {
        Some(match value {
            CommandDataOptionValue::String(s) => Self::String(s.clone()),
            CommandDataOptionValue::Integer(i) => Self::Integer(*i),
            CommandDataOptionValue::Number(n) => Self::Number(*n),
            CommandDataOptionValue::Boolean(b) => Self::Boolean(*b),
            // Snowflakes are handed to scripts as strings
            CommandDataOptionValue::User(id) => Self::String(id.get().to_string()),
            CommandDataOptionValue::Channel(id) => Self::String(id.get().to_string()),
            CommandDataOptionValue::Role(id) => Self::String(id.get().to_string()),
            CommandDataOptionValue::Mentionable(id) => Self::String(id.get().to_string()),
            CommandDataOptionValue::Attachment(id) => Self::String(id.get().to_string()),
            _ => return None,
        })
    }
}

impl Invocation {
    pub async fn from_command(ctx: &Context, cmd: &CommandInteraction) -> Self {
        let user = &cmd.user;

        let options = cmd
            .data
            .options
            .iter()
            .filter_map(|opt| Some((opt.name.clone(), OptionValue::from_discord(&opt.value)?)))
            .collect();

        let role_colour = cmd
            .guild_id
            .zip(cmd.member.as_ref())
            .and_then(|(guild_id, member)| {
                let guild = ctx.cache.guild(guild_id)?;
                highest_role_colour(
                    member
                        .roles
                        .iter()
                        .filter_map(|id| guild.roles.get(id))
                        .map(|role| (role.position, role.colour)),
                )
            });

        let guild = match cmd.guild_id {
            Some(guild_id) => Some(guild_summary(ctx, guild_id).await),
            None => None,
        };

        Self {
            command_name: cmd.data.name.clone(),
            user: Invoker {
                id: user.id,
                name: user.name.clone(),
                display_name: user.display_name().to_string(),
                avatar_url: user.face(),
            },
            locale: cmd.locale.clone(),
            channel_id: cmd.channel_id,
            guild,
            role_colour,
            options,
        }
    }
}

async fn guild_summary(ctx: &Context, guild_id: GuildId) -> GuildSummary {
    let cached = ctx
        .cache
        .guild(guild_id)
        .map(|guild| (guild.name.clone(), guild.icon_url()));

    let (name, icon_url) = match cached {
        Some(found) => found,
        None => match guild_id.to_partial_guild(&ctx.http).await {
            Ok(guild) => (guild.name.clone(), guild.icon_url()),
            Err(err) => {
                warn!("could not fetch guild {guild_id}: {err}");
                (guild_id.to_string(), None)
            }
        },
    };

    GuildSummary {
        id: guild_id,
        name,
        icon_url: icon_url.map(|url| sized_icon_url(&url)),
    }
}

fn sized_icon_url(url: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}size={}", constant::audit::GUILD_ICON_SIZE)
}

/// Picks the colour of the highest-positioned role whose colour is set.
pub fn highest_role_colour(roles: impl IntoIterator<Item = (u16, Colour)>) -> Option<Colour> {
    roles
        .into_iter()
        .filter(|(_, colour)| colour.0 != 0)
        .max_by_key(|(position, _)| *position)
        .map(|(_, colour)| colour)
}
