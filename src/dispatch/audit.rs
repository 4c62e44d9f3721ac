use std::sync::Arc;

use anyhow::Context as _;
use serenity::all::{
    ChannelId, Colour, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, CreateMessage, GuildChannel,
    GuildId, Http,
};
use tokio::sync::OnceCell;

use super::invocation::Invocation;
use crate::constant;

/// What gets posted to the audit channel for one invocation
#[derive(Clone, Debug, PartialEq)]
pub struct AuditRecord {
    pub title: String,
    pub author_name: String,
    pub author_icon_url: String,
    pub colour: Colour,
    pub footer_text: String,
    pub footer_icon_url: Option<String>,
}

impl AuditRecord {
    pub fn from_invocation(invocation: &Invocation, fallback_colour: Colour) -> Self {
        let (footer_text, footer_icon_url) = match &invocation.guild {
            Some(guild) => (
                format!("{} | {}", guild.name, guild.id),
                guild.icon_url.clone(),
            ),
            None => (constant::audit::DM_FOOTER.to_string(), None),
        };

        Self {
            title: invocation.command_name.clone(),
            author_name: format!(
                "{} | {}",
                invocation.user.display_name, invocation.user.id
            ),
            author_icon_url: invocation.user.avatar_url.clone(),
            colour: accent_colour(invocation.role_colour, fallback_colour),
            footer_text,
            footer_icon_url,
        }
    }

    pub fn to_embed(&self) -> CreateEmbed {
        let mut footer = CreateEmbedFooter::new(&self.footer_text);
        if let Some(icon_url) = &self.footer_icon_url {
            footer = footer.icon_url(icon_url);
        }

        CreateEmbed::new()
            .title(&self.title)
            .author(CreateEmbedAuthor::new(&self.author_name).icon_url(&self.author_icon_url))
            .colour(self.colour)
            .footer(footer)
    }
}

fn accent_colour(role_colour: Option<Colour>, fallback: Colour) -> Colour {
    role_colour.filter(|c| c.0 != 0).unwrap_or(fallback)
}

/// Where audit records end up
#[serenity::async_trait]
pub trait AuditSink: Send + Sync {
    async fn deliver(&self, record: &AuditRecord) -> anyhow::Result<()>;
}

/// Posts audit records to a channel that must belong to a specific guild.
///
/// The channel is looked up on the first delivery and remembered once it
/// has been confirmed to belong to the guild.
pub struct GuildChannelAuditSink {
    http: Arc<Http>,
    guild_id: GuildId,
    channel_id: ChannelId,
    channel: OnceCell<GuildChannel>,
}

impl GuildChannelAuditSink {
    pub fn new(http: Arc<Http>, guild_id: GuildId, channel_id: ChannelId) -> Self {
        Self {
            http,
            guild_id,
            channel_id,
            channel: OnceCell::new(),
        }
    }

    async fn resolve_channel(&self) -> anyhow::Result<GuildChannel> {
        let channel = self
            .channel_id
            .to_channel(&self.http)
            .await
            .with_context(|| format!("failed to fetch audit channel {}", self.channel_id))?;
        channel
            .guild()
            .filter(|channel| channel.guild_id == self.guild_id)
            .with_context(|| {
                format!(
                    "channel {} is not part of guild {}",
                    self.channel_id, self.guild_id
                )
            })
    }
}

#[serenity::async_trait]
impl AuditSink for GuildChannelAuditSink {
    async fn deliver(&self, record: &AuditRecord) -> anyhow::Result<()> {
        let channel = self
            .channel
            .get_or_try_init(|| self.resolve_channel())
            .await?;

        channel
            .send_message(&self.http, CreateMessage::new().embed(record.to_embed()))
            .await?;
        Ok(())
    }
}
