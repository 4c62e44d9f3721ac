use std::sync::Arc;

use mlua::{LuaSerdeExt as _, prelude::*};
use serenity::all::{
    CommandInteraction, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, CreateMessage, EditInteractionResponse, Http,
};

use crate::dispatch::invocation::Invocation;

/// The ways a command can answer the user who invoked it
#[serenity::async_trait]
pub trait Responder: Send + Sync {
    async fn reply(&self, content: &str, ephemeral: bool) -> anyhow::Result<()>;
    async fn defer(&self, ephemeral: bool) -> anyhow::Result<()>;
    async fn edit_reply(&self, content: &str) -> anyhow::Result<()>;
    async fn followup(&self, content: &str, ephemeral: bool) -> anyhow::Result<()>;
    async fn direct_message(&self, content: &str) -> anyhow::Result<()>;
}

pub struct SerenityResponder {
    http: Arc<Http>,
    cmd: CommandInteraction,
}

impl SerenityResponder {
    pub fn new(http: Arc<Http>, cmd: CommandInteraction) -> Self {
        Self { http, cmd }
    }
}

#[serenity::async_trait]
impl Responder for SerenityResponder {
    async fn reply(&self, content: &str, ephemeral: bool) -> anyhow::Result<()> {
        Ok(self
            .cmd
            .create_response(
                &self.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content(content)
                        .ephemeral(ephemeral),
                ),
            )
            .await?)
    }

    async fn defer(&self, ephemeral: bool) -> anyhow::Result<()> {
        if ephemeral {
            self.cmd.defer_ephemeral(&self.http).await?;
        } else {
            self.cmd.defer(&self.http).await?;
        }
        Ok(())
    }

    async fn edit_reply(&self, content: &str) -> anyhow::Result<()> {
        self.cmd
            .edit_response(&self.http, EditInteractionResponse::new().content(content))
            .await?;
        Ok(())
    }

    async fn followup(&self, content: &str, ephemeral: bool) -> anyhow::Result<()> {
        self.cmd
            .create_followup(
                &self.http,
                CreateInteractionResponseFollowup::new()
                    .content(content)
                    .ephemeral(ephemeral),
            )
            .await?;
        Ok(())
    }

    async fn direct_message(&self, content: &str) -> anyhow::Result<()> {
        self.cmd
            .user
            .direct_message(&self.http, CreateMessage::new().content(content))
            .await?;
        Ok(())
    }
}

/// The `interaction` argument handed to a command module's `execute`
pub struct LuaInteraction {
    invocation: Arc<Invocation>,
    responder: Arc<dyn Responder>,
}

impl LuaInteraction {
    pub fn new(invocation: Arc<Invocation>, responder: Arc<dyn Responder>) -> Self {
        Self {
            invocation,
            responder,
        }
    }
}

impl LuaUserData for LuaInteraction {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("command_name", |_, this| {
            Ok(this.invocation.command_name.clone())
        });
        fields.add_field_method_get("user_id", |_, this| {
            Ok(this.invocation.user.id.get().to_string())
        });
        fields.add_field_method_get("user_name", |_, this| Ok(this.invocation.user.name.clone()));
        fields.add_field_method_get("display_name", |_, this| {
            Ok(this.invocation.user.display_name.clone())
        });
        fields.add_field_method_get("locale", |_, this| Ok(this.invocation.locale.clone()));
        fields.add_field_method_get("channel_id", |_, this| {
            Ok(this.invocation.channel_id.get().to_string())
        });
        fields.add_field_method_get("guild_id", |_, this| {
            Ok(this
                .invocation
                .guild
                .as_ref()
                .map(|g| g.id.get().to_string()))
        });
        fields.add_field_method_get("guild_name", |_, this| {
            Ok(this.invocation.guild.as_ref().map(|g| g.name.clone()))
        });
        fields.add_field_method_get("options", |lua, this| {
            lua.to_value(&this.invocation.options)
        });
    }

    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_async_method(
            "reply",
            |_, this, (content, ephemeral): (String, Option<bool>)| {
                let responder = this.responder.clone();
                async move {
                    responder
                        .reply(&content, ephemeral.unwrap_or(false))
                        .await
                        .map_err(LuaError::external)
                }
            },
        );
        methods.add_async_method("defer", |_, this, ephemeral: Option<bool>| {
            let responder = this.responder.clone();
            async move {
                responder
                    .defer(ephemeral.unwrap_or(false))
                    .await
                    .map_err(LuaError::external)
            }
        });
        methods.add_async_method("edit_reply", |_, this, content: String| {
            let responder = this.responder.clone();
            async move {
                responder
                    .edit_reply(&content)
                    .await
                    .map_err(LuaError::external)
            }
        });
        methods.add_async_method(
            "followup",
            |_, this, (content, ephemeral): (String, Option<bool>)| {
                let responder = this.responder.clone();
                async move {
                    responder
                        .followup(&content, ephemeral.unwrap_or(false))
                        .await
                        .map_err(LuaError::external)
                }
            },
        );
    }
}
