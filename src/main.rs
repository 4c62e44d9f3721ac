use std::sync::{Arc, OnceLock};

use serenity::{
    Client,
    all::{
        ChannelId, CommandInteraction, CommandType, Context, EventHandler, GuildId, Interaction,
        Ready,
    },
    async_trait,
    model::prelude::GatewayIntents,
};
use tracing::{debug, info};

mod config;
mod constant;
mod dispatch;
mod error;
mod handlers;
mod lua;
mod messages;

use config::Configuration;

use crate::{
    dispatch::{
        Dispatcher,
        audit::{AuditSink, GuildChannelAuditSink},
        invocation::Invocation,
    },
    error::DispatchError,
    handlers::HandlerRegistry,
    lua::{LuaClient, SerenityRegistrar, SerenityResponder},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    dotenv::dotenv().ok();

    let config = Configuration::load()?;
    let audit_guild = config.discord.audit_guild()?;
    let audit_channel = config.discord.audit_channel()?;

    let lua = lua::create_lua_state()?;
    // Every handler file has settled before the gateway can deliver events
    let registry = Arc::new(HandlerRegistry::load(&lua, &config.handlers).await);
    let dispatcher = Arc::new(Dispatcher::new(
        lua,
        registry,
        config.discord.fallback_colour(),
    ));

    let Some(discord_token) = config.discord_token() else {
        DispatchError::Login(anyhow::anyhow!(
            "no token in authentication.discord_token or ${}",
            config::TOKEN_ENV_VAR
        ))
        .report();
        return Ok(());
    };

    let client = Client::builder(discord_token, GatewayIntents::all())
        .event_handler(Handler {
            dispatcher,
            audit_guild,
            audit_channel,
            audit: OnceLock::new(),
        })
        .await;
    let mut client = match client {
        Ok(client) => client,
        Err(why) => {
            DispatchError::Login(why.into()).report();
            return Ok(());
        }
    };

    info!("logging in to Discord");
    if let Err(why) = client.start().await {
        DispatchError::Login(why.into()).report();
    }

    Ok(())
}

pub struct Handler {
    dispatcher: Arc<Dispatcher>,
    audit_guild: GuildId,
    audit_channel: ChannelId,
    /// Built from the first interaction's HTTP client, then shared
    audit: OnceLock<Arc<dyn AuditSink>>,
}

impl Handler {
    fn audit_sink(&self, ctx: &Context) -> Arc<dyn AuditSink> {
        self.audit
            .get_or_init(|| {
                Arc::new(GuildChannelAuditSink::new(
                    ctx.http.clone(),
                    self.audit_guild,
                    self.audit_channel,
                ))
            })
            .clone()
    }
}

/// Only chat-input slash commands are dispatched; every other interaction is ignored.
fn chat_input(interaction: Interaction) -> Option<CommandInteraction> {
    match interaction {
        Interaction::Command(cmd) if cmd.data.kind == CommandType::ChatInput => Some(cmd),
        _ => None,
    }
}
#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected", ready.user.name);

        let registrar = Arc::new(SerenityRegistrar::new(ctx.http.clone()));
        let client = LuaClient::from_ready(&ready, registrar);
        if let Err(err) = self.dispatcher.dispatch_ready(client).await {
            err.report();
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Some(cmd) = chat_input(interaction) else {
            return;
        };

        let invocation = Invocation::from_command(&ctx, &cmd).await;
        let audit = self.audit_sink(&ctx);
        let responder = Arc::new(SerenityResponder::new(ctx.http.clone(), cmd));

        match self
            .dispatcher
            .dispatch_command(invocation, responder, audit)
            .await
        {
            Ok(outcome) => debug!("interaction handled: {outcome:?}"),
            Err(err) => err.report(),
        }
    }
}
