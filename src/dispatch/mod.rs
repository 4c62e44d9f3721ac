use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use mlua::{Lua, LuaSerdeExt as _};
use serenity::all::Colour;
use tracing::{debug, info};

use crate::{
    constant,
    error::DispatchError,
    handlers::HandlerRegistry,
    lua::{LuaClient, LuaInteraction, Responder},
    messages::{self, Language},
};

pub mod audit;
pub mod invocation;

use audit::{AuditRecord, AuditSink};
use invocation::Invocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyOutcome {
    Dispatched,
    /// Readiness was already handled; later gateway `READY`s are ignored
    AlreadyFired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Executed,
    Unimplemented,
    /// The handler failed; the error text was sent to the invoker
    Failed(String),
}

/// Routes gateway events to the loaded handler modules
pub struct Dispatcher {
    lua: Lua,
    registry: Arc<HandlerRegistry>,
    fallback_colour: Colour,
    ready_fired: AtomicBool,
}

impl Dispatcher {
    pub fn new(lua: Lua, registry: Arc<HandlerRegistry>, fallback_colour: Colour) -> Self {
        Self {
            lua,
            registry,
            fallback_colour,
            ready_fired: AtomicBool::new(false),
        }
    }

    pub async fn dispatch_ready(&self, client: LuaClient) -> Result<ReadyOutcome, DispatchError> {
        if self.ready_fired.swap(true, Ordering::SeqCst) {
            debug!("ignoring repeated ready event");
            return Ok(ReadyOutcome::AlreadyFired);
        }

        let handler = self
            .registry
            .event(constant::events::READY)
            .ok_or(DispatchError::MissingEventHandler(constant::events::READY))?;

        let commands = self
            .lua
            .to_value(&self.registry.registered_commands().to_vec())
            .map_err(DispatchError::Ready)?;
        handler
            .execute
            .call_async::<()>((client, commands))
            .await
            .map_err(DispatchError::Ready)?;

        Ok(ReadyOutcome::Dispatched)
    }

    pub async fn dispatch_command(
        &self,
        invocation: Invocation,
        responder: Arc<dyn Responder>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<CommandOutcome, DispatchError> {
        // Delivery runs alongside the command so it can't eat into the
        // interaction's response window
        let record = AuditRecord::from_invocation(&invocation, self.fallback_colour);
        tokio::spawn(async move {
            if let Err(err) = audit.deliver(&record).await {
                DispatchError::Audit(err).report();
            }
        });

        let name = invocation.command_name.clone();
        let language = Language::from_locale(&invocation.locale);

        let Some(command) = self.registry.command(&name) else {
            responder
                .reply(&messages::unimplemented(language, &name), true)
                .await
                .map_err(|error| DispatchError::Reply {
                    name: name.clone(),
                    error,
                })?;
            return Ok(CommandOutcome::Unimplemented);
        };

        info!("/{name} invoked by {}", invocation.user.name);
        let interaction = LuaInteraction::new(Arc::new(invocation), responder.clone());
        match command.execute.call_async::<()>(interaction).await {
            Ok(()) => Ok(CommandOutcome::Executed),
            Err(source) => {
                let error_text = source.to_string();
                DispatchError::Command {
                    name: name.clone(),
                    source,
                }
                .report();

                if let Err(err) = responder
                    .direct_message(&messages::error_occurred(language, &error_text))
                    .await
                {
                    debug!("could not notify the invoker of /{name} about its failure: {err:#}");
                }
                Ok(CommandOutcome::Failed(error_text))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use serenity::all::UserId;
    use tokio::sync::Notify;

    use super::*;
    use crate::{
        handlers::{
            CommandHandler, EventHandler, loader::load_source, registry::RegistryBuilder,
        },
        lua::{
            client::tests::RecordingRegistrar,
            interaction::tests::{RecordingResponder, Response, invocation},
        },
    };

    #[derive(Default)]
    struct RecordingAuditSink {
        records: Mutex<Vec<AuditRecord>>,
        fail: bool,
        /// when set, deliveries wait here until released
        hold: Option<Notify>,
        settled: Notify,
    }

    impl RecordingAuditSink {
        fn held() -> Self {
            Self {
                hold: Some(Notify::new()),
                ..Default::default()
            }
        }

        fn release(&self) {
            if let Some(hold) = &self.hold {
                hold.notify_one();
            }
        }

        /// Waits for the next delivery attempt to finish
        async fn settled_records(&self) -> Vec<AuditRecord> {
            tokio::time::timeout(Duration::from_secs(5), self.settled.notified())
                .await
                .expect("audit delivery never settled");
            self.records.lock().unwrap().clone()
        }
    }

    #[serenity::async_trait]
    impl AuditSink for RecordingAuditSink {
        async fn deliver(&self, record: &AuditRecord) -> anyhow::Result<()> {
            if let Some(hold) = &self.hold {
                hold.notified().await;
            }
            let result = if self.fail {
                Err(anyhow::anyhow!("audit channel unavailable"))
            } else {
                self.records.lock().unwrap().push(record.clone());
                Ok(())
            };
            self.settled.notify_one();
            result
        }
    }

    const COUNTING_PING: &str = r#"
calls = 0
return {
    name = "ping",
    data = { description = "Replies with pong" },
    execute = function(interaction)
        calls = calls + 1
        last_command = interaction.command_name
        interaction:reply("pong")
    end,
}
"#;

    const FAILING: &str = r#"
return {
    name = "explode",
    data = { description = "Always fails" },
    execute = function(interaction)
        error("boom")
    end,
}
"#;

    const READY: &str = r#"
ready_calls = 0
return {
    name = "ready",
    execute = function(client, commands)
        ready_calls = ready_calls + 1
        client:register_commands(commands)
    end,
}
"#;

    async fn dispatcher(sources: &[(&str, &str)], events: &[(&str, &str)]) -> (Lua, Dispatcher) {
        let lua = crate::lua::create_lua_state().unwrap();
        let mut builder = RegistryBuilder::default();
        for (name, source) in sources {
            builder.add_command(load_source::<CommandHandler>(&lua, name, source).await.unwrap());
        }
        for (name, source) in events {
            builder.add_event(load_source::<EventHandler>(&lua, name, source).await.unwrap());
        }
        let dispatcher = Dispatcher::new(lua.clone(), Arc::new(builder.build()), Colour(0x123456));
        (lua, dispatcher)
    }

    #[tokio::test]
    async fn unknown_commands_get_a_private_unimplemented_reply() {
        let (lua, dispatcher) = dispatcher(&[("ping.lua", COUNTING_PING)], &[]).await;
        let responder = Arc::new(RecordingResponder::default());
        let audit = Arc::new(RecordingAuditSink::default());

        let outcome = dispatcher
            .dispatch_command(invocation("missing", "ja"), responder.clone(), audit.clone())
            .await
            .unwrap();

        assert_eq!(outcome, CommandOutcome::Unimplemented);
        assert_eq!(
            responder.responses(),
            [Response::Reply {
                content: "missingは未実装です。".to_string(),
                ephemeral: true
            }]
        );
        assert_eq!(lua.globals().get::<i64>("calls").unwrap(), 0);
        assert_eq!(audit.settled_records().await[0].title, "missing");
    }

    #[tokio::test]
    async fn known_commands_execute_exactly_once() {
        let (lua, dispatcher) = dispatcher(&[("ping.lua", COUNTING_PING)], &[]).await;
        let responder = Arc::new(RecordingResponder::default());
        let audit = Arc::new(RecordingAuditSink::default());

        let outcome = dispatcher
            .dispatch_command(invocation("ping", "en-US"), responder.clone(), audit.clone())
            .await
            .unwrap();

        assert_eq!(outcome, CommandOutcome::Executed);
        assert_eq!(lua.globals().get::<i64>("calls").unwrap(), 1);
        assert_eq!(lua.globals().get::<String>("last_command").unwrap(), "ping");
        assert_eq!(
            responder.responses(),
            [Response::Reply {
                content: "pong".to_string(),
                ephemeral: false
            }]
        );

        let records = audit.settled_records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].author_name, "Tester | 1234");
        assert_eq!(records[0].footer_text, "Test Guild | 66");
        assert_eq!(records[0].colour, Colour(0x123456));
    }

    #[tokio::test]
    async fn failing_commands_notify_the_invoker_once() {
        let (lua, dispatcher) =
            dispatcher(&[("ping.lua", COUNTING_PING), ("explode.lua", FAILING)], &[]).await;
        let responder = Arc::new(RecordingResponder::default());
        let audit = Arc::new(RecordingAuditSink::default());

        let outcome = dispatcher
            .dispatch_command(invocation("explode", "ja"), responder.clone(), audit.clone())
            .await
            .unwrap();

        let CommandOutcome::Failed(error_text) = outcome else {
            panic!("expected a failure, got {outcome:?}");
        };
        assert!(error_text.contains("boom"));

        let responses = responder.responses();
        assert_eq!(responses.len(), 1);
        let Response::DirectMessage(dm) = &responses[0] else {
            panic!("expected a direct message, got {responses:?}");
        };
        assert!(dm.starts_with("エラーが発生しました。\n"));
        assert!(dm.contains("boom"));

        // the dispatcher keeps serving commands afterwards
        let outcome = dispatcher
            .dispatch_command(invocation("ping", "ja"), responder.clone(), audit.clone())
            .await
            .unwrap();
        assert_eq!(outcome, CommandOutcome::Executed);
        assert_eq!(lua.globals().get::<i64>("calls").unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_notifications_are_swallowed() {
        let (_lua, dispatcher) = dispatcher(&[("explode.lua", FAILING)], &[]).await;
        let responder = Arc::new(RecordingResponder {
            fail_direct_messages: true,
            ..Default::default()
        });
        let audit = Arc::new(RecordingAuditSink::default());

        let outcome = dispatcher
            .dispatch_command(invocation("explode", "en-US"), responder.clone(), audit.clone())
            .await
            .unwrap();

        assert!(matches!(outcome, CommandOutcome::Failed(_)));
        assert_eq!(responder.responses().len(), 1);
    }

    #[tokio::test]
    async fn audit_failures_do_not_block_the_command() {
        let (lua, dispatcher) = dispatcher(&[("ping.lua", COUNTING_PING)], &[]).await;
        let responder = Arc::new(RecordingResponder::default());
        let audit = Arc::new(RecordingAuditSink {
            fail: true,
            ..Default::default()
        });

        let outcome = dispatcher
            .dispatch_command(invocation("ping", "en-US"), responder, audit.clone())
            .await
            .unwrap();

        assert_eq!(outcome, CommandOutcome::Executed);
        assert_eq!(lua.globals().get::<i64>("calls").unwrap(), 1);
        assert!(audit.settled_records().await.is_empty());
    }

    #[tokio::test]
    async fn commands_respond_before_a_slow_audit_delivery_finishes() {
        let (lua, dispatcher) = dispatcher(&[("ping.lua", COUNTING_PING)], &[]).await;
        let responder = Arc::new(RecordingResponder::default());
        let audit = Arc::new(RecordingAuditSink::held());

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            dispatcher.dispatch_command(invocation("ping", "en-US"), responder.clone(), audit.clone()),
        )
        .await
        .expect("the command waited on the audit channel")
        .unwrap();

        assert_eq!(outcome, CommandOutcome::Executed);
        assert_eq!(lua.globals().get::<i64>("calls").unwrap(), 1);
        assert_eq!(
            responder.responses(),
            [Response::Reply {
                content: "pong".to_string(),
                ephemeral: false
            }]
        );
        assert!(audit.records.lock().unwrap().is_empty());

        audit.release();
        let records = audit.settled_records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "ping");
    }

    #[tokio::test]
    async fn ready_fires_once_with_the_registered_commands() {
        let (lua, dispatcher) = dispatcher(
            &[("a.lua", COUNTING_PING), ("b.lua", COUNTING_PING)],
            &[("ready.lua", READY)],
        )
        .await;
        let registrar = Arc::new(RecordingRegistrar::default());

        for expected in [ReadyOutcome::Dispatched, ReadyOutcome::AlreadyFired] {
            let client = LuaClient::new(UserId::new(1), "bot".to_string(), 0, registrar.clone());
            assert_eq!(dispatcher.dispatch_ready(client).await.unwrap(), expected);
        }

        assert_eq!(lua.globals().get::<i64>("ready_calls").unwrap(), 1);
        let global = registrar.global.lock().unwrap();
        assert_eq!(global.len(), 1);
        let names: Vec<_> = global[0].iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["ping", "ping"]);
    }

    #[tokio::test]
    async fn ready_without_a_handler_is_an_error() {
        let (_lua, dispatcher) = dispatcher(&[], &[]).await;
        let client = LuaClient::new(
            UserId::new(1),
            "bot".to_string(),
            0,
            Arc::new(RecordingRegistrar::default()),
        );

        assert!(matches!(
            dispatcher.dispatch_ready(client).await,
            Err(DispatchError::MissingEventHandler("ready"))
        ));
    }

    #[tokio::test]
    async fn ready_script_errors_are_reported() {
        let (_lua, dispatcher) = dispatcher(
            &[],
            &[(
                "ready.lua",
                r#"return { name = "ready", execute = function() error("no") end }"#,
            )],
        )
        .await;
        let client = LuaClient::new(
            UserId::new(1),
            "bot".to_string(),
            0,
            Arc::new(RecordingRegistrar::default()),
        );

        assert!(matches!(
            dispatcher.dispatch_ready(client).await,
            Err(DispatchError::Ready(_))
        ));
    }
}
