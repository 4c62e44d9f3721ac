use std::path::PathBuf;

use tracing::{error, warn};

/// Why a single handler module could not be loaded
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("module must return a table, got {0}")]
    NotATable(&'static str),
    #[error("module is missing `{0}`")]
    MissingField(&'static str),
    #[error("invalid command definition: {0}")]
    InvalidDefinition(String),
    #[error(transparent)]
    Lua(#[from] mlua::Error),
}

/// Failures that surface while the bot is running.
///
/// Every variant ends up in [`DispatchError::report`], which picks how loudly
/// it is logged. None of them stop the process.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no `{0}` event handler is registered")]
    MissingEventHandler(&'static str),
    #[error("ClientReady Error")]
    Ready(#[source] mlua::Error),
    #[error("failed to deliver audit log: {0:#}")]
    Audit(anyhow::Error),
    #[error("InteractionCreate ({name}) Error")]
    Command {
        name: String,
        #[source]
        source: mlua::Error,
    },
    #[error("failed to reply to /{name}: {error:#}")]
    Reply { name: String, error: anyhow::Error },
    #[error("login failed: {0:#}")]
    Login(anyhow::Error),
}

impl DispatchError {
    pub fn report(&self) {
        match self {
            Self::Ready(source) | Self::Command { source, .. } => {
                error!("{self}: {source}");
            }
            Self::MissingEventHandler(_) | Self::Audit(_) | Self::Login(_) => {
                error!("{self}");
            }
            Self::Reply { .. } => {
                warn!("{self}");
            }
        }
    }
}
