/// names of gateway events that event modules can subscribe to
pub mod events {
    pub const READY: &str = "ready";

    /// every event name the bot actually dispatches
    pub const DISPATCHED: &[&str] = &[READY];
}

/// values used when building the audit embed
pub mod audit {
    pub const DM_FOOTER: &str = "DM";
    pub const GUILD_ICON_SIZE: u16 = 4096;
}

/// Discord limits enforced on command definitions and messages
pub mod limits {
    pub const MAX_CHOICES: usize = 25;
    pub const MAX_OPTIONS: usize = 25;
    /// characters allowed in a single message's content
    pub const MAX_MESSAGE_LENGTH: usize = 2000;
}
