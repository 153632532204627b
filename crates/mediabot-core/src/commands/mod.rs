//! Verb table and the commands behind it.
//!
//! The table is built once at startup and never changes.  Each entry binds a
//! verb to a [`Command`]; admin-only entries do not exist as far as other
//! users are concerned.

mod admin;
mod info;
mod playback;

use std::sync::Arc;

use async_trait::async_trait;

use crate::access::{GateClass, LockState};
use crate::config::ConfigStore;
use crate::control::ProcessControl;
use crate::errors::Result;
use crate::player::SharedPlayer;
use crate::services::ServiceManager;
use crate::streamer::Streamer;
use crate::translator::Translator;
use crate::transport::{Transport, User};
use crate::workers::Workers;

pub use admin::*;
pub use info::*;
pub use playback::*;

/// Text sent back to the caller, if any.
pub type Reply = Option<String>;

/// Everything a command may touch.
pub struct BotContext {
    pub config: Arc<ConfigStore>,
    pub locks: Arc<LockState>,
    pub player: SharedPlayer,
    pub services: Arc<ServiceManager>,
    pub streamer: Arc<dyn Streamer>,
    pub transport: Arc<dyn Transport>,
    pub translator: Arc<dyn Translator>,
    pub control: Arc<dyn ProcessControl>,
    pub workers: Workers,
    /// Upper volume bound, fixed at startup.
    pub max_volume: u32,
}

/// One parsed request.
#[derive(Clone, Copy)]
pub struct Invocation<'a> {
    /// Everything after the verb, verbatim.  Empty when absent.
    pub arg: &'a str,
    pub user: &'a User,
    pub table: &'a CommandTable,
}

#[async_trait]
pub trait Command: Send + Sync {
    /// One line of usage text.  `None` hides the command from help.
    fn help(&self, ctx: &BotContext) -> Option<String>;

    fn gate_class(&self) -> GateClass {
        GateClass::Normal
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply>;
}

pub struct CommandEntry {
    pub verb: &'static str,
    pub admin_only: bool,
    pub command: Box<dyn Command>,
}

#[derive(Default)]
pub struct CommandTable {
    entries: Vec<CommandEntry>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, verb: &'static str, admin_only: bool, command: impl Command + 'static) {
        self.entries.push(CommandEntry {
            verb,
            admin_only,
            command: Box::new(command),
        });
    }

    /// The bot's full command set, user commands first.
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.register("h", false, HelpCommand);
        table.register("a", false, AboutCommand);
        table.register("p", false, PlayPauseCommand);
        table.register("u", false, PlayUrlCommand);
        table.register("sv", false, ServiceCommand);
        table.register("s", false, StopCommand);
        table.register("b", false, PreviousTrackCommand);
        table.register("n", false, NextTrackCommand);
        table.register("c", false, SelectTrackCommand);
        table.register("sb", false, SeekBackCommand);
        table.register("sf", false, SeekForwardCommand);
        table.register("v", false, VolumeCommand);
        table.register("r", false, RateCommand);
        table.register("m", false, ModeCommand);
        table.register("gl", false, GetLinkCommand);
        table.register("sh", false, HistoryCommand);
        table.register("pos", false, PositionCommand);

        table.register("cn", true, ChangeNicknameCommand);
        table.register("cs", true, ChangeStatusCommand);
        table.register("l", true, LockCommand);
        table.register("vl", true, VolumeLockCommand);
        table.register("ua", true, AdminUsersCommand);
        table.register("ub", true, BannedUsersCommand);
        table.register("sc", true, SaveConfigCommand);
        table.register("lng", true, LanguageCommand);
        table.register("va", true, VoiceTransmissionCommand);
        table.register("q", true, QuitCommand);
        table.register("rs", true, RestartCommand);
        table
    }

    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    /// Entries `user` may see, in table order.
    pub fn visible<'a>(&'a self, user: &'a User) -> impl Iterator<Item = &'a CommandEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| !e.admin_only || user.is_admin)
    }

    /// Case-insensitive exact match among the entries visible to `user`.
    pub fn lookup<'a>(&'a self, verb: &str, user: &'a User) -> Option<&'a CommandEntry> {
        self.visible(user)
            .find(|e| e.verb.eq_ignore_ascii_case(verb))
    }

    /// `verb: help` lines for every visible command that has help.
    pub fn help_listing(&self, ctx: &BotContext, user: &User) -> String {
        self.visible(user)
            .filter_map(|e| {
                e.command
                    .help(ctx)
                    .map(|help| format!("{}: {}", e.verb, help))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
