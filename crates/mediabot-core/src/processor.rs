//! Entry point for chat messages: parse, gate, execute, reply.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{debug, error, warn};

use crate::access::Gate;
use crate::commands::{BotContext, CommandTable, Invocation, Reply};
use crate::errors::Error;
use crate::transport::User;
use crate::workers::panic_message;

pub struct CommandProcessor {
    ctx: Arc<BotContext>,
    table: CommandTable,
    gate: Gate,
}

impl CommandProcessor {
    pub fn new(ctx: Arc<BotContext>, table: CommandTable) -> Self {
        let gate = Gate::new(Arc::clone(&ctx.config), Arc::clone(&ctx.locks));
        Self { ctx, table, gate }
    }

    pub fn context(&self) -> &Arc<BotContext> {
        &self.ctx
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    /// Handle one message from `user`.  Safe to call concurrently.
    pub async fn dispatch(&self, message: &str, user: &User) -> Reply {
        if let Err(denial) = self.gate.admit(user).await {
            return Some(denial.message().to_string());
        }

        let Some((verb, arg)) = tokenize(message) else {
            return Some(self.table.help_listing(&self.ctx, user));
        };
        let Some(entry) = self.table.lookup(&verb, user) else {
            debug!(verb = %verb, nickname = %user.nickname, "Unknown command");
            return Some(format!(
                "Unknown command.\n{}",
                self.table.help_listing(&self.ctx, user)
            ));
        };
        if let Err(denial) = self.gate.authorize(entry.command.gate_class(), user) {
            debug!(verb = %verb, nickname = %user.nickname, ?denial, "Command rejected");
            return Some(denial.message().to_string());
        }

        debug!(verb = %verb, nickname = %user.nickname, "Executing command");
        let invocation = Invocation {
            arg,
            user,
            table: &self.table,
        };
        let outcome = AssertUnwindSafe(entry.command.execute(&self.ctx, invocation))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                let help = entry.command.help(&self.ctx);
                Some(describe_failure(&e, help.as_deref()))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(verb = %verb, "Command panicked: {}", message);
                Some(format!("error: {message}"))
            }
        }
    }
}

/// Split a message into its verb and argument.
///
/// The head is everything before the first space; the verb is its first run
/// of ASCII letters, lowercased.  The argument is the rest, untouched.
/// `None` when the head holds no letters.
pub fn tokenize(message: &str) -> Option<(String, &str)> {
    let (head, arg) = message.split_once(' ').unwrap_or((message, ""));
    let start = head.find(|c: char| c.is_ascii_alphabetic())?;
    let rest = &head[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    Some((rest[..end].to_ascii_lowercase(), arg))
}

/// Text shown to the user for a failed command.  `help` stands in for
/// invalid arguments.
pub(crate) fn describe_failure(error: &Error, help: Option<&str>) -> String {
    match error {
        Error::InvalidArgument => help.unwrap_or("Invalid argument").to_string(),
        Error::NothingFound => "Nothing is found for your query".into(),
        Error::IncorrectProtocol => "Incorrect protocol".into(),
        Error::Service(reason) => {
            warn!("Service failure: {}", reason);
            "Service is unavailable".into()
        }
        Error::PathNotFound => "The path cannot be found".into(),
        Error::NoNextTrack => "No next track".into(),
        Error::NoPreviousTrack => "No previous track".into(),
        Error::NothingIsPlaying => "Nothing is currently playing".into(),
        Error::IncorrectTrackIndex => "Out of list".into(),
        Error::IncorrectPosition => "Incorrect position".into(),
        Error::EmptyTrackList => "List is empty".into(),
        Error::IllegalState => "Not possible in the current state".into(),
        Error::Other(e) => {
            error!("Command failed: {:?}", e);
            format!("error: {e}")
        }
    }
}
