//! Commands only admins can see.

use async_trait::async_trait;
use tracing::info;

use super::{BotContext, Command, Invocation, Reply};
use crate::access::GateClass;
use crate::config::UsersConfig;
use crate::errors::{Error, Result};
use crate::player::PlaybackState;
use crate::transport::MessageTarget;

pub struct ChangeNicknameCommand;

#[async_trait]
impl Command for ChangeNicknameCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("NICKNAME Sets the bot's nickname".into())
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        ctx.transport.change_nickname(inv.arg);
        Ok(None)
    }
}

pub struct ChangeStatusCommand;

#[async_trait]
impl Command for ChangeStatusCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("STATUS Changes the bot's status text".into())
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        ctx.transport.change_status_text(inv.arg);
        Ok(None)
    }
}

pub struct LockCommand;

#[async_trait]
impl Command for LockCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("Locks or unlocks the bot".into())
    }

    fn gate_class(&self) -> GateClass {
        GateClass::LockToggle
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        let locked = ctx.locks.toggle();
        info!(nickname = %inv.user.nickname, locked, "Bot lock toggled");
        let (reply, verb) = if locked {
            ("Locked", "locked")
        } else {
            ("Unlocked", "unlocked")
        };
        ctx.transport.send_message(
            &format!("{} {} the bot", inv.user.nickname, verb),
            MessageTarget::Channel,
        );
        Ok(Some(reply.into()))
    }
}

pub struct VolumeLockCommand;

#[async_trait]
impl Command for VolumeLockCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("Locks or unlocks volume".into())
    }

    fn gate_class(&self) -> GateClass {
        GateClass::LockToggle
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        let locked = ctx.locks.toggle_volume();
        info!(nickname = %inv.user.nickname, locked, "Volume lock toggled");
        let (reply, verb) = if locked {
            ("Volume locked", "locked")
        } else {
            ("Volume unlocked", "unlocked")
        };
        ctx.transport.send_message(
            &format!("{} {} the volume", inv.user.nickname, verb),
            MessageTarget::Channel,
        );
        Ok(Some(reply.into()))
    }
}

#[derive(Debug, Clone, Copy)]
enum UserList {
    Admins,
    Banned,
}

impl UserList {
    fn of(self, users: &UsersConfig) -> &Vec<String> {
        match self {
            UserList::Admins => &users.admins,
            UserList::Banned => &users.banned_users,
        }
    }

    fn of_mut(self, users: &mut UsersConfig) -> &mut Vec<String> {
        match self {
            UserList::Admins => &mut users.admins,
            UserList::Banned => &mut users.banned_users,
        }
    }

    fn missing(self) -> &'static str {
        match self {
            UserList::Admins => "This user is not admin",
            UserList::Banned => "This user is not banned",
        }
    }

    /// `+id` appends, `-id` removes the first match, nothing lists.
    async fn manage(self, ctx: &BotContext, arg: &str) -> Result<Reply> {
        if arg.is_empty() {
            let listing = ctx
                .config
                .read(|c| {
                    self.of(&c.users)
                        .iter()
                        .map(|id| if id.is_empty() { "<Anonymous>" } else { id.as_str() })
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .await;
            if listing.is_empty() {
                return Ok(Some("List is empty".into()));
            }
            return Ok(Some(listing));
        }

        if let Some(identity) = arg.strip_prefix('+') {
            ctx.config
                .write(|c| self.of_mut(&mut c.users).push(identity.to_string()))
                .await;
            info!(list = ?self, identity, "User added");
            return Ok(Some("Added".into()));
        }
        if let Some(identity) = arg.strip_prefix('-') {
            let removed = ctx
                .config
                .write(|c| {
                    let list = self.of_mut(&mut c.users);
                    match list.iter().position(|id| id == identity) {
                        Some(index) => {
                            list.remove(index);
                            true
                        }
                        None => false,
                    }
                })
                .await;
            if !removed {
                return Ok(Some(self.missing().into()));
            }
            info!(list = ?self, identity, "User removed");
            return Ok(Some("Deleted".into()));
        }
        Err(Error::InvalidArgument)
    }
}

pub struct AdminUsersCommand;

#[async_trait]
impl Command for AdminUsersCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("[+USER|-USER] Shows the list of admin users. +USER adds to it, -USER deletes from it".into())
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        UserList::Admins.manage(ctx, inv.arg).await
    }
}

pub struct BannedUsersCommand;

#[async_trait]
impl Command for BannedUsersCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("[+USER|-USER] Shows the list of banned users. +USER adds to it, -USER deletes from it".into())
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        UserList::Banned.manage(ctx, inv.arg).await
    }
}

pub struct SaveConfigCommand;

#[async_trait]
impl Command for SaveConfigCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("Saves config to file".into())
    }

    async fn execute(&self, ctx: &BotContext, _inv: Invocation<'_>) -> Result<Reply> {
        ctx.config.save().await?;
        Ok(Some("Config saved".into()))
    }
}

pub struct LanguageCommand;

#[async_trait]
impl Command for LanguageCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("[LOCALE] Changes the language of the bot. Without a locale shows the current one".into())
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        if inv.arg.is_empty() {
            let current = ctx.config.read(|c| c.general.language.clone()).await;
            return Ok(Some(format!(
                "Current locale is {}. Available locales: {}",
                current,
                ctx.translator.locales().join(", ")
            )));
        }

        let locale = inv.arg.trim();
        if ctx
            .translator
            .install_locale(locale, locale == "en")
            .is_err()
        {
            return Ok(Some("Incorrect locale".into()));
        }
        ctx.config
            .write(|c| c.general.language = locale.to_string())
            .await;
        ctx.transport.change_status_text("");
        info!(locale, "Language changed");
        Ok(Some("Language has been changed".into()))
    }
}

pub struct VoiceTransmissionCommand;

#[async_trait]
impl Command for VoiceTransmissionCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("Enables or disables voice transmission".into())
    }

    async fn execute(&self, ctx: &BotContext, _inv: Invocation<'_>) -> Result<Reply> {
        let stopped = ctx.player.lock().await.state() == PlaybackState::Stopped;
        let text = if ctx.transport.is_voice_transmission_enabled() {
            ctx.transport.disable_voice_transmission();
            if stopped {
                ctx.transport.change_status_text("");
            }
            "Voice transmission disabled"
        } else {
            ctx.transport.enable_voice_transmission();
            if stopped {
                ctx.transport.change_status_text("Voice transmission enabled");
            }
            "Voice transmission enabled"
        };
        Ok(Some(text.into()))
    }
}

pub struct QuitCommand;

#[async_trait]
impl Command for QuitCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("Quits the bot".into())
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        info!(nickname = %inv.user.nickname, "Quit requested");
        ctx.control.quit();
        Ok(None)
    }
}

pub struct RestartCommand;

#[async_trait]
impl Command for RestartCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("Restarts the bot".into())
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        info!(nickname = %inv.user.nickname, "Restart requested");
        ctx.control.restart();
        Ok(None)
    }
}
