//! Lock flags and the per-dispatch permission check.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::config::ConfigStore;
use crate::transport::User;

/// Process-wide lock flags toggled by the `l` and `vl` commands.
#[derive(Debug, Default)]
pub struct LockState {
    global: AtomicBool,
    volume: AtomicBool,
}

impl LockState {
    pub fn is_locked(&self) -> bool {
        self.global.load(Ordering::SeqCst)
    }

    pub fn is_volume_locked(&self) -> bool {
        self.volume.load(Ordering::SeqCst)
    }

    /// Flip the global lock, returning the new value.
    pub fn toggle(&self) -> bool {
        !self.global.fetch_xor(true, Ordering::SeqCst)
    }

    /// Flip the volume lock, returning the new value.
    pub fn toggle_volume(&self) -> bool {
        !self.volume.fetch_xor(true, Ordering::SeqCst)
    }
}

/// How the gate treats a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateClass {
    #[default]
    Normal,
    /// Lock and volume-lock toggles stay usable while the bot is locked.
    LockToggle,
    /// Subject to the volume lock.
    Volume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Banned,
    Locked,
    VolumeLocked,
}

impl Denial {
    pub fn message(self) -> &'static str {
        match self {
            Denial::Banned => "You are banned",
            Denial::Locked => "Bot is locked",
            Denial::VolumeLocked => "Volume is locked",
        }
    }
}

pub struct Gate {
    config: Arc<ConfigStore>,
    locks: Arc<LockState>,
}

impl Gate {
    pub fn new(config: Arc<ConfigStore>, locks: Arc<LockState>) -> Self {
        Self { config, locks }
    }

    pub fn locks(&self) -> &Arc<LockState> {
        &self.locks
    }

    /// Ban check, done before the message is even parsed.  Bans apply to
    /// admins too.
    pub async fn admit(&self, user: &User) -> Result<(), Denial> {
        if self.config.is_banned(&user.identity).await {
            debug!(nickname = %user.nickname, identity = %user.identity, "Rejected banned user");
            return Err(Denial::Banned);
        }
        Ok(())
    }

    /// Lock checks for a resolved command.
    pub fn authorize(&self, class: GateClass, user: &User) -> Result<(), Denial> {
        if user.is_admin {
            return Ok(());
        }
        if self.locks.is_locked() && class != GateClass::LockToggle {
            return Err(Denial::Locked);
        }
        if self.locks.is_volume_locked() && class == GateClass::Volume {
            return Err(Denial::VolumeLocked);
        }
        Ok(())
    }
}
