//! Chat-side collaborators: who is talking and how to talk back.

/// Sender of a command, as reported by the chat transport.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct User {
    pub nickname: String,
    /// Account name; empty for anonymous logins.
    pub identity: String,
    pub is_admin: bool,
}

impl User {
    pub fn new(nickname: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            identity: identity.into(),
            is_admin: false,
        }
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

/// Where an out-of-band message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTarget {
    /// Private message to one user.
    User(User),
    /// Message to the channel the bot sits in.
    Channel,
    /// Server-wide broadcast.
    Broadcast,
}

/// Chat client the bot is embedded in.  Calls must not block.
pub trait Transport: Send + Sync {
    fn send_message(&self, text: &str, target: MessageTarget);
    fn change_nickname(&self, nickname: &str);
    fn change_status_text(&self, text: &str);
    fn enable_voice_transmission(&self);
    fn disable_voice_transmission(&self);
    fn is_voice_transmission_enabled(&self) -> bool;
}
