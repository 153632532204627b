/// Process lifecycle hooks used by the quit and restart commands.
pub trait ProcessControl: Send + Sync {
    /// Begin an orderly shutdown of the bot.
    fn quit(&self);
    /// Start a fresh instance with the original arguments, then shut down.
    fn restart(&self);
}
