use std::sync::RwLock;

use crate::errors::{Error, Result};

/// Locale switching for bot replies.
pub trait Translator: Send + Sync {
    /// Activate `code`.  With `fallback` an unknown locale degrades to the
    /// built-in strings instead of failing.
    fn install_locale(&self, code: &str, fallback: bool) -> Result<()>;
    fn locales(&self) -> Vec<String>;
}

/// Translator over a fixed set of locale codes; replies stay in the
/// built-in language.
pub struct StaticTranslator {
    locales: Vec<String>,
    active: RwLock<String>,
}

impl StaticTranslator {
    pub fn new(locales: Vec<String>, active: &str) -> Self {
        Self {
            locales,
            active: RwLock::new(active.to_string()),
        }
    }

    pub fn active(&self) -> String {
        self.active
            .read()
            .map(|a| a.clone())
            .unwrap_or_default()
    }
}

impl Default for StaticTranslator {
    fn default() -> Self {
        Self::new(vec!["en".to_string(), "ru".to_string()], "en")
    }
}

impl Translator for StaticTranslator {
    fn install_locale(&self, code: &str, fallback: bool) -> Result<()> {
        let known = self.locales.iter().any(|l| l == code);
        if !known && !fallback {
            return Err(Error::InvalidArgument);
        }
        if let Ok(mut active) = self.active.write() {
            *active = code.to_string();
        }
        Ok(())
    }

    fn locales(&self) -> Vec<String> {
        self.locales.clone()
    }
}
