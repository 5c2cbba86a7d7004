//! Classification of transient driver failures.
//!
//! When a statement fails outside a transaction, the [`crate::Connection`]
//! asks its detector whether the failure means the link to the server is
//! gone. If so, the connection reconnects and runs the statement once more.

use std::fmt;

use crate::driver::DriverError;

/// Message fragments that identify a dropped or unusable server link.
pub const LOST_CONNECTION_PHRASES: &[&str] = &[
    "server has gone away",
    "no connection to the server",
    "Lost connection",
    "is dead or not enabled",
    "Error while sending",
    "decryption failed or bad record mac",
    "SSL connection has been closed unexpectedly",
    "Deadlock found when trying to get lock",
];

/// Decides whether a driver failure is worth a reconnect-and-retry.
pub trait LostConnectionDetector: Send + Sync {
    /// `true` when the failure indicates a lost connection.
    fn caused_by_lost_connection(&self, error: &DriverError) -> bool;
}

impl<F> LostConnectionDetector for F
where
    F: Fn(&DriverError) -> bool + Send + Sync,
{
    fn caused_by_lost_connection(&self, error: &DriverError) -> bool {
        self(error)
    }
}

/// Case-sensitive substring match of the driver message against a phrase
/// list.
#[derive(Clone)]
pub struct PhraseDetector {
    phrases: Vec<String>,
}

impl PhraseDetector {
    /// A detector that matches only the given phrases.
    pub fn with_phrases<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            phrases: phrases.into_iter().map(Into::into).collect(),
        }
    }

    /// Add another phrase to match.
    pub fn phrase(mut self, phrase: impl Into<String>) -> Self {
        self.phrases.push(phrase.into());
        self
    }

    /// The phrases this detector matches.
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Whether `message` contains any of the phrases.
    pub fn matches(&self, message: &str) -> bool {
        self.phrases.iter().any(|p| message.contains(p.as_str()))
    }
}

impl Default for PhraseDetector {
    fn default() -> Self {
        Self::with_phrases(LOST_CONNECTION_PHRASES.iter().copied())
    }
}

impl fmt::Debug for PhraseDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhraseDetector")
            .field("phrases", &self.phrases.len())
            .finish()
    }
}

impl LostConnectionDetector for PhraseDetector {
    fn caused_by_lost_connection(&self, error: &DriverError) -> bool {
        self.matches(error.message())
    }
}
