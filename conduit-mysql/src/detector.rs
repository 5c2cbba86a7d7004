//! Lost-connection classification for MySQL.

use conduit_core::{DriverError, LostConnectionDetector, PhraseDetector};

use crate::error::IO_ERROR_CODE;

/// Client error numbers for a dropped server link
/// (`CR_SERVER_GONE_ERROR`, `CR_SERVER_LOST`).
pub const LOST_CONNECTION_CODES: &[&str] = &["2006", "2013"];

/// Matches the shared phrase list, the client's closed-connection message,
/// the lost-link error numbers and transport failures.
#[derive(Debug, Clone)]
pub struct MysqlLostConnectionDetector {
    phrases: PhraseDetector,
}

impl Default for MysqlLostConnectionDetector {
    fn default() -> Self {
        Self {
            phrases: PhraseDetector::default().phrase("Connection to the server is closed"),
        }
    }
}

impl LostConnectionDetector for MysqlLostConnectionDetector {
    fn caused_by_lost_connection(&self, error: &DriverError) -> bool {
        let by_code = error
            .code()
            .is_some_and(|code| code == IO_ERROR_CODE || LOST_CONNECTION_CODES.contains(&code));
        by_code || self.phrases.matches(error.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lost(error: DriverError) -> bool {
        MysqlLostConnectionDetector::default().caused_by_lost_connection(&error)
    }

    #[test]
    fn test_shared_phrases() {
        assert!(lost(DriverError::new("MySQL server has gone away")));
        assert!(lost(DriverError::new("Deadlock found when trying to get lock")));
    }

    #[test]
    fn test_codes() {
        assert!(lost(DriverError::new("x").with_code("2006")));
        assert!(lost(DriverError::new("x").with_code("2013")));
        assert!(lost(DriverError::new("x").with_code(IO_ERROR_CODE)));
        assert!(!lost(DriverError::new("x").with_code("1146")));
    }

    #[test]
    fn test_closed_connection_message() {
        assert!(lost(DriverError::new("Connection to the server is closed.")));
        assert!(!lost(DriverError::new("Table 'app.users' doesn't exist")));
    }
}
