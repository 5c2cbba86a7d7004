//! Lazily materialized driver handles.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::driver::{DriverError, DriverResult, Handle};

/// Deferred call that opens a driver handle.
///
/// It may run more than once: a failed attempt leaves the slot unresolved so
/// the next statement tries again.
pub type HandleFactory = Arc<dyn Fn() -> DriverResult<Box<dyn Handle>> + Send + Sync>;

/// A handle slot: closed, pending, or open.
#[derive(Default)]
pub(crate) enum HandleSlot {
    #[default]
    Disconnected,
    Unresolved(HandleFactory),
    Resolved(Box<dyn Handle>),
}

impl HandleSlot {
    pub(crate) fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    pub(crate) fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Open the handle if it is still pending, then borrow it.
    pub(crate) fn resolve(&mut self) -> DriverResult<&mut dyn Handle> {
        if let Self::Unresolved(factory) = self {
            debug!("Opening database handle");
            let handle = (**factory)()?;
            *self = Self::Resolved(handle);
        }

        match self {
            Self::Resolved(handle) => Ok(&mut **handle),
            _ => Err(DriverError::new("Database handle is disconnected.")),
        }
    }
}

impl fmt::Debug for HandleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("Disconnected"),
            Self::Unresolved(_) => f.write_str("Unresolved"),
            Self::Resolved(_) => f.write_str("Resolved"),
        }
    }
}
