use std::sync::{Arc, RwLock};

use absensi_core::Roster;
use chrono::{DateTime, Local};

/// Published roster plus when it was built.
#[derive(Debug, Clone)]
pub struct RosterSnapshot {
    pub roster: Arc<Roster>,
    /// `None` until the first successful sync.
    pub synced_at: Option<DateTime<Local>>,
}

/// Process-wide holder of the current roster.
///
/// Readers take a cheap `Arc` clone and keep using it for the whole request,
/// so a concurrent [`replace`](Self::replace) is seen either entirely or not
/// at all. The lock only guards the pointer swap.
#[derive(Debug)]
pub struct RosterStore {
    current: RwLock<RosterSnapshot>,
}

impl RosterStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(RosterSnapshot {
                roster: Arc::new(Roster::new()),
                synced_at: None,
            }),
        }
    }

    /// The roster handlers should match against right now.
    pub fn roster(&self) -> Arc<Roster> {
        self.snapshot().roster
    }

    pub fn snapshot(&self) -> RosterSnapshot {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Publish a freshly built roster, discarding the previous one.
    pub fn replace(&self, roster: Roster) {
        let next = RosterSnapshot {
            roster: Arc::new(roster),
            synced_at: Some(Local::now()),
        };
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

impl Default for RosterStore {
    fn default() -> Self {
        Self::new()
    }
}
