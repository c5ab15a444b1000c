//! # Island Events
//!
//! Cancellable notifications fired before a coop grant, a coop revocation or
//! an ownership change is committed.
//!
//! Every change goes through two phases:
//!
//! 1. [`IslandEvents::propose`] asks each listener in registration order. The
//!    first [`Verdict::Veto`] stops the round and the change is abandoned.
//! 2. [`IslandEvents::commit`] tells every listener the change has been
//!    applied. Listeners cannot refuse at this point.
//!
//! Listeners run synchronously on the thread that owns the grid, so they must
//! not block.

use crate::coop::IslandCenter;
use crate::types::PlayerId;
use std::sync::Arc;
use tracing::{debug, info};

/// Why a coop grant is being removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    /// The granting side removed the player explicitly.
    Removed,
    /// The island was deleted or reset.
    IslandDeleted,
    /// The coop player logged out.
    Logout,
    /// The grantor left their team or logged out.
    GrantorLeft,
}

/// A proposed change to island membership or ownership.
#[derive(Debug, Clone, PartialEq)]
pub enum IslandEvent {
    CoopJoin {
        grantee: PlayerId,
        island: IslandCenter,
        grantor: PlayerId,
    },
    CoopLeave {
        grantee: PlayerId,
        island: IslandCenter,
        grantor: PlayerId,
        reason: LeaveReason,
    },
    OwnerChange {
        island: IslandCenter,
        old_owner: Option<PlayerId>,
        new_owner: PlayerId,
    },
}

impl IslandEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            IslandEvent::CoopJoin { .. } => "coop_join",
            IslandEvent::CoopLeave { .. } => "coop_leave",
            IslandEvent::OwnerChange { .. } => "owner_change",
        }
    }
}

/// A listener's answer to a proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Veto { listener: String, reason: String },
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

/// Something that wants to observe or cancel island changes.
pub trait IslandListener: Send + Sync {
    /// Name used in logs and veto reports.
    fn name(&self) -> &str;

    /// Called before the change. Return `Err(reason)` to cancel it.
    fn on_propose(&self, _event: &IslandEvent) -> Result<(), String> {
        Ok(())
    }

    /// Called after the change has been applied.
    fn on_commit(&self, _event: &IslandEvent) {}
}

/// Statistics about event traffic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventBusStats {
    pub listeners: usize,
    pub proposed: u64,
    pub vetoed: u64,
    pub committed: u64,
}

/// Ordered set of listeners.
#[derive(Default)]
pub struct IslandEvents {
    listeners: Vec<Arc<dyn IslandListener>>,
    stats: EventBusStats,
}

impl std::fmt::Debug for IslandEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IslandEvents")
            .field("listeners", &self.listeners.iter().map(|l| l.name().to_string()).collect::<Vec<_>>())
            .field("stats", &self.stats)
            .finish()
    }
}

impl IslandEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Arc<dyn IslandListener>) {
        info!("📝 Registered island listener '{}'", listener.name());
        self.listeners.push(listener);
        self.stats.listeners = self.listeners.len();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Asks every listener whether the change may proceed.
    pub fn propose(&mut self, event: &IslandEvent) -> Verdict {
        self.stats.proposed += 1;
        for listener in &self.listeners {
            if let Err(reason) = listener.on_propose(event) {
                self.stats.vetoed += 1;
                info!(
                    "🚫 Listener '{}' cancelled {}: {}",
                    listener.name(),
                    event.kind(),
                    reason
                );
                return Verdict::Veto {
                    listener: listener.name().to_string(),
                    reason,
                };
            }
        }
        Verdict::Allow
    }

    /// Announces an applied change.
    pub fn commit(&mut self, event: &IslandEvent) {
        self.stats.committed += 1;
        debug!("Committed {} to {} listeners", event.kind(), self.listeners.len());
        for listener in &self.listeners {
            listener.on_commit(event);
        }
    }

    pub fn stats(&self) -> EventBusStats {
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        name: String,
        veto: bool,
        seen: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn new(name: &str, veto: bool) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                veto,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl IslandListener for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn on_propose(&self, event: &IslandEvent) -> Result<(), String> {
            self.seen.lock().unwrap().push(format!("propose:{}", event.kind()));
            if self.veto {
                Err("not today".to_string())
            } else {
                Ok(())
            }
        }

        fn on_commit(&self, event: &IslandEvent) {
            self.seen.lock().unwrap().push(format!("commit:{}", event.kind()));
        }
    }

    fn join_event() -> IslandEvent {
        IslandEvent::CoopJoin {
            grantee: PlayerId::new(),
            island: IslandCenter::new("skyblock", 0, 120, 0),
            grantor: PlayerId::new(),
        }
    }

    #[test]
    fn test_allow_when_no_listener_objects() {
        let first = Recorder::new("first", false);
        let mut events = IslandEvents::new();
        events.register(first.clone());

        let event = join_event();
        assert!(events.propose(&event).is_allowed());
        events.commit(&event);

        assert_eq!(
            *first.seen.lock().unwrap(),
            vec!["propose:coop_join".to_string(), "commit:coop_join".to_string()]
        );
        let stats = events.stats();
        assert_eq!(stats.listeners, 1);
        assert_eq!(stats.proposed, 1);
        assert_eq!(stats.committed, 1);
        assert_eq!(stats.vetoed, 0);
    }

    #[test]
    fn test_first_veto_stops_the_round() {
        let blocker = Recorder::new("blocker", true);
        let after = Recorder::new("after", false);
        let mut events = IslandEvents::new();
        events.register(blocker.clone());
        events.register(after.clone());

        let verdict = events.propose(&join_event());
        assert_eq!(
            verdict,
            Verdict::Veto {
                listener: "blocker".to_string(),
                reason: "not today".to_string()
            }
        );
        assert!(after.seen.lock().unwrap().is_empty());
        assert_eq!(events.stats().vetoed, 1);
    }
}
