//! Browser identity pool
//!
//! An identity is a browser context plus its egress point, rotated as one
//! unit. The pool hands identities out, counts their uses and discards them
//! for good when they are retired.
//!
//! Pool policy:
//! - At most `max_size` identities are live at once
//! - An identity is retired automatically after `max_uses` documents
//! - A retired identity is never handed out again

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ScrapeError, ScrapeResult};

/// Why an identity was retired
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetireReason {
    /// A block page or challenge was served
    Detected(String),
    /// Usage quota reached
    QuotaReached { uses: u32 },
    /// The browser session behind it failed
    SessionFailed(String),
}

impl std::fmt::Display for RetireReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Detected(signal) => write!(f, "detected: {signal}"),
            Self::QuotaReached { uses } => write!(f, "usage quota reached after {uses} uses"),
            Self::SessionFailed(reason) => write!(f, "session failed: {reason}"),
        }
    }
}

/// Whether an identity may keep working after a recorded use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageDecision {
    Continue { uses: u32 },
    Rotate { uses: u32 },
}

/// Source of browser identities
pub trait IdentityPool: Send + Sync {
    /// Hand out a fresh identity
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::PoolExhausted`] when the live-identity cap is
    /// reached.
    fn acquire(&self) -> ScrapeResult<String>;

    /// Count one document fetched with `identity`
    fn record_use(&self, identity: &str) -> UsageDecision;

    /// Discard `identity`; it is never handed out again
    fn retire(&self, identity: &str, reason: &RetireReason);
}

#[derive(Debug, Clone)]
struct IdentityUsage {
    uses: u32,
    sequence: u64,
}

/// In-process identity pool
pub struct InMemoryIdentityPool {
    live: DashMap<String, IdentityUsage>,
    retired: DashMap<String, RetireReason>,
    max_size: usize,
    max_uses: u32,
    issued: AtomicU64,
}

impl InMemoryIdentityPool {
    /// Create a pool
    ///
    /// # Arguments
    /// * `max_size` - Maximum identities live at once (at least 1)
    /// * `max_uses` - Documents per identity before forced rotation (at least 1)
    #[must_use]
    pub fn new(max_size: usize, max_uses: u32) -> Self {
        Self {
            live: DashMap::new(),
            retired: DashMap::new(),
            max_size: max_size.max(1),
            max_uses: max_uses.max(1),
            issued: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }

    #[must_use]
    pub fn is_retired(&self, identity: &str) -> bool {
        self.retired.contains_key(identity)
    }

    /// Uses recorded for a live identity
    #[must_use]
    pub fn uses(&self, identity: &str) -> Option<u32> {
        self.live.get(identity).map(|u| u.uses)
    }
}

impl IdentityPool for InMemoryIdentityPool {
    fn acquire(&self) -> ScrapeResult<String> {
        let active = self.live.len();
        if active >= self.max_size {
            warn!("Identity pool exhausted ({active}/{})", self.max_size);
            return Err(ScrapeError::PoolExhausted {
                active,
                max_size: self.max_size,
            });
        }

        let sequence = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        let identity = format!("identity-{sequence}-{}", Uuid::new_v4().simple());
        self.live
            .insert(identity.clone(), IdentityUsage { uses: 0, sequence });
        info!("Acquired identity {identity} ({}/{} live)", active + 1, self.max_size);
        Ok(identity)
    }

    fn record_use(&self, identity: &str) -> UsageDecision {
        let uses = {
            let Some(mut usage) = self.live.get_mut(identity) else {
                // Retired or unknown identities always rotate
                return UsageDecision::Rotate { uses: 0 };
            };
            usage.uses += 1;
            debug!(
                "Identity {identity} (#{}) used {} time(s)",
                usage.sequence, usage.uses
            );
            usage.uses
        };

        if uses >= self.max_uses {
            self.retire(identity, &RetireReason::QuotaReached { uses });
            UsageDecision::Rotate { uses }
        } else {
            UsageDecision::Continue { uses }
        }
    }

    fn retire(&self, identity: &str, reason: &RetireReason) {
        if self.live.remove(identity).is_some() {
            info!("Retired identity {identity}: {reason}");
        } else {
            debug!("Retire for non-live identity {identity}: {reason}");
        }
        self.retired.insert(identity.to_string(), reason.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enforces_max_size() {
        let pool = InMemoryIdentityPool::new(2, 10);
        let a = pool.acquire().expect("first");
        let _b = pool.acquire().expect("second");
        assert!(matches!(
            pool.acquire(),
            Err(ScrapeError::PoolExhausted { active: 2, max_size: 2 })
        ));

        pool.retire(&a, &RetireReason::Detected("Access Denied".into()));
        assert!(pool.acquire().is_ok());
    }

    #[test]
    fn rotates_after_quota() {
        let pool = InMemoryIdentityPool::new(1, 3);
        let id = pool.acquire().expect("identity");
        assert_eq!(pool.record_use(&id), UsageDecision::Continue { uses: 1 });
        assert_eq!(pool.record_use(&id), UsageDecision::Continue { uses: 2 });
        assert_eq!(pool.record_use(&id), UsageDecision::Rotate { uses: 3 });
        assert!(pool.is_retired(&id));
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn retired_identity_stays_retired() {
        let pool = InMemoryIdentityPool::new(4, 10);
        let id = pool.acquire().expect("identity");
        pool.retire(&id, &RetireReason::SessionFailed("crash".into()));
        assert_eq!(pool.record_use(&id), UsageDecision::Rotate { uses: 0 });
        let next = pool.acquire().expect("fresh identity");
        assert_ne!(next, id);
        assert_eq!(pool.retired_count(), 1);
    }
}
