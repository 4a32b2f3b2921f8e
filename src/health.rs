//! Per-identity session health
//!
//! A small state machine: `Active -> Suspected -> Retired`, with a direct
//! `Active -> Retired` edge on any hard signal. States only ever move
//! forward within a session and `Retired` is terminal.
//!
//! The monitor never changes state behind the caller's back. [`SessionHealth::check`]
//! is pure and returns a [`SessionHealthTransition`]; the session owner applies
//! it with [`SessionHealth::apply`] and acts on the retire decision.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::classifier::Classification;
use crate::error::{BlockSignal, ScrapeError, ScrapeResult};

/// Health of one identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum HealthState {
    #[default]
    Active,
    Suspected,
    Retired,
}

/// Input to the state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthSignal {
    /// Nothing adversarial observed
    Clean,
    /// Ambiguous evidence of detection
    Soft(String),
    /// Block page or challenge served
    Hard(BlockSignal),
}

/// Outcome of checking one document against the session's health
#[derive(Debug, Clone)]
pub struct SessionHealthTransition {
    pub from: HealthState,
    pub to: HealthState,
    pub signal: HealthSignal,
    /// The identity pool must discard this identity
    pub retire: bool,
    /// Typed failure the caller must raise instead of returning records
    pub failure: Option<ScrapeError>,
}

impl SessionHealthTransition {
    #[must_use]
    pub fn is_change(&self) -> bool {
        self.from != self.to
    }

    /// Escalate the failure, if any
    ///
    /// # Errors
    ///
    /// Returns the carried block, challenge or retired-identity failure.
    pub fn into_result(self) -> ScrapeResult<()> {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

/// Health record for one identity over one crawl session
#[derive(Debug, Clone)]
pub struct SessionHealth {
    identity: String,
    state: HealthState,
    last_signal: Option<HealthSignal>,
}

impl SessionHealth {
    #[must_use]
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            state: HealthState::Active,
            last_signal: None,
        }
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[must_use]
    pub fn state(&self) -> HealthState {
        self.state
    }

    #[must_use]
    pub fn last_signal(&self) -> Option<&HealthSignal> {
        self.last_signal.as_ref()
    }

    /// Decide the transition for a classified document at `url`
    #[must_use]
    pub fn check(&self, classification: &Classification, url: &str) -> SessionHealthTransition {
        let signal = match &classification.signal {
            Some(block) if classification.page_type.is_adversarial() => {
                HealthSignal::Hard(block.clone())
            }
            _ => HealthSignal::Clean,
        };
        self.check_signal(signal, url)
    }

    /// Decide the transition for a raw signal
    #[must_use]
    pub fn check_signal(&self, signal: HealthSignal, url: &str) -> SessionHealthTransition {
        let from = self.state;

        if from == HealthState::Retired {
            return SessionHealthTransition {
                from,
                to: HealthState::Retired,
                signal,
                // Already reported when the identity was retired
                retire: false,
                failure: Some(ScrapeError::IdentityRetired {
                    identity: self.identity.clone(),
                }),
            };
        }

        match &signal {
            HealthSignal::Clean => SessionHealthTransition {
                from,
                to: from,
                signal,
                retire: false,
                failure: None,
            },
            HealthSignal::Soft(_) => SessionHealthTransition {
                from,
                to: HealthState::Suspected,
                signal,
                retire: false,
                failure: None,
            },
            HealthSignal::Hard(block) => {
                let failure = match block {
                    BlockSignal::Phrase(_) => ScrapeError::BlockDetected {
                        url: url.to_string(),
                        signal: block.clone(),
                    },
                    BlockSignal::ChallengeElement(_) => ScrapeError::ChallengeDetected {
                        url: url.to_string(),
                        signal: block.clone(),
                    },
                };
                SessionHealthTransition {
                    from,
                    to: HealthState::Retired,
                    signal,
                    retire: true,
                    failure: Some(failure),
                }
            }
        }
    }

    /// Apply a transition produced by [`check`](Self::check)
    ///
    /// State never moves backwards, even for a stale transition.
    pub fn apply(&mut self, transition: &SessionHealthTransition) {
        let next = self.state.max(transition.to);
        if next != self.state {
            match next {
                HealthState::Retired => {
                    warn!("Identity {} retired: {:?}", self.identity, transition.signal);
                }
                HealthState::Suspected => {
                    info!("Identity {} suspected: {:?}", self.identity, transition.signal);
                }
                HealthState::Active => {}
            }
        }
        self.state = next;
        if transition.signal != HealthSignal::Clean {
            self.last_signal = Some(transition.signal.clone());
        }
    }
}

/// Check and apply in one step, returning the transition for the caller to
/// act on
pub fn check_health(
    health: &mut SessionHealth,
    classification: &Classification,
    url: &str,
) -> SessionHealthTransition {
    let transition = health.check(classification, url);
    health.apply(&transition);
    transition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::PageType;

    fn classification(page_type: PageType, signal: Option<BlockSignal>) -> Classification {
        Classification {
            page_type,
            signal,
            card_selector: None,
        }
    }

    fn blocked() -> Classification {
        classification(PageType::Blocked, Some(BlockSignal::Phrase("Access Denied".into())))
    }

    #[test]
    fn clean_page_keeps_active() {
        let health = SessionHealth::new("id-1");
        let t = health.check(&classification(PageType::Detail, None), "https://x");
        assert!(!t.is_change());
        assert!(!t.retire);
        assert!(t.into_result().is_ok());
    }

    #[test]
    fn hard_signal_retires_directly() {
        let mut health = SessionHealth::new("id-1");
        let t = check_health(&mut health, &blocked(), "https://x/blocked");
        assert_eq!(t.from, HealthState::Active);
        assert_eq!(t.to, HealthState::Retired);
        assert!(t.retire);
        assert!(matches!(
            t.into_result(),
            Err(ScrapeError::BlockDetected { url, .. }) if url == "https://x/blocked"
        ));
        assert_eq!(health.state(), HealthState::Retired);
    }

    #[test]
    fn challenge_maps_to_challenge_failure() {
        let health = SessionHealth::new("id-1");
        let c = classification(
            PageType::Challenged,
            Some(BlockSignal::ChallengeElement("iframe src".into())),
        );
        let t = health.check(&c, "https://x");
        assert!(matches!(t.failure, Some(ScrapeError::ChallengeDetected { .. })));
    }

    #[test]
    fn check_does_not_mutate() {
        let health = SessionHealth::new("id-1");
        let _ = health.check(&blocked(), "https://x");
        assert_eq!(health.state(), HealthState::Active);
    }

    #[test]
    fn retired_never_returns_to_active() {
        let mut health = SessionHealth::new("id-1");
        check_health(&mut health, &blocked(), "https://x");

        for _ in 0..3 {
            let t = check_health(&mut health, &classification(PageType::Detail, None), "https://x");
            assert_eq!(t.to, HealthState::Retired);
            assert!(!t.retire);
            assert!(matches!(t.failure, Some(ScrapeError::IdentityRetired { .. })));
            assert_eq!(health.state(), HealthState::Retired);
        }
    }

    #[test]
    fn suspected_path() {
        let mut health = SessionHealth::new("id-1");
        let t = health.check_signal(HealthSignal::Soft("slow responses".into()), "https://x");
        health.apply(&t);
        assert_eq!(health.state(), HealthState::Suspected);

        // Clean pages do not restore Active
        let t = health.check(&classification(PageType::Detail, None), "https://x");
        health.apply(&t);
        assert_eq!(health.state(), HealthState::Suspected);

        let t = health.check(&blocked(), "https://x");
        assert_eq!(t.from, HealthState::Suspected);
        health.apply(&t);
        assert_eq!(health.state(), HealthState::Retired);
    }

    #[test]
    fn stale_transition_cannot_move_backwards() {
        let mut health = SessionHealth::new("id-1");
        let stale = health.check(&classification(PageType::Detail, None), "https://x");
        check_health(&mut health, &blocked(), "https://x");
        health.apply(&stale);
        assert_eq!(health.state(), HealthState::Retired);
    }
}
