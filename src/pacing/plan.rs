//! Interaction plans
//!
//! Plans are plain data. The browser adapter replays them; nothing here
//! touches a page.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Visible page area in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

/// One pointer position followed by a pause
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerStep {
    pub x: f64,
    pub y: f64,
    pub delay: Duration,
}

/// Eased pointer path through a set of waypoints
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointerPlan {
    pub waypoints: Vec<(f64, f64)>,
    pub steps: Vec<PointerStep>,
}

impl PointerPlan {
    #[must_use]
    pub fn total_delay(&self) -> Duration {
        self.steps.iter().map(|s| s.delay).sum()
    }
}

/// One scroll burst; negative deltas scroll back up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollStep {
    pub delta_y: f64,
    pub pause: Duration,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScrollPlan {
    pub steps: Vec<ScrollStep>,
}

impl ScrollPlan {
    /// Bursts that move down the page
    pub fn forward_bursts(&self) -> impl Iterator<Item = &ScrollStep> {
        self.steps.iter().filter(|s| s.delta_y > 0.0)
    }

    #[must_use]
    pub fn total_delay(&self) -> Duration {
        self.steps.iter().map(|s| s.pause).sum()
    }
}

/// One character and the pause before it is typed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keystroke {
    pub ch: char,
    pub delay: Duration,
    /// Extended pause
    pub thinking: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypingPlan {
    pub keystrokes: Vec<Keystroke>,
}

impl TypingPlan {
    #[must_use]
    pub fn text(&self) -> String {
        self.keystrokes.iter().map(|k| k.ch).collect()
    }
}

/// Cubic ease-in-out over `t` in `[0, 1]`
#[must_use]
pub fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}
