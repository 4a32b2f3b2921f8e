//! Human-plausible interaction pacing
//!
//! [`InteractionScheduler`] turns random draws into bounded delays and
//! pointer, scroll and typing plans. The random source is injected, so a
//! seeded scheduler replays exactly the same plans.

pub mod plan;

use std::f64::consts::TAU;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub use plan::{
    Keystroke, PointerPlan, PointerStep, ScrollPlan, ScrollStep, TypingPlan, Viewport,
    ease_in_out,
};

/// Shortest delay the scheduler will ever produce
pub const MIN_DELAY: Duration = Duration::from_millis(100);

/// Delays are capped this many standard deviations above the mean
pub const MAX_SIGMAS: f64 = 4.0;

const WAYPOINTS: std::ops::RangeInclusive<usize> = 3..=8;
const STEPS_PER_MOVE: std::ops::RangeInclusive<usize> = 5..=20;
/// Fraction of each viewport dimension kept clear at the edges
const EDGE_INSET: f64 = 0.1;

const SCROLL_BURSTS: std::ops::RangeInclusive<usize> = 2..=5;
const SCROLL_MAGNITUDE_PX: std::ops::Range<f64> = 200.0..700.0;
const BACKSCROLL_PROBABILITY: f64 = 0.3;
const BACKSCROLL_MAGNITUDE_PX: std::ops::Range<f64> = 40.0..160.0;

const THINKING_PROBABILITY: f64 = 0.1;

/// Mean and standard deviation of a Gaussian delay, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayProfile {
    pub mean_ms: u64,
    pub std_dev_ms: u64,
}

impl DelayProfile {
    #[must_use]
    pub const fn new(mean_ms: u64, std_dev_ms: u64) -> Self {
        Self {
            mean_ms,
            std_dev_ms,
        }
    }

    #[must_use]
    pub fn mean(&self) -> Duration {
        Duration::from_millis(self.mean_ms)
    }

    #[must_use]
    pub fn std_dev(&self) -> Duration {
        Duration::from_millis(self.std_dev_ms)
    }

    /// Upper bound of any delay drawn from this profile
    #[must_use]
    pub fn ceiling(&self) -> Duration {
        #[allow(clippy::cast_precision_loss)]
        let cap = self.mean_ms as f64 + MAX_SIGMAS * self.std_dev_ms as f64;
        Duration::from_secs_f64(cap / 1000.0).max(MIN_DELAY)
    }
}

/// Delay profiles for every kind of interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingProfile {
    /// Between pointer interpolation steps
    pub pointer_step: DelayProfile,
    /// After each scroll burst
    pub scroll_pause: DelayProfile,
    /// Between keystrokes
    pub keystroke: DelayProfile,
    /// Occasional pause while typing
    pub thinking: DelayProfile,
    /// Between consecutive page loads
    pub page_dwell: DelayProfile,
}

impl Default for PacingProfile {
    fn default() -> Self {
        Self {
            pointer_step: DelayProfile::new(120, 30),
            scroll_pause: DelayProfile::new(800, 250),
            keystroke: DelayProfile::new(140, 45),
            thinking: DelayProfile::new(900, 300),
            page_dwell: DelayProfile::new(2000, 600),
        }
    }
}

/// Produces randomized but bounded interaction timing
#[derive(Debug, Clone)]
pub struct InteractionScheduler<R: Rng = StdRng> {
    rng: R,
    profile: PacingProfile,
}

impl InteractionScheduler<StdRng> {
    /// Reproducible scheduler for a fixed seed
    #[must_use]
    pub fn from_seed(seed: u64, profile: PacingProfile) -> Self {
        Self::new(StdRng::seed_from_u64(seed), profile)
    }

    /// Scheduler seeded from the operating system
    #[must_use]
    pub fn from_entropy(profile: PacingProfile) -> Self {
        Self::new(StdRng::from_os_rng(), profile)
    }
}

impl<R: Rng> InteractionScheduler<R> {
    pub fn new(rng: R, profile: PacingProfile) -> Self {
        Self { rng, profile }
    }

    #[must_use]
    pub fn profile(&self) -> &PacingProfile {
        &self.profile
    }

    /// Gaussian delay around `mean` via Box-Muller
    ///
    /// The result always lies in `[MIN_DELAY, max(MIN_DELAY, mean + 4σ)]`.
    pub fn gaussian_delay(&mut self, mean: Duration, std_dev: Duration) -> Duration {
        // 1 - u keeps the log argument in (0, 1]
        let u1: f64 = 1.0 - self.rng.random::<f64>();
        let u2: f64 = self.rng.random::<f64>();
        let z = (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos();

        let mean_ms = mean.as_secs_f64() * 1000.0;
        let std_ms = std_dev.as_secs_f64() * 1000.0;
        let floor_ms = MIN_DELAY.as_secs_f64() * 1000.0;
        let ceiling_ms = (mean_ms + MAX_SIGMAS * std_ms).max(floor_ms);

        let ms = (mean_ms + z * std_ms).clamp(floor_ms, ceiling_ms);
        Duration::from_secs_f64(ms / 1000.0)
    }

    /// Draw from a configured profile
    pub fn delay(&mut self, profile: DelayProfile) -> Duration {
        self.gaussian_delay(profile.mean(), profile.std_dev())
    }

    /// Pause between two page loads
    pub fn page_dwell(&mut self) -> Duration {
        self.delay(self.profile.page_dwell)
    }

    /// Pointer path from the viewport center through 3 to 8 inset waypoints
    pub fn pointer_plan(&mut self, viewport: Viewport) -> PointerPlan {
        let width = f64::from(viewport.width);
        let height = f64::from(viewport.height);
        let (min_x, max_x) = (width * EDGE_INSET, width * (1.0 - EDGE_INSET));
        let (min_y, max_y) = (height * EDGE_INSET, height * (1.0 - EDGE_INSET));

        let count = self.rng.random_range(WAYPOINTS);
        let waypoints: Vec<(f64, f64)> = (0..count)
            .map(|_| {
                (
                    self.rng.random_range(min_x..=max_x),
                    self.rng.random_range(min_y..=max_y),
                )
            })
            .collect();

        let mut steps = Vec::new();
        let mut from = viewport.center();
        for &to in &waypoints {
            let step_count = self.rng.random_range(STEPS_PER_MOVE);
            for i in 1..=step_count {
                #[allow(clippy::cast_precision_loss)]
                let t = ease_in_out(i as f64 / step_count as f64);
                steps.push(PointerStep {
                    x: from.0 + (to.0 - from.0) * t,
                    y: from.1 + (to.1 - from.1) * t,
                    delay: self.delay(self.profile.pointer_step),
                });
            }
            from = to;
        }

        PointerPlan { waypoints, steps }
    }

    /// 2 to 5 forward bursts, each possibly followed by a small scroll back
    pub fn scroll_plan(&mut self) -> ScrollPlan {
        let bursts = self.rng.random_range(SCROLL_BURSTS);
        let mut steps = Vec::with_capacity(bursts * 2);

        for _ in 0..bursts {
            steps.push(ScrollStep {
                delta_y: self.rng.random_range(SCROLL_MAGNITUDE_PX),
                pause: self.delay(self.profile.scroll_pause),
            });
            if self.rng.random_bool(BACKSCROLL_PROBABILITY) {
                steps.push(ScrollStep {
                    delta_y: -self.rng.random_range(BACKSCROLL_MAGNITUDE_PX),
                    pause: self.delay(self.profile.scroll_pause),
                });
            }
        }

        ScrollPlan { steps }
    }

    /// Per-character delays with an occasional thinking pause
    pub fn typing_plan(&mut self, text: &str) -> TypingPlan {
        let keystrokes = text
            .chars()
            .map(|ch| {
                let thinking = self.rng.random_bool(THINKING_PROBABILITY);
                let base = self.delay(self.profile.keystroke);
                let delay = if thinking {
                    base + self.delay(self.profile.thinking)
                } else {
                    base
                };
                Keystroke { ch, delay, thinking }
            })
            .collect();
        TypingPlan { keystrokes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(seed: u64) -> InteractionScheduler {
        InteractionScheduler::from_seed(seed, PacingProfile::default())
    }

    #[test]
    fn same_seed_same_plans() {
        let mut a = scheduler(42);
        let mut b = scheduler(42);
        assert_eq!(a.pointer_plan(Viewport::default()), b.pointer_plan(Viewport::default()));
        assert_eq!(a.scroll_plan(), b.scroll_plan());
        assert_eq!(a.typing_plan("margaux"), b.typing_plan("margaux"));
        assert_eq!(
            a.gaussian_delay(Duration::from_secs(2), Duration::from_millis(500)),
            b.gaussian_delay(Duration::from_secs(2), Duration::from_millis(500))
        );
    }

    #[test]
    fn delays_are_bounded() {
        let mut s = scheduler(7);
        let mean = Duration::from_millis(300);
        let std_dev = Duration::from_millis(200);
        for _ in 0..5_000 {
            let d = s.gaussian_delay(mean, std_dev);
            assert!(d >= MIN_DELAY, "{d:?} below floor");
            assert!(d <= Duration::from_millis(1100), "{d:?} above ceiling");
        }
    }

    #[test]
    fn tiny_mean_is_floored() {
        let mut s = scheduler(1);
        for _ in 0..100 {
            assert_eq!(s.gaussian_delay(Duration::ZERO, Duration::ZERO), MIN_DELAY);
        }
    }

    #[test]
    fn pointer_plan_shape() {
        let viewport = Viewport::new(1000, 800);
        for seed in 0..50 {
            let plan = scheduler(seed).pointer_plan(viewport);
            assert!(WAYPOINTS.contains(&plan.waypoints.len()));
            for &(x, y) in &plan.waypoints {
                assert!((100.0..=900.0).contains(&x));
                assert!((80.0..=720.0).contains(&y));
            }
            let min_steps = plan.waypoints.len() * 5;
            let max_steps = plan.waypoints.len() * 20;
            assert!((min_steps..=max_steps).contains(&plan.steps.len()));
            // Every move ends exactly on its waypoint
            let last = plan.steps.last().expect("steps");
            let target = plan.waypoints.last().expect("waypoints");
            assert!((last.x - target.0).abs() < 1e-9 && (last.y - target.1).abs() < 1e-9);
        }
    }

    #[test]
    fn scroll_plan_shape() {
        for seed in 0..50 {
            let plan = scheduler(seed).scroll_plan();
            let forward = plan.forward_bursts().count();
            assert!(SCROLL_BURSTS.contains(&forward));
            for step in &plan.steps {
                if step.delta_y < 0.0 {
                    assert!(step.delta_y.abs() < 160.0);
                }
                assert!(step.pause >= MIN_DELAY);
            }
        }
    }

    #[test]
    fn backscroll_happens_sometimes() {
        let backs: usize = (0..200)
            .map(|seed| {
                scheduler(seed)
                    .scroll_plan()
                    .steps
                    .iter()
                    .filter(|s| s.delta_y < 0.0)
                    .count()
            })
            .sum();
        assert!(backs > 0);
    }

    #[test]
    fn typing_plan_preserves_text() {
        let plan = scheduler(3).typing_plan("Chateau Margaux");
        assert_eq!(plan.text(), "Chateau Margaux");
        assert!(plan.keystrokes.iter().all(|k| k.delay >= MIN_DELAY));
        assert!(
            plan.keystrokes
                .iter()
                .filter(|k| k.thinking)
                .all(|k| k.delay >= MIN_DELAY * 2)
        );
    }
}
