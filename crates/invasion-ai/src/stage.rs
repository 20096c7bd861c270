//! Boss stages selected from the health ratio.

use serde::{Deserialize, Serialize};

/// Health ratio at or above which a boss is in [`Stage::One`].
pub const STAGE_ONE_MIN_RATIO: f32 = 0.7;

/// Health ratio at or above which a boss is in [`Stage::Two`].
pub const STAGE_TWO_MIN_RATIO: f32 = 0.3;

/// Boss behavior tier. Later stages are more aggressive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Healthy (ratio >= 0.7)
    One,
    /// Wounded (0.3 <= ratio < 0.7)
    Two,
    /// Desperate (ratio < 0.3)
    Three,
}

impl Stage {
    /// Stage for a health ratio. Boundaries belong to the healthier stage.
    #[must_use]
    pub fn from_health_ratio(ratio: f32) -> Self {
        if ratio >= STAGE_ONE_MIN_RATIO {
            Self::One
        } else if ratio >= STAGE_TWO_MIN_RATIO {
            Self::Two
        } else {
            Self::Three
        }
    }

    /// Zero-based index, for per-stage tuning tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
            Self::Three => 2,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::One => write!(f, "stage 1"),
            Self::Two => write!(f, "stage 2"),
            Self::Three => write!(f, "stage 3"),
        }
    }
}

/// Tracks the current stage of one boss.
///
/// Stages get worse as soon as the ratio crosses a threshold. With a non-zero
/// `hysteresis` they only get better once the ratio clears the threshold by
/// that margin, so healing near a boundary does not flap between stages.
/// A zero band recomputes the stage from scratch on every update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSelector {
    current: Stage,
    hysteresis: f32,
}

impl StageSelector {
    /// Creates a selector starting at the stage for `ratio`.
    #[must_use]
    pub fn new(ratio: f32, hysteresis: f32) -> Self {
        Self {
            current: Stage::from_health_ratio(ratio),
            hysteresis: hysteresis.max(0.0),
        }
    }

    /// Current stage.
    #[must_use]
    pub const fn current(&self) -> Stage {
        self.current
    }

    /// Re-evaluates the stage. Returns the new stage if it changed.
    pub fn update(&mut self, ratio: f32) -> Option<Stage> {
        let raw = Stage::from_health_ratio(ratio);
        let next = if raw >= self.current {
            raw
        } else {
            Stage::from_health_ratio(ratio - self.hysteresis).min(self.current)
        };

        (next != self.current).then(|| {
            self.current = next;
            next
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_stage_from_ratio() {
        assert_eq!(Stage::from_health_ratio(0.8), Stage::One);
        assert_eq!(Stage::from_health_ratio(0.5), Stage::Two);
        assert_eq!(Stage::from_health_ratio(0.1), Stage::Three);
    }

    #[test]
    fn test_boundaries_belong_to_healthier_stage() {
        assert_eq!(Stage::from_health_ratio(0.7), Stage::One);
        assert_eq!(Stage::from_health_ratio(0.3), Stage::Two);
        assert_eq!(Stage::from_health_ratio(35.0 / 50.0), Stage::One);
        assert_eq!(Stage::from_health_ratio(0.0), Stage::Three);
    }

    #[test]
    fn test_selector_without_band_flaps() {
        let mut selector = StageSelector::new(1.0, 0.0);
        assert_eq!(selector.update(0.69), Some(Stage::Two));
        assert_eq!(selector.update(0.71), Some(Stage::One));
        assert_eq!(selector.update(0.71), None);
    }

    #[test]
    fn test_selector_band_holds_worse_stage() {
        let mut selector = StageSelector::new(1.0, 0.05);
        assert_eq!(selector.update(0.69), Some(Stage::Two));
        assert_eq!(selector.update(0.72), None);
        assert_eq!(selector.current(), Stage::Two);
        assert_eq!(selector.update(0.76), Some(Stage::One));
    }

    #[test]
    fn test_selector_worsens_immediately() {
        let mut selector = StageSelector::new(1.0, 0.2);
        assert_eq!(selector.update(0.1), Some(Stage::Three));
    }

    proptest! {
        #[test]
        fn prop_zero_band_is_pure(ratios in proptest::collection::vec(0.0f32..=1.0, 1..30)) {
            let mut selector = StageSelector::new(1.0, 0.0);
            for ratio in ratios {
                selector.update(ratio);
                prop_assert_eq!(selector.current(), Stage::from_health_ratio(ratio));
            }
        }
    }
}
