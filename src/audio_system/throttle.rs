use std::collections::HashMap;
use std::time::Instant;

use super::source::EffectName;

/// Per-effect debounce to drop rapid repeated triggers
#[derive(Debug, Default)]
pub struct Throttle {
    last_trigger: HashMap<EffectName, Instant>,
}

impl Throttle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if enough time has passed since the last accepted trigger of `name`.
    /// Returns true and records `now` if the trigger is allowed.
    ///
    /// Effects with a zero gap always pass and are not recorded.
    pub fn should_trigger(&mut self, name: EffectName, now: Instant) -> bool {
        let gap = name.min_gap();
        if gap.is_zero() {
            return true;
        }

        match self.last_trigger.get(&name) {
            Some(last) if now.saturating_duration_since(*last) < gap => false,
            _ => {
                self.last_trigger.insert(name, now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_throttle_same_tick() {
        let mut throttle = Throttle::new();
        let now = Instant::now();

        // First trigger should succeed
        assert!(throttle.should_trigger(EffectName::Tap, now));

        // Immediate second trigger should fail
        assert!(!throttle.should_trigger(EffectName::Tap, now));
    }

    #[test]
    fn test_throttle_gap_elapsed() {
        let mut throttle = Throttle::new();
        let start = Instant::now();

        assert!(throttle.should_trigger(EffectName::Tap, start));
        assert!(!throttle.should_trigger(EffectName::Tap, start + Duration::from_millis(159)));
        assert!(throttle.should_trigger(EffectName::Tap, start + Duration::from_millis(160)));
    }

    #[test]
    fn test_dropped_trigger_does_not_extend_window() {
        let mut throttle = Throttle::new();
        let start = Instant::now();

        assert!(throttle.should_trigger(EffectName::Select, start));
        assert!(!throttle.should_trigger(EffectName::Select, start + Duration::from_millis(100)));
        assert!(throttle.should_trigger(EffectName::Select, start + Duration::from_millis(140)));
    }

    #[test]
    fn test_effects_are_independent() {
        let mut throttle = Throttle::new();
        let now = Instant::now();

        assert!(throttle.should_trigger(EffectName::Tap, now));
        assert!(throttle.should_trigger(EffectName::Select, now));
        assert!(!throttle.should_trigger(EffectName::Tap, now));
        assert!(throttle.should_trigger(EffectName::Select, now + Duration::from_millis(140)));
    }

    #[test]
    fn test_zero_gap_always_fires() {
        let mut throttle = Throttle::new();
        let now = Instant::now();

        for _ in 0..5 {
            assert!(throttle.should_trigger(EffectName::Correct, now));
            assert!(throttle.should_trigger(EffectName::Wrong, now));
        }
    }
}
