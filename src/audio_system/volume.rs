/// Volume control
///
/// Clamped volume levels and the duck depth counter for background music.

/// Volume level, always within [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Volume(f32);

impl Volume {
    pub const SILENT: Volume = Volume(0.0);
    pub const FULL: Volume = Volume(1.0);

    /// Create a volume, clamping into [0, 1]. NaN maps to silence.
    pub fn new(level: f32) -> Self {
        if level.is_nan() {
            return Self::SILENT;
        }
        Self(level.clamp(0.0, 1.0))
    }

    /// Get the volume level
    pub fn level(&self) -> f32 {
        self.0
    }

    /// Scale by a factor, staying within [0, 1]
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.0 * factor)
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::FULL
    }
}

/// Nesting-safe ducking of the background track.
///
/// Every duck request increments the depth and schedules its own release;
/// the baseline comes back only when the depth returns to zero.
#[derive(Debug, Default)]
pub struct Ducker {
    depth: usize,
    next_ticket: u64,
}

impl Ducker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a duck request, returning a ticket identifying its release
    pub fn duck(&mut self) -> u64 {
        self.depth += 1;
        self.next_ticket += 1;
        self.next_ticket
    }

    /// Release one duck request. Returns true when music should go back to baseline.
    pub fn release(&mut self) -> bool {
        if self.depth == 0 {
            return false;
        }
        self.depth -= 1;
        self.depth == 0
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_ducked(&self) -> bool {
        self.depth > 0
    }

    /// Drop every outstanding request
    pub fn clear(&mut self) {
        self.depth = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_clamping() {
        assert_eq!(Volume::new(1.5).level(), 1.0);
        assert_eq!(Volume::new(-0.5).level(), 0.0);
        assert_eq!(Volume::new(f32::NAN).level(), 0.0);
        assert_eq!(Volume::new(0.8).level(), 0.8);
    }

    #[test]
    fn test_volume_scaled() {
        let ducked = Volume::new(0.5).scaled(0.12);
        assert!((ducked.level() - 0.06).abs() < 1e-6);
        assert_eq!(Volume::new(0.9).scaled(3.0), Volume::FULL);
    }

    #[test]
    fn test_ducker_single() {
        let mut ducker = Ducker::new();
        assert!(!ducker.is_ducked());

        ducker.duck();
        assert!(ducker.is_ducked());
        assert!(ducker.release());
        assert!(!ducker.is_ducked());
    }

    #[test]
    fn test_ducker_nested_restores_on_last_release() {
        let mut ducker = Ducker::new();
        let first = ducker.duck();
        let second = ducker.duck();
        assert_ne!(first, second);
        assert_eq!(ducker.depth(), 2);

        assert!(!ducker.release());
        assert!(ducker.release());
        assert_eq!(ducker.depth(), 0);
    }

    #[test]
    fn test_ducker_release_without_duck() {
        let mut ducker = Ducker::new();
        assert!(!ducker.release());
        assert_eq!(ducker.depth(), 0);
    }
}
