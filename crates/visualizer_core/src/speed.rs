use std::time::Duration;

use shared::error::VisualizerError;

/// Playback scale factor. Always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Speed(f64);

impl Speed {
    pub const DEFAULT: Speed = Speed(0.5);

    pub fn value(self) -> f64 {
        self.0
    }

    /// Time spent in one stage at this speed, saturating at `Duration::MAX`.
    pub fn stage_delay(self, base: Duration) -> Duration {
        Duration::try_from_secs_f64(base.as_secs_f64() / self.0).unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedRange {
    min: f64,
    max: f64,
}

impl SpeedRange {
    pub const DEFAULT: SpeedRange = SpeedRange { min: 0.1, max: 1.0 };
    /// Slowest speed a range may allow; a stage lasts at most 100 base durations.
    pub const FLOOR: f64 = 0.01;

    pub fn new(min: f64, max: f64) -> Result<Self, VisualizerError> {
        if !min.is_finite() || !max.is_finite() || min < Self::FLOOR || min > max {
            return Err(VisualizerError::InvalidSpeed {
                value: min,
                min,
                max,
            });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Rejects non-finite and non-positive values, clamps the rest into range.
    pub fn admit(&self, value: f64) -> Result<Speed, VisualizerError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(VisualizerError::InvalidSpeed {
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(Speed(value.clamp(self.min, self.max)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admit_clamps_positive_values_into_range() {
        let range = SpeedRange::new(0.1, 1.0).expect("range");
        assert_eq!(range.admit(0.5).expect("speed").value(), 0.5);
        assert_eq!(range.admit(4.0).expect("speed").value(), 1.0);
        assert_eq!(range.admit(0.01).expect("speed").value(), 0.1);
    }

    #[test]
    fn admit_rejects_values_that_would_break_timers() {
        let range = SpeedRange::new(0.1, 1.0).expect("range");
        for value in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                range.admit(value),
                Err(VisualizerError::InvalidSpeed { .. })
            ));
        }
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(SpeedRange::new(1.0, 0.5).is_err());
        assert!(SpeedRange::new(0.0, 1.0).is_err());
    }

    #[test]
    fn range_below_the_floor_is_rejected() {
        assert!(matches!(
            SpeedRange::new(1e-20, 1.0),
            Err(VisualizerError::InvalidSpeed { .. })
        ));
        assert!(SpeedRange::new(SpeedRange::FLOOR, 1.0).is_ok());
    }

    #[test]
    fn stage_delay_saturates_instead_of_overflowing() {
        let tiny = Speed(1e-20);
        assert_eq!(tiny.stage_delay(Duration::from_secs(1)), Duration::MAX);
    }

    #[test]
    fn stage_delay_scales_inversely_with_speed() {
        let range = SpeedRange::new(0.1, 1.0).expect("range");
        let base = Duration::from_millis(500);
        assert_eq!(
            range.admit(0.5).expect("speed").stage_delay(base),
            Duration::from_millis(1000)
        );
        assert_eq!(
            range.admit(1.0).expect("speed").stage_delay(base),
            base
        );
    }
}
