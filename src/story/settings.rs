use std::ops::RangeInclusive;

use serde::Serialize;

use crate::error::{PipelineError, Result};

/// Allowed values for [`GenerationSettings::max_length`].
pub const MAX_LENGTH_RANGE: RangeInclusive<usize> = 50..=200;
/// Allowed values for [`GenerationSettings::temperature`].
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 0.1..=1.0;

/// Default max length (tokens, prompt included).
pub const DEFAULT_MAX_LENGTH: usize = 100;
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// The two user-tunable generation parameters.
///
/// Both are handed to the generator as-is. `max_length` bounds the whole
/// sequence, instruction included, so long prompts leave less room for the
/// story. The fields are private so every value has passed
/// [`GenerationSettings::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationSettings {
    max_length: usize,
    temperature: f64,
}

impl GenerationSettings {
    /// Validate and build settings.
    ///
    /// Values outside [`MAX_LENGTH_RANGE`] or [`TEMPERATURE_RANGE`] are
    /// rejected with [`PipelineError::InvalidParams`], never clamped.
    pub fn new(max_length: usize, temperature: f64) -> Result<Self> {
        if !MAX_LENGTH_RANGE.contains(&max_length) {
            return Err(PipelineError::InvalidParams(format!(
                "max_length {max_length} outside {}..={}",
                MAX_LENGTH_RANGE.start(),
                MAX_LENGTH_RANGE.end()
            )));
        }
        if !TEMPERATURE_RANGE.contains(&temperature) {
            return Err(PipelineError::InvalidParams(format!(
                "temperature {temperature} outside {}..={}",
                TEMPERATURE_RANGE.start(),
                TEMPERATURE_RANGE.end()
            )));
        }
        Ok(Self {
            max_length,
            temperature,
        })
    }

    /// Upper bound on instruction plus story tokens.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Sampling temperature.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_in_range() {
        let d = GenerationSettings::default();
        assert_eq!(d, GenerationSettings::new(100, 0.7).unwrap());
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(GenerationSettings::new(50, 0.1).is_ok());
        assert!(GenerationSettings::new(200, 1.0).is_ok());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for (len, temp) in [(49, 0.7), (201, 0.7), (100, 0.05), (100, 1.5), (100, f64::NAN)] {
            let err = GenerationSettings::new(len, temp).unwrap_err();
            assert!(
                matches!(err, PipelineError::InvalidParams(_)),
                "({len}, {temp}) gave {err:?}"
            );
        }
    }

    #[test]
    fn accessors_return_validated_values() {
        let settings = GenerationSettings::new(173, 0.35).unwrap();
        assert_eq!(settings.max_length(), 173);
        assert_eq!(settings.temperature(), 0.35);
    }

    #[test]
    fn error_names_the_offending_setting() {
        let err = GenerationSettings::new(100, 2.0).unwrap_err();
        assert!(err.to_string().starts_with("temperature 2"));
    }
}
