//! Adaptive pulse-duration tuner ("Smart" mode)
//!
//! Finds pulse durations that land the weld energy proxy inside a target
//! band for a chosen strip thickness, by running a short series of trial
//! welds and nudging the durations after each one. Empirical feedback
//! only; there is no physical model.

pub mod baseline;
pub mod session;

pub use baseline::{
    baseline_main_ms, baseline_pre_ms, quantize_thickness, thickness_supported,
    SUPPORTED_THICKNESS_X100,
};
pub use session::{SmartTuner, TrialOutcome};

/// Rating of one completed tuning trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rating {
    /// No trial rated yet this session
    #[default]
    Unrated,
    /// Energy proxy inside the acceptance band
    Good,
    /// Energy proxy below the band (underheat)
    Bad,
    /// Cycle aborted or energy proxy above the band (overheat)
    BadHot,
}

impl Rating {
    /// Stable text label for telemetry and history export
    pub fn label(&self) -> &'static str {
        match self {
            Rating::Unrated => "-",
            Rating::Good => "GOOD",
            Rating::Bad => "BAD",
            Rating::BadHot => "BAD_HOT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_labels() {
        assert_eq!(Rating::Unrated.label(), "-");
        assert_eq!(Rating::Good.label(), "GOOD");
        assert_eq!(Rating::Bad.label(), "BAD");
        assert_eq!(Rating::BadHot.label(), "BAD_HOT");
    }
}
