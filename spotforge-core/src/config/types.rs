//! Core configuration structs and enums

use serde::{Deserialize, Serialize};

/// Default inter-pulse gap in milliseconds
pub const DEFAULT_GAP_MS: u16 = 60;

/// ADC calibration: per-channel offset (counts) and scale (units per count)
///
/// Raw readings have the offset subtracted before accumulation; RMS values
/// in counts are multiplied by the scale to yield amps / volts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationConfig {
    /// Current channel zero offset in ADC counts
    pub current_offset: i32,
    /// Voltage channel zero offset in ADC counts
    pub voltage_offset: i32,
    /// Amps per RMS count
    pub current_scale: f32,
    /// Volts per RMS count
    pub voltage_scale: f32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        // Mid-rail offsets for a 12-bit converter; scales for the stock
        // hall sensor and mains transformer front-ends.
        Self {
            current_offset: 2048,
            voltage_offset: 2048,
            current_scale: 0.0005,
            voltage_scale: 0.1,
        }
    }
}

/// Guard and auto-trigger configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GuardConfig {
    /// Auto-trigger enabled: start a cycle when conditions stabilize
    pub auto_trigger: bool,
    /// Guard enabled: supervise voltage/current during a cycle
    pub guard_enabled: bool,
    /// RMS current that counts as "electrodes on workpiece" (A)
    pub current_trigger_a: f32,
    /// Minimum RMS mains voltage for welding (V)
    pub voltage_cutoff_v: f32,
    /// RMS current above which an active cycle aborts (A)
    pub current_limit_a: f32,
    /// Minimum time between cycle end and the next auto-trigger (ms)
    pub cooldown_ms: u32,
    /// Consecutive stable sensing windows required before auto-trigger
    pub required_stable_windows: u8,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            auto_trigger: false,
            guard_enabled: true,
            current_trigger_a: 2.0,
            voltage_cutoff_v: 150.0,
            current_limit_a: 35.0,
            cooldown_ms: 1500,
            required_stable_windows: 2,
        }
    }
}

/// Operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingMode {
    /// Fixed durations from the preset table
    #[default]
    Preset,
    /// Durations from the adaptive tuner
    Adaptive,
}

/// Weld pulse pattern
///
/// `Single` fires only the main pulse; `Double` adds a pre-heat pulse and
/// an off gap before the main pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WeldPattern {
    #[default]
    Single,
    Double,
}

/// Clamp bounds for tuned pulse durations (ms)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TuningLimits {
    pub pre_min_ms: u16,
    pub pre_max_ms: u16,
    pub main_min_ms: u16,
    pub main_max_ms: u16,
}

impl Default for TuningLimits {
    fn default() -> Self {
        Self {
            pre_min_ms: 5,
            pre_max_ms: 120,
            main_min_ms: 20,
            main_max_ms: 350,
        }
    }
}

impl TuningLimits {
    /// Clamp a pre-pulse duration to bounds
    pub fn clamp_pre(&self, ms: u16) -> u16 {
        ms.clamp(self.pre_min_ms, self.pre_max_ms)
    }

    /// Clamp a main-pulse duration to bounds
    pub fn clamp_main(&self, ms: u16) -> u16 {
        ms.clamp(self.main_min_ms, self.main_max_ms)
    }
}

/// Adaptive tuner configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TunerConfig {
    /// Maximum trials per tuning session
    pub max_trials: u8,
    /// Acceptance band lower multiplier on the baseline energy proxy
    pub band_low: f32,
    /// Acceptance band upper multiplier on the baseline energy proxy
    pub band_high: f32,
    /// Main-duration factor applied on overheat (BadHot)
    pub overheat_main_factor: f32,
    /// Main-duration factor applied on underheat (Bad)
    pub underheat_main_factor: f32,
    /// Pre-duration factor applied on underheat (Bad)
    pub underheat_pre_factor: f32,
    /// Fine-adjust step applied on Good ratings (fraction of main)
    pub fine_step: f32,
    /// Duration clamp bounds
    pub limits: TuningLimits,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            max_trials: 6,
            band_low: 0.90,
            band_high: 1.10,
            overheat_main_factor: 0.85,
            underheat_main_factor: 1.10,
            underheat_pre_factor: 1.05,
            fine_step: 0.02,
            limits: TuningLimits::default(),
        }
    }
}

/// Tuned pre/main durations persisted per material thickness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TunedDurations {
    pub pre_ms: u16,
    pub main_ms: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_defaults_match_stock_frontend() {
        let cal = CalibrationConfig::default();
        assert_eq!(cal.current_offset, 2048);
        assert_eq!(cal.voltage_offset, 2048);
        assert!((cal.current_scale - 0.0005).abs() < 1e-9);
        assert!((cal.voltage_scale - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_limits_clamp_both_directions() {
        let limits = TuningLimits::default();
        assert_eq!(limits.clamp_pre(0), limits.pre_min_ms);
        assert_eq!(limits.clamp_pre(1000), limits.pre_max_ms);
        assert_eq!(limits.clamp_main(25), 25);
        assert_eq!(limits.clamp_main(10_000), limits.main_max_ms);
    }

    #[test]
    fn test_tuned_durations_postcard_roundtrip() {
        let tuned = TunedDurations {
            pre_ms: 25,
            main_ms: 80,
        };
        let mut buf = [0u8; 16];
        let used = postcard::to_slice(&tuned, &mut buf).unwrap();
        let back: TunedDurations = postcard::from_bytes(used).unwrap();
        assert_eq!(back, tuned);
    }
}
