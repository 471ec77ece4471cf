//! Inbound commands from the external command surface

/// Sense channel selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Current,
    Voltage,
}

impl Channel {
    /// Parse a channel from its external name
    ///
    /// Accepts the short route names (`i`, `v`) and the long forms.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "i" | "current" => Some(Channel::Current),
            "v" | "voltage" => Some(Channel::Voltage),
            _ => None,
        }
    }

    /// External name
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Current => "i",
            Channel::Voltage => "v",
        }
    }
}

/// Operating mode, with its external wire labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Preset,
    Smart,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Preset => "PRESET",
            Mode::Smart => "SMART",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "PRESET" => Some(Mode::Preset),
            "SMART" => Some(Mode::Smart),
            _ => None,
        }
    }
}

/// Weld pattern, with its external wire labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pattern {
    Single,
    Double,
}

impl Pattern {
    pub fn label(&self) -> &'static str {
        match self {
            Pattern::Single => "SINGLE",
            Pattern::Double => "DOUBLE",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "SINGLE" => Some(Pattern::Single),
            "DOUBLE" => Some(Pattern::Double),
            _ => None,
        }
    }
}

/// Guard configuration as exchanged with the command surface
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GuardSettings {
    pub auto_trigger: bool,
    pub guard_enabled: bool,
    pub current_trigger_a: f32,
    pub voltage_cutoff_v: f32,
    pub current_limit_a: f32,
    pub cooldown_ms: u32,
    pub required_stable_windows: u8,
}

/// Commands handled by the control loop
///
/// Every command is handled to completion within one loop iteration and
/// answered with exactly one [`crate::Response`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    // Telemetry queries
    QueryReadings,
    QueryVersion,
    QueryStatus,

    // Calibration
    QueryCalibration,
    ZeroChannel(Channel),
    SetScales {
        current: Option<f32>,
        voltage: Option<f32>,
    },
    AutoScale {
        channel: Channel,
        target: f32,
    },

    // Guard configuration
    QueryGuard,
    SetGuard(GuardSettings),

    // Mode / pattern / preset
    QueryMode,
    SetMode(Mode),
    QueryPattern,
    SetPattern(Pattern),
    SetGap {
        gap_ms: u16,
    },
    QueryPreset,
    SelectPreset {
        id: u8,
    },

    // Weld control
    TriggerWeld,

    // Tuning
    QueryThicknessOptions,
    QueryThickness,
    SetThickness {
        thickness_x100: u16,
    },
    TuningStart,
    TuningStop,
    TuningApply,
    QueryTuning,

    // History
    QueryHistory,
    QueryHistoryCsv,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names() {
        assert_eq!(Channel::from_name("i"), Some(Channel::Current));
        assert_eq!(Channel::from_name("current"), Some(Channel::Current));
        assert_eq!(Channel::from_name("v"), Some(Channel::Voltage));
        assert_eq!(Channel::from_name("voltage"), Some(Channel::Voltage));
        assert_eq!(Channel::from_name("x"), None);
    }

    #[test]
    fn test_mode_label_roundtrip() {
        for mode in [Mode::Preset, Mode::Smart] {
            assert_eq!(Mode::from_label(mode.label()), Some(mode));
        }
        assert_eq!(Mode::from_label("preset"), None);
    }

    #[test]
    fn test_pattern_label_roundtrip() {
        for pattern in [Pattern::Single, Pattern::Double] {
            assert_eq!(Pattern::from_label(pattern.label()), Some(pattern));
        }
        assert_eq!(Pattern::from_label(""), None);
    }
}
