//! Configuration type definitions
//!
//! Runtime configuration is persisted to the settings store as
//! postcard-serialized records; defaults here govern behavior whenever the
//! store is empty or unavailable.

pub mod presets;
pub mod types;

pub use presets::{preset, Preset, PRESET_COUNT};
pub use types::{
    CalibrationConfig, GuardConfig, OperatingMode, TunedDurations, TunerConfig, TuningLimits,
    WeldPattern, DEFAULT_GAP_MS,
};
