//! Outbound telemetry and response types

use core::fmt::Write;

use heapless::{String, Vec};

use crate::commands::{Channel, GuardSettings, Mode, Pattern};

/// History CSV header line (stable external vocabulary)
pub const HISTORY_CSV_HEADER: &str = "ms,t_mm,pre_ms,main_ms,E_est,irms,rating";

/// Maximum history records in one response
pub const MAX_HISTORY_RECORDS: usize = 32;

/// Rendered CSV capacity: header plus one line per record
pub const CSV_CAPACITY: usize = 2560;

/// RMS readings snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Readings {
    pub irms_a: f32,
    pub vrms_v: f32,
    pub samples_in_window: u32,
    pub window_ms: u32,
}

/// Calibration values
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationValues {
    pub current_offset: i32,
    pub voltage_offset: i32,
    pub current_scale: f32,
    pub voltage_scale: f32,
}

/// Guard / readiness status
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GuardStatusReport {
    pub stable_windows: u8,
    /// Auto-trigger conditions currently satisfied
    pub ready: bool,
    /// A weld cycle is in progress
    pub welding: bool,
    /// Most recent diagnostic log line (empty when nothing logged yet)
    pub last_event: String<48>,
}

/// Resolved preset information
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PresetInfo {
    pub id: u8,
    /// Strip-thickness group label
    pub label: String<8>,
    pub pre_ms: u16,
    pub main_ms: u16,
}

/// Build / configuration summary
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VersionInfo {
    pub build: &'static str,
    pub mode: Mode,
    pub pattern: Pattern,
    pub gap_ms: u16,
}

/// Tuning session report
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TuningReport {
    pub running: bool,
    pub thickness_x100: u16,
    pub trial: u8,
    pub max_trials: u8,
    pub pre_ms: u16,
    pub main_ms: u16,
    /// Rating label of the most recent trial
    pub rating: &'static str,
    pub energy_est: f32,
    pub energy_low: f32,
    pub energy_high: f32,
}

/// One tuning trial record
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HistoryRecord {
    pub at_ms: u32,
    pub thickness_x100: u16,
    pub pre_ms: u16,
    pub main_ms: u16,
    pub energy_est: f32,
    pub irms_a: f32,
    pub rating: &'static str,
}

impl HistoryRecord {
    /// Render one CSV line (no trailing newline)
    ///
    /// Thickness is printed in millimetres with two decimals, matching the
    /// `t_mm` header column.
    pub fn csv_line(&self) -> String<64> {
        let mut line = String::new();
        // A record always fits 64 bytes; formatting into a heapless string
        // only fails on overflow.
        let _ = write!(
            line,
            "{},{}.{:02},{},{},{:.1},{:.2},{}",
            self.at_ms,
            self.thickness_x100 / 100,
            self.thickness_x100 % 100,
            self.pre_ms,
            self.main_ms,
            self.energy_est,
            self.irms_a,
            self.rating
        );
        line
    }
}

/// Render history records as delimited text, newest first
pub fn write_csv<'a, W: Write>(
    out: &mut W,
    records: impl Iterator<Item = &'a HistoryRecord>,
) -> core::fmt::Result {
    out.write_str(HISTORY_CSV_HEADER)?;
    out.write_char('\n')?;
    for record in records {
        out.write_str(&record.csv_line())?;
        out.write_char('\n')?;
    }
    Ok(())
}

/// Command failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCode {
    /// Preset id outside 1..=99
    PresetOutOfRange,
    /// Thickness not in the supported table
    ThicknessUnsupported,
    /// A weld cycle is already in progress
    CycleInProgress,
    /// Auto-scale attempted with a near-zero signal
    LowSignal,
    /// ADC read failed during calibration
    AdcFailed,
    /// Malformed or missing command parameter
    BadParameter,
}

/// Response to one command
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    /// Command succeeded with nothing to report
    Ok,
    Readings(Readings),
    Calibration(CalibrationValues),
    /// Result of a zero-calibration
    Offset { channel: Channel, offset: i32 },
    /// Result of an auto-scale
    Scale { channel: Channel, scale: f32 },
    Guard(GuardSettings),
    Status(GuardStatusReport),
    Preset(PresetInfo),
    Mode(Mode),
    Pattern { pattern: Pattern, gap_ms: u16 },
    Version(VersionInfo),
    ThicknessOptions(Vec<u16, 16>),
    Thickness { thickness_x100: u16 },
    Tuning(TuningReport),
    History(Vec<HistoryRecord, MAX_HISTORY_RECORDS>),
    HistoryCsv(String<CSV_CAPACITY>),
    /// Command rejected; no state was mutated
    Error(ErrorCode),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record() -> HistoryRecord {
        HistoryRecord {
            at_ms: 123456,
            thickness_x100: 10,
            pre_ms: 25,
            main_ms: 80,
            energy_est: 1050.0,
            irms_a: 10.0,
            rating: "GOOD",
        }
    }

    #[test]
    fn test_csv_line_format() {
        assert_eq!(
            record().csv_line().as_str(),
            "123456,0.10,25,80,1050.0,10.00,GOOD"
        );
    }

    #[test]
    fn test_csv_header_vocabulary() {
        assert_eq!(HISTORY_CSV_HEADER, "ms,t_mm,pre_ms,main_ms,E_est,irms,rating");
    }

    #[test]
    fn test_write_csv_header_only_when_empty() {
        let mut out: String<256> = String::new();
        write_csv(&mut out, core::iter::empty()).unwrap();
        assert_eq!(out.as_str(), "ms,t_mm,pre_ms,main_ms,E_est,irms,rating\n");
    }

    #[test]
    fn test_write_csv_rows() {
        let records = [record(), record()];
        let mut out: String<256> = String::new();
        write_csv(&mut out, records.iter()).unwrap();
        assert_eq!(out.lines().count(), 3);
        assert!(out.ends_with("GOOD\n"));
    }

    proptest! {
        /// Any record renders to seven comma-separated fields that fit the
        /// bounded line buffer.
        #[test]
        fn prop_csv_line_shape(
            at_ms in any::<u32>(),
            thickness_x100 in 0u16..100,
            pre_ms in any::<u16>(),
            main_ms in any::<u16>(),
            energy_est in 0.0f32..100_000.0,
            irms_a in 0.0f32..100.0,
            rating_idx in 0usize..4,
        ) {
            let rating = ["-", "GOOD", "BAD", "BAD_HOT"][rating_idx];
            let record = HistoryRecord {
                at_ms,
                thickness_x100,
                pre_ms,
                main_ms,
                energy_est,
                irms_a,
                rating,
            };
            let line = record.csv_line();
            prop_assert!(!line.is_empty());
            prop_assert_eq!(line.split(',').count(), 7);
            prop_assert!(line.ends_with(rating));
        }
    }
}
