//! Windowed RMS sensor sampler

use super::accumulator::Accumulator;
use crate::config::CalibrationConfig;
use crate::traits::adc::{AdcError, AnalogInputs};

/// Default sensing window duration (ms)
pub const DEFAULT_WINDOW_MS: u32 = 250;

/// Reads per channel per `sample()` call
///
/// A small batch keeps per-tick ADC time bounded so the control loop never
/// stalls, while still gathering enough samples per 250 ms window.
pub const READS_PER_SAMPLE: usize = 3;

/// Raw samples averaged by a zero-calibration command
pub const ZERO_AVG_SAMPLES: u32 = 64;

/// Measured RMS below this many counts rejects auto-scaling; the resulting
/// scale factor would be degenerate.
const LOW_SIGNAL_FLOOR_COUNTS: f32 = 1.0;

/// Sense channel selector for calibration commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SenseChannel {
    Current,
    Voltage,
}

/// Errors from calibration commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// Measured signal too small to derive a scale factor from
    LowSignal,
    /// ADC read failed during calibration
    Adc(AdcError),
}

impl From<AdcError> for CalibrationError {
    fn from(e: AdcError) -> Self {
        CalibrationError::Adc(e)
    }
}

/// Most recent per-window RMS reading
///
/// Overwritten in place at each window boundary; history is kept only via
/// the trial ring buffer.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RmsReading {
    /// RMS weld current (A)
    pub irms_a: f32,
    /// RMS mains voltage (V)
    pub vrms_v: f32,
    /// RMS of the current channel in ADC counts (pre-scale)
    pub current_rms_counts: f32,
    /// RMS of the voltage channel in ADC counts (pre-scale)
    pub voltage_rms_counts: f32,
}

/// Windowed RMS sampler for the two sense channels
///
/// `sample()` is called every control tick; it reads a micro-batch from
/// both channels and accumulates offset-corrected values. When the window
/// duration has elapsed it derives RMS readings, resets both accumulators
/// and advances the window boundary in one step.
#[derive(Debug, Clone)]
pub struct SensorSampler {
    calibration: CalibrationConfig,
    window_ms: u32,
    window_start_ms: u32,
    current: Accumulator,
    voltage: Accumulator,
    reading: RmsReading,
}

impl SensorSampler {
    /// Create a sampler with the given calibration and window duration
    pub fn new(calibration: CalibrationConfig, window_ms: u32, now_ms: u32) -> Self {
        Self {
            calibration,
            window_ms: window_ms.max(1),
            window_start_ms: now_ms,
            current: Accumulator::new(),
            voltage: Accumulator::new(),
            reading: RmsReading::default(),
        }
    }

    /// Poll both channels and close the window if due
    ///
    /// Returns `true` when a window boundary was crossed and a fresh RMS
    /// reading is available. Failed ADC conversions are skipped; they leave
    /// the accumulators untouched.
    pub fn sample<A: AnalogInputs>(&mut self, adc: &mut A, now_ms: u32) -> bool {
        for _ in 0..READS_PER_SAMPLE {
            if let Ok(raw) = adc.read_current_raw() {
                self.current
                    .push(i32::from(raw) - self.calibration.current_offset);
            }
            if let Ok(raw) = adc.read_voltage_raw() {
                self.voltage
                    .push(i32::from(raw) - self.calibration.voltage_offset);
            }
        }

        if now_ms.wrapping_sub(self.window_start_ms) < self.window_ms {
            return false;
        }

        // Window boundary: derive RMS, reset accumulators, advance the
        // boundary. Done together so no sample is ever split across the
        // derivation.
        let current_rms_counts = self.current.rms_counts();
        let voltage_rms_counts = self.voltage.rms_counts();
        self.reading = RmsReading {
            irms_a: current_rms_counts * self.calibration.current_scale,
            vrms_v: voltage_rms_counts * self.calibration.voltage_scale,
            current_rms_counts,
            voltage_rms_counts,
        };
        self.current.reset();
        self.voltage.reset();
        self.window_start_ms = now_ms;
        true
    }

    /// Most recent window's RMS reading
    pub fn reading(&self) -> &RmsReading {
        &self.reading
    }

    /// Samples accumulated on the current channel since the window started
    pub fn samples_in_window(&self) -> u32 {
        self.current.count()
    }

    /// Configured window duration (ms)
    pub fn window_ms(&self) -> u32 {
        self.window_ms
    }

    /// Current calibration values
    pub fn calibration(&self) -> &CalibrationConfig {
        &self.calibration
    }

    /// Replace the calibration wholesale (startup load)
    pub fn set_calibration(&mut self, calibration: CalibrationConfig, now_ms: u32) {
        self.calibration = calibration;
        self.restart_window(now_ms);
    }

    /// Zero-calibrate a channel: average raw readings (no offset
    /// subtraction) and store the mean as the new offset
    ///
    /// Returns the new offset in counts.
    pub fn zero<A: AnalogInputs>(
        &mut self,
        adc: &mut A,
        channel: SenseChannel,
        now_ms: u32,
    ) -> Result<i32, CalibrationError> {
        let mut sum: i64 = 0;
        for _ in 0..ZERO_AVG_SAMPLES {
            let raw = match channel {
                SenseChannel::Current => adc.read_current_raw()?,
                SenseChannel::Voltage => adc.read_voltage_raw()?,
            };
            sum += i64::from(raw);
        }
        let offset = (sum / i64::from(ZERO_AVG_SAMPLES)) as i32;
        match channel {
            SenseChannel::Current => self.calibration.current_offset = offset,
            SenseChannel::Voltage => self.calibration.voltage_offset = offset,
        }
        self.restart_window(now_ms);
        Ok(offset)
    }

    /// Assign scale factors directly
    pub fn set_scales(&mut self, current: Option<f32>, voltage: Option<f32>) {
        if let Some(s) = current {
            self.calibration.current_scale = s;
        }
        if let Some(s) = voltage {
            self.calibration.voltage_scale = s;
        }
    }

    /// Auto-scale a channel so the last measured RMS maps to `target`
    ///
    /// Computes `target / rms_in_counts` from the most recent window and
    /// assigns it as the new scale. Rejected without mutation when the
    /// measured signal is near zero.
    pub fn auto_scale(
        &mut self,
        channel: SenseChannel,
        target: f32,
    ) -> Result<f32, CalibrationError> {
        let rms_counts = match channel {
            SenseChannel::Current => self.reading.current_rms_counts,
            SenseChannel::Voltage => self.reading.voltage_rms_counts,
        };
        if rms_counts < LOW_SIGNAL_FLOOR_COUNTS {
            return Err(CalibrationError::LowSignal);
        }
        let scale = target / rms_counts;
        match channel {
            SenseChannel::Current => self.calibration.current_scale = scale,
            SenseChannel::Voltage => self.calibration.voltage_scale = scale,
        }
        Ok(scale)
    }

    /// Discard the partially-accumulated window after an offset change
    fn restart_window(&mut self, now_ms: u32) {
        self.current.reset();
        self.voltage.reset();
        self.window_start_ms = now_ms;
    }
}
