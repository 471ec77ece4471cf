//! Sensor sampling and windowed RMS estimation
//!
//! Two analog channels (weld current, mains voltage) are polled in small
//! non-blocking batches from the control loop. Offset-corrected samples are
//! accumulated per fixed time window; at each window boundary the RMS value
//! is derived and converted to physical units.

pub mod accumulator;
pub mod sampler;

pub use accumulator::Accumulator;
pub use sampler::{
    CalibrationError, RmsReading, SenseChannel, SensorSampler, DEFAULT_WINDOW_MS,
    READS_PER_SAMPLE, ZERO_AVG_SAMPLES,
};
