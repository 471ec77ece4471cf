//! Command / telemetry interface for the spot welder controller
//!
//! This crate defines the messages exchanged between the control core and
//! the external command surface (the web UI / HTTP layer, which owns the
//! wire format and is not part of this repository). Commands arrive on a
//! channel, are handled to completion inside the control loop, and every
//! one produces exactly one [`Response`].
//!
//! Text labels (`PRESET`/`SMART`, `SINGLE`/`DOUBLE`, the history CSV
//! header) are part of the stable external vocabulary and must not change.

#![no_std]
#![deny(unsafe_code)]

pub mod commands;
pub mod telemetry;

pub use commands::{Channel, Command, GuardSettings, Mode, Pattern};
pub use telemetry::{
    write_csv, CalibrationValues, ErrorCode, GuardStatusReport, HistoryRecord, PresetInfo,
    Readings, Response, TuningReport, VersionInfo, HISTORY_CSV_HEADER,
};
