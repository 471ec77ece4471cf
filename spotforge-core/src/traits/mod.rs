//! Hardware abstraction traits
//!
//! These traits define the interface between the application logic
//! and hardware-specific implementations.

pub mod adc;
pub mod ssr;
pub mod storage;

pub use adc::{AdcError, AnalogInputs};
pub use ssr::SsrOutput;
pub use storage::{SettingsKey, SettingsStore, StorageError};
