//! Board-agnostic core logic for the spot welder firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Hardware abstraction traits (analog inputs, SSR output, settings store)
//! - Sensor sampling and windowed RMS estimation
//! - Guard / auto-trigger evaluation
//! - Weld pulse state machine
//! - Adaptive pulse-duration tuner ("Smart" mode)
//! - Trial history ring buffer
//! - Configuration type definitions

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod guard;
pub mod history;
pub mod sense;
pub mod traits;
pub mod tuning;
pub mod weld;
pub mod welder;

pub use welder::{CommandError, Welder};
