//! Hardware driver implementations for the spot welder
//!
//! Bridges the abstract traits in `spotforge-core` to real hardware:
//!
//! - SSR output via a GPIO pin (direct or through an opto-isolated driver)
//! - Analog front-end pairing the hall current sensor and mains
//!   transformer channels into the core's two-channel view

#![no_std]
#![deny(unsafe_code)]

pub mod sense;
pub mod ssr;

pub use sense::{AdcChannel, AdcPair};
pub use ssr::GpioSsr;
