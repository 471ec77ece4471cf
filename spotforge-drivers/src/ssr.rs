//! GPIO solid-state relay output
//!
//! Drives the weld SSR via a GPIO pin, directly or through an
//! opto-isolated driver stage. The pin can be configured as active-high
//! (default) or active-low.

use spotforge_core::traits::ssr::SsrOutput;

/// Trait for GPIO pin abstraction
pub trait OutputPin {
    /// Set the pin high
    fn set_high(&mut self);

    /// Set the pin low
    fn set_low(&mut self);

    /// Check if the pin is set high
    fn is_set_high(&self) -> bool;
}

/// Adapter for `embedded-hal` stateful output pins
///
/// RP2040/STM32 GPIO writes are infallible; pin errors are discarded.
pub struct HalPin<P>(pub P);

impl<P: embedded_hal::digital::StatefulOutputPin> OutputPin for HalPin<P> {
    fn set_high(&mut self) {
        let _ = self.0.set_high();
    }

    fn set_low(&mut self) {
        let _ = self.0.set_low();
    }

    fn is_set_high(&self) -> bool {
        // Reads back the output latch, not the pad level
        matches!(self.0.is_set_high(), Ok(true))
    }
}

/// GPIO SSR output
pub struct GpioSsr<P> {
    pin: P,
    /// If true, SSR ON = pin LOW
    inverted: bool,
}

impl<P: OutputPin> GpioSsr<P> {
    /// Create an active-high SSR output, forced off
    pub fn new(pin: P) -> Self {
        let mut ssr = Self {
            pin,
            inverted: false,
        };
        ssr.set_on(false);
        ssr
    }

    /// Create an active-low SSR output, forced off
    pub fn new_inverted(pin: P) -> Self {
        let mut ssr = Self {
            pin,
            inverted: true,
        };
        ssr.set_on(false);
        ssr
    }

    /// Access the underlying pin
    pub fn pin(&self) -> &P {
        &self.pin
    }
}

impl<P: OutputPin> SsrOutput for GpioSsr<P> {
    fn set_on(&mut self, on: bool) {
        if on != self.inverted {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }

    fn is_on(&self) -> bool {
        self.pin.is_set_high() != self.inverted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockPin {
        high: bool,
    }

    impl OutputPin for MockPin {
        fn set_high(&mut self) {
            self.high = true;
        }

        fn set_low(&mut self) {
            self.high = false;
        }

        fn is_set_high(&self) -> bool {
            self.high
        }
    }

    #[test]
    fn test_starts_off() {
        let ssr = GpioSsr::new(MockPin { high: true });
        assert!(!ssr.is_on());
        assert!(!ssr.pin().is_set_high());
    }

    #[test]
    fn test_active_high() {
        let mut ssr = GpioSsr::new(MockPin { high: false });
        ssr.set_on(true);
        assert!(ssr.is_on());
        assert!(ssr.pin().is_set_high());
        ssr.set_on(false);
        assert!(!ssr.pin().is_set_high());
    }

    #[test]
    fn test_active_low() {
        let mut ssr = GpioSsr::new_inverted(MockPin { high: false });
        // Forced off at construction: pin driven high
        assert!(ssr.pin().is_set_high());
        ssr.set_on(true);
        assert!(ssr.is_on());
        assert!(!ssr.pin().is_set_high());
    }
}
