//! Analog front-end for the two sense channels
//!
//! The hall-effect current sensor and the mains measurement transformer
//! each feed one ADC channel. `AdcPair` combines two channel sources into
//! the core's two-channel view; offset subtraction and scaling stay in
//! the core.

use spotforge_core::traits::adc::{AdcError, AnalogInputs};

/// One raw ADC channel source
pub trait AdcChannel {
    /// Read one conversion in raw counts
    fn read(&mut self) -> Result<u16, AdcError>;
}

/// Pairs the current and voltage channel sources
pub struct AdcPair<C, V> {
    current: C,
    voltage: V,
}

impl<C: AdcChannel, V: AdcChannel> AdcPair<C, V> {
    /// Create a front-end from the two channel sources
    pub fn new(current: C, voltage: V) -> Self {
        Self { current, voltage }
    }
}

impl<C: AdcChannel, V: AdcChannel> AnalogInputs for AdcPair<C, V> {
    fn read_current_raw(&mut self) -> Result<u16, AdcError> {
        self.current.read()
    }

    fn read_voltage_raw(&mut self) -> Result<u16, AdcError> {
        self.voltage.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedChannel(u16);

    impl AdcChannel for FixedChannel {
        fn read(&mut self) -> Result<u16, AdcError> {
            Ok(self.0)
        }
    }

    struct DeadChannel;

    impl AdcChannel for DeadChannel {
        fn read(&mut self) -> Result<u16, AdcError> {
            Err(AdcError::Conversion)
        }
    }

    #[test]
    fn test_channels_route_independently() {
        let mut pair = AdcPair::new(FixedChannel(1111), FixedChannel(2222));
        assert_eq!(pair.read_current_raw(), Ok(1111));
        assert_eq!(pair.read_voltage_raw(), Ok(2222));
    }

    #[test]
    fn test_one_dead_channel_does_not_poison_the_other() {
        let mut pair = AdcPair::new(DeadChannel, FixedChannel(2222));
        assert_eq!(pair.read_current_raw(), Err(AdcError::Conversion));
        assert_eq!(pair.read_voltage_raw(), Ok(2222));
    }
}
