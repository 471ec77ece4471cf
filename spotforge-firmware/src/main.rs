//! SpotForge - Resistive Spot Welder Firmware
//!
//! Main firmware binary for RP2040-based welder controllers. Brings up
//! the analog front-end, the SSR output and flash-backed settings, then
//! runs the control loop. The web UI / HTTP layer is a separate component
//! that feeds commands through [`channels::COMMAND_CHANNEL`].

#![no_std]
#![no_main]

use core::cell::RefCell;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::adc::{Adc, Blocking, Channel as AdcInput, Config as AdcConfig};
use embassy_rp::gpio::{Level, Output, Pull};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use spotforge_core::traits::adc::AdcError;
use spotforge_core::Welder;
use spotforge_drivers::sense::{AdcChannel, AdcPair};
use spotforge_drivers::ssr::{GpioSsr, HalPin};

mod channels;
mod dispatch;
mod storage;
mod tasks;

use storage::CachedSettings;

/// Build identifier reported by the version query
pub const BUILD_VERSION: &str = concat!("spotforge-", env!("CARGO_PKG_VERSION"));

/// One ADC input sharing the single RP2040 converter
pub struct RpAdcChannel {
    adc: &'static RefCell<Adc<'static, Blocking>>,
    input: AdcInput<'static>,
}

impl RpAdcChannel {
    fn new(adc: &'static RefCell<Adc<'static, Blocking>>, input: AdcInput<'static>) -> Self {
        Self { adc, input }
    }
}

impl AdcChannel for RpAdcChannel {
    fn read(&mut self) -> Result<u16, AdcError> {
        self.adc
            .borrow_mut()
            .blocking_read(&mut self.input)
            .map_err(|_| AdcError::Conversion)
    }
}

/// Concrete controller type wired to this board
pub type BoardWelder =
    Welder<AdcPair<RpAdcChannel, RpAdcChannel>, GpioSsr<HalPin<Output<'static>>>, CachedSettings>;

static ADC: StaticCell<RefCell<Adc<'static, Blocking>>> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("SpotForge firmware starting...");
    info!("Build: {}", BUILD_VERSION);

    let p = embassy_rp::init(Default::default());

    // Flash-backed settings: one boot-time read populates the RAM cache
    // serving the synchronous control loop
    let mut flash = storage::config_flash(p.FLASH, p.DMA_CH0);
    let mut settings = CachedSettings::new();
    settings.load_all(&mut flash).await;
    info!("Settings loaded");

    // Analog front-end: hall current sensor on GPIO26, mains transformer
    // on GPIO27, both through the shared converter
    let adc = ADC.init(RefCell::new(Adc::new_blocking(p.ADC, AdcConfig::default())));
    let current = RpAdcChannel::new(adc, AdcInput::new_pin(p.PIN_26, Pull::None));
    let voltage = RpAdcChannel::new(adc, AdcInput::new_pin(p.PIN_27, Pull::None));

    // SSR drive on GPIO22, active-high, forced off at boot
    let ssr = GpioSsr::new(HalPin(Output::new(p.PIN_22, Level::Low)));

    let welder = Welder::new(AdcPair::new(current, voltage), ssr, settings, 0);

    unwrap!(spawner.spawn(tasks::control::control_task(welder)));
    unwrap!(spawner.spawn(storage::flash_flush_task(flash)));

    info!("Tasks started");
}
