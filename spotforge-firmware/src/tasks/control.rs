//! Control loop task
//!
//! One cooperative loop services, in order: inbound commands (each handled
//! to completion), the sensor sampler, and the pulse state machine. The
//! 5 ms tick keeps pulse timing resolution far below the 250 ms sensing
//! window. Nothing here suspends mid-step; the only await is the tick.

use defmt::*;
use embassy_time::{Duration, Instant, Ticker};

use crate::channels::{COMMAND_CHANNEL, RESPONSE_CHANNEL};
use crate::dispatch;
use crate::BoardWelder;

/// Control tick interval in milliseconds
pub const CONTROL_TICK_MS: u32 = 5;

/// Control loop task
#[embassy_executor::task]
pub async fn control_task(mut welder: BoardWelder) {
    info!("Control task started");

    let mut ticker = Ticker::every(Duration::from_millis(CONTROL_TICK_MS as u64));
    let start = Instant::now();

    loop {
        ticker.next().await;
        let now_ms = start.elapsed().as_millis() as u32;

        while let Ok(command) = COMMAND_CHANNEL.try_receive() {
            let response = dispatch::handle(&mut welder, command, now_ms);
            if RESPONSE_CHANNEL.try_send(response).is_err() {
                warn!("response dropped, channel full");
            }
        }

        welder.service(now_ms);
    }
}
