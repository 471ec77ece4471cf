//! Inter-task communication channels
//!
//! Static channels connecting the external command surface (HTTP/UI
//! layer), the control loop, and the flash flush task. Uses embassy-sync
//! primitives for safe async communication.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use spotforge_core::traits::storage::SettingsKey;
use spotforge_protocol::{Command, Response};

/// Channel capacity for inbound commands
const COMMAND_CHANNEL_SIZE: usize = 8;

/// Channel capacity for responses (responses can be large; keep it small)
const RESPONSE_CHANNEL_SIZE: usize = 2;

/// Queue capacity for pending settings writes
const SAVE_QUEUE_SIZE: usize = 8;

/// Largest serialized settings value
pub const MAX_SETTING_LEN: usize = 48;

/// Commands from the external command surface into the control loop
pub static COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, Command, COMMAND_CHANNEL_SIZE> =
    Channel::new();

/// Responses from the control loop back to the command surface
pub static RESPONSE_CHANNEL: Channel<CriticalSectionRawMutex, Response, RESPONSE_CHANNEL_SIZE> =
    Channel::new();

/// A settings record waiting to be flushed to flash
#[derive(Debug, Clone)]
pub struct SaveRecord {
    pub key: SettingsKey,
    pub data: heapless::Vec<u8, MAX_SETTING_LEN>,
}

/// Pending settings writes, drained by the flash flush task
pub static SAVE_QUEUE: Channel<CriticalSectionRawMutex, SaveRecord, SAVE_QUEUE_SIZE> =
    Channel::new();
