//! Flash-backed settings storage
//!
//! The core's settings store is synchronous (the control loop never
//! suspends), while RP2040 flash access is async. The split: a RAM cache
//! implements `SettingsStore` for the control loop, saves are queued, and
//! a dedicated task flushes them to a wear-leveled sequential-storage map
//! in the last 64KB of flash.

use defmt::*;
use embassy_rp::dma::Channel as DmaChannel;
use embassy_rp::flash::{Async, Flash};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

use spotforge_core::traits::storage::{SettingsKey, SettingsStore, StorageError};
use spotforge_core::tuning::SUPPORTED_THICKNESS_X100;

use crate::channels::{SaveRecord, MAX_SETTING_LEN, SAVE_QUEUE};

/// Flash storage configuration
pub const FLASH_SIZE: usize = 2 * 1024 * 1024; // 2MB flash
pub const CONFIG_PARTITION_SIZE: usize = 64 * 1024; // 64KB for settings
pub const CONFIG_PARTITION_START: usize = FLASH_SIZE - CONFIG_PARTITION_SIZE;

/// Flash range for the settings partition
pub const CONFIG_RANGE: core::ops::Range<u32> =
    (CONFIG_PARTITION_START as u32)..(FLASH_SIZE as u32);

/// Flash peripheral wrapper used for the settings partition
pub type ConfigFlash = Flash<'static, FLASH, Async, FLASH_SIZE>;

/// Create the settings flash instance
pub fn config_flash(flash: Peri<'static, FLASH>, dma: Peri<'static, impl DmaChannel>) -> ConfigFlash {
    Flash::new(flash, dma)
}

/// Cached entry slots: the fixed keys plus one tuned record per thickness
const MAX_ENTRIES: usize = 6 + SUPPORTED_THICKNESS_X100.len();

/// RAM settings cache backing the synchronous `SettingsStore`
///
/// Loads are served from RAM; saves update RAM and enqueue a flash write.
/// A full save queue drops the flash write but keeps the RAM update, so
/// behavior stays governed by the latest values.
pub struct CachedSettings {
    entries: heapless::Vec<(SettingsKey, heapless::Vec<u8, MAX_SETTING_LEN>), MAX_ENTRIES>,
}

impl CachedSettings {
    /// Create an empty cache
    pub const fn new() -> Self {
        Self {
            entries: heapless::Vec::new(),
        }
    }

    /// Populate the cache from flash at boot
    pub async fn load_all(&mut self, flash: &mut ConfigFlash) {
        let mut keys: heapless::Vec<SettingsKey, MAX_ENTRIES> = heapless::Vec::new();
        for key in [
            SettingsKey::PresetId,
            SettingsKey::Calibration,
            SettingsKey::GuardConfig,
            SettingsKey::OperatingMode,
            SettingsKey::WeldPattern,
            SettingsKey::GapMs,
        ] {
            let _ = keys.push(key);
        }
        for thickness_x100 in SUPPORTED_THICKNESS_X100 {
            let _ = keys.push(SettingsKey::TunedDurations { thickness_x100 });
        }

        let mut data_buffer = [0u8; 128];
        for key in keys {
            let fetched = map::fetch_item::<SettingsKey, &[u8], _>(
                flash,
                CONFIG_RANGE,
                &mut NoCache::new(),
                &mut data_buffer,
                &key,
            )
            .await;
            match fetched {
                Ok(Some(data)) => {
                    if self.insert(key, data).is_err() {
                        warn!("settings cache full, dropping entry");
                    }
                }
                Ok(None) => {}
                Err(_) => warn!("settings read failed"),
            }
        }
    }

    fn insert(&mut self, key: SettingsKey, data: &[u8]) -> Result<(), StorageError> {
        let mut value = heapless::Vec::new();
        value
            .extend_from_slice(data)
            .map_err(|_| StorageError::BufferTooSmall)?;
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries
                .push((key, value))
                .map_err(|_| StorageError::Backend)?;
        }
        Ok(())
    }
}

impl SettingsStore for CachedSettings {
    fn load(&mut self, key: SettingsKey, buffer: &mut [u8]) -> Result<usize, StorageError> {
        let (_, data) = self
            .entries
            .iter()
            .find(|(k, _)| *k == key)
            .ok_or(StorageError::NotFound)?;
        if buffer.len() < data.len() {
            return Err(StorageError::BufferTooSmall);
        }
        buffer[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    fn save(&mut self, key: SettingsKey, data: &[u8]) -> Result<(), StorageError> {
        self.insert(key, data)?;
        let mut value = heapless::Vec::new();
        value
            .extend_from_slice(data)
            .map_err(|_| StorageError::BufferTooSmall)?;
        if SAVE_QUEUE.try_send(SaveRecord { key, data: value }).is_err() {
            warn!("save queue full, flash write dropped");
        }
        Ok(())
    }
}

/// Flash flush task: drains queued settings writes
#[embassy_executor::task]
pub async fn flash_flush_task(mut flash: ConfigFlash) {
    info!("Flash flush task started");

    let mut data_buffer = [0u8; 128];
    loop {
        let record = SAVE_QUEUE.receive().await;
        let result = map::store_item(
            &mut flash,
            CONFIG_RANGE,
            &mut NoCache::new(),
            &mut data_buffer,
            &record.key,
            &record.data.as_slice(),
        )
        .await;
        if result.is_err() {
            warn!("settings flush failed");
        }
    }
}
