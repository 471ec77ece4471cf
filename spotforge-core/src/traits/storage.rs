//! Persistent settings storage abstractions
//!
//! Provides a synchronous key-value trait for the configuration values the
//! welder persists across power cycles. Backends handle wear leveling and
//! data integrity; the core treats persistence as best-effort and keeps
//! working from in-memory defaults when a backend fails.

/// Storage keys for persisted configuration data
///
/// Tuned durations are stored per material thickness. The thickness is
/// quantized to hundredths of a millimetre before key formation so the key
/// never depends on float formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsKey {
    /// Selected preset id (1..=99)
    PresetId,
    /// ADC offsets and scale factors
    Calibration,
    /// Guard thresholds and enable flags
    GuardConfig,
    /// Operating mode (preset / adaptive)
    OperatingMode,
    /// Weld pattern (single / double)
    WeldPattern,
    /// Inter-pulse gap duration in ms
    GapMs,
    /// Tuned pre/main durations for one material thickness
    TunedDurations {
        /// Thickness in hundredths of a millimetre (0.10 mm = 10)
        thickness_x100: u16,
    },
}

const TAG_PRESET_ID: u8 = 0;
const TAG_CALIBRATION: u8 = 1;
const TAG_GUARD_CONFIG: u8 = 2;
const TAG_OPERATING_MODE: u8 = 3;
const TAG_WELD_PATTERN: u8 = 4;
const TAG_GAP_MS: u8 = 5;
const TAG_TUNED_DURATIONS: u8 = 6;

impl SettingsKey {
    /// Encoded length of this key in bytes
    pub const fn encoded_len(&self) -> usize {
        match self {
            SettingsKey::TunedDurations { .. } => 3,
            _ => 1,
        }
    }

    /// Encode the key into a buffer, returning the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Option<usize> {
        if buffer.len() < self.encoded_len() {
            return None;
        }
        match *self {
            SettingsKey::PresetId => buffer[0] = TAG_PRESET_ID,
            SettingsKey::Calibration => buffer[0] = TAG_CALIBRATION,
            SettingsKey::GuardConfig => buffer[0] = TAG_GUARD_CONFIG,
            SettingsKey::OperatingMode => buffer[0] = TAG_OPERATING_MODE,
            SettingsKey::WeldPattern => buffer[0] = TAG_WELD_PATTERN,
            SettingsKey::GapMs => buffer[0] = TAG_GAP_MS,
            SettingsKey::TunedDurations { thickness_x100 } => {
                buffer[0] = TAG_TUNED_DURATIONS;
                buffer[1..3].copy_from_slice(&thickness_x100.to_le_bytes());
            }
        }
        Some(self.encoded_len())
    }

    /// Decode a key from a buffer, returning the key and bytes consumed
    pub fn decode(buffer: &[u8]) -> Option<(Self, usize)> {
        match *buffer.first()? {
            TAG_PRESET_ID => Some((SettingsKey::PresetId, 1)),
            TAG_CALIBRATION => Some((SettingsKey::Calibration, 1)),
            TAG_GUARD_CONFIG => Some((SettingsKey::GuardConfig, 1)),
            TAG_OPERATING_MODE => Some((SettingsKey::OperatingMode, 1)),
            TAG_WELD_PATTERN => Some((SettingsKey::WeldPattern, 1)),
            TAG_GAP_MS => Some((SettingsKey::GapMs, 1)),
            TAG_TUNED_DURATIONS => {
                if buffer.len() < 3 {
                    return None;
                }
                let thickness_x100 = u16::from_le_bytes([buffer[1], buffer[2]]);
                Some((SettingsKey::TunedDurations { thickness_x100 }, 3))
            }
            _ => None,
        }
    }
}

/// Errors from settings storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Key not found
    NotFound,
    /// Buffer too small for the stored value
    BufferTooSmall,
    /// Backend read/write failed
    Backend,
}

/// Synchronous key-value settings store
///
/// The control loop never suspends, so the store interface is synchronous;
/// flash-backed implementations buffer writes and flush them outside the
/// loop. Load failures are recoverable: callers fall back to defaults.
pub trait SettingsStore {
    /// Read a value by key into the provided buffer
    ///
    /// Returns the number of bytes read.
    fn load(&mut self, key: SettingsKey, buffer: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value by key
    fn save(&mut self, key: SettingsKey, data: &[u8]) -> Result<(), StorageError>;

    /// Check if a key exists in storage
    fn exists(&mut self, key: SettingsKey) -> bool {
        let mut buf = [0u8; 64];
        self.load(key, &mut buf).is_ok()
    }
}

// Implement the sequential-storage Key trait when the feature is enabled
#[cfg(feature = "sequential-storage")]
impl sequential_storage::map::Key for SettingsKey {
    fn serialize_into(
        &self,
        buffer: &mut [u8],
    ) -> Result<usize, sequential_storage::map::SerializationError> {
        self.encode(buffer)
            .ok_or(sequential_storage::map::SerializationError::BufferTooSmall)
    }

    fn deserialize_from(
        buffer: &[u8],
    ) -> Result<(Self, usize), sequential_storage::map::SerializationError> {
        SettingsKey::decode(buffer)
            .ok_or(sequential_storage::map::SerializationError::InvalidFormat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_key_roundtrip() {
        let keys = [
            SettingsKey::PresetId,
            SettingsKey::Calibration,
            SettingsKey::GuardConfig,
            SettingsKey::OperatingMode,
            SettingsKey::WeldPattern,
            SettingsKey::GapMs,
        ];
        for key in keys {
            let mut buf = [0u8; 4];
            let n = key.encode(&mut buf).unwrap();
            assert_eq!(n, 1);
            let (decoded, consumed) = SettingsKey::decode(&buf[..n]).unwrap();
            assert_eq!(decoded, key);
            assert_eq!(consumed, n);
        }
    }

    #[test]
    fn test_tuned_key_carries_thickness() {
        let key = SettingsKey::TunedDurations { thickness_x100: 10 };
        let mut buf = [0u8; 4];
        let n = key.encode(&mut buf).unwrap();
        assert_eq!(n, 3);
        let (decoded, consumed) = SettingsKey::decode(&buf[..n]).unwrap();
        assert_eq!(decoded, key);
        assert_eq!(consumed, 3);
    }

    #[test]
    fn test_decode_rejects_unknown_tag() {
        assert!(SettingsKey::decode(&[0xFF]).is_none());
        assert!(SettingsKey::decode(&[]).is_none());
    }

    #[test]
    fn test_decode_rejects_truncated_tuned_key() {
        assert!(SettingsKey::decode(&[6, 10]).is_none());
    }

    #[test]
    fn test_distinct_thickness_distinct_keys() {
        let mut a = [0u8; 4];
        let mut b = [0u8; 4];
        SettingsKey::TunedDurations { thickness_x100: 10 }
            .encode(&mut a)
            .unwrap();
        SettingsKey::TunedDurations { thickness_x100: 15 }
            .encode(&mut b)
            .unwrap();
        assert_ne!(a, b);
    }
}
