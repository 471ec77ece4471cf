//! Preset duration table
//!
//! Presets 1..=99 map deterministically to pulse durations: ids are split
//! into ten groups of ten (the last group has nine), each group labelled
//! with the nickel-strip thickness it targets. Durations grow with the
//! group level and step finer within a group. This is a pure function of
//! the id; presets carry no mutable state.

/// Number of selectable presets
pub const PRESET_COUNT: u8 = 99;

/// Group labels, one per duration level
const GROUP_LABELS: [&str; 10] = [
    "0.05mm", "0.10mm", "0.15mm", "0.20mm", "0.25mm", "0.30mm", "0.35mm", "0.40mm", "0.45mm",
    "0.50mm",
];

/// Pre-pulse base per level (ms)
const PRE_BASE_MS: u16 = 4;
/// Main-pulse base per level (ms)
const MAIN_BASE_MS: u16 = 28;
/// Main-pulse fine step within a group (ms)
const MAIN_STEP_MS: u16 = 6;

/// A resolved preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Preset {
    /// Preset id (1..=99)
    pub id: u8,
    /// Strip-thickness group label
    pub label: &'static str,
    /// Pre-heat pulse duration (ms)
    pub pre_ms: u16,
    /// Main pulse duration (ms)
    pub main_ms: u16,
}

/// Resolve a preset id to its durations
///
/// Returns `None` for ids outside 1..=99.
pub fn preset(id: u8) -> Option<Preset> {
    if id == 0 || id > PRESET_COUNT {
        return None;
    }
    let group = u16::from((id - 1) / 10);
    let sub = u16::from((id - 1) % 10);
    Some(Preset {
        id,
        label: GROUP_LABELS[group as usize],
        pre_ms: PRE_BASE_MS * (group + 1) + sub,
        main_ms: MAIN_BASE_MS * (group + 1) + MAIN_STEP_MS * sub,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_bounds() {
        assert!(preset(0).is_none());
        assert!(preset(100).is_none());
        assert!(preset(1).is_some());
        assert!(preset(99).is_some());
    }

    #[test]
    fn test_deterministic() {
        for id in 1..=PRESET_COUNT {
            assert_eq!(preset(id), preset(id));
        }
    }

    #[test]
    fn test_group_labels() {
        assert_eq!(preset(1).unwrap().label, "0.05mm");
        assert_eq!(preset(10).unwrap().label, "0.05mm");
        assert_eq!(preset(11).unwrap().label, "0.10mm");
        assert_eq!(preset(99).unwrap().label, "0.50mm");
    }

    #[test]
    fn test_durations_grow_with_group() {
        // First id of each group: strictly increasing energy
        let mut prev = preset(1).unwrap();
        for group in 1..10u8 {
            let p = preset(group * 10 + 1).unwrap();
            assert!(p.pre_ms > prev.pre_ms);
            assert!(p.main_ms > prev.main_ms);
            prev = p;
        }
    }

    #[test]
    fn test_fine_step_within_group() {
        let a = preset(11).unwrap();
        let b = preset(12).unwrap();
        assert_eq!(b.main_ms, a.main_ms + MAIN_STEP_MS);
        assert_eq!(b.pre_ms, a.pre_ms + 1);
    }
}
