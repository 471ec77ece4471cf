//! Baseline duration derivation from strip thickness
//!
//! Two monotonic step functions seed a tuning session before any trial has
//! run. Thickness is carried as hundredths of a millimetre everywhere so
//! persistence keys and lookups never depend on float formatting.

use libm::roundf;

/// Strip thicknesses the tuner accepts, in hundredths of a millimetre
pub const SUPPORTED_THICKNESS_X100: [u16; 8] = [5, 8, 10, 12, 15, 20, 25, 30];

/// Baseline pre-heat duration cap (ms)
const PRE_CAP_MS: u16 = 60;

/// Baseline main-pulse duration cap (ms)
const MAIN_CAP_MS: u16 = 300;

/// Quantize a thickness in millimetres to hundredths
pub fn quantize_thickness(thickness_mm: f32) -> u16 {
    let q = roundf(thickness_mm * 100.0);
    if q <= 0.0 {
        0
    } else {
        q as u16
    }
}

/// Whether a quantized thickness is in the supported table
pub fn thickness_supported(thickness_x100: u16) -> bool {
    SUPPORTED_THICKNESS_X100.contains(&thickness_x100)
}

/// Baseline pre-heat duration: linear in thickness, capped
///
/// 2.5 ms per hundredth of a millimetre (0.10 mm -> 25 ms).
pub fn baseline_pre_ms(thickness_x100: u16) -> u16 {
    let ms = (u32::from(thickness_x100) * 250 + 50) / 100;
    (ms as u16).min(PRE_CAP_MS)
}

/// Baseline main-pulse duration: thickness times a stepped rate, capped
///
/// Thicker strips need disproportionally more energy, so the per-mm rate
/// steps up with thickness (0.10 mm -> 80 ms).
pub fn baseline_main_ms(thickness_x100: u16) -> u16 {
    let rate_ms_per_mm: u32 = match thickness_x100 {
        0..=11 => 800,
        12..=19 => 900,
        20..=27 => 1000,
        _ => 1100,
    };
    let ms = u32::from(thickness_x100) * rate_ms_per_mm / 100;
    (ms as u16).min(MAIN_CAP_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_thickness_010mm() {
        // 0.10 mm: pre 25 ms, main 80 ms
        assert_eq!(baseline_pre_ms(10), 25);
        assert_eq!(baseline_main_ms(10), 80);
    }

    #[test]
    fn test_quantize() {
        assert_eq!(quantize_thickness(0.10), 10);
        assert_eq!(quantize_thickness(0.05), 5);
        assert_eq!(quantize_thickness(0.104), 10);
        assert_eq!(quantize_thickness(0.30), 30);
        assert_eq!(quantize_thickness(-1.0), 0);
    }

    #[test]
    fn test_supported_table() {
        assert!(thickness_supported(10));
        assert!(!thickness_supported(11));
        assert!(!thickness_supported(0));
    }

    #[test]
    fn test_monotonic_over_supported_range() {
        let mut prev_pre = 0;
        let mut prev_main = 0;
        for t in SUPPORTED_THICKNESS_X100 {
            let pre = baseline_pre_ms(t);
            let main = baseline_main_ms(t);
            assert!(pre >= prev_pre, "pre not monotonic at {t}");
            assert!(main >= prev_main, "main not monotonic at {t}");
            prev_pre = pre;
            prev_main = main;
        }
    }

    #[test]
    fn test_caps_apply() {
        assert_eq!(baseline_pre_ms(1000), 60);
        assert_eq!(baseline_main_ms(1000), 300);
    }
}
