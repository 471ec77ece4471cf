//! Adaptive tuning session
//!
//! One session runs up to `max_trials` weld cycles for a single strip
//! thickness. Trial 1 establishes a reference current and an energy-proxy
//! acceptance band; every later trial nudges the tuned durations toward
//! the band. The session ends on the first Good rating or when the trial
//! budget is exhausted, and persists its result keyed by thickness.

use libm::roundf;

use super::baseline::{baseline_main_ms, baseline_pre_ms};
use super::Rating;
use crate::config::{TunedDurations, TunerConfig};
use crate::history::HistoryEntry;
use crate::traits::storage::{SettingsKey, SettingsStore};

/// Result of processing one completed trial
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrialOutcome {
    /// Rating assigned to the trial
    pub rating: Rating,
    /// True when this trial ended the session
    pub finished: bool,
    /// History record for the trial (durations as welded, pre-adjustment)
    pub entry: HistoryEntry,
}

/// Adaptive duration tuner
///
/// The main-pulse average current is approximated by the most recent
/// sensing window's RMS reading; this mirrors the source measurement
/// chain and is intentionally not an average over the pulse interval.
#[derive(Debug, Clone)]
pub struct SmartTuner {
    config: TunerConfig,
    running: bool,
    thickness_x100: u16,
    /// Completed trials this session
    trial: u8,
    baseline_pre_ms: u16,
    baseline_main_ms: u16,
    tuned_pre_ms: u16,
    tuned_main_ms: u16,
    /// Current measured on trial 1 (A)
    reference_current_a: f32,
    /// Expected energy proxy at baseline durations (A·ms)
    energy_baseline: f32,
    energy_low: f32,
    energy_high: f32,
    last_rating: Rating,
    last_energy_est: f32,
}

impl SmartTuner {
    /// Create an idle tuner
    pub fn new(config: TunerConfig) -> Self {
        Self {
            config,
            running: false,
            thickness_x100: 0,
            trial: 0,
            baseline_pre_ms: 0,
            baseline_main_ms: 0,
            tuned_pre_ms: 0,
            tuned_main_ms: 0,
            reference_current_a: 0.0,
            energy_baseline: 0.0,
            energy_low: 0.0,
            energy_high: 0.0,
            last_rating: Rating::Unrated,
            last_energy_est: 0.0,
        }
    }

    /// True while a session is in progress
    pub fn running(&self) -> bool {
        self.running
    }

    /// Session target thickness (hundredths of a millimetre)
    pub fn thickness_x100(&self) -> u16 {
        self.thickness_x100
    }

    /// Completed trials this session
    pub fn trial(&self) -> u8 {
        self.trial
    }

    /// Configured trial budget
    pub fn max_trials(&self) -> u8 {
        self.config.max_trials
    }

    /// Current tuned durations
    pub fn tuned(&self) -> TunedDurations {
        TunedDurations {
            pre_ms: self.tuned_pre_ms,
            main_ms: self.tuned_main_ms,
        }
    }

    /// Rating of the most recent trial
    pub fn last_rating(&self) -> Rating {
        self.last_rating
    }

    /// Energy proxy estimated for the most recent trial (A·ms)
    pub fn last_energy_est(&self) -> f32 {
        self.last_energy_est
    }

    /// Acceptance band, valid after the first trial: (low, baseline, high)
    pub fn energy_band(&self) -> (f32, f32, f32) {
        (self.energy_low, self.energy_baseline, self.energy_high)
    }

    /// Start (or restart) a session for a quantized thickness
    ///
    /// Seeds durations from the persisted record for this thickness when
    /// one exists, falling back to the baseline step functions.
    pub fn start<P: SettingsStore>(&mut self, thickness_x100: u16, store: &mut P) {
        self.running = true;
        self.thickness_x100 = thickness_x100;
        self.trial = 0;
        self.baseline_pre_ms = baseline_pre_ms(thickness_x100);
        self.baseline_main_ms = baseline_main_ms(thickness_x100);
        let saved = load_tuned(store, thickness_x100);
        let seed = saved.unwrap_or(TunedDurations {
            pre_ms: self.baseline_pre_ms,
            main_ms: self.baseline_main_ms,
        });
        self.tuned_pre_ms = self.config.limits.clamp_pre(seed.pre_ms);
        self.tuned_main_ms = self.config.limits.clamp_main(seed.main_ms);
        self.reference_current_a = 0.0;
        self.energy_baseline = 0.0;
        self.energy_low = 0.0;
        self.energy_high = 0.0;
        self.last_rating = Rating::Unrated;
        self.last_energy_est = 0.0;
    }

    /// Stop the session between trials, persisting the current durations
    pub fn stop<P: SettingsStore>(&mut self, store: &mut P) {
        if self.running {
            self.running = false;
            self.persist(store);
        }
    }

    /// Persist the current tuned durations for the session thickness
    ///
    /// Used by the explicit apply command; also called on termination.
    pub fn persist<P: SettingsStore>(&mut self, store: &mut P) {
        let mut buf = [0u8; 16];
        if let Ok(used) = postcard::to_slice(&self.tuned(), &mut buf) {
            // Best effort: storage failure leaves the in-memory values
            // governing behavior.
            let _ = store.save(
                SettingsKey::TunedDurations {
                    thickness_x100: self.thickness_x100,
                },
                used,
            );
        }
    }

    /// Process a completed weld cycle while the session runs
    ///
    /// `irms_a` is the most recent window's RMS current; `aborted` marks a
    /// guard-aborted cycle. Returns `None` when no session is running.
    pub fn process_trial<P: SettingsStore>(
        &mut self,
        irms_a: f32,
        aborted: bool,
        at_ms: u32,
        store: &mut P,
    ) -> Option<TrialOutcome> {
        if !self.running {
            return None;
        }
        self.trial += 1;

        if self.trial == 1 {
            self.reference_current_a = irms_a;
            self.energy_baseline =
                irms_a * f32::from(self.baseline_pre_ms + self.baseline_main_ms);
            self.energy_low = self.config.band_low * self.energy_baseline;
            self.energy_high = self.config.band_high * self.energy_baseline;
        }

        // Durations as welded, before any adjustment; these go into the
        // history record.
        let trial_pre_ms = self.tuned_pre_ms;
        let trial_main_ms = self.tuned_main_ms;

        let energy_est = irms_a * f32::from(trial_pre_ms + trial_main_ms);
        self.last_energy_est = energy_est;

        // Policy order matters: abort/overheat first, underheat second,
        // fine adjustment last.
        let rating = if aborted || energy_est > self.energy_high {
            self.tuned_main_ms = scaled(trial_main_ms, self.config.overheat_main_factor);
            Rating::BadHot
        } else if energy_est < self.energy_low {
            self.tuned_main_ms = scaled(trial_main_ms, self.config.underheat_main_factor);
            self.tuned_pre_ms = scaled(trial_pre_ms, self.config.underheat_pre_factor);
            Rating::Bad
        } else {
            let factor = if energy_est < self.energy_baseline {
                1.0 + self.config.fine_step
            } else {
                1.0 - self.config.fine_step
            };
            self.tuned_main_ms = scaled(trial_main_ms, factor);
            Rating::Good
        };
        self.tuned_pre_ms = self.config.limits.clamp_pre(self.tuned_pre_ms);
        self.tuned_main_ms = self.config.limits.clamp_main(self.tuned_main_ms);
        self.last_rating = rating;

        let finished = rating == Rating::Good || self.trial >= self.config.max_trials;
        if finished {
            self.running = false;
            self.persist(store);
        }

        Some(TrialOutcome {
            rating,
            finished,
            entry: HistoryEntry {
                at_ms,
                thickness_x100: self.thickness_x100,
                pre_ms: trial_pre_ms,
                main_ms: trial_main_ms,
                energy_est,
                irms_a,
                rating,
            },
        })
    }
}

/// Apply a multiplicative adjustment to a duration, rounded to whole ms
fn scaled(ms: u16, factor: f32) -> u16 {
    let adjusted = roundf(f32::from(ms) * factor);
    if adjusted <= 0.0 {
        0
    } else if adjusted >= f32::from(u16::MAX) {
        u16::MAX
    } else {
        adjusted as u16
    }
}

/// Load the persisted tuned durations for a thickness, if any
pub fn load_tuned<P: SettingsStore>(store: &mut P, thickness_x100: u16) -> Option<TunedDurations> {
    let mut buf = [0u8; 16];
    let n = store
        .load(SettingsKey::TunedDurations { thickness_x100 }, &mut buf)
        .ok()?;
    postcard::from_bytes(&buf[..n]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::storage::StorageError;
    use proptest::prelude::*;

    /// In-memory settings store
    #[derive(Default)]
    struct MemStore {
        entries: heapless::Vec<(SettingsKey, heapless::Vec<u8, 32>), 16>,
    }

    impl SettingsStore for MemStore {
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
            let mut value = heapless::Vec::new();
            value
                .extend_from_slice(data)
                .map_err(|_| StorageError::Backend)?;
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

    fn tuner() -> SmartTuner {
        SmartTuner::new(TunerConfig::default())
    }

    #[test]
    fn test_start_seeds_from_baseline() {
        let mut t = tuner();
        let mut store = MemStore::default();
        t.start(10, &mut store);
        assert!(t.running());
        assert_eq!(t.tuned().pre_ms, 25);
        assert_eq!(t.tuned().main_ms, 80);
        assert_eq!(t.trial(), 0);
        assert_eq!(t.last_rating(), Rating::Unrated);
    }

    #[test]
    fn test_first_trial_fixes_reference_and_band() {
        // 10 A at baseline 25+80 ms: E_base 1050, band [945, 1155]
        let mut t = tuner();
        let mut store = MemStore::default();
        t.start(10, &mut store);
        let outcome = t.process_trial(10.0, false, 0, &mut store).unwrap();
        let (low, base, high) = t.energy_band();
        assert!((base - 1050.0).abs() < 1e-3);
        assert!((low - 945.0).abs() < 1e-3);
        assert!((high - 1155.0).abs() < 1e-3);
        // 1050 sits inside the band: rated Good and done
        assert_eq!(outcome.rating, Rating::Good);
        assert!(outcome.finished);
        assert!(!t.running());
    }

    #[test]
    fn test_good_at_center_fine_adjusts_down() {
        let mut t = tuner();
        let mut store = MemStore::default();
        t.start(10, &mut store);
        t.process_trial(10.0, false, 0, &mut store).unwrap();
        // est == center: decrease main by the fine step (80 -> 78)
        assert_eq!(t.tuned().main_ms, 78);
        assert_eq!(t.tuned().pre_ms, 25);
    }

    #[test]
    fn test_overheat_reduces_main() {
        let mut t = tuner();
        let mut store = MemStore::default();
        t.start(10, &mut store);
        // Trial 1 aborted: fixes the 10 A reference without rating Good
        t.process_trial(10.0, true, 0, &mut store).unwrap();
        let main_before = t.tuned().main_ms;
        // Twice the reference current lands the estimate over the band
        let out = t.process_trial(20.0, false, 1000, &mut store).unwrap();
        assert_eq!(out.rating, Rating::BadHot);
        assert!(t.tuned().main_ms < main_before);
    }

    #[test]
    fn test_aborted_cycle_rates_bad_hot() {
        let mut t = tuner();
        let mut store = MemStore::default();
        t.start(10, &mut store);
        let out = t.process_trial(10.0, true, 0, &mut store).unwrap();
        assert_eq!(out.rating, Rating::BadHot);
        // Overheat correction: main shrinks even though energy was at center
        assert_eq!(t.tuned().main_ms, 68);
    }

    #[test]
    fn test_underheat_raises_both_durations() {
        let mut t = tuner();
        let mut store = MemStore::default();
        t.start(10, &mut store);
        // Trial 1 aborted: fixes the 10 A reference without rating Good
        t.process_trial(10.0, true, 0, &mut store).unwrap();
        let before = t.tuned();
        // Current collapses: estimate below the band
        let out = t.process_trial(5.0, false, 1000, &mut store).unwrap();
        assert_eq!(out.rating, Rating::Bad);
        assert!(t.tuned().main_ms > before.main_ms);
        assert!(t.tuned().pre_ms > before.pre_ms);
    }

    #[test]
    fn test_session_stops_at_max_trials() {
        let mut t = SmartTuner::new(TunerConfig {
            max_trials: 4,
            ..TunerConfig::default()
        });
        let mut store = MemStore::default();
        t.start(10, &mut store);
        // Trial 1 aborted, trials 2..4 underheat: no Good rating ever
        let out = t.process_trial(10.0, true, 0, &mut store).unwrap();
        assert_eq!(out.rating, Rating::BadHot);
        assert!(!out.finished);
        for i in 1..4u8 {
            let out = t.process_trial(4.0, false, 0, &mut store).unwrap();
            assert_eq!(out.rating, Rating::Bad);
            assert_eq!(out.finished, i == 3);
        }
        assert!(!t.running());
        // Trial 5 never starts
        assert!(t.process_trial(4.0, false, 0, &mut store).is_none());
        assert_eq!(t.trial(), 4);
    }

    #[test]
    fn test_termination_persists_for_thickness() {
        let mut t = tuner();
        let mut store = MemStore::default();
        t.start(10, &mut store);
        t.process_trial(10.0, false, 0, &mut store).unwrap();
        let tuned = t.tuned();
        assert_eq!(load_tuned(&mut store, 10), Some(tuned));
        // A fresh session re-seeds from the stored record
        t.start(10, &mut store);
        assert_eq!(t.tuned(), tuned);
    }

    #[test]
    fn test_stop_between_trials_persists() {
        let mut t = tuner();
        let mut store = MemStore::default();
        t.start(12, &mut store);
        t.stop(&mut store);
        assert!(!t.running());
        assert!(load_tuned(&mut store, 12).is_some());
    }

    #[test]
    fn test_every_trial_appends_history_record() {
        let mut t = tuner();
        let mut store = MemStore::default();
        t.start(10, &mut store);
        let out = t.process_trial(10.0, false, 77, &mut store).unwrap();
        assert_eq!(out.entry.at_ms, 77);
        assert_eq!(out.entry.thickness_x100, 10);
        // Entry carries the durations as welded, not the adjusted ones
        assert_eq!(out.entry.pre_ms, 25);
        assert_eq!(out.entry.main_ms, 80);
        assert!((out.entry.energy_est - 1050.0).abs() < 1e-3);
    }

    proptest! {
        /// Tuned durations stay inside the clamp bounds for any trial
        /// sequence and any rating outcome.
        #[test]
        fn prop_durations_stay_clamped(
            currents in proptest::collection::vec(0.0f32..60.0, 1..12),
            aborts in proptest::collection::vec(any::<bool>(), 12),
        ) {
            let config = TunerConfig::default();
            let mut t = SmartTuner::new(TunerConfig { max_trials: 12, ..config });
            let mut store = MemStore::default();
            t.start(10, &mut store);
            for (i, irms) in currents.iter().enumerate() {
                if t.process_trial(*irms, aborts[i], 0, &mut store).is_none() {
                    break;
                }
                let tuned = t.tuned();
                prop_assert!(tuned.pre_ms >= config.limits.pre_min_ms);
                prop_assert!(tuned.pre_ms <= config.limits.pre_max_ms);
                prop_assert!(tuned.main_ms >= config.limits.main_min_ms);
                prop_assert!(tuned.main_ms <= config.limits.main_max_ms);
            }
        }
    }
}
