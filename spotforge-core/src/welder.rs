//! Welder controller
//!
//! The central context owning every subsystem and the three hardware
//! collaborators (ADC, SSR, settings store). One `service()` call per
//! control-loop iteration advances sampling, guard evaluation and the
//! pulse machine; every command operation is a synchronous method that
//! either mutates state or rejects with no mutation at all.
//!
//! All shared state is accessed from this single control-flow context, so
//! mutation is inherently serialized; there is no locking anywhere.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::presets::{preset, Preset};
use crate::config::{
    CalibrationConfig, GuardConfig, OperatingMode, TunedDurations, TunerConfig, WeldPattern,
    DEFAULT_GAP_MS,
};
use crate::guard::GuardEvaluator;
use crate::history::HistoryRing;
use crate::sense::{
    CalibrationError, RmsReading, SenseChannel, SensorSampler, DEFAULT_WINDOW_MS,
};
use crate::traits::adc::AnalogInputs;
use crate::traits::ssr::SsrOutput;
use crate::traits::storage::{SettingsKey, SettingsStore};
use crate::tuning::session::load_tuned;
use crate::tuning::{quantize_thickness, thickness_supported, SmartTuner, SUPPORTED_THICKNESS_X100};
use crate::weld::{
    AbortReason, EventKind, EventLog, PulseMachine, PulseTimings, TickOutcome, WeldEvent,
    WeldPhase,
};

/// Errors reported to the command/telemetry layer
///
/// Configuration errors reject synchronously with no state mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Preset id outside 1..=99
    PresetOutOfRange,
    /// Thickness not in the supported table
    ThicknessUnsupported,
    /// A weld cycle is already in progress
    CycleInProgress,
    /// Auto-scale attempted with a near-zero measured signal
    LowSignal,
    /// ADC read failed during a calibration command
    AdcFailed,
}

impl From<CalibrationError> for CommandError {
    fn from(e: CalibrationError) -> Self {
        match e {
            CalibrationError::LowSignal => CommandError::LowSignal,
            CalibrationError::Adc(_) => CommandError::AdcFailed,
        }
    }
}

/// RMS telemetry snapshot
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReadingsSnapshot {
    pub irms_a: f32,
    pub vrms_v: f32,
    /// Samples accumulated since the current window started
    pub samples_in_window: u32,
    pub window_ms: u32,
}

/// Guard / readiness status
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GuardStatus {
    pub stable_windows: u8,
    /// Auto-trigger conditions satisfied right now
    pub ready: bool,
    pub phase: WeldPhase,
    /// Most recent diagnostic event, if any
    pub last_event: Option<WeldEvent>,
}

/// Tuning session status
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TuningStatus {
    pub running: bool,
    pub thickness_x100: u16,
    pub trial: u8,
    pub max_trials: u8,
    pub tuned: TunedDurations,
    pub last_rating: crate::tuning::Rating,
    pub last_energy_est: f32,
    /// (low, baseline, high); zeros before the first trial
    pub energy_band: (f32, f32, f32),
}

/// The welder controller context
pub struct Welder<A, S, P> {
    adc: A,
    ssr: S,
    store: P,
    sampler: SensorSampler,
    guard: GuardEvaluator,
    pulse: PulseMachine,
    tuner: SmartTuner,
    history: HistoryRing,
    events: EventLog,
    mode: OperatingMode,
    pattern: WeldPattern,
    gap_ms: u16,
    preset_id: u8,
    /// Base durations before pattern gating
    active_pre_ms: u16,
    active_main_ms: u16,
    target_thickness_x100: u16,
}

impl<A: AnalogInputs, S: SsrOutput, P: SettingsStore> Welder<A, S, P> {
    /// Create a controller from defaults, then overlay persisted settings
    ///
    /// Persistence is best-effort: anything the store cannot produce keeps
    /// its in-memory default.
    pub fn new(adc: A, ssr: S, store: P, now_ms: u32) -> Self {
        let mut welder = Self {
            adc,
            ssr,
            store,
            sampler: SensorSampler::new(CalibrationConfig::default(), DEFAULT_WINDOW_MS, now_ms),
            guard: GuardEvaluator::new(GuardConfig::default()),
            pulse: PulseMachine::new(PulseTimings::default()),
            tuner: SmartTuner::new(TunerConfig::default()),
            history: HistoryRing::new(),
            events: EventLog::new(),
            mode: OperatingMode::default(),
            pattern: WeldPattern::default(),
            gap_ms: DEFAULT_GAP_MS,
            preset_id: 1,
            active_pre_ms: 0,
            active_main_ms: 0,
            target_thickness_x100: SUPPORTED_THICKNESS_X100[2],
        };
        welder.load_persisted(now_ms);
        welder
    }

    /// One control-loop iteration
    ///
    /// Never blocks: a bounded ADC micro-batch, pure comparisons, and at
    /// most one state transition chain.
    pub fn service(&mut self, now_ms: u32) {
        if self.sampler.sample(&mut self.adc, now_ms) {
            let reading = *self.sampler.reading();
            self.guard.on_window(&reading);
            let idle = self.pulse.phase() == WeldPhase::Idle;
            if self.guard.can_trigger(idle, &reading, now_ms) {
                self.start_cycle(now_ms);
            }
        }

        // Supervise an active cycle every tick, not just on window
        // boundaries: an abort must not wait for the next window.
        if self.pulse.phase().is_active() {
            if let Some(reason) = self.guard.supervise(self.sampler.reading()) {
                self.abort_cycle(reason, now_ms);
            }
        }

        if self.pulse.tick(now_ms) == TickOutcome::Completed {
            self.guard.cycle_finished(now_ms);
            self.events.push(now_ms, EventKind::CycleCompleted);
            self.finish_trial(false, now_ms);
        }

        self.ssr.set_on(self.pulse.ssr_demand());
    }

    // ---- telemetry ----

    /// Current RMS readings
    pub fn readings(&self) -> ReadingsSnapshot {
        let r = self.sampler.reading();
        ReadingsSnapshot {
            irms_a: r.irms_a,
            vrms_v: r.vrms_v,
            samples_in_window: self.sampler.samples_in_window(),
            window_ms: self.sampler.window_ms(),
        }
    }

    /// Guard / readiness status including the most recent log line
    pub fn guard_status(&self, now_ms: u32) -> GuardStatus {
        let idle = self.pulse.phase() == WeldPhase::Idle;
        GuardStatus {
            stable_windows: self.guard.stable_windows(),
            ready: self.guard.can_trigger(idle, self.sampler.reading(), now_ms),
            phase: self.pulse.phase(),
            last_event: self.events.last().copied(),
        }
    }

    /// Current pulse machine phase
    pub fn phase(&self) -> WeldPhase {
        self.pulse.phase()
    }

    /// Durations the pulse machine is configured with
    pub fn timings(&self) -> PulseTimings {
        self.pulse.timings()
    }

    /// Diagnostic event log
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Tuning trial history
    pub fn history(&self) -> &HistoryRing {
        &self.history
    }

    /// Most recent RMS reading (raw struct)
    pub fn reading(&self) -> &RmsReading {
        self.sampler.reading()
    }

    /// Access to the SSR output
    pub fn ssr(&self) -> &S {
        &self.ssr
    }

    // ---- calibration commands ----

    /// Current calibration values
    pub fn calibration(&self) -> &CalibrationConfig {
        self.sampler.calibration()
    }

    /// Zero-calibrate a channel; returns the new offset in counts
    pub fn zero_channel(
        &mut self,
        channel: SenseChannel,
        now_ms: u32,
    ) -> Result<i32, CommandError> {
        let offset = self.sampler.zero(&mut self.adc, channel, now_ms)?;
        self.persist_calibration();
        Ok(offset)
    }

    /// Assign scale factors directly
    pub fn set_scales(&mut self, current: Option<f32>, voltage: Option<f32>) {
        self.sampler.set_scales(current, voltage);
        self.persist_calibration();
    }

    /// Auto-scale a channel to a target physical value; returns the scale
    pub fn auto_scale(&mut self, channel: SenseChannel, target: f32) -> Result<f32, CommandError> {
        let scale = self.sampler.auto_scale(channel, target)?;
        self.persist_calibration();
        Ok(scale)
    }

    // ---- guard configuration ----

    /// Guard configuration
    pub fn guard_config(&self) -> &GuardConfig {
        self.guard.config()
    }

    /// Replace the guard configuration
    pub fn set_guard_config(&mut self, config: GuardConfig) {
        self.guard.set_config(config);
        self.save_record(SettingsKey::GuardConfig, &config);
    }

    // ---- mode / pattern / preset ----

    /// Operating mode
    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Switch operating mode
    pub fn set_mode(&mut self, mode: OperatingMode) {
        self.mode = mode;
        self.save_record(SettingsKey::OperatingMode, &mode);
        match mode {
            OperatingMode::Preset => self.apply_preset_durations(),
            OperatingMode::Adaptive => {
                // Pick up previously tuned durations for the target
                // thickness when available; otherwise keep current ones.
                if let Some(tuned) = load_tuned(&mut self.store, self.target_thickness_x100) {
                    self.active_pre_ms = tuned.pre_ms;
                    self.active_main_ms = tuned.main_ms;
                    self.refresh_timings();
                }
            }
        }
    }

    /// Weld pattern
    pub fn pattern(&self) -> WeldPattern {
        self.pattern
    }

    /// Switch weld pattern
    pub fn set_pattern(&mut self, pattern: WeldPattern) {
        self.pattern = pattern;
        self.save_record(SettingsKey::WeldPattern, &pattern);
        self.refresh_timings();
    }

    /// Inter-pulse gap (ms)
    pub fn gap_ms(&self) -> u16 {
        self.gap_ms
    }

    /// Set the inter-pulse gap
    pub fn set_gap_ms(&mut self, gap_ms: u16) {
        self.gap_ms = gap_ms;
        self.save_record(SettingsKey::GapMs, &gap_ms);
        self.refresh_timings();
    }

    /// Selected preset id
    pub fn preset_id(&self) -> u8 {
        self.preset_id
    }

    /// Resolved preset for the selected id
    pub fn selected_preset(&self) -> Option<Preset> {
        preset(self.preset_id)
    }

    /// Select a preset id (1..=99)
    pub fn select_preset(&mut self, id: u8) -> Result<Preset, CommandError> {
        let p = preset(id).ok_or(CommandError::PresetOutOfRange)?;
        self.preset_id = id;
        self.save_record(SettingsKey::PresetId, &id);
        if self.mode == OperatingMode::Preset {
            self.apply_preset_durations();
        }
        Ok(p)
    }

    // ---- weld control ----

    /// Manually trigger a weld cycle
    ///
    /// Independent of the auto-trigger guard state; rejected only while a
    /// cycle is already in progress.
    pub fn trigger_weld(&mut self, now_ms: u32) -> Result<(), CommandError> {
        if self.pulse.phase().is_active() {
            return Err(CommandError::CycleInProgress);
        }
        self.start_cycle(now_ms);
        Ok(())
    }

    // ---- tuning ----

    /// Thickness options the tuner supports (hundredths of a millimetre)
    pub fn supported_thicknesses(&self) -> &'static [u16] {
        &SUPPORTED_THICKNESS_X100
    }

    /// Target thickness (hundredths of a millimetre)
    pub fn target_thickness_x100(&self) -> u16 {
        self.target_thickness_x100
    }

    /// Set the target thickness in millimetres
    pub fn set_target_thickness_mm(&mut self, thickness_mm: f32) -> Result<u16, CommandError> {
        self.set_target_thickness_x100(quantize_thickness(thickness_mm))
    }

    /// Set the target thickness, pre-quantized to hundredths
    pub fn set_target_thickness_x100(&mut self, thickness_x100: u16) -> Result<u16, CommandError> {
        if !thickness_supported(thickness_x100) {
            return Err(CommandError::ThicknessUnsupported);
        }
        self.target_thickness_x100 = thickness_x100;
        Ok(thickness_x100)
    }

    /// Start a tuning session for the target thickness
    ///
    /// Trial cycles weld with the session's tuned durations, so they are
    /// installed into the pulse machine immediately.
    pub fn tuning_start(&mut self) -> Result<(), CommandError> {
        if !thickness_supported(self.target_thickness_x100) {
            return Err(CommandError::ThicknessUnsupported);
        }
        self.tuner.start(self.target_thickness_x100, &mut self.store);
        self.install_tuned_timings();
        Ok(())
    }

    /// Stop the tuning session between trials
    pub fn tuning_stop(&mut self) {
        self.tuner.stop(&mut self.store);
    }

    /// Persist tuned durations and, in Adaptive mode, make them active
    pub fn tuning_apply(&mut self) {
        self.tuner.persist(&mut self.store);
        if self.mode == OperatingMode::Adaptive {
            self.install_tuned_timings();
        }
    }

    /// Tuning session status
    pub fn tuning_status(&self) -> TuningStatus {
        TuningStatus {
            running: self.tuner.running(),
            thickness_x100: self.tuner.thickness_x100(),
            trial: self.tuner.trial(),
            max_trials: self.tuner.max_trials(),
            tuned: self.tuner.tuned(),
            last_rating: self.tuner.last_rating(),
            last_energy_est: self.tuner.last_energy_est(),
            energy_band: self.tuner.energy_band(),
        }
    }

    // ---- internals ----

    fn start_cycle(&mut self, now_ms: u32) {
        if !self.pulse.start_cycle(now_ms) {
            return;
        }
        self.guard.reset_stability();
        let t = self.pulse.timings();
        self.events.push(
            now_ms,
            EventKind::CycleStarted {
                pre_ms: t.pre_ms,
                gap_ms: t.gap_ms,
                main_ms: t.main_ms,
            },
        );
        self.ssr.set_on(self.pulse.ssr_demand());
    }

    fn abort_cycle(&mut self, reason: AbortReason, now_ms: u32) {
        self.pulse.abort(now_ms);
        self.ssr.set_on(false);
        self.guard.cycle_finished(now_ms);
        self.events.push(now_ms, EventKind::CycleAborted(reason));
        self.finish_trial(true, now_ms);
    }

    fn finish_trial(&mut self, aborted: bool, now_ms: u32) {
        let irms = self.sampler.reading().irms_a;
        if let Some(outcome) = self
            .tuner
            .process_trial(irms, aborted, now_ms, &mut self.store)
        {
            self.history.push(outcome.entry);
            self.events.push(
                now_ms,
                EventKind::TrialRated {
                    trial: self.tuner.trial(),
                    rating: outcome.rating,
                },
            );
            // Next trial (or the post-session state) welds with the
            // adjusted durations
            self.install_tuned_timings();
        }
    }

    fn install_tuned_timings(&mut self) {
        let tuned = self.tuner.tuned();
        self.active_pre_ms = tuned.pre_ms;
        self.active_main_ms = tuned.main_ms;
        self.refresh_timings();
    }

    /// Derive pulse machine timings from pattern + active durations
    fn refresh_timings(&mut self) {
        let pre_ms = match self.pattern {
            WeldPattern::Single => 0,
            WeldPattern::Double => self.active_pre_ms,
        };
        self.pulse.set_timings(PulseTimings {
            pre_ms,
            gap_ms: self.gap_ms,
            main_ms: self.active_main_ms,
        });
    }

    fn apply_preset_durations(&mut self) {
        if let Some(p) = preset(self.preset_id) {
            self.active_pre_ms = p.pre_ms;
            self.active_main_ms = p.main_ms;
        }
        self.refresh_timings();
    }

    fn persist_calibration(&mut self) {
        let cal = *self.sampler.calibration();
        self.save_record(SettingsKey::Calibration, &cal);
    }

    fn save_record<T: Serialize>(&mut self, key: SettingsKey, value: &T) {
        let mut buf = [0u8; 48];
        if let Ok(used) = postcard::to_slice(value, &mut buf) {
            // Best effort; in-memory state keeps governing on failure
            let _ = self.store.save(key, used);
        }
    }

    fn load_record<T: DeserializeOwned>(&mut self, key: SettingsKey) -> Option<T> {
        let mut buf = [0u8; 48];
        let n = self.store.load(key, &mut buf).ok()?;
        postcard::from_bytes(&buf[..n]).ok()
    }

    fn load_persisted(&mut self, now_ms: u32) {
        if let Some(cal) = self.load_record::<CalibrationConfig>(SettingsKey::Calibration) {
            self.sampler.set_calibration(cal, now_ms);
        }
        if let Some(cfg) = self.load_record::<GuardConfig>(SettingsKey::GuardConfig) {
            self.guard.set_config(cfg);
        }
        if let Some(mode) = self.load_record::<OperatingMode>(SettingsKey::OperatingMode) {
            self.mode = mode;
        }
        if let Some(pattern) = self.load_record::<WeldPattern>(SettingsKey::WeldPattern) {
            self.pattern = pattern;
        }
        if let Some(gap) = self.load_record::<u16>(SettingsKey::GapMs) {
            self.gap_ms = gap;
        }
        if let Some(id) = self.load_record::<u8>(SettingsKey::PresetId) {
            if preset(id).is_some() {
                self.preset_id = id;
            }
        }
        self.apply_preset_durations();
    }
}
