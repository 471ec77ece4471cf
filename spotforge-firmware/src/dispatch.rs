//! Command dispatch
//!
//! Maps protocol commands onto controller operations and controller
//! results back onto protocol responses. Every command produces exactly
//! one response; rejected commands mutate nothing.

use core::fmt::Write;

use spotforge_core::config::{GuardConfig, OperatingMode, WeldPattern};
use spotforge_core::sense::SenseChannel;
use spotforge_core::traits::{AnalogInputs, SettingsStore, SsrOutput};
use spotforge_core::weld::{EventKind, WeldEvent};
use spotforge_core::{CommandError, Welder};
use spotforge_protocol::telemetry::MAX_HISTORY_RECORDS;
use spotforge_protocol::{
    write_csv, CalibrationValues, Channel, Command, ErrorCode, GuardSettings, GuardStatusReport,
    HistoryRecord, Mode, Pattern, PresetInfo, Readings, Response, TuningReport, VersionInfo,
};

use crate::BUILD_VERSION;

/// Handle one command against the controller
pub fn handle<A, S, P>(
    welder: &mut Welder<A, S, P>,
    command: Command,
    now_ms: u32,
) -> Response
where
    A: AnalogInputs,
    S: SsrOutput,
    P: SettingsStore,
{
    match command {
        Command::QueryReadings => {
            let r = welder.readings();
            Response::Readings(Readings {
                irms_a: r.irms_a,
                vrms_v: r.vrms_v,
                samples_in_window: r.samples_in_window,
                window_ms: r.window_ms,
            })
        }
        Command::QueryVersion => Response::Version(VersionInfo {
            build: BUILD_VERSION,
            mode: mode_out(welder.mode()),
            pattern: pattern_out(welder.pattern()),
            gap_ms: welder.gap_ms(),
        }),
        Command::QueryStatus => {
            let status = welder.guard_status(now_ms);
            Response::Status(GuardStatusReport {
                stable_windows: status.stable_windows,
                ready: status.ready,
                welding: status.phase.is_active(),
                last_event: status
                    .last_event
                    .map(|e| format_event(&e))
                    .unwrap_or_default(),
            })
        }

        Command::QueryCalibration => {
            let cal = welder.calibration();
            Response::Calibration(CalibrationValues {
                current_offset: cal.current_offset,
                voltage_offset: cal.voltage_offset,
                current_scale: cal.current_scale,
                voltage_scale: cal.voltage_scale,
            })
        }
        Command::ZeroChannel(channel) => {
            match welder.zero_channel(channel_in(channel), now_ms) {
                Ok(offset) => Response::Offset { channel, offset },
                Err(e) => Response::Error(error_out(e)),
            }
        }
        Command::SetScales { current, voltage } => {
            if current.is_none() && voltage.is_none() {
                return Response::Error(ErrorCode::BadParameter);
            }
            welder.set_scales(current, voltage);
            Response::Ok
        }
        Command::AutoScale { channel, target } => {
            match welder.auto_scale(channel_in(channel), target) {
                Ok(scale) => Response::Scale { channel, scale },
                Err(e) => Response::Error(error_out(e)),
            }
        }

        Command::QueryGuard => {
            let cfg = welder.guard_config();
            Response::Guard(GuardSettings {
                auto_trigger: cfg.auto_trigger,
                guard_enabled: cfg.guard_enabled,
                current_trigger_a: cfg.current_trigger_a,
                voltage_cutoff_v: cfg.voltage_cutoff_v,
                current_limit_a: cfg.current_limit_a,
                cooldown_ms: cfg.cooldown_ms,
                required_stable_windows: cfg.required_stable_windows,
            })
        }
        Command::SetGuard(s) => {
            welder.set_guard_config(GuardConfig {
                auto_trigger: s.auto_trigger,
                guard_enabled: s.guard_enabled,
                current_trigger_a: s.current_trigger_a,
                voltage_cutoff_v: s.voltage_cutoff_v,
                current_limit_a: s.current_limit_a,
                cooldown_ms: s.cooldown_ms,
                required_stable_windows: s.required_stable_windows,
            });
            Response::Ok
        }

        Command::QueryMode => Response::Mode(mode_out(welder.mode())),
        Command::SetMode(mode) => {
            welder.set_mode(mode_in(mode));
            Response::Ok
        }
        Command::QueryPattern => Response::Pattern {
            pattern: pattern_out(welder.pattern()),
            gap_ms: welder.gap_ms(),
        },
        Command::SetPattern(pattern) => {
            welder.set_pattern(pattern_in(pattern));
            Response::Ok
        }
        Command::SetGap { gap_ms } => {
            welder.set_gap_ms(gap_ms);
            Response::Ok
        }
        Command::QueryPreset => match welder.selected_preset() {
            Some(p) => Response::Preset(preset_info(&p)),
            None => Response::Error(ErrorCode::PresetOutOfRange),
        },
        Command::SelectPreset { id } => match welder.select_preset(id) {
            Ok(p) => Response::Preset(preset_info(&p)),
            Err(e) => Response::Error(error_out(e)),
        },

        Command::TriggerWeld => match welder.trigger_weld(now_ms) {
            Ok(()) => Response::Ok,
            Err(e) => Response::Error(error_out(e)),
        },

        Command::QueryThicknessOptions => {
            let mut options = heapless::Vec::new();
            for t in welder.supported_thicknesses() {
                let _ = options.push(*t);
            }
            Response::ThicknessOptions(options)
        }
        Command::QueryThickness => Response::Thickness {
            thickness_x100: welder.target_thickness_x100(),
        },
        Command::SetThickness { thickness_x100 } => {
            match welder.set_target_thickness_x100(thickness_x100) {
                Ok(q) => Response::Thickness { thickness_x100: q },
                Err(e) => Response::Error(error_out(e)),
            }
        }
        Command::TuningStart => match welder.tuning_start() {
            Ok(()) => Response::Ok,
            Err(e) => Response::Error(error_out(e)),
        },
        Command::TuningStop => {
            welder.tuning_stop();
            Response::Ok
        }
        Command::TuningApply => {
            welder.tuning_apply();
            Response::Ok
        }
        Command::QueryTuning => {
            let s = welder.tuning_status();
            let (low, _, high) = s.energy_band;
            Response::Tuning(TuningReport {
                running: s.running,
                thickness_x100: s.thickness_x100,
                trial: s.trial,
                max_trials: s.max_trials,
                pre_ms: s.tuned.pre_ms,
                main_ms: s.tuned.main_ms,
                rating: s.last_rating.label(),
                energy_est: s.last_energy_est,
                energy_low: low,
                energy_high: high,
            })
        }

        Command::QueryHistory => Response::History(history_records(welder)),
        Command::QueryHistoryCsv => {
            let records = history_records(welder);
            let mut csv = heapless::String::new();
            if write_csv(&mut csv, records.iter()).is_err() {
                return Response::Error(ErrorCode::BadParameter);
            }
            Response::HistoryCsv(csv)
        }
    }
}

fn history_records<A, S, P>(
    welder: &Welder<A, S, P>,
) -> heapless::Vec<HistoryRecord, MAX_HISTORY_RECORDS>
where
    A: AnalogInputs,
    S: SsrOutput,
    P: SettingsStore,
{
    let mut records = heapless::Vec::new();
    for e in welder.history().iter_newest_first() {
        let _ = records.push(HistoryRecord {
            at_ms: e.at_ms,
            thickness_x100: e.thickness_x100,
            pre_ms: e.pre_ms,
            main_ms: e.main_ms,
            energy_est: e.energy_est,
            irms_a: e.irms_a,
            rating: e.rating.label(),
        });
    }
    records
}

/// Render an event as a short status line
fn format_event(event: &WeldEvent) -> heapless::String<48> {
    let mut line = heapless::String::new();
    let _ = match event.kind {
        EventKind::CycleStarted {
            pre_ms,
            gap_ms,
            main_ms,
        } => write!(
            line,
            "[{}] start {}+{}+{}ms",
            event.at_ms, pre_ms, gap_ms, main_ms
        ),
        EventKind::CycleCompleted => write!(line, "[{}] cycle end", event.at_ms),
        EventKind::CycleAborted(reason) => {
            write!(line, "[{}] abort {}", event.at_ms, reason.label())
        }
        EventKind::TrialRated { trial, rating } => {
            write!(line, "[{}] trial {} {}", event.at_ms, trial, rating.label())
        }
    };
    line
}

fn channel_in(channel: Channel) -> SenseChannel {
    match channel {
        Channel::Current => SenseChannel::Current,
        Channel::Voltage => SenseChannel::Voltage,
    }
}

fn mode_in(mode: Mode) -> OperatingMode {
    match mode {
        Mode::Preset => OperatingMode::Preset,
        Mode::Smart => OperatingMode::Adaptive,
    }
}

fn mode_out(mode: OperatingMode) -> Mode {
    match mode {
        OperatingMode::Preset => Mode::Preset,
        OperatingMode::Adaptive => Mode::Smart,
    }
}

fn pattern_in(pattern: Pattern) -> WeldPattern {
    match pattern {
        Pattern::Single => WeldPattern::Single,
        Pattern::Double => WeldPattern::Double,
    }
}

fn pattern_out(pattern: WeldPattern) -> Pattern {
    match pattern {
        WeldPattern::Single => Pattern::Single,
        WeldPattern::Double => Pattern::Double,
    }
}

fn preset_info(preset: &spotforge_core::config::Preset) -> PresetInfo {
    let mut label = heapless::String::new();
    let _ = label.push_str(preset.label);
    PresetInfo {
        id: preset.id,
        label,
        pre_ms: preset.pre_ms,
        main_ms: preset.main_ms,
    }
}

fn error_out(error: CommandError) -> ErrorCode {
    match error {
        CommandError::PresetOutOfRange => ErrorCode::PresetOutOfRange,
        CommandError::ThicknessUnsupported => ErrorCode::ThicknessUnsupported,
        CommandError::CycleInProgress => ErrorCode::CycleInProgress,
        CommandError::LowSignal => ErrorCode::LowSignal,
        CommandError::AdcFailed => ErrorCode::AdcFailed,
    }
}
