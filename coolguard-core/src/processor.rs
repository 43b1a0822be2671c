//! Features Event Processor
//!
//! ## Overview
//!
//! [`process`] runs once per tick. It takes the tick's [`ControlEvent`], the
//! previous [`FeaturesState`], the configuration and a [`Clock`], and
//! returns the new state plus an ordered list of [`Command`]s. It performs
//! no I/O of its own.
//!
//! ```text
//!            ControlEvent
//!                 │
//!   FeaturesState ▼ (copied)
//!   ──────────► ┌──────────────────────────────┐
//!               │ 1. daily stats, duty, freeze │
//!               │ 2. alarms                    │
//!               │ 3. adaptive hysteresis       │──► Commands (in step order)
//!               │ 4. loop performance          │
//!               │ 5. daily summary rollover    │
//!               │ 6. duty window rollover      │
//!               │ 7. relay validation          │
//!               └──────────────────────────────┘
//!                 │
//!                 ▼ new FeaturesState
//! ```
//!
//! The order is fixed: later steps read what earlier steps wrote (the
//! adaptive step uses the duty window step 1 just updated) and consumers may
//! rely on command order (an `AdjustHysteresis` is always followed by its
//! log line).
//!
//! ## Copy-on-write
//!
//! The previous state is only read. The processor works on a copy and hands
//! the copy back, so callers can persist or compare snapshots freely.
//!
//! ## Failure isolation
//!
//! A step that cannot complete (the command list is full, the timestamp
//! cannot be placed on the calendar) records a [`StepError`] and the
//! remaining steps still run. Refrigeration control never stops because a
//! diagnostic line could not be queued.

use crate::{
    alarm::{AlarmKind, AlarmState, AlarmTransition, HighTempAlarm},
    commands::{self, Command, Commands, LogLevel},
    config::ControllerConfig,
    daily::{DailyAggregator, Rollover},
    duty::{should_reset, DutyWindow},
    errors::{ControlError, ControlResult},
    events::{finite, ControlEvent},
    hysteresis,
    performance::{self, PerfStats},
    time::{local_datetime, Clock, Timestamp},
};

/// The processing steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Statistics,
    Alarms,
    Adaptive,
    Performance,
    DailySummary,
    DutyWindow,
    Relay,
}

/// Number of processing steps
pub const STEP_COUNT: usize = 7;

impl Step {
    pub const ALL: [Step; STEP_COUNT] = [
        Step::Statistics,
        Step::Alarms,
        Step::Adaptive,
        Step::Performance,
        Step::DailySummary,
        Step::DutyWindow,
        Step::Relay,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Step::Statistics => "statistics",
            Step::Alarms => "alarms",
            Step::Adaptive => "adaptive",
            Step::Performance => "performance",
            Step::DailySummary => "daily_summary",
            Step::DutyWindow => "duty_window",
            Step::Relay => "relay",
        }
    }
}

/// A step that stopped early
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepError {
    pub step: Step,
    pub error: ControlError,
}

/// At most one error per step
pub type StepErrors = heapless::Vec<StepError, STEP_COUNT>;

/// Everything the controller remembers between ticks
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeaturesState {
    /// Day accumulators and last summary date
    pub daily: DailyAggregator,
    pub adaptive_shift: f32,
    /// Relay switches on above this temperature
    pub on_above: f32,
    /// Relay switches off below this temperature
    pub off_below: f32,
    pub instant_alarm: AlarmState,
    pub sustained_alarm: AlarmState,
    pub performance: PerfStats,
    /// Time of the last performance summary; 0 before the first tick
    pub last_perf_summary: Timestamp,
    pub duty: DutyWindow,
    /// Latched stuck-relay condition
    pub relay_stuck: bool,
}

impl FeaturesState {
    /// Fresh state with the narrowest band the configuration allows
    pub fn new(config: &ControllerConfig) -> Self {
        let shift = config.adaptive.min_shift;
        let (on_above, off_below) = hysteresis::thresholds(config.setpoint_c, config.hysteresis_c, shift);
        Self {
            daily: DailyAggregator::default(),
            adaptive_shift: shift,
            on_above,
            off_below,
            instant_alarm: AlarmState::default(),
            sustained_alarm: AlarmState::default(),
            performance: PerfStats::default(),
            last_perf_summary: 0,
            duty: DutyWindow::default(),
            relay_stuck: false,
        }
    }

    pub fn alarm(&self, kind: AlarmKind) -> &AlarmState {
        match kind {
            AlarmKind::Instant => &self.instant_alarm,
            AlarmKind::Sustained => &self.sustained_alarm,
        }
    }

    fn alarm_mut(&mut self, kind: AlarmKind) -> &mut AlarmState {
        match kind {
            AlarmKind::Instant => &mut self.instant_alarm,
            AlarmKind::Sustained => &mut self.sustained_alarm,
        }
    }
}

impl Default for FeaturesState {
    fn default() -> Self {
        Self::new(&ControllerConfig::default())
    }
}

/// Result of one tick
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub commands: Commands,
    pub state: FeaturesState,
    pub errors: StepErrors,
}

impl TickOutput {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Run one control tick
pub fn process<C: Clock + ?Sized>(
    event: &ControlEvent,
    state: &FeaturesState,
    config: &ControllerConfig,
    clock: &C,
) -> TickOutput {
    let mut tick = Tick {
        event,
        config,
        clock,
        now: event.timestamp,
        state: state.clone(),
        commands: Commands::new(),
    };

    let mut errors = StepErrors::new();
    for step in Step::ALL {
        if let Err(error) = tick.run(step) {
            log_warn!("{} step failed: {}", step.name(), error);
            // One slot per step, cannot overflow
            let _ = errors.push(StepError { step, error });
        }
    }

    log_debug!(
        "tick at {}: {} commands, shift {:.1}",
        tick.now,
        tick.commands.len(),
        tick.state.adaptive_shift
    );

    TickOutput {
        commands: tick.commands,
        state: tick.state,
        errors,
    }
}

struct Tick<'a, C: ?Sized> {
    event: &'a ControlEvent,
    config: &'a ControllerConfig,
    clock: &'a C,
    now: Timestamp,
    state: FeaturesState,
    commands: Commands,
}

impl<C: Clock + ?Sized> Tick<'_, C> {
    fn run(&mut self, step: Step) -> ControlResult<()> {
        match step {
            Step::Statistics => self.statistics(),
            Step::Alarms => self.alarms(),
            Step::Adaptive => self.adaptive(),
            Step::Performance => self.performance(),
            Step::DailySummary => self.daily_summary(),
            Step::DutyWindow => self.duty_window(),
            Step::Relay => self.relay(),
        }
    }

    fn emit(&mut self, command: Command) -> ControlResult<()> {
        commands::push(&mut self.commands, command)
    }

    fn log(&mut self, level: LogLevel, args: core::fmt::Arguments<'_>) -> ControlResult<()> {
        self.emit(Command::log(level, args))
    }

    fn statistics(&mut self) -> ControlResult<()> {
        let event = self.event;
        let daily = &mut self.state.daily.stats;
        daily.update_stats(finite(event.raw_air), finite(event.raw_evap));
        daily.update_runtime(event.dt_seconds, event.relay_on);
        if event.freeze_protection_started {
            daily.record_freeze_event();
        }
        self.state.duty.accumulate(event.dt_seconds, event.relay_on);
        Ok(())
    }

    fn alarms(&mut self) -> ControlResult<()> {
        let temperature = finite(self.event.filtered_air);
        let alarms = self.config.alarms;
        let mut result = Ok(());

        for (kind, alarm_config) in [
            (AlarmKind::Instant, &alarms.instant),
            (AlarmKind::Sustained, &alarms.sustained),
        ] {
            let alarm = HighTempAlarm::new(kind, alarm_config);
            let slot = self.state.alarm_mut(kind);
            let (next, transition) = alarm.evaluate(*slot, temperature, self.now);
            *slot = next;

            let logged = match (transition, temperature) {
                (AlarmTransition::Fired, Some(temp)) => {
                    self.state.daily.stats.record_high_temp_event();
                    self.log(
                        LogLevel::Warn,
                        format_args!(
                            "High temperature alarm ({}): {:.1}C >= {:.1}C",
                            kind.name(),
                            temp,
                            alarm.threshold()
                        ),
                    )
                }
                (AlarmTransition::Recovered, Some(temp)) => self.log(
                    LogLevel::Info,
                    format_args!(
                        "High temperature alarm ({}) cleared: {:.1}C",
                        kind.name(),
                        temp
                    ),
                ),
                _ => Ok(()),
            };
            // Both alarms must advance even if the first log did not fit
            result = result.and(logged);
        }
        result
    }

    fn adaptive(&mut self) -> ControlResult<()> {
        let duty = self.state.duty.percent();
        let out = hysteresis::step(duty, self.state.adaptive_shift, &self.config.adaptive);
        if !out.changed {
            return Ok(());
        }

        let (on_above, off_below) =
            hysteresis::thresholds(self.config.setpoint_c, self.config.hysteresis_c, out.new_shift);

        // Only commit what the relay driver is told; an unsent change is retried next tick
        self.emit(Command::AdjustHysteresis { on_above, off_below })?;
        self.state.adaptive_shift = out.new_shift;
        self.state.on_above = on_above;
        self.state.off_below = off_below;

        self.log(
            LogLevel::Info,
            format_args!(
                "Adaptive hysteresis: duty {:.0}%, shift {:.1}C, on above {:.1}C, off below {:.1}C",
                duty, out.new_shift, on_above, off_below
            ),
        )
    }

    fn performance(&mut self) -> ControlResult<()> {
        let perf = self.config.performance;
        let tracked = performance::track(
            self.state.performance,
            self.event.tick_start_ms,
            self.clock.uptime_ms(),
            perf.slow_threshold_ms,
        );
        self.state.performance = tracked.stats;

        let mut result = Ok(());
        if tracked.was_slow {
            result = self.log(
                LogLevel::Warn,
                format_args!(
                    "Slow loop: {} ms (threshold {} ms)",
                    tracked.loop_time_ms, perf.slow_threshold_ms
                ),
            );
        }

        if self.state.last_perf_summary == 0 {
            self.state.last_perf_summary = self.now;
        } else if should_reset(self.now, self.state.last_perf_summary, perf.summary_interval_seconds) {
            self.state.last_perf_summary = self.now;
            let stats = tracked.stats;
            let summary = self.log(
                LogLevel::Info,
                format_args!(
                    "Performance: {} loops, avg {:.1} ms, max {} ms, {} slow",
                    stats.loop_count,
                    stats.average_ms().unwrap_or(0.0),
                    stats.max_ms,
                    stats.slow_count
                ),
            );
            result = result.and(summary);
        }
        result
    }

    fn daily_summary(&mut self) -> ControlResult<()> {
        let local_now = local_datetime(self.now, self.clock.utc_offset_seconds())
            .ok_or(ControlError::InvalidValue { field: "timestamp" })?;

        // Never reset the day without room to publish it
        if self.commands.is_full() {
            return Err(ControlError::CommandOverflow {
                capacity: self.commands.capacity(),
            });
        }

        match self.state.daily.rollover(local_now, self.config.daily.summary_hour) {
            Rollover::Summary(summary) => self.emit(Command::daily_summary(summary)),
            Rollover::Started(_) | Rollover::None => Ok(()),
        }
    }

    fn duty_window(&mut self) -> ControlResult<()> {
        let interval = self.config.duty.interval_seconds;
        if !self.state.duty.is_started() {
            self.state.duty.start(self.now);
            return Ok(());
        }
        if !self.state.duty.is_due(self.now, interval) {
            return Ok(());
        }

        let window = self.state.duty;
        self.state.duty.reset(self.now);
        self.log(
            LogLevel::Info,
            format_args!(
                "Duty cycle {:.1}% over {} s (on {:.0} s, off {:.0} s)",
                window.percent(),
                self.now.saturating_sub(window.last_reset),
                window.on_seconds,
                window.off_seconds
            ),
        )
    }

    fn relay(&mut self) -> ControlResult<()> {
        let Some(observation) = self.event.relay else {
            return Ok(());
        };
        let validation = observation.validate(self.now, self.config.relay.timeout_seconds);

        if validation.stuck && !self.state.relay_stuck {
            self.state.relay_stuck = true;
            self.log(
                LogLevel::Error,
                format_args!(
                    "Relay stuck: commanded {}, reported {} for {} s",
                    on_off(observation.intended_on),
                    on_off(observation.reported_on),
                    validation.elapsed.unwrap_or_default()
                ),
            )
        } else if self.state.relay_stuck && validation.valid && !validation.waiting_for_response {
            self.state.relay_stuck = false;
            self.log(
                LogLevel::Info,
                format_args!("Relay responding again: {}", on_off(observation.reported_on)),
            )
        } else {
            Ok(())
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{relay::RelayObservation, time::FixedClock};

    // 2024-03-10 12:00:00 UTC
    const NOON: Timestamp = 1_710_072_000;

    fn messages(out: &TickOutput) -> Vec<(LogLevel, String)> {
        out.commands
            .iter()
            .filter_map(|c| match c {
                Command::Log { level, message } => Some((*level, message.as_str().to_string())),
                _ => None,
            })
            .collect()
    }

    fn event(now: Timestamp, air: f32, relay_on: bool) -> ControlEvent {
        ControlEvent::new(now, 0)
            .with_air(Some(air), Some(air))
            .with_evap(Some(-20.0))
            .with_relay(relay_on, 5.0)
    }

    #[test]
    fn input_state_is_not_mutated() {
        let config = ControllerConfig::default();
        let clock = FixedClock::new(NOON, 10);
        let state = FeaturesState::new(&config);
        let before = state.clone();

        let out = process(&event(NOON, 4.0, true), &state, &config, &clock);
        assert_eq!(state, before);
        assert_ne!(out.state, before);
        assert!(out.is_clean());
    }

    #[test]
    fn first_tick_starts_windows_quietly() {
        let config = ControllerConfig::default();
        let clock = FixedClock::new(NOON, 10);
        let out = process(&event(NOON, 4.0, false), &FeaturesState::new(&config), &config, &clock);

        assert!(out.commands.is_empty());
        assert_eq!(out.state.duty.last_reset, NOON);
        assert_eq!(out.state.duty.off_seconds, 5.0);
        assert_eq!(out.state.last_perf_summary, NOON);
        assert!(out.state.daily.last_summary_date.is_some());
        assert_eq!(out.state.daily.stats.air.count, 1);
        assert_eq!(out.state.daily.stats.off_seconds, 5.0);
    }

    #[test]
    fn freeze_flag_counts_once_per_event() {
        let config = ControllerConfig::default();
        let clock = FixedClock::new(NOON, 0);
        let ev = event(NOON, 4.0, false).with_freeze_protection(true);
        let out = process(&ev, &FeaturesState::new(&config), &config, &clock);
        assert_eq!(out.state.daily.stats.freeze_events, 1);
    }

    #[test]
    fn instant_alarm_fires_once_and_recovers() {
        let mut config = ControllerConfig::default();
        config.alarms.instant.delay_seconds = 10;
        let mut clock = FixedClock::new(NOON, 0);
        let mut state = FeaturesState::new(&config);
        let mut fired = 0;

        for i in 0..5u64 {
            let now = NOON + i * 5;
            clock.set(now, i * 5000);
            let out = process(&event(now, 13.0, true), &state, &config, &clock);
            fired += messages(&out)
                .iter()
                .filter(|(l, m)| *l == LogLevel::Warn && m.starts_with("High temperature alarm (instant)"))
                .count();
            state = out.state;
        }
        assert_eq!(fired, 1);
        assert!(state.alarm(AlarmKind::Instant).is_fired());
        // 13C also breaches the sustained threshold, but its delay is 30 min
        assert!(!state.alarm(AlarmKind::Sustained).is_fired());
        assert_eq!(state.daily.stats.high_temp_events, 1);

        clock.set(NOON + 30, 30_000);
        let out = process(&event(NOON + 30, 5.0, true), &state, &config, &clock);
        let logs = messages(&out);
        assert!(logs.iter().any(|(l, m)| *l == LogLevel::Info && m.contains("(instant) cleared")));
        assert!(!out.state.alarm(AlarmKind::Instant).is_fired());
        assert_eq!(out.state.daily.stats.high_temp_events, 1);
    }

    #[test]
    fn high_duty_widens_band_with_command_then_log() {
        let config = ControllerConfig::default();
        let clock = FixedClock::new(NOON, 0);
        let mut state = FeaturesState::new(&config);
        state.duty = DutyWindow { on_seconds: 80.0, off_seconds: 20.0, last_reset: NOON - 100 };

        let out = process(&event(NOON, 4.0, true), &state, &config, &clock);
        assert_eq!(out.state.adaptive_shift, 0.1);
        assert_eq!(out.state.on_above, 5.1);
        assert_eq!(out.state.off_below, 2.9);

        let pos = out
            .commands
            .iter()
            .position(|c| matches!(c, Command::AdjustHysteresis { .. }))
            .unwrap();
        assert_eq!(
            out.commands[pos],
            Command::AdjustHysteresis { on_above: 5.1, off_below: 2.9 }
        );
        match &out.commands[pos + 1] {
            Command::Log { level, message } => {
                assert_eq!(*level, LogLevel::Info);
                assert!(message.starts_with("Adaptive hysteresis"));
            }
            other => panic!("expected log after adjust, got {:?}", other),
        }
    }

    #[test]
    fn slow_loop_is_reported() {
        let config = ControllerConfig::default();
        let clock = FixedClock::new(NOON, 1_300);
        let ev = ControlEvent::new(NOON, 1_000);
        let out = process(&ev, &FeaturesState::new(&config), &config, &clock);
        assert_eq!(out.state.performance.slow_count, 1);
        assert!(messages(&out).iter().any(|(l, m)| *l == LogLevel::Warn && m == "Slow loop: 300 ms (threshold 250 ms)"));
    }

    #[test]
    fn performance_summary_on_interval() {
        let config = ControllerConfig::default();
        let mut state = FeaturesState::new(&config);
        state.last_perf_summary = NOON - 3600;
        let clock = FixedClock::new(NOON, 50);
        let out = process(&ControlEvent::new(NOON, 0), &state, &config, &clock);
        assert_eq!(out.state.last_perf_summary, NOON);
        assert!(messages(&out).iter().any(|(_, m)| m.starts_with("Performance: 1 loops")));
    }

    #[test]
    fn duty_window_rolls_over() {
        let config = ControllerConfig::default();
        let mut state = FeaturesState::new(&config);
        state.duty = DutyWindow { on_seconds: 1795.0, off_seconds: 1800.0, last_reset: NOON - 3600 };
        let clock = FixedClock::new(NOON, 0);
        let out = process(&event(NOON, 4.0, true), &state, &config, &clock);

        assert_eq!(out.state.duty, DutyWindow { on_seconds: 0.0, off_seconds: 0.0, last_reset: NOON });
        assert!(messages(&out).iter().any(|(_, m)| m == "Duty cycle 50.0% over 3600 s (on 1800 s, off 1800 s)"));
    }

    #[test]
    fn daily_summary_after_summary_hour() {
        let config = ControllerConfig::default();
        let mut state = FeaturesState::new(&config);
        let yesterday = local_datetime(NOON - 86_400, 0).unwrap().date();
        state.daily.last_summary_date = Some(yesterday);
        state.daily.stats.update_stats(Some(3.0), Some(-18.0));

        let clock = FixedClock::new(NOON, 0);
        let out = process(&event(NOON, 5.0, true), &state, &config, &clock);

        let summary = out
            .commands
            .iter()
            .find_map(|c| match c {
                Command::DailySummary { summary, text } => Some((*summary, text.clone())),
                _ => None,
            })
            .unwrap();
        assert_eq!(summary.0.date, yesterday);
        // This tick's reading lands in the closed day
        assert_eq!(summary.0.air.samples, 2);
        assert!(summary.1.starts_with("Daily summary 2024-03-09"));
        assert_eq!(out.state.daily.stats, Default::default());
        assert_eq!(out.state.daily.last_summary_date, Some(local_datetime(NOON, 0).unwrap().date()));
    }

    #[test]
    fn relay_fault_is_latched() {
        let config = ControllerConfig::default();
        let obs = RelayObservation { intended_on: true, reported_on: false, last_command: Some(NOON - 60) };
        let clock = FixedClock::new(NOON, 0);
        let mut state = FeaturesState::new(&config);

        let out = process(&event(NOON, 4.0, true).with_relay_observation(obs), &state, &config, &clock);
        assert!(out.state.relay_stuck);
        assert!(messages(&out).iter().any(|(l, m)| *l == LogLevel::Error && m == "Relay stuck: commanded on, reported off for 60 s"));
        state = out.state;

        let out = process(&event(NOON + 5, 4.0, true).with_relay_observation(obs), &state, &config, &clock);
        assert!(messages(&out).iter().all(|(l, _)| *l != LogLevel::Error));
        state = out.state;

        let fixed = RelayObservation { reported_on: true, ..obs };
        let out = process(&event(NOON + 10, 4.0, true).with_relay_observation(fixed), &state, &config, &clock);
        assert!(!out.state.relay_stuck);
        assert!(messages(&out).iter().any(|(l, m)| *l == LogLevel::Info && m == "Relay responding again: on"));
    }

    #[test]
    fn full_command_list_does_not_stop_control() {
        let config = ControllerConfig::default();
        let clock = FixedClock::new(NOON, 0);
        let mut state = FeaturesState::new(&config);
        state.duty = DutyWindow { on_seconds: 90.0, off_seconds: 10.0, last_reset: NOON - 100 };

        // Pre-fill via a tick wrapper: run steps on a saturated list
        let mut tick = Tick {
            event: &event(NOON, 4.0, true),
            config: &config,
            clock: &clock,
            now: NOON,
            state: state.clone(),
            commands: Commands::new(),
        };
        while !tick.commands.is_full() {
            tick.commands.push(Command::AdjustHysteresis { on_above: 0.0, off_below: 0.0 }).unwrap();
        }
        assert_eq!(
            tick.run(Step::Adaptive),
            Err(ControlError::CommandOverflow { capacity: crate::constants::MAX_COMMANDS_PER_TICK })
        );
        // The unsent change is not committed, so state and relay driver agree
        assert_eq!(tick.state.adaptive_shift, 0.0);
        assert_eq!(tick.state.on_above, state.on_above);
        assert_eq!(tick.run(Step::DutyWindow), Ok(()));

        // The next tick with room sends and commits it
        let out = process(&event(NOON + 5, 4.0, true), &state, &config, &clock);
        assert_eq!(out.state.adaptive_shift, 0.1);
        assert!(out.commands.iter().any(|c| matches!(
            c,
            Command::AdjustHysteresis { on_above, .. } if *on_above == out.state.on_above
        )));
    }
}
