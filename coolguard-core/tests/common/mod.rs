//! Common fixtures for integration tests
//!
//! This module provides:
//! - A simulated control loop driving `process` with a fixed clock
//! - Helpers to pick log lines and commands out of a run

#![allow(dead_code)]

use coolguard_core::{
    process, Clock, Command, ControlEvent, ControllerConfig, FeaturesState, FixedClock, LogLevel,
    TickOutput, Timestamp,
};

/// 2024-03-10 08:00:00 UTC
pub const START: Timestamp = 1_710_057_600;

/// Evaporator reading used when a test does not care
pub const EVAP_C: f32 = -18.0;

/// Config with a one-minute loop so a simulated day is 1440 ticks
pub fn minute_loop_config() -> ControllerConfig {
    ControllerConfig::default()
        .with_loop_period_ms(60_000.0)
        .with_smoothing_window(60.0)
}

/// Simulated control loop
///
/// Each tick builds an event at the current clock, spends a couple of
/// milliseconds of "work", runs the processor and advances the clock by one
/// loop period.
pub struct Simulation {
    pub config: ControllerConfig,
    pub clock: FixedClock,
    pub state: FeaturesState,
    pub work_ms: u64,
}

impl Simulation {
    pub fn new(config: ControllerConfig) -> Self {
        Self::with_clock(config, FixedClock::new(START, 1_000))
    }

    pub fn with_clock(config: ControllerConfig, clock: FixedClock) -> Self {
        config.validate().expect("test config must be valid");
        Self {
            state: FeaturesState::new(&config),
            config,
            clock,
            work_ms: 2,
        }
    }

    pub fn period_secs(&self) -> u64 {
        (self.config.smoothing.loop_period_ms / 1000.0) as u64
    }

    pub fn event(&self, air: Option<f32>, relay_on: bool) -> ControlEvent {
        ControlEvent::new(self.clock.now(), self.clock.uptime_ms())
            .with_air(air, air)
            .with_evap(Some(EVAP_C))
            .with_relay(relay_on, self.period_secs() as f32)
    }

    /// Run one tick with `event` and advance the clock
    pub fn tick_with(&mut self, event: ControlEvent) -> TickOutput {
        self.clock.advance_uptime_ms(self.work_ms);
        let out = process(&event, &self.state, &self.config, &self.clock);
        self.state = out.state.clone();
        self.clock.advance_secs(self.period_secs());
        out
    }

    pub fn tick(&mut self, air: Option<f32>, relay_on: bool) -> TickOutput {
        let event = self.event(air, relay_on);
        self.tick_with(event)
    }

    /// Run `ticks` ticks, relay pattern chosen per tick index
    pub fn run<F>(&mut self, ticks: usize, air: Option<f32>, mut relay: F) -> Vec<Command>
    where
        F: FnMut(usize) -> bool,
    {
        let mut commands = Vec::new();
        for i in 0..ticks {
            let out = self.tick(air, relay(i));
            assert!(out.is_clean(), "tick {} failed: {:?}", i, out.errors);
            commands.extend(out.commands.iter().cloned());
        }
        commands
    }
}

/// Log lines of a command list
pub fn log_lines(commands: &[Command]) -> Vec<(LogLevel, String)> {
    commands
        .iter()
        .filter_map(|c| match c {
            Command::Log { level, message } => Some((*level, message.as_str().to_string())),
            _ => None,
        })
        .collect()
}

/// Number of log lines at `level` containing `needle`
pub fn count_logs(commands: &[Command], level: LogLevel, needle: &str) -> usize {
    log_lines(commands)
        .iter()
        .filter(|(l, m)| *l == level && m.contains(needle))
        .count()
}
