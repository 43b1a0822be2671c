//! Command dispatch
//!
//! Executes the [`Command`]s one tick produced, in order. Log lines go to
//! the local logger and, from `min_level` up, to the notification sink.
//! Threshold changes go to whatever drives the relay. Daily summaries are
//! logged and always forwarded.

use coolguard_core::{Command, LogLevel};

use crate::sink::NotificationSink;

/// Receiver of adapted switching thresholds, usually the relay driver
pub trait ThresholdTarget {
    /// Switch on above `on_above` °C and off below `off_below` °C from now on
    fn apply_thresholds(&mut self, on_above: f32, off_below: f32);
}

/// Runs command lists against the sink and a [`ThresholdTarget`]
pub struct Dispatcher<T> {
    sink: NotificationSink,
    target: T,
    min_level: LogLevel,
}

impl<T: ThresholdTarget> Dispatcher<T> {
    /// Forwards warnings and errors to the sink by default
    pub fn new(sink: NotificationSink, target: T) -> Self {
        Self {
            sink,
            target,
            min_level: LogLevel::Warn,
        }
    }

    /// Lowest log level forwarded to the sink
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn sink(&self) -> &NotificationSink {
        &self.sink
    }

    /// Execute `commands` in order
    ///
    /// Sink rejections are logged and skipped; dispatch never fails.
    pub fn dispatch(&mut self, commands: &[Command]) {
        for command in commands {
            match command {
                Command::Log { level, message } => {
                    log::log!((*level).into(), "{}", message);
                    if *level >= self.min_level {
                        self.forward(message.as_str());
                    }
                }
                Command::AdjustHysteresis {
                    on_above,
                    off_below,
                } => {
                    self.target.apply_thresholds(*on_above, *off_below);
                }
                Command::DailySummary { text, .. } => {
                    log::info!("{}", text);
                    self.forward(text.as_str());
                }
            }
        }
    }

    fn forward(&self, text: &str) {
        if let Err(e) = self.sink.write(text) {
            log::debug!("Notification not queued: {}", e);
        }
    }
}
