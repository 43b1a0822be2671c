//! Commands emitted by the control tick
//!
//! The processor never performs I/O. Everything it wants done (write a log
//! line, move the relay thresholds, publish the daily summary) comes out as
//! a [`Command`] in a fixed-capacity list, in the order the steps ran. A
//! consumer outside the core executes them.
//!
//! Message text lives inline in a [`Message`]. Text longer than
//! [`MESSAGE_CAPACITY`] bytes is cut at the last character boundary that
//! fits instead of failing the command.

use core::fmt::{self, Write};

use crate::{
    constants::{MAX_COMMANDS_PER_TICK, MESSAGE_CAPACITY},
    daily::DailySummary,
    errors::{ControlError, ControlResult},
};

/// Inline message text
pub type Message = heapless::String<MESSAGE_CAPACITY>;

/// Ordered output of one tick
pub type Commands = heapless::Vec<Command, MAX_COMMANDS_PER_TICK>;

/// Severity of a log command
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    pub const fn name(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[cfg(feature = "log")]
impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// One instruction for the command consumer
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Write a diagnostic line
    Log { level: LogLevel, message: Message },
    /// Apply new switching thresholds (°C)
    AdjustHysteresis { on_above: f32, off_below: f32 },
    /// Publish the finished day
    DailySummary { summary: DailySummary, text: Message },
}

impl Command {
    pub fn log(level: LogLevel, args: fmt::Arguments<'_>) -> Self {
        Command::Log {
            level,
            message: format_message(args),
        }
    }

    pub fn daily_summary(summary: DailySummary) -> Self {
        Command::DailySummary {
            summary,
            text: format_message(format_args!("{}", summary)),
        }
    }
}

/// Append `command`, reporting a full list as [`ControlError::CommandOverflow`]
pub fn push(commands: &mut Commands, command: Command) -> ControlResult<()> {
    commands.push(command).map_err(|_| ControlError::CommandOverflow {
        capacity: MAX_COMMANDS_PER_TICK,
    })
}

/// Render `args` into a [`Message`], truncating on overflow
pub fn format_message(args: fmt::Arguments<'_>) -> Message {
    let mut message = Message::new();
    let _ = Truncating(&mut message).write_fmt(args);
    message
}

struct Truncating<'a>(&'a mut Message);

impl Write for Truncating<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.0.capacity() - self.0.len();
        if s.len() <= room {
            return self.0.push_str(s).map_err(|_| fmt::Error);
        }

        let mut cut = room;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        self.0.push_str(&s[..cut]).map_err(|_| fmt::Error)?;
        // Stop formatting; the rest would be dropped anyway
        Err(fmt::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_log_command() {
        let cmd = Command::log(LogLevel::Warn, format_args!("alarm at {:.1}C", 12.345));
        match cmd {
            Command::Log { level, message } => {
                assert_eq!(level, LogLevel::Warn);
                assert_eq!(message.as_str(), "alarm at 12.3C");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn long_message_is_truncated() {
        let long = "x".repeat(MESSAGE_CAPACITY + 40);
        let msg = format_message(format_args!("{}", long));
        assert_eq!(msg.len(), MESSAGE_CAPACITY);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 'é' is two bytes; an odd capacity remainder must not split it
        let text = format!("a{}", "é".repeat(MESSAGE_CAPACITY));
        let msg = format_message(format_args!("{}", text));
        assert!(msg.len() <= MESSAGE_CAPACITY);
        assert_eq!(msg.len(), MESSAGE_CAPACITY - 1);
        assert!(msg.as_str().ends_with('é'));
    }

    #[test]
    fn push_reports_overflow() {
        let mut commands = Commands::new();
        for _ in 0..MAX_COMMANDS_PER_TICK {
            push(&mut commands, Command::AdjustHysteresis { on_above: 5.0, off_below: 3.0 }).unwrap();
        }
        let err = push(&mut commands, Command::AdjustHysteresis { on_above: 5.0, off_below: 3.0 });
        assert_eq!(err, Err(ControlError::CommandOverflow { capacity: MAX_COMMANDS_PER_TICK }));
    }

    #[test]
    fn levels_are_ordered() {
        assert!(LogLevel::Error > LogLevel::Warn);
        assert!(LogLevel::Info >= LogLevel::Info);
        assert_eq!(LogLevel::Debug.name(), "debug");
    }
}
