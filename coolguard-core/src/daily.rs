//! Daily operating statistics
//!
//! Accumulates runtime, temperature extremes and event counts over one
//! local calendar day and turns them into a [`DailySummary`] once per date
//! change. The summary is only produced after the local hour reaches the
//! configured summary hour, so a reboot shortly after midnight does not cut
//! the day in two.
//!
//! Producing the summary and clearing the accumulators happen in the same
//! call ([`DailyAggregator::rollover`]); there is no state in which one has
//! happened without the other.

use core::fmt;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::{constants::SECONDS_PER_HOUR, duty::duty_percent};

/// Running statistics of one temperature channel
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelStats {
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub sum: f64,
    pub count: u32,
}

impl ChannelStats {
    /// Fold in one reading; absent and non-finite readings are skipped
    pub fn add(&mut self, reading: Option<f32>) {
        let Some(value) = reading.filter(|v| v.is_finite()) else {
            return;
        };
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        self.sum += f64::from(value);
        self.count += 1;
    }

    pub fn mean(&self) -> Option<f32> {
        if self.count == 0 {
            None
        } else {
            Some((self.sum / f64::from(self.count)) as f32)
        }
    }

    fn summarize(&self) -> ChannelSummary {
        ChannelSummary {
            min: self.min,
            max: self.max,
            mean: self.mean(),
            samples: self.count,
        }
    }
}

/// Accumulators for the current day
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DailyStats {
    pub on_seconds: f32,
    pub off_seconds: f32,
    pub air: ChannelStats,
    pub evap: ChannelStats,
    pub freeze_events: u32,
    pub high_temp_events: u32,
}

impl DailyStats {
    /// Ingest one tick's raw readings
    pub fn update_stats(&mut self, air: Option<f32>, evap: Option<f32>) {
        self.air.add(air);
        self.evap.add(evap);
    }

    /// Add `dt` seconds of relay on- or off-time
    pub fn update_runtime(&mut self, dt_seconds: f32, relay_on: bool) {
        if !dt_seconds.is_finite() || dt_seconds <= 0.0 {
            return;
        }
        if relay_on {
            self.on_seconds += dt_seconds;
        } else {
            self.off_seconds += dt_seconds;
        }
    }

    pub fn record_freeze_event(&mut self) {
        self.freeze_events = self.freeze_events.saturating_add(1);
    }

    pub fn record_high_temp_event(&mut self) {
        self.high_temp_events = self.high_temp_events.saturating_add(1);
    }

    /// Snapshot the accumulators and reset them to zero
    pub fn take_summary(&mut self, date: NaiveDate) -> DailySummary {
        let stats = core::mem::take(self);
        DailySummary {
            date,
            on_seconds: stats.on_seconds,
            off_seconds: stats.off_seconds,
            duty_percent: duty_percent(stats.on_seconds, stats.off_seconds),
            air: stats.air.summarize(),
            evap: stats.evap.summarize(),
            freeze_events: stats.freeze_events,
            high_temp_events: stats.high_temp_events,
        }
    }
}

/// Whether a summary is due at `local_now`
///
/// True exactly when the local date differs from the date of the last
/// summary and the local hour has reached `summary_hour`. Without a previous
/// summary date nothing is due; the caller records today's date instead.
pub fn should_generate_summary(
    local_now: NaiveDateTime,
    last_summary_date: Option<NaiveDate>,
    summary_hour: u32,
) -> bool {
    match last_summary_date {
        Some(last) => local_now.date() != last && local_now.hour() >= summary_hour,
        None => false,
    }
}

/// Immutable statistics of one channel for a finished day
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelSummary {
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub mean: Option<f32>,
    pub samples: u32,
}

/// Immutable snapshot of a finished day
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DailySummary {
    /// Date the accounting period started on
    pub date: NaiveDate,
    pub on_seconds: f32,
    pub off_seconds: f32,
    pub duty_percent: f32,
    pub air: ChannelSummary,
    pub evap: ChannelSummary,
    pub freeze_events: u32,
    pub high_temp_events: u32,
}

struct Reading(Option<f32>);

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{:.1}", v),
            None => f.write_str("n/a"),
        }
    }
}

struct Hours(f32);

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}h", self.0 / SECONDS_PER_HOUR as f32)
    }
}

impl fmt::Display for ChannelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "min {} max {} avg {}",
            Reading(self.min),
            Reading(self.max),
            Reading(self.mean)
        )
    }
}

impl fmt::Display for DailySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Daily summary {}: duty {:.1}% (on {}, off {}) | air {} | evap {} | freeze events {} | high temp events {}",
            self.date,
            self.duty_percent,
            Hours(self.on_seconds),
            Hours(self.off_seconds),
            self.air,
            self.evap,
            self.freeze_events,
            self.high_temp_events,
        )
    }
}

/// Outcome of [`DailyAggregator::rollover`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rollover {
    /// Same day, nothing to do
    None,
    /// First day seen; date recorded, no summary
    Started(NaiveDate),
    /// Day finished; accumulators were reset
    Summary(DailySummary),
}

/// Day accumulators plus the date of the last summary
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DailyAggregator {
    pub stats: DailyStats,
    pub last_summary_date: Option<NaiveDate>,
}

impl DailyAggregator {
    /// Emit the summary if due, resetting accumulators and advancing the date
    pub fn rollover(&mut self, local_now: NaiveDateTime, summary_hour: u32) -> Rollover {
        let today = local_now.date();
        match self.last_summary_date {
            None => {
                self.last_summary_date = Some(today);
                Rollover::Started(today)
            }
            Some(last) if should_generate_summary(local_now, Some(last), summary_hour) => {
                let summary = self.stats.take_summary(last);
                self.last_summary_date = Some(today);
                Rollover::Summary(summary)
            }
            Some(_) => Rollover::None,
        }
    }
}
