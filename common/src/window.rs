use chrono::{DateTime, FixedOffset, Offset, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallTime {
    pub time: TimeOfDay,
    pub epoch: i64,
    pub utc_offset_secs: i32,
}

impl WallTime {
    pub fn from_datetime<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        Self {
            time: TimeOfDay {
                hour: now.hour() as u8,
                minute: now.minute() as u8,
            },
            epoch: now.timestamp(),
            utc_offset_secs: now.offset().fix().local_minus_utc(),
        }
    }

    pub fn at(hour: u8, minute: u8, epoch: i64) -> Self {
        Self {
            time: TimeOfDay { hour, minute },
            epoch,
            utc_offset_secs: 0,
        }
    }

    pub fn local(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.utc_offset_secs)?;
        DateTime::from_timestamp(self.epoch, 0).map(|utc| utc.with_timezone(&offset))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingWindow {
    pub start_hour: u8,
    pub start_min: u8,
    pub end_hour: u8,
    pub end_min: u8,
}

impl OperatingWindow {
    pub fn contains(&self, now: TimeOfDay) -> bool {
        is_operating_time(now, self)
    }

    pub fn wraps_midnight(&self) -> bool {
        (self.start_hour, self.start_min) > (self.end_hour, self.end_min)
    }
}

/// Both bounds are inclusive. The test is evaluated against a single day, so a
/// window wrapping past midnight (start after end) never matches.
pub fn is_operating_time(now: TimeOfDay, window: &OperatingWindow) -> bool {
    let after_start = window.start_hour < now.hour
        || (window.start_hour == now.hour && window.start_min <= now.minute);
    let before_end = window.end_hour > now.hour
        || (window.end_hour == now.hour && window.end_min >= now.minute);
    after_start && before_end
}
