use chrono::{DateTime, FixedOffset, Offset, Utc};
use chrono_tz::Tz;
use thermorelay_common::WallTime;
use tracing::warn;

/// Wall clock for one regional zone. The UTC offset is looked up on resync
/// and cached in between, so a DST switch takes effect at the next resync.
#[derive(Debug, Clone)]
pub struct ZonedClock {
    tz: Tz,
    offset: FixedOffset,
}

impl ZonedClock {
    pub fn new(timezone: &str) -> Self {
        let tz = timezone.parse::<Tz>().unwrap_or_else(|err| {
            warn!("unknown timezone {timezone:?} ({err}), falling back to Europe/Berlin");
            chrono_tz::Europe::Berlin
        });
        let offset = Self::offset_at(tz, Utc::now());
        Self { tz, offset }
    }

    pub fn timezone(&self) -> &'static str {
        self.tz.name()
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn resync(&mut self) -> bool {
        self.resync_at(Utc::now())
    }

    pub fn resync_at(&mut self, utc: DateTime<Utc>) -> bool {
        let offset = Self::offset_at(self.tz, utc);
        let changed = offset != self.offset;
        self.offset = offset;
        changed
    }

    pub fn now(&self) -> WallTime {
        self.at(Utc::now())
    }

    pub fn at(&self, utc: DateTime<Utc>) -> WallTime {
        WallTime::from_datetime(&utc.with_timezone(&self.offset))
    }

    fn offset_at(tz: Tz, utc: DateTime<Utc>) -> FixedOffset {
        utc.with_timezone(&tz).offset().fix()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
            .unwrap()
    }

    #[test]
    fn winter_and_summer_offsets() {
        let mut clock = ZonedClock::new("Europe/Berlin");

        clock.resync_at(utc(2024, 1, 15, 12, 0));
        assert_eq!(clock.offset().local_minus_utc(), 3_600);

        assert!(clock.resync_at(utc(2024, 7, 15, 12, 0)));
        assert_eq!(clock.offset().local_minus_utc(), 7_200);
        assert!(!clock.resync_at(utc(2024, 7, 16, 12, 0)));
    }

    #[test]
    fn wall_time_uses_cached_offset() {
        let mut clock = ZonedClock::new("Europe/Berlin");
        clock.resync_at(utc(2024, 1, 15, 0, 0));

        // Past the spring switch, but no resync yet.
        let now = clock.at(utc(2024, 4, 2, 5, 30));

        assert_eq!((now.time.hour, now.time.minute), (6, 30));
        assert_eq!(now.utc_offset_secs, 3_600);
        assert_eq!(now.epoch, utc(2024, 4, 2, 5, 30).timestamp());
    }

    #[test]
    fn unknown_zone_falls_back() {
        let clock = ZonedClock::new("Mars/Olympus_Mons");

        assert_eq!(clock.timezone(), "Europe/Berlin");
    }
}
