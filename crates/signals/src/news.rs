use chrono::{DateTime, FixedOffset, Timelike, Utc};

/// Broker-local hours with a high-impact news release at the top of the
/// hour. 14-18 and 20-21 cover the London/New York overlap, 1-2 the Asian
/// open.
const NEWS_HOURS: [u32; 9] = [1, 2, 14, 15, 16, 17, 18, 20, 21];

/// Minutes kept clear on either side of each release.
const BUFFER_MINUTES: i64 = 15;

/// Resolve a broker UTC offset (whole hours) into a `FixedOffset`.
pub(crate) fn broker_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours.clamp(-23, 23) * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"))
}

/// Drops trade slots that land too close to a scheduled news release,
/// evaluated in the broker's local time. Only the minutes around the
/// release itself are blocked; the rest of the hour stays tradeable.
#[derive(Debug, Clone)]
pub struct NewsFilter {
    offset: FixedOffset,
    hours: Vec<u32>,
    buffer_minutes: i64,
}

impl NewsFilter {
    pub fn new(broker_utc_offset_hours: i32) -> Self {
        Self {
            offset: broker_offset(broker_utc_offset_hours),
            hours: NEWS_HOURS.to_vec(),
            buffer_minutes: BUFFER_MINUTES,
        }
    }

    /// True when `at` is within the buffer of a release at the top of a
    /// news hour.
    pub fn is_news_time(&self, at: DateTime<Utc>) -> bool {
        let local = at.with_timezone(&self.offset);
        let minute = (local.hour() * 60 + local.minute()) as i64;
        self.hours.iter().any(|&h| {
            let release = h as i64 * 60;
            // Compare against the previous/next day too so a buffer that
            // crosses midnight still matches.
            [minute - 1440, minute, minute + 1440]
                .iter()
                .any(|m| (m - release).abs() <= self.buffer_minutes)
        })
    }
}
