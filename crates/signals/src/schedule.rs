use std::collections::HashMap;

use chrono::{DateTime, Duration, Timelike, Utc};
use common::{Candle, Direction, SignalSpec};
use tracing::debug;

use crate::news::{broker_offset, NewsFilter};
use crate::scorer::score;
use crate::PAIRS;

/// Batch planning knobs, normally taken from `Config`.
#[derive(Debug, Clone)]
pub struct ScheduleParams {
    /// Trade slots to attempt per batch.
    pub target: usize,
    /// Minutes between consecutive slots; the first slot is one interval
    /// after `now`.
    pub interval_minutes: i64,
    /// Broker UTC offset in whole hours, used for the printed time labels.
    pub broker_utc_offset_hours: i32,
}

impl Default for ScheduleParams {
    fn default() -> Self {
        Self {
            target: 30,
            interval_minutes: 8,
            broker_utc_offset_hours: 6,
        }
    }
}

/// One planned trade: a pair, a direction and a minute-aligned entry time.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSignal {
    pub pair: String,
    pub direction: Direction,
    pub scheduled_at: DateTime<Utc>,
    /// Broker-local "%H:%M" label shown to the user.
    pub time_label: String,
}

impl PlannedSignal {
    pub fn into_spec(self, entry_price: Option<f64>) -> SignalSpec {
        SignalSpec {
            pair: self.pair,
            direction: self.direction,
            scheduled_at: self.scheduled_at,
            time_label: self.time_label,
            entry_price,
        }
    }
}

/// Plan a batch of future signals from per-pair candle history.
///
/// Slots are spaced `interval_minutes` apart starting one interval after
/// `now`. Pairs rotate so no single pair dominates; when the slot's pair
/// has no scoreable setup, the remaining pairs are tried in rotation order
/// before the slot is dropped. Slots inside news windows are dropped
/// outright. The result is ordered by entry time and may hold fewer than
/// `params.target` entries.
pub fn plan_batch(
    data: &HashMap<String, Vec<Candle>>,
    now: DateTime<Utc>,
    params: &ScheduleParams,
    news: &NewsFilter,
) -> Vec<PlannedSignal> {
    let offset = broker_offset(params.broker_utc_offset_hours);
    let mut planned = Vec::with_capacity(params.target);
    let mut rotation = 0usize;

    for slot in 0..params.target {
        let at = now + Duration::minutes(params.interval_minutes * (slot as i64 + 1));
        let at = at
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(at);

        if news.is_news_time(at) {
            debug!(slot, at = %at, "slot dropped, news window");
            continue;
        }

        let mut chosen = None;
        for i in 0..PAIRS.len() {
            let pair = PAIRS[(rotation + i) % PAIRS.len()];
            let Some(candles) = data.get(pair) else { continue };
            if let Some(direction) = score(candles) {
                chosen = Some((pair, direction));
                rotation = (rotation + i + 1) % PAIRS.len();
                break;
            }
        }

        let Some((pair, direction)) = chosen else {
            debug!(slot, "slot dropped, no pair scored");
            continue;
        };

        planned.push(PlannedSignal {
            pair: pair.to_string(),
            direction,
            scheduled_at: at,
            time_label: at.with_timezone(&offset).format("%H:%M").to_string(),
        });
    }

    planned.sort_by_key(|p| p.scheduled_at);
    planned
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn uptrend() -> Vec<Candle> {
        (0..60)
            .map(|i| {
                let close = 100.0 * 1.005f64.powi(i);
                Candle {
                    epoch: i as i64 * 60,
                    open: close,
                    high: close * 1.0005,
                    low: close * 0.9995,
                    close,
                }
            })
            .collect()
    }

    fn flat() -> Vec<Candle> {
        (0..60)
            .map(|i| Candle {
                epoch: i as i64 * 60,
                open: 1.1,
                high: 1.1,
                low: 1.1,
                close: 1.1,
            })
            .collect()
    }

    fn all_uptrend() -> HashMap<String, Vec<Candle>> {
        PAIRS.iter().map(|p| (p.to_string(), uptrend())).collect()
    }

    // 04:00 broker time: thirty 8-minute slots (04:08 through 08:00) sit
    // between the night and afternoon news windows.
    fn quiet_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 4, 0, 0).unwrap()
    }

    fn params() -> ScheduleParams {
        ScheduleParams {
            broker_utc_offset_hours: 0,
            ..ScheduleParams::default()
        }
    }

    #[test]
    fn fills_every_slot_when_all_pairs_score() {
        let plan = plan_batch(&all_uptrend(), quiet_now(), &params(), &NewsFilter::new(0));
        assert_eq!(plan.len(), 30);
        assert!(plan.windows(2).all(|w| w[0].scheduled_at < w[1].scheduled_at));
        assert_eq!(plan[0].time_label, "04:08");
        assert_eq!(plan[1].time_label, "04:16");
    }

    #[test]
    fn pairs_rotate_across_slots() {
        let plan = plan_batch(&all_uptrend(), quiet_now(), &params(), &NewsFilter::new(0));
        assert_eq!(plan[0].pair, "EURUSD");
        assert_eq!(plan[1].pair, "GBPUSD");
        assert_eq!(plan[PAIRS.len()].pair, "EURUSD");
    }

    #[test]
    fn falls_back_to_the_next_pair() {
        let mut data = all_uptrend();
        data.insert("EURUSD".into(), flat());
        let plan = plan_batch(&data, quiet_now(), &params(), &NewsFilter::new(0));
        assert_eq!(plan.len(), 30);
        assert_eq!(plan[0].pair, "GBPUSD");
    }

    #[test]
    fn no_setups_means_empty_plan() {
        let data: HashMap<String, Vec<Candle>> =
            PAIRS.iter().map(|p| (p.to_string(), flat())).collect();
        let plan = plan_batch(&data, quiet_now(), &params(), &NewsFilter::new(0));
        assert!(plan.is_empty());
    }

    #[test]
    fn news_windows_drop_slots() {
        // 13:00 start: the slots that land within 15 minutes of the 14:00
        // through 17:00 releases are dropped, the mid-hour ones survive.
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 13, 0, 0).unwrap();
        let news = NewsFilter::new(0);
        let plan = plan_batch(&all_uptrend(), now, &params(), &news);
        assert!(!plan.is_empty());
        assert!(plan.len() < 30);
        assert!(plan.iter().all(|p| !news.is_news_time(p.scheduled_at)));
    }

    #[test]
    fn labels_use_the_broker_offset() {
        // 04:08 UTC is 10:08 at a +6 broker.
        let p = ScheduleParams {
            broker_utc_offset_hours: 6,
            ..ScheduleParams::default()
        };
        let plan = plan_batch(&all_uptrend(), quiet_now(), &p, &NewsFilter::new(6));
        assert_eq!(plan[0].time_label, "10:08");
    }
}
