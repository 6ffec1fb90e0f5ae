//! Plain-text message builders. Everything here is pure so the exact
//! wording can be pinned down in tests.

use common::{Batch, BatchStats, Outcome, Signal};
use signals::PlannedSignal;

fn offset_label(hours: i32) -> String {
    let sign = if hours >= 0 { '+' } else { '-' };
    format!("UTC{sign}{}:00", hours.abs())
}

/// The batch sheet sent right after generation.
pub fn signal_sheet(planned: &[PlannedSignal], broker_utc_offset_hours: i32) -> String {
    let mut out = String::from("🔥 SURESHOT SIGNALS 🔥\n\n");
    out.push_str(&format!(
        "BROKER TIME {}\nM1 TIMEFRAME · 1 STEP MTG\n\n",
        offset_label(broker_utc_offset_hours)
    ));
    for p in planned {
        out.push_str(&format!("{}-OTC,{} M1 {}\n", p.pair, p.time_label, p.direction));
    }
    out.push_str("\n⚠️ Enter exactly at the listed minute.");
    out
}

/// One verified signal, pushed as soon as it resolves. Any win that closed
/// a martingale sequence carries the depth it ended, whether the recovery
/// candle was needed or not.
pub fn result_line(signal: &Signal) -> String {
    let mark = match signal.outcome {
        Some(Outcome::Win) if signal.mtg_depth > 0 || signal.confirmed => {
            format!("✅ MTG{}", signal.mtg_depth)
        }
        Some(Outcome::Win) => "✅".to_string(),
        Some(Outcome::Loss) => "❌".to_string(),
        None => "❓".to_string(),
    };
    format!(
        "{}-OTC,{} M1 {} {}",
        signal.pair, signal.time_label, signal.direction, mark
    )
}

/// On-demand /results report: every resolved member so far, then the
/// statistics block.
pub fn results_report(results: &[Signal], batch: &Batch, stats: &BatchStats) -> String {
    if results.is_empty() {
        return "No results yet, signals are still pending.".to_string();
    }
    let mut out = String::new();
    for signal in results {
        out.push_str(&result_line(signal));
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&batch_summary(batch, stats));
    out
}

/// Final summary, sent exactly once when every member of a batch resolved.
pub fn batch_summary(batch: &Batch, stats: &BatchStats) -> String {
    let mut out = String::from("📊 SESSION RESULTS\n\n");
    out.push_str(&format!("Signals: {}\n", stats.total));
    out.push_str(&format!("Wins: {} ✅\n", stats.wins));
    out.push_str(&format!("Losses: {} ❌\n", stats.losses));
    if stats.unverified > 0 {
        out.push_str(&format!("Unverified: {} ❓\n", stats.unverified));
    }
    out.push_str(&format!("Win rate: {:.1}%\n", stats.win_rate));
    out.push_str(&format!(
        "\nSession started {}",
        batch.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{Direction, SignalSpec, SignalState};

    fn resolved(outcome: Outcome, confirmed: bool, depth: u32) -> Signal {
        let mut s = Signal::from_spec(
            SignalSpec {
                pair: "EURUSD".into(),
                direction: Direction::Call,
                scheduled_at: Utc::now(),
                time_label: "14:08".into(),
                entry_price: Some(1.1),
            },
            None,
            None,
            None,
            Utc::now(),
        );
        s.state = SignalState::Resolved;
        s.outcome = Some(outcome);
        s.confirmed = confirmed;
        s.mtg_depth = depth;
        s
    }

    #[test]
    fn result_lines() {
        assert_eq!(
            result_line(&resolved(Outcome::Win, false, 0)),
            "EURUSD-OTC,14:08 M1 CALL ✅"
        );
        assert_eq!(
            result_line(&resolved(Outcome::Win, true, 2)),
            "EURUSD-OTC,14:08 M1 CALL ✅ MTG2"
        );
        // A direct win that ends a loss sequence still shows the depth.
        assert_eq!(
            result_line(&resolved(Outcome::Win, false, 2)),
            "EURUSD-OTC,14:08 M1 CALL ✅ MTG2"
        );
        assert_eq!(
            result_line(&resolved(Outcome::Loss, false, 1)),
            "EURUSD-OTC,14:08 M1 CALL ❌"
        );
    }

    #[test]
    fn sheet_lists_signals_in_order() {
        let planned = vec![
            PlannedSignal {
                pair: "EURUSD".into(),
                direction: Direction::Call,
                scheduled_at: Utc::now(),
                time_label: "14:08".into(),
            },
            PlannedSignal {
                pair: "GBPUSD".into(),
                direction: Direction::Put,
                scheduled_at: Utc::now(),
                time_label: "14:16".into(),
            },
        ];
        let sheet = signal_sheet(&planned, 6);
        assert!(sheet.contains("UTC+6:00"));
        let call = sheet.find("EURUSD-OTC,14:08 M1 CALL").unwrap();
        let put = sheet.find("GBPUSD-OTC,14:16 M1 PUT").unwrap();
        assert!(call < put);
    }

    #[test]
    fn summary_shows_the_rates() {
        let batch = Batch {
            id: "b".into(),
            signal_ids: vec!["a".into(), "b".into(), "c".into()],
            user_id: None,
            chat_id: None,
            created_at: Utc::now(),
            notified: true,
        };
        let stats = BatchStats {
            total: 3,
            wins: 2,
            losses: 1,
            unverified: 0,
            win_rate: 66.666,
            loss_rate: 33.333,
        };
        let text = batch_summary(&batch, &stats);
        assert!(text.contains("Signals: 3"));
        assert!(text.contains("Wins: 2"));
        assert!(text.contains("Win rate: 66.7%"));
        assert!(!text.contains("Unverified"));
    }

    #[test]
    fn results_report_lists_lines_then_stats() {
        let batch = Batch {
            id: "b".into(),
            signal_ids: vec!["a".into()],
            user_id: None,
            chat_id: None,
            created_at: Utc::now(),
            notified: false,
        };
        let stats = BatchStats {
            total: 1,
            wins: 1,
            losses: 0,
            unverified: 0,
            win_rate: 100.0,
            loss_rate: 0.0,
        };
        let results = vec![resolved(Outcome::Win, false, 0)];
        let text = results_report(&results, &batch, &stats);
        let line = text.find("EURUSD-OTC,14:08 M1 CALL ✅").unwrap();
        let summary = text.find("📊 SESSION RESULTS").unwrap();
        assert!(line < summary);

        assert_eq!(
            results_report(&[], &batch, &stats),
            "No results yet, signals are still pending."
        );
    }

    #[test]
    fn negative_offsets_format_correctly() {
        assert_eq!(offset_label(-3), "UTC-3:00");
        assert_eq!(offset_label(0), "UTC+0:00");
    }
}
