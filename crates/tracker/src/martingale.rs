use common::{MartingaleState, Outcome};

use crate::verify::Verdict;

/// Advance a pair's martingale state for one verdict.
///
/// Returns the depth to stamp on the resolved signal together with the
/// pair's next state, or `None` for an `Unknown` verdict (nothing moves).
///
/// A loss deepens the sequence. A confirmed win also deepens it: the trade
/// only paid out on the recovery candle, so the sequence is still live. A
/// direct win ends the sequence: the signal records the depth the sequence
/// had reached, and the stored depth resets to zero.
pub fn apply(state: MartingaleState, verdict: Verdict) -> Option<(u32, MartingaleState)> {
    match verdict {
        Verdict::Loss => {
            let depth = state.depth + 1;
            Some((
                depth,
                MartingaleState {
                    depth,
                    last_outcome: Some(Outcome::Loss),
                    last_confirmed: false,
                },
            ))
        }
        Verdict::Win { confirmed: true } => {
            let depth = state.depth + 1;
            Some((
                depth,
                MartingaleState {
                    depth,
                    last_outcome: Some(Outcome::Win),
                    last_confirmed: true,
                },
            ))
        }
        Verdict::Win { confirmed: false } => Some((
            state.depth,
            MartingaleState {
                depth: 0,
                last_outcome: Some(Outcome::Win),
                last_confirmed: false,
            },
        )),
        Verdict::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn losses_deepen() {
        let (d1, s1) = apply(MartingaleState::default(), Verdict::Loss).unwrap();
        assert_eq!(d1, 1);
        let (d2, s2) = apply(s1, Verdict::Loss).unwrap();
        assert_eq!(d2, 2);
        assert_eq!(s2.depth, 2);
        assert_eq!(s2.last_outcome, Some(Outcome::Loss));
    }

    #[test]
    fn confirmed_win_deepens_and_keeps_the_sequence_alive() {
        let s = MartingaleState { depth: 2, ..Default::default() };
        let (recorded, next) = apply(s, Verdict::Win { confirmed: true }).unwrap();
        assert_eq!(recorded, 3);
        assert_eq!(next.depth, 3);
        assert!(next.last_confirmed);
    }

    #[test]
    fn direct_win_records_then_resets() {
        let s = MartingaleState { depth: 3, ..Default::default() };
        let (recorded, next) = apply(s, Verdict::Win { confirmed: false }).unwrap();
        assert_eq!(recorded, 3);
        assert_eq!(next.depth, 0);
        assert_eq!(next.last_outcome, Some(Outcome::Win));
        assert!(!next.last_confirmed);
    }

    #[test]
    fn unknown_changes_nothing() {
        let s = MartingaleState { depth: 2, ..Default::default() };
        assert_eq!(apply(s, Verdict::Unknown), None);
    }
}
