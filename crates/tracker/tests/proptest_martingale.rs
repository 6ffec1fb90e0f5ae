use common::MartingaleState;
use proptest::prelude::*;
use tracker::martingale;
use tracker::Verdict;

fn verdicts() -> impl Strategy<Value = Verdict> {
    prop_oneof![
        Just(Verdict::Win { confirmed: false }),
        Just(Verdict::Win { confirmed: true }),
        Just(Verdict::Loss),
        Just(Verdict::Unknown),
    ]
}

proptest! {
    /// Over any verdict sequence: losses and confirmed wins deepen by one,
    /// a direct win records the depth it ended and resets to zero, and an
    /// unknown verdict never moves the state.
    #[test]
    fn depth_follows_the_sequence(seq in prop::collection::vec(verdicts(), 0..64)) {
        let mut state = MartingaleState::default();
        for v in seq {
            match martingale::apply(state, v) {
                None => prop_assert_eq!(v, Verdict::Unknown),
                Some((recorded, next)) => {
                    match v {
                        Verdict::Loss | Verdict::Win { confirmed: true } => {
                            prop_assert_eq!(recorded, state.depth + 1);
                            prop_assert_eq!(next.depth, state.depth + 1);
                        }
                        Verdict::Win { confirmed: false } => {
                            prop_assert_eq!(recorded, state.depth);
                            prop_assert_eq!(next.depth, 0);
                        }
                        Verdict::Unknown => prop_assert!(false, "unknown produced a transition"),
                    }
                    state = next;
                }
            }
        }
    }

    /// The recorded depth never exceeds the number of verdicts seen so far.
    #[test]
    fn depth_is_bounded_by_history(seq in prop::collection::vec(verdicts(), 1..64)) {
        let mut state = MartingaleState::default();
        for (i, v) in seq.into_iter().enumerate() {
            if let Some((recorded, next)) = martingale::apply(state, v) {
                prop_assert!(recorded as usize <= i + 1);
                state = next;
            }
        }
    }
}
