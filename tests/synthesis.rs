use std::collections::BTreeSet;

use RustPNS::analysis::{is_isomorphic, reachability_lts};
use RustPNS::net::Net;
use RustPNS::report::separation_failure_points;
use RustPNS::solver::CancelToken;
use RustPNS::synthesis::{
    ExecutionMode, MAX_BOUND, PNProperties, Region, SynthesisError, SynthesisOptions, SynthesizePN,
    net_from_regions,
};
use RustPNS::ts::{TransitionSystem, Word, WordSystem, parse_ts};

const LONG_WORD: &str = "b b a b b b b b a b b b b b b a b b b b b b";

fn single_arc() -> TransitionSystem {
    parse_ts(".states\ns[initial] t\n.arcs\ns a t\n").unwrap()
}

fn non_deterministic() -> TransitionSystem {
    parse_ts(".states\ns0[initial] s1 s2\n.arcs\ns0 a s1\ns0 a s2\n").unwrap()
}

fn assert_round_trip(ts: &TransitionSystem, synth: &SynthesizePN) {
    assert!(synth.was_successfully_separated());
    let (reachable, truncated) = reachability_lts(&synth.petri_net(), Some(1_000));
    assert!(!truncated);
    assert!(is_isomorphic(ts, &reachable));
}

fn failure_count(synth: &SynthesizePN) -> usize {
    synth.failed_state_separation_problems().len()
        + synth.failed_event_state_separation_problems().len()
}

#[test]
fn no_regions_give_the_empty_net() {
    let net = net_from_regions::<Region>(&[]);
    assert_eq!(net, Net::empty());
    assert_eq!(net.arcs_len(), 0);
}

#[test]
fn isolated_states_need_no_places() {
    let ts = parse_ts(".states\ns0[initial] s1\n").unwrap();
    let synth = SynthesizePN::new(&ts, PNProperties::new()).unwrap();
    assert!(synth.was_successfully_separated());
    assert!(synth.separating_regions().is_empty());

    let net = synth.petri_net();
    assert_eq!(net.transitions_len(), 0);
    assert_eq!(net.places_len(), 0);
    assert_eq!(net.arcs_len(), 0);
}

#[test]
fn single_arc_round_trips() {
    let ts = single_arc();
    let synth = SynthesizePN::new(&ts, PNProperties::new()).unwrap();
    let net = synth.petri_net();
    assert_eq!(net.transitions_len(), 1);
    assert!(net.transition_by_name("a").is_some());
    assert_round_trip(&ts, &synth);
}

#[test]
fn non_deterministic_choice_cannot_be_separated() {
    let ts = non_deterministic();
    let synth = SynthesizePN::new(&ts, PNProperties::new()).unwrap();

    assert!(!synth.was_successfully_separated());
    assert!(!synth.separating_regions().is_empty());
    let expected: BTreeSet<_> = [
        ts.state_by_name("s1").unwrap(),
        ts.state_by_name("s2").unwrap(),
    ]
    .into_iter()
    .collect();
    assert_eq!(synth.failed_state_separation_problems(), &[expected]);
    assert!(synth.failed_event_state_separation_problems().is_empty());
}

#[test]
fn long_word_round_trips() {
    let word: Word = LONG_WORD.parse().unwrap();
    let words = WordSystem::new(&word);
    for properties in [PNProperties::new(), PNProperties::new().pure()] {
        let synth = SynthesizePN::new(words.ts(), properties).unwrap();
        assert_round_trip(words.ts(), &synth);
        assert_eq!(separation_failure_points(&words, &synth), None);
        if synth.properties().is_pure() {
            for region in synth.separating_regions() {
                let (backward, forward) = (region.backward(), region.forward());
                assert!(backward.iter().zip(forward).all(|(b, f)| *b == 0 || *f == 0));
            }
        }
    }
}

#[test]
fn repeated_runs_agree() {
    let ts = non_deterministic();
    let first = SynthesizePN::new(&ts, PNProperties::new().plain()).unwrap();
    let second = SynthesizePN::new(&ts, PNProperties::new().plain()).unwrap();

    assert_eq!(
        first.separating_regions().iter().collect::<Vec<_>>(),
        second.separating_regions().iter().collect::<Vec<_>>()
    );
    assert_eq!(
        first.failed_state_separation_problems(),
        second.failed_state_separation_problems()
    );
    assert_eq!(
        first.failed_event_state_separation_problems(),
        second.failed_event_state_separation_problems()
    );
    assert_eq!(first.petri_net(), second.petri_net());
}

#[test]
fn stricter_properties_never_fail_less() {
    let words = WordSystem::new(&Word::new(["a", "a", "b", "a"]));
    let ladder = [
        PNProperties::new(),
        PNProperties::new().safe(),
        PNProperties::new().safe().pure(),
    ];
    let counts: Vec<usize> = ladder
        .iter()
        .map(|properties| failure_count(&SynthesizePN::new(words.ts(), *properties).unwrap()))
        .collect();
    assert!(counts.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn parallel_run_matches_sequential() {
    let word: Word = LONG_WORD.parse().unwrap();
    let ts = WordSystem::new(&word).ts().clone();
    let sequential = SynthesizePN::new(&ts, PNProperties::new()).unwrap();
    let parallel = SynthesizePN::with_options(
        &ts,
        PNProperties::new(),
        SynthesisOptions {
            mode: ExecutionMode::Parallel { threads: 4 },
            ..SynthesisOptions::default()
        },
    )
    .unwrap();

    assert_eq!(
        sequential.was_successfully_separated(),
        parallel.was_successfully_separated()
    );
    assert_eq!(sequential.separating_regions(), parallel.separating_regions());
    assert_round_trip(&ts, &parallel);
}

#[test]
fn parallel_run_reports_the_same_failures() {
    let words = WordSystem::new(&Word::new(["a", "a"]));
    let cases = [
        (non_deterministic(), PNProperties::new()),
        (words.ts().clone(), PNProperties::new().safe()),
    ];
    for (ts, properties) in cases {
        let sequential = SynthesizePN::new(&ts, properties).unwrap();
        let parallel = SynthesizePN::with_options(
            &ts,
            properties,
            SynthesisOptions {
                mode: ExecutionMode::Parallel { threads: 3 },
                ..SynthesisOptions::default()
            },
        )
        .unwrap();

        assert!(!parallel.was_successfully_separated());
        assert!(failure_count(&parallel) > 0);
        assert_eq!(
            sequential.was_successfully_separated(),
            parallel.was_successfully_separated()
        );
        assert_eq!(
            sequential.failed_state_separation_problems(),
            parallel.failed_state_separation_problems()
        );
        assert_eq!(
            sequential.failed_event_state_separation_problems(),
            parallel.failed_event_state_separation_problems()
        );
    }
}

#[test]
fn cancelled_run_reports_cancellation() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let result = SynthesizePN::with_options(
        &single_arc(),
        PNProperties::new(),
        SynthesisOptions {
            cancel,
            ..SynthesisOptions::default()
        },
    );
    assert!(matches!(result, Err(SynthesisError::Cancelled)));
}

#[test]
fn zero_bounds_are_rejected() {
    let err = SynthesizePN::new(&single_arc(), PNProperties::new().k_bounded(0)).unwrap_err();
    assert_eq!(
        err,
        SynthesisError::InvalidBound {
            property: "k-bounded",
            value: 0
        }
    );
    assert!(err.is_configuration_error());

    let err = SynthesizePN::new(&single_arc(), PNProperties::new().k_marking(0)).unwrap_err();
    assert!(matches!(err, SynthesisError::InvalidBound { property: "k-marking", .. }));
}

#[test]
fn oversized_bounds_are_rejected() {
    let properties: PNProperties = "18446744073709551615-bounded".parse().unwrap();
    let err = SynthesizePN::new(&single_arc(), properties).unwrap_err();
    assert_eq!(
        err,
        SynthesisError::InvalidBound {
            property: "k-bounded",
            value: u64::MAX
        }
    );
    assert!(err.is_configuration_error());

    let err = SynthesizePN::new(&single_arc(), PNProperties::new().k_bounded(1 << 62)).unwrap_err();
    assert!(err.is_configuration_error());

    let synth = SynthesizePN::new(&single_arc(), PNProperties::new().k_bounded(MAX_BOUND)).unwrap();
    assert_round_trip(&single_arc(), &synth);
}

#[test]
fn missing_initial_state_is_rejected() {
    let ts = parse_ts(".states\ns0 s1\n").unwrap();
    let err = SynthesizePN::new(&ts, PNProperties::new()).unwrap_err();
    assert_eq!(err, SynthesisError::MissingInitialState);
}

#[test]
fn distributed_needs_locations() {
    let without = parse_ts(".states\ns0[initial] s1\n.arcs\ns0 a s1\ns1 b s0\n").unwrap();
    let err = SynthesizePN::new(&without, PNProperties::new().distributed()).unwrap_err();
    assert!(matches!(err, SynthesisError::MissingLocation { .. }));

    let with = parse_ts(
        ".states\ns0[initial] s1\n.arcs\ns0 a s1\ns1 b s0\n.locations\na left\nb right\n",
    )
    .unwrap();
    let synth = SynthesizePN::new(&with, PNProperties::new().distributed()).unwrap();
    assert_round_trip(&with, &synth);
    for region in synth.separating_regions() {
        let consumers: BTreeSet<_> = region
            .backward()
            .iter()
            .enumerate()
            .filter(|(_, weight)| **weight > 0)
            .filter_map(|(event, _)| synth.utility().event_location(event))
            .collect();
        assert!(consumers.len() <= 1);
    }
}

#[test]
fn failure_points_mark_the_unstoppable_event() {
    let words = WordSystem::new(&Word::new(["a", "a"]));
    let synth = SynthesizePN::new(words.ts(), PNProperties::new().safe()).unwrap();
    assert_eq!(
        separation_failure_points(&words, &synth).as_deref(),
        Some("a, a [a]; unseparated {0, 1} {0, 2} {1, 2}")
    );
}
