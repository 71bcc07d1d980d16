//! Property-based integration tests for the invalidation coalescer.
//!
//! These tests verify that universal properties hold across all valid
//! schedule sequences, using the `proptest` crate for random test case
//! generation. The debounce window is set far out and `flush` drives the
//! sweep, so the properties are independent of timing.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use crm_realtime_core::coalescer::{CoalescerConfig, InvalidationCoalescer, SweepSummary};
use crm_realtime_core::events::{CollectionId, Namespace, RecordingInvalidationSink};
use crm_realtime_core::fanout::crm_default_fanout;

// =============================================================================
// Generators
// =============================================================================

/// Generates a random watched collection.
fn arb_collection() -> impl Strategy<Value = CollectionId> {
    prop_oneof![
        Just(CollectionId::Accounts),
        Just(CollectionId::Contacts),
        Just(CollectionId::Leads),
        Just(CollectionId::Deals),
        Just(CollectionId::Meetings),
        Just(CollectionId::Tasks),
    ]
}

/// Generates a random set of namespace names from the stock fan-out.
fn arb_failing_namespaces() -> impl Strategy<Value = HashSet<&'static str>> {
    prop::collection::hash_set(
        prop_oneof![
            Just("accounts"),
            Just("contacts"),
            Just("leads"),
            Just("deals"),
            Just("meetings"),
            Just("tasks"),
        ],
        0..4,
    )
}

/// The sorted, deduplicated namespace union the stock fan-out produces for
/// the distinct collections in `schedules`.
fn expected_union(schedules: &[CollectionId]) -> Vec<Namespace> {
    let fanout = crm_default_fanout();
    let mut union: BTreeSet<Namespace> = BTreeSet::new();
    for collection in schedules.iter().copied().collect::<BTreeSet<_>>() {
        union.extend(fanout.get(&collection).unwrap().iter().cloned());
    }
    union.into_iter().collect()
}

fn far_window_config() -> CoalescerConfig {
    CoalescerConfig {
        debounce_window: Duration::from_secs(3600),
        ..Default::default()
    }
}

/// Schedules every collection once, flushes, and returns the recorded sink
/// calls together with the sweep summary.
fn schedule_and_flush(
    schedules: &[CollectionId],
    failing: &HashSet<&'static str>,
) -> (Vec<Namespace>, SweepSummary) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();

    runtime.block_on(async {
        let sink = Arc::new(RecordingInvalidationSink::new());
        for namespace in failing {
            sink.fail_on(*namespace);
        }
        let coalescer = InvalidationCoalescer::new(far_window_config(), sink.clone()).unwrap();

        for collection in schedules {
            coalescer.schedule(*collection);
        }
        let summary = coalescer.flush().await;
        (sink.calls(), summary)
    })
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// Any sequence of schedules within one window sweeps once, touching
    /// exactly the sorted union of the scheduled collections' fan-outs,
    /// each namespace exactly once.
    #[test]
    fn prop_sweep_invalidates_exactly_the_sorted_union(
        schedules in prop::collection::vec(arb_collection(), 1..200)
    ) {
        let (calls, summary) = schedule_and_flush(&schedules, &HashSet::new());

        let expected = expected_union(&schedules);
        prop_assert_eq!(calls, expected.clone());
        prop_assert_eq!(summary.invalidated, expected);
        prop_assert!(summary.failures.is_empty());
    }

    /// A sweep drains the pending set: an immediately following flush is a
    /// no-op with zero sink calls.
    #[test]
    fn prop_flush_drains_pending_state(
        schedules in prop::collection::vec(arb_collection(), 1..50)
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        let (calls_after_first, second_len, second_empty) = runtime.block_on(async {
            let sink = Arc::new(RecordingInvalidationSink::new());
            let coalescer =
                InvalidationCoalescer::new(far_window_config(), sink.clone()).unwrap();

            for collection in &schedules {
                coalescer.schedule(*collection);
            }
            coalescer.flush().await;
            let after_first = sink.len();

            let second = coalescer.flush().await;
            (after_first, sink.len(), second.is_empty())
        });

        prop_assert!(second_empty);
        prop_assert_eq!(second_len, calls_after_first);
    }

    /// Sink failures never abort a batch: every namespace of the union is
    /// attempted, and the invalidated/failed sets partition it.
    #[test]
    fn prop_failures_do_not_abort_the_batch(
        schedules in prop::collection::vec(arb_collection(), 1..50),
        failing in arb_failing_namespaces()
    ) {
        let (calls, summary) = schedule_and_flush(&schedules, &failing);

        let expected = expected_union(&schedules);
        prop_assert_eq!(calls, expected.clone());

        let mut outcome: Vec<Namespace> = summary
            .invalidated
            .iter()
            .chain(summary.failures.iter().map(|f| &f.namespace))
            .cloned()
            .collect();
        outcome.sort();
        prop_assert_eq!(outcome, expected);

        for failure in &summary.failures {
            prop_assert!(failing.contains(failure.namespace.as_str()));
        }
    }
}
