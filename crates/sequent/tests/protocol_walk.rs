//! Full narrative walk: reset → start scan → collect three advertising
//! reports → stop scan, driven one event at a time.

mod common;
use common::*;

use pretty_assertions::assert_eq;
use sequent::{Check, Completion, Dispatcher, Flow, Outcome, Protocol, Rule, Sequence, codes};

fn observe(seq: &mut Sequence<'_, Harness>, ctx: &mut Harness) -> Flow {
    if seq.step() {
        seq.perform_named(send_reset, (), "send_reset");
        seq.until_event(Check::ResetReason(codes::REASON_HOST_RESET));
        return seq.advance();
    }
    if seq.step() {
        seq.perform_named(start_scan, (), "start_scan");
        seq.until_event(Check::Event(codes::EVT_COMMAND_COMPLETE));
        return seq.advance();
    }
    if seq.step() {
        if ctx.reports < 3 {
            seq.expect(
                Check::Subevent(codes::SUB_LE_ADVERTISING_REPORT),
                record_report,
                (),
            );
            seq.until_event(Check::Subevent(codes::SUB_LE_ADVERTISING_REPORT));
            return seq.repeat_while(true);
        }
        // Enough reports: nothing to configure here, move straight on.
        seq.advance_now();
    }
    if seq.step() {
        seq.perform_named(stop_scan, (), "stop_scan");
        return seq.advance();
    }
    seq.finish()
}

#[test]
fn observe_walks_reset_scan_collect_stop() {
    init_tracing();
    let mut dispatcher: Dispatcher<Harness> = Dispatcher::new();
    let mut harness = Harness::default();

    dispatcher.start_protocol(Protocol::new("observe", observe));
    assert!(dispatcher.is_running());

    // Any event completes the empty initial production and configures step 0.
    assert_eq!(
        dispatcher.on_event(&mut harness, &kick()),
        Outcome::Done(Completion::Fulfilled)
    );
    assert!(harness.commands.is_empty());

    // The reset perform runs on the next event; its until has not held yet.
    assert_eq!(
        dispatcher.on_event(&mut harness, &command_complete()),
        Outcome::NoMatch
    );
    assert_eq!(harness.commands, vec!["reset"]);

    // HAL comes back up: step 0 done, step 1 stages the scan command.
    assert_eq!(
        dispatcher
            .on_event(&mut harness, &hal_initialized(codes::REASON_HOST_RESET)),
        Outcome::Done(Completion::Fulfilled)
    );

    // Scan perform and its command-complete until land on the same event.
    assert_eq!(
        dispatcher.on_event(&mut harness, &command_complete()),
        Outcome::Done(Completion::Fulfilled)
    );
    assert_eq!(harness.commands, vec!["reset", "scan_on"]);

    // Three reports, one production each (the collect step repeats).
    for expected in 1..=3u32 {
        assert_eq!(
            dispatcher.on_event(&mut harness, &adv_report()),
            Outcome::Done(Completion::Fulfilled)
        );
        assert_eq!(harness.reports, expected);
        assert!(dispatcher.is_running());
    }

    // Stop-scan perform runs, its single-shot production completes, and the
    // terminal clears the protocol.
    assert_eq!(
        dispatcher.on_event(&mut harness, &kick()),
        Outcome::Done(Completion::Fulfilled)
    );
    assert_eq!(harness.commands, vec!["reset", "scan_on", "scan_off"]);
    assert!(!dispatcher.is_running());
    assert!(dispatcher.engine().rules().normal().is_empty());
    assert!(dispatcher.engine().rules().exclusive().is_empty());
}

#[test]
fn step_counter_only_moves_on_completed_productions() {
    init_tracing();
    let mut dispatcher: Dispatcher<Harness> = Dispatcher::new();
    let mut harness = Harness::default();

    dispatcher.start_protocol(Protocol::new("observe", observe));
    dispatcher.on_event(&mut harness, &kick());

    // The reset until never holds for these: the body must not be re-entered
    // and the perform must not re-run, however many events drift past.
    for _ in 0..5 {
        let out = dispatcher.on_event(&mut harness, &command_complete());
        assert_eq!(out, Outcome::NoMatch);
    }
    assert_eq!(harness.commands, vec!["reset"]);

    // The narrative still resumes exactly where it paused.
    dispatcher.on_event(&mut harness, &hal_initialized(codes::REASON_HOST_RESET));
    dispatcher.on_event(&mut harness, &command_complete());
    assert_eq!(harness.commands, vec!["reset", "scan_on"]);
}

#[test]
fn global_traps_survive_and_never_count_as_expectations() {
    init_tracing();
    fn any_event(_: &sequent::Packet<'_>) -> bool {
        true
    }
    let mut dispatcher: Dispatcher<Harness> = Dispatcher::new();
    let mut harness = Harness::default();
    dispatcher
        .add_global(Rule::on(Check::Condition(any_event), record_unexpected))
        .unwrap();

    dispatcher.start_protocol(Protocol::new("observe", observe));
    // Initial kick has no normal/exclusive rules: the trap sees it.
    dispatcher.on_event(&mut harness, &kick());
    assert_eq!(harness.events, vec!["unexpected"]);
    assert!(!dispatcher.met_expectations());

    // While the reset production waits, unmatched traffic keeps hitting the
    // trap without disturbing the narrative.
    dispatcher.on_event(&mut harness, &command_complete());
    assert_eq!(harness.events, vec!["unexpected", "unexpected"]);
    assert_eq!(harness.commands, vec!["reset"]);
    assert!(dispatcher.is_running());

    // Globals outlive productions until explicitly cleared.
    assert_eq!(dispatcher.engine().rules().global().len(), 1);
    dispatcher.clear_globals();
    assert!(dispatcher.engine().rules().global().is_empty());
}
