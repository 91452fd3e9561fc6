// File: voucherbot-core/tests/command_tests.rs

use std::sync::Arc;
use std::time::Duration;

use voucherbot_common::models::{CheckOutcome, Notice, SessionId, VoucherValue};
use voucherbot_core::services::command_service::{
    ButtonAction, CommandReply, CHECK_USAGE, PAUSE_USAGE, PROTECT_USAGE,
};
use voucherbot_core::Error;

mod test_utils;
use test_utils::helpers::{codes, fast_protection, Harness, ScriptedChecker};

fn harness() -> Harness {
    let checker = ScriptedChecker::new(&[
        ("SVH1234AB", CheckOutcome::Alive),
        ("SVA0000ZZ", CheckOutcome::Alive),
        ("XYZ99999", CheckOutcome::NetworkError),
    ]);
    Harness::new(Arc::new(checker), fast_protection())
}

#[tokio::test]
async fn test_add_reports_added_and_skipped() -> Result<(), Error> {
    let h = harness();
    let svc = h.commands(true);
    let sid = SessionId::from("s1");

    svc.handle_text(&sid, "/add SVH1234AB").await?;
    let reply = svc.handle_text(&sid, "/add svh1234ab, SVC5678CD\nSVD1111QQ").await?;

    let CommandReply::Added(outcome) = reply else {
        panic!("unexpected reply {reply:?}");
    };
    assert_eq!(outcome.added, codes(&["SVC5678CD", "SVD1111QQ"]));
    assert_eq!(outcome.skipped, codes(&["SVH1234AB"]));
    assert_eq!(outcome.total, 3);
    Ok(())
}

#[tokio::test]
async fn test_missing_arguments_give_usage_without_mutation() -> Result<(), Error> {
    let h = harness();
    let svc = h.commands(true);
    let sid = SessionId::from("s1");

    assert_eq!(svc.handle_text(&sid, "/check abc").await?, CommandReply::Usage(CHECK_USAGE));
    assert_eq!(svc.handle_text(&sid, "/pause").await?, CommandReply::Usage(PAUSE_USAGE));
    assert!(matches!(svc.handle_text(&sid, "/protect").await?, CommandReply::Usage(_)));
    assert_eq!(h.store.counts(&sid), (0, 0));
    assert!(!h.supervisor.is_running(&sid));
    Ok(())
}

#[tokio::test]
async fn test_protect_starts_loop_then_joins_the_running_one() -> Result<(), Error> {
    let h = harness();
    let svc = h.commands(true);
    let sid = SessionId::from("s1");

    let reply = svc.handle_text(&sid, "/protect SVH1234AB SVC5678CD").await?;
    let CommandReply::ProtectionStarted { added, active, scan_estimate, cycle_estimate } = reply else {
        panic!("unexpected reply {reply:?}");
    };
    assert_eq!(added.map(|a| a.added.len()), Some(2));
    assert_eq!(active, 2);
    assert_eq!(scan_estimate, Duration::from_secs(3));
    assert_eq!(cycle_estimate, scan_estimate + fast_protection().interval);
    assert!(h.supervisor.is_running(&sid));

    let reply = svc.handle_text(&sid, "/protect SVC5678CD SVG4444RR").await?;
    let CommandReply::AddedToRunningLoop(outcome) = reply else {
        panic!("unexpected reply {reply:?}");
    };
    assert_eq!(outcome.added, codes(&["SVG4444RR"]));
    assert_eq!(outcome.skipped, codes(&["SVC5678CD"]));

    assert_eq!(svc.handle_text(&sid, "/stop").await?, CommandReply::Stopped);
    assert_eq!(svc.handle_text(&sid, "/stop").await?, CommandReply::NotRunning);
    Ok(())
}

#[tokio::test]
async fn test_run_needs_codes_and_refuses_a_second_loop() -> Result<(), Error> {
    let h = harness();
    let svc = h.commands(true);
    let sid = SessionId::from("s1");

    assert_eq!(svc.handle_text(&sid, "/run").await?, CommandReply::NothingToProtect);

    svc.handle_text(&sid, "/add SVH1234AB").await?;
    assert!(matches!(
        svc.handle_text(&sid, "/run").await?,
        CommandReply::ProtectionStarted { added: None, active: 1, .. }
    ));
    assert_eq!(svc.handle_text(&sid, "/run").await?, CommandReply::AlreadyRunning);

    h.supervisor.stop(&sid);
    Ok(())
}

#[tokio::test]
async fn test_pause_resume_and_unknown_codes() -> Result<(), Error> {
    let h = harness();
    let svc = h.commands(true);
    let sid = SessionId::from("s1");
    svc.handle_text(&sid, "/add SVH1234AB SVC5678CD").await?;

    assert_eq!(
        svc.handle_text(&sid, "/pause svh1234ab").await?,
        CommandReply::Paused("SVH1234AB".into())
    );
    assert_eq!(h.store.counts(&sid), (2, 1));

    assert_eq!(
        svc.handle_text(&sid, "/resume NOPE12345").await?,
        CommandReply::UnknownCode("NOPE12345".into())
    );
    assert_eq!(h.store.counts(&sid), (2, 1));

    assert_eq!(
        svc.handle_text(&sid, "/resume SVH1234AB").await?,
        CommandReply::Resumed("SVH1234AB".into())
    );
    assert_eq!(h.store.counts(&sid), (2, 2));
    Ok(())
}

#[tokio::test]
async fn test_list_status_and_clear() -> Result<(), Error> {
    let h = harness();
    let svc = h.commands(false);
    let sid = SessionId::from("s1");
    svc.handle_text(&sid, "/add SVH1234AB XYZ99999").await?;
    svc.handle_text(&sid, "/pause XYZ99999").await?;

    let CommandReply::Listing(listing) = svc.handle_text(&sid, "/list").await? else {
        panic!("expected a listing");
    };
    assert_eq!(listing.codes.len(), 2);
    assert_eq!(listing.codes[0].value, VoucherValue::Known(4000));
    assert_eq!(listing.codes[1].value, VoucherValue::Unknown);
    assert!(listing.codes[1].paused);
    assert!(!listing.running);

    let CommandReply::Status(status) = svc.handle_text(&sid, "/status").await? else {
        panic!("expected a status");
    };
    assert_eq!((status.total, status.active, status.paused), (2, 1, 1));
    assert!(!status.running);
    assert!(!status.credential_loaded);
    assert_eq!(status.interval_secs, fast_protection().interval.as_secs());

    assert_eq!(svc.handle_text(&sid, "/clear").await?, CommandReply::Cleared(2));
    assert_eq!(h.store.counts(&sid), (0, 0));
    Ok(())
}

#[tokio::test]
async fn test_instant_check_reports_buckets_and_progress() -> Result<(), Error> {
    let h = harness();
    let svc = h.commands(true);
    let sid = SessionId::from("s1");

    let reply = svc
        .handle_text(&sid, "svh1234ab svc5678cd xyz99999 ok")
        .await?;
    let CommandReply::CheckResults(report) = reply else {
        panic!("unexpected reply {reply:?}");
    };
    assert_eq!(report.alive_codes(), codes(&["SVH1234AB"]));
    assert_eq!(report.dead_codes(), codes(&["SVC5678CD"]));
    assert_eq!(report.error_codes(), codes(&["XYZ99999"]));

    assert_eq!(h.notifier.notices_for(&sid), vec![Notice::CheckStarted { count: 3 }]);
    assert!(h.notifier.edits_for(&sid).last().is_some_and(|t| t.contains("Current: Done")));

    // a one-shot check never touches the registry
    assert_eq!(h.store.counts(&sid), (0, 0));
    // and the busy slot is free again
    assert!(h.store.try_begin_scan(&sid).is_some());
    Ok(())
}

#[tokio::test]
async fn test_overlapping_checks_are_refused() -> Result<(), Error> {
    let h = harness();
    let svc = h.commands(true);
    let sid = SessionId::from("s1");

    let _busy = h.store.try_begin_scan(&sid).expect("slot is free");
    assert_eq!(svc.handle_text(&sid, "/check SVH1234AB").await?, CommandReply::CheckBusy);

    // other sessions are unaffected
    let other = SessionId::from("s2");
    assert!(matches!(
        svc.handle_text(&other, "/check SVH1234AB").await?,
        CommandReply::CheckResults(_)
    ));
    Ok(())
}

#[tokio::test]
async fn test_buttons_protect_the_encoded_session() -> Result<(), Error> {
    let h = harness();
    let svc = h.commands(true);
    let owner = SessionId::from("1234");

    let payload = ButtonAction::ProtectAll {
        session: owner.clone(),
        codes: codes(&["SVH1234AB", "SVA0000ZZ"]),
    }
    .encode();
    let (session, reply) = svc.handle_button(&payload).await?;

    assert_eq!(session, owner);
    assert!(matches!(reply, CommandReply::ProtectionStarted { active: 2, .. }));

    let (_, reply) = svc.handle_button("protect_one:1234:SVH1234AB").await?;
    let CommandReply::AddedToRunningLoop(outcome) = reply else {
        panic!("unexpected reply {reply:?}");
    };
    assert_eq!(outcome.skipped, codes(&["SVH1234AB"]));

    assert!(matches!(svc.handle_button("protect_one:1234").await, Err(Error::Validation(_))));

    h.supervisor.stop(&owner);
    Ok(())
}

#[tokio::test]
async fn test_buttons_apply_the_same_code_length_rule_as_text() -> Result<(), Error> {
    let h = harness();
    let svc = h.commands(true);
    let sid = SessionId::from("1");

    let typed = svc.handle_text(&sid, "/protect AB").await?;
    assert!(matches!(typed, CommandReply::Usage(PROTECT_USAGE)));

    let (_, tapped) = svc.handle_button("protect_one:1:AB").await?;
    assert!(matches!(tapped, CommandReply::Usage(PROTECT_USAGE)));
    assert_eq!(h.store.counts(&sid), (0, 0));
    assert!(!h.supervisor.is_running(&sid));

    // short codes in a list are dropped, the rest are protected
    let (_, reply) = svc.handle_button("protect_all:1:AB,SVH1234AB").await?;
    let CommandReply::ProtectionStarted { added: Some(outcome), active: 1, .. } = reply else {
        panic!("unexpected reply {reply:?}");
    };
    assert_eq!(outcome.added, codes(&["SVH1234AB"]));

    h.supervisor.stop(&sid);
    Ok(())
}

#[tokio::test]
async fn test_chatter_and_unknown_commands() -> Result<(), Error> {
    let h = harness();
    let svc = h.commands(true);
    let sid = SessionId::from("s1");

    assert_eq!(svc.handle_text(&sid, "hey").await?, CommandReply::Ignored);
    assert_eq!(
        svc.handle_text(&sid, "/frobnicate").await?,
        CommandReply::UnknownCommand("frobnicate".into())
    );
    assert!(matches!(svc.handle_text(&sid, "/help").await?, CommandReply::Help { .. }));
    Ok(())
}
