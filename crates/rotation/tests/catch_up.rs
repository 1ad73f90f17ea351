//! End-to-end advancement scenarios against the in-memory store.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use rotator_core::{Assignment, AssignmentId, Duty, DutyId, Member, MemberId, RotatorError};
use rotator_rotation::{
    AdvanceStatus, AssignmentStore, ChangeKind, FailureSink, InMemoryStore, ManualReassigner,
    RotationAdvancer, WorkingDayOracle,
};

// ── Test doubles ────────────────────────────────────────────────────

struct DaysOff(HashSet<NaiveDate>);

#[async_trait::async_trait]
impl WorkingDayOracle for DaysOff {
    async fn is_working_day(&self, date: NaiveDate) -> rotator_core::Result<bool> {
        Ok(!self.0.contains(&date))
    }
}

struct BrokenCalendar {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl WorkingDayOracle for BrokenCalendar {
    async fn is_working_day(&self, _date: NaiveDate) -> rotator_core::Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RotatorError::OracleUnavailable("holiday API timed out".into()))
    }
}

#[derive(Default)]
struct RecordingSink {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait::async_trait]
impl FailureSink for RecordingSink {
    async fn notify(&self, message: &str) -> rotator_core::Result<()> {
        self.messages.lock().unwrap().push(message.to_string());
        if self.fail {
            Err(RotatorError::Storage("webhook unreachable".into()))
        } else {
            Ok(())
        }
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn duty(id: i64, rule: &str) -> Duty {
    Duty {
        id: DutyId(id),
        name: format!("duty-{id}"),
        description: String::new(),
        rotation_rule: rule.to_string(),
        digest_lookahead: 0,
    }
}

fn member(id: i64, handle: &str) -> Member {
    Member {
        id: MemberId(id),
        handle: handle.to_string(),
        notify_id: format!("U{id}"),
    }
}

fn store_with(rule: &str, members: &[(i64, &str)], window: Option<(NaiveDate, NaiveDate, i64)>) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.insert_duty(duty(1, rule)).unwrap();
    for (id, handle) in members {
        store.insert_member(member(*id, handle)).unwrap();
    }
    if let Some((start, end, holder)) = window {
        store
            .insert_assignment(Assignment {
                id: AssignmentId(1),
                duty_id: DutyId(1),
                start_date: start,
                end_date: end,
                member_id: MemberId(holder),
            })
            .unwrap();
    }
    store
}

fn advancer(
    store: Arc<InMemoryStore>,
    oracle: Arc<dyn WorkingDayOracle>,
    sink: Arc<RecordingSink>,
) -> RotationAdvancer {
    RotationAdvancer::new(store, oracle, sink)
}

fn open_calendar() -> Arc<dyn WorkingDayOracle> {
    Arc::new(DaysOff(HashSet::new()))
}

// ── Catch-up ────────────────────────────────────────────────────────

#[tokio::test]
async fn weekly_catch_up_over_missed_weeks() {
    let store = store_with(
        "weekly_monday",
        &[(1, "alice"), (2, "bob")],
        Some((date(2024, 1, 1), date(2024, 1, 7), 1)),
    );
    let sink = Arc::new(RecordingSink::default());
    let adv = advancer(store.clone(), open_calendar(), sink.clone());

    let outcome = adv.advance(DutyId(1), date(2024, 1, 22)).await.unwrap();

    // Windows starting 01-08, 01-15 and 01-22 are walked through.
    assert_eq!(outcome.status, AdvanceStatus::Advanced);
    assert_eq!(outcome.report.iterations, 3);
    assert_eq!(outcome.report.rotations, 3);
    let a = store.assignment_for(DutyId(1)).unwrap().unwrap();
    assert_eq!(a.start_date, date(2024, 1, 22));
    assert_eq!(a.end_date, date(2024, 1, 28));
    assert_eq!(a.member_id, MemberId(2));

    // One commit for the whole catch-up.
    let history = store.history().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].1, ChangeKind::Rotation);
    assert!(sink.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn two_rotations_from_a_two_member_roster_return_to_start() {
    let store = store_with(
        "weekly_monday",
        &[(1, "alice"), (2, "bob")],
        Some((date(2024, 1, 1), date(2024, 1, 7), 1)),
    );
    let adv = advancer(store.clone(), open_calendar(), Arc::new(RecordingSink::default()));

    let outcome = adv.advance(DutyId(1), date(2024, 1, 15)).await.unwrap();

    assert_eq!(outcome.report.rotations, 2);
    assert_eq!(outcome.assignment.start_date, date(2024, 1, 15));
    assert_eq!(outcome.assignment.member_id, MemberId(1));
}

#[tokio::test]
async fn biweekly_window_spans_fourteen_days() {
    // 2024-01-03 is a Wednesday.
    let store = store_with(
        "biweekly_wednesday",
        &[(1, "alice"), (2, "bob"), (3, "carol")],
        Some((date(2024, 1, 3), date(2024, 1, 16), 3)),
    );
    let adv = advancer(store.clone(), open_calendar(), Arc::new(RecordingSink::default()));

    let outcome = adv.advance(DutyId(1), date(2024, 1, 17)).await.unwrap();

    assert_eq!(outcome.assignment.start_date, date(2024, 1, 17));
    assert_eq!((outcome.assignment.end_date - outcome.assignment.start_date).num_days(), 13);
    assert_eq!(outcome.assignment.member_id, MemberId(1));
}

#[tokio::test]
async fn daily_skip_on_non_working_day() {
    let store = store_with(
        "daily",
        &[(1, "alice"), (2, "bob")],
        Some((date(2024, 9, 1), date(2024, 9, 1), 1)),
    );
    let oracle = Arc::new(DaysOff([date(2024, 9, 2)].into_iter().collect()));
    let adv = advancer(store.clone(), oracle, Arc::new(RecordingSink::default()));

    let outcome = adv.advance(DutyId(1), date(2024, 9, 2)).await.unwrap();

    assert_eq!(outcome.report.skipped_days, vec![date(2024, 9, 2)]);
    let a = store.assignment_for(DutyId(1)).unwrap().unwrap();
    assert_eq!(a.start_date, date(2024, 9, 2));
    assert_eq!(a.end_date, date(2024, 9, 2));
    assert_eq!(a.member_id, MemberId(1));
}

// ── Idempotence ─────────────────────────────────────────────────────

#[tokio::test]
async fn second_call_on_the_same_day_is_a_no_op() {
    let store = store_with(
        "daily",
        &[(1, "alice"), (2, "bob")],
        Some((date(2024, 3, 4), date(2024, 3, 4), 1)),
    );
    let adv = advancer(store.clone(), open_calendar(), Arc::new(RecordingSink::default()));

    let first = adv.advance(DutyId(1), date(2024, 3, 5)).await.unwrap();
    let second = adv.advance(DutyId(1), date(2024, 3, 5)).await.unwrap();

    assert_eq!(first.status, AdvanceStatus::Advanced);
    assert_eq!(second.status, AdvanceStatus::Unchanged);
    assert_eq!(second.assignment, first.assignment);
    assert_eq!(store.history().unwrap().len(), 1);
}

#[tokio::test]
async fn upcoming_window_from_manual_override_is_not_touched() {
    let store = store_with(
        "weekly_monday",
        &[(1, "alice"), (2, "bob")],
        Some((date(2024, 2, 5), date(2024, 2, 11), 2)),
    );
    let adv = advancer(store.clone(), open_calendar(), Arc::new(RecordingSink::default()));

    let outcome = adv.advance(DutyId(1), date(2024, 1, 30)).await.unwrap();

    assert_eq!(outcome.status, AdvanceStatus::Unchanged);
    assert!(store.history().unwrap().is_empty());
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn malformed_rule_is_rejected_without_mutation() {
    let store = store_with(
        "monthly_foo",
        &[(1, "alice")],
        Some((date(2024, 1, 1), date(2024, 1, 1), 1)),
    );
    let sink = Arc::new(RecordingSink::default());
    let adv = advancer(store.clone(), open_calendar(), sink.clone());

    let err = adv.advance(DutyId(1), date(2024, 1, 5)).await.unwrap_err();

    assert!(matches!(err, RotatorError::InvalidRule { .. }));
    assert!(store.history().unwrap().is_empty());
    assert_eq!(store.assignment_for(DutyId(1)).unwrap().unwrap().end_date, date(2024, 1, 1));
    let messages = sink.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Failed to update task assignment:"));
}

#[tokio::test]
async fn oracle_outage_commits_nothing_and_alerts() {
    let store = store_with(
        "daily",
        &[(1, "alice"), (2, "bob")],
        Some((date(2024, 9, 1), date(2024, 9, 1), 1)),
    );
    let oracle = Arc::new(BrokenCalendar {
        calls: AtomicUsize::new(0),
    });
    let sink = Arc::new(RecordingSink::default());
    let adv = advancer(store.clone(), oracle.clone(), sink.clone());

    let err = adv.advance(DutyId(1), date(2024, 9, 10)).await.unwrap_err();

    assert!(matches!(err, RotatorError::OracleUnavailable(_)));
    assert!(err.is_transient());
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
    let a = store.assignment_for(DutyId(1)).unwrap().unwrap();
    assert_eq!(a.start_date, date(2024, 9, 1));
    assert_eq!(a.member_id, MemberId(1));
    assert_eq!(sink.messages.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn failing_alert_sink_does_not_mask_the_original_error() {
    let store = store_with("weekly_funday", &[(1, "alice")], None);
    let sink = Arc::new(RecordingSink {
        messages: Mutex::new(Vec::new()),
        fail: true,
    });
    let adv = advancer(store, open_calendar(), sink.clone());

    let err = adv.advance(DutyId(1), date(2024, 1, 5)).await.unwrap_err();

    assert!(matches!(err, RotatorError::InvalidRule { .. }));
    assert_eq!(sink.messages.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn stale_duty_with_empty_roster_fails() {
    let store = store_with("daily", &[], Some((date(2024, 1, 1), date(2024, 1, 1), 1)));
    let adv = advancer(store, open_calendar(), Arc::new(RecordingSink::default()));

    let err = adv.advance(DutyId(1), date(2024, 1, 2)).await.unwrap_err();

    assert!(matches!(err, RotatorError::EmptyRoster(DutyId(1))));
}

#[tokio::test]
async fn unknown_duty_is_reported() {
    let store = store_with("daily", &[(1, "alice")], None);
    let adv = advancer(store, open_calendar(), Arc::new(RecordingSink::default()));

    let err = adv.advance(DutyId(42), date(2024, 1, 2)).await.unwrap_err();

    assert!(matches!(err, RotatorError::DutyNotFound(DutyId(42))));
}

// ── Seeding and multi-duty passes ───────────────────────────────────

#[tokio::test]
async fn missing_assignment_is_seeded_with_first_member() {
    let store = store_with("weekly_monday", &[(7, "gina"), (3, "carol")], None);
    let adv = advancer(store.clone(), open_calendar(), Arc::new(RecordingSink::default()));

    let outcome = adv.advance(DutyId(1), date(2024, 4, 1)).await.unwrap();

    assert_eq!(outcome.status, AdvanceStatus::Seeded);
    assert_eq!(outcome.assignment.member_id, MemberId(3));
    assert_eq!(outcome.assignment.start_date, date(2024, 4, 1));
    assert_eq!(outcome.assignment.end_date, date(2024, 4, 7));
    assert_eq!(store.history().unwrap()[0].1, ChangeKind::Seed);
}

#[tokio::test]
async fn mid_week_seed_starts_on_the_anchor_and_hands_off_on_it() {
    let store = store_with("weekly_monday", &[(1, "alice"), (2, "bob")], None);
    let adv = advancer(store.clone(), open_calendar(), Arc::new(RecordingSink::default()));

    // Wednesday 2024-01-03.
    let seeded = adv.advance(DutyId(1), date(2024, 1, 3)).await.unwrap();
    assert_eq!(seeded.status, AdvanceStatus::Seeded);
    assert_eq!(seeded.assignment.start_date, date(2024, 1, 1));
    assert_eq!(seeded.assignment.end_date, date(2024, 1, 7));

    // The handoff happens on the following Monday, not a day later.
    let monday = adv.advance(DutyId(1), date(2024, 1, 8)).await.unwrap();
    assert_eq!(monday.status, AdvanceStatus::Advanced);
    assert_eq!(monday.assignment.start_date, date(2024, 1, 8));
    assert_eq!(monday.assignment.end_date, date(2024, 1, 14));
    assert_eq!(monday.assignment.member_id, MemberId(2));

    let wednesday = adv.advance(DutyId(1), date(2024, 1, 10)).await.unwrap();
    assert_eq!(wednesday.status, AdvanceStatus::Unchanged);
}

#[tokio::test]
async fn one_broken_duty_does_not_block_the_others() {
    let store = store_with(
        "daily",
        &[(1, "alice"), (2, "bob")],
        Some((date(2024, 5, 6), date(2024, 5, 6), 1)),
    );
    store.insert_duty(duty(2, "fortnightly")).unwrap();
    store.insert_duty(duty(3, "weekly_friday")).unwrap();
    store
        .insert_assignment(Assignment {
            id: AssignmentId(3),
            duty_id: DutyId(3),
            start_date: date(2024, 5, 3),
            end_date: date(2024, 5, 9),
            member_id: MemberId(2),
        })
        .unwrap();
    let sink = Arc::new(RecordingSink::default());
    let adv = advancer(store.clone(), open_calendar(), sink.clone());

    let results = adv.advance_all(date(2024, 5, 10)).await.unwrap();

    assert_eq!(results.len(), 3);
    let by_id = |id: i64| results.iter().find(|r| r.duty_id == DutyId(id)).unwrap();
    assert!(by_id(1).is_success());
    assert!(!by_id(2).is_success());
    assert!(by_id(2).error.as_deref().unwrap().contains("fortnightly"));
    assert!(by_id(3).is_success());
    assert_eq!(
        store.assignment_for(DutyId(3)).unwrap().unwrap().start_date,
        date(2024, 5, 10)
    );
    assert_eq!(sink.messages.lock().unwrap().len(), 1);
}

// ── Manual reassignment ─────────────────────────────────────────────

#[tokio::test]
async fn reassign_overwrites_holder_and_window() {
    let store = store_with(
        "weekly_monday",
        &[(1, "alice"), (2, "bob")],
        Some((date(2024, 1, 1), date(2024, 1, 7), 1)),
    );
    let reassigner = ManualReassigner::new(store.clone());

    let a = reassigner
        .reassign(AssignmentId(1), "bob", date(2024, 1, 3), date(2024, 1, 9))
        .await
        .unwrap();

    assert_eq!(a.member_id, MemberId(2));
    assert_eq!(a.start_date, date(2024, 1, 3));
    assert_eq!(a.end_date, date(2024, 1, 9));
    let history = store.history().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].1, ChangeKind::Manual);
}

#[tokio::test]
async fn reassign_does_not_catch_up_a_past_window() {
    let store = store_with(
        "daily",
        &[(1, "alice"), (2, "bob")],
        Some((date(2024, 1, 1), date(2024, 1, 1), 1)),
    );
    let reassigner = ManualReassigner::new(store.clone());

    let a = reassigner
        .reassign(AssignmentId(1), "bob", date(2023, 12, 1), date(2023, 12, 1))
        .await
        .unwrap();

    assert_eq!(a.start_date, date(2023, 12, 1));
    assert_eq!(store.history().unwrap().len(), 1);
}

#[tokio::test]
async fn reassign_reports_missing_records() {
    let store = store_with(
        "daily",
        &[(1, "alice")],
        Some((date(2024, 1, 1), date(2024, 1, 1), 1)),
    );
    let reassigner = ManualReassigner::new(store.clone());

    let missing_assignment = reassigner
        .reassign(AssignmentId(9), "alice", date(2024, 1, 2), date(2024, 1, 2))
        .await
        .unwrap_err();
    assert!(matches!(missing_assignment, RotatorError::AssignmentNotFound(_)));

    let missing_member = reassigner
        .reassign(AssignmentId(1), "nobody", date(2024, 1, 2), date(2024, 1, 2))
        .await
        .unwrap_err();
    assert!(matches!(missing_member, RotatorError::MemberNotFound(_)));

    let inverted = reassigner
        .reassign(AssignmentId(1), "alice", date(2024, 1, 5), date(2024, 1, 2))
        .await
        .unwrap_err();
    assert!(matches!(inverted, RotatorError::InvalidWindow { .. }));

    assert!(store.history().unwrap().is_empty());
    assert!(store.load_assignment(AssignmentId(1)).await.unwrap().is_some());
}
