use std::sync::Arc;

use super::common::*;
use crate::clock::FixedClock;
use crate::tracking::domain::ApplicationStatus;
use crate::tracking::history::{verify_chain, ChainViolation, StatusHistoryLog};
use crate::tracking::status::StatusTransitionEngine;
use crate::tracking::store::HistoryStore;

#[test]
fn replayed_chain_from_real_transitions_verifies() {
    let (_, store, _) = build_service();
    let application = seed_application(&store, &student(), "Drake", days_from_now(45));
    let engine = StatusTransitionEngine::new(store.clone(), Arc::new(FixedClock(now())));

    for target in [
        ApplicationStatus::InProgress,
        ApplicationStatus::Submitted,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Decided,
    ] {
        engine
            .request_transition(&application.id, student(), target, None)
            .expect("forward step");
    }

    let chain = store.history_for(&application.id).expect("history reads");
    assert_eq!(chain.len(), 5);
    assert_eq!(chain[0].from_status, None);
    verify_chain(&chain).expect("real transition history forms a valid chain");
}

#[test]
fn verify_chain_detects_broken_links() {
    let (_, store, _) = build_service();
    let application = seed_application(&store, &student(), "Drake", days_from_now(45));
    let engine = StatusTransitionEngine::new(store.clone(), Arc::new(FixedClock(now())));
    engine
        .request_transition(&application.id, student(), ApplicationStatus::InProgress, None)
        .expect("forward step");

    let mut chain = store.history_for(&application.id).expect("history reads");
    // Corrupt the link: the second entry now claims a different origin.
    chain[1].from_status = Some(ApplicationStatus::Submitted);
    assert_eq!(
        verify_chain(&chain),
        Err(ChainViolation::BrokenLink { index: 1 })
    );
}

#[test]
fn verify_chain_detects_order_regressions() {
    let (_, store, _) = build_service();
    let application = seed_application(&store, &student(), "Drake", days_from_now(45));
    let engine = StatusTransitionEngine::new(store.clone(), Arc::new(FixedClock(now())));
    engine
        .request_transition(&application.id, student(), ApplicationStatus::InProgress, None)
        .expect("forward step");

    let mut chain = store.history_for(&application.id).expect("history reads");
    // Forge a backward move that still links correctly.
    let mut forged = chain[1].clone();
    forged.from_status = Some(ApplicationStatus::InProgress);
    forged.to_status = ApplicationStatus::NotStarted;
    chain.push(forged);
    assert_eq!(
        verify_chain(&chain),
        Err(ChainViolation::OrderRegression { index: 2 })
    );
}

#[test]
fn recent_changes_are_newest_first_and_limited() {
    let (_, store, _) = build_service();
    seed_application(&store, &student(), "Drake", days_from_now(45));
    let second = seed_application(&store, &student(), "Luther", days_from_now(60));

    let engine = StatusTransitionEngine::new(
        store.clone(),
        Arc::new(FixedClock(days_from_now(1))),
    );
    engine
        .request_transition(&second.id, student(), ApplicationStatus::InProgress, None)
        .expect("forward step");

    let log = StatusHistoryLog::new(store.clone());
    let recent = log
        .recent_changes(&student(), 2)
        .expect("recent changes read");
    assert_eq!(recent.len(), 2);
    // The later transition on the second application comes first.
    assert_eq!(recent[0].application_id, second.id);
    assert_eq!(recent[0].to_status, ApplicationStatus::InProgress);
    // The second slot is one of the creation entries.
    assert_eq!(recent[1].from_status, None);
}
