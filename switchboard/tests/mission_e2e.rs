//! End-to-end mission tests against the scripted oracle and fixed chance,
//! so every run is deterministic.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, Utc};
use ractor::{Actor, ActorRef};
use tokio::sync::broadcast;
use uuid::Uuid;

use shared_types::{
    AttemptStatus, BookingRequest, MissionPhase, MissionSnapshot, Provider, ProviderId,
    ScoreWeights, ScoredOffer, ServiceCategory, SpeakerRole, TimeWindow,
};
use switchboard::actors::{
    MissionControlActor, MissionControlArguments, MissionControlMsg, MissionEvent,
};
use switchboard::chance::FixedChance;
use switchboard::config::Config;
use switchboard::directory::StaticDirectory;
use switchboard::oracle::{OracleError, ScriptedOracle};

fn window(day: &str, start_hour: u32, end_hour: u32) -> TimeWindow {
    TimeWindow::new(
        day.parse::<NaiveDate>().unwrap(),
        NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(end_hour, 0, 0).unwrap(),
    )
    .unwrap()
}

fn provider(id: &str, name: &str, rating: f64, distance: f64) -> Provider {
    Provider {
        id: ProviderId(id.to_string()),
        name: name.to_string(),
        category: ServiceCategory::Medical,
        address: "1 Test St".to_string(),
        city: "San Francisco".to_string(),
        postal_code: "94102".to_string(),
        phone: "(415) 555-0100".to_string(),
        rating,
        distance_miles: distance,
        offered_windows: vec![],
    }
}

fn three_providers() -> Vec<Provider> {
    vec![
        provider("p1", "Solid Clinic", 4.0, 1.0),
        provider("p2", "Stellar Clinic", 5.0, 1.0),
        provider("p3", "Flaky Clinic", 3.0, 1.0),
    ]
}

fn request() -> BookingRequest {
    BookingRequest {
        id: Uuid::new_v4(),
        description: "annual checkup".to_string(),
        category: ServiceCategory::Medical,
        location: "San Francisco".to_string(),
        free_windows: vec![window("2026-02-10", 8, 18)],
        weights: ScoreWeights {
            availability: 50.0,
            rating: 30.0,
            distance: 20.0,
        },
        created_at: Utc::now(),
    }
}

fn fast_config() -> Config {
    Config {
        pacing_base_ms: 1,
        pacing_per_char_ms: 0,
        pacing_max_ms: 5,
        ..Config::default()
    }
}

async fn spawn_mission_control(
    providers: Vec<Provider>,
    oracle: ScriptedOracle,
    chance: FixedChance,
    config: Config,
) -> ActorRef<MissionControlMsg> {
    let args = MissionControlArguments {
        config: Arc::new(config),
        directory: Arc::new(StaticDirectory::new(providers)),
        oracle: Arc::new(oracle),
        voice: None,
        chance: Arc::new(chance),
    };
    let (mission_control, _handle) = Actor::spawn(None, MissionControlActor, args)
        .await
        .expect("spawn mission control");
    mission_control
}

async fn subscribe(
    mission_control: &ActorRef<MissionControlMsg>,
) -> broadcast::Receiver<MissionEvent> {
    ractor::call!(mission_control, |reply| MissionControlMsg::SubscribeEvents { reply })
        .expect("subscribe rpc")
}

async fn start(
    mission_control: &ActorRef<MissionControlMsg>,
    request: BookingRequest,
) -> switchboard::actors::MissionStarted {
    ractor::call!(mission_control, |reply| MissionControlMsg::StartMission { request, reply })
        .expect("start rpc")
        .expect("mission accepted")
}

async fn snapshot(mission_control: &ActorRef<MissionControlMsg>) -> MissionSnapshot {
    ractor::call!(mission_control, |reply| MissionControlMsg::GetSnapshot { reply })
        .expect("snapshot rpc")
        .expect("active mission")
}

async fn wait_for_completed(events: &mut broadcast::Receiver<MissionEvent>) -> Vec<ScoredOffer> {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await {
                Ok(MissionEvent::MissionCompleted { results, .. }) => return results,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("mission did not complete in time")
}

#[tokio::test]
async fn mission_completes_and_ranks_surviving_offers() {
    // p1 and p2 offer bookable slots; p2 outranks p1 on rating. p3's oracle
    // call fails, which stays contained to p3.
    let oracle = ScriptedOracle::new()
        .with_offer("Solid Clinic", vec![window("2026-02-10", 9, 10)])
        .with_offer("Stellar Clinic", vec![window("2026-02-10", 14, 15)])
        .with_failure("Flaky Clinic", OracleError::Transport("line went dead".to_string()));

    let mission_control =
        spawn_mission_control(three_providers(), oracle, FixedChance::instant(), fast_config())
            .await;
    let mut events = subscribe(&mission_control).await;

    let started = start(&mission_control, request()).await;
    assert_eq!(started.total_attempts, 3);
    assert!(!started.already_running);

    let results = wait_for_completed(&mut events).await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].provider.name, "Stellar Clinic");
    assert_eq!(results[1].provider.name, "Solid Clinic");
    assert!(results[0].total >= results[1].total);

    let snap = snapshot(&mission_control).await;
    assert!(matches!(snap.phase, MissionPhase::Completed { .. }));
    assert_eq!(snap.completed, 3);
    assert_eq!(snap.total, 3);
    assert_eq!(snap.progress_percent(), 100);

    for attempt in &snap.attempts {
        assert!(attempt.status.is_terminal());
        // Every terminal outcome explains itself in the transcript.
        let last = attempt.transcript.last().expect("non-empty transcript");
        assert_eq!(last.role, SpeakerRole::System);
    }

    let failed = snap
        .attempts
        .iter()
        .find(|a| a.provider.name == "Flaky Clinic")
        .unwrap();
    assert_eq!(failed.status, AttemptStatus::Failed);
    assert!(failed.offered_slots.is_empty());
}

#[tokio::test]
async fn no_answer_everywhere_completes_with_no_offers() {
    let chance = FixedChance { delay_ms: 0, no_answer: true };
    let mission_control =
        spawn_mission_control(three_providers(), ScriptedOracle::new(), chance, fast_config())
            .await;
    let mut events = subscribe(&mission_control).await;
    start(&mission_control, request()).await;

    let results = wait_for_completed(&mut events).await;
    assert!(results.is_empty());

    let snap = snapshot(&mission_control).await;
    for attempt in &snap.attempts {
        assert_eq!(attempt.status, AttemptStatus::NoAnswer);
        assert!(attempt.offered_slots.is_empty());
    }
}

#[tokio::test]
async fn starting_the_same_request_twice_is_a_noop() {
    let chance = FixedChance { delay_ms: 5_000, no_answer: false };
    let mission_control =
        spawn_mission_control(three_providers(), ScriptedOracle::new(), chance, fast_config())
            .await;

    let req = request();
    let first = start(&mission_control, req.clone()).await;
    assert!(!first.already_running);

    let second = start(&mission_control, req.clone()).await;
    assert!(second.already_running);
    assert_eq!(second.request_id, req.id);
    assert_eq!(second.total_attempts, first.total_attempts);
}

#[tokio::test]
async fn a_new_request_discards_prior_attempts() {
    let oracle = ScriptedOracle::new()
        .with_offer("Solid Clinic", vec![window("2026-02-10", 9, 10)])
        .with_offer("Stellar Clinic", vec![window("2026-02-10", 14, 15)])
        .with_offer("Flaky Clinic", vec![]);
    let mission_control =
        spawn_mission_control(three_providers(), oracle, FixedChance::instant(), fast_config())
            .await;
    let mut events = subscribe(&mission_control).await;

    start(&mission_control, request()).await;
    wait_for_completed(&mut events).await;
    let first_snap = snapshot(&mission_control).await;
    assert!(first_snap.attempts.iter().any(|a| !a.transcript.is_empty()));

    // Fresh request id — prior attempts and transcripts are discarded.
    let second = start(&mission_control, request()).await;
    assert!(!second.already_running);
    let snap = snapshot(&mission_control).await;
    assert_eq!(snap.request_id, second.request_id);
    assert_ne!(snap.request_id, first_snap.request_id);
}

#[tokio::test]
async fn stop_mission_freezes_every_transcript() {
    // Slow pacing holds each attempt inside the dialogue phase so the stop
    // lands mid-flight.
    let config = Config {
        pacing_base_ms: 2_000,
        pacing_per_char_ms: 0,
        pacing_max_ms: 2_000,
        ..Config::default()
    };
    let oracle = ScriptedOracle::new()
        .with_offer("Solid Clinic", vec![window("2026-02-10", 9, 10)])
        .with_offer("Stellar Clinic", vec![window("2026-02-10", 14, 15)])
        .with_offer("Flaky Clinic", vec![]);
    let mission_control =
        spawn_mission_control(three_providers(), oracle, FixedChance::instant(), config).await;
    let mut events = subscribe(&mission_control).await;
    start(&mission_control, request()).await;

    // Wait until every attempt is connected and pacing its first utterance.
    let mut in_progress = 0;
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(MissionEvent::StatusChanged {
                status: AttemptStatus::InProgress,
                ..
            }) = events.recv().await
            {
                in_progress += 1;
                if in_progress == 3 {
                    return;
                }
            }
        }
    })
    .await
    .expect("attempts never connected");

    ractor::call!(mission_control, |reply| MissionControlMsg::StopMission { reply })
        .expect("stop rpc")
        .expect("stop accepted");

    let frozen = snapshot(&mission_control).await;
    assert_eq!(frozen.phase, MissionPhase::Stopped);

    // Even after the pacing delay would have elapsed, nothing grows.
    tokio::time::sleep(Duration::from_millis(2_300)).await;
    let later = snapshot(&mission_control).await;
    for (before, after) in frozen.attempts.iter().zip(later.attempts.iter()) {
        assert_eq!(before.transcript.len(), after.transcript.len());
        assert_eq!(before.status, after.status);
    }
}

#[tokio::test]
async fn takeover_suspends_and_override_reaches_the_transcript() {
    let chance = FixedChance { delay_ms: 5_000, no_answer: false };
    let mission_control =
        spawn_mission_control(three_providers(), ScriptedOracle::new(), chance, fast_config())
            .await;
    start(&mission_control, request()).await;

    ractor::call!(mission_control, |reply| MissionControlMsg::TakeoverAll { reply })
        .expect("takeover rpc")
        .expect("takeover accepted");

    ractor::call!(mission_control, |reply| MissionControlMsg::SendOverride {
        provider_id: ProviderId("p1".to_string()),
        text: "Please ask about Saturday.".to_string(),
        reply,
    })
    .expect("override rpc")
    .expect("override accepted");

    // Let the override event pump through.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let snap = snapshot(&mission_control).await;
    let p1 = snap
        .attempts
        .iter()
        .find(|a| a.provider.id == ProviderId("p1".to_string()))
        .unwrap();
    assert!(p1.suspended);
    assert_eq!(p1.status, AttemptStatus::Pending);
    assert_eq!(p1.transcript.len(), 1);
    assert_eq!(p1.transcript[0].role, SpeakerRole::User);

    // Resume re-enables manual messaging only; no automated dialogue runs.
    ractor::call!(mission_control, |reply| MissionControlMsg::ResumeAll { reply })
        .expect("resume rpc")
        .expect("resume accepted");
    tokio::time::sleep(Duration::from_millis(100)).await;
    let snap = snapshot(&mission_control).await;
    let p1 = snap
        .attempts
        .iter()
        .find(|a| a.provider.id == ProviderId("p1".to_string()))
        .unwrap();
    assert!(!p1.suspended);
    assert_eq!(p1.status, AttemptStatus::Pending);
    assert_eq!(p1.transcript.len(), 1);
}

#[tokio::test]
async fn unknown_provider_override_is_rejected() {
    let chance = FixedChance { delay_ms: 5_000, no_answer: false };
    let mission_control =
        spawn_mission_control(three_providers(), ScriptedOracle::new(), chance, fast_config())
            .await;
    start(&mission_control, request()).await;

    let result = ractor::call!(mission_control, |reply| MissionControlMsg::SendOverride {
        provider_id: ProviderId("nope".to_string()),
        text: "hello".to_string(),
        reply,
    })
    .expect("override rpc");
    assert!(result.is_err());
}
