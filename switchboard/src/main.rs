//! Demo mission: reconcile a calendar, dial the seeded medical providers
//! against a scripted oracle, and print the ranked offers.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use ractor::Actor;
use shared_types::{BookingRequest, BusyEvent, ScoreWeights, ServiceCategory, TimeWindow};
use switchboard::actors::{
    MissionControlActor, MissionControlArguments, MissionControlMsg, MissionEvent,
};
use switchboard::availability;
use switchboard::chance::ThreadRngChance;
use switchboard::config::Config;
use switchboard::directory::{ProviderDirectory, StaticDirectory};
use switchboard::oracle::ScriptedOracle;

fn base_windows() -> Vec<TimeWindow> {
    ["2026-02-09", "2026-02-10", "2026-02-11"]
        .iter()
        .filter_map(|day| {
            TimeWindow::new(
                day.parse::<NaiveDate>().ok()?,
                NaiveTime::from_hms_opt(8, 0, 0)?,
                NaiveTime::from_hms_opt(18, 0, 0)?,
            )
        })
        .collect()
}

fn busy_calendar() -> Vec<BusyEvent> {
    let event = |day: &str, sh, eh| -> Option<BusyEvent> {
        let day: NaiveDate = day.parse().ok()?;
        Some(BusyEvent::from_local(
            "calendar event",
            day.and_hms_opt(sh, 0, 0)?,
            day.and_hms_opt(eh, 0, 0)?,
            false,
        ))
    };
    [event("2026-02-09", 9, 12), event("2026-02-10", 13, 15)]
        .into_iter()
        .flatten()
        .collect()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            std::process::exit(1);
        }
    };

    let free_windows = availability::reconcile(&base_windows(), &busy_calendar());
    for window in &free_windows {
        tracing::info!(window = %window, "free window");
    }

    let request = BookingRequest {
        id: uuid::Uuid::new_v4(),
        description: "Annual checkup, ideally this week".to_string(),
        category: ServiceCategory::Medical,
        location: "San Francisco".to_string(),
        free_windows: free_windows.clone(),
        weights: ScoreWeights {
            availability: 50.0,
            rating: 30.0,
            distance: 20.0,
        },
        created_at: Utc::now(),
    };

    // Script one offer per provider: their first window that survives the
    // calendar reconciliation, if any.
    let directory = StaticDirectory::seeded();
    let providers = match directory.lookup(request.category, &request.location).await {
        Ok(providers) => providers,
        Err(err) => {
            tracing::error!(error = %err, "directory lookup failed");
            std::process::exit(1);
        }
    };
    let mut oracle = ScriptedOracle::new();
    for provider in &providers {
        let offers: Vec<TimeWindow> = provider
            .offered_windows
            .iter()
            .filter(|slot| free_windows.iter().any(|w| w.contains(slot)))
            .take(2)
            .copied()
            .collect();
        oracle = oracle.with_offer(&provider.name, offers);
    }

    let args = MissionControlArguments {
        config,
        directory: Arc::new(directory),
        oracle: Arc::new(oracle),
        voice: None,
        chance: Arc::new(ThreadRngChance),
    };
    let (mission_control, handle) = match Actor::spawn(None, MissionControlActor, args).await {
        Ok(spawned) => spawned,
        Err(err) => {
            tracing::error!(error = %err, "failed to spawn mission control");
            std::process::exit(1);
        }
    };

    let mut events = match ractor::call!(mission_control, |reply| {
        MissionControlMsg::SubscribeEvents { reply }
    }) {
        Ok(events) => events,
        Err(err) => {
            tracing::error!(error = %err, "failed to subscribe to mission events");
            std::process::exit(1);
        }
    };

    match ractor::call!(mission_control, |reply| MissionControlMsg::StartMission {
        request,
        reply,
    }) {
        Ok(Ok(started)) => {
            tracing::info!(
                request_id = %started.request_id,
                attempts = started.total_attempts,
                "mission launched"
            );
        }
        Ok(Err(err)) => {
            tracing::error!(error = %err, "mission rejected");
            std::process::exit(1);
        }
        Err(err) => {
            tracing::error!(error = %err, "mission control unreachable");
            std::process::exit(1);
        }
    }

    while let Ok(event) = events.recv().await {
        match event {
            MissionEvent::StatusChanged { provider_id, status } => {
                tracing::info!(provider = %provider_id, status = %status, "attempt status");
            }
            MissionEvent::UtteranceAdded { provider_id, utterance } => {
                tracing::info!(provider = %provider_id, "[{:?}] {}", utterance.role, utterance.text);
            }
            MissionEvent::ProgressChanged { completed, total } => {
                tracing::info!(completed, total, "mission progress");
            }
            MissionEvent::NoProviders { .. } => {
                tracing::warn!("no providers found for this request");
                break;
            }
            MissionEvent::MissionCompleted { results, .. } => {
                for (rank, offer) in results.iter().enumerate() {
                    tracing::info!(
                        rank = rank + 1,
                        provider = %offer.provider.name,
                        slot = %offer.slot,
                        total = offer.total,
                        availability = offer.breakdown.availability,
                        rating = offer.breakdown.rating,
                        distance = offer.breakdown.distance,
                        "ranked offer"
                    );
                }
                break;
            }
            MissionEvent::MissionStopped { .. } => break,
            MissionEvent::MissionStarted { .. } => {}
        }
    }

    mission_control.stop(None);
    let _ = handle.await;
}
