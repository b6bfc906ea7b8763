//! MissionControlActor — the outreach orchestrator.
//!
//! Owns the set of call attempts for the current mission and is the sole
//! writer of mission-wide state. Attempts report deltas over a channel that
//! a pump task feeds back into this actor's mailbox, so every aggregation
//! step runs inside one handler at a time. Observers get cloned snapshots
//! or a broadcast subscription, never a reference into live state.
//!
//! Policy notes:
//! - starting a mission whose request id matches the active one is a no-op;
//! - a mission with a *different* request discards all prior attempts;
//! - resume after takeover re-enables manual messaging only, it does not
//!   replay automated dialogue.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort, SupervisionEvent};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use shared_types::{
    AttemptSnapshot, AttemptStatus, BookingRequest, MissionPhase, MissionSnapshot, Provider,
    ProviderId, SlotOffer, SpeakerRole, TimeWindow, Utterance,
};

use crate::actors::call_attempt::{
    AttemptError, AttemptEvent, AttemptEventKind, CallAttemptActor, CallAttemptArguments,
    CallAttemptMsg,
};
use crate::actors::events::{MissionEvent, MissionEventBus};
use crate::chance::ChanceSource;
use crate::config::Config;
use crate::directory::{DirectoryError, ProviderDirectory};
use crate::oracle::DialoguePort;
use crate::scoring;
use crate::voice::VoicePort;

// ============================================================================
// Contract
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum MissionError {
    #[error("no active mission")]
    NoActiveMission,
    #[error("score weights sum to zero or less; at least one weight must be positive")]
    ZeroWeightSum,
    #[error("unknown provider '{0}' in the current mission")]
    UnknownProvider(ProviderId),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error("override rejected: {0}")]
    Override(#[from] AttemptError),
    #[error("attempt did not respond: {0}")]
    AttemptUnreachable(String),
}

#[derive(Debug, Clone)]
pub struct MissionStarted {
    pub request_id: Uuid,
    pub total_attempts: usize,
    /// True when this start was ignored because the same request is already
    /// in flight.
    pub already_running: bool,
}

#[derive(Debug)]
pub enum MissionControlMsg {
    StartMission {
        request: BookingRequest,
        reply: RpcReplyPort<Result<MissionStarted, MissionError>>,
    },
    /// Internal: delta pumped up from one call attempt.
    AttemptUpdate(AttemptEvent),
    StopMission {
        reply: RpcReplyPort<Result<(), MissionError>>,
    },
    /// Suspend automation on every non-terminal attempt.
    TakeoverAll {
        reply: RpcReplyPort<Result<(), MissionError>>,
    },
    /// Re-enable manual messaging on every suspended attempt.
    ResumeAll {
        reply: RpcReplyPort<Result<(), MissionError>>,
    },
    /// Append a user utterance to one attempt's transcript.
    SendOverride {
        provider_id: ProviderId,
        text: String,
        reply: RpcReplyPort<Result<(), MissionError>>,
    },
    GetSnapshot {
        reply: RpcReplyPort<Option<MissionSnapshot>>,
    },
    SubscribeEvents {
        reply: RpcReplyPort<broadcast::Receiver<MissionEvent>>,
    },
}

pub struct MissionControlArguments {
    pub config: Arc<Config>,
    pub directory: Arc<dyn ProviderDirectory>,
    pub oracle: Arc<dyn DialoguePort>,
    pub voice: Option<Arc<dyn VoicePort>>,
    pub chance: Arc<dyn ChanceSource>,
}

// ============================================================================
// State
// ============================================================================

struct MissionAttempt {
    provider: Provider,
    actor: ActorRef<CallAttemptMsg>,
    status: AttemptStatus,
    suspended: bool,
    transcript: Vec<Utterance>,
    offered_slots: Vec<TimeWindow>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl MissionAttempt {
    fn snapshot(&self) -> AttemptSnapshot {
        AttemptSnapshot {
            provider: self.provider.clone(),
            status: self.status,
            suspended: self.suspended,
            transcript: self.transcript.clone(),
            offered_slots: self.offered_slots.clone(),
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }
}

struct Mission {
    request: Arc<BookingRequest>,
    phase: MissionPhase,
    attempts: Vec<MissionAttempt>,
    pump: Option<JoinHandle<()>>,
}

impl Mission {
    fn completed_count(&self) -> usize {
        self.attempts.iter().filter(|a| a.status.is_terminal()).count()
    }

    fn snapshot(&self) -> MissionSnapshot {
        MissionSnapshot {
            request_id: self.request.id,
            phase: self.phase.clone(),
            attempts: self.attempts.iter().map(MissionAttempt::snapshot).collect(),
            completed: self.completed_count(),
            total: self.attempts.len(),
        }
    }
}

pub struct MissionControlState {
    config: Arc<Config>,
    directory: Arc<dyn ProviderDirectory>,
    oracle: Arc<dyn DialoguePort>,
    voice: Option<Arc<dyn VoicePort>>,
    chance: Arc<dyn ChanceSource>,
    events: MissionEventBus,
    mission: Option<Mission>,
}

impl MissionControlState {
    /// Stop and forget the current mission's attempts. Transcripts do not
    /// survive a new booking request.
    fn discard_mission(&mut self) {
        let Some(mission) = self.mission.take() else {
            return;
        };
        for attempt in &mission.attempts {
            let _ = attempt.actor.cast(CallAttemptMsg::Cancel);
            attempt.actor.stop(None);
        }
        if let Some(pump) = mission.pump {
            pump.abort();
        }
    }

    /// Recompute "done" from the latest known status of every attempt; runs
    /// on each individual terminal transition, never on a timer.
    fn finalize_if_done(&mut self) {
        let Some(mission) = self.mission.as_mut() else {
            return;
        };
        if !matches!(mission.phase, MissionPhase::Dialing) {
            return;
        }
        if mission.completed_count() < mission.attempts.len() {
            return;
        }

        let offers: Vec<SlotOffer> = mission
            .attempts
            .iter()
            .flat_map(|a| {
                a.offered_slots.iter().map(|slot| SlotOffer {
                    provider: a.provider.clone(),
                    slot: *slot,
                })
            })
            .collect();

        let results = match scoring::score_with_credit(
            &offers,
            &mission.request.weights,
            &mission.request.free_windows,
            self.config.partial_availability_credit,
        ) {
            Ok(results) => results,
            Err(err) => {
                // Weights were validated at start; reaching this means a bug.
                error!(error = %err, "scoring failed at mission completion");
                Vec::new()
            }
        };

        info!(
            request_id = %mission.request.id,
            offers = offers.len(),
            ranked = results.len(),
            "mission complete"
        );
        mission.phase = MissionPhase::Completed {
            results: results.clone(),
        };
        self.events.publish(MissionEvent::MissionCompleted {
            request_id: mission.request.id,
            results,
        });
    }

    fn mark_attempt_failed(&mut self, provider_id: &ProviderId, note: String) {
        let Some(mission) = self.mission.as_mut() else {
            return;
        };
        let Some(attempt) = mission
            .attempts
            .iter_mut()
            .find(|a| &a.provider.id == provider_id)
        else {
            return;
        };
        if attempt.status.is_terminal() {
            return;
        }
        attempt.status = AttemptStatus::Failed;
        attempt.ended_at = Some(Utc::now());
        let utterance = Utterance::new(SpeakerRole::System, note);
        attempt.transcript.push(utterance.clone());
        self.events.publish(MissionEvent::UtteranceAdded {
            provider_id: provider_id.clone(),
            utterance,
        });
        self.events.publish(MissionEvent::StatusChanged {
            provider_id: provider_id.clone(),
            status: AttemptStatus::Failed,
        });
        let (completed, total) = (mission.completed_count(), mission.attempts.len());
        self.events
            .publish(MissionEvent::ProgressChanged { completed, total });
        self.finalize_if_done();
    }
}

// ============================================================================
// Actor
// ============================================================================

#[derive(Debug, Default)]
pub struct MissionControlActor;

#[async_trait]
impl Actor for MissionControlActor {
    type Msg = MissionControlMsg;
    type State = MissionControlState;
    type Arguments = MissionControlArguments;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        info!(actor_id = %myself.get_id(), "MissionControlActor starting");
        Ok(MissionControlState {
            config: args.config,
            directory: args.directory,
            oracle: args.oracle,
            voice: args.voice,
            chance: args.chance,
            events: MissionEventBus::default(),
            mission: None,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            MissionControlMsg::StartMission { request, reply } => {
                let result = self.handle_start(&myself, request, state).await;
                let _ = reply.send(result);
            }
            MissionControlMsg::AttemptUpdate(event) => {
                self.handle_attempt_update(event, state);
            }
            MissionControlMsg::StopMission { reply } => {
                let result = match state.mission.as_mut() {
                    None => Err(MissionError::NoActiveMission),
                    Some(mission) => {
                        for attempt in &mission.attempts {
                            let _ = attempt.actor.cast(CallAttemptMsg::Cancel);
                        }
                        if matches!(mission.phase, MissionPhase::Dialing) {
                            mission.phase = MissionPhase::Stopped;
                            state.events.publish(MissionEvent::MissionStopped {
                                request_id: mission.request.id,
                            });
                        }
                        Ok(())
                    }
                };
                let _ = reply.send(result);
            }
            MissionControlMsg::TakeoverAll { reply } => {
                let result = match state.mission.as_mut() {
                    None => Err(MissionError::NoActiveMission),
                    Some(mission) => {
                        for attempt in mission
                            .attempts
                            .iter_mut()
                            .filter(|a| !a.status.is_terminal())
                        {
                            attempt.suspended = true;
                            let _ = attempt.actor.cast(CallAttemptMsg::Takeover);
                        }
                        Ok(())
                    }
                };
                let _ = reply.send(result);
            }
            MissionControlMsg::ResumeAll { reply } => {
                let result = match state.mission.as_mut() {
                    None => Err(MissionError::NoActiveMission),
                    Some(mission) => {
                        for attempt in mission.attempts.iter_mut().filter(|a| a.suspended) {
                            attempt.suspended = false;
                            let _ = attempt.actor.cast(CallAttemptMsg::Resume);
                        }
                        Ok(())
                    }
                };
                let _ = reply.send(result);
            }
            MissionControlMsg::SendOverride {
                provider_id,
                text,
                reply,
            } => {
                let result = match state.mission.as_ref() {
                    None => Err(MissionError::NoActiveMission),
                    Some(mission) => {
                        match mission
                            .attempts
                            .iter()
                            .find(|a| a.provider.id == provider_id)
                        {
                            None => Err(MissionError::UnknownProvider(provider_id)),
                            Some(attempt) => {
                                match ractor::call_t!(
                                    attempt.actor,
                                    |r| CallAttemptMsg::UserSay { text, reply: r },
                                    1000
                                ) {
                                    Ok(Ok(())) => Ok(()),
                                    Ok(Err(err)) => Err(MissionError::Override(err)),
                                    Err(err) => {
                                        Err(MissionError::AttemptUnreachable(err.to_string()))
                                    }
                                }
                            }
                        }
                    }
                };
                let _ = reply.send(result);
            }
            MissionControlMsg::GetSnapshot { reply } => {
                let _ = reply.send(state.mission.as_ref().map(Mission::snapshot));
            }
            MissionControlMsg::SubscribeEvents { reply } => {
                let _ = reply.send(state.events.subscribe());
            }
        }
        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        _myself: ActorRef<Self::Msg>,
        event: SupervisionEvent,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match event {
            SupervisionEvent::ActorFailed(cell, failure) => {
                warn!(actor_id = %cell.get_id(), error = %failure, "call attempt crashed");
                let crashed = state.mission.as_ref().and_then(|m| {
                    m.attempts
                        .iter()
                        .find(|a| a.actor.get_id() == cell.get_id())
                        .map(|a| (a.provider.id.clone(), a.provider.name.clone()))
                });
                if let Some((provider_id, name)) = crashed {
                    state.mark_attempt_failed(
                        &provider_id,
                        format!("The call to {name} ended unexpectedly."),
                    );
                }
            }
            SupervisionEvent::ActorTerminated(..) | SupervisionEvent::ActorStarted(..) => {}
            _ => {}
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.discard_mission();
        Ok(())
    }
}

impl MissionControlActor {
    async fn handle_start(
        &self,
        myself: &ActorRef<MissionControlMsg>,
        request: BookingRequest,
        state: &mut MissionControlState,
    ) -> Result<MissionStarted, MissionError> {
        // Idempotent guard: the same request already dialing is a no-op.
        if let Some(mission) = &state.mission {
            if mission.request.id == request.id && matches!(mission.phase, MissionPhase::Dialing) {
                return Ok(MissionStarted {
                    request_id: request.id,
                    total_attempts: mission.attempts.len(),
                    already_running: true,
                });
            }
        }

        if request.weights.sum() <= 0.0 {
            return Err(MissionError::ZeroWeightSum);
        }

        let providers = state
            .directory
            .lookup(request.category, &request.location)
            .await?;

        // A new booking request discards every prior attempt and transcript.
        state.discard_mission();
        let request = Arc::new(request);

        if providers.is_empty() {
            info!(
                request_id = %request.id,
                category = %request.category,
                location = %request.location,
                "no providers found; mission will not proceed"
            );
            state
                .events
                .publish(MissionEvent::NoProviders { request_id: request.id });
            state.mission = Some(Mission {
                request: request.clone(),
                phase: MissionPhase::NoProviders,
                attempts: Vec::new(),
                pump: None,
            });
            return Ok(MissionStarted {
                request_id: request.id,
                total_attempts: 0,
                already_running: false,
            });
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let pump_target = myself.clone();
        let pump = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if pump_target
                    .cast(MissionControlMsg::AttemptUpdate(event))
                    .is_err()
                {
                    break;
                }
            }
        });

        let total = providers.len();
        let mut attempts = Vec::with_capacity(total);
        for provider in providers {
            let args = CallAttemptArguments {
                provider: provider.clone(),
                request: request.clone(),
                config: state.config.clone(),
                chance: state.chance.clone(),
                oracle: state.oracle.clone(),
                voice: state.voice.clone(),
                updates: tx.clone(),
            };
            let actor = match Actor::spawn_linked(None, CallAttemptActor, args, myself.get_cell())
                .await
            {
                Ok((actor, _handle)) => actor,
                Err(err) => {
                    error!(provider = %provider.name, error = %err, "failed to spawn call attempt; skipping provider");
                    continue;
                }
            };
            let _ = actor.cast(CallAttemptMsg::Begin);
            attempts.push(MissionAttempt {
                provider,
                actor,
                status: AttemptStatus::Pending,
                suspended: false,
                transcript: Vec::new(),
                offered_slots: Vec::new(),
                started_at: Some(Utc::now()),
                ended_at: None,
            });
        }

        info!(
            request_id = %request.id,
            attempts = attempts.len(),
            "mission started"
        );
        state.events.publish(MissionEvent::MissionStarted {
            request_id: request.id,
            total_attempts: attempts.len(),
        });
        let started = MissionStarted {
            request_id: request.id,
            total_attempts: attempts.len(),
            already_running: false,
        };
        state.mission = Some(Mission {
            request,
            phase: MissionPhase::Dialing,
            attempts,
            pump: Some(pump),
        });
        Ok(started)
    }

    fn handle_attempt_update(&self, event: AttemptEvent, state: &mut MissionControlState) {
        let Some(mission) = state.mission.as_mut() else {
            return;
        };
        if !matches!(mission.phase, MissionPhase::Dialing) {
            return;
        }
        // A delta from a discarded mission's attempt must not touch this one.
        if event.request_id != mission.request.id {
            return;
        }
        let total = mission.attempts.len();
        let Some(attempt) = mission
            .attempts
            .iter_mut()
            .find(|a| a.provider.id == event.provider_id)
        else {
            return;
        };

        match event.kind {
            AttemptEventKind::StatusChanged(status) => {
                attempt.status = status;
                state.events.publish(MissionEvent::StatusChanged {
                    provider_id: event.provider_id,
                    status,
                });
            }
            AttemptEventKind::UtteranceAdded(utterance) => {
                attempt.transcript.push(utterance.clone());
                state.events.publish(MissionEvent::UtteranceAdded {
                    provider_id: event.provider_id,
                    utterance,
                });
            }
            AttemptEventKind::Finished {
                status,
                offered_slots,
            } => {
                attempt.status = status;
                attempt.offered_slots = offered_slots;
                attempt.ended_at = Some(Utc::now());
                state.events.publish(MissionEvent::StatusChanged {
                    provider_id: event.provider_id,
                    status,
                });
                let completed = mission.completed_count();
                state
                    .events
                    .publish(MissionEvent::ProgressChanged { completed, total });
                state.finalize_if_done();
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
