//! CallAttemptActor — one provider contact with its own lifecycle.
//!
//! The actor exclusively owns the attempt's transcript and status. A spawned
//! driver task walks the call timeline (ring delay, pickup roll, dialogue
//! exchange, pacing) and reports every step back as a mailbox message; the
//! actor is the only writer.
//!
//! Cancellation is cooperative and generation-guarded: takeover or cancel
//! aborts the driver and bumps the generation counter, so a driver message
//! already sitting in the mailbox is discarded on arrival. After takeover or
//! cancel, nothing mutates the transcript except an explicit user override.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use shared_types::{
    AttemptSnapshot, AttemptStatus, BookingRequest, Provider, ProviderId, ServiceCategory,
    SpeakerRole, TimeWindow, Utterance,
};

use crate::chance::ChanceSource;
use crate::config::Config;
use crate::oracle::{DialoguePort, DialogueRequest, ProviderSummary};
use crate::voice::{pacing_delay, VoicePort};

// ============================================================================
// Outbound events
// ============================================================================

/// Delta reported upward to the orchestrator as it happens.
///
/// Carries the request id so a delta from a discarded mission's attempt can
/// never bleed into a newer mission that reuses the same provider.
#[derive(Debug, Clone)]
pub struct AttemptEvent {
    pub request_id: uuid::Uuid,
    pub provider_id: ProviderId,
    pub kind: AttemptEventKind,
}

#[derive(Debug, Clone)]
pub enum AttemptEventKind {
    StatusChanged(AttemptStatus),
    UtteranceAdded(Utterance),
    Finished {
        status: AttemptStatus,
        offered_slots: Vec<TimeWindow>,
    },
}

// ============================================================================
// Actor contract
// ============================================================================

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AttemptError {
    #[error("attempt is already terminal ({0})")]
    AlreadyTerminal(AttemptStatus),
    #[error("attempt was cancelled")]
    Cancelled,
}

#[derive(Debug)]
pub enum CallAttemptMsg {
    /// Start the automated timeline. Ignored unless the attempt is pristine.
    Begin,
    /// Internal: driver requests a non-terminal transition.
    Transition {
        generation: u64,
        status: AttemptStatus,
        note: Option<String>,
    },
    /// Internal: driver appends a dialogue utterance.
    Append { generation: u64, utterance: Utterance },
    /// Internal: driver reached a terminal outcome.
    Finish {
        generation: u64,
        status: AttemptStatus,
        offered_slots: Vec<TimeWindow>,
        note: String,
    },
    /// User-authored utterance; appends without a state transition.
    UserSay {
        text: String,
        reply: RpcReplyPort<Result<(), AttemptError>>,
    },
    /// Freeze automated progression. Status is left as recorded.
    Takeover,
    /// Re-enable manual messaging. Automated dialogue is not replayed.
    Resume,
    /// Mission-level cancellation; permanent.
    Cancel,
    GetSnapshot { reply: RpcReplyPort<AttemptSnapshot> },
}

pub struct CallAttemptArguments {
    pub provider: Provider,
    pub request: Arc<BookingRequest>,
    pub config: Arc<Config>,
    pub chance: Arc<dyn ChanceSource>,
    pub oracle: Arc<dyn DialoguePort>,
    pub voice: Option<Arc<dyn VoicePort>>,
    pub updates: mpsc::UnboundedSender<AttemptEvent>,
}

pub struct CallAttemptState {
    provider: Provider,
    request: Arc<BookingRequest>,
    config: Arc<Config>,
    chance: Arc<dyn ChanceSource>,
    oracle: Arc<dyn DialoguePort>,
    voice: Option<Arc<dyn VoicePort>>,
    updates: mpsc::UnboundedSender<AttemptEvent>,

    status: AttemptStatus,
    suspended: bool,
    cancelled: bool,
    transcript: Vec<Utterance>,
    offered_slots: Vec<TimeWindow>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    /// Bumped on takeover/cancel; messages from older driver runs are stale.
    generation: u64,
    driver: Option<JoinHandle<()>>,
}

impl CallAttemptState {
    /// Whether a driver message from `generation` may still take effect.
    fn accepts(&self, generation: u64) -> bool {
        generation == self.generation
            && !self.cancelled
            && !self.suspended
            && !self.status.is_terminal()
    }

    fn abort_driver(&mut self) {
        self.generation += 1;
        if let Some(handle) = self.driver.take() {
            handle.abort();
        }
    }

    fn emit(&self, kind: AttemptEventKind) {
        let _ = self.updates.send(AttemptEvent {
            request_id: self.request.id,
            provider_id: self.provider.id.clone(),
            kind,
        });
    }

    fn push_utterance(&mut self, utterance: Utterance) {
        self.emit(AttemptEventKind::UtteranceAdded(utterance.clone()));
        self.transcript.push(utterance);
    }

    fn append_system(&mut self, text: String) {
        self.push_utterance(Utterance::new(SpeakerRole::System, text));
    }

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

    fn driver_context(&self) -> DriverContext {
        DriverContext {
            provider_name: self.provider.name.clone(),
            summary: ProviderSummary::from(&self.provider),
            category: self.request.category,
            need_description: self.request.description.clone(),
            free_windows: self.request.free_windows.clone(),
            config: self.config.clone(),
            chance: self.chance.clone(),
            oracle: self.oracle.clone(),
            voice: self.voice.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CallAttemptActor;

#[async_trait]
impl Actor for CallAttemptActor {
    type Msg = CallAttemptMsg;
    type State = CallAttemptState;
    type Arguments = CallAttemptArguments;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(CallAttemptState {
            provider: args.provider,
            request: args.request,
            config: args.config,
            chance: args.chance,
            oracle: args.oracle,
            voice: args.voice,
            updates: args.updates,
            status: AttemptStatus::Pending,
            suspended: false,
            cancelled: false,
            transcript: Vec::new(),
            offered_slots: Vec::new(),
            started_at: None,
            ended_at: None,
            generation: 0,
            driver: None,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            CallAttemptMsg::Begin => {
                // Strictly one-shot: a repeated Begin (or one arriving after
                // takeover/resume) must never restart automation.
                if state.started_at.is_some() || state.cancelled {
                    return Ok(());
                }
                state.started_at = Some(Utc::now());
                let handle =
                    tokio::spawn(drive(myself.clone(), state.generation, state.driver_context()));
                state.driver = Some(handle);
            }
            CallAttemptMsg::Transition {
                generation,
                status,
                note,
            } => {
                if !state.accepts(generation) {
                    return Ok(());
                }
                state.status = status;
                state.emit(AttemptEventKind::StatusChanged(status));
                if let Some(text) = note {
                    state.append_system(text);
                }
            }
            CallAttemptMsg::Append { generation, utterance } => {
                if !state.accepts(generation) {
                    return Ok(());
                }
                state.push_utterance(utterance);
            }
            CallAttemptMsg::Finish {
                generation,
                status,
                offered_slots,
                note,
            } => {
                if !state.accepts(generation) {
                    return Ok(());
                }
                state.status = status;
                state.offered_slots = offered_slots.clone();
                state.ended_at = Some(Utc::now());
                state.append_system(note);
                state.emit(AttemptEventKind::Finished {
                    status,
                    offered_slots,
                });
                state.driver = None;
            }
            CallAttemptMsg::UserSay { text, reply } => {
                let result = if state.cancelled {
                    Err(AttemptError::Cancelled)
                } else if state.status.is_terminal() {
                    Err(AttemptError::AlreadyTerminal(state.status))
                } else {
                    state.push_utterance(Utterance::new(SpeakerRole::User, text));
                    Ok(())
                };
                let _ = reply.send(result);
            }
            CallAttemptMsg::Takeover => {
                if state.cancelled || state.status.is_terminal() {
                    return Ok(());
                }
                state.suspended = true;
                state.abort_driver();
                debug!(provider = %state.provider.name, status = %state.status, "attempt taken over");
            }
            CallAttemptMsg::Resume => {
                if !state.cancelled {
                    state.suspended = false;
                }
            }
            CallAttemptMsg::Cancel => {
                if state.cancelled {
                    return Ok(());
                }
                state.cancelled = true;
                state.abort_driver();
            }
            CallAttemptMsg::GetSnapshot { reply } => {
                let _ = reply.send(state.snapshot());
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.abort_driver();
        Ok(())
    }
}

// ============================================================================
// Driver
// ============================================================================

struct DriverContext {
    provider_name: String,
    summary: ProviderSummary,
    category: ServiceCategory,
    need_description: String,
    free_windows: Vec<TimeWindow>,
    config: Arc<Config>,
    chance: Arc<dyn ChanceSource>,
    oracle: Arc<dyn DialoguePort>,
    voice: Option<Arc<dyn VoicePort>>,
}

/// Walk the call timeline. Runs outside the actor; every mutation goes back
/// through the mailbox where the generation guard has the final say.
async fn drive(myself: ActorRef<CallAttemptMsg>, generation: u64, ctx: DriverContext) {
    let config = &ctx.config;

    sleep_ms(ctx.chance.jitter_ms(config.ring_delay_min_ms, config.ring_delay_max_ms)).await;
    let _ = myself.cast(CallAttemptMsg::Transition {
        generation,
        status: AttemptStatus::Ringing,
        note: Some(format!("Calling {}…", ctx.provider_name)),
    });

    sleep_ms(ctx.chance.jitter_ms(config.ring_duration_min_ms, config.ring_duration_max_ms)).await;
    if ctx.chance.rolls_no_answer(config.no_answer_probability) {
        finish(
            &myself,
            generation,
            AttemptStatus::NoAnswer,
            vec![],
            format!("{} did not answer.", ctx.provider_name),
        );
        return;
    }

    let _ = myself.cast(CallAttemptMsg::Transition {
        generation,
        status: AttemptStatus::InProgress,
        note: Some(format!("Connected to {}", ctx.provider_name)),
    });

    let request = DialogueRequest {
        provider: ctx.summary.clone(),
        category: ctx.category,
        free_windows: ctx.free_windows.clone(),
        need_description: ctx.need_description.clone(),
    };
    let response = match tokio::time::timeout(config.oracle_timeout, ctx.oracle.exchange(request)).await
    {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            finish(
                &myself,
                generation,
                AttemptStatus::Failed,
                vec![],
                format!("Call to {} ran into a problem: {err}", ctx.provider_name),
            );
            return;
        }
        Err(_) => {
            finish(
                &myself,
                generation,
                AttemptStatus::Failed,
                vec![],
                format!("Call to {} timed out.", ctx.provider_name),
            );
            return;
        }
    };

    // One line at a time: utterance N+1 never lands before N's pacing (or
    // playback) completes.
    for utterance in &response.utterances {
        pace(&utterance.text, &ctx).await;
        let _ = myself.cast(CallAttemptMsg::Append {
            generation,
            utterance: Utterance::new(utterance.role.into(), utterance.text.clone()),
        });
    }

    // Validation is authoritative over the oracle's verdict: a proposed slot
    // outside every free window is discarded, and an emptied list fails the
    // attempt no matter what the oracle claimed.
    let valid: Vec<TimeWindow> = response
        .verdict
        .proposed_slots
        .iter()
        .filter(|slot| ctx.free_windows.iter().any(|w| w.contains(slot)))
        .cloned()
        .collect();

    if response.verdict.has_availability && !valid.is_empty() {
        let note = format!("{} offered {} bookable slot(s).", ctx.provider_name, valid.len());
        finish(&myself, generation, AttemptStatus::Complete, valid, note);
    } else if response.verdict.has_availability {
        finish(
            &myself,
            generation,
            AttemptStatus::Failed,
            vec![],
            format!("{} only offered times outside your free windows.", ctx.provider_name),
        );
    } else {
        finish(
            &myself,
            generation,
            AttemptStatus::Failed,
            vec![],
            format!("{} has no availability.", ctx.provider_name),
        );
    }
}

fn finish(
    myself: &ActorRef<CallAttemptMsg>,
    generation: u64,
    status: AttemptStatus,
    offered_slots: Vec<TimeWindow>,
    note: String,
) {
    let _ = myself.cast(CallAttemptMsg::Finish {
        generation,
        status,
        offered_slots,
        note,
    });
}

async fn pace(text: &str, ctx: &DriverContext) {
    if let Some(voice) = &ctx.voice {
        match voice.speak(text, &ctx.config.voice_profile).await {
            Ok(()) => return,
            Err(err) => {
                debug!(error = %err, "voice playback unavailable, using pacing delay");
            }
        }
    }
    tokio::time::sleep(pacing_delay(text, &ctx.config)).await;
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
}

// ============================================================================
// Tests
// ============================================================================
