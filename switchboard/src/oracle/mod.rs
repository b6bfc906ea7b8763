//! Dialogue oracle port.
//!
//! The oracle is the external generator of call dialogue: given a provider
//! summary, the user's need, and their free windows, it returns an ordered
//! utterance list plus a terminal availability verdict. The engine consumes
//! it as an opaque capability behind [`DialoguePort`] — everything about
//! how the text is produced lives on the far side of this trait.
//!
//! The verdict is advisory. Window-containment validation in the call
//! attempt is authoritative and may overrule `has_availability`.

mod http;
mod scripted;

pub use http::HttpDialogueOracle;
pub use scripted::ScriptedOracle;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{Provider, ServiceCategory, SpeakerRole, TimeWindow};

/// Public provider attributes shared with the oracle. Contact details the
/// dialogue doesn't need are withheld.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProviderSummary {
    pub name: String,
    pub category: ServiceCategory,
    pub address: String,
    pub rating: f64,
}

impl From<&Provider> for ProviderSummary {
    fn from(provider: &Provider) -> Self {
        Self {
            name: provider.name.clone(),
            category: provider.category,
            address: provider.address.clone(),
            rating: provider.rating,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DialogueRequest {
    pub provider: ProviderSummary,
    pub category: ServiceCategory,
    pub free_windows: Vec<TimeWindow>,
    pub need_description: String,
}

/// Who speaks a generated line. The oracle only ever produces the two call
/// participants; user and system lines are appended locally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OracleRole {
    Agent,
    Counterparty,
}

impl From<OracleRole> for SpeakerRole {
    fn from(role: OracleRole) -> Self {
        match role {
            OracleRole::Agent => SpeakerRole::Agent,
            OracleRole::Counterparty => SpeakerRole::Counterparty,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OracleUtterance {
    pub role: OracleRole,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DialogueVerdict {
    pub has_availability: bool,
    #[serde(default)]
    pub proposed_slots: Vec<TimeWindow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DialogueResponse {
    pub utterances: Vec<OracleUtterance>,
    pub verdict: DialogueVerdict,
}

/// Oracle failure taxonomy. `Contract` (malformed output) is distinguishable
/// from `Transport` so callers can tell a broken oracle from a broken wire;
/// neither is retried within a mission.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Transport(String),
    #[error("oracle returned malformed output: {0}")]
    Contract(String),
    #[error("oracle call exceeded {0} ms")]
    Timeout(u64),
}

/// One dialogue exchange per call attempt.
#[async_trait]
pub trait DialoguePort: Send + Sync {
    async fn exchange(&self, request: DialogueRequest) -> Result<DialogueResponse, OracleError>;
}
