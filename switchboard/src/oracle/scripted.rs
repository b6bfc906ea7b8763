//! Deterministic oracle for tests and offline demos.
//!
//! Responses are keyed by provider name and fixed at construction, so a
//! mission driven by this oracle is fully reproducible.

use std::collections::HashMap;

use async_trait::async_trait;
use shared_types::TimeWindow;

use super::{
    DialoguePort, DialogueRequest, DialogueResponse, DialogueVerdict, OracleError, OracleRole,
    OracleUtterance,
};

pub struct ScriptedOracle {
    responses: HashMap<String, Result<DialogueResponse, OracleError>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
        }
    }

    /// Script a full response for one provider.
    pub fn with_response(mut self, provider_name: &str, response: DialogueResponse) -> Self {
        self.responses
            .insert(provider_name.to_string(), Ok(response));
        self
    }

    /// Script a short booking exchange that offers the given slots.
    pub fn with_offer(self, provider_name: &str, slots: Vec<TimeWindow>) -> Self {
        let response = DialogueResponse {
            utterances: vec![
                OracleUtterance {
                    role: OracleRole::Counterparty,
                    text: format!("{provider_name}, good morning! How can I help?"),
                },
                OracleUtterance {
                    role: OracleRole::Agent,
                    text: "Hi, I'm calling on behalf of a client to book an appointment."
                        .to_string(),
                },
                OracleUtterance {
                    role: OracleRole::Counterparty,
                    text: if slots.is_empty() {
                        "Let me check… I'm sorry, we're fully booked.".to_string()
                    } else {
                        "Let me check the schedule… yes, we can fit that in.".to_string()
                    },
                },
            ],
            verdict: DialogueVerdict {
                has_availability: !slots.is_empty(),
                proposed_slots: slots,
            },
        };
        self.with_response(provider_name, response)
    }

    /// Script a failure for one provider.
    pub fn with_failure(mut self, provider_name: &str, error: OracleError) -> Self {
        self.responses
            .insert(provider_name.to_string(), Err(error));
        self
    }
}

impl Default for ScriptedOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DialoguePort for ScriptedOracle {
    async fn exchange(&self, request: DialogueRequest) -> Result<DialogueResponse, OracleError> {
        match self.responses.get(&request.provider.name) {
            Some(scripted) => scripted.clone(),
            // Unscripted providers politely decline.
            None => Ok(DialogueResponse {
                utterances: vec![OracleUtterance {
                    role: OracleRole::Counterparty,
                    text: format!("{}, sorry, we have nothing open.", request.provider.name),
                }],
                verdict: DialogueVerdict {
                    has_availability: false,
                    proposed_slots: vec![],
                },
            }),
        }
    }
}
