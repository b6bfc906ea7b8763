//! JSON-over-HTTP dialogue oracle client.
//!
//! Posts the dialogue request to a gateway endpoint and parses the response
//! body as a [`DialogueResponse`]. Some gateways wrap JSON in markdown code
//! fences; those are stripped before parsing. Every wait is bounded by the
//! configured timeout.

use std::time::Duration;

use async_trait::async_trait;

use super::{DialoguePort, DialogueRequest, DialogueResponse, OracleError};

pub struct HttpDialogueOracle {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpDialogueOracle {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
            timeout,
        }
    }

    async fn post(&self, request: &DialogueRequest) -> Result<String, OracleError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(OracleError::Transport(format!(
                "gateway returned {status}: {}",
                excerpt(&body)
            )));
        }
        Ok(body)
    }
}

#[async_trait]
impl DialoguePort for HttpDialogueOracle {
    async fn exchange(&self, request: DialogueRequest) -> Result<DialogueResponse, OracleError> {
        let body = tokio::time::timeout(self.timeout, self.post(&request))
            .await
            .map_err(|_| OracleError::Timeout(self.timeout.as_millis() as u64))??;

        parse_response(&body)
    }
}

/// Parse a gateway body into a dialogue response.
///
/// Any parse failure is a contract violation, not a retry-worthy condition:
/// the caller records the attempt as failed.
fn parse_response(body: &str) -> Result<DialogueResponse, OracleError> {
    let cleaned = strip_code_fences(body);
    serde_json::from_str(cleaned)
        .map_err(|e| OracleError::Contract(format!("{e} in body: {}", excerpt(cleaned))))
}

fn strip_code_fences(body: &str) -> &str {
    let trimmed = body.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn excerpt(body: &str) -> String {
    const LIMIT: usize = 160;
    if body.len() <= LIMIT {
        body.to_string()
    } else {
        let mut end = LIMIT;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &body[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleRole;

    const VALID: &str = r#"{
        "utterances": [
            {"role": "counterparty", "text": "CityHealth, how can I help?"},
            {"role": "agent", "text": "Calling to book a checkup."}
        ],
        "verdict": {"has_availability": true, "proposed_slots": []}
    }"#;

    #[test]
    fn parses_plain_json() {
        let response = parse_response(VALID).unwrap();
        assert_eq!(response.utterances.len(), 2);
        assert_eq!(response.utterances[0].role, OracleRole::Counterparty);
        assert!(response.verdict.has_availability);
    }

    #[test]
    fn parses_fenced_json() {
        let fenced = format!("```json\n{VALID}\n```");
        assert!(parse_response(&fenced).is_ok());
    }

    #[test]
    fn malformed_body_is_a_contract_error() {
        let err = parse_response("I couldn't reach the receptionist, sorry!").unwrap_err();
        assert!(matches!(err, OracleError::Contract(_)));
    }

    #[test]
    fn wrong_shape_is_a_contract_error() {
        let err = parse_response(r#"{"messages": []}"#).unwrap_err();
        assert!(matches!(err, OracleError::Contract(_)));
    }
}
