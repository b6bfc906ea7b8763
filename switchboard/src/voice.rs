//! Voice playback port.
//!
//! Narration is strictly optional: when a backend exists, the inter-utterance
//! wait is the actual playback duration; when it fails or is absent, callers
//! fall back to the length-proportional pacing delay. A broken voice backend
//! is never a mission error.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("voice backend unavailable: {0}")]
    Unavailable(String),
    #[error("playback failed: {0}")]
    Playback(String),
}

/// Speak `text` and resolve when playback ends.
#[async_trait]
pub trait VoicePort: Send + Sync {
    async fn speak(&self, text: &str, profile: &str) -> Result<(), VoiceError>;
}

/// Backend for environments without audio output. Always reports
/// unavailable, which routes callers to the pacing delay.
#[derive(Debug, Default)]
pub struct NullVoice;

#[async_trait]
impl VoicePort for NullVoice {
    async fn speak(&self, _text: &str, _profile: &str) -> Result<(), VoiceError> {
        Err(VoiceError::Unavailable("no audio backend configured".to_string()))
    }
}

/// Readability delay for one utterance: base + per-character, capped.
pub fn pacing_delay(text: &str, config: &Config) -> Duration {
    let ms = config
        .pacing_base_ms
        .saturating_add(text.len() as u64 * config.pacing_per_char_ms)
        .min(config.pacing_max_ms);
    Duration::from_millis(ms)
}
