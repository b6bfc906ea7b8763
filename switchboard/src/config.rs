//! Engine tunables.
//!
//! Every timing bound and probability the call timeline uses lives here,
//! loadable from the environment with sensible defaults. None of these are
//! correctness requirements — they shape pacing and simulation texture.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Jitter bounds before an attempt starts ringing, so concurrent
    /// attempts never appear synchronized.
    pub ring_delay_min_ms: u64,
    pub ring_delay_max_ms: u64,
    /// How long the line rings before pickup (or no-answer) resolves.
    pub ring_duration_min_ms: u64,
    pub ring_duration_max_ms: u64,
    /// Probability in [0, 1] that a provider never picks up.
    pub no_answer_probability: f64,
    /// Inter-utterance pacing: base + per-character, capped.
    pub pacing_base_ms: u64,
    pub pacing_per_char_ms: u64,
    pub pacing_max_ms: u64,
    /// Bounded wait for one dialogue-oracle exchange.
    pub oracle_timeout: Duration,
    /// Availability credit for a slot outside every free window, in [0, 1].
    pub partial_availability_credit: f64,
    /// Voice profile handed to the playback port.
    pub voice_profile: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ring_delay_min_ms: 500,
            ring_delay_max_ms: 2000,
            ring_duration_min_ms: 2000,
            ring_duration_max_ms: 3500,
            no_answer_probability: 0.10,
            pacing_base_ms: 800,
            pacing_per_char_ms: 25,
            pacing_max_ms: 4000,
            oracle_timeout: Duration::from_secs(30),
            partial_availability_credit: crate::scoring::DEFAULT_PARTIAL_AVAILABILITY_CREDIT,
            voice_profile: "narrator".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse env var {key}={value}: {reason}")]
    Parse {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("{key}={value} is out of range: {constraint}")]
    OutOfRange {
        key: &'static str,
        value: f64,
        constraint: &'static str,
    },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            ring_delay_min_ms: env_parse("SWITCHBOARD_RING_DELAY_MIN_MS", defaults.ring_delay_min_ms)?,
            ring_delay_max_ms: env_parse("SWITCHBOARD_RING_DELAY_MAX_MS", defaults.ring_delay_max_ms)?,
            ring_duration_min_ms: env_parse(
                "SWITCHBOARD_RING_DURATION_MIN_MS",
                defaults.ring_duration_min_ms,
            )?,
            ring_duration_max_ms: env_parse(
                "SWITCHBOARD_RING_DURATION_MAX_MS",
                defaults.ring_duration_max_ms,
            )?,
            no_answer_probability: env_parse(
                "SWITCHBOARD_NO_ANSWER_PROBABILITY",
                defaults.no_answer_probability,
            )?,
            pacing_base_ms: env_parse("SWITCHBOARD_PACING_BASE_MS", defaults.pacing_base_ms)?,
            pacing_per_char_ms: env_parse("SWITCHBOARD_PACING_PER_CHAR_MS", defaults.pacing_per_char_ms)?,
            pacing_max_ms: env_parse("SWITCHBOARD_PACING_MAX_MS", defaults.pacing_max_ms)?,
            oracle_timeout: Duration::from_millis(env_parse(
                "SWITCHBOARD_ORACLE_TIMEOUT_MS",
                defaults.oracle_timeout.as_millis() as u64,
            )?),
            partial_availability_credit: env_parse(
                "SWITCHBOARD_PARTIAL_AVAILABILITY_CREDIT",
                defaults.partial_availability_credit,
            )?,
            voice_profile: std::env::var("SWITCHBOARD_VOICE_PROFILE")
                .unwrap_or(defaults.voice_profile),
        };

        if !(0.0..=1.0).contains(&config.no_answer_probability) {
            return Err(ConfigError::OutOfRange {
                key: "SWITCHBOARD_NO_ANSWER_PROBABILITY",
                value: config.no_answer_probability,
                constraint: "must be within [0, 1]",
            });
        }
        if !(0.0..=1.0).contains(&config.partial_availability_credit) {
            return Err(ConfigError::OutOfRange {
                key: "SWITCHBOARD_PARTIAL_AVAILABILITY_CREDIT",
                value: config.partial_availability_credit,
                constraint: "must be within [0, 1]",
            });
        }

        Ok(config)
    }
}

fn env_parse<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value.parse::<T>().map_err(|e| ConfigError::Parse {
            key,
            value,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert!(config.ring_delay_min_ms <= config.ring_delay_max_ms);
        assert!(config.ring_duration_min_ms <= config.ring_duration_max_ms);
        assert!((0.0..=1.0).contains(&config.no_answer_probability));
        assert!((0.0..=1.0).contains(&config.partial_availability_credit));
        assert!(config.oracle_timeout >= Duration::from_secs(1));
    }

    #[test]
    fn env_parse_prefers_default_when_unset() {
        let value: u64 = env_parse("SWITCHBOARD_TEST_KEY_THAT_IS_NEVER_SET", 1234).unwrap();
        assert_eq!(value, 1234);
    }
}
