//! Switchboard — concurrent provider-outreach engine.
//!
//! A mission fans out one simulated call per provider, each attempt driving
//! its own dialogue exchange against an external oracle. Offered slots are
//! validated against the user's free windows (reconciled from their
//! calendar) and the survivors are ranked by a weighted score.
//!
//! Entry points:
//! - [`actors::MissionControlActor`] — start/stop/observe a mission
//! - [`availability::reconcile`] — busy events → free windows
//! - [`scoring::score`] — (provider, slot) offers → ranked results

pub mod actors;
pub mod availability;
pub mod chance;
pub mod config;
pub mod directory;
pub mod oracle;
pub mod scoring;
pub mod voice;
