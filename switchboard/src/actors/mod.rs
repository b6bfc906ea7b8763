//! Actor layer: one `CallAttemptActor` per provider contact, owned and
//! aggregated by `MissionControlActor`, with incremental updates fanned out
//! through `MissionEventBus`.

pub mod call_attempt;
pub mod events;
pub mod mission_control;

pub use call_attempt::{
    AttemptError, AttemptEvent, AttemptEventKind, CallAttemptActor, CallAttemptArguments,
    CallAttemptMsg,
};
pub use events::{MissionEvent, MissionEventBus};
pub use mission_control::{
    MissionControlActor, MissionControlArguments, MissionControlMsg, MissionError, MissionStarted,
};
