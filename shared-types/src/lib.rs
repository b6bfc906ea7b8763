//! Shared types for the switchboard outreach engine
//!
//! These types cross every seam in the system:
//! - actor messages and snapshots (native Rust)
//! - the dialogue-oracle wire contract (JSON)
//!
//! Serializable with serde so snapshots can be shipped over any transport
//! the presentation layer chooses.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a service provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ProviderId(pub String);

impl ProviderId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ProviderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Calendar Types
// ============================================================================

/// Minutes in one local day. Busy intervals that run past midnight clip here.
pub const MINUTES_PER_DAY: u16 = 1440;

/// A contiguous span of one local calendar day.
///
/// `day` is a plain date with no timezone offset; `start`/`end` are local
/// wall-clock times. Invariant: `start < end`. Comparisons between windows
/// never go through a timezone-aware instant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    pub day: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    /// Build a window, rejecting empty or inverted spans.
    pub fn new(day: NaiveDate, start: NaiveTime, end: NaiveTime) -> Option<Self> {
        if start < end {
            Some(Self { day, start, end })
        } else {
            None
        }
    }

    /// Minute-of-day of the window start (0..1440).
    pub fn start_minute(&self) -> u16 {
        (self.start.hour() * 60 + self.start.minute()) as u16
    }

    /// Minute-of-day of the window end (0..1440).
    pub fn end_minute(&self) -> u16 {
        (self.end.hour() * 60 + self.end.minute()) as u16
    }

    /// True if `other` lies entirely within this window (same day).
    pub fn contains(&self, other: &TimeWindow) -> bool {
        self.day == other.day && self.start <= other.start && other.end <= self.end
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.day,
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// A busy span on the user's calendar, pre-localized to wall-clock fields.
///
/// Calendar sources hand out instants; localization happens exactly once, in
/// [`BusyEvent::from_local`]. Downstream interval arithmetic only ever sees
/// the day/minute fields, so no later conversion can shift the date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BusyEvent {
    pub summary: String,
    pub start_day: NaiveDate,
    /// Minute-of-day the busy span starts (0..1440)
    pub start_minute: u16,
    pub end_day: NaiveDate,
    /// Minute-of-day the busy span ends (0..1440)
    pub end_minute: u16,
    pub all_day: bool,
}

impl BusyEvent {
    /// Split already-localized timestamps into day + minute-of-day fields.
    pub fn from_local(summary: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime, all_day: bool) -> Self {
        Self {
            summary: summary.into(),
            start_day: start.date(),
            start_minute: (start.time().hour() * 60 + start.time().minute()) as u16,
            end_day: end.date(),
            end_minute: (end.time().hour() * 60 + end.time().minute()) as u16,
            all_day,
        }
    }

    /// True if any part of this busy span falls on `day`.
    pub fn touches_day(&self, day: NaiveDate) -> bool {
        self.start_day <= day && day <= self.end_day
    }

    /// True if the span occupies a non-zero stretch of `day`.
    ///
    /// A span ending exactly at `day` 00:00 touches the date but occupies
    /// none of it — calendar sources encode "all of Tuesday" as
    /// Tue 00:00 → Wed 00:00, and Wednesday must not be blocked by it.
    pub fn occupies_day(&self, day: NaiveDate) -> bool {
        self.start_day <= day && (day < self.end_day || (day == self.end_day && self.end_minute > 0))
    }
}

// ============================================================================
// Providers
// ============================================================================

/// Kind of service the user is trying to book
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Medical,
    Auto,
    Beauty,
    Home,
    Fitness,
    Legal,
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ServiceCategory::Medical => "medical",
            ServiceCategory::Auto => "auto",
            ServiceCategory::Beauty => "beauty",
            ServiceCategory::Home => "home",
            ServiceCategory::Fitness => "fitness",
            ServiceCategory::Legal => "legal",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for ServiceCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "medical" => Ok(Self::Medical),
            "auto" => Ok(Self::Auto),
            "beauty" => Ok(Self::Beauty),
            "home" => Ok(Self::Home),
            "fitness" => Ok(Self::Fitness),
            "legal" => Ok(Self::Legal),
            other => Err(format!("unknown service category '{other}'")),
        }
    }
}

/// A bookable service provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    pub category: ServiceCategory,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub phone: String,
    /// Quality rating in [0, 5]
    pub rating: f64,
    /// Distance from the user, non-negative miles
    pub distance_miles: f64,
    /// Windows this provider can offer
    pub offered_windows: Vec<TimeWindow>,
}

// ============================================================================
// Transcript
// ============================================================================

/// Who produced a transcript line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerRole {
    /// The automated booking agent
    Agent,
    /// Whoever answered at the provider
    Counterparty,
    /// The human user, via manual override
    User,
    /// Lifecycle notes (dialing, connected, failure reasons)
    System,
}

/// One append-only transcript line.
///
/// Ordering is causal within an attempt: the timestamp of entry N+1 is never
/// earlier than entry N's.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Utterance {
    /// ULID, sortable by creation time
    pub id: String,
    pub role: SpeakerRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Utterance {
    pub fn new(role: SpeakerRole, text: impl Into<String>) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

// ============================================================================
// Call Attempt Lifecycle
// ============================================================================

/// Call attempt state machine.
///
/// `Pending → Ringing → InProgress → {Complete | Failed | NoAnswer}`.
/// Takeover freezes progression without changing the recorded status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AttemptStatus {
    Pending,
    Ringing,
    InProgress,
    Complete,
    Failed,
    NoAnswer,
}

impl AttemptStatus {
    /// True once no further automated transition can occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::NoAnswer)
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AttemptStatus::Pending => "pending",
            AttemptStatus::Ringing => "ringing",
            AttemptStatus::InProgress => "in-progress",
            AttemptStatus::Complete => "complete",
            AttemptStatus::Failed => "failed",
            AttemptStatus::NoAnswer => "no-answer",
        };
        write!(f, "{name}")
    }
}

// ============================================================================
// Booking Request & Scoring
// ============================================================================

/// Relative importance of each scoring component. Need not sum to 1; a zero
/// sum is a caller bug and is rejected by the scorer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreWeights {
    pub availability: f64,
    pub rating: f64,
    pub distance: f64,
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.availability + self.rating + self.distance
    }
}

/// Immutable seed of one outreach mission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingRequest {
    pub id: uuid::Uuid,
    /// What the user needs, in their own words
    pub description: String,
    pub category: ServiceCategory,
    /// Free-text location hint used for directory lookup
    pub location: String,
    /// Free windows, already reconciled against the user's calendar
    pub free_windows: Vec<TimeWindow>,
    pub weights: ScoreWeights,
    pub created_at: DateTime<Utc>,
}

/// A (provider, slot) pair entering the scorer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotOffer {
    pub provider: Provider,
    pub slot: TimeWindow,
}

/// Per-component scores, integer percent in [0, 100].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub availability: u8,
    pub rating: u8,
    pub distance: u8,
}

/// A ranked offer. Value object: recomputed whenever scoring runs, never
/// mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredOffer {
    pub provider: Provider,
    pub slot: TimeWindow,
    pub breakdown: ScoreBreakdown,
    pub total: u8,
}

// ============================================================================
// Snapshots
// ============================================================================

/// Read-only projection of one call attempt, safe to hand to observers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptSnapshot {
    pub provider: Provider,
    pub status: AttemptStatus,
    /// True while a takeover has automation frozen
    pub suspended: bool,
    pub transcript: Vec<Utterance>,
    pub offered_slots: Vec<TimeWindow>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Where the mission as a whole stands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum MissionPhase {
    /// Attempts are in flight
    Dialing,
    /// Directory lookup returned nothing; no attempts were spawned
    NoProviders,
    /// Every attempt is terminal; offers are scored
    Completed { results: Vec<ScoredOffer> },
    /// Stopped by the user before completion
    Stopped,
}

/// Read-only projection of the whole mission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissionSnapshot {
    pub request_id: uuid::Uuid,
    pub phase: MissionPhase,
    pub attempts: Vec<AttemptSnapshot>,
    /// Attempts that reached a terminal state
    pub completed: usize,
    pub total: usize,
}

impl MissionSnapshot {
    /// Aggregate progress in [0, 100].
    pub fn progress_percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed * 100) / self.total) as u8
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn window_rejects_inverted_span() {
        assert!(TimeWindow::new(d("2026-02-10"), t(9, 0), t(8, 0)).is_none());
        assert!(TimeWindow::new(d("2026-02-10"), t(9, 0), t(9, 0)).is_none());
        assert!(TimeWindow::new(d("2026-02-10"), t(8, 0), t(9, 0)).is_some());
    }

    #[test]
    fn window_containment_same_day_only() {
        let outer = TimeWindow::new(d("2026-02-10"), t(8, 0), t(18, 0)).unwrap();
        let inner = TimeWindow::new(d("2026-02-10"), t(9, 0), t(10, 0)).unwrap();
        let other_day = TimeWindow::new(d("2026-02-11"), t(9, 0), t(10, 0)).unwrap();

        assert!(outer.contains(&inner));
        assert!(outer.contains(&outer));
        assert!(!outer.contains(&other_day));
        assert!(!inner.contains(&outer));
    }

    #[test]
    fn window_minutes() {
        let w = TimeWindow::new(d("2026-02-10"), t(8, 30), t(17, 45)).unwrap();
        assert_eq!(w.start_minute(), 510);
        assert_eq!(w.end_minute(), 1065);
    }

    #[test]
    fn busy_event_localizes_once() {
        let start = d("2026-02-10").and_hms_opt(9, 0, 0).unwrap();
        let end = d("2026-02-11").and_hms_opt(0, 0, 0).unwrap();
        let busy = BusyEvent::from_local("standup", start, end, false);

        assert_eq!(busy.start_day, d("2026-02-10"));
        assert_eq!(busy.start_minute, 540);
        // Midnight of the next day stays on the next day; the reconciler
        // clips it to end-of-day when slicing per-day intervals.
        assert_eq!(busy.end_day, d("2026-02-11"));
        assert_eq!(busy.end_minute, 0);
        assert!(busy.touches_day(d("2026-02-10")));
        assert!(busy.touches_day(d("2026-02-11")));
        assert!(!busy.touches_day(d("2026-02-12")));
    }

    #[test]
    fn occupies_day_excludes_trailing_midnight() {
        let start = d("2026-02-10").and_hms_opt(0, 0, 0).unwrap();
        let end = d("2026-02-11").and_hms_opt(0, 0, 0).unwrap();
        let busy = BusyEvent::from_local("all of tuesday", start, end, true);

        assert!(busy.occupies_day(d("2026-02-10")));
        assert!(!busy.occupies_day(d("2026-02-11")));

        let late = BusyEvent::from_local(
            "late dinner",
            d("2026-02-10").and_hms_opt(22, 0, 0).unwrap(),
            d("2026-02-11").and_hms_opt(1, 30, 0).unwrap(),
            false,
        );
        assert!(late.occupies_day(d("2026-02-10")));
        assert!(late.occupies_day(d("2026-02-11")));
    }

    #[test]
    fn terminal_statuses() {
        assert!(!AttemptStatus::Pending.is_terminal());
        assert!(!AttemptStatus::Ringing.is_terminal());
        assert!(!AttemptStatus::InProgress.is_terminal());
        assert!(AttemptStatus::Complete.is_terminal());
        assert!(AttemptStatus::Failed.is_terminal());
        assert!(AttemptStatus::NoAnswer.is_terminal());
    }

    #[test]
    fn category_round_trips_through_str() {
        for cat in [
            ServiceCategory::Medical,
            ServiceCategory::Auto,
            ServiceCategory::Beauty,
            ServiceCategory::Home,
            ServiceCategory::Fitness,
            ServiceCategory::Legal,
        ] {
            let parsed: ServiceCategory = cat.to_string().parse().unwrap();
            assert_eq!(parsed, cat);
        }
        assert!("plumbing".parse::<ServiceCategory>().is_err());
    }

    #[test]
    fn progress_percent_handles_empty_mission() {
        let snap = MissionSnapshot {
            request_id: uuid::Uuid::new_v4(),
            phase: MissionPhase::NoProviders,
            attempts: vec![],
            completed: 0,
            total: 0,
        };
        assert_eq!(snap.progress_percent(), 0);
    }
}
