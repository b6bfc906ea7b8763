//! Offer ranking.
//!
//! Pure scoring of (provider, slot) pairs against the user's free windows
//! and preference weights. Recomputed from scratch every call; nothing here
//! holds state between runs.

use shared_types::{ScoreBreakdown, ScoreWeights, ScoredOffer, SlotOffer, TimeWindow};
use thiserror::Error;

/// Credit granted to a slot that falls outside every free window. An
/// imperfect but real offer still has value, so this is partial rather
/// than zero. Override via `Config::partial_availability_credit`.
pub const DEFAULT_PARTIAL_AVAILABILITY_CREDIT: f64 = 0.4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScoringError {
    #[error("score weights sum to zero or less; at least one weight must be positive")]
    ZeroWeightSum,
}

/// Rank offers with the default partial-availability credit.
pub fn score(
    offers: &[SlotOffer],
    weights: &ScoreWeights,
    free_windows: &[TimeWindow],
) -> Result<Vec<ScoredOffer>, ScoringError> {
    score_with_credit(offers, weights, free_windows, DEFAULT_PARTIAL_AVAILABILITY_CREDIT)
}

/// Rank offers, highest total first; ties keep input order (stable sort).
///
/// Components:
/// - availability: 1.0 if the slot sits fully inside some free window,
///   else `partial_credit`
/// - rating: provider rating / 5 (assumed pre-clamped to [0, 5])
/// - distance: `1 - d / (max_d + 1)` where `max_d` is recomputed across
///   this offer set, floored at 1 so an all-zero set cannot divide by zero
///
/// The total is the weight-normalized average. A non-positive weight sum is
/// a caller bug and fails fast.
pub fn score_with_credit(
    offers: &[SlotOffer],
    weights: &ScoreWeights,
    free_windows: &[TimeWindow],
    partial_credit: f64,
) -> Result<Vec<ScoredOffer>, ScoringError> {
    let weight_sum = weights.sum();
    if weight_sum <= 0.0 {
        return Err(ScoringError::ZeroWeightSum);
    }

    let max_distance = offers
        .iter()
        .map(|o| o.provider.distance_miles)
        .fold(1.0_f64, f64::max);

    let mut scored: Vec<ScoredOffer> = offers
        .iter()
        .map(|offer| {
            let availability = if free_windows.iter().any(|w| w.contains(&offer.slot)) {
                1.0
            } else {
                partial_credit
            };
            let rating = offer.provider.rating / 5.0;
            let distance = 1.0 - offer.provider.distance_miles / (max_distance + 1.0);

            let total = (weights.availability * availability
                + weights.rating * rating
                + weights.distance * distance)
                / weight_sum;

            ScoredOffer {
                provider: offer.provider.clone(),
                slot: offer.slot,
                breakdown: ScoreBreakdown {
                    availability: percent(availability),
                    rating: percent(rating),
                    distance: percent(distance),
                },
                total: percent(total),
            }
        })
        .collect();

    // Stable: equal totals keep their input order.
    scored.sort_by(|a, b| b.total.cmp(&a.total));
    Ok(scored)
}

fn percent(value: f64) -> u8 {
    (value * 100.0).round().clamp(0.0, 100.0) as u8
}

// ============================================================================
// Tests
// ============================================================================
