//! Calendar interval arithmetic.
//!
//! [`reconcile`] subtracts busy calendar events from day-long base windows,
//! leaving the free windows a mission sends to providers. All arithmetic is
//! local wall-clock minute-of-day; busy events arrive pre-localized (see
//! `BusyEvent::from_local`), so no step here can shift a date across a
//! timezone boundary.

use chrono::{NaiveDate, NaiveTime};
use shared_types::{BusyEvent, TimeWindow, MINUTES_PER_DAY};

/// Subtract busy events from base availability windows.
///
/// Deterministic regardless of busy-event input order. Output windows are
/// disjoint, strictly non-empty, and each lies inside one base window. An
/// all-day busy event removes every window on its day; an empty busy set
/// returns the base windows unchanged.
pub fn reconcile(base: &[TimeWindow], busy: &[BusyEvent]) -> Vec<TimeWindow> {
    base.iter()
        .flat_map(|window| subtract_from_window(window, busy))
        .collect()
}

fn subtract_from_window(window: &TimeWindow, busy: &[BusyEvent]) -> Vec<TimeWindow> {
    let day = window.day;
    let matching: Vec<&BusyEvent> = busy.iter().filter(|e| e.occupies_day(day)).collect();

    if matching.iter().any(|e| e.all_day) {
        return Vec::new();
    }

    let mut intervals: Vec<(u16, u16)> = matching
        .iter()
        .filter_map(|e| clip_to_day(e, day))
        .collect();
    // Explicit stable sort by start: output must not depend on input order.
    intervals.sort_by_key(|&(start, _)| start);

    let mut out = Vec::new();
    let mut cursor = window.start_minute();
    let end = window.end_minute();

    for (busy_start, busy_end) in intervals {
        if busy_end <= cursor {
            continue;
        }
        if busy_start >= end {
            break;
        }
        emit(&mut out, day, cursor, busy_start.min(end));
        cursor = cursor.max(busy_end);
        if cursor >= end {
            break;
        }
    }
    emit(&mut out, day, cursor, end);

    out
}

/// Slice a busy event to minute-of-day bounds on one day.
///
/// An event running past midnight counts as ending at minute 1440 on this
/// day, never 0 — otherwise it would subtract nothing from the evening.
fn clip_to_day(event: &BusyEvent, day: NaiveDate) -> Option<(u16, u16)> {
    let start = if event.start_day < day {
        0
    } else {
        event.start_minute
    };
    let end = if event.end_day > day {
        MINUTES_PER_DAY
    } else {
        event.end_minute
    };
    (start < end).then_some((start, end))
}

fn emit(out: &mut Vec<TimeWindow>, day: NaiveDate, from: u16, to: u16) {
    if from >= to {
        return;
    }
    let (Some(start), Some(end)) = (minute_to_time(from), minute_to_time(to)) else {
        return;
    };
    if let Some(window) = TimeWindow::new(day, start, end) {
        out.push(window);
    }
}

fn minute_to_time(minute: u16) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(u32::from(minute) / 60, u32::from(minute) % 60, 0)
}

// ============================================================================
// Tests
// ============================================================================
