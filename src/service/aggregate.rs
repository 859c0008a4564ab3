//! Running aggregates over playback events.
//!
//! Everything here is pure: the store calls these inside its write critical
//! section and persists whatever comes back.

use crate::model::{Percentage, TrackEvent, VideoRecord};

/// Apply a single tracking event to a record.
pub fn apply(record: &VideoRecord, event: TrackEvent) -> VideoRecord {
    match event {
        TrackEvent::View => record_view(record),
        TrackEvent::Completion(percentage) => record_completion(record, percentage),
    }
}

/// Count one more playback start. Nothing else changes.
pub fn record_view(record: &VideoRecord) -> VideoRecord {
    VideoRecord {
        views: record.views.saturating_add(1),
        ..record.clone()
    }
}

/// Fold a completion report into the weighted running average.
///
/// The new observation carries weight `1 / (n + 1)` where `n` is the number of
/// completions counted so far, so the rate is the plain mean of every
/// percentage ever reported.
pub fn record_completion(record: &VideoRecord, percentage: Percentage) -> VideoRecord {
    let reported = percentage.value();
    let current = if record.completion_rate.is_finite() {
        record.completion_rate
    } else {
        0.0
    };

    let total_watches = record.total_watches.saturating_add(1);
    let mean = (current * record.total_watches as f64 + reported) / total_watches as f64;

    // rounding must never push the mean outside the two values it averages
    let completion_rate = if record.total_watches == 0 {
        reported
    } else {
        mean.max(current.min(reported)).min(current.max(reported))
    };

    VideoRecord {
        total_watches,
        completion_rate,
        ..record.clone()
    }
}
