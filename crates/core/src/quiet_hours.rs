//! Quiet-hours gate.
//!
//! Decides whether a proactive text may go out now or must wait until the
//! club's quiet window closes. Reactive replies never consult the gate.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Timelike, Utc};

use crate::errors::CourtResult;
use crate::models::club::{ClubMessagingConfig, QuietHours};

/// Returns the end of the quiet window if `now` falls inside it.
pub fn should_defer_until<Z: TimeZone>(
    window: &QuietHours,
    now: &DateTime<Z>,
) -> Option<DateTime<Z>> {
    let hour = now.hour();
    if !window.contains_hour(hour) {
        return None;
    }

    let today = now.date_naive();
    let end_date = if window.wraps_midnight() && hour >= window.start {
        today.succ_opt()?
    } else {
        today
    };
    let boundary = end_date.and_hms_opt(window.end, 0, 0)?;
    resolve_local(&now.timezone(), boundary)
}

/// Club-level convenience: evaluates the gate in the club's timezone.
pub fn defer_until_for_club(
    club: &ClubMessagingConfig,
    now: DateTime<Utc>,
) -> CourtResult<Option<DateTime<Utc>>> {
    let Some(window) = club.quiet_hours()? else {
        return Ok(None);
    };
    let tz = club.tz()?;
    let local = now.with_timezone(&tz);
    Ok(should_defer_until(&window, &local).map(|t| t.with_timezone(&Utc)))
}

// A boundary inside a DST gap does not exist locally; take the first minute
// after it that does.
fn resolve_local<Z: TimeZone>(tz: &Z, naive: NaiveDateTime) -> Option<DateTime<Z>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => (1..=180).find_map(|minutes| {
            tz.from_local_datetime(&(naive + Duration::minutes(minutes)))
                .earliest()
        }),
    }
}
