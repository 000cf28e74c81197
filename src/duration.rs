//! Duration normalization helpers.
//!
//! Monitoring backends report how long a problem has existed in wildly
//! different shapes: "70d 3h 34m 34s", "5h 2m", raw seconds. These helpers
//! convert between a display form and a sortable number of seconds.

const SECONDS_PER_MONTH: u64 = 16_934_400;
const SECONDS_PER_WEEK: u64 = 604_800;
const SECONDS_PER_DAY: u64 = 86_400;
const SECONDS_PER_HOUR: u64 = 3_600;
const SECONDS_PER_MINUTE: u64 = 60;

/// Format a number of seconds as the `"70d 3h 34m 34s"` form most
/// monitors display.
pub fn human_readable_duration(seconds: u64) -> String {
    let days = seconds / SECONDS_PER_DAY;
    let hours = (seconds % SECONDS_PER_DAY) / SECONDS_PER_HOUR;
    let minutes = (seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let secs = seconds % SECONDS_PER_MINUTE;
    format!("{days}d {hours}h {minutes}m {secs}s")
}

/// Parse a duration string like `"3d 4h 12m 9s"` into comparable seconds.
///
/// Duration columns sort uselessly as text ("2h" before "10m"), so sorting
/// goes through this. Components may appear in any order; unknown or
/// malformed components contribute nothing. Suffixes: M(onths), w, d, h,
/// m, s.
pub fn machine_sortable_duration(raw: &str) -> u64 {
    let mut total = 0;
    for component in raw.split_whitespace() {
        if component.len() < 2 {
            continue;
        }
        let (number, unit) = component.split_at(component.len() - 1);
        let Ok(value) = number.parse::<u64>() else {
            continue;
        };
        total += value
            * match unit {
                "M" => SECONDS_PER_MONTH,
                "w" => SECONDS_PER_WEEK,
                "d" => SECONDS_PER_DAY,
                "h" => SECONDS_PER_HOUR,
                "m" => SECONDS_PER_MINUTE,
                "s" => 1,
                _ => 0,
            };
    }
    total
}
