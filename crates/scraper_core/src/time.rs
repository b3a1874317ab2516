use vrs_gtfs_model::GtfsTime;

const SECONDS_PER_DAY: u32 = 24 * 3600;

/// Converts a wall-clock reading into a service time. A reading earlier than
/// `first_time` (seconds since midnight of the trip's first stop) belongs to
/// the following day and gets 24 hours added.
pub fn normalize_time(hours: u32, minutes: u32, seconds: u32, first_time: Option<u32>) -> GtfsTime {
    let absolute = hours * 3600 + minutes * 60 + seconds;
    match first_time {
        Some(first) if absolute < first => GtfsTime::from_seconds(absolute + SECONDS_PER_DAY),
        _ => GtfsTime::from_seconds(absolute),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid clock reading {0:?}, expected HH:MM")]
pub struct ClockParseError(pub String);

/// Parses an `HH:MM` cell into hours and minutes.
pub fn parse_clock(text: &str) -> Result<(u32, u32), ClockParseError> {
    let trimmed = text.trim();
    let (hours, minutes) = trimmed
        .split_once(':')
        .ok_or_else(|| ClockParseError(text.to_string()))?;
    let hours: u32 = hours
        .trim()
        .parse()
        .map_err(|_| ClockParseError(text.to_string()))?;
    let minutes: u32 = minutes
        .trim()
        .parse()
        .map_err(|_| ClockParseError(text.to_string()))?;
    if hours > 23 || minutes > 59 {
        return Err(ClockParseError(text.to_string()));
    }
    Ok((hours, minutes))
}
