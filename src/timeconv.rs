/// Conversions between absolute instants and the user-selected local
/// wall-clock representation.
///
/// All functions are pure and return `None` on malformed input; callers
/// treat a `None` as "this cell cannot be reconciled" and skip it, except
/// in the direct user-edit path where it blocks the save.
use time::format_description::well_known::Rfc3339;
use time::{Date, Month, OffsetDateTime, Time, UtcOffset};

pub const MINUTES_PER_DAY: u32 = 1440;

/// The UTC start/end pair produced from a local wall-clock edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtcSpan {
    pub start_instant: String,
    pub end_instant: String,
    pub duration_minutes: u32,
}

/// A shift's placement in the local calendar under some display offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPlacement {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub start_local: String,
    pub end_local: String,
    pub start_minutes_of_day: u32,
}

/// Parse a strict `HH:MM` string in `[00:00, 23:59]` into minutes of day.
pub fn parse_hhmm(s: &str) -> Option<u16> {
    let (h, m) = s.trim().split_once(':')?;
    if h.len() != 2 || m.len() != 2 {
        return None;
    }
    let hours: u16 = h.parse().ok()?;
    let minutes: u16 = m.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Format minutes of day (wrapped into one day) as `HH:MM`.
pub fn format_hhmm(minutes_of_day: u32) -> String {
    let m = minutes_of_day % MINUTES_PER_DAY;
    format!("{:02}:{:02}", m / 60, m % 60)
}

/// Duration between two wall-clock times, treating an end not after the
/// start as crossing midnight. Always in `(0, 1440]`, never zero.
pub fn wrapping_duration(start: u16, end: u16) -> u32 {
    let d = (end as u32 + MINUTES_PER_DAY - start as u32) % MINUTES_PER_DAY;
    if d == 0 {
        MINUTES_PER_DAY
    } else {
        d
    }
}

/// Number of days in a calendar month.
pub fn days_in_month(year: i32, month: u8) -> u8 {
    let Ok(month) = Month::try_from(month) else {
        return 0;
    };
    time::util::days_in_year_month(year, month)
}

/// Parse an ISO-8601 instant. `None` on any parse failure.
pub fn parse_instant(s: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(s.trim(), &Rfc3339).ok()
}

fn format_utc(odt: OffsetDateTime) -> Option<String> {
    odt.to_offset(UtcOffset::UTC).format(&Rfc3339).ok()
}

fn offset_from_minutes(offset_minutes: i32) -> Option<UtcOffset> {
    if !(-1440..1440).contains(&offset_minutes) {
        return None;
    }
    UtcOffset::from_whole_seconds(offset_minutes * 60).ok()
}

/// Convert a local wall-clock edit into authoritative UTC instants.
///
/// `month` is 1-based. The duration is `(end - start) mod 1440` with a
/// non-later end treated as crossing midnight. `None` when either time
/// string fails to parse or the calendar date is invalid.
pub fn to_utc(
    year: i32,
    month: u8,
    day: u8,
    start_local: &str,
    end_local: &str,
    offset_minutes: i32,
) -> Option<UtcSpan> {
    let start = parse_hhmm(start_local)?;
    let end = parse_hhmm(end_local)?;
    let duration = wrapping_duration(start, end);

    let offset = offset_from_minutes(offset_minutes)?;
    let month = Month::try_from(month).ok()?;
    let date = Date::from_calendar_date(year, month, day).ok()?;

    let local_midnight = date.with_time(Time::MIDNIGHT).assume_offset(offset);
    let start_odt = local_midnight + time::Duration::minutes(start as i64);
    let end_odt = start_odt + time::Duration::minutes(duration as i64);

    Some(UtcSpan {
        start_instant: format_utc(start_odt)?,
        end_instant: format_utc(end_odt)?,
        duration_minutes: duration,
    })
}

/// The instant `duration_minutes` after `instant_iso`, formatted in UTC.
pub fn end_instant(instant_iso: &str, duration_minutes: u32) -> Option<String> {
    let start = parse_instant(instant_iso)?;
    format_utc(start + time::Duration::minutes(duration_minutes as i64))
}

/// Place an absolute instant on the local calendar under a display offset.
///
/// The local calendar day of the start instant keys the placement. With
/// `carry_day_on_overflow` set, a span whose `start + duration` crosses
/// local-day boundaries advances the day key by the number of crossed days
/// (an end landing exactly on midnight stays on its original day); spill
/// rendering paths use this, the grid placement path does not.
pub fn to_local(
    instant_iso: &str,
    duration_minutes: u32,
    offset_minutes: i32,
    carry_day_on_overflow: bool,
) -> Option<LocalPlacement> {
    let offset = offset_from_minutes(offset_minutes)?;
    let local = parse_instant(instant_iso)?.to_offset(offset);

    let start_minutes = local.hour() as u32 * 60 + local.minute() as u32;
    let mut date = local.date();

    if carry_day_on_overflow && duration_minutes > 0 {
        let crossed = (start_minutes + duration_minutes - 1) / MINUTES_PER_DAY;
        for _ in 0..crossed {
            date = date.next_day()?;
        }
    }

    Some(LocalPlacement {
        year: date.year(),
        month: date.month() as u8,
        day: date.day(),
        start_local: format_hhmm(start_minutes),
        end_local: format_hhmm(start_minutes + duration_minutes),
        start_minutes_of_day: start_minutes,
    })
}
