//! Deterministic vdir filenames.
//!
//! `<UID>.ics` for plain items, `<UID>.<RECURRENCE-ID>.ics` for overrides of
//! a recurring series, the recurrence id rendered in basic format
//! (`20150924T090000+0200`, or `20260201` for a date).

use chrono::{Duration, LocalResult, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;

use crate::error::{VdirError, VdirResult};
use crate::item::Item;
use crate::value::{DateOrDateTime, PropertyValue, Zone};

pub const VDIR_FILE_EXTENSION: &str = ".ics";

/// The filename an item is stored under.
pub fn vdir_filename(item: &Item) -> VdirResult<String> {
    let uid = item
        .uid()
        .filter(|uid| !uid.is_empty())
        .ok_or(VdirError::MissingUid)?;
    if uid.contains(['/', '\\']) || uid == "." || uid == ".." {
        return Err(VdirError::InvalidUid(uid.to_string()));
    }

    let mut filename = uid.to_string();

    if let Some(recurrence_id) = item.get("RECURRENCE-ID") {
        let PropertyValue::DateOrDateTime(value) = recurrence_id else {
            return Err(VdirError::InvalidRecurrenceId(format!(
                "{}: {:?}",
                uid, recurrence_id
            )));
        };
        filename.push('.');
        filename.push_str(&basic_format(&value.time));
    }

    filename.push_str(VDIR_FILE_EXTENSION);
    Ok(filename)
}

/// Render a date or date-time without separators.
///
/// Dates: `YYYYMMDD`. Date-times: `YYYYMMDDTHHMMSS` followed by the UTC
/// offset as `±HHMM`. Floating times and TZIDs unknown to the IANA database
/// have no offset.
pub fn basic_format(time: &DateOrDateTime) -> String {
    match time {
        DateOrDateTime::Date(date) => date.format("%Y%m%d").to_string(),
        DateOrDateTime::DateTime { local, zone } => {
            let stamp = local.format("%Y%m%dT%H%M%S").to_string();
            match zone {
                Zone::Utc => format!("{}+0000", stamp),
                Zone::Floating => stamp,
                Zone::Tzid(tzid) => match zone_offset(local, tzid) {
                    Some(offset) => format!("{}{}", stamp, offset),
                    None => {
                        log::warn!("unknown timezone {}, leaving offset out of {}", tzid, stamp);
                        stamp
                    }
                },
            }
        }
    }
}

/// UTC offset of `local` in `tzid` as `±HHMM`. An ambiguous local time takes
/// its first occurrence; a local time skipped by a forward transition takes
/// the offset in effect before the transition.
fn zone_offset(local: &NaiveDateTime, tzid: &str) -> Option<String> {
    let tz: Tz = tzid.parse().ok()?;
    let offset = match tz.offset_from_local_datetime(local) {
        LocalResult::Single(offset) | LocalResult::Ambiguous(offset, _) => offset,
        LocalResult::None => tz.offset_from_utc_datetime(&(*local - Duration::days(1))),
    };
    Some(format_offset(offset.fix().local_minus_utc()))
}

fn format_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.abs() / 60;
    format!("{}{:02}{:02}", sign, minutes / 60, minutes % 60)
}
