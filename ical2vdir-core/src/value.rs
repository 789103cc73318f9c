//! Typed property values.
//!
//! A content line is decoded into one of a closed set of value kinds. Each
//! value owns its parameter map, so equality can take parameters into account
//! without going back to the source line.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::ics::ContentLine;

/// Property parameters (TZID, VALUE, CN, PARTSTAT, ...).
///
/// Built once when the value is decoded. Compared by content, independent
/// of the order the parameters were written in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Params::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Params(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// How a date-time was anchored in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Zone {
    /// Trailing `Z`
    Utc,
    /// No zone information
    Floating,
    /// `TZID` parameter
    Tzid(String),
}

/// A plain calendar date or a date-time with its zone representation.
///
/// Two date-times for the same instant written in different zones are not
/// equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateOrDateTime {
    Date(NaiveDate),
    DateTime { local: NaiveDateTime, zone: Zone },
}

impl DateOrDateTime {
    pub fn has_time(&self) -> bool {
        matches!(self, DateOrDateTime::DateTime { .. })
    }
}

/// A single date/date-time property (DTSTART, RECURRENCE-ID, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateValue {
    pub time: DateOrDateTime,
    pub params: Params,
}

/// A multi-date list (EXDATE, RDATE) sharing one parameter map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateList {
    pub times: Vec<DateOrDateTime>,
    pub params: Params,
}

/// The primitive inside a scalar property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Primitive {
    /// Unescaped TEXT
    Text(String),
    Integer(i64),
    /// CAL-ADDRESS (ORGANIZER, ATTENDEE)
    Address(String),
    /// RECUR rule as part name -> part value, so part order does not matter
    Recur(BTreeMap<String, String>),
    Categories(Vec<String>),
}

/// A decoded property value. Compare with [`crate::equality::values_equal`].
#[derive(Debug, Clone)]
pub enum PropertyValue {
    Scalar { value: Primitive, params: Params },
    DateOrDateTime(DateValue),
    DateTimeList(DateList),
    /// A property that occurred more than once, in document order
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Decode a content line according to its property name.
    pub fn from_line(line: &ContentLine) -> Self {
        let params: Params = line.params.iter().cloned().collect();

        match line.name.as_str() {
            "DTSTART" | "DTEND" | "DUE" | "RECURRENCE-ID" | "DTSTAMP" | "CREATED"
            | "LAST-MODIFIED" | "COMPLETED" => match parse_time(&line.value, &params) {
                Some(time) => PropertyValue::DateOrDateTime(DateValue { time, params }),
                None => text(&line.value, params),
            },
            "EXDATE" | "RDATE" if params.get("VALUE") != Some("PERIOD") => {
                let times: Option<Vec<_>> = line
                    .value
                    .split(',')
                    .map(|s| parse_time(s, &params))
                    .collect();
                match times {
                    Some(times) => PropertyValue::DateTimeList(DateList { times, params }),
                    None => text(&line.value, params),
                }
            }
            "RRULE" | "EXRULE" => PropertyValue::Scalar {
                value: Primitive::Recur(parse_recur(&line.value)),
                params,
            },
            "CATEGORIES" => PropertyValue::Scalar {
                value: Primitive::Categories(
                    split_unescaped(&line.value, ',')
                        .into_iter()
                        .map(|c| unescape_text(&c))
                        .collect(),
                ),
                params,
            },
            "ORGANIZER" | "ATTENDEE" => PropertyValue::Scalar {
                value: Primitive::Address(line.value.clone()),
                params,
            },
            "SEQUENCE" | "PRIORITY" | "PERCENT-COMPLETE" | "REPEAT" => {
                match line.value.trim().parse() {
                    Ok(n) => PropertyValue::Scalar {
                        value: Primitive::Integer(n),
                        params,
                    },
                    Err(_) => text(&line.value, params),
                }
            }
            _ => text(&line.value, params),
        }
    }

    /// Merge a repeated occurrence of the same property into this value.
    pub fn push(&mut self, value: PropertyValue) {
        match self {
            PropertyValue::List(values) => values.push(value),
            single => {
                let first = std::mem::replace(single, PropertyValue::List(Vec::with_capacity(2)));
                if let PropertyValue::List(values) = single {
                    values.push(first);
                    values.push(value);
                }
            }
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Scalar {
                value: Primitive::Text(text),
                ..
            } => Some(text),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateValue> {
        match self {
            PropertyValue::DateOrDateTime(value) => Some(value),
            _ => None,
        }
    }
}

fn text(value: &str, params: Params) -> PropertyValue {
    PropertyValue::Scalar {
        value: Primitive::Text(unescape_text(value)),
        params,
    }
}

/// Parse a DATE or DATE-TIME value. `VALUE=DATE` or a value without a time
/// part yields a date; a trailing `Z` wins over any `TZID`.
fn parse_time(value: &str, params: &Params) -> Option<DateOrDateTime> {
    let value = value.trim();

    if params.get("VALUE") == Some("DATE") || !value.contains('T') {
        return NaiveDate::parse_from_str(value, "%Y%m%d")
            .ok()
            .map(DateOrDateTime::Date);
    }

    let (local, zone) = match value.strip_suffix('Z') {
        Some(utc) => (utc, Zone::Utc),
        None => match params.get("TZID") {
            Some(tzid) => (value, Zone::Tzid(tzid.to_string())),
            None => (value, Zone::Floating),
        },
    };

    NaiveDateTime::parse_from_str(local, "%Y%m%dT%H%M%S")
        .ok()
        .map(|local| DateOrDateTime::DateTime { local, zone })
}

fn parse_recur(value: &str) -> BTreeMap<String, String> {
    value
        .split(';')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((name, value)) => (name.trim().to_ascii_uppercase(), value.trim().to_string()),
            None => (part.trim().to_ascii_uppercase(), String::new()),
        })
        .collect()
}

/// Split on `separator` unless it is backslash-escaped. Escapes are kept.
fn split_unescaped(value: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for c in value.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            current.push(c);
            escaped = true;
        } else if c == separator {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);

    parts
}

/// Undo TEXT escaping (RFC 5545 section 3.3.11) in a single pass.
/// Unknown escapes are kept verbatim, backslash included.
fn unescape_text(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => unescaped.push('\n'),
            Some(c @ ('\\' | ',' | ';' | ':')) => unescaped.push(c),
            Some(other) => {
                unescaped.push('\\');
                unescaped.push(other);
            }
            None => unescaped.push('\\'),
        }
    }

    unescaped
}
