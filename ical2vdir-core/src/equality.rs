//! Semantic equality between a freshly parsed item and a stored one.
//!
//! Values are compared by kind: two values of different kinds are never
//! equal, even if they were written with the same text. Parameters are part
//! of every comparison.

use crate::item::Item;
use crate::value::PropertyValue;

/// Regenerated on every export of the source calendar, carries no content.
const IGNORED_KEYS: &[&str] = &["DTSTAMP"];

/// Compare two property values.
pub fn values_equal(a: &PropertyValue, b: &PropertyValue) -> bool {
    match (a, b) {
        (PropertyValue::List(a), PropertyValue::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| values_equal(a, b))
        }
        (PropertyValue::DateTimeList(a), PropertyValue::DateTimeList(b)) => {
            a.times.len() == b.times.len()
                && a.times.iter().zip(&b.times).all(|(a, b)| a == b)
                && a.params == b.params
        }
        (PropertyValue::DateOrDateTime(a), PropertyValue::DateOrDateTime(b)) => a == b,
        (
            PropertyValue::Scalar {
                value: value_a,
                params: params_a,
            },
            PropertyValue::Scalar {
                value: value_b,
                params: params_b,
            },
        ) => value_a == value_b && params_a == params_b,
        _ => false,
    }
}

/// Whether `stored` already represents `new`.
///
/// Walks the keys of `new` only: a key present in `stored` but missing from
/// `new` does not make the items differ. DTSTAMP is ignored and nested
/// components (VALARM) are not compared.
pub fn items_equal(new: &Item, stored: &Item) -> bool {
    let uid = new.uid().unwrap_or("?");

    if new.kind() != stored.kind() {
        log::debug!(
            "{}: {} != {}",
            uid,
            new.kind().component_name(),
            stored.kind().component_name()
        );
        return false;
    }

    for (key, value) in new.properties() {
        if IGNORED_KEYS.contains(&key) {
            continue;
        }
        let Some(stored_value) = stored.get(key) else {
            log::debug!("{}: new key {}", uid, key);
            return false;
        };
        if !values_equal(value, stored_value) {
            log::debug!("{}/{}: {:?} != {:?}", uid, key, value, stored_value);
            return false;
        }
    }

    true
}
