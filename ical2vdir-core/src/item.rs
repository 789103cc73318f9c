//! Schedulable calendar items (events and tasks).

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::ics::RawComponent;
use crate::value::PropertyValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Event,
    Todo,
}

impl ItemKind {
    pub fn from_component_name(name: &str) -> Option<Self> {
        match name {
            "VEVENT" => Some(ItemKind::Event),
            "VTODO" => Some(ItemKind::Todo),
            _ => None,
        }
    }

    pub fn component_name(self) -> &'static str {
        match self {
            ItemKind::Event => "VEVENT",
            ItemKind::Todo => "VTODO",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Event => write!(f, "event"),
            ItemKind::Todo => write!(f, "task"),
        }
    }
}

/// An event or task: its typed properties plus the component it was read
/// from, which is what gets written to disk.
#[derive(Debug, Clone)]
pub struct Item {
    kind: ItemKind,
    properties: BTreeMap<String, PropertyValue>,
    component: RawComponent,
}

impl Item {
    /// Build an item from a VEVENT or VTODO. Other components yield `None`.
    ///
    /// A property that occurs more than once (ATTENDEE, EXDATE, ...) becomes a
    /// [`PropertyValue::List`] in document order.
    pub fn from_component(component: &RawComponent) -> Option<Self> {
        let kind = ItemKind::from_component_name(&component.name)?;

        let mut properties: BTreeMap<String, PropertyValue> = BTreeMap::new();
        for line in &component.lines {
            let value = PropertyValue::from_line(line);
            match properties.entry(line.name.clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
                Entry::Occupied(mut entry) => entry.get_mut().push(value),
            }
        }

        Some(Item {
            kind,
            properties,
            component: component.clone(),
        })
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn uid(&self) -> Option<&str> {
        self.get("UID").and_then(PropertyValue::as_text)
    }

    pub fn component(&self) -> &RawComponent {
        &self.component
    }

    /// TZIDs referenced from this item's lines, nested components included.
    pub fn referenced_tzids(&self) -> BTreeSet<&str> {
        let mut tzids = BTreeSet::new();
        collect_tzids(&self.component, &mut tzids);
        tzids
    }
}

fn collect_tzids<'a>(component: &'a RawComponent, tzids: &mut BTreeSet<&'a str>) {
    tzids.extend(component.lines.iter().filter_map(|line| line.param("TZID")));
    for nested in &component.components {
        collect_tzids(nested, tzids);
    }
}
