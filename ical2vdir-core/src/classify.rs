//! Selecting the schedulable items of a document.

use crate::ics::Document;
use crate::item::Item;

/// Events and tasks of a document, in document order.
///
/// Anything else (VTIMEZONE, VJOURNAL, X- components) is skipped.
pub fn schedulable_items(document: &Document) -> Vec<Item> {
    log::debug!("{} subcomponents", document.components.len());

    document
        .components
        .iter()
        .filter_map(|component| {
            let item = Item::from_component(component);
            if item.is_none() {
                log::debug!("skipping {}", component.name);
            }
            item
        })
        .collect()
}
