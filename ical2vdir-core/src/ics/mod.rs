//! ICS document parsing and writing.
//!
//! Parsing goes through the icalendar crate's content-line parser; the result
//! is kept as owned raw components so items can be written back out with
//! their original property order, parameters and value text.

mod parse;
mod write;

pub use parse::{ContentLine, Document, RawComponent, parse_document};
pub use write::{fold_line, write_component, write_item_file};
