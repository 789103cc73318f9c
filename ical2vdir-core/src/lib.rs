//! Core library for ical2vdir.
//!
//! Splits an iCalendar document into one file per event or task inside a
//! vdir directory, rewriting a file only when its item changed:
//! - `ics` parses documents and writes item files
//! - `value`, `item` and `equality` decide whether a stored item is current
//! - `filename` derives the file an item lives in
//! - `vdir` and `sync` do the filesystem work

pub mod classify;
pub mod equality;
pub mod error;
pub mod filename;
pub mod ics;
pub mod item;
pub mod sync;
pub mod value;
pub mod vdir;

pub use error::{VdirError, VdirResult};
pub use item::{Item, ItemKind};
pub use sync::{SyncAction, SyncOptions, SyncProgress, SyncReport, Synchronizer};
pub use vdir::Vdir;
