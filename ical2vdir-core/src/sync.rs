//! One-way sync of a calendar document into a vdir.
//!
//! Per item: derive the filename, create the file if it is missing, rewrite
//! it if the stored item is not semantically equal, leave it alone otherwise.
//! Files in the directory that no input item maps to are reported, and
//! removed when deletion is enabled.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::classify::schedulable_items;
use crate::equality::items_equal;
use crate::error::{VdirError, VdirResult};
use crate::filename::vdir_filename;
use crate::ics::{Document, RawComponent, write_item_file};
use crate::item::Item;
use crate::vdir::Vdir;

/// What happened to a single file during a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    Created(PathBuf),
    Updated(PathBuf),
    Unchanged(PathBuf),
    Removed(PathBuf),
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncAction::Created(path) => write!(f, "creating {}", path.display()),
            SyncAction::Updated(path) => write!(f, "updating {}", path.display()),
            SyncAction::Unchanged(path) => write!(f, "{} is up to date", path.display()),
            SyncAction::Removed(path) => write!(f, "removing {}", path.display()),
        }
    }
}

/// Log sink handed to the synchronizer.
///
/// Changes go to the `log` facade at info level, everything else at debug
/// level. Every action is also kept so callers can inspect the run.
#[derive(Debug, Default)]
pub struct SyncProgress {
    actions: Vec<SyncAction>,
}

impl SyncProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, action: SyncAction) {
        match action {
            SyncAction::Unchanged(_) => log::debug!("{}", action),
            _ => log::info!("{}", action),
        }
        self.actions.push(action);
    }

    /// Log a debug message
    pub fn debug(&mut self, text: &str) {
        log::debug!("{}", text);
    }

    pub fn actions(&self) -> &[SyncAction] {
        &self.actions
    }

    /// Actions that touched the disk.
    pub fn changes(&self) -> impl Iterator<Item = &SyncAction> {
        self.actions
            .iter()
            .filter(|action| !matches!(action, SyncAction::Unchanged(_)))
    }
}

/// Outcome of a whole run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub created: Vec<PathBuf>,
    pub updated: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    /// Pre-existing files not matched by any input item and left in place
    pub stale: Vec<PathBuf>,
}

impl SyncReport {
    pub fn has_changes(&self) -> bool {
        !(self.created.is_empty() && self.updated.is_empty() && self.removed.is_empty())
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} unchanged, {} removed, {} not in input",
            self.created.len(),
            self.updated.len(),
            self.unchanged.len(),
            self.removed.len(),
            self.stale.len()
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Remove pre-existing files that no input item maps to
    pub delete: bool,
}

pub struct Synchronizer {
    vdir: Vdir,
    options: SyncOptions,
}

impl Synchronizer {
    pub fn new(vdir: Vdir, options: SyncOptions) -> Self {
        Synchronizer { vdir, options }
    }

    pub fn vdir(&self) -> &Vdir {
        &self.vdir
    }

    /// Sync every event and task of `document`, in document order.
    ///
    /// Stops at the first error; files written before it stay in place.
    pub fn sync(&self, document: &Document, progress: &mut SyncProgress) -> VdirResult<SyncReport> {
        let mut not_in_input = self.vdir.managed_files()?;
        let mut report = SyncReport::default();

        for item in schedulable_items(document) {
            let timezones = referenced_timezones(document, &item);
            let action = self.sync_item(&item, &timezones)?;

            match &action {
                SyncAction::Created(path) => {
                    not_in_input.remove(path);
                    report.created.push(path.clone());
                }
                SyncAction::Updated(path) => {
                    not_in_input.remove(path);
                    report.updated.push(path.clone());
                }
                SyncAction::Unchanged(path) => {
                    not_in_input.remove(path);
                    report.unchanged.push(path.clone());
                }
                SyncAction::Removed(_) => {}
            }
            progress.record(action);
        }

        let mut not_in_input: Vec<PathBuf> = not_in_input.into_iter().collect();
        not_in_input.sort();
        progress.debug(&format!(
            "{} pre-existing items not in input: {}",
            not_in_input.len(),
            file_names(&not_in_input)
        ));

        if self.options.delete {
            for path in not_in_input {
                self.vdir.remove(&path)?;
                report.removed.push(path.clone());
                progress.record(SyncAction::Removed(path));
            }
        } else {
            report.stale = not_in_input;
        }

        Ok(report)
    }

    /// Bring the file for a single item up to date.
    ///
    /// `timezones` are the VTIMEZONE definitions written alongside the item.
    pub fn sync_item(&self, item: &Item, timezones: &[&RawComponent]) -> VdirResult<SyncAction> {
        let path = self.vdir.item_path(&vdir_filename(item)?);

        if !path.exists() {
            self.write(item, timezones, &path)?;
            return Ok(SyncAction::Created(path));
        }

        if !path.is_file() {
            return Err(VdirError::NotAFile(path));
        }

        let stored = self.vdir.read_item(&path)?;
        if items_equal(item, &stored) {
            Ok(SyncAction::Unchanged(path))
        } else {
            self.write(item, timezones, &path)?;
            Ok(SyncAction::Updated(path))
        }
    }

    fn write(&self, item: &Item, timezones: &[&RawComponent], path: &Path) -> VdirResult<()> {
        let content = write_item_file(item.component(), timezones);
        self.vdir.write_item(path, &content)
    }
}

/// VTIMEZONE components of `document` that `item` refers to by TZID.
pub fn referenced_timezones<'a>(document: &'a Document, item: &Item) -> Vec<&'a RawComponent> {
    item.referenced_tzids()
        .into_iter()
        .filter_map(|tzid| document.timezone(tzid))
        .collect()
}

fn file_names(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ics::parse_document;
    use std::fs;

    const GOOGLE_CALENDAR: &str = r#"BEGIN:VCALENDAR
PRODID:-//Google Inc//Google Calendar 70.9054//EN
VERSION:2.0
CALSCALE:GREGORIAN
METHOD:PUBLISH
X-WR-CALNAME:someone@gmail.com
X-WR-TIMEZONE:Europe/Vienna
BEGIN:VTIMEZONE
TZID:Europe/Vienna
X-LIC-LOCATION:Europe/Vienna
BEGIN:DAYLIGHT
TZOFFSETFROM:+0100
TZOFFSETTO:+0200
TZNAME:CEST
DTSTART:19700329T020000
RRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=-1SU
END:DAYLIGHT
BEGIN:STANDARD
TZOFFSETFROM:+0200
TZOFFSETTO:+0100
TZNAME:CET
DTSTART:19701025T030000
RRULE:FREQ=YEARLY;BYMONTH=10;BYDAY=-1SU
END:STANDARD
END:VTIMEZONE
BEGIN:VEVENT
DTSTART:20150924T070000Z
DTEND:20150924T083000Z
DTSTAMP:20200205T160640Z
UID:1234567890qwertyuiopasdfgh@google.com
CREATED:20140228T212925Z
DESCRIPTION:
LAST-MODIFIED:20150908T181423Z
LOCATION:
SEQUENCE:0
STATUS:CONFIRMED
SUMMARY:single
TRANSP:OPAQUE
END:VEVENT
BEGIN:VEVENT
DTSTART;TZID=Europe/Vienna:20150908T090000
DTEND;TZID=Europe/Vienna:20150908T123000
DTSTAMP:20200205T160640Z
UID:recurr1234567890qwertyuiop@google.com
RECURRENCE-ID;TZID=Europe/Vienna:20150908T090000
CREATED:20140228T212925Z
DESCRIPTION:
LAST-MODIFIED:20150908T181423Z
LOCATION:
SEQUENCE:5
STATUS:CONFIRMED
SUMMARY:recurring
TRANSP:TRANSPARENT
END:VEVENT
BEGIN:VEVENT
DTSTART;TZID=Europe/Vienna:20150924T090000
DTEND;TZID=Europe/Vienna:20150924T123000
DTSTAMP:20200205T160640Z
UID:recurr1234567890qwertyuiop@google.com
RECURRENCE-ID;TZID=Europe/Vienna:20150924T090000
CREATED:20140228T212925Z
DESCRIPTION:
LAST-MODIFIED:20150908T181423Z
LOCATION:
SEQUENCE:5
STATUS:CONFIRMED
SUMMARY:recurring
TRANSP:TRANSPARENT
END:VEVENT
END:VCALENDAR"#;

    const SINGLE: &str = "1234567890qwertyuiopasdfgh@google.com.ics";
    const FIRST_OVERRIDE: &str = "recurr1234567890qwertyuiop@google.com.20150908T090000+0200.ics";
    const SECOND_OVERRIDE: &str = "recurr1234567890qwertyuiop@google.com.20150924T090000+0200.ics";

    fn sync(dir: &Path, ics: &str, delete: bool) -> (SyncReport, SyncProgress) {
        let document = parse_document(ics).unwrap();
        let synchronizer = Synchronizer::new(Vdir::new(dir), SyncOptions { delete });
        let mut progress = SyncProgress::new();
        let report = synchronizer.sync(&document, &mut progress).unwrap();
        (report, progress)
    }

    fn file_list(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_sync_creates_all() {
        let dir = tempfile::tempdir().unwrap();

        let (report, progress) = sync(dir.path(), GOOGLE_CALENDAR, false);

        assert_eq!(file_list(dir.path()), vec![SINGLE, FIRST_OVERRIDE, SECOND_OVERRIDE]);
        assert_eq!(report.created.len(), 3);
        assert!(report.updated.is_empty() && report.unchanged.is_empty());
        assert_eq!(progress.changes().count(), 3);
        for action in progress.actions() {
            assert!(matches!(action, SyncAction::Created(_)));
            assert!(action.to_string().starts_with("creating "));
        }

        let stored = Vdir::new(dir.path())
            .read_item(&dir.path().join(FIRST_OVERRIDE))
            .unwrap();
        assert_eq!(stored.uid(), Some("recurr1234567890qwertyuiop@google.com"));
        assert_eq!(stored.get("SUMMARY").unwrap().as_text(), Some("recurring"));
    }

    #[test]
    fn test_sync_writes_referenced_timezone() {
        let dir = tempfile::tempdir().unwrap();
        sync(dir.path(), GOOGLE_CALENDAR, false);

        let zoned = fs::read_to_string(dir.path().join(FIRST_OVERRIDE)).unwrap();
        let utc = fs::read_to_string(dir.path().join(SINGLE)).unwrap();

        assert!(zoned.contains("BEGIN:VTIMEZONE\r\nTZID:Europe/Vienna\r\n"));
        assert!(!utc.contains("VTIMEZONE"));
        assert!(utc.contains("\r\nUID:1234567890qwertyuiopasdfgh@google.com\r\n"));
    }

    #[test]
    fn test_sync_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        sync(dir.path(), GOOGLE_CALENDAR, false);
        let before: Vec<Vec<u8>> = file_list(dir.path())
            .iter()
            .map(|name| fs::read(dir.path().join(name)).unwrap())
            .collect();

        let (report, progress) = sync(dir.path(), GOOGLE_CALENDAR, false);

        assert!(!report.has_changes());
        assert_eq!(report.unchanged.len(), 3);
        assert_eq!(progress.changes().count(), 0);
        let after: Vec<Vec<u8>> = file_list(dir.path())
            .iter()
            .map(|name| fs::read(dir.path().join(name)).unwrap())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_sync_ignores_new_dtstamp() {
        let dir = tempfile::tempdir().unwrap();
        sync(dir.path(), GOOGLE_CALENDAR, false);

        let restamped = GOOGLE_CALENDAR.replace("DTSTAMP:20200205T160640Z", "DTSTAMP:20241231T235959Z");
        let (report, _) = sync(dir.path(), &restamped, false);

        assert!(!report.has_changes());
    }

    #[test]
    fn test_sync_recreates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        sync(dir.path(), GOOGLE_CALENDAR, false);
        fs::remove_file(dir.path().join(SECOND_OVERRIDE)).unwrap();

        let (report, progress) = sync(dir.path(), GOOGLE_CALENDAR, false);

        assert_eq!(report.created, vec![dir.path().join(SECOND_OVERRIDE)]);
        let changes: Vec<_> = progress.changes().collect();
        assert_eq!(changes.len(), 1);
        assert!(changes[0].to_string().starts_with("creating"));
        assert!(changes[0].to_string().ends_with(SECOND_OVERRIDE));
    }

    #[test]
    fn test_sync_updates_modified_file_only() {
        let dir = tempfile::tempdir().unwrap();
        sync(dir.path(), GOOGLE_CALENDAR, false);

        let updated_path = dir.path().join(FIRST_OVERRIDE);
        let tampered = fs::read_to_string(&updated_path)
            .unwrap()
            .replace("20150908", "20140703");
        fs::write(&updated_path, tampered).unwrap();
        let single_path = dir.path().join(SINGLE);
        let single_modified = fs::metadata(&single_path).unwrap().modified().unwrap();
        let single_content = fs::read(&single_path).unwrap();

        let (report, progress) = sync(dir.path(), GOOGLE_CALENDAR, false);

        assert_eq!(report.updated, vec![updated_path.clone()]);
        assert!(report.created.is_empty());
        let changes: Vec<_> = progress.changes().collect();
        assert_eq!(changes, vec![&SyncAction::Updated(updated_path.clone())]);
        assert!(fs::read_to_string(&updated_path).unwrap().contains("20150908T090000"));
        assert_eq!(fs::metadata(&single_path).unwrap().modified().unwrap(), single_modified);
        assert_eq!(fs::read(&single_path).unwrap(), single_content);
    }

    #[test]
    fn test_sync_updates_on_changed_summary() {
        let dir = tempfile::tempdir().unwrap();
        sync(dir.path(), GOOGLE_CALENDAR, false);

        let renamed = GOOGLE_CALENDAR.replace("SUMMARY:single", "SUMMARY:single suffix");
        let (report, _) = sync(dir.path(), &renamed, false);

        assert_eq!(report.updated, vec![dir.path().join(SINGLE)]);
        assert_eq!(file_list(dir.path()).len(), 3);
        let stored = Vdir::new(dir.path()).read_item(&dir.path().join(SINGLE)).unwrap();
        assert_eq!(stored.get("SUMMARY").unwrap().as_text(), Some("single suffix"));
    }

    #[test]
    fn test_sync_keeps_unknown_files_without_delete() {
        let dir = tempfile::tempdir().unwrap();
        let extra = dir.path().join("will-be-deleted.ics");
        fs::write(&extra, "").unwrap();

        let (report, progress) = sync(dir.path(), GOOGLE_CALENDAR, false);

        assert!(extra.exists());
        assert_eq!(report.stale, vec![extra]);
        assert!(report.removed.is_empty());
        assert!(!progress.actions().iter().any(|a| matches!(a, SyncAction::Removed(_))));
    }

    #[test]
    fn test_sync_delete_removes_unknown_files() {
        let dir = tempfile::tempdir().unwrap();
        let extra = dir.path().join("will-be-deleted.ics");
        fs::write(&extra, "").unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        let (report, progress) = sync(dir.path(), GOOGLE_CALENDAR, true);

        assert!(!extra.exists());
        assert_eq!(file_list(dir.path()).len(), 4);
        assert_eq!(report.removed, vec![extra.clone()]);
        assert!(report.stale.is_empty());
        let last = progress.actions().last().unwrap();
        assert_eq!(last, &SyncAction::Removed(extra));
        assert!(last.to_string().starts_with("removing"));
        assert!(last.to_string().ends_with("will-be-deleted.ics"));
    }

    #[test]
    fn test_sync_directory_in_place_of_item_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(SINGLE)).unwrap();

        let document = parse_document(GOOGLE_CALENDAR).unwrap();
        let synchronizer = Synchronizer::new(Vdir::new(dir.path()), SyncOptions::default());
        let result = synchronizer.sync(&document, &mut SyncProgress::new());

        assert!(matches!(result, Err(VdirError::NotAFile(_))));
        assert!(dir.path().join(SINGLE).is_dir());
    }

    #[test]
    fn test_sync_tasks() {
        let tasks = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:-//Nextcloud Tasks v0.16.1
BEGIN:VTODO
UID:1e6554b1-7ec6-4b58-9688-1dd141ea22cd
CREATED:20260208T070406
LAST-MODIFIED:20260208T070416
DTSTAMP:20260208T070416
SUMMARY:test 2
DUE;VALUE=DATE:20260209
END:VTODO
BEGIN:VTODO
UID:d6c1f8fa-0dfa-4d31-a988-6e7876fe3222
CREATED:20260208T070338
LAST-MODIFIED:20260208T070338
DTSTAMP:20260208T070338
SUMMARY:test
END:VTODO
END:VCALENDAR"#;
        let dir = tempfile::tempdir().unwrap();

        sync(dir.path(), tasks, false);

        assert_eq!(
            file_list(dir.path()),
            vec![
                "1e6554b1-7ec6-4b58-9688-1dd141ea22cd.ics",
                "d6c1f8fa-0dfa-4d31-a988-6e7876fe3222.ics",
            ]
        );
        let task = Vdir::new(dir.path())
            .read_item(&dir.path().join("1e6554b1-7ec6-4b58-9688-1dd141ea22cd.ics"))
            .unwrap();
        assert_eq!(task.kind(), crate::item::ItemKind::Todo);
        assert_eq!(task.get("SUMMARY").unwrap().as_text(), Some("test 2"));
    }

    #[test]
    fn test_sync_event_replaces_stored_task() {
        let dir = tempfile::tempdir().unwrap();
        let task = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VTODO
UID:d6c1f8fa-0dfa-4d31-a988-6e7876fe3222
DTSTAMP:20260208T070338Z
SUMMARY:test
DTSTART;VALUE=DATE:20260208
END:VTODO
END:VCALENDAR"#;
        sync(dir.path(), task, false);

        let event = task.replace("VTODO", "VEVENT");
        let (report, _) = sync(dir.path(), &event, false);

        assert_eq!(report.updated.len(), 1);
    }

    #[test]
    fn test_sync_date_recurrence_ids() {
        let recurring = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:-//IDN nextcloud.com//Calendar app 5.0.0//EN
BEGIN:VEVENT
UID:b0fea373-389b-48d5-b739-9de3e298f555
DTSTAMP:20260208T070338Z
RECURRENCE-ID;VALUE=DATE:20260101
DTSTART;VALUE=DATE:20260101
SUMMARY:first
END:VEVENT
BEGIN:VEVENT
UID:b0fea373-389b-48d5-b739-9de3e298f555
DTSTAMP:20260208T070338Z
RECURRENCE-ID;VALUE=DATE:20260201
DTSTART;VALUE=DATE:20260201
SUMMARY:second
END:VEVENT
END:VCALENDAR"#;
        let dir = tempfile::tempdir().unwrap();

        sync(dir.path(), recurring, false);

        assert_eq!(
            file_list(dir.path()),
            vec![
                "b0fea373-389b-48d5-b739-9de3e298f555.20260101.ics",
                "b0fea373-389b-48d5-b739-9de3e298f555.20260201.ics",
            ]
        );
    }

    const ESCAPED_TEXT: &str = r"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:escaped-text@example.com
DTSTAMP:20260208T070338Z
SUMMARY:fish\, chips\; peas
DESCRIPTION:line one\nline two\; semi\\back
LOCATION:C:\\path
CATEGORIES:fish\, chips,bread
END:VEVENT
END:VCALENDAR";

    #[test]
    fn test_sync_keeps_text_escapes_in_stored_file() {
        let dir = tempfile::tempdir().unwrap();
        sync(dir.path(), ESCAPED_TEXT, false);

        let path = dir.path().join("escaped-text@example.com.ics");
        let stored = fs::read_to_string(&path).unwrap();

        assert!(stored.contains(r"SUMMARY:fish\, chips\; peas"));
        assert!(stored.contains(r"DESCRIPTION:line one\nline two\; semi\\back"));
        assert!(stored.contains("\r\nLOCATION:C:\\\\path\r\n"));
        assert!(stored.contains(r"CATEGORIES:fish\, chips,bread"));
        for line in stored.split_terminator("\r\n") {
            assert!(!line.contains('\n') && !line.contains('\r'), "bare line break in {:?}", line);
        }

        let item = Vdir::new(dir.path()).read_item(&path).unwrap();
        assert_eq!(
            item.get("DESCRIPTION").unwrap().as_text(),
            Some("line one\nline two; semi\\back")
        );
        assert_eq!(item.get("LOCATION").unwrap().as_text(), Some("C:\\path"));

        let (report, _) = sync(dir.path(), ESCAPED_TEXT, false);
        assert!(!report.has_changes());
    }

    #[test]
    fn test_sync_detects_backslash_only_edit() {
        let dir = tempfile::tempdir().unwrap();
        sync(dir.path(), ESCAPED_TEXT, false);

        let edited = ESCAPED_TEXT.replace(r"LOCATION:C:\\path", "LOCATION:C:path");
        let (report, _) = sync(dir.path(), &edited, false);

        assert_eq!(report.updated, vec![dir.path().join("escaped-text@example.com.ics")]);
        let stored = fs::read_to_string(dir.path().join("escaped-text@example.com.ics")).unwrap();
        assert!(stored.contains("\r\nLOCATION:C:path\r\n"));
    }

    #[test]
    fn test_sync_detects_category_split_change() {
        let dir = tempfile::tempdir().unwrap();
        sync(dir.path(), ESCAPED_TEXT, false);

        let split = ESCAPED_TEXT.replace(
            r"CATEGORIES:fish\, chips,bread",
            "CATEGORIES:fish, chips,bread",
        );
        let (report, _) = sync(dir.path(), &split, false);

        assert_eq!(report.updated.len(), 1);
    }

    #[test]
    fn test_sync_missing_output_dir_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let document = parse_document(GOOGLE_CALENDAR).unwrap();
        let synchronizer = Synchronizer::new(Vdir::new(dir.path().join("missing")), SyncOptions::default());

        let result = synchronizer.sync(&document, &mut SyncProgress::new());

        assert!(matches!(result, Err(VdirError::Io(_))));
    }
}
