//! ICS writing.
//!
//! Items are written back from their content lines, so a stored file keeps
//! the property order, parameters and value text of the source document.

use super::{ContentLine, RawComponent};

/// Maximum line length in octets, excluding the CRLF (RFC 5545 section 3.1).
const FOLD_WIDTH: usize = 75;

const PRODID: &str = "-//ical2vdir//NONSGML ical2vdir//EN";

/// Generate the content of a vdir item file: a VCALENDAR envelope holding the
/// timezone definitions the item refers to, followed by the item itself.
pub fn write_item_file(item: &RawComponent, timezones: &[&RawComponent]) -> String {
    let mut out = String::new();

    push_line(&mut out, "BEGIN:VCALENDAR");
    push_line(&mut out, "VERSION:2.0");
    push_line(&mut out, &format!("PRODID:{}", PRODID));
    for timezone in timezones {
        write_component(&mut out, timezone);
    }
    write_component(&mut out, item);
    push_line(&mut out, "END:VCALENDAR");

    out
}

/// Append a component, its nested components included, to `out`.
pub fn write_component(out: &mut String, component: &RawComponent) {
    push_line(out, &format!("BEGIN:{}", component.name));
    for line in &component.lines {
        push_line(out, &render_line(line));
    }
    for nested in &component.components {
        write_component(out, nested);
    }
    push_line(out, &format!("END:{}", component.name));
}

/// Fold a content line so that no physical line exceeds 75 octets.
/// Continuation lines start with a single space.
pub fn fold_line(line: &str) -> String {
    let mut folded = String::with_capacity(line.len() + line.len() / FOLD_WIDTH * 3);
    let mut width = 0;

    for c in line.chars() {
        let len = c.len_utf8();
        if width + len > FOLD_WIDTH {
            folded.push_str("\r\n ");
            width = 1;
        }
        folded.push(c);
        width += len;
    }

    folded
}

fn render_line(line: &ContentLine) -> String {
    let mut rendered = line.name.clone();
    for (key, value) in &line.params {
        rendered.push(';');
        rendered.push_str(key);
        rendered.push('=');
        if value.contains([':', ';', ',']) {
            rendered.push('"');
            rendered.push_str(value);
            rendered.push('"');
        } else {
            rendered.push_str(value);
        }
    }
    rendered.push(':');
    rendered.push_str(&line.value);
    rendered
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(&fold_line(line));
    out.push_str("\r\n");
}
