//! ICS parsing using the icalendar crate's parser.
//!
//! The document is unfolded and read line by line. Each property line goes
//! through the icalendar property parser for its name and parameters, while
//! the value is kept as written: the parser decodes TEXT escapes, and a
//! decoded value can no longer tell a list separator from an escaped comma.

use icalendar::parser::{Property, unfold};

use crate::error::{VdirError, VdirResult};

/// One unfolded `NAME;PARAM=VALUE:value` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    pub name: String,
    /// Parameters in source order, names uppercased, surrounding quotes removed
    pub params: Vec<(String, String)>,
    /// Value text exactly as it appeared, TEXT escapes (`\n`, `\,`, `\;`, `\\`) included
    pub value: String,
}

impl ContentLine {
    pub fn new(name: &str, value: &str) -> Self {
        ContentLine {
            name: name.to_ascii_uppercase(),
            params: Vec::new(),
            value: value.to_string(),
        }
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.push((key.to_ascii_uppercase(), value.to_string()));
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn parse(line: &str) -> Result<Self, String> {
        let prop = Property::try_from(line)?;

        let params = prop
            .params
            .iter()
            .map(|p| {
                let value = p
                    .val
                    .as_ref()
                    .map(|v| unquote(v.as_ref()).to_string())
                    .unwrap_or_default();
                (p.key.as_ref().to_ascii_uppercase(), value)
            })
            .collect();

        Ok(ContentLine {
            name: prop.name.as_ref().to_ascii_uppercase(),
            params,
            value: raw_value(line).to_string(),
        })
    }
}

/// A calendar component (VEVENT, VTODO, VTIMEZONE, VALARM, ...) as parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawComponent {
    pub name: String,
    pub lines: Vec<ContentLine>,
    pub components: Vec<RawComponent>,
}

impl RawComponent {
    fn new(name: &str) -> Self {
        RawComponent {
            name: name.to_ascii_uppercase(),
            lines: Vec::new(),
            components: Vec::new(),
        }
    }

    pub fn find_line(&self, name: &str) -> Option<&ContentLine> {
        self.lines.iter().find(|line| line.name == name)
    }
}

/// The subcomponents of a parsed VCALENDAR, in document order.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub components: Vec<RawComponent>,
}

impl Document {
    /// The VTIMEZONE definition for a TZID, if the document carries one.
    pub fn timezone(&self, tzid: &str) -> Option<&RawComponent> {
        self.components.iter().find(|c| {
            c.name == "VTIMEZONE" && c.find_line("TZID").is_some_and(|line| line.value == tzid)
        })
    }
}

/// Parse a whole .ics document.
///
/// Components outside a VCALENDAR (a bare VEVENT file) are taken as they are.
pub fn parse_document(content: &str) -> VdirResult<Document> {
    let unfolded = unfold(content);
    let mut open: Vec<RawComponent> = Vec::new();
    let mut roots: Vec<RawComponent> = Vec::new();

    for (index, line) in unfolded.lines().enumerate() {
        let number = index + 1;
        let line = line.trim_start();
        if line.is_empty() {
            continue;
        }

        if let Some(name) = strip_keyword(line, "BEGIN:") {
            if name.is_empty() {
                return Err(parse_error(number, "BEGIN without a component name"));
            }
            open.push(RawComponent::new(name));
        } else if let Some(name) = strip_keyword(line, "END:") {
            let component = match open.pop() {
                Some(component) if component.name.eq_ignore_ascii_case(name) => component,
                Some(component) => {
                    return Err(parse_error(
                        number,
                        &format!("END:{} closes {}", name, component.name),
                    ));
                }
                None => return Err(parse_error(number, &format!("END:{} without BEGIN", name))),
            };
            match open.last_mut() {
                Some(parent) => parent.components.push(component),
                None => roots.push(component),
            }
        } else {
            let Some(current) = open.last_mut() else {
                return Err(parse_error(number, "property outside of a component"));
            };
            let content_line = ContentLine::parse(line).map_err(|e| parse_error(number, &e))?;
            current.lines.push(content_line);
        }
    }

    if let Some(component) = open.last() {
        return Err(VdirError::IcsParse(format!("{} is never closed", component.name)));
    }

    let components = roots
        .into_iter()
        .flat_map(|root| {
            if root.name == "VCALENDAR" {
                root.components
            } else {
                vec![root]
            }
        })
        .collect();

    Ok(Document { components })
}

fn parse_error(line: usize, message: &str) -> VdirError {
    VdirError::IcsParse(format!("line {}: {}", line, message))
}

/// `BEGIN:`/`END:` are matched case-insensitively, the name is trimmed.
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let prefix = line.get(..keyword.len())?;
    prefix
        .eq_ignore_ascii_case(keyword)
        .then(|| line[keyword.len()..].trim())
}

/// Everything after the first `:` that is not inside a quoted parameter value.
fn raw_value(line: &str) -> &str {
    let mut quoted = false;
    for (at, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ':' if !quoted => return &line[at + 1..],
            _ => {}
        }
    }
    ""
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
