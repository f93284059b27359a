use super::error::ParseError;
use crate::core::{ParentRef, RawChangeset, Serial};
use chrono::DateTime;
use std::borrow::Cow;
use std::io::BufRead;

/// Date layout used by `hg log`, e.g. `Wed Jan 04 14:26:31 2012 +0900`
pub const DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y %z";

const BOUNDARY: &str = "changeset:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Tag,
    User,
    Date,
    Files,
    Parent,
    Branch,
    Description,
}

impl Field {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "tag" => Some(Self::Tag),
            "user" => Some(Self::User),
            "date" => Some(Self::Date),
            "files" => Some(Self::Files),
            "parent" => Some(Self::Parent),
            "branch" => Some(Self::Branch),
            "description" => Some(Self::Description),
            _ => None,
        }
    }
}

/// Numbered lines of the log.
///
/// hg prints paths as raw bytes whatever the encoding, so lines are decoded
/// lossily instead of failing the whole stream.
struct LogLines<R> {
    reader: R,
    buf: Vec<u8>,
    number: usize,
}

impl<R: BufRead> LogLines<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(256),
            number: 0,
        }
    }

    fn next_line<F>(
        &mut self,
        on_diagnostic: &mut F,
    ) -> Result<Option<(usize, String)>, ParseError>
    where
        F: FnMut(ParseError) -> Result<(), ParseError>,
    {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.number += 1;
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        let line = match String::from_utf8_lossy(&self.buf) {
            Cow::Borrowed(text) => text.to_string(),
            Cow::Owned(text) => {
                on_diagnostic(ParseError::InvalidUtf8 { line: self.number })?;
                text
            }
        };
        Ok(Some((self.number, line)))
    }
}

/// Read `hg log -v` output into raw changeset records, in input order.
///
/// Malformed lines, unknown fields and bad values go to `on_diagnostic`;
/// returning `Ok(())` skips them, returning an error aborts the parse with
/// it. Every `changeset:` line yields exactly one record, and the record in
/// progress at end of stream is always emitted.
pub fn read_changesets<R, F>(
    reader: R,
    mut on_diagnostic: F,
) -> Result<Vec<RawChangeset>, ParseError>
where
    R: BufRead,
    F: FnMut(ParseError) -> Result<(), ParseError>,
{
    let mut lines = LogLines::new(reader);
    let mut changesets = Vec::with_capacity(64);
    let mut draft: Option<RawChangeset> = None;
    // Boundary line that ended a description block, handled on the next turn
    let mut carried: Option<(usize, String)> = None;

    loop {
        let (number, line) = match carried.take() {
            Some(entry) => entry,
            None => match lines.next_line(&mut on_diagnostic)? {
                Some(entry) => entry,
                None => break,
            },
        };

        let Some((key, value)) = line.split_once(':') else {
            on_diagnostic(ParseError::MissingSeparator {
                line: number,
                text: line.clone(),
            })?;
            continue;
        };

        if key == "changeset" {
            changesets.extend(draft.take());
            draft = Some(start_changeset(number, value, &mut on_diagnostic)?);
            continue;
        }

        let Some(field) = Field::from_key(key) else {
            on_diagnostic(ParseError::UnknownField {
                line: number,
                key: key.to_string(),
            })?;
            continue;
        };

        if field == Field::Description {
            let mut block = Vec::new();
            if !value.trim().is_empty() {
                block.push(value.to_string());
            }
            while let Some((number, next)) = lines.next_line(&mut on_diagnostic)? {
                if next.starts_with(BOUNDARY) {
                    carried = Some((number, next));
                    break;
                }
                block.push(next);
            }
            match draft.as_mut() {
                Some(cs) => cs.description = block.join("\n").trim().to_string(),
                None => on_diagnostic(ParseError::OrphanField {
                    line: number,
                    key: key.to_string(),
                })?,
            }
            continue;
        }

        let Some(cs) = draft.as_mut() else {
            on_diagnostic(ParseError::OrphanField {
                line: number,
                key: key.to_string(),
            })?;
            continue;
        };
        apply_field(cs, field, value.trim(), number, &mut on_diagnostic)?;
    }

    changesets.extend(draft);
    Ok(changesets)
}

/// Start the record for a `changeset:` line.
///
/// A malformed value still starts a record, with no identity.
fn start_changeset<F>(
    line: usize,
    value: &str,
    on_diagnostic: &mut F,
) -> Result<RawChangeset, ParseError>
where
    F: FnMut(ParseError) -> Result<(), ParseError>,
{
    let reason = match parse_revision(value) {
        Ok((serial, id)) if serial >= 0 => return Ok(RawChangeset::new(serial, id)),
        Ok(_) => "negative serial".to_string(),
        Err(reason) => reason,
    };
    on_diagnostic(ParseError::BadRevision {
        line,
        text: value.trim().to_string(),
        reason,
    })?;
    Ok(RawChangeset::default())
}

fn apply_field<F>(
    cs: &mut RawChangeset,
    field: Field,
    value: &str,
    line: usize,
    on_diagnostic: &mut F,
) -> Result<(), ParseError>
where
    F: FnMut(ParseError) -> Result<(), ParseError>,
{
    match field {
        Field::Tag => cs.tags.extend(value.split_whitespace().map(str::to_string)),
        Field::User => cs.user = value.to_string(),
        Field::Date => match DateTime::parse_from_str(value, DATE_FORMAT) {
            Ok(date) => cs.date = Some(date),
            Err(source) => on_diagnostic(ParseError::BadDate {
                line,
                text: value.to_string(),
                source,
            })?,
        },
        Field::Files => cs.files.extend(value.split_whitespace().map(str::to_string)),
        Field::Parent => match parse_revision(value) {
            Ok(_) if cs.parent_refs.len() >= 2 => {
                on_diagnostic(ParseError::TooManyParents { line })?
            }
            Ok((serial, id)) => cs.parent_refs.push(ParentRef::new(serial, Some(id))),
            Err(reason) => on_diagnostic(ParseError::BadRevision {
                line,
                text: value.to_string(),
                reason,
            })?,
        },
        Field::Branch => cs.branch = Some(value.to_string()),
        Field::Description => {}
    }
    Ok(())
}

/// Split a `serial:id` revision
fn parse_revision(text: &str) -> Result<(Serial, String), String> {
    let text = text.trim();
    let (serial, id) = text
        .split_once(':')
        .ok_or_else(|| "expected <serial>:<id>".to_string())?;
    let serial = serial.trim().parse::<Serial>().map_err(|e| e.to_string())?;
    let id = id.trim();
    if id.is_empty() {
        return Err("empty changeset id".to_string());
    }
    Ok((serial, id.to_string()))
}

/// Put back the parents that `hg log` leaves out.
///
/// Without `--debug`, hg omits the parent line when a changeset's only parent
/// is the revision right before it. Every identified record above serial 0
/// that lists no parents gets that predecessor back.
pub fn restore_elided_parents(records: &mut [RawChangeset]) {
    for raw in records.iter_mut().filter(|raw| raw.parent_refs.is_empty()) {
        if let Some(serial) = raw.serial.filter(|&serial| serial > 0) {
            raw.parent_refs.push(ParentRef::new(serial - 1, None));
        }
    }
}
