//! Bed mesh section codec.
//!
//! Klipper appends calibration data to the end of `printer.cfg` as a block of
//! commented lines, one block per saved section:
//!
//! ```text
//! #*# [bed_mesh session_mesh]
//! #*# version = 1
//! #*# points =
//! #*#   0.012, 0.020, 0.031
//! #*# [probe]
//! #*# z_offset = 1.250
//! ```
//!
//! A section starts at its marker line and runs up to, but not including, the
//! next line beginning with `#*# [` (or to the end of the document). The
//! functions here locate, rename and delete such blocks with a plain line
//! scanner. Line terminators (`\n` or `\r\n`) are kept as part of each line,
//! so every byte outside the targeted block is returned untouched.

use std::ops::Range;

/// Prefix shared by every saved-section marker line.
pub const MARKER_PREFIX: &str = "#*# [";

/// Prefix of a bed mesh marker line, up to the profile name.
pub const BED_MESH_PREFIX: &str = "#*# [bed_mesh ";

/// A bed mesh section located inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section<'a> {
    /// Profile name from the marker line.
    pub name: &'a str,

    /// Raw block text, marker line included.
    pub body: &'a str,

    /// Byte offset of the block within the document.
    pub start: usize,
}

impl<'a> Section<'a> {
    /// Byte range of the block within the document.
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.body.len()
    }

    /// Block text after the marker line.
    pub fn content(&self) -> &'a str {
        match self.body.find('\n') {
            Some(idx) => &self.body[idx + 1..],
            None => "",
        }
    }
}

/// Marker line (without terminator) for the profile `name`.
pub fn marker_line(name: &str) -> String {
    format!("{}{}]", BED_MESH_PREFIX, name)
}

/// Return the first section called `name`, if any.
pub fn extract<'a>(doc: &'a str, name: &str) -> Option<Section<'a>> {
    let range = find_ranges(doc, name).into_iter().next()?;
    let name_start = range.start + BED_MESH_PREFIX.len();
    Some(Section {
        name: &doc[name_start..name_start + name.len()],
        body: &doc[range.clone()],
        start: range.start,
    })
}

/// Replace the marker line of every `old` section with the marker for `new`.
///
/// Section content is left as is. A document without an `old` section is
/// returned unchanged.
pub fn rename(doc: &str, old: &str, new: &str) -> String {
    let ranges = find_ranges(doc, old);
    if ranges.is_empty() {
        return doc.to_string();
    }

    let old_marker_len = marker_line(old).len();
    let new_marker = marker_line(new);

    let mut out = String::with_capacity(doc.len() + ranges.len() * new_marker.len());
    let mut cursor = 0;
    for range in ranges {
        out.push_str(&doc[cursor..range.start]);
        out.push_str(&new_marker);
        cursor = range.start + old_marker_len;
    }
    out.push_str(&doc[cursor..]);
    out
}

/// Remove every section called `name`, marker line through end of block.
pub fn delete(doc: &str, name: &str) -> String {
    let ranges = find_ranges(doc, name);
    if ranges.is_empty() {
        return doc.to_string();
    }

    let mut out = String::with_capacity(doc.len());
    let mut cursor = 0;
    for range in ranges {
        out.push_str(&doc[cursor..range.start]);
        cursor = range.end;
    }
    out.push_str(&doc[cursor..]);
    out
}

/// All bed mesh sections in document order.
pub fn sections(doc: &str) -> Vec<Section<'_>> {
    let mut found = Vec::new();
    let mut open: Option<(usize, &str)> = None;

    for (offset, line) in lines(doc) {
        if !line.starts_with(MARKER_PREFIX) {
            continue;
        }
        if let Some((start, name)) = open.take() {
            found.push(Section {
                name,
                body: &doc[start..offset],
                start,
            });
        }
        open = bed_mesh_name(line).map(|name| (offset, name));
    }

    if let Some((start, name)) = open {
        found.push(Section {
            name,
            body: &doc[start..],
            start,
        });
    }
    found
}

/// Byte ranges of every section called `name`.
fn find_ranges(doc: &str, name: &str) -> Vec<Range<usize>> {
    let marker = marker_line(name);
    let mut ranges = Vec::new();
    let mut open: Option<usize> = None;

    for (offset, line) in lines(doc) {
        if !line.starts_with(MARKER_PREFIX) {
            continue;
        }
        if let Some(start) = open.take() {
            ranges.push(start..offset);
        }
        if strip_terminator(line).trim_end() == marker {
            open = Some(offset);
        }
    }

    if let Some(start) = open {
        ranges.push(start..doc.len());
    }
    ranges
}

/// Lines with their terminators, paired with their byte offset.
fn lines(doc: &str) -> impl Iterator<Item = (usize, &str)> {
    doc.split_inclusive('\n').scan(0, |offset, line| {
        let start = *offset;
        *offset += line.len();
        Some((start, line))
    })
}

fn strip_terminator(line: &str) -> &str {
    line.trim_end_matches(|c| c == '\n' || c == '\r')
}

/// Profile name of a bed mesh marker line.
fn bed_mesh_name(line: &str) -> Option<&str> {
    strip_terminator(line)
        .trim_end()
        .strip_prefix(BED_MESH_PREFIX)?
        .strip_suffix(']')
}
