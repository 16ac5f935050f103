//! CSV codec for library files.
//!
//! Handles quoted fields with embedded commas, doubled quotes and newlines.
//! Everything here is pure and synchronous; the gateway moves the text.

use crate::error::CsvError;

const BOM: char = '\u{feff}';

/// Result of [`parse_document`]: normalized header names plus the document
/// re-serialized with every data row padded to the header width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub content: String,
}

/// Header names and cleaned cell values of a library file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    /// Cell index in each row for the header at the same position.
    pub columns: Vec<usize>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// `(header, value)` pairs of one row, skipping cells that are absent.
    pub fn named_cells<'a>(&'a self, row: &'a [String]) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.headers
            .iter()
            .zip(&self.columns)
            .filter_map(move |(header, &index)| row.get(index).map(|v| (header.as_str(), v.as_str())))
    }
}

/// Split a single logical line into fields.
///
/// Commas inside double quotes do not separate fields, `""` inside a quoted
/// section is a literal quote. Fields are trimmed afterwards.
pub fn parse_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if !in_quotes => in_quotes = true,
            '"' if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = false,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);

    fields
        .into_iter()
        .map(|field| {
            let field = field.trim();
            if field.len() >= 2 && field.starts_with('"') && field.ends_with('"') {
                field[1..field.len() - 1].replace("\"\"", "\"")
            } else {
                field.to_string()
            }
        })
        .collect()
}

/// Split document text into logical lines.
///
/// A line break inside an open quote belongs to the cell, `\r\n` counts as one
/// break, and blank lines are dropped. The raw text of each line (quotes
/// included) is preserved so it can be handed to [`parse_line`].
pub fn split_logical_lines(text: &str) -> Vec<String> {
    let clean = text.strip_prefix(BOM).unwrap_or(text).trim();

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = clean.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    current.push_str("\"\"");
                    chars.next();
                    continue;
                }
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                if !current.trim().is_empty() {
                    lines.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        lines.push(current);
    }

    lines
}

/// Lower-case a header and collapse every run of characters outside
/// `[a-z0-9]` into a single underscore, trimming underscores at both ends.
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch);
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Quote a field only when it contains a quote, comma or line break.
pub fn quote_field(field: &str) -> String {
    if field.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn join_row<S: AsRef<str>>(row: &[S]) -> String {
    row.iter()
        .map(|f| quote_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Validate a CSV upload and normalize its rows.
///
/// Fails when there are no logical lines or no usable header. The header line
/// is kept as written; each data row is padded with empty cells up to the
/// header width and re-quoted minimally. Rows wider than the header keep
/// their extra cells.
pub fn parse_document(text: &str) -> Result<ParsedCsv, CsvError> {
    let mut lines = split_logical_lines(text);
    if lines.is_empty() {
        return Err(CsvError::InvalidFormat(
            "CSV must contain at least headers".into(),
        ));
    }

    let headers: Vec<String> = parse_line(&lines[0])
        .iter()
        .map(|h| normalize_header(h))
        .filter(|h| !h.is_empty())
        .collect();
    if headers.is_empty() {
        return Err(CsvError::InvalidFormat(
            "CSV must contain at least one valid column header".into(),
        ));
    }

    for line in lines.iter_mut().skip(1) {
        let mut row = parse_line(line);
        if row.len() < headers.len() {
            row.resize(headers.len(), String::new());
        }
        *line = join_row(&row);
    }

    Ok(ParsedCsv {
        headers,
        content: lines.join("\n"),
    })
}

/// Serialize a header row and data rows back to CSV text.
pub fn serialize_rows<S: AsRef<str>>(headers: &[S], rows: &[Vec<String>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(join_row(headers));
    for row in rows {
        let mut row = row.clone();
        if row.len() < headers.len() {
            row.resize(headers.len(), String::new());
        }
        lines.push(join_row(&row));
    }
    lines.join("\n")
}

/// Remove one stray quote mark (`"` or `'`) from each end, then trim.
pub fn strip_quote_marks(value: &str) -> String {
    let value = value
        .strip_prefix(['"', '\''])
        .unwrap_or(value);
    let value = value.strip_suffix(['"', '\'']).unwrap_or(value);
    value.trim().to_string()
}

/// Read a stored library file into a table.
///
/// With `pinned` headers the first line is still treated as the header row
/// and skipped, but its names are ignored. Without them the names are
/// inferred from the first line. Either way, headers that normalize to
/// nothing keep their cell slot, so later columns are not shifted onto the
/// wrong name. An empty document yields an empty table.
pub fn extract_rows(text: &str, pinned: Option<&[String]>) -> Table {
    let lines = split_logical_lines(text);
    let Some(first) = lines.first() else {
        return Table::default();
    };

    let named: Vec<(usize, String)> = parse_line(first)
        .iter()
        .map(|h| normalize_header(&strip_quote_marks(h)))
        .enumerate()
        .filter(|(_, h)| !h.is_empty())
        .collect();

    let (headers, columns) = match pinned {
        // Pinned names line up with the stored header line when it has the
        // same number of usable headers; otherwise fall back to positions.
        Some(fields) if fields.len() == named.len() => {
            (fields.to_vec(), named.iter().map(|(i, _)| *i).collect())
        }
        Some(fields) => (fields.to_vec(), (0..fields.len()).collect()),
        None => {
            let (columns, headers): (Vec<usize>, Vec<String>) = named.into_iter().unzip();
            (headers, columns)
        }
    };

    let rows = lines[1..]
        .iter()
        .map(|line| parse_line(line).iter().map(|v| strip_quote_marks(v)).collect())
        .collect();

    Table {
        headers,
        columns,
        rows,
    }
}
