use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::mem;

use super::{FieldType, Fields, ProbeError, ProbeResult, data_path};
use crate::source::Datasource;

/// Columns that hold geometries rather than attributes
const GEOMETRY_COLUMNS: [&str; 2] = ["wkt", "geojson"];

/// Separators tried, in order of preference, when none is configured
const SEPARATORS: [char; 4] = [',', '\t', '|', ';'];

/// Lines a single quoted record may span before it is cut off
const MAX_RECORD_LINES: usize = 64;

/// Header columns, typed by the values of the first data row.
///
/// Only the header and the first data row are read.
pub fn describe(datasource: &Datasource) -> ProbeResult<Fields> {
    let quote = datasource
        .get_str("quote")
        .and_then(|q| q.chars().next())
        .unwrap_or('"');

    if let Some(inline) = datasource.get_str("inline") {
        let mut records = Records::new(inline.as_bytes(), quote);
        return describe_records(datasource, quote, "inline data", || {
            Ok(records.next_record().unwrap_or_default())
        });
    }

    let path = data_path(datasource)?;
    let file = File::open(&path).map_err(|e| ProbeError::IoError(e, path.clone()))?;
    let mut records = Records::new(BufReader::new(file), quote);
    describe_records(datasource, quote, &path.display().to_string(), || {
        records
            .next_record()
            .map_err(|e| ProbeError::IoError(e, path.clone()))
    })
}

fn describe_records(
    datasource: &Datasource,
    quote: char,
    label: &str,
    mut next_record: impl FnMut() -> ProbeResult<Option<String>>,
) -> ProbeResult<Fields> {
    let header = match datasource.get_str("headers") {
        Some(headers) => headers.to_string(),
        None => match next_record()? {
            Some(line) => line.trim_start_matches('\u{feff}').to_string(),
            None => return Err(ProbeError::InvalidCsv("no header row", label.to_string())),
        },
    };

    let separator = match datasource.get_str("separator") {
        Some(sep) => sep
            .chars()
            .next()
            .ok_or_else(|| ProbeError::InvalidParameter("separator", "empty".to_string()))?,
        None => detect_separator(&header),
    };

    let columns = split_row(&header, separator, quote);
    if columns.iter().all(|c| c.trim().is_empty()) {
        return Err(ProbeError::InvalidCsv("empty header row", label.to_string()));
    }
    let first_row = next_record()?
        .map(|line| split_row(&line, separator, quote))
        .unwrap_or_default();

    let mut fields = Fields::new();
    for (idx, column) in columns.iter().enumerate() {
        let name = column.trim();
        if name.is_empty() || GEOMETRY_COLUMNS.contains(&name.to_lowercase().as_str()) {
            continue;
        }
        let value = first_row.get(idx).map_or("", String::as_str);
        fields.entry(name.to_string()).or_insert(value_type(value));
    }
    Ok(fields)
}

/// Reads non-blank records one at a time. A record continues on the next
/// line while it has an unclosed quote. Invalid UTF-8 is replaced.
struct Records<R> {
    reader: R,
    quote: char,
    buf: Vec<u8>,
}

impl<R: BufRead> Records<R> {
    fn new(reader: R, quote: char) -> Self {
        Self {
            reader,
            quote,
            buf: Vec::new(),
        }
    }

    fn next_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&self.buf);
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn next_record(&mut self) -> io::Result<Option<String>> {
        let mut record = loop {
            match self.next_line()? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => break line,
                None => return Ok(None),
            }
        };
        let mut lines = 1;
        while record.matches(self.quote).count() % 2 == 1 && lines < MAX_RECORD_LINES {
            let Some(line) = self.next_line()? else {
                break;
            };
            record.push('\n');
            record.push_str(&line);
            lines += 1;
        }
        Ok(Some(record))
    }
}

fn detect_separator(header: &str) -> char {
    SEPARATORS
        .iter()
        .copied()
        .max_by_key(|sep| {
            // prefer earlier separators on ties
            let rank = SEPARATORS.len() - SEPARATORS.iter().position(|s| s == sep).unwrap_or(0);
            (header.matches(*sep).count(), rank)
        })
        .unwrap_or(',')
}

/// Split a line into cells, honouring quoted cells and doubled quotes.
fn split_row(line: &str, separator: char, quote: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if quoted {
            if c == quote {
                if chars.peek() == Some(&quote) {
                    cell.push(quote);
                    chars.next();
                } else {
                    quoted = false;
                }
            } else {
                cell.push(c);
            }
        } else if c == quote {
            quoted = true;
        } else if c == separator {
            cells.push(mem::take(&mut cell));
        } else {
            cell.push(c);
        }
    }
    cells.push(cell);
    cells
}

fn value_type(value: &str) -> FieldType {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
        FieldType::Boolean
    } else if looks_numeric(value) && value.parse::<f64>().is_ok() {
        FieldType::Number
    } else {
        FieldType::String
    }
}

/// Rules out the `inf` and `NaN` spellings that `f64` parsing accepts.
fn looks_numeric(value: &str) -> bool {
    value
        .trim_start_matches(['-', '+'])
        .starts_with(|c: char| c.is_ascii_digit() || c == '.')
}
