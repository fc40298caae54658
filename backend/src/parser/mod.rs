//! Delimiter-sniffing parser for bulk upload files.
//!
//! Turns the raw bytes of an uploaded file into an ordered sequence of
//! `(row_number, field_map)` records. Row 1 is the header and supplies the
//! field names; data rows are numbered from 2 by physical line position.
//!
//! The format is deliberately plain: UTF-8 text, newline-separated records,
//! one consistent delimiter (`|` or tab, pipe checked first), no quoting or
//! escaping. Files that need quoting belong in a different tool.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ParseError, ParseResult};

/// Raw field map of one row: header name -> trimmed value.
///
/// Empty values are empty strings, never absent keys, so the ledger can
/// always show what was submitted under every column.
pub type FieldMap = BTreeMap<String, String>;

/// One parsed data row.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    /// 1-based physical line number; the header is row 1, so the first
    /// data row is 2. Interior blank lines keep later numbers honest.
    pub number: usize,
    /// Header-keyed values, trimmed.
    pub fields: FieldMap,
}

/// Result of parsing a whole file.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// Data rows in ascending row-number order.
    pub rows: Vec<ParsedRow>,
    /// Column names from the header row, trimmed.
    pub headers: Vec<String>,
    /// Detected delimiter.
    pub delimiter: char,
}

/// Detect the delimiter from the trimmed header line.
///
/// Presence check only: pipe first, then tab. A header value that embeds the
/// other character as data is not considered (no quote-aware scan).
pub fn sniff_delimiter(header_line: &str) -> ParseResult<char> {
    let header = header_line.trim();
    if header.contains('|') {
        Ok('|')
    } else if header.contains('\t') {
        Ok('\t')
    } else {
        Err(ParseError::Malformed(
            "first line must have headers separated by pipe or tab".into(),
        ))
    }
}

/// Parse the full byte content of an upload file.
///
/// Fails with a file-level [`ParseError`] on invalid UTF-8, an empty file,
/// or an unusable structure; these abort the whole job. Whitespace-only
/// lines produce no record but still occupy their physical line number.
pub fn parse_bytes(bytes: &[u8]) -> ParseResult<ParseOutcome> {
    let content = std::str::from_utf8(bytes)
        .map_err(|e| ParseError::Encoding(e.to_string()))?;
    parse_text(content)
}

/// Parse already-decoded text. See [`parse_bytes`].
pub fn parse_text(content: &str) -> ParseResult<ParseOutcome> {
    if content.trim().is_empty() {
        return Err(ParseError::EmptyFile);
    }

    let lines: Vec<&str> = content.split('\n').collect();
    if lines.len() < 2 {
        return Err(ParseError::Malformed(
            "file must contain a header row and at least one data row".into(),
        ));
    }

    let delimiter = sniff_delimiter(lines[0])?;

    let headers: Vec<String> = lines[0]
        .trim()
        .split(delimiter)
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();

    for (idx, line) in lines.iter().enumerate().skip(1) {
        // Blank lines are skipped, not enumerated; numbering stays physical.
        if line.trim().is_empty() {
            continue;
        }

        let values: Vec<&str> = line.split(delimiter).collect();
        let mut fields = FieldMap::new();

        for (i, header) in headers.iter().enumerate() {
            let value = values.get(i).map(|v| v.trim()).unwrap_or("");
            fields.insert(header.clone(), value.to_string());
        }

        rows.push(ParsedRow {
            number: idx + 1,
            fields,
        });
    }

    Ok(ParseOutcome {
        rows,
        headers,
        delimiter,
    })
}

/// Parse an upload file from disk (CLI path).
pub fn parse_file<P: AsRef<Path>>(path: P) -> ParseResult<ParseOutcome> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_delimited() {
        let text = "issuer_code|instrument_code|rating|valid_from\nABC|BOND1|AAA|2025-01-01\nXYZ|NOTE2|BB|2025-02-01";
        let outcome = parse_text(text).unwrap();

        assert_eq!(outcome.delimiter, '|');
        assert_eq!(outcome.headers, vec!["issuer_code", "instrument_code", "rating", "valid_from"]);
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].number, 2);
        assert_eq!(outcome.rows[1].number, 3);
        assert_eq!(outcome.rows[0].fields["issuer_code"], "ABC");
        assert_eq!(outcome.rows[1].fields["rating"], "BB");
    }

    #[test]
    fn test_tab_delimited() {
        let text = "issuer_code\tinstrument_code\trating\tvalid_from\nABC\tBOND1\tAAA\t2025-01-01";
        let outcome = parse_text(text).unwrap();

        assert_eq!(outcome.delimiter, '\t');
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].fields["instrument_code"], "BOND1");
    }

    #[test]
    fn test_pipe_wins_over_tab() {
        // A header containing both is split on pipe; tab survives as data.
        let text = "a|b\tc\n1|2\t3";
        let outcome = parse_text(text).unwrap();

        assert_eq!(outcome.delimiter, '|');
        assert_eq!(outcome.headers, vec!["a", "b\tc"]);
    }

    #[test]
    fn test_rows_numbered_from_two() {
        let text = "a|b\n1|2\n3|4\n5|6";
        let outcome = parse_text(text).unwrap();

        let numbers: Vec<usize> = outcome.rows.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![2, 3, 4]);
    }

    #[test]
    fn test_values_trimmed_and_empty_kept() {
        let text = "a| b |c\n 1 ||3";
        let outcome = parse_text(text).unwrap();

        assert_eq!(outcome.headers, vec!["a", "b", "c"]);
        assert_eq!(outcome.rows[0].fields["a"], "1");
        assert_eq!(outcome.rows[0].fields["b"], "");
        assert_eq!(outcome.rows[0].fields["c"], "3");
    }

    #[test]
    fn test_missing_trailing_values_become_empty() {
        let text = "a|b|c\n1|2";
        let outcome = parse_text(text).unwrap();

        assert_eq!(outcome.rows[0].fields["c"], "");
    }

    #[test]
    fn test_extra_values_ignored() {
        let text = "a|b\n1|2|3|4";
        let outcome = parse_text(text).unwrap();

        assert_eq!(outcome.rows[0].fields.len(), 2);
        assert_eq!(outcome.rows[0].fields["b"], "2");
    }

    #[test]
    fn test_invalid_utf8_is_encoding_error() {
        let bytes: &[u8] = &[0x61, 0x7c, 0x62, 0x0a, 0xff, 0xfe, 0x7c, 0x63];
        let err = parse_bytes(bytes).unwrap_err();
        assert!(matches!(err, ParseError::Encoding(_)));
    }

    #[test]
    fn test_empty_file() {
        assert!(matches!(parse_text(""), Err(ParseError::EmptyFile)));
        assert!(matches!(parse_text("  \n \n"), Err(ParseError::EmptyFile)));
    }

    #[test]
    fn test_single_line_is_malformed() {
        let err = parse_text("a|b").unwrap_err();
        assert!(matches!(err, ParseError::Malformed(_)));
    }

    #[test]
    fn test_undetectable_delimiter() {
        let err = parse_text("a,b,c\n1,2,3").unwrap_err();
        match err {
            ParseError::Malformed(msg) => assert!(msg.contains("pipe or tab")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_header_only_yields_zero_rows() {
        // A trailing newline after the header satisfies the two-line check
        // but contributes no data rows.
        let outcome = parse_text("a|b\n").unwrap();
        assert!(outcome.rows.is_empty());
    }

    #[test]
    fn test_interior_blank_line_skipped_with_physical_numbering() {
        let text = "a|b\n1|2\n\n3|4\n";
        let outcome = parse_text(text).unwrap();

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].number, 2);
        // Line 3 is blank; the next record keeps its physical position.
        assert_eq!(outcome.rows[1].number, 4);
    }

    #[test]
    fn test_trailing_blank_lines_not_enumerated() {
        let text = "a|b\n1|2\n\n\n";
        let outcome = parse_text(text).unwrap();
        assert_eq!(outcome.rows.len(), 1);
    }

    #[test]
    fn test_crlf_values_are_trimmed() {
        let text = "a|b\r\n1|2\r\n";
        let outcome = parse_text(text).unwrap();

        assert_eq!(outcome.headers, vec!["a", "b"]);
        assert_eq!(outcome.rows[0].fields["b"], "2");
    }
}
