//! Naive CSV parsing for imports.
//!
//! Comma-split with quote stripping; embedded commas and quoted
//! newlines are a known, accepted limitation of the import format.

use crate::domain::ImportError;

/// Parsed CSV: one header row plus data rows. Missing trailing cells
/// read as empty strings.
#[derive(Debug, Clone)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn parse(text: &str) -> Result<Self, ImportError> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());

        let headers = match lines.next() {
            Some(line) => split_line(line),
            None => return Err(ImportError::TooFewRows),
        };
        let rows: Vec<Vec<String>> = lines.map(split_line).collect();

        if rows.is_empty() {
            return Err(ImportError::TooFewRows);
        }

        Ok(Self { headers, rows })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn value<'a>(&'a self, row: &'a [String], column: Option<usize>) -> &'a str {
        column
            .and_then(|idx| row.get(idx))
            .map(String::as_str)
            .unwrap_or("")
    }
}

fn split_line(line: &str) -> Vec<String> {
    line.split(',')
        .map(|cell| cell.trim().replace('"', ""))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headers_and_rows() {
        let table = CsvTable::parse("a,b,c\n1,2,3\n4,5,6\n").unwrap();
        assert_eq!(table.headers, vec!["a", "b", "c"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["4", "5", "6"]);
    }

    #[test]
    fn strips_quotes_and_whitespace() {
        let table = CsvTable::parse("\"Task\", \"Hours\"\n\"write docs\", 2\n").unwrap();
        assert_eq!(table.headers, vec!["Task", "Hours"]);
        assert_eq!(table.rows[0], vec!["write docs", "2"]);
    }

    #[test]
    fn skips_blank_lines() {
        let table = CsvTable::parse("a,b\n\n1,2\n   \n3,4\n").unwrap();
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn rejects_header_only_input() {
        assert!(matches!(
            CsvTable::parse("a,b\n"),
            Err(ImportError::TooFewRows)
        ));
        assert!(matches!(CsvTable::parse(""), Err(ImportError::TooFewRows)));
    }

    #[test]
    fn missing_cells_read_empty() {
        let table = CsvTable::parse("a,b,c\n1,2\n").unwrap();
        let col = table.column("c");
        assert_eq!(table.value(&table.rows[0], col), "");
    }
}
