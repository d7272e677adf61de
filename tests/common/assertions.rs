//! CSV assertions for extraction tests

use std::path::Path;

/// Parsed CSV output: header plus data rows
#[derive(Debug)]
pub struct CsvContents {
    /// Header row
    pub headers: Vec<String>,
    /// Data rows, each aligned with `headers`
    pub rows: Vec<Vec<String>>,
}

impl CsvContents {
    /// Values of one column, in row order
    pub fn column(&self, name: &str) -> Vec<String> {
        let index = self
            .headers
            .iter()
            .position(|h| h == name)
            .unwrap_or_else(|| panic!("column {name} not in {:?}", self.headers));
        self.rows.iter().map(|row| row[index].clone()).collect()
    }
}

/// Read a CSV file written by the exporter
pub fn read_csv(path: &Path) -> CsvContents {
    let mut reader = csv::Reader::from_path(path)
        .unwrap_or_else(|e| panic!("failed to open {}: {e}", path.display()));
    let headers = reader
        .headers()
        .expect("failed to read CSV header")
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|record| {
            record
                .expect("failed to read CSV row")
                .iter()
                .map(str::to_string)
                .collect()
        })
        .collect();
    CsvContents { headers, rows }
}

/// Assert that every row has a non-empty value in `column`
pub fn assert_column_filled(contents: &CsvContents, column: &str) {
    for (i, value) in contents.column(column).iter().enumerate() {
        assert!(!value.is_empty(), "row {i} has empty {column}");
    }
}
