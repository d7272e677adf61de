//! CSV export of collected tables

use crate::error::Result;
use crate::table::Table;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Write `table` as CSV to `path`
///
/// A `.csv` extension is appended when `path` has a different or no extension, and
/// missing parent directories are created. Returns the path actually written.
pub fn write_csv(table: &Table, path: &Path) -> Result<PathBuf> {
    let path = with_csv_extension(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(&path)?;
    write_table(table, file)?;

    info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns().len(),
        "CSV written"
    );
    Ok(path)
}

/// Write `table` as CSV to any writer: a header of column names, then one line per row
pub fn write_table<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    // A table without columns has nothing to describe, not even a header
    if !table.columns().is_empty() {
        csv.write_record(table.columns())?;
        for row in table.rendered_rows() {
            csv.write_record(&row)?;
        }
    }
    csv.flush()?;
    Ok(())
}

/// `path` with a `.csv` extension
pub fn with_csv_extension(path: &Path) -> PathBuf {
    let has_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if has_csv {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".csv");
        PathBuf::from(name)
    }
}
