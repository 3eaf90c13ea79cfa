//! CSV export.

use std::io::Write;
use std::path::Path;

use crate::error::ReconcileResult;
use crate::types::Table;

/// Write `table` as CSV: one header record, then one record per row.
///
/// Cells use their spreadsheet-style text (blank for nulls, integral floats without decimals).
pub fn write_table_csv<W: Write>(writer: W, table: &Table) -> ReconcileResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(table.schema.names())?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `table` to a CSV file at `path`, replacing any existing file.
pub fn write_table_csv_to_path(path: impl AsRef<Path>, table: &Table) -> ReconcileResult<()> {
    let file = std::fs::File::create(path)?;
    write_table_csv(std::io::BufWriter::new(file), table)
}

#[cfg(test)]
mod tests {
    use super::write_table_csv;
    use crate::types::{Schema, Table, Value};

    #[test]
    fn writes_header_and_display_text() {
        let t = Table::new(
            Schema::new(["ID", "Amount", "Note"]),
            vec![
                vec![Value::text("A,1"), Value::Float64(10.0), Value::Null],
                vec![Value::Int64(2), Value::Float64(2.5), Value::Bool(true)],
            ],
        );
        let mut buf = Vec::new();
        write_table_csv(&mut buf, &t).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "ID,Amount,Note\n\"A,1\",10,\n2,2.5,true\n");
    }
}
