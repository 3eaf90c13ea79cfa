#![cfg(feature = "xlsx_export")]

//! Workbook export.

use std::path::Path;

use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};

use crate::compare::RowHighlight;
use crate::error::{ReconcileError, ReconcileResult};
use crate::types::Value;

use super::ExportSheet;

// Excel's hard worksheet limits.
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

/// Write `sheets` to a new `.xlsx` file at `path`, one worksheet each, in order.
pub fn write_workbook(path: impl AsRef<Path>, sheets: &[ExportSheet]) -> ReconcileResult<()> {
    let mut workbook = build_workbook(sheets)?;
    workbook.save(path.as_ref())?;
    Ok(())
}

/// Same as [`write_workbook`], returning the file contents (e.g. for a download response).
pub fn workbook_to_buffer(sheets: &[ExportSheet]) -> ReconcileResult<Vec<u8>> {
    let mut workbook = build_workbook(sheets)?;
    Ok(workbook.save_to_buffer()?)
}

struct Formats {
    header: Format,
    plain: Format,
    fill_a: Format,
    fill_b: Format,
}

impl Formats {
    fn new() -> Self {
        let fill = |h: RowHighlight| match h.fill_rgb() {
            Some(rgb) => Format::new().set_background_color(Color::RGB(rgb)),
            None => Format::new(),
        };
        Self {
            header: Format::new().set_bold(),
            plain: Format::new(),
            fill_a: fill(RowHighlight::ColorA),
            fill_b: fill(RowHighlight::ColorB),
        }
    }

    fn for_row(&self, h: RowHighlight) -> &Format {
        match h {
            RowHighlight::None => &self.plain,
            RowHighlight::ColorA => &self.fill_a,
            RowHighlight::ColorB => &self.fill_b,
        }
    }
}

fn build_workbook(sheets: &[ExportSheet]) -> ReconcileResult<Workbook> {
    let formats = Formats::new();
    let mut workbook = Workbook::new();
    for sheet in sheets {
        check_limits(sheet)?;
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        write_sheet(worksheet, sheet, &formats)?;
    }
    Ok(workbook)
}

fn check_limits(sheet: &ExportSheet) -> ReconcileResult<()> {
    let rows = sheet.table.row_count() + 1;
    let cols = sheet.table.schema.len();
    if rows > MAX_ROWS || cols > MAX_COLS {
        return Err(ReconcileError::SchemaMismatch {
            message: format!(
                "sheet '{}' has {rows} rows x {cols} columns, more than a worksheet holds",
                sheet.name
            ),
        });
    }
    Ok(())
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &ExportSheet, formats: &Formats) -> ReconcileResult<()> {
    let width = sheet.table.schema.len();
    if width == 0 {
        return Ok(());
    }

    for (col, name) in sheet.table.schema.names().enumerate() {
        worksheet.write_string_with_format(0, col as u16, name, &formats.header)?;
    }

    for (idx, row) in sheet.table.rows.iter().enumerate() {
        let r = (idx + 1) as u32;
        let highlight = sheet
            .highlights
            .as_ref()
            .map(|plan| plan.get(idx))
            .unwrap_or_default();
        let format = formats.for_row(highlight);
        for col in 0..width {
            let c = col as u16;
            match row.get(col).unwrap_or(&Value::Null) {
                Value::Int64(i) => {
                    worksheet.write_number_with_format(r, c, *i as f64, format)?;
                }
                Value::Float64(f) if f.is_finite() => {
                    worksheet.write_number_with_format(r, c, *f, format)?;
                }
                Value::Bool(b) => {
                    worksheet.write_boolean_with_format(r, c, *b, format)?;
                }
                Value::Utf8(s) => {
                    worksheet.write_string_with_format(r, c, s, format)?;
                }
                Value::Null | Value::Float64(_) => {
                    // Blank cells still carry the row fill.
                    if highlight != RowHighlight::None {
                        worksheet.write_blank(r, c, format)?;
                    }
                }
            }
        }
    }

    if sheet.freeze_header {
        worksheet.set_freeze_panes(1, 0)?;
        let last_row = sheet.table.row_count() as u32;
        worksheet.autofilter(0, 0, last_row, (width - 1) as u16)?;
    }
    Ok(())
}
