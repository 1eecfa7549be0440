//! XLSX encoding.
//!
//! One sheet named `Data`: a bold, grey-filled header row followed by the
//! result rows. Numeric values become numeric cells; everything else is text.

use rust_xlsxwriter::{Color, Format, Workbook, Worksheet, XlsxError};

use super::Table;
use crate::db::Value;
use crate::error::{GatewayError, Result};

const SHEET_NAME: &str = "Data";

pub(super) fn encode(table: &Table) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME).map_err(xlsx_error)?;

    let header = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xD9D9D9));
    for (col, name) in table.columns.iter().enumerate() {
        sheet
            .write_string_with_format(0, column_index(col)?, name, &header)
            .map_err(xlsx_error)?;
    }

    for (i, row) in table.rows.iter().enumerate() {
        let row_index = u32::try_from(i + 1)
            .map_err(|_| GatewayError::internal("Too many rows for a worksheet"))?;
        for (col, value) in row.iter().enumerate() {
            write_cell(sheet, row_index, column_index(col)?, value)?;
        }
    }

    sheet.autofit();
    workbook.save_to_buffer().map_err(xlsx_error)
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> Result<()> {
    let written = match value {
        Value::Null => Ok(()),
        Value::Bool(b) => sheet.write_boolean(row, col, *b).map(|_| ()),
        Value::Int(_) | Value::UInt(_) | Value::Float(_) => match value.as_f64() {
            Some(n) => sheet.write_number(row, col, n).map(|_| ()),
            None => Ok(()),
        },
        other => sheet
            .write_string(row, col, other.to_display_string())
            .map(|_| ()),
    };
    written.map_err(xlsx_error)
}

fn column_index(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| GatewayError::internal("Too many columns for a worksheet"))
}

fn xlsx_error(e: XlsxError) -> GatewayError {
    GatewayError::internal(format!("XLSX encoding error: {e}"))
}
