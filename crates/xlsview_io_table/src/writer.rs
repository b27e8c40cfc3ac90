//! XLSX sink that writes the table into a single in-memory worksheet.

use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use tracing::debug;

use crate::conf::{
    C_CONTENT_TYPE_XLSX, C_SHEET_NAME_DEFAULT, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
};
use crate::sink::TableSink;
use crate::spec::{EnumCellValue, RenderTableError, Result, SpecRenderOptions};
use crate::util::sanitize_sheet_name;

/// Largest integer magnitude Excel stores without losing precision.
const N_EXCEL_EXACT_INTEGER_MAX: i64 = 1 << 53;

/// Single-sheet workbook sink.
///
/// Rows are written as they arrive; the workbook is assembled and
/// serialized in [`TableSink::finish`].
pub struct XlsxSink {
    c_sheet_name: String,
    worksheet: Option<Worksheet>,
    null_str: String,
    date_format: String,
    n_row_next: usize,
    if_released: bool,
}

impl XlsxSink {
    /// Create a sink writing into a worksheet named after `sheet_name`
    /// (sanitized to a valid Excel sheet name).
    pub fn new(sheet_name: &str, options: &SpecRenderOptions) -> Result<Self> {
        let c_sheet_name = sanitize_sheet_name(sheet_name, "_");
        let mut worksheet = Worksheet::new();
        worksheet
            .set_name(&c_sheet_name)
            .map_err(derive_xlsx_error)?;

        Ok(Self {
            c_sheet_name,
            worksheet: Some(worksheet),
            null_str: options.null_str.clone(),
            date_format: options.date_format.clone(),
            n_row_next: 0,
            if_released: false,
        })
    }

    /// Create a sink writing into the default sheet.
    pub fn from_options(options: &SpecRenderOptions) -> Result<Self> {
        Self::new(C_SHEET_NAME_DEFAULT, options)
    }

    /// Sanitized sheet name.
    pub fn sheet_name(&self) -> &str {
        &self.c_sheet_name
    }

    /// Number of rows written so far.
    pub fn rows_written(&self) -> usize {
        self.n_row_next
    }

    fn derive_open_worksheet(&mut self) -> Result<&mut Worksheet> {
        if self.if_released {
            return Err(RenderTableError::Sink(
                "Cannot write after release().".to_string(),
            ));
        }
        self.worksheet
            .as_mut()
            .ok_or_else(|| RenderTableError::Sink("Cannot write after finish().".to_string()))
    }
}

impl TableSink for XlsxSink {
    fn content_type(&self) -> &str {
        C_CONTENT_TYPE_XLSX
    }

    fn write_row(&mut self, cells: &[EnumCellValue]) -> Result<()> {
        if self.n_row_next >= N_NROWS_EXCEL_MAX {
            return Err(RenderTableError::SinkLimit(format!(
                "row {} exceeds the Excel maximum of {N_NROWS_EXCEL_MAX} rows",
                self.n_row_next + 1
            )));
        }
        if cells.len() > N_NCOLS_EXCEL_MAX {
            return Err(RenderTableError::SinkLimit(format!(
                "{} columns exceed the Excel maximum of {N_NCOLS_EXCEL_MAX} columns",
                cells.len()
            )));
        }

        let n_row = cast_row_num(self.n_row_next)?;
        let c_null = self.null_str.clone();
        let c_date_format = self.date_format.clone();
        let worksheet = self.derive_open_worksheet()?;
        for (idx_col, cell) in cells.iter().enumerate() {
            let n_col = cast_col_num(idx_col)?;
            write_cell(worksheet, n_row, n_col, cell, &c_null, &c_date_format)?;
        }

        self.n_row_next += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        self.derive_open_worksheet()?;
        let Some(worksheet) = self.worksheet.take() else {
            return Err(RenderTableError::Sink(
                "Cannot finish twice.".to_string(),
            ));
        };

        let mut workbook = Workbook::new();
        workbook.push_worksheet(worksheet);
        let v_bytes = workbook.save_to_buffer().map_err(derive_xlsx_error)?;
        debug!(
            sheet = %self.c_sheet_name,
            n_rows = self.n_row_next,
            n_bytes = v_bytes.len(),
            "xlsx workbook serialized"
        );
        Ok(v_bytes)
    }

    fn release(&mut self) {
        if self.if_released {
            return;
        }
        self.worksheet = None;
        self.if_released = true;
    }
}

fn write_cell(
    worksheet: &mut Worksheet,
    n_row: u32,
    n_col: u16,
    cell: &EnumCellValue,
    null_str: &str,
    date_format: &str,
) -> Result<()> {
    match cell {
        EnumCellValue::None => {
            if !null_str.is_empty() {
                worksheet
                    .write_string(n_row, n_col, null_str)
                    .map_err(derive_xlsx_error)?;
            }
        }
        EnumCellValue::String(val) => {
            if !val.is_empty() {
                worksheet
                    .write_string(n_row, n_col, val)
                    .map_err(derive_xlsx_error)?;
            }
        }
        EnumCellValue::Integer(val) => {
            if val.unsigned_abs() <= N_EXCEL_EXACT_INTEGER_MAX as u64 {
                worksheet
                    .write_number(n_row, n_col, *val as f64)
                    .map_err(derive_xlsx_error)?;
            } else {
                worksheet
                    .write_string(n_row, n_col, val.to_string())
                    .map_err(derive_xlsx_error)?;
            }
        }
        EnumCellValue::Number(val) => {
            if val.is_finite() {
                worksheet
                    .write_number(n_row, n_col, *val)
                    .map_err(derive_xlsx_error)?;
            } else {
                worksheet
                    .write_string(n_row, n_col, val.to_string())
                    .map_err(derive_xlsx_error)?;
            }
        }
        EnumCellValue::Boolean(val) => {
            worksheet
                .write_boolean(n_row, n_col, *val)
                .map_err(derive_xlsx_error)?;
        }
        EnumCellValue::DateTime(val) => {
            worksheet
                .write_string(n_row, n_col, val.format(date_format).to_string())
                .map_err(derive_xlsx_error)?;
        }
    }
    Ok(())
}

fn cast_row_num(value: usize) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| RenderTableError::SinkLimit(format!("row index overflow: {value}")))
}

fn cast_col_num(value: usize) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| RenderTableError::SinkLimit(format!("column index overflow: {value}")))
}

fn derive_xlsx_error(err: XlsxError) -> RenderTableError {
    RenderTableError::Sink(format!("xlsx write error: {err}"))
}
