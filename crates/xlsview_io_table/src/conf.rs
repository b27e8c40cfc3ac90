//! Table constants and default preset factories.

use crate::spec::SpecRenderOptions;

/// Content type declared for delimited spreadsheet text.
pub const C_CONTENT_TYPE_DELIMITED: &str = "application/vnd.ms-excel";
/// Content type declared for XLSX workbooks.
pub const C_CONTENT_TYPE_XLSX: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Separator between nested path segments.
pub const C_PATH_SEPARATOR: char = '.';
/// Default field separator.
pub const C_DELIMITER_DEFAULT: char = ',';
/// Default quoting character.
pub const C_ENCLOSURE_DEFAULT: char = '"';
/// Default row terminator (platform newline).
#[cfg(windows)]
pub const C_EOL_DEFAULT: &str = "\r\n";
/// Default row terminator (platform newline).
#[cfg(not(windows))]
pub const C_EOL_DEFAULT: &str = "\n";
/// Default source and target encoding label.
pub const C_ENCODING_DEFAULT: &str = "UTF-8";
/// Default date/time display format.
pub const C_DATE_FORMAT_DEFAULT: &str = "%Y-%m-%d %H:%M:%S";
/// Internal buffer size of the per-row `csv` writer.
pub const N_CSV_ROW_BUFFER: usize = 1024;

/// UTF-8 byte-order mark.
pub const TUP_BOM_UTF8: [u8; 3] = [0xEF, 0xBB, 0xBF];
/// UTF-16 little-endian byte-order mark.
pub const TUP_BOM_UTF16LE: [u8; 2] = [0xFF, 0xFE];
/// UTF-16 big-endian byte-order mark.
pub const TUP_BOM_UTF16BE: [u8; 2] = [0xFE, 0xFF];

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];
/// Sheet name used when none is given.
pub const C_SHEET_NAME_DEFAULT: &str = "Sheet1";

/// Build default render options.
pub fn derive_default_render_options() -> SpecRenderOptions {
    SpecRenderOptions::default()
}
