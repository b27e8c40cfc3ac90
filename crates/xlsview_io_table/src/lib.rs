//! `xlsview_io_table` v1:
//! Record collections to spreadsheet-ready tables.
//!
//! Module map:
//! - `conf`       : constants and default presets
//! - `spec`       : records, rules, options, report and errors
//! - `util`       : pure helpers (paths, extraction, columns, rows, cells)
//! - `printf`     : single-value printf-style formatting
//! - `encoder`    : charset conversion and byte-order marks
//! - `options`    : JSON option bag to typed options
//! - `sink`       : `TableSink` seam and delimited text sink
//! - `writer`     : XLSX sink
//! - `serializer` : render state machine
pub mod conf;
pub mod encoder;
pub mod options;
pub mod printf;
pub mod serializer;
pub mod sink;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    C_CONTENT_TYPE_DELIMITED, C_CONTENT_TYPE_XLSX, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX,
    N_NROWS_EXCEL_MAX, derive_default_render_options,
};
pub use encoder::{EnumTextEncoding, encode_text, resolve_text_encoding};
pub use options::derive_render_options_from_json;
pub use printf::format_printf;
pub use serializer::{TableSerializer, validate_render_options};
pub use sink::{DelimitedSink, SinkGuard, TableSink};
pub use spec::{
    EnumCellValue, EnumExtractRule, EnumHeaderRule, EnumQuoteRule, EnumRecordItem,
    EnumRecordValue, EnumRenderState, EnumSerializeTarget, EnumViewVar, FnExtract,
    RenderTableError, Result, SpecColumn, SpecOutputRow, SpecRecord, SpecRenderOptions,
    SpecRenderOutput, SpecRenderReport, SpecViewVars, ToRecord,
};
pub use util::{
    DelimitedRowWriter, SpecDelimitedFormat, build_row, derive_columns, extract_field, format_cell,
    format_row, quote_field, resolve_path, sanitize_sheet_name,
};
pub use writer::XlsxSink;
