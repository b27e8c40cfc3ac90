//! Stateless helpers for the table pipeline: path lookup, extraction,
//! column derivation, row building and delimited cell formatting.

use std::borrow::Cow;

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::conf::{
    C_PATH_SEPARATOR, N_CSV_ROW_BUFFER, N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL,
};
use crate::printf::format_printf;
use crate::spec::{
    EnumCellValue, EnumExtractRule, EnumHeaderRule, EnumQuoteRule, EnumRecordItem,
    EnumRecordValue, EnumViewVar, RenderTableError, Result, SpecColumn, SpecOutputRow,
    SpecRecord, SpecRenderOptions,
};

////////////////////////////////////////////////////////////////////////////////
// #region PathResolution

/// Resolve a dot-path inside a record.
///
/// Returns `None` as soon as a segment is missing or the current value
/// cannot be descended into. Numeric segments index into lists.
pub fn resolve_path<'a>(record: &'a SpecRecord, path: &str) -> Option<&'a EnumRecordValue> {
    if !path.contains(C_PATH_SEPARATOR) {
        return record.get(path);
    }

    let mut l_segments = path.split(C_PATH_SEPARATOR);
    let mut value = record.get(l_segments.next()?)?;
    for c_segment in l_segments {
        value = match value {
            EnumRecordValue::Map(nested) => nested.get(c_segment)?,
            EnumRecordValue::List(l_values) => l_values.get(c_segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FieldExtraction

/// Compute one cell value from one record.
///
/// A missing path yields an empty string. A present null is kept as null
/// even when a format is configured.
pub fn extract_field(
    rule: &EnumExtractRule,
    record: &SpecRecord,
    date_format: &str,
) -> Result<EnumRecordValue> {
    match rule {
        EnumExtractRule::Function { func, .. } => Ok(func(record)),
        EnumExtractRule::Path(path) => Ok(resolve_path(record, path)
            .cloned()
            .unwrap_or_else(|| EnumRecordValue::String(String::new()))),
        EnumExtractRule::PathFormat { path, format } => match resolve_path(record, path) {
            None => Ok(EnumRecordValue::String(String::new())),
            Some(EnumRecordValue::Null) => Ok(EnumRecordValue::Null),
            Some(value) => Ok(EnumRecordValue::String(format_printf(
                format,
                value,
                date_format,
            )?)),
        },
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnDerivation

/// Derive the ordered column set used for the whole render.
///
/// With extraction rules there is one column per rule; an explicit header
/// must then have the same length. Without rules the columns come from the
/// header names or, failing that, from the sample record keys.
pub fn derive_columns(
    options: &SpecRenderOptions,
    sample: Option<&SpecRecord>,
) -> Result<Vec<SpecColumn>> {
    if let Some(l_rules) = &options.extract {
        return match &options.header {
            EnumHeaderRule::Columns(l_names) => {
                if l_names.len() != l_rules.len() {
                    return Err(RenderTableError::ColumnMismatch {
                        n_header: l_names.len(),
                        n_rules: l_rules.len(),
                    });
                }
                Ok(l_names
                    .iter()
                    .zip(l_rules)
                    .map(|(c_name, rule)| SpecColumn {
                        name: c_name.clone(),
                        key: rule.label().to_string(),
                    })
                    .collect())
            }
            _ => Ok(l_rules
                .iter()
                .map(|rule| SpecColumn {
                    name: rule.label().to_string(),
                    key: rule.label().to_string(),
                })
                .collect()),
        };
    }

    let l_sample_keys: Vec<&str> = sample.map(|record| record.keys().collect()).unwrap_or_default();
    match &options.header {
        EnumHeaderRule::Columns(l_names) => {
            // Positional lookup only when no header name is a sample key.
            let if_by_position = !l_names
                .iter()
                .any(|c_name| l_sample_keys.contains(&c_name.as_str()));
            Ok(l_names
                .iter()
                .enumerate()
                .map(|(idx_col, c_name)| {
                    let c_key = if if_by_position {
                        l_sample_keys.get(idx_col).copied().unwrap_or(c_name.as_str())
                    } else {
                        c_name.as_str()
                    };
                    SpecColumn {
                        name: c_name.clone(),
                        key: c_key.to_string(),
                    }
                })
                .collect())
        }
        _ => Ok(l_sample_keys
            .into_iter()
            .map(|c_key| SpecColumn {
                name: c_key.to_string(),
                key: c_key.to_string(),
            })
            .collect()),
    }
}

/// Borrow a plain record, or snapshot a domain object through `ToRecord`.
pub fn derive_record_from_item(item: &EnumRecordItem) -> Cow<'_, SpecRecord> {
    match item {
        EnumRecordItem::Record(record) => Cow::Borrowed(record),
        EnumRecordItem::Entity(entity) => Cow::Owned(entity.to_record()),
    }
}

/// Items of a selected source; scalars are rejected.
pub fn derive_collection_items<'a>(
    name: &str,
    var: &'a EnumViewVar,
) -> Result<&'a [EnumRecordItem]> {
    match var {
        EnumViewVar::Collection(l_items) => Ok(l_items),
        EnumViewVar::Scalar(_) => Err(RenderTableError::NotIterable {
            name: name.to_string(),
        }),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RowBuilding

/// Build one output row aligned with `columns`.
pub fn build_row(
    record: &SpecRecord,
    options: &SpecRenderOptions,
    columns: &[SpecColumn],
) -> Result<SpecOutputRow> {
    match &options.extract {
        Some(l_rules) => {
            if l_rules.len() != columns.len() {
                return Err(RenderTableError::ColumnMismatch {
                    n_header: columns.len(),
                    n_rules: l_rules.len(),
                });
            }
            l_rules
                .iter()
                .map(|rule| {
                    extract_field(rule, record, &options.date_format).map(|value| {
                        convert_record_value_to_cell(&value, &options.date_format)
                    })
                })
                .collect()
        }
        None => Ok(columns
            .iter()
            .map(|column| match record.get(&column.key) {
                Some(value) => convert_record_value_to_cell(value, &options.date_format),
                None => EnumCellValue::String(String::new()),
            })
            .collect()),
    }
}

/// Normalize a record value into a sink cell. Nested values become JSON text.
pub fn convert_record_value_to_cell(value: &EnumRecordValue, date_format: &str) -> EnumCellValue {
    match value {
        EnumRecordValue::Null => EnumCellValue::None,
        EnumRecordValue::Bool(val) => EnumCellValue::Boolean(*val),
        EnumRecordValue::Integer(val) => EnumCellValue::Integer(*val),
        EnumRecordValue::Float(val) => EnumCellValue::Number(*val),
        EnumRecordValue::String(val) => EnumCellValue::String(val.clone()),
        EnumRecordValue::DateTime(val) => EnumCellValue::DateTime(*val),
        EnumRecordValue::List(_) | EnumRecordValue::Map(_) => {
            EnumCellValue::String(value.to_json(date_format).to_string())
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellFormatting

/// Text layout settings for delimited output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDelimitedFormat {
    pub delimiter: char,
    /// `None` disables quoting.
    pub enclosure: Option<char>,
    pub rule_quote: EnumQuoteRule,
    /// Row terminator.
    pub eol: String,
    /// Text written for null cells.
    pub null_str: String,
    pub date_format: String,
}

impl SpecDelimitedFormat {
    /// Layout part of the render options.
    pub fn from_options(options: &SpecRenderOptions) -> Self {
        Self {
            delimiter: options.delimiter,
            enclosure: options.enclosure,
            rule_quote: options.rule_quote,
            eol: options.eol.clone(),
            null_str: options.null_str.clone(),
            date_format: options.date_format.clone(),
        }
    }
}

/// Unquoted text of one cell.
pub fn format_cell_text<'a>(value: &'a EnumCellValue, fmt: &SpecDelimitedFormat) -> Cow<'a, str> {
    match value {
        EnumCellValue::None => Cow::Owned(fmt.null_str.clone()),
        EnumCellValue::String(val) => Cow::Borrowed(val.as_str()),
        EnumCellValue::Integer(val) => Cow::Owned(val.to_string()),
        EnumCellValue::Number(val) => Cow::Owned(val.to_string()),
        EnumCellValue::Boolean(val) => Cow::Owned(val.to_string()),
        EnumCellValue::DateTime(val) => Cow::Owned(val.format(&fmt.date_format).to_string()),
    }
}

/// Enclose `text` when the quote rule requires it, doubling embedded enclosures.
///
/// `Whitespace` follows fputcsv: spaces, tabs and the `\` escape
/// character also trigger quoting.
pub fn quote_field<'a>(text: &'a str, fmt: &SpecDelimitedFormat) -> Cow<'a, str> {
    let Some(chr_enclosure) = fmt.enclosure else {
        return Cow::Borrowed(text);
    };

    let if_need_quote = match fmt.rule_quote {
        EnumQuoteRule::All => true,
        rule => text.chars().any(|chr| {
            chr == fmt.delimiter
                || chr == chr_enclosure
                || chr == '\r'
                || chr == '\n'
                || (rule == EnumQuoteRule::Whitespace && matches!(chr, ' ' | '\t' | '\\'))
        }),
    };
    if !if_need_quote {
        return Cow::Borrowed(text);
    }

    let mut c_out = String::with_capacity(text.len() + 2);
    c_out.push(chr_enclosure);
    for chr in text.chars() {
        if chr == chr_enclosure {
            c_out.push(chr_enclosure);
        }
        c_out.push(chr);
    }
    c_out.push(chr_enclosure);
    Cow::Owned(c_out)
}

/// Final delimited text of one cell.
pub fn format_cell(value: &EnumCellValue, fmt: &SpecDelimitedFormat) -> String {
    let c_text = format_cell_text(value, fmt);
    quote_field(&c_text, fmt).into_owned()
}

/// Builder for layouts the `csv` crate can express: single-byte delimiter and
/// enclosure, `\n` or `\r\n` terminator, no whitespace rule.
fn derive_csv_builder(fmt: &SpecDelimitedFormat) -> Option<WriterBuilder> {
    if fmt.rule_quote == EnumQuoteRule::Whitespace {
        return None;
    }
    let terminator = match fmt.eol.as_str() {
        "\n" => Terminator::Any(b'\n'),
        "\r\n" => Terminator::CRLF,
        _ => return None,
    };

    let mut builder = WriterBuilder::new();
    builder
        .delimiter(derive_ascii_byte(fmt.delimiter)?)
        .terminator(terminator)
        .flexible(true)
        .buffer_capacity(N_CSV_ROW_BUFFER);
    match fmt.enclosure {
        None => {
            builder.quote_style(QuoteStyle::Never);
        }
        Some(chr_enclosure) => {
            builder
                .quote(derive_ascii_byte(chr_enclosure)?)
                .double_quote(true)
                .quote_style(match fmt.rule_quote {
                    EnumQuoteRule::All => QuoteStyle::Always,
                    _ => QuoteStyle::Necessary,
                });
        }
    }
    Some(builder)
}

fn derive_ascii_byte(chr: char) -> Option<u8> {
    u8::try_from(chr).ok().filter(u8::is_ascii)
}

fn derive_csv_error(err: impl std::fmt::Display) -> RenderTableError {
    RenderTableError::Sink(format!("csv write error: {err}"))
}

/// Accumulates delimited rows.
///
/// Rows go through `csv::Writer` when the layout allows it. Multi-byte
/// delimiters, custom row terminators and the whitespace quote rule use the
/// hand-written quoting in [`quote_field`], which also writes rows with no
/// text so `csv` never adds its `""` empty-record marker.
#[derive(Debug)]
pub struct DelimitedRowWriter {
    fmt: SpecDelimitedFormat,
    csv_builder: Option<WriterBuilder>,
    v_bytes: Vec<u8>,
    n_rows: usize,
}

impl DelimitedRowWriter {
    /// Create an empty writer for `fmt`.
    pub fn new(fmt: SpecDelimitedFormat) -> Self {
        Self {
            csv_builder: derive_csv_builder(&fmt),
            fmt,
            v_bytes: Vec::new(),
            n_rows: 0,
        }
    }

    /// `true` when rows are written through the `csv` crate.
    pub fn is_csv_backed(&self) -> bool {
        self.csv_builder.is_some()
    }

    /// Number of rows written.
    pub fn rows_written(&self) -> usize {
        self.n_rows
    }

    /// Append one row followed by the row terminator.
    pub fn write_row(&mut self, cells: &[EnumCellValue]) -> Result<()> {
        let l_texts: Vec<Cow<'_, str>> = cells
            .iter()
            .map(|cell| format_cell_text(cell, &self.fmt))
            .collect();
        let if_blank = l_texts.len() <= 1 && l_texts.iter().all(|c_text| c_text.is_empty());

        match &self.csv_builder {
            Some(builder) if !if_blank => {
                let mut writer = builder.from_writer(&mut self.v_bytes);
                writer
                    .write_record(l_texts.iter().map(|c_text| c_text.as_bytes()))
                    .map_err(derive_csv_error)?;
                writer.flush().map_err(derive_csv_error)?;
            }
            _ => {
                for (idx_col, c_text) in l_texts.iter().enumerate() {
                    if idx_col > 0 {
                        let mut v_utf8 = [0u8; 4];
                        let c_delimiter = self.fmt.delimiter.encode_utf8(&mut v_utf8);
                        self.v_bytes.extend_from_slice(c_delimiter.as_bytes());
                    }
                    self.v_bytes
                        .extend_from_slice(quote_field(c_text, &self.fmt).as_bytes());
                }
                self.v_bytes.extend_from_slice(self.fmt.eol.as_bytes());
            }
        }
        self.n_rows += 1;
        Ok(())
    }

    /// Consume the writer and return the accumulated text.
    pub fn into_text(self) -> Result<String> {
        String::from_utf8(self.v_bytes).map_err(derive_csv_error)
    }
}

/// Join cells with the delimiter and terminate with the row terminator.
pub fn format_row(cells: &[EnumCellValue], fmt: &SpecDelimitedFormat) -> Result<String> {
    let mut writer = DelimitedRowWriter::new(fmt.clone());
    writer.write_row(cells)?;
    writer.into_text()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    fn derive_fmt() -> SpecDelimitedFormat {
        SpecDelimitedFormat::from_options(&SpecRenderOptions {
            eol: "\n".to_string(),
            ..SpecRenderOptions::default()
        })
    }

    fn derive_text_cell(c_text: &str) -> EnumCellValue {
        EnumCellValue::String(c_text.to_string())
    }

    fn derive_user_record() -> SpecRecord {
        SpecRecord::from_json(json!({
            "User": {"id": 1, "username": "jose"},
            "Item": {"type": "beach"},
            "tags": [{"name": "first"}, {"name": "second"}],
        }))
    }

    #[test]
    fn test_resolve_path_walks_maps_and_lists() {
        let record = derive_user_record();

        assert_eq!(
            resolve_path(&record, "User.username"),
            Some(&EnumRecordValue::from("jose"))
        );
        assert_eq!(
            resolve_path(&record, "tags.1.name"),
            Some(&EnumRecordValue::from("second"))
        );
        assert_eq!(resolve_path(&record, "Item.name"), None);
        assert_eq!(resolve_path(&record, "User.id.deeper"), None);
        assert_eq!(resolve_path(&record, "tags.9.name"), None);
        assert_eq!(resolve_path(&record, "missing"), None);
    }

    #[test]
    fn test_extract_field_missing_and_formatted() {
        let record = derive_user_record();

        let value = extract_field(&EnumExtractRule::path("Item.name"), &record, "%Y").unwrap();
        assert_eq!(value, EnumRecordValue::from(""));

        let rule = EnumExtractRule::path_format("User.id", "%03d");
        assert_eq!(
            extract_field(&rule, &record, "%Y").unwrap(),
            EnumRecordValue::from("001")
        );

        let rule = EnumExtractRule::path_format("User.username", "%d");
        assert!(matches!(
            extract_field(&rule, &record, "%Y"),
            Err(RenderTableError::Format { .. })
        ));
    }

    #[test]
    fn test_extract_field_keeps_null_under_format() {
        let record = SpecRecord::new().with("a", EnumRecordValue::Null);
        let rule = EnumExtractRule::path_format("a", "%d");
        assert_eq!(extract_field(&rule, &record, "%Y").unwrap(), EnumRecordValue::Null);
    }

    #[test]
    fn test_extract_field_function_sees_whole_record() {
        let record = SpecRecord::from_json(json!({"item": {"name": "beach"}}));
        let rule = EnumExtractRule::function("label", |record: &SpecRecord| {
            match resolve_path(record, "item.name") {
                Some(EnumRecordValue::String(c_name)) => format!("my-{c_name}").into(),
                _ => EnumRecordValue::Null,
            }
        });
        assert_eq!(
            extract_field(&rule, &record, "%Y").unwrap(),
            EnumRecordValue::from("my-beach")
        );
    }

    #[test]
    fn test_derive_columns_from_rules_and_header() {
        let mut options = SpecRenderOptions {
            extract: Some(vec![
                EnumExtractRule::path("a.b"),
                EnumExtractRule::function("calc", |_| EnumRecordValue::Null),
            ]),
            ..SpecRenderOptions::default()
        };
        let l_names: Vec<String> = derive_columns(&options, None)
            .unwrap()
            .into_iter()
            .map(|column| column.name)
            .collect();
        assert_eq!(l_names, vec!["a.b", "calc"]);

        options.header = EnumHeaderRule::Columns(vec!["B".to_string(), "Calc".to_string()]);
        let l_columns = derive_columns(&options, None).unwrap();
        assert_eq!(l_columns[0].name, "B");
        assert_eq!(l_columns[0].key, "a.b");

        options.header = EnumHeaderRule::Columns(vec!["only".to_string()]);
        assert!(matches!(
            derive_columns(&options, None),
            Err(RenderTableError::ColumnMismatch { n_header: 1, n_rules: 2 })
        ));
    }

    #[test]
    fn test_derive_columns_raw_mode_maps_header_to_sample_keys() {
        let sample = SpecRecord::from_values(["a", "b", "c"]);
        let options = SpecRenderOptions {
            header: EnumHeaderRule::Columns(vec!["x".into(), "y".into(), "z".into()]),
            ..SpecRenderOptions::default()
        };
        let l_keys: Vec<String> = derive_columns(&options, Some(&sample))
            .unwrap()
            .into_iter()
            .map(|column| column.key)
            .collect();
        assert_eq!(l_keys, vec!["0", "1", "2"]);

        let sample = SpecRecord::new().with("id", 1).with("name", "n");
        let options = SpecRenderOptions {
            header: EnumHeaderRule::Columns(vec!["name".into(), "id".into()]),
            ..SpecRenderOptions::default()
        };
        let l_keys: Vec<String> = derive_columns(&options, Some(&sample))
            .unwrap()
            .into_iter()
            .map(|column| column.key)
            .collect();
        assert_eq!(l_keys, vec!["name", "id"]);

        assert!(derive_columns(&SpecRenderOptions::default(), None).unwrap().is_empty());
    }

    #[test]
    fn test_derive_columns_partial_header_match_uses_names_only() {
        let sample = SpecRecord::new().with("id", 1).with("name", "n");
        let options = SpecRenderOptions {
            header: EnumHeaderRule::Columns(vec!["name".into(), "x".into()]),
            ..SpecRenderOptions::default()
        };
        let l_columns = derive_columns(&options, Some(&sample)).unwrap();
        let l_keys: Vec<&str> = l_columns.iter().map(|column| column.key.as_str()).collect();
        assert_eq!(l_keys, vec!["name", "x"]);

        let row = build_row(&sample, &options, &l_columns).unwrap();
        assert_eq!(row, vec![derive_text_cell("n"), derive_text_cell("")]);
    }

    #[test]
    fn test_build_row_fills_missing_raw_keys() {
        let sample = SpecRecord::new().with("a", 1).with("b", 2);
        let options = SpecRenderOptions::default();
        let l_columns = derive_columns(&options, Some(&sample)).unwrap();

        let record = SpecRecord::new().with("b", true);
        let row = build_row(&record, &options, &l_columns).unwrap();
        assert_eq!(
            row,
            vec![EnumCellValue::String(String::new()), EnumCellValue::Boolean(true)]
        );
    }

    #[test]
    fn test_convert_nested_value_to_json_text() {
        let value = EnumRecordValue::from_json(json!({"k": [1, "two"]}));
        assert_eq!(
            convert_record_value_to_cell(&value, "%Y"),
            EnumCellValue::String(r#"{"k":[1,"two"]}"#.to_string())
        );
    }

    #[test]
    fn test_quote_field_rules() {
        let mut fmt = derive_fmt();
        assert_eq!(quote_field("plain", &fmt), "plain");
        assert_eq!(quote_field("a,b", &fmt), "\"a,b\"");
        assert_eq!(quote_field("Containing\"char", &fmt), "\"Containing\"\"char\"");
        assert_eq!(quote_field("line\nbreak", &fmt), "\"line\nbreak\"");
        assert_eq!(quote_field("fake apple", &fmt), "fake apple");

        fmt.rule_quote = EnumQuoteRule::Whitespace;
        assert_eq!(quote_field("fake apple", &fmt), "\"fake apple\"");
        fmt.enclosure = Some('\'');
        assert_eq!(quote_field("a b c", &fmt), "'a b c'");

        fmt.rule_quote = EnumQuoteRule::All;
        assert_eq!(quote_field("x", &fmt), "'x'");

        fmt.enclosure = None;
        assert_eq!(quote_field("a,b \"c\"", &fmt), "a,b \"c\"");
    }

    #[test]
    fn test_format_row_with_null_token_and_dates() {
        let mut fmt = derive_fmt();
        fmt.null_str = "NULL".to_string();
        fmt.eol = "~".to_string();
        fmt.date_format = "%d/%m/%Y".to_string();

        let dt = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let row = vec![
            EnumCellValue::Integer(1),
            EnumCellValue::None,
            EnumCellValue::Number(2.5),
            EnumCellValue::DateTime(dt),
        ];
        assert_eq!(format_row(&row, &fmt).unwrap(), "1,NULL,2.5,29/02/2024~");
    }

    #[test]
    fn test_quote_field_whitespace_rule_quotes_backslash() {
        let mut fmt = derive_fmt();
        fmt.rule_quote = EnumQuoteRule::Whitespace;
        assert_eq!(quote_field("a\\b", &fmt), "\"a\\b\"");
        assert_eq!(quote_field("a\tb", &fmt), "\"a\tb\"");
        assert_eq!(quote_field("ab", &fmt), "ab");

        let row = vec![derive_text_cell("C:\\tmp"), derive_text_cell("x")];
        assert_eq!(format_row(&row, &fmt).unwrap(), "\"C:\\tmp\",x\n");
    }

    #[test]
    fn test_row_writer_uses_csv_for_single_byte_layouts() {
        let fmt = derive_fmt();
        assert!(DelimitedRowWriter::new(fmt.clone()).is_csv_backed());

        let mut fmt_crlf = fmt.clone();
        fmt_crlf.eol = "\r\n".to_string();
        assert!(DelimitedRowWriter::new(fmt_crlf).is_csv_backed());

        let mut fmt_tilde = fmt.clone();
        fmt_tilde.eol = "~".to_string();
        assert!(!DelimitedRowWriter::new(fmt_tilde).is_csv_backed());

        let mut fmt_arrow = fmt.clone();
        fmt_arrow.delimiter = '→';
        assert!(!DelimitedRowWriter::new(fmt_arrow).is_csv_backed());

        let mut fmt_space = fmt;
        fmt_space.rule_quote = EnumQuoteRule::Whitespace;
        assert!(!DelimitedRowWriter::new(fmt_space).is_csv_backed());
    }

    #[test]
    fn test_row_writer_csv_matches_hand_quoting() {
        let l_rows = vec![
            vec![derive_text_cell("plain"), EnumCellValue::Integer(7)],
            vec![derive_text_cell("a,b"), derive_text_cell("say \"hi\"")],
            vec![derive_text_cell("line\nbreak"), EnumCellValue::None],
            vec![derive_text_cell("fake apple"), EnumCellValue::Boolean(false)],
        ];
        for (rule_quote, enclosure) in [
            (EnumQuoteRule::Necessary, Some('"')),
            (EnumQuoteRule::All, Some('\'')),
            (EnumQuoteRule::Necessary, None),
        ] {
            let fmt = SpecDelimitedFormat {
                rule_quote,
                enclosure,
                ..derive_fmt()
            };
            let mut writer = DelimitedRowWriter::new(fmt.clone());
            assert!(writer.is_csv_backed());
            let mut c_expected = String::new();
            for row in &l_rows {
                writer.write_row(row).unwrap();
                let l_cells: Vec<String> =
                    row.iter().map(|cell| format_cell(cell, &fmt)).collect();
                c_expected.push_str(&l_cells.join(","));
                c_expected.push('\n');
            }
            assert_eq!(writer.rows_written(), l_rows.len());
            assert_eq!(writer.into_text().unwrap(), c_expected);
        }
    }

    #[test]
    fn test_row_writer_blank_rows_are_bare_terminators() {
        let mut writer = DelimitedRowWriter::new(derive_fmt());
        writer.write_row(&[]).unwrap();
        writer.write_row(&[derive_text_cell("")]).unwrap();
        writer
            .write_row(&[derive_text_cell(""), derive_text_cell("")])
            .unwrap();
        assert_eq!(writer.into_text().unwrap(), "\n\n,\n");
    }

    #[test]
    fn test_row_writer_multibyte_delimiter_falls_back() {
        let fmt = SpecDelimitedFormat {
            delimiter: '→',
            ..derive_fmt()
        };
        let row = vec![derive_text_cell("a→b"), EnumCellValue::Integer(2)];
        assert_eq!(format_row(&row, &fmt).unwrap(), "\"a→b\"→2\n");
    }

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("a/b:c", "_"), "a_b_c");
        assert_eq!(sanitize_sheet_name("   ", "_"), "Sheet");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40), "_").len(), 31);
    }
}
