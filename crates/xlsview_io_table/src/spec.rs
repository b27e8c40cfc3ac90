//! Shared table models: records, rules, options, report and errors.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use thiserror::Error;

use crate::conf::{
    C_DATE_FORMAT_DEFAULT, C_DELIMITER_DEFAULT, C_ENCLOSURE_DEFAULT, C_ENCODING_DEFAULT,
    C_EOL_DEFAULT,
};

////////////////////////////////////////////////////////////////////////////////
// #region RecordModel

/// Scalar or nested value held by a record field.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumRecordValue {
    /// Explicit null.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    String(String),
    /// Date/time value, rendered through the configured display format.
    DateTime(NaiveDateTime),
    /// Ordered list of values.
    List(Vec<EnumRecordValue>),
    /// Nested mapping.
    Map(SpecRecord),
}

impl EnumRecordValue {
    /// Convert a JSON document into a record value, keeping object key order.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(val) => Self::Bool(val),
            Value::Number(num) => {
                if let Some(val) = num.as_i64() {
                    Self::Integer(val)
                } else if num.is_u64() {
                    // Beyond i64: keep every digit as text.
                    Self::String(num.to_string())
                } else {
                    Self::Float(num.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(val) => Self::String(val),
            Value::Array(l_values) => {
                Self::List(l_values.into_iter().map(Self::from_json).collect())
            }
            Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(key, val)| (key, Self::from_json(val)))
                    .collect(),
            ),
        }
    }

    /// Convert back to JSON; date/times become text using `date_format`.
    pub fn to_json(&self, date_format: &str) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(val) => Value::Bool(*val),
            Self::Integer(val) => Value::from(*val),
            Self::Float(val) => Value::from(*val),
            Self::String(val) => Value::String(val.clone()),
            Self::DateTime(val) => Value::String(val.format(date_format).to_string()),
            Self::List(l_values) => Value::Array(
                l_values
                    .iter()
                    .map(|val| val.to_json(date_format))
                    .collect(),
            ),
            Self::Map(record) => Value::Object(
                record
                    .iter()
                    .map(|(key, val)| (key.to_string(), val.to_json(date_format)))
                    .collect(),
            ),
        }
    }

    /// `true` for [`EnumRecordValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for EnumRecordValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for EnumRecordValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for EnumRecordValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for EnumRecordValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<i64> for EnumRecordValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for EnumRecordValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for EnumRecordValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<NaiveDateTime> for EnumRecordValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<NaiveDate> for EnumRecordValue {
    fn from(value: NaiveDate) -> Self {
        Self::DateTime(value.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<SpecRecord> for EnumRecordValue {
    fn from(value: SpecRecord) -> Self {
        Self::Map(value)
    }
}

impl From<Vec<EnumRecordValue>> for EnumRecordValue {
    fn from(value: Vec<EnumRecordValue>) -> Self {
        Self::List(value)
    }
}

impl From<Value> for EnumRecordValue {
    fn from(value: Value) -> Self {
        Self::from_json(value)
    }
}

impl<T: Into<EnumRecordValue>> From<Option<T>> for EnumRecordValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Ordered mapping from field name to value.
///
/// Insertion order is preserved; inserting an existing key replaces the
/// value in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecRecord {
    l_fields: Vec<(String, EnumRecordValue)>,
}

impl SpecRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list-shaped record keyed by position (`"0"`, `"1"`, ...).
    pub fn from_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<EnumRecordValue>,
    {
        values
            .into_iter()
            .enumerate()
            .map(|(n_idx, val)| (n_idx.to_string(), val.into()))
            .collect()
    }

    /// Convert one JSON collection item into a record.
    ///
    /// Objects keep their keys, arrays are keyed by position and bare scalars
    /// become a single field keyed `"0"`.
    pub fn from_json(value: Value) -> Self {
        match EnumRecordValue::from_json(value) {
            EnumRecordValue::Map(record) => record,
            EnumRecordValue::List(l_values) => Self::from_values(l_values),
            other => Self::from_values([other]),
        }
    }

    /// Insert or replace one field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<EnumRecordValue>) {
        let c_key = key.into();
        let value = value.into();
        match self.l_fields.iter_mut().find(|(c_name, _)| *c_name == c_key) {
            Some((_, slot)) => *slot = value,
            None => self.l_fields.push((c_key, value)),
        }
    }

    /// Builder-style [`Self::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<EnumRecordValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Direct key lookup.
    pub fn get(&self, key: &str) -> Option<&EnumRecordValue> {
        self.l_fields
            .iter()
            .find(|(c_name, _)| c_name == key)
            .map(|(_, val)| val)
    }

    /// `true` when the record has a field named `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.l_fields.iter().map(|(c_name, _)| c_name.as_str())
    }

    /// Fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnumRecordValue)> {
        self.l_fields.iter().map(|(c_name, val)| (c_name.as_str(), val))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.l_fields.len()
    }

    /// `true` when the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.l_fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<EnumRecordValue>> FromIterator<(K, V)> for SpecRecord {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = SpecRecord::new();
        for (key, val) in iter {
            record.insert(key, val);
        }
        record
    }
}

/// Capability of domain objects that can present themselves as a record.
pub trait ToRecord {
    /// Snapshot the object as an ordered record.
    fn to_record(&self) -> SpecRecord;
}

/// One item of a record collection.
pub enum EnumRecordItem {
    /// Plain (possibly nested) record.
    Record(SpecRecord),
    /// Domain object converted through [`ToRecord`] before extraction.
    Entity(Box<dyn ToRecord>),
}

impl EnumRecordItem {
    /// Wrap a domain object.
    pub fn entity<T: ToRecord + 'static>(value: T) -> Self {
        Self::Entity(Box::new(value))
    }

    /// Wrap a JSON document as a plain record item.
    pub fn from_json(value: Value) -> Self {
        Self::Record(SpecRecord::from_json(value))
    }
}

impl From<SpecRecord> for EnumRecordItem {
    fn from(value: SpecRecord) -> Self {
        Self::Record(value)
    }
}

impl fmt::Debug for EnumRecordItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record(record) => f.debug_tuple("Record").field(record).finish(),
            Self::Entity(entity) => f.debug_tuple("Entity").field(&entity.to_record()).finish(),
        }
    }
}

/// A named source handed to the serializer.
#[derive(Debug)]
pub enum EnumViewVar {
    /// Iterable record collection.
    Collection(Vec<EnumRecordItem>),
    /// Non-iterable value; selecting it for rendering is an error.
    Scalar(EnumRecordValue),
}

impl EnumViewVar {
    /// Convert JSON: arrays and objects are collections (object values are
    /// iterated in key order), everything else is a scalar.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Array(l_items) => Self::Collection(
                l_items.into_iter().map(EnumRecordItem::from_json).collect(),
            ),
            Value::Object(map) => Self::Collection(
                map.into_iter()
                    .map(|(_, val)| EnumRecordItem::from_json(val))
                    .collect(),
            ),
            other => Self::Scalar(EnumRecordValue::from_json(other)),
        }
    }
}

impl From<Vec<SpecRecord>> for EnumViewVar {
    fn from(value: Vec<SpecRecord>) -> Self {
        Self::Collection(value.into_iter().map(EnumRecordItem::Record).collect())
    }
}

impl From<Vec<EnumRecordItem>> for EnumViewVar {
    fn from(value: Vec<EnumRecordItem>) -> Self {
        Self::Collection(value)
    }
}

/// Ordered registry of named sources available to one render.
#[derive(Debug, Default)]
pub struct SpecViewVars {
    l_vars: Vec<(String, EnumViewVar)>,
}

impl SpecViewVars {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a named source.
    pub fn set(&mut self, name: impl Into<String>, var: impl Into<EnumViewVar>) -> &mut Self {
        let c_name = name.into();
        let var = var.into();
        match self.l_vars.iter_mut().find(|(c_key, _)| *c_key == c_name) {
            Some((_, slot)) => *slot = var,
            None => self.l_vars.push((c_name, var)),
        }
        self
    }

    /// Builder-style [`Self::set`].
    pub fn with(mut self, name: impl Into<String>, var: impl Into<EnumViewVar>) -> Self {
        self.set(name, var);
        self
    }

    /// Look up a source by name.
    pub fn get(&self, name: &str) -> Option<&EnumViewVar> {
        self.l_vars
            .iter()
            .find(|(c_key, _)| c_key == name)
            .map(|(_, var)| var)
    }

    /// Source names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.l_vars.iter().map(|(c_key, _)| c_key.as_str())
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.l_vars.len()
    }

    /// `true` when no source is registered.
    pub fn is_empty(&self) -> bool {
        self.l_vars.is_empty()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExtractionRules

/// Caller-supplied cell function.
pub type FnExtract = Arc<dyn Fn(&SpecRecord) -> EnumRecordValue + Send + Sync>;

/// How to obtain one cell from one record.
#[derive(Clone)]
pub enum EnumExtractRule {
    /// Dot-path lookup.
    Path(String),
    /// Dot-path lookup followed by printf-style formatting.
    PathFormat {
        /// Dot-path into the record.
        path: String,
        /// printf-style format applied to the resolved value.
        format: String,
    },
    /// Custom function of the whole record.
    Function {
        /// Column name used when the header is derived.
        label: String,
        /// Function returning the cell value.
        func: FnExtract,
    },
}

impl EnumExtractRule {
    /// Plain dot-path lookup.
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    /// Dot-path lookup rendered through a printf-style format.
    pub fn path_format(path: impl Into<String>, format: impl Into<String>) -> Self {
        Self::PathFormat {
            path: path.into(),
            format: format.into(),
        }
    }

    /// Callable computing the value from the whole record.
    pub fn function<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&SpecRecord) -> EnumRecordValue + Send + Sync + 'static,
    {
        Self::Function {
            label: label.into(),
            func: Arc::new(func),
        }
    }

    /// Name of the column produced by this rule.
    pub fn label(&self) -> &str {
        match self {
            Self::Path(path) => path,
            Self::PathFormat { path, .. } => path,
            Self::Function { label, .. } => label,
        }
    }
}

impl fmt::Debug for EnumExtractRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::PathFormat { path, format } => f
                .debug_struct("PathFormat")
                .field("path", path)
                .field("format", format)
                .finish(),
            Self::Function { label, .. } => f
                .debug_struct("Function")
                .field("label", label)
                .finish_non_exhaustive(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RenderOptions

/// Which named sources to render.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EnumSerializeTarget {
    /// A single named source.
    One(String),
    /// Named sources, rendered in the listed order.
    Many(Vec<String>),
    /// Every registered source, in registration order.
    #[default]
    All,
}

/// Header row policy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EnumHeaderRule {
    /// No header row.
    #[default]
    Disabled,
    /// Header row with explicit column names.
    Columns(Vec<String>),
    /// Header row with the derived column names (record keys or rule labels).
    Derived,
}

/// Field quoting policy, applied only when an enclosure is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumQuoteRule {
    /// Quote fields containing the delimiter, the enclosure, CR or LF.
    #[default]
    Necessary,
    /// Also quote fields containing spaces or tabs.
    Whitespace,
    /// Quote every field.
    All,
}

/// Immutable per-render configuration.
#[derive(Debug, Clone)]
pub struct SpecRenderOptions {
    /// Header row policy.
    pub header: EnumHeaderRule,
    /// Trailing row appended after all data rows.
    pub footer: Option<Vec<String>>,
    /// Ordered extraction rules; `None` renders raw record fields.
    pub extract: Option<Vec<EnumExtractRule>>,
    /// Sources to render.
    pub serialize: EnumSerializeTarget,
    /// Field separator.
    pub delimiter: char,
    /// Quoting character; `None` disables quoting.
    pub enclosure: Option<char>,
    /// Quoting trigger policy.
    pub rule_quote: EnumQuoteRule,
    /// Row terminator.
    pub eol: String,
    /// Replacement text for null values.
    pub null_str: String,
    /// Encoding of the record text.
    pub data_encoding: String,
    /// Encoding of the output bytes.
    pub target_encoding: String,
    /// Prefix a byte-order mark for the target encoding.
    pub if_bom: bool,
    /// `chrono` strftime pattern for date/time cells.
    pub date_format: String,
}

impl Default for SpecRenderOptions {
    fn default() -> Self {
        Self {
            header: EnumHeaderRule::Disabled,
            footer: None,
            extract: None,
            serialize: EnumSerializeTarget::All,
            delimiter: C_DELIMITER_DEFAULT,
            enclosure: Some(C_ENCLOSURE_DEFAULT),
            rule_quote: EnumQuoteRule::Necessary,
            eol: C_EOL_DEFAULT.to_string(),
            null_str: String::new(),
            data_encoding: C_ENCODING_DEFAULT.to_string(),
            target_encoding: C_ENCODING_DEFAULT.to_string(),
            if_bom: false,
            date_format: C_DATE_FORMAT_DEFAULT.to_string(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TableModel

/// One output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecColumn {
    /// Display name used in a header row.
    pub name: String,
    /// Record key used for raw (non-extracted) lookup.
    pub key: String,
}

/// Normalized cell value handed to a table sink.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Null; rendered as the configured null token.
    None,
    /// Text value. Missing fields are an empty string.
    String(String),
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
    /// Date/time value.
    DateTime(NaiveDateTime),
}

/// One output row aligned with the column set.
pub type SpecOutputRow = Vec<EnumCellValue>;

/// Render progress, in order of occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumRenderState {
    /// Options validated, columns not yet emitted.
    Init,
    /// Header row emitted (or skipped when disabled).
    HeaderEmitted,
    /// Writing row `idx_row` of collection `idx_collection`.
    Streaming {
        /// Zero-based collection position.
        idx_collection: usize,
        /// Zero-based row position inside the collection.
        idx_row: usize,
    },
    /// Footer row emitted (or skipped when not configured).
    FooterEmitted,
    /// Sink finished and released.
    Finalized,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Per-render report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecRenderReport {
    /// Rendered source names, in order.
    pub collections: Vec<String>,
    /// Number of columns in the derived column set.
    pub cnt_columns: usize,
    /// Number of header rows written (0 or 1).
    pub cnt_rows_header: usize,
    /// Number of data rows written.
    pub cnt_rows_content: usize,
    /// Number of footer rows written (0 or 1).
    pub cnt_rows_footer: usize,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecRenderReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

/// Finalized render result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRenderOutput {
    /// Output bytes.
    pub bytes: Vec<u8>,
    /// Declared content type of `bytes`.
    pub content_type: String,
    /// Render report.
    pub report: SpecRenderReport,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Render failures. Missing fields are never errors.
#[derive(Debug, Error)]
pub enum RenderTableError {
    /// A selected source is a scalar, not a collection.
    #[error("'{name}' is not an array or iterable collection")]
    NotIterable {
        /// Source name.
        name: String,
    },
    /// A selected source name is not registered.
    #[error("unknown source '{name}'")]
    UnknownCollection {
        /// Source name.
        name: String,
    },
    /// printf-style formatting failed for a value/format pair.
    #[error("format error in {format:?}: {reason}")]
    Format {
        /// Offending format string.
        format: String,
        /// Failure detail.
        reason: String,
    },
    /// Encoding label cannot be used.
    #[error("unsupported encoding {label:?}: {reason}")]
    UnsupportedEncoding {
        /// Encoding label as configured.
        label: String,
        /// Failure detail.
        reason: String,
    },
    /// Text contains a character the target encoding cannot represent.
    #[error("character {ch:?} cannot be represented in {encoding}")]
    Unmappable {
        /// Canonical target encoding name.
        encoding: String,
        /// First unmappable character.
        ch: char,
    },
    /// Explicit header length differs from the extraction rule count.
    #[error("header has {n_header} columns but extract defines {n_rules} rules")]
    ColumnMismatch {
        /// Header column count.
        n_header: usize,
        /// Extraction rule count.
        n_rules: usize,
    },
    /// Option value is invalid.
    #[error("invalid option: {0}")]
    InvalidOption(String),
    /// Sink failed to accept rows or produce bytes.
    #[error("sink error: {0}")]
    Sink(String),
    /// Sink container limit exceeded.
    #[error("sink limit exceeded: {0}")]
    SinkLimit(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, RenderTableError>;

// #endregion
////////////////////////////////////////////////////////////////////////////////
