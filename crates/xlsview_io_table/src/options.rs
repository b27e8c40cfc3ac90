//! Loosely-typed option bag (JSON) to typed render options.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::conf::derive_default_render_options;
use crate::spec::{
    EnumExtractRule, EnumHeaderRule, EnumQuoteRule, EnumSerializeTarget, RenderTableError, Result,
    SpecRenderOptions,
};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EnumRawHeader {
    Flag(bool),
    Names(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EnumRawExtract {
    Path(String),
    Parts(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EnumRawSerialize {
    Flag(bool),
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpecRawRenderOptions {
    header: Option<EnumRawHeader>,
    footer: Option<Vec<String>>,
    extract: Option<Vec<EnumRawExtract>>,
    serialize: Option<EnumRawSerialize>,
    delimiter: Option<String>,
    enclosure: Option<String>,
    quote: Option<String>,
    eol: Option<String>,
    null: Option<String>,
    data_encoding: Option<String>,
    #[serde(alias = "XmlEncoding")]
    target_encoding: Option<String>,
    bom: Option<bool>,
    date_format: Option<String>,
    #[serde(flatten)]
    dict_unknown: BTreeMap<String, Value>,
}

/// Build typed options from a JSON option bag.
///
/// Missing keys keep their defaults; unknown keys are ignored. Extraction
/// entries are `"path"`, `["path"]` or `["path", "%fmt"]`.
pub fn derive_render_options_from_json(value: &Value) -> Result<SpecRenderOptions> {
    let mut options = derive_default_render_options();
    if value.is_null() {
        return Ok(options);
    }

    let raw = SpecRawRenderOptions::deserialize(value)
        .map_err(|err| RenderTableError::InvalidOption(err.to_string()))?;

    for c_key in raw.dict_unknown.keys() {
        debug!(key = %c_key, "ignoring unknown render option");
    }

    if let Some(header) = raw.header {
        options.header = match header {
            EnumRawHeader::Flag(true) => EnumHeaderRule::Derived,
            EnumRawHeader::Flag(false) => EnumHeaderRule::Disabled,
            EnumRawHeader::Names(l_names) => EnumHeaderRule::Columns(l_names),
        };
    }
    options.footer = raw.footer;
    if let Some(l_raw_rules) = raw.extract {
        options.extract = Some(
            l_raw_rules
                .into_iter()
                .map(convert_raw_extract)
                .collect::<Result<Vec<_>>>()?,
        );
    }
    if let Some(serialize) = raw.serialize {
        options.serialize = convert_raw_serialize(serialize)?;
    }
    if let Some(c_delimiter) = raw.delimiter {
        options.delimiter = derive_single_char("delimiter", &c_delimiter)?;
    }
    if let Some(c_enclosure) = raw.enclosure {
        options.enclosure = if c_enclosure.is_empty() {
            None
        } else {
            Some(derive_single_char("enclosure", &c_enclosure)?)
        };
    }
    if let Some(c_quote) = raw.quote {
        options.rule_quote = derive_quote_rule(&c_quote)?;
    }
    if let Some(c_eol) = raw.eol {
        options.eol = c_eol;
    }
    if let Some(c_null) = raw.null {
        options.null_str = c_null;
    }
    if let Some(c_encoding) = raw.data_encoding {
        options.data_encoding = c_encoding;
    }
    if let Some(c_encoding) = raw.target_encoding {
        options.target_encoding = c_encoding;
    }
    if let Some(if_bom) = raw.bom {
        options.if_bom = if_bom;
    }
    if let Some(c_format) = raw.date_format {
        options.date_format = c_format;
    }

    Ok(options)
}

fn convert_raw_extract(raw: EnumRawExtract) -> Result<EnumExtractRule> {
    match raw {
        EnumRawExtract::Path(c_path) => Ok(EnumExtractRule::Path(c_path)),
        EnumRawExtract::Parts(l_parts) => match l_parts.as_slice() {
            [c_path] => Ok(EnumExtractRule::path(c_path.as_str())),
            [c_path, c_format] if c_format.is_empty() => {
                Ok(EnumExtractRule::path(c_path.as_str()))
            }
            [c_path, c_format] => Ok(EnumExtractRule::path_format(
                c_path.as_str(),
                c_format.as_str(),
            )),
            _ => Err(RenderTableError::InvalidOption(format!(
                "extract entry must be [path] or [path, format], got {} parts",
                l_parts.len()
            ))),
        },
    }
}

fn convert_raw_serialize(raw: EnumRawSerialize) -> Result<EnumSerializeTarget> {
    match raw {
        EnumRawSerialize::Flag(true) => Ok(EnumSerializeTarget::All),
        EnumRawSerialize::Flag(false) => Err(RenderTableError::InvalidOption(
            "serialize must name at least one source".to_string(),
        )),
        EnumRawSerialize::One(c_name) => Ok(EnumSerializeTarget::One(c_name)),
        EnumRawSerialize::Many(l_names) => Ok(EnumSerializeTarget::Many(l_names)),
    }
}

fn derive_single_char(key: &str, text: &str) -> Result<char> {
    let mut l_chars = text.chars();
    match (l_chars.next(), l_chars.next()) {
        (Some(chr), None) => Ok(chr),
        _ => Err(RenderTableError::InvalidOption(format!(
            "{key} must be exactly one character, got {text:?}"
        ))),
    }
}

fn derive_quote_rule(text: &str) -> Result<EnumQuoteRule> {
    match text.to_ascii_lowercase().as_str() {
        "necessary" => Ok(EnumQuoteRule::Necessary),
        "whitespace" => Ok(EnumQuoteRule::Whitespace),
        "all" => Ok(EnumQuoteRule::All),
        _ => Err(RenderTableError::InvalidOption(format!(
            "quote must be one of necessary, whitespace, all; got {text:?}"
        ))),
    }
}
