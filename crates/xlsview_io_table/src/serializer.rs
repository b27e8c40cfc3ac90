//! Table serializer: selects collections, derives columns once and streams
//! header, data and footer rows into a [`TableSink`].

use chrono::format::{Item, StrftimeItems};
use serde_json::Value;
use tracing::{debug, trace};

use crate::options::derive_render_options_from_json;
use crate::sink::{DelimitedSink, SinkGuard, TableSink};
use crate::spec::{
    EnumCellValue, EnumHeaderRule, EnumRecordItem, EnumRenderState, EnumSerializeTarget,
    RenderTableError, Result, SpecRenderOptions, SpecRenderOutput, SpecRenderReport,
    SpecViewVars,
};
use crate::util::{build_row, derive_collection_items, derive_columns, derive_record_from_item};
use crate::writer::XlsxSink;

/// Renders named record collections as one flat table.
#[derive(Debug, Clone, Default)]
pub struct TableSerializer {
    options: SpecRenderOptions,
}

impl TableSerializer {
    /// Create a serializer with typed options.
    pub fn new(options: SpecRenderOptions) -> Self {
        Self { options }
    }

    /// Build a serializer from a JSON option bag.
    pub fn from_json(value: &Value) -> Result<Self> {
        Ok(Self::new(derive_render_options_from_json(value)?))
    }

    /// Options every render uses.
    pub fn options(&self) -> &SpecRenderOptions {
        &self.options
    }

    /// Render into a delimited text sink built from the options.
    pub fn render_delimited(&self, view_vars: &SpecViewVars) -> Result<SpecRenderOutput> {
        let mut sink = DelimitedSink::new(&self.options);
        self.render(view_vars, &mut sink)
    }

    /// Render into a single-sheet XLSX workbook.
    pub fn render_xlsx(&self, view_vars: &SpecViewVars, sheet_name: &str) -> Result<SpecRenderOutput> {
        let mut sink = XlsxSink::new(sheet_name, &self.options)?;
        self.render(view_vars, &mut sink)
    }

    /// Render the selected collections into `sink`.
    ///
    /// All option and source validation happens before the first byte is
    /// written. The sink is released on every exit path.
    pub fn render(
        &self,
        view_vars: &SpecViewVars,
        sink: &mut dyn TableSink,
    ) -> Result<SpecRenderOutput> {
        let mut guard = SinkGuard::new(sink);
        let mut state = EnumRenderState::Init;
        let mut report = SpecRenderReport::default();

        validate_render_options(&self.options)?;
        let l_selected = self.select_collections(view_vars)?;

        let sample = l_selected
            .iter()
            .find_map(|(_, l_items)| l_items.first())
            .map(derive_record_from_item);
        let l_columns = derive_columns(&self.options, sample.as_deref())?;

        report.collections = l_selected.iter().map(|(c_name, _)| c_name.to_string()).collect();
        report.cnt_columns = l_columns.len();
        debug!(
            collections = ?report.collections,
            n_columns = l_columns.len(),
            "render initialized"
        );

        guard.begin(&mut report)?;

        if !matches!(self.options.header, EnumHeaderRule::Disabled) {
            if l_columns.is_empty() {
                report.warn("Header requested but no columns could be derived; header skipped.");
            } else {
                let l_names: Vec<String> =
                    l_columns.iter().map(|column| column.name.clone()).collect();
                guard.write_header(&l_names)?;
                report.cnt_rows_header = 1;
            }
        }
        state = advance_state(state, EnumRenderState::HeaderEmitted);

        for (idx_collection, (c_name, l_items)) in l_selected.iter().enumerate() {
            debug!(collection = %c_name, n_items = l_items.len(), "streaming collection");
            for (idx_row, item) in l_items.iter().enumerate() {
                state = EnumRenderState::Streaming {
                    idx_collection,
                    idx_row,
                };
                trace!(?state, "building row");
                let record = derive_record_from_item(item);
                let row = build_row(&record, &self.options, &l_columns)?;
                guard.write_row(&row)?;
                report.cnt_rows_content += 1;
            }
        }

        if let Some(l_footer) = &self.options.footer {
            let l_cells: Vec<EnumCellValue> =
                l_footer.iter().cloned().map(EnumCellValue::String).collect();
            guard.write_row(&l_cells)?;
            report.cnt_rows_footer = 1;
        }
        state = advance_state(state, EnumRenderState::FooterEmitted);

        let c_content_type = guard.content_type().to_string();
        let v_bytes = guard.finish()?;
        drop(guard);
        advance_state(state, EnumRenderState::Finalized);

        Ok(SpecRenderOutput {
            bytes: v_bytes,
            content_type: c_content_type,
            report,
        })
    }

    fn select_collections<'a>(
        &'a self,
        view_vars: &'a SpecViewVars,
    ) -> Result<Vec<(&'a str, &'a [EnumRecordItem])>> {
        let l_names: Vec<&str> = match &self.options.serialize {
            EnumSerializeTarget::One(c_name) => vec![c_name.as_str()],
            EnumSerializeTarget::Many(l_names) => l_names.iter().map(String::as_str).collect(),
            EnumSerializeTarget::All => view_vars.names().collect(),
        };

        l_names
            .into_iter()
            .map(|c_name| -> Result<(&'a str, &'a [EnumRecordItem])> {
                let var = view_vars
                    .get(c_name)
                    .ok_or_else(|| RenderTableError::UnknownCollection {
                        name: c_name.to_string(),
                    })?;
                Ok((c_name, derive_collection_items(c_name, var)?))
            })
            .collect()
    }
}

fn advance_state(from: EnumRenderState, to: EnumRenderState) -> EnumRenderState {
    debug!(?from, ?to, "render state");
    to
}

/// Reject option combinations that cannot produce a readable table.
pub fn validate_render_options(options: &SpecRenderOptions) -> Result<()> {
    if matches!(options.delimiter, '\r' | '\n') {
        return Err(RenderTableError::InvalidOption(
            "delimiter cannot be a line break".to_string(),
        ));
    }
    if options.enclosure == Some(options.delimiter) {
        return Err(RenderTableError::InvalidOption(format!(
            "delimiter and enclosure are both {:?}",
            options.delimiter
        )));
    }
    if StrftimeItems::new(&options.date_format).any(|item| matches!(item, Item::Error)) {
        return Err(RenderTableError::InvalidOption(format!(
            "invalid date format {:?}",
            options.date_format
        )));
    }
    if let EnumHeaderRule::Columns(l_names) = &options.header
        && l_names.is_empty()
    {
        return Err(RenderTableError::InvalidOption(
            "explicit header has no columns".to_string(),
        ));
    }
    if let (Some(l_rules), EnumHeaderRule::Columns(l_names)) = (&options.extract, &options.header)
        && l_rules.len() != l_names.len()
    {
        return Err(RenderTableError::ColumnMismatch {
            n_header: l_names.len(),
            n_rules: l_rules.len(),
        });
    }
    Ok(())
}
