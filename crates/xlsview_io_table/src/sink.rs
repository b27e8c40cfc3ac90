//! Output sinks: the `TableSink` seam, delimited text output and the
//! scoped guard that releases a sink on every exit path.

use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::conf::C_CONTENT_TYPE_DELIMITED;
use crate::encoder::{encode_text, resolve_text_encoding, validate_data_encoding};
use crate::spec::{EnumCellValue, RenderTableError, Result, SpecRenderOptions, SpecRenderReport};
use crate::util::{DelimitedRowWriter, SpecDelimitedFormat};

/// Destination of a rendered table.
///
/// A sink is borrowed by exactly one render. `finish` returns the output
/// bytes; `release` drops buffered state and must be idempotent.
pub trait TableSink {
    /// Declared content type of the produced bytes.
    fn content_type(&self) -> &str;

    /// Validate sink settings before the first row.
    fn begin(&mut self, report: &mut SpecRenderReport) -> Result<()> {
        let _ = report;
        Ok(())
    }

    /// Write the header row.
    fn write_header(&mut self, names: &[String]) -> Result<()> {
        let l_cells: Vec<EnumCellValue> =
            names.iter().cloned().map(EnumCellValue::String).collect();
        self.write_row(&l_cells)
    }

    /// Write one data or footer row.
    fn write_row(&mut self, cells: &[EnumCellValue]) -> Result<()>;

    /// Produce the output bytes.
    fn finish(&mut self) -> Result<Vec<u8>>;

    /// Drop buffered state.
    fn release(&mut self);
}

/// Delimited text sink; encodes the whole buffer once in `finish`.
#[derive(Debug)]
pub struct DelimitedSink {
    writer: Option<DelimitedRowWriter>,
    n_rows: usize,
    data_encoding: String,
    target_encoding: String,
    if_bom: bool,
    if_released: bool,
}

impl DelimitedSink {
    /// Create a sink for the layout and encodings in `options`.
    pub fn new(options: &SpecRenderOptions) -> Self {
        Self {
            writer: Some(DelimitedRowWriter::new(SpecDelimitedFormat::from_options(
                options,
            ))),
            n_rows: 0,
            data_encoding: options.data_encoding.clone(),
            target_encoding: options.target_encoding.clone(),
            if_bom: options.if_bom,
            if_released: false,
        }
    }

    /// Number of rows written so far, header and footer included.
    pub fn rows_written(&self) -> usize {
        self.n_rows
    }

    fn validate_open(&self) -> Result<()> {
        if self.if_released {
            return Err(RenderTableError::Sink(
                "Cannot write after release().".to_string(),
            ));
        }
        Ok(())
    }

    fn derive_open_writer(&mut self) -> Result<&mut DelimitedRowWriter> {
        self.validate_open()?;
        self.writer
            .as_mut()
            .ok_or_else(|| RenderTableError::Sink("Cannot write after finish().".to_string()))
    }
}

impl TableSink for DelimitedSink {
    fn content_type(&self) -> &str {
        C_CONTENT_TYPE_DELIMITED
    }

    fn begin(&mut self, report: &mut SpecRenderReport) -> Result<()> {
        self.validate_open()?;
        validate_data_encoding(&self.data_encoding)?;
        let encoding = resolve_text_encoding(&self.target_encoding)?;
        if self.if_bom && encoding.bom().is_none() {
            warn!(encoding = encoding.name(), "target encoding has no byte-order mark");
            report.warn(format!(
                "BOM requested but {} has no byte-order mark; skipped.",
                encoding.name()
            ));
        }
        Ok(())
    }

    fn write_row(&mut self, cells: &[EnumCellValue]) -> Result<()> {
        self.derive_open_writer()?.write_row(cells)?;
        self.n_rows += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        self.derive_open_writer()?;
        let Some(writer) = self.writer.take() else {
            return Err(RenderTableError::Sink(
                "Cannot finish twice.".to_string(),
            ));
        };
        let if_csv = writer.is_csv_backed();
        let c_text = writer.into_text()?;
        let v_bytes = encode_text(
            &c_text,
            &self.data_encoding,
            &self.target_encoding,
            self.if_bom,
        )?;
        debug!(
            n_rows = self.n_rows,
            n_chars = c_text.len(),
            n_bytes = v_bytes.len(),
            if_csv,
            "delimited buffer encoded"
        );
        Ok(v_bytes)
    }

    fn release(&mut self) {
        if self.if_released {
            return;
        }
        self.writer = None;
        self.if_released = true;
    }
}

/// Releases the wrapped sink when dropped.
pub struct SinkGuard<'a> {
    sink: &'a mut dyn TableSink,
}

impl<'a> SinkGuard<'a> {
    /// Guard `sink` until the end of the enclosing scope.
    pub fn new(sink: &'a mut dyn TableSink) -> Self {
        Self { sink }
    }
}

impl<'a> Deref for SinkGuard<'a> {
    type Target = dyn TableSink + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.sink
    }
}

impl DerefMut for SinkGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.sink
    }
}

impl Drop for SinkGuard<'_> {
    fn drop(&mut self) {
        self.sink.release();
    }
}
