//! Grid writer boundary: the only surface the exporter writes through.

use crate::spec::{EnumStyleKind, Result, XlsxExportError};

/// One output cell: display text plus a shared style handle.
#[derive(Debug)]
pub struct SpecGridCell<'a, S> {
    /// Display text.
    pub text: String,
    /// Style shared by every cell of the same kind.
    pub style: &'a S,
}

/// Turns ordered rows of styled text cells into a spreadsheet artifact.
///
/// The exporter calls `create_style` once per style kind it uses, then
/// `begin_sheet` once, then `write_row` per row, then `finish`.
pub trait GridWriter {
    /// Handle of one sheet in the writer's workbook.
    type Sheet;
    /// Opaque style handle.
    type Style;

    /// Create the style for `kind` with the sheet's font.
    fn create_style(
        &mut self,
        kind: EnumStyleKind,
        font_name: &str,
        font_size: f64,
    ) -> Result<Self::Style>;

    /// Add a sheet named `title`.
    fn begin_sheet(&mut self, title: &str) -> Result<Self::Sheet>;

    /// Append one row of cells to `sheet`.
    fn write_row(
        &mut self,
        sheet: &mut Self::Sheet,
        cells: &[SpecGridCell<'_, Self::Style>],
    ) -> Result<()>;

    /// Flush the workbook and release held resources.
    fn finish(&mut self) -> Result<()>;
}

/// Style recorded by [`MemoryGridWriter`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpecMemoryStyle {
    /// Requested style kind.
    pub kind: EnumStyleKind,
    /// Font family.
    pub font_name: String,
    /// Font size in points.
    pub font_size: f64,
}

/// One sheet captured by [`MemoryGridWriter`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecMemorySheet {
    /// Sheet title as requested.
    pub title: String,
    /// Rows of `(text, style kind)` cells.
    pub rows: Vec<Vec<(String, EnumStyleKind)>>,
}

impl SpecMemorySheet {
    /// Row texts without styles.
    pub fn texts(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|(text, _)| text.clone()).collect())
            .collect()
    }
}

/// In-memory grid writer that records every call.
#[derive(Debug, Default)]
pub struct MemoryGridWriter {
    /// Styles in creation order.
    pub styles: Vec<SpecMemoryStyle>,
    /// Sheets in creation order.
    pub sheets: Vec<SpecMemorySheet>,
    /// Whether `finish` was called.
    pub if_finished: bool,
}

impl MemoryGridWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GridWriter for MemoryGridWriter {
    /// Index into `sheets`.
    type Sheet = usize;
    type Style = SpecMemoryStyle;

    fn create_style(
        &mut self,
        kind: EnumStyleKind,
        font_name: &str,
        font_size: f64,
    ) -> Result<Self::Style> {
        let style = SpecMemoryStyle {
            kind,
            font_name: font_name.to_string(),
            font_size,
        };
        self.styles.push(style.clone());
        Ok(style)
    }

    fn begin_sheet(&mut self, title: &str) -> Result<Self::Sheet> {
        if self.if_finished {
            return Err(XlsxExportError::WriterClosed);
        }
        self.sheets.push(SpecMemorySheet {
            title: title.to_string(),
            rows: vec![],
        });
        Ok(self.sheets.len() - 1)
    }

    fn write_row(
        &mut self,
        sheet: &mut Self::Sheet,
        cells: &[SpecGridCell<'_, Self::Style>],
    ) -> Result<()> {
        if self.if_finished {
            return Err(XlsxExportError::WriterClosed);
        }
        let idx_sheet = *sheet;
        let sheet_mem = self
            .sheets
            .get_mut(idx_sheet)
            .ok_or_else(|| XlsxExportError::IndexOverflow(format!("unknown sheet #{idx_sheet}")))?;
        sheet_mem.rows.push(
            cells
                .iter()
                .map(|cell| (cell.text.clone(), cell.style.kind))
                .collect(),
        );
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.if_finished = true;
        Ok(())
    }
}
