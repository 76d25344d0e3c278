//! XLSX grid writer backed by `rust_xlsxwriter`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet};

use crate::conf::{N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, derive_default_xlsx_formats};
use crate::grid::{GridWriter, SpecGridCell};
use crate::spec::{
    EnumAutofitColumnsRule, EnumStyleKind, Result, SpecAutofitCellsPolicy, SpecCellFormat,
    XlsxExportError,
};
use crate::util::estimate_unicode_string_width;

/// Style handle: the requested kind plus its built format.
#[derive(Debug, Clone)]
pub struct SpecXlsxStyle {
    /// Requested style kind.
    pub kind: EnumStyleKind,
    format: Format,
}

/// Sheet handle returned by [`XlsxGridWriter::begin_sheet`].
#[derive(Debug)]
pub struct SpecXlsxSheet {
    idx_sheet: usize,
    n_rows_written: usize,
    l_width_by_col: Vec<usize>,
}

impl SpecXlsxSheet {
    /// Rows written so far.
    pub fn rows_written(&self) -> usize {
        self.n_rows_written
    }
}

/// Stateful workbook writer bound to an output destination.
///
/// The workbook is buffered in memory; the destination is written only by
/// [`GridWriter::finish`], so an aborted export leaves it untouched.
pub struct XlsxGridWriter<O: Write> {
    out: O,
    workbook: Workbook,
    n_sheets: usize,
    policy_autofit: SpecAutofitCellsPolicy,
    dict_fmt_patch: BTreeMap<EnumStyleKind, SpecCellFormat>,
    if_closed: bool,
}

impl XlsxGridWriter<BufWriter<File>> {
    /// Create writer for a new file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<O: Write> XlsxGridWriter<O> {
    /// Create writer bound to `out` with default autofit policy.
    pub fn new(out: O) -> Self {
        Self {
            out,
            workbook: Workbook::new(),
            n_sheets: 0,
            policy_autofit: SpecAutofitCellsPolicy::default(),
            dict_fmt_patch: BTreeMap::new(),
            if_closed: false,
        }
    }

    /// Replace the column autofit policy.
    pub fn with_autofit(mut self, policy_autofit: SpecAutofitCellsPolicy) -> Self {
        self.policy_autofit = policy_autofit;
        self
    }

    /// Overlay `patch` on the default format of `kind`.
    pub fn with_format_patch(mut self, kind: EnumStyleKind, patch: SpecCellFormat) -> Self {
        self.dict_fmt_patch.insert(kind, patch);
        self
    }

    /// Whether [`GridWriter::finish`] has completed.
    pub fn is_closed(&self) -> bool {
        self.if_closed
    }

    /// Give back the output destination.
    pub fn into_inner(self) -> O {
        self.out
    }

    fn derive_cell_format(
        &self,
        kind: EnumStyleKind,
        font_name: &str,
        font_size: f64,
    ) -> SpecCellFormat {
        let fmt_base = derive_default_xlsx_formats(font_name, font_size)
            .remove(&kind)
            .unwrap_or_default();
        match self.dict_fmt_patch.get(&kind) {
            Some(fmt_patch) => fmt_base.merge(fmt_patch),
            None => fmt_base,
        }
    }
}

impl<O: Write> GridWriter for XlsxGridWriter<O> {
    type Sheet = SpecXlsxSheet;
    type Style = SpecXlsxStyle;

    fn create_style(
        &mut self,
        kind: EnumStyleKind,
        font_name: &str,
        font_size: f64,
    ) -> Result<Self::Style> {
        let fmt_spec = self.derive_cell_format(kind, font_name, font_size);
        Ok(SpecXlsxStyle {
            kind,
            format: derive_rust_xlsx_format(&fmt_spec),
        })
    }

    fn begin_sheet(&mut self, title: &str) -> Result<Self::Sheet> {
        if self.if_closed {
            return Err(XlsxExportError::WriterClosed);
        }
        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(title)?;

        let idx_sheet = self.n_sheets;
        self.n_sheets += 1;
        Ok(SpecXlsxSheet {
            idx_sheet,
            n_rows_written: 0,
            l_width_by_col: vec![],
        })
    }

    fn write_row(
        &mut self,
        sheet: &mut Self::Sheet,
        cells: &[SpecGridCell<'_, Self::Style>],
    ) -> Result<()> {
        if self.if_closed {
            return Err(XlsxExportError::WriterClosed);
        }
        let n_row = cast_row_num(sheet.n_rows_written)?;
        if sheet.l_width_by_col.len() < cells.len() {
            sheet.l_width_by_col.resize(cells.len(), 0);
        }

        let worksheet = self.workbook.worksheet_from_index(sheet.idx_sheet)?;
        for (n_idx_col, cell) in cells.iter().enumerate() {
            let n_col = cast_col_num(n_idx_col)?;
            write_cell_with_format(worksheet, n_row, n_col, &cell.text, &cell.style.format)?;

            if !if_autofit_counts(&self.policy_autofit, cell.style.kind) {
                continue;
            }
            let n_width = estimate_unicode_string_width(&cell.text);
            if n_width > sheet.l_width_by_col[n_idx_col] || n_row == 0 {
                sheet.l_width_by_col[n_idx_col] =
                    usize::max(n_width, sheet.l_width_by_col[n_idx_col]);
                let n_width_final = derive_final_width(
                    &self.policy_autofit,
                    sheet.l_width_by_col[n_idx_col],
                );
                worksheet.set_column_width(n_col, n_width_final as f64)?;
            }
        }

        sheet.n_rows_written += 1;
        Ok(())
    }

    /// Serialize the workbook into the destination. Idempotent.
    fn finish(&mut self) -> Result<()> {
        if self.if_closed {
            return Ok(());
        }
        let v_buf = self.workbook.save_to_buffer()?;
        self.out.write_all(&v_buf)?;
        self.out.flush()?;
        self.if_closed = true;
        Ok(())
    }
}

fn if_autofit_counts(policy_autofit: &SpecAutofitCellsPolicy, kind: EnumStyleKind) -> bool {
    match policy_autofit.rule_columns {
        EnumAutofitColumnsRule::None => false,
        EnumAutofitColumnsRule::Header => kind == EnumStyleKind::Title,
        EnumAutofitColumnsRule::All => true,
    }
}

fn derive_final_width(policy_autofit: &SpecAutofitCellsPolicy, n_width_recorded: usize) -> usize {
    let n_min = usize::max(1, policy_autofit.width_cell_min);
    let n_max = usize::min(255, usize::max(n_min, policy_autofit.width_cell_max));
    usize::min(
        n_max,
        usize::max(n_min, n_width_recorded + policy_autofit.width_cell_padding),
    )
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    n_row: u32,
    n_col: u16,
    text: &str,
    format: &Format,
) -> Result<()> {
    if text.is_empty() {
        worksheet.write_blank(n_row, n_col, format)?;
    } else {
        worksheet.write_string_with_format(n_row, n_col, text, format)?;
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }

    format
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32> {
    if value >= N_NROWS_EXCEL_MAX {
        return Err(XlsxExportError::IndexOverflow(format!(
            "row index overflow: {value} (Excel limit {N_NROWS_EXCEL_MAX})"
        )));
    }
    u32::try_from(value)
        .map_err(|_| XlsxExportError::IndexOverflow(format!("row index overflow: {value}")))
}

fn cast_col_num(value: usize) -> Result<u16> {
    if value >= N_NCOLS_EXCEL_MAX {
        return Err(XlsxExportError::IndexOverflow(format!(
            "column index overflow: {value} (Excel limit {N_NCOLS_EXCEL_MAX})"
        )));
    }
    u16::try_from(value)
        .map_err(|_| XlsxExportError::IndexOverflow(format!("column index overflow: {value}")))
}
