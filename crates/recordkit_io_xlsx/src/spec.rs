//! Shared record-export specification models and error types.

use std::fmt;

use rust_xlsxwriter::XlsxError;
use thiserror::Error;

use crate::conf::{C_FONT_NAME_DEFAULT, C_SHEET_TITLE_DEFAULT, N_FONT_SIZE_DEFAULT};

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification used to build writer styles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<f64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
        }
    }
}

/// Presentation of one column, fixed by the declared value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnumPresentationKind {
    /// Integer, floating point or decimal value; right aligned.
    Numeric,
    /// Anything else; default style.
    Text,
}

/// Style requested from a grid writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnumStyleKind {
    /// Column title row cell.
    Title,
    /// Numeric data cell.
    Numeric,
    /// Text data cell.
    Text,
}

impl From<EnumPresentationKind> for EnumStyleKind {
    fn from(kind: EnumPresentationKind) -> Self {
        match kind {
            EnumPresentationKind::Numeric => Self::Numeric,
            EnumPresentationKind::Text => Self::Text,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RecordMetadata

/// Per-record-type sheet metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecSheetMeta {
    /// Sheet title.
    pub sheet_title: String,
    /// Emit a column title row before the data rows.
    pub show_title_row: bool,
    /// Font family of every cell.
    pub font_name: String,
    /// Font size in points of every cell.
    pub font_size: f64,
}

impl Default for SpecSheetMeta {
    fn default() -> Self {
        Self {
            sheet_title: C_SHEET_TITLE_DEFAULT.to_string(),
            show_title_row: true,
            font_name: C_FONT_NAME_DEFAULT.to_string(),
            font_size: N_FONT_SIZE_DEFAULT,
        }
    }
}

impl SpecSheetMeta {
    /// Default metadata with the given sheet title.
    pub fn titled(sheet_title: impl Into<String>) -> Self {
        Self {
            sheet_title: sheet_title.into(),
            ..Self::default()
        }
    }
}

/// Per-field column metadata. A field without it is not exported.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecColumnMeta {
    /// Sort key; neither unique nor contiguous.
    pub order: i32,
    /// Column title; empty means "use the field name".
    pub title: String,
}

impl SpecColumnMeta {
    /// Column at `order` with a title derived from the field name.
    pub fn new(order: i32) -> Self {
        Self {
            order,
            title: String::new(),
        }
    }

    /// Set an explicit column title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// Accessor reading one field of `R` as display text; `None` is an absent value.
pub type FnCellAccessor<R> = Box<dyn Fn(&R) -> Option<String> + Send + Sync>;

/// One resolved export column.
pub struct SpecColumnDescriptor<R> {
    /// Sort key copied from the column metadata.
    pub order: i32,
    /// Resolved column title.
    pub title: String,
    /// Declared field identifier.
    pub field_name: &'static str,
    /// Presentation kind of the declared value type.
    pub presentation: EnumPresentationKind,
    pub(crate) accessor: FnCellAccessor<R>,
}

impl<R> SpecColumnDescriptor<R> {
    /// Read this column of `record` as display text.
    pub fn read(&self, record: &R) -> Option<String> {
        (self.accessor)(record)
    }
}

impl<R> fmt::Debug for SpecColumnDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecColumnDescriptor")
            .field("order", &self.order)
            .field("title", &self.title)
            .field("field_name", &self.field_name)
            .field("presentation", &self.presentation)
            .finish_non_exhaustive()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExportOptions

/// Record type compatibility check mode for heterogeneous collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumRecordValidationMode {
    /// Check the first record only; later mismatches fail during projection.
    Head,
    /// Check every record before any row is written (default).
    #[default]
    All,
}

/// Autofit rule for column width inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumAutofitColumnsRule {
    /// Disable autofit.
    None,
    /// Infer width from title row cells only (default).
    #[default]
    Header,
    /// Infer width from title and data cells.
    All,
}

/// Autofit policy for the XLSX grid writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Autofit width inference rule.
    pub rule_columns: EnumAutofitColumnsRule,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            rule_columns: EnumAutofitColumnsRule::Header,
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Exporter-wide options.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecExportOptions {
    /// Record compatibility check mode for [`crate::RecordXlsxExporter::export_dyn`].
    pub rule_validation: EnumRecordValidationMode,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportAndErrors

/// Per-export call report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecExportReport {
    /// Sheet name handed to the grid writer.
    pub sheet_name: String,
    /// Number of exported columns.
    pub n_columns: usize,
    /// Number of title rows written (0 or 1).
    pub n_rows_title: usize,
    /// Number of data rows written.
    pub n_rows_data: usize,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecExportReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} sheet={:?} columns={} rows_title={} rows_data={} warnings={}",
            self.sheet_name,
            self.n_columns,
            self.n_rows_title,
            self.n_rows_data,
            self.warnings.len()
        )
    }
}

impl fmt::Display for SpecExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[XLSX]"))
    }
}

/// Errors raised by column resolution, validation, projection and writing.
#[derive(Debug, Error)]
pub enum XlsxExportError {
    /// Record type not opted in, or no exportable column declared.
    #[error("invalid export configuration for {record_type}: {message}")]
    Configuration {
        /// Offending record type.
        record_type: &'static str,
        /// What is missing.
        message: String,
    },

    /// A record is neither the bound record type nor derived from it.
    #[error("record #{idx_record} has type {actual}, expected {expected} or a type derived from it")]
    TypeMismatch {
        /// Exporter's bound record type.
        expected: &'static str,
        /// Runtime type of the offending record.
        actual: &'static str,
        /// Zero-based position in the collection.
        idx_record: usize,
    },

    /// A column value is absent on a record.
    #[error("record #{idx_record} has no value for column {column:?}")]
    NullValue {
        /// Title of the column.
        column: String,
        /// Zero-based position in the collection.
        idx_record: usize,
    },

    /// Row or column index does not fit the worksheet.
    #[error("{0}")]
    IndexOverflow(String),

    /// Grid writer used after `finish`.
    #[error("cannot write after finish()")]
    WriterClosed,

    /// Failure inside the spreadsheet library.
    #[error(transparent)]
    Xlsx(#[from] XlsxError),

    /// Failure writing the output destination.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias for export operations.
pub type Result<T, E = XlsxExportError> = std::result::Result<T, E>;

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_meta_defaults() {
        let meta = SpecSheetMeta::default();
        assert_eq!(meta.sheet_title, "Sheet1");
        assert!(meta.show_title_row);
        assert_eq!(meta.font_size, 9.0);

        let meta = SpecSheetMeta::titled("Orders");
        assert_eq!(meta.sheet_title, "Orders");
        assert_eq!(meta.font_name, C_FONT_NAME_DEFAULT);
    }

    #[test]
    fn column_meta_defaults_to_derived_title() {
        assert_eq!(SpecColumnMeta::default(), SpecColumnMeta::new(0));
        assert!(SpecColumnMeta::new(4).title.is_empty());
        assert_eq!(SpecColumnMeta::new(4).with_title("Name").title, "Name");
    }

    #[test]
    fn cell_format_merge_prefers_patch() {
        let fmt_base = SpecCellFormat {
            font_name: Some("Arial".to_string()),
            align: Some("left".to_string()),
            ..Default::default()
        };
        let fmt = fmt_base.with_(SpecCellFormat {
            align: Some("right".to_string()),
            ..Default::default()
        });
        assert_eq!(fmt.font_name.as_deref(), Some("Arial"));
        assert_eq!(fmt.align.as_deref(), Some("right"));
    }

    #[test]
    fn report_format_matches_summary_line() {
        let mut report = SpecExportReport {
            sheet_name: "Orders".to_string(),
            n_columns: 3,
            n_rows_title: 1,
            n_rows_data: 2,
            warnings: vec![],
        };
        report.warn("w");
        let txt = report.format("[XLSX]");
        assert_eq!(
            txt,
            "[XLSX] sheet=\"Orders\" columns=3 rows_title=1 rows_data=2 warnings=1"
        );
        assert_eq!(report.to_string(), txt);
    }

    #[test]
    fn presentation_maps_to_style_kind() {
        assert_eq!(
            EnumStyleKind::from(EnumPresentationKind::Numeric),
            EnumStyleKind::Numeric
        );
        assert_eq!(
            EnumStyleKind::from(EnumPresentationKind::Text),
            EnumStyleKind::Text
        );
    }
}
