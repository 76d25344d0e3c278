//! `recordkit_io_xlsx` v1:
//! Metadata-driven export of typed records into a single XLSX sheet.
//!
//! Modules:
//! - `conf`     : constants and default style presets
//! - `spec`     : metadata models/options/report/errors
//! - `record`   : record declaration API and value presentation
//! - `util`     : pure helpers (column resolution, validation, projection)
//! - `grid`     : grid writer boundary and in-memory writer
//! - `writer`   : `rust_xlsxwriter`-backed grid writer
//! - `exporter` : sheet assembly
pub mod conf;
pub mod exporter;
pub mod grid;
pub mod record;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    C_FONT_NAME_DEFAULT, C_SHEET_NAME_RESERVED, C_SHEET_TITLE_DEFAULT, N_FONT_SIZE_DEFAULT,
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
pub use exporter::{RecordXlsxExporter, export_records_to_xlsx};
pub use grid::{GridWriter, MemoryGridWriter, SpecGridCell, SpecMemorySheet, SpecMemoryStyle};
pub use record::{CellValue, DynRecord, SpecRecordField, XlsxRecord, resolve_record_as};
pub use spec::{
    EnumAutofitColumnsRule, EnumPresentationKind, EnumRecordValidationMode, EnumStyleKind,
    Result, SpecAutofitCellsPolicy, SpecCellFormat, SpecColumnDescriptor, SpecColumnMeta,
    SpecExportOptions, SpecExportReport, SpecSheetMeta, XlsxExportError,
};
pub use util::{
    classify_value_type, project_row, resolve_column_descriptors, sanitize_sheet_name,
    validate_records,
};
pub use writer::{SpecXlsxSheet, SpecXlsxStyle, XlsxGridWriter};
