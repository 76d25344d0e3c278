//! Stateless helpers behind the record exporter: column resolution,
//! presentation classification, record validation and row projection.

use std::any::type_name;

use crate::conf::{C_SHEET_NAME_RESERVED, N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL};
use crate::record::{CellValue, DynRecord, XlsxRecord, resolve_record_as};
use crate::spec::{
    EnumPresentationKind, EnumRecordValidationMode, Result, SpecColumnDescriptor, SpecSheetMeta,
    XlsxExportError,
};

////////////////////////////////////////////////////////////////////////////////
// #region ColumnResolution

/// Read sheet metadata of `R`, failing when the type has not opted in.
pub fn derive_sheet_meta<R: XlsxRecord>() -> Result<SpecSheetMeta> {
    R::sheet_meta().ok_or_else(|| XlsxExportError::Configuration {
        record_type: type_name::<R>(),
        message: "record type carries no sheet metadata".to_string(),
    })
}

/// Resolve the ordered export columns of `R`.
///
/// Fields without column metadata are skipped. An empty declared title falls
/// back to the field name. Columns are sorted by `order`; equal orders keep
/// declaration order.
pub fn resolve_column_descriptors<R: XlsxRecord>() -> Result<Vec<SpecColumnDescriptor<R>>> {
    let mut l_columns: Vec<SpecColumnDescriptor<R>> = R::record_fields()
        .into_iter()
        .filter_map(|field| {
            let meta = field.column?;
            let title = if meta.title.is_empty() {
                field.name.to_string()
            } else {
                meta.title
            };
            Some(SpecColumnDescriptor {
                order: meta.order,
                title,
                field_name: field.name,
                presentation: field.presentation,
                accessor: field.accessor,
            })
        })
        .collect();

    if l_columns.is_empty() {
        return Err(XlsxExportError::Configuration {
            record_type: type_name::<R>(),
            message: "no exportable columns declared".to_string(),
        });
    }

    // `sort_by_key` is stable.
    l_columns.sort_by_key(|col| col.order);
    Ok(l_columns)
}

/// Presentation kind of declared value type `V`.
pub fn classify_value_type<V: CellValue + ?Sized>() -> EnumPresentationKind {
    V::PRESENTATION
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RecordValidation

/// Check that records are `R` or derived from it.
///
/// An empty collection is valid. `Head` inspects only the first record.
pub fn validate_records<R: 'static>(
    records: &[&dyn DynRecord],
    rule: EnumRecordValidationMode,
) -> Result<()> {
    let n_checked = match rule {
        EnumRecordValidationMode::Head => usize::min(1, records.len()),
        EnumRecordValidationMode::All => records.len(),
    };
    for (idx_record, record) in records.iter().take(n_checked).enumerate() {
        resolve_record::<R>(*record, idx_record)?;
    }
    Ok(())
}

/// View one record as `R` or report a type mismatch at `idx_record`.
pub fn resolve_record<'a, R: 'static>(
    record: &'a dyn DynRecord,
    idx_record: usize,
) -> Result<&'a R> {
    resolve_record_as::<R>(record).ok_or_else(|| XlsxExportError::TypeMismatch {
        expected: type_name::<R>(),
        actual: record.record_type_name(),
        idx_record,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RowProjection

/// Project `record` into display strings, one per column in column order.
pub fn project_row<R>(
    record: &R,
    columns: &[SpecColumnDescriptor<R>],
    idx_record: usize,
) -> Result<Vec<String>> {
    columns
        .iter()
        .map(|col| {
            col.read(record).ok_or_else(|| XlsxExportError::NullValue {
                column: col.title.clone(),
                idx_record,
            })
        })
        .collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
///
/// Leading/trailing apostrophes are stripped and the reserved name
/// `History` gets a `replace_to` suffix.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    let c_name: String = c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect();
    let c_name = c_name.trim_matches(|chr: char| chr == '\'' || chr.is_whitespace());
    if c_name.is_empty() {
        return "Sheet".to_string();
    }
    if c_name.eq_ignore_ascii_case(C_SHEET_NAME_RESERVED) {
        let c_suffix = if replace_to.is_empty() { "_" } else { replace_to };
        return format!("{c_name}{c_suffix}");
    }

    c_name.to_string()
}

/// Estimate displayed width units of `s`; non-ASCII chars count 1.6.
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
