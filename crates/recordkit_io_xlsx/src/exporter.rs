//! Record exporter: assembles a title row and one data row per record and
//! streams them through a [`GridWriter`].

use std::any::type_name;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Write;

use crate::grid::{GridWriter, SpecGridCell};
use crate::record::{DynRecord, XlsxRecord};
use crate::spec::{
    EnumStyleKind, Result, SpecColumnDescriptor, SpecExportOptions, SpecExportReport,
    SpecSheetMeta, XlsxExportError,
};
use crate::util::{
    derive_sheet_meta, project_row, resolve_column_descriptors, resolve_record,
    sanitize_sheet_name, validate_records,
};
use crate::writer::XlsxGridWriter;

/// Exporter bound to record type `R`.
///
/// Columns are resolved once at construction and reused by every export call.
pub struct RecordXlsxExporter<R: XlsxRecord> {
    sheet_meta: SpecSheetMeta,
    l_columns: Vec<SpecColumnDescriptor<R>>,
    options: SpecExportOptions,
}

impl<R: XlsxRecord> RecordXlsxExporter<R> {
    /// Resolve sheet metadata and export columns of `R`.
    ///
    /// Fails with [`XlsxExportError::Configuration`] when `R` carries no sheet
    /// metadata or declares no exportable column.
    pub fn new() -> Result<Self> {
        let sheet_meta = derive_sheet_meta::<R>()?;
        let l_columns = resolve_column_descriptors::<R>()?;
        log::debug!(
            "Resolved {} xlsx columns for {}: {:?}",
            l_columns.len(),
            type_name::<R>(),
            l_columns.iter().map(|col| col.title.as_str()).collect::<Vec<_>>()
        );
        Ok(Self {
            sheet_meta,
            l_columns,
            options: SpecExportOptions::default(),
        })
    }

    /// Replace exporter options.
    pub fn with_options(mut self, options: SpecExportOptions) -> Self {
        self.options = options;
        self
    }

    /// Sheet metadata of `R`.
    pub fn sheet_meta(&self) -> &SpecSheetMeta {
        &self.sheet_meta
    }

    /// Resolved columns in export order.
    pub fn columns(&self) -> &[SpecColumnDescriptor<R>] {
        &self.l_columns
    }

    /// Column titles in export order.
    pub fn titles(&self) -> Vec<&str> {
        self.l_columns.iter().map(|col| col.title.as_str()).collect()
    }

    /// Export typed records through `writer`.
    pub fn export<W: GridWriter>(
        &self,
        records: &[R],
        writer: &mut W,
    ) -> Result<SpecExportReport> {
        self.assemble(records.len(), records.iter().map(Ok), writer)
            .inspect_err(|err| log::warn!("Export to xlsx aborted: {err}"))
    }

    /// Export a type-erased collection through `writer`.
    ///
    /// Records must be `R` or extend it (see [`DynRecord::parent_record`]).
    /// Validation runs before any writer call, per
    /// [`SpecExportOptions::rule_validation`].
    pub fn export_dyn<W: GridWriter>(
        &self,
        records: &[&dyn DynRecord],
        writer: &mut W,
    ) -> Result<SpecExportReport> {
        validate_records::<R>(records, self.options.rule_validation)
            .and_then(|()| {
                let iter_records = records
                    .iter()
                    .enumerate()
                    .map(|(idx_record, record)| resolve_record::<R>(*record, idx_record));
                self.assemble(records.len(), iter_records, writer)
            })
            .inspect_err(|err| log::warn!("Export to xlsx aborted: {err}"))
    }

    /// Export typed records as an XLSX workbook into `out`.
    pub fn write_xlsx<O: Write>(&self, records: &[R], out: O) -> Result<SpecExportReport> {
        let mut writer = XlsxGridWriter::new(out);
        self.export(records, &mut writer)
    }

    fn assemble<'r, W, I>(
        &self,
        n_records: usize,
        records: I,
        writer: &mut W,
    ) -> Result<SpecExportReport>
    where
        W: GridWriter,
        I: Iterator<Item = Result<&'r R>>,
    {
        log::info!(
            "Export to xlsx started: record_type={}, n_records={n_records}",
            type_name::<R>()
        );

        let mut report = SpecExportReport {
            n_columns: self.l_columns.len(),
            ..Default::default()
        };
        let sheet_name = sanitize_sheet_name(&self.sheet_meta.sheet_title, "_");
        if sheet_name != self.sheet_meta.sheet_title {
            log::warn!(
                "Sheet title {:?} is not a valid sheet name; using {sheet_name:?}",
                self.sheet_meta.sheet_title
            );
            report.warn(format!(
                "Sheet title {:?} renamed to {sheet_name:?}.",
                self.sheet_meta.sheet_title
            ));
        }

        let dict_styles = self.create_styles(writer, n_records > 0)?;
        let mut sheet = writer.begin_sheet(&sheet_name)?;
        report.sheet_name = sheet_name;

        if self.sheet_meta.show_title_row {
            let style_title = self.select_style(&dict_styles, EnumStyleKind::Title)?;
            let l_cells: Vec<_> = self
                .l_columns
                .iter()
                .map(|col| SpecGridCell {
                    text: col.title.clone(),
                    style: style_title,
                })
                .collect();
            writer.write_row(&mut sheet, &l_cells)?;
            report.n_rows_title = 1;
        }

        if n_records > 0 {
            let l_styles_by_col = self
                .l_columns
                .iter()
                .map(|col| self.select_style(&dict_styles, col.presentation.into()))
                .collect::<Result<Vec<_>>>()?;

            for (idx_record, record) in records.enumerate() {
                let l_texts = project_row(record?, &self.l_columns, idx_record)?;
                let l_cells: Vec<_> = l_texts
                    .into_iter()
                    .zip(l_styles_by_col.iter().copied())
                    .map(|(text, style)| SpecGridCell { text, style })
                    .collect();
                writer.write_row(&mut sheet, &l_cells)?;
                report.n_rows_data += 1;
            }
        }

        writer.finish()?;
        log::info!("Export to xlsx finished: {report}");
        Ok(report)
    }

    /// Create one style per kind the sheet uses: title when the title row is
    /// shown, and each column presentation when data rows follow.
    fn create_styles<W: GridWriter>(
        &self,
        writer: &mut W,
        if_has_records: bool,
    ) -> Result<BTreeMap<EnumStyleKind, W::Style>> {
        let mut set_kinds = BTreeSet::new();
        if self.sheet_meta.show_title_row {
            set_kinds.insert(EnumStyleKind::Title);
        }
        if if_has_records {
            set_kinds.extend(self.l_columns.iter().map(|col| EnumStyleKind::from(col.presentation)));
        }

        let mut dict_styles = BTreeMap::new();
        for kind in set_kinds {
            let style = writer.create_style(
                kind,
                &self.sheet_meta.font_name,
                self.sheet_meta.font_size,
            )?;
            dict_styles.insert(kind, style);
        }
        Ok(dict_styles)
    }

    fn select_style<'s, S>(
        &self,
        dict_styles: &'s BTreeMap<EnumStyleKind, S>,
        kind: EnumStyleKind,
    ) -> Result<&'s S> {
        dict_styles
            .get(&kind)
            .ok_or_else(|| XlsxExportError::Configuration {
                record_type: type_name::<R>(),
                message: format!("style {kind:?} was not created"),
            })
    }
}

impl<R: XlsxRecord> fmt::Debug for RecordXlsxExporter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordXlsxExporter")
            .field("sheet_meta", &self.sheet_meta)
            .field("l_columns", &self.l_columns)
            .field("options", &self.options)
            .finish()
    }
}

/// Export `records` of type `R` as an XLSX workbook into `out`.
pub fn export_records_to_xlsx<R: XlsxRecord, O: Write>(
    out: O,
    records: &[R],
) -> Result<SpecExportReport> {
    RecordXlsxExporter::<R>::new()?.write_xlsx(records, out)
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::io::{self, Cursor};

    use calamine::{Reader, Xlsx, open_workbook_from_rs};
    use rust_decimal::Decimal;

    use super::*;
    use crate::grid::MemoryGridWriter;
    use crate::record::SpecRecordField;
    use crate::spec::{EnumRecordValidationMode, SpecColumnMeta};

    struct Account {
        id: i32,
        name: String,
        amount: Decimal,
    }

    impl XlsxRecord for Account {
        fn sheet_meta() -> Option<SpecSheetMeta> {
            Some(SpecSheetMeta::titled("Accounts"))
        }

        fn record_fields() -> Vec<SpecRecordField<Self>> {
            vec![
                SpecRecordField::new("id", |r: &Self| &r.id).column(SpecColumnMeta::new(1)),
                SpecRecordField::new("name", |r: &Self| &r.name)
                    .column(SpecColumnMeta::new(3).with_title("Name")),
                SpecRecordField::new("Amount", |r: &Self| &r.amount)
                    .column(SpecColumnMeta::new(2).with_title("")),
            ]
        }
    }

    impl DynRecord for Account {
        fn as_any(&self) -> &(dyn Any + 'static) {
            self
        }
    }

    struct PremiumAccount {
        account: Account,
    }

    impl DynRecord for PremiumAccount {
        fn as_any(&self) -> &(dyn Any + 'static) {
            self
        }

        fn parent_record(&self) -> Option<&(dyn DynRecord + 'static)> {
            Some(&self.account)
        }
    }

    struct Invoice;

    impl DynRecord for Invoice {
        fn as_any(&self) -> &(dyn Any + 'static) {
            self
        }
    }

    struct Headless {
        code: Option<String>,
    }

    impl XlsxRecord for Headless {
        fn sheet_meta() -> Option<SpecSheetMeta> {
            Some(SpecSheetMeta {
                sheet_title: "codes/2020".to_string(),
                show_title_row: false,
                ..Default::default()
            })
        }

        fn record_fields() -> Vec<SpecRecordField<Self>> {
            vec![SpecRecordField::new("code", |r: &Self| &r.code).column(SpecColumnMeta::default())]
        }
    }

    struct Hidden;

    impl XlsxRecord for Hidden {
        fn sheet_meta() -> Option<SpecSheetMeta> {
            None
        }

        fn record_fields() -> Vec<SpecRecordField<Self>> {
            vec![]
        }
    }

    struct Quarterly {
        total: f64,
    }

    impl XlsxRecord for Quarterly {
        fn sheet_meta() -> Option<SpecSheetMeta> {
            Some(SpecSheetMeta::titled("'Q1'"))
        }

        fn record_fields() -> Vec<SpecRecordField<Self>> {
            vec![SpecRecordField::new("total", |r: &Self| &r.total).column(SpecColumnMeta::new(1))]
        }
    }

    /// Destination that rejects every write.
    struct DiskFull;

    impl Write for DiskFull {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Grid writer that fails on its `n_rows_ok + 1`-th row.
    struct FailingGridWriter {
        inner: MemoryGridWriter,
        n_rows_ok: usize,
    }

    impl GridWriter for FailingGridWriter {
        type Sheet = usize;
        type Style = <MemoryGridWriter as GridWriter>::Style;

        fn create_style(
            &mut self,
            kind: EnumStyleKind,
            font_name: &str,
            font_size: f64,
        ) -> Result<Self::Style> {
            self.inner.create_style(kind, font_name, font_size)
        }

        fn begin_sheet(&mut self, title: &str) -> Result<Self::Sheet> {
            self.inner.begin_sheet(title)
        }

        fn write_row(
            &mut self,
            sheet: &mut Self::Sheet,
            cells: &[SpecGridCell<'_, Self::Style>],
        ) -> Result<()> {
            if self.n_rows_ok == 0 {
                return Err(XlsxExportError::Io(io::Error::other("disk full")));
            }
            self.n_rows_ok -= 1;
            self.inner.write_row(sheet, cells)
        }

        fn finish(&mut self) -> Result<()> {
            self.inner.finish()
        }
    }

    fn account(id: i32, name: &str, amount: Decimal) -> Account {
        Account {
            id,
            name: name.to_string(),
            amount,
        }
    }

    fn accounts() -> Vec<Account> {
        vec![
            account(1, "Alice", Decimal::new(105, 1)),
            account(2, "Bob", Decimal::new(200, 1)),
        ]
    }

    #[test]
    fn export_orders_columns_and_styles() {
        let exporter = RecordXlsxExporter::<Account>::new().expect("exporter");
        assert_eq!(exporter.titles(), vec!["id", "Amount", "Name"]);

        let mut writer = MemoryGridWriter::new();
        let report = exporter.export(&accounts(), &mut writer).expect("export");
        assert_eq!(report.n_rows_title, 1);
        assert_eq!(report.n_rows_data, 2);
        assert_eq!(report.n_columns, 3);
        assert!(writer.if_finished);

        let sheet = &writer.sheets[0];
        assert_eq!(sheet.title, "Accounts");
        assert_eq!(
            sheet.texts(),
            vec![
                vec!["id", "Amount", "Name"],
                vec!["1", "10.5", "Alice"],
                vec!["2", "20.0", "Bob"],
            ]
        );
        assert!(sheet.rows[0].iter().all(|(_, kind)| *kind == EnumStyleKind::Title));
        let l_kinds: Vec<_> = sheet.rows[1].iter().map(|(_, kind)| *kind).collect();
        assert_eq!(
            l_kinds,
            vec![
                EnumStyleKind::Numeric,
                EnumStyleKind::Numeric,
                EnumStyleKind::Text
            ]
        );
    }

    #[test]
    fn styles_are_created_once_per_used_kind() {
        let exporter = RecordXlsxExporter::<Account>::new().expect("exporter");
        let mut writer = MemoryGridWriter::new();
        exporter.export(&accounts(), &mut writer).expect("export");

        let l_kinds: Vec<_> = writer.styles.iter().map(|style| style.kind).collect();
        assert_eq!(
            l_kinds,
            vec![
                EnumStyleKind::Title,
                EnumStyleKind::Numeric,
                EnumStyleKind::Text
            ]
        );
        assert!(writer.styles.iter().all(|style| style.font_size == 9.0));
    }

    #[test]
    fn empty_collection_writes_title_row_only() {
        let exporter = RecordXlsxExporter::<Account>::new().expect("exporter");
        let mut writer = MemoryGridWriter::new();
        let report = exporter.export(&[], &mut writer).expect("export");
        assert_eq!(report.n_rows_title, 1);
        assert_eq!(report.n_rows_data, 0);
        assert_eq!(writer.sheets[0].rows.len(), 1);
        assert_eq!(writer.styles.len(), 1);
        assert_eq!(writer.styles[0].kind, EnumStyleKind::Title);
    }

    #[test]
    fn empty_collection_without_title_row_writes_nothing() {
        let exporter = RecordXlsxExporter::<Headless>::new().expect("exporter");
        let mut writer = MemoryGridWriter::new();
        let report = exporter.export(&[], &mut writer).expect("export");
        assert_eq!(report.n_rows_title + report.n_rows_data, 0);
        assert!(writer.sheets[0].rows.is_empty());
        assert!(writer.styles.is_empty());
        assert!(writer.if_finished);
    }

    #[test]
    fn missing_sheet_metadata_fails_construction() {
        let err = RecordXlsxExporter::<Hidden>::new().expect_err("not opted in");
        assert!(matches!(err, XlsxExportError::Configuration { .. }));
    }

    #[test]
    fn mismatched_head_record_writes_nothing() {
        let exporter = RecordXlsxExporter::<Account>::new().expect("exporter");
        let record = account(1, "Alice", Decimal::ONE);
        let l_records: [&dyn DynRecord; 2] = [&Invoice, &record];

        let mut writer = MemoryGridWriter::new();
        let err = exporter
            .export_dyn(&l_records, &mut writer)
            .expect_err("invoice is not an account");
        assert!(matches!(
            err,
            XlsxExportError::TypeMismatch { idx_record: 0, .. }
        ));
        assert!(writer.sheets.is_empty());
        assert!(writer.styles.is_empty());
        assert!(!writer.if_finished);

        let mut writer = MemoryGridWriter::new();
        exporter
            .export_dyn(&[&record], &mut writer)
            .expect("exporter stays reusable");
    }

    #[test]
    fn derived_records_export_through_base_view() {
        let exporter = RecordXlsxExporter::<Account>::new().expect("exporter");
        let record = account(1, "Alice", Decimal::new(105, 1));
        let premium = PremiumAccount {
            account: account(2, "Bob", Decimal::new(200, 1)),
        };
        let l_records: [&dyn DynRecord; 2] = [&record, &premium];

        let mut writer = MemoryGridWriter::new();
        exporter.export_dyn(&l_records, &mut writer).expect("export");
        assert_eq!(writer.sheets[0].texts()[2], vec!["2", "20.0", "Bob"]);
    }

    #[test]
    fn validation_mode_decides_when_mismatch_surfaces() {
        let record = account(1, "Alice", Decimal::ONE);
        let l_records: [&dyn DynRecord; 2] = [&record, &Invoice];

        let exporter = RecordXlsxExporter::<Account>::new().expect("exporter");
        let mut writer = MemoryGridWriter::new();
        exporter
            .export_dyn(&l_records, &mut writer)
            .expect_err("all records are checked");
        assert!(writer.sheets.is_empty());

        let exporter = RecordXlsxExporter::<Account>::new()
            .expect("exporter")
            .with_options(SpecExportOptions {
                rule_validation: EnumRecordValidationMode::Head,
            });
        let mut writer = MemoryGridWriter::new();
        let err = exporter
            .export_dyn(&l_records, &mut writer)
            .expect_err("mismatch found while projecting");
        assert!(matches!(
            err,
            XlsxExportError::TypeMismatch { idx_record: 1, .. }
        ));
        assert_eq!(writer.sheets[0].rows.len(), 2);
        assert!(!writer.if_finished);
    }

    #[test]
    fn absent_value_aborts_export() {
        let exporter = RecordXlsxExporter::<Headless>::new().expect("exporter");
        let l_records = vec![
            Headless {
                code: Some("A-1".to_string()),
            },
            Headless { code: None },
        ];
        let mut writer = MemoryGridWriter::new();
        let err = exporter.export(&l_records, &mut writer).expect_err("null code");
        match err {
            XlsxExportError::NullValue { column, idx_record } => {
                assert_eq!(column, "code");
                assert_eq!(idx_record, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!writer.if_finished);
    }

    #[test]
    fn invalid_sheet_title_is_sanitized_with_warning() {
        let exporter = RecordXlsxExporter::<Headless>::new().expect("exporter");
        let mut writer = MemoryGridWriter::new();
        let report = exporter.export(&[], &mut writer).expect("export");
        assert_eq!(report.sheet_name, "codes_2020");
        assert_eq!(writer.sheets[0].title, "codes_2020");
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn repeated_exports_reuse_resolved_columns() {
        let exporter = RecordXlsxExporter::<Account>::new().expect("exporter");
        let mut writer_a = MemoryGridWriter::new();
        let mut writer_b = MemoryGridWriter::new();
        let report_a = exporter.export(&accounts(), &mut writer_a).expect("first");
        let report_b = exporter.export(&accounts(), &mut writer_b).expect("second");
        assert_eq!(report_a, report_b);
        assert_eq!(writer_a.sheets, writer_b.sheets);
    }

    #[test]
    fn write_xlsx_produces_readable_workbook() {
        let mut v_buf = Vec::new();
        let report = export_records_to_xlsx(&mut v_buf, &accounts()).expect("export");
        assert_eq!(report.n_rows_data, 2);

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(v_buf)).expect("open");
        let range = workbook.worksheet_range("Accounts").expect("sheet");
        let l_rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        assert_eq!(
            l_rows,
            vec![
                vec!["id", "Amount", "Name"],
                vec!["1", "10.5", "Alice"],
                vec!["2", "20.0", "Bob"],
            ]
        );
    }

    #[test]
    fn apostrophe_wrapped_title_is_sanitized() {
        let mut v_buf = Vec::new();
        let report = export_records_to_xlsx(&mut v_buf, &[Quarterly { total: 20.0 }])
            .expect("export");
        assert_eq!(report.sheet_name, "Q1");
        assert_eq!(report.warnings.len(), 1);

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(v_buf)).expect("open");
        let range = workbook.worksheet_range("Q1").expect("sheet");
        let l_rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        assert_eq!(l_rows, vec![vec!["total"], vec!["20.0"]]);
    }

    #[test]
    fn destination_io_error_propagates_unchanged() {
        let err = export_records_to_xlsx(DiskFull, &accounts()).expect_err("disk full");
        match err {
            XlsxExportError::Io(err_io) => {
                assert_eq!(err_io.kind(), io::ErrorKind::Other);
                assert_eq!(err_io.to_string(), "disk full");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn writer_failure_mid_sheet_stops_export_before_finish() {
        let exporter = RecordXlsxExporter::<Account>::new().expect("exporter");
        let mut writer = FailingGridWriter {
            inner: MemoryGridWriter::new(),
            n_rows_ok: 2,
        };
        let err = exporter
            .export(&accounts(), &mut writer)
            .expect_err("third row fails");
        match err {
            XlsxExportError::Io(err_io) => assert_eq!(err_io.to_string(), "disk full"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(writer.inner.sheets[0].rows.len(), 2);
        assert!(!writer.inner.if_finished);
    }
}
