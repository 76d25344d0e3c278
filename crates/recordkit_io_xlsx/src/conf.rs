//! XLSX constants, metadata defaults and default style preset factories.

use std::collections::BTreeMap;

use crate::spec::{EnumStyleKind, SpecCellFormat};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];
/// Sheet name reserved by Excel (case-insensitive).
pub const C_SHEET_NAME_RESERVED: &str = "History";

/// Sheet title used when a record type does not name its sheet.
pub const C_SHEET_TITLE_DEFAULT: &str = "Sheet1";
/// Font family used when a record type does not set one.
pub const C_FONT_NAME_DEFAULT: &str = "Microsoft YaHei";
/// Font size in points used when a record type does not set one.
pub const N_FONT_SIZE_DEFAULT: f64 = 9.0;
/// Fill color of the title row (Excel `GREY_25_PERCENT`).
pub const C_TITLE_BG_COLOR: &str = "#C0C0C0";

/// Build default per-kind style presets for the given sheet font.
///
/// Every preset carries the font; title cells are bold, shaded and centered,
/// numeric cells are right aligned, text cells keep the default alignment.
pub fn derive_default_xlsx_formats(
    font_name: &str,
    font_size: f64,
) -> BTreeMap<EnumStyleKind, SpecCellFormat> {
    let cfg_base_fmt_spec = SpecCellFormat {
        font_name: Some(font_name.to_string()),
        font_size: Some(font_size),
        ..Default::default()
    };

    let mut dict_fmt = BTreeMap::new();
    dict_fmt.insert(EnumStyleKind::Text, cfg_base_fmt_spec.clone());
    dict_fmt.insert(
        EnumStyleKind::Title,
        cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            align: Some("center".to_string()),
            bg_color: Some(C_TITLE_BG_COLOR.to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        EnumStyleKind::Numeric,
        cfg_base_fmt_spec.with_(SpecCellFormat {
            align: Some("right".to_string()),
            ..Default::default()
        }),
    );

    dict_fmt
}
