//! Record declaration API: typed field accessors and per-type export metadata.

use std::any::Any;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use rust_decimal::Decimal;

use crate::spec::{EnumPresentationKind, FnCellAccessor, SpecColumnMeta, SpecSheetMeta};

////////////////////////////////////////////////////////////////////////////////
// #region CellValue

/// A field value type that can be exported into one cell.
///
/// The presentation kind is a property of the declared type, never of the
/// runtime value.
pub trait CellValue {
    /// Presentation kind of this value type.
    const PRESENTATION: EnumPresentationKind;

    /// Canonical display text, or `None` for an absent value.
    fn to_cell_text(&self) -> Option<String>;
}

macro_rules! impl_cell_value {
    ($kind:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl CellValue for $ty {
                const PRESENTATION: EnumPresentationKind = $kind;

                fn to_cell_text(&self) -> Option<String> {
                    Some(self.to_string())
                }
            }
        )+
    };
}

impl_cell_value!(EnumPresentationKind::Numeric =>
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    Decimal,
);
impl_cell_value!(EnumPresentationKind::Text =>
    String, str, char, bool, NaiveDate, NaiveDateTime, NaiveTime,
);

macro_rules! impl_cell_value_float {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl CellValue for $ty {
                const PRESENTATION: EnumPresentationKind = EnumPresentationKind::Numeric;

                fn to_cell_text(&self) -> Option<String> {
                    Some(derive_float_text(self.to_string(), self.is_finite()))
                }
            }
        )+
    };
}

impl_cell_value_float!(f32, f64);

/// Finite floats keep at least one fractional digit (`20.0`, not `20`).
fn derive_float_text(mut c_text: String, if_finite: bool) -> String {
    if if_finite && !c_text.contains('.') {
        c_text.push_str(".0");
    }
    c_text
}

impl<Tz> CellValue for DateTime<Tz>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    const PRESENTATION: EnumPresentationKind = EnumPresentationKind::Text;

    fn to_cell_text(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl<T: CellValue> CellValue for Option<T> {
    const PRESENTATION: EnumPresentationKind = T::PRESENTATION;

    fn to_cell_text(&self) -> Option<String> {
        self.as_ref().and_then(CellValue::to_cell_text)
    }
}

impl<T: CellValue + ?Sized> CellValue for Box<T> {
    const PRESENTATION: EnumPresentationKind = T::PRESENTATION;

    fn to_cell_text(&self) -> Option<String> {
        (**self).to_cell_text()
    }
}

impl<T: CellValue + ?Sized> CellValue for &T {
    const PRESENTATION: EnumPresentationKind = T::PRESENTATION;

    fn to_cell_text(&self) -> Option<String> {
        (**self).to_cell_text()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FieldDeclaration

/// One declared field of record type `R`.
pub struct SpecRecordField<R> {
    /// Field identifier; the column title when metadata leaves it empty.
    pub name: &'static str,
    /// Column metadata; `None` keeps the field out of the export.
    pub column: Option<SpecColumnMeta>,
    /// Presentation kind of the field's declared type.
    pub presentation: EnumPresentationKind,
    pub(crate) accessor: FnCellAccessor<R>,
}

impl<R: 'static> SpecRecordField<R> {
    /// Declare field `name` read through `getter`.
    ///
    /// ```
    /// use recordkit_io_xlsx::{SpecColumnMeta, SpecRecordField};
    ///
    /// struct Order {
    ///     id: u32,
    /// }
    ///
    /// let field = SpecRecordField::new("id", |r: &Order| &r.id).column(SpecColumnMeta::new(1));
    /// assert_eq!(field.name, "id");
    /// ```
    pub fn new<V, F>(name: &'static str, getter: F) -> Self
    where
        V: CellValue + ?Sized,
        F: Fn(&R) -> &V + Send + Sync + 'static,
    {
        Self {
            name,
            column: None,
            presentation: V::PRESENTATION,
            accessor: Box::new(move |record| getter(record).to_cell_text()),
        }
    }

    /// Attach column metadata, making the field exportable.
    pub fn column(mut self, meta: SpecColumnMeta) -> Self {
        self.column = Some(meta);
        self
    }
}

impl<R> fmt::Debug for SpecRecordField<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecRecordField")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("presentation", &self.presentation)
            .finish_non_exhaustive()
    }
}

/// A record type that can be exported to a sheet.
pub trait XlsxRecord: Sized + 'static {
    /// Sheet metadata; `None` means the type has not opted in to export.
    fn sheet_meta() -> Option<SpecSheetMeta>;

    /// Every declared field, in declaration order.
    fn record_fields() -> Vec<SpecRecordField<Self>>;
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DynamicRecords

/// Type-erased record used in heterogeneous collections.
///
/// A derived record type exposes the record it extends through
/// [`DynRecord::parent_record`], so an exporter bound to the base type
/// accepts it.
pub trait DynRecord: Any {
    /// Self as [`Any`] for downcasting.
    fn as_any(&self) -> &(dyn Any + 'static);

    /// Runtime type name used in diagnostics.
    fn record_type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// The base record this record extends, if any.
    fn parent_record(&self) -> Option<&(dyn DynRecord + 'static)> {
        None
    }
}

/// View `record` as `R`, walking up its parent chain.
pub fn resolve_record_as<'a, R: 'static>(record: &'a dyn DynRecord) -> Option<&'a R> {
    let mut cursor: Option<&'a dyn DynRecord> = Some(record);
    while let Some(current) = cursor {
        if let Some(found) = current.as_any().downcast_ref::<R>() {
            return Some(found);
        }
        cursor = current
            .parent_record()
            .map(|parent| parent as &'a dyn DynRecord);
    }
    None
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
