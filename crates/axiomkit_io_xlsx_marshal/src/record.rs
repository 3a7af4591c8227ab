//! Record introspection: field schemas and value trees.
//!
//! A type becomes marshallable by implementing [`Record`] (usually through
//! the [`record!`](crate::record!) macro). Field types implement
//! [`FieldValue`], which reports the field kind and converts a value into an
//! [`EnumRecordValue`] tree.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::spec::EnumCellValue;

////////////////////////////////////////////////////////////////////////////////
// #region SchemaModels

/// Shape of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumFieldKind {
    /// Text, number or boolean leaf.
    Scalar,
    /// Date/time leaf; laid out like a scalar.
    Temporal,
    /// Single nested record.
    Record(SpecRecordSchema),
    /// Collection of nested records.
    Collection(SpecRecordSchema),
}

impl EnumFieldKind {
    /// Nested record schema, if any.
    pub fn schema(&self) -> Option<&SpecRecordSchema> {
        match self {
            EnumFieldKind::Record(schema) | EnumFieldKind::Collection(schema) => Some(schema),
            EnumFieldKind::Scalar | EnumFieldKind::Temporal => None,
        }
    }

    /// Short label used in error messages.
    pub fn describe(&self) -> String {
        match self {
            EnumFieldKind::Scalar => "scalar".to_string(),
            EnumFieldKind::Temporal => "temporal".to_string(),
            EnumFieldKind::Record(schema) => format!("record {}", schema.name),
            EnumFieldKind::Collection(schema) => format!("collection of {}", schema.name),
        }
    }
}

/// Declared field of a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecFieldSchema {
    /// Field identifier.
    pub name: &'static str,
    /// Raw layout annotation text.
    pub annotation: &'static str,
    /// Field shape.
    pub kind: EnumFieldKind,
}

/// Declared fields of a record type, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecRecordSchema {
    /// Type name.
    pub name: &'static str,
    /// Fields in declaration order.
    pub fields: Vec<SpecFieldSchema>,
}

/// Runtime value tree of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumRecordValue {
    /// Leaf value; `EnumCellValue::None` for null.
    Scalar(EnumCellValue),
    /// Field values of one record, index-aligned with its schema.
    Record(Vec<EnumRecordValue>),
    /// Elements of a record collection.
    Collection(Vec<EnumRecordValue>),
}

impl EnumRecordValue {
    /// Null leaf.
    pub fn null() -> Self {
        EnumRecordValue::Scalar(EnumCellValue::None)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Traits

/// Record type with a static field schema.
pub trait Record {
    /// Field schema in declaration order.
    fn schema() -> SpecRecordSchema;

    /// Field values, index-aligned with [`Record::schema`].
    fn values(&self) -> Vec<EnumRecordValue>;
}

/// Field type that can be projected onto the grid.
pub trait FieldValue {
    /// Field shape.
    fn kind() -> EnumFieldKind;

    /// Value tree of `self`.
    fn to_value(&self) -> EnumRecordValue;
}

macro_rules! impl_field_value_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn kind() -> EnumFieldKind {
                    EnumFieldKind::Scalar
                }

                fn to_value(&self) -> EnumRecordValue {
                    EnumRecordValue::Scalar(EnumCellValue::Number(*self as f64))
                }
            }
        )*
    };
}

impl_field_value_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl FieldValue for bool {
    fn kind() -> EnumFieldKind {
        EnumFieldKind::Scalar
    }

    fn to_value(&self) -> EnumRecordValue {
        EnumRecordValue::Scalar(EnumCellValue::Boolean(*self))
    }
}

impl FieldValue for String {
    fn kind() -> EnumFieldKind {
        EnumFieldKind::Scalar
    }

    fn to_value(&self) -> EnumRecordValue {
        EnumRecordValue::Scalar(EnumCellValue::String(self.clone()))
    }
}

impl FieldValue for char {
    fn kind() -> EnumFieldKind {
        EnumFieldKind::Scalar
    }

    fn to_value(&self) -> EnumRecordValue {
        EnumRecordValue::Scalar(EnumCellValue::String(self.to_string()))
    }
}

/// Spacer field with no value; pairs with the `blank` directive.
impl FieldValue for () {
    fn kind() -> EnumFieldKind {
        EnumFieldKind::Scalar
    }

    fn to_value(&self) -> EnumRecordValue {
        EnumRecordValue::null()
    }
}

impl FieldValue for NaiveDateTime {
    fn kind() -> EnumFieldKind {
        EnumFieldKind::Temporal
    }

    fn to_value(&self) -> EnumRecordValue {
        EnumRecordValue::Scalar(EnumCellValue::DateTime(*self))
    }
}

impl FieldValue for NaiveDate {
    fn kind() -> EnumFieldKind {
        EnumFieldKind::Temporal
    }

    fn to_value(&self) -> EnumRecordValue {
        EnumRecordValue::Scalar(EnumCellValue::DateTime(
            self.and_time(chrono::NaiveTime::MIN),
        ))
    }
}

impl FieldValue for DateTime<Utc> {
    fn kind() -> EnumFieldKind {
        EnumFieldKind::Temporal
    }

    fn to_value(&self) -> EnumRecordValue {
        EnumRecordValue::Scalar(EnumCellValue::DateTime(self.naive_utc()))
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn kind() -> EnumFieldKind {
        T::kind()
    }

    fn to_value(&self) -> EnumRecordValue {
        match self {
            Some(value) => value.to_value(),
            None => EnumRecordValue::null(),
        }
    }
}

impl<T: Record> FieldValue for [T] {
    fn kind() -> EnumFieldKind {
        EnumFieldKind::Collection(T::schema())
    }

    fn to_value(&self) -> EnumRecordValue {
        EnumRecordValue::Collection(
            self.iter()
                .map(|item| EnumRecordValue::Record(item.values()))
                .collect(),
        )
    }
}

impl<T: Record> FieldValue for Vec<T> {
    fn kind() -> EnumFieldKind {
        <[T] as FieldValue>::kind()
    }

    fn to_value(&self) -> EnumRecordValue {
        self.as_slice().to_value()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RecordMacro

/// Declare a struct and derive [`Record`](crate::record::Record) and
/// [`FieldValue`](crate::record::FieldValue) for it.
///
/// Fields may carry one `#[xls = "..."]` layout annotation.
///
/// ```
/// use axiomkit_io_xlsx_marshal::record;
///
/// record! {
///     #[derive(Debug, Clone)]
///     pub struct Item {
///         #[xls = "name=ID"]
///         pub id: i64,
///         pub name: String,
///         #[xls = "-"]
///         pub internal: bool,
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[xls = $tag:literal])?
                $fvis:vis $field:ident : $fty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($fvis $field: $fty),*
        }

        impl $crate::record::Record for $name {
            fn schema() -> $crate::record::SpecRecordSchema {
                $crate::record::SpecRecordSchema {
                    name: ::core::stringify!($name),
                    fields: ::std::vec![
                        $(
                            $crate::record::SpecFieldSchema {
                                name: ::core::stringify!($field),
                                annotation: ::core::concat!("" $(, $tag)?),
                                kind: <$fty as $crate::record::FieldValue>::kind(),
                            }
                        ),*
                    ],
                }
            }

            fn values(&self) -> ::std::vec::Vec<$crate::record::EnumRecordValue> {
                ::std::vec![
                    $($crate::record::FieldValue::to_value(&self.$field)),*
                ]
            }
        }

        impl $crate::record::FieldValue for $name {
            fn kind() -> $crate::record::EnumFieldKind {
                $crate::record::EnumFieldKind::Record(
                    <$name as $crate::record::Record>::schema(),
                )
            }

            fn to_value(&self) -> $crate::record::EnumRecordValue {
                $crate::record::EnumRecordValue::Record(
                    <$name as $crate::record::Record>::values(self),
                )
            }
        }
    };
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    crate::record! {
        struct Line {
            #[xls = "name=Qty"]
            qty: u32,
            note: Option<String>,
        }
    }

    crate::record! {
        struct Order {
            id: i64,
            #[xls = "inverted"]
            lines: Vec<Line>,
            when: Option<NaiveDate>,
        }
    }

    #[test]
    fn test_record_macro_builds_schema() {
        let schema = Order::schema();
        assert_eq!(schema.name, "Order");
        let l_names: Vec<_> = schema.fields.iter().map(|field| field.name).collect();
        assert_eq!(l_names, vec!["id", "lines", "when"]);
        assert_eq!(schema.fields[0].annotation, "");
        assert_eq!(schema.fields[1].annotation, "inverted");
        assert_eq!(schema.fields[2].kind, EnumFieldKind::Temporal);

        let Some(line_schema) = schema.fields[1].kind.schema() else {
            panic!("lines should be nested");
        };
        assert_eq!(line_schema.fields[0].annotation, "name=Qty");
        assert_eq!(schema.fields[1].kind.describe(), "collection of Line");
    }

    #[test]
    fn test_record_values_follow_declaration_order() {
        let order = Order {
            id: 7,
            lines: vec![Line {
                qty: 3,
                note: None,
            }],
            when: NaiveDate::from_ymd_opt(2024, 5, 1),
        };

        let values = order.values();
        assert_eq!(values[0], EnumRecordValue::Scalar(EnumCellValue::Number(7.0)));
        assert_eq!(
            values[1],
            EnumRecordValue::Collection(vec![EnumRecordValue::Record(vec![
                EnumRecordValue::Scalar(EnumCellValue::Number(3.0)),
                EnumRecordValue::null(),
            ])])
        );
        assert!(matches!(
            values[2],
            EnumRecordValue::Scalar(EnumCellValue::DateTime(_))
        ));
        assert_eq!(<Vec<Order> as FieldValue>::kind().describe(), "collection of Order");
    }
}
