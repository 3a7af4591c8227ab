//! Public marshalling entry point.

use std::path::Path;

use tracing::debug;

use crate::directive::parse_directive;
use crate::record::{EnumFieldKind, FieldValue};
use crate::session::WorksheetSession;
use crate::sink::SheetSink;
use crate::spec::{EnumOrientation, MarshalError, MarshalResult, SpecMarshalOptions};
use crate::style::Stylizer;
use crate::table::build_table;
use crate::writer::XlsxSink;

/// Projects records onto spreadsheet sheets.
///
/// A `Marshaller` holds only options; every call builds its own style
/// registry, table tree and session.
#[derive(Debug, Clone, Default)]
pub struct Marshaller {
    options: SpecMarshalOptions,
}

impl Marshaller {
    pub fn new(options: SpecMarshalOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SpecMarshalOptions {
        &self.options
    }

    /// Marshal `value` into `.xlsx` bytes.
    pub fn marshal<T: FieldValue + ?Sized>(&self, value: &T) -> MarshalResult<Vec<u8>> {
        let mut sink = XlsxSink::new();
        self.marshal_into(value, &mut sink)?;
        sink.save_to_buffer()
    }

    /// Marshal `value` into an `.xlsx` file at `path`.
    pub fn marshal_to_path<T: FieldValue + ?Sized, P: AsRef<Path>>(
        &self,
        value: &T,
        path: P,
    ) -> MarshalResult<()> {
        let mut sink = XlsxSink::new();
        self.marshal_into(value, &mut sink)?;
        sink.save(path)
    }

    /// Marshal `value` into any sink.
    ///
    /// `value` must be a record or a collection of records. Directive, style
    /// and sink errors abort the call.
    pub fn marshal_into<T: FieldValue + ?Sized>(
        &self,
        value: &T,
        sink: &mut dyn SheetSink,
    ) -> MarshalResult<()> {
        let schema = match T::kind() {
            EnumFieldKind::Record(schema) | EnumFieldKind::Collection(schema) => schema,
            kind => return Err(MarshalError::UnsupportedRootType(kind.describe())),
        };

        let mut directive = parse_directive(&self.options.directive_root).map_err(|message| {
            MarshalError::DirectiveSyntax {
                field: schema.name.to_string(),
                message,
            }
        })?;
        if self.options.if_inverted && directive.inverted.is_none() {
            directive.inverted = Some(true);
        }

        let mut stylizer = Stylizer::new(&self.options);
        let mut table = build_table(
            &schema,
            directive,
            EnumOrientation::Normal,
            None,
            &mut stylizer,
            sink,
        )?;
        table.populate(&value.to_value());

        let mut l_standalone = table.take_standalone();
        table.finalize();
        for table_standalone in &mut l_standalone {
            table_standalone.finalize();
        }
        debug!(
            root = %table.name,
            rows = table.rows.len(),
            standalone = l_standalone.len(),
            "built table tree"
        );

        let session = WorksheetSession::new(sink, &self.options);
        session.assign_table(table);
        for table_standalone in l_standalone {
            session.assign_table(table_standalone);
        }
        session.transfer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    crate::record! {
        struct Pair {
            id: i64,
            name: String,
        }
    }

    #[test]
    fn test_marshal_into_rejects_scalar_root() {
        let mut sink = MemorySink::new();
        let err = Marshaller::default()
            .marshal_into(&42i64, &mut sink)
            .unwrap_err();
        assert!(matches!(err, MarshalError::UnsupportedRootType(c_kind) if c_kind == "scalar"));
        assert_eq!(sink.sheet_names(), vec!["Sheet1".to_string()]);
    }

    #[test]
    fn test_marshal_into_reports_root_directive_errors() {
        let mut sink = MemorySink::new();
        let marshaller = Marshaller::new(SpecMarshalOptions {
            directive_root: "rowoffset=x".to_string(),
            ..Default::default()
        });
        let err = marshaller
            .marshal_into(&vec![Pair { id: 1, name: "a".to_string() }], &mut sink)
            .unwrap_err();
        assert!(matches!(err, MarshalError::DirectiveSyntax { field, .. } if field == "Pair"));
    }

    #[test]
    fn test_marshal_into_uses_placeholder_sheet_by_default() {
        let mut sink = MemorySink::new();
        Marshaller::default()
            .marshal_into(&vec![Pair { id: 1, name: "a".to_string() }], &mut sink)
            .unwrap();
        assert_eq!(sink.sheet_names(), vec!["Sheet1".to_string()]);
        let sheet = sink.sheet("Sheet1").unwrap();
        assert_eq!(sheet.text("A1").as_deref(), Some("id"));
        assert_eq!(sheet.text("B2").as_deref(), Some("a"));
    }

    #[test]
    fn test_marshal_produces_xlsx_bytes() {
        let v_bytes = Marshaller::default()
            .marshal(&vec![Pair { id: 1, name: "a".to_string() }])
            .unwrap();
        assert!(v_bytes.starts_with(b"PK"));
    }
}
