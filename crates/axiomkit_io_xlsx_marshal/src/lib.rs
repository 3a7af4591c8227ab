//! `axiomkit_io_xlsx_marshal` v1:
//! Record-to-grid XLSX marshaller.
//!
//! Nested records are projected onto styled sheet cells, honoring per-field
//! layout annotations (names, positions, offsets, orientation, styles).
//!
//! Modules:
//! - `conf`      : constants and default presets
//! - `spec`      : specs/models/options/errors
//! - `util`      : pure helper functions
//! - `cursor`    : grid cursor and column-letter codec
//! - `directive` : field annotation parser
//! - `style`     : style mini-language and style registry
//! - `record`    : record introspection traits and `record!` macro
//! - `table`     : table model builder
//! - `layout`    : grid layout and transfer engine
//! - `session`   : worksheet session
//! - `sink`      : sink contract and in-memory sink
//! - `writer`    : `rust_xlsxwriter`-backed sink
//! - `marshal`   : public entry point
pub mod conf;
pub mod cursor;
pub mod directive;
pub mod layout;
pub mod marshal;
pub mod record;
pub mod session;
pub mod sink;
pub mod spec;
pub mod style;
pub mod table;
pub mod util;
pub mod writer;

pub use conf::{
    C_SHEET_NAME_DEFAULT, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL, derive_default_marshal_options,
};
pub use cursor::{Cursor, decode_column_letters, encode_column_letters};
pub use directive::parse_directive;
pub use marshal::Marshaller;
pub use record::{
    EnumFieldKind, EnumRecordValue, FieldValue, Record, SpecFieldSchema, SpecRecordSchema,
};
pub use sink::{MemorySheet, MemorySink, SheetSink};
pub use spec::{
    EnumAxis, EnumCellValue, EnumOrientation, EnumStyleDestination, MarshalError, MarshalResult,
    SheetHandle, SpecCellFormat, SpecDirective, SpecMarshalOptions, SpecSpan,
    SpecStyleDeclaration, StyleHandle,
};
pub use style::{Stylizer, normalize_style_definition, parse_style_definition};
pub use writer::XlsxSink;
