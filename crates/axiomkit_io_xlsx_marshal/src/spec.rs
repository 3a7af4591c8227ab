//! Shared marshaller specification models and top-level error types.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::conf::{C_SHEET_NAME_DEFAULT, N_ROWS_TABLE_GAP};

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification resolved from the style mini-language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,
    /// Strikethrough style.
    pub strike: Option<bool>,
    /// Single underline.
    pub underline: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,
    /// Indentation level.
    pub indent: Option<i64>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color (`#RRGGBB`).
    pub bg_color: Option<String>,
    /// Font color (`#RRGGBB`).
    pub font_color: Option<String>,
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
            italic: other.italic.or(self.italic),
            strike: other.strike.or(self.strike),
            underline: other.underline.or(self.underline),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            indent: other.indent.or(self.indent),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }

    /// Whether no property is set.
    pub fn is_empty(&self) -> bool {
        *self == SpecCellFormat::default()
    }
}

/// Normalized cell value during model population and sink writes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
    /// Date-time value.
    DateTime(NaiveDateTime),
}

impl EnumCellValue {
    /// Whether the value carries a payload.
    pub fn has_value(&self) -> bool {
        !matches!(self, EnumCellValue::None)
    }
}

/// Opaque style handle issued by a sink's style registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleHandle(pub usize);

/// Opaque sheet handle issued by a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SheetHandle(pub usize);

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region LayoutEnums

/// Table orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumOrientation {
    /// Records grow down the sheet, fields grow across.
    #[default]
    Normal,
    /// Records grow across the sheet, fields grow down.
    Inverted,
}

/// Physical sheet axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumAxis {
    /// Sheet row dimension.
    Row,
    /// Sheet column dimension.
    Column,
}

impl EnumAxis {
    /// The other axis.
    pub fn flip(self) -> EnumAxis {
        match self {
            EnumAxis::Row => EnumAxis::Column,
            EnumAxis::Column => EnumAxis::Row,
        }
    }
}

impl EnumOrientation {
    /// Build from an `inverted` flag.
    pub fn from_inverted(if_inverted: bool) -> EnumOrientation {
        if if_inverted {
            EnumOrientation::Inverted
        } else {
            EnumOrientation::Normal
        }
    }

    /// Whether records grow across the sheet.
    pub fn is_inverted(self) -> bool {
        self == EnumOrientation::Inverted
    }

    /// Opposite orientation.
    pub fn invert(self) -> EnumOrientation {
        match self {
            EnumOrientation::Normal => EnumOrientation::Inverted,
            EnumOrientation::Inverted => EnumOrientation::Normal,
        }
    }

    /// Sheet axis advanced once per record / header row.
    pub fn axis_record(self) -> EnumAxis {
        match self {
            EnumOrientation::Normal => EnumAxis::Row,
            EnumOrientation::Inverted => EnumAxis::Column,
        }
    }

    /// Sheet axis advanced once per column.
    pub fn axis_field(self) -> EnumAxis {
        self.axis_record().flip()
    }
}

/// Extent in a table's own frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpecSpan {
    /// Extent along the field axis.
    pub width: usize,
    /// Extent along the record axis.
    pub height: usize,
}

impl SpecSpan {
    /// Swap width and height.
    pub fn swap(self) -> SpecSpan {
        SpecSpan {
            width: self.height,
            height: self.width,
        }
    }

    /// Re-express a span measured in `from` frame in the `to` frame.
    pub fn translate(self, from: EnumOrientation, to: EnumOrientation) -> SpecSpan {
        if from == to { self } else { self.swap() }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DirectiveSpecification

/// Where a style declaration applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnumStyleDestination {
    /// Header label cell.
    Header,
    /// Data cells.
    Cell,
    /// Whole column (width and fallback cell format).
    Column,
}

impl EnumStyleDestination {
    /// Parse the destination prefix used in directive keys.
    pub fn parse(text: &str) -> Option<EnumStyleDestination> {
        match text {
            "header" => Some(EnumStyleDestination::Header),
            "cell" | "" => Some(EnumStyleDestination::Cell),
            "column" => Some(EnumStyleDestination::Column),
            _ => None,
        }
    }
}

/// Style declaration attached to a field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecStyleDeclaration {
    /// Inline definition in the style mini-language.
    pub definition: String,
    /// Named style references, in declaration order.
    pub refs: Vec<String>,
}

impl SpecStyleDeclaration {
    /// Whether the declaration carries neither a definition nor references.
    pub fn is_empty(&self) -> bool {
        self.definition.trim().is_empty() && self.refs.is_empty()
    }
}

/// Per-field layout directive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecDirective {
    /// Display label override.
    pub name: Option<String>,
    /// Destination sheet; on a nested field this detaches a standalone table.
    pub sheet_destination: Option<String>,
    /// Move the destination sheet to the front of the sheet order.
    pub if_place_first: bool,
    /// Drop the field entirely.
    pub if_ignore: bool,
    /// Blank spacer column.
    pub if_blank: bool,
    /// Hide the column when no record carries a value.
    pub if_omit_empty: bool,
    /// Flatten a nested record into the parent band with qualified names.
    pub if_embed: bool,
    /// Nested header shares the parent's header band.
    pub if_inline: bool,
    /// Orientation override; `None` inherits from the parent.
    pub inverted: Option<bool>,
    /// Ordering key override.
    pub position: Option<i64>,
    /// Absolute zero-based start row.
    pub row: Option<usize>,
    /// Absolute zero-based start column.
    pub column: Option<usize>,
    /// Additive row offset.
    pub row_offset: usize,
    /// Additive column offset.
    pub column_offset: usize,
    /// Header cell style declaration.
    pub style_header: Option<SpecStyleDeclaration>,
    /// Data cell style declaration.
    pub style_cell: Option<SpecStyleDeclaration>,
    /// Column style declaration.
    pub style_column: Option<SpecStyleDeclaration>,
}

impl SpecDirective {
    /// Style declaration slot for `destination`.
    pub fn style(&self, destination: EnumStyleDestination) -> Option<&SpecStyleDeclaration> {
        match destination {
            EnumStyleDestination::Header => self.style_header.as_ref(),
            EnumStyleDestination::Cell => self.style_cell.as_ref(),
            EnumStyleDestination::Column => self.style_column.as_ref(),
        }
    }

    /// Mutable style declaration slot for `destination`, created on demand.
    pub fn style_mut(&mut self, destination: EnumStyleDestination) -> &mut SpecStyleDeclaration {
        let slot = match destination {
            EnumStyleDestination::Header => &mut self.style_header,
            EnumStyleDestination::Cell => &mut self.style_cell,
            EnumStyleDestination::Column => &mut self.style_column,
        };
        slot.get_or_insert_with(SpecStyleDeclaration::default)
    }

    /// Orientation after applying the override on top of `parent`.
    pub fn orientation(&self, parent: EnumOrientation) -> EnumOrientation {
        self.inverted
            .map(EnumOrientation::from_inverted)
            .unwrap_or(parent)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region MarshalOptions

/// Marshaller-wide options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecMarshalOptions {
    /// Directive text applied to the root table.
    pub directive_root: String,
    /// Lay the root table out inverted unless the root directive says otherwise.
    pub if_inverted: bool,
    /// Default data cell style definition.
    pub style_default_cell: String,
    /// Default header cell style definition.
    pub style_default_header: String,
    /// Named style definitions addressable through `styleref`.
    pub dict_styles_named: BTreeMap<String, String>,
    /// Blank rows between tables stacked on one sheet.
    pub n_rows_table_gap: usize,
    /// Placeholder sheet a sink starts with.
    pub sheet_name_default: String,
}

impl Default for SpecMarshalOptions {
    fn default() -> Self {
        Self {
            directive_root: String::new(),
            if_inverted: false,
            style_default_cell: String::new(),
            style_default_header: String::new(),
            dict_styles_named: BTreeMap::new(),
            n_rows_table_gap: N_ROWS_TABLE_GAP,
            sheet_name_default: C_SHEET_NAME_DEFAULT.to_string(),
        }
    }
}

impl SpecMarshalOptions {
    /// Register a named style definition.
    pub fn with_named_style(mut self, name: &str, definition: &str) -> Self {
        self.dict_styles_named
            .insert(name.to_string(), definition.to_string());
        self
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Marshal call failure. Every variant is fatal to the call.
#[derive(Debug, Error)]
pub enum MarshalError {
    /// Malformed field annotation.
    #[error("invalid directive on field {field:?}: {message}")]
    DirectiveSyntax {
        /// Offending field name.
        field: String,
        /// Parser message.
        message: String,
    },
    /// Malformed style definition.
    #[error("invalid style definition {definition:?}: {message}")]
    StyleSyntax {
        /// Offending definition text.
        definition: String,
        /// Parser message.
        message: String,
    },
    /// Named style reference missing from the registry.
    #[error("failed to lookup ref style: {0}")]
    UnknownStyleReference(String),
    /// Root value is neither a record nor a collection of records.
    #[error("unsupported root type: {0}")]
    UnsupportedRootType(String),
    /// Output sink failure.
    #[error("sink error: {0}")]
    Sink(String),
}

impl From<rust_xlsxwriter::XlsxError> for MarshalError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        MarshalError::Sink(format!("xlsx write error: {err}"))
    }
}

/// Marshal call result.
pub type MarshalResult<T> = Result<T, MarshalError>;

// #endregion
////////////////////////////////////////////////////////////////////////////////
