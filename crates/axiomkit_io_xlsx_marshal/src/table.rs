//! Table model: the tree of tables and columns mirroring a record shape.
//!
//! A [`Table`] is built once per nesting level from a record schema, then
//! populated from a value tree, then finalized so every column knows whether it
//! is visible and how much grid space it needs. Layout reads the finalized tree.

use crate::cursor::Cursor;
use crate::directive::parse_directive;
use crate::record::{EnumRecordValue, SpecRecordSchema};
use crate::sink::SheetSink;
use crate::spec::{
    EnumCellValue, EnumOrientation, MarshalError, MarshalResult, SpecDirective, SpecSpan,
    StyleHandle,
};
use crate::style::{SpecColumnStyles, Stylizer};

////////////////////////////////////////////////////////////////////////////////
// #region TableModels

/// Header label of one column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecHeaderCell {
    /// Display label.
    pub label: String,
    /// Header style.
    pub style: Option<StyleHandle>,
    /// Where the label landed; set by the header pass.
    pub snapshot: Option<Cursor>,
}

/// One cell of a data row.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCell {
    /// Leaf value.
    Scalar(EnumCellValue),
    /// Rows of a nested table.
    Nested(Vec<Row>),
}

impl EnumCell {
    /// Whether a value exists anywhere beneath this cell.
    pub fn has_value(&self) -> bool {
        match self {
            EnumCell::Scalar(value) => value.has_value(),
            EnumCell::Nested(rows) => rows.iter().any(Row::has_value),
        }
    }
}

/// Data row, index-aligned with the owning table's columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub cells: Vec<EnumCell>,
}

impl Row {
    pub fn has_value(&self) -> bool {
        self.cells.iter().any(EnumCell::has_value)
    }
}

/// One field's projection inside a table.
#[derive(Debug, Clone)]
pub struct Column {
    /// Display label.
    pub name: String,
    /// Ordering key.
    pub position: i64,
    /// Index of the field in the record's value list.
    pub index_field: usize,
    /// Resolved field directive.
    pub directive: SpecDirective,
    /// Resolved styles and dimensions.
    pub styles: SpecColumnStyles,
    /// Nested table for record-valued fields.
    pub table: Option<Box<Table>>,
    /// Nested table moved to its own sheet.
    pub if_detached: bool,
    /// Some record carries a value for this column.
    pub if_has_value: bool,
    /// Takes header/data cells and grid space.
    pub if_visible: bool,
    /// Extent along the owning table's field axis.
    pub size: usize,
    /// Child rows already written (inverted parent, normal child).
    pub n_rows_consumed: usize,
}

impl Column {
    pub fn is_nested(&self) -> bool {
        self.table.is_some()
    }
}

/// Tabular projection of one record type or collection of records.
#[derive(Debug, Clone)]
pub struct Table {
    /// Record type name.
    pub name: String,
    /// Directive of the field (or root) that produced this table.
    pub directive: SpecDirective,
    pub orientation: EnumOrientation,
    /// Header shares the parent's header band.
    pub if_inline: bool,
    /// Table owns its destination sheet.
    pub if_standalone: bool,
    /// Columns sorted by position.
    pub columns: Vec<Column>,
    /// Header cells, index-aligned with `columns`.
    pub header: Vec<SpecHeaderCell>,
    /// Own data rows (root and standalone tables).
    pub rows: Vec<Row>,
    /// Number of data rows; 0 for a single-record table.
    pub cardinality: usize,
    /// Header extent in this table's frame, set by the header pass.
    pub span_header: Option<SpecSpan>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TableBuilding

/// Build the table tree for `schema`.
///
/// `qualifier` prefixes column names with `<qualifier>.` (embedded records).
pub fn build_table(
    schema: &SpecRecordSchema,
    directive: SpecDirective,
    orientation_parent: EnumOrientation,
    qualifier: Option<&str>,
    stylizer: &mut Stylizer,
    sink: &mut dyn SheetSink,
) -> MarshalResult<Table> {
    let orientation = directive.orientation(orientation_parent);
    let mut l_columns = Vec::with_capacity(schema.fields.len());

    for (n_idx, field) in schema.fields.iter().enumerate() {
        let field_directive =
            parse_directive(field.annotation).map_err(|message| MarshalError::DirectiveSyntax {
                field: field.name.to_string(),
                message,
            })?;
        if field_directive.if_ignore {
            continue;
        }

        let c_name = match (&field_directive.name, qualifier) {
            (Some(c_name), _) => c_name.clone(),
            (None, Some(c_qualifier)) => format!("{c_qualifier}.{}", field.name),
            (None, None) => field.name.to_string(),
        };

        let table = match field.kind.schema() {
            Some(schema_child) if !field_directive.if_blank => {
                let c_qualifier = field_directive.if_embed.then_some(c_name.as_str());
                let mut child = build_table(
                    schema_child,
                    field_directive.clone(),
                    orientation,
                    c_qualifier,
                    stylizer,
                    sink,
                )?;
                child.if_inline = field_directive.if_embed || field_directive.if_inline;
                child.if_standalone = field_directive.sheet_destination.is_some();
                Some(Box::new(child))
            }
            _ => None,
        };

        let styles = stylizer.resolve_column(&field_directive, sink)?;
        l_columns.push(Column {
            name: c_name,
            position: field_directive.position.unwrap_or(n_idx as i64),
            index_field: n_idx,
            directive: field_directive,
            styles,
            table,
            if_detached: false,
            if_has_value: false,
            if_visible: true,
            size: 1,
            n_rows_consumed: 0,
        });
    }

    l_columns.sort_by_key(|column| column.position);
    let l_header = l_columns
        .iter()
        .map(|column| SpecHeaderCell {
            label: column.name.clone(),
            style: column.styles.header,
            snapshot: None,
        })
        .collect();

    Ok(Table {
        name: schema.name.to_string(),
        directive,
        orientation,
        if_inline: false,
        if_standalone: false,
        columns: l_columns,
        header: l_header,
        rows: Vec::new(),
        cardinality: 0,
        span_header: None,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TablePopulation

impl Table {
    /// Fill `rows` from a root value: a collection gives one row per element,
    /// a single record gives one row and leaves `cardinality` at 0.
    pub fn populate(&mut self, value: &EnumRecordValue) {
        match value {
            EnumRecordValue::Collection(_) => {
                let l_rows = self.derive_rows(value);
                self.cardinality += l_rows.len();
                self.rows.extend(l_rows);
            }
            EnumRecordValue::Record(_) => {
                let l_rows = self.derive_rows(value);
                self.rows.extend(l_rows);
            }
            EnumRecordValue::Scalar(_) => {}
        }
    }

    /// Rows for one field value; a standalone table keeps them itself.
    fn derive_rows(&mut self, value: &EnumRecordValue) -> Vec<Row> {
        match value {
            EnumRecordValue::Record(l_values) => vec![self.derive_row(l_values)],
            EnumRecordValue::Collection(l_items) => l_items
                .iter()
                .filter_map(|item| match item {
                    EnumRecordValue::Record(l_values) => Some(self.derive_row(l_values)),
                    _ => None,
                })
                .collect(),
            EnumRecordValue::Scalar(_) => Vec::new(),
        }
    }

    fn derive_row(&mut self, l_values: &[EnumRecordValue]) -> Row {
        let value_null = EnumRecordValue::null();
        let mut l_cells = Vec::with_capacity(self.columns.len());

        for column in &mut self.columns {
            let value = l_values.get(column.index_field).unwrap_or(&value_null);
            let cell = match &mut column.table {
                None => match value {
                    EnumRecordValue::Scalar(value) => EnumCell::Scalar(value.clone()),
                    _ => EnumCell::Scalar(EnumCellValue::None),
                },
                Some(child) => {
                    let l_rows = child.derive_rows(value);
                    if child.if_standalone {
                        child.cardinality += l_rows.len();
                        child.rows.extend(l_rows);
                        EnumCell::Nested(Vec::new())
                    } else {
                        EnumCell::Nested(l_rows)
                    }
                }
            };
            column.if_has_value |= match (&cell, &column.table) {
                (EnumCell::Nested(_), Some(child)) if child.if_standalone => {
                    child.rows.iter().any(Row::has_value)
                }
                _ => cell.has_value(),
            };
            l_cells.push(cell);
        }

        Row { cells: l_cells }
    }

    /// Move standalone nested tables out of the tree, depth-first.
    ///
    /// Their columns stay behind as detached, invisible placeholders.
    pub fn take_standalone(&mut self) -> Vec<Table> {
        let mut l_tables = Vec::new();
        for column in &mut self.columns {
            let Some(child) = column.table.as_mut() else {
                continue;
            };
            if !child.if_standalone {
                l_tables.extend(child.take_standalone());
                continue;
            }
            if let Some(mut child) = column.table.take() {
                column.if_detached = true;
                let l_nested = child.take_standalone();
                l_tables.push(*child);
                l_tables.extend(l_nested);
            }
        }
        l_tables
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TableSizing

impl Table {
    /// Compute visibility and sizes over this table's own rows.
    pub fn finalize(&mut self) {
        let l_rows = std::mem::take(&mut self.rows);
        let l_refs: Vec<&Row> = l_rows.iter().collect();
        self.finalize_with(&l_refs);
        self.rows = l_rows;
    }

    /// Compute visibility and sizes given every row this table will render.
    fn finalize_with(&mut self, l_rows: &[&Row]) {
        let orientation = self.orientation;
        for (n_idx, column) in self.columns.iter_mut().enumerate() {
            column.if_visible =
                !column.if_detached && !(column.directive.if_omit_empty && !column.if_has_value);

            let Some(child) = column.table.as_mut() else {
                column.size = 1;
                continue;
            };

            let l_groups: Vec<&[Row]> = l_rows
                .iter()
                .filter_map(|row| match row.cells.get(n_idx) {
                    Some(EnumCell::Nested(l_child_rows)) => Some(l_child_rows.as_slice()),
                    _ => None,
                })
                .collect();
            let l_child_rows: Vec<&Row> = l_groups.iter().copied().flatten().collect();
            child.finalize_with(&l_child_rows);

            column.size = match (orientation, child.orientation) {
                (parent, child_orientation) if parent == child_orientation => {
                    child.leaf_width().max(1)
                }
                (EnumOrientation::Normal, _) => l_groups
                    .iter()
                    .map(|group| child.derive_data_extent(group.iter()))
                    .max()
                    .unwrap_or(0)
                    .max(child.header_depth())
                    .max(1),
                (EnumOrientation::Inverted, _) => {
                    let n_extent_data = child.derive_data_extent(l_child_rows.iter().copied());
                    (child.header_depth() + n_extent_data).max(1)
                }
            };
        }
    }

    /// Header extent along the record axis, as the header pass lays it out.
    pub fn header_depth(&self) -> usize {
        self.columns
            .iter()
            .filter(|column| column.if_visible)
            .map(|column| match column.table.as_deref() {
                None => 1,
                Some(child) => {
                    let n_depth_child = if child.orientation == self.orientation {
                        child.header_depth()
                    } else {
                        child.leaf_width()
                    };
                    n_depth_child + usize::from(!child.if_inline)
                }
            })
            .max()
            .unwrap_or(0)
    }

    /// Extent along the record axis that the data pass gives `rows`.
    pub fn derive_data_extent<'r>(&self, rows: impl IntoIterator<Item = &'r Row>) -> usize {
        rows.into_iter().map(|row| self.derive_row_extent(row)).sum()
    }

    fn derive_row_extent(&self, row: &Row) -> usize {
        let mut n_extent = 1;
        for (n_idx, column) in self.columns.iter().enumerate() {
            if !column.if_visible {
                continue;
            }
            let (Some(child), Some(EnumCell::Nested(l_child_rows))) =
                (column.table.as_deref(), row.cells.get(n_idx))
            else {
                continue;
            };
            let n_extent_child = match (self.orientation, child.orientation) {
                // Laid out beside the header snapshot, not in the row.
                (EnumOrientation::Inverted, EnumOrientation::Normal) => continue,
                (EnumOrientation::Normal, EnumOrientation::Inverted) => child.leaf_width(),
                _ => child.derive_data_extent(l_child_rows),
            };
            n_extent = n_extent.max(n_extent_child);
        }
        n_extent
    }

    /// Sum of `size` over visible columns.
    pub fn leaf_width(&self) -> usize {
        self.columns
            .iter()
            .filter(|column| column.if_visible)
            .map(|column| column.size)
            .sum()
    }

    /// Column by display name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
