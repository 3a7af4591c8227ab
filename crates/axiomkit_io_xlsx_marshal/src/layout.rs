//! Grid layout and transfer engine.
//!
//! Spans are measured in the frame of the table being laid out: `width` runs
//! along its field axis, `height` along its record axis. A span crossing into
//! a table of the other orientation is swapped before use.

use crate::cursor::Cursor;
use crate::session::SheetWriter;
use crate::spec::{EnumCellValue, EnumOrientation, MarshalResult, SpecSpan};
use crate::table::{EnumCell, Row, Table};

/// Write header labels, merges and column dimensions; return the header span.
pub fn transfer_header(
    table: &mut Table,
    origin: Cursor,
    writer: &mut SheetWriter<'_>,
) -> MarshalResult<SpecSpan> {
    let orientation = table.orientation;
    let axis_record = orientation.axis_record();
    let axis_field = orientation.axis_field();

    let mut cursor = origin;
    let mut n_width = 0usize;
    let mut n_height = 0usize;

    for (column, header_cell) in table.columns.iter_mut().zip(table.header.iter_mut()) {
        if !column.if_visible {
            continue;
        }
        header_cell.snapshot = Some(cursor);
        let c_label = EnumCellValue::String(header_cell.label.clone());

        let n_height_block = match column.table.as_deref_mut() {
            None => {
                if !column.directive.if_blank {
                    writer.write_value(cursor, &c_label)?;
                    writer.write_style(cursor, cursor, header_cell.style)?;
                }
                writer.set_column_width(cursor.col, column.styles.width)?;
                writer.set_row_height(cursor.row, column.styles.header_height)?;
                1
            }
            Some(child) => {
                let if_inline = child.if_inline;
                if !if_inline {
                    writer.write_value(cursor, &c_label)?;
                    writer.write_style(cursor, cursor, header_cell.style)?;
                }
                let origin_child = if if_inline {
                    cursor
                } else {
                    cursor.shifted(1, axis_record)
                };
                let span_child = transfer_header(child, origin_child, writer)?
                    .translate(child.orientation, orientation);

                if child.orientation == orientation && !if_inline && column.size > 1 {
                    let last = cursor.shifted(column.size - 1, axis_field);
                    writer.merge(cursor, last)?;
                    writer.write_style(cursor, last, header_cell.style)?;
                }
                span_child.height + usize::from(!if_inline)
            }
        };

        n_height = n_height.max(n_height_block);
        n_width += column.size;
        cursor.inc(column.size, axis_field);
    }

    if n_height > 1 {
        for (column, header_cell) in table.columns.iter().zip(table.header.iter()) {
            if !column.if_visible || column.is_nested() || column.directive.if_blank {
                continue;
            }
            let Some(first) = header_cell.snapshot else {
                continue;
            };
            let last = first.shifted(n_height - 1, axis_record);
            writer.merge(first, last)?;
            writer.write_style(first, last, header_cell.style)?;
        }
    }

    let span = SpecSpan {
        width: n_width,
        height: n_height,
    };
    table.span_header = Some(span);
    Ok(span)
}

/// Write data rows starting at `origin`; return the data span.
///
/// `rows` belong to `table` but live outside it (in the parent's cells, or
/// temporarily taken out of a top-level table).
pub fn transfer_data(
    table: &mut Table,
    rows: &[Row],
    origin: Cursor,
    writer: &mut SheetWriter<'_>,
) -> MarshalResult<SpecSpan> {
    let orientation = table.orientation;
    let axis_record = orientation.axis_record();
    let axis_field = orientation.axis_field();

    let mut cursor = origin;
    let mut n_height_total = 0usize;

    for row in rows {
        let mut n_height_row = 1usize;
        let mut cursor_field = cursor;

        for (n_idx, column) in table.columns.iter_mut().enumerate() {
            if !column.if_visible {
                continue;
            }
            match (column.table.as_deref_mut(), row.cells.get(n_idx)) {
                (None, Some(EnumCell::Scalar(value))) => {
                    let if_skip = column.directive.if_blank
                        || (column.directive.if_omit_empty && !value.has_value());
                    if !if_skip {
                        if value.has_value() {
                            writer.write_value(cursor_field, value)?;
                        }
                        writer.write_style(cursor_field, cursor_field, column.styles.cell)?;
                        writer.set_row_height(cursor_field.row, column.styles.height)?;
                    }
                }
                (Some(child), Some(EnumCell::Nested(l_child_rows))) => {
                    match (orientation, child.orientation) {
                        (EnumOrientation::Inverted, EnumOrientation::Normal) => {
                            let snapshot = table.header[n_idx].snapshot.unwrap_or(cursor_field);
                            let n_height_header = child
                                .span_header
                                .map(|span| span.height)
                                .unwrap_or_else(|| child.header_depth());
                            let anchor = snapshot.shifted(1, axis_record).shifted(
                                n_height_header + column.n_rows_consumed,
                                child.orientation.axis_record(),
                            );
                            let span = transfer_data(child, l_child_rows, anchor, writer)?;
                            column.n_rows_consumed += span.height;
                        }
                        (parent, child_orientation) => {
                            let span = transfer_data(child, l_child_rows, cursor_field, writer)?
                                .translate(child_orientation, parent);
                            n_height_row = n_height_row.max(span.height);
                        }
                    }
                }
                _ => {}
            }
            cursor_field.inc(column.size, axis_field);
        }

        cursor.inc(n_height_row, axis_record);
        n_height_total += n_height_row;
    }

    Ok(SpecSpan {
        width: table.leaf_width(),
        height: n_height_total,
    })
}

/// Lay out one top-level table at `base`; return the exclusive bottom-right
/// corner of the occupied sheet region.
pub fn transfer_table(
    table: &mut Table,
    base: Cursor,
    writer: &mut SheetWriter<'_>,
) -> MarshalResult<Cursor> {
    let mut origin = base;
    table.directive.adjust(&mut origin);

    let span_header = transfer_header(table, origin, writer)?;
    let origin_data = origin.shifted(span_header.height, table.orientation.axis_record());

    let l_rows = std::mem::take(&mut table.rows);
    let result = transfer_data(table, &l_rows, origin_data, writer);
    table.rows = l_rows;
    let span_data = result?;

    let span = SpecSpan {
        width: span_header.width.max(span_data.width),
        height: span_header.height + span_data.height,
    };
    let span_sheet = span.translate(table.orientation, EnumOrientation::Normal);
    Ok(Cursor::new(
        origin.row + span_sheet.height,
        origin.col + span_sheet.width,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldValue, Record};
    use crate::sink::MemorySink;
    use crate::spec::{SpecDirective, SpecMarshalOptions};
    use crate::style::Stylizer;
    use crate::table::build_table;

    crate::record! {
        struct Leaf {
            seq: i64,
            product: String,
        }
    }

    crate::record! {
        struct Parent {
            id: i64,
            items: Vec<Leaf>,
        }
    }

    fn derive_table<T: Record + FieldValue>(value: &[T], sink: &mut MemorySink) -> Table {
        let mut stylizer = Stylizer::new(&SpecMarshalOptions::default());
        let mut table = build_table(
            &T::schema(),
            SpecDirective::default(),
            EnumOrientation::Normal,
            None,
            &mut stylizer,
            sink,
        )
        .unwrap();
        table.populate(&value.to_value());
        table.finalize();
        table
    }

    #[test]
    fn test_transfer_header_merges_nested_label_and_shallow_cells() {
        let mut sink = MemorySink::new();
        let mut table = derive_table::<Parent>(&[], &mut sink);
        {
            let mut writer = SheetWriter::new(&mut sink, "S");
            let span = transfer_header(&mut table, Cursor::default(), &mut writer).unwrap();
            assert_eq!(
                span,
                SpecSpan {
                    width: 3,
                    height: 2
                }
            );
        }
        let sheet = sink.sheet("S").unwrap();
        assert_eq!(sheet.text("A1").as_deref(), Some("id"));
        assert_eq!(sheet.text("B1").as_deref(), Some("items"));
        assert_eq!(sheet.text("B2").as_deref(), Some("seq"));
        assert_eq!(sheet.text("C2").as_deref(), Some("product"));
        assert_eq!(sheet.merges(), vec!["B1:C1".to_string(), "A1:A2".to_string()]);
        assert_eq!(table.header[1].snapshot, Some(Cursor::new(0, 1)));
    }

    #[test]
    fn test_transfer_table_expands_nested_rows() {
        let mut sink = MemorySink::new();
        let l_parents = vec![
            Parent {
                id: 1,
                items: vec![
                    Leaf {
                        seq: 1,
                        product: "a".to_string(),
                    },
                    Leaf {
                        seq: 2,
                        product: "b".to_string(),
                    },
                ],
            },
            Parent {
                id: 2,
                items: Vec::new(),
            },
        ];
        let mut table = derive_table(&l_parents, &mut sink);
        let end = {
            let mut writer = SheetWriter::new(&mut sink, "S");
            transfer_table(&mut table, Cursor::default(), &mut writer).unwrap()
        };
        assert_eq!(end, Cursor::new(5, 3));

        let sheet = sink.sheet("S").unwrap();
        assert_eq!(sheet.text("A3").as_deref(), Some("1"));
        assert_eq!(sheet.text("C4").as_deref(), Some("b"));
        assert_eq!(sheet.text("A5").as_deref(), Some("2"));
        assert_eq!(sheet.text("B5"), None);
        assert_eq!(table.rows.len(), 2);
    }
}
