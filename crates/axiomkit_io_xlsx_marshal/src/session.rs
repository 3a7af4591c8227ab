//! Worksheet session: sheet ordering, lazy materialization and finalization.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, trace};

use crate::cursor::Cursor;
use crate::layout::transfer_table;
use crate::sink::SheetSink;
use crate::spec::{EnumCellValue, MarshalResult, SheetHandle, SpecMarshalOptions, StyleHandle};
use crate::table::Table;

////////////////////////////////////////////////////////////////////////////////
// #region SheetWriter

/// Writes into one sheet, creating it in the sink on first use.
pub struct SheetWriter<'s> {
    sink: &'s mut dyn SheetSink,
    name: String,
    handle: Option<SheetHandle>,
}

impl<'s> SheetWriter<'s> {
    pub fn new(sink: &'s mut dyn SheetSink, name: &str) -> Self {
        Self {
            sink,
            name: name.to_string(),
            handle: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sink handle, if the sheet was materialized.
    pub fn handle(&self) -> Option<SheetHandle> {
        self.handle
    }

    fn ensure_sheet(&mut self) -> MarshalResult<SheetHandle> {
        if let Some(handle) = self.handle {
            return Ok(handle);
        }
        let handle = self.sink.new_sheet(&self.name)?;
        debug!(sheet = %self.name, "materialized sheet");
        self.handle = Some(handle);
        Ok(handle)
    }

    pub fn write_value(&mut self, cursor: Cursor, value: &EnumCellValue) -> MarshalResult<()> {
        let handle = self.ensure_sheet()?;
        self.sink.set_cell_value(handle, cursor, value)
    }

    /// Style `first..=last`; no-op without a style.
    pub fn write_style(
        &mut self,
        first: Cursor,
        last: Cursor,
        style: Option<StyleHandle>,
    ) -> MarshalResult<()> {
        let Some(style) = style else {
            return Ok(());
        };
        let handle = self.ensure_sheet()?;
        self.sink.set_cell_style(handle, first, last, style)
    }

    /// Merge `first..=last`; single cells are left alone.
    pub fn merge(&mut self, first: Cursor, last: Cursor) -> MarshalResult<()> {
        if first == last {
            return Ok(());
        }
        let handle = self.ensure_sheet()?;
        trace!(sheet = %self.name, range = %format!("{first}:{last}"), "merge cells");
        self.sink.merge_cells(handle, first, last)
    }

    pub fn set_column_width(&mut self, col: usize, width: Option<f64>) -> MarshalResult<()> {
        let Some(width) = width else {
            return Ok(());
        };
        let handle = self.ensure_sheet()?;
        self.sink.set_column_width(handle, col, col, width)
    }

    pub fn set_row_height(&mut self, row: usize, height: Option<f64>) -> MarshalResult<()> {
        let Some(height) = height else {
            return Ok(());
        };
        let handle = self.ensure_sheet()?;
        self.sink.set_row_height(handle, row, height)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WorksheetSession

#[derive(Default)]
struct SpecSheetRegistry {
    l_order: Vec<String>,
    dict_tables: BTreeMap<String, Vec<Table>>,
}

/// Groups top-level tables by destination sheet and lays them out.
pub struct WorksheetSession<'a> {
    sink: &'a mut dyn SheetSink,
    registry: Mutex<SpecSheetRegistry>,
    sheet_name_default: String,
    n_rows_table_gap: usize,
}

impl<'a> WorksheetSession<'a> {
    pub fn new(sink: &'a mut dyn SheetSink, options: &SpecMarshalOptions) -> Self {
        Self {
            sink,
            registry: Mutex::new(SpecSheetRegistry::default()),
            sheet_name_default: options.sheet_name_default.clone(),
            n_rows_table_gap: options.n_rows_table_gap,
        }
    }

    /// Register a sheet slot; `if_place_first` moves it to the front.
    pub fn get_or_create_sheet(&self, name: &str, if_place_first: bool) -> String {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        if !registry.dict_tables.contains_key(name) {
            registry.dict_tables.insert(name.to_string(), Vec::new());
            registry.l_order.push(name.to_string());
        }
        if if_place_first && let Some(n_idx) = registry.l_order.iter().position(|c| c == name) {
            let c_name = registry.l_order.remove(n_idx);
            registry.l_order.insert(0, c_name);
        }
        name.to_string()
    }

    /// Queue a top-level table on its destination sheet.
    pub fn assign_table(&self, table: Table) {
        let c_sheet = table
            .directive
            .sheet_destination
            .clone()
            .unwrap_or_else(|| self.sheet_name_default.clone());
        let c_sheet = self.get_or_create_sheet(&c_sheet, table.directive.if_place_first);
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.dict_tables.entry(c_sheet).or_default().push(table);
    }

    /// Sheet names in final order.
    pub fn sheet_order(&self) -> Vec<String> {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .l_order
            .clone()
    }

    /// Lay out every sheet, then drop the unused placeholder and activate the
    /// first materialized sheet.
    pub fn transfer(self) -> MarshalResult<()> {
        let mut registry = self
            .registry
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let sink = self.sink;
        let mut l_materialized: Vec<(String, SheetHandle)> = Vec::new();

        for c_sheet in &registry.l_order {
            let l_tables = registry.dict_tables.remove(c_sheet).unwrap_or_default();
            let mut writer = SheetWriter::new(&mut *sink, c_sheet);
            let mut base = Cursor::default();
            for mut table in l_tables {
                let end = transfer_table(&mut table, base, &mut writer)?;
                debug!(
                    sheet = %c_sheet,
                    table = %table.name,
                    rows = table.rows.len(),
                    end = %end,
                    "transferred table"
                );
                base = Cursor::new(end.row + self.n_rows_table_gap, 0);
            }
            if let Some(handle) = writer.handle() {
                l_materialized.push((c_sheet.clone(), handle));
            }
        }

        let c_placeholder = sink.placeholder_sheet_name().to_string();
        let if_placeholder_used = l_materialized
            .iter()
            .any(|(c_sheet, _)| *c_sheet == c_placeholder);
        if !if_placeholder_used && !l_materialized.is_empty() {
            sink.delete_sheet(&c_placeholder)?;
            debug!(sheet = %c_placeholder, "deleted unused placeholder sheet");
        }
        if let Some((_, handle)) = l_materialized.first() {
            sink.set_active_sheet(*handle)?;
        }
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    #[test]
    fn test_get_or_create_sheet_orders_and_places_first() {
        let mut sink = MemorySink::new();
        let session = WorksheetSession::new(&mut sink, &SpecMarshalOptions::default());
        session.get_or_create_sheet("a", false);
        session.get_or_create_sheet("b", false);
        session.get_or_create_sheet("a", false);
        assert_eq!(session.sheet_order(), vec!["a".to_string(), "b".to_string()]);

        session.get_or_create_sheet("b", true);
        session.get_or_create_sheet("b", true);
        assert_eq!(session.sheet_order(), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_sheet_writer_materializes_once_and_skips_single_merge() {
        let mut sink = MemorySink::new();
        {
            let mut writer = SheetWriter::new(&mut sink, "Data");
            assert_eq!(writer.handle(), None);
            writer.merge(Cursor::new(0, 0), Cursor::new(0, 0)).unwrap();
            writer.write_style(Cursor::new(0, 0), Cursor::new(0, 0), None).unwrap();
            assert_eq!(writer.handle(), None);

            writer
                .write_value(Cursor::new(0, 0), &EnumCellValue::Boolean(true))
                .unwrap();
            writer.merge(Cursor::new(0, 0), Cursor::new(1, 0)).unwrap();
            assert!(writer.handle().is_some());
        }
        assert_eq!(sink.sheet_names(), vec!["Sheet1".to_string(), "Data".to_string()]);
        let sheet = sink.sheet("Data").unwrap();
        assert_eq!(sheet.text("A1").as_deref(), Some("true"));
        assert_eq!(sheet.merges(), vec!["A1:A2".to_string()]);
    }

    #[test]
    fn test_transfer_without_output_keeps_placeholder() {
        let mut sink = MemorySink::new();
        let session = WorksheetSession::new(&mut sink, &SpecMarshalOptions::default());
        session.get_or_create_sheet("Empty", false);
        session.transfer().unwrap();
        assert_eq!(sink.sheet_names(), vec!["Sheet1".to_string()]);
        assert_eq!(sink.active_sheet_name(), Some("Sheet1"));
    }
}
