//! Output sink contract and an in-memory sink.
//!
//! The layout engine only talks to [`SheetSink`]. [`crate::writer::XlsxSink`]
//! turns the calls into a workbook; [`MemorySink`] keeps them for inspection.

use std::collections::BTreeMap;

use crate::conf::C_SHEET_NAME_DEFAULT;
use crate::cursor::Cursor;
use crate::spec::{
    EnumCellValue, MarshalError, MarshalResult, SheetHandle, SpecCellFormat, StyleHandle,
};
use crate::util::convert_number_to_text;

/// Spreadsheet document operations consumed by the layout engine.
///
/// Every sink starts with a placeholder sheet named by
/// [`SheetSink::placeholder_sheet_name`]; `new_sheet` with an existing name
/// returns the existing sheet.
pub trait SheetSink {
    /// Name of the sheet the sink was created with.
    fn placeholder_sheet_name(&self) -> &str {
        C_SHEET_NAME_DEFAULT
    }

    /// Create (or look up) a sheet by name.
    fn new_sheet(&mut self, name: &str) -> MarshalResult<SheetHandle>;

    /// Write a typed value at `cursor`.
    fn set_cell_value(
        &mut self,
        sheet: SheetHandle,
        cursor: Cursor,
        value: &EnumCellValue,
    ) -> MarshalResult<()>;

    /// Apply a registered style to the inclusive rectangle `first..=last`.
    fn set_cell_style(
        &mut self,
        sheet: SheetHandle,
        first: Cursor,
        last: Cursor,
        style: StyleHandle,
    ) -> MarshalResult<()>;

    /// Merge the inclusive rectangle `first..=last`.
    fn merge_cells(&mut self, sheet: SheetHandle, first: Cursor, last: Cursor)
    -> MarshalResult<()>;

    /// Set the width of columns `first_col..=last_col`.
    fn set_column_width(
        &mut self,
        sheet: SheetHandle,
        first_col: usize,
        last_col: usize,
        width: f64,
    ) -> MarshalResult<()>;

    /// Set the height of one row.
    fn set_row_height(&mut self, sheet: SheetHandle, row: usize, height: f64)
    -> MarshalResult<()>;

    /// Delete a sheet by name; a missing sheet is a no-op.
    fn delete_sheet(&mut self, name: &str) -> MarshalResult<()>;

    /// Make `sheet` the active sheet.
    fn set_active_sheet(&mut self, sheet: SheetHandle) -> MarshalResult<()>;

    /// Register a cell format and return its handle.
    fn register_style(&mut self, format: &SpecCellFormat) -> MarshalResult<StyleHandle>;
}

////////////////////////////////////////////////////////////////////////////////
// #region MemorySink

/// One recorded cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecMemoryCell {
    /// Last written value.
    pub value: EnumCellValue,
    /// Last applied style.
    pub style: Option<StyleHandle>,
}

/// One recorded sheet.
#[derive(Debug, Clone, Default)]
pub struct MemorySheet {
    name: String,
    dict_cells: BTreeMap<Cursor, SpecMemoryCell>,
    l_merges: Vec<(Cursor, Cursor)>,
    dict_widths: BTreeMap<usize, f64>,
    dict_heights: BTreeMap<usize, f64>,
    if_deleted: bool,
}

impl MemorySheet {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recorded cell at an A1-style address.
    pub fn cell(&self, address: &str) -> Option<&SpecMemoryCell> {
        self.dict_cells.get(&Cursor::from_address(address)?)
    }

    /// Value at `address`, `None` when absent or blank.
    pub fn value(&self, address: &str) -> Option<&EnumCellValue> {
        self.cell(address)
            .map(|cell| &cell.value)
            .filter(|value| value.has_value())
    }

    /// Value at `address` rendered as text.
    pub fn text(&self, address: &str) -> Option<String> {
        self.value(address).map(derive_value_text)
    }

    /// Style applied at `address`.
    pub fn style(&self, address: &str) -> Option<StyleHandle> {
        self.cell(address).and_then(|cell| cell.style)
    }

    /// Addresses holding a value, in row-major order.
    pub fn addresses(&self) -> Vec<String> {
        self.dict_cells
            .iter()
            .filter(|(_, cell)| cell.value.has_value())
            .map(|(cursor, _)| cursor.to_address())
            .collect()
    }

    /// Merged ranges as `A1:B2`, in call order.
    pub fn merges(&self) -> Vec<String> {
        self.l_merges
            .iter()
            .map(|(first, last)| format!("{first}:{last}"))
            .collect()
    }

    pub fn column_width(&self, col: usize) -> Option<f64> {
        self.dict_widths.get(&col).copied()
    }

    pub fn row_height(&self, row: usize) -> Option<f64> {
        self.dict_heights.get(&row).copied()
    }

    fn cell_mut(&mut self, cursor: Cursor) -> &mut SpecMemoryCell {
        self.dict_cells.entry(cursor).or_default()
    }
}

/// Sink that records every call in memory.
#[derive(Debug, Clone)]
pub struct MemorySink {
    l_sheets: Vec<MemorySheet>,
    l_formats: Vec<SpecCellFormat>,
    sheet_active: Option<SheetHandle>,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySink {
    /// Create a sink holding only the placeholder sheet.
    pub fn new() -> Self {
        Self {
            l_sheets: vec![MemorySheet {
                name: C_SHEET_NAME_DEFAULT.to_string(),
                ..Default::default()
            }],
            l_formats: Vec::new(),
            sheet_active: Some(SheetHandle(0)),
        }
    }

    /// Live sheet names in creation order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.l_sheets
            .iter()
            .filter(|sheet| !sheet.if_deleted)
            .map(|sheet| sheet.name.clone())
            .collect()
    }

    /// Live sheet by name.
    pub fn sheet(&self, name: &str) -> Option<&MemorySheet> {
        self.l_sheets
            .iter()
            .find(|sheet| !sheet.if_deleted && sheet.name == name)
    }

    /// Name of the active sheet.
    pub fn active_sheet_name(&self) -> Option<&str> {
        let SheetHandle(n_idx) = self.sheet_active?;
        self.l_sheets
            .get(n_idx)
            .filter(|sheet| !sheet.if_deleted)
            .map(|sheet| sheet.name.as_str())
    }

    /// Registered formats, indexed by handle.
    pub fn formats(&self) -> &[SpecCellFormat] {
        &self.l_formats
    }

    pub fn format(&self, handle: StyleHandle) -> Option<&SpecCellFormat> {
        self.l_formats.get(handle.0)
    }

    fn sheet_mut(&mut self, handle: SheetHandle) -> MarshalResult<&mut MemorySheet> {
        self.l_sheets
            .get_mut(handle.0)
            .filter(|sheet| !sheet.if_deleted)
            .ok_or_else(|| MarshalError::Sink(format!("unknown sheet handle: {}", handle.0)))
    }
}

impl SheetSink for MemorySink {
    fn new_sheet(&mut self, name: &str) -> MarshalResult<SheetHandle> {
        if let Some(n_idx) = self
            .l_sheets
            .iter()
            .position(|sheet| !sheet.if_deleted && sheet.name == name)
        {
            return Ok(SheetHandle(n_idx));
        }
        self.l_sheets.push(MemorySheet {
            name: name.to_string(),
            ..Default::default()
        });
        Ok(SheetHandle(self.l_sheets.len() - 1))
    }

    fn set_cell_value(
        &mut self,
        sheet: SheetHandle,
        cursor: Cursor,
        value: &EnumCellValue,
    ) -> MarshalResult<()> {
        self.sheet_mut(sheet)?.cell_mut(cursor).value = value.clone();
        Ok(())
    }

    fn set_cell_style(
        &mut self,
        sheet: SheetHandle,
        first: Cursor,
        last: Cursor,
        style: StyleHandle,
    ) -> MarshalResult<()> {
        let memory_sheet = self.sheet_mut(sheet)?;
        for n_row in first.row..=last.row {
            for n_col in first.col..=last.col {
                memory_sheet.cell_mut(Cursor::new(n_row, n_col)).style = Some(style);
            }
        }
        Ok(())
    }

    fn merge_cells(
        &mut self,
        sheet: SheetHandle,
        first: Cursor,
        last: Cursor,
    ) -> MarshalResult<()> {
        self.sheet_mut(sheet)?.l_merges.push((first, last));
        Ok(())
    }

    fn set_column_width(
        &mut self,
        sheet: SheetHandle,
        first_col: usize,
        last_col: usize,
        width: f64,
    ) -> MarshalResult<()> {
        let memory_sheet = self.sheet_mut(sheet)?;
        for n_col in first_col..=last_col {
            memory_sheet.dict_widths.insert(n_col, width);
        }
        Ok(())
    }

    fn set_row_height(&mut self, sheet: SheetHandle, row: usize, height: f64) -> MarshalResult<()> {
        self.sheet_mut(sheet)?.dict_heights.insert(row, height);
        Ok(())
    }

    fn delete_sheet(&mut self, name: &str) -> MarshalResult<()> {
        if let Some(sheet) = self
            .l_sheets
            .iter_mut()
            .find(|sheet| !sheet.if_deleted && sheet.name == name)
        {
            sheet.if_deleted = true;
        }
        Ok(())
    }

    fn set_active_sheet(&mut self, sheet: SheetHandle) -> MarshalResult<()> {
        self.sheet_mut(sheet)?;
        self.sheet_active = Some(sheet);
        Ok(())
    }

    fn register_style(&mut self, format: &SpecCellFormat) -> MarshalResult<StyleHandle> {
        self.l_formats.push(format.clone());
        Ok(StyleHandle(self.l_formats.len() - 1))
    }
}

fn derive_value_text(value: &EnumCellValue) -> String {
    match value {
        EnumCellValue::None => String::new(),
        EnumCellValue::String(val) => val.clone(),
        EnumCellValue::Number(val) => convert_number_to_text(*val),
        EnumCellValue::Boolean(val) => val.to_string(),
        EnumCellValue::DateTime(val) => val.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
