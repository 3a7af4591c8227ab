//! `rust_xlsxwriter`-backed sink.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, FormatUnderline, Workbook, Worksheet};

use crate::conf::{C_NUM_FORMAT_DATETIME_DEFAULT, C_SHEET_NAME_DEFAULT};
use crate::cursor::Cursor;
use crate::sink::SheetSink;
use crate::spec::{
    EnumCellValue, MarshalError, MarshalResult, SheetHandle, SpecCellFormat, StyleHandle,
};
use crate::util::{
    cast_col_num, cast_row_num, convert_datetime_to_excel_serial, derive_unique_sheet_name,
    sanitize_sheet_name,
};

#[derive(Debug, Clone, Default)]
struct SpecSheetBuffer {
    name: String,
    dict_cells: BTreeMap<Cursor, (EnumCellValue, Option<StyleHandle>)>,
    l_merges: Vec<(Cursor, Cursor)>,
    dict_widths: BTreeMap<usize, f64>,
    dict_heights: BTreeMap<usize, f64>,
    if_deleted: bool,
}

/// Sink that buffers sheets in memory and flushes them into an `.xlsx` workbook.
///
/// Sheet names are sanitized and de-duplicated on creation. Nothing is
/// encoded until [`Self::save_to_buffer`] or [`Self::save`].
pub struct XlsxSink {
    l_sheets: Vec<SpecSheetBuffer>,
    dict_sheet_idx: BTreeMap<String, usize>,
    set_sheet_names_existing: BTreeSet<String>,
    l_formats: Vec<SpecCellFormat>,
    sheet_active: Option<SheetHandle>,
}

impl Default for XlsxSink {
    fn default() -> Self {
        Self::new()
    }
}

impl XlsxSink {
    /// Create sink holding only the placeholder sheet.
    pub fn new() -> Self {
        let mut sink = Self {
            l_sheets: Vec::new(),
            dict_sheet_idx: BTreeMap::new(),
            set_sheet_names_existing: BTreeSet::new(),
            l_formats: Vec::new(),
            sheet_active: None,
        };
        let handle = sink.push_sheet(C_SHEET_NAME_DEFAULT);
        sink.sheet_active = Some(handle);
        sink
    }

    /// Live sheet names as they will appear in the workbook.
    pub fn sheet_names(&self) -> Vec<String> {
        self.l_sheets
            .iter()
            .filter(|sheet| !sheet.if_deleted)
            .map(|sheet| sheet.name.clone())
            .collect()
    }

    /// Encode the workbook into bytes.
    pub fn save_to_buffer(&self) -> MarshalResult<Vec<u8>> {
        let mut workbook = self.derive_workbook()?;
        Ok(workbook.save_to_buffer()?)
    }

    /// Encode the workbook and write it to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> MarshalResult<()> {
        let mut workbook = self.derive_workbook()?;
        workbook.save(path.as_ref())?;
        Ok(())
    }

    fn push_sheet(&mut self, name: &str) -> SheetHandle {
        let c_name = derive_unique_sheet_name(
            &mut self.set_sheet_names_existing,
            &sanitize_sheet_name(name, "_"),
        );
        self.l_sheets.push(SpecSheetBuffer {
            name: c_name,
            ..Default::default()
        });
        let n_idx = self.l_sheets.len() - 1;
        self.dict_sheet_idx.insert(name.to_string(), n_idx);
        SheetHandle(n_idx)
    }

    fn sheet_mut(&mut self, handle: SheetHandle) -> MarshalResult<&mut SpecSheetBuffer> {
        self.l_sheets
            .get_mut(handle.0)
            .filter(|sheet| !sheet.if_deleted)
            .ok_or_else(|| MarshalError::Sink(format!("unknown sheet handle: {}", handle.0)))
    }

    fn derive_workbook(&self) -> MarshalResult<Workbook> {
        let l_formats: Vec<Format> = self.l_formats.iter().map(derive_rust_xlsx_format).collect();
        let fmt_default = Format::new();
        let mut workbook = Workbook::new();

        for (n_idx, sheet) in self.l_sheets.iter().enumerate() {
            if sheet.if_deleted {
                continue;
            }
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;
            if self.sheet_active == Some(SheetHandle(n_idx)) {
                worksheet.set_active(true);
            }

            for (n_col, n_width) in &sheet.dict_widths {
                let n_col = cast_col_num(*n_col).map_err(MarshalError::Sink)?;
                worksheet.set_column_width(n_col, *n_width)?;
            }
            for (n_row, n_height) in &sheet.dict_heights {
                let n_row = cast_row_num(*n_row).map_err(MarshalError::Sink)?;
                worksheet.set_row_height(n_row, *n_height)?;
            }

            for (first, last) in &sheet.l_merges {
                let format = sheet
                    .dict_cells
                    .get(first)
                    .and_then(|(_, style)| *style)
                    .and_then(|style| l_formats.get(style.0))
                    .unwrap_or(&fmt_default);
                worksheet.merge_range(
                    cast_row_num(first.row).map_err(MarshalError::Sink)?,
                    cast_col_num(first.col).map_err(MarshalError::Sink)?,
                    cast_row_num(last.row).map_err(MarshalError::Sink)?,
                    cast_col_num(last.col).map_err(MarshalError::Sink)?,
                    "",
                    format,
                )?;
            }

            for (cursor, (value, style)) in &sheet.dict_cells {
                let spec = style.and_then(|style| self.l_formats.get(style.0));
                let format = style
                    .and_then(|style| l_formats.get(style.0))
                    .unwrap_or(&fmt_default);
                write_cell_with_format(worksheet, *cursor, value, spec, format)?;
            }
        }

        Ok(workbook)
    }
}

impl SheetSink for XlsxSink {
    fn new_sheet(&mut self, name: &str) -> MarshalResult<SheetHandle> {
        if let Some(n_idx) = self.dict_sheet_idx.get(name) {
            return Ok(SheetHandle(*n_idx));
        }
        Ok(self.push_sheet(name))
    }

    fn set_cell_value(
        &mut self,
        sheet: SheetHandle,
        cursor: Cursor,
        value: &EnumCellValue,
    ) -> MarshalResult<()> {
        self.sheet_mut(sheet)?
            .dict_cells
            .entry(cursor)
            .or_default()
            .0 = value.clone();
        Ok(())
    }

    fn set_cell_style(
        &mut self,
        sheet: SheetHandle,
        first: Cursor,
        last: Cursor,
        style: StyleHandle,
    ) -> MarshalResult<()> {
        let buffer = self.sheet_mut(sheet)?;
        for n_row in first.row..=last.row {
            for n_col in first.col..=last.col {
                buffer
                    .dict_cells
                    .entry(Cursor::new(n_row, n_col))
                    .or_default()
                    .1 = Some(style);
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
        let buffer = self.sheet_mut(sheet)?;
        for n_col in first_col..=last_col {
            buffer.dict_widths.insert(n_col, width);
        }
        Ok(())
    }

    fn set_row_height(&mut self, sheet: SheetHandle, row: usize, height: f64) -> MarshalResult<()> {
        self.sheet_mut(sheet)?.dict_heights.insert(row, height);
        Ok(())
    }

    fn delete_sheet(&mut self, name: &str) -> MarshalResult<()> {
        let Some(n_idx) = self.dict_sheet_idx.remove(name) else {
            return Ok(());
        };
        if let Some(sheet) = self.l_sheets.get_mut(n_idx) {
            sheet.if_deleted = true;
            self.set_sheet_names_existing.remove(&sheet.name);
        }
        if self.sheet_active == Some(SheetHandle(n_idx)) {
            self.sheet_active = None;
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

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    cursor: Cursor,
    value: &EnumCellValue,
    spec: Option<&SpecCellFormat>,
    format: &Format,
) -> MarshalResult<()> {
    let n_row = cast_row_num(cursor.row).map_err(MarshalError::Sink)?;
    let n_col = cast_col_num(cursor.col).map_err(MarshalError::Sink)?;
    match value {
        EnumCellValue::None => {
            if spec.is_some() {
                worksheet.write_blank(n_row, n_col, format)?;
            }
        }
        EnumCellValue::String(val) => {
            worksheet.write_string_with_format(n_row, n_col, val, format)?;
        }
        EnumCellValue::Number(val) => {
            worksheet.write_number_with_format(n_row, n_col, *val, format)?;
        }
        EnumCellValue::Boolean(val) => {
            worksheet.write_boolean_with_format(n_row, n_col, *val, format)?;
        }
        EnumCellValue::DateTime(val) => {
            let n_serial = convert_datetime_to_excel_serial(val);
            if spec.and_then(|spec| spec.num_format.as_ref()).is_some() {
                worksheet.write_number_with_format(n_row, n_col, n_serial, format)?;
            } else {
                let fmt_datetime = derive_rust_xlsx_format(
                    &spec.cloned().unwrap_or_default().with_(SpecCellFormat {
                        num_format: Some(C_NUM_FORMAT_DATETIME_DEFAULT.to_string()),
                        ..Default::default()
                    }),
                );
                worksheet.write_number_with_format(n_row, n_col, n_serial, &fmt_datetime)?;
            }
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }
    if spec.strike.unwrap_or(false) {
        format = format.set_font_strikethrough();
    }
    if spec.underline.unwrap_or(false) {
        format = format.set_underline(FormatUnderline::Single);
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = spec.indent {
        format = format.set_indent(u8::try_from(val.clamp(0, 250)).unwrap_or(0));
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }

    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }

    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        8 => FormatBorder::MediumDashed,
        9 => FormatBorder::DashDot,
        10 => FormatBorder::MediumDashDot,
        11 => FormatBorder::DashDotDot,
        12 => FormatBorder::MediumDashDotDot,
        13 => FormatBorder::SlantDashDot,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    match align.trim().to_ascii_lowercase().as_str() {
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "center_across" => Some(FormatAlign::CenterAcross),
        "distributed" => Some(FormatAlign::Distributed),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" => Some(FormatAlign::VerticalCenter),
        "vjustify" => Some(FormatAlign::VerticalJustify),
        "vdistributed" => Some(FormatAlign::VerticalDistributed),
        _ => None,
    }
}
