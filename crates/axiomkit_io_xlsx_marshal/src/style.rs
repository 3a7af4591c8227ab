//! Style mini-language and per-call style registry.
//!
//! A definition is a `;`-separated list of `key:value` pairs. Values may be
//! single-quoted to carry `;` (e.g. number formats). Every cell-level key also
//! accepts a `header-` prefix that targets the header cell instead.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::conf::{N_RATIO_PIXEL, N_RATIO_POINT, derive_num_format_preset};
use crate::sink::SheetSink;
use crate::spec::{
    EnumStyleDestination, MarshalError, MarshalResult, SpecCellFormat, SpecDirective,
    SpecMarshalOptions, StyleHandle,
};
use crate::util::convert_css_color_to_hex;

////////////////////////////////////////////////////////////////////////////////
// #region StyleModels

/// Length unit accepted by `width`/`height` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumLengthUnit {
    /// Screen pixels.
    #[default]
    Px,
    /// Typographic points.
    Pt,
}

/// Length with unit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpecLength {
    /// Magnitude.
    pub size: f64,
    /// Unit of `size`.
    pub unit: EnumLengthUnit,
}

impl SpecLength {
    /// Length in spreadsheet units.
    pub fn value(&self) -> f64 {
        match self.unit {
            EnumLengthUnit::Px => self.size / N_RATIO_PIXEL,
            EnumLengthUnit::Pt => self.size / N_RATIO_POINT,
        }
    }
}

/// Parsed style definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecStyleSheet {
    /// Format for data cells.
    pub cell: SpecCellFormat,
    /// Format for header cells (`header-` keys).
    pub header: SpecCellFormat,
    /// Column width.
    pub width: Option<SpecLength>,
    /// Upper bound on column width.
    pub width_max: Option<SpecLength>,
    /// Data row height.
    pub height: Option<SpecLength>,
    /// Header row height.
    pub header_height: Option<SpecLength>,
}

/// Resolved per-column style handles and dimensions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecColumnStyles {
    /// Header cell style.
    pub header: Option<StyleHandle>,
    /// Data cell style.
    pub cell: Option<StyleHandle>,
    /// Column width in spreadsheet units.
    pub width: Option<f64>,
    /// Data row height.
    pub height: Option<f64>,
    /// Header row height.
    pub header_height: Option<f64>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StyleParsing

/// Parse a style definition.
pub fn parse_style_definition(text: &str) -> Result<SpecStyleSheet, String> {
    let mut sheet = SpecStyleSheet::default();
    for (c_key, c_value) in split_style_pairs(text)? {
        update_style_sheet(&mut sheet, &c_key, &c_value)?;
    }
    Ok(sheet)
}

/// Canonical text of a definition: lowercase keys, trimmed values, `;` joined.
pub fn normalize_style_definition(text: &str) -> Result<String, String> {
    Ok(split_style_pairs(text)?
        .into_iter()
        .map(|(c_key, c_value)| format!("{c_key}:{c_value}"))
        .collect::<Vec<_>>()
        .join(";"))
}

fn split_style_pairs(text: &str) -> Result<Vec<(String, String)>, String> {
    let mut l_items = Vec::new();
    let mut c_current = String::new();
    let mut if_quoted = false;
    for c in text.chars() {
        match c {
            '\'' => {
                if_quoted = !if_quoted;
                c_current.push(c);
            }
            ';' if !if_quoted => l_items.push(std::mem::take(&mut c_current)),
            _ => c_current.push(c),
        }
    }
    if if_quoted {
        return Err("unterminated quoted value".to_string());
    }
    l_items.push(c_current);

    let mut l_pairs = Vec::new();
    for c_item in l_items {
        let c_item = c_item.trim();
        if c_item.is_empty() {
            continue;
        }
        let Some((c_key, c_value)) = c_item.split_once(':') else {
            return Err(format!("expected key:value, got {c_item:?}"));
        };
        let c_value = c_value.trim();
        let c_value = c_value
            .strip_prefix('\'')
            .and_then(|c_rest| c_rest.strip_suffix('\''))
            .unwrap_or(c_value);
        l_pairs.push((c_key.trim().to_ascii_lowercase(), c_value.to_string()));
    }
    Ok(l_pairs)
}

fn update_style_sheet(sheet: &mut SpecStyleSheet, key: &str, value: &str) -> Result<(), String> {
    match key {
        "width" => sheet.width = Some(parse_length(value)?),
        "width-max" => sheet.width_max = Some(parse_length(value)?),
        "height" => sheet.height = Some(parse_length(value)?),
        "header-height" => sheet.header_height = Some(parse_length(value)?),
        _ => {
            let (format, c_attr) = match key.strip_prefix("header-") {
                Some(c_attr) => (&mut sheet.header, c_attr),
                None => (&mut sheet.cell, key),
            };
            update_cell_format(format, c_attr, value)?;
        }
    }
    Ok(())
}

fn update_cell_format(format: &mut SpecCellFormat, attr: &str, value: &str) -> Result<(), String> {
    match attr {
        "background-color" => format.bg_color = Some(convert_css_color_to_hex(value)?),
        "color" => format.font_color = Some(convert_css_color_to_hex(value)?),
        "font-family" => format.font_name = Some(value.to_string()),
        "font-size" => {
            let n_size = parse_length_number(value.trim_end_matches("pt"))?;
            format.font_size = Some(n_size.round() as i64);
        }
        "font-style" => {
            for c_item in value.split_whitespace() {
                match c_item.to_ascii_lowercase().as_str() {
                    "bold" => format.bold = Some(true),
                    "italic" => format.italic = Some(true),
                    "strike" => format.strike = Some(true),
                    "underline" => format.underline = Some(true),
                    "normal" => {}
                    _ => return Err(format!("unsupported font-style: {c_item:?}")),
                }
            }
        }
        "text-align" => {
            let c_align = match value.to_ascii_lowercase().as_str() {
                "left" => "left",
                "right" => "right",
                "center" => "center",
                "fill" => "fill",
                "justify" => "justify",
                "centercontinuous" => "center_across",
                "distributed" => "distributed",
                _ => return Err(format!("unsupported text-align: {value:?}")),
            };
            format.align = Some(c_align.to_string());
        }
        "vertical-align" => {
            let c_align = match value.to_ascii_lowercase().as_str() {
                "top" => "top",
                "bottom" => "bottom",
                "center" | "middle" => "vcenter",
                "justify" => "vjustify",
                "distributed" => "vdistributed",
                _ => return Err(format!("unsupported vertical-align: {value:?}")),
            };
            format.valign = Some(c_align.to_string());
        }
        "text-wrap" => {
            format.text_wrap = Some(!matches!(
                value.to_ascii_lowercase().as_str(),
                "false" | "0" | "nowrap"
            ));
        }
        "text-indent" => {
            let n_indent = value
                .parse::<i64>()
                .map_err(|_| format!("invalid text-indent: {value:?}"))?;
            format.indent = Some(n_indent);
        }
        "border" => format.border = Some(parse_border(value)?),
        "format" => {
            let c_format = derive_num_format_preset(value).unwrap_or(value);
            format.num_format = Some(c_format.to_string());
        }
        _ => return Err(format!("unsupported style key: {attr:?}")),
    }
    Ok(())
}

fn parse_border(value: &str) -> Result<i64, String> {
    let n_border = match value.to_ascii_lowercase().as_str() {
        "none" => 0,
        "thin" => 1,
        "medium" => 2,
        "dashed" => 3,
        "dotted" => 4,
        "thick" => 5,
        "double" => 6,
        "hair" => 7,
        c_other => c_other
            .parse::<i64>()
            .ok()
            .filter(|n| (0..=13).contains(n))
            .ok_or_else(|| format!("unsupported border: {value:?}"))?,
    };
    Ok(n_border)
}

fn parse_length_number(text: &str) -> Result<f64, String> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .ok_or_else(|| format!("invalid length: {text:?}"))
}

/// Parse `<number>[px|pt]`; the unit defaults to pixels.
pub fn parse_length(text: &str) -> Result<SpecLength, String> {
    let c_text = text.trim();
    let n_idx_unit = c_text
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(c_text.len());
    let (c_number, c_unit) = c_text.split_at(n_idx_unit);
    let unit = match c_unit.to_ascii_lowercase().as_str() {
        "" | "px" => EnumLengthUnit::Px,
        "pt" => EnumLengthUnit::Pt,
        _ => return Err(format!("unsupported length unit: {c_unit:?}")),
    };
    Ok(SpecLength {
        size: parse_length_number(c_number)?,
        unit,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StyleRegistry

/// Per-call style registry.
///
/// Definitions are cached by normalized text (or an explicit id), and cell
/// formats are registered with the sink at most once each.
pub struct Stylizer {
    style_default_cell: String,
    style_default_header: String,
    dict_styles_named: BTreeMap<String, String>,
    dict_sheets: HashMap<String, Rc<SpecStyleSheet>>,
    dict_handles: HashMap<SpecCellFormat, StyleHandle>,
}

impl Stylizer {
    /// Create an empty registry seeded with defaults and named styles.
    pub fn new(options: &SpecMarshalOptions) -> Self {
        Self {
            style_default_cell: options.style_default_cell.clone(),
            style_default_header: options.style_default_header.clone(),
            dict_styles_named: options.dict_styles_named.clone(),
            dict_sheets: HashMap::new(),
            dict_handles: HashMap::new(),
        }
    }

    /// Compose the effective definition: default, then refs, then inline.
    pub fn resolve(
        &self,
        destination: EnumStyleDestination,
        inline: &str,
        refs: &[String],
    ) -> MarshalResult<String> {
        let c_default = match destination {
            EnumStyleDestination::Header => self.style_default_header.as_str(),
            EnumStyleDestination::Cell => self.style_default_cell.as_str(),
            EnumStyleDestination::Column => "",
        };

        let mut l_parts = vec![c_default];
        for c_ref in refs {
            let Some(c_definition) = self.dict_styles_named.get(c_ref) else {
                return Err(MarshalError::UnknownStyleReference(c_ref.clone()));
            };
            l_parts.push(c_definition.as_str());
        }
        l_parts.push(inline);

        Ok(l_parts
            .iter()
            .map(|c_part| c_part.trim().trim_matches(';'))
            .filter(|c_part| !c_part.is_empty())
            .collect::<Vec<_>>()
            .join(";"))
    }

    /// Parse and cache a definition under `id` or its normalized text.
    pub fn register(
        &mut self,
        definition: &str,
        id: Option<&str>,
    ) -> MarshalResult<Rc<SpecStyleSheet>> {
        let derive_syntax_error = |message: String| MarshalError::StyleSyntax {
            definition: definition.to_string(),
            message,
        };
        let c_key = match id {
            Some(c_id) => c_id.to_string(),
            None => normalize_style_definition(definition).map_err(derive_syntax_error)?,
        };
        if let Some(sheet) = self.dict_sheets.get(&c_key) {
            return Ok(Rc::clone(sheet));
        }

        let sheet = Rc::new(parse_style_definition(definition).map_err(derive_syntax_error)?);
        self.dict_sheets.insert(c_key, Rc::clone(&sheet));
        Ok(sheet)
    }

    /// Register `format` with the sink once; empty formats need no handle.
    pub fn register_format(
        &mut self,
        format: &SpecCellFormat,
        sink: &mut dyn SheetSink,
    ) -> MarshalResult<Option<StyleHandle>> {
        if format.is_empty() {
            return Ok(None);
        }
        if let Some(handle) = self.dict_handles.get(format) {
            return Ok(Some(*handle));
        }
        let handle = sink.register_style(format)?;
        self.dict_handles.insert(format.clone(), handle);
        Ok(Some(handle))
    }

    fn register_destination(
        &mut self,
        directive: &SpecDirective,
        destination: EnumStyleDestination,
    ) -> MarshalResult<Rc<SpecStyleSheet>> {
        let c_definition = match directive.style(destination) {
            Some(declaration) => {
                self.resolve(destination, &declaration.definition, &declaration.refs)?
            }
            None => self.resolve(destination, "", &[])?,
        };
        self.register(&c_definition, None)
    }

    /// Resolve header/cell/column declarations of one field.
    pub fn resolve_column(
        &mut self,
        directive: &SpecDirective,
        sink: &mut dyn SheetSink,
    ) -> MarshalResult<SpecColumnStyles> {
        let sheet_header = self.register_destination(directive, EnumStyleDestination::Header)?;
        let sheet_cell = self.register_destination(directive, EnumStyleDestination::Cell)?;
        let sheet_column = self.register_destination(directive, EnumStyleDestination::Column)?;

        let fmt_header = sheet_column
            .header
            .merge(&sheet_cell.header)
            .merge(&sheet_header.cell)
            .merge(&sheet_header.header);
        let fmt_cell = sheet_column.cell.merge(&sheet_cell.cell);

        let width = sheet_column
            .width
            .or(sheet_cell.width)
            .or(sheet_header.width)
            .map(|length| length.value());
        let width_max = sheet_column
            .width_max
            .or(sheet_cell.width_max)
            .or(sheet_header.width_max)
            .map(|length| length.value());
        let width = match (width, width_max) {
            (Some(n_width), Some(n_max)) => Some(n_width.min(n_max)),
            (n_width, _) => n_width,
        };

        Ok(SpecColumnStyles {
            header: self.register_format(&fmt_header, sink)?,
            cell: self.register_format(&fmt_cell, sink)?,
            width,
            height: sheet_cell
                .height
                .or(sheet_column.height)
                .map(|length| length.value()),
            header_height: sheet_header
                .height
                .or(sheet_header.header_height)
                .or(sheet_cell.header_height)
                .or(sheet_column.header_height)
                .map(|length| length.value()),
        })
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::parse_directive;
    use crate::sink::MemorySink;

    #[test]
    fn test_parse_style_definition_cell_and_header_keys() {
        let sheet = parse_style_definition(
            "color:red; header-background-color:#0f0; font-style:bold italic; format:usd; width:60px; text-align:center",
        )
        .unwrap();
        assert_eq!(sheet.cell.font_color.as_deref(), Some("#FF0000"));
        assert_eq!(sheet.cell.bold, Some(true));
        assert_eq!(sheet.cell.italic, Some(true));
        assert_eq!(sheet.cell.num_format.as_deref(), Some("$#,##0.00"));
        assert_eq!(sheet.cell.align.as_deref(), Some("center"));
        assert_eq!(sheet.header.bg_color.as_deref(), Some("#00FF00"));
        assert_eq!(sheet.width.map(|length| length.value()), Some(10.0));
    }

    #[test]
    fn test_parse_style_definition_quoted_value_keeps_semicolons() {
        let sheet = parse_style_definition("format:'0.00;[Red]-0.00';border:thin").unwrap();
        assert_eq!(sheet.cell.num_format.as_deref(), Some("0.00;[Red]-0.00"));
        assert_eq!(sheet.cell.border, Some(1));
    }

    #[test]
    fn test_parse_style_definition_rejects_unknown_input() {
        assert!(parse_style_definition("colour:red").is_err());
        assert!(parse_style_definition("color:not-a-color").is_err());
        assert!(parse_style_definition("width:10em").is_err());
        assert!(parse_style_definition("bold").is_err());
        assert!(parse_style_definition("format:'0.00").is_err());
    }

    #[test]
    fn test_parse_length_units() {
        assert_eq!(parse_length("45pt").unwrap().value(), 10.0);
        assert_eq!(parse_length("12").unwrap().unit, EnumLengthUnit::Px);
    }

    #[test]
    fn test_resolve_orders_default_refs_inline() {
        let options = SpecMarshalOptions {
            style_default_cell: "color:black".to_string(),
            ..Default::default()
        }
        .with_named_style("money", "format:usd;color:green");
        let stylizer = Stylizer::new(&options);

        let c_definition = stylizer
            .resolve(EnumStyleDestination::Cell, "color:red", &["money".to_string()])
            .unwrap();
        assert_eq!(c_definition, "color:black;format:usd;color:green;color:red");
        let sheet = parse_style_definition(&c_definition).unwrap();
        assert_eq!(sheet.cell.font_color.as_deref(), Some("#FF0000"));

        let err = stylizer
            .resolve(EnumStyleDestination::Cell, "", &["nope".to_string()])
            .unwrap_err();
        assert!(matches!(err, MarshalError::UnknownStyleReference(c_name) if c_name == "nope"));
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut stylizer = Stylizer::new(&SpecMarshalOptions::default());
        let sheet_a = stylizer.register("color:red;width:12", None).unwrap();
        let sheet_b = stylizer.register(" COLOR:red ; width:12 ;", None).unwrap();
        assert!(Rc::ptr_eq(&sheet_a, &sheet_b));

        let mut sink = MemorySink::new();
        let handle_a = stylizer.register_format(&sheet_a.cell, &mut sink).unwrap();
        let handle_b = stylizer.register_format(&sheet_b.cell, &mut sink).unwrap();
        assert_eq!(handle_a, handle_b);
        assert_eq!(sink.formats().len(), 1);
        assert_eq!(
            stylizer
                .register_format(&SpecCellFormat::default(), &mut sink)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_resolve_column_combines_destinations() {
        let options = SpecMarshalOptions {
            style_default_header: "font-style:bold".to_string(),
            ..Default::default()
        };
        let mut stylizer = Stylizer::new(&options);
        let mut sink = MemorySink::new();
        let directive = parse_directive(
            "header.style={color:blue},column.style={width:120px;width-max:90px;background-color:yellow},cell.style={format:pct}",
        )
        .unwrap();

        let styles = stylizer.resolve_column(&directive, &mut sink).unwrap();
        assert_eq!(styles.width, Some(15.0));

        let fmt_header = sink.format(styles.header.unwrap()).unwrap();
        assert_eq!(fmt_header.bold, Some(true));
        assert_eq!(fmt_header.font_color.as_deref(), Some("#0000FF"));

        let fmt_cell = sink.format(styles.cell.unwrap()).unwrap();
        assert_eq!(fmt_cell.num_format.as_deref(), Some("0%"));
        assert_eq!(fmt_cell.bg_color.as_deref(), Some("#FFFF00"));
    }

    #[test]
    fn test_resolve_column_without_styles_yields_no_handles() {
        let mut stylizer = Stylizer::new(&SpecMarshalOptions::default());
        let mut sink = MemorySink::new();
        let styles = stylizer
            .resolve_column(&SpecDirective::default(), &mut sink)
            .unwrap();
        assert_eq!(styles, SpecColumnStyles::default());
        assert!(sink.formats().is_empty());
    }
}
