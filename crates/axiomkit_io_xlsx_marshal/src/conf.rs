//! Marshaller constants and default preset factories.

use crate::spec::SpecMarshalOptions;

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Placeholder sheet every fresh workbook starts with.
pub const C_SHEET_NAME_DEFAULT: &str = "Sheet1";
/// Blank rows separating tables stacked on one sheet.
pub const N_ROWS_TABLE_GAP: usize = 1;

/// Pixels per Excel character-width unit.
pub const N_RATIO_PIXEL: f64 = 6.0;
/// Points per Excel character-width unit.
pub const N_RATIO_POINT: f64 = 4.5;

/// Number format applied to date-time cells whose style sets none.
pub const C_NUM_FORMAT_DATETIME_DEFAULT: &str = "yyyy-mm-dd hh:mm:ss";

/// Named number-format presets accepted by the `format` style key.
pub const TUP_NUM_FORMAT_PRESETS: [(&str, &str); 8] = [
    ("usd", "$#,##0.00"),
    ("gbp", "£#,##0.00"),
    ("eur", "€#,##0.00"),
    ("cad", "C$#,##0.00"),
    ("aud", "A$#,##0.00"),
    ("date", "m/d/yy HH:mm:ss"),
    ("iso8601", "yyyy/mm/dd HH:mm:ss"),
    ("pct", "0%"),
];

/// CSS basic color keywords accepted in color values.
pub const TUP_CSS_COLOR_NAMES: [(&str, &str); 18] = [
    ("black", "#000000"),
    ("silver", "#C0C0C0"),
    ("gray", "#808080"),
    ("grey", "#808080"),
    ("white", "#FFFFFF"),
    ("maroon", "#800000"),
    ("red", "#FF0000"),
    ("purple", "#800080"),
    ("fuchsia", "#FF00FF"),
    ("green", "#008000"),
    ("lime", "#00FF00"),
    ("olive", "#808000"),
    ("yellow", "#FFFF00"),
    ("navy", "#000080"),
    ("blue", "#0000FF"),
    ("teal", "#008080"),
    ("aqua", "#00FFFF"),
    ("orange", "#FFA500"),
];

/// Resolve a `format` preset name; unknown names yield `None`.
pub fn derive_num_format_preset(name: &str) -> Option<&'static str> {
    let c_key = name.trim().to_ascii_lowercase();
    TUP_NUM_FORMAT_PRESETS
        .iter()
        .find(|(c_name, _)| *c_name == c_key)
        .map(|(_, c_format)| *c_format)
}

/// Build default marshal options.
pub fn derive_default_marshal_options() -> SpecMarshalOptions {
    SpecMarshalOptions::default()
}
