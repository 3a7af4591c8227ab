//! Stateless helper utilities shared by the layout engine and the sinks.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};

use crate::conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_CSS_COLOR_NAMES,
    TUP_EXCEL_ILLEGAL,
};

////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

const N_MS_PER_DAY: f64 = 86_400_000.0;

/// Convert a date-time to an Excel serial day number (1900 date system).
pub fn convert_datetime_to_excel_serial(value: &NaiveDateTime) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    let n_ms = value.signed_duration_since(epoch).num_milliseconds();
    n_ms as f64 / N_MS_PER_DAY
}

/// Render a number the way a spreadsheet shows it by default.
pub fn convert_number_to_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Normalize a CSS color (`#rgb`, `#rrggbb` or a basic keyword) to `#RRGGBB`.
pub fn convert_css_color_to_hex(value: &str) -> Result<String, String> {
    let c_value = value.trim().to_ascii_lowercase();
    if let Some((_, c_hex)) = TUP_CSS_COLOR_NAMES
        .iter()
        .find(|(c_name, _)| *c_name == c_value)
    {
        return Ok((*c_hex).to_string());
    }

    let Some(c_digits) = c_value.strip_prefix('#') else {
        return Err(format!("unsupported color: {value:?}"));
    };
    if !c_digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("unsupported color: {value:?}"));
    }
    match c_digits.len() {
        3 => Ok(format!(
            "#{}",
            c_digits
                .chars()
                .flat_map(|c| [c, c])
                .collect::<String>()
                .to_ascii_uppercase()
        )),
        6 => Ok(format!("#{}", c_digits.to_ascii_uppercase())),
        _ => Err(format!("unsupported color: {value:?}")),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region GridBounds

/// Cast zero-based row index into the writer's row type.
pub fn cast_row_num(value: usize) -> Result<u32, String> {
    if value >= N_NROWS_EXCEL_MAX {
        return Err(format!("row index overflow: {value}"));
    }
    u32::try_from(value).map_err(|_| format!("row index overflow: {value}"))
}

/// Cast zero-based column index into the writer's column type.
pub fn cast_col_num(value: usize) -> Result<u16, String> {
    if value >= N_NCOLS_EXCEL_MAX {
        return Err(format!("column index overflow: {value}"));
    }
    u16::try_from(value).map_err(|_| format!("column index overflow: {value}"))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Pick a sheet name not yet in `set_names`, suffixing `__2`, `__3`, ... on clash.
pub fn derive_unique_sheet_name(set_names: &mut BTreeSet<String>, name: &str) -> String {
    if !set_names.contains(name) {
        set_names.insert(name.to_string());
        return name.to_string();
    }

    let base_name: String = name
        .chars()
        .take(usize::max(1, N_LEN_EXCEL_SHEET_NAME_MAX - 3))
        .collect();

    let mut n_idx = 2usize;
    loop {
        let candidate: String = format!("{base_name}__{n_idx}")
            .chars()
            .take(N_LEN_EXCEL_SHEET_NAME_MAX)
            .collect();
        if !set_names.contains(&candidate) {
            set_names.insert(candidate.clone());
            return candidate;
        }
        n_idx += 1;
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
