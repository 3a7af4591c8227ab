//! Field annotation parser.
//!
//! An annotation is a comma-separated list of `key`, `key=value` or
//! `key={block}` items. Braces nest and `\` escapes the next character, so
//! style blocks may carry commas and semicolons. Keys are case-insensitive and
//! form a closed set; anything else is rejected.

use crate::cursor::Cursor;
use crate::spec::{EnumStyleDestination, SpecDirective};

/// Annotation text that drops a field.
pub const C_DIRECTIVE_IGNORE: &str = "-";

impl SpecDirective {
    /// Apply absolute `row`/`column` placement, then additive offsets.
    pub fn adjust(&self, cursor: &mut Cursor) {
        if let Some(n_row) = self.row {
            cursor.set_row(n_row);
        }
        if let Some(n_col) = self.column {
            cursor.set_col(n_col);
        }
        cursor.inc_row(self.row_offset);
        cursor.inc_col(self.column_offset);
    }
}

/// Parse one field annotation into a directive.
pub fn parse_directive(text: &str) -> Result<SpecDirective, String> {
    let mut directive = SpecDirective::default();
    let c_text = text.trim();
    if c_text == C_DIRECTIVE_IGNORE {
        directive.if_ignore = true;
        return Ok(directive);
    }

    for c_item in split_top_level(c_text, ',')? {
        let c_item = c_item.trim();
        if c_item.is_empty() {
            continue;
        }
        let (c_key, c_value) = match split_key_value(c_item) {
            Some((c_key, c_value)) => (c_key.trim().to_ascii_lowercase(), Some(c_value)),
            None => (c_item.to_ascii_lowercase(), None),
        };
        let c_value = c_value.map(derive_item_value).transpose()?;
        update_directive(&mut directive, &c_key, c_value)?;
    }

    Ok(directive)
}

fn update_directive(
    directive: &mut SpecDirective,
    key: &str,
    value: Option<String>,
) -> Result<(), String> {
    match key {
        "name" => directive.name = Some(require_value(key, value)?),
        "worksheet" | "sheet" => directive.sheet_destination = Some(require_value(key, value)?),
        "first" => directive.if_place_first = parse_flag(key, value)?,
        "ignore" => directive.if_ignore = parse_flag(key, value)?,
        "blank" => directive.if_blank = parse_flag(key, value)?,
        "omitempty" => directive.if_omit_empty = parse_flag(key, value)?,
        "embed" => directive.if_embed = parse_flag(key, value)?,
        "inline" => directive.if_inline = parse_flag(key, value)?,
        "invert" | "inverted" => directive.inverted = Some(parse_flag(key, value)?),
        "row" => directive.row = Some(parse_number(key, value)?),
        "column" => directive.column = Some(parse_number(key, value)?),
        "rowoffset" => directive.row_offset = parse_number(key, value)?,
        "columnoffset" => directive.column_offset = parse_number(key, value)?,
        "pos" | "position" => {
            let c_value = require_value(key, value)?;
            let n_pos = c_value
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("invalid {key}: {c_value:?}"))?;
            directive.position = Some(n_pos);
        }
        _ => update_style(directive, key, value)?,
    }
    Ok(())
}

fn update_style(
    directive: &mut SpecDirective,
    key: &str,
    value: Option<String>,
) -> Result<(), String> {
    let (c_destination, c_attr) = key.rsplit_once('.').unwrap_or(("", key));
    if c_attr != "style" && c_attr != "styleref" {
        return Err(format!("unsupported key: {key:?}"));
    }
    let Some(destination) = EnumStyleDestination::parse(c_destination) else {
        return Err(format!("unsupported style destination: {c_destination:?}"));
    };

    let c_value = require_value(key, value)?;
    let declaration = directive.style_mut(destination);
    if c_attr == "style" {
        let c_definition = c_value.trim().trim_end_matches(';');
        if !declaration.definition.is_empty() && !c_definition.is_empty() {
            declaration.definition.push(';');
        }
        declaration.definition.push_str(c_definition);
    } else {
        declaration.refs.extend(
            c_value
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|c_ref| !c_ref.is_empty())
                .map(str::to_string),
        );
    }
    Ok(())
}

fn require_value(key: &str, value: Option<String>) -> Result<String, String> {
    value.ok_or_else(|| format!("{key} requires a value"))
}

fn parse_flag(key: &str, value: Option<String>) -> Result<bool, String> {
    let Some(c_value) = value else {
        return Ok(true);
    };
    match c_value.trim().to_ascii_lowercase().as_str() {
        "" | "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(format!("invalid {key} flag: {c_value:?}")),
    }
}

fn parse_number(key: &str, value: Option<String>) -> Result<usize, String> {
    let c_value = require_value(key, value)?;
    c_value
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("invalid {key}: {c_value:?}"))
}

/// Split `text` on `sep` outside of `{}` blocks, keeping escapes intact.
fn split_top_level(text: &str, sep: char) -> Result<Vec<&str>, String> {
    let mut l_parts = Vec::new();
    let mut n_depth = 0usize;
    let mut n_start = 0usize;
    let mut if_escaped = false;

    for (n_idx, c) in text.char_indices() {
        if if_escaped {
            if_escaped = false;
            continue;
        }
        match c {
            '\\' => if_escaped = true,
            '{' => n_depth += 1,
            '}' => {
                n_depth = n_depth
                    .checked_sub(1)
                    .ok_or_else(|| format!("unbalanced '}}' at offset {n_idx}"))?;
            }
            _ if c == sep && n_depth == 0 => {
                l_parts.push(&text[n_start..n_idx]);
                n_start = n_idx + c.len_utf8();
            }
            _ => {}
        }
    }
    if n_depth != 0 {
        return Err("unterminated '{' block".to_string());
    }
    l_parts.push(&text[n_start..]);
    Ok(l_parts)
}

fn split_key_value(item: &str) -> Option<(&str, &str)> {
    let n_idx_eq = item.find('=')?;
    let n_idx_brace = item.find('{').unwrap_or(usize::MAX);
    if n_idx_brace < n_idx_eq {
        return None;
    }
    Some((&item[..n_idx_eq], &item[n_idx_eq + 1..]))
}

/// Strip an outer `{}` block and resolve escapes.
fn derive_item_value(raw: &str) -> Result<String, String> {
    let c_raw = raw.trim();
    let c_body = match (c_raw.strip_prefix('{'), c_raw.ends_with('}')) {
        (Some(c_rest), true) if !c_raw.ends_with("\\}") => &c_rest[..c_rest.len() - 1],
        (Some(_), _) => return Err(format!("malformed block: {c_raw:?}")),
        _ => c_raw,
    };

    let mut c_value = String::with_capacity(c_body.len());
    let mut l_chars = c_body.chars();
    while let Some(c) = l_chars.next() {
        if c == '\\' {
            match l_chars.next() {
                Some(c_next) => c_value.push(c_next),
                None => return Err(format!("dangling escape in {c_raw:?}")),
            }
        } else {
            c_value.push(c);
        }
    }
    Ok(c_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::SpecStyleDeclaration;

    #[test]
    fn test_parse_directive_scalar_keys() {
        let directive =
            parse_directive("Name=Total Amount,omitEmpty,pos=-1,Inverted=false,row=3,rowoffset=2")
                .unwrap();
        assert_eq!(directive.name.as_deref(), Some("Total Amount"));
        assert!(directive.if_omit_empty);
        assert_eq!(directive.position, Some(-1));
        assert_eq!(directive.inverted, Some(false));
        assert_eq!(directive.row, Some(3));
        assert_eq!(directive.row_offset, 2);
        assert_eq!(directive.column, None);
    }

    #[test]
    fn test_parse_directive_dash_ignores_field() {
        let directive = parse_directive(" - ").unwrap();
        assert!(directive.if_ignore);
        assert_eq!(parse_directive("").unwrap(), SpecDirective::default());
    }

    #[test]
    fn test_parse_directive_style_blocks_keep_separators() {
        let directive = parse_directive(
            "header.style={color:red;font-style:bold},style={format:'#,##0.00'},cell.style=width:40px,styleref={money, odd}",
        )
        .unwrap();
        assert_eq!(
            directive.style_header,
            Some(SpecStyleDeclaration {
                definition: "color:red;font-style:bold".to_string(),
                refs: vec![],
            })
        );
        assert_eq!(
            directive.style_cell,
            Some(SpecStyleDeclaration {
                definition: "format:'#,##0.00';width:40px".to_string(),
                refs: vec!["money".to_string(), "odd".to_string()],
            })
        );
        assert_eq!(directive.style_column, None);
    }

    #[test]
    fn test_parse_directive_escapes_and_sheet_alias() {
        let directive = parse_directive(r"name=a\,b,sheet=Items,first").unwrap();
        assert_eq!(directive.name.as_deref(), Some("a,b"));
        assert_eq!(directive.sheet_destination.as_deref(), Some("Items"));
        assert!(directive.if_place_first);
    }

    #[test]
    fn test_parse_directive_rejects_malformed_input() {
        assert!(parse_directive("colour=red").is_err());
        assert!(parse_directive("footer.style={color:red}").is_err());
        assert!(parse_directive("row=abc").is_err());
        assert!(parse_directive("pos").is_err());
        assert!(parse_directive("embed=maybe").is_err());
        assert!(parse_directive("style={color:red").is_err());
    }

    #[test]
    fn test_adjust_applies_absolute_then_offsets() {
        let directive = parse_directive("column=4,rowoffset=2,columnoffset=1").unwrap();
        let mut cursor = Cursor::new(5, 0);
        directive.adjust(&mut cursor);
        assert_eq!(cursor, Cursor::new(7, 5));
    }
}
